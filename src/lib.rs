pub mod cache;
pub mod db;
pub mod error;
pub mod exam;
pub mod leaderboard;
pub mod models;
pub mod rank;
pub mod report;
pub mod scoring;
pub mod service;
pub mod stats;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;

pub use cache::CachedResults;
pub use error::{EngineError, StoreError};
pub use exam::ExamProfile;
pub use models::{ExamType, RankResult, SessionType, StatisticsResult, StudentRecord};
pub use rank::{compute_rank, RankCalculator, ScopePopulations};
pub use scoring::{compare_standing, ComparisonScore};
pub use service::{ResultsService, StudentLookup};
pub use stats::{compute_enhanced_statistics, compute_statistics, GroupOrder, StatisticsOptions};
pub use store::{ExamScope, ScopeFilter, SectionFilter, StudentStore};
