use thiserror::Error;

use crate::models::RankScope;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid scope configuration: {0}")]
    InvalidScopeConfiguration(String),

    #[error("target student not found in its {scope} population")]
    TargetNotInScope { scope: RankScope },

    #[error("student not found: {0}")]
    StudentNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
