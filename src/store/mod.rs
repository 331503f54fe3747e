use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, StoreError};
use crate::exam::ExamProfile;
use crate::models::{non_blank, ExamType, SessionType, StudentKey, StudentRecord};

pub mod csv;
pub mod memory;

pub use memory::MemoryStudentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ExamScope {
    year: i32,
    exam_type: ExamType,
    session_type: Option<SessionType>,
}

impl ExamScope {
    pub fn new(
        year: i32,
        exam_type: ExamType,
        session_type: Option<SessionType>,
    ) -> Result<Self, EngineError> {
        exam_type.profile().check_session(session_type)?;
        Ok(Self {
            year,
            exam_type,
            session_type,
        })
    }

    pub fn of(record: &StudentRecord) -> Result<Self, EngineError> {
        Self::new(record.year, record.exam_type, record.session_type)
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn exam_type(&self) -> ExamType {
        self.exam_type
    }

    pub fn session_type(&self) -> Option<SessionType> {
        self.session_type
    }

    pub fn profile(&self) -> &'static ExamProfile {
        self.exam_type.profile()
    }

    pub fn key(&self, matricule: &str) -> StudentKey {
        StudentKey {
            matricule: matricule.to_string(),
            year: self.year,
            exam_type: self.exam_type,
            session_type: self.session_type,
        }
    }

    pub fn contains(&self, record: &StudentRecord) -> bool {
        record.year == self.year
            && record.exam_type == self.exam_type
            && record.session_type == self.session_type
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionFilter {
    #[default]
    Any,
    Equals(String),
    /// Null or blank section.
    Missing,
}

impl SectionFilter {
    pub fn is_any(&self) -> bool {
        matches!(self, SectionFilter::Any)
    }

    pub fn matches(&self, section: Option<&str>) -> bool {
        match self {
            SectionFilter::Any => true,
            SectionFilter::Equals(wanted) => section == Some(wanted.as_str()),
            SectionFilter::Missing => non_blank(section).is_none(),
        }
    }
}

impl From<Option<String>> for SectionFilter {
    fn from(section: Option<String>) -> Self {
        section.map_or(SectionFilter::Any, SectionFilter::Equals)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeFilter {
    pub establishment: Option<String>,
    pub region: Option<String>,
    pub section: SectionFilter,
}

impl ScopeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn establishment(mut self, establishment: impl Into<String>) -> Self {
        self.establishment = Some(establishment.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn section(mut self, section: impl Into<String>) -> Self {
        self.section = SectionFilter::Equals(section.into());
        self
    }

    pub fn without_section(mut self) -> Self {
        self.section = SectionFilter::Missing;
        self
    }

    pub fn same_section_as(self, section: Option<&str>) -> Self {
        match section {
            Some(section) if non_blank(Some(section)).is_some() => self.section(section),
            _ => self.without_section(),
        }
    }

    pub fn validate(&self, scope: &ExamScope) -> Result<(), EngineError> {
        if !self.section.is_any() && !scope.profile().uses_sections {
            return Err(EngineError::InvalidScopeConfiguration(format!(
                "{} has no sections, cannot filter by section",
                scope.exam_type()
            )));
        }
        Ok(())
    }

    pub fn matches(&self, record: &StudentRecord) -> bool {
        fn eq(filter: &Option<String>, value: Option<&str>) -> bool {
            filter.as_deref().map_or(true, |wanted| value == Some(wanted))
        }

        eq(&self.establishment, Some(record.establishment.as_str()))
            && eq(&self.region, record.region.as_deref())
            && self.section.matches(record.section.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationQuery {
    pub full_name: Option<String>,
    pub establishment: Option<String>,
    pub region: Option<String>,
    pub sub_region: Option<String>,
}

impl LocationQuery {
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.establishment.is_none()
            && self.region.is_none()
            && self.sub_region.is_none()
    }

    pub fn matches(&self, record: &StudentRecord) -> bool {
        fn eq(filter: &Option<String>, value: Option<&str>) -> bool {
            filter.as_deref().map_or(true, |wanted| value == Some(wanted))
        }

        eq(&self.full_name, Some(record.full_name.as_str()))
            && eq(&self.establishment, Some(record.establishment.as_str()))
            && eq(&self.region, record.region.as_deref())
            && eq(&self.sub_region, record.sub_region.as_deref())
    }
}

#[async_trait]
pub trait StudentStore: Send + Sync {
    async fn find_one(&self, key: &StudentKey) -> Result<Option<StudentRecord>, StoreError>;

    async fn find_by_location(
        &self,
        scope: &ExamScope,
        query: &LocationQuery,
    ) -> Result<Option<StudentRecord>, StoreError>;

    async fn list_by_scope(
        &self,
        scope: &ExamScope,
        filter: &ScopeFilter,
    ) -> Result<Vec<StudentRecord>, StoreError>;

    async fn count(&self, scope: &ExamScope, filter: &ScopeFilter) -> Result<usize, StoreError> {
        Ok(self.list_by_scope(scope, filter).await?.len())
    }

    async fn upsert_many(&self, records: &[StudentRecord]) -> Result<usize, StoreError>;
}
