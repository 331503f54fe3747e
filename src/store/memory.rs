use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{ExamScope, LocationQuery, ScopeFilter, StudentStore};
use crate::error::StoreError;
use crate::models::{StudentKey, StudentRecord};

#[derive(Debug, Default)]
pub struct MemoryStudentStore {
    records: RwLock<BTreeMap<StudentKey, StudentRecord>>,
}

impl MemoryStudentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = StudentRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.records.write();
            for record in records {
                map.insert(record.key(), record);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl StudentStore for MemoryStudentStore {
    async fn find_one(&self, key: &StudentKey) -> Result<Option<StudentRecord>, StoreError> {
        Ok(self.records.read().get(key).cloned())
    }

    async fn find_by_location(
        &self,
        scope: &ExamScope,
        query: &LocationQuery,
    ) -> Result<Option<StudentRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .values()
            .find(|record| scope.contains(record) && query.matches(record))
            .cloned())
    }

    async fn list_by_scope(
        &self,
        scope: &ExamScope,
        filter: &ScopeFilter,
    ) -> Result<Vec<StudentRecord>, StoreError> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|record| scope.contains(record) && filter.matches(record))
            .cloned()
            .collect())
    }

    async fn count(&self, scope: &ExamScope, filter: &ScopeFilter) -> Result<usize, StoreError> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|record| scope.contains(record) && filter.matches(record))
            .count())
    }

    async fn upsert_many(&self, records: &[StudentRecord]) -> Result<usize, StoreError> {
        let mut map = self.records.write();
        for record in records {
            map.insert(record.key(), record.clone());
        }
        Ok(records.len())
    }
}
