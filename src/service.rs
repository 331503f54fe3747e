use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::EngineError;
use crate::leaderboard;
use crate::models::{EnhancedStatistics, Leaderboard, RankResult, StatisticsResult, StudentRecord};
use crate::rank::{compute_rank, ScopePopulations};
use crate::stats::{self, EnhancedOptions, StatisticsOptions};
use crate::store::{ExamScope, LocationQuery, ScopeFilter, StudentStore};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StudentLookup {
    Matricule(String),
    /// Name and place; required where matricules are not unique.
    Location(LocationQuery),
}

impl StudentLookup {
    pub fn choose(
        scope: &ExamScope,
        matricule: Option<String>,
        location: LocationQuery,
    ) -> Result<Self, EngineError> {
        match matricule {
            Some(_) if !scope.profile().matricule_is_unique => {
                Err(EngineError::InvalidScopeConfiguration(format!(
                    "{} matricules are not unique, identify the candidate by name and location",
                    scope.exam_type()
                )))
            }
            Some(matricule) => Ok(StudentLookup::Matricule(matricule)),
            None if location.is_empty() => Err(EngineError::InvalidScopeConfiguration(
                "give a matricule or at least one of name, establishment, region, sub-region"
                    .to_string(),
            )),
            None => Ok(StudentLookup::Location(location)),
        }
    }
}

pub struct ResultsService<S: StudentStore + ?Sized> {
    store: Arc<S>,
}

impl<S: StudentStore + ?Sized> Clone for ResultsService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: StudentStore + ?Sized> ResultsService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn find_student(
        &self,
        scope: &ExamScope,
        lookup: &StudentLookup,
    ) -> Result<StudentRecord, EngineError> {
        let found = match lookup {
            StudentLookup::Matricule(matricule) => {
                if !scope.profile().matricule_is_unique {
                    return Err(EngineError::InvalidScopeConfiguration(format!(
                        "{} candidates must be looked up by name and location",
                        scope.exam_type()
                    )));
                }
                self.store.find_one(&scope.key(matricule)).await?
            }
            StudentLookup::Location(query) => {
                if query.is_empty() {
                    return Err(EngineError::InvalidScopeConfiguration(
                        "location lookup needs at least one field".to_string(),
                    ));
                }
                self.store.find_by_location(scope, query).await?
            }
        };

        found.ok_or_else(|| EngineError::StudentNotFound(format!("{lookup:?} in {scope:?}")))
    }

    pub async fn rank_student(
        &self,
        scope: &ExamScope,
        lookup: &StudentLookup,
    ) -> Result<RankResult, EngineError> {
        let target = self.find_student(scope, lookup).await?;
        self.rank_target(&target).await
    }

    pub async fn rank_target(&self, target: &StudentRecord) -> Result<RankResult, EngineError> {
        let scope = ExamScope::of(target)?;
        info!(
            matricule = %target.matricule,
            exam = %scope.exam_type(),
            year = scope.year(),
            "computing rankings"
        );

        let shared = if scope.profile().uses_sections {
            ScopeFilter::all().same_section_as(target.section.as_deref())
        } else {
            ScopeFilter::all()
        };

        let establishment_filter = shared.clone().establishment(target.establishment.clone());
        let region_filter = target
            .region_name()
            .and(target.region.clone())
            .map(|region| shared.clone().region(region));

        let (establishment, region, nation) = tokio::try_join!(
            self.store.list_by_scope(&scope, &establishment_filter),
            async {
                match &region_filter {
                    Some(filter) => self.store.list_by_scope(&scope, filter).await.map(Some),
                    None => Ok(None),
                }
            },
            self.store.list_by_scope(&scope, &shared),
        )?;
        debug!(
            establishment = establishment.len(),
            region = region.as_ref().map(Vec::len),
            nation = nation.len(),
            "fetched scope populations"
        );

        compute_rank(
            target,
            ScopePopulations {
                establishment: &establishment,
                region: region.as_deref(),
                nation: &nation,
            },
        )
    }

    pub async fn population(
        &self,
        scope: &ExamScope,
        filter: &ScopeFilter,
    ) -> Result<Vec<StudentRecord>, EngineError> {
        filter.validate(scope)?;
        Ok(self.store.list_by_scope(scope, filter).await?)
    }

    pub async fn statistics(
        &self,
        scope: &ExamScope,
        filter: &ScopeFilter,
        options: &StatisticsOptions,
    ) -> Result<StatisticsResult, EngineError> {
        let population = self.population(scope, filter).await?;
        info!(students = population.len(), exam = %scope.exam_type(), "computing statistics");
        Ok(stats::compute_statistics(scope.exam_type(), &population, options))
    }

    pub async fn enhanced_statistics(
        &self,
        scope: &ExamScope,
        options: &EnhancedOptions,
    ) -> Result<EnhancedStatistics, EngineError> {
        let population = self.population(scope, &ScopeFilter::all()).await?;
        Ok(stats::compute_enhanced_statistics(scope.exam_type(), &population, options))
    }

    pub async fn leaderboard(
        &self,
        scope: &ExamScope,
        limit: usize,
    ) -> Result<Leaderboard, EngineError> {
        let population = self.population(scope, &ScopeFilter::all()).await?;
        Ok(leaderboard::leaderboard(scope.exam_type(), &population, limit))
    }

    pub async fn region_directory(
        &self,
        scope: &ExamScope,
    ) -> Result<BTreeMap<String, Vec<String>>, EngineError> {
        let population = self.population(scope, &ScopeFilter::all()).await?;
        Ok(leaderboard::region_directory(&population))
    }
}
