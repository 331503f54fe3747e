use std::collections::BTreeMap;
use std::future::Future;
use std::hash::Hash;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::error::EngineError;
use crate::models::{EnhancedStatistics, Leaderboard, RankResult, StatisticsResult};
use crate::service::{ResultsService, StudentLookup};
use crate::stats::{EnhancedOptions, GroupOrder, StatisticsOptions};
use crate::store::{ExamScope, ScopeFilter, StudentStore};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Statistics {
        scope: ExamScope,
        filter: ScopeFilter,
        threshold_bits: Option<u64>,
        order: GroupOrder,
    },
    Enhanced {
        scope: ExamScope,
        min_establishment_size: usize,
        podium_size: usize,
    },
    Ranking {
        scope: ExamScope,
        lookup: StudentLookup,
    },
    Leaderboard {
        scope: ExamScope,
        limit: usize,
    },
    Regions(ExamScope),
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

pub struct TtlCache<K, V> {
    entries: DashMap<K, Entry<V>>,
    ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let fresh = self
            .entries
            .get(key)
            .map(|entry| (entry.stored_at.elapsed() < self.ttl).then(|| entry.value.clone()));
        match fresh {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.entries
                    .remove_if(key, |_, entry| entry.stored_at.elapsed() >= self.ttl);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.stored_at.elapsed() < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn memoize<V, F, Fut>(
    cache: &TtlCache<CacheKey, V>,
    key: CacheKey,
    compute: F,
) -> Result<V, EngineError>
where
    V: Clone,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<V, EngineError>>,
{
    if let Some(hit) = cache.get(&key) {
        debug!(?key, "cache hit");
        return Ok(hit);
    }
    let value = compute().await?;
    cache.insert(key, value.clone());
    Ok(value)
}

pub struct CachedResults<S: StudentStore + ?Sized> {
    service: ResultsService<S>,
    statistics: TtlCache<CacheKey, StatisticsResult>,
    enhanced: TtlCache<CacheKey, EnhancedStatistics>,
    rankings: TtlCache<CacheKey, RankResult>,
    leaderboards: TtlCache<CacheKey, Leaderboard>,
    regions: TtlCache<CacheKey, BTreeMap<String, Vec<String>>>,
}

impl<S: StudentStore + ?Sized> CachedResults<S> {
    pub fn new(service: ResultsService<S>, ttl: Duration) -> Self {
        Self {
            service,
            statistics: TtlCache::new(ttl),
            enhanced: TtlCache::new(ttl),
            rankings: TtlCache::new(ttl),
            leaderboards: TtlCache::new(ttl),
            regions: TtlCache::new(ttl),
        }
    }

    pub fn service(&self) -> &ResultsService<S> {
        &self.service
    }

    pub async fn statistics(
        &self,
        scope: &ExamScope,
        filter: &ScopeFilter,
        options: &StatisticsOptions,
    ) -> Result<StatisticsResult, EngineError> {
        let key = CacheKey::Statistics {
            scope: *scope,
            filter: filter.clone(),
            threshold_bits: options.sessionnaire_threshold.map(f64::to_bits),
            order: options.order,
        };
        memoize(&self.statistics, key, || {
            self.service.statistics(scope, filter, options)
        })
        .await
    }

    pub async fn enhanced_statistics(
        &self,
        scope: &ExamScope,
        options: &EnhancedOptions,
    ) -> Result<EnhancedStatistics, EngineError> {
        let key = CacheKey::Enhanced {
            scope: *scope,
            min_establishment_size: options.min_establishment_size,
            podium_size: options.podium_size,
        };
        memoize(&self.enhanced, key, || {
            self.service.enhanced_statistics(scope, options)
        })
        .await
    }

    pub async fn rank_student(
        &self,
        scope: &ExamScope,
        lookup: &StudentLookup,
    ) -> Result<RankResult, EngineError> {
        let key = CacheKey::Ranking {
            scope: *scope,
            lookup: lookup.clone(),
        };
        memoize(&self.rankings, key, || self.service.rank_student(scope, lookup)).await
    }

    pub async fn leaderboard(
        &self,
        scope: &ExamScope,
        limit: usize,
    ) -> Result<Leaderboard, EngineError> {
        let key = CacheKey::Leaderboard {
            scope: *scope,
            limit,
        };
        memoize(&self.leaderboards, key, || self.service.leaderboard(scope, limit)).await
    }

    pub async fn region_directory(
        &self,
        scope: &ExamScope,
    ) -> Result<BTreeMap<String, Vec<String>>, EngineError> {
        memoize(&self.regions, CacheKey::Regions(*scope), || {
            self.service.region_directory(scope)
        })
        .await
    }

    pub fn purge_expired(&self) -> usize {
        self.statistics.purge_expired()
            + self.enhanced.purge_expired()
            + self.rankings.purge_expired()
            + self.leaderboards.purge_expired()
            + self.regions.purge_expired()
    }

    pub fn invalidate_all(&self) {
        self.statistics.clear();
        self.enhanced.clear();
        self.rankings.clear();
        self.leaderboards.clear();
        self.regions.clear();
    }
}
