use tracing::warn;

use crate::error::EngineError;
use crate::exam::ExamProfile;
use crate::models::{RankResult, RankScope, ScopeRank, StudentRecord};
use crate::scoring::{sort_by_standing, ComparisonScore};

/// Populations already filtered to each scope's membership rules.
///
/// For BAC every scope is also restricted to the target's section and
/// session type. `region` may be `None` when the target has no region.
#[derive(Debug, Clone, Copy)]
pub struct ScopePopulations<'a> {
    pub establishment: &'a [StudentRecord],
    pub region: Option<&'a [StudentRecord]>,
    pub nation: &'a [StudentRecord],
}

#[derive(Debug, Clone, Copy)]
pub struct RankCalculator {
    profile: &'static ExamProfile,
}

impl RankCalculator {
    pub fn new(profile: &'static ExamProfile) -> Self {
        Self { profile }
    }

    pub fn for_target(target: &StudentRecord) -> Self {
        Self::new(target.exam_type.profile())
    }

    pub fn compute_rank(
        &self,
        target: &StudentRecord,
        populations: ScopePopulations<'_>,
    ) -> Result<RankResult, EngineError> {
        if target.exam_type != self.profile.exam_type {
            return Err(EngineError::InvalidScopeConfiguration(format!(
                "{} target ranked with {} rules",
                target.exam_type, self.profile.exam_type
            )));
        }
        self.profile.check_session(target.session_type)?;

        let establishment_rank =
            self.rank_in_scope(target, RankScope::Establishment, populations.establishment);

        let region_rank = match (target.region_name(), populations.region) {
            (Some(_), Some(population)) => {
                Some(self.rank_in_scope(target, RankScope::Region, population))
            }
            (Some(region), None) => {
                warn!(
                    matricule = %target.matricule,
                    region,
                    "no region population supplied, region rank omitted"
                );
                None
            }
            (None, _) => None,
        };

        let national_rank = self.rank_in_scope(target, RankScope::Nation, populations.nation);

        Ok(RankResult {
            matricule: target.matricule.clone(),
            full_name: target.full_name.clone(),
            average: target.average,
            comparison_score: ComparisonScore::of(self.profile, target).value(),
            section: target.section.clone(),
            establishment: target.establishment.clone(),
            region: target.region.clone(),
            establishment_rank,
            region_rank,
            national_rank,
        })
    }

    pub fn rank_in_scope(
        &self,
        target: &StudentRecord,
        scope: RankScope,
        population: &[StudentRecord],
    ) -> ScopeRank {
        let rank = self.walk(target, population);
        if rank.is_none() {
            warn!(
                matricule = %target.matricule,
                %scope,
                population = population.len(),
                "{}",
                EngineError::TargetNotInScope { scope }
            );
        }

        ScopeRank {
            scope,
            rank,
            total: population.len(),
        }
    }

    fn walk(&self, target: &StudentRecord, population: &[StudentRecord]) -> Option<usize> {
        let mut current_rank = 1usize;
        let mut previous: Option<ComparisonScore> = None;
        let mut tie_block = 0usize;

        // ties share a rank, the next distinct score skips the tie block: 1, 1, 3
        for (score, candidate) in sort_by_standing(self.profile, population) {
            if previous.is_some_and(|prev| prev != score) {
                current_rank += tie_block;
                tie_block = 0;
            }

            if self.is_target(target, candidate) {
                return Some(current_rank);
            }

            if previous == Some(score) {
                tie_block += 1;
            } else {
                tie_block = 1;
            }
            previous = Some(score);
        }

        None
    }

    fn is_target(&self, target: &StudentRecord, candidate: &StudentRecord) -> bool {
        if self.profile.matricule_is_unique {
            candidate.matricule == target.matricule
        } else {
            candidate.same_location_identity(target)
        }
    }
}

pub fn compute_rank(
    target: &StudentRecord,
    populations: ScopePopulations<'_>,
) -> Result<RankResult, EngineError> {
    RankCalculator::for_target(target).compute_rank(target, populations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExamType;
    use crate::test_utils::{bac_student, concours_student, student, RecordExt};
    use proptest::prelude::*;

    fn national_rank(target: &StudentRecord, population: &[StudentRecord]) -> Option<usize> {
        RankCalculator::for_target(target)
            .rank_in_scope(target, RankScope::Nation, population)
            .rank
    }

    fn ranks(population: &[StudentRecord]) -> Vec<usize> {
        population
            .iter()
            .map(|target| national_rank(target, population).unwrap())
            .collect()
    }

    #[test]
    fn rounding_separates_close_bac_scores() {
        let population = vec![
            bac_student("a", "SN", 15.004),
            bac_student("b", "SN", 15.006),
            bac_student("c", "SN", 10.0),
        ];
        assert_eq!(ranks(&population), vec![2, 1, 3]);
    }

    #[test]
    fn rounding_ties_scores_beyond_second_decimal() {
        let population = vec![
            bac_student("a", "M", 12.341),
            bac_student("b", "M", 12.344),
            bac_student("c", "M", 11.0),
        ];
        assert_eq!(ranks(&population), vec![1, 1, 3]);
    }

    #[test]
    fn concours_ties_on_raw_scores() {
        let population = vec![
            concours_student("1", 150.5),
            concours_student("2", 150.5),
            concours_student("3", 140.0),
        ];
        assert_eq!(ranks(&population), vec![1, 1, 3]);
    }

    #[test]
    fn concours_does_not_round() {
        let population = vec![concours_student("1", 150.501), concours_student("2", 150.504)];
        assert_eq!(ranks(&population), vec![2, 1]);
    }

    #[test]
    fn long_tie_blocks_jump_by_block_size() {
        let population = vec![
            student("a", 18.0),
            student("b", 16.0),
            student("c", 16.0),
            student("d", 16.0),
            student("e", 12.0),
            student("f", 12.0),
            student("g", 9.5),
        ];
        assert_eq!(ranks(&population), vec![1, 2, 2, 2, 5, 5, 7]);
    }

    #[test]
    fn concours_target_is_matched_by_location_identity() {
        let population = vec![
            concours_student("7", 120.0).named("Mariem Ba"),
            concours_student("7", 110.0).named("Sidi Kane"),
        ];
        let target = population[1].clone();
        assert_eq!(national_rank(&target, &population), Some(2));
    }

    #[test]
    fn null_region_omits_region_scope() {
        let target = student("t", 13.0).in_region(None);
        let school = vec![target.clone(), student("x", 14.0)];
        let nation = vec![target.clone(), student("x", 14.0), student("y", 9.0)];

        let result = compute_rank(
            &target,
            ScopePopulations {
                establishment: &school,
                region: Some(&nation),
                nation: &nation,
            },
        )
        .unwrap();

        assert!(result.region_rank.is_none());
        assert_eq!(result.establishment_rank.rank, Some(2));
        assert_eq!(result.establishment_rank.total, 2);
        assert_eq!(result.national_rank.rank, Some(2));
        assert_eq!(result.national_rank.total, 3);
    }

    #[test]
    fn missing_target_reports_absent_rank_with_total() {
        let target = student("ghost", 15.0);
        let school = vec![student("a", 16.0), student("b", 11.0)];
        let nation = vec![target.clone(), student("a", 16.0), student("b", 11.0)];

        let result = compute_rank(
            &target,
            ScopePopulations {
                establishment: &school,
                region: Some(&nation),
                nation: &nation,
            },
        )
        .unwrap();

        assert_eq!(result.establishment_rank.rank, None);
        assert_eq!(result.establishment_rank.total, 2);
        assert_eq!(result.region_rank.map(|r| r.rank), Some(Some(2)));
        assert_eq!(result.missing_scopes(), vec![RankScope::Establishment]);
    }

    #[test]
    fn empty_population_is_not_a_fault() {
        let target = student("t", 10.0);
        let scope = RankCalculator::for_target(&target).rank_in_scope(&target, RankScope::Nation, &[]);
        assert_eq!(scope.rank, None);
        assert_eq!(scope.total, 0);
    }

    #[test]
    fn bac_target_without_session_is_rejected() {
        let mut target = bac_student("t", "SN", 12.0);
        target.session_type = None;
        let population = vec![target.clone()];
        let err = compute_rank(
            &target,
            ScopePopulations {
                establishment: &population,
                region: Some(&population),
                nation: &population,
            },
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidScopeConfiguration(_)));
    }

    #[test]
    fn mismatched_rules_are_rejected() {
        let target = student("t", 12.0);
        let calculator = RankCalculator::new(ExamType::Concours.profile());
        let err = calculator
            .compute_rank(
                &target,
                ScopePopulations {
                    establishment: &[],
                    region: None,
                    nation: &[],
                },
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidScopeConfiguration(_)));
    }

    fn population_strategy() -> impl Strategy<Value = Vec<StudentRecord>> {
        prop::collection::vec(0u32..2000, 1..40).prop_map(|hundredths| {
            hundredths
                .into_iter()
                .enumerate()
                .map(|(idx, h)| student(&format!("m{idx}"), h as f64 / 100.0))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn tie_blocks_share_rank_and_next_rank_skips(population in population_strategy()) {
            let profile = ExamType::Brevet.profile();
            let ranked = ranks(&population);
            for (i, a) in population.iter().enumerate() {
                let better = population
                    .iter()
                    .filter(|b| ComparisonScore::of(profile, b) > ComparisonScore::of(profile, a))
                    .count();
                prop_assert_eq!(ranked[i], better + 1);
                for (j, b) in population.iter().enumerate() {
                    let (sa, sb) = (ComparisonScore::of(profile, a), ComparisonScore::of(profile, b));
                    if sa == sb {
                        prop_assert_eq!(ranked[i], ranked[j]);
                    } else if sa > sb {
                        prop_assert!(ranked[i] < ranked[j]);
                    }
                }
            }
        }

        #[test]
        fn total_matches_supplied_population(population in population_strategy()) {
            let target = population[0].clone();
            let scope = RankCalculator::for_target(&target)
                .rank_in_scope(&target, RankScope::Establishment, &population);
            prop_assert_eq!(scope.total, population.len());
        }
    }
}
