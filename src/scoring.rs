use std::cmp::Ordering;

use serde::Serialize;

use crate::exam::ExamProfile;
use crate::models::StudentRecord;

pub const COMPARISON_DECIMALS: i32 = 2;

pub fn round_half_away(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // -0.0 and 0.0 must compare equal under total ordering
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct ComparisonScore(f64);

impl ComparisonScore {
    pub fn new(profile: &ExamProfile, average: f64) -> Self {
        if profile.rounds_comparison_score {
            ComparisonScore(round_half_away(average, COMPARISON_DECIMALS))
        } else {
            ComparisonScore(average)
        }
    }

    pub fn of(profile: &ExamProfile, record: &StudentRecord) -> Self {
        Self::new(profile, record.average)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialEq for ComparisonScore {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ComparisonScore {}

impl PartialOrd for ComparisonScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ComparisonScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

pub fn compare_standing(profile: &ExamProfile, a: &StudentRecord, b: &StudentRecord) -> Ordering {
    ComparisonScore::of(profile, b).cmp(&ComparisonScore::of(profile, a))
}

pub fn sort_by_standing<'a>(
    profile: &ExamProfile,
    population: &'a [StudentRecord],
) -> Vec<(ComparisonScore, &'a StudentRecord)> {
    let mut scored: Vec<(ComparisonScore, &StudentRecord)> = population
        .iter()
        .map(|record| (ComparisonScore::of(profile, record), record))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExamType;
    use proptest::prelude::*;

    #[test]
    fn rounds_half_away_from_zero() {
        assert_eq!(round_half_away(12.345, 2), 12.35);
        assert_eq!(round_half_away(0.125, 2), 0.13);
        assert_eq!(round_half_away(-0.125, 2), -0.13);
        assert_eq!(round_half_away(15.004, 2), 15.0);
        assert_eq!(round_half_away(15.006, 2), 15.01);
    }

    #[test]
    fn negative_zero_collapses() {
        let rounded = round_half_away(-0.001, 2);
        assert!(rounded.is_sign_positive());
    }

    #[test]
    fn bac_and_brevet_tie_beyond_second_decimal() {
        for exam in [ExamType::Bac, ExamType::Brevet] {
            let profile = exam.profile();
            assert_eq!(
                ComparisonScore::new(profile, 12.341),
                ComparisonScore::new(profile, 12.344)
            );
        }
    }

    #[test]
    fn concours_compares_raw_scores() {
        let profile = ExamType::Concours.profile();
        assert_ne!(
            ComparisonScore::new(profile, 150.501),
            ComparisonScore::new(profile, 150.504)
        );
        assert_eq!(ComparisonScore::new(profile, 150.504).value(), 150.504);
    }

    #[test]
    fn sort_is_descending_and_stable() {
        let profile = ExamType::Brevet.profile();
        let make = |matricule: &str, average: f64| StudentRecord {
            matricule: matricule.to_string(),
            full_name: matricule.to_string(),
            average,
            decision_text: String::new(),
            admitted: false,
            section: None,
            establishment: "CEM Teyarett".to_string(),
            region: None,
            sub_region: None,
            year: 2025,
            exam_type: ExamType::Brevet,
            session_type: None,
        };
        let population = vec![make("a", 9.0), make("b", 14.001), make("c", 14.004), make("d", 16.0)];
        let order: Vec<&str> = sort_by_standing(profile, &population)
            .into_iter()
            .map(|(_, record)| record.matricule.as_str())
            .collect();
        assert_eq!(order, vec!["d", "b", "c", "a"]);
    }

    proptest! {
        #[test]
        fn rounding_is_idempotent(value in 0.0f64..200.0) {
            let once = round_half_away(value, COMPARISON_DECIMALS);
            prop_assert_eq!(round_half_away(once, COMPARISON_DECIMALS), once);
        }
    }
}
