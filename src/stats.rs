use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::exam::ExamProfile;
use crate::models::{
    BasicStats, CategoryStats, EnhancedStatistics, EstablishmentStats, ExamType,
    StatisticsResult, StudentRecord,
};

pub const UNSPECIFIED: &str = "unspecified";

/// Establishments must have strictly more students than this to be ranked.
pub const MIN_ESTABLISHMENT_SIZE: usize = 30;

pub const PODIUM_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOrder {
    #[default]
    ByTotal,
    ByRate,
    Encounter,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsOptions {
    pub sessionnaire_threshold: Option<f64>,
    pub order: GroupOrder,
}

#[derive(Debug, Clone, Copy)]
pub struct EnhancedOptions {
    pub min_establishment_size: usize,
    pub podium_size: usize,
}

impl Default for EnhancedOptions {
    fn default() -> Self {
        Self {
            min_establishment_size: MIN_ESTABLISHMENT_SIZE,
            podium_size: PODIUM_SIZE,
        }
    }
}

pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn mean_average(population: &[StudentRecord]) -> f64 {
    if population.is_empty() {
        0.0
    } else {
        population.iter().map(|s| s.average).sum::<f64>() / population.len() as f64
    }
}

pub fn basic_stats(population: &[StudentRecord]) -> BasicStats {
    let admitted = population.iter().filter(|s| s.admitted).count();
    BasicStats {
        total_students: population.len(),
        admitted_students: admitted,
        admission_rate: percentage(admitted, population.len()),
        average_score: mean_average(population),
    }
}

pub fn sessionnaire_rate(population: &[StudentRecord], threshold: f64) -> f64 {
    let sessionnaires = population
        .iter()
        .filter(|s| !s.admitted && s.average >= threshold)
        .count();
    percentage(sessionnaires, population.len())
}

pub fn compute_statistics(
    exam_type: ExamType,
    population: &[StudentRecord],
    options: &StatisticsOptions,
) -> StatisticsResult {
    let profile = ExamProfile::of(exam_type);
    let basic = basic_stats(population);

    let threshold = options
        .sessionnaire_threshold
        .or(profile.sessionnaire_threshold);

    let section_stats = profile.uses_sections.then(|| {
        let mut groups = group_stats(population, |s| s.section_name());
        order_groups(&mut groups, options.order);
        groups
    });

    let mut region_stats = group_stats(population, |s| s.region_name());
    order_groups(&mut region_stats, options.order);

    StatisticsResult {
        exam_type,
        total_students: basic.total_students,
        admitted_students: basic.admitted_students,
        admission_rate: basic.admission_rate,
        sessionnaire_rate: threshold.map(|t| sessionnaire_rate(population, t)),
        average_score: basic.average_score,
        section_stats,
        region_stats,
    }
}

pub fn compute_enhanced_statistics(
    exam_type: ExamType,
    population: &[StudentRecord],
    options: &EnhancedOptions,
) -> EnhancedStatistics {
    let profile = ExamProfile::of(exam_type);

    let mut establishments: Vec<EstablishmentStats> = establishment_stats(population)
        .into_iter()
        .filter(|e| e.total_students > options.min_establishment_size)
        .collect();
    establishments.sort_by(|a, b| b.success_rate.total_cmp(&a.success_rate));

    let top_establishments: Vec<EstablishmentStats> = establishments
        .iter()
        .take(options.podium_size)
        .cloned()
        .collect();
    let bottom_establishments: Vec<EstablishmentStats> = establishments
        .iter()
        .rev()
        .take(options.podium_size)
        .cloned()
        .collect();

    let section_stats = if profile.uses_sections {
        group_stats(population, |s| s.section_name())
    } else {
        Vec::new()
    };

    let mut region_stats: Vec<CategoryStats> = group_stats(population, |s| s.region_name())
        .into_iter()
        .filter(|g| g.name != UNSPECIFIED)
        .collect();
    order_groups(&mut region_stats, GroupOrder::ByRate);

    EnhancedStatistics {
        exam_type,
        basic: basic_stats(population),
        top_establishments,
        bottom_establishments,
        section_stats,
        region_stats,
    }
}

pub fn establishment_stats(population: &[StudentRecord]) -> Vec<EstablishmentStats> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut acc: Vec<(&str, usize, usize, f64)> = Vec::new();

    for student in population {
        let slot = *index.entry(student.establishment.as_str()).or_insert_with(|| {
            acc.push((student.establishment.as_str(), 0, 0, 0.0));
            acc.len() - 1
        });
        let entry = &mut acc[slot];
        entry.1 += 1;
        if student.admitted {
            entry.2 += 1;
        }
        entry.3 += student.average;
    }

    acc.into_iter()
        .map(|(name, total, admitted, score_sum)| EstablishmentStats {
            name: name.to_string(),
            total_students: total,
            admitted_students: admitted,
            success_rate: percentage(admitted, total),
            average_score: if total == 0 { 0.0 } else { score_sum / total as f64 },
        })
        .collect()
}

pub fn group_stats<'a, F>(population: &'a [StudentRecord], category: F) -> Vec<CategoryStats>
where
    F: Fn(&'a StudentRecord) -> Option<&'a str>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<CategoryStats> = Vec::new();

    for student in population {
        let name = category(student).unwrap_or(UNSPECIFIED);
        let slot = *index.entry(name).or_insert_with(|| {
            groups.push(CategoryStats {
                name: name.to_string(),
                total: 0,
                admitted: 0,
                rate: 0.0,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.total += 1;
        if student.admitted {
            group.admitted += 1;
        }
    }

    for group in &mut groups {
        group.rate = percentage(group.admitted, group.total);
    }
    groups
}

pub fn order_groups(groups: &mut [CategoryStats], order: GroupOrder) {
    match order {
        GroupOrder::ByTotal => groups.sort_by(|a, b| b.total.cmp(&a.total)),
        GroupOrder::ByRate => groups.sort_by(|a, b| b.rate.total_cmp(&a.rate)),
        GroupOrder::Encounter => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{bac_student, concours_student, student, RecordExt};
    use proptest::prelude::*;

    fn names(groups: &[CategoryStats]) -> Vec<&str> {
        groups.iter().map(|g| g.name.as_str()).collect()
    }

    #[test]
    fn empty_population_yields_zeroes() {
        let stats = compute_statistics(ExamType::Bac, &[], &StatisticsOptions::default());
        assert_eq!(stats.total_students, 0);
        assert_eq!(stats.admitted_students, 0);
        assert_eq!(stats.admission_rate, 0.0);
        assert_eq!(stats.sessionnaire_rate, Some(0.0));
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.section_stats, Some(Vec::new()));
        assert!(stats.region_stats.is_empty());
    }

    #[test]
    fn counts_rates_and_average() {
        let population = vec![
            bac_student("1", "SN", 12.0).admitted(),
            bac_student("2", "SN", 9.0),
            bac_student("3", "M", 7.5),
            bac_student("4", "LM", 10.5).admitted(),
        ];
        let stats = compute_statistics(ExamType::Bac, &population, &StatisticsOptions::default());
        assert_eq!(stats.total_students, 4);
        assert_eq!(stats.admitted_students, 2);
        assert_eq!(stats.admission_rate, 50.0);
        assert_eq!(stats.sessionnaire_rate, Some(25.0));
        assert!((stats.average_score - 9.75).abs() < 1e-9);
    }

    #[test]
    fn sections_are_ordered_by_total_and_keep_unspecified() {
        let mut unlabeled = bac_student("5", "", 11.0);
        unlabeled.section = None;
        let population = vec![
            bac_student("1", "M", 12.0).admitted(),
            bac_student("2", "SN", 9.0),
            bac_student("3", "SN", 14.0).admitted(),
            unlabeled,
        ];
        let stats = compute_statistics(ExamType::Bac, &population, &StatisticsOptions::default());
        let sections = stats.section_stats.unwrap();
        assert_eq!(names(&sections), vec!["SN", "M", UNSPECIFIED]);
        assert_eq!(sections[0].admitted, 1);
        assert_eq!(sections[0].rate, 50.0);
    }

    #[test]
    fn rate_order_is_available_as_a_distinct_mode() {
        let population = vec![
            student("1", 12.0).in_region(Some("Trarza")),
            student("2", 12.0).in_region(Some("Trarza")),
            student("3", 12.0).in_region(Some("Adrar")).admitted(),
        ];
        let by_total = compute_statistics(ExamType::Brevet, &population, &StatisticsOptions::default());
        assert_eq!(names(&by_total.region_stats), vec!["Trarza", "Adrar"]);

        let by_rate = compute_statistics(
            ExamType::Brevet,
            &population,
            &StatisticsOptions {
                order: GroupOrder::ByRate,
                ..StatisticsOptions::default()
            },
        );
        assert_eq!(names(&by_rate.region_stats), vec!["Adrar", "Trarza"]);
    }

    #[test]
    fn non_bac_has_no_section_stats() {
        let population = vec![student("1", 12.0)];
        let stats = compute_statistics(ExamType::Brevet, &population, &StatisticsOptions::default());
        assert!(stats.section_stats.is_none());
    }

    #[test]
    fn missing_region_is_bucketed() {
        let population = vec![student("1", 12.0).in_region(None), student("2", 9.0)];
        let stats = compute_statistics(ExamType::Brevet, &population, &StatisticsOptions::default());
        assert_eq!(names(&stats.region_stats), vec![UNSPECIFIED, "Nouakchott Nord"]);
    }

    #[test]
    fn concours_sessionnaire_rate_needs_explicit_threshold() {
        let population = vec![concours_student("1", 95.0), concours_student("2", 130.0).admitted()];
        let default = compute_statistics(ExamType::Concours, &population, &StatisticsOptions::default());
        assert_eq!(default.sessionnaire_rate, None);

        let explicit = compute_statistics(
            ExamType::Concours,
            &population,
            &StatisticsOptions {
                sessionnaire_threshold: Some(80.0),
                ..StatisticsOptions::default()
            },
        );
        assert_eq!(explicit.sessionnaire_rate, Some(50.0));
    }

    fn school(name: &str, size: usize, admitted: usize) -> Vec<StudentRecord> {
        (0..size)
            .map(|i| {
                let record = student(&format!("{name}-{i}"), 10.0).at(name);
                if i < admitted {
                    record.admitted()
                } else {
                    record
                }
            })
            .collect()
    }

    #[test]
    fn enhanced_statistics_skip_small_establishments() {
        let mut population = school("Tiny", 30, 30);
        population.extend(school("Alpha", 31, 20));
        population.extend(school("Beta", 40, 10));
        population.extend(school("Gamma", 35, 35));

        let enhanced =
            compute_enhanced_statistics(ExamType::Brevet, &population, &EnhancedOptions::default());
        let top: Vec<&str> = enhanced.top_establishments.iter().map(|e| e.name.as_str()).collect();
        let bottom: Vec<&str> = enhanced
            .bottom_establishments
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(top, vec!["Gamma", "Alpha", "Beta"]);
        assert_eq!(bottom, vec!["Beta", "Alpha", "Gamma"]);
        assert_eq!(enhanced.basic.total_students, 136);
        assert!(enhanced.section_stats.is_empty());
    }

    #[test]
    fn enhanced_podium_ties_keep_encounter_order() {
        let mut population = school("First", 31, 31);
        population.extend(school("Second", 31, 31));
        let enhanced = compute_enhanced_statistics(
            ExamType::Brevet,
            &population,
            &EnhancedOptions {
                podium_size: 1,
                ..EnhancedOptions::default()
            },
        );
        assert_eq!(enhanced.top_establishments[0].name, "First");
        assert_eq!(enhanced.bottom_establishments[0].name, "Second");
    }

    #[test]
    fn enhanced_regions_drop_unspecified_and_sort_by_rate() {
        let population = vec![
            student("1", 12.0).in_region(Some("Gorgol")),
            student("2", 12.0).in_region(None).admitted(),
            student("3", 12.0).in_region(Some("Assaba")).admitted(),
        ];
        let enhanced =
            compute_enhanced_statistics(ExamType::Brevet, &population, &EnhancedOptions::default());
        assert_eq!(names(&enhanced.region_stats), vec!["Assaba", "Gorgol"]);
    }

    #[test]
    fn establishment_average_is_mean_of_raw_scores() {
        let population = vec![
            student("1", 10.004).at("A"),
            student("2", 11.0).at("A"),
            student("3", 15.0).at("B"),
        ];
        let stats = establishment_stats(&population);
        assert_eq!(stats.len(), 2);
        assert!((stats[0].average_score - 10.502).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn section_totals_add_up(sections in prop::collection::vec(0usize..4, 0..60)) {
            let labels = ["SN", "M", "LM", "LO"];
            let population: Vec<StudentRecord> = sections
                .iter()
                .enumerate()
                .map(|(i, s)| bac_student(&i.to_string(), labels[*s], 10.0))
                .collect();
            let stats = compute_statistics(ExamType::Bac, &population, &StatisticsOptions::default());
            let sum: usize = stats.section_stats.unwrap().iter().map(|g| g.total).sum();
            prop_assert_eq!(sum, stats.total_students);
        }
    }
}
