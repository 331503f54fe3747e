use std::collections::{BTreeMap, BTreeSet};

use crate::exam::ExamProfile;
use crate::models::{
    ExamType, Leaderboard, SectionLeaderboard, SectionSummary, StudentRecord,
};
use crate::stats::{mean_average, percentage};

pub const LEADERBOARD_SIZE: usize = 10;

pub const OTHER_SECTION: &str = "Other";

pub fn leaderboard(exam_type: ExamType, population: &[StudentRecord], limit: usize) -> Leaderboard {
    let profile = ExamProfile::of(exam_type);
    let mut admitted: Vec<&StudentRecord> = population.iter().filter(|s| s.admitted).collect();
    admitted.sort_by(|a, b| b.average.total_cmp(&a.average));

    if !profile.uses_sections {
        return Leaderboard::National(admitted.into_iter().take(limit).cloned().collect());
    }

    let mut boards: Vec<SectionLeaderboard> = Vec::new();
    for record in admitted {
        let section = record.section_name().unwrap_or(OTHER_SECTION);
        let board = match boards.iter().position(|b| b.section == section) {
            Some(idx) => &mut boards[idx],
            None => {
                boards.push(SectionLeaderboard {
                    section: section.to_string(),
                    students: Vec::new(),
                    summary: section_summary(population, section),
                });
                let last = boards.len() - 1;
                &mut boards[last]
            }
        };
        if board.students.len() < limit {
            board.students.push(record.clone());
        }
    }
    Leaderboard::BySection(boards)
}

fn section_summary(population: &[StudentRecord], section: &str) -> SectionSummary {
    let members: Vec<StudentRecord> = population
        .iter()
        .filter(|s| s.section_name().unwrap_or(OTHER_SECTION) == section)
        .cloned()
        .collect();
    let admitted = members.iter().filter(|s| s.admitted).count();
    SectionSummary {
        total: members.len(),
        admitted,
        admission_rate: percentage(admitted, members.len()),
        average_score: mean_average(&members),
    }
}

pub fn region_directory(population: &[StudentRecord]) -> BTreeMap<String, Vec<String>> {
    let mut directory: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for record in population {
        if let Some(region) = record.region_name() {
            directory
                .entry(region.to_string())
                .or_default()
                .insert(record.establishment.clone());
        }
    }
    directory
        .into_iter()
        .map(|(region, schools)| (region, schools.into_iter().collect()))
        .collect()
}
