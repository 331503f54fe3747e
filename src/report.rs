use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{
    CategoryStats, EnhancedStatistics, EstablishmentStats, Leaderboard, RankResult, ScopeRank,
    StatisticsResult, StudentRecord,
};
use crate::store::ExamScope;

pub fn fmt_rate(rate: f64) -> String {
    format!("{rate:.1}%")
}

pub fn fmt_score(score: f64) -> String {
    format!("{score:.2}")
}

fn scope_label(scope: &ExamScope) -> String {
    match scope.session_type() {
        Some(session) => format!("{} {} ({})", scope.exam_type(), scope.year(), session),
        None => format!("{} {}", scope.exam_type(), scope.year()),
    }
}

fn fmt_scope_rank(rank: Option<&ScopeRank>) -> String {
    match rank {
        None => "not applicable".to_string(),
        Some(ScopeRank {
            rank: Some(position),
            total,
            ..
        }) => format!("{position} / {total}"),
        Some(ScopeRank { rank: None, total, .. }) => format!("unavailable (of {total})"),
    }
}

pub fn render_rank(result: &RankResult) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{} ({}) average {}",
        result.full_name,
        result.matricule,
        fmt_score(result.average)
    );
    if let Some(section) = &result.section {
        let _ = writeln!(output, "Section: {section}");
    }
    let _ = writeln!(
        output,
        "Establishment ({}): {}",
        result.establishment,
        fmt_scope_rank(Some(&result.establishment_rank))
    );
    let _ = writeln!(
        output,
        "Region ({}): {}",
        result.region.as_deref().unwrap_or("-"),
        fmt_scope_rank(result.region_rank.as_ref())
    );
    let _ = writeln!(
        output,
        "National: {}",
        fmt_scope_rank(Some(&result.national_rank))
    );
    output
}

fn write_categories(output: &mut String, groups: &[CategoryStats]) {
    if groups.is_empty() {
        let _ = writeln!(output, "No students recorded.");
        return;
    }
    let _ = writeln!(output, "| Name | Students | Admitted | Rate |");
    let _ = writeln!(output, "|---|---:|---:|---:|");
    for group in groups {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} |",
            group.name,
            group.total,
            group.admitted,
            fmt_rate(group.rate)
        );
    }
}

fn write_establishments(output: &mut String, establishments: &[EstablishmentStats]) {
    if establishments.is_empty() {
        let _ = writeln!(output, "No establishment is large enough to be ranked.");
        return;
    }
    for school in establishments {
        let _ = writeln!(
            output,
            "- {}: {} of {} admitted ({}), average {}",
            school.name,
            school.admitted_students,
            school.total_students,
            fmt_rate(school.success_rate),
            fmt_score(school.average_score)
        );
    }
}

pub fn render_statistics(stats: &StatisticsResult) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Students: {}", stats.total_students);
    let _ = writeln!(
        output,
        "Admitted: {} ({})",
        stats.admitted_students,
        fmt_rate(stats.admission_rate)
    );
    let _ = writeln!(
        output,
        "Sessionnaires: {}",
        stats
            .sessionnaire_rate
            .map(fmt_rate)
            .unwrap_or_else(|| "not applicable".to_string())
    );
    let _ = writeln!(output, "Average: {}", fmt_score(stats.average_score));
    if let Some(sections) = &stats.section_stats {
        let _ = writeln!(output);
        let _ = writeln!(output, "Sections:");
        write_categories(&mut output, sections);
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "Regions:");
    write_categories(&mut output, &stats.region_stats);
    output
}

pub fn render_enhanced(enhanced: &EnhancedStatistics) -> String {
    let mut output = String::new();
    let basic = &enhanced.basic;
    let _ = writeln!(output, "Students: {}", basic.total_students);
    let _ = writeln!(
        output,
        "Admitted: {} ({})",
        basic.admitted_students,
        fmt_rate(basic.admission_rate)
    );
    let _ = writeln!(output, "Average: {}", fmt_score(basic.average_score));
    if !enhanced.section_stats.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "Sections:");
        write_categories(&mut output, &enhanced.section_stats);
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "Regions by admission rate:");
    write_categories(&mut output, &enhanced.region_stats);
    let _ = writeln!(output);
    let _ = writeln!(output, "Top establishments:");
    write_establishments(&mut output, &enhanced.top_establishments);
    let _ = writeln!(output);
    let _ = writeln!(output, "Bottom establishments:");
    write_establishments(&mut output, &enhanced.bottom_establishments);
    output
}

fn write_students(output: &mut String, students: &[StudentRecord]) {
    for (idx, student) in students.iter().enumerate() {
        let _ = writeln!(
            output,
            "{}. {} ({}, {}) {}",
            idx + 1,
            student.full_name,
            student.matricule,
            student.establishment,
            fmt_score(student.average)
        );
    }
}

pub fn render_leaderboard(board: &Leaderboard) -> String {
    let mut output = String::new();
    match board {
        Leaderboard::National(students) => {
            if students.is_empty() {
                let _ = writeln!(output, "No admitted students.");
            }
            write_students(&mut output, students);
        }
        Leaderboard::BySection(sections) => {
            for section in sections {
                let _ = writeln!(
                    output,
                    "== {} ({} students, {} admitted, {}, average {})",
                    section.section,
                    section.summary.total,
                    section.summary.admitted,
                    fmt_rate(section.summary.admission_rate),
                    fmt_score(section.summary.average_score)
                );
                write_students(&mut output, &section.students);
            }
        }
    }
    output
}

pub fn render_regions(directory: &BTreeMap<String, Vec<String>>) -> String {
    let mut output = String::new();
    for (region, establishments) in directory {
        let _ = writeln!(output, "{region} ({})", establishments.len());
        for establishment in establishments {
            let _ = writeln!(output, "  - {establishment}");
        }
    }
    output
}

pub fn build_report(
    scope: &ExamScope,
    generated_on: NaiveDate,
    stats: &StatisticsResult,
    enhanced: &EnhancedStatistics,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Exam Results Report");
    let _ = writeln!(
        output,
        "Generated for {} on {}",
        scope_label(scope),
        generated_on
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Headline");

    if stats.total_students == 0 {
        let _ = writeln!(output, "No results published for this scope.");
        return output;
    }

    let _ = writeln!(output, "- Candidates: {}", stats.total_students);
    let _ = writeln!(
        output,
        "- Admitted: {} ({})",
        stats.admitted_students,
        fmt_rate(stats.admission_rate)
    );
    if let Some(rate) = stats.sessionnaire_rate {
        let _ = writeln!(output, "- Sessionnaires: {}", fmt_rate(rate));
    }
    let _ = writeln!(output, "- Average: {}", fmt_score(stats.average_score));

    if let Some(sections) = &stats.section_stats {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Sections");
        write_categories(&mut output, sections);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Regions");
    write_categories(&mut output, &enhanced.region_stats);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Strongest Establishments");
    write_establishments(&mut output, &enhanced.top_establishments);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Establishments Needing Support");
    write_establishments(&mut output, &enhanced.bottom_establishments);

    output
}
