use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExamType {
    Bac,
    Brevet,
    Concours,
    Excellence,
    Other,
}

impl ExamType {
    pub const ALL: [ExamType; 5] = [
        ExamType::Bac,
        ExamType::Brevet,
        ExamType::Concours,
        ExamType::Excellence,
        ExamType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExamType::Bac => "BAC",
            ExamType::Brevet => "BREVET",
            ExamType::Concours => "CONCOURS",
            ExamType::Excellence => "EXCELLENCE",
            ExamType::Other => "OTHER",
        }
    }
}

impl fmt::Display for ExamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExamType {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        ExamType::ALL
            .into_iter()
            .find(|exam| exam.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| {
                EngineError::InvalidScopeConfiguration(format!("unknown exam type `{value}`"))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionType {
    Normale,
    Complementaire,
}

impl SessionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Normale => "NORMALE",
            SessionType::Complementaire => "COMPLEMENTAIRE",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "NORMALE" => Ok(SessionType::Normale),
            "COMPLEMENTAIRE" => Ok(SessionType::Complementaire),
            _ => Err(EngineError::InvalidScopeConfiguration(format!(
                "unknown session type `{value}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub matricule: String,
    pub full_name: String,
    pub average: f64,
    #[serde(default)]
    pub decision_text: String,
    pub admitted: bool,
    pub section: Option<String>,
    pub establishment: String,
    pub region: Option<String>,
    pub sub_region: Option<String>,
    pub year: i32,
    pub exam_type: ExamType,
    pub session_type: Option<SessionType>,
}

impl StudentRecord {
    pub fn key(&self) -> StudentKey {
        StudentKey {
            matricule: self.matricule.clone(),
            year: self.year,
            exam_type: self.exam_type,
            session_type: self.session_type,
        }
    }

    pub fn region_name(&self) -> Option<&str> {
        non_blank(self.region.as_deref())
    }

    pub fn section_name(&self) -> Option<&str> {
        non_blank(self.section.as_deref())
    }

    /// Compound identity used when the matricule alone is not unique.
    pub fn same_location_identity(&self, other: &StudentRecord) -> bool {
        self.matricule == other.matricule
            && self.full_name == other.full_name
            && self.establishment == other.establishment
            && self.region == other.region
            && self.sub_region == other.sub_region
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StudentKey {
    pub matricule: String,
    pub year: i32,
    pub exam_type: ExamType,
    pub session_type: Option<SessionType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankScope {
    Establishment,
    Region,
    Nation,
}

impl fmt::Display for RankScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RankScope::Establishment => "establishment",
            RankScope::Region => "region",
            RankScope::Nation => "nation",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeRank {
    pub scope: RankScope,
    pub rank: Option<usize>,
    pub total: usize,
}

impl ScopeRank {
    pub fn position(&self) -> Result<usize, EngineError> {
        self.rank
            .ok_or(EngineError::TargetNotInScope { scope: self.scope })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankResult {
    pub matricule: String,
    pub full_name: String,
    pub average: f64,
    pub comparison_score: f64,
    pub section: Option<String>,
    pub establishment: String,
    pub region: Option<String>,
    pub establishment_rank: ScopeRank,
    /// Absent when the target has no region: not applicable, not last place.
    pub region_rank: Option<ScopeRank>,
    pub national_rank: ScopeRank,
}

impl RankResult {
    pub fn scopes(&self) -> impl Iterator<Item = &ScopeRank> {
        std::iter::once(&self.establishment_rank)
            .chain(self.region_rank.iter())
            .chain(std::iter::once(&self.national_rank))
    }

    pub fn missing_scopes(&self) -> Vec<RankScope> {
        self.scopes()
            .filter(|scope| scope.rank.is_none())
            .map(|scope| scope.scope)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub name: String,
    pub total: usize,
    pub admitted: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsResult {
    pub exam_type: ExamType,
    pub total_students: usize,
    pub admitted_students: usize,
    pub admission_rate: f64,
    pub sessionnaire_rate: Option<f64>,
    pub average_score: f64,
    pub section_stats: Option<Vec<CategoryStats>>,
    pub region_stats: Vec<CategoryStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstablishmentStats {
    pub name: String,
    pub total_students: usize,
    pub admitted_students: usize,
    pub success_rate: f64,
    pub average_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicStats {
    pub total_students: usize,
    pub admitted_students: usize,
    pub admission_rate: f64,
    pub average_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedStatistics {
    pub exam_type: ExamType,
    pub basic: BasicStats,
    pub top_establishments: Vec<EstablishmentStats>,
    pub bottom_establishments: Vec<EstablishmentStats>,
    pub section_stats: Vec<CategoryStats>,
    pub region_stats: Vec<CategoryStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub total: usize,
    pub admitted: usize,
    pub admission_rate: f64,
    pub average_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionLeaderboard {
    pub section: String,
    pub students: Vec<StudentRecord>,
    pub summary: SectionSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Leaderboard {
    BySection(Vec<SectionLeaderboard>),
    National(Vec<StudentRecord>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exam_type_parses_case_insensitively() {
        assert_eq!("bac".parse::<ExamType>().unwrap(), ExamType::Bac);
        assert_eq!(" Concours ".parse::<ExamType>().unwrap(), ExamType::Concours);
        assert!("licence".parse::<ExamType>().is_err());
    }

    #[test]
    fn session_type_round_trips_through_display() {
        for session in [SessionType::Normale, SessionType::Complementaire] {
            assert_eq!(session.to_string().parse::<SessionType>().unwrap(), session);
        }
    }

    #[test]
    fn blank_region_is_treated_as_missing() {
        let record = StudentRecord {
            matricule: "1001".to_string(),
            full_name: "Aminata Sall".to_string(),
            average: 11.5,
            decision_text: "Admis".to_string(),
            admitted: true,
            section: Some("SN".to_string()),
            establishment: "Lycee de Rosso".to_string(),
            region: Some("  ".to_string()),
            sub_region: None,
            year: 2025,
            exam_type: ExamType::Bac,
            session_type: Some(SessionType::Normale),
        };
        assert_eq!(record.region_name(), None);
        assert_eq!(record.section_name(), Some("SN"));
    }

    #[test]
    fn missing_scope_position_is_target_not_in_scope() {
        let scope = ScopeRank {
            scope: RankScope::Region,
            rank: None,
            total: 12,
        };
        assert!(matches!(
            scope.position(),
            Err(EngineError::TargetNotInScope {
                scope: RankScope::Region
            })
        ));
    }
}
