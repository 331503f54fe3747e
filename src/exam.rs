use crate::error::EngineError;
use crate::models::{ExamType, SessionType};

pub const SESSIONNAIRE_THRESHOLD_20: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreScale {
    Twenty,
    TwoHundred,
}

impl ScoreScale {
    pub fn max(&self) -> f64 {
        match self {
            ScoreScale::Twenty => 20.0,
            ScoreScale::TwoHundred => 200.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExamProfile {
    pub exam_type: ExamType,
    pub uses_sections: bool,
    pub uses_session_type: bool,
    pub scale: ScoreScale,
    pub rounds_comparison_score: bool,
    /// False when candidates must be told apart by name and location.
    pub matricule_is_unique: bool,
    pub sessionnaire_threshold: Option<f64>,
}

const BAC: ExamProfile = ExamProfile {
    exam_type: ExamType::Bac,
    uses_sections: true,
    uses_session_type: true,
    scale: ScoreScale::Twenty,
    rounds_comparison_score: true,
    matricule_is_unique: true,
    sessionnaire_threshold: Some(SESSIONNAIRE_THRESHOLD_20),
};

const BREVET: ExamProfile = ExamProfile {
    exam_type: ExamType::Brevet,
    uses_sections: false,
    uses_session_type: false,
    scale: ScoreScale::Twenty,
    rounds_comparison_score: true,
    matricule_is_unique: true,
    sessionnaire_threshold: Some(SESSIONNAIRE_THRESHOLD_20),
};

// The 8/20 threshold never fires on a 200-point scale, so the rate is
// reported as not applicable unless a caller supplies its own threshold.
const CONCOURS: ExamProfile = ExamProfile {
    exam_type: ExamType::Concours,
    uses_sections: false,
    uses_session_type: false,
    scale: ScoreScale::TwoHundred,
    rounds_comparison_score: false,
    matricule_is_unique: false,
    sessionnaire_threshold: None,
};

const EXCELLENCE: ExamProfile = ExamProfile {
    exam_type: ExamType::Excellence,
    uses_sections: false,
    uses_session_type: false,
    scale: ScoreScale::Twenty,
    rounds_comparison_score: false,
    matricule_is_unique: true,
    sessionnaire_threshold: Some(SESSIONNAIRE_THRESHOLD_20),
};

const OTHER: ExamProfile = ExamProfile {
    exam_type: ExamType::Other,
    uses_sections: false,
    uses_session_type: false,
    scale: ScoreScale::Twenty,
    rounds_comparison_score: false,
    matricule_is_unique: true,
    sessionnaire_threshold: Some(SESSIONNAIRE_THRESHOLD_20),
};

impl ExamProfile {
    pub fn of(exam_type: ExamType) -> &'static ExamProfile {
        match exam_type {
            ExamType::Bac => &BAC,
            ExamType::Brevet => &BREVET,
            ExamType::Concours => &CONCOURS,
            ExamType::Excellence => &EXCELLENCE,
            ExamType::Other => &OTHER,
        }
    }

    pub fn check_session(&self, session: Option<SessionType>) -> Result<(), EngineError> {
        match (self.uses_session_type, session) {
            (true, None) => Err(EngineError::InvalidScopeConfiguration(format!(
                "{} requires a session type (NORMALE or COMPLEMENTAIRE)",
                self.exam_type
            ))),
            (false, Some(session)) => Err(EngineError::InvalidScopeConfiguration(format!(
                "{} has no sessions, got {session}",
                self.exam_type
            ))),
            _ => Ok(()),
        }
    }
}

impl ExamType {
    pub fn profile(&self) -> &'static ExamProfile {
        ExamProfile::of(*self)
    }
}
