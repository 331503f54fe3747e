use crate::models::{ExamType, SessionType, StudentRecord};

pub fn student(matricule: &str, average: f64) -> StudentRecord {
    StudentRecord {
        matricule: matricule.to_string(),
        full_name: format!("Candidate {matricule}"),
        average,
        decision_text: String::new(),
        admitted: false,
        section: None,
        establishment: "Lycee National".to_string(),
        region: Some("Nouakchott Nord".to_string()),
        sub_region: None,
        year: 2025,
        exam_type: ExamType::Brevet,
        session_type: None,
    }
}

pub fn bac_student(matricule: &str, section: &str, average: f64) -> StudentRecord {
    StudentRecord {
        section: Some(section.to_string()),
        exam_type: ExamType::Bac,
        session_type: Some(SessionType::Normale),
        ..student(matricule, average)
    }
}

pub fn concours_student(matricule: &str, average: f64) -> StudentRecord {
    StudentRecord {
        exam_type: ExamType::Concours,
        sub_region: Some("Ksar".to_string()),
        ..student(matricule, average)
    }
}

pub trait RecordExt {
    fn admitted(self) -> Self;
    fn at(self, establishment: &str) -> Self;
    fn in_region(self, region: Option<&str>) -> Self;
    fn named(self, name: &str) -> Self;
}

impl RecordExt for StudentRecord {
    fn admitted(mut self) -> Self {
        self.admitted = true;
        self.decision_text = "Admis".to_string();
        self
    }

    fn at(mut self, establishment: &str) -> Self {
        self.establishment = establishment.to_string();
        self
    }

    fn in_region(mut self, region: Option<&str>) -> Self {
        self.region = region.map(str::to_string);
        self
    }

    fn named(mut self, name: &str) -> Self {
        self.full_name = name.to_string();
        self
    }
}
