use std::path::Path;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{ExamType, SessionType, StudentKey, StudentRecord};
use crate::store::{self, ExamScope, LocationQuery, ScopeFilter, SectionFilter, StudentStore};

const COLUMNS: &str = "matricule, full_name, average, decision_text, admitted, section, \
     establishment, region, sub_region, year, exam_type, session_type";

pub async fn init_db(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> Result<usize, StoreError> {
    PgStudentStore::new(pool.clone())
        .upsert_many(&seed_records())
        .await
}

pub async fn import_csv(pool: &PgPool, csv_path: &Path) -> Result<usize, StoreError> {
    let records = store::csv::read_records(csv_path)?;
    info!(rows = records.len(), path = %csv_path.display(), "importing results");
    PgStudentStore::new(pool.clone()).upsert_many(&records).await
}

#[derive(Debug, Clone)]
pub struct PgStudentStore {
    pool: PgPool,
}

impl PgStudentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_scope(query: &mut QueryBuilder<'_, Postgres>, scope: &ExamScope) {
    query
        .push(" WHERE year = ")
        .push_bind(scope.year())
        .push(" AND exam_type = ")
        .push_bind(scope.exam_type().as_str());
    match scope.session_type() {
        Some(session) => {
            query.push(" AND session_type = ").push_bind(session.as_str());
        }
        None => {
            query.push(" AND session_type IS NULL");
        }
    }
}

fn push_optional(query: &mut QueryBuilder<'_, Postgres>, column: &str, value: &Option<String>) {
    if let Some(value) = value {
        query
            .push(format!(" AND {column} = "))
            .push_bind(value.clone());
    }
}

fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &ScopeFilter) {
    push_optional(query, "establishment", &filter.establishment);
    push_optional(query, "region", &filter.region);
    match &filter.section {
        SectionFilter::Any => {}
        SectionFilter::Equals(section) => {
            query.push(" AND section = ").push_bind(section.clone());
        }
        SectionFilter::Missing => {
            query.push(" AND (section IS NULL OR btrim(section) = '')");
        }
    }
}

fn record_from_row(row: &PgRow) -> Result<StudentRecord, StoreError> {
    let exam_type: String = row.try_get("exam_type")?;
    let session_type: Option<String> = row.try_get("session_type")?;

    let exam_type = exam_type
        .parse::<ExamType>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let session_type = session_type
        .map(|s| s.parse::<SessionType>())
        .transpose()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;

    Ok(StudentRecord {
        matricule: row.try_get("matricule")?,
        full_name: row.try_get("full_name")?,
        average: row.try_get("average")?,
        decision_text: row.try_get("decision_text")?,
        admitted: row.try_get("admitted")?,
        section: row.try_get("section")?,
        establishment: row.try_get("establishment")?,
        region: row.try_get("region")?,
        sub_region: row.try_get("sub_region")?,
        year: row.try_get("year")?,
        exam_type,
        session_type,
    })
}

#[async_trait]
impl StudentStore for PgStudentStore {
    async fn find_one(&self, key: &StudentKey) -> Result<Option<StudentRecord>, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COLUMNS} FROM exam_results.students"
        ));
        query
            .push(" WHERE matricule = ")
            .push_bind(key.matricule.clone())
            .push(" AND year = ")
            .push_bind(key.year)
            .push(" AND exam_type = ")
            .push_bind(key.exam_type.as_str());
        match key.session_type {
            Some(session) => {
                query.push(" AND session_type = ").push_bind(session.as_str());
            }
            None => {
                query.push(" AND session_type IS NULL");
            }
        }

        let row = query.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn find_by_location(
        &self,
        scope: &ExamScope,
        location: &LocationQuery,
    ) -> Result<Option<StudentRecord>, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COLUMNS} FROM exam_results.students"
        ));
        push_scope(&mut query, scope);
        push_optional(&mut query, "full_name", &location.full_name);
        push_optional(&mut query, "establishment", &location.establishment);
        push_optional(&mut query, "region", &location.region);
        push_optional(&mut query, "sub_region", &location.sub_region);
        query.push(" ORDER BY matricule LIMIT 1");

        let row = query.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn list_by_scope(
        &self,
        scope: &ExamScope,
        filter: &ScopeFilter,
    ) -> Result<Vec<StudentRecord>, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COLUMNS} FROM exam_results.students"
        ));
        push_scope(&mut query, scope);
        push_filter(&mut query, filter);
        query.push(" ORDER BY matricule");

        let rows = query.build().fetch_all(&self.pool).await?;
        debug!(rows = rows.len(), ?filter, "listed scope population");
        rows.iter().map(record_from_row).collect()
    }

    async fn count(&self, scope: &ExamScope, filter: &ScopeFilter) -> Result<usize, StoreError> {
        let mut query =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS total FROM exam_results.students");
        push_scope(&mut query, scope);
        push_filter(&mut query, filter);

        let total: i64 = query.build().fetch_one(&self.pool).await?.try_get("total")?;
        Ok(total.max(0) as usize)
    }

    async fn upsert_many(&self, records: &[StudentRecord]) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0usize;

        for record in records {
            let result = sqlx::query(
                r#"
                INSERT INTO exam_results.students
                (id, matricule, full_name, average, decision_text, admitted, section,
                 establishment, region, sub_region, year, exam_type, session_type)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ON CONFLICT (matricule, year, exam_type, session_type) DO UPDATE
                SET full_name = EXCLUDED.full_name,
                    average = EXCLUDED.average,
                    decision_text = EXCLUDED.decision_text,
                    admitted = EXCLUDED.admitted,
                    section = EXCLUDED.section,
                    establishment = EXCLUDED.establishment,
                    region = EXCLUDED.region,
                    sub_region = EXCLUDED.sub_region
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&record.matricule)
            .bind(&record.full_name)
            .bind(record.average)
            .bind(&record.decision_text)
            .bind(record.admitted)
            .bind(&record.section)
            .bind(&record.establishment)
            .bind(&record.region)
            .bind(&record.sub_region)
            .bind(record.year)
            .bind(record.exam_type.as_str())
            .bind(record.session_type.map(|s| s.as_str()))
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() > 0 {
                written += 1;
            }
        }

        tx.commit().await?;
        Ok(written)
    }
}

pub fn seed_records() -> Vec<StudentRecord> {
    let bac = |matricule: &str,
               name: &str,
               average: f64,
               section: &str,
               establishment: &str,
               region: &str| {
        let admitted = average >= 10.0;
        StudentRecord {
            matricule: matricule.to_string(),
            full_name: name.to_string(),
            average,
            decision_text: if admitted { "Admis" } else if average >= 8.0 { "Sessionnaire" } else { "Ajourne" }
                .to_string(),
            admitted,
            section: Some(section.to_string()),
            establishment: establishment.to_string(),
            region: Some(region.to_string()),
            sub_region: None,
            year: 2025,
            exam_type: ExamType::Bac,
            session_type: Some(SessionType::Normale),
        }
    };

    let mut records = vec![
        bac("10231", "Aicha Mint Ahmed", 15.42, "SN", "Lycee d'Excellence 1", "Nouakchott Ouest"),
        bac("10232", "Mohamed Lemine Sidi", 15.418, "SN", "Lycee d'Excellence 1", "Nouakchott Ouest"),
        bac("10233", "Fatimetou Cheikh", 11.06, "SN", "Lycee de Rosso", "Trarza"),
        bac("10234", "Ahmed Salem Ould Brahim", 9.12, "SN", "Lycee de Rosso", "Trarza"),
        bac("10235", "Mariem Ba", 13.75, "M", "Lycee d'Excellence 1", "Nouakchott Ouest"),
        bac("10236", "Oumar Sy", 7.4, "M", "Lycee de Kaedi", "Gorgol"),
        bac("10237", "Khadijetou Diallo", 12.31, "LM", "Lycee de Kaedi", "Gorgol"),
    ];

    for (matricule, name, average, establishment, region) in [
        ("B501", "Salka Mint Bouh", 14.5, "CEM Teyarett", "Nouakchott Nord"),
        ("B502", "Yahya Ould Cheikh", 9.75, "CEM Teyarett", "Nouakchott Nord"),
        ("B503", "Aminata Kane", 12.0, "CEM Aleg", "Brakna"),
    ] {
        records.push(StudentRecord {
            matricule: matricule.to_string(),
            full_name: name.to_string(),
            average,
            decision_text: if average >= 10.0 { "Admis" } else { "Ajourne" }.to_string(),
            admitted: average >= 10.0,
            section: None,
            establishment: establishment.to_string(),
            region: Some(region.to_string()),
            sub_region: None,
            year: 2025,
            exam_type: ExamType::Brevet,
            session_type: None,
        });
    }

    records
}
