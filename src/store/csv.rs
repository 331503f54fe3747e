use std::io;
use std::path::Path;

use crate::error::StoreError;
use crate::models::StudentRecord;

pub fn read_records(path: &Path) -> Result<Vec<StudentRecord>, StoreError> {
    let reader = csv::Reader::from_path(path)?;
    collect(reader)
}

pub fn read_records_from<R: io::Read>(input: R) -> Result<Vec<StudentRecord>, StoreError> {
    collect(csv::Reader::from_reader(input))
}

fn collect<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<StudentRecord>, StoreError> {
    let mut records = Vec::new();
    for (line, result) in reader.deserialize::<StudentRecord>().enumerate() {
        let record = result?;
        record
            .exam_type
            .profile()
            .check_session(record.session_type)
            .map_err(|e| StoreError::Corrupt(format!("row {}: {e}", line + 1)))?;
        records.push(record);
    }
    Ok(records)
}
