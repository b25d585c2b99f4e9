//! CSV course source reader.
//!
//! Catalog exports are frequently saved from spreadsheet tools in
//! Windows-1252, so bytes that are not valid UTF-8 are decoded as such.

use std::collections::HashMap;
use std::path::Path;

use coursepilot_shared::{CoursePilotError, CourseRecord, Result};
use csv::StringRecord;
use encoding_rs::WINDOWS_1252;
use tracing::{debug, info, instrument, warn};

/// Column headers of the raw course export.
pub const SUBJECT_COLUMN: &str = "Subject";
pub const TITLE_COLUMN: &str = "Course Title";
pub const CATALOG_NUMBER_COLUMN: &str = "Catalog Number";
pub const COURSE_TYPE_COLUMN: &str = "Course Type";
pub const DESCRIPTION_COLUMN: &str = "Description";
pub const GRADING_COLUMN: &str = "Grading";
pub const PREREQUISITES_COLUMN: &str = "Prerequisites";
pub const KEYWORDS_COLUMN: &str = "Keywords";

const ALL_COLUMNS: [&str; 8] = [
    SUBJECT_COLUMN,
    TITLE_COLUMN,
    CATALOG_NUMBER_COLUMN,
    COURSE_TYPE_COLUMN,
    DESCRIPTION_COLUMN,
    GRADING_COLUMN,
    PREREQUISITES_COLUMN,
    KEYWORDS_COLUMN,
];

/// Read every course row from the CSV file at `path`.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_records(path: &Path) -> Result<Vec<CourseRecord>> {
    let bytes = std::fs::read(path).map_err(|e| CoursePilotError::io(path, e))?;
    let records = parse_records(&bytes)?;
    info!(count = records.len(), "read course records");
    Ok(records)
}

/// Parse course rows from raw CSV bytes.
///
/// Missing columns produce `None` fields rather than errors. Rows the CSV
/// reader cannot parse are logged and skipped.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<CourseRecord>> {
    let text = decode(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| CoursePilotError::parse(format!("failed to read CSV header: {e}")))?
        .clone();
    let columns = ColumnIndex::new(&headers);

    let missing = columns.missing();
    if !missing.is_empty() {
        debug!(?missing, "course source lacks columns, treating them as empty");
    }

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        match result {
            Ok(record) => records.push(columns.to_course(&record)),
            Err(e) => {
                // Header is line 1, first data row is line 2.
                warn!(line = row + 2, error = %e, "unreadable CSV row, skipping");
            }
        }
    }

    Ok(records)
}

/// Decode as UTF-8 when valid, otherwise as Windows-1252. Strips a UTF-8 BOM.
fn decode(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            debug!("course source is not UTF-8, decoded as Windows-1252");
            decoded.into_owned()
        }
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Maps known header names to their position in the row.
struct ColumnIndex {
    positions: HashMap<&'static str, usize>,
}

impl ColumnIndex {
    fn new(headers: &StringRecord) -> Self {
        let mut positions = HashMap::new();
        for (idx, header) in headers.iter().enumerate() {
            let header = header.trim();
            if let Some(known) = ALL_COLUMNS.iter().find(|c| **c == header) {
                positions.entry(*known).or_insert(idx);
            }
        }
        Self { positions }
    }

    fn missing(&self) -> Vec<&'static str> {
        ALL_COLUMNS
            .iter()
            .filter(|c| !self.positions.contains_key(*c))
            .copied()
            .collect()
    }

    fn field(&self, record: &StringRecord, column: &str) -> Option<String> {
        let idx = *self.positions.get(column)?;
        record.get(idx).map(str::to_string)
    }

    fn to_course(&self, record: &StringRecord) -> CourseRecord {
        CourseRecord {
            subject: self.field(record, SUBJECT_COLUMN),
            title: self.field(record, TITLE_COLUMN),
            catalog_number: self.field(record, CATALOG_NUMBER_COLUMN),
            course_type: self.field(record, COURSE_TYPE_COLUMN),
            description: self.field(record, DESCRIPTION_COLUMN),
            keywords: self.field(record, KEYWORDS_COLUMN),
            grading: self.field(record, GRADING_COLUMN),
            prerequisites: self.field(record, PREREQUISITES_COLUMN),
        }
    }
}
