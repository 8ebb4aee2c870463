//! CSV persistence for grade and plan tables.
//!
//! Files are UTF-8 with a byte-order mark so spreadsheet applications pick the
//! right encoding for the Chinese headers. Column order is the header order
//! given at write time.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::domain::{Course, fields};
use crate::error::AppError;
use crate::extract::table::coerce;
use crate::report::gpa::aggregate_gpa;

const BOM: &str = "\u{feff}";

/// Fields re-coerced to numbers when a grade snapshot is read back.
pub const SNAPSHOT_NUMERIC_FIELDS: &[&str] = &[fields::CREDIT, fields::GRADE_POINT];

/// Previously saved grades plus their aggregate GPA.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeSnapshot {
    pub headers: Vec<String>,
    pub courses: Vec<Course>,
    pub gpa: f64,
}

impl GradeSnapshot {
    pub fn from_courses(headers: Vec<String>, courses: Vec<Course>) -> Self {
        let gpa = aggregate_gpa(&courses);
        Self { headers, courses, gpa }
    }
}

/// Write `courses` to `path` with the given column order.
///
/// When `headers` is empty the first course's keys are used. Parent
/// directories are created.
pub fn save_table(path: &Path, headers: &[String], courses: &[Course]) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            AppError::new(4, format!("Failed to create directory '{}': {e}", parent.display()))
        })?;
    }

    let derived: Vec<String>;
    let headers = if headers.is_empty() {
        derived = courses
            .first()
            .map(|c| c.keys().map(str::to_string).collect())
            .unwrap_or_default();
        &derived
    } else {
        headers
    };

    let mut file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create CSV '{}': {e}", path.display())))?;
    file.write_all(BOM.as_bytes())
        .map_err(|e| AppError::new(4, format!("Failed to write CSV '{}': {e}", path.display())))?;

    let mut writer = csv::Writer::from_writer(file);
    writer
        .write_record(headers)
        .map_err(|e| AppError::new(4, format!("Failed to write CSV header: {e}")))?;
    for course in courses {
        writer
            .write_record(headers.iter().map(|h| course.text(h)))
            .map_err(|e| AppError::new(4, format!("Failed to write CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush CSV '{}': {e}", path.display())))?;

    tracing::info!(path = %path.display(), rows = courses.len(), "saved table");
    Ok(())
}

/// Read a table written by [`save_table`], coercing `numeric_fields`.
pub fn load_table(path: &Path, numeric_fields: &[&str]) -> Result<(Vec<String>, Vec<Course>), AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read CSV '{}': {e}", path.display())))?;
    let text = text.strip_prefix(BOM).unwrap_or(&text);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers '{}': {e}", path.display())))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut courses = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            AppError::new(2, format!("Invalid CSV row {} in '{}': {e}", idx + 2, path.display()))
        })?;
        let mut course = Course::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            course.insert(header.clone(), coerce(header, value.trim().to_string(), numeric_fields));
        }
        courses.push(course);
    }

    Ok((headers, courses))
}

/// Load the grade snapshot at `path`; a missing file is an empty snapshot.
pub fn load_snapshot(path: &Path) -> Result<GradeSnapshot, AppError> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "no previous snapshot");
        return Ok(GradeSnapshot::default());
    }
    let (headers, courses) = load_table(path, SNAPSHOT_NUMERIC_FIELDS)?;
    Ok(GradeSnapshot::from_courses(headers, courses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CellValue;

    fn headers() -> Vec<String> {
        vec!["课程名称", "学分", "总评成绩", "绩点"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn round_trip_preserves_header_order_and_recoerces_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("grades.csv");
        let courses = vec![
            Course::new()
                .with("课程名称", "数据结构, 上")
                .with("学分", 3.0)
                .with("总评成绩", 92.0)
                .with("绩点", 4.2),
            Course::new().with("课程名称", "体育").with("学分", 1.0).with("总评成绩", "优"),
        ];

        save_table(&path, &headers(), &courses).unwrap();
        let raw = fs::read(&path).unwrap();
        assert!(raw.starts_with(BOM.as_bytes()));

        let snapshot = load_snapshot(&path).unwrap();
        assert_eq!(snapshot.headers, headers());
        assert_eq!(snapshot.courses.len(), 2);
        let first = &snapshot.courses[0];
        assert_eq!(first.text("课程名称"), "数据结构, 上");
        assert_eq!(first.get("学分"), Some(&CellValue::Number(3.0)));
        assert_eq!(first.get("绩点"), Some(&CellValue::Number(4.2)));
        // Scores are not re-coerced but keep the same display text.
        assert_eq!(first.get("总评成绩"), Some(&CellValue::from("92")));
        assert_eq!(snapshot.courses[1].get("绩点"), Some(&CellValue::from("")));
        assert!((snapshot.gpa - 4.2).abs() < 1e-9);
    }

    #[test]
    fn missing_file_is_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = load_snapshot(&dir.path().join("none.csv")).unwrap();
        assert!(snapshot.courses.is_empty());
        assert_eq!(snapshot.gpa, 0.0);
    }

    #[test]
    fn empty_headers_fall_back_to_course_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.csv");
        save_table(&path, &[], &[Course::new().with("b", "2").with("a", "1")]).unwrap();
        let (headers, courses) = load_table(&path, &[]).unwrap();
        assert_eq!(headers, vec!["a", "b"]);
        assert_eq!(courses[0].text("b"), "2");
    }
}
