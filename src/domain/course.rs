//! Header-driven course records and retrieval results.
//!
//! The portal's tables are keyed by their (Chinese) header text, and the grade
//! and plan pages expose different columns. A [`Course`] is therefore a map from
//! column name to [`CellValue`] rather than a fixed struct.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Column names the rest of the crate reads by name.
pub mod fields {
    /// Academic term (学年学期), part of the diff key.
    pub const TERM: &str = "学年学期";
    pub const COURSE_ID: &str = "课程序号";
    pub const COURSE_NAME: &str = "课程名称";
    /// Credit hours on the grade page.
    pub const CREDIT: &str = "学分";
    pub const GRADE_POINT: &str = "绩点";
    pub const USUAL_SCORE: &str = "平时成绩";
    pub const MIDTERM_SCORE: &str = "期中成绩";
    pub const FINAL_EXAM_SCORE: &str = "期末成绩";
    pub const TOTAL_SCORE: &str = "总评成绩";
    /// Final (possibly adjusted) score.
    pub const FINAL_SCORE: &str = "最终";
    /// Generic score column used by hand-curated snapshots.
    pub const SCORE: &str = "成绩";

    pub const PLAN_HOURS: &str = "课程学时";
    /// Credit hours on the plan page.
    pub const PLAN_CREDIT: &str = "学分数";
    pub const PLAN_WEEKLY_HOURS: &str = "周学时";
    pub const PLAN_ASSESSMENT: &str = "考试或考查课";
    pub const PLAN_COURSE_TYPE: &str = "课程类型";
    pub const PLAN_COURSE_GROUP: &str = "课群";
    pub const PLAN_GRADING: &str = "成绩记载方式";
}

/// A single table cell after coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Numeric view of the cell.
    ///
    /// Text cells are parsed leniently (after trimming) so that values loaded
    /// from hand-edited files still count; blank text is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) if v.is_finite() => Some(*v),
            CellValue::Number(_) => None,
            CellValue::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    t.parse::<f64>().ok().filter(|v| v.is_finite())
                }
            }
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

/// One row of a grade or plan table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Course {
    fields: BTreeMap<String, CellValue>,
}

impl Course {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&CellValue> {
        self.fields.get(field)
    }

    /// Display text of a field; empty when absent.
    pub fn text(&self, field: &str) -> String {
        self.fields.get(field).map(|v| v.to_string()).unwrap_or_default()
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.fields.get(field).and_then(CellValue::as_f64)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Best available score text: `最终`, then `总评成绩`, then `成绩`.
    pub fn score_text(&self) -> Option<String> {
        [fields::FINAL_SCORE, fields::TOTAL_SCORE, fields::SCORE]
            .iter()
            .filter_map(|f| self.get(f))
            .find(|v| !v.is_blank())
            .map(|v| v.to_string())
    }
}

/// Outcome of one table retrieval.
///
/// `count == courses.len()` always holds; `headers` fixes column order and
/// identity for CSV output and diffing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievalResult {
    pub success: bool,
    pub headers: Vec<String>,
    pub courses: Vec<Course>,
    pub count: usize,
}

impl RetrievalResult {
    pub fn new(headers: Vec<String>, courses: Vec<Course>) -> Self {
        Self {
            success: true,
            count: courses.len(),
            headers,
            courses,
        }
    }
}

/// Portal login secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_display_without_trailing_zero() {
        assert_eq!(CellValue::Number(95.0).to_string(), "95");
        assert_eq!(CellValue::Number(3.5).to_string(), "3.5");
    }

    #[test]
    fn text_cells_parse_leniently() {
        assert_eq!(CellValue::from(" 2.5 ").as_f64(), Some(2.5));
        assert_eq!(CellValue::from("无").as_f64(), None);
        assert_eq!(CellValue::from("").as_f64(), None);
    }

    #[test]
    fn score_text_prefers_final_column() {
        let c = Course::new()
            .with(fields::TOTAL_SCORE, 88.0)
            .with(fields::FINAL_SCORE, "");
        assert_eq!(c.score_text().as_deref(), Some("88"));

        let c = c.with(fields::FINAL_SCORE, "优");
        assert_eq!(c.score_text().as_deref(), Some("优"));
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials {
            username: "20210001".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[test]
    fn result_count_tracks_courses() {
        let r = RetrievalResult::new(vec!["a".into()], vec![Course::new().with("a", "x")]);
        assert!(r.success);
        assert_eq!(r.count, r.courses.len());
    }
}
