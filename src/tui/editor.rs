//! In-memory grade book behind the editor screen.
//!
//! All edits happen here so they can be tested without a terminal.

use std::cmp::Ordering;
use std::path::Path;

use crate::domain::{CellValue, Course, fields};
use crate::error::AppError;
use crate::io::snapshot::save_table;
use crate::report::{aggregate_gpa, gpa_impact};

/// Score text for courses added by hand.
pub const PLACEHOLDER_SCORE: &str = "无";
pub const MAX_GRADE_POINT: f64 = 5.0;

/// Columns shown by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Id,
    Name,
    Credit,
    Score,
    Point,
    Weighted,
    Impact,
}

impl Column {
    pub const ALL: [Column; 7] = [
        Column::Id,
        Column::Name,
        Column::Credit,
        Column::Score,
        Column::Point,
        Column::Weighted,
        Column::Impact,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Column::Id => fields::COURSE_ID,
            Column::Name => fields::COURSE_NAME,
            Column::Credit => fields::CREDIT,
            Column::Score => fields::SCORE,
            Column::Point => fields::GRADE_POINT,
            Column::Weighted => "学分绩",
            Column::Impact => "GPA影响",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, Column::Credit | Column::Point | Column::Weighted | Column::Impact)
    }
}

/// One rendered editor row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub id: String,
    pub name: String,
    pub credit: f64,
    pub score: String,
    pub point: f64,
    pub weighted: f64,
    pub impact: f64,
}

impl Row {
    pub fn cell(&self, column: Column) -> String {
        match column {
            Column::Id => self.id.clone(),
            Column::Name => self.name.clone(),
            Column::Credit => format!("{}", self.credit),
            Column::Score => self.score.clone(),
            Column::Point => format!("{}", self.point),
            Column::Weighted => format!("{:.2}", self.weighted),
            Column::Impact if self.impact == 0.0 => "0.00".to_string(),
            Column::Impact => format!("{:+.2}", self.impact),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GradeBook {
    headers: Vec<String>,
    courses: Vec<Course>,
    plan: Vec<Course>,
    sort: Option<(Column, bool)>,
}

impl GradeBook {
    pub fn new(headers: Vec<String>, courses: Vec<Course>, plan: Vec<Course>) -> Self {
        Self {
            headers,
            courses,
            plan,
            sort: None,
        }
    }

    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn plan(&self) -> &[Course] {
        &self.plan
    }

    pub fn sort_state(&self) -> Option<(Column, bool)> {
        self.sort
    }

    pub fn gpa(&self) -> f64 {
        aggregate_gpa(&self.courses)
    }

    pub fn total_credits(&self) -> f64 {
        self.courses
            .iter()
            .filter(|c| c.number(fields::GRADE_POINT).is_some())
            .filter_map(|c| c.number(fields::CREDIT))
            .sum()
    }

    pub fn rows(&self) -> Vec<Row> {
        (0..self.courses.len()).map(|i| self.row(i)).collect()
    }

    fn row(&self, index: usize) -> Row {
        let c = &self.courses[index];
        let credit = c.number(fields::CREDIT).unwrap_or(0.0);
        let point = c.number(fields::GRADE_POINT).unwrap_or(0.0);
        Row {
            id: c.text(fields::COURSE_ID),
            name: c.text(fields::COURSE_NAME),
            credit,
            score: c.score_text().unwrap_or_default(),
            point,
            weighted: credit * point,
            impact: gpa_impact(&self.courses, index),
        }
    }

    pub fn set_grade_point(&mut self, index: usize, input: &str) -> Result<(), String> {
        let point = parse_grade_point(input)?;
        let course = self.courses.get_mut(index).ok_or("no course selected")?;
        course.insert(fields::GRADE_POINT, point);
        Ok(())
    }

    pub fn set_credit(&mut self, index: usize, input: &str) -> Result<(), String> {
        let credit = parse_credit(input)?;
        let course = self.courses.get_mut(index).ok_or("no course selected")?;
        course.insert(fields::CREDIT, credit);
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> Option<Course> {
        (index < self.courses.len()).then(|| self.courses.remove(index))
    }

    /// Add from a `id, name, credit, point` line (ASCII or full-width commas).
    pub fn add_manual(&mut self, line: &str) -> Result<(), String> {
        let parts: Vec<&str> = line.split([',', '，']).map(str::trim).collect();
        let [id, name, credit, point] = parts.as_slice() else {
            return Err("expected: id, name, credit, point".to_string());
        };
        if name.is_empty() {
            return Err("course name is required".to_string());
        }
        let credit = parse_credit(credit)?;
        let point = parse_grade_point(point)?;
        self.push_course(id, name, credit, point);
        Ok(())
    }

    /// Plan courses whose name or id contains `filter` (case-insensitive).
    pub fn plan_matches(&self, filter: &str) -> Vec<usize> {
        let needle = filter.trim().to_lowercase();
        self.plan
            .iter()
            .enumerate()
            .filter(|(_, c)| {
                needle.is_empty()
                    || c.text(fields::COURSE_NAME).to_lowercase().contains(&needle)
                    || c.text(fields::COURSE_ID).to_lowercase().contains(&needle)
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Add plan course `plan_index` with the given grade point.
    pub fn add_from_plan(&mut self, plan_index: usize, point: &str) -> Result<(), String> {
        let entry = self.plan.get(plan_index).ok_or("no plan course selected")?;
        let id = entry.text(fields::COURSE_ID);
        let name = entry.text(fields::COURSE_NAME);
        let credit = entry
            .number(fields::PLAN_CREDIT)
            .filter(|c| *c > 0.0)
            .ok_or_else(|| format!("plan course '{name}' has no credit"))?;
        let point = parse_grade_point(point)?;
        self.push_course(&id, &name, credit, point);
        Ok(())
    }

    /// New rows mirror the columns of existing ones, filled with the placeholder.
    fn push_course(&mut self, id: &str, name: &str, credit: f64, point: f64) {
        let mut course = Course::new();
        match self.courses.first() {
            Some(template) => {
                for key in template.keys() {
                    course.insert(key, PLACEHOLDER_SCORE);
                }
            }
            None => course.insert(fields::SCORE, PLACEHOLDER_SCORE),
        }
        course.insert(fields::COURSE_ID, id);
        course.insert(fields::COURSE_NAME, name);
        course.insert(fields::CREDIT, credit);
        course.insert(fields::GRADE_POINT, point);
        self.courses.push(course);
        tracing::debug!(name, credit, point, "course added");
    }

    /// Sort by `column`; sorting by the same column again flips the order.
    pub fn sort_by(&mut self, column: Column) {
        let descending = matches!(self.sort, Some((c, desc)) if c == column && !desc);
        let rows = self.rows();

        let mut order: Vec<usize> = (0..self.courses.len()).collect();
        order.sort_by(|&a, &b| {
            let ord = if column.is_numeric() {
                numeric_key(&rows[a], column)
                    .partial_cmp(&numeric_key(&rows[b], column))
                    .unwrap_or(Ordering::Equal)
            } else {
                rows[a].cell(column).cmp(&rows[b].cell(column))
            };
            if descending { ord.reverse() } else { ord }
        });

        let mut taken: Vec<Option<Course>> = std::mem::take(&mut self.courses).into_iter().map(Some).collect();
        self.courses = order.into_iter().filter_map(|i| taken[i].take()).collect();
        self.sort = Some((column, descending));
    }

    /// Write the edited table, keeping the loaded column order.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        let mut headers = self.headers.clone();
        if headers.is_empty() {
            headers = [fields::COURSE_ID, fields::COURSE_NAME, fields::CREDIT, fields::SCORE, fields::GRADE_POINT]
                .map(String::from)
                .to_vec();
        }
        for course in &self.courses {
            for key in course.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.to_string());
                }
            }
        }
        save_table(path, &headers, &self.courses)
    }
}

fn numeric_key(row: &Row, column: Column) -> f64 {
    match column {
        Column::Credit => row.credit,
        Column::Point => row.point,
        Column::Weighted => row.weighted,
        Column::Impact => row.impact,
        _ => 0.0,
    }
}

fn parse_number(input: &str, what: &str) -> Result<f64, String> {
    CellValue::from(input)
        .as_f64()
        .ok_or_else(|| format!("{what} must be a number"))
}

fn parse_grade_point(input: &str) -> Result<f64, String> {
    let point = parse_number(input, "grade point")?;
    if !(0.0..=MAX_GRADE_POINT).contains(&point) {
        return Err(format!("grade point must be between 0.0 and {MAX_GRADE_POINT:.1}"));
    }
    Ok(point)
}

fn parse_credit(input: &str) -> Result<f64, String> {
    let credit = parse_number(input, "credit")?;
    if credit <= 0.0 {
        return Err("credit must be greater than 0".to_string());
    }
    Ok(credit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::snapshot::load_table;

    fn grade(id: &str, name: &str, credit: f64, point: f64) -> Course {
        Course::new()
            .with(fields::COURSE_ID, id)
            .with(fields::COURSE_NAME, name)
            .with(fields::CREDIT, credit)
            .with(fields::TOTAL_SCORE, "90")
            .with(fields::GRADE_POINT, point)
    }

    fn book() -> GradeBook {
        let plan = vec![
            Course::new()
                .with(fields::COURSE_ID, "B2001")
                .with(fields::COURSE_NAME, "Operating Systems")
                .with(fields::PLAN_CREDIT, 3.5),
            Course::new()
                .with(fields::COURSE_ID, "B2002")
                .with(fields::COURSE_NAME, "编译原理")
                .with(fields::PLAN_CREDIT, ""),
        ];
        GradeBook::new(
            Vec::new(),
            vec![grade("A1", "高数", 3.0, 4.0), grade("A2", "英语", 2.0, 3.0)],
            plan,
        )
    }

    #[test]
    fn rows_show_weighted_points_and_impact() {
        let rows = book().rows();
        assert_eq!(rows[0].weighted, 12.0);
        assert_eq!(rows[0].cell(Column::Impact), "+0.60");
        assert_eq!(rows[1].cell(Column::Impact), "-0.40");
        assert_eq!(rows[0].score, "90");
    }

    #[test]
    fn editing_grade_point_and_credit_updates_gpa() {
        let mut b = book();
        b.set_grade_point(1, "4").unwrap();
        assert_eq!(b.gpa(), 4.0);
        b.set_credit(0, "1").unwrap();
        assert_eq!(b.total_credits(), 3.0);
        assert!(b.set_grade_point(0, "5.5").is_err());
        assert!(b.set_credit(0, "0").is_err());
        assert!(b.set_grade_point(9, "1").is_err());
    }

    #[test]
    fn manual_add_copies_existing_columns() {
        let mut b = book();
        b.add_manual("X9， 体育 , 1, 3.5").unwrap();
        let added = &b.courses()[2];
        assert_eq!(added.text(fields::COURSE_NAME), "体育");
        assert_eq!(added.number(fields::CREDIT), Some(1.0));
        assert_eq!(added.text(fields::TOTAL_SCORE), PLACEHOLDER_SCORE);
        assert!(b.add_manual("only, three, parts").is_err());
        assert!(b.add_manual("id, name, x, 3").is_err());
    }

    #[test]
    fn plan_search_and_add() {
        let mut b = book();
        assert_eq!(b.plan_matches("operating"), vec![0]);
        assert_eq!(b.plan_matches("b200"), vec![0, 1]);
        assert_eq!(b.plan_matches(""), vec![0, 1]);

        b.add_from_plan(0, "4.5").unwrap();
        assert_eq!(b.courses()[2].number(fields::CREDIT), Some(3.5));
        assert!(b.add_from_plan(1, "4").is_err());
    }

    #[test]
    fn sort_toggles_direction() {
        let mut b = book();
        b.sort_by(Column::Point);
        assert_eq!(b.rows()[0].name, "英语");
        assert_eq!(b.sort_state(), Some((Column::Point, false)));
        b.sort_by(Column::Point);
        assert_eq!(b.rows()[0].name, "高数");
        assert_eq!(b.sort_state(), Some((Column::Point, true)));
        b.sort_by(Column::Id);
        assert_eq!(b.rows()[0].id, "A1");
    }

    #[test]
    fn delete_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("DIY_Grade.csv");
        let mut b = book();
        assert!(b.delete(0).is_some());
        assert!(b.delete(5).is_none());
        b.save(&path).unwrap();

        let (headers, courses) = load_table(&path, &[fields::CREDIT]).unwrap();
        assert_eq!(&headers[..5], &["课程序号", "课程名称", "学分", "成绩", "绩点"]);
        assert!(headers.contains(&fields::TOTAL_SCORE.to_string()));
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].text(fields::COURSE_NAME), "英语");
    }
}
