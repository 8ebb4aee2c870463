//! Snapshot comparison.
//!
//! Courses are matched on (course name, term). A course that only exists in the
//! new list is reported as new; a matched course is reported as updated when
//! any tracked field renders differently.

use std::collections::HashMap;

use crate::domain::{Course, fields};

/// Fields compared between snapshots, in report order.
pub const TRACKED_FIELDS: &[&str] = &[
    fields::TOTAL_SCORE,
    fields::FINAL_SCORE,
    fields::GRADE_POINT,
    fields::CREDIT,
];

/// GPA movement below this is noise from rounding.
pub const GPA_EPSILON: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: &'static str,
    pub old: String,
    pub new: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GradeChange {
    NewCourse { name: String, course: Course },
    Updated { name: String, changes: Vec<FieldChange>, course: Course },
}

impl GradeChange {
    pub fn name(&self) -> &str {
        match self {
            GradeChange::NewCourse { name, .. } | GradeChange::Updated { name, .. } => name,
        }
    }
}

type CourseKey = (String, String);

fn key(course: &Course) -> CourseKey {
    (course.text(fields::COURSE_NAME), course.text(fields::TERM))
}

/// Differences from `old` to `new`, in `new` order.
///
/// Courses that disappeared are not reported.
pub fn diff_grades(old: &[Course], new: &[Course]) -> Vec<GradeChange> {
    let previous: HashMap<CourseKey, &Course> = old.iter().map(|c| (key(c), c)).collect();

    new.iter()
        .filter_map(|course| {
            let k = key(course);
            let name = k.0.clone();
            let Some(before) = previous.get(&k) else {
                return Some(GradeChange::NewCourse { name, course: course.clone() });
            };

            let changes: Vec<FieldChange> = TRACKED_FIELDS
                .iter()
                .filter_map(|&field| {
                    let old = before.text(field);
                    let new = course.text(field);
                    (old != new).then_some(FieldChange { field, old, new })
                })
                .collect();

            (!changes.is_empty()).then(|| GradeChange::Updated {
                name,
                changes,
                course: course.clone(),
            })
        })
        .collect()
}

/// Whether a check found something worth saving and reporting.
pub fn is_significant(changes: &[GradeChange], old_gpa: f64, new_gpa: f64) -> bool {
    !changes.is_empty() || (new_gpa - old_gpa).abs() > GPA_EPSILON
}
