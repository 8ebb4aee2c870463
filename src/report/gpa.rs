//! Credit-weighted GPA.

use crate::domain::{Course, fields};

/// Σ(credit·point) / Σcredit over courses with a numeric credit and grade
/// point, rounded to two decimals. `0.0` when no credits count.
pub fn aggregate_gpa(courses: &[Course]) -> f64 {
    round2(raw_gpa(courses.iter()))
}

/// GPA with every course minus GPA without course `index`.
///
/// Positive means the course pulls the average up.
pub fn gpa_impact(courses: &[Course], index: usize) -> f64 {
    if index >= courses.len() || weighted(&courses[index]).is_none() {
        return 0.0;
    }
    let with = raw_gpa(courses.iter());
    let without = raw_gpa(
        courses
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, c)| c),
    );
    round2(with - without)
}

fn raw_gpa<'a>(courses: impl Iterator<Item = &'a Course>) -> f64 {
    let (points, credits) = courses
        .filter_map(weighted)
        .fold((0.0, 0.0), |(p, c), (credit, point)| (p + credit * point, c + credit));
    if credits > 0.0 { points / credits } else { 0.0 }
}

fn weighted(course: &Course) -> Option<(f64, f64)> {
    let credit = course.number(fields::CREDIT)?;
    let point = course.number(fields::GRADE_POINT)?;
    (credit.is_finite() && point.is_finite()).then_some((credit, point))
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(credit: impl Into<crate::domain::CellValue>, point: impl Into<crate::domain::CellValue>) -> Course {
        Course::new()
            .with(fields::CREDIT, credit)
            .with(fields::GRADE_POINT, point)
    }

    #[test]
    fn weighted_average() {
        let courses = vec![course(3.0, 4.0), course(2.0, 3.0)];
        assert!((aggregate_gpa(&courses) - 3.6).abs() < 1e-9);
    }

    #[test]
    fn blank_or_missing_values_are_excluded() {
        let courses = vec![
            course(3.0, 4.0),
            course(2.0, ""),
            course("", 1.0),
            Course::new().with(fields::CREDIT, 5.0),
            course(1.0, "通过"),
        ];
        assert!((aggregate_gpa(&courses) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn numeric_text_counts() {
        let courses = vec![course("2", "3.5")];
        assert!((aggregate_gpa(&courses) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn no_credits_is_zero() {
        assert_eq!(aggregate_gpa(&[]), 0.0);
        assert_eq!(aggregate_gpa(&[course(0.0, 4.0)]), 0.0);
    }

    #[test]
    fn rounds_to_two_decimals() {
        let courses = vec![course(1.0, 4.0), course(2.0, 3.0)];
        assert_eq!(aggregate_gpa(&courses), 3.33);
    }

    #[test]
    fn impact_of_each_course() {
        let courses = vec![course(3.0, 4.0), course(2.0, 3.0), course(1.0, "")];
        // 3.6 with both; 3.0 without the first, 4.0 without the second.
        assert_eq!(gpa_impact(&courses, 0), 0.6);
        assert_eq!(gpa_impact(&courses, 1), -0.4);
        assert_eq!(gpa_impact(&courses, 2), 0.0);
        assert_eq!(gpa_impact(&courses, 9), 0.0);
    }
}
