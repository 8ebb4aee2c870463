//! Terminal output for grades, plans, GPA and change reports.
//!
//! Formatting lives here so retrieval and comparison code stays free of
//! presentation concerns. Column widths are measured in terminal cells since
//! most headers and course names are CJK.

use ratatui::text::Span;

use crate::domain::{Course, RetrievalResult, fields};
use crate::report::diff::GradeChange;
use crate::report::gpa::gpa_impact;

/// Columns shown for grades when the full header list is too wide.
pub const GRADE_COLUMNS: &[&str] = &[
    fields::TERM,
    fields::COURSE_NAME,
    fields::CREDIT,
    fields::TOTAL_SCORE,
    fields::FINAL_SCORE,
    fields::GRADE_POINT,
];

pub const PLAN_COLUMNS: &[&str] = &[
    fields::COURSE_ID,
    fields::COURSE_NAME,
    fields::PLAN_CREDIT,
    fields::PLAN_HOURS,
    fields::PLAN_ASSESSMENT,
    fields::PLAN_COURSE_TYPE,
];

const MAX_CELL: usize = 28;

/// Grade table followed by the aggregate GPA line.
pub fn format_grades(result: &RetrievalResult, gpa: f64) -> String {
    let mut out = format_table(&pick_columns(&result.headers, GRADE_COLUMNS), &result.courses);
    out.push_str(&format!("\n{} courses | GPA {gpa:.2}\n", result.count));
    out
}

pub fn format_plan(result: &RetrievalResult) -> String {
    let mut out = format_table(&pick_columns(&result.headers, PLAN_COLUMNS), &result.courses);
    out.push_str(&format!("\n{} courses\n", result.count));
    out
}

/// Per-course contribution to the aggregate GPA.
pub fn format_gpa_report(courses: &[Course], gpa: f64) -> String {
    let mut out = String::new();
    out.push_str(&format!("GPA: {gpa:.2} ({} courses)\n\n", courses.len()));

    let header = [fields::COURSE_NAME, fields::CREDIT, fields::GRADE_POINT, "impact"];
    let rows: Vec<Vec<String>> = courses
        .iter()
        .enumerate()
        .map(|(i, c)| {
            vec![
                c.text(fields::COURSE_NAME),
                c.text(fields::CREDIT),
                c.text(fields::GRADE_POINT),
                fmt_signed(gpa_impact(courses, i)),
            ]
        })
        .collect();
    out.push_str(&render(&header.map(String::from), &rows));
    out
}

/// Human-readable change list, also used as the email body.
pub fn format_changes(changes: &[GradeChange], old_gpa: f64, new_gpa: f64) -> String {
    let mut out = String::new();
    out.push_str("GPA:\n");
    out.push_str(&format!("- before: {old_gpa:.2}\n"));
    out.push_str(&format!("- now   : {new_gpa:.2}\n"));
    out.push_str(&format!("- delta : {}\n", fmt_signed(new_gpa - old_gpa)));

    if changes.is_empty() {
        return out;
    }

    out.push_str("\nChanges:\n");
    for change in changes {
        match change {
            GradeChange::NewCourse { name, course } => {
                out.push_str(&format!("\n[new] {name}\n"));
                out.push_str(&format!("  {}: {}\n", fields::CREDIT, or_unknown(course.text(fields::CREDIT))));
                out.push_str(&format!(
                    "  {}: {}\n",
                    fields::SCORE,
                    course.score_text().unwrap_or_else(|| "?".to_string())
                ));
                out.push_str(&format!(
                    "  {}: {}\n",
                    fields::GRADE_POINT,
                    or_unknown(course.text(fields::GRADE_POINT))
                ));
            }
            GradeChange::Updated { name, changes, .. } => {
                out.push_str(&format!("\n[updated] {name}\n"));
                for c in changes {
                    out.push_str(&format!("  {}: {} -> {}\n", c.field, or_unknown(c.old.clone()), c.new));
                }
            }
        }
    }
    out
}

/// Generic table for the given columns.
pub fn format_table(columns: &[String], courses: &[Course]) -> String {
    let rows: Vec<Vec<String>> = courses
        .iter()
        .map(|c| columns.iter().map(|h| c.text(h)).collect())
        .collect();
    render(columns, &rows)
}

/// Preferred columns that exist in `headers`; all headers when none match.
fn pick_columns(headers: &[String], preferred: &[&str]) -> Vec<String> {
    let picked: Vec<String> = preferred
        .iter()
        .filter(|p| headers.iter().any(|h| h == *p))
        .map(|p| p.to_string())
        .collect();
    if picked.is_empty() { headers.to_vec() } else { picked }
}

fn render(header: &[String], rows: &[Vec<String>]) -> String {
    let cells = |row: &[String]| -> Vec<String> { row.iter().map(|s| truncate(s, MAX_CELL)).collect() };
    let header = cells(header);
    let rows: Vec<Vec<String>> = rows.iter().map(|r| cells(r.as_slice())).collect();

    let mut widths: Vec<usize> = header.iter().map(|h| width(h)).collect();
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(width(cell));
        }
    }

    let mut out = String::new();
    push_row(&mut out, &header, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, row: &[String], widths: &[usize]) {
    let mut line = String::new();
    for (cell, w) in row.iter().zip(widths) {
        line.push_str(cell);
        line.push_str(&" ".repeat(w.saturating_sub(width(cell)) + 1));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Terminal cell width; CJK characters take two cells.
fn width(s: &str) -> usize {
    Span::raw(s).width()
}

fn truncate(s: &str, max: usize) -> String {
    if width(s) <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for ch in s.chars() {
        let mut buf = [0u8; 4];
        if width(&out) + width(ch.encode_utf8(&mut buf)) + 1 > max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}

fn fmt_signed(v: f64) -> String {
    let v = (v * 100.0).round() / 100.0;
    if v > 0.0 { format!("+{v:.2}") } else { format!("{v:.2}") }
}

fn or_unknown(s: String) -> String {
    if s.trim().is_empty() { "?".to_string() } else { s }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::diff::FieldChange;

    fn grade(name: &str, credit: f64, point: f64) -> Course {
        Course::new()
            .with(fields::TERM, "2023-2024 1")
            .with(fields::COURSE_NAME, name)
            .with(fields::CREDIT, credit)
            .with(fields::GRADE_POINT, point)
            .with("教学班", "A01")
    }

    #[test]
    fn grades_table_aligns_wide_characters() {
        let headers: Vec<String> = ["学年学期", "课程名称", "学分", "绩点", "教学班"].map(String::from).to_vec();
        let result = RetrievalResult::new(headers, vec![grade("高等数学", 5.0, 4.0), grade("C", 2.0, 3.5)]);
        let out = format_grades(&result, 3.86);
        let lines: Vec<&str> = out.lines().collect();

        assert!(lines[0].starts_with("学年学期"));
        assert!(!lines[0].contains("教学班"));
        // "课程名称" and "高等数学" both take 8 cells, so the next column starts at the same offset.
        assert_eq!(width(&lines[2][..lines[2].find('5').unwrap()]), width(&lines[0][..lines[0].find("学分").unwrap()]));
        assert!(out.ends_with("2 courses | GPA 3.86\n"));
    }

    #[test]
    fn falls_back_to_all_headers() {
        let headers = vec!["x".to_string(), "y".to_string()];
        assert_eq!(pick_columns(&headers, PLAN_COLUMNS), headers);
    }

    #[test]
    fn change_report_lists_every_difference() {
        let changes = vec![
            GradeChange::NewCourse {
                name: "线代".into(),
                course: grade("线代", 3.0, 3.7).with(fields::TOTAL_SCORE, 88.0),
            },
            GradeChange::Updated {
                name: "高数".into(),
                changes: vec![FieldChange { field: fields::GRADE_POINT, old: "".into(), new: "4".into() }],
                course: grade("高数", 5.0, 4.0),
            },
        ];
        let out = format_changes(&changes, 3.5, 3.62);
        assert!(out.contains("- delta : +0.12"));
        assert!(out.contains("[new] 线代\n  学分: 3\n  成绩: 88\n  绩点: 3.7"));
        assert!(out.contains("[updated] 高数\n  绩点: ? -> 4"));
    }

    #[test]
    fn gpa_report_shows_signed_impact() {
        let courses = vec![grade("A", 3.0, 4.0), grade("B", 2.0, 3.0)];
        let out = format_gpa_report(&courses, 3.6);
        assert!(out.starts_with("GPA: 3.60 (2 courses)"));
        assert!(out.contains("+0.60"));
        assert!(out.contains("-0.40"));
    }

    #[test]
    fn truncates_long_cells() {
        let long = "很".repeat(40);
        let t = truncate(&long, 10);
        assert!(width(&t) <= 10);
        assert!(t.ends_with('.'));
    }
}
