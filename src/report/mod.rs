//! Reporting: GPA, snapshot diffs and formatted terminal output.

pub mod diff;
pub mod format;
pub mod gpa;

pub use diff::{FieldChange, GradeChange, diff_grades, is_significant};
pub use format::*;
pub use gpa::{aggregate_gpa, gpa_impact};
