//! HTML parsing: shared helpers and the table extractor.

pub mod html;
pub mod table;

pub use table::{ExtractError, GRADE_TABLE, PLAN_TABLE, TableSpec, extract};
