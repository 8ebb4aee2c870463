//! Page-specific retrievers. Each takes an already authenticated session.

pub mod grades;
pub mod plan;

pub use grades::{DEFAULT_PROJECT_TYPE, get_grades};
pub use plan::get_plan;
