//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - header-driven course records (`Course`, `CellValue`)
//! - table retrieval output (`RetrievalResult`)
//! - login secrets (`Credentials`)

pub mod course;

pub use course::*;
