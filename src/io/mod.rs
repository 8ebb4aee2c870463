//! Input/output helpers.
//!
//! - CSV snapshot read/write (`snapshot`)

pub mod snapshot;

pub use snapshot::*;
