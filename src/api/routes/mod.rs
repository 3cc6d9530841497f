//! API route modules.

pub mod interview;
pub mod report;
