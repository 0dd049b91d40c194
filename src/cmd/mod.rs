//! Command-line entry points.

pub mod check_tools;
pub mod ocr;
