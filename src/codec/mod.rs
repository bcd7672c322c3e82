//! Encodings for multi-value attributes kept in single text columns.
//!
//! - `comma`: visit-level diseases and medications (`"A, B"`)
//! - `json`: the history table's diseases, medications and allergies
//!
//! Both are round-trip stable for trimmed, non-empty values that do not
//! contain the delimiter.

pub mod comma;
pub mod json;
