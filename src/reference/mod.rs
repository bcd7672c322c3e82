//! Diagnosis code reference table
//!
//! An immutable list of ICD-10 (code, description) pairs, loaded once at
//! startup from the bundled list or an override file, and searched by code
//! prefix or description substring.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::ReferenceConfig;

/// Number of matches a search hands back for display.
pub const SEARCH_LIMIT: usize = 10;

const BUNDLED_CODES: &str = include_str!("../../data/icd10.json");

#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    #[error("failed to read code list {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid code list: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosisCode {
    pub code: String,
    #[serde(rename = "desc")]
    pub description: String,
}

impl DiagnosisCode {
    /// The `"CODE - description"` label stored in visit and history lists.
    pub fn label(&self) -> String {
        format!("{} - {}", self.code, self.description)
    }

    fn matches(&self, upper_query: &str) -> bool {
        self.code.to_uppercase().starts_with(upper_query)
            || self.description.to_uppercase().contains(upper_query)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CodeTable {
    codes: Vec<DiagnosisCode>,
}

impl CodeTable {
    pub fn new(codes: Vec<DiagnosisCode>) -> Self {
        CodeTable { codes }
    }

    pub fn bundled() -> Result<Self, ReferenceError> {
        Self::from_json(BUNDLED_CODES)
    }

    pub fn from_json(raw: &str) -> Result<Self, ReferenceError> {
        Ok(CodeTable::new(serde_json::from_str(raw)?))
    }

    pub fn from_path(path: &Path) -> Result<Self, ReferenceError> {
        let raw = fs::read_to_string(path).map_err(|source| ReferenceError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Loads the override file named in `config`, or the bundled list.
    pub fn load(config: &ReferenceConfig) -> Result<Self, ReferenceError> {
        let table = match &config.codes_path {
            Some(path) => Self::from_path(path)?,
            None => Self::bundled()?,
        };
        info!(codes = table.len(), "diagnosis reference table loaded");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&DiagnosisCode> {
        self.codes.iter().find(|c| c.code.eq_ignore_ascii_case(code))
    }

    /// Codes whose code starts with `query` or whose description contains it,
    /// ignoring case, in table order and capped at [`SEARCH_LIMIT`]. A blank
    /// query returns the head of the table.
    pub fn search(&self, query: &str) -> Vec<&DiagnosisCode> {
        self.search_limited(query, SEARCH_LIMIT)
    }

    pub fn search_limited(&self, query: &str, limit: usize) -> Vec<&DiagnosisCode> {
        let upper = query.trim().to_uppercase();
        self.codes
            .iter()
            .filter(|c| upper.is_empty() || c.matches(&upper))
            .take(limit)
            .collect()
    }
}
