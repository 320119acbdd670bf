//! Load failures.
//!
//! Only two things can abort a load: the raw text could not be obtained, or it
//! could not be tokenised into rows. Everything downstream (unresolved columns,
//! malformed cells, blank rows) degrades to a documented default instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("source '{source_name}' is unavailable: {reason}")]
    SourceUnavailable { source_name: String, reason: String },
    #[error("failed to parse row {row}: {reason}")]
    ParseFailure { row: usize, reason: String },
}

impl LoadError {
    pub fn unavailable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        LoadError::SourceUnavailable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(row: usize, reason: impl ToString) -> Self {
        LoadError::ParseFailure {
            row,
            reason: reason.to_string(),
        }
    }
}
