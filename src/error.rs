//! Error kinds surfaced by every pipeline stage.
//!
//! Stages fail fast and whole: a single malformed row or title aborts the
//! batch instead of producing a partial (and silently biased) result.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SentimentError>;

/// Which part of a timestamp cell failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Date,
    Time,
    /// The whole cell (wrong number of whitespace-separated tokens).
    Cell,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Date => f.write_str("date"),
            TokenKind::Time => f.write_str("time"),
            TokenKind::Cell => f.write_str("timestamp cell"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("cannot parse {kind} token {token:?} (expected {expected})")]
    Parse {
        kind: TokenKind,
        token: String,
        expected: &'static str,
    },

    #[error("row {row} carries only a time token and no earlier row supplied a date")]
    MissingDate { row: usize },

    #[error("malformed news markup: {0}")]
    Markup(String),

    #[error("classification failed for record {index}: {reason}")]
    Classification { index: usize, reason: String },

    #[error("record {index} has no sentiment score")]
    Unscored { index: usize },

    #[error("EMA span must be a positive integer, got {0}")]
    InvalidSpan(usize),

    #[error("trend fit needs at least 2 points with distinct x values ({points} given)")]
    InsufficientData { points: usize },

    #[error("correlation needs at least 2 overlapping points, found {overlap}")]
    InsufficientOverlap { overlap: usize },

    #[error("correlation undefined: {which} series has zero variance")]
    DegenerateVariance { which: &'static str },

    #[error("resample frequency must be positive, got {seconds}s")]
    InvalidFrequency { seconds: i64 },

    /// A news, classification or price collaborator failed.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

impl SentimentError {
    /// True for errors caused by bad input data rather than violated
    /// numeric preconditions.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            SentimentError::Parse { .. }
                | SentimentError::MissingDate { .. }
                | SentimentError::Markup(_)
                | SentimentError::Classification { .. }
                | SentimentError::Collaborator(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_piece() {
        let e = SentimentError::Parse {
            kind: TokenKind::Date,
            token: "Junk-1".into(),
            expected: "Mon-DD-YY",
        };
        assert_eq!(
            e.to_string(),
            r#"cannot parse date token "Junk-1" (expected Mon-DD-YY)"#
        );

        let e = SentimentError::Classification {
            index: 4,
            reason: "empty title".into(),
        };
        assert!(e.to_string().contains("record 4"));
    }

    #[test]
    fn upstream_split() {
        assert!(SentimentError::MissingDate { row: 0 }.is_upstream());
        assert!(!SentimentError::InsufficientOverlap { overlap: 1 }.is_upstream());
        assert!(SentimentError::from(anyhow::anyhow!("boom")).is_upstream());
    }
}
