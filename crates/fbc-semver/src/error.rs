use thiserror::Error;

/// Errors produced while parsing versions or version ranges.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid semantic version {0:?}")]
    InvalidVersion(String),

    #[error("invalid version constraint {0:?}")]
    InvalidConstraint(String),
}
