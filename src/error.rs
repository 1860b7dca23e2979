//! Error taxonomy shared by every stage of scenario evaluation.

use std::fmt::Write as _;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScenarioError>;

/// One candidate that was tried while resolving an overload set, with the reason it failed to bind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attempt {
    pub candidate: String,
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum ScenarioError {
    #[error("syntax error at column {column}: {message} in `{text}`")]
    Syntax {
        message: String,
        text: String,
        column: usize,
    },

    #[error("expected {expected}, found {found} in `{text}`")]
    TypeMismatch {
        expected: String,
        found: String,
        text: String,
    },

    #[error("{}", describe_no_match(.op, .event, .attempts, .available))]
    NoMatchingCandidate {
        op: String,
        event: String,
        attempts: Vec<Attempt>,
        available: Vec<String>,
    },

    #[error("{op} failed: {message}")]
    Handler { op: String, message: String },

    #[error("registry {}: {message}", .path.display())]
    Persistence { path: PathBuf, message: String },
}

impl ScenarioError {
    pub fn syntax(message: impl Into<String>, text: impl Into<String>, column: usize) -> Self {
        ScenarioError::Syntax {
            message: message.into(),
            text: text.into(),
            column,
        }
    }

    pub fn mismatch(
        expected: impl Into<String>,
        found: impl Into<String>,
        text: impl ToString,
    ) -> Self {
        ScenarioError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
            text: text.to_string(),
        }
    }

    pub fn handler(op: impl Into<String>, message: impl Into<String>) -> Self {
        ScenarioError::Handler {
            op: op.into(),
            message: message.into(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ScenarioError::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// True for failures raised before any handler ran; the World is untouched by these.
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            ScenarioError::Syntax { .. }
                | ScenarioError::TypeMismatch { .. }
                | ScenarioError::NoMatchingCandidate { .. }
        )
    }
}

fn describe_no_match(op: &str, event: &str, attempts: &[Attempt], available: &[String]) -> String {
    let mut out = format!("no matching {op} for `{event}`");
    if attempts.is_empty() {
        let _ = write!(out, " (available: {})", available.join(", "));
        return out;
    }
    for attempt in attempts {
        let _ = write!(out, "\n  {}: {}", attempt.candidate, attempt.reason);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_match_lists_every_attempt() {
        let err = ScenarioError::NoMatchingCandidate {
            op: "Comptroller".into(),
            event: "(SetCollateralFactor cZRX 0.1)".into(),
            attempts: vec![Attempt {
                candidate: "SetCollateralFactor".into(),
                reason: "no contract named `cZRX`".into(),
            }],
            available: vec!["SetCollateralFactor".into()],
        };
        let text = err.to_string();
        assert!(text.starts_with("no matching Comptroller for `(SetCollateralFactor cZRX 0.1)`"));
        assert!(text.contains("SetCollateralFactor: no contract named `cZRX`"));
        assert!(err.is_resolution());
    }

    #[test]
    fn handler_errors_are_not_resolution_errors() {
        let err = ScenarioError::handler("approve", "reverted");
        assert_eq!(err.to_string(), "approve failed: reverted");
        assert!(!err.is_resolution());
    }
}
