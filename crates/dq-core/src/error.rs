use thiserror::Error;

use crate::engine::EngineError;

/// Every way a dynamic query can fail, from token parsing to execution.
///
/// The first five variants describe bad client input and are raised before
/// the query engine is touched. The last two wrap an [`EngineError`] raised
/// by the collaborator, tagged with the step that failed.
#[derive(Debug, Error)]
pub enum QueryError {
    // ── Grammar ────────────────────────────────────────────────
    #[error("invalid filter token: {0:?}")]
    InvalidFilterToken(String),

    #[error("invalid sort token: {0:?}")]
    InvalidSortToken(String),

    #[error("invalid select token: {0:?}")]
    InvalidSelectToken(String),

    // ── Operator catalog ───────────────────────────────────────
    #[error("unknown operator: {0:?}")]
    UnknownOperator(String),

    #[error("between needs two comma-separated values, got {0:?}")]
    MalformedRangeValue(String),

    #[error("operator '{operator}' on '{path}' requires a value")]
    MissingValue { path: String, operator: String },

    // ── Collaborator ───────────────────────────────────────────
    #[error("query engine rejected {step}")]
    TranslationFailure {
        step: String,
        #[source]
        source: EngineError,
    },

    #[error("query engine failed during {step}")]
    ExecutionFailure {
        step: String,
        #[source]
        source: EngineError,
    },
}

impl QueryError {
    /// True when the caller sent something malformed; false when the
    /// failure points at the schema or the engine itself.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::TranslationFailure { .. } | Self::ExecutionFailure { .. }
        )
    }

    pub(crate) fn translation(step: impl Into<String>, source: EngineError) -> Self {
        Self::TranslationFailure {
            step: step.into(),
            source,
        }
    }

    pub(crate) fn execution(step: impl Into<String>, source: EngineError) -> Self {
        Self::ExecutionFailure {
            step: step.into(),
            source,
        }
    }
}

pub type Result<T, E = QueryError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_are_classified() {
        assert!(QueryError::InvalidFilterToken("x".into()).is_client_error());
        assert!(QueryError::UnknownOperator("foo".into()).is_client_error());
        assert!(QueryError::MalformedRangeValue("1".into()).is_client_error());
    }

    #[test]
    fn test_engine_errors_are_server_errors() {
        let err = QueryError::translation(
            "filter on 'nope'",
            EngineError::UnknownColumn("nope".into()),
        );
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "query engine rejected filter on 'nope'");
    }
}
