use thiserror::Error;

use crate::value::Position;

/// Error returned by the external compilation backend when it fails to
/// lower a traced region.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CompileError {
    message: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Failure modes surfaced by the translator driver. Guard mismatches and
/// specialization explosions are not errors: the former drive
/// recompilation, the latter are counted diagnostics.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// Backend failed to lower the trace. No entry is inserted and the
    /// call site state is unchanged.
    #[error("compilation failed for call site `{site}`: {source}")]
    Compile {
        site: String,
        #[source]
        source: CompileError,
    },
    /// A breakgraph-marked or already generalized position was promoted.
    /// Internal invariant violation.
    #[error("invalid generalization of {position} at call site `{site}`")]
    InvalidGeneralization { site: String, position: Position },
}
