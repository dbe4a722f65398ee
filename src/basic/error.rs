use thiserror::Error;

use super::scenario::ScenarioState;

/// Element family an identifier belongs to. Identifiers are unique per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ElementKind {
    #[display("network")]
    Network,
    #[display("bus")]
    Bus,
    #[display("source")]
    Source,
    #[display("branch")]
    Branch,
    #[display("switch")]
    Switch,
    #[display("load")]
    Load,
}

/// Structural errors raised while building a network or resolving a scenario
/// against it. These abort the run: they mean the model itself is malformed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("duplicate {kind} identifier '{name}'")]
    DuplicateIdentifier { kind: ElementKind, name: String },

    #[error("unknown {kind} identifier '{name}'")]
    UnknownIdentifier { kind: ElementKind, name: String },

    #[error("invalid parameter on {kind} '{name}': {reason}")]
    InvalidParameter {
        kind: ElementKind,
        name: String,
        reason: String,
    },
}

impl NetworkError {
    pub(crate) fn invalid(kind: ElementKind, name: &str, reason: impl Into<String>) -> Self {
        NetworkError::InvalidParameter {
            kind,
            name: name.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown(kind: ElementKind, name: &str) -> Self {
        NetworkError::UnknownIdentifier {
            kind,
            name: name.to_owned(),
        }
    }
}

/// Numerical outcomes of a single island solve that are not a plain convergence.
///
/// None of these abort a study; they are recorded on the island and scenario
/// that produced them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("no convergence after {iterations} iterations (max mismatch {max_mismatch:.3e} pu)")]
    DidNotConverge { iterations: usize, max_mismatch: f64 },

    #[error("singular system{}: {reason}", branch.as_ref().map(|b| format!(" at branch '{b}'")).unwrap_or_default())]
    SingularSystem {
        /// Identifier of the element responsible, when it can be pinned down.
        branch: Option<String>,
        reason: String,
    },

    #[error("island has {count} sources at different nodes; exactly one slack reference is allowed")]
    MultipleSources { count: usize },
}

pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors that abort a whole study run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StudyError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("scenario '{scenario}' cannot move from {from} to {to}")]
    IllegalTransition {
        scenario: String,
        from: ScenarioState,
        to: ScenarioState,
    },
}
