//! Error types for the condition builder core

use thiserror::Error;

use crate::ast::{NodeKind, Path};
use crate::validation::{Incompleteness, ValidationReason};

/// Structural errors raised by the path-addressed tree operations.
///
/// Both variants are caller bugs: the editor handed the model an address or
/// an operation that does not fit the current tree. The mutation is refused
/// and the prior tree stays intact.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("path {path} does not resolve to a node")]
    Path { path: Path },

    #[error("{operation} at {path} requires a {expected} node, found a {found} node")]
    TypeMismatch {
        path: Path,
        operation: &'static str,
        expected: NodeKind,
        found: NodeKind,
    },
}

impl TreeError {
    pub(crate) fn path(path: &[usize]) -> Self {
        TreeError::Path { path: Path::from(path) }
    }
}

/// Unknown operator symbol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown operator: {0:?}")]
pub struct UnknownOperator(pub String);

/// Where in the aggregate document a validation failure was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionLocation {
    General,
    Specific { index: usize, id: String },
}

impl std::fmt::Display for ConditionLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConditionLocation::General => write!(f, "general condition"),
            ConditionLocation::Specific { index, id } => {
                write!(f, "specific condition #{} (id {})", index + 1, id)
            }
        }
    }
}

/// A single user-correctable problem that blocks saving
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{location}: {reason}")]
pub struct ValidationError {
    pub location: ConditionLocation,
    pub reason: ValidationReason,
}

/// Every validation failure of a document, in document order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} validation error(s): {}", .0.len(), join_errors(.0))]
pub struct ValidationErrors(pub Vec<ValidationError>);

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures of the persistence gateway. Always retryable.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("backend unreachable")]
    Unreachable,

    #[error("backend rejected the request: {0}")]
    Rejected(String),
}

/// Why a load or reload did not replace the working copy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("unsaved changes would be lost; save or revert first")]
    UnsavedChanges,

    #[error("load failed: {0}")]
    Transport(#[from] TransportError),
}

/// Why a save attempt did not go through
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SaveError {
    #[error("no document loaded")]
    NotReady,

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("save failed: {0}")]
    Transport(#[from] TransportError),
}

/// Errors raised while working inside an [`EditingSession`](crate::document::EditingSession)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("the condition is open read-only")]
    ReadOnly,

    #[error("no specific condition at index {0}")]
    NoSuchCondition(usize),

    #[error("specific condition {id} is no longer at index {index}")]
    Stale { index: usize, id: String },

    #[error("another condition is already open for editing")]
    AlreadyOpen,

    #[error("no condition is open for editing")]
    NotOpen,

    #[error(transparent)]
    Tree(#[from] TreeError),
}

/// Errors raised when compiling a tree into an executable query
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("condition at {path} is incomplete: {reason}")]
    Incomplete { path: Path, reason: Incompleteness },

    #[error("condition at {path} has an empty value list")]
    EmptyList { path: Path },
}
