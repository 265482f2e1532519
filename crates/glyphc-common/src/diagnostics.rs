//! Diagnostic categories and the compiler's error type.
//!
//! Errors split into a small set of categories (error vs. warning).
//! `CompilerError` is the type every fallible operation in the workspace
//! returns; `Diagnostic`
//! is what a `Reporter` (glyphc-analyzer::reporter) turns a `CompilerError`
//! or a standalone warning into for printing.

use crate::position::SourcePosition;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticCategory {
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub position: SourcePosition,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn error(position: SourcePosition, message: impl Into<String>) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            position,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn warning(position: SourcePosition, message: impl Into<String>) -> Self {
        Self {
            category: DiagnosticCategory::Warning,
            position,
            message: message.into(),
        }
    }
}

/// The compiler's single error type, classified.
///
/// `Internal` is the only variant a driver is allowed to treat as fatal for
/// the whole compile; every other variant is recovered from at the
/// enclosing "compile one top-level declaration" or "compile one function"
/// boundary (glyphc-analyzer::compile).
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum CompilerError {
    #[error("{position}: unknown type \"{name}\"")]
    UnknownType {
        position: SourcePosition,
        name: String,
    },
    #[error("{position}: variable \"{name}\" not found")]
    VariableNotFound {
        position: SourcePosition,
        name: String,
    },
    #[error("{position}: \"{name}\" is already declared")]
    DuplicateDeclaration {
        position: SourcePosition,
        name: String,
    },
    #[error("{position}: no method \"{name}\" on {receiver}")]
    MethodNotFound {
        position: SourcePosition,
        receiver: String,
        name: String,
    },

    #[error("{position}: cannot use a value of type {found} where {expected} is expected")]
    IncompatibleAssignment {
        position: SourcePosition,
        expected: String,
        found: String,
    },
    #[error("{position}: argument {index} of type {found} is not compatible with parameter type {expected}")]
    IncompatibleArgument {
        position: SourcePosition,
        index: usize,
        expected: String,
        found: String,
    },
    #[error("{position}: cannot cast {from} to unrelated type {to}")]
    BadCast {
        position: SourcePosition,
        from: String,
        to: String,
    },
    #[error("{position}: protocol method \"{name}\" is missing or has an incompatible signature")]
    ProtocolConformanceViolation {
        position: SourcePosition,
        name: String,
    },
    #[error("{position}: generic argument {index} does not satisfy its constraint")]
    GenericConstraintViolation {
        position: SourcePosition,
        index: usize,
    },

    #[error("{position}: variable \"{name}\" is possibly uninitialized")]
    PossiblyUninitialized {
        position: SourcePosition,
        name: String,
    },
    #[error("{position}: non-optional instance variable \"{name}\" must be initialized on all paths")]
    InstanceVariableNotInitialized {
        position: SourcePosition,
        name: String,
    },
    #[error("{position}: missing explicit return")]
    MissingExplicitReturn { position: SourcePosition },
    #[error("{position}: super initializer must be called before using self")]
    MissingSuperInitializerCall { position: SourcePosition },
    #[error("{position}: unreachable code after return")]
    DeadCodeAfterReturn { position: SourcePosition },

    #[error("{position}: \"{name}\" is not accessible from this context")]
    AccessViolation {
        position: SourcePosition,
        name: String,
    },
    #[error("{position}: cannot mutate constant variable \"{name}\"")]
    MutationOfConstant {
        position: SourcePosition,
        name: String,
    },
    #[error("{position}: cannot call a mutating method on an immutable value-type receiver")]
    MutationOfImmutableReceiver { position: SourcePosition },
    #[error("{position}: method mutates self but is not marked mutating")]
    MissingMutatingMarker { position: SourcePosition },

    #[error("{position}: too many {what} ({count} > {limit})")]
    CapacityExceeded {
        position: SourcePosition,
        what: String,
        count: usize,
        limit: usize,
    },

    #[error("{position}: internal error: {message}")]
    Internal {
        position: SourcePosition,
        message: String,
    },
}

impl CompilerError {
    #[must_use]
    pub fn position(&self) -> &SourcePosition {
        match self {
            Self::UnknownType { position,.. }
            | Self::VariableNotFound { position,.. }
            | Self::DuplicateDeclaration { position,.. }
            | Self::MethodNotFound { position,.. }
            | Self::IncompatibleAssignment { position,.. }
            | Self::IncompatibleArgument { position,.. }
            | Self::BadCast { position,.. }
            | Self::ProtocolConformanceViolation { position,.. }
            | Self::GenericConstraintViolation { position,.. }
            | Self::PossiblyUninitialized { position,.. }
            | Self::InstanceVariableNotInitialized { position,.. }
            | Self::MissingExplicitReturn { position }
            | Self::MissingSuperInitializerCall { position }
            | Self::DeadCodeAfterReturn { position }
            | Self::AccessViolation { position,.. }
            | Self::MutationOfConstant { position,.. }
            | Self::MutationOfImmutableReceiver { position }
            | Self::MissingMutatingMarker { position }
            | Self::CapacityExceeded { position,.. }
            | Self::Internal { position,.. } => position,
        }
    }

    /// Whether this error must abort the entire compile rather than being
    /// recovered from at the next top-level declaration or function body.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    #[must_use]
    pub fn into_diagnostic(self) -> Diagnostic {
        let position = self.position().clone();
        Diagnostic::error(position, self.to_string())
    }
}
