//! Error types for the modelbase system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::types::PropertyType;

/// The main error type for modelbase operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Pushes an entity frame onto the error's context, creating the context if needed.
    #[must_use]
    pub fn in_frame(mut self, frame: impl Into<String>) -> Self {
        let context = self.context.take().unwrap_or_default();
        self.context = Some(context.with_frame(frame));
        self
    }

    /// Creates a schema mismatch error.
    #[must_use]
    pub fn schema_mismatch(type_name: impl Into<String>, expected: i64, found: i64) -> Self {
        Self::new(ErrorKind::SchemaMismatch {
            type_name: type_name.into(),
            expected,
            found,
        })
    }

    /// Creates a missing field error.
    #[must_use]
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingField(field.into()))
    }

    /// Creates an invalid field error.
    #[must_use]
    pub fn invalid_field(field: impl Into<String>, expected: &'static str) -> Self {
        Self::new(ErrorKind::InvalidField {
            field: field.into(),
            expected,
        })
    }

    /// Creates a sub-object load failure.
    #[must_use]
    pub fn subobject_load_failed(id: u64, version: u64, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::SubobjectLoadFailed {
            id,
            version,
            reason: reason.into(),
        })
    }

    /// Creates a length mismatch error.
    #[must_use]
    pub fn length_mismatch(expected: usize, actual: usize) -> Self {
        Self::new(ErrorKind::LengthMismatch { expected, actual })
    }

    /// Creates a precondition violation error.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PreconditionViolation(message.into()))
    }

    /// Creates a document not found error.
    #[must_use]
    pub fn document_not_found(id: u64, version: u64) -> Self {
        Self::new(ErrorKind::DocumentNotFound { id, version })
    }

    /// Creates an unknown entity type error.
    #[must_use]
    pub fn unknown_entity_type(type_name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownEntityType(type_name.into()))
    }

    /// Creates an unsupported operation error.
    #[must_use]
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unsupported(operation.into()))
    }

    /// Creates a property type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: PropertyType, actual: PropertyType) -> Self {
        Self::new(ErrorKind::TypeMismatch { expected, actual })
    }

    /// Creates a backend write failure.
    #[must_use]
    pub fn store_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StoreFailed(message.into()))
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization(message.into()))
    }

    /// Creates an I/O error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io(message.into()))
    }

    /// Returns true if this error reports a violated caller precondition.
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self.kind, ErrorKind::PreconditionViolation(_))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// Stored schema version differs from the one the entity type expects.
    #[error("schema mismatch for {type_name}: expected version {expected}, found {found}")]
    SchemaMismatch {
        /// The entity type tag.
        type_name: String,
        /// The schema version this build understands.
        expected: i64,
        /// The schema version found in the document.
        found: i64,
    },

    /// A required key is absent from a document.
    #[error("missing field: {0}")]
    MissingField(String),

    /// A key is present but holds a value of the wrong shape.
    #[error("invalid field {field}: expected {expected}")]
    InvalidField {
        /// The offending key.
        field: String,
        /// Description of the expected shape.
        expected: &'static str,
    },

    /// A lazily referenced sub-object could not be fetched.
    #[error("failed to load sub-object {id}@{version}: {reason}")]
    SubobjectLoadFailed {
        /// Identifier of the sub-object.
        id: u64,
        /// Requested version.
        version: u64,
        /// Underlying reason.
        reason: String,
    },

    /// Expanded or operand length disagrees with the declared length.
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        /// The declared length.
        expected: usize,
        /// The length encountered.
        actual: usize,
    },

    /// A caller broke an operation's precondition.
    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    /// No document exists for the requested identity.
    #[error("document not found: {id}@{version}")]
    DocumentNotFound {
        /// Entity identifier.
        id: u64,
        /// Entity version.
        version: u64,
    },

    /// The factory has no constructor for a type tag.
    #[error("unknown entity type: {0}")]
    UnknownEntityType(String),

    /// The entity type does not support an operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// Property value has the wrong type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The property's declared type.
        expected: PropertyType,
        /// The type of the offered value.
        actual: PropertyType,
    },

    /// Attempt to change a read-only property.
    #[error("property is read-only: {0}")]
    ReadOnlyProperty(String),

    /// The backing store rejected or timed out a write.
    #[error("store failed: {0}")]
    StoreFailed(String),

    /// Encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(String),

    /// The identity counter for this scope is used up.
    #[error("identity space exhausted for session {session}, service {service}")]
    IdentityExhausted {
        /// Session id of the generator.
        session: u16,
        /// Service id of the generator.
        service: u16,
    },
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Entity type or store that raised the error.
    pub source: Option<String>,
    /// Path of entities being processed, innermost first.
    pub stack: Vec<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds a stack frame.
    #[must_use]
    pub fn with_frame(mut self, frame: impl Into<String>) -> Self {
        self.stack.push(frame.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "at {source}")?;
        }
        if !self.stack.is_empty() {
            writeln!(f)?;
            for frame in &self.stack {
                writeln!(f, "  in {frame}")?;
            }
        }
        Ok(())
    }
}
