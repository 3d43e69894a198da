//! # Error Handling
//!
//! Error taxonomy for the anteroom access-control core, built on `thiserror`.
//!
//! Business-rule violations (`NotFound`, `Duplicated`, `Auth`, the `Not*` write
//! failures) are raised at the point of detection and propagate unchanged to the
//! caller; storage failures are wrapped into [`AnteroomError::Database`] so sqlx
//! detail never crosses the module boundary unwrapped.

use std::fmt;

/// Custom result type for anteroom operations
pub type Result<T> = std::result::Result<T, AnteroomError>;

/// Main error type for the access-control core
#[derive(thiserror::Error, Debug)]
pub enum AnteroomError {
    /// Referenced entity, session or invitation absent (or expired and purged)
    #[error("Resource not found: {resource_type} with id '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Uniqueness invariant violated (existing invitation, participant, host, name)
    #[error("Duplicate {resource_type}: {message}")]
    Duplicated {
        message: String,
        resource_type: String,
    },

    /// A write was attempted but a business precondition blocked it
    #[error("Entity not saved: {message}")]
    NotSaved { message: String },

    /// An update was attempted but the store reported no effect
    #[error("Entity not updated: {message}")]
    NotUpdated { message: String },

    /// A delete was attempted but was blocked or had no effect
    #[error("Entity not removed: {message}")]
    NotRemoved { message: String },

    /// Credential mismatch or capability check failure
    #[error("Authentication error: {message}")]
    Auth {
        message: String,
        error_type: AuthErrorType,
    },

    /// Invalid input data
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Underlying transactional store failure, always surfaced, never retried
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Internal errors that should not occur during normal operation
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Authentication error subtypes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorType {
    InvalidCredentials,
    InvalidToken,
    ExpiredToken,
    InsufficientPermissions,
}

impl fmt::Display for AuthErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthErrorType::InvalidCredentials => write!(f, "invalid_credentials"),
            AuthErrorType::InvalidToken => write!(f, "invalid_token"),
            AuthErrorType::ExpiredToken => write!(f, "expired_token"),
            AuthErrorType::InsufficientPermissions => write!(f, "insufficient_permissions"),
        }
    }
}

impl AnteroomError {
    /// Create a not found error
    pub fn not_found<R: Into<String>, I: ToString>(resource_type: R, id: I) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            id: id.to_string(),
        }
    }

    /// Create a duplicate error
    pub fn duplicated<M: Into<String>, R: Into<String>>(message: M, resource_type: R) -> Self {
        Self::Duplicated {
            message: message.into(),
            resource_type: resource_type.into(),
        }
    }

    /// Create a not saved error
    pub fn not_saved<S: Into<String>>(message: S) -> Self {
        Self::NotSaved {
            message: message.into(),
        }
    }

    /// Create a not updated error
    pub fn not_updated<S: Into<String>>(message: S) -> Self {
        Self::NotUpdated {
            message: message.into(),
        }
    }

    /// Create a not removed error
    pub fn not_removed<S: Into<String>>(message: S) -> Self {
        Self::NotRemoved {
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth<S: Into<String>>(message: S, error_type: AuthErrorType) -> Self {
        Self::Auth {
            message: message.into(),
            error_type,
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a database error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database {
            source,
            context: context.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Hint for the transport layer: the HTTP status a controller would map this to
    pub fn status_code(&self) -> u16 {
        match self {
            AnteroomError::NotFound { .. } => 404,
            AnteroomError::Duplicated { .. } => 409,
            AnteroomError::NotSaved { .. } => 409,
            AnteroomError::NotUpdated { .. } => 409,
            AnteroomError::NotRemoved { .. } => 409,
            AnteroomError::Auth { .. } => 401,
            AnteroomError::Validation { .. } => 400,
            AnteroomError::Database { .. } => 500,
            AnteroomError::Internal { .. } => 500,
        }
    }
}

impl From<sqlx::Error> for AnteroomError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database {
            source: error,
            context: "Database operation failed".to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for AnteroomError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}
