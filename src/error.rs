//! Error types for the Turbot provider.
//!
//! This module provides the error hierarchy for every stage of a resource
//! lifecycle: configuration, local state, the Turbot API, resource handlers
//! and planning.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the Turbot provider.
#[derive(Debug, Error)]
pub enum TurbotError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// State management errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Turbot API errors.
    #[error("Turbot API error: {0}")]
    Api(#[from] ApiError),

    /// Resource handler errors.
    #[error("Resource error: {0}")]
    Resource(#[from] ResourceError),

    /// Planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// No credentials could be resolved for the workspace.
    #[error("No Turbot credentials found (profile: {profile})")]
    MissingCredentials {
        /// Profile that was looked up.
        profile: String,
    },

    /// Duplicate resource definition.
    #[error("Duplicate resource name: {name}")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },
}

/// State management errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// Writing the state file failed.
    #[error("Failed to write state: {message}")]
    WriteFailed {
        /// Description of the failure.
        message: String,
    },

    /// State lock acquisition failed.
    #[error("Failed to acquire state lock: {message}")]
    LockFailed {
        /// Description of the lock failure.
        message: String,
    },

    /// State lock is held by another process.
    #[error("State is locked by another process (lock holder: {holder}, since: {since})")]
    LockedByOther {
        /// Identifier of the lock holder.
        holder: String,
        /// When the lock was acquired.
        since: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// State version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected state version.
        expected: String,
        /// Found state version.
        found: String,
    },
}

/// Turbot API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed.
    #[error("Turbot authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("Turbot API request failed: {status} - {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from API.
        message: String,
    },

    /// Rate limited.
    #[error("Turbot API rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// The requested entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Kind of entity (resource, grant, smart folder).
        kind: String,
        /// Identifier or aka that was looked up.
        id: String,
    },

    /// Network error.
    #[error("Network error communicating with Turbot: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from Turbot API: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Errors raised by the resource handlers before or after remote calls.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A JSON-encoded field could not be parsed.
    #[error("failed to parse {field}: \n{input}\nerror: {message}")]
    InvalidJson {
        /// Field holding the malformed document.
        field: String,
        /// The offending input.
        input: String,
        /// Parser message.
        message: String,
    },

    /// A top-level property disagrees with the same property in metadata.
    #[error(
        "error data mismatch, failed to pass different {property} as top level: {top_level} and metadata {property}: {metadata}"
    )]
    Conflict {
        /// Property name (title, description).
        property: String,
        /// Top-level value.
        top_level: String,
        /// Value found in metadata.
        metadata: String,
    },

    /// A composite identifier could not be decoded.
    #[error("invalid composite id '{id}': expected '<smart_folder>_<resource>'")]
    InvalidId {
        /// The identifier that failed to decode.
        id: String,
    },

    /// A required field was not set.
    #[error("missing required field: {field}")]
    MissingField {
        /// Field name.
        field: String,
    },

    /// The resource kind is not handled.
    #[error("unsupported resource kind: {kind}")]
    UnsupportedKind {
        /// Kind name.
        kind: String,
    },

    /// The resource kind cannot be updated in place.
    #[error("{kind} resources cannot be updated in place")]
    UpdateNotSupported {
        /// Kind name.
        kind: String,
    },

    /// A remote call made on behalf of a handler failed with extra context.
    #[error("{context}: {source}")]
    Remote {
        /// What the handler was doing.
        context: String,
        /// Underlying error.
        #[source]
        source: Box<TurbotError>,
    },
}

/// Planning errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// An attribute that forces replacement changed on a resource that cannot be replaced.
    #[error("Resource '{name}' cannot be updated in place: {field} changed")]
    ImmutableField {
        /// Resource name.
        name: String,
        /// Field that changed.
        field: String,
    },

    /// An import targets a name that state already tracks.
    #[error("Resource '{name}' is already managed (ID: {id})")]
    AlreadyManaged {
        /// Resource name.
        name: String,
        /// Id recorded in state.
        id: String,
    },

    /// An import kind disagrees with the configured kind.
    #[error("Resource '{name}' is configured as {configured}, cannot import as {requested}")]
    KindMismatch {
        /// Resource name.
        name: String,
        /// Kind in the configuration.
        configured: String,
        /// Kind requested on import.
        requested: String,
    },
}

/// Result type alias for Turbot provider operations.
pub type Result<T> = std::result::Result<T, TurbotError>;

impl TurbotError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if the remote API reported the entity as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Api(ApiError::NotFound { .. }) => true,
            Self::Resource(ResourceError::Remote { source, .. }) => source.is_not_found(),
            _ => false,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Api(ApiError::RateLimited { .. } | ApiError::NetworkError { .. })
                | Self::State(StateError::LockFailed { .. })
        )
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Api(ApiError::RateLimited { retry_after_secs }) => Some(*retry_after_secs),
            Self::Api(ApiError::NetworkError { .. }) => Some(5),
            Self::State(StateError::LockFailed { .. }) => Some(2),
            _ => None,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl StateError {
    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Creates a write error with the given message.
    #[must_use]
    pub fn write(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    /// Creates a corrupted-state error with the given message.
    #[must_use]
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Creates a lock error with the given message.
    #[must_use]
    pub fn lock_failed(message: impl Into<String>) -> Self {
        Self::LockFailed {
            message: message.into(),
        }
    }
}

impl ApiError {
    /// Creates an API request error.
    #[must_use]
    pub fn request(status: u16, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates a not-found error for the given entity kind.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl ResourceError {
    /// Creates a JSON parse error for a field.
    #[must_use]
    pub fn invalid_json(
        field: impl Into<String>,
        input: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidJson {
            field: field.into(),
            input: input.into(),
            message: message.into(),
        }
    }

    /// Wraps a remote error with handler context.
    #[must_use]
    pub fn remote(context: impl Into<String>, source: TurbotError) -> Self {
        Self::Remote {
            context: context.into(),
            source: Box::new(source),
        }
    }
}
