//! Unified Error Type System
//!
//! Centralized error types for the entire application.
//! The taxonomy separates the three failure classes the pipeline must
//! distinguish:
//!
//! - **GeneratorError**: upstream text-generation failure (unreachable,
//!   timeout, rate limit, empty output)
//! - **ParseError**: synthesized output is not one well-formed record
//! - **StoreError**: connectivity, transaction, or constraint failure
//!
//! ## Design Principles
//!
//! - Single unified error type (PersonaError) for the entire application
//! - Typed sub-errors so callers branch on kind, never on message prose
//! - No panic/unwrap - all errors are recoverable

use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Generator Errors
// =============================================================================

/// Failure while invoking the external text generator.
#[derive(Debug, Clone, Error)]
pub enum GeneratorError {
    /// Provider endpoint could not be reached
    #[error("generator unreachable: {0}")]
    Unreachable(String),

    /// Request exceeded the configured deadline
    #[error("generator request timed out after {0:?}")]
    Timeout(Duration),

    /// Provider rejected the request due to rate limiting
    #[error("generator rate limited: {0}")]
    RateLimited(String),

    /// Provider returned no usable text
    #[error("generator returned empty output")]
    Empty,

    /// Provider returned a non-success API response
    #[error("generator API error ({status}): {message}")]
    Api { status: u16, message: String },
}

impl GeneratorError {
    /// Classify a reqwest transport error into the matching variant.
    pub fn from_transport(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(Duration::from_secs(0))
        } else if err.is_connect() {
            Self::Unreachable(err.to_string())
        } else {
            Self::Api {
                status: err.status().map(|s| s.as_u16()).unwrap_or(0),
                message: err.to_string(),
            }
        }
    }

    /// Classify an HTTP status from a provider into the matching variant.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            429 => Self::RateLimited(message.into()),
            _ => Self::Api {
                status,
                message: message.into(),
            },
        }
    }
}

// =============================================================================
// Parse Errors
// =============================================================================

/// Synthesized profile text failed to yield one well-formed record.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
}

/// What exactly went wrong while turning raw text into a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Text is not JSON at all
    NotJson,
    /// JSON parsed but is not a single object (or one-element array)
    NotOneRecord,
    /// Record has no fields after normalization
    EmptyRecord,
    /// Normalized key is not a legal column identifier
    InvalidFieldName,
    /// A required field is absent
    MissingFields,
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotJson => write!(f, "not valid JSON"),
            Self::NotOneRecord => write!(f, "not a single record"),
            Self::EmptyRecord => write!(f, "empty record"),
            Self::InvalidFieldName => write!(f, "invalid field name"),
            Self::MissingFields => write!(f, "missing required fields"),
        }
    }
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build a NotJson error carrying a bounded preview of the offending text.
    pub fn not_json(raw: &str) -> Self {
        let preview: String = raw.chars().take(120).collect();
        Self::new(
            ParseErrorKind::NotJson,
            format!("could not extract a JSON record from: {preview:?}"),
        )
    }
}

// =============================================================================
// Store Errors
// =============================================================================

/// Failure while talking to the durable relational sink.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Could not acquire a pooled connection
    #[error("store connection failed: {0}")]
    Pool(String),

    /// Read-only query failed
    #[error("store query failed: {0}")]
    Query(String),

    /// Insert violated a schema or type constraint
    #[error("store constraint violation: {0}")]
    Constraint(String),

    /// Transaction could not be started or committed
    #[error("store transaction failed: {0}")]
    Transaction(String),
}

impl StoreError {
    /// Map a rusqlite error onto the taxonomy.
    ///
    /// Constraint and type-mismatch failures are the expected rejection
    /// path for malformed rows; everything else is a query fault.
    pub fn from_sqlite(err: &rusqlite::Error) -> Self {
        use rusqlite::Error as E;
        match err {
            E::SqliteFailure(code, msg) => {
                let detail = msg.clone().unwrap_or_else(|| code.to_string());
                if code.code == rusqlite::ErrorCode::ConstraintViolation {
                    Self::Constraint(detail)
                } else {
                    Self::Query(detail)
                }
            }
            E::InvalidColumnType(..) | E::ToSqlConversionFailure(_) => {
                Self::Constraint(err.to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum PersonaError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Pipeline Errors
    // -------------------------------------------------------------------------
    #[error("generator error: {0}")]
    Generator(#[from] GeneratorError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A stage failed; names the stage for the terminal contract
    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    /// Operation exceeded its deadline
    #[error("timeout after {duration:?}: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    // -------------------------------------------------------------------------
    // Domain Errors
    // -------------------------------------------------------------------------
    #[error("config error: {0}")]
    Config(String),

    #[error("not initialized: run 'personaweave init' first")]
    NotInitialized,
}

pub type Result<T> = std::result::Result<T, PersonaError>;

// =============================================================================
// Helper Constructors
// =============================================================================

impl PersonaError {
    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a stage error
    pub fn stage(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
