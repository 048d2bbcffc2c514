use thiserror::Error;

use crate::request::Person;

/// Broad failure categories, used by callers that only care about the class of a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Request context is missing something the selected request kind needs
    Validation,
    /// Response document is empty or not a SmartAPI message
    MalformedInput,
    /// A lookup on a loaded response had nothing to resolve
    Lookup,
    /// A code fell outside its closed enumeration
    UnknownEnumeration,
    /// Network or HTTP failure
    Transport,
    /// Polling stopped before a terminal status
    Orchestration,
    /// Local configuration, I/O, or document writing failure
    Internal,
}

/// Main library error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum CreditError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Response document is empty")]
    EmptyResponse,

    #[error("Malformed response document: {details}")]
    MalformedResponse { details: String },

    #[error("Response document carries no status code")]
    NoStatus,

    #[error("Unknown status code: {code}")]
    UnknownStatus { code: String },

    #[error("Invalid person key: {key} (expected 'b' or 'c')")]
    InvalidPersonKey { key: String },

    #[error("{person} is not present in the response")]
    PersonNotPresent { person: Person },

    #[error("Invalid rating code: {code}")]
    InvalidRatingCode { code: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url} - {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Request timeout: {url} after {timeout_seconds} seconds")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("Order did not reach a terminal status after {attempts} status queries")]
    PollTimeout { attempts: u32 },

    #[error("Polling aborted by caller")]
    Aborted,

    #[error("XML write error: {0}")]
    XmlWrite(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CreditError {
    pub fn missing(field: impl Into<String>) -> Self {
        CreditError::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CreditError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(details: impl Into<String>) -> Self {
        CreditError::MalformedResponse {
            details: details.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            CreditError::MissingField { .. } | CreditError::InvalidField { .. } => {
                ErrorCategory::Validation
            }
            CreditError::EmptyResponse | CreditError::MalformedResponse { .. } => {
                ErrorCategory::MalformedInput
            }
            CreditError::InvalidPersonKey { .. } | CreditError::PersonNotPresent { .. } => {
                ErrorCategory::Lookup
            }
            CreditError::NoStatus
            | CreditError::UnknownStatus { .. }
            | CreditError::InvalidRatingCode { .. } => ErrorCategory::UnknownEnumeration,
            CreditError::Http(_) | CreditError::HttpStatus { .. } | CreditError::Timeout { .. } => {
                ErrorCategory::Transport
            }
            CreditError::PollTimeout { .. } | CreditError::Aborted => ErrorCategory::Orchestration,
            CreditError::Io(_)
            | CreditError::XmlWrite(_)
            | CreditError::Json(_)
            | CreditError::Config(_) => ErrorCategory::Internal,
        }
    }
}

impl From<quick_xml::Error> for CreditError {
    fn from(err: quick_xml::Error) -> Self {
        CreditError::malformed(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for CreditError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        CreditError::malformed(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CreditError>;
