// Error types for the Cheddar client
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheddarError>;

// Failures below the XML layer: the request never produced a usable document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP error: {status_code} - {body}")]
    HttpStatus { status_code: u16, body: String },
}

#[derive(Error, Debug)]
pub enum CheddarError {
    #[error("Transport error: {0}")]
    TransportError(#[from] TransportError),

    #[error("Malformed XML document: {0}")]
    MalformedDocument(String),

    // Reported by the service itself through an <error> document
    #[error("Service error ({}): {message}", code.map_or_else(|| "no code".to_string(), |c| c.to_string()))]
    ServiceError {
        message: String,
        code: Option<i64>,
        aux_code: Option<i64>,
        id: Option<String>,
    },

    // The service answered successfully but the expected entity was absent
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Conversion error: {0}")]
    ConversionError(String),

    // A spawned call never finished, e.g. the runtime shut down
    #[error("Call aborted: {0}")]
    Aborted(String),
}

impl CheddarError {
    // Numeric service code, if this is a service error that carried one
    pub fn code(&self) -> Option<i64> {
        match self {
            CheddarError::ServiceError { code, .. } => *code,
            _ => None,
        }
    }

    pub fn is_service_error(&self) -> bool {
        matches!(self, CheddarError::ServiceError { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CheddarError::NotFound(_))
    }

    pub fn is_transport_error(&self) -> bool {
        matches!(self, CheddarError::TransportError(_))
    }
}
