use std::collections::BTreeMap;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("storage lock poisoned")]
    Poisoned,
    #[error("category selection cannot be empty")]
    EmptySelection,
}

/// Failures surfaced by the gateway. Display strings are operator-facing.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Error de conexión: {0}")]
    Transport(String),
    #[error("No autorizado. Por favor, inicia sesión nuevamente.")]
    Unauthorized,
    #[error("{}", .message.as_deref().unwrap_or("Datos inválidos"))]
    Validation {
        message: Option<String>,
        field_errors: BTreeMap<String, String>,
    },
    #[error("Código de sesión no encontrado")]
    SessionCodeNotFound,
    #[error("Error del servidor ({status})")]
    Server { status: u16 },
    #[error("Error al preparar la solicitud: {0}")]
    Encode(String),
    #[error("Error al procesar la respuesta del servidor: {0}")]
    Decode(String),
    #[error("Error al autenticar con la API: {0}")]
    ServiceAccount(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Transport(_) => "REQUEST_FAILED",
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::SessionCodeNotFound => "NOT_FOUND",
            ApiError::Server { .. } => "SERVER_ERROR",
            ApiError::Encode(_) => "ENCODE_ERROR",
            ApiError::Decode(_) => "DECODE_ERROR",
            ApiError::ServiceAccount(_) => "SERVICE_ACCOUNT",
            ApiError::Storage(_) => "STORAGE_ERROR",
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    pub fn field_errors(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ApiError::Validation { field_errors, .. } if !field_errors.is_empty() => {
                Some(field_errors)
            }
            _ => None,
        }
    }

    pub fn field_error(&self, field: &str) -> Option<&str> {
        self.field_errors()
            .and_then(|errors| errors.get(field))
            .map(String::as_str)
    }

    /// Message for a global toast. Field-level errors are routed to their
    /// form fields instead, so they suppress the toast entirely.
    pub fn toast_message(&self) -> Option<String> {
        if self.field_errors().is_some() {
            return None;
        }
        Some(self.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Outcome of a rejected check-in registration.
#[derive(Debug, Error)]
pub enum CheckinError {
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("Error no reconocido: {raw}")]
    Unrecognized { status: u16, raw: String },
    #[error(transparent)]
    Request(#[from] ApiError),
}

impl CheckinError {
    pub fn status(&self) -> Option<u16> {
        match self {
            CheckinError::Rejected { status, .. } | CheckinError::Unrecognized { status, .. } => {
                Some(*status)
            }
            CheckinError::Request(_) => None,
        }
    }
}
