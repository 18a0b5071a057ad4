//! Request and response envelopes for authenticated callable functions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

/// Identity of the caller, attached by the invoking infrastructure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    #[serde(default)]
    pub uid: String,
    /// Decoded token claims. Opaque to the handlers.
    #[serde(default)]
    pub token: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallableRequest {
    #[serde(default)]
    pub auth: Option<AuthContext>,
    #[serde(default)]
    pub data: Value,
}

impl CallableRequest {
    pub fn new(auth: Option<AuthContext>, data: Value) -> Self {
        Self { auth, data }
    }

    /// Fails with [`CallableError::Unauthenticated`] unless a caller identity
    /// with a non-empty uid is attached.
    pub fn require_auth(&self) -> Result<&AuthContext, CallableError> {
        self.auth
            .as_ref()
            .filter(|auth| !auth.uid.is_empty())
            .ok_or(CallableError::Unauthenticated)
    }
}

/// The only failures a callable function reports to its caller.
///
/// Messages are safe to return to clients. Internal failures carry a generic
/// message; the underlying error is logged where it happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallableError {
    #[error("User must be authenticated.")]
    Unauthenticated,

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Internal(String),
}

impl CallableError {
    pub fn status(&self) -> &'static str {
        match self {
            CallableError::Unauthenticated => "UNAUTHENTICATED",
            CallableError::InvalidArgument(_) => "INVALID_ARGUMENT",
            CallableError::Internal(_) => "INTERNAL",
        }
    }
}

/// Wraps a handler outcome as `{"result": ...}` or
/// `{"error": {"status": ..., "message": ...}}`.
pub fn envelope<T: Serialize>(outcome: Result<T, CallableError>) -> Value {
    match outcome.map(serde_json::to_value) {
        Ok(Ok(result)) => json!({ "result": result }),
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Failed to serialize callable result");
            error_body(&CallableError::Internal("Internal error.".to_string()))
        }
        Err(err) => error_body(&err),
    }
}

fn error_body(err: &CallableError) -> Value {
    json!({
        "error": {
            "status": err.status(),
            "message": err.to_string(),
        }
    })
}
