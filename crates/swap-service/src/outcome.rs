//! The `{success, data | error}` result envelope.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Error half of an [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeError {
    /// Stable machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// Serializable operation result.
///
/// Serializes as `{"success": true, "data": ...}` or
/// `{"success": false, "error": {"code": ..., "message": ...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OutcomeError>,
}

impl<T> Outcome<T> {
    /// A successful outcome.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// A failed outcome.
    #[must_use]
    pub fn err(error: &ServiceError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(OutcomeError {
                code: error.code().to_string(),
                message: error.to_string(),
            }),
        }
    }
}

impl<T> From<Result<T, ServiceError>> for Outcome<T> {
    fn from(result: Result<T, ServiceError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::err(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swap_auth::AuthError;

    #[test]
    fn success_shape() {
        let outcome: Outcome<u32> = Ok(7).into();
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json, serde_json::json!({"success": true, "data": 7}));
    }

    #[test]
    fn failure_shape() {
        let outcome: Outcome<u32> = Err(ServiceError::Auth(AuthError::InvalidCredentials)).into();
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "invalid_credentials");
        assert!(json.get("data").is_none());
    }
}
