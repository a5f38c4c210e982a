use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

fn current_request_id() -> Option<String> {
    crate::request_id::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error structure returned to HTTP clients
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Not Found",
    "message": "Vente 550e8400-e29b-41d4-a716-446655440000 non trouvée",
    "details": null,
    "request_id": "req-abc123xyz",
    "timestamp": "2026-08-06T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    #[schema(example = "Vente 550e8400-e29b-41d4-a716-446655440000 non trouvée")]
    pub message: String,
    /// Additional error details (validation errors, field names)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Operation attempted against a sale/transaction in a state that
    /// forbids it (editing lines after validation, cancelling twice, ...)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Sum of installment amounts does not match the amount due beyond the
    /// 0.01 tolerance. Both values are carried for diagnosis.
    #[error("Échéancier déséquilibré: total des échéances {constate}, montant attendu {attendu}")]
    ScheduleMismatch { attendu: Decimal, constate: Decimal },

    #[error("Montant insuffisant: {0}")]
    InsufficientAmount(Decimal),

    #[error("Nombre d'échéances invalide: {0}")]
    InvalidCount(i32),

    #[error("Montant invalide: {0}")]
    InvalidAmount(Decimal),

    /// Global percentage discount against a zero subtotal, or a discount
    /// larger than the subtotal it applies to.
    #[error("Remise invalide: {0}")]
    InvalidDiscount(String),

    #[error("Impossible de valider une transaction sans lignes")]
    EmptyTransaction,

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    /// Translate a persistence error, surfacing unique-constraint
    /// collisions as `Duplicate` instead of a generic database failure.
    pub fn from_db(err: DbErr) -> Self {
        let text = err.to_string();
        if text.contains("UNIQUE") || text.contains("unique constraint") || text.contains("1555") {
            ServiceError::Duplicate(text)
        } else {
            ServiceError::DatabaseError(err)
        }
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) | Self::InternalError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_)
            | Self::InvalidState(_)
            | Self::ScheduleMismatch { .. }
            | Self::InsufficientAmount(_)
            | Self::InvalidCount(_)
            | Self::InvalidAmount(_)
            | Self::InvalidDiscount(_)
            | Self::EmptyTransaction => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Duplicate(_) | Self::ConcurrentModification(_) => StatusCode::CONFLICT,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::InternalError(_) | Self::Other(_) => "Internal server error".to_string(),
            Self::Duplicate(_) => "Duplicate entry".to_string(),
            Self::ConcurrentModification(id) => {
                format!("Concurrent modification for ID {}", id)
            }
            // User-facing errors carry the actual message
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = self.response_message();

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: error_message,
            details: None,
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn error_response_includes_request_id() {
        let response = crate::request_id::scope_request_id(
            crate::request_id::RequestId::new("req-123"),
            async { ServiceError::NotFound("missing".into()).into_response() },
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
    }

    #[test]
    fn status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::ValidationError("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::InvalidState("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::ScheduleMismatch {
                attendu: dec!(300),
                constate: dec!(295),
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServiceError::Duplicate("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::ConcurrentModification(Uuid::nil()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::EmptyTransaction.status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn schedule_mismatch_message_carries_both_amounts() {
        let err = ServiceError::ScheduleMismatch {
            attendu: dec!(300.00),
            constate: dec!(295.00),
        };
        let message = err.to_string();
        assert!(message.contains("295.00"));
        assert!(message.contains("300.00"));
    }

    #[test]
    fn response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::InternalError("sensitive".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::DatabaseError(DbErr::Custom("dsn leak".into())).response_message(),
            "Database error"
        );

        // User-facing errors include the actual message
        assert_eq!(
            ServiceError::NotFound("Vente non trouvée".into()).response_message(),
            "Not found: Vente non trouvée"
        );
    }

    #[test]
    fn unique_violation_translates_to_duplicate() {
        let err = ServiceError::from_db(DbErr::Custom(
            "UNIQUE constraint failed: tiers.matricule_fiscal".into(),
        ));
        assert!(matches!(err, ServiceError::Duplicate(_)));

        let err = ServiceError::from_db(DbErr::Custom("connection reset".into()));
        assert!(matches!(err, ServiceError::DatabaseError(_)));
    }
}
