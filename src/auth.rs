//! Identity/tenant context.
//!
//! Authentication proper is an external collaborator; what the workflow
//! needs is an explicit context object carrying the tenant and the acting
//! user, passed as the first argument to every operation. The HTTP layer
//! extracts it from the `x-entreprise-id` / `x-user-id` headers set by the
//! gateway.

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::errors::ServiceError;

pub const ENTREPRISE_HEADER: &str = "x-entreprise-id";
pub const USER_HEADER: &str = "x-user-id";

/// Tenant-scoped identity attached to every workflow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub entreprise_id: Uuid,
    pub user_id: Uuid,
}

impl AuthContext {
    pub fn new(entreprise_id: Uuid, user_id: Uuid) -> Self {
        Self {
            entreprise_id,
            user_id,
        }
    }
}

fn header_uuid(parts: &Parts, name: &'static str) -> Result<Uuid, ServiceError> {
    let raw = parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ServiceError::Unauthorized(format!("missing {name} header")))?;
    Uuid::parse_str(raw)
        .map_err(|_| ServiceError::Unauthorized(format!("invalid {name} header")))
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AuthContext {
            entreprise_id: header_uuid(parts, ENTREPRISE_HEADER)?,
            user_id: header_uuid(parts, USER_HEADER)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::FromRequestParts, http::Request};

    #[tokio::test]
    async fn extracts_context_from_headers() {
        let entreprise_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let request = Request::builder()
            .header(ENTREPRISE_HEADER, entreprise_id.to_string())
            .header(USER_HEADER, user_id.to_string())
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let ctx = AuthContext::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ctx.entreprise_id, entreprise_id);
        assert_eq!(ctx.user_id, user_id);
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let request = Request::builder().body(Body::empty()).unwrap();
        let (mut parts, _) = request.into_parts();

        let err = AuthContext::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn malformed_header_is_unauthorized() {
        let request = Request::builder()
            .header(ENTREPRISE_HEADER, "not-a-uuid")
            .header(USER_HEADER, Uuid::new_v4().to_string())
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let err = AuthContext::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }
}
