//! Caller identity extraction
//!
//! The upstream transport authenticates users and forwards who they are in
//! `x-workspace-id` / `x-user-id`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use relaygate_domain::GatewayError;

use crate::error::ApiError;

pub const WORKSPACE_HEADER: &str = "x-workspace-id";
pub const USER_HEADER: &str = "x-user-id";

/// Authenticated workspace member making the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub workspace_id: String,
    pub user_id: String,
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            workspace_id: required_header(parts, WORKSPACE_HEADER)?,
            user_id: required_header(parts, USER_HEADER)?,
        })
    }
}

fn required_header(parts: &Parts, name: &str) -> Result<String, ApiError> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError(GatewayError::InvalidInput(format!("{name} header is required"))))
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    async fn extract(request: Request<()>) -> Result<Caller, ApiError> {
        let (mut parts, ()) = request.into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn reads_both_headers() {
        let request = Request::builder()
            .header(WORKSPACE_HEADER, "W1")
            .header(USER_HEADER, " U1 ")
            .body(())
            .expect("request");

        let caller = extract(request).await.expect("caller");
        assert_eq!(caller, Caller { workspace_id: "W1".into(), user_id: "U1".into() });
    }

    #[tokio::test]
    async fn blank_or_missing_header_is_missing_params() {
        let request = Request::builder()
            .header(WORKSPACE_HEADER, "W1")
            .header(USER_HEADER, "  ")
            .body(())
            .expect("request");

        let err = extract(request).await.expect_err("blank user");
        assert_eq!(err.0.code(), "missing_params");

        let err = extract(Request::builder().body(()).expect("request")).await.expect_err("none");
        assert_eq!(err.0.code(), "missing_params");
    }
}
