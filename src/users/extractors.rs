use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    Form, Json,
};
use tracing::warn;

use super::dto::{ApiError, ErrorResponse, RegisterRequest};

/// Registration body sent either as JSON or as an urlencoded HTML form.
pub struct Submission(pub RegisterRequest);

#[async_trait]
impl<S> FromRequest<S> for Submission
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
            .unwrap_or(false);

        let body = if is_form {
            Form::<RegisterRequest>::from_request(req, state)
                .await
                .map(|Form(body)| body)
                .map_err(|e| invalid_body(e.body_text()))?
        } else {
            Json::<RegisterRequest>::from_request(req, state)
                .await
                .map(|Json(body)| body)
                .map_err(|e| invalid_body(e.body_text()))?
        };
        Ok(Submission(body))
    }
}

fn invalid_body(detail: String) -> ApiError {
    warn!(%detail, "registration body rejected");
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::message("Invalid request body")),
    )
}
