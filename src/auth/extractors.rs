use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRef, FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{claims::Claims, jwt::JwtKeys};
use crate::error::AppError;

/// Extracts and validates the bearer token, yielding its claims.
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .ok_or(AppError::Unauthenticated("No token, authorization denied"))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "rejected bearer token");
            AppError::Unauthenticated("Invalid token")
        })?;

        Ok(AuthUser(claims))
    }
}

/// JSON request body whose rejections come back as `AppError` with a short
/// message instead of axum's plain-text deserializer output.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| {
            debug!(error = %e.body_text(), "rejected request body");
            rejection_error(&e)
        })?;
        Ok(JsonBody(value))
    }
}

fn rejection_error(rejection: &JsonRejection) -> AppError {
    match rejection {
        JsonRejection::JsonDataError(_) => AppError::BadRequest("Missing or invalid fields"),
        JsonRejection::JsonSyntaxError(_) => AppError::BadRequest("Malformed JSON body"),
        JsonRejection::MissingJsonContentType(_) => AppError::BadRequest("Expected a JSON body"),
        _ => AppError::BadRequest("Invalid request body"),
    }
}

// Expect "Bearer <token>"
fn bearer_token(header: &str) -> Option<&str> {
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then_some(token)
}
