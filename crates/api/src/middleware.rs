use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use stockledger_auth::{JwtValidator, TokenKind};

use crate::app::errors::json_error;
use crate::context::AuthenticatedUser;
use crate::cookies::{ACCESS_COOKIE, read_cookie};

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

/// Require a valid access token from `Authorization: Bearer` or the `access` cookie.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(req.headers()) else {
        return unauthorized("missing access token");
    };

    let claims = match state.jwt.validate(token, TokenKind::Access, Utc::now()) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "access token rejected");
            return unauthorized("invalid access token");
        }
    };

    req.extensions_mut()
        .insert(AuthenticatedUser::new(claims.sub, claims.username));

    next.run(req).await
}

fn unauthorized(message: &str) -> Response {
    json_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

fn extract_token(headers: &HeaderMap) -> Option<&str> {
    extract_bearer(headers).or_else(|| read_cookie(headers, ACCESS_COOKIE))
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(axum::http::header::AUTHORIZATION)?;
    let header = header.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}
