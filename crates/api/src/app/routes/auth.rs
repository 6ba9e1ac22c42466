//! Login, token refresh and logout.
//!
//! Tokens travel as HttpOnly cookies (`access`, `refresh`). The login body
//! also carries them so non-browser clients can use bearer auth.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;

use stockledger_auth::{Credentials, JwtIssuer, verify_credentials};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::cookies::{ACCESS_COOKIE, REFRESH_COOKIE, delete_cookie, read_cookie, set_cookie};

/// Header carrying the refresh token for `POST /retry`.
pub const REFRESH_TOKEN_HEADER: &str = "refresh-token";

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> axum::response::Response {
    let Json(credentials) = match body {
        Ok(b) => b,
        Err(_) => return authentication_failed(),
    };

    let account = match services.users.find_by_username(&credentials.username).await {
        Ok(account) => account,
        Err(e) => return errors::store_error_to_response(e),
    };
    let account = match verify_credentials(account, &credentials) {
        Ok(account) => account,
        Err(_) => return authentication_failed(),
    };

    let pair = match services.jwt.issue_pair(&account, Utc::now()) {
        Ok(pair) => pair,
        Err(e) => return token_failure(e),
    };

    let mut headers = HeaderMap::new();
    for (name, value) in [(ACCESS_COOKIE, &pair.access), (REFRESH_COOKIE, &pair.refresh)] {
        match set_cookie(name, value, &services.cookie) {
            Some(cookie) => headers.append(header::SET_COOKIE, cookie),
            None => return token_failure("token is not a valid cookie value"),
        };
    }

    tracing::info!(username = %account.username, "login succeeded");
    (
        StatusCode::OK,
        headers,
        Json(serde_json::json!({
            "access": pair.access,
            "refresh": pair.refresh,
        })),
    )
        .into_response()
}

pub async fn retry(Extension(services): Extension<Arc<AppServices>>, req_headers: HeaderMap) -> axum::response::Response {
    let Some(refresh) = refresh_token(&req_headers) else {
        return refresh_failed();
    };

    let access = match services.jwt.refresh_access(refresh, Utc::now()) {
        Ok(access) => access,
        Err(e) => {
            tracing::debug!(error = %e, "refresh token rejected");
            return refresh_failed();
        }
    };

    let mut headers = HeaderMap::new();
    for (name, value) in [(ACCESS_COOKIE, access.as_str()), (REFRESH_COOKIE, refresh)] {
        match set_cookie(name, value, &services.cookie) {
            Some(cookie) => headers.append(header::SET_COOKIE, cookie),
            None => return refresh_failed(),
        };
    }

    (StatusCode::OK, headers, Json(serde_json::json!({ "access": access }))).into_response()
}

pub async fn logout() -> axum::response::Response {
    (StatusCode::OK, cleared_cookies(), Json(serde_json::json!({ "logged_out": true }))).into_response()
}

fn refresh_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(REFRESH_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or_else(|| read_cookie(headers, REFRESH_COOKIE))
}

fn cleared_cookies() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.append(header::SET_COOKIE, delete_cookie(ACCESS_COOKIE));
    headers.append(header::SET_COOKIE, delete_cookie(REFRESH_COOKIE));
    headers
}

fn authentication_failed() -> axum::response::Response {
    errors::json_error(
        StatusCode::UNAUTHORIZED,
        "authentication_failed",
        "invalid username or password",
    )
}

fn refresh_failed() -> axum::response::Response {
    let mut resp = errors::json_error(
        StatusCode::UNAUTHORIZED,
        "authentication_failed",
        "refresh token is missing or invalid",
    );
    resp.headers_mut().extend(cleared_cookies());
    resp
}

fn token_failure(err: impl std::fmt::Display) -> axum::response::Response {
    tracing::error!(error = %err, "token issuing failed");
    errors::json_error(StatusCode::INTERNAL_SERVER_ERROR, "token_error", "could not issue tokens")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn refresh_header_takes_precedence_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(REFRESH_TOKEN_HEADER, HeaderValue::from_static("from-header"));
        headers.insert(header::COOKIE, HeaderValue::from_static("refresh=from-cookie"));
        assert_eq!(refresh_token(&headers), Some("from-header"));

        headers.remove(REFRESH_TOKEN_HEADER);
        assert_eq!(refresh_token(&headers), Some("from-cookie"));
    }

    #[test]
    fn failed_refresh_clears_both_cookies() {
        let resp = refresh_failed();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers().get_all(header::SET_COOKIE).iter().count(), 2);
    }
}
