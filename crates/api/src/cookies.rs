//! Minimal `Cookie` / `Set-Cookie` handling for the login tokens.

use axum::http::{HeaderMap, HeaderValue, header};

use stockledger_infra::CookieConfig;

pub const ACCESS_COOKIE: &str = "access";
pub const REFRESH_COOKIE: &str = "refresh";

/// Value of cookie `name` from the request's `Cookie` headers.
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value storing `value` as an HttpOnly cookie.
pub fn set_cookie(name: &str, value: &str, config: &CookieConfig) -> Option<HeaderValue> {
    let mut cookie = format!(
        "{name}={value}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        config.max_age_secs
    );
    if config.secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

/// `Set-Cookie` value that makes the browser drop cookie `name`.
pub fn delete_cookie(name: &str) -> HeaderValue {
    let cookie = format!("{name}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0");
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}
