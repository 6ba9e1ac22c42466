//! Configuration loading and representation.
//!
//! Everything comes from environment variables. Missing values fall back to
//! development defaults; malformed values are an error.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Which persistence backend to wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres { url: String, max_connections: u32 },
}

/// Cookie attributes for the login tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieConfig {
    /// `Max-Age` in seconds.
    pub max_age_secs: i64,
    pub secure: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub store: StoreBackend,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub cookie: CookieConfig,
    pub admin_username: String,
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map lookup).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?;

        let jwt_secret = lookup("JWT_SECRET").unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });

        let store = match lookup("DATABASE_URL").filter(|u| !u.trim().is_empty()) {
            Some(url) => StoreBackend::Postgres {
                url,
                max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5u32)?,
            },
            None => StoreBackend::InMemory,
        };

        let access_secs: i64 = parse_or(&lookup, "ACCESS_TOKEN_TTL_SECS", 300)?;
        let refresh_secs: i64 = parse_or(&lookup, "REFRESH_TOKEN_TTL_SECS", 86_400)?;
        ensure_positive("ACCESS_TOKEN_TTL_SECS", access_secs)?;
        ensure_positive("REFRESH_TOKEN_TTL_SECS", refresh_secs)?;

        let cookie_secs: i64 = parse_or(&lookup, "COOKIE_TIME", 86_400)?;
        ensure_positive("COOKIE_TIME", cookie_secs)?;

        let cookie = CookieConfig {
            max_age_secs: cookie_secs,
            secure: parse_or(&lookup, "COOKIE_SECURE", false)?,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            store,
            access_token_ttl: Duration::seconds(access_secs),
            refresh_token_ttl: Duration::seconds(refresh_secs),
            cookie,
            admin_username: lookup("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
            admin_password: lookup("ADMIN_PASSWORD"),
        })
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            }),
        },
    }
}

fn ensure_positive(var: &'static str, secs: i64) -> Result<(), ConfigError> {
    if secs <= 0 {
        return Err(ConfigError::Invalid {
            var,
            value: secs.to_string(),
            reason: "must be positive".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_select_in_memory_store() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.store, StoreBackend::InMemory);
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.jwt_secret, "dev-secret");
        assert_eq!(cfg.access_token_ttl, Duration::seconds(300));
        assert_eq!(cfg.cookie.max_age_secs, 86_400);
        assert!(!cfg.cookie.secure);
        assert_eq!(cfg.admin_username, "admin");
        assert_eq!(cfg.admin_password, None);
    }

    #[test]
    fn database_url_selects_postgres() {
        let cfg = load(&[
            ("DATABASE_URL", "postgres://db/stock"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
        ])
        .unwrap();
        assert_eq!(
            cfg.store,
            StoreBackend::Postgres {
                url: "postgres://db/stock".to_string(),
                max_connections: 12,
            }
        );
    }

    #[test]
    fn malformed_numbers_are_reported() {
        let err = load(&[("COOKIE_TIME", "forever")]).unwrap_err();
        match err {
            ConfigError::Invalid { var, value, .. } => {
                assert_eq!(var, "COOKIE_TIME");
                assert_eq!(value, "forever");
            }
        }
    }

    #[test]
    fn non_positive_ttl_is_rejected() {
        assert!(load(&[("ACCESS_TOKEN_TTL_SECS", "0")]).is_err());
    }

    #[test]
    fn negative_cookie_time_is_rejected() {
        let err = load(&[("COOKIE_TIME", "-60")]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "COOKIE_TIME",
                value: "-60".to_string(),
                reason: "must be positive".to_string(),
            }
        );
        assert_eq!(load(&[("COOKIE_TIME", "60")]).unwrap().cookie.max_age_secs, 60);
    }
}
