//! Server configuration.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use governor::{Quota, RateLimiter};

use scripto_core::{defaults, Error, Result};

use crate::UserRateLimiter;

/// HTTP server settings read from the environment.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// PostgreSQL URL. Without one, interactions are kept in memory.
    pub database_url: Option<String>,
    pub rate_limit_enabled: bool,
    /// Requests allowed per period on the AI routes.
    pub rate_limit_requests: u64,
    pub rate_limit_period_secs: u64,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: defaults::SERVER_PORT,
            database_url: None,
            rate_limit_enabled: true,
            rate_limit_requests: defaults::RATE_LIMIT_REQUESTS,
            rate_limit_period_secs: defaults::RATE_LIMIT_PERIOD_SECS,
            allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `HOST` | `0.0.0.0` | Listen address |
    /// | `PORT` | `3000` | Listen port |
    /// | `DATABASE_URL` | unset | PostgreSQL URL; unset keeps history in memory |
    /// | `RATE_LIMIT_ENABLED` | `true` | Rate limit the AI routes |
    /// | `RATE_LIMIT_REQUESTS` | `30` | Requests per user per period |
    /// | `RATE_LIMIT_PERIOD_SECS` | `60` | Period length |
    /// | `ALLOWED_ORIGINS` | `http://localhost:3000` | Comma-separated CORS origins |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST").unwrap_or(defaults.host);
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);
        let rate_limit_requests = std::env::var("RATE_LIMIT_REQUESTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_requests);
        let rate_limit_period_secs = std::env::var("RATE_LIMIT_PERIOD_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_period_secs);
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|v| split_origins(&v))
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.allowed_origins);

        Self {
            host,
            port,
            database_url,
            rate_limit_enabled,
            rate_limit_requests,
            rate_limit_period_secs,
            allowed_origins,
        }
    }

    /// Build the per-user AI route limiter, or `None` when rate limiting
    /// is off.
    ///
    /// Each user may spend `rate_limit_requests` as a burst; their bucket
    /// refills evenly over the period.
    pub fn rate_limiter(&self) -> Result<Option<Arc<UserRateLimiter>>> {
        if !self.rate_limit_enabled {
            return Ok(None);
        }
        let burst = u32::try_from(self.rate_limit_requests)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| Error::Config("RATE_LIMIT_REQUESTS must be positive".to_string()))?;
        let period = Duration::from_secs(self.rate_limit_period_secs) / burst.get();
        let quota = Quota::with_period(period)
            .ok_or_else(|| Error::Config("RATE_LIMIT_PERIOD_SECS must be positive".to_string()))?
            .allow_burst(burst);
        Ok(Some(Arc::new(RateLimiter::keyed(quota))))
    }

    /// Parsed CORS origins; invalid entries are logged and skipped.
    pub fn cors_origins(&self) -> Vec<HeaderValue> {
        self.allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!("Invalid CORS origin '{}': {}", origin, e);
                    None
                }
            })
            .collect()
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.rate_limit_requests, 30);
        assert_eq!(config.rate_limit_period_secs, 60);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_split_origins() {
        assert_eq!(
            split_origins(" https://a.example , ,http://localhost:5173"),
            vec!["https://a.example", "http://localhost:5173"]
        );
        assert!(split_origins(" , ").is_empty());
    }

    #[test]
    fn test_rate_limiter_allows_burst_then_rejects() {
        let config = ServerConfig {
            rate_limit_requests: 2,
            ..Default::default()
        };
        let limiter = config.rate_limiter().unwrap().unwrap();
        let user = uuid::Uuid::new_v4();
        assert!(limiter.check_key(&user).is_ok());
        assert!(limiter.check_key(&user).is_ok());
        assert!(limiter.check_key(&user).is_err());
    }

    #[test]
    fn test_rate_limiter_buckets_are_per_user() {
        let config = ServerConfig {
            rate_limit_requests: 1,
            ..Default::default()
        };
        let limiter = config.rate_limiter().unwrap().unwrap();
        let (a, b) = (uuid::Uuid::new_v4(), uuid::Uuid::new_v4());
        assert!(limiter.check_key(&a).is_ok());
        assert!(limiter.check_key(&a).is_err());
        assert!(limiter.check_key(&b).is_ok());
    }

    #[test]
    fn test_rate_limiter_disabled() {
        let config = ServerConfig {
            rate_limit_enabled: false,
            ..Default::default()
        };
        assert!(config.rate_limiter().unwrap().is_none());
    }

    #[test]
    fn test_rate_limiter_rejects_zero() {
        let config = ServerConfig {
            rate_limit_requests: 0,
            ..Default::default()
        };
        assert!(matches!(config.rate_limiter(), Err(Error::Config(_))));
    }

    #[test]
    fn test_cors_origins_skip_invalid() {
        let config = ServerConfig {
            allowed_origins: vec!["https://ok.example".into(), "bad\norigin".into()],
            ..Default::default()
        };
        assert_eq!(config.cors_origins().len(), 1);
    }
}
