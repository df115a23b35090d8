use anyhow::{Context, Result};
use axum::http::HeaderValue;
use std::net::SocketAddr;

use crate::db::DATABASE_URL;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_CORS_ORIGIN: &str = "http://localhost:8080";

/// Runtime settings for the backend binary
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub cors_origin: String,
}

impl BackendConfig {
    /// Read `COACH_BIND_ADDR`, `COACH_DATABASE_URL` and `COACH_CORS_ORIGIN`,
    /// falling back to defaults for anything unset
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("COACH_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid bind address '{}'", bind_addr))?;

        let config = Self {
            bind_addr,
            database_url: lookup("COACH_DATABASE_URL").unwrap_or_else(|| DATABASE_URL.to_string()),
            cors_origin: lookup("COACH_CORS_ORIGIN").unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
        };
        config.cors_header()?;
        Ok(config)
    }

    pub fn cors_header(&self) -> Result<HeaderValue> {
        self.cors_origin
            .parse::<HeaderValue>()
            .with_context(|| format!("Invalid CORS origin '{}'", self.cors_origin))
    }
}
