//! Server configuration.
//!
//! All settings come from environment variables. `JWT_SECRET` is mandatory:
//! the server refuses to start without it rather than issuing unverifiable
//! tokens.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;

/// Runtime configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind host (default `0.0.0.0`).
    pub host: String,
    /// Bind port (default `8080`).
    pub port: u16,
    /// Secret used to sign identity claims.
    pub jwt_secret: String,
    /// Token lifetime in days (default 7).
    pub jwt_ttl_days: i64,
    /// Registering with this token grants the admin role.
    pub admin_invite_token: Option<String>,
    /// SQLite database file (default `taskify.db`).
    pub database_path: PathBuf,
    /// Directory for uploaded images (default `uploads`).
    pub upload_dir: PathBuf,
    /// Deadline applied to every store call.
    pub store_timeout: Duration,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Recognized variables: `HOST`, `PORT`, `JWT_SECRET`, `JWT_TTL_DAYS`,
    /// `ADMIN_INVITE_TOKEN`, `DATABASE_PATH`, `UPLOAD_DIR`,
    /// `STORE_TIMEOUT_MS`.
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .context("JWT_SECRET must be set")?;

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().context("PORT must be a valid port number")?,
            Err(_) => 8080,
        };

        let jwt_ttl_days = match std::env::var("JWT_TTL_DAYS") {
            Ok(raw) => raw.parse::<i64>().context("JWT_TTL_DAYS must be an integer")?,
            Err(_) => 7,
        };

        let store_timeout_ms = match std::env::var("STORE_TIMEOUT_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .context("STORE_TIMEOUT_MS must be an integer")?,
            Err(_) => 5_000,
        };

        Ok(Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port,
            jwt_secret,
            jwt_ttl_days: jwt_ttl_days.max(1),
            admin_invite_token: std::env::var("ADMIN_INVITE_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            database_path: std::env::var("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("taskify.db")),
            upload_dir: std::env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("uploads")),
            store_timeout: Duration::from_millis(store_timeout_ms),
        })
    }
}
