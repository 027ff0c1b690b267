//! Runtime settings from the environment, with `.env` support via dotenvy.

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_MANIFEST: &str = "objects.json";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://objects.db?mode=rwc";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub manifest_path: PathBuf,
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_body_bytes: usize,
}

impl Settings {
    /// Read settings from the process environment after loading `.env` if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string());

        let bind = get("BIND_ADDR", DEFAULT_BIND_ADDR);
        let bind_addr: SocketAddr = bind
            .parse()
            .map_err(|_| ConfigError::Validation(format!("BIND_ADDR is not a socket address: {}", bind)))?;
        let max_body = get("MAX_BODY_BYTES", &DEFAULT_MAX_BODY_BYTES.to_string());
        let max_body_bytes: usize = max_body
            .parse()
            .map_err(|_| ConfigError::Validation(format!("MAX_BODY_BYTES is not a number: {}", max_body)))?;

        Ok(Self {
            manifest_path: PathBuf::from(get("OBJECT_MANIFEST", DEFAULT_MANIFEST)),
            database_url: get("DATABASE_URL", DEFAULT_DATABASE_URL),
            bind_addr,
            max_body_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_apply() {
        let s = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(s.manifest_path, PathBuf::from("objects.json"));
        assert_eq!(s.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(s.bind_addr.port(), 3000);
        assert_eq!(s.max_body_bytes, 1024 * 1024);
    }

    #[test]
    fn overrides_and_errors() {
        let env: HashMap<&str, &str> = [("BIND_ADDR", "0.0.0.0:8080"), ("MAX_BODY_BYTES", "2048")].into();
        let s = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(s.bind_addr.port(), 8080);
        assert_eq!(s.max_body_bytes, 2048);

        let bad = Settings::from_lookup(|k| (k == "MAX_BODY_BYTES").then(|| "lots".to_string()));
        assert!(matches!(bad, Err(ConfigError::Validation(_))));
    }
}
