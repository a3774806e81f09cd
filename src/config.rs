use std::{net::SocketAddr, str::FromStr};

use anyhow::Context;
use axum::http::HeaderName;

const DEFAULT_DATABASE_URL: &str = "sqlite://starhub.db?mode=rwc";
const DEFAULT_PORT: u16 = 5000;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    /// `None` allows any origin.
    pub cors_origin: Option<String>,
    pub actor_header: HeaderName,
    pub outbox_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_owned(),
            database_max_connections: 16,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            cors_origin: None,
            actor_header: HeaderName::from_static("x-actor-id"),
            outbox_capacity: 64,
        }
    }
}

impl Config {
    /// Reads settings from the environment, loading `.env` first if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let bind_addr = match var("BIND_ADDR") {
            Some(addr) => addr.parse().with_context(|| format!("BIND_ADDR={addr}"))?,
            None => {
                let port = parse_or(&var, "PORT", DEFAULT_PORT)?;
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };

        let outbox_capacity = parse_or(&var, "OUTBOX_CAPACITY", defaults.outbox_capacity)?;
        anyhow::ensure!(outbox_capacity > 0, "OUTBOX_CAPACITY must be positive");

        Ok(Self {
            database_url: var("DATABASE_URL").unwrap_or(defaults.database_url),
            database_max_connections: parse_or(&var, "DATABASE_MAX_CONNECTIONS", defaults.database_max_connections)?,
            bind_addr,
            cors_origin: var("CORS_ORIGIN").filter(|o| !o.is_empty()),
            actor_header: parse_or(&var, "ACTOR_HEADER", defaults.actor_header)?,
            outbox_capacity,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw.parse().with_context(|| format!("{key}={raw}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.actor_header, "x-actor-id");
        assert_eq!(config.cors_origin, None);
    }

    #[test]
    fn port_and_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("PORT", "8080"),
            ("ACTOR_HEADER", "X-User-Id"),
            ("CORS_ORIGIN", "https://starhub.example"),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.actor_header, "x-user-id");
        assert_eq!(config.cors_origin.as_deref(), Some("https://starhub.example"));
    }

    #[test]
    fn bad_numbers_fail() {
        assert!(Config::from_lookup(lookup(&[("PORT", "eighty")])).is_err());
        assert!(Config::from_lookup(lookup(&[("OUTBOX_CAPACITY", "0")])).is_err());
    }

    #[test]
    fn invalid_actor_header_fails_at_startup() {
        assert!(Config::from_lookup(lookup(&[("ACTOR_HEADER", "x actor id")])).is_err());
        assert!(Config::from_lookup(lookup(&[("ACTOR_HEADER", "")])).is_err());
    }
}
