//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use salon_shared::constants::{APP_NAME, DEFAULT_HTTP_PORT, MAX_MESSAGE_LEN};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP + WebSocket server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:3000`
    pub http_addr: SocketAddr,

    /// SQLite database file holding the persisted collections.
    /// Env: `DATABASE_PATH`
    /// Default: platform data directory (`salon.db`).
    pub database_path: Option<PathBuf>,

    /// Directory served for every path that is not an API route.
    /// Env: `STATIC_DIR`
    /// Default: `./public`
    pub static_dir: PathBuf,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Salon"`
    pub instance_name: String,

    /// Longest accepted chat message, in bytes.
    /// Env: `MAX_MESSAGE_LEN`
    /// Default: `4096`
    pub max_message_len: usize,

    /// Capacity of the inbound event queue feeding the chat service.
    /// Env: `EVENT_QUEUE_CAPACITY`
    /// Default: `1024`
    pub event_queue_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            static_dir: PathBuf::from("./public"),
            instance_name: APP_NAME.to_string(),
            max_message_len: MAX_MESSAGE_LEN,
            event_queue_capacity: 1024,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(path) = lookup("STATIC_DIR") {
            config.static_dir = PathBuf::from(path);
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(val) = lookup("MAX_MESSAGE_LEN") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_message_len = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_MESSAGE_LEN, using default"),
            }
        }

        if let Some(val) = lookup("EVENT_QUEUE_CAPACITY") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.event_queue_capacity = n,
                _ => tracing::warn!(value = %val, "Invalid EVENT_QUEUE_CAPACITY, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 3000).into());
        assert!(config.database_path.is_none());
        assert_eq!(config.max_message_len, 4096);
    }

    #[test]
    fn test_env_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_PATH", "/tmp/salon-test.db"),
            ("INSTANCE_NAME", "Back Room"),
            ("MAX_MESSAGE_LEN", "128"),
        ]));
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/salon-test.db")));
        assert_eq!(config.instance_name, "Back Room");
        assert_eq!(config.max_message_len, 128);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("HTTP_ADDR", "not-an-addr"),
            ("MAX_MESSAGE_LEN", "0"),
            ("EVENT_QUEUE_CAPACITY", "lots"),
        ]));
        assert_eq!(config.http_addr, ServerConfig::default().http_addr);
        assert_eq!(config.max_message_len, 4096);
        assert_eq!(config.event_queue_capacity, 1024);
    }
}
