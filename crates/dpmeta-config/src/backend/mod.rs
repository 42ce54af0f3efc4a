//! Storage backends for the configuration database.
//!
//! A backend is a flat string key/value store. Typed access, JSON encoding and
//! transaction scoping live in [`crate::client`].
//!
//! Backends:
//! - `memory`: process-local map, used by tests and dry runs
//! - `etcd`: networked etcd v3 store via its JSON gateway (feature `etcd`)

use std::fmt;

use crate::error::ConfigResult;

mod memory;

#[cfg(feature = "etcd")]
mod etcd;

pub use memory::MemoryBackend;

#[cfg(feature = "etcd")]
pub use etcd::EtcdBackend;

/// Default etcd host when none is configured.
pub const DEFAULT_ETCD_HOST: &str = "127.0.0.1";

/// Default etcd client port.
pub const DEFAULT_ETCD_PORT: u16 = 2379;

/// A flat key/value store holding JSON-encoded records.
pub trait Backend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    fn get(&self, key: &str) -> ConfigResult<Option<String>>;

    fn put(&self, key: &str, value: &str) -> ConfigResult<()>;

    /// Remove a key. Returns true if a value was removed.
    fn delete(&self, key: &str) -> ConfigResult<bool>;

    /// Apply a batch of writes atomically; `None` deletes the key.
    fn apply(&self, writes: &[(String, Option<String>)]) -> ConfigResult<()>;
}

/// Backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Etcd { host: String, port: u16 },
}

impl BackendKind {
    /// The networked backend at the default endpoint.
    pub fn etcd_default() -> Self {
        Self::Etcd {
            host: DEFAULT_ETCD_HOST.to_string(),
            port: DEFAULT_ETCD_PORT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Etcd { .. } => "etcd3",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory => f.write_str("memory"),
            Self::Etcd { host, port } => write!(f, "etcd3 ({host}:{port})"),
        }
    }
}

/// Parse a feature-toggle value such as `FEATURE_CONFIG_DB`.
///
/// Accepts `1/0`, `true/false`, `yes/no`, `on/off` (case-insensitive).
/// Returns `None` for anything else so the caller can fall back to its default.
pub fn parse_feature_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_flag_values() {
        assert_eq!(parse_feature_flag("1"), Some(true));
        assert_eq!(parse_feature_flag(" TRUE "), Some(true));
        assert_eq!(parse_feature_flag("off"), Some(false));
        assert_eq!(parse_feature_flag("maybe"), None);
    }

    #[test]
    fn backend_kind_display() {
        assert_eq!(BackendKind::Memory.to_string(), "memory");
        assert_eq!(BackendKind::etcd_default().to_string(), "etcd3 (127.0.0.1:2379)");
        assert_eq!(BackendKind::etcd_default().as_str(), "etcd3");
    }
}
