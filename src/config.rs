//! Configuration: the persisted API port and server settings.
//!
//! The only persisted value is the listening port, stored under `api_port`.
//! Storage sits behind [`ConfigStore`] so the server and tests never reach
//! for a process-wide settings object.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

/// Port used when none has been stored.
pub const DEFAULT_PORT: u16 = 8888;

/// Default bind address. The surface has no authentication, so it stays local.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default idle timeout for a connection that has not sent its request yet.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

const PORT_KEY: &str = "api_port";

/// Errors raised while reading, writing or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("config file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("port must be between 1 and 65535, got {0}")]
    InvalidPort(i64),
}

/// Persistent storage for the API port.
pub trait ConfigStore: Send + Sync {
    /// Returns the stored value, unvalidated, or `None` if nothing is stored.
    fn load_port(&self) -> Result<Option<i64>, ConfigError>;

    fn save_port(&self, port: u16) -> Result<(), ConfigError>;
}

/// Resolves the port to listen on.
///
/// Nothing stored (or a stored `0`) yields [`DEFAULT_PORT`], which is then
/// persisted. An out-of-range value also yields the default but is left in
/// place for the user to fix.
pub fn resolve_port(store: &dyn ConfigStore) -> Result<u16, ConfigError> {
    match store.load_port()? {
        None | Some(0) => {
            store.save_port(DEFAULT_PORT)?;
            Ok(DEFAULT_PORT)
        }
        Some(stored) => match u16::try_from(stored) {
            Ok(port) => Ok(port),
            Err(_) => {
                warn!(stored, default = DEFAULT_PORT, "stored port out of range, using default");
                Ok(DEFAULT_PORT)
            }
        },
    }
}

/// Validates and persists a new port. Takes effect on the next start.
pub fn set_port(store: &dyn ConfigStore, value: i64) -> Result<u16, ConfigError> {
    let port = u16::try_from(value)
        .ok()
        .filter(|p| *p != 0)
        .ok_or(ConfigError::InvalidPort(value))?;
    store.save_port(port)?;
    info!(port, "API port updated; restart to apply");
    Ok(port)
}

/// Keeps the port in memory. Used by tests and embedders.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    port: Mutex<Option<i64>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `value`.
    pub fn with_port(value: i64) -> Self {
        Self {
            port: Mutex::new(Some(value)),
        }
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load_port(&self) -> Result<Option<i64>, ConfigError> {
        Ok(*self.port.lock().unwrap_or_else(|e| e.into_inner()))
    }

    fn save_port(&self, port: u16) -> Result<(), ConfigError> {
        *self.port.lock().unwrap_or_else(|e| e.into_inner()) = Some(i64::from(port));
        Ok(())
    }
}

/// Stores settings as a JSON object in a file.
///
/// Keys other than `api_port` are preserved on write. A missing file reads
/// as "nothing stored".
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Map<String, Value>, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

impl ConfigStore for JsonFileStore {
    fn load_port(&self) -> Result<Option<i64>, ConfigError> {
        Ok(self.read()?.get(PORT_KEY).and_then(Value::as_i64))
    }

    fn save_port(&self, port: u16) -> Result<(), ConfigError> {
        let mut settings = self.read()?;
        settings.insert(PORT_KEY.to_owned(), Value::from(port));
        let text = serde_json::to_string_pretty(&settings).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, text).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` waits for the request forever.
    pub idle_timeout: Option<Duration>,
}

impl ServerConfig {
    /// Loads the port from `store`; other settings take their defaults.
    pub fn load(store: &dyn ConfigStore) -> Result<Self, ConfigError> {
        Ok(Self {
            port: resolve_port(store)?,
            ..Self::default()
        })
    }

    /// The `host:port` string to bind.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
        }
    }
}
