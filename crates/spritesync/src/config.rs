//! Session configuration.
//!
//! Settings are plain key-value pairs. Where they are persisted is up to the
//! embedding editor; this module only knows how to read them from a JSON
//! file and check them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use spritesync_sync::{EngineConfig, Endpoint, DEFAULT_OVERLAY_LAYER};

use crate::error::{Result, SessionError};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 34613;

/// Lowest port a session may use; privileged ports are rejected.
pub const MIN_PORT: u16 = 1025;

/// Configuration for a sync session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Host name of the peer.
    pub host: String,
    /// Port of the peer.
    pub port: u16,
    /// Connect as soon as the session starts.
    pub autostart: bool,
    /// Report session status as soon as the session starts.
    pub autoshow: bool,
    /// Layer used for UV overlays that do not name one.
    pub overlay_layer: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            autostart: false,
            autoshow: false,
            overlay_layer: DEFAULT_OVERLAY_LAYER.to_string(),
        }
    }
}

impl SessionConfig {
    /// Read and validate a JSON config file. Missing keys take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Write this config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(SessionError::Config("host is empty".into()));
        }
        if self.port < MIN_PORT {
            return Err(SessionError::Config(format!(
                "port {} is outside {MIN_PORT}..=65535",
                self.port
            )));
        }
        if self.overlay_layer.is_empty() {
            return Err(SessionError::Config("overlay layer name is empty".into()));
        }
        Ok(())
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.host.clone(), self.port)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            overlay_layer: self.overlay_layer.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        config.validate().unwrap();
        assert_eq!(config.endpoint().url(), "ws://localhost:34613");
        assert_eq!(config.engine_config().overlay_layer, "UVMap");
        assert!(!config.autostart);
        assert!(!config.autoshow);
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"port": 40000, "autostart": true}}"#).unwrap();

        let config = SessionConfig::load(file.path()).unwrap();
        assert_eq!(config.port, 40000);
        assert!(config.autostart);
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.overlay_layer, DEFAULT_OVERLAY_LAYER);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spritesync.json");
        let config = SessionConfig {
            host: "10.0.0.2".into(),
            overlay_layer: "UV".into(),
            ..SessionConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(SessionConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_rejects_bad_values() {
        let low_port = SessionConfig {
            port: 80,
            ..SessionConfig::default()
        };
        assert!(matches!(low_port.validate(), Err(SessionError::Config(_))));

        let no_host = SessionConfig {
            host: " ".into(),
            ..SessionConfig::default()
        };
        assert!(matches!(no_host.validate(), Err(SessionError::Config(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"port": 1024}}"#).unwrap();
        assert!(matches!(
            SessionConfig::load(file.path()),
            Err(SessionError::Config(_))
        ));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            SessionConfig::load(dir.path().join("missing.json")),
            Err(SessionError::Io(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            SessionConfig::load(file.path()),
            Err(SessionError::Json(_))
        ));
    }
}
