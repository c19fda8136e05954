//! Server configuration from environment variables.

use std::path::PathBuf;

use civicsense_classifier::{ClassifierConfig, ClassifierError};
use civicsense_database::DEFAULT_DB_PATH;

/// Everything `run_server` needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to bind, `BIND_ADDR` (default `127.0.0.1`).
    pub bind_addr: String,
    /// Port to bind, `PORT` (default `8080`).
    pub port: u16,
    /// `SQLite` issue store, `CIVICSENSE_DB_PATH` (default
    /// `data/civicsense.db`).
    pub db_path: PathBuf,
    /// Image classifier endpoint. `None` disables photo analysis.
    pub classifier: Option<ClassifierConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            classifier: None,
        }
    }
}

impl ServerConfig {
    /// Reads the configuration from the environment, falling back to
    /// defaults for anything unset.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::Config`] if the classifier settings are
    /// invalid.
    pub fn from_env() -> Result<Self, ClassifierError> {
        let defaults = Self::default();

        let bind_addr = std::env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);
        let db_path = std::env::var("CIVICSENSE_DB_PATH")
            .map_or(defaults.db_path, PathBuf::from);

        Ok(Self {
            bind_addr,
            port,
            db_path,
            classifier: ClassifierConfig::from_env()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.db_path, PathBuf::from("data/civicsense.db"));
        assert!(config.classifier.is_none());
    }
}
