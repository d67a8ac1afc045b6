//! Runtime configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Default number of rows a cursor pulls per backend read.
pub const DEFAULT_CURSOR_BATCH_SIZE: usize = 50;

/// Tunables for an [`Odm`](crate::Odm) instance. Every field is optional in
/// the TOML form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdmConfig {
    /// Rows pulled from the backend per cursor read. Values below 1 are
    /// treated as 1.
    pub cursor_batch_size: usize,
    /// Emit debug logs for every storage round-trip.
    pub log_queries: bool,
}

impl Default for OdmConfig {
    fn default() -> Self {
        Self {
            cursor_batch_size: DEFAULT_CURSOR_BATCH_SIZE,
            log_queries: true,
        }
    }
}

/// On-disk layout: everything lives under an `[odm]` table.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    odm: OdmConfig,
}

impl OdmConfig {
    /// Effective batch size, never zero.
    pub fn batch_size(&self) -> usize {
        self.cursor_batch_size.max(1)
    }

    /// Parses the `[odm]` table of a TOML document. A document without the
    /// table yields the defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str::<ConfigFile>(contents).map(|file| file.odm)
    }

    /// Loads configuration from a TOML file, falling back to the defaults
    /// when the file is missing or cannot be parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config file found at {:?}, using defaults", path);
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => {
                    info!("Loaded odm config from {:?}", path);
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse config file {:?}: {}. Falling back to defaults.",
                        path, e
                    );
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read config file {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}
