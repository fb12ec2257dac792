//! Site inventory file.
//!
//! Top-level tables are sites keyed by id; each lists its buses (gateway
//! daemons) and the gear to check on them.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::gateway::DEFAULT_PORT;
use crate::proto::AddressError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not open config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("site {site}: gear '{gear}' is on unknown bus '{bus}'")]
    UnknownBus {
        site: String,
        gear: String,
        bus: String,
    },
    #[error("site {site}: gear '{gear}': {source}")]
    Address {
        site: String,
        gear: String,
        #[source]
        source: AddressError,
    },
    #[error("site {site}: bus '{bus}': timeout-ms must be greater than 0")]
    ZeroTimeout { site: String, bus: String },
    #[error("site {site}: gear '{gear}' duplicates {bus}/{address}")]
    DuplicateGear {
        site: String,
        gear: String,
        bus: String,
        address: u8,
    },
    #[error("unrecognised site '{0}'")]
    UnknownSite(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SiteConfig {
    pub name: String,
    #[serde(default)]
    pub buses: BTreeMap<String, BusConfig>,
    #[serde(default)]
    pub gear: Vec<GearConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BusConfig {
    pub hostname: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Display name; defaults to the bus key.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GearConfig {
    pub bus: String,
    pub address: u8,
    pub name: String,
    #[serde(default)]
    pub related_emergency: Option<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub sites: BTreeMap<String, SiteConfig>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let sites: BTreeMap<String, SiteConfig> = toml::from_str(text)?;
        Ok(Self { sites })
    }

    /// Keep only the named sites.
    pub fn retain_sites(&mut self, names: &[String]) -> Result<(), ConfigError> {
        if let Some(missing) = names.iter().find(|n| !self.sites.contains_key(*n)) {
            return Err(ConfigError::UnknownSite(missing.clone()));
        }
        self.sites.retain(|k, _| names.contains(k));
        Ok(())
    }
}
