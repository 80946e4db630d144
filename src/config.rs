use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::client::BASE_API_URL;
use crate::error::{Error, Result};
use crate::gateway::{Gateway, DEFAULT_MAX_CALLS_PER_SECOND};
use crate::{ItemId, ItemQuality, Language, Selector};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub max_calls_per_second: u32,
    /// The `items.json` name lookup, required.
    pub items_path: PathBuf,
    pub language: Language,
    /// Overrides for the `&fields=` suffixes sent with `trim_fields`.
    pub single_item_fields: Option<String>,
    pub multi_item_fields: Option<String>,
    pub exporter: ExporterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: BASE_API_URL.to_string(),
            max_calls_per_second: DEFAULT_MAX_CALLS_PER_SECOND,
            items_path: PathBuf::from("items.json"),
            language: Language::default(),
            single_item_fields: None,
            multi_item_fields: None,
            exporter: ExporterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    pub listen: SocketAddr,
    /// Seconds between two polling rounds.
    pub interval_secs: u64,
    pub selector: Selector,
    pub listings: u32,
    pub entries: u32,
    pub items: Vec<WatchItem>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 9184)),
            interval_secs: 5 * 60,
            selector: Selector::default(),
            listings: 20,
            entries: 20,
            items: Vec::new(),
        }
    }
}

/// An item the exporter keeps track of.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchItem {
    pub id: ItemId,
    #[serde(default)]
    pub quality: ItemQuality,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Reading config {}: {e}", path.display()))
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn gateway(&self) -> Gateway {
        Gateway::new().with_max_calls_per_second(self.max_calls_per_second)
    }
}
