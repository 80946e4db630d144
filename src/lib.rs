use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;

pub mod client;
pub mod config;
pub mod error;
pub mod exporter;
pub mod gateway;
pub mod items;
pub mod metrics;
pub mod normalize;
pub mod records;
pub mod selector;

#[cfg(test)]
mod testing;

pub use client::{Client, CurrentQuery, HistoryQuery};
pub use error::{Error, RequestFailure, Result};
pub use gateway::Gateway;
pub use items::ItemNames;
pub use normalize::Normalizer;
pub use records::{CurrentData, HistoryData, HistoryEntry, ListingEntry};
pub use selector::{DataCenter, Selector, World, DEFAULT_DATACENTER, DEFAULT_WORLD};

/// A tradeable item. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct ItemId(u32);

impl ItemId {
    pub fn new(id: u32) -> Option<Self> {
        (id > 0).then_some(Self(id))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for ItemId {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self> {
        Self::new(value).ok_or_else(|| Error::InvalidItemId(value.to_string()))
    }
}

impl FromStr for ItemId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| Error::InvalidItemId(s.to_string()))
    }
}

impl TryFrom<&str> for ItemId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        value.parse()
    }
}

/// Ids in config files may be written as numbers or strings.
impl TryFrom<serde_json::Value> for ItemId {
    type Error = Error;

    fn try_from(value: serde_json::Value) -> Result<Self> {
        match &value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .and_then(Self::new)
                .ok_or_else(|| Error::InvalidItemId(n.to_string())),
            serde_json::Value::String(s) => s.parse(),
            other => Err(Error::InvalidItemId(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum ItemQuality {
    #[default]
    NQ,
    HQ,
}

impl ItemQuality {
    /// Value of the `hq` query parameter.
    pub fn query_value(&self) -> u8 {
        match self {
            Self::NQ => 0,
            Self::HQ => 1,
        }
    }
}

impl From<&ItemQuality> for &'static str {
    fn from(value: &ItemQuality) -> Self {
        match value {
            ItemQuality::NQ => "nq",
            ItemQuality::HQ => "hq",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
    Ja,
    Fr,
}

impl Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::En => write!(f, "en"),
            Self::De => write!(f, "de"),
            Self::Ja => write!(f, "ja"),
            Self::Fr => write!(f, "fr"),
        }
    }
}
