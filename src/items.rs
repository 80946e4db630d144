use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::{ItemId, Language};

/// Item id to its display name in every language, read from the bundled `items.json`.
#[derive(Debug, Clone, Default)]
pub struct ItemNames {
    names: HashMap<String, HashMap<Language, String>>,
}

impl ItemNames {
    /// Loads the lookup file. A missing file is a configuration error, the client can't be built without it.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Configuration(format!(
                "Unable to locate items file at {}",
                path.display()
            )));
        }

        let raw = std::fs::read(path)?;
        let names = Self::from_slice(&raw)?;
        tracing::debug!(path = %path.display(), items = names.len(), "Loaded item names");
        Ok(names)
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        Ok(Self {
            names: serde_json::from_slice(raw)?,
        })
    }

    pub fn get(&self, item: ItemId, language: Language) -> Option<&str> {
        self.names
            .get(&item.to_string())?
            .get(&language)
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
