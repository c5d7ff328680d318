//! In-memory output assets of a compilation.

use std::collections::BTreeMap;
use thiserror::Error;

/// Asset table errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssetError {
    /// `emit_asset` was called for a name that already exists
    #[error("Conflict: multiple assets emit to the same name '{0}'")]
    AlreadyExists(String),
}

/// A named, immutable blob of output bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    source: Vec<u8>,
    /// Plugin that last wrote this asset
    producer: String,
}

impl Asset {
    /// Create an asset from raw bytes.
    pub fn raw(source: impl Into<Vec<u8>>, producer: impl Into<String>) -> Self {
        Self { source: source.into(), producer: producer.into() }
    }

    /// The asset bytes.
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// The bytes as text, if they are UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.source).ok()
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.source.len()
    }

    /// Name of the plugin that wrote the asset.
    pub fn producer(&self) -> &str {
        &self.producer
    }
}

/// Assets of one compilation, keyed by output name.
#[derive(Debug, Default, Clone)]
pub struct AssetTable {
    assets: BTreeMap<String, Asset>,
}

impl AssetTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new asset; fails if the name is taken.
    pub fn emit_asset(&mut self, name: impl Into<String>, asset: Asset) -> Result<(), AssetError> {
        let name = name.into();
        if self.assets.contains_key(&name) {
            return Err(AssetError::AlreadyExists(name));
        }
        self.assets.insert(name, asset);
        Ok(())
    }

    /// Create or replace an asset. Returns the replaced asset, if any.
    pub fn update_asset(&mut self, name: impl Into<String>, asset: Asset) -> Option<Asset> {
        self.assets.insert(name.into(), asset)
    }

    /// Look up an asset by name.
    pub fn get(&self, name: &str) -> Option<&Asset> {
        self.assets.get(name)
    }

    /// Whether an asset with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.assets.contains_key(name)
    }

    /// Asset names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.assets.keys().map(String::as_str)
    }

    /// Iterate `(name, asset)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Asset)> {
        self.assets.iter().map(|(name, asset)| (name.as_str(), asset))
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
