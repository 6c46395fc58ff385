//! Decryption of `{AES256}`-tagged configuration properties.
//!
//! An [`Environment`] is an ordered stack of named [`PropertySource`]s; the first
//! source holding a key wins. [`decrypt_properties`] layers a
//! `decryptedProperties` source on top that shadows every encrypted value.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use crate::{codec::EnvelopeCodec, error::Result};

/// Name of the source inserted by [`decrypt_properties`].
pub const DECRYPTED_SOURCE_NAME: &str = "decryptedProperties";

/// Named set of string properties.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySource {
    pub name: String,
    pub properties: BTreeMap<String, String>,
}

impl PropertySource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

/// Property sources in precedence order (index 0 wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    sources: Vec<PropertySource>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source with the highest precedence.
    pub fn add_first(&mut self, source: PropertySource) {
        self.sources.insert(0, source);
    }

    /// Add a source with the lowest precedence.
    pub fn add_last(&mut self, source: PropertySource) {
        self.sources.push(source);
    }

    pub fn sources(&self) -> &[PropertySource] {
        &self.sources
    }

    pub fn source(&self, name: &str) -> Option<&PropertySource> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Value of `key` from the highest-precedence source that defines it.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.sources
            .iter()
            .find_map(|s| s.properties.get(key))
            .map(String::as_str)
    }
}

/// Decrypt every tagged property visible in `env`.
///
/// Only the first occurrence of each key is considered, so an encrypted value
/// shadowed by a higher-precedence source is left alone. Returns how many
/// values were decrypted; nothing is added when the count is zero.
pub fn decrypt_properties(env: &mut Environment, codec: &EnvelopeCodec) -> Result<usize> {
    let mut seen = HashSet::new();
    let mut decrypted = PropertySource::new(DECRYPTED_SOURCE_NAME);

    for source in &env.sources {
        for (key, value) in &source.properties {
            if !seen.insert(key.as_str()) {
                continue;
            }
            if EnvelopeCodec::is_encrypted(value) {
                let plain = codec.decrypt_text(value)?;
                decrypted.properties.insert(key.clone(), plain);
            }
        }
    }

    let count = decrypted.properties.len();
    if count > 0 {
        debug!(count, "decrypted properties");
        env.add_first(decrypted);
    }
    Ok(count)
}
