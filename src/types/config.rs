//! Provider configuration bag.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Credentials and settings required to initialize one adapter.
///
/// Every vendor needs at least an API key; vendor-specific fields (server URL,
/// access secret, ...) live in a string map so new fields are additive.
/// Immutable once handed to a provider.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    api_key: Option<String>,
    base_url: Option<String>,
    options: BTreeMap<String, String>,
}

impl ProviderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the vendor's API base URL (self-hosted servers, mock servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// The API key, treating blank strings as absent.
    pub fn api_key(&self) -> Option<&str> {
        non_blank(self.api_key.as_deref())
    }

    pub fn base_url(&self) -> Option<&str> {
        non_blank(self.base_url.as_deref())
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        non_blank(self.options.get(key).map(String::as_str))
    }

    /// SHA-256 over every field, hex encoded. Used to notice when a cached
    /// provider is requested again with different credentials.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.api_key.as_deref().unwrap_or_default());
        hasher.update([0u8]);
        hasher.update(self.base_url.as_deref().unwrap_or_default());
        for (k, v) in &self.options {
            hasher.update([0u8]);
            hasher.update(k);
            hasher.update([b'=']);
            hasher.update(v);
        }
        hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

// Secrets stay out of logs.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("options", &self.options.keys().collect::<Vec<_>>())
            .finish()
    }
}
