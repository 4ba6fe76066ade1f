//! Provider 注册表：按厂商类型惰性构建并缓存适配器实例
//!
//! Provider registry: the single point of construction for vendor adapters.
//! Each vendor type gets at most one live, initialized instance per registry;
//! later requests for the same type return that instance unchanged.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tokio::sync::Mutex;

use crate::providers::{
    CartesiaProvider, CoeFontProvider, ElevenLabsProvider, ResembleProvider, TtsProvider,
    XttsProvider,
};
use crate::types::ProviderConfig;
use crate::{Error, ErrorContext, Result};

/// Compiled-in vendor set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderType {
    ElevenLabs,
    Cartesia,
    Xtts,
    CoeFont,
    Resemble,
}

impl ProviderType {
    pub const ALL: [ProviderType; 5] = [
        ProviderType::ElevenLabs,
        ProviderType::Cartesia,
        ProviderType::Xtts,
        ProviderType::CoeFont,
        ProviderType::Resemble,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderType::ElevenLabs => "elevenlabs",
            ProviderType::Cartesia => "cartesia",
            ProviderType::Xtts => "xtts",
            ProviderType::CoeFont => "coefont",
            ProviderType::Resemble => "resemble",
        }
    }

    /// Environment variable holding this vendor's API key.
    pub fn env_key(&self) -> String {
        format!("{}_API_KEY", self.as_str().to_uppercase())
    }

    /// Human-facing name for listings.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderType::ElevenLabs => "ElevenLabs",
            ProviderType::Cartesia => "Cartesia",
            ProviderType::Xtts => "XTTS v2",
            ProviderType::CoeFont => "CoeFont",
            ProviderType::Resemble => "Resemble AI",
        }
    }

    fn instantiate(&self) -> Box<dyn TtsProvider> {
        match self {
            ProviderType::ElevenLabs => Box::new(ElevenLabsProvider::new()),
            ProviderType::Cartesia => Box::new(CartesiaProvider::new()),
            ProviderType::Xtts => Box::new(XttsProvider::new()),
            ProviderType::CoeFont => Box::new(CoeFontProvider::new()),
            ProviderType::Resemble => Box::new(ResembleProvider::new()),
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        ProviderType::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| {
                Error::configuration_with_context(
                    format!("Unknown provider type: {}", s),
                    ErrorContext::new()
                        .with_field_path("ttsProvider")
                        .with_details(format!("expected one of: {}", supported_providers().join(", ")))
                        .with_source("registry"),
                )
            })
    }
}

/// Vendor identifiers in registry order.
pub fn supported_providers() -> Vec<&'static str> {
    ProviderType::ALL.iter().map(ProviderType::as_str).collect()
}

struct Entry {
    provider: Arc<dyn TtsProvider>,
    fingerprint: String,
}

/// Memoizing factory. The cache is keyed by vendor type only; a second
/// request with different credentials logs a warning and returns the
/// original instance.
#[derive(Default)]
pub struct ProviderFactory {
    instances: Mutex<HashMap<ProviderType, Entry>>,
}

impl fmt::Debug for ProviderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderFactory").finish_non_exhaustive()
    }
}

impl ProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached instance for `provider_type`, or construct, initialize
    /// and cache one. The whole check-construct-insert sequence runs under the
    /// registry lock, so concurrent callers observe a single instance.
    /// A failed `initialize` leaves the cache untouched.
    pub async fn create_provider(
        &self,
        provider_type: &str,
        config: ProviderConfig,
    ) -> Result<Arc<dyn TtsProvider>> {
        let kind = ProviderType::from_str(provider_type)?;
        let mut instances = self.instances.lock().await;

        if let Some(entry) = instances.get(&kind) {
            if entry.fingerprint != config.fingerprint() {
                tracing::warn!(
                    provider = kind.as_str(),
                    "provider already initialized with different configuration; keeping the original"
                );
            }
            return Ok(Arc::clone(&entry.provider));
        }

        let fingerprint = config.fingerprint();
        let mut provider = kind.instantiate();
        provider.initialize(config).await?;
        let provider: Arc<dyn TtsProvider> = Arc::from(provider);
        tracing::debug!(provider = kind.as_str(), "provider initialized");

        instances.insert(
            kind,
            Entry {
                provider: Arc::clone(&provider),
                fingerprint,
            },
        );
        Ok(provider)
    }

    /// Non-constructing lookup. Unknown types are simply absent.
    pub async fn get_provider(&self, provider_type: &str) -> Option<Arc<dyn TtsProvider>> {
        let kind = ProviderType::from_str(provider_type).ok()?;
        self.instances
            .lock()
            .await
            .get(&kind)
            .map(|e| Arc::clone(&e.provider))
    }

    pub async fn clear_providers(&self) {
        self.instances.lock().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.instances.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn supported_providers(&self) -> Vec<&'static str> {
        supported_providers()
    }
}

static GLOBAL: Lazy<ProviderFactory> = Lazy::new(ProviderFactory::new);

/// Process-wide registry.
pub fn global() -> &'static ProviderFactory {
    &GLOBAL
}
