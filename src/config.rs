//! Persistent user configuration.
//!
//! A small JSON record stored at `$SAYM_CONFIG` or `~/.saymrc`. Keys are
//! camelCase; unknown keys survive a load/save cycle. Credentials resolve from
//! the environment first, then from this record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::registry::ProviderType;
use crate::types::{ProviderConfig, VoiceSettings};
use crate::{Error, ErrorContext, Result};

pub const CONFIG_ENV: &str = "SAYM_CONFIG";
const CONFIG_FILE_NAME: &str = ".saymrc";

/// Record keys whose values are always text.
const STRING_KEYS: &[&str] = &["defaultVoice", "defaultLanguage", "outputFormat", "ttsProvider"];

/// Stored voice knobs, using the vendor-neutral names the file has always used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVoiceSettings {
    #[serde(default = "default_stability")]
    pub stability: f32,
    #[serde(default = "default_similarity")]
    pub similarity_boost: f32,
    #[serde(default)]
    pub style: f32,
    #[serde(default = "default_speaker_boost")]
    pub use_speaker_boost: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_stability() -> f32 {
    crate::types::options::DEFAULT_STABILITY
}

fn default_similarity() -> f32 {
    crate::types::options::DEFAULT_SIMILARITY
}

fn default_speaker_boost() -> bool {
    crate::types::options::DEFAULT_SPEAKER_BOOST
}

impl Default for StoredVoiceSettings {
    fn default() -> Self {
        Self {
            stability: default_stability(),
            similarity_boost: default_similarity(),
            style: crate::types::options::DEFAULT_STYLE,
            use_speaker_boost: default_speaker_boost(),
            extra: Map::new(),
        }
    }
}

impl From<&StoredVoiceSettings> for VoiceSettings {
    fn from(s: &StoredVoiceSettings) -> Self {
        VoiceSettings::new()
            .with_stability(s.stability)
            .with_similarity(s.similarity_boost)
            .with_style(s.style)
            .with_speaker_boost(s.use_speaker_boost)
    }
}

/// Per-vendor section of the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_secret: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_voice: Option<String>,
    #[serde(default = "default_language")]
    pub default_language: String,
    #[serde(default = "default_output_format")]
    pub output_format: String,
    #[serde(default)]
    pub voice_settings: StoredVoiceSettings,
    #[serde(default = "default_provider")]
    pub tts_provider: String,
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_output_format() -> String {
    "mp3".to_string()
}

fn default_provider() -> String {
    ProviderType::ElevenLabs.as_str().to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_voice: None,
            default_language: default_language(),
            output_format: default_output_format(),
            voice_settings: StoredVoiceSettings::default(),
            tts_provider: default_provider(),
            providers: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

/// Default location: `$SAYM_CONFIG`, else `~/.saymrc`.
pub fn default_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    dirs::home_dir()
        .map(|home| home.join(CONFIG_FILE_NAME))
        .ok_or_else(|| Error::configuration("Could not determine home directory"))
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Loaded configuration bound to its file.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
    config: Config,
}

impl ConfigManager {
    /// Load from `path`. A missing file yields defaults; a malformed one is
    /// reported and replaced by defaults.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = Self::read(&path);
        Self { path, config }
    }

    pub fn load_default() -> Result<Self> {
        Ok(Self::load(default_path()?))
    }

    fn read(path: &Path) -> Config {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Config::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to read config file: {}", e);
                return Config::default();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), "failed to parse config file: {}", e);
                Config::default()
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn save(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.config)?;
        fs::write(&self.path, json)?;
        tracing::debug!(path = %self.path.display(), "config saved");
        Ok(())
    }

    /// The whole record as JSON.
    pub fn all(&self) -> Value {
        serde_json::to_value(&self.config).unwrap_or(Value::Null)
    }

    /// Top-level value by camelCase key.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.all() {
            Value::Object(mut map) => map.remove(key),
            _ => None,
        }
    }

    /// Set a top-level key and persist. Text keys (and keys already holding a
    /// string) store `raw` verbatim. Elsewhere `raw` is parsed as JSON when it
    /// can be (`0.3`, `true`, `{..}`) and kept as a string otherwise.
    /// `<provider>DefaultVoice` keys update that provider's section.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        if let Some(provider) = key.strip_suffix("DefaultVoice").filter(|p| !p.is_empty()) {
            let kind = ProviderType::from_str(provider)?;
            return self.set_provider_default_voice(kind, raw);
        }

        if key == "ttsProvider" {
            ProviderType::from_str(raw)?;
        }
        let text_key = STRING_KEYS.contains(&key) || matches!(self.get(key), Some(Value::String(_)));
        let value = if text_key {
            Value::String(raw.to_string())
        } else {
            serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        };

        let mut map = match self.all() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        map.insert(key.to_string(), value);
        self.config = serde_json::from_value(Value::Object(map)).map_err(|e| {
            Error::configuration_with_context(
                format!("Invalid value for {}", key),
                ErrorContext::new()
                    .with_field_path(key)
                    .with_details(e.to_string())
                    .with_source("config"),
            )
        })?;
        self.save()
    }

    /// Back to defaults; the file is removed.
    pub fn reset(&mut self) -> Result<()> {
        self.config = Config::default();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Configured active provider, validated.
    pub fn active_provider(&self) -> Result<ProviderType> {
        ProviderType::from_str(&self.config.tts_provider)
    }

    pub fn set_active_provider(&mut self, provider: ProviderType) -> Result<()> {
        self.config.tts_provider = provider.as_str().to_string();
        self.save()
    }

    fn entry(&self, provider: ProviderType) -> Option<&ProviderEntry> {
        self.config.providers.get(provider.as_str())
    }

    /// `<PROVIDER>_API_KEY`, then the stored key.
    pub fn api_key(&self, provider: ProviderType) -> Option<String> {
        env_value(&provider.env_key()).or_else(|| {
            self.entry(provider)
                .and_then(|e| e.api_key.clone())
                .filter(|k| !k.trim().is_empty())
        })
    }

    /// Provider-specific default voice, then the global one.
    pub fn default_voice(&self, provider: ProviderType) -> Option<String> {
        self.entry(provider)
            .and_then(|e| e.default_voice.clone())
            .or_else(|| self.config.default_voice.clone())
            .filter(|v| !v.trim().is_empty())
    }

    pub fn set_provider_default_voice(&mut self, provider: ProviderType, voice_id: &str) -> Result<()> {
        self.config
            .providers
            .entry(provider.as_str().to_string())
            .or_default()
            .default_voice = Some(voice_id.to_string());
        self.save()
    }

    /// Stored voice settings as synthesis knobs.
    pub fn voice_settings(&self) -> VoiceSettings {
        VoiceSettings::from(&self.config.voice_settings)
    }

    /// Everything an adapter needs, with environment overrides applied.
    pub fn provider_config(&self, provider: ProviderType) -> ProviderConfig {
        let prefix = provider.as_str().to_uppercase();
        let entry = self.entry(provider);
        let mut config = ProviderConfig::new();

        if let Some(key) = self.api_key(provider) {
            config = config.with_api_key(key);
        }
        if let Some(url) = env_value(&format!("{}_BASE_URL", prefix))
            .or_else(|| entry.and_then(|e| e.base_url.clone()))
        {
            config = config.with_base_url(url);
        }
        if let Some(url) = env_value(&format!("{}_SERVER_URL", prefix))
            .or_else(|| entry.and_then(|e| e.server_url.clone()))
        {
            config = config.with_option("server_url", url);
        }
        if let Some(secret) = env_value(&format!("{}_ACCESS_SECRET", prefix))
            .or_else(|| entry.and_then(|e| e.access_secret.clone()))
        {
            config = config.with_option("access_secret", secret);
        }
        config
    }
}
