//! Voice catalog types.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{Error, ErrorContext, Result};

/// Largest accepted sample file for cloning.
pub const MAX_SAMPLE_BYTES: u64 = 10 * 1024 * 1024;
/// Most samples a single clone request may carry.
pub const MAX_SAMPLES: usize = 25;

const SAMPLE_EXTENSIONS: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("m4a", "audio/mp4"),
    ("ogg", "audio/ogg"),
    ("flac", "audio/flac"),
];

/// A vendor voice. Never mutated after being returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Vendor name (`elevenlabs`, `cartesia`, ...).
    pub provider: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<String>,
    /// Vendor metadata such as ownership/visibility flags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

impl Voice {
    pub fn new(id: impl Into<String>, name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            provider: provider.into(),
            languages: Vec::new(),
            labels: BTreeMap::new(),
            preview_url: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn label(&self, key: &str) -> Option<&serde_json::Value> {
        self.labels.get(key)
    }
}

/// Audio uploaded to create a cloned voice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSample {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

impl VoiceSample {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Read and validate a local sample (extension, size).
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ctx = || {
            ErrorContext::new()
                .with_field_path("samples")
                .with_details(path.display().to_string())
        };

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        let content_type = content_type_for(&extension).ok_or_else(|| {
            let supported: Vec<String> = SAMPLE_EXTENSIONS
                .iter()
                .map(|(ext, _)| format!(".{}", ext))
                .collect();
            Error::configuration_with_context(
                format!(
                    "Invalid audio format: .{}. Supported formats: {}",
                    extension,
                    supported.join(", ")
                ),
                ctx(),
            )
        })?;

        let meta = tokio::fs::metadata(path).await.map_err(|_| {
            Error::configuration_with_context("Audio file not found", ctx())
        })?;
        if meta.len() > MAX_SAMPLE_BYTES {
            return Err(Error::configuration_with_context(
                "Audio file too large (max 10MB)",
                ctx(),
            ));
        }

        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("sample.{}", extension));
        Ok(Self::new(file_name, content_type, data))
    }
}

fn content_type_for(extension: &str) -> Option<&'static str> {
    SAMPLE_EXTENSIONS
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, ct)| *ct)
}

/// Check the sample count accepted by clone endpoints.
pub fn validate_samples(samples: &[VoiceSample]) -> Result<()> {
    if samples.is_empty() {
        return Err(Error::configuration("At least one audio file is required"));
    }
    if samples.len() > MAX_SAMPLES {
        return Err(Error::configuration(format!(
            "Maximum {} audio files allowed",
            MAX_SAMPLES
        )));
    }
    Ok(())
}
