//! Synthesis options.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_STABILITY: f32 = 0.5;
pub const DEFAULT_SIMILARITY: f32 = 0.75;
pub const DEFAULT_STYLE: f32 = 0.0;
pub const DEFAULT_SPEAKER_BOOST: bool = true;

/// Voice knobs. Every field is optional; adapters that send settings fill the
/// gaps with defaults so the vendor never sees a partial object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub stability: Option<f32>,
    pub similarity: Option<f32>,
    pub style: Option<f32>,
    pub speaker_boost: Option<bool>,
    /// Vendor-specific knobs, forwarded only by adapters that know them.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl VoiceSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stability(mut self, v: f32) -> Self {
        self.stability = Some(v);
        self
    }

    pub fn with_similarity(mut self, v: f32) -> Self {
        self.similarity = Some(v);
        self
    }

    pub fn with_style(mut self, v: f32) -> Self {
        self.style = Some(v);
        self
    }

    pub fn with_speaker_boost(mut self, v: bool) -> Self {
        self.speaker_boost = Some(v);
        self
    }

    pub fn stability_or_default(&self) -> f32 {
        self.stability.unwrap_or(DEFAULT_STABILITY)
    }

    pub fn similarity_or_default(&self) -> f32 {
        self.similarity.unwrap_or(DEFAULT_SIMILARITY)
    }

    pub fn style_or_default(&self) -> f32 {
        self.style.unwrap_or(DEFAULT_STYLE)
    }

    pub fn speaker_boost_or_default(&self) -> bool {
        self.speaker_boost.unwrap_or(DEFAULT_SPEAKER_BOOST)
    }
}

/// Per-request synthesis options. Recognized keys are vendor-dependent and an
/// adapter ignores what it does not understand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SynthesisOptions {
    pub voice_settings: Option<VoiceSettings>,
    pub output_format: Option<String>,
    pub model_id: Option<String>,
    pub language: Option<String>,
}

impl SynthesisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_voice_settings(mut self, settings: VoiceSettings) -> Self {
        self.voice_settings = Some(settings);
        self
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = Some(format.into());
        self
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = Some(model_id.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Settings with every knob resolved; missing settings are all-default.
    pub fn resolved_settings(&self) -> VoiceSettings {
        let s = self.voice_settings.clone().unwrap_or_default();
        VoiceSettings {
            stability: Some(s.stability_or_default()),
            similarity: Some(s.similarity_or_default()),
            style: Some(s.style_or_default()),
            speaker_boost: Some(s.speaker_boost_or_default()),
            extra: s.extra,
        }
    }
}
