//! Caller-side voice catalog helpers: ownership filtering and name-to-id
//! resolution. Adapters only surface vendor metadata; deciding what counts as
//! "owned" happens here.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::providers::TtsProvider;
use crate::registry::ProviderType;
use crate::types::Voice;
use crate::{Error, ErrorContext, Result};

/// Requests this long are taken as ids; only shorter ones are looked up by name.
const NAME_MAX_LEN: usize = 14;

static VOICE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9-]{15,}$").expect("valid voice id pattern"));

/// Voices the caller created, judged by each vendor's own metadata.
pub fn owned_voices(provider: ProviderType, voices: Vec<Voice>) -> Vec<Voice> {
    match provider {
        ProviderType::ElevenLabs => voices
            .into_iter()
            .filter(|v| v.label("category").and_then(Value::as_str) == Some("cloned"))
            .collect(),
        ProviderType::Cartesia | ProviderType::Resemble => voices
            .into_iter()
            .filter(|v| v.label("is_owner").and_then(Value::as_bool) == Some(true))
            .collect(),
        ProviderType::Xtts | ProviderType::CoeFont => voices,
    }
}

/// Vendor ids are long opaque tokens; human names are not.
pub fn looks_like_voice_id(s: &str) -> bool {
    VOICE_ID.is_match(s)
}

pub fn find_by_name<'a>(voices: &'a [Voice], name: &str) -> Option<&'a Voice> {
    let wanted = name.to_lowercase();
    voices.iter().find(|v| v.name.to_lowercase() == wanted)
}

/// Turn a user-supplied voice (id or name) into a vendor id.
///
/// XTTS voices are speaker WAV paths on the synthesis server and pass through
/// untouched, as does anything too long to be a name.
pub async fn resolve_voice(provider: &dyn TtsProvider, requested: &str) -> Result<String> {
    if provider.name() == ProviderType::Xtts.as_str()
        || looks_like_voice_id(requested)
        || requested.chars().count() > NAME_MAX_LEN
    {
        return Ok(requested.to_string());
    }
    let voices = provider.list_voices().await?;
    if let Some(voice) = voices.iter().find(|v| v.id == requested) {
        return Ok(voice.id.clone());
    }
    match find_by_name(&voices, requested) {
        Some(voice) => {
            tracing::debug!(name = requested, id = %voice.id, "resolved voice name");
            Ok(voice.id.clone())
        }
        None => Err(Error::configuration_with_context(
            format!("Voice not found: {}", requested),
            ErrorContext::new()
                .with_field_path("voice")
                .with_source(provider.name()),
        )),
    }
}
