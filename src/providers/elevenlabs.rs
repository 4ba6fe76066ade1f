//! ElevenLabs 适配器：语音合成、流式合成、音色克隆
//!
//! ElevenLabs adapter. Differences worth knowing:
//! - Auth is the `xi-api-key` header, set once at initialization.
//! - `voice_settings` is always sent in full; missing knobs are defaulted here.
//! - Streaming uses the chunked `/stream` endpoint and is truly incremental.
//! - Errors come back as `{detail:{message}}`, `{detail}`, `{message}` or plain text.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::{
    body_stream, initialized, read_bytes, read_json, send_checked, trim_base, TtsProvider,
};
use crate::transport::{build_client, ErrorBody};
use crate::types::voice::validate_samples;
use crate::types::{AudioStream, ProviderConfig, SynthesisOptions, Voice, VoiceSample};
use crate::{Error, Result};

const NAME: &str = "elevenlabs";
const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1";
const DEFAULT_OUTPUT_FORMAT: &str = "mp3_44100_128";
const MONOLINGUAL_MODEL: &str = "eleven_monolingual_v1";
const MULTILINGUAL_MODEL: &str = "eleven_multilingual_v2";

const SUPPORTED_FORMATS: &[&str] = &[
    "mp3_44100_128",
    "mp3_44100_64",
    "mp3_44100_32",
    "mp3_44100_16",
    "pcm_16000",
    "pcm_22050",
    "pcm_24000",
    "pcm_44100",
];

#[derive(Debug)]
struct Client {
    http: reqwest::Client,
    base_url: String,
}

/// ElevenLabs text-to-speech adapter.
#[derive(Debug, Default)]
pub struct ElevenLabsProvider {
    state: Option<Client>,
}

impl ElevenLabsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client> {
        initialized(&self.state, NAME)
    }

    /// Map a generic format name onto an ElevenLabs `output_format`.
    pub fn output_format(format: Option<&str>) -> &'static str {
        let Some(format) = format.map(str::trim) else {
            return DEFAULT_OUTPUT_FORMAT;
        };
        if let Some(exact) = SUPPORTED_FORMATS.iter().find(|f| **f == format) {
            return exact;
        }
        match format.to_lowercase().as_str() {
            "pcm" | "raw" | "wav" => "pcm_44100",
            _ => DEFAULT_OUTPUT_FORMAT,
        }
    }

    fn recommended_model(language: Option<&str>) -> &'static str {
        match language {
            Some(lang) if lang != "en" => MULTILINGUAL_MODEL,
            _ => MONOLINGUAL_MODEL,
        }
    }

    /// JSON body shared by buffered and streaming synthesis.
    pub fn request_body(text: &str, options: &SynthesisOptions) -> Value {
        let settings = options.resolved_settings();
        let model_id = options
            .model_id
            .as_deref()
            .unwrap_or_else(|| Self::recommended_model(options.language.as_deref()));

        let mut body = json!({
            "text": text,
            "model_id": model_id,
            "voice_settings": {
                "stability": settings.stability_or_default(),
                "similarity_boost": settings.similarity_or_default(),
                "style": settings.style_or_default(),
                "use_speaker_boost": settings.speaker_boost_or_default(),
            },
        });
        for (k, v) in &settings.extra {
            body["voice_settings"][k] = v.clone();
        }
        if let Some(lang) = &options.language {
            body["language_code"] = Value::String(lang.clone());
        }
        body
    }

    /// `detail.message`, then `detail`, then `message`, then the raw body.
    pub fn error_cause(body: &ErrorBody) -> String {
        let cause = body
            .json_string()
            .or_else(|| body.str_at("/detail/message"))
            .or_else(|| body.str_at("/detail"))
            .or_else(|| body.str_at("/message"))
            .or_else(|| body.text())
            .unwrap_or_else(|| body.transport_text());
        if body.status() == Some(StatusCode::FORBIDDEN) {
            format!(
                "{} (403 Forbidden - Check your subscription quota at https://elevenlabs.io/)",
                cause
            )
        } else {
            cause
        }
    }

    fn synthesis_request(
        &self,
        path: &str,
        text: &str,
        options: &SynthesisOptions,
    ) -> Result<reqwest::RequestBuilder> {
        let client = self.client()?;
        let format = Self::output_format(options.output_format.as_deref());
        tracing::debug!(provider = NAME, path, format, "synthesis request");
        Ok(client
            .http
            .post(format!("{}{}", client.base_url, path))
            .query(&[("output_format", format)])
            .json(&Self::request_body(text, options)))
    }
}

#[derive(Debug, Deserialize)]
struct VoiceList {
    #[serde(default)]
    voices: Vec<VoiceRecord>,
}

#[derive(Debug, Deserialize)]
struct VoiceRecord {
    voice_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    labels: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    preview_url: Option<String>,
    #[serde(default)]
    verified_languages: Vec<VerifiedLanguage>,
}

#[derive(Debug, Deserialize)]
struct VerifiedLanguage {
    language: String,
}

impl From<VoiceRecord> for Voice {
    fn from(r: VoiceRecord) -> Self {
        let mut languages: Vec<String> = Vec::new();
        for l in r.verified_languages {
            if !languages.contains(&l.language) {
                languages.push(l.language);
            }
        }
        let mut labels = r.labels.unwrap_or_default();
        if let Some(category) = r.category {
            labels.insert("category".to_string(), Value::String(category));
        }
        Voice {
            name: r.name.unwrap_or_else(|| r.voice_id.clone()),
            id: r.voice_id,
            description: r.description,
            provider: NAME.to_string(),
            languages,
            labels,
            preview_url: r.preview_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedVoice {
    voice_id: String,
}

#[async_trait]
impl TtsProvider for ElevenLabsProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn initialize(&mut self, config: ProviderConfig) -> Result<()> {
        let api_key = config
            .api_key()
            .ok_or_else(|| Error::missing_credential(NAME, "api_key", "API key is required"))?;
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| Error::configuration("API key contains invalid characters"))?;
        key.set_sensitive(true);
        headers.insert("xi-api-key", key);

        self.state = Some(Client {
            http: build_client(headers)?,
            base_url: trim_base(config.base_url().unwrap_or(DEFAULT_BASE_URL)),
        });
        Ok(())
    }

    async fn text_to_speech(
        &self,
        text: &str,
        voice_id: &str,
        options: &SynthesisOptions,
    ) -> Result<Bytes> {
        const ACTION: &str = "Text-to-speech failed";
        let req = self.synthesis_request(&format!("/text-to-speech/{}", voice_id), text, options)?;
        let resp = send_checked(NAME, req, ACTION, Self::error_cause).await?;
        read_bytes(NAME, resp, ACTION).await
    }

    async fn text_to_speech_stream(
        &self,
        text: &str,
        voice_id: &str,
        options: &SynthesisOptions,
    ) -> Result<AudioStream> {
        const ACTION: &str = "Text-to-speech stream failed";
        let req = self
            .synthesis_request(&format!("/text-to-speech/{}/stream", voice_id), text, options)?
            .header(ACCEPT, "audio/mpeg");
        let resp = send_checked(NAME, req, ACTION, Self::error_cause).await?;
        Ok(body_stream(NAME, resp, ACTION))
    }

    async fn list_voices(&self) -> Result<Vec<Voice>> {
        const ACTION: &str = "Failed to list voices";
        let client = self.client()?;
        let req = client.http.get(format!("{}/voices", client.base_url));
        let resp = send_checked(NAME, req, ACTION, Self::error_cause).await?;
        let list: VoiceList = read_json(NAME, resp, ACTION).await?;
        Ok(list.voices.into_iter().map(Voice::from).collect())
    }

    async fn get_voice(&self, voice_id: &str) -> Result<Option<Voice>> {
        const ACTION: &str = "Failed to get voice";
        let client = self.client()?;
        let resp = client
            .http
            .get(format!("{}/voices/{}", client.base_url, voice_id))
            .send()
            .await
            .map_err(|e| {
                Error::provider(
                    NAME,
                    format!("{}: {}", ACTION, Self::error_cause(&ErrorBody::from_transport(&e))),
                )
            })?;

        if resp.status().is_success() {
            let record: VoiceRecord = read_json(NAME, resp, ACTION).await?;
            return Ok(Some(record.into()));
        }
        let body = ErrorBody::from_response(resp).await;
        let not_found = body.status() == Some(StatusCode::NOT_FOUND)
            || body.str_at("/detail/status").as_deref() == Some("voice_not_found");
        if not_found {
            return Ok(None);
        }
        Err(Error::provider(
            NAME,
            format!("{}: {}", ACTION, Self::error_cause(&body)),
        ))
    }

    fn supports_voice_cloning(&self) -> bool {
        true
    }

    async fn create_voice(
        &self,
        name: &str,
        samples: &[VoiceSample],
        description: Option<&str>,
    ) -> Result<String> {
        const ACTION: &str = "Failed to create voice";
        validate_samples(samples)?;
        let client = self.client()?;

        let mut form = reqwest::multipart::Form::new().text("name", name.to_string());
        if let Some(desc) = description {
            form = form.text("description", desc.to_string());
        }
        for sample in samples {
            let part = reqwest::multipart::Part::bytes(sample.data.to_vec())
                .file_name(sample.file_name.clone())
                .mime_str(&sample.content_type)
                .map_err(|e| Error::configuration(format!("Invalid mime: {}", e)))?;
            form = form.part("files", part);
        }

        let req = client
            .http
            .post(format!("{}/voices/add", client.base_url))
            .multipart(form);
        let resp = send_checked(NAME, req, ACTION, Self::error_cause).await?;
        let created: CreatedVoice = read_json(NAME, resp, ACTION).await?;
        tracing::debug!(provider = NAME, voice_id = %created.voice_id, "voice created");
        Ok(created.voice_id)
    }

    async fn delete_voice(&self, voice_id: &str) -> Result<()> {
        let client = self.client()?;
        let req = client
            .http
            .delete(format!("{}/voices/{}", client.base_url, voice_id));
        send_checked(NAME, req, "Failed to delete voice", Self::error_cause).await?;
        Ok(())
    }

    fn supported_formats(&self) -> &'static [&'static str] {
        SUPPORTED_FORMATS
    }

    async fn validate_connection(&self) -> bool {
        let Ok(client) = self.client() else {
            return false;
        };
        match client
            .http
            .get(format!("{}/user/subscription", client.base_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(provider = NAME, "connection check failed: {}", e);
                false
            }
        }
    }
}
