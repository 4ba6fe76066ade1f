//! Resemble AI adapter.
//!
//! Catalog calls go to the v2 REST API; synthesis goes to the cluster endpoint,
//! which answers with base64 audio inside JSON. No incremental transport.

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{initialized, read_json, send_checked, single_chunk, trim_base, TtsProvider};
use crate::transport::{build_client, ErrorBody};
use crate::types::{AudioStream, ProviderConfig, SynthesisOptions, Voice};
use crate::{Error, Result};

const NAME: &str = "resemble";
const DEFAULT_CATALOG_URL: &str = "https://app.resemble.ai/api/v2";
const DEFAULT_SYNTHESIS_URL: &str = "https://f.cluster.resemble.ai";
const SAMPLE_RATE: u32 = 48_000;

const SUPPORTED_FORMATS: &[&str] = &["mp3", "wav"];

#[derive(Debug)]
struct Client {
    http: reqwest::Client,
    catalog_url: String,
    synthesis_url: String,
}

#[derive(Debug, Default)]
pub struct ResembleProvider {
    state: Option<Client>,
}

impl ResembleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client> {
        initialized(&self.state, NAME)
    }

    pub fn error_cause(body: &ErrorBody) -> String {
        body.str_at("/message")
            .or_else(|| body.str_at("/error"))
            .or_else(|| body.text())
            .unwrap_or_else(|| body.transport_text())
    }

    /// `wav` is honoured; everything else is mp3.
    pub fn output_format(format: Option<&str>) -> &'static str {
        match format {
            Some(f) if f.eq_ignore_ascii_case("wav") => "wav",
            _ => "mp3",
        }
    }
}

#[derive(Debug, Deserialize)]
struct VoiceRecord {
    uuid: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    use_case: Option<String>,
    #[serde(default)]
    is_owner: Option<bool>,
}

impl From<VoiceRecord> for Voice {
    fn from(r: VoiceRecord) -> Self {
        let mut voice = Voice::new(r.uuid.clone(), r.name.unwrap_or_else(|| r.uuid.clone()), NAME)
            .with_description(r.description.unwrap_or_default())
            .with_label("language", r.language.unwrap_or_else(|| "en".to_string()))
            .with_label("is_owner", r.is_owner.unwrap_or(false));
        if let Some(gender) = r.gender {
            voice = voice.with_label("gender", gender);
        }
        if let Some(use_case) = r.use_case {
            voice = voice.with_label("use_case", use_case);
        }
        voice
    }
}

#[derive(Debug, Deserialize)]
struct VoicePage {
    #[serde(default)]
    items: Vec<VoiceRecord>,
}

#[derive(Debug, Deserialize)]
struct Synthesis {
    #[serde(default = "default_success")]
    success: bool,
    #[serde(default)]
    audio_content: Option<String>,
}

fn default_success() -> bool {
    true
}

#[async_trait]
impl TtsProvider for ResembleProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn initialize(&mut self, config: ProviderConfig) -> Result<()> {
        let api_key = config.api_key().ok_or_else(|| {
            Error::missing_credential(NAME, "api_key", "Resemble AI API key is required")
        })?;
        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| Error::configuration("API key contains invalid characters"))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);

        let catalog_url = config.base_url().unwrap_or(DEFAULT_CATALOG_URL);
        let synthesis_url = config
            .option("synthesis_url")
            .or_else(|| config.base_url())
            .unwrap_or(DEFAULT_SYNTHESIS_URL);

        self.state = Some(Client {
            http: build_client(headers)?,
            catalog_url: trim_base(catalog_url),
            synthesis_url: trim_base(synthesis_url),
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
        let client = self.client()?;
        let req = client
            .http
            .post(format!("{}/synthesize", client.synthesis_url))
            .json(&json!({
                "voice_uuid": voice_id,
                "data": text,
                "output_format": Self::output_format(options.output_format.as_deref()),
                "sample_rate": SAMPLE_RATE,
            }));
        let resp = send_checked(NAME, req, ACTION, Self::error_cause).await?;
        let synthesis: Synthesis = read_json(NAME, resp, ACTION).await?;

        let audio = match synthesis.audio_content {
            Some(audio) if synthesis.success && !audio.is_empty() => audio,
            _ => {
                return Err(Error::provider(
                    NAME,
                    format!("{}: No audio content in response", ACTION),
                ))
            }
        };
        base64::engine::general_purpose::STANDARD
            .decode(audio)
            .map(Bytes::from)
            .map_err(|e| Error::provider(NAME, format!("{}: invalid audio content: {}", ACTION, e)))
    }

    async fn text_to_speech_stream(
        &self,
        text: &str,
        voice_id: &str,
        options: &SynthesisOptions,
    ) -> Result<AudioStream> {
        let audio = self.text_to_speech(text, voice_id, options).await?;
        Ok(single_chunk(audio))
    }

    async fn list_voices(&self) -> Result<Vec<Voice>> {
        const ACTION: &str = "Failed to list voices";
        let client = self.client()?;
        let req = client.http.get(format!("{}/voices", client.catalog_url));
        let resp = send_checked(NAME, req, ACTION, Self::error_cause).await?;
        let page: VoicePage = read_json(NAME, resp, ACTION).await?;
        Ok(page.items.into_iter().map(Voice::from).collect())
    }

    async fn get_voice(&self, voice_id: &str) -> Result<Option<Voice>> {
        const ACTION: &str = "Failed to get voice";
        let client = self.client()?;
        let resp = client
            .http
            .get(format!("{}/voices/{}", client.catalog_url, voice_id))
            .send()
            .await
            .map_err(|e| {
                let cause = Self::error_cause(&ErrorBody::from_transport(&e));
                Error::provider(NAME, format!("{}: {}", ACTION, cause))
            })?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let mut value: Value = read_json(NAME, resp, ACTION).await?;
                if let Some(item) = value.get_mut("item") {
                    value = item.take();
                }
                let record: VoiceRecord = serde_json::from_value(value).map_err(|e| {
                    Error::provider(NAME, format!("{}: invalid response: {}", ACTION, e))
                })?;
                Ok(Some(record.into()))
            }
            _ => {
                let body = ErrorBody::from_response(resp).await;
                Err(Error::provider(
                    NAME,
                    format!("{}: {}", ACTION, Self::error_cause(&body)),
                ))
            }
        }
    }

    fn supported_formats(&self) -> &'static [&'static str] {
        SUPPORTED_FORMATS
    }

    async fn validate_connection(&self) -> bool {
        let Ok(client) = self.client() else {
            return false;
        };
        client
            .http
            .get(format!("{}/voices", client.catalog_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
