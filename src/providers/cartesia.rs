//! Cartesia adapter.
//!
//! Buffered synthesis goes through `POST /tts/bytes`; streaming opens the TTS
//! WebSocket and demultiplexes `chunk` / `done` / `error` messages, so it is the
//! one adapter with truly incremental delivery.

use async_trait::async_trait;
use base64::Engine;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_tungstenite::tungstenite::Message;

use super::{initialized, read_bytes, read_json, send_checked, trim_base, TtsProvider};
use crate::transport::{audio_frames, build_client, connect, ErrorBody, Frame};
use crate::types::voice::validate_samples;
use crate::types::{AudioStream, ProviderConfig, SynthesisOptions, Voice, VoiceSample};
use crate::{Error, Result};

const NAME: &str = "cartesia";
const DEFAULT_BASE_URL: &str = "https://api.cartesia.ai";
const DEFAULT_WS_URL: &str = "wss://api.cartesia.ai/tts/websocket";
const API_VERSION: &str = "2025-04-16";
const DEFAULT_MODEL: &str = "sonic-2";
const SAMPLE_RATE: u32 = 44_100;
const VOICE_PAGE_LIMIT: u32 = 100;

const SUPPORTED_FORMATS: &[&str] = &["wav", "raw", "mp3"];

#[derive(Debug)]
struct Client {
    http: reqwest::Client,
    base_url: String,
    ws_url: String,
    api_key: String,
}

#[derive(Debug, Default)]
pub struct CartesiaProvider {
    state: Option<Client>,
}

impl CartesiaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client> {
        initialized(&self.state, NAME)
    }

    /// Vendor `output_format` object for a generic format name. Unknown names
    /// fall back to 32-bit float WAV.
    pub fn output_format(format: Option<&str>) -> Value {
        match format.map(str::to_lowercase).as_deref() {
            Some("mp3") => json!({
                "container": "mp3",
                "bit_rate": 128_000,
                "sample_rate": SAMPLE_RATE,
            }),
            Some("raw") => json!({
                "container": "raw",
                "encoding": "pcm_s16le",
                "sample_rate": SAMPLE_RATE,
            }),
            _ => json!({
                "container": "wav",
                "encoding": "pcm_f32le",
                "sample_rate": SAMPLE_RATE,
            }),
        }
    }

    fn request_body(text: &str, voice_id: &str, options: &SynthesisOptions, output: Value) -> Value {
        let mut body = json!({
            "transcript": text,
            "model_id": options.model_id.as_deref().unwrap_or(DEFAULT_MODEL),
            "voice": { "mode": "id", "id": voice_id },
            "output_format": output,
        });
        if let Some(lang) = &options.language {
            body["language"] = Value::String(lang.clone());
        }
        body
    }

    /// `"{status} {message}"`, where the message is `message`, a bare string body,
    /// the raw text, or the transport error.
    pub fn error_cause(body: &ErrorBody) -> String {
        let message = body
            .str_at("/message")
            .or_else(|| body.json_string())
            .or_else(|| body.text())
            .unwrap_or_else(|| body.transport_text());
        match body.status() {
            Some(status) => format!("{} {}", status.as_u16(), message),
            None => message,
        }
    }

    /// Map one inbound socket message onto the stream protocol.
    fn classify(msg: Message) -> Frame {
        match msg {
            Message::Binary(data) => Frame::Audio(Bytes::from(data)),
            Message::Text(text) => {
                let Ok(value) = serde_json::from_str::<Value>(&text) else {
                    tracing::debug!(provider = NAME, "ignoring non-JSON text frame");
                    return Frame::Ignore;
                };
                match value.get("type").and_then(Value::as_str) {
                    Some("chunk") => match value.get("data").and_then(Value::as_str) {
                        Some(data) => match base64::engine::general_purpose::STANDARD.decode(data) {
                            Ok(audio) => Frame::Audio(Bytes::from(audio)),
                            Err(e) => Frame::Failed(format!("Invalid audio chunk: {}", e)),
                        },
                        None => Frame::Ignore,
                    },
                    Some("done") => Frame::Done,
                    Some("error") => Frame::Failed(
                        value
                            .get("message")
                            .or_else(|| value.get("error"))
                            .and_then(Value::as_str)
                            .unwrap_or("WebSocket error")
                            .to_string(),
                    ),
                    _ => Frame::Ignore,
                }
            }
            _ => Frame::Ignore,
        }
    }
}

fn derive_ws_url(base_url: &str) -> String {
    let ws = if let Some(rest) = base_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base_url.to_string()
    };
    format!("{}/tts/websocket", trim_base(&ws))
}

#[derive(Debug, Deserialize)]
struct VoicePage {
    #[serde(default)]
    data: Vec<VoiceRecord>,
}

#[derive(Debug, Deserialize)]
struct VoiceRecord {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    gender: Option<String>,
    #[serde(default)]
    is_owner: Option<bool>,
    #[serde(default)]
    is_public: Option<bool>,
    #[serde(default)]
    is_starred: Option<bool>,
    #[serde(default)]
    created_at: Option<String>,
}

impl From<VoiceRecord> for Voice {
    fn from(r: VoiceRecord) -> Self {
        let mut voice = Voice::new(
            r.id.clone(),
            r.name.unwrap_or_else(|| r.id.clone()),
            NAME,
        )
        .with_description(r.description.unwrap_or_default())
        .with_languages([r.language.unwrap_or_else(|| "en".to_string())]);

        if let Some(gender) = r.gender {
            voice = voice.with_label("gender", gender);
        }
        if let Some(v) = r.is_owner {
            voice = voice.with_label("is_owner", v);
        }
        if let Some(v) = r.is_public {
            voice = voice.with_label("is_public", v);
        }
        if let Some(v) = r.is_starred {
            voice = voice.with_label("is_starred", v);
        }
        if let Some(v) = r.created_at {
            voice = voice.with_label("created_at", v);
        }
        voice
    }
}

#[derive(Debug, Deserialize)]
struct CreatedVoice {
    id: String,
}

#[async_trait]
impl TtsProvider for CartesiaProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn initialize(&mut self, config: ProviderConfig) -> Result<()> {
        let api_key = config
            .api_key()
            .ok_or_else(|| Error::missing_credential(NAME, "api_key", "API key is required"))?
            .to_string();

        let mut headers = HeaderMap::new();
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| Error::configuration("API key contains invalid characters"))?;
        bearer.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("Cartesia-Version", HeaderValue::from_static(API_VERSION));

        let base_url = trim_base(config.base_url().unwrap_or(DEFAULT_BASE_URL));
        let ws_url = match (config.option("ws_url"), config.base_url()) {
            (Some(url), _) => url.to_string(),
            (None, Some(base)) => derive_ws_url(base),
            (None, None) => DEFAULT_WS_URL.to_string(),
        };

        self.state = Some(Client {
            http: build_client(headers)?,
            base_url,
            ws_url,
            api_key,
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
        let output = Self::output_format(options.output_format.as_deref());
        let req = client
            .http
            .post(format!("{}/tts/bytes", client.base_url))
            .json(&Self::request_body(text, voice_id, options, output));
        let resp = send_checked(NAME, req, ACTION, Self::error_cause).await?;
        read_bytes(NAME, resp, ACTION).await
    }

    async fn text_to_speech_stream(
        &self,
        text: &str,
        voice_id: &str,
        options: &SynthesisOptions,
    ) -> Result<AudioStream> {
        let client = self.client()?;
        let output = Self::output_format(Some("raw"));
        let mut body = Self::request_body(text, voice_id, options, output);
        body["context_id"] = Value::String(format!("ctx_{}", uuid::Uuid::new_v4().simple()));

        tracing::debug!(provider = NAME, url = %client.ws_url, "opening synthesis socket");
        let headers = [
            ("Authorization", format!("Bearer {}", client.api_key)),
            ("Cartesia-Version", API_VERSION.to_string()),
        ];
        let ws = connect(&client.ws_url, &headers, body.to_string())
            .await
            .map_err(|e| Error::provider(NAME, format!("WebSocket error: {}", e)))?;
        Ok(audio_frames(NAME, ws, Self::classify))
    }

    async fn list_voices(&self) -> Result<Vec<Voice>> {
        const ACTION: &str = "Failed to list voices";
        let client = self.client()?;
        let req = client
            .http
            .get(format!("{}/voices/", client.base_url))
            .query(&[("limit", VOICE_PAGE_LIMIT)]);
        let resp = send_checked(NAME, req, ACTION, Self::error_cause).await?;
        let page: VoicePage = read_json(NAME, resp, ACTION).await?;
        Ok(page.data.into_iter().map(Voice::from).collect())
    }

    async fn get_voice(&self, voice_id: &str) -> Result<Option<Voice>> {
        Ok(self
            .list_voices()
            .await?
            .into_iter()
            .find(|v| v.id == voice_id))
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
        // The clone endpoint accepts a single clip.
        let sample = &samples[0];
        if samples.len() > 1 {
            tracing::warn!(
                provider = NAME,
                "only the first of {} samples is used for cloning",
                samples.len()
            );
        }

        let clip = reqwest::multipart::Part::bytes(sample.data.to_vec())
            .file_name(sample.file_name.clone())
            .mime_str(&sample.content_type)
            .map_err(|e| Error::configuration(format!("Invalid mime: {}", e)))?;
        let form = reqwest::multipart::Form::new()
            .part("clip", clip)
            .text("name", name.to_string())
            .text("description", description.unwrap_or_default().to_string())
            .text("language", "en");

        let req = client
            .http
            .post(format!("{}/voices/clone", client.base_url))
            .multipart(form);
        let resp = send_checked(NAME, req, ACTION, Self::error_cause).await?;
        let created: CreatedVoice = read_json(NAME, resp, ACTION).await?;
        Ok(created.id)
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
        let resp = client
            .http
            .get(format!("{}/voices/", client.base_url))
            .query(&[("limit", 1)])
            .send()
            .await;
        matches!(resp, Ok(r) if r.status().is_success())
    }
}
