//! XTTS v2 adapter for a self-hosted synthesis server.
//!
//! The voice id is the speaker reference WAV (a server-side path or base64 data).
//! There is no catalog endpoint, so the voice list is a fixed placeholder.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::json;

use super::{body_stream, initialized, read_bytes, send_checked, trim_base, TtsProvider};
use crate::transport::{build_client, ErrorBody};
use crate::types::{AudioStream, ProviderConfig, SynthesisOptions, Voice};
use crate::{Error, Result};

const NAME: &str = "xtts";
const DEFAULT_SERVER_URL: &str = "http://localhost:8020";
/// Sentinel api key meaning "server runs without authentication".
pub const NO_AUTH: &str = "none";
const DEFAULT_LANGUAGE: &str = "en";
const STREAM_CHUNK_SIZE: &str = "20";

const SUPPORTED_FORMATS: &[&str] = &["wav"];

const LANGUAGES: &[&str] = &[
    "en", "es", "fr", "de", "it", "pt", "pl", "tr", "ru", "nl", "cs", "ar", "zh-cn", "ja", "hu",
    "ko", "hi",
];

pub const CUSTOM_VOICE_ID: &str = "custom";

#[derive(Debug)]
struct Client {
    http: reqwest::Client,
    server_url: String,
}

#[derive(Debug, Default)]
pub struct XttsProvider {
    state: Option<Client>,
}

impl XttsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client> {
        initialized(&self.state, NAME)
    }

    pub fn error_cause(body: &ErrorBody) -> String {
        body.str_at("/detail")
            .or_else(|| body.str_at("/error"))
            .or_else(|| body.str_at("/message"))
            .or_else(|| body.text())
            .unwrap_or_else(|| body.transport_text())
    }

    fn custom_voice() -> Voice {
        Voice::new(CUSTOM_VOICE_ID, "Custom Voice (provide .wav file)", NAME)
            .with_description("XTTS v2 requires a speaker WAV file for voice cloning")
            .with_languages(LANGUAGES.iter().copied())
    }
}

fn language(options: &SynthesisOptions) -> String {
    options
        .language
        .clone()
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

#[async_trait]
impl TtsProvider for XttsProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn initialize(&mut self, config: ProviderConfig) -> Result<()> {
        let api_key = config.api_key().ok_or_else(|| {
            Error::missing_credential(
                NAME,
                "api_key",
                "API key is required (use \"none\" for no authentication)",
            )
        })?;

        let mut headers = HeaderMap::new();
        if api_key != NO_AUTH {
            let mut bearer = HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|_| Error::configuration("API key contains invalid characters"))?;
            bearer.set_sensitive(true);
            headers.insert(AUTHORIZATION, bearer);
        }

        let server_url = config
            .option("server_url")
            .or_else(|| config.base_url())
            .unwrap_or(DEFAULT_SERVER_URL);
        tracing::debug!(provider = NAME, server_url, "using synthesis server");

        self.state = Some(Client {
            http: build_client(headers)?,
            server_url: trim_base(server_url),
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
            .post(format!("{}/api/tts", client.server_url))
            .json(&json!({
                "text": text,
                "speaker_wav": voice_id,
                "language": language(options),
            }));
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
        let client = self.client()?;
        let form = reqwest::multipart::Form::new()
            .text("text", text.to_string())
            .text("speaker_wav", voice_id.to_string())
            .text("language", language(options))
            .text("stream_chunk_size", STREAM_CHUNK_SIZE);
        let req = client
            .http
            .post(format!("{}/tts_stream", client.server_url))
            .multipart(form);
        let resp = send_checked(NAME, req, ACTION, Self::error_cause).await?;
        Ok(body_stream(NAME, resp, ACTION))
    }

    async fn list_voices(&self) -> Result<Vec<Voice>> {
        self.client()?;
        Ok(vec![Self::custom_voice()])
    }

    async fn get_voice(&self, voice_id: &str) -> Result<Option<Voice>> {
        Ok(self
            .list_voices()
            .await?
            .into_iter()
            .find(|v| v.id == voice_id))
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
            .get(format!("{}/health", client.server_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(provider = NAME, "server not reachable at {}: {}", client.server_url, e);
                false
            }
        }
    }
}
