//! CoeFont adapter.
//!
//! Every request is signed: `X-Coefont-Content` is the lowercase hex
//! HMAC-SHA256 of `{unix_seconds}{json_body}` keyed by the access secret, and
//! the exact signed JSON string is what goes on the wire. Signatures are bound
//! to a fresh timestamp and are never reused.

use async_trait::async_trait;
use bytes::Bytes;
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::{initialized, read_bytes, read_json, send_checked, single_chunk, trim_base, TtsProvider};
use crate::transport::{build_client, ErrorBody};
use crate::types::{AudioStream, ProviderConfig, SynthesisOptions, Voice};
use crate::{Error, Result};

const NAME: &str = "coefont";
const DEFAULT_BASE_URL: &str = "https://api.coefont.cloud/v2";
const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(30);
const VALIDATION_TIMEOUT: Duration = Duration::from_secs(10);

const SUPPORTED_FORMATS: &[&str] = &["wav"];

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 of `{timestamp}{body}`.
pub fn sign(secret: &str, timestamp: &str, body: Option<&str>) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::configuration(format!("Invalid access secret: {}", e)))?;
    mac.update(timestamp.as_bytes());
    if let Some(body) = body {
        mac.update(body.as_bytes());
    }
    Ok(mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect())
}

struct Credentials {
    access_key: String,
    access_secret: String,
}

// Secrets stay out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &"<redacted>")
            .field("access_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
struct Client {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl Client {
    /// Build a signed request. `body` is serialized once; that string is both
    /// signed and sent.
    fn signed(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::RequestBuilder> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::configuration(format!("System clock error: {}", e)))?
            .as_secs()
            .to_string();
        let payload = body.map(serde_json::Value::to_string);
        let signature = sign(
            &self.credentials.access_secret,
            &timestamp,
            payload.as_deref(),
        )?;

        let mut req = self
            .http
            .request(method, format!("{}{}", self.base_url, path))
            .header("Authorization", &self.credentials.access_key)
            .header("X-Coefont-Date", timestamp)
            .header("X-Coefont-Content", signature);
        if let Some(payload) = payload {
            req = req.header(CONTENT_TYPE, "application/json").body(payload);
        }
        Ok(req)
    }
}

#[derive(Debug, Default)]
pub struct CoeFontProvider {
    state: Option<Client>,
}

impl CoeFontProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn client(&self) -> Result<&Client> {
        initialized(&self.state, NAME)
    }

    pub fn error_cause(body: &ErrorBody) -> String {
        body.str_at("/message")
            .or_else(|| body.text())
            .unwrap_or_else(|| body.transport_text())
    }
}

#[derive(Debug, Deserialize)]
struct CoeFontRecord {
    #[serde(default)]
    coefont: Option<String>,
    #[serde(default)]
    coefont_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    language: Option<String>,
}

impl CoeFontRecord {
    fn into_voice(self) -> Option<Voice> {
        let id = self.coefont.or(self.coefont_id)?;
        let name = self.name.unwrap_or_else(|| id.clone());
        let description = self
            .description
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format!("CoeFont voice: {}", name));
        let languages = match self.language {
            Some(lang) => vec![lang],
            None => vec!["ja".to_string(), "en".to_string()],
        };
        Some(
            Voice::new(id, name, NAME)
                .with_description(description)
                .with_languages(languages),
        )
    }
}

#[async_trait]
impl TtsProvider for CoeFontProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn initialize(&mut self, config: ProviderConfig) -> Result<()> {
        let access_key = config.option("access_key").or_else(|| config.api_key());
        let access_secret = config.option("access_secret");
        let (Some(access_key), Some(access_secret)) = (access_key, access_secret) else {
            return Err(Error::missing_credential(
                NAME,
                "access_secret",
                "CoeFont access key and access secret are required",
            ));
        };

        self.state = Some(Client {
            http: build_client(HeaderMap::new())?,
            base_url: trim_base(config.base_url().unwrap_or(DEFAULT_BASE_URL)),
            credentials: Credentials {
                access_key: access_key.to_string(),
                access_secret: access_secret.to_string(),
            },
        });
        Ok(())
    }

    async fn text_to_speech(
        &self,
        text: &str,
        voice_id: &str,
        _options: &SynthesisOptions,
    ) -> Result<Bytes> {
        const ACTION: &str = "Text-to-speech failed";
        let client = self.client()?;
        let body = json!({
            "coefont": voice_id,
            "text": text,
            "format": "wav",
        });
        let req = client
            .signed(reqwest::Method::POST, "/text2speech", Some(&body))?
            .timeout(SYNTHESIS_TIMEOUT);
        let resp = send_checked(NAME, req, ACTION, Self::error_cause).await?;
        read_bytes(NAME, resp, ACTION).await
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
        let req = client.signed(reqwest::Method::GET, "/coefonts/pro", None)?;
        let resp = send_checked(NAME, req, ACTION, Self::error_cause).await?;
        let records: serde_json::Value = read_json(NAME, resp, ACTION).await?;
        let serde_json::Value::Array(records) = records else {
            tracing::debug!(provider = NAME, "voice list was not an array");
            return Ok(Vec::new());
        };
        Ok(records
            .into_iter()
            .filter_map(|r| serde_json::from_value::<CoeFontRecord>(r).ok())
            .filter_map(CoeFontRecord::into_voice)
            .collect())
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
        let Ok(req) = client.signed(reqwest::Method::GET, "/coefonts/pro", None) else {
            return false;
        };
        match req.timeout(VALIDATION_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}
