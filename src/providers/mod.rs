//! Provider 契约层：通过 trait 实现多厂商 TTS API 适配的动态分发
//!
//! Provider contract implemented by every vendor adapter. Uses `Arc<dyn TtsProvider>`
//! for runtime polymorphism so the CLI never branches on vendor identity except to
//! pick which adapter the registry constructs.
//!
//! Adapters are constructed empty and become usable after [`TtsProvider::initialize`]
//! succeeds; every operation on an uninitialized adapter is a configuration error.

pub mod cartesia;
pub mod coefont;
pub mod elevenlabs;
pub mod resemble;
pub mod xtts;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use crate::transport::ErrorBody;
use crate::types::{AudioStream, ProviderConfig, SynthesisOptions, Voice, VoiceSample};
use crate::{Error, Result};

pub use cartesia::CartesiaProvider;
pub use coefont::CoeFontProvider;
pub use elevenlabs::ElevenLabsProvider;
pub use resemble::ResembleProvider;
pub use xtts::XttsProvider;

/// Uniform surface over heterogeneous TTS vendors.
///
/// The trait is object-safe; the registry hands out `Arc<dyn TtsProvider>`.
#[async_trait]
pub trait TtsProvider: Send + Sync + std::fmt::Debug {
    /// Vendor identifier (`elevenlabs`, `cartesia`, ...).
    fn name(&self) -> &'static str;

    /// Validate mandatory credentials and build the transport. Performs no
    /// network I/O. Called exactly once by the registry.
    async fn initialize(&mut self, config: ProviderConfig) -> Result<()>;

    /// Buffered synthesis: the complete payload, or an error.
    async fn text_to_speech(
        &self,
        text: &str,
        voice_id: &str,
        options: &SynthesisOptions,
    ) -> Result<Bytes>;

    /// Streaming synthesis. The returned sequence is single-pass; a fresh call
    /// creates a fresh sequence. Callers cannot assume true incrementality.
    async fn text_to_speech_stream(
        &self,
        text: &str,
        voice_id: &str,
        options: &SynthesisOptions,
    ) -> Result<AudioStream>;

    /// Voices in vendor order.
    async fn list_voices(&self) -> Result<Vec<Voice>>;

    /// `Ok(None)` when the vendor has no such voice; `Err` when the lookup
    /// itself could not be performed.
    async fn get_voice(&self, voice_id: &str) -> Result<Option<Voice>>;

    fn supports_voice_cloning(&self) -> bool {
        false
    }

    /// Create a cloned voice from samples, returning its id.
    async fn create_voice(
        &self,
        _name: &str,
        _samples: &[VoiceSample],
        _description: Option<&str>,
    ) -> Result<String> {
        Err(Error::unsupported(self.name(), "voice cloning"))
    }

    async fn delete_voice(&self, _voice_id: &str) -> Result<()> {
        Err(Error::unsupported(self.name(), "voice deletion"))
    }

    /// Output format identifiers, pure.
    fn supported_formats(&self) -> &'static [&'static str];

    /// Any failure collapses to `false`.
    async fn validate_connection(&self) -> bool;
}

/// Present a finished buffer as a one-chunk stream, for vendors with no
/// incremental transport.
pub(crate) fn single_chunk(audio: Bytes) -> AudioStream {
    Box::pin(stream::once(async move { Ok(audio) }))
}

/// Access initialized state or fail with a configuration error.
pub(crate) fn initialized<'a, T>(state: &'a Option<T>, provider: &'static str) -> Result<&'a T> {
    state.as_ref().ok_or_else(|| {
        Error::configuration_with_context(
            "Provider is not initialized",
            crate::ErrorContext::new().with_source(provider),
        )
    })
}

/// Base URL without a trailing slash.
pub(crate) fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Send a request and turn any non-2xx or transport failure into a
/// `ProviderError` whose cause comes from the adapter's own error-shape chain.
pub(crate) async fn send_checked(
    provider: &'static str,
    request: reqwest::RequestBuilder,
    action: &str,
    cause: fn(&ErrorBody) -> String,
) -> Result<reqwest::Response> {
    match request.send().await {
        Ok(resp) if resp.status().is_success() => Ok(resp),
        Ok(resp) => {
            let body = ErrorBody::from_response(resp).await;
            tracing::debug!(provider, status = ?body.status(), "{} rejected", action);
            Err(Error::provider(provider, format!("{}: {}", action, cause(&body))))
        }
        Err(e) => {
            let body = ErrorBody::from_transport(&e);
            Err(Error::provider(provider, format!("{}: {}", action, cause(&body))))
        }
    }
}

/// Read a successful response body in full.
pub(crate) async fn read_bytes(
    provider: &'static str,
    resp: reqwest::Response,
    action: &str,
) -> Result<Bytes> {
    resp.bytes()
        .await
        .map_err(|e| Error::provider(provider, format!("{}: {}", action, e)))
}

/// Read a successful response body as JSON.
pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    provider: &'static str,
    resp: reqwest::Response,
    action: &str,
) -> Result<T> {
    resp.json::<T>()
        .await
        .map_err(|e| Error::provider(provider, format!("{}: invalid response: {}", action, e)))
}

/// Forward a chunked HTTP body as an audio stream.
pub(crate) fn body_stream(provider: &'static str, resp: reqwest::Response, action: &'static str) -> AudioStream {
    use futures::TryStreamExt;
    Box::pin(
        resp.bytes_stream()
            .map_err(move |e| Error::provider(provider, format!("{}: {}", action, e))),
    )
}
