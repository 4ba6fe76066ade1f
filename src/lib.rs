//! # saym
//!
//! 多厂商文本转语音客户端库：统一的 Provider 契约、厂商适配器与注册表。
//!
//! Text-to-speech over several cloud vendors behind one provider contract.
//!
//! ## Overview
//!
//! Every vendor (ElevenLabs, Cartesia, XTTS, CoeFont, Resemble) is an adapter
//! implementing [`TtsProvider`]. The [`ProviderFactory`] is the single point of
//! construction: it parses the vendor type, initializes the adapter once and
//! hands out the same `Arc<dyn TtsProvider>` for the rest of the process.
//!
//! ## Core Philosophy
//!
//! - **Vendor-agnostic callers**: the CLI never branches on vendor identity except
//!   to pick which adapter to build
//! - **Fail before the network**: credentials are checked in `initialize`
//! - **One attempt per request**: errors carry the vendor name and the best cause
//!   the vendor's error body offers; nothing is retried
//! - **Streaming-first sinks**: audio is consumed as a chunk stream, whether the
//!   vendor delivers incrementally or not
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use saym::{ProviderConfig, ProviderFactory, SynthesisOptions};
//!
//! #[tokio::main]
//! async fn main() -> saym::Result<()> {
//!     let factory = ProviderFactory::new();
//!     let provider = factory
//!         .create_provider("elevenlabs", ProviderConfig::new().with_api_key("your-api-key"))
//!         .await?;
//!
//!     let audio = provider
//!         .text_to_speech("Hello there", "21m00Tcm4TlvDq8ikWAM", &SynthesisOptions::new())
//!         .await?;
//!     saym::audio::save_bytes("hello.mp3", &audio).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`providers`] | Provider contract and vendor adapters |
//! | [`registry`] | Vendor types and the memoizing factory |
//! | [`types`] | Config, voice and synthesis option types |
//! | [`transport`] | Shared HTTP client and WebSocket demultiplexing |
//! | [`config`] | Persisted user configuration (`~/.saymrc`) |
//! | [`catalog`] | Ownership filtering and voice name resolution |
//! | [`audio`] | Local playback and file output |

pub mod audio;
pub mod catalog;
pub mod config;
pub mod providers;
pub mod registry;
pub mod transport;
pub mod types;

pub use config::ConfigManager;
pub use providers::TtsProvider;
pub use registry::{ProviderFactory, ProviderType};
pub use types::{
    AudioStream, ProviderConfig, SynthesisOptions, Voice, VoiceSample, VoiceSettings,
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
