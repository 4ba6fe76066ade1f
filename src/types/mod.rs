//! 类型系统模块：定义 Provider 契约使用的核心数据类型。
//!
//! # Types Module
//!
//! Core data types shared by every vendor adapter and by the CLI glue.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ProviderConfig`] | Credentials and settings used to initialize one adapter |
//! | [`Voice`] | Read-only projection of a vendor voice |
//! | [`VoiceSample`] | Audio sample uploaded when cloning a voice |
//! | [`SynthesisOptions`] | Per-request synthesis knobs |
//! | [`VoiceSettings`] | Stability / similarity / style / speaker-boost knobs |
//!
//! ## Example
//!
//! ```rust
//! use saym::types::{ProviderConfig, SynthesisOptions, VoiceSettings};
//!
//! let config = ProviderConfig::new()
//!     .with_api_key("sk-test")
//!     .with_option("server_url", "http://localhost:8020");
//! assert_eq!(config.option("server_url"), Some("http://localhost:8020"));
//!
//! let options = SynthesisOptions::new()
//!     .with_output_format("mp3")
//!     .with_voice_settings(VoiceSettings::new().with_stability(0.8));
//! assert_eq!(options.voice_settings.as_ref().and_then(|s| s.stability), Some(0.8));
//! ```

pub mod config;
pub mod options;
pub mod voice;

pub use config::ProviderConfig;
pub use options::{SynthesisOptions, VoiceSettings};
pub use voice::{Voice, VoiceSample};

use bytes::Bytes;

/// Lazy, single-pass sequence of audio chunks in arrival order.
pub type AudioStream = crate::BoxStream<'static, Bytes>;
