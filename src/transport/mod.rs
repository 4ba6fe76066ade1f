//! 传输层：共享 HTTP 客户端构建与 WebSocket 帧解复用。
//!
//! Transport plumbing shared by the vendor adapters: reqwest client construction
//! (env-overridable timeout and proxy) and a WebSocket connection whose inbound
//! frames are demultiplexed into an [`AudioStream`](crate::types::AudioStream).

pub mod http;
pub mod websocket;

pub use http::{build_client, ErrorBody};
pub use websocket::{audio_frames, connect, Frame, WsStream};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),

    #[error("Transport error: {0}")]
    Other(String),
}
