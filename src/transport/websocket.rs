//! Duplex WebSocket transport for incremental synthesis.

use bytes::Bytes;
use futures::{stream, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::transport::TransportError;
use crate::types::AudioStream;
use crate::{Error, Result};

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What one inbound message means to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Audio(Bytes),
    Done,
    Failed(String),
    Ignore,
}

/// Open a WebSocket with extra handshake headers and send the request frame.
pub async fn connect(url: &str, headers: &[(&str, String)], request: String) -> Result<WsStream> {
    let mut req = url
        .into_client_request()
        .map_err(|e| TransportError::WebSocket(Box::new(e)))?;
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| TransportError::Other(format!("invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| TransportError::Other(format!("invalid header value: {}", e)))?;
        req.headers_mut().insert(name, value);
    }

    let (mut ws, _resp) = tokio_tungstenite::connect_async(req)
        .await
        .map_err(|e| TransportError::WebSocket(Box::new(e)))?;
    ws.send(Message::Text(request))
        .await
        .map_err(|e| TransportError::WebSocket(Box::new(e)))?;
    Ok(ws)
}

/// Turn a socket into a pull-driven chunk sequence.
///
/// Messages are read only when the consumer polls, so nothing is buffered beyond
/// what the socket itself holds. `classify` maps each text/binary message; close
/// frames are handled here: a close (or EOF) before `Frame::Done` is an error.
/// Dropping the stream drops the socket.
pub fn audio_frames<F>(provider: &'static str, ws: WsStream, classify: F) -> AudioStream
where
    F: FnMut(Message) -> Frame + Send + 'static,
{
    let init = Some((ws, classify));
    Box::pin(stream::unfold(init, move |state| async move {
        let (mut ws, mut classify) = state?;
        loop {
            let msg = match ws.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    let err = Error::provider(provider, format!("WebSocket error: {}", e));
                    return Some((Err(err), None));
                }
                None => {
                    let err = Error::provider(provider, "WebSocket closed before completion");
                    return Some((Err(err), None));
                }
            };

            let frame = match msg {
                Message::Close(reason) => {
                    let detail = reason
                        .map(|r| format!(" ({} {})", u16::from(r.code), r.reason))
                        .unwrap_or_default();
                    let err = Error::provider(
                        provider,
                        format!("WebSocket closed before completion{}", detail),
                    );
                    return Some((Err(err), None));
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
                other => classify(other),
            };

            match frame {
                Frame::Audio(chunk) => return Some((Ok(chunk), Some((ws, classify)))),
                Frame::Ignore => continue,
                Frame::Done => {
                    if let Err(e) = ws.close(None).await {
                        tracing::debug!(provider, "close after completion failed: {}", e);
                    }
                    return None;
                }
                Frame::Failed(message) => {
                    let _ = ws.close(None).await;
                    return Some((Err(Error::provider(provider, message)), None));
                }
            }
        }
    }))
}
