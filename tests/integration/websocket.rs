//! Cartesia streaming over a local WebSocket server.

use base64::Engine;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use saym::providers::CartesiaProvider;
use saym::{ProviderConfig, SynthesisOptions, TtsProvider};

const VOICE: &str = "a0e99841-438c-4a64-b679-ae501e7d6091";

/// How the fake server ends the exchange after its scripted messages.
enum Ending {
    Stay,
    Close,
    Drop,
}

struct Seen {
    authorization: Option<String>,
    request: Value,
}

fn chunk(audio: &[u8]) -> Message {
    let data = base64::engine::general_purpose::STANDARD.encode(audio);
    Message::Text(json!({"type": "chunk", "data": data, "done": false}).to_string())
}

fn done() -> Message {
    Message::Text(json!({"type": "done", "done": true}).to_string())
}

async fn serve(script: Vec<Message>, ending: Ending) -> (String, JoinHandle<Seen>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/tts/websocket", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut authorization = None;
        let mut ws = tokio_tungstenite::accept_hdr_async(
            tcp,
            |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                authorization = req
                    .headers()
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                Ok(resp)
            },
        )
        .await
        .unwrap();

        let request = match ws.next().await {
            Some(Ok(Message::Text(text))) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected request frame, got {:?}", other),
        };
        for msg in script {
            ws.send(msg).await.unwrap();
        }
        match ending {
            Ending::Stay => {
                // Let the client close.
                while let Some(Ok(_)) = ws.next().await {}
            }
            Ending::Close => {
                let _ = ws
                    .send(Message::Close(Some(CloseFrame {
                        code: CloseCode::Away,
                        reason: "going away".into(),
                    })))
                    .await;
            }
            Ending::Drop => drop(ws),
        }
        Seen {
            authorization,
            request,
        }
    });
    (url, handle)
}

async fn provider(ws_url: &str) -> CartesiaProvider {
    let mut p = CartesiaProvider::new();
    p.initialize(
        ProviderConfig::new()
            .with_api_key("sk-ws")
            .with_option("ws_url", ws_url),
    )
    .await
    .unwrap();
    p
}

async fn drain(p: &CartesiaProvider, options: &SynthesisOptions) -> (Vec<Vec<u8>>, Option<saym::Error>) {
    let mut stream = p.text_to_speech_stream("Hello", VOICE, options).await.unwrap();
    let mut chunks = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(bytes) => chunks.push(bytes.to_vec()),
            Err(e) => return (chunks, Some(e)),
        }
    }
    (chunks, None)
}

#[tokio::test]
async fn chunks_arrive_in_order_until_done() {
    let script = vec![
        chunk(b"one"),
        Message::Text(json!({"type": "timestamps", "word_timestamps": {}}).to_string()),
        chunk(b"two"),
        Message::Binary(b"three".to_vec()),
        done(),
    ];
    let (url, server) = serve(script, Ending::Stay).await;
    let p = provider(&url).await;

    let options = SynthesisOptions::new().with_language("en");
    let (chunks, err) = drain(&p, &options).await;
    assert!(err.is_none(), "unexpected error: {:?}", err);
    assert_eq!(chunks, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);

    let seen = server.await.unwrap();
    assert_eq!(seen.authorization.as_deref(), Some("Bearer sk-ws"));
    assert_eq!(seen.request["transcript"], "Hello");
    assert_eq!(seen.request["voice"]["id"], VOICE);
    assert_eq!(seen.request["output_format"]["container"], "raw");
    assert_eq!(seen.request["output_format"]["encoding"], "pcm_s16le");
    assert_eq!(seen.request["language"], "en");
    assert!(seen.request["context_id"]
        .as_str()
        .unwrap()
        .starts_with("ctx_"));
}

#[tokio::test]
async fn close_before_done_fails_after_delivered_chunks() {
    let (url, server) = serve(vec![chunk(b"partial")], Ending::Close).await;
    let p = provider(&url).await;

    let (chunks, err) = drain(&p, &SynthesisOptions::new()).await;
    assert_eq!(chunks, vec![b"partial".to_vec()]);
    let err = err.expect("stream should fail");
    assert!(err.is_provider());
    assert!(err.to_string().contains("WebSocket closed before completion"));
    assert!(err.to_string().contains("going away"));
    server.await.unwrap();
}

#[tokio::test]
async fn dropped_connection_is_provider_error() {
    let (url, server) = serve(vec![chunk(b"partial")], Ending::Drop).await;
    let p = provider(&url).await;

    let (chunks, err) = drain(&p, &SynthesisOptions::new()).await;
    assert_eq!(chunks, vec![b"partial".to_vec()]);
    let err = err.expect("stream should fail");
    assert_eq!(err.provider_name(), Some("cartesia"));
    server.await.unwrap();
}

#[tokio::test]
async fn error_message_terminates_stream() {
    let script = vec![Message::Text(
        json!({"type": "error", "message": "Voice not found"}).to_string(),
    )];
    let (url, server) = serve(script, Ending::Stay).await;
    let p = provider(&url).await;

    let (chunks, err) = drain(&p, &SynthesisOptions::new()).await;
    assert!(chunks.is_empty());
    assert_eq!(err.unwrap().to_string(), "[cartesia] Voice not found");
    server.await.unwrap();
}

#[tokio::test]
async fn unreachable_socket_fails_at_open() {
    let p = provider("ws://127.0.0.1:9/tts/websocket").await;
    let err = match p
        .text_to_speech_stream("Hello", VOICE, &SynthesisOptions::new())
        .await
    {
        Ok(_) => panic!("connection should fail"),
        Err(e) => e,
    };
    assert!(err.is_provider());
    assert!(err.to_string().starts_with("[cartesia] WebSocket error: "));
}
