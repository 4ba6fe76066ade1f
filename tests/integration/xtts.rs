//! XTTS server adapter against a mock server.

use futures::TryStreamExt;
use mockito::Matcher;
use serde_json::json;

use crate::integration::mock_server::{MockServerFixture, DEAD_URL};
use saym::providers::XttsProvider;
use saym::{ProviderConfig, SynthesisOptions, TtsProvider};

const SPEAKER: &str = "/data/speakers/narrator.wav";

#[tokio::test]
async fn no_auth_sentinel_sends_no_authorization() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/api/tts")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({
            "text": "Hello",
            "speaker_wav": SPEAKER,
            "language": "en"
        })))
        .with_status(200)
        .with_body(b"RIFF-wav")
        .create_async()
        .await;

    let p = fixture
        .init(XttsProvider::new(), fixture.config("none"))
        .await;
    let audio = p
        .text_to_speech("Hello", SPEAKER, &SynthesisOptions::new())
        .await
        .unwrap();
    assert_eq!(audio.as_ref(), b"RIFF-wav");
    mock.assert_async().await;
}

#[tokio::test]
async fn real_key_becomes_bearer_and_server_url_wins() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/api/tts")
        .match_header("authorization", "Bearer secret")
        .match_body(Matcher::PartialJson(json!({"language": "de"})))
        .with_status(200)
        .with_body(b"RIFF")
        .create_async()
        .await;

    let config = ProviderConfig::new()
        .with_api_key("secret")
        .with_base_url(DEAD_URL)
        .with_option("server_url", fixture.base_url.clone());
    let p = fixture.init(XttsProvider::new(), config).await;
    p.text_to_speech("Hallo", SPEAKER, &SynthesisOptions::new().with_language("de"))
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn stream_posts_multipart_form() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/tts_stream")
        .match_header("content-type", Matcher::Regex("^multipart/form-data".into()))
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("name=\"stream_chunk_size\"".into()),
            Matcher::Regex("narrator.wav".into()),
        ]))
        .with_status(200)
        .with_body(b"RIFFchunked")
        .create_async()
        .await;

    let p = fixture
        .init(XttsProvider::new(), fixture.config("none"))
        .await;
    let chunks: Vec<bytes::Bytes> = p
        .text_to_speech_stream("Hi", SPEAKER, &SynthesisOptions::new())
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(chunks.concat(), b"RIFFchunked".to_vec());
    mock.assert_async().await;
}

#[tokio::test]
async fn error_fields_are_tried_in_order() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json(
            "POST",
            "/api/tts",
            400,
            r#"{"error":"No speaker_wav provided and no default set"}"#,
        )
        .await;
    fixture
        .mock_text_error("POST", "/tts_stream", 500, "server exploded")
        .await;

    let p = fixture
        .init(XttsProvider::new(), fixture.config("none"))
        .await;
    let err = p
        .text_to_speech("Hi", "", &SynthesisOptions::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "[xtts] Text-to-speech failed: No speaker_wav provided and no default set"
    );

    let err = match p
        .text_to_speech_stream("Hi", SPEAKER, &SynthesisOptions::new())
        .await
    {
        Ok(_) => panic!("expected a provider error"),
        Err(e) => e,
    };
    assert_eq!(
        err.to_string(),
        "[xtts] Text-to-speech stream failed: server exploded"
    );
}

#[tokio::test]
async fn health_check_reports_reachability() {
    let mut fixture = MockServerFixture::new().await;
    let health = fixture
        .mock_json("GET", "/health", 200, r#"{"status":"ok"}"#)
        .await;
    let p = fixture
        .init(XttsProvider::new(), fixture.config("none"))
        .await;
    assert!(p.validate_connection().await);
    health.assert_async().await;

    let mut offline = XttsProvider::new();
    offline
        .initialize(ProviderConfig::new().with_api_key("none").with_base_url(DEAD_URL))
        .await
        .unwrap();
    assert!(!offline.validate_connection().await);
}

#[tokio::test]
async fn custom_voice_lookup_is_local() {
    let mut fixture = MockServerFixture::new().await;
    let untouched = fixture.mock_untouched("GET").await;
    let p = fixture
        .init(XttsProvider::new(), fixture.config("none"))
        .await;

    let voice = p.get_voice("custom").await.unwrap().unwrap();
    assert_eq!(voice.provider, "xtts");
    assert!(voice.languages.iter().any(|l| l == "zh-cn"));
    assert!(p.get_voice("somebody-else").await.unwrap().is_none());
    untouched.assert_async().await;
}
