//! Cartesia REST surface against a mock API.

use mockito::Matcher;
use serde_json::json;

use crate::integration::mock_server::MockServerFixture;
use saym::providers::CartesiaProvider;
use saym::{SynthesisOptions, TtsProvider};

const VOICE: &str = "a0e99841-438c-4a64-b679-ae501e7d6091";

async fn provider(fixture: &MockServerFixture) -> CartesiaProvider {
    fixture
        .init(CartesiaProvider::new(), fixture.config("sk-cartesia"))
        .await
}

#[tokio::test]
async fn bytes_endpoint_gets_versioned_bearer_request() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/tts/bytes")
        .match_header("authorization", "Bearer sk-cartesia")
        .match_header("cartesia-version", "2025-04-16")
        .match_body(Matcher::Json(json!({
            "transcript": "Hello",
            "model_id": "sonic-2",
            "voice": {"mode": "id", "id": VOICE},
            "output_format": {"container": "mp3", "bit_rate": 128000, "sample_rate": 44100}
        })))
        .with_status(200)
        .with_body(b"mp3-bytes")
        .create_async()
        .await;

    let p = provider(&fixture).await;
    let audio = p
        .text_to_speech("Hello", VOICE, &SynthesisOptions::new().with_output_format("mp3"))
        .await
        .unwrap();

    assert_eq!(audio.as_ref(), b"mp3-bytes");
    mock.assert_async().await;
}

#[tokio::test]
async fn language_is_forwarded() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", "/tts/bytes")
        .match_body(Matcher::PartialJson(json!({
            "language": "fr",
            "output_format": {"container": "wav", "encoding": "pcm_f32le"}
        })))
        .with_status(200)
        .with_body(b"RIFF")
        .create_async()
        .await;

    let p = provider(&fixture).await;
    p.text_to_speech("Bonjour", VOICE, &SynthesisOptions::new().with_language("fr"))
        .await
        .unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn list_requests_one_page_and_maps_labels() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/voices/")
        .match_query(Matcher::UrlEncoded("limit".into(), "100".into()))
        .with_status(200)
        .with_body(
            json!({
                "data": [
                    {"id": VOICE, "name": "Barbershop Man", "language": "en", "gender": "masculine", "is_owner": false, "is_public": true},
                    {"id": "owned-voice-0000000001", "name": "Mine", "is_owner": true}
                ]
            })
            .to_string(),
        )
        .expect(2)
        .create_async()
        .await;

    let p = provider(&fixture).await;
    let voices = p.list_voices().await.unwrap();
    assert_eq!(voices.len(), 2);
    assert_eq!(voices[0].label("gender"), Some(&json!("masculine")));
    assert_eq!(voices[1].languages, vec!["en"]);
    assert_eq!(voices[1].label("is_owner"), Some(&json!(true)));

    let found = p.get_voice("owned-voice-0000000001").await.unwrap().unwrap();
    assert_eq!(found.name, "Mine");
    mock.assert_async().await;
}

#[tokio::test]
async fn get_voice_missing_from_list_is_none() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json("GET", "/voices/", 200, r#"{"data":[]}"#)
        .await;
    let p = provider(&fixture).await;
    assert!(p.get_voice(VOICE).await.unwrap().is_none());
}

#[tokio::test]
async fn status_prefixes_vendor_message() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_text_error("GET", "/voices/", 401, "Unauthorized")
        .await;
    fixture
        .mock_json("POST", "/tts/bytes", 400, r#"{"message":"voice not found"}"#)
        .await;

    let p = provider(&fixture).await;
    let err = p.list_voices().await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "[cartesia] Failed to list voices: 401 Unauthorized"
    );

    let err = p
        .text_to_speech("Hi", VOICE, &SynthesisOptions::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "[cartesia] Text-to-speech failed: 400 voice not found"
    );
}

#[tokio::test]
async fn clone_uploads_first_clip_and_delete_succeeds() {
    let mut fixture = MockServerFixture::new().await;
    let create = fixture
        .server
        .mock("POST", "/voices/clone")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("name=\"clip\"".into()),
            Matcher::Regex("first-clip".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"id":"cloned-voice-000000001"}"#)
        .create_async()
        .await;
    let delete = fixture
        .mock_json("DELETE", "/voices/cloned-voice-000000001", 204, "")
        .await;

    let p = provider(&fixture).await;
    let samples = [
        saym::VoiceSample::new("a.wav", "audio/wav", &b"first-clip"[..]),
        saym::VoiceSample::new("b.wav", "audio/wav", &b"second-clip"[..]),
    ];
    let id = p.create_voice("Clone", &samples, None).await.unwrap();
    assert_eq!(id, "cloned-voice-000000001");
    p.delete_voice(&id).await.unwrap();

    create.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn connection_check_uses_voice_listing() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("GET", "/voices/")
        .match_query(Matcher::UrlEncoded("limit".into(), "1".into()))
        .with_status(200)
        .with_body(r#"{"data":[]}"#)
        .create_async()
        .await;
    let p = provider(&fixture).await;
    assert!(p.validate_connection().await);
    mock.assert_async().await;
}
