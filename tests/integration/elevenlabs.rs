//! ElevenLabs adapter against a mock API.

use futures::TryStreamExt;
use mockito::Matcher;
use serde_json::json;

use crate::integration::mock_server::{MockServerFixture, DEAD_URL};
use saym::providers::ElevenLabsProvider;
use saym::{ProviderConfig, SynthesisOptions, TtsProvider, VoiceSample, VoiceSettings};

const VOICE: &str = "21m00Tcm4TlvDq8ikWAM";
const AUDIO: &[u8] = b"ID3\x03\x00fake-mp3-frames";

async fn provider(fixture: &MockServerFixture) -> ElevenLabsProvider {
    fixture
        .init(ElevenLabsProvider::new(), fixture.config("el-key"))
        .await
}

#[tokio::test]
async fn buffered_synthesis_sends_full_default_settings() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", MockServerFixture::path(&format!("/text-to-speech/{}", VOICE)))
        .match_header("xi-api-key", "el-key")
        .match_query(Matcher::UrlEncoded(
            "output_format".into(),
            "mp3_44100_128".into(),
        ))
        .match_body(Matcher::Json(json!({
            "text": "Hello",
            "model_id": "eleven_monolingual_v1",
            "voice_settings": {
                "stability": 0.5,
                "similarity_boost": 0.75,
                "style": 0.0,
                "use_speaker_boost": true
            }
        })))
        .with_status(200)
        .with_body(AUDIO)
        .create_async()
        .await;

    let p = provider(&fixture).await;
    let audio = p
        .text_to_speech("Hello", VOICE, &SynthesisOptions::new())
        .await
        .unwrap();

    assert_eq!(audio.as_ref(), AUDIO);
    mock.assert_async().await;
}

#[tokio::test]
async fn partial_caller_settings_are_completed() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .server
        .mock("POST", MockServerFixture::path(&format!("/text-to-speech/{}", VOICE)))
        .match_body(Matcher::PartialJson(json!({
            "voice_settings": {
                "stability": 0.5,
                "similarity_boost": 0.75,
                "style": 0.0,
                "use_speaker_boost": false
            }
        })))
        .with_status(200)
        .with_body(AUDIO)
        .create_async()
        .await;

    let p = provider(&fixture).await;
    let options = SynthesisOptions::new()
        .with_voice_settings(VoiceSettings::new().with_speaker_boost(false));
    p.text_to_speech("Hello", VOICE, &options).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn stream_concatenation_matches_buffer() {
    let mut fixture = MockServerFixture::new().await;
    let _buffered = fixture
        .mock_audio("POST", &format!("/text-to-speech/{}", VOICE), AUDIO)
        .await;
    let stream_mock = fixture
        .server
        .mock("POST", MockServerFixture::path(&format!("/text-to-speech/{}/stream", VOICE)))
        .match_header("accept", "audio/mpeg")
        .with_status(200)
        .with_chunked_body(|w| {
            w.write_all(&AUDIO[..4])?;
            w.write_all(&AUDIO[4..])
        })
        .create_async()
        .await;

    let p = provider(&fixture).await;
    let options = SynthesisOptions::new();
    let buffered = p.text_to_speech("Hi", VOICE, &options).await.unwrap();
    let chunks: Vec<bytes::Bytes> = p
        .text_to_speech_stream("Hi", VOICE, &options)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(chunks.concat(), buffered.to_vec());
    stream_mock.assert_async().await;
}

#[tokio::test]
async fn nested_detail_message_becomes_cause() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json(
            "POST",
            &format!("/text-to-speech/{}", VOICE),
            401,
            r#"{"detail":{"status":"invalid_api_key","message":"Invalid API key"}}"#,
        )
        .await;

    let p = provider(&fixture).await;
    let err = p
        .text_to_speech("Hi", VOICE, &SynthesisOptions::new())
        .await
        .unwrap_err();

    assert!(err.is_provider());
    assert_eq!(
        err.to_string(),
        "[elevenlabs] Text-to-speech failed: Invalid API key"
    );
}

#[tokio::test]
async fn forbidden_mentions_quota() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json(
            "POST",
            &format!("/text-to-speech/{}/stream", VOICE),
            403,
            r#"{"detail":"quota_exceeded"}"#,
        )
        .await;

    let p = provider(&fixture).await;
    let err = match p
        .text_to_speech_stream("Hi", VOICE, &SynthesisOptions::new())
        .await
    {
        Ok(_) => panic!("expected a provider error"),
        Err(e) => e,
    };
    let msg = err.to_string();
    assert!(msg.starts_with("[elevenlabs] Text-to-speech stream failed: quota_exceeded"));
    assert!(msg.contains("403 Forbidden"));
}

#[tokio::test]
async fn transport_failure_keeps_vendor_name() {
    let mut p = ElevenLabsProvider::new();
    p.initialize(ProviderConfig::new().with_api_key("k").with_base_url(DEAD_URL))
        .await
        .unwrap();
    let err = p
        .text_to_speech("Hi", VOICE, &SynthesisOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_provider());
    assert_eq!(err.provider_name(), Some("elevenlabs"));
    assert!(err.to_string().starts_with("[elevenlabs] Text-to-speech failed: "));
}

#[tokio::test]
async fn list_then_get_round_trip() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json(
            "GET",
            "/voices",
            200,
            &json!({
                "voices": [
                    {"voice_id": VOICE, "name": "Rachel", "category": "premade", "labels": {"accent": "american"}},
                    {"voice_id": "cloned0000000000001", "name": "Mine", "category": "cloned"}
                ]
            })
            .to_string(),
        )
        .await;
    fixture
        .mock_json(
            "GET",
            &format!("/voices/{}", VOICE),
            200,
            &json!({"voice_id": VOICE, "name": "Rachel", "category": "premade"}).to_string(),
        )
        .await;

    let p = provider(&fixture).await;
    let voices = p.list_voices().await.unwrap();
    assert_eq!(voices.len(), 2);
    assert_eq!(voices[0].id, VOICE);
    assert_eq!(voices[1].label("category"), Some(&json!("cloned")));

    let voice = p.get_voice(&voices[0].id).await.unwrap().unwrap();
    assert_eq!(voice.id, voices[0].id);
}

#[tokio::test]
async fn unknown_voice_is_absent_not_error() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json(
            "GET",
            "/voices/missing",
            404,
            r#"{"detail":{"status":"voice_not_found","message":"A voice with the voice_id missing was not found."}}"#,
        )
        .await;
    fixture
        .mock_json("GET", "/voices/broken", 500, r#"{"detail":"internal"}"#)
        .await;

    let p = provider(&fixture).await;
    assert!(p.get_voice("missing").await.unwrap().is_none());

    let err = p.get_voice("broken").await.unwrap_err();
    assert_eq!(err.to_string(), "[elevenlabs] Failed to get voice: internal");
}

#[tokio::test]
async fn create_and_delete_voice() {
    let mut fixture = MockServerFixture::new().await;
    let create = fixture
        .server
        .mock("POST", "/voices/add")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data".into()),
        )
        .match_body(Matcher::Regex("My Clone".into()))
        .with_status(200)
        .with_body(r#"{"voice_id":"new-voice-id-000001"}"#)
        .create_async()
        .await;
    let delete = fixture
        .mock_json("DELETE", "/voices/new-voice-id-000001", 200, r#"{"status":"ok"}"#)
        .await;

    let p = provider(&fixture).await;
    assert!(p.supports_voice_cloning());
    let sample = VoiceSample::new("sample.mp3", "audio/mpeg", bytes::Bytes::from_static(b"mp3"));
    let id = p
        .create_voice("My Clone", &[sample], Some("test voice"))
        .await
        .unwrap();
    assert_eq!(id, "new-voice-id-000001");
    p.delete_voice(&id).await.unwrap();

    create.assert_async().await;
    delete.assert_async().await;
}

#[tokio::test]
async fn connection_check_collapses_failures() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json("GET", "/user/subscription", 401, r#"{"detail":"unauthorized"}"#)
        .await;
    let p = provider(&fixture).await;
    assert!(!p.validate_connection().await);

    let uninitialized = ElevenLabsProvider::new();
    assert!(!uninitialized.validate_connection().await);
}
