//! CoeFont signed requests against a mock API.

use futures::TryStreamExt;
use mockito::Matcher;
use serde_json::json;

use crate::integration::mock_server::MockServerFixture;
use saym::providers::CoeFontProvider;
use saym::{ProviderConfig, SynthesisOptions, TtsProvider};

const FONT: &str = "19d55439-312d-4a1d-a27b-28f0f31bedc5";

fn signed_headers(mock: mockito::Mock) -> mockito::Mock {
    mock.match_header("authorization", "access-key")
        .match_header("x-coefont-date", Matcher::Regex("^[0-9]{10,}$".into()))
        .match_header("x-coefont-content", Matcher::Regex("^[0-9a-f]{64}$".into()))
}

fn config(fixture: &MockServerFixture) -> ProviderConfig {
    fixture
        .config("access-key")
        .with_option("access_secret", "access-secret")
}

#[tokio::test]
async fn synthesis_is_signed_and_asks_for_wav() {
    let mut fixture = MockServerFixture::new().await;
    let mock = signed_headers(fixture.server.mock("POST", "/text2speech"))
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "coefont": FONT,
            "text": "こんにちは",
            "format": "wav"
        })))
        .with_status(200)
        .with_body(b"RIFF-coefont")
        .expect(2)
        .create_async()
        .await;

    let p = fixture.init(CoeFontProvider::new(), config(&fixture)).await;
    let options = SynthesisOptions::new();
    let buffered = p.text_to_speech("こんにちは", FONT, &options).await.unwrap();
    let streamed: Vec<bytes::Bytes> = p
        .text_to_speech_stream("こんにちは", FONT, &options)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(streamed.len(), 1);
    assert_eq!(streamed[0], buffered);
    mock.assert_async().await;
}

#[tokio::test]
async fn catalog_listing_is_signed_without_body() {
    let mut fixture = MockServerFixture::new().await;
    let mock = signed_headers(fixture.server.mock("GET", "/coefonts/pro"))
        .with_status(200)
        .with_body(
            json!([
                {"coefont": FONT, "name": "Allial", "description": ""},
                {"coefont_id": "legacy-font-id-00001", "name": "Legacy", "language": "en"},
                {"name": "no id at all"}
            ])
            .to_string(),
        )
        .expect(2)
        .create_async()
        .await;

    let p = fixture.init(CoeFontProvider::new(), config(&fixture)).await;
    let voices = p.list_voices().await.unwrap();
    assert_eq!(voices.len(), 2);
    assert_eq!(voices[0].description.as_deref(), Some("CoeFont voice: Allial"));
    assert_eq!(voices[0].languages, vec!["ja", "en"]);
    assert_eq!(voices[1].id, "legacy-font-id-00001");
    assert_eq!(voices[1].languages, vec!["en"]);

    let legacy = p.get_voice("legacy-font-id-00001").await.unwrap().unwrap();
    assert_eq!(legacy.name, "Legacy");
    mock.assert_async().await;
}

#[tokio::test]
async fn vendor_message_is_surfaced() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json("POST", "/text2speech", 401, r#"{"message":"invalid signature"}"#)
        .await;
    let p = fixture.init(CoeFontProvider::new(), config(&fixture)).await;
    let err = p
        .text_to_speech("hi", FONT, &SynthesisOptions::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "[coefont] Text-to-speech failed: invalid signature"
    );
}

#[tokio::test]
async fn connection_check_uses_signed_listing() {
    let mut fixture = MockServerFixture::new().await;
    fixture
        .mock_json("GET", "/coefonts/pro", 403, r#"{"message":"forbidden"}"#)
        .await;
    let p = fixture.init(CoeFontProvider::new(), config(&fixture)).await;
    assert!(!p.validate_connection().await);
}
