//! Integration tests for the Google adapters (Lyria, Veo, Imagen) using wiremock.

use ai_content_core::{ContentType, CoreError, GenerationOptions, GenerativeEngine, Settings};
use base64::Engine as _;
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer, output_dir: &Path) -> Settings {
    let mut settings = Settings {
        output_dir: output_dir.to_path_buf(),
        ..Settings::default()
    };
    settings.google.api_key = Some("g-key".to_string());
    settings.google.base_url = server.uri();
    settings.google.poll_interval_ms = 0;
    settings.google.max_poll_attempts = 3;
    settings
}

fn encode(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

mod lyria_tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};

    #[tokio::test]
    async fn test_lyria_decodes_inline_audio() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        let audio = b"RIFF....WAVEfmt ";

        Mock::given(method("POST"))
            .and(path("/models/lyria-002:predict"))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_json(json!({
                "instances": [{ "prompt": "calm piano, 90 BPM" }],
                "parameters": { "sample_count": 1 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{ "bytesBase64Encoded": encode(audio), "mimeType": "audio/wav" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let engine = GenerativeEngine::from_settings(settings(&server, temp.path()));
        let result = engine
            .generate(
                ContentType::Music,
                "lyria",
                "calm piano",
                &GenerationOptions::new().with_bpm(90).with_lyrics("ignored"),
            )
            .await
            .unwrap();

        let file_path = result.file_path().unwrap();
        assert_eq!(file_path.extension().unwrap(), "wav");
        assert_eq!(std::fs::read(file_path).unwrap(), audio);
        assert_eq!(result.data(), Some(&audio[..]));
        assert_eq!(result.metadata_value("prompt").unwrap(), "calm piano");
        assert_eq!(
            result.metadata_value("effective_prompt").unwrap(),
            "calm piano, 90 BPM"
        );
        assert_eq!(result.metadata_value("bpm").unwrap(), &json!(90));
    }

    #[tokio::test]
    async fn test_lyria_server_error() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/models/lyria-002:predict"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exhausted"))
            .expect(1)
            .mount(&server)
            .await;

        let engine = GenerativeEngine::from_settings(settings(&server, temp.path()));
        let err = engine
            .generate(ContentType::Music, "lyria", "x", &GenerationOptions::default())
            .await
            .unwrap_err();

        match err {
            CoreError::Provider { provider, message } => {
                assert_eq!(provider, "lyria");
                assert_eq!(message, "429 quota exhausted");
            }
            other => panic!("Expected Provider error, got {:?}", other),
        }
        assert_eq!(files_in(temp.path()), 0);
    }
}

mod imagen_tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};

    #[tokio::test]
    async fn test_imagen_uses_returned_mime_type() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        let image = b"\xFF\xD8\xFF\xE0jpeg";

        Mock::given(method("POST"))
            .and(path("/models/imagen-4.0-generate-001:predict"))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_json(json!({
                "instances": [{ "prompt": "a lighthouse at dusk" }],
                "parameters": { "sampleCount": 1, "aspectRatio": "16:9" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "predictions": [{ "bytesBase64Encoded": encode(image), "mimeType": "image/jpeg" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let engine = GenerativeEngine::from_settings(settings(&server, temp.path()));
        let result = engine
            .generate(
                ContentType::Image,
                "imagen",
                "a lighthouse at dusk",
                &GenerationOptions::new().with_aspect_ratio("16:9"),
            )
            .await
            .unwrap();

        assert_eq!(result.content_type(), ContentType::Image);
        let file_path = result.file_path().unwrap();
        assert_eq!(file_path.extension().unwrap(), "jpg");
        assert_eq!(std::fs::read(file_path).unwrap(), image);
        assert_eq!(result.metadata_value("aspect_ratio").unwrap(), "16:9");
        assert_eq!(result.metadata_value("mime_type").unwrap(), "image/jpeg");
    }

    #[tokio::test]
    async fn test_imagen_empty_predictions() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/models/imagen-4.0-generate-001:predict"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "predictions": [] })))
            .mount(&server)
            .await;

        let engine = GenerativeEngine::from_settings(settings(&server, temp.path()));
        let err = engine
            .generate(ContentType::Image, "imagen", "x", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Provider { .. }));
        assert_eq!(files_in(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_imagen_malformed_json() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();

        Mock::given(method("POST"))
            .and(path("/models/imagen-4.0-generate-001:predict"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let engine = GenerativeEngine::from_settings(settings(&server, temp.path()));
        let err = engine
            .generate(ContentType::Image, "imagen", "x", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Provider { .. }));
    }
}

mod veo_tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};

    const OPERATION: &str = "models/veo-3.0-generate-001/operations/op-1";
    const VIDEO: &[u8] = b"\x00\x00\x00\x18ftypmp42";

    async fn mount_submit(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/models/veo-3.0-generate-001:predictLongRunning"))
            .and(header("x-goog-api-key", "g-key"))
            .and(body_json(json!({
                "instances": [{ "prompt": "waves at sunrise" }],
                "parameters": { "aspectRatio": "16:9", "durationSeconds": 8 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": OPERATION })))
            .expect(1)
            .mount(server)
            .await;
    }

    fn done_operation(server: &MockServer) -> serde_json::Value {
        json!({
            "name": OPERATION,
            "done": true,
            "response": {
                "generateVideoResponse": {
                    "generatedSamples": [
                        { "video": { "uri": format!("{}/files/video.mp4", server.uri()) } }
                    ]
                }
            }
        })
    }

    #[tokio::test]
    async fn test_veo_polls_then_downloads() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        mount_submit(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("/{}", OPERATION)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "name": OPERATION, "done": false })),
            )
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/{}", OPERATION)))
            .respond_with(ResponseTemplate::new(200).set_body_json(done_operation(&server)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/video.mp4"))
            .and(header("x-goog-api-key", "g-key"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(VIDEO))
            .expect(1)
            .mount(&server)
            .await;

        let engine = GenerativeEngine::from_settings(settings(&server, temp.path()));
        let result = engine
            .generate(
                ContentType::Video,
                "veo",
                "waves at sunrise",
                &GenerationOptions::new().with_duration(20),
            )
            .await
            .unwrap();

        let file_path = result.file_path().unwrap();
        assert_eq!(file_path.extension().unwrap(), "mp4");
        assert_eq!(std::fs::read(file_path).unwrap(), VIDEO);
        assert_eq!(result.metadata_value("duration").unwrap(), &json!(8));
        assert_eq!(result.metadata_value("operation").unwrap(), OPERATION);
    }

    #[tokio::test]
    async fn test_veo_keeps_api_key_from_other_hosts() {
        let server = MockServer::start().await;
        let storage = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        mount_submit(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("/{}", OPERATION)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": OPERATION,
                "done": true,
                "response": {
                    "generateVideoResponse": {
                        "generatedSamples": [
                            { "video": { "uri": format!("{}/bucket/video.mp4", storage.uri()) } }
                        ]
                    }
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bucket/video.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(VIDEO))
            .expect(1)
            .mount(&storage)
            .await;

        let engine = GenerativeEngine::from_settings(settings(&server, temp.path()));
        let result = engine
            .generate(ContentType::Video, "veo", "waves at sunrise", &GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(std::fs::read(result.file_path().unwrap()).unwrap(), VIDEO);
        let requests = storage.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].headers.contains_key("x-goog-api-key"));
    }

    #[tokio::test]
    async fn test_veo_operation_error() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        mount_submit(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("/{}", OPERATION)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": OPERATION,
                "done": true,
                "error": { "code": 3, "message": "prompt blocked" }
            })))
            .mount(&server)
            .await;

        let engine = GenerativeEngine::from_settings(settings(&server, temp.path()));
        let err = engine
            .generate(ContentType::Video, "veo", "waves at sunrise", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Provider { .. }));
        assert!(err.to_string().contains("prompt blocked"));
        assert_eq!(files_in(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_veo_gives_up_after_max_polls() {
        let server = MockServer::start().await;
        let temp = TempDir::new().unwrap();
        mount_submit(&server).await;

        Mock::given(method("GET"))
            .and(path(format!("/{}", OPERATION)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "name": OPERATION, "done": false })),
            )
            .expect(3)
            .mount(&server)
            .await;

        let engine = GenerativeEngine::from_settings(settings(&server, temp.path()));
        let err = engine
            .generate(ContentType::Video, "veo", "waves at sunrise", &GenerationOptions::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("did not finish after 3 polls"));
        assert_eq!(files_in(temp.path()), 0);
    }
}
