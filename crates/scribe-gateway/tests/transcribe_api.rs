//! HTTP-level tests for the transcription endpoint: multipart handling,
//! provider failures, temp-artifact cleanup, and the transcript archive.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use scribe_gateway::{build_app, AppState, GatewayConfig, TranscriptStore};
use scribe_stt::{SttBackend, SttError, SttResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "scribe-test-boundary";

/// Counting stub: returns a fixed transcript (or error) and records how many
/// times the provider was invoked.
struct StubStt {
    response: Result<String, String>,
    calls: AtomicUsize,
}

impl StubStt {
    fn ok(text: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(msg: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Err(msg.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SttBackend for StubStt {
    async fn transcribe(&self, _audio: Vec<u8>, _filename: &str) -> SttResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Ok(t) => Ok(t.clone()),
            Err(m) => Err(SttError::Provider(m.clone())),
        }
    }
}

fn test_config(storage: &std::path::Path, persistence: bool) -> GatewayConfig {
    GatewayConfig {
        app_name: "Scribe Test".to_string(),
        port: 0,
        storage_path: storage.to_string_lossy().into_owned(),
        frontend_enabled: false,
        persistence_enabled: persistence,
    }
}

fn test_state(stt: Arc<StubStt>, storage: &std::path::Path, persistence: bool) -> AppState {
    let config = test_config(storage, persistence);
    let transcripts = persistence
        .then(|| Arc::new(TranscriptStore::new(config.transcripts_db_path()).unwrap()));
    AppState {
        config: Arc::new(config),
        stt,
        transcripts,
    }
}

fn multipart_body(field: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: audio/webm\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn post_multipart(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn assert_uploads_empty(storage: &std::path::Path) {
    let uploads = storage.join("uploads");
    if uploads.exists() {
        let leftovers: Vec<_> = std::fs::read_dir(&uploads).unwrap().collect();
        assert!(leftovers.is_empty(), "temp artifacts remain: {:?}", leftovers);
    }
}

#[tokio::test]
async fn missing_audio_field_is_client_error_and_skips_provider() {
    let dir = tempfile::tempdir().unwrap();
    let stt = StubStt::ok("hello world");
    let app = build_app(test_state(Arc::clone(&stt), dir.path(), false));

    let body = multipart_body("note", "recording.webm", b"not-the-audio-field");
    let response = app.oneshot(post_multipart("/api/transcribe", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("audio"));
    assert_eq!(stt.calls(), 0);
    assert_uploads_empty(dir.path());
}

#[tokio::test]
async fn valid_payload_returns_provider_text() {
    let dir = tempfile::tempdir().unwrap();
    let stt = StubStt::ok("hello world");
    let app = build_app(test_state(Arc::clone(&stt), dir.path(), false));

    let body = multipart_body("audio", "recording.webm", b"fake-webm-bytes");
    let response = app.oneshot(post_multipart("/api/transcribe", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["text"], "hello world");
    assert_eq!(stt.calls(), 1);
    assert_uploads_empty(dir.path());
}

#[tokio::test]
async fn empty_provider_result_becomes_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let stt = StubStt::ok("   ");
    let app = build_app(test_state(stt, dir.path(), false));

    let body = multipart_body("audio", "silence.webm", b"fake-webm-bytes");
    let response = app.oneshot(post_multipart("/api/transcribe", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["text"], "[no speech detected]");
}

#[tokio::test]
async fn provider_failure_is_server_error_and_temp_file_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let stt = StubStt::failing("upstream 503");
    let app = build_app(test_state(Arc::clone(&stt), dir.path(), false));

    let body = multipart_body("audio", "recording.webm", b"fake-webm-bytes");
    let response = app.oneshot(post_multipart("/api/transcribe", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = json_body(response).await;
    assert!(json["error"].as_str().unwrap().contains("upstream 503"));
    assert_eq!(stt.calls(), 1);
    assert_uploads_empty(dir.path());
}

#[tokio::test]
async fn success_stores_record_with_matching_filename_and_text() {
    let dir = tempfile::tempdir().unwrap();
    let stt = StubStt::ok("hello world");
    let state = test_state(stt, dir.path(), true);
    let store = Arc::clone(state.transcripts.as_ref().unwrap());
    let app = build_app(state);

    let body = multipart_body("audio", "clip.webm", b"fake-webm-bytes");
    let response = app.oneshot(post_multipart("/api/transcribe", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let rows = store.list(10).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].filename, "clip.webm");
    assert_eq!(rows[0].text, "hello world");
}

#[tokio::test]
async fn unavailable_archive_degrades_but_request_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path(), true);
    let db_path = config.transcripts_db_path();
    let store = TranscriptStore::new(db_path.clone()).unwrap();

    // Break subsequent writes: replace the DB file with a directory.
    std::fs::remove_file(&db_path).unwrap();
    std::fs::create_dir(&db_path).unwrap();

    let state = AppState {
        config: Arc::new(config),
        stt: StubStt::ok("hello world"),
        transcripts: Some(Arc::new(store)),
    };
    let app = build_app(state);

    let body = multipart_body("audio", "clip.webm", b"fake-webm-bytes");
    let response = app.oneshot(post_multipart("/api/transcribe", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["text"], "hello world");
    assert_uploads_empty(dir.path());
}

#[tokio::test]
async fn legacy_upload_route_returns_success_envelope() {
    let dir = tempfile::tempdir().unwrap();
    let stt = StubStt::ok("hello world");
    let app = build_app(test_state(stt, dir.path(), true));

    let body = multipart_body("audio", "recording.webm", b"fake-webm-bytes");
    let response = app.oneshot(post_multipart("/api/upload", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["transcription"]["text"], "hello world");
    assert_eq!(json["transcription"]["filename"], "recording.webm");
}

#[tokio::test]
async fn transcripts_listing_is_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let stt = StubStt::ok("hello world");
    let state = test_state(stt, dir.path(), true);
    let store = Arc::clone(state.transcripts.as_ref().unwrap());

    store.insert("a.webm", "first").unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    store.insert("b.webm", "second").unwrap();

    let app = build_app(state);
    let request = Request::builder()
        .uri("/api/transcripts?limit=10")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let rows = json["transcripts"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["text"], "second");
    assert_eq!(rows[1]["text"], "first");
    assert!(rows[0]["created_at"].as_str().unwrap().contains('T'));
}

#[tokio::test]
async fn no_temp_artifact_survives_any_request() {
    let dir = tempfile::tempdir().unwrap();

    for stt in [StubStt::ok("hello world"), StubStt::failing("boom")] {
        let app = build_app(test_state(stt, dir.path(), false));
        let body = multipart_body("audio", "recording.webm", b"fake-webm-bytes");
        let _ = app.oneshot(post_multipart("/api/transcribe", body)).await.unwrap();
        assert_uploads_empty(dir.path());
    }
}
