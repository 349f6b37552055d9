//! # Transcription Endpoint
//!
//! `POST /transcribe` — accepts a multipart audio upload, runs it through
//! the speech engine, and returns the recognized text with time-aligned
//! segments.
//!
//! ## Request:
//! Multipart form data with a binary `file` field, plus
//! `Authorization: Bearer <token>` when auth is configured.
//!
//! ## Response:
//! ```json
//! {
//!   "text": "Olá, tudo bem?",
//!   "segments": [
//!     {"start": 0.0, "end": 1.4, "text": "Olá,"},
//!     {"start": 1.4, "end": 2.6, "text": "tudo bem?"}
//!   ]
//! }
//! ```

use actix_multipart::Multipart;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{error, info};

use crate::auth;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::transcription::{aggregate, TranscribeOptions, TranscriptionResult};
use crate::upload::{self, TempAudioFile};

/// Request pipeline: auth gate → temp-file intake → engine → aggregation.
/// The temp file never outlives the request, whatever the exit path.
pub async fn transcribe(
    req: HttpRequest,
    payload: Multipart,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let auth_config = &state.config.auth;
    let presented = header_value
        .as_deref()
        .or(auth_config.header_fallback.as_deref());
    auth::check_bearer(auth_config.token.as_deref(), presented)?;

    let (bytes, filename) = upload::read_audio_field(payload).await?;
    info!(
        filename = filename.as_deref().unwrap_or("(unnamed)"),
        size_kb = bytes.len() / 1024,
        "received audio upload"
    );

    let engine = state.engine.clone();
    let beam_size = state.config.whisper.beam_size;
    info!(model = %state.config.whisper.model, beam_size, "starting transcription");

    // Inference is CPU-bound, so it runs on the blocking pool. The temp
    // file lives entirely inside the closure: dropping it on any path out,
    // including an engine error, removes the file.
    let result = web::block(move || -> Result<TranscriptionResult, AppError> {
        let temp = TempAudioFile::store(&bytes, filename.as_deref())
            .map_err(|e| AppError::Internal(format!("failed to persist upload: {}", e)))?;

        let options = TranscribeOptions::new(beam_size);
        engine
            .transcribe(temp.path(), &options)
            .and_then(|output| {
                info!(
                    duration_secs = output.info.duration,
                    language = %output.info.language,
                    "audio decoded"
                );
                aggregate(output.segments)
            })
            .map_err(|e| {
                error!(error = %e, "transcription failed");
                AppError::Engine(e.to_string())
            })
    })
    .await
    .map_err(|e| AppError::Internal(format!("blocking task failed: {}", e)))??;

    info!(
        segments = result.segments.len(),
        chars = result.text.len(),
        "transcription completed"
    );

    Ok(HttpResponse::Ok().json(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::transcription::engine::testing::{FailingEngine, FixedEngine};
    use crate::transcription::{RawSegment, SpeechEngine};
    use actix_web::dev::ServiceResponse;
    use actix_web::{test, App};
    use std::sync::Arc;

    const BOUNDARY: &str = "test-boundary";

    fn fixed_engine() -> Arc<dyn SpeechEngine> {
        Arc::new(FixedEngine {
            segments: vec![
                RawSegment {
                    start: 0.0,
                    end: 1.4,
                    text: Some(" Olá ".to_string()),
                },
                RawSegment {
                    start: 1.4,
                    end: 2.2,
                    text: Some("mundo".to_string()),
                },
            ],
        })
    }

    fn state_with(engine: Arc<dyn SpeechEngine>, token: Option<&str>) -> AppState {
        let mut config = AppConfig::default();
        config.auth.token = token.map(|t| t.to_string());
        AppState::new(config, engine)
    }

    fn multipart_body(field: &str, filename: Option<&str>, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    field, name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n", field).as_bytes(),
            ),
        }
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    async fn post_upload(
        state: AppState,
        body: Vec<u8>,
        auth_header: Option<&str>,
    ) -> ServiceResponse {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/transcribe", web::post().to(transcribe)),
        )
        .await;

        let mut req = test::TestRequest::post().uri("/transcribe").insert_header((
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        ));
        if let Some(value) = auth_header {
            req = req.insert_header((header::AUTHORIZATION, value));
        }
        test::call_service(&app, req.set_payload(body).to_request()).await
    }

    #[actix_web::test]
    async fn test_returns_aggregated_text_and_segments() {
        let body = multipart_body("file", Some("voz.wav"), b"fake audio");
        let resp = post_upload(state_with(fixed_engine(), None), body, None).await;

        assert_eq!(resp.status(), 200);
        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["text"], "Olá mundo");
        assert_eq!(json["segments"].as_array().unwrap().len(), 2);
        assert_eq!(json["segments"][0]["start"], 0.0);
        assert_eq!(json["segments"][0]["end"], 1.4);
        assert_eq!(json["segments"][0]["text"], "Olá");
    }

    #[actix_web::test]
    async fn test_upload_without_filename_is_accepted() {
        let body = multipart_body("file", None, b"fake audio");
        let resp = post_upload(state_with(fixed_engine(), None), body, None).await;
        assert_eq!(resp.status(), 200);
    }

    #[actix_web::test]
    async fn test_missing_header_with_auth_configured_is_401() {
        let body = multipart_body("file", Some("voz.wav"), b"fake audio");
        let resp = post_upload(state_with(fixed_engine(), Some("secret")), body, None).await;

        assert_eq!(resp.status(), 401);
        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["error"]["type"], "unauthorized");
    }

    #[actix_web::test]
    async fn test_wrong_token_is_403() {
        let body = multipart_body("file", Some("voz.wav"), b"fake audio");
        let resp = post_upload(
            state_with(fixed_engine(), Some("secret")),
            body,
            Some("Bearer wrong"),
        )
        .await;

        assert_eq!(resp.status(), 403);
        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["error"]["type"], "forbidden");
    }

    #[actix_web::test]
    async fn test_correct_token_proceeds() {
        let body = multipart_body("file", Some("voz.wav"), b"fake audio");
        let resp = post_upload(
            state_with(fixed_engine(), Some("secret")),
            body,
            Some("Bearer secret"),
        )
        .await;
        assert_eq!(resp.status(), 200);
    }

    #[actix_web::test]
    async fn test_header_fallback_satisfies_auth() {
        let mut config = AppConfig::default();
        config.auth.token = Some("secret".to_string());
        config.auth.header_fallback = Some("Bearer secret".to_string());
        let state = AppState::new(config, fixed_engine());

        let body = multipart_body("file", Some("voz.wav"), b"fake audio");
        let resp = post_upload(state, body, None).await;
        assert_eq!(resp.status(), 200);
    }

    #[actix_web::test]
    async fn test_engine_failure_is_500() {
        let body = multipart_body("file", Some("voz.wav"), b"fake audio");
        let resp = post_upload(state_with(Arc::new(FailingEngine), None), body, None).await;

        assert_eq!(resp.status(), 500);
        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["error"]["type"], "engine_error");
    }

    #[actix_web::test]
    async fn test_missing_file_field_is_400() {
        let body = multipart_body("attachment", Some("voz.wav"), b"fake audio");
        let resp = post_upload(state_with(fixed_engine(), None), body, None).await;

        assert_eq!(resp.status(), 400);
        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["error"]["type"], "bad_request");
    }
}
