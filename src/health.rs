use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::state::AppState;

/// Static liveness probe echoing the configured model and device. No side
/// effects; always 200.
pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "model": state.config.whisper.model,
        "device": state.config.whisper.device,
    }))
}

/// Process counters collected by the telemetry middleware.
pub async fn metrics(state: web::Data<AppState>) -> HttpResponse {
    let snapshot = state.metrics_snapshot();
    let uptime_seconds = state.uptime_seconds();

    let mut endpoint_stats = Vec::new();
    for (endpoint, metric) in snapshot.endpoint_metrics.iter() {
        endpoint_stats.push(json!({
            "endpoint": endpoint,
            "request_count": metric.request_count,
            "error_count": metric.error_count,
            "error_rate": metric.error_rate(),
            "average_duration_ms": metric.average_duration_ms(),
        }));
    }

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "overall": {
            "total_requests": snapshot.request_count,
            "total_errors": snapshot.error_count,
            "error_rate": if snapshot.request_count > 0 {
                snapshot.error_count as f64 / snapshot.request_count as f64
            } else {
                0.0
            },
        },
        "endpoints": endpoint_stats,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::transcription::engine::testing::FixedEngine;
    use actix_web::{test, App};
    use std::sync::Arc;

    fn test_state() -> AppState {
        let mut config = AppConfig::default();
        config.whisper.model = "medium".to_string();
        config.whisper.device = "cuda".to_string();
        AppState::new(
            config,
            Arc::new(FixedEngine {
                segments: Vec::new(),
            }),
        )
    }

    #[actix_web::test]
    async fn test_health_reports_configured_model_and_device() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state()))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "ok");
        assert_eq!(body["model"], "medium");
        assert_eq!(body["device"], "cuda");
    }

    #[actix_web::test]
    async fn test_metrics_reflects_recorded_requests() {
        let state = test_state();
        state.record_request("POST /transcribe", 40, true);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/metrics", web::get().to(metrics)),
        )
        .await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["overall"]["total_requests"], 1);
        assert_eq!(body["overall"]["total_errors"], 1);
    }
}
