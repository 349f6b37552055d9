//! # Transcribe Backend - Main Application Entry Point
//!
//! HTTP façade around a pretrained Whisper speech-to-text model: clients
//! upload an audio file to `POST /transcribe` and get back the recognized
//! text plus time-aligned segments as JSON.
//!
//! ## Application Architecture:
//! - **config**: layered configuration (TOML file + environment variables)
//! - **state**: shared application state (config, engine handle, metrics)
//! - **auth**: bearer-token gate for the transcription endpoint
//! - **upload**: multipart intake and scoped temp-file management
//! - **transcription**: speech engine contract, whisper.cpp backend, and
//!   segment aggregation
//! - **health**: liveness and metrics endpoints
//! - **middleware**: request telemetry (logging, metrics)
//! - **error**: error types and their HTTP mappings
//!
//! Startup order matters: the model is resolved and loaded before the
//! server binds, so a bad model/device/precision combination aborts the
//! process instead of failing requests later.

mod auth;
mod config;
mod error;
mod handlers;
mod health;
mod middleware;
mod state;
mod transcription;
mod upload;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::{Context, Result};
use config::AppConfig;
use state::AppState;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transcription::WhisperEngine;

/// Global shutdown flag flipped by the signal handler task.
static SHUTDOWN_SIGNAL: AtomicBool = AtomicBool::new(false);

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing()?;

    let config = AppConfig::load()?;
    config.validate()?;

    info!("starting transcribe-backend v{}", env!("CARGO_PKG_VERSION"));
    info!(
        model = %config.whisper.model,
        device = %config.whisper.device,
        compute_type = %config.whisper.compute_type(),
        beam_size = config.whisper.beam_size,
        auth_enabled = config.auth.token.is_some(),
        "configuration loaded"
    );

    let engine = Arc::new(
        WhisperEngine::from_config(&config.whisper)
            .context("failed to initialize speech engine")?,
    );
    info!("speech engine ready");

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let app_state = AppState::new(config, engine);

    setup_signal_handlers();
    info!("starting HTTP server on {}", bind_addr);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(middleware::RequestTelemetry)
            .route("/transcribe", web::post().to(handlers::transcribe))
            .route("/health", web::get().to(health::health_check))
            .route("/metrics", web::get().to(health::metrics))
    })
    .bind(&bind_addr)?
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        result = server_task => {
            match result {
                Ok(server_result) => {
                    if let Err(e) = server_result {
                        error!("server error: {}", e);
                    }
                }
                Err(e) => {
                    error!("server task error: {}", e);
                }
            }
        }
        _ = wait_for_shutdown() => {
            info!("shutdown signal received, stopping server...");
            server_handle.stop(true).await;
        }
    }

    info!("server stopped gracefully");
    Ok(())
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transcribe_backend=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    Ok(())
}

/// Flip the shutdown flag on SIGTERM or SIGINT so in-flight requests can
/// finish before the server stops.
fn setup_signal_handlers() {
    tokio::spawn(async {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler");
        let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .expect("Failed to install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("received SIGINT");
            }
        }

        SHUTDOWN_SIGNAL.store(true, Ordering::SeqCst);
    });
}

async fn wait_for_shutdown() {
    while !SHUTDOWN_SIGNAL.load(Ordering::SeqCst) {
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    }
}
