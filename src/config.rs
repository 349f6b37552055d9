//! # Configuration Management
//!
//! Loads application configuration from multiple sources:
//! - Default values (built into the code)
//! - TOML configuration file (config.toml, optional)
//! - Environment variables with APP_ prefix
//! - Direct environment overrides used in deployments
//!   (`WHISPER_*`, `TRANSCRIBE_*`, `HOST`, `PORT`)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Direct overrides (WHISPER_MODEL, TRANSCRIBE_AUTH_TOKEN, PORT, ...)
//! 2. Environment variables (APP_SERVER_HOST, ...)
//! 3. Configuration file (config.toml)
//! 4. Default values
//!
//! Model name, device, and compute precision are carried as plain strings:
//! there is no validation here beyond defaulting. Malformed values surface
//! when the speech engine is constructed, which aborts startup.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub whisper: WhisperConfig,
    pub auth: AuthConfig,
}

/// Server bind settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Speech engine settings.
///
/// ## Fields:
/// - `model`: Whisper model variant ("tiny", "base", "small", "medium", "large-v3")
/// - `device`: "cpu" or "cuda"
/// - `compute_type`: weight quantization level; when unset, defaults per
///   device (see [`WhisperConfig::compute_type`])
/// - `beam_size`: decoding search breadth; 1 is greedy decoding (fastest),
///   5 trades compute for quality
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperConfig {
    pub model: String,
    pub device: String,
    pub compute_type: Option<String>,
    pub beam_size: usize,
}

impl WhisperConfig {
    /// Resolved compute precision: the configured value, or the device
    /// default — integer-quantized weights on CPU, 16-bit float on CUDA.
    pub fn compute_type(&self) -> &str {
        match self.compute_type.as_deref() {
            Some(value) => value,
            None if self.device == "cuda" => "f16",
            None => "q8_0",
        }
    }
}

/// Bearer auth settings, read once at startup and immutable afterwards.
///
/// `token` unset disables the auth gate entirely. `header_fallback` is an
/// optional full header value ("Bearer ...") applied when a request carries
/// no Authorization header.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token: Option<String>,
    pub header_fallback: Option<String>,
}

impl AuthConfig {
    /// An empty or whitespace-only token counts as "auth disabled" so that
    /// `TRANSCRIBE_AUTH_TOKEN=""` behaves the same as leaving it unset.
    fn normalize(&mut self) {
        self.token = self
            .token
            .take()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        self.header_fallback = self.header_fallback.take().filter(|v| !v.is_empty());
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            whisper: WhisperConfig {
                // Smaller model = less CPU and memory; fits constrained hosts
                model: "small".to_string(),
                device: "cpu".to_string(),
                compute_type: None,
                beam_size: 1,
            },
            auth: AuthConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources in priority order.
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Flat environment names used by deployment platforms and operators;
        // these win over every other source.
        let overrides = [
            ("HOST", "server.host"),
            ("PORT", "server.port"),
            ("WHISPER_MODEL", "whisper.model"),
            ("WHISPER_DEVICE", "whisper.device"),
            ("WHISPER_COMPUTE_TYPE", "whisper.compute_type"),
            ("WHISPER_BEAM_SIZE", "whisper.beam_size"),
            ("TRANSCRIBE_AUTH_TOKEN", "auth.token"),
            ("TRANSCRIBE_AUTH_HEADER", "auth.header_fallback"),
        ];
        for (var, key) in overrides {
            if let Ok(value) = env::var(var) {
                settings = settings.set_override(key, value)?;
            }
        }

        let mut config: AppConfig = settings.build()?.try_deserialize()?;
        config.auth.normalize();
        Ok(config)
    }

    /// Structural validation of settings this layer owns. Engine-facing
    /// strings (model, device, precision) are deliberately not checked here.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.whisper.beam_size == 0 {
            return Err(anyhow::anyhow!("Beam size must be at least 1"));
        }

        Ok(())
    }
}
