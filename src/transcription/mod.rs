//! # Transcription Module
//!
//! Speech-to-text via whisper.cpp through the whisper-rs bindings. The HTTP
//! layer depends on the [`SpeechEngine`] trait rather than a concrete
//! backend, which keeps request handling decoupled from inference code.
//!
//! ## Key Components:
//! - **engine**: the backend contract and segment stream types
//! - **whisper**: the whisper.cpp-backed implementation
//! - **model**: GGML weight resolution and download
//! - **audio**: container decode and resampling to 16 kHz mono PCM
//! - **segments**: aggregation of the engine's segment stream into the
//!   response payload

pub mod audio;
pub mod engine;
pub mod model;
pub mod segments;
pub mod whisper;

pub use engine::{RawSegment, SegmentStream, SpeechEngine, TranscribeInfo, TranscribeOptions};
pub use segments::{aggregate, Segment, TranscriptionResult};
pub use whisper::WhisperEngine;

/// Transcription language, fixed for every request.
pub const LANGUAGE: &str = "pt";
