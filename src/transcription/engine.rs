//! Backend contract for speech-to-text engines.
//!
//! An engine takes a path to an audio file and produces a lazy stream of
//! timed segments plus run metadata. The stream is one-shot and
//! forward-only: it is consumed exactly once, in emission order, with no
//! random access or restart.

use std::path::Path;

use anyhow::Result;

/// Decoding options for a single transcription call.
#[derive(Debug, Clone)]
pub struct TranscribeOptions {
    /// Target language (ISO 639-1 code); not configurable per request.
    pub language: String,

    /// Decoding search breadth; 1 selects greedy decoding.
    pub beam_size: usize,

    /// Whether to compute per-token timestamps.
    pub word_timestamps: bool,
}

impl TranscribeOptions {
    pub fn new(beam_size: usize) -> Self {
        Self {
            language: super::LANGUAGE.to_string(),
            beam_size,
            word_timestamps: false,
        }
    }
}

/// A segment as emitted by the engine: offsets in seconds, text possibly
/// absent.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegment {
    pub start: f64,
    pub end: f64,
    pub text: Option<String>,
}

/// One-shot, forward-only segment stream. Elements are fallible because
/// engines can fail partway through emission.
pub type SegmentStream = Box<dyn Iterator<Item = Result<RawSegment>> + Send>;

/// Run metadata reported alongside the segment stream.
#[derive(Debug, Clone)]
pub struct TranscribeInfo {
    pub language: String,

    /// Duration of the decoded audio in seconds.
    pub duration: f64,
}

/// Result of invoking an engine on one audio file.
pub struct TranscribeOutput {
    pub segments: SegmentStream,
    pub info: TranscribeInfo,
}

/// Contract implemented by speech-to-text backends.
///
/// Implementations are shared read-only across concurrent requests; each
/// call must carry its own inference state.
pub trait SpeechEngine: Send + Sync {
    fn transcribe(&self, audio: &Path, options: &TranscribeOptions) -> Result<TranscribeOutput>;
}
