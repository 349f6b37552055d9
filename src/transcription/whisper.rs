//! whisper.cpp-backed speech engine.
//!
//! The context (model weights) is loaded once at startup and shared
//! read-only across requests; every transcription call creates its own
//! inference state, so concurrent calls need no locking.

use std::path::Path;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, WhisperState,
};

use super::audio;
use super::engine::{
    RawSegment, SpeechEngine, TranscribeInfo, TranscribeOptions, TranscribeOutput,
};
use super::model::{self, ComputePrecision};
use crate::config::WhisperConfig;

/// Compute device for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda,
}

impl FromStr for Device {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Device::Cpu),
            "cuda" | "gpu" => Ok(Device::Cuda),
            other => bail!("unsupported device: {other}"),
        }
    }
}

/// Speech engine backed by a process-wide whisper.cpp context.
pub struct WhisperEngine {
    context: WhisperContext,
    threads: i32,
}

impl WhisperEngine {
    /// Resolve weights and load the model. Any failure here — unknown
    /// device, unknown precision, missing or corrupt weights — is fatal to
    /// startup; there is no request-time recovery.
    pub fn from_config(config: &WhisperConfig) -> Result<Self> {
        let device: Device = config.device.parse()?;
        let precision: ComputePrecision = config.compute_type().parse()?;
        let weights = model::resolve(&config.model, precision)?;

        let mut context_params = WhisperContextParameters::default();
        context_params.use_gpu(device == Device::Cuda);

        let weights_str = weights
            .to_str()
            .ok_or_else(|| anyhow!("weights path is not valid UTF-8"))?;
        let context = WhisperContext::new_with_params(weights_str, context_params)
            .map_err(|e| anyhow!("failed to load {}: {e}", weights.display()))?;

        Ok(Self {
            context,
            threads: num_cpus::get().min(4) as i32,
        })
    }
}

impl SpeechEngine for WhisperEngine {
    fn transcribe(&self, audio_path: &Path, options: &TranscribeOptions) -> Result<TranscribeOutput> {
        let samples = audio::load_pcm(audio_path)?;
        let duration = samples.len() as f64 / audio::TARGET_SAMPLE_RATE as f64;

        let mut state = self
            .context
            .create_state()
            .map_err(|e| anyhow!("failed to create inference state: {e}"))?;

        let mut params = FullParams::new(sampling_strategy(options.beam_size));
        params.set_language(Some(&options.language));
        params.set_translate(false);
        params.set_token_timestamps(options.word_timestamps);
        params.set_n_threads(self.threads);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_suppress_blank(true);

        state
            .full(params, &samples)
            .map_err(|e| anyhow!("inference failed: {e}"))?;

        let count = state
            .full_n_segments()
            .map_err(|e| anyhow!("failed to read segment count: {e}"))?;

        Ok(TranscribeOutput {
            segments: Box::new(StateSegments {
                state,
                count,
                index: 0,
            }),
            info: TranscribeInfo {
                language: options.language.clone(),
                duration,
            },
        })
    }
}

fn sampling_strategy(beam_size: usize) -> SamplingStrategy {
    if beam_size <= 1 {
        SamplingStrategy::Greedy { best_of: 1 }
    } else {
        SamplingStrategy::BeamSearch {
            beam_size: beam_size as i32,
            patience: -1.0,
        }
    }
}

/// Lazy, one-shot view over the segments held by a finished inference
/// state. Timestamps arrive in 10 ms ticks and are converted to seconds.
struct StateSegments {
    state: WhisperState,
    count: i32,
    index: i32,
}

impl StateSegments {
    fn read_segment(&self, i: i32) -> Result<RawSegment> {
        let text = self
            .state
            .full_get_segment_text(i)
            .map_err(|e| anyhow!("failed to read segment {i} text: {e}"))?;
        let start = self
            .state
            .full_get_segment_t0(i)
            .map_err(|e| anyhow!("failed to read segment {i} start: {e}"))?;
        let end = self
            .state
            .full_get_segment_t1(i)
            .map_err(|e| anyhow!("failed to read segment {i} end: {e}"))?;

        Ok(RawSegment {
            start: start as f64 / 100.0,
            end: end as f64 / 100.0,
            text: Some(text),
        })
    }
}

impl Iterator for StateSegments {
    type Item = Result<RawSegment>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let item = self.read_segment(self.index);
        self.index += 1;
        Some(item)
    }
}
