//! GGML model weight resolution and download.
//!
//! Weights live in the user cache directory and are fetched from the public
//! whisper.cpp model repository on first use. The model name and compute
//! precision together select one weights file; an unrecognized precision is
//! a construction-time error that aborts startup.

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Numeric precision of the model weights.
///
/// Quantized variants trade a little accuracy for a much smaller memory
/// footprint; `F16` is the full-precision file the repository publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputePrecision {
    Q5_1,
    Q8_0,
    F16,
}

impl ComputePrecision {
    /// Filename suffix in the model repository, if any.
    fn quant_suffix(self) -> Option<&'static str> {
        match self {
            ComputePrecision::Q5_1 => Some("q5_1"),
            ComputePrecision::Q8_0 => Some("q8_0"),
            ComputePrecision::F16 => None,
        }
    }
}

impl FromStr for ComputePrecision {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "q8_0" | "int8" => Ok(ComputePrecision::Q8_0),
            "q5_1" => Ok(ComputePrecision::Q5_1),
            "f16" | "float16" | "int8_float16" => Ok(ComputePrecision::F16),
            other => bail!("unsupported compute precision: {other}"),
        }
    }
}

/// Weights filename for a model/precision pair, e.g. `ggml-small-q8_0.bin`.
pub fn weights_filename(model: &str, precision: ComputePrecision) -> String {
    match precision.quant_suffix() {
        Some(quant) => format!("ggml-{model}-{quant}.bin"),
        None => format!("ggml-{model}.bin"),
    }
}

/// Local cache location for downloaded weights.
fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("transcribe-backend")
        .join("models")
}

/// Resolve the weights file for a model/precision pair, downloading it into
/// the cache on first use.
pub fn resolve(model: &str, precision: ComputePrecision) -> Result<PathBuf> {
    let filename = weights_filename(model, precision);

    // An operator-provided file next to the binary wins over the cache.
    let local = Path::new("models").join(&filename);
    if local.exists() {
        return Ok(local);
    }

    let cached = cache_dir().join(&filename);
    if cached.exists() {
        return Ok(cached);
    }

    download(&filename, &cached)?;
    Ok(cached)
}

fn download(filename: &str, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let url = format!("{MODEL_BASE_URL}/{filename}");
    info!(%url, dest = %dest.display(), "downloading model weights");

    let agent = ureq::AgentBuilder::new()
        .timeout_connect(std::time::Duration::from_secs(30))
        .timeout_read(std::time::Duration::from_secs(600))
        .build();

    let response = agent
        .get(&url)
        .call()
        .map_err(|e| anyhow!("failed to download {filename}: {e}"))?;

    let expected = response
        .header("Content-Length")
        .and_then(|s| s.parse::<u64>().ok());

    // Write to a sibling temp name first so a failed download never leaves a
    // truncated weights file behind for the next startup to load.
    let partial = dest.with_extension("partial");
    let mut file = fs::File::create(&partial)
        .with_context(|| format!("failed to create {}", partial.display()))?;

    let mut reader = response.into_reader();
    let mut buffer = [0u8; 64 * 1024];
    let mut written = 0u64;
    loop {
        let n = reader.read(&mut buffer).context("model download read failed")?;
        if n == 0 {
            break;
        }
        file.write_all(&buffer[..n]).context("model write failed")?;
        written += n as u64;
    }
    file.flush()?;
    drop(file);

    if let Some(expected) = expected {
        if written != expected {
            let _ = fs::remove_file(&partial);
            bail!("incomplete download of {filename}: expected {expected} bytes, got {written}");
        }
    }

    fs::rename(&partial, dest)
        .with_context(|| format!("failed to move weights into {}", dest.display()))?;
    info!(bytes = written, "model weights downloaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_parsing() {
        assert_eq!(
            "q8_0".parse::<ComputePrecision>().unwrap(),
            ComputePrecision::Q8_0
        );
        assert_eq!(
            "int8".parse::<ComputePrecision>().unwrap(),
            ComputePrecision::Q8_0
        );
        assert_eq!(
            "q5_1".parse::<ComputePrecision>().unwrap(),
            ComputePrecision::Q5_1
        );
        assert_eq!(
            "F16".parse::<ComputePrecision>().unwrap(),
            ComputePrecision::F16
        );
        assert_eq!(
            "int8_float16".parse::<ComputePrecision>().unwrap(),
            ComputePrecision::F16
        );
        assert!("int4".parse::<ComputePrecision>().is_err());
    }

    #[test]
    fn test_weights_filename_mapping() {
        assert_eq!(
            weights_filename("small", ComputePrecision::Q8_0),
            "ggml-small-q8_0.bin"
        );
        assert_eq!(
            weights_filename("large-v3", ComputePrecision::Q5_1),
            "ggml-large-v3-q5_1.bin"
        );
        assert_eq!(
            weights_filename("base", ComputePrecision::F16),
            "ggml-base.bin"
        );
    }
}
