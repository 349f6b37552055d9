//! Segment aggregation: turns the engine's lazy stream into the response
//! payload.

use anyhow::Result;
use serde::Serialize;

use super::engine::RawSegment;

/// A time-bounded span of recognized speech, as serialized to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    /// Start offset in seconds.
    pub start: f64,

    /// End offset in seconds.
    pub end: f64,

    /// Trimmed segment text; empty when the engine emitted none.
    pub text: String,
}

/// Aggregated transcription for one request. Never cached or persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TranscriptionResult {
    /// Non-empty segment texts joined with single spaces.
    pub text: String,

    /// All segments in engine emission order, empty-text ones included.
    pub segments: Vec<Segment>,
}

/// Consume a segment stream exactly once, in order.
///
/// Segment text is trimmed, with absent text treated as empty. The segment
/// list keeps every element; the joined text skips empty ones. No
/// re-ordering, deduplication, or merging. A stream error aborts
/// aggregation and propagates.
pub fn aggregate<I>(stream: I) -> Result<TranscriptionResult>
where
    I: IntoIterator<Item = Result<RawSegment>>,
{
    let mut segments = Vec::new();
    let mut parts: Vec<String> = Vec::new();

    for item in stream {
        let raw = item?;
        let text = raw.text.as_deref().unwrap_or("").trim().to_string();
        parts.push(text.clone());
        segments.push(Segment {
            start: raw.start,
            end: raw.end,
            text,
        });
    }

    let text = parts
        .iter()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string();

    Ok(TranscriptionResult { text, segments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn raw(start: f64, end: f64, text: Option<&str>) -> Result<RawSegment> {
        Ok(RawSegment {
            start,
            end,
            text: text.map(|t| t.to_string()),
        })
    }

    #[test]
    fn test_joins_trimmed_non_empty_texts() {
        let result = aggregate(vec![
            raw(0.0, 1.2, Some(" Olá, ")),
            raw(1.2, 2.5, Some("tudo bem?")),
        ])
        .unwrap();

        assert_eq!(result.text, "Olá, tudo bem?");
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[0].text, "Olá,");
        assert_eq!(result.segments[1].text, "tudo bem?");
    }

    #[test]
    fn test_preserves_emission_order() {
        let result = aggregate(vec![
            raw(0.0, 1.0, Some("um")),
            raw(1.0, 2.0, Some("dois")),
            raw(2.0, 3.0, Some("três")),
        ])
        .unwrap();

        let starts: Vec<f64> = result.segments.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0.0, 1.0, 2.0]);
        assert_eq!(result.text, "um dois três");
    }

    #[test]
    fn test_empty_segments_kept_in_list_but_not_in_text() {
        let result = aggregate(vec![
            raw(0.0, 1.0, Some("fala")),
            raw(1.0, 2.0, Some("   ")),
            raw(2.0, 3.0, None),
            raw(3.0, 4.0, Some("final")),
        ])
        .unwrap();

        assert_eq!(result.segments.len(), 4);
        assert_eq!(result.segments[1].text, "");
        assert_eq!(result.segments[2].text, "");
        assert_eq!(result.text, "fala final");
    }

    #[test]
    fn test_empty_stream_yields_empty_result() {
        let result = aggregate(Vec::new()).unwrap();
        assert_eq!(result, TranscriptionResult::default());
    }

    #[test]
    fn test_all_empty_segments_yield_empty_text() {
        let result = aggregate(vec![raw(0.0, 1.0, None), raw(1.0, 2.0, Some(""))]).unwrap();
        assert_eq!(result.text, "");
        assert_eq!(result.segments.len(), 2);
    }

    #[test]
    fn test_stream_error_propagates() {
        let stream: Vec<Result<RawSegment>> = vec![
            raw(0.0, 1.0, Some("antes")),
            Err(anyhow!("decoder choked")),
            raw(1.0, 2.0, Some("depois")),
        ];

        let err = aggregate(stream).unwrap_err();
        assert!(err.to_string().contains("decoder choked"));
    }

    #[test]
    fn test_serializes_to_wire_shape() {
        let result = aggregate(vec![raw(0.0, 1.5, Some("oi"))]).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["text"], "oi");
        assert_eq!(json["segments"][0]["start"], 0.0);
        assert_eq!(json["segments"][0]["end"], 1.5);
        assert_eq!(json["segments"][0]["text"], "oi");
    }
}
