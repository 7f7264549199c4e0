//! Decoding of generated text into extraction records

use ragner_core::ExtractionRecord;

/// A batch whose output could not be decoded.
///
/// Carries the offending payload so the caller can log it; one failed
/// batch contributes zero entities and never aborts the request.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    pub payload: String,
    pub reason: String,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.reason, self.payload)
    }
}

/// Decode one batch's generated text into an [`ExtractionRecord`]
pub fn parse_extraction(output: &str) -> Result<ExtractionRecord, ParseFailure> {
    let cleaned = normalize_json_payload(output);

    if cleaned.is_empty() {
        return Err(ParseFailure {
            payload: output.to_string(),
            reason: "empty payload".to_string(),
        });
    }

    serde_json::from_str::<ExtractionRecord>(&cleaned).map_err(|e| ParseFailure {
        payload: output.to_string(),
        reason: e.to_string(),
    })
}

/// Strip markdown fences and slice to the outermost JSON object.
///
/// Models wrap JSON in ``` fences or lead with prose often enough that a
/// strict decode alone would throw away good batches.
fn normalize_json_payload(payload: &str) -> String {
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return trimmed.to_string();
    }

    let without_fence = if trimmed.starts_with("```") {
        let mut lines = trimmed.lines();
        let _ = lines.next(); // drop ``` or ```json
        let mut content = lines.collect::<Vec<_>>().join("\n");
        if content.ends_with("```") {
            content.truncate(content.len().saturating_sub(3));
        }
        content.trim().to_string()
    } else {
        trimmed.to_string()
    };

    if let (Some(start), Some(end)) = (without_fence.find('{'), without_fence.rfind('}')) {
        if start < end {
            return without_fence[start..=end].to_string();
        }
    }

    without_fence
}
