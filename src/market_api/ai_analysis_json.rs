//! Turning raw model text into a validated [`Advice`].

use serde::Deserialize;

use crate::error::AdvisoryError;

use super::ai_analysis::{Advice, Decision};

/// Strips Markdown fences and returns the first balanced JSON object in `text`.
pub fn extract_json_from_text(text: &str) -> String {
    let trimmed = text.trim();

    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().strip_suffix("```").unwrap_or(rest).trim())
        .unwrap_or(trimmed);

    match unfenced.find('{') {
        Some(start) => extract_json_object(&unfenced[start..]),
        None => unfenced.to_string(),
    }
}

/// Reads one `{...}` object from the start of `text`, honouring string
/// literals and escapes. Unterminated input is returned as far as it goes.
pub fn extract_json_object(text: &str) -> String {
    let mut result = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for ch in text.chars() {
        result.push(ch);

        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return result;
                }
            }
            _ => {}
        }
    }

    result
}

/// Wire shape requested from the model.
#[derive(Debug, Deserialize)]
struct RawAdvice {
    thought_process: String,
    decision: String,
    confidence: f64,
    entry_zone: String,
    stop_loss: String,
    take_profit: String,
    leverage: String,
}

/// Extracts, decodes and validates an advisory answer.
pub fn parse_advice(text: &str) -> Result<Advice, AdvisoryError> {
    let json = extract_json_from_text(text);
    let raw: RawAdvice =
        serde_json::from_str(&json).map_err(|e| AdvisoryError::Parse(e.to_string()))?;

    let decision = match raw.decision.trim().to_uppercase().as_str() {
        "BUY" => Decision::Buy,
        "SELL" => Decision::Sell,
        "WAIT" => Decision::Wait,
        other => {
            return Err(AdvisoryError::Schema(format!(
                "decision must be BUY, SELL or WAIT, got {:?}",
                other
            )))
        }
    };

    if !raw.confidence.is_finite() || !(0.0..=100.0).contains(&raw.confidence) {
        return Err(AdvisoryError::Schema(format!(
            "confidence must be within 0..=100, got {}",
            raw.confidence
        )));
    }

    if raw.thought_process.trim().is_empty() {
        return Err(AdvisoryError::Schema("thought_process is empty".to_string()));
    }

    Ok(Advice {
        narrative: raw.thought_process,
        decision,
        confidence: raw.confidence,
        entry_zone: raw.entry_zone,
        stop_loss: raw.stop_loss,
        take_profit: raw.take_profit,
        leverage: raw.leverage,
    })
}
