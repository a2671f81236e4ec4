use serde_json::Value;

use super::questions::NudgeAnswer;
use crate::proposals::{ExtractedField, RawExtraction};

/// Confidence assigned to values the RM typed in directly.
pub const RM_ANSWER_CONFIDENCE: f32 = 1.0;

/// Folds answered nudges back into the extraction before the finalize step.
/// Skipped and blank answers are ignored; an answer for a field the
/// extraction already carried replaces that entry in place.
pub fn fold_answers(mut extraction: RawExtraction, answers: &[NudgeAnswer]) -> RawExtraction {
    for answer in answers {
        if answer.skipped {
            continue;
        }
        let Some(text) = answer.answer.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        let field = ExtractedField::new(
            answer.field_key.clone(),
            Value::String(text.to_string()),
            RM_ANSWER_CONFIDENCE,
            format!("RM answer: {text}"),
        );
        match extraction
            .fields
            .iter_mut()
            .find(|existing| existing.field == answer.field_key)
        {
            Some(existing) => *existing = field,
            None => extraction.fields.push(field),
        }
    }
    extraction
}
