//! Follow-up question generation.
//!
//! Phrasing is delegated to an external [`QuestionGenerator`] (usually an LLM
//! provider). Whatever the provider does, every selected field ends up with
//! exactly one question: missing or failed ones are filled in with a
//! deterministic fallback.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::profiles::{CustomerProfile, FieldRegistry, FieldScore, SectionDefinition};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NudgeQuestion {
    pub id: String,
    pub field_key: String,
    pub question: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// One sentence on why the answer matters.
    pub why: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NudgeAnswer {
    pub question_id: String,
    pub field_key: String,
    pub answer: Option<String>,
    #[serde(default)]
    pub skipped: bool,
}

impl NudgeAnswer {
    pub fn answered(question: &NudgeQuestion, answer: impl Into<String>) -> Self {
        Self {
            question_id: question.id.clone(),
            field_key: question.field_key.clone(),
            answer: Some(answer.into()),
            skipped: false,
        }
    }

    pub fn skipped(question: &NudgeQuestion) -> Self {
        Self {
            question_id: question.id.clone(),
            field_key: question.field_key.clone(),
            answer: None,
            skipped: true,
        }
    }
}

/// Profile context handed to the generator alongside the selected fields.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionContext {
    pub customer_id: String,
    pub customer_name: Option<String>,
    pub section_labels: HashMap<String, String>,
}

impl QuestionContext {
    pub fn for_profile(profile: &CustomerProfile, sections: &[SectionDefinition]) -> Self {
        Self {
            customer_id: profile.id.clone(),
            customer_name: profile.display_name.clone(),
            section_labels: sections
                .iter()
                .map(|section| (section.key.clone(), section.label.clone()))
                .collect(),
        }
    }

    fn section_label<'a>(&'a self, section: &'a str) -> &'a str {
        self.section_labels
            .get(section)
            .map(String::as_str)
            .unwrap_or(section)
    }
}

#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(
        &self,
        fields: &[FieldScore],
        context: &QuestionContext,
    ) -> Result<Vec<NudgeQuestion>>;
}

pub fn fallback_question(
    field: &FieldScore,
    context: &QuestionContext,
    registry: &dyn FieldRegistry,
) -> NudgeQuestion {
    let description = registry.definition(&field.field_key).and_then(|definition| {
        definition
            .description
            .clone()
            .or_else(|| definition.field_type.hint())
    });
    NudgeQuestion {
        id: Uuid::new_v4().to_string(),
        field_key: field.field_key.clone(),
        question: format!("What is the customer's {}?", field.label),
        description,
        why: format!(
            "Completing the {} section gives a fuller picture of the customer for future conversations.",
            context.section_label(&field.section)
        ),
    }
}

/// One question per field, in field order. Provider questions are used where
/// the provider answered for a requested field; everything else falls back.
pub async fn generate_nudges(
    generator: Option<&dyn QuestionGenerator>,
    fields: &[FieldScore],
    context: &QuestionContext,
    registry: &dyn FieldRegistry,
) -> Vec<NudgeQuestion> {
    if fields.is_empty() {
        return Vec::new();
    }
    let mut provided: HashMap<String, NudgeQuestion> = HashMap::new();
    if let Some(generator) = generator {
        match generator.generate(fields, context).await {
            Ok(questions) => {
                for question in questions {
                    provided.entry(question.field_key.clone()).or_insert(question);
                }
            }
            Err(err) => {
                let message = format!("{err:#}");
                warn!(
                    customer = %context.customer_id,
                    fields = fields.len(),
                    error = %message,
                    "question generator failed, using fallback questions"
                );
            }
        }
    }
    let questions: Vec<NudgeQuestion> = fields
        .iter()
        .map(|field| {
            provided
                .remove(&field.field_key)
                .unwrap_or_else(|| fallback_question(field, context, registry))
        })
        .collect();
    debug!(
        customer = %context.customer_id,
        requested = fields.len(),
        "prepared nudge questions"
    );
    questions
}
