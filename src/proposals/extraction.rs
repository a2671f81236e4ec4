//! Raw output of the external extraction step, before it becomes a proposal.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use super::model::InterestCategory;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedField {
    pub field: String,
    pub value: Value,
    pub confidence: f32,
    /// Quote from the RM's input the value was taken from.
    #[serde(default)]
    pub source: String,
}

impl ExtractedField {
    pub fn new(field: impl Into<String>, value: Value, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value,
            confidence,
            source: source.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedAdditionalData {
    pub key: String,
    pub label: String,
    pub value: String,
    pub confidence: f32,
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedInterest {
    pub category: InterestCategory,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub source_text: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExtraction {
    #[serde(default)]
    pub fields: Vec<ExtractedField>,
    #[serde(default)]
    pub additional_data: Vec<ExtractedAdditionalData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub interests: Vec<ExtractedInterest>,
}

impl RawExtraction {
    /// Keys the extraction already populated; nudges never ask about these.
    pub fn field_keys(&self) -> HashSet<String> {
        self.fields.iter().map(|f| f.field.clone()).collect()
    }
}
