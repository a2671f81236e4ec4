//! Customer snapshot and section catalogue types shared by scoring, proposal
//! building and the storage collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::fields::FieldType;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FieldPriority {
    High,
    Medium,
    Low,
}

impl FieldPriority {
    pub fn weight(self) -> f64 {
        match self {
            FieldPriority::High => 3.0,
            FieldPriority::Medium => 2.0,
            FieldPriority::Low => 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    pub key: String,
    pub label: String,
    pub priority: FieldPriority,
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDefinition {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        priority: FieldPriority,
        field_type: FieldType,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            priority,
            field_type,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Ordered group of profile fields. Declaration order is significant: it is
/// the tie-breaker when two empty fields score the same.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SectionDefinition {
    pub key: String,
    pub label: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl SectionDefinition {
    pub fn new(key: impl Into<String>, label: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            fields,
        }
    }
}

/// Non-schema datum stored alongside the structured fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalDataEntry {
    pub key: String,
    pub label: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub source: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoteSource {
    Dictated,
    Typed,
}

/// Audit payload attached to a note created from an applied proposal.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NoteTraceability {
    pub proposal_id: String,
    #[serde(default)]
    pub approved_field_ids: Vec<String>,
    #[serde(default)]
    pub rejected_field_ids: Vec<String>,
    #[serde(default)]
    pub confirmed_interest_ids: Vec<String>,
    #[serde(default)]
    pub rejected_interest_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub content: String,
    pub source: NoteSource,
    #[serde(default)]
    pub tags: Vec<String>,
    pub traceability: NoteTraceability,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerNote {
    pub id: String,
    pub content: String,
    pub source: NoteSource,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceability: Option<NoteTraceability>,
    pub created_at: DateTime<Utc>,
}

/// Point-in-time view of one customer's profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub additional_data: Vec<AdditionalDataEntry>,
    #[serde(default)]
    pub notes: Vec<CustomerNote>,
}

impl CustomerProfile {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn is_filled(&self, key: &str) -> bool {
        !is_empty_value(self.value(key))
    }
}

/// Missing, null, blank strings and empty arrays all count as "not known yet".
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(text)) => text.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}
