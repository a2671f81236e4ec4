//! Field registry: schema lookup and value validation for profile fields.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use super::model::{FieldDefinition, SectionDefinition};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldValidation {
    pub valid: bool,
    pub value: Option<Value>,
    pub error: Option<String>,
}

impl FieldValidation {
    pub fn ok(value: Value) -> Self {
        Self {
            valid: true,
            value: Some(value),
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            value: None,
            error: Some(error.into()),
        }
    }

    pub fn into_result(self) -> Result<Value, String> {
        match (self.valid, self.value) {
            (true, Some(value)) => Ok(value),
            _ => Err(self.error.unwrap_or_else(|| "invalid value".into())),
        }
    }
}

/// Schema knowledge the pipeline needs about profile fields.
pub trait FieldRegistry: Send + Sync {
    fn definition(&self, field_key: &str) -> Option<&FieldDefinition>;

    fn section_of(&self, field_key: &str) -> Option<&str>;

    /// Unknown keys are always invalid.
    fn validate(&self, field_key: &str, raw: &Value) -> FieldValidation {
        match self.definition(field_key) {
            None => FieldValidation::invalid(format!("Unknown field '{field_key}'")),
            Some(definition) => match definition.field_type.coerce(raw) {
                Ok(value) => FieldValidation::ok(value),
                Err(reason) => FieldValidation::invalid(reason),
            },
        }
    }
}

/// Registry backed by an ordered section catalogue.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    sections: Vec<SectionDefinition>,
    index: HashMap<String, (usize, usize)>,
}

impl SchemaRegistry {
    pub fn new(sections: Vec<SectionDefinition>) -> Self {
        let mut index = HashMap::new();
        for (section_idx, section) in sections.iter().enumerate() {
            for (field_idx, field) in section.fields.iter().enumerate() {
                index
                    .entry(field.key.clone())
                    .or_insert((section_idx, field_idx));
            }
        }
        Self { sections, index }
    }

    pub fn sections(&self) -> &[SectionDefinition] {
        &self.sections
    }
}

impl FieldRegistry for SchemaRegistry {
    fn definition(&self, field_key: &str) -> Option<&FieldDefinition> {
        let (section_idx, field_idx) = *self.index.get(field_key)?;
        self.sections.get(section_idx)?.fields.get(field_idx)
    }

    fn section_of(&self, field_key: &str) -> Option<&str> {
        let (section_idx, _) = *self.index.get(field_key)?;
        self.sections.get(section_idx).map(|s| s.key.as_str())
    }
}
