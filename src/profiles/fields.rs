//! Field value types.
//!
//! Every schema field declares one [`FieldType`]. Coercion and display both
//! match on the enum exhaustively, so a new type cannot be added without
//! deciding how it validates and how it renders.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldType {
    Boolean,
    Enum { options: Vec<String> },
    MultiSelect { options: Vec<String> },
    Date,
    Number,
    Text,
    Json,
}

impl FieldType {
    pub fn enumeration(options: &[&str]) -> Self {
        FieldType::Enum {
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn multi_select(options: &[&str]) -> Self {
        FieldType::MultiSelect {
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    /// Normalizes a raw (usually LLM- or RM-provided) value into the stored
    /// representation, or explains why it does not fit.
    pub fn coerce(&self, raw: &Value) -> Result<Value, String> {
        if raw.is_null() {
            return Err("value is empty".into());
        }
        match self {
            FieldType::Boolean => coerce_boolean(raw),
            FieldType::Enum { options } => coerce_enum(options, raw),
            FieldType::MultiSelect { options } => coerce_multi_select(options, raw),
            FieldType::Date => coerce_date(raw),
            FieldType::Number => coerce_number(raw),
            FieldType::Text => coerce_text(raw),
            FieldType::Json => Ok(raw.clone()),
        }
    }

    pub fn format(&self, value: &Value) -> String {
        match self {
            FieldType::Boolean => match value.as_bool() {
                Some(true) => "Yes".into(),
                Some(false) => "No".into(),
                None => plain(value),
            },
            FieldType::MultiSelect { .. } => match value.as_array() {
                Some(items) => items.iter().map(plain).collect::<Vec<_>>().join(", "),
                None => plain(value),
            },
            FieldType::Enum { .. } | FieldType::Date | FieldType::Number | FieldType::Text => {
                plain(value)
            }
            FieldType::Json => value.to_string(),
        }
    }

    /// Short guidance for the RM when a question has no curated description.
    pub fn hint(&self) -> Option<String> {
        match self {
            FieldType::Boolean => Some("Yes or no.".into()),
            FieldType::Enum { options } => Some(format!("One of: {}.", options.join(", "))),
            FieldType::MultiSelect { options } => {
                Some(format!("Any of: {}.", options.join(", ")))
            }
            FieldType::Date => Some("A date, e.g. 1980-04-23.".into()),
            FieldType::Number => Some("A number, e.g. 250000.".into()),
            FieldType::Text | FieldType::Json => None,
        }
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn coerce_boolean(raw: &Value) -> Result<Value, String> {
    match raw {
        Value::Bool(flag) => Ok(Value::Bool(*flag)),
        Value::Number(n) if n.as_i64() == Some(1) => Ok(Value::Bool(true)),
        Value::Number(n) if n.as_i64() == Some(0) => Ok(Value::Bool(false)),
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "n" | "0" => Ok(Value::Bool(false)),
            other => Err(format!("'{other}' is not a yes/no value")),
        },
        _ => Err("expected a yes/no value".into()),
    }
}

fn match_option(options: &[String], candidate: &str) -> Option<String> {
    let needle = candidate.trim();
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(needle))
        .cloned()
}

fn coerce_enum(options: &[String], raw: &Value) -> Result<Value, String> {
    let text = raw.as_str().ok_or("expected a single option")?;
    match_option(options, text)
        .map(Value::String)
        .ok_or_else(|| format!("'{}' is not one of: {}", text.trim(), options.join(", ")))
}

fn coerce_multi_select(options: &[String], raw: &Value) -> Result<Value, String> {
    let candidates: Vec<String> = match raw {
        Value::Array(items) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or("expected a list of options"))
            .collect::<Result<_, _>>()?,
        Value::String(text) => text
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => return Err("expected a list of options".into()),
    };
    let mut selected: Vec<String> = Vec::new();
    for candidate in candidates {
        let option = match_option(options, &candidate).ok_or_else(|| {
            format!("'{}' is not one of: {}", candidate.trim(), options.join(", "))
        })?;
        if !selected.contains(&option) {
            selected.push(option);
        }
    }
    if selected.is_empty() {
        return Err("expected at least one option".into());
    }
    Ok(Value::Array(selected.into_iter().map(Value::String).collect()))
}

fn coerce_date(raw: &Value) -> Result<Value, String> {
    let text = raw.as_str().map(str::trim).ok_or("expected a date string")?;
    if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
        return Ok(Value::String(date.format(DATE_FORMAT).to_string()));
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Ok(Value::String(
            timestamp.date_naive().format(DATE_FORMAT).to_string(),
        ));
    }
    Err(format!("'{text}' is not a date in YYYY-MM-DD format"))
}

fn coerce_number(raw: &Value) -> Result<Value, String> {
    let number = match raw {
        Value::Number(n) => n.as_f64().ok_or("expected a number")?,
        Value::String(text) => {
            let cleaned: String = text
                .trim()
                .chars()
                .filter(|c| !matches!(c, ',' | '$' | '€' | '£' | ' ' | '_'))
                .collect();
            cleaned
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", text.trim()))?
        }
        _ => return Err("expected a number".into()),
    };
    if !number.is_finite() {
        return Err("expected a finite number".into());
    }
    if number.fract() == 0.0 && number.abs() < i64::MAX as f64 {
        return Ok(Value::from(number as i64));
    }
    serde_json::Number::from_f64(number)
        .map(Value::Number)
        .ok_or_else(|| "expected a finite number".into())
}

fn coerce_text(raw: &Value) -> Result<Value, String> {
    let text = match raw {
        Value::String(text) => text.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => return Err("expected text".into()),
    };
    if text.is_empty() {
        return Err("value is empty".into());
    }
    Ok(Value::String(text))
}
