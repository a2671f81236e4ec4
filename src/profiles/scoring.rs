//! Field importance scoring.
//!
//! Every empty field gets `priority weight + (section completeness)^2 * 3`.
//! The squared completeness term pulls fields of nearly finished sections
//! ahead of important fields in untouched sections, so the RM is nudged to
//! finish what they started.

use serde::{Deserialize, Serialize};

use super::model::{CustomerProfile, FieldPriority, SectionDefinition};

pub const COMPLETENESS_WEIGHT: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldScore {
    pub field_key: String,
    pub label: String,
    pub section: String,
    pub priority: FieldPriority,
    /// Percentage (0-100) of the enclosing section already filled.
    pub section_completeness: f64,
    pub score: f64,
}

pub fn field_score(priority: FieldPriority, completeness_pct: f64) -> f64 {
    let ratio = completeness_pct / 100.0;
    priority.weight() + ratio * ratio * COMPLETENESS_WEIGHT
}

/// Ranks the empty fields of `profile`, highest score first. Ties keep
/// catalogue order (section, then field).
pub fn score_empty_fields(profile: &CustomerProfile, sections: &[SectionDefinition]) -> Vec<FieldScore> {
    let mut scores = Vec::new();
    for section in sections {
        let completeness = section_completeness(profile, section).percent;
        for field in &section.fields {
            if profile.is_filled(&field.key) {
                continue;
            }
            scores.push(FieldScore {
                field_key: field.key.clone(),
                label: field.label.clone(),
                section: section.key.clone(),
                priority: field.priority,
                section_completeness: completeness,
                score: field_score(field.priority, completeness),
            });
        }
    }
    // `sort_by` is stable, which is what keeps equal scores in catalogue order.
    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    scores
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionCompleteness {
    pub section: String,
    pub label: String,
    pub filled: usize,
    pub total: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileCompleteness {
    pub sections: Vec<SectionCompleteness>,
    pub filled: usize,
    pub total: usize,
    pub percent: f64,
}

pub fn section_completeness(profile: &CustomerProfile, section: &SectionDefinition) -> SectionCompleteness {
    let total = section.fields.len();
    let filled = section
        .fields
        .iter()
        .filter(|field| profile.is_filled(&field.key))
        .count();
    SectionCompleteness {
        section: section.key.clone(),
        label: section.label.clone(),
        filled,
        total,
        percent: percent(filled, total),
    }
}

pub fn profile_completeness(profile: &CustomerProfile, sections: &[SectionDefinition]) -> ProfileCompleteness {
    let sections: Vec<SectionCompleteness> = sections
        .iter()
        .filter(|section| !section.fields.is_empty())
        .map(|section| section_completeness(profile, section))
        .collect();
    let filled = sections.iter().map(|s| s.filled).sum();
    let total = sections.iter().map(|s| s.total).sum();
    ProfileCompleteness {
        sections,
        filled,
        total,
        percent: percent(filled, total),
    }
}

fn percent(filled: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    filled as f64 * 100.0 / total as f64
}
