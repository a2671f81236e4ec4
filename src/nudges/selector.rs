//! Chooses which scored fields become follow-up questions.

use std::collections::HashSet;

use crate::config::EnrichmentSettings;
use crate::profiles::{FieldRegistry, FieldScore};

pub const DEFAULT_MAX_QUESTIONS: usize = 10;
pub const DEFAULT_NUDGE_RATIO: f64 = 0.2;

#[derive(Debug, Clone, Copy)]
pub struct NudgeSelector {
    max_questions: usize,
    ratio: f64,
}

impl Default for NudgeSelector {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUESTIONS, DEFAULT_NUDGE_RATIO)
    }
}

impl NudgeSelector {
    pub fn new(max_questions: usize, ratio: f64) -> Self {
        Self {
            max_questions,
            ratio: ratio.clamp(0.0, 1.0),
        }
    }

    pub fn from_settings(settings: &EnrichmentSettings) -> Self {
        Self::new(settings.max_questions, settings.nudge_ratio)
    }

    /// `min(ceil(total_empty * ratio), max_questions)`.
    pub fn quota(&self, total_empty: usize) -> usize {
        // Rounded before `ceil` so 35 * 0.2 lands on 7, not 7.000000000000001.
        let share = (total_empty as f64 * self.ratio * 1e6).round() / 1e6;
        (share.ceil() as usize).min(self.max_questions)
    }

    /// Drops fields the extraction already filled, floats fields from the
    /// sections the extraction touched to the front (score order is kept
    /// inside each group), then truncates to the quota. The quota is computed
    /// from the scored count *before* deduplication.
    pub fn select(
        &self,
        scored: &[FieldScore],
        extracted_keys: &HashSet<String>,
        registry: &dyn FieldRegistry,
    ) -> Vec<FieldScore> {
        let quota = self.quota(scored.len());
        if quota == 0 {
            return Vec::new();
        }
        let touched: HashSet<&str> = extracted_keys
            .iter()
            .filter_map(|key| registry.section_of(key))
            .collect();
        let remaining = scored
            .iter()
            .filter(|score| !extracted_keys.contains(&score.field_key))
            .cloned();
        let ordered: Vec<FieldScore> = if touched.is_empty() {
            remaining.collect()
        } else {
            let (mut front, back): (Vec<_>, Vec<_>) =
                remaining.partition(|score| touched.contains(score.section.as_str()));
            front.extend(back);
            front
        };
        ordered.into_iter().take(quota).collect()
    }
}

/// Score of the last selected field. Reported for observability; selection
/// is by rank and never filters on this value.
pub fn selection_threshold(selected: &[FieldScore]) -> Option<f64> {
    selected.last().map(|score| score.score)
}
