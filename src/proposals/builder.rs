//! Turns a raw extraction into one proposal plus its pending artifacts.

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::HashSet;
use tracing::debug;
use uuid::Uuid;

use super::artifact::{Artifact, ArtifactPayload};
use super::extraction::RawExtraction;
use super::model::{
    InterestProposal, ProfileUpdateProposal, ProposedAdditionalData, ProposedFieldUpdate,
    ProposedNote,
};
use crate::config::EnrichmentSettings;
use crate::profiles::{CustomerProfile, FieldRegistry, NoteSource};
use crate::storage::ArtifactStore;

const ELLIPSIS: char = '…';

/// Proposal plus the artifacts that must be staged before review starts.
#[derive(Debug, Clone)]
pub struct BuiltProposal {
    pub proposal: ProfileUpdateProposal,
    pub artifacts: Vec<Artifact>,
}

pub struct ProposalBuilder<'a> {
    registry: &'a dyn FieldRegistry,
    note_fallback_chars: usize,
}

impl<'a> ProposalBuilder<'a> {
    pub fn new(registry: &'a dyn FieldRegistry) -> Self {
        Self {
            registry,
            note_fallback_chars: EnrichmentSettings::default().note_fallback_chars,
        }
    }

    pub fn with_settings(mut self, settings: &EnrichmentSettings) -> Self {
        self.note_fallback_chars = settings.note_fallback_chars;
        self
    }

    pub fn build(
        &self,
        customer: &CustomerProfile,
        extraction: RawExtraction,
        raw_input: &str,
        source: NoteSource,
    ) -> BuiltProposal {
        let proposal_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let mut artifacts = Vec::new();

        let mut seen = HashSet::new();
        let mut field_updates = Vec::new();
        for extracted in extraction.fields {
            let Some(definition) = self.registry.definition(&extracted.field) else {
                debug!(field = %extracted.field, "dropping extracted field outside the schema");
                continue;
            };
            if !seen.insert(extracted.field.clone()) {
                debug!(field = %extracted.field, "dropping duplicate extracted field");
                continue;
            }
            let current_value = customer
                .is_filled(&extracted.field)
                .then(|| customer.value(&extracted.field).cloned())
                .flatten();
            let item_id = Uuid::new_v4().to_string();
            let artifact = Artifact::pending(
                &proposal_id,
                &customer.id,
                artifacts.len(),
                ArtifactPayload::ProfileEdit {
                    item_id: item_id.clone(),
                    field: extracted.field.clone(),
                    label: definition.label.clone(),
                    current_value: current_value.clone(),
                    proposed_value: extracted.value.clone(),
                    confidence: extracted.confidence,
                    source: extracted.source.clone(),
                },
                created_at,
            );
            field_updates.push(ProposedFieldUpdate {
                id: item_id,
                field: extracted.field,
                label: definition.label.clone(),
                current_value,
                proposed_value: extracted.value,
                confidence: extracted.confidence,
                source: extracted.source,
                artifact_id: Some(artifact.id.clone()),
            });
            artifacts.push(artifact);
        }

        let additional_data = extraction
            .additional_data
            .into_iter()
            .map(|item| ProposedAdditionalData {
                id: Uuid::new_v4().to_string(),
                key: item.key,
                label: item.label,
                value: item.value,
                confidence: item.confidence,
                source: item.source,
                category: item.category,
            })
            .collect();

        let mut interest_proposals = Vec::new();
        for candidate in extraction.interests {
            let item_id = Uuid::new_v4().to_string();
            let artifact = Artifact::pending(
                &proposal_id,
                &customer.id,
                artifacts.len(),
                ArtifactPayload::InterestProposal {
                    item_id: item_id.clone(),
                    category: candidate.category,
                    label: candidate.label.clone(),
                    description: candidate.description.clone(),
                    source_text: candidate.source_text.clone(),
                    confidence: candidate.confidence,
                },
                created_at,
            );
            interest_proposals.push(InterestProposal {
                id: item_id,
                category: candidate.category,
                label: candidate.label,
                description: candidate.description,
                source_text: candidate.source_text,
                confidence: candidate.confidence,
                artifact_id: Some(artifact.id.clone()),
            });
            artifacts.push(artifact);
        }

        let content = match extraction.summary.as_deref().map(str::trim) {
            Some(summary) if !summary.is_empty() => summary.to_string(),
            _ => truncate_note(raw_input, self.note_fallback_chars),
        };
        let note = ProposedNote {
            id: Uuid::new_v4().to_string(),
            content,
            source,
            tags: extraction.tags,
        };

        BuiltProposal {
            proposal: ProfileUpdateProposal {
                proposal_id,
                customer_id: customer.id.clone(),
                field_updates,
                additional_data,
                interest_proposals,
                note,
                raw_input: raw_input.to_string(),
                created_at,
            },
            artifacts,
        }
    }
}

/// Keeps at most `max_chars` characters of `raw`, marking the cut with an
/// ellipsis.
pub fn truncate_note(raw: &str, max_chars: usize) -> String {
    let trimmed = raw.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let keep = max_chars.saturating_sub(1);
    let mut truncated: String = trimmed.chars().take(keep).collect();
    truncated.truncate(truncated.trim_end().len());
    truncated.push(ELLIPSIS);
    truncated
}

/// Persists the pending artifacts and hands back the proposal for review.
pub async fn stage_proposal(
    store: &dyn ArtifactStore,
    built: BuiltProposal,
) -> Result<ProfileUpdateProposal> {
    store
        .record_pending(&built.artifacts)
        .await
        .with_context(|| {
            format!(
                "Failed to stage artifacts for proposal {}",
                built.proposal.proposal_id
            )
        })?;
    debug!(
        proposal = %built.proposal.proposal_id,
        artifacts = built.artifacts.len(),
        "staged proposal artifacts"
    );
    Ok(built.proposal)
}
