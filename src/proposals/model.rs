//! Proposal aggregate handed to the RM for review.
//!
//! A [`ProfileUpdateProposal`] is built once and only ever read afterwards;
//! review decisions and edits live in [`super::review::ReviewState`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::artifact::{Artifact, ArtifactPayload};
use crate::profiles::NoteSource;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InterestCategory {
    Personal,
    Financial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedFieldUpdate {
    pub id: String,
    pub field: String,
    pub label: String,
    /// `None` when the profile had no value yet.
    pub current_value: Option<Value>,
    pub proposed_value: Value,
    pub confidence: f32,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedAdditionalData {
    pub id: String,
    pub key: String,
    pub label: String,
    pub value: String,
    pub confidence: f32,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestProposal {
    pub id: String,
    pub category: InterestCategory,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub source_text: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
}

/// RM overrides for an interest before it is confirmed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestEdits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl InterestEdits {
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.description.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedNote {
    pub id: String,
    pub content: String,
    pub source: NoteSource,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateProposal {
    pub proposal_id: String,
    pub customer_id: String,
    #[serde(default)]
    pub field_updates: Vec<ProposedFieldUpdate>,
    #[serde(default)]
    pub additional_data: Vec<ProposedAdditionalData>,
    #[serde(default)]
    pub interest_proposals: Vec<InterestProposal>,
    pub note: ProposedNote,
    #[serde(default)]
    pub raw_input: String,
    pub created_at: DateTime<Utc>,
}

impl ProfileUpdateProposal {
    pub fn field_update(&self, id: &str) -> Option<&ProposedFieldUpdate> {
        self.field_updates.iter().find(|update| update.id == id)
    }

    pub fn additional_item(&self, id: &str) -> Option<&ProposedAdditionalData> {
        self.additional_data.iter().find(|item| item.id == id)
    }

    pub fn interest(&self, id: &str) -> Option<&InterestProposal> {
        self.interest_proposals.iter().find(|interest| interest.id == id)
    }

    /// Every reviewable item id, note last.
    pub fn item_ids(&self) -> Vec<&str> {
        self.field_updates
            .iter()
            .map(|u| u.id.as_str())
            .chain(self.additional_data.iter().map(|d| d.id.as_str()))
            .chain(self.interest_proposals.iter().map(|i| i.id.as_str()))
            .chain(std::iter::once(self.note.id.as_str()))
            .collect()
    }

    /// Rebuilds what can be recovered of a proposal from the pending artifacts
    /// of its batch. Additional data and the note are not backed by artifacts,
    /// so they come back empty. Returns `None` when nothing was pending.
    pub fn from_artifacts(proposal_id: &str, artifacts: &[Artifact]) -> Option<Self> {
        let mut batch: Vec<&Artifact> = artifacts
            .iter()
            .filter(|artifact| artifact.batch_id == proposal_id)
            .collect();
        let first = batch.first()?;
        let customer_id = first.customer_id.clone();
        let created_at = batch.iter().map(|a| a.created_at).min().unwrap_or(first.created_at);
        batch.sort_by_key(|artifact| artifact.position);

        let mut field_updates = Vec::new();
        let mut interest_proposals = Vec::new();
        for artifact in batch {
            match &artifact.payload {
                ArtifactPayload::ProfileEdit {
                    item_id,
                    field,
                    label,
                    current_value,
                    proposed_value,
                    confidence,
                    source,
                } => field_updates.push(ProposedFieldUpdate {
                    id: item_id.clone(),
                    field: field.clone(),
                    label: label.clone(),
                    current_value: current_value.clone(),
                    proposed_value: proposed_value.clone(),
                    confidence: *confidence,
                    source: source.clone(),
                    artifact_id: Some(artifact.id.clone()),
                }),
                ArtifactPayload::InterestProposal {
                    item_id,
                    category,
                    label,
                    description,
                    source_text,
                    confidence,
                } => interest_proposals.push(InterestProposal {
                    id: item_id.clone(),
                    category: *category,
                    label: label.clone(),
                    description: description.clone(),
                    source_text: source_text.clone(),
                    confidence: *confidence,
                    artifact_id: Some(artifact.id.clone()),
                }),
            }
        }

        Some(Self {
            proposal_id: proposal_id.to_string(),
            customer_id,
            field_updates,
            additional_data: Vec::new(),
            interest_proposals,
            note: ProposedNote {
                id: format!("{proposal_id}:note"),
                content: String::new(),
                source: NoteSource::Typed,
                tags: Vec::new(),
            },
            raw_input: String::new(),
            created_at,
        })
    }
}
