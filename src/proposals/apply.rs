//! Applies a reviewed proposal to the customer profile.
//!
//! The five phases (fields, additional data, interests, note, artifact sweep)
//! run one after the other and never abort each other. Primary writes report
//! into the `errors` list of the [`ApplyResult`]; bookkeeping writes (interest
//! artifact marking, rejection cleanup, field artifact sweep) only reach the
//! [`DiagnosticsSink`]. The only hard failures are structural: see
//! [`ApplyError`].

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use super::artifact::{Artifact, ArtifactTransition};
use super::diagnostics::{attempt, DiagnosticsSink, TracingDiagnostics};
use super::model::{InterestEdits, ProfileUpdateProposal};
use crate::config::EnrichmentSettings;
use crate::profiles::{
    AdditionalDataEntry, CustomerProfile, FieldRegistry, NewNote, NoteTraceability,
};
use crate::storage::{ArtifactStore, InterestStore, ProfileStore};

/// Wire body of an apply call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub proposal_id: String,
    /// Omitted when the caller no longer holds the proposal; it is then
    /// rebuilt from the pending artifacts of the batch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposal: Option<ProfileUpdateProposal>,
    #[serde(default)]
    pub approved_field_ids: Vec<String>,
    #[serde(default)]
    pub approved_additional_data_ids: Vec<String>,
    #[serde(default)]
    pub approved_interest_ids: Vec<String>,
    #[serde(default)]
    pub approved_note: bool,
    #[serde(default)]
    pub edited_values: HashMap<String, Value>,
    #[serde(default)]
    pub edited_additional_data: HashMap<String, String>,
    #[serde(default)]
    pub edited_interests: HashMap<String, InterestEdits>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_note_content: Option<String>,
}

impl ApplyRequest {
    /// Empty request (nothing approved) carrying the full proposal.
    pub fn for_proposal(proposal: &ProfileUpdateProposal) -> Self {
        Self {
            proposal_id: proposal.proposal_id.clone(),
            proposal: Some(proposal.clone()),
            ..Self::default()
        }
    }

    pub fn from_json(body: &[u8]) -> Result<Self, ApplyError> {
        let request: Self = serde_json::from_slice(body)
            .map_err(|err| ApplyError::MalformedRequest(err.to_string()))?;
        if request.proposal_id.trim().is_empty() {
            return Err(ApplyError::MalformedRequest(
                "proposalId must not be empty".into(),
            ));
        }
        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyResult {
    pub success: bool,
    pub fields_updated: usize,
    pub additional_data_added: usize,
    /// Present only when the proposal carried interest proposals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interests_confirmed: Option<usize>,
    pub note_created: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl ApplyResult {
    pub fn errors(&self) -> &[String] {
        self.errors.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApplyError {
    #[error("malformed apply request: {0}")]
    MalformedRequest(String),
    #[error("proposal {0} not found")]
    ProposalNotFound(String),
    #[error("request is for proposal {requested} but carries proposal {carried}")]
    ProposalMismatch { requested: String, carried: String },
    #[error("customer {0} not found")]
    CustomerNotFound(String),
    #[error("storage failure: {0}")]
    Store(String),
}

/// Per-item failures of one apply, in the order they happened.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorList(Vec<String>);

impl ErrorList {
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    pub fn extend(&mut self, other: ErrorList) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

/// What a primary phase wrote, plus the per-item failures it skipped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PhaseOutcome {
    pub applied: usize,
    /// Approved items that resolved and validated, in request order.
    pub resolved_ids: Vec<String>,
    pub errors: ErrorList,
}

#[derive(Debug, Default)]
struct InterestOutcome {
    confirmed_ids: Vec<String>,
    rejected_ids: Vec<String>,
    errors: ErrorList,
}

pub struct ApplyOrchestrator {
    profiles: Arc<dyn ProfileStore>,
    artifacts: Arc<dyn ArtifactStore>,
    interests: Arc<dyn InterestStore>,
    registry: Arc<dyn FieldRegistry>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    sweep_concurrency: usize,
}

impl ApplyOrchestrator {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        artifacts: Arc<dyn ArtifactStore>,
        interests: Arc<dyn InterestStore>,
        registry: Arc<dyn FieldRegistry>,
    ) -> Self {
        Self {
            profiles,
            artifacts,
            interests,
            registry,
            diagnostics: Arc::new(TracingDiagnostics),
            sweep_concurrency: EnrichmentSettings::default().sweep_concurrency,
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Upper bound on in-flight bookkeeping calls; 1 keeps them sequential.
    pub fn with_sweep_concurrency(mut self, limit: usize) -> Self {
        self.sweep_concurrency = limit.max(1);
        self
    }

    pub fn with_settings(self, settings: &EnrichmentSettings) -> Self {
        self.with_sweep_concurrency(settings.sweep_concurrency)
    }

    pub async fn apply(
        &self,
        actor_id: &str,
        mut request: ApplyRequest,
    ) -> Result<ApplyResult, ApplyError> {
        let proposal = self.resolve_proposal(&mut request).await?;
        dedup_ids(&mut request.approved_field_ids);
        dedup_ids(&mut request.approved_additional_data_ids);
        dedup_ids(&mut request.approved_interest_ids);
        let customer = self
            .profiles
            .get_customer(&proposal.customer_id)
            .await
            .map_err(|err| ApplyError::Store(format!("{err:#}")))?
            .ok_or_else(|| ApplyError::CustomerNotFound(proposal.customer_id.clone()))?;

        let mut errors = ErrorList::default();

        let fields = self.apply_fields(&customer, &proposal, &request).await;
        let fields_updated = fields.applied;
        let approved_field_ids = fields.resolved_ids;
        errors.extend(fields.errors);

        let additional = self.apply_additional_data(&proposal, &request).await;
        errors.extend(additional.errors);

        let interests = self.apply_interests(actor_id, &proposal, &request).await;
        let confirmed = interests.confirmed_ids.len();
        let rejected_interest_ids = interests.rejected_ids;
        let confirmed_interest_ids = interests.confirmed_ids;
        errors.extend(interests.errors);

        let note_created = if request.approved_note {
            let traceability = traceability(
                &proposal,
                &request,
                approved_field_ids,
                confirmed_interest_ids,
                rejected_interest_ids,
            );
            match self.create_note(&proposal, &request, traceability).await {
                Ok(()) => true,
                Err(message) => {
                    errors.push(message);
                    false
                }
            }
        } else {
            false
        };

        self.sweep_field_artifacts(&proposal, &request).await;

        let error_count = errors.len();
        let result = ApplyResult {
            success: errors.is_empty(),
            fields_updated,
            additional_data_added: additional.applied,
            interests_confirmed: (!proposal.interest_proposals.is_empty()).then_some(confirmed),
            note_created,
            errors: (!errors.is_empty()).then(|| errors.into_vec()),
        };
        info!(
            proposal = %proposal.proposal_id,
            customer = %proposal.customer_id,
            actor = actor_id,
            fields = result.fields_updated,
            additional_data = result.additional_data_added,
            interests = confirmed,
            note = result.note_created,
            errors = error_count,
            "applied proposal"
        );
        Ok(result)
    }

    async fn resolve_proposal(
        &self,
        request: &mut ApplyRequest,
    ) -> Result<ProfileUpdateProposal, ApplyError> {
        if request.proposal_id.trim().is_empty() {
            return Err(ApplyError::MalformedRequest(
                "proposalId must not be empty".into(),
            ));
        }
        if let Some(proposal) = request.proposal.take() {
            if proposal.proposal_id != request.proposal_id {
                return Err(ApplyError::ProposalMismatch {
                    requested: request.proposal_id.clone(),
                    carried: proposal.proposal_id,
                });
            }
            return Ok(proposal);
        }
        let pending = self
            .artifacts
            .pending_for_batch(&request.proposal_id)
            .await
            .map_err(|err| ApplyError::Store(format!("{err:#}")))?;
        let proposal = ProfileUpdateProposal::from_artifacts(&request.proposal_id, &pending)
            .ok_or_else(|| ApplyError::ProposalNotFound(request.proposal_id.clone()))?;
        debug!(
            proposal = %proposal.proposal_id,
            artifacts = pending.len(),
            "rebuilt proposal from pending artifacts"
        );
        Ok(proposal)
    }

    fn resolve_field(
        &self,
        proposal: &ProfileUpdateProposal,
        request: &ApplyRequest,
        id: &str,
    ) -> Result<(String, Value), String> {
        let update = proposal
            .field_update(id)
            .ok_or_else(|| format!("Field update {id} not found in proposal"))?;
        let raw = request.edited_values.get(id).unwrap_or(&update.proposed_value);
        let value = self
            .registry
            .validate(&update.field, raw)
            .into_result()
            .map_err(|reason| format!("Invalid value for {}: {reason}", update.label))?;
        Ok((update.field.clone(), value))
    }

    async fn apply_fields(
        &self,
        customer: &CustomerProfile,
        proposal: &ProfileUpdateProposal,
        request: &ApplyRequest,
    ) -> PhaseOutcome {
        let mut outcome = PhaseOutcome::default();
        let mut batch = Map::new();
        for id in &request.approved_field_ids {
            match self.resolve_field(proposal, request, id) {
                Ok((field, value)) => {
                    if let Some(definition) = self.registry.definition(&field) {
                        let before = customer
                            .value(&field)
                            .map(|current| definition.field_type.format(current))
                            .unwrap_or_default();
                        debug!(
                            field = %field,
                            from = %before,
                            to = %definition.field_type.format(&value),
                            "staging field update"
                        );
                    }
                    batch.insert(field, value);
                    outcome.resolved_ids.push(id.clone());
                }
                Err(message) => outcome.errors.push(message),
            }
        }
        if batch.is_empty() {
            return outcome;
        }
        let count = batch.len();
        match self.profiles.update_fields(&proposal.customer_id, batch).await {
            Ok(()) => outcome.applied = count,
            Err(err) => outcome
                .errors
                .push(format!("Failed to update profile fields: {err:#}")),
        }
        outcome
    }

    async fn apply_additional_data(
        &self,
        proposal: &ProfileUpdateProposal,
        request: &ApplyRequest,
    ) -> PhaseOutcome {
        let mut outcome = PhaseOutcome::default();
        let mut items = Vec::new();
        for id in &request.approved_additional_data_ids {
            let Some(item) = proposal.additional_item(id) else {
                outcome
                    .errors
                    .push(format!("Additional data {id} not found in proposal"));
                continue;
            };
            let value = request
                .edited_additional_data
                .get(id)
                .unwrap_or(&item.value)
                .trim();
            if value.is_empty() {
                outcome
                    .errors
                    .push(format!("Additional data {} has no value", item.label));
                continue;
            }
            outcome.resolved_ids.push(id.clone());
            items.push(AdditionalDataEntry {
                key: item.key.clone(),
                label: item.label.clone(),
                value: value.to_string(),
                category: item.category.clone(),
                source: item.source.clone(),
            });
        }
        if items.is_empty() {
            return outcome;
        }
        let count = items.len();
        match self
            .profiles
            .append_additional_data(&proposal.customer_id, items)
            .await
        {
            Ok(()) => outcome.applied = count,
            Err(err) => outcome
                .errors
                .push(format!("Failed to save additional data: {err:#}")),
        }
        outcome
    }

    async fn apply_interests(
        &self,
        actor_id: &str,
        proposal: &ProfileUpdateProposal,
        request: &ApplyRequest,
    ) -> InterestOutcome {
        let mut outcome = InterestOutcome::default();
        let sink = self.diagnostics.as_ref();

        for id in &request.approved_interest_ids {
            let Some(interest) = proposal.interest(id) else {
                outcome
                    .errors
                    .push(format!("Interest proposal {id} not found in proposal"));
                continue;
            };
            let Some(artifact_id) = interest.artifact_id.as_deref() else {
                outcome
                    .errors
                    .push(format!("Interest proposal {id} has no backing artifact"));
                continue;
            };
            let edits = request.edited_interests.get(id).filter(|e| !e.is_empty());
            match self
                .interests
                .create_from_artifact(artifact_id, actor_id, edits)
                .await
            {
                Ok(confirmed) => {
                    debug!(interest = %confirmed.id, artifact = artifact_id, "confirmed interest");
                    outcome.confirmed_ids.push(id.clone());
                    attempt(
                        sink,
                        "accept_interest_proposal",
                        artifact_id,
                        self.artifacts
                            .accept_interest_proposal(artifact_id, edits.cloned()),
                    )
                    .await;
                }
                Err(err) => outcome.errors.push(format!(
                    "Failed to confirm interest {}: {err:#}",
                    interest.label
                )),
            }
        }

        let accepted: HashSet<&str> = request
            .approved_interest_ids
            .iter()
            .map(String::as_str)
            .collect();
        let not_accepted: Vec<_> = proposal
            .interest_proposals
            .iter()
            .filter(|interest| !accepted.contains(interest.id.as_str()))
            .collect();
        outcome.rejected_ids = not_accepted.iter().map(|i| i.id.clone()).collect();

        let rejections: Vec<&str> = not_accepted
            .iter()
            .filter_map(|interest| interest.artifact_id.as_deref())
            .collect();
        let attempted = rejections.len();
        let rejected = stream::iter(rejections)
            .map(|artifact_id| {
                attempt(
                    sink,
                    "reject_interest_proposal",
                    artifact_id,
                    self.artifacts.reject_interest_proposal(artifact_id),
                )
            })
            .buffer_unordered(self.sweep_concurrency)
            .filter_map(|marked| async move { marked })
            .count()
            .await;
        if attempted > 0 {
            debug!(attempted, rejected, "rejected unconfirmed interest proposals");
        }
        outcome
    }

    async fn create_note(
        &self,
        proposal: &ProfileUpdateProposal,
        request: &ApplyRequest,
        traceability: NoteTraceability,
    ) -> Result<(), String> {
        let content = request
            .edited_note_content
            .as_deref()
            .unwrap_or(&proposal.note.content)
            .trim();
        if content.is_empty() {
            return Err("Note content is empty".to_string());
        }
        let note = NewNote {
            content: content.to_string(),
            source: proposal.note.source,
            tags: proposal.note.tags.clone(),
            traceability,
        };
        self.profiles
            .add_note(&proposal.customer_id, note)
            .await
            .map(|created| debug!(note = %created.id, "created interaction note"))
            .map_err(|err| format!("Failed to create note: {err:#}"))
    }

    /// Moves every artifact-backed field update to its terminal status,
    /// whatever happened to the field write itself.
    async fn sweep_field_artifacts(&self, proposal: &ProfileUpdateProposal, request: &ApplyRequest) {
        let approved: HashSet<&str> = request
            .approved_field_ids
            .iter()
            .map(String::as_str)
            .collect();
        let jobs: Vec<(&str, ArtifactTransition)> = proposal
            .field_updates
            .iter()
            .filter_map(|update| {
                let artifact_id = update.artifact_id.as_deref()?;
                let transition = if !approved.contains(update.id.as_str()) {
                    ArtifactTransition::Reject
                } else if let Some(value) = request.edited_values.get(&update.id) {
                    ArtifactTransition::AcceptWithEdit(value.clone())
                } else {
                    ArtifactTransition::Accept
                };
                Some((artifact_id, transition))
            })
            .collect();
        if jobs.is_empty() {
            return;
        }
        let attempted = jobs.len();
        let marked = stream::iter(jobs)
            .map(|(artifact_id, transition)| self.mark_field_artifact(artifact_id, transition))
            .buffer_unordered(self.sweep_concurrency)
            .filter_map(|marked| async move { marked })
            .count()
            .await;
        debug!(
            proposal = %proposal.proposal_id,
            attempted,
            marked,
            "swept field artifacts"
        );
    }

    async fn mark_field_artifact(
        &self,
        artifact_id: &str,
        transition: ArtifactTransition,
    ) -> Option<Artifact> {
        let sink = self.diagnostics.as_ref();
        match transition {
            ArtifactTransition::Accept => {
                attempt(
                    sink,
                    "accept_profile_edit",
                    artifact_id,
                    self.artifacts.accept_profile_edit(artifact_id),
                )
                .await
            }
            ArtifactTransition::AcceptWithEdit(value) => {
                attempt(
                    sink,
                    "accept_profile_edit_with_edit",
                    artifact_id,
                    self.artifacts.accept_profile_edit_with_edit(artifact_id, value),
                )
                .await
            }
            ArtifactTransition::Reject => {
                attempt(
                    sink,
                    "reject_profile_edit",
                    artifact_id,
                    self.artifacts.reject_profile_edit(artifact_id),
                )
                .await
            }
        }
    }
}

/// Keeps the first occurrence of every id.
fn dedup_ids(ids: &mut Vec<String>) {
    let mut seen = HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
}

/// Approved field ids are the ones that resolved against the proposal and
/// passed validation; rejected ids are the proposal's fields the RM did not
/// approve.
fn traceability(
    proposal: &ProfileUpdateProposal,
    request: &ApplyRequest,
    approved_field_ids: Vec<String>,
    confirmed_interest_ids: Vec<String>,
    rejected_interest_ids: Vec<String>,
) -> NoteTraceability {
    let approved: HashSet<&str> = request
        .approved_field_ids
        .iter()
        .map(String::as_str)
        .collect();
    NoteTraceability {
        proposal_id: proposal.proposal_id.clone(),
        approved_field_ids,
        rejected_field_ids: proposal
            .field_updates
            .iter()
            .filter(|update| !approved.contains(update.id.as_str()))
            .map(|update| update.id.clone())
            .collect(),
        confirmed_interest_ids,
        rejected_interest_ids,
    }
}
