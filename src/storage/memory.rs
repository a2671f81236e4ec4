//! In-process stores. They back the integration harness and local tooling.
//!
//! Every store counts calls per operation and can be told to fail a given
//! operation, which is how partial-failure behaviour gets exercised.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use super::{ArtifactStore, ConfirmedInterest, InterestStore, ProfileStore};
use crate::profiles::{AdditionalDataEntry, CustomerNote, CustomerProfile, NewNote};
use crate::proposals::{
    Artifact, ArtifactError, ArtifactKind, ArtifactPayload, ArtifactStatus, ArtifactTransition,
    InterestEdits,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Call counters plus injected failures, keyed by operation name.
#[derive(Debug, Default)]
pub struct CallLog {
    calls: Mutex<HashMap<&'static str, usize>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl CallLog {
    pub fn calls(&self, operation: &str) -> usize {
        lock(&self.calls).get(operation).copied().unwrap_or(0)
    }

    pub fn fail(&self, operation: &'static str) {
        lock(&self.failing).insert(operation);
    }

    pub fn recover(&self, operation: &str) {
        lock(&self.failing).remove(operation);
    }

    fn record(&self, operation: &'static str) -> Result<()> {
        *lock(&self.calls).entry(operation).or_insert(0) += 1;
        if lock(&self.failing).contains(operation) {
            bail!("{operation} is unavailable");
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    customers: Mutex<HashMap<String, CustomerProfile>>,
    log: CallLog,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customer(self, profile: CustomerProfile) -> Self {
        self.insert(profile);
        self
    }

    pub fn insert(&self, profile: CustomerProfile) {
        lock(&self.customers).insert(profile.id.clone(), profile);
    }

    pub fn customer(&self, customer_id: &str) -> Option<CustomerProfile> {
        lock(&self.customers).get(customer_id).cloned()
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    fn with_customer_mut<T>(
        &self,
        customer_id: &str,
        update: impl FnOnce(&mut CustomerProfile) -> T,
    ) -> Result<T> {
        let mut customers = lock(&self.customers);
        let profile = customers
            .get_mut(customer_id)
            .ok_or_else(|| anyhow!("Customer {customer_id} not found"))?;
        Ok(update(profile))
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_customer(&self, customer_id: &str) -> Result<Option<CustomerProfile>> {
        self.log.record("get_customer")?;
        Ok(self.customer(customer_id))
    }

    async fn update_fields(&self, customer_id: &str, fields: Map<String, Value>) -> Result<()> {
        self.log.record("update_fields")?;
        self.with_customer_mut(customer_id, |profile| profile.fields.extend(fields))
    }

    async fn append_additional_data(
        &self,
        customer_id: &str,
        items: Vec<AdditionalDataEntry>,
    ) -> Result<()> {
        self.log.record("append_additional_data")?;
        self.with_customer_mut(customer_id, |profile| {
            for item in items {
                match profile
                    .additional_data
                    .iter_mut()
                    .find(|existing| existing.key == item.key)
                {
                    Some(existing) => *existing = item,
                    None => profile.additional_data.push(item),
                }
            }
        })
    }

    async fn add_note(&self, customer_id: &str, note: NewNote) -> Result<CustomerNote> {
        self.log.record("add_note")?;
        let created = CustomerNote {
            id: Uuid::new_v4().to_string(),
            content: note.content,
            source: note.source,
            tags: note.tags,
            traceability: Some(note.traceability),
            created_at: Utc::now(),
        };
        self.with_customer_mut(customer_id, |profile| profile.notes.push(created.clone()))?;
        Ok(created)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    artifacts: Mutex<HashMap<String, Artifact>>,
    log: CallLog,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    pub fn status_of(&self, artifact_id: &str) -> Option<ArtifactStatus> {
        lock(&self.artifacts).get(artifact_id).map(|a| a.status)
    }

    fn transition(
        &self,
        operation: &'static str,
        artifact_id: &str,
        kind: ArtifactKind,
        transition: ArtifactTransition,
    ) -> Result<Artifact> {
        self.log.record(operation)?;
        let mut artifacts = lock(&self.artifacts);
        let artifact = artifacts
            .get_mut(artifact_id)
            .ok_or_else(|| ArtifactError::NotFound(artifact_id.to_string()))?;
        artifact.resolve(kind, transition)?;
        Ok(artifact.clone())
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn record_pending(&self, artifacts: &[Artifact]) -> Result<()> {
        self.log.record("record_pending")?;
        let mut stored = lock(&self.artifacts);
        for artifact in artifacts {
            stored
                .entry(artifact.id.clone())
                .or_insert_with(|| artifact.clone());
        }
        Ok(())
    }

    async fn get(&self, artifact_id: &str) -> Result<Option<Artifact>> {
        self.log.record("get")?;
        Ok(lock(&self.artifacts).get(artifact_id).cloned())
    }

    async fn accept_profile_edit(&self, artifact_id: &str) -> Result<Artifact> {
        self.transition(
            "accept_profile_edit",
            artifact_id,
            ArtifactKind::ProfileEdit,
            ArtifactTransition::Accept,
        )
    }

    async fn accept_profile_edit_with_edit(
        &self,
        artifact_id: &str,
        value: Value,
    ) -> Result<Artifact> {
        self.transition(
            "accept_profile_edit_with_edit",
            artifact_id,
            ArtifactKind::ProfileEdit,
            ArtifactTransition::AcceptWithEdit(value),
        )
    }

    async fn reject_profile_edit(&self, artifact_id: &str) -> Result<Artifact> {
        self.transition(
            "reject_profile_edit",
            artifact_id,
            ArtifactKind::ProfileEdit,
            ArtifactTransition::Reject,
        )
    }

    async fn accept_interest_proposal(
        &self,
        artifact_id: &str,
        edits: Option<InterestEdits>,
    ) -> Result<Artifact> {
        let transition = ArtifactTransition::for_interest(edits.as_ref())?;
        self.transition(
            "accept_interest_proposal",
            artifact_id,
            ArtifactKind::InterestProposal,
            transition,
        )
    }

    async fn reject_interest_proposal(&self, artifact_id: &str) -> Result<Artifact> {
        self.transition(
            "reject_interest_proposal",
            artifact_id,
            ArtifactKind::InterestProposal,
            ArtifactTransition::Reject,
        )
    }

    async fn pending_for_batch(&self, batch_id: &str) -> Result<Vec<Artifact>> {
        self.log.record("pending_for_batch")?;
        let mut pending: Vec<Artifact> = lock(&self.artifacts)
            .values()
            .filter(|a| a.batch_id == batch_id && !a.status.is_terminal())
            .cloned()
            .collect();
        pending.sort_by_key(|a| a.position);
        Ok(pending)
    }
}

/// Confirmed interests keyed by the artifact they were created from.
pub struct InMemoryInterestStore {
    artifacts: Arc<dyn ArtifactStore>,
    by_artifact: Mutex<HashMap<String, ConfirmedInterest>>,
    log: CallLog,
}

impl InMemoryInterestStore {
    pub fn new(artifacts: Arc<dyn ArtifactStore>) -> Self {
        Self {
            artifacts,
            by_artifact: Mutex::new(HashMap::new()),
            log: CallLog::default(),
        }
    }

    pub fn log(&self) -> &CallLog {
        &self.log
    }

    pub fn interests(&self) -> Vec<ConfirmedInterest> {
        let mut interests: Vec<_> = lock(&self.by_artifact).values().cloned().collect();
        interests.sort_by_key(|interest| interest.confirmed_at);
        interests
    }
}

#[async_trait]
impl InterestStore for InMemoryInterestStore {
    async fn create_from_artifact(
        &self,
        artifact_id: &str,
        actor_id: &str,
        edits: Option<&InterestEdits>,
    ) -> Result<ConfirmedInterest> {
        self.log.record("create_from_artifact")?;
        let existing = lock(&self.by_artifact).get(artifact_id).cloned();
        if let Some(existing) = existing {
            debug!(artifact = artifact_id, interest = %existing.id, "interest already confirmed");
            return Ok(existing);
        }
        let artifact = self
            .artifacts
            .get(artifact_id)
            .await?
            .ok_or_else(|| ArtifactError::NotFound(artifact_id.to_string()))?;
        if artifact.status == ArtifactStatus::Rejected {
            return Err(ArtifactError::AlreadyResolved {
                id: artifact.id,
                status: artifact.status,
            }
            .into());
        }
        let ArtifactPayload::InterestProposal {
            category,
            label,
            description,
            ..
        } = artifact.payload
        else {
            return Err(ArtifactError::WrongKind {
                id: artifact.id,
                expected: ArtifactKind::InterestProposal,
            }
            .into());
        };
        let edits = edits.cloned().unwrap_or_default();
        let interest = ConfirmedInterest {
            id: Uuid::new_v4().to_string(),
            customer_id: artifact.customer_id,
            artifact_id: artifact_id.to_string(),
            category,
            label: edits.label.unwrap_or(label),
            description: edits.description.or(description),
            confirmed_by: actor_id.to_string(),
            confirmed_at: Utc::now(),
        };
        // A concurrent call may have won while the artifact was being read.
        Ok(lock(&self.by_artifact)
            .entry(artifact_id.to_string())
            .or_insert(interest)
            .clone())
    }
}
