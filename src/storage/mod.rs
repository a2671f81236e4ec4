//! Storage collaborators consumed by the enrichment pipeline.
//!
//! The pipeline only ever talks to these traits. [`memory`] holds in-process
//! implementations; [`artifacts::FileArtifactStore`] keeps the artifact ledger
//! on disk.

pub mod artifacts;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::profiles::{AdditionalDataEntry, CustomerNote, CustomerProfile, NewNote};
use crate::proposals::{Artifact, InterestCategory, InterestEdits};

pub use artifacts::FileArtifactStore;
pub use memory::{InMemoryArtifactStore, InMemoryInterestStore, InMemoryProfileStore};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_customer(&self, customer_id: &str) -> Result<Option<CustomerProfile>>;

    /// One batched write for every validated field of an apply.
    async fn update_fields(&self, customer_id: &str, fields: Map<String, Value>) -> Result<()>;

    /// Merge by key: incoming entries replace existing entries with the same
    /// key, every other existing entry is kept.
    async fn append_additional_data(
        &self,
        customer_id: &str,
        items: Vec<AdditionalDataEntry>,
    ) -> Result<()>;

    async fn add_note(&self, customer_id: &str, note: NewNote) -> Result<CustomerNote>;
}

#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn record_pending(&self, artifacts: &[Artifact]) -> Result<()>;

    async fn get(&self, artifact_id: &str) -> Result<Option<Artifact>>;

    async fn accept_profile_edit(&self, artifact_id: &str) -> Result<Artifact>;

    async fn accept_profile_edit_with_edit(&self, artifact_id: &str, value: Value)
        -> Result<Artifact>;

    async fn reject_profile_edit(&self, artifact_id: &str) -> Result<Artifact>;

    async fn accept_interest_proposal(
        &self,
        artifact_id: &str,
        edits: Option<InterestEdits>,
    ) -> Result<Artifact>;

    async fn reject_interest_proposal(&self, artifact_id: &str) -> Result<Artifact>;

    /// Pending artifacts of one batch, in batch order.
    async fn pending_for_batch(&self, batch_id: &str) -> Result<Vec<Artifact>>;
}

/// Interest the RM confirmed from an interest proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedInterest {
    pub id: String,
    pub customer_id: String,
    pub artifact_id: String,
    pub category: InterestCategory,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub confirmed_by: String,
    pub confirmed_at: DateTime<Utc>,
}

#[async_trait]
pub trait InterestStore: Send + Sync {
    /// Exactly once per artifact: a repeated call returns the interest created
    /// by the first one. An artifact that was already rejected is refused.
    async fn create_from_artifact(
        &self,
        artifact_id: &str,
        actor_id: &str,
        edits: Option<&InterestEdits>,
    ) -> Result<ConfirmedInterest>;
}
