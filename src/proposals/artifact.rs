//! Durable records backing individual suggestions.
//!
//! An artifact is created `pending` when a proposal is built and moves exactly
//! once to `accepted`, `edited` or `rejected` when the proposal is applied.
//! Replaying the same terminal outcome is a no-op; any other move out of a
//! terminal state is refused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::model::{InterestCategory, InterestEdits};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    Pending,
    Accepted,
    Edited,
    Rejected,
}

impl ArtifactStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ArtifactStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactStatus::Pending => "pending",
            ArtifactStatus::Accepted => "accepted",
            ArtifactStatus::Edited => "edited",
            ArtifactStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    ProfileEdit,
    InterestProposal,
}

impl ArtifactKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::ProfileEdit => "profile edit",
            ArtifactKind::InterestProposal => "interest proposal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArtifactPayload {
    #[serde(rename_all = "camelCase")]
    ProfileEdit {
        item_id: String,
        field: String,
        label: String,
        current_value: Option<Value>,
        proposed_value: Value,
        confidence: f32,
        source: String,
    },
    #[serde(rename_all = "camelCase")]
    InterestProposal {
        item_id: String,
        category: InterestCategory,
        label: String,
        description: Option<String>,
        source_text: String,
        confidence: f32,
    },
}

impl ArtifactPayload {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArtifactPayload::ProfileEdit { .. } => ArtifactKind::ProfileEdit,
            ArtifactPayload::InterestProposal { .. } => ArtifactKind::InterestProposal,
        }
    }

    /// Id of the proposal item this artifact backs.
    pub fn item_id(&self) -> &str {
        match self {
            ArtifactPayload::ProfileEdit { item_id, .. }
            | ArtifactPayload::InterestProposal { item_id, .. } => item_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    /// Proposal id of the batch the artifact was created with.
    pub batch_id: String,
    pub customer_id: String,
    /// Position inside the batch; keeps reconstruction in proposal order.
    pub position: usize,
    pub payload: ArtifactPayload,
    pub status: ArtifactStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_value: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactTransition {
    Accept,
    AcceptWithEdit(Value),
    Reject,
}

impl ArtifactTransition {
    pub fn target(&self) -> ArtifactStatus {
        match self {
            ArtifactTransition::Accept => ArtifactStatus::Accepted,
            ArtifactTransition::AcceptWithEdit(_) => ArtifactStatus::Edited,
            ArtifactTransition::Reject => ArtifactStatus::Rejected,
        }
    }

    /// Interest confirmations count as edited only when the RM changed something.
    pub fn for_interest(edits: Option<&InterestEdits>) -> Result<Self, ArtifactError> {
        match edits.filter(|e| !e.is_empty()) {
            None => Ok(ArtifactTransition::Accept),
            Some(edits) => serde_json::to_value(edits)
                .map(ArtifactTransition::AcceptWithEdit)
                .map_err(|err| ArtifactError::Payload(err.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied,
    /// The artifact already carried this exact terminal outcome.
    Replayed,
}

#[derive(Debug, Error, PartialEq)]
pub enum ArtifactError {
    #[error("artifact {0} not found")]
    NotFound(String),
    #[error("artifact {id} is already {}", .status.as_str())]
    AlreadyResolved { id: String, status: ArtifactStatus },
    #[error("artifact {id} has the wrong kind, expected {}", .expected.as_str())]
    WrongKind { id: String, expected: ArtifactKind },
    #[error("artifact payload error: {0}")]
    Payload(String),
}

impl Artifact {
    pub fn pending(
        batch_id: impl Into<String>,
        customer_id: impl Into<String>,
        position: usize,
        payload: ArtifactPayload,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            batch_id: batch_id.into(),
            customer_id: customer_id.into(),
            position,
            payload,
            status: ArtifactStatus::Pending,
            edited_value: None,
            created_at,
            updated_at: created_at,
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.payload.kind()
    }

    /// Moves the artifact to the transition's terminal status, checking that
    /// the caller is resolving the kind of artifact it thinks it is.
    pub fn resolve(
        &mut self,
        expected: ArtifactKind,
        transition: ArtifactTransition,
    ) -> Result<TransitionOutcome, ArtifactError> {
        if self.kind() != expected {
            return Err(ArtifactError::WrongKind {
                id: self.id.clone(),
                expected,
            });
        }
        let target = transition.target();
        let edited_value = match transition {
            ArtifactTransition::AcceptWithEdit(value) => Some(value),
            ArtifactTransition::Accept | ArtifactTransition::Reject => None,
        };
        if !self.status.is_terminal() {
            self.status = target;
            self.edited_value = edited_value;
            self.updated_at = Utc::now();
            return Ok(TransitionOutcome::Applied);
        }
        if self.status == target && self.edited_value == edited_value {
            return Ok(TransitionOutcome::Replayed);
        }
        Err(ArtifactError::AlreadyResolved {
            id: self.id.clone(),
            status: self.status,
        })
    }
}
