//! Per-proposal review decisions held by the reviewing surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::apply::ApplyRequest;
use super::model::{InterestEdits, ProfileUpdateProposal};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// Accept/reject/edit map for one open proposal. Never mutates the proposal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    status: HashMap<String, ReviewStatus>,
    edited_values: HashMap<String, Value>,
}

impl ReviewState {
    pub fn new(proposal: &ProfileUpdateProposal) -> Self {
        Self {
            status: proposal
                .item_ids()
                .into_iter()
                .map(|id| (id.to_string(), ReviewStatus::Pending))
                .collect(),
            edited_values: HashMap::new(),
        }
    }

    pub fn accept(&mut self, id: &str) {
        self.status.insert(id.to_string(), ReviewStatus::Accepted);
    }

    pub fn reject(&mut self, id: &str) {
        self.status.insert(id.to_string(), ReviewStatus::Rejected);
    }

    /// Editing implies the RM wants the edited value saved.
    pub fn edit(&mut self, id: &str, value: Value) {
        self.edited_values.insert(id.to_string(), value);
        self.status.insert(id.to_string(), ReviewStatus::Accepted);
    }

    pub fn accept_all(&mut self) {
        for status in self.status.values_mut() {
            *status = ReviewStatus::Accepted;
        }
    }

    pub fn reject_all(&mut self) {
        for status in self.status.values_mut() {
            *status = ReviewStatus::Rejected;
        }
    }

    pub fn status_of(&self, id: &str) -> ReviewStatus {
        self.status.get(id).copied().unwrap_or_default()
    }

    pub fn edited_value(&self, id: &str) -> Option<&Value> {
        self.edited_values.get(id)
    }

    pub fn is_accepted(&self, id: &str) -> bool {
        self.status_of(id) == ReviewStatus::Accepted
    }

    /// Gate for invoking apply at all; the orchestrator does not check it.
    pub fn has_any_accepted(&self) -> bool {
        self.status.values().any(|status| *status == ReviewStatus::Accepted)
    }

    /// Wire request for the accepted items, in proposal order.
    pub fn to_apply_request(&self, proposal: &ProfileUpdateProposal) -> ApplyRequest {
        let accepted = |id: &String| self.is_accepted(id);
        let mut request = ApplyRequest::for_proposal(proposal);

        for update in proposal.field_updates.iter().filter(|u| accepted(&u.id)) {
            request.approved_field_ids.push(update.id.clone());
            if let Some(value) = self.edited_value(&update.id) {
                request.edited_values.insert(update.id.clone(), value.clone());
            }
        }
        for item in proposal.additional_data.iter().filter(|d| accepted(&d.id)) {
            request.approved_additional_data_ids.push(item.id.clone());
            if let Some(value) = self.edited_value(&item.id) {
                request
                    .edited_additional_data
                    .insert(item.id.clone(), value_as_text(value));
            }
        }
        for interest in proposal.interest_proposals.iter().filter(|i| accepted(&i.id)) {
            request.approved_interest_ids.push(interest.id.clone());
            if let Some(edits) = self.edited_value(&interest.id).and_then(interest_edits) {
                request.edited_interests.insert(interest.id.clone(), edits);
            }
        }
        request.approved_note = accepted(&proposal.note.id);
        if request.approved_note {
            request.edited_note_content = self.edited_value(&proposal.note.id).map(value_as_text);
        }
        request
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// A bare string edits the label; an object may carry label and description.
fn interest_edits(value: &Value) -> Option<InterestEdits> {
    let edits = match value {
        Value::String(label) => InterestEdits {
            label: Some(label.clone()),
            description: None,
        },
        Value::Object(_) => serde_json::from_value(value.clone()).ok()?,
        _ => return None,
    };
    (!edits.is_empty()).then_some(edits)
}
