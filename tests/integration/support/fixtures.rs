use clientbase::profiles::CustomerProfile;
use clientbase::proposals::{
    ExtractedAdditionalData, ExtractedField, ExtractedInterest, InterestCategory,
    ProfileUpdateProposal, RawExtraction,
};
use serde_json::json;

pub const CUSTOMER_ID: &str = "cust-001";
pub const RM_ID: &str = "rm-042";
pub const RAW_CALL: &str = "Call with Dana. New email dana@new.example, mobile 555-0134. \
    Comfortable with moderate risk, earns about 185k. Has a lab called Juno. \
    Sails most weekends and wants to move some savings into ESG funds.";

/// Customer with a handful of personal and contact fields already known.
pub fn customer() -> CustomerProfile {
    let mut profile = CustomerProfile::new(CUSTOMER_ID)
        .with_field("full_name", json!("Dana Whitfield"))
        .with_field("email", json!("dana@old.example"))
        .with_field("occupation", json!("Architect"));
    profile.display_name = Some("Dana Whitfield".into());
    profile
}

/// Four schema fields, one unknown field, one non-schema datum, two interests.
pub fn call_extraction() -> RawExtraction {
    RawExtraction {
        fields: vec![
            ExtractedField::new("email", json!("dana@new.example"), 0.95, "New email dana@new.example"),
            ExtractedField::new("phone", json!("555-0134"), 0.9, "mobile 555-0134"),
            ExtractedField::new("risk_tolerance", json!("Moderate"), 0.7, "Comfortable with moderate risk"),
            ExtractedField::new("annual_income", json!(185000), 0.6, "earns about 185k"),
            ExtractedField::new("shoe_size", json!(9), 0.2, "n/a"),
        ],
        additional_data: vec![ExtractedAdditionalData {
            key: "pet".into(),
            label: "Pet".into(),
            value: "Labrador named Juno".into(),
            confidence: 0.8,
            source: "Has a lab called Juno".into(),
            category: Some("family".into()),
        }],
        summary: Some("Call with Dana: updated contact details, moderate risk appetite, ESG interest.".into()),
        tags: vec!["call".into(), "esg".into()],
        interests: vec![
            ExtractedInterest {
                category: InterestCategory::Personal,
                label: "Sailing".into(),
                description: None,
                source_text: "Sails most weekends".into(),
                confidence: 0.8,
            },
            ExtractedInterest {
                category: InterestCategory::Financial,
                label: "ESG funds".into(),
                description: Some("Wants to move savings into ESG funds".into()),
                source_text: "move some savings into ESG funds".into(),
                confidence: 0.75,
            },
        ],
    }
}

pub fn field_item(proposal: &ProfileUpdateProposal, field: &str) -> String {
    proposal
        .field_updates
        .iter()
        .find(|update| update.field == field)
        .map(|update| update.id.clone())
        .unwrap_or_else(|| panic!("proposal has no update for {field}"))
}

pub fn field_artifact(proposal: &ProfileUpdateProposal, field: &str) -> String {
    proposal
        .field_updates
        .iter()
        .find(|update| update.field == field)
        .and_then(|update| update.artifact_id.clone())
        .unwrap_or_else(|| panic!("update for {field} has no artifact"))
}

pub fn interest_item(proposal: &ProfileUpdateProposal, label: &str) -> String {
    proposal
        .interest_proposals
        .iter()
        .find(|interest| interest.label == label)
        .map(|interest| interest.id.clone())
        .unwrap_or_else(|| panic!("proposal has no interest {label}"))
}

pub fn interest_artifact(proposal: &ProfileUpdateProposal, label: &str) -> String {
    proposal
        .interest_proposals
        .iter()
        .find(|interest| interest.label == label)
        .and_then(|interest| interest.artifact_id.clone())
        .unwrap_or_else(|| panic!("interest {label} has no artifact"))
}
