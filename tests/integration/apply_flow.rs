use anyhow::Result;
use clientbase::proposals::{ApplyError, ApplyRequest, ArtifactStatus, ReviewState};
use serde_json::json;

use crate::support::fixtures::{
    call_extraction, customer, field_artifact, field_item, interest_artifact, interest_item,
    CUSTOMER_ID, RAW_CALL, RM_ID,
};
use crate::IntegrationHarness;

async fn staged(harness: &IntegrationHarness) -> Result<clientbase::ProfileUpdateProposal> {
    harness.seed_customer(customer());
    harness.stage(CUSTOMER_ID, call_extraction(), RAW_CALL).await
}

#[tokio::test]
async fn unknown_field_id_is_reported_not_thrown() -> Result<()> {
    let harness = IntegrationHarness::new();
    let proposal = staged(&harness).await?;

    let mut request = ApplyRequest::for_proposal(&proposal);
    request.approved_field_ids = vec!["f1".into()];
    let result = harness.orchestrator().apply(RM_ID, request).await?;

    assert!(!result.success);
    assert_eq!(result.fields_updated, 0);
    assert_eq!(result.errors(), ["Field update f1 not found in proposal"]);
    assert_eq!(harness.profiles.log().calls("update_fields"), 0);
    // Nothing was accepted, so every field artifact ends up rejected.
    for update in &proposal.field_updates {
        let artifact = update.artifact_id.as_deref().unwrap();
        assert_eq!(
            harness.artifacts.status_of(artifact),
            Some(ArtifactStatus::Rejected)
        );
    }
    Ok(())
}

#[tokio::test]
async fn one_invalid_field_is_a_partial_success() -> Result<()> {
    let harness = IntegrationHarness::new();
    let proposal = staged(&harness).await?;
    let risk = field_item(&proposal, "risk_tolerance");

    let mut request = ApplyRequest::for_proposal(&proposal);
    request.approved_field_ids = vec![
        field_item(&proposal, "email"),
        field_item(&proposal, "phone"),
        risk.clone(),
    ];
    request.edited_values.insert(risk, json!("reckless"));
    let result = harness.orchestrator().apply(RM_ID, request).await?;

    assert!(!result.success);
    assert_eq!(result.fields_updated, 2);
    assert_eq!(result.errors().len(), 1);
    assert!(result.errors()[0].starts_with("Invalid value for risk tolerance"));
    assert_eq!(harness.profiles.log().calls("update_fields"), 1);

    let profile = harness.profiles.customer(CUSTOMER_ID).unwrap();
    assert_eq!(profile.fields["email"], json!("dana@new.example"));
    assert_eq!(profile.fields["phone"], json!("555-0134"));
    assert!(!profile.fields.contains_key("risk_tolerance"));

    // The sweep records the decision, not whether the write went through.
    assert_eq!(
        harness
            .artifacts
            .status_of(&field_artifact(&proposal, "risk_tolerance")),
        Some(ArtifactStatus::Edited)
    );
    assert_eq!(
        harness.artifacts.status_of(&field_artifact(&proposal, "email")),
        Some(ArtifactStatus::Accepted)
    );
    assert_eq!(
        harness
            .artifacts
            .status_of(&field_artifact(&proposal, "annual_income")),
        Some(ArtifactStatus::Rejected)
    );
    Ok(())
}

#[tokio::test]
async fn unaccepted_interests_are_rejected_through_their_artifacts() -> Result<()> {
    let harness = IntegrationHarness::new();
    let proposal = staged(&harness).await?;

    let mut request = ApplyRequest::for_proposal(&proposal);
    request.approved_additional_data_ids = vec![proposal.additional_data[0].id.clone()];
    let result = harness.orchestrator().apply(RM_ID, request).await?;

    assert!(result.success);
    assert_eq!(result.additional_data_added, 1);
    assert_eq!(result.interests_confirmed, Some(0));
    assert_eq!(harness.artifacts.log().calls("reject_interest_proposal"), 2);
    assert_eq!(harness.interests.log().calls("create_from_artifact"), 0);
    for label in ["Sailing", "ESG funds"] {
        assert_eq!(
            harness
                .artifacts
                .status_of(&interest_artifact(&proposal, label)),
            Some(ArtifactStatus::Rejected)
        );
    }
    Ok(())
}

#[tokio::test]
async fn full_review_leaves_an_audit_note() -> Result<()> {
    let harness = IntegrationHarness::new();
    let proposal = staged(&harness).await?;
    let income = field_item(&proposal, "annual_income");
    let sailing = interest_item(&proposal, "Sailing");

    let mut review = ReviewState::new(&proposal);
    review.accept_all();
    review.reject(&income);
    review.edit(&sailing, json!("Offshore sailing"));
    review.edit(&proposal.note.id, json!("Dana call: contact details, risk, ESG."));
    assert!(review.has_any_accepted());

    let result = harness
        .orchestrator()
        .apply(RM_ID, review.to_apply_request(&proposal))
        .await?;
    assert!(result.success, "unexpected errors: {:?}", result.errors);
    assert_eq!(result.fields_updated, 3);
    assert_eq!(result.additional_data_added, 1);
    assert_eq!(result.interests_confirmed, Some(2));
    assert!(result.note_created);
    assert!(harness.diagnostics.is_empty());

    let profile = harness.profiles.customer(CUSTOMER_ID).unwrap();
    assert_eq!(profile.fields["risk_tolerance"], json!("moderate"));
    assert_eq!(profile.additional_data[0].value, "Labrador named Juno");
    let note = profile.notes.last().unwrap();
    assert_eq!(note.content, "Dana call: contact details, risk, ESG.");
    assert_eq!(note.tags, vec!["call", "esg"]);
    let trace = note.traceability.as_ref().unwrap();
    assert_eq!(trace.proposal_id, proposal.proposal_id);
    assert_eq!(trace.approved_field_ids.len(), 3);
    assert_eq!(trace.rejected_field_ids, vec![income]);
    assert_eq!(trace.confirmed_interest_ids.len(), 2);
    assert!(trace.rejected_interest_ids.is_empty());

    let labels: Vec<_> = harness
        .interests
        .interests()
        .into_iter()
        .map(|interest| interest.label)
        .collect();
    assert!(labels.contains(&"Offshore sailing".to_string()));
    assert!(labels.contains(&"ESG funds".to_string()));
    assert_eq!(
        harness
            .artifacts
            .status_of(&interest_artifact(&proposal, "Sailing")),
        Some(ArtifactStatus::Edited)
    );
    assert_eq!(
        harness
            .artifacts
            .status_of(&interest_artifact(&proposal, "ESG funds")),
        Some(ArtifactStatus::Accepted)
    );
    Ok(())
}

#[tokio::test]
async fn bookkeeping_failures_stay_out_of_errors() -> Result<()> {
    let harness = IntegrationHarness::new();
    let proposal = staged(&harness).await?;
    harness.artifacts.log().fail("reject_profile_edit");
    harness.artifacts.log().fail("reject_interest_proposal");

    let mut request = ApplyRequest::for_proposal(&proposal);
    request.approved_field_ids = vec![field_item(&proposal, "email")];
    let result = harness
        .orchestrator()
        .with_sweep_concurrency(4)
        .apply(RM_ID, request)
        .await?;

    assert!(result.success);
    assert_eq!(result.fields_updated, 1);
    assert!(result.errors.is_none());
    // Three rejected field artifacts and two rejected interest artifacts.
    assert_eq!(harness.diagnostics.len(), 5);
    assert_eq!(harness.artifacts.log().calls("reject_profile_edit"), 3);
    assert_eq!(
        harness.artifacts.status_of(&field_artifact(&proposal, "email")),
        Some(ArtifactStatus::Accepted)
    );
    Ok(())
}

#[tokio::test]
async fn primary_store_failure_does_not_stop_later_phases() -> Result<()> {
    let harness = IntegrationHarness::new();
    let proposal = staged(&harness).await?;
    harness.profiles.log().fail("update_fields");

    let mut request = ApplyRequest::for_proposal(&proposal);
    request.approved_field_ids = vec![field_item(&proposal, "email")];
    request.approved_note = true;
    let result = harness.orchestrator().apply(RM_ID, request).await?;

    assert!(!result.success);
    assert_eq!(result.fields_updated, 0);
    assert!(result.note_created);
    assert_eq!(result.errors().len(), 1);
    assert!(result.errors()[0].starts_with("Failed to update profile fields"));
    assert_eq!(
        harness.artifacts.status_of(&field_artifact(&proposal, "email")),
        Some(ArtifactStatus::Accepted)
    );
    Ok(())
}

#[tokio::test]
async fn retried_apply_confirms_each_interest_once() -> Result<()> {
    let harness = IntegrationHarness::new();
    let proposal = staged(&harness).await?;

    let mut request = ApplyRequest::for_proposal(&proposal);
    request.approved_field_ids = vec![field_item(&proposal, "phone")];
    request.approved_interest_ids = vec![interest_item(&proposal, "ESG funds")];
    let orchestrator = harness.orchestrator();
    let first = orchestrator.apply(RM_ID, request.clone()).await?;
    let second = orchestrator.apply(RM_ID, request).await?;

    assert!(first.success);
    assert!(second.success, "retry failed: {:?}", second.errors);
    assert_eq!(second.interests_confirmed, Some(1));
    assert_eq!(harness.interests.interests().len(), 1);
    assert_eq!(harness.interests.log().calls("create_from_artifact"), 2);
    assert!(harness.diagnostics.is_empty());
    Ok(())
}

#[tokio::test]
async fn structural_problems_are_hard_errors() -> Result<()> {
    let harness = IntegrationHarness::new();
    let proposal = staged(&harness).await?;
    let orchestrator = harness.orchestrator();

    let mut orphan = proposal.clone();
    orphan.customer_id = "ghost".into();
    let err = orchestrator
        .apply(RM_ID, ApplyRequest::for_proposal(&orphan))
        .await
        .unwrap_err();
    assert_eq!(err, ApplyError::CustomerNotFound("ghost".into()));

    let mut mismatched = ApplyRequest::for_proposal(&proposal);
    mismatched.proposal_id = "another".into();
    let err = orchestrator.apply(RM_ID, mismatched).await.unwrap_err();
    assert!(matches!(err, ApplyError::ProposalMismatch { .. }));

    let unknown = ApplyRequest {
        proposal_id: "never-staged".into(),
        ..ApplyRequest::default()
    };
    let err = orchestrator.apply(RM_ID, unknown).await.unwrap_err();
    assert_eq!(err, ApplyError::ProposalNotFound("never-staged".into()));

    let err = ApplyRequest::from_json(b"[1, 2]").unwrap_err();
    assert!(matches!(err, ApplyError::MalformedRequest(_)));
    Ok(())
}

#[tokio::test]
async fn proposal_is_rebuilt_from_pending_artifacts() -> Result<()> {
    let harness = IntegrationHarness::new();
    let proposal = staged(&harness).await?;

    let body = json!({
        "proposalId": &proposal.proposal_id,
        "approvedFieldIds": [field_item(&proposal, "email"), field_item(&proposal, "annual_income")],
        "approvedInterestIds": [interest_item(&proposal, "Sailing")],
        "approvedNote": true
    });
    let request = ApplyRequest::from_json(&serde_json::to_vec(&body)?)?;
    let result = harness.orchestrator().apply(RM_ID, request).await?;

    assert_eq!(result.fields_updated, 2);
    assert_eq!(result.interests_confirmed, Some(1));
    // Note content is not kept in the ledger.
    assert!(!result.note_created);
    assert_eq!(result.errors(), ["Note content is empty"]);
    let profile = harness.profiles.customer(CUSTOMER_ID).unwrap();
    assert_eq!(profile.fields["annual_income"], json!(185000));

    let again = ApplyRequest {
        proposal_id: proposal.proposal_id.clone(),
        ..ApplyRequest::default()
    };
    let err = harness.orchestrator().apply(RM_ID, again).await.unwrap_err();
    assert!(matches!(err, ApplyError::ProposalNotFound(_)));
    Ok(())
}

#[tokio::test]
async fn interest_rejected_earlier_is_not_confirmed_later() -> Result<()> {
    let harness = IntegrationHarness::new();
    let proposal = staged(&harness).await?;
    let orchestrator = harness.orchestrator();

    let first = orchestrator
        .apply(RM_ID, ApplyRequest::for_proposal(&proposal))
        .await?;
    assert!(first.success);
    let sailing_artifact = interest_artifact(&proposal, "Sailing");
    assert_eq!(
        harness.artifacts.status_of(&sailing_artifact),
        Some(ArtifactStatus::Rejected)
    );

    let mut request = ApplyRequest::for_proposal(&proposal);
    request.approved_interest_ids = vec![interest_item(&proposal, "Sailing")];
    let second = orchestrator.apply(RM_ID, request).await?;

    assert!(!second.success);
    assert_eq!(second.interests_confirmed, Some(0));
    assert_eq!(
        second.errors(),
        [format!(
            "Failed to confirm interest Sailing: artifact {sailing_artifact} is already rejected"
        )]
    );
    assert!(harness.interests.interests().is_empty());
    assert_eq!(harness.artifacts.log().calls("accept_interest_proposal"), 0);
    assert_eq!(
        harness.artifacts.status_of(&sailing_artifact),
        Some(ArtifactStatus::Rejected)
    );
    Ok(())
}

#[tokio::test]
async fn repeated_approvals_count_once() -> Result<()> {
    let harness = IntegrationHarness::new();
    let proposal = staged(&harness).await?;
    let email = field_item(&proposal, "email");
    let pet = proposal.additional_data[0].id.clone();
    let esg = interest_item(&proposal, "ESG funds");

    let mut request = ApplyRequest::for_proposal(&proposal);
    request.approved_field_ids = vec![email.clone(), email];
    request.approved_additional_data_ids = vec![pet.clone(), pet];
    request.approved_interest_ids = vec![esg.clone(), esg];
    let result = harness.orchestrator().apply(RM_ID, request).await?;

    assert!(result.success, "unexpected errors: {:?}", result.errors);
    assert_eq!(result.fields_updated, 1);
    assert_eq!(result.additional_data_added, 1);
    assert_eq!(result.interests_confirmed, Some(1));
    assert_eq!(harness.interests.interests().len(), 1);
    assert_eq!(harness.interests.log().calls("create_from_artifact"), 1);
    assert_eq!(harness.artifacts.log().calls("accept_interest_proposal"), 1);
    let profile = harness.profiles.customer(CUSTOMER_ID).unwrap();
    assert_eq!(profile.additional_data.len(), 1);
    Ok(())
}

#[tokio::test]
async fn audit_note_lists_only_fields_that_resolved() -> Result<()> {
    let harness = IntegrationHarness::new();
    let proposal = staged(&harness).await?;
    let email = field_item(&proposal, "email");
    let risk = field_item(&proposal, "risk_tolerance");

    let mut request = ApplyRequest::for_proposal(&proposal);
    request.approved_field_ids = vec!["f1".into(), email.clone(), risk.clone()];
    request.edited_values.insert(risk, json!("reckless"));
    request.approved_note = true;
    let result = harness.orchestrator().apply(RM_ID, request).await?;

    assert!(!result.success);
    assert_eq!(result.fields_updated, 1);
    assert!(result.note_created);
    assert_eq!(result.errors().len(), 2);

    let profile = harness.profiles.customer(CUSTOMER_ID).unwrap();
    let trace = profile.notes.last().unwrap().traceability.as_ref().unwrap();
    assert_eq!(trace.approved_field_ids, vec![email]);
    assert_eq!(
        trace.rejected_field_ids,
        vec![
            field_item(&proposal, "phone"),
            field_item(&proposal, "annual_income")
        ]
    );
    Ok(())
}
