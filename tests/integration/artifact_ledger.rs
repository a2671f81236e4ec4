use anyhow::Result;
use clientbase::profiles::NoteSource;
use clientbase::proposals::{
    stage_proposal, ApplyOrchestrator, ApplyRequest, ArtifactStatus, CollectingDiagnostics,
    ProposalBuilder,
};
use clientbase::storage::{ArtifactStore, FileArtifactStore, InMemoryInterestStore};
use std::sync::Arc;

use crate::support::fixtures::{
    call_extraction, customer, field_item, interest_item, CUSTOMER_ID, RAW_CALL, RM_ID,
};
use crate::IntegrationHarness;

#[tokio::test]
async fn file_ledger_records_decisions_and_tolerates_replays() -> Result<()> {
    let harness = IntegrationHarness::new();
    harness.seed_customer(customer());
    let ledger = Arc::new(FileArtifactStore::open(
        harness.workspace_path().join("artifacts"),
    )?);
    let interests = Arc::new(InMemoryInterestStore::new(ledger.clone()));
    let diagnostics = Arc::new(CollectingDiagnostics::new());
    let orchestrator = ApplyOrchestrator::new(
        harness.profiles.clone(),
        ledger.clone(),
        interests.clone(),
        harness.registry.clone(),
    )
    .with_diagnostics(diagnostics.clone());

    let built = ProposalBuilder::new(harness.registry.as_ref()).build(
        &customer(),
        call_extraction(),
        RAW_CALL,
        NoteSource::Typed,
    );
    let proposal = stage_proposal(ledger.as_ref(), built).await?;
    assert_eq!(ledger.list_all()?.len(), 6);

    let mut request = ApplyRequest::for_proposal(&proposal);
    request.approved_field_ids = vec![field_item(&proposal, "email")];
    request.approved_interest_ids = vec![interest_item(&proposal, "ESG funds")];
    let first = orchestrator.apply(RM_ID, request.clone()).await?;
    assert!(first.success);

    let statuses: Vec<ArtifactStatus> = ledger.list_all()?.iter().map(|a| a.status).collect();
    assert_eq!(
        statuses,
        vec![
            ArtifactStatus::Accepted,
            ArtifactStatus::Rejected,
            ArtifactStatus::Rejected,
            ArtifactStatus::Rejected,
            ArtifactStatus::Rejected,
            ArtifactStatus::Accepted,
        ]
    );

    // Same decisions again: every transition is a replay.
    let replay = orchestrator.apply(RM_ID, request).await?;
    assert!(replay.success);
    assert!(diagnostics.is_empty());
    assert_eq!(interests.interests().len(), 1);

    // Contradicting decisions are refused per artifact and only diagnosed.
    let reversal = orchestrator
        .apply(RM_ID, ApplyRequest::for_proposal(&proposal))
        .await?;
    assert!(reversal.success);
    let refused = diagnostics.entries();
    let operations: Vec<_> = refused.iter().map(|d| d.operation).collect();
    assert_eq!(operations, vec!["reject_interest_proposal", "reject_profile_edit"]);
    assert!(refused.iter().all(|d| d.message.contains("already accepted")));
    let email = ledger
        .get(proposal.field_updates[0].artifact_id.as_deref().unwrap())
        .await?
        .unwrap();
    assert_eq!(email.status, ArtifactStatus::Accepted);

    let profile = harness.profiles.customer(CUSTOMER_ID).unwrap();
    assert_eq!(profile.fields["email"], "dana@new.example");
    Ok(())
}
