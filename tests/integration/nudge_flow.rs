use anyhow::Result;
use clientbase::nudges::{fold_answers, generate_nudges, NudgeAnswer, NudgeSelector, QuestionContext};
use clientbase::profiles::{profile_completeness, score_empty_fields, CustomerProfile};

use crate::support::fixtures::{call_extraction, customer, CUSTOMER_ID, RAW_CALL};
use crate::IntegrationHarness;

#[test]
fn nudges_skip_what_the_call_already_captured() {
    let harness = IntegrationHarness::new();
    let profile = customer();
    let extraction = call_extraction();
    let extracted = extraction.field_keys();

    let scored = score_empty_fields(&profile, harness.registry.sections());
    let selector = NudgeSelector::default();
    let selected = selector.select(&scored, &extracted, harness.registry.as_ref());

    assert_eq!(selected.len(), selector.quota(scored.len()));
    assert!(selected.len() <= 10);
    assert!(selected.iter().all(|field| !extracted.contains(&field.field_key)));
    // The call touched contact and financial details, so those come first.
    assert!(matches!(selected[0].section.as_str(), "contact" | "financial"));
}

#[test]
fn scoring_is_stable_across_calls() {
    let harness = IntegrationHarness::new();
    let profile = customer();
    let first = score_empty_fields(&profile, harness.registry.sections());
    let second = score_empty_fields(&profile, harness.registry.sections());
    assert_eq!(first, second);

    let completeness = profile_completeness(&profile, harness.registry.sections());
    assert_eq!(completeness.filled, 3);
    assert!(completeness.percent > 0.0 && completeness.percent < 100.0);
}

#[test]
fn blank_profile_asks_about_a_fifth_of_the_schema() {
    let harness = IntegrationHarness::new();
    let blank = CustomerProfile::new("blank");
    let scored = score_empty_fields(&blank, harness.registry.sections());
    let total: usize = harness
        .registry
        .sections()
        .iter()
        .map(|section| section.fields.len())
        .sum();
    assert_eq!(scored.len(), total);
    let selected =
        NudgeSelector::default().select(&scored, &Default::default(), harness.registry.as_ref());
    assert_eq!(selected.len(), (total as f64 * 0.2).ceil() as usize);
}

#[tokio::test]
async fn answered_nudges_reach_the_proposal() -> Result<()> {
    let harness = IntegrationHarness::new();
    harness.seed_customer(customer());
    let profile = customer();
    let extraction = call_extraction();

    let scored = score_empty_fields(&profile, harness.registry.sections());
    let selected =
        NudgeSelector::default().select(&scored, &extraction.field_keys(), harness.registry.as_ref());
    let context = QuestionContext::for_profile(&profile, harness.registry.sections());
    let questions = generate_nudges(None, &selected, &context, harness.registry.as_ref()).await;
    assert_eq!(questions.len(), selected.len());

    let answers = vec![
        NudgeAnswer::answered(&questions[0], "Sunday evenings"),
        NudgeAnswer::skipped(&questions[1]),
    ];
    let extraction = fold_answers(extraction, &answers);
    let proposal = harness.stage(CUSTOMER_ID, extraction, RAW_CALL).await?;

    let answered = proposal
        .field_updates
        .iter()
        .find(|update| update.field == questions[0].field_key)
        .expect("answered nudge should become a field update");
    assert_eq!(answered.confidence, 1.0);
    assert_eq!(answered.source, "RM answer: Sunday evenings");
    assert!(proposal
        .field_updates
        .iter()
        .all(|update| update.field != questions[1].field_key));
    Ok(())
}
