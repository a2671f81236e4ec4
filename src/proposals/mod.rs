//! Profile update proposals: build, review, apply.

pub mod apply;
pub mod artifact;
pub mod builder;
pub mod diagnostics;
pub mod extraction;
pub mod model;
pub mod review;

pub use apply::{ApplyError, ApplyOrchestrator, ApplyRequest, ApplyResult, ErrorList, PhaseOutcome};
pub use artifact::{
    Artifact, ArtifactError, ArtifactKind, ArtifactPayload, ArtifactStatus, ArtifactTransition,
    TransitionOutcome,
};
pub use builder::{stage_proposal, truncate_note, BuiltProposal, ProposalBuilder};
pub use diagnostics::{
    attempt, CollectingDiagnostics, Diagnostic, DiagnosticsSink, TracingDiagnostics,
};
pub use extraction::{ExtractedAdditionalData, ExtractedField, ExtractedInterest, RawExtraction};
pub use model::{
    InterestCategory, InterestEdits, InterestProposal, ProfileUpdateProposal,
    ProposedAdditionalData, ProposedFieldUpdate, ProposedNote,
};
pub use review::{ReviewState, ReviewStatus};
