//! Customer profile schema, snapshots and field importance scoring.
//!
//! Everything in this namespace is pure: no storage access, no clocks other
//! than note timestamps. The proposal and nudge pipelines build on it.

pub mod defaults;
pub mod fields;
pub mod model;
pub mod registry;
pub mod scoring;

pub use defaults::{default_registry, default_sections};
pub use fields::FieldType;
pub use model::{
    is_empty_value, AdditionalDataEntry, CustomerNote, CustomerProfile, FieldDefinition,
    FieldPriority, NewNote, NoteSource, NoteTraceability, SectionDefinition,
};
pub use registry::{FieldRegistry, FieldValidation, SchemaRegistry};
pub use scoring::{
    field_score, profile_completeness, score_empty_fields, FieldScore, ProfileCompleteness,
    SectionCompleteness,
};
