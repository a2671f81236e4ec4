pub mod config;
pub mod nudges;
pub mod profiles;
pub mod proposals;
pub mod storage;

// Re-export commonly used types for convenience.
pub use config::{AppConfig, EnrichmentSettings};
pub use profiles::{CustomerProfile, FieldRegistry, SchemaRegistry};
pub use proposals::{ApplyOrchestrator, ApplyRequest, ApplyResult, ProfileUpdateProposal, ReviewState};
