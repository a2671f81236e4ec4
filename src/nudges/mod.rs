//! Follow-up questions ("nudges") for important fields that are still empty.
//!
//! Flow: [`crate::profiles::score_empty_fields`] ranks the gaps,
//! [`NudgeSelector`] picks the few worth asking about, [`generate_nudges`]
//! phrases them (with a deterministic fallback), and [`fold_answers`] feeds the
//! RM's replies into the finalize extraction.

pub mod answers;
pub mod questions;
pub mod selector;

pub use answers::fold_answers;
pub use questions::{
    fallback_question, generate_nudges, NudgeAnswer, NudgeQuestion, QuestionContext,
    QuestionGenerator,
};
pub use selector::{selection_threshold, NudgeSelector};
