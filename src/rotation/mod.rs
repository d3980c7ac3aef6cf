//! Seniority rotation engine
//!
//! Pure functions over plain records: list construction, the carry-over of
//! the call-out position between requests of a fiscal year, and "ask next"
//! resolution once an offer is answered. Loading and saving is left to
//! [`crate::repository::RequestStore`].

pub mod advance;
pub mod blocks;
pub mod builder;
pub mod carry_over;
pub mod fiscal;

pub use advance::{classify, hired_count, next_to_ask, EntryState};
pub use blocks::{BlockRules, SeniorityScoringRules};
pub use builder::{assemble, BlockRoster};
pub use carry_over::{setup_new_rotation, Continuation};
