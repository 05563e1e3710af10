//! Mastery layer - per (learner, topic) Beta state and its update law
//!
//! Contains:
//! - MasteryState / TopicMasterySnapshot - parameters and derived statistics
//! - MasteryStore - validated storage with compare-and-swap writes
//! - Updater - Beta-Binomial posterior update

pub mod state;
pub mod store;
pub mod updater;

pub use state::{
    confidence_for, MasteryState, Observation, RecentOutcome, TopicMasterySnapshot, TopicRef,
    PRIOR_PARAM,
};
pub use store::{InMemoryMasteryStore, MasteryStore};
pub use updater::{update, update_one, UpdateOutcome};
