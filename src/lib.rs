//! Adaptive mastery and item-selection engine.
//!
//! Tracks a Beta-distributed mastery estimate per (learner, topic), updates
//! it from graded answers, and picks the next topic and difficulty to probe.

pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod mastery;
pub mod selection;
pub mod session;

pub use config::MasteryConfig;
pub use engine::MasteryEngine;
pub use error::{MasteryError, Result};
pub use mastery::{
    InMemoryMasteryStore, MasteryState, MasteryStore, Observation, RecentOutcome,
    TopicMasterySnapshot, TopicRef, UpdateOutcome,
};
pub use selection::{recommend, Difficulty, SelectionResult};
pub use session::{QuizSession, SessionReport, SessionSummary, StopReason};
