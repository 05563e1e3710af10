pub mod aggregator;
pub mod quiz;

pub use aggregator::{summarize, SessionSummary};
pub use quiz::{QuizSession, SessionReport, StopReason, TopicTally};
