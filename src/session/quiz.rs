//! Quiz session driver
//!
//! Runs the probe loop: ask the selector for (topic, difficulty), let the
//! caller fetch and grade a question, feed the outcome back, repeat until the
//! session length is reached or every topic is mastered.
//!
//! Selection works from the snapshots taken at session start with every
//! in-session answer folded on top, so the loop reacts to answers without
//! re-reading the store between questions.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::aggregator::SessionSummary;
use crate::engine::MasteryEngine;
use crate::error::{MasteryError, Result};
use crate::mastery::{
    MasteryStore, Observation, RecentOutcome, TopicMasterySnapshot, TopicRef, UpdateOutcome,
};
use crate::selection::{select_next, SelectionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    SessionLength,
    MasteryReached,
    EndedByCaller,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicTally {
    pub attempts: u32,
    pub correct: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub learner_id: String,
    pub questions_asked: u32,
    pub correct_answers: u32,
    pub accuracy: f64,
    pub stop_reason: StopReason,
    pub per_topic: BTreeMap<String, TopicTally>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_answer_at: Option<DateTime<Utc>>,
    pub summary: SessionSummary,
}

pub struct QuizSession<'a, S: MasteryStore> {
    engine: &'a MasteryEngine<S>,
    learner_id: String,
    topics: Vec<TopicRef>,
    baseline: Vec<TopicMasterySnapshot>,
    recent: Vec<RecentOutcome>,
    probabilities: HashMap<String, f64>,
    tallies: BTreeMap<String, TopicTally>,
    pending: Option<SelectionResult>,
    stop_reason: Option<StopReason>,
    asked: u32,
    correct: u32,
    started_at: DateTime<Utc>,
    last_answer_at: Option<DateTime<Utc>>,
}

impl<'a, S: MasteryStore> QuizSession<'a, S> {
    pub(crate) fn start(
        engine: &'a MasteryEngine<S>,
        learner_id: String,
        topics: Vec<TopicRef>,
    ) -> Result<Self> {
        if topics.is_empty() {
            return Err(MasteryError::NoTopicsAvailable);
        }
        let baseline = engine.snapshots(&learner_id, &topics)?;
        let probabilities = baseline
            .iter()
            .map(|s| (s.topic_id.clone(), s.mastery_probability))
            .collect();

        tracing::debug!(
            learner_id = %learner_id,
            topics = topics.len(),
            "Quiz session started"
        );

        let mut session = Self {
            engine,
            learner_id,
            topics,
            baseline,
            recent: Vec::new(),
            probabilities,
            tallies: BTreeMap::new(),
            pending: None,
            stop_reason: None,
            asked: 0,
            correct: 0,
            started_at: Utc::now(),
            last_answer_at: None,
        };
        // A learner who already masters every topic gets no questions.
        session.stop_reason = session.check_stop();
        Ok(session)
    }

    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    pub fn questions_asked(&self) -> u32 {
        self.asked
    }

    pub fn recent_outcomes(&self) -> &[RecentOutcome] {
        &self.recent
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    pub fn is_finished(&self) -> bool {
        self.stop_reason.is_some()
    }

    /// The outstanding probe, selecting one if none is pending. `None` once
    /// the session has stopped.
    pub fn next_probe(&mut self) -> Result<Option<SelectionResult>> {
        if self.is_finished() {
            return Ok(None);
        }
        if let Some(pending) = &self.pending {
            return Ok(Some(pending.clone()));
        }
        let selection = select_next(
            &self.baseline,
            &self.recent,
            self.engine.config().confidence_saturation,
        )?;
        self.pending = Some(selection.clone());
        Ok(Some(selection))
    }

    /// Grades the outstanding probe and persists the outcome.
    pub fn submit(&mut self, is_correct: bool, occurred_at: DateTime<Utc>) -> Result<UpdateOutcome> {
        let Some(probe) = self.pending.as_ref() else {
            return Err(MasteryError::InvalidObservation(
                "no outstanding probe to answer".to_string(),
            ));
        };
        let observation = Observation {
            topic_id: probe.topic_id.clone(),
            is_correct,
            occurred_at,
        };

        let outcome = self.engine.observe(&self.learner_id, &observation)?;
        self.pending = None;

        self.asked += 1;
        if is_correct {
            self.correct += 1;
        }
        let tally = self.tallies.entry(observation.topic_id.clone()).or_default();
        tally.attempts += 1;
        if is_correct {
            tally.correct += 1;
        }
        self.probabilities
            .insert(observation.topic_id.clone(), outcome.mastery_probability);
        self.recent.push(RecentOutcome::from(&observation));
        self.last_answer_at = Some(occurred_at);

        self.stop_reason = self.check_stop();
        Ok(outcome)
    }

    fn check_stop(&self) -> Option<StopReason> {
        let config = self.engine.config();
        if self
            .probabilities
            .values()
            .all(|p| *p >= config.mastery_threshold)
        {
            return Some(StopReason::MasteryReached);
        }
        if self.asked as usize >= config.session_length {
            return Some(StopReason::SessionLength);
        }
        None
    }

    /// Ends the session and builds its report from the stored state.
    pub fn finish(self) -> Result<SessionReport> {
        let summary = self.engine.summarize(&self.learner_id, &self.topics)?;
        let stop_reason = self.stop_reason.unwrap_or(StopReason::EndedByCaller);
        let accuracy = if self.asked > 0 {
            self.correct as f64 / self.asked as f64
        } else {
            0.0
        };

        tracing::info!(
            learner_id = %self.learner_id,
            questions = self.asked,
            correct = self.correct,
            accuracy,
            stop_reason = ?stop_reason,
            knowledge_gaps = summary.knowledge_gaps.len(),
            "Quiz session finished"
        );

        Ok(SessionReport {
            learner_id: self.learner_id,
            questions_asked: self.asked,
            correct_answers: self.correct,
            accuracy,
            stop_reason,
            per_topic: self.tallies,
            started_at: self.started_at,
            last_answer_at: self.last_answer_at,
            summary,
        })
    }
}
