use std::sync::Arc;

use crate::config::MasteryConfig;
use crate::error::{MasteryError, Result};
use crate::mastery::{
    updater, MasteryStore, Observation, RecentOutcome, TopicMasterySnapshot, TopicRef,
    UpdateOutcome,
};
use crate::selection::{select_next, SelectionResult};
use crate::session::{summarize, QuizSession, SessionSummary};

/// Composes the store, updater, selector and aggregator for callers.
///
/// Writes are read-modify-write cycles closed by a compare-and-swap on the
/// prior state, retried on conflict, so concurrent observations of one
/// (learner, topic) never lose an update while unrelated pairs proceed
/// without waiting on each other.
pub struct MasteryEngine<S: MasteryStore> {
    store: Arc<S>,
    config: MasteryConfig,
}

impl<S: MasteryStore> Clone for MasteryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: MasteryStore> MasteryEngine<S> {
    pub fn new(store: Arc<S>, config: MasteryConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &MasteryConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Applies `correct` successes out of `total` outcomes to one pair.
    pub fn record(
        &self,
        learner_id: &str,
        topic_id: &str,
        correct_count: i64,
        total_count: i64,
    ) -> Result<UpdateOutcome> {
        let saturation = self.config.confidence_saturation;
        let mut retries = 0u32;

        loop {
            let current = self.store.load(learner_id, topic_id)?;
            let prior = current.unwrap_or_default();
            let outcome = updater::update(&prior, correct_count, total_count, saturation)?;

            if total_count == 0 {
                // Nothing observed: the pair stays lazily absent.
                return Ok(outcome);
            }

            if self.store.compare_and_swap(
                learner_id,
                topic_id,
                current.as_ref(),
                outcome.new_state,
            )? {
                tracing::debug!(
                    learner_id,
                    topic_id,
                    correct_count,
                    total_count,
                    alpha = outcome.new_state.alpha(),
                    beta = outcome.new_state.beta(),
                    probability = outcome.mastery_probability,
                    confidence = outcome.confidence,
                    retries,
                    "Mastery updated"
                );
                return Ok(outcome);
            }

            retries += 1;
            tracing::debug!(learner_id, topic_id, retries, "Mastery write conflict, retrying");
        }
    }

    pub fn observe(&self, learner_id: &str, observation: &Observation) -> Result<UpdateOutcome> {
        self.record(
            learner_id,
            &observation.topic_id,
            i64::from(observation.is_correct),
            1,
        )
    }

    /// Folds a batch into one update per topic, in first-seen topic order.
    ///
    /// Equivalent to observing each entry in turn. A storage failure stops the
    /// batch; topics already written stay written.
    pub fn observe_batch(
        &self,
        learner_id: &str,
        observations: &[Observation],
    ) -> Result<Vec<(String, UpdateOutcome)>> {
        let mut grouped: Vec<(&str, i64, i64)> = Vec::new();
        for obs in observations {
            match grouped.iter_mut().find(|(topic, _, _)| *topic == obs.topic_id) {
                Some((_, correct, total)) => {
                    *correct += i64::from(obs.is_correct);
                    *total += 1;
                }
                None => grouped.push((obs.topic_id.as_str(), i64::from(obs.is_correct), 1)),
            }
        }

        grouped
            .into_iter()
            .map(|(topic_id, correct, total)| {
                self.record(learner_id, topic_id, correct, total)
                    .map(|outcome| (topic_id.to_string(), outcome))
            })
            .collect()
    }

    /// Snapshots in the caller's topic order; unseen topics read as cold start.
    pub fn snapshots(
        &self,
        learner_id: &str,
        topics: &[TopicRef],
    ) -> Result<Vec<TopicMasterySnapshot>> {
        let stored = self.store.list_by_learner(learner_id)?;
        let saturation = self.config.confidence_saturation;
        Ok(topics
            .iter()
            .map(|topic| {
                let state = stored.get(&topic.topic_id).copied().unwrap_or_default();
                TopicMasterySnapshot::from_state(topic, state, saturation)
            })
            .collect())
    }

    pub fn select_next(
        &self,
        learner_id: &str,
        topics: &[TopicRef],
        recent_outcomes: &[RecentOutcome],
    ) -> Result<SelectionResult> {
        if topics.is_empty() {
            return Err(MasteryError::NoTopicsAvailable);
        }
        let snapshots = self.snapshots(learner_id, topics)?;
        select_next(&snapshots, recent_outcomes, self.config.confidence_saturation)
    }

    pub fn summarize(&self, learner_id: &str, topics: &[TopicRef]) -> Result<SessionSummary> {
        let snapshots = self.snapshots(learner_id, topics)?;
        Ok(summarize(&snapshots, &self.config))
    }

    pub fn start_session(
        &self,
        learner_id: impl Into<String>,
        topics: Vec<TopicRef>,
    ) -> Result<QuizSession<'_, S>> {
        QuizSession::start(self, learner_id.into(), topics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mastery::{InMemoryMasteryStore, MasteryState};
    use crate::selection::Difficulty;

    fn engine() -> MasteryEngine<InMemoryMasteryStore> {
        MasteryEngine::new(
            Arc::new(InMemoryMasteryStore::new(4)),
            MasteryConfig::default(),
        )
    }

    #[test]
    fn record_persists_posterior() {
        let engine = engine();
        let out = engine.record("u1", "t1", 3, 5).unwrap();
        assert_eq!(out.new_state, MasteryState::new(4.0, 3.0).unwrap());
        assert_eq!(engine.store().get("u1", "t1").unwrap(), out.new_state);
    }

    #[test]
    fn invalid_counts_leave_store_untouched() {
        let engine = engine();
        engine.record("u1", "t1", 1, 2).unwrap();
        let before = engine.store().get("u1", "t1").unwrap();

        assert!(matches!(
            engine.record("u1", "t1", 3, 2),
            Err(MasteryError::InvalidObservation(_))
        ));
        assert_eq!(engine.store().get("u1", "t1").unwrap(), before);
    }

    #[test]
    fn zero_total_does_not_create_state() {
        let engine = engine();
        engine.record("u1", "t1", 0, 0).unwrap();
        assert!(engine.store().load("u1", "t1").unwrap().is_none());
    }

    #[test]
    fn batch_matches_sequential_observations() {
        let batch_engine = engine();
        let seq_engine = engine();
        let observations = vec![
            Observation::new("a", true),
            Observation::new("b", false),
            Observation::new("a", false),
            Observation::new("a", true),
        ];

        let outcomes = batch_engine.observe_batch("u1", &observations).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].0, "a");

        for obs in &observations {
            seq_engine.observe("u1", obs).unwrap();
        }
        for topic in ["a", "b"] {
            assert_eq!(
                batch_engine.store().get("u1", topic).unwrap(),
                seq_engine.store().get("u1", topic).unwrap()
            );
        }
    }

    #[test]
    fn select_without_topics_fails_fast() {
        assert_eq!(
            engine().select_next("u1", &[], &[]),
            Err(MasteryError::NoTopicsAvailable)
        );
    }

    #[test]
    fn select_uses_stored_state() {
        let engine = engine();
        let topics = vec![TopicRef::new("a"), TopicRef::new("b")];
        engine.record("u1", "b", 1, 8).unwrap();

        let result = engine.select_next("u1", &topics, &[]).unwrap();
        assert_eq!(result.topic_id, "b");
        assert_eq!(result.difficulty, Difficulty::Easy);
    }
}
