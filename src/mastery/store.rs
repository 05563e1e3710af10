use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::state::MasteryState;
use crate::error::{MasteryError, Result};

/// Storage contract for mastery parameters.
///
/// Implementations validate on every write and surface backend failures as
/// `MasteryError::Storage`. Writers doing read-modify-write must go through
/// `compare_and_swap` so concurrent updates of one key serialize.
pub trait MasteryStore: Send + Sync {
    /// Stored state, or `None` if the pair has never been observed.
    fn load(&self, learner_id: &str, topic_id: &str) -> Result<Option<MasteryState>>;

    fn put(&self, learner_id: &str, topic_id: &str, state: MasteryState) -> Result<()>;

    /// All stored states of a learner. Iteration order is unspecified.
    fn list_by_learner(&self, learner_id: &str) -> Result<HashMap<String, MasteryState>>;

    /// Writes `new` only if the stored value still equals `expected`
    /// (`None` meaning absent). Returns whether the write happened.
    fn compare_and_swap(
        &self,
        learner_id: &str,
        topic_id: &str,
        expected: Option<&MasteryState>,
        new: MasteryState,
    ) -> Result<bool>;

    /// Cold start: absent pairs read as the uninformative prior.
    fn get(&self, learner_id: &str, topic_id: &str) -> Result<MasteryState> {
        Ok(self.load(learner_id, topic_id)?.unwrap_or_default())
    }
}

type LearnerTopics = HashMap<String, HashMap<String, MasteryState>>;

/// Sharded in-memory store.
///
/// Keys are spread over independent locks by hash of (learner, topic), so
/// writes to unrelated pairs never wait on each other.
pub struct InMemoryMasteryStore {
    shards: Vec<RwLock<LearnerTopics>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredMastery {
    learner_id: String,
    topic_id: String,
    state: MasteryState,
}

impl Default for InMemoryMasteryStore {
    fn default() -> Self {
        Self::new(crate::config::MasteryConfig::default().store_shards)
    }
}

impl InMemoryMasteryStore {
    pub fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        Self {
            shards: (0..shard_count).map(|_| RwLock::new(HashMap::new())).collect(),
        }
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    fn shard(&self, learner_id: &str, topic_id: &str) -> &RwLock<LearnerTopics> {
        let mut hasher = DefaultHasher::new();
        learner_id.hash(&mut hasher);
        topic_id.hash(&mut hasher);
        let idx = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[idx]
    }

    /// Drops every state of a learner. Returns how many pairs were removed.
    pub fn remove_learner(&self, learner_id: &str) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .write()
                    .remove(learner_id)
                    .map(|topics| topics.len())
                    .unwrap_or(0)
            })
            .sum()
    }

    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().values().map(HashMap::len).sum::<usize>())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializes every stored pair, sorted by learner then topic.
    pub fn export_json(&self) -> Result<String> {
        let mut entries: Vec<StoredMastery> = Vec::with_capacity(self.len());
        for shard in &self.shards {
            let guard = shard.read();
            for (learner_id, topics) in guard.iter() {
                entries.extend(topics.iter().map(|(topic_id, state)| StoredMastery {
                    learner_id: learner_id.clone(),
                    topic_id: topic_id.clone(),
                    state: *state,
                }));
            }
        }
        entries.sort_by(|a, b| {
            a.learner_id
                .cmp(&b.learner_id)
                .then_with(|| a.topic_id.cmp(&b.topic_id))
        });
        serde_json::to_string(&entries).map_err(|e| MasteryError::Storage(e.to_string()))
    }

    /// Loads pairs produced by `export_json`, overwriting existing keys.
    /// Nothing is written unless every entry is valid.
    pub fn import_json(&self, json: &str) -> Result<usize> {
        let entries: Vec<StoredMastery> =
            serde_json::from_str(json).map_err(|e| MasteryError::Storage(e.to_string()))?;
        for entry in &entries {
            self.put(&entry.learner_id, &entry.topic_id, entry.state)?;
        }
        Ok(entries.len())
    }
}

impl MasteryStore for InMemoryMasteryStore {
    fn load(&self, learner_id: &str, topic_id: &str) -> Result<Option<MasteryState>> {
        let guard = self.shard(learner_id, topic_id).read();
        Ok(guard
            .get(learner_id)
            .and_then(|topics| topics.get(topic_id))
            .copied())
    }

    fn put(&self, learner_id: &str, topic_id: &str, state: MasteryState) -> Result<()> {
        state.validate()?;
        let mut guard = self.shard(learner_id, topic_id).write();
        guard
            .entry(learner_id.to_string())
            .or_default()
            .insert(topic_id.to_string(), state);
        Ok(())
    }

    fn list_by_learner(&self, learner_id: &str) -> Result<HashMap<String, MasteryState>> {
        let mut out = HashMap::new();
        for shard in &self.shards {
            if let Some(topics) = shard.read().get(learner_id) {
                out.extend(topics.iter().map(|(k, v)| (k.clone(), *v)));
            }
        }
        Ok(out)
    }

    fn compare_and_swap(
        &self,
        learner_id: &str,
        topic_id: &str,
        expected: Option<&MasteryState>,
        new: MasteryState,
    ) -> Result<bool> {
        new.validate()?;
        let mut guard = self.shard(learner_id, topic_id).write();
        let current = guard.get(learner_id).and_then(|topics| topics.get(topic_id));
        if current != expected {
            return Ok(false);
        }
        guard
            .entry(learner_id.to_string())
            .or_default()
            .insert(topic_id.to_string(), new);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(a: f64, b: f64) -> MasteryState {
        MasteryState::new(a, b).unwrap()
    }

    #[test]
    fn get_returns_prior_when_absent() {
        let store = InMemoryMasteryStore::new(4);
        assert_eq!(store.get("u1", "t1").unwrap(), MasteryState::prior());
        assert!(store.load("u1", "t1").unwrap().is_none());
    }

    #[test]
    fn put_rejects_below_floor() {
        let store = InMemoryMasteryStore::new(4);
        let bad = MasteryState::from_parts(0.5, 1.0);
        assert!(matches!(
            store.put("u1", "t1", bad),
            Err(MasteryError::InvalidState(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn list_by_learner_spans_shards() {
        let store = InMemoryMasteryStore::new(8);
        for i in 0..20 {
            store.put("u1", &format!("t{i}"), state(2.0, 1.0)).unwrap();
        }
        store.put("u2", "t0", state(1.0, 3.0)).unwrap();

        let listed = store.list_by_learner("u1").unwrap();
        assert_eq!(listed.len(), 20);
        assert_eq!(store.list_by_learner("u2").unwrap().len(), 1);
        assert!(store.list_by_learner("nobody").unwrap().is_empty());
    }

    #[test]
    fn compare_and_swap_detects_conflict() {
        let store = InMemoryMasteryStore::new(2);
        assert!(store
            .compare_and_swap("u1", "t1", None, state(2.0, 1.0))
            .unwrap());
        // Stale expectation: still thinks the pair is absent.
        assert!(!store
            .compare_and_swap("u1", "t1", None, state(1.0, 2.0))
            .unwrap());
        assert!(store
            .compare_and_swap("u1", "t1", Some(&state(2.0, 1.0)), state(3.0, 1.0))
            .unwrap());
        assert_eq!(store.get("u1", "t1").unwrap(), state(3.0, 1.0));
    }

    #[test]
    fn remove_learner_erases_only_that_learner() {
        let store = InMemoryMasteryStore::new(4);
        store.put("u1", "a", state(2.0, 2.0)).unwrap();
        store.put("u1", "b", state(2.0, 2.0)).unwrap();
        store.put("u2", "a", state(2.0, 2.0)).unwrap();

        assert_eq!(store.remove_learner("u1"), 2);
        assert!(store.list_by_learner("u1").unwrap().is_empty());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn export_then_import_restores_states() {
        let source = InMemoryMasteryStore::new(4);
        source.put("u1", "a", state(4.0, 3.0)).unwrap();
        source.put("u2", "b", state(1.0, 9.0)).unwrap();
        let json = source.export_json().unwrap();

        let target = InMemoryMasteryStore::new(3);
        assert_eq!(target.import_json(&json).unwrap(), 2);
        assert_eq!(target.get("u1", "a").unwrap(), state(4.0, 3.0));
        assert_eq!(target.get("u2", "b").unwrap(), state(1.0, 9.0));
    }

    #[test]
    fn import_is_all_or_nothing() {
        let store = InMemoryMasteryStore::new(4);
        let json = r#"[
            {"learnerId":"u1","topicId":"a","state":{"alpha":2.0,"beta":1.0}},
            {"learnerId":"u1","topicId":"b","state":{"alpha":0.2,"beta":1.0}}
        ]"#;
        // The second entry fails deserialization, so the first is never written.
        match store.import_json(json) {
            Err(MasteryError::Storage(msg)) => assert!(msg.contains("invalid mastery state")),
            other => panic!("expected storage error, got {other:?}"),
        }
        assert!(store.is_empty());

        assert!(matches!(
            store.import_json("not json"),
            Err(MasteryError::Storage(_))
        ));
    }
}
