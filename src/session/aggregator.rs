use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::MasteryConfig;
use crate::mastery::TopicMasterySnapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Weakest first, capped at `knowledge_gap_cap`.
    pub knowledge_gaps: Vec<String>,
    /// Rounded mean mastery percent per subject tag. Untagged topics and
    /// subjects without topics are absent.
    pub mastery_by_subject: BTreeMap<String, u32>,
    /// Topics at or above `mastery_threshold`, in input order.
    pub mastered_topics: Vec<String>,
}

pub fn summarize(snapshots: &[TopicMasterySnapshot], config: &MasteryConfig) -> SessionSummary {
    let mut gaps: Vec<&TopicMasterySnapshot> = snapshots
        .iter()
        .filter(|s| s.mastery_probability < config.knowledge_gap_threshold)
        .collect();
    // Stable: equal probabilities keep the caller's order.
    gaps.sort_by(|a, b| a.mastery_probability.total_cmp(&b.mastery_probability));
    let knowledge_gaps = gaps
        .into_iter()
        .take(config.knowledge_gap_cap)
        .map(|s| s.topic_id.clone())
        .collect();

    let mut sums: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for snap in snapshots {
        if let Some(subject) = snap.subject.as_deref() {
            let entry = sums.entry(subject).or_insert((0.0, 0));
            entry.0 += snap.mastery_probability * 100.0;
            entry.1 += 1;
        }
    }
    let mastery_by_subject = sums
        .into_iter()
        .map(|(subject, (total, count))| {
            (subject.to_string(), (total / count as f64).round() as u32)
        })
        .collect();

    let mastered_topics = snapshots
        .iter()
        .filter(|s| s.mastery_probability >= config.mastery_threshold)
        .map(|s| s.topic_id.clone())
        .collect();

    SessionSummary {
        knowledge_gaps,
        mastery_by_subject,
        mastered_topics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mastery::{MasteryState, TopicRef};

    fn snap(topic: &str, subject: Option<&str>, alpha: f64, beta: f64) -> TopicMasterySnapshot {
        let mut topic_ref = TopicRef::new(topic);
        if let Some(subject) = subject {
            topic_ref = topic_ref.with_subject(subject);
        }
        TopicMasterySnapshot::from_state(
            &topic_ref,
            MasteryState::new(alpha, beta).unwrap(),
            50.0,
        )
    }

    #[test]
    fn mean_percent_and_gaps_for_one_subject() {
        let snaps = vec![
            snap("weak", Some("algebra"), 2.0, 8.0),
            snap("middle", Some("algebra"), 5.0, 5.0),
            snap("strong", Some("algebra"), 9.0, 1.0),
        ];
        let summary = summarize(&snaps, &MasteryConfig::default());
        assert_eq!(summary.mastery_by_subject.get("algebra"), Some(&53));
        assert_eq!(summary.knowledge_gaps, vec!["weak".to_string()]);
        assert_eq!(summary.mastered_topics, vec!["strong".to_string()]);
    }

    #[test]
    fn gaps_sorted_ascending_and_capped() {
        let snaps = vec![
            snap("g3", None, 3.0, 6.0),
            snap("g1", None, 1.0, 9.0),
            snap("ok", None, 5.0, 5.0),
            snap("g2", None, 2.0, 8.0),
        ];
        let config = MasteryConfig {
            knowledge_gap_cap: 2,
            ..Default::default()
        };
        let summary = summarize(&snaps, &config);
        assert_eq!(summary.knowledge_gaps, vec!["g1", "g2"]);
    }

    #[test]
    fn untagged_topics_do_not_create_subjects() {
        let snaps = vec![snap("a", None, 1.0, 1.0), snap("b", Some("history"), 3.0, 1.0)];
        let summary = summarize(&snaps, &MasteryConfig::default());
        assert_eq!(summary.mastery_by_subject.len(), 1);
        assert_eq!(summary.mastery_by_subject.get("history"), Some(&75));
    }

    #[test]
    fn empty_input_gives_empty_summary() {
        let summary = summarize(&[], &MasteryConfig::default());
        assert!(summary.knowledge_gaps.is_empty());
        assert!(summary.mastery_by_subject.is_empty());
    }
}
