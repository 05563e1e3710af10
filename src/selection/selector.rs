//! Topic Selector
//!
//! Weakest-first: the next probe goes to the topic with the lowest mastery
//! probability after folding in the session's recent outcomes. Ties go to the
//! most recent miss, then to the caller's topic order, so identical inputs
//! always produce the identical result.

use serde::{Deserialize, Serialize};

use super::difficulty::{recommend, Difficulty};
use crate::error::{MasteryError, Result};
use crate::mastery::{update_one, MasteryState, RecentOutcome, TopicMasterySnapshot};

const TIE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResult {
    pub topic_id: String,
    pub difficulty: Difficulty,
    pub reason: String,
    pub mastery_probability: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TieBreak {
    Unique,
    RecentMiss,
    TopicOrder,
}

struct Candidate<'a> {
    topic_id: &'a str,
    state: MasteryState,
}

pub fn select_next(
    snapshots: &[TopicMasterySnapshot],
    recent_outcomes: &[RecentOutcome],
    confidence_saturation: f64,
) -> Result<SelectionResult> {
    if snapshots.is_empty() {
        return Err(MasteryError::NoTopicsAvailable);
    }

    let mut working: Vec<Candidate<'_>> = Vec::with_capacity(snapshots.len());
    for snap in snapshots {
        snap.state.validate()?;
        working.push(Candidate {
            topic_id: snap.topic_id.as_str(),
            state: snap.state,
        });
    }

    for outcome in recent_outcomes {
        // Outcomes for topics outside the candidate set carry no signal here.
        if let Some(candidate) = working
            .iter_mut()
            .find(|c| c.topic_id == outcome.topic_id)
        {
            candidate.state =
                update_one(&candidate.state, outcome.is_correct, confidence_saturation)?.new_state;
        }
    }

    let min_probability = working
        .iter()
        .map(|c| c.state.mastery_probability())
        .fold(f64::INFINITY, f64::min);

    let tied: Vec<usize> = working
        .iter()
        .enumerate()
        .filter(|(_, c)| (c.state.mastery_probability() - min_probability).abs() <= TIE_EPSILON)
        .map(|(idx, _)| idx)
        .collect();

    let (chosen, tie_break) = match tied.as_slice() {
        [] => {
            return Err(MasteryError::InvalidState(
                "no candidate has a finite mastery probability".to_string(),
            ))
        }
        [only] => (*only, TieBreak::Unique),
        [first, ..] => match most_recent_miss(&working, &tied, recent_outcomes) {
            Some(idx) => (idx, TieBreak::RecentMiss),
            None => (*first, TieBreak::TopicOrder),
        },
    };

    let candidate = &working[chosen];
    let probability = candidate.state.mastery_probability();
    let confidence = candidate.state.confidence(confidence_saturation);
    let difficulty = recommend(probability, confidence);

    let mut reason = format!(
        "weakest topic {} (mastery {:.3}, confidence {:.2}) -> {}",
        candidate.topic_id, probability, confidence, difficulty
    );
    match tie_break {
        TieBreak::Unique => {}
        TieBreak::RecentMiss => {
            reason.push_str(&format!("; tied with {} others, most recent miss", tied.len() - 1))
        }
        TieBreak::TopicOrder => {
            reason.push_str(&format!("; tied with {} others, topic order", tied.len() - 1))
        }
    }

    tracing::debug!(
        topic_id = candidate.topic_id,
        probability,
        confidence,
        difficulty = difficulty.as_str(),
        tie_break = ?tie_break,
        "Selected next topic"
    );

    Ok(SelectionResult {
        topic_id: candidate.topic_id.to_string(),
        difficulty,
        reason,
        mastery_probability: probability,
        confidence,
    })
}

fn most_recent_miss(
    working: &[Candidate<'_>],
    tied: &[usize],
    recent_outcomes: &[RecentOutcome],
) -> Option<usize> {
    recent_outcomes
        .iter()
        .rev()
        .filter(|o| !o.is_correct)
        .find_map(|o| {
            tied.iter()
                .copied()
                .find(|&idx| working[idx].topic_id == o.topic_id)
        })
}
