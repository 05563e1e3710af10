//! Bayesian Updater
//!
//! Beta-Binomial conjugate update: observing `correct` successes out of
//! `total` Bernoulli trials moves `Beta(a, b)` to
//! `Beta(a + correct, b + total - correct)`. The rule is associative, so a
//! batch update equals the sequence of its single-outcome updates.
//!
//! Pure function: never touches the store.

use serde::{Deserialize, Serialize};

use super::state::{confidence_for, MasteryState};
use crate::error::{MasteryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub new_state: MasteryState,
    pub mastery_probability: f64,
    pub confidence: f64,
}

pub fn update(
    prior: &MasteryState,
    correct_count: i64,
    total_count: i64,
    confidence_saturation: f64,
) -> Result<UpdateOutcome> {
    validate_counts(correct_count, total_count)?;

    let incorrect = total_count - correct_count;
    let new_state = MasteryState::from_parts(
        prior.alpha() + correct_count as f64,
        prior.beta() + incorrect as f64,
    );
    // Counts are validated non-negative, so only overflow to inf can fail here.
    new_state.validate()?;

    Ok(UpdateOutcome {
        new_state,
        mastery_probability: new_state.mastery_probability(),
        confidence: confidence_for(new_state.observation_count(), confidence_saturation),
    })
}

/// Single-outcome convenience wrapper.
pub fn update_one(
    prior: &MasteryState,
    is_correct: bool,
    confidence_saturation: f64,
) -> Result<UpdateOutcome> {
    update(prior, i64::from(is_correct), 1, confidence_saturation)
}

fn validate_counts(correct_count: i64, total_count: i64) -> Result<()> {
    if total_count < 0 {
        return Err(MasteryError::InvalidObservation(format!(
            "total count must be non-negative, got {total_count}"
        )));
    }
    if correct_count < 0 {
        return Err(MasteryError::InvalidObservation(format!(
            "correct count must be non-negative, got {correct_count}"
        )));
    }
    if correct_count > total_count {
        return Err(MasteryError::InvalidObservation(format!(
            "correct count {correct_count} exceeds total count {total_count}"
        )));
    }
    Ok(())
}
