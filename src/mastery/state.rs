use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MasteryError, Result};

/// Parameter floor shared by alpha and beta: the uninformative prior.
pub const PRIOR_PARAM: f64 = 1.0;

/// Beta-distribution parameters for one (learner, topic) pair.
///
/// `alpha` counts pseudo-successes and `beta` pseudo-failures, both starting
/// at the uniform prior `Beta(1, 1)`. Neither may drop below 1, and
/// deserialization enforces the same floor as `new`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMasteryState")]
pub struct MasteryState {
    alpha: f64,
    beta: f64,
}

#[derive(Deserialize)]
struct RawMasteryState {
    alpha: f64,
    beta: f64,
}

impl TryFrom<RawMasteryState> for MasteryState {
    type Error = MasteryError;

    fn try_from(raw: RawMasteryState) -> Result<Self> {
        Self::new(raw.alpha, raw.beta)
    }
}

impl Default for MasteryState {
    fn default() -> Self {
        Self::prior()
    }
}

impl MasteryState {
    pub const fn prior() -> Self {
        Self {
            alpha: PRIOR_PARAM,
            beta: PRIOR_PARAM,
        }
    }

    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        let state = Self { alpha, beta };
        state.validate()?;
        Ok(state)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || !self.beta.is_finite() {
            return Err(MasteryError::InvalidState(format!(
                "parameters must be finite (alpha={}, beta={})",
                self.alpha, self.beta
            )));
        }
        if self.alpha < PRIOR_PARAM || self.beta < PRIOR_PARAM {
            return Err(MasteryError::InvalidState(format!(
                "parameters must be >= {PRIOR_PARAM} (alpha={}, beta={})",
                self.alpha, self.beta
            )));
        }
        if !(self.alpha + self.beta).is_finite() {
            return Err(MasteryError::InvalidState(format!(
                "parameter sum overflows (alpha={}, beta={})",
                self.alpha, self.beta
            )));
        }
        Ok(())
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Posterior mean. Always strictly inside (0, 1) for a valid state.
    pub fn mastery_probability(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    pub fn observation_count(&self) -> f64 {
        (self.alpha + self.beta - 2.0 * PRIOR_PARAM).max(0.0)
    }

    pub fn confidence(&self, saturation: f64) -> f64 {
        confidence_for(self.observation_count(), saturation)
    }

    pub fn is_prior(&self) -> bool {
        self.alpha == PRIOR_PARAM && self.beta == PRIOR_PARAM
    }

    /// Unchecked constructor for callers that only ever add non-negative
    /// counts to an already valid state.
    pub(crate) fn from_parts(alpha: f64, beta: f64) -> Self {
        Self { alpha, beta }
    }
}

/// `min(1, n / saturation)`, 0 at the prior.
pub fn confidence_for(observation_count: f64, saturation: f64) -> f64 {
    if saturation <= 0.0 {
        return 1.0;
    }
    (observation_count / saturation).clamp(0.0, 1.0)
}

/// A single graded answer, ephemeral input to the updater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub topic_id: String,
    pub is_correct: bool,
    pub occurred_at: DateTime<Utc>,
}

impl Observation {
    pub fn new(topic_id: impl Into<String>, is_correct: bool) -> Self {
        Self {
            topic_id: topic_id.into(),
            is_correct,
            occurred_at: Utc::now(),
        }
    }
}

/// Within-session outcome the selector folds in before the store catches up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentOutcome {
    pub topic_id: String,
    pub is_correct: bool,
}

impl RecentOutcome {
    pub fn new(topic_id: impl Into<String>, is_correct: bool) -> Self {
        Self {
            topic_id: topic_id.into(),
            is_correct,
        }
    }
}

impl From<&Observation> for RecentOutcome {
    fn from(obs: &Observation) -> Self {
        Self::new(obs.topic_id.clone(), obs.is_correct)
    }
}

/// A topic registered for a learner, in the caller's stable ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRef {
    pub topic_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
}

impl TopicRef {
    pub fn new(topic_id: impl Into<String>) -> Self {
        Self {
            topic_id: topic_id.into(),
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Read-only projection of a state plus its derived statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicMasterySnapshot {
    pub topic_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub state: MasteryState,
    pub mastery_probability: f64,
    pub confidence: f64,
    pub observation_count: f64,
}

impl TopicMasterySnapshot {
    pub fn from_state(topic: &TopicRef, state: MasteryState, saturation: f64) -> Self {
        Self {
            topic_id: topic.topic_id.clone(),
            subject: topic.subject.clone(),
            state,
            mastery_probability: state.mastery_probability(),
            confidence: state.confidence(saturation),
            observation_count: state.observation_count(),
        }
    }

    pub fn cold_start(topic: &TopicRef, saturation: f64) -> Self {
        Self::from_state(topic, MasteryState::prior(), saturation)
    }
}
