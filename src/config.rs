use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIDENCE_SATURATION: f64 = 50.0;
pub const DEFAULT_KNOWLEDGE_GAP_THRESHOLD: f64 = 0.4;
pub const DEFAULT_MASTERY_THRESHOLD: f64 = 0.8;
pub const DEFAULT_KNOWLEDGE_GAP_CAP: usize = 20;
const DEFAULT_SESSION_LENGTH: usize = 20;
const DEFAULT_STORE_SHARDS: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MasteryConfig {
    /// Observation count at which confidence reaches 1.0.
    pub confidence_saturation: f64,
    pub knowledge_gap_threshold: f64,
    pub mastery_threshold: f64,
    pub knowledge_gap_cap: usize,
    /// Maximum questions asked in one quiz session.
    pub session_length: usize,
    pub store_shards: usize,
}

impl Default for MasteryConfig {
    fn default() -> Self {
        Self {
            confidence_saturation: DEFAULT_CONFIDENCE_SATURATION,
            knowledge_gap_threshold: DEFAULT_KNOWLEDGE_GAP_THRESHOLD,
            mastery_threshold: DEFAULT_MASTERY_THRESHOLD,
            knowledge_gap_cap: DEFAULT_KNOWLEDGE_GAP_CAP,
            session_length: DEFAULT_SESSION_LENGTH,
            store_shards: DEFAULT_STORE_SHARDS,
        }
    }
}

impl MasteryConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(val) = env_parse::<f64>("MASTERY_CONFIDENCE_SATURATION") {
            config.apply("MASTERY_CONFIDENCE_SATURATION", |c| {
                c.confidence_saturation = val
            });
        }
        if let Some(val) = env_parse::<f64>("MASTERY_KNOWLEDGE_GAP_THRESHOLD") {
            config.apply("MASTERY_KNOWLEDGE_GAP_THRESHOLD", |c| {
                c.knowledge_gap_threshold = val
            });
        }
        if let Some(val) = env_parse::<f64>("MASTERY_THRESHOLD") {
            config.apply("MASTERY_THRESHOLD", |c| c.mastery_threshold = val);
        }
        if let Some(val) = env_parse::<usize>("MASTERY_KNOWLEDGE_GAP_CAP") {
            config.apply("MASTERY_KNOWLEDGE_GAP_CAP", |c| c.knowledge_gap_cap = val);
        }
        if let Some(val) = env_parse::<usize>("MASTERY_SESSION_LENGTH") {
            config.apply("MASTERY_SESSION_LENGTH", |c| c.session_length = val);
        }
        if let Some(val) = env_parse::<usize>("MASTERY_STORE_SHARDS") {
            config.apply("MASTERY_STORE_SHARDS", |c| c.store_shards = val);
        }

        config
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.confidence_saturation.is_finite() || self.confidence_saturation <= 0.0 {
            return Err(format!(
                "confidence_saturation must be positive, got {}",
                self.confidence_saturation
            ));
        }
        if !in_open_unit(self.knowledge_gap_threshold) {
            return Err(format!(
                "knowledge_gap_threshold must be in (0, 1), got {}",
                self.knowledge_gap_threshold
            ));
        }
        if !in_open_unit(self.mastery_threshold) {
            return Err(format!(
                "mastery_threshold must be in (0, 1), got {}",
                self.mastery_threshold
            ));
        }
        if self.session_length == 0 {
            return Err("session_length must be at least 1".to_string());
        }
        if self.store_shards == 0 {
            return Err("store_shards must be at least 1".to_string());
        }
        Ok(())
    }

    /// Applies one override, keeping the previous value if it would leave the
    /// config invalid.
    fn apply(&mut self, key: &str, set: impl FnOnce(&mut Self)) {
        let mut candidate = self.clone();
        set(&mut candidate);
        match candidate.validate() {
            Ok(()) => *self = candidate,
            Err(reason) => {
                tracing::warn!(key, %reason, "Ignoring mastery config override");
            }
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn in_open_unit(value: f64) -> bool {
    value > 0.0 && value < 1.0
}
