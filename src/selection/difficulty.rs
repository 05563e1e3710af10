use serde::{Deserialize, Serialize};

/// Below this probability material is always easy.
pub const EASY_BELOW: f64 = 0.4;
/// Hard material needs a probability above this...
pub const HARD_ABOVE: f64 = 0.8;
/// ...backed by at least this much confidence.
pub const HARD_MIN_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First match wins: low mastery is easy whatever the confidence, hard needs
/// both a high and a trustworthy estimate, everything else is medium.
pub fn recommend(mastery_probability: f64, confidence: f64) -> Difficulty {
    if mastery_probability < EASY_BELOW {
        Difficulty::Easy
    } else if mastery_probability > HARD_ABOVE && confidence > HARD_MIN_CONFIDENCE {
        Difficulty::Hard
    } else {
        Difficulty::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_mastery_is_easy_regardless_of_confidence() {
        for conf in [0.0, 0.3, 0.71, 1.0] {
            assert_eq!(recommend(0.2, conf), Difficulty::Easy);
        }
    }

    #[test]
    fn hard_requires_confidence() {
        assert_eq!(recommend(0.9, 1.0), Difficulty::Hard);
        assert_eq!(recommend(0.9, 0.7), Difficulty::Medium);
        assert_eq!(recommend(0.8, 1.0), Difficulty::Medium);
    }

    #[test]
    fn boundaries() {
        assert_eq!(recommend(0.4, 0.0), Difficulty::Medium);
        assert_eq!(recommend(0.39999, 0.0), Difficulty::Easy);
        assert_eq!(recommend(0.5, 0.0), Difficulty::Medium);
    }

    #[test]
    fn display_matches_serde_names() {
        assert_eq!(Difficulty::Easy.to_string(), "easy");
        assert_eq!(
            serde_json::from_str::<Difficulty>("\"hard\"").unwrap(),
            Difficulty::Hard
        );
        assert_eq!(
            serde_json::to_string(&Difficulty::Medium).unwrap(),
            "\"medium\""
        );
    }
}
