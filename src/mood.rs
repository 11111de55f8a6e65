//! Rule-based mood tagging.
//!
//! Every track gets exactly one of eight labels from fixed thresholds over its
//! raw audio features. Rules are checked in order and the first match wins, so
//! the ranges overlap on purpose: a loud, happy, danceable track is `Happy`,
//! never `Party`.

use crate::track::AudioFeatures;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of mood labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Mood {
    Happy,
    Sad,
    Party,
    Relax,
    Romantic,
    Melancholy,
    Inspired,
    Neutral,
}

impl Mood {
    /// All labels in rule order.
    pub const ALL: [Mood; 8] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Party,
        Mood::Relax,
        Mood::Romantic,
        Mood::Melancholy,
        Mood::Inspired,
        Mood::Neutral,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Mood::Happy => "Happy",
            Mood::Sad => "Sad",
            Mood::Party => "Party",
            Mood::Relax => "Relax",
            Mood::Romantic => "Romantic",
            Mood::Melancholy => "Melancholy",
            Mood::Inspired => "Inspired",
            Mood::Neutral => "Neutral",
        }
    }

    /// Classify a track from its raw features.
    #[must_use]
    pub fn of(features: &AudioFeatures) -> Self {
        classify(
            features.valence,
            features.energy,
            features.danceability,
            features.acousticness,
            features.tempo,
        )
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names none of the eight moods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMoodError(String);

impl fmt::Display for ParseMoodError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<&str> = Mood::ALL.iter().map(|mood| mood.as_str()).collect();
        write!(f, "unknown mood `{}', expected one of: {}", self.0, labels.join(", "))
    }
}

impl std::error::Error for ParseMoodError {}

impl FromStr for Mood {
    type Err = ParseMoodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ParseMoodError(s.to_string()))
    }
}

/// Assign a mood label from raw (unnormalized) feature values.
///
/// Total and pure: depends on nothing but the five inputs. Comparisons are
/// strict except the `Inspired` tempo window, which includes 100 and 130 BPM.
#[must_use]
pub fn classify(valence: f64, energy: f64, danceability: f64, acousticness: f64, tempo: f64) -> Mood {
    if valence > 0.65 && energy > 0.70 {
        Mood::Happy
    } else if valence < 0.30 && energy < 0.45 {
        Mood::Sad
    } else if energy > 0.75 && danceability > 0.65 {
        Mood::Party
    } else if energy < 0.50 && acousticness > 0.60 && valence < 0.55 {
        Mood::Relax
    } else if energy < 0.55 && valence > 0.45 && tempo < 120.0 {
        Mood::Romantic
    } else if valence < 0.40 && energy < 0.60 && tempo < 110.0 {
        Mood::Melancholy
    } else if valence > 0.50 && energy > 0.55 && (100.0..=130.0).contains(&tempo) {
        Mood::Inspired
    } else {
        Mood::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_rule_reachable() {
        assert_eq!(classify(0.80, 0.80, 0.10, 0.10, 90.0), Mood::Happy);
        assert_eq!(classify(0.10, 0.20, 0.10, 0.10, 90.0), Mood::Sad);
        assert_eq!(classify(0.50, 0.90, 0.80, 0.10, 140.0), Mood::Party);
        assert_eq!(classify(0.35, 0.30, 0.30, 0.90, 140.0), Mood::Relax);
        assert_eq!(classify(0.60, 0.40, 0.30, 0.20, 95.0), Mood::Romantic);
        assert_eq!(classify(0.35, 0.55, 0.30, 0.20, 100.0), Mood::Melancholy);
        assert_eq!(classify(0.60, 0.65, 0.30, 0.20, 115.0), Mood::Inspired);
        assert_eq!(classify(0.50, 0.65, 0.30, 0.20, 150.0), Mood::Neutral);
    }

    #[test]
    fn test_rule_order_prefers_happy_over_party() {
        // Satisfies both the Happy and the Party thresholds.
        assert_eq!(classify(0.70, 0.80, 0.70, 0.10, 125.0), Mood::Happy);
    }

    #[test]
    fn test_inspired_tempo_bounds_inclusive() {
        assert_eq!(classify(0.60, 0.65, 0.30, 0.20, 100.0), Mood::Inspired);
        assert_eq!(classify(0.60, 0.65, 0.30, 0.20, 130.0), Mood::Inspired);
        assert_eq!(classify(0.60, 0.65, 0.30, 0.20, 99.9), Mood::Neutral);
        assert_eq!(classify(0.60, 0.65, 0.30, 0.20, 130.1), Mood::Neutral);
    }

    #[test]
    fn test_strict_thresholds() {
        // valence exactly 0.65 does not satisfy `> 0.65`.
        assert_ne!(classify(0.65, 0.80, 0.10, 0.10, 150.0), Mood::Happy);
        // energy exactly 0.45 does not satisfy `< 0.45`.
        assert_ne!(classify(0.10, 0.45, 0.10, 0.10, 150.0), Mood::Sad);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let inputs = (0..200).map(|i| {
            let x = f64::from(i) / 200.0;
            (x, 1.0 - x, (x * 3.0) % 1.0, (x * 7.0) % 1.0, 60.0 + x * 120.0)
        });
        for (v, e, d, a, t) in inputs {
            assert_eq!(classify(v, e, d, a, t), classify(v, e, d, a, t));
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("happy".parse::<Mood>(), Ok(Mood::Happy));
        assert_eq!(" Melancholy ".parse::<Mood>(), Ok(Mood::Melancholy));
        assert!("Angry".parse::<Mood>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for mood in Mood::ALL {
            assert_eq!(mood.to_string().parse::<Mood>(), Ok(mood));
        }
    }
}
