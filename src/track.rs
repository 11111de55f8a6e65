//! Track data model.
//!
//! A [`TrackRecord`] is one cleaned dataset row. A [`Track`] is the same row
//! once the catalog has attached its derived columns: mood label, normalized
//! feature vector and cluster id.

use crate::mood::Mood;
use serde::{Deserialize, Serialize};

/// Number of audio features used for scaling, clustering and similarity.
pub const FEATURE_COUNT: usize = 5;

/// Feature vector in column order `valence, energy, danceability, tempo, acousticness`.
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Raw (unnormalized) audio features of a track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub valence: f64,
    pub energy: f64,
    pub danceability: f64,
    pub acousticness: f64,
    /// Beats per minute.
    pub tempo: f64,
}

impl AudioFeatures {
    /// Column order matches the scaler and clustering input.
    #[must_use]
    pub const fn to_vector(&self) -> FeatureVector {
        [self.valence, self.energy, self.danceability, self.tempo, self.acousticness]
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.to_vector().iter().all(|value| value.is_finite())
    }
}

/// One row of the cleaned dataset, before any derived column is computed.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackRecord {
    /// External catalog identifier, absent for some rows.
    pub track_id: Option<String>,
    pub name: String,
    pub artist: String,
    pub genre: String,
    pub popularity: f64,
    pub features: AudioFeatures,
}

/// A labeled track as served by the catalog.
///
/// Built once at load time and never mutated afterwards. Per-query values such
/// as similarity scores live in request-scoped results, not here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    pub track_id: Option<String>,
    pub name: String,
    pub artist: String,
    pub genre: String,
    pub popularity: f64,
    pub features: AudioFeatures,
    pub mood: Mood,
    pub cluster: usize,
    /// Standardized features, the space used by clustering and similarity.
    #[serde(skip)]
    pub vector: FeatureVector,
}

impl Track {
    /// Attach the derived columns to a cleaned record.
    #[must_use]
    pub fn labeled(record: TrackRecord, vector: FeatureVector, cluster: usize) -> Self {
        let mood = Mood::of(&record.features);
        Self {
            track_id: record.track_id,
            name: record.name,
            artist: record.artist,
            genre: record.genre,
            popularity: record.popularity,
            features: record.features,
            mood,
            cluster,
            vector,
        }
    }

    /// Case-insensitive exact match on the track name.
    #[must_use]
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Case-insensitive exact match on the artist name.
    #[must_use]
    pub fn has_artist(&self, artist: &str) -> bool {
        self.artist.to_lowercase() == artist.to_lowercase()
    }

    /// Identity used for de-duplicating results.
    #[must_use]
    pub fn identity(&self) -> (&str, &str) {
        (&self.name, &self.artist)
    }
}
