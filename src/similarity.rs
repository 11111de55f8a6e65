//! Cosine-similarity search over normalized feature vectors.
//!
//! Scores are computed per query and returned as request-scoped values; the
//! catalog is only ever borrowed.

use crate::track::{FeatureVector, Track};
use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;

/// Which track to use as the reference of a similarity query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimilarityQuery {
    /// Track name, matched case-insensitively.
    pub name: String,
    /// Optional artist name to pick among tracks that share a name.
    pub artist: Option<String>,
}

impl SimilarityQuery {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self { name: name.into(), artist: None }
    }

    pub fn by_name_and_artist(name: impl Into<String>, artist: impl Into<String>) -> Self {
        Self { name: name.into(), artist: Some(artist.into()) }
    }
}

/// A track paired with its similarity to the query reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredTrack<'a> {
    #[serde(flatten)]
    pub track: &'a Track,
    pub similarity: f64,
}

/// Outcome of a similarity query. "Not found" is an answer, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SimilarityOutcome<'a> {
    Found {
        reference: &'a Track,
        results: Vec<ScoredTrack<'a>>,
    },
    NotFound {
        query: String,
    },
}

impl<'a> SimilarityOutcome<'a> {
    #[must_use]
    pub fn results(&self) -> &[ScoredTrack<'a>] {
        match self {
            SimilarityOutcome::Found { results, .. } => results,
            SimilarityOutcome::NotFound { .. } => &[],
        }
    }

    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, SimilarityOutcome::Found { .. })
    }
}

/// Cosine of the angle between two vectors, in `[-1, 1]`.
///
/// A zero vector has no direction and scores `0.0` against everything.
#[must_use]
pub fn cosine_similarity(a: &FeatureVector, b: &FeatureVector) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
    }
}

/// Position of the reference track for `query` in dataset order.
///
/// With an artist, the first track matching both name and artist. Without one,
/// the first track matching the name.
#[must_use]
pub fn resolve_reference(query: &SimilarityQuery, tracks: &[Track]) -> Option<usize> {
    let name = query.name.trim();
    if name.is_empty() {
        return None;
    }

    match query.artist.as_deref().map(str::trim) {
        Some(artist) if !artist.is_empty() => tracks
            .iter()
            .position(|track| track.has_name(name) && track.has_artist(artist)),
        _ => {
            let index = tracks.iter().position(|track| track.has_name(name))?;
            let reference = &tracks[index];
            let other_artists = tracks
                .iter()
                .filter(|track| track.has_name(name) && !track.has_artist(&reference.artist))
                .count();
            if other_artists > 0 {
                warn!(
                    "`{name}' matches {other_artists} tracks by other artists, using the one by {}",
                    reference.artist
                );
            }
            Some(index)
        }
    }
}

/// Rank every track not named like the query by similarity to the reference.
///
/// Tracks sharing the query's name are excluded, whoever the artist. Ties keep
/// dataset order.
#[must_use]
pub fn rank_by_similarity<'a>(query: &SimilarityQuery, tracks: &'a [Track]) -> SimilarityOutcome<'a> {
    let Some(index) = resolve_reference(query, tracks) else {
        debug!("No track named `{}'", query.name);
        return SimilarityOutcome::NotFound { query: query.name.clone() };
    };
    let reference = &tracks[index];
    let name = query.name.trim();

    let mut results: Vec<ScoredTrack<'a>> = tracks
        .par_iter()
        .filter(|track| !track.has_name(name))
        .map(|track| ScoredTrack {
            track,
            similarity: cosine_similarity(&reference.vector, &track.vector),
        })
        .collect();

    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    debug!(
        "Ranked {} candidates against `{}' by {}",
        results.len(),
        reference.name,
        reference.artist
    );
    SimilarityOutcome::Found { reference, results }
}
