//! Process-wide recommendation state.
//!
//! A [`Catalog`] owns the labeled tracks together with the model they were
//! derived from. It is built once by an explicit load step, then only read.
//! [`Catalog::reload`] rebuilds everything from scratch and swaps it in whole,
//! so the scaler and the cluster ids always come from the same fit.

use crate::cluster::{ClusterModel, KMeansParams};
use crate::dataset;
use crate::mood::Mood;
use crate::normalize::FeatureScaler;
use crate::recommend::{self, MoodRequest, Page};
use crate::similarity::{SimilarityOutcome, SimilarityQuery};
use crate::track::{FeatureVector, Track, TrackRecord};
use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Immutable snapshot of everything fitted at load time.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedModel {
    pub scaler: FeatureScaler,
    pub clusters: ClusterModel,
    pub params: KMeansParams,
}

/// Per-cluster overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterSummary {
    pub cluster: usize,
    pub size: usize,
    /// Most frequent mood, `None` for an empty cluster.
    pub dominant_mood: Option<Mood>,
}

/// Labeled, clustered track collection plus its fitted model.
#[derive(Debug, Clone)]
pub struct Catalog {
    tracks: Vec<Track>,
    model: FittedModel,
    source: Option<PathBuf>,
}

impl Catalog {
    /// Load the dataset at `path` and fit the model over it.
    ///
    /// # Errors
    ///
    /// Any load or fit failure. The catalog cannot serve anything without both.
    pub fn load(path: &Path, params: &KMeansParams) -> Result<Self> {
        let records = dataset::load_tracks(path)?;
        let mut catalog = Self::from_records(records, params)
            .with_context(|| format!("Failed to prepare catalog from {}", path.display()))?;
        catalog.source = Some(path.to_path_buf());
        Ok(catalog)
    }

    /// Label, normalize and cluster already cleaned records.
    ///
    /// # Errors
    ///
    /// Fails when the scaler or clustering cannot be fit, e.g. on an empty
    /// collection or fewer tracks than clusters.
    pub fn from_records(records: Vec<TrackRecord>, params: &KMeansParams) -> Result<Self> {
        let raw: Vec<FeatureVector> = records.iter().map(|record| record.features.to_vector()).collect();
        let scaler = FeatureScaler::fit(&raw).context("Failed to fit feature scaler")?;
        let vectors = scaler.transform_all(&raw);
        let clusters = ClusterModel::fit_predict(&vectors, params).context("Failed to cluster tracks")?;

        let tracks: Vec<Track> = records
            .into_iter()
            .zip(vectors)
            .zip(clusters.labels())
            .map(|((record, vector), &cluster)| Track::labeled(record, vector, cluster))
            .collect();

        info!("Catalog ready: {} tracks, {} clusters", tracks.len(), params.k);
        Ok(Self {
            tracks,
            model: FittedModel { scaler, clusters, params: *params },
            source: None,
        })
    }

    /// Rebuild from `path` and replace the current state only on success.
    ///
    /// # Errors
    ///
    /// Load or fit failures; the existing state is left untouched.
    pub fn reload(&mut self, path: &Path, params: &KMeansParams) -> Result<()> {
        let fresh = Self::load(path, params)?;
        *self = fresh;
        info!("Catalog reloaded from {}", path.display());
        Ok(())
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub const fn model(&self) -> &FittedModel {
        &self.model
    }

    /// Dataset the catalog was loaded from, if any.
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Distinct genres, sorted.
    #[must_use]
    pub fn genres(&self) -> Vec<&str> {
        self.tracks
            .iter()
            .map(|track| track.genre.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Track count for each of the eight moods, in rule order.
    #[must_use]
    pub fn mood_counts(&self) -> Vec<(Mood, usize)> {
        Mood::ALL
            .iter()
            .map(|&mood| (mood, self.tracks.iter().filter(|track| track.mood == mood).count()))
            .collect()
    }

    /// Size and dominant mood of every cluster.
    #[must_use]
    pub fn cluster_summary(&self) -> Vec<ClusterSummary> {
        (0..self.model.params.k)
            .map(|cluster| {
                let members: Vec<&Track> = self.tracks.iter().filter(|t| t.cluster == cluster).collect();
                let dominant_mood = Mood::ALL
                    .iter()
                    .map(|&mood| (mood, members.iter().filter(|t| t.mood == mood).count()))
                    .filter(|&(_, count)| count > 0)
                    // `max_by_key` keeps the last maximum, so walk in reverse to favour rule order.
                    .rev()
                    .max_by_key(|&(_, count)| count)
                    .map(|(mood, _)| mood);
                ClusterSummary { cluster, size: members.len(), dominant_mood }
            })
            .collect()
    }

    /// Mood-mode recommendations.
    #[must_use]
    pub fn recommend_by_mood(&self, request: &MoodRequest) -> Page<'_> {
        recommend::select(&self.tracks, request)
    }

    /// Similarity-mode recommendations.
    #[must_use]
    pub fn recommend_similar(&self, query: &SimilarityQuery, top_n: usize) -> SimilarityOutcome<'_> {
        recommend::similar(&self.tracks, query, top_n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::AudioFeatures;

    fn record(name: &str, genre: &str, valence: f64, energy: f64, popularity: f64) -> TrackRecord {
        TrackRecord {
            track_id: None,
            name: name.to_string(),
            artist: format!("{name} Artist"),
            genre: genre.to_string(),
            popularity,
            features: AudioFeatures {
                valence,
                energy,
                danceability: 0.5,
                acousticness: 0.3,
                tempo: 90.0 + valence * 60.0,
            },
        }
    }

    fn records() -> Vec<TrackRecord> {
        (0..24)
            .map(|i| {
                let x = f64::from(i) / 24.0;
                let genre = if i % 2 == 0 { "Pop" } else { "Rock" };
                record(&format!("Song {i}"), genre, x, 1.0 - x * 0.5, f64::from(i))
            })
            .collect()
    }

    fn small_params() -> KMeansParams {
        KMeansParams { k: 3, ..KMeansParams::default() }
    }

    #[test]
    fn test_every_track_labeled_and_clustered() {
        let catalog = Catalog::from_records(records(), &small_params()).unwrap();
        assert_eq!(catalog.len(), 24);
        assert!(catalog.tracks().iter().all(|t| t.cluster < 3));
        let counted: usize = catalog.mood_counts().iter().map(|(_, n)| n).sum();
        assert_eq!(counted, 24);
    }

    #[test]
    fn test_track_vectors_come_from_fitted_scaler() {
        let catalog = Catalog::from_records(records(), &small_params()).unwrap();
        let scaler = &catalog.model().scaler;
        for track in catalog.tracks() {
            assert_eq!(track.vector, scaler.transform(&track.features.to_vector()));
        }
    }

    #[test]
    fn test_genre_catalog_sorted_and_distinct() {
        let catalog = Catalog::from_records(records(), &small_params()).unwrap();
        assert_eq!(catalog.genres(), vec!["Pop", "Rock"]);
    }

    #[test]
    fn test_cluster_summary_covers_all_tracks() {
        let catalog = Catalog::from_records(records(), &small_params()).unwrap();
        let summary = catalog.cluster_summary();
        assert_eq!(summary.len(), 3);
        assert_eq!(summary.iter().map(|s| s.size).sum::<usize>(), 24);
        assert!(summary.iter().all(|s| s.size == 0 || s.dominant_mood.is_some()));
    }

    #[test]
    fn test_too_few_tracks_is_fatal() {
        let few: Vec<TrackRecord> = records().into_iter().take(2).collect();
        assert!(Catalog::from_records(few, &small_params()).is_err());
    }

    #[test]
    fn test_queries_do_not_mutate_catalog() {
        let catalog = Catalog::from_records(records(), &small_params()).unwrap();
        let before = catalog.tracks().to_vec();
        let _ = catalog.recommend_similar(&SimilarityQuery::by_name("Song 3"), 5);
        let _ = catalog.recommend_similar(&SimilarityQuery::by_name("Song 17"), 5);
        assert_eq!(catalog.tracks(), before.as_slice());
    }
}
