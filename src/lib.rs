//! Mood-tagged and similarity-based track suggestions from audio features.
//!
//! Core modules:
//! - [`mood`] - Rule-based mood labels
//! - [`normalize`] - Feature standardization
//! - [`cluster`] - Seeded k-means over normalized features
//! - [`similarity`] - Cosine-similarity search
//! - [`recommend`] - Mood-mode and similarity-mode selectors
//! - [`catalog`] - Loaded, labeled and fitted track collection
//!
//! ### Supporting Modules
//!
//! - [`track`] - Track data model
//! - [`dataset`] - CSV loading and cleaning
//! - [`enrich`] - Optional metadata from an external music catalog
//! - [`db`] - SQLite cache for enrichment lookups
//! - [`config`] - Data directory and settings file
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use moodtify::catalog::Catalog;
//! use moodtify::cluster::KMeansParams;
//! use moodtify::mood::Mood;
//! use moodtify::recommend::MoodRequest;
//! use moodtify::similarity::{SimilarityOutcome, SimilarityQuery};
//! use std::path::Path;
//!
//! // Load, label, normalize and cluster once
//! let catalog = Catalog::load(Path::new("SpotifyFeatures.csv"), &KMeansParams::default())?;
//!
//! // Five most popular happy tracks
//! let page = catalog.recommend_by_mood(&MoodRequest::new(Mood::Happy));
//! for track in &page.tracks {
//!     println!("{} - {}", track.name, track.artist);
//! }
//!
//! // Five tracks closest to a song
//! match catalog.recommend_similar(&SimilarityQuery::by_name("Blinding Lights"), 5) {
//!     SimilarityOutcome::Found { results, .. } => {
//!         for scored in results {
//!             println!("{:.3} {}", scored.similarity, scored.track.name);
//!         }
//!     }
//!     SimilarityOutcome::NotFound { query } => println!("{query} not found"),
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Pipeline
//!
//! Data flows one way, once per process:
//!
//! 1. [`dataset`] parses the table and drops duplicate and incomplete rows.
//! 2. [`mood`] labels every track from its raw features.
//! 3. [`normalize`] fits the scaler over the whole collection.
//! 4. [`cluster`] partitions the normalized vectors into six groups.
//!
//! Queries then only filter, rank and slice. Similarity scores belong to the
//! query result and are never written back into the catalog.
//!
//! ## Error Handling
//!
//! Fallible functions return `anyhow::Result`. Load and fit failures are
//! fatal; an unknown song in similarity mode is a regular
//! [`similarity::SimilarityOutcome::NotFound`] answer, and enrichment
//! failures simply leave the metadata out.

pub mod catalog;
pub mod cli;
pub mod cluster;
pub mod completion;
pub mod config;
pub mod dataset;
pub mod db;
pub mod enrich;
pub mod mood;
pub mod normalize;
pub mod recommend;
pub mod similarity;
pub mod track;
