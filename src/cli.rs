//! # Command-Line Interface Module
//!
//! This module defines the command-line interface for Moodtify using Clap
//! derive macros.
//!
//! ## Commands
//!
//! - `moods`: List the mood labels and how many tracks carry each
//! - `genres`: List the genres found in the dataset
//! - `mood`: Most popular tracks for a mood, one page at a time
//! - `similar`: Tracks whose audio features are closest to a given song
//! - `clusters`: Size and dominant mood of each feature cluster
//!
//! ## Examples
//!
//! ```bash
//! moodtify --dataset SpotifyFeatures.csv mood happy --genre pop
//! moodtify mood relax --page 1
//! moodtify similar "Blinding Lights" --artist "The Weeknd" --top 10
//! ```

use crate::mood::Mood;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
#[derive(Parser, Debug)]
#[command(name = "moodtify")]
#[command(about = "Moodtify: mood-tagged and similarity-based track suggestions from audio features")]
#[command(version)]
pub struct Args {
    /// Track feature table (CSV) to load
    ///
    /// Overrides `dataset_path` from the settings file.
    #[arg(long, global = true, env = "MOODTIFY_DATASET", value_hint = clap::ValueHint::FilePath)]
    pub dataset: Option<PathBuf>,

    /// Settings file to use instead of the one in the data directory
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Catalog API client id, needed for --enrich
    #[arg(long, global = true, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    /// Catalog API client secret, needed for --enrich
    #[arg(long, global = true, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the mood labels with their track counts
    Moods,

    /// List every genre in the dataset
    Genres,

    /// Recommend the most popular tracks for a mood
    ///
    /// Duplicate songs (same title and artist) are listed once. Use --page to
    /// walk through further results.
    Mood {
        /// Mood label: happy, sad, party, relax, romantic, melancholy, inspired or neutral
        mood: Mood,

        /// Restrict to one genre ("(All)" for every genre)
        #[arg(short, long)]
        genre: Option<String>,

        /// Zero-based page number
        #[arg(short, long, default_value_t = 0)]
        page: usize,

        /// Tracks per page
        #[arg(long)]
        page_size: Option<usize>,

        /// Fetch album, link and preview metadata for each track
        #[arg(short, long)]
        enrich: bool,
    },

    /// Recommend tracks that sound like a given song
    ///
    /// The song is matched by exact, case-insensitive title. When several
    /// artists share the title, pass --artist to choose one.
    Similar {
        /// Title of the reference song
        #[arg(value_hint = clap::ValueHint::Other)]
        song: String,

        /// Artist of the reference song
        #[arg(short, long)]
        artist: Option<String>,

        /// Number of recommendations
        #[arg(short, long)]
        top: Option<usize>,

        /// Fetch album, link and preview metadata for each track
        #[arg(short, long)]
        enrich: bool,
    },

    /// Show cluster sizes and the dominant mood of each cluster
    Clusters,

    /// Generate shell completions
    ///
    /// Usage: moodtify completion bash > ~/.local/share/bash-completion/completions/moodtify
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}
