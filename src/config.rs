//! # Configuration Module
//!
//! This module handles configuration management and data directory setup for
//! Moodtify. It provides platform-appropriate data storage locations and the
//! optional settings file.
//!
//! ## Data Storage
//!
//! Moodtify stores its enrichment cache and settings in the platform-standard
//! data directory:
//! - Linux: `~/.local/share/moodtify/`
//! - macOS: `~/Library/Application Support/moodtify/`
//! - Windows: `%APPDATA%\moodtify\`
//!
//! ## Settings File
//!
//! `config.json` in the data directory, every field optional:
//!
//! ```json
//! { "dataset_path": "/data/SpotifyFeatures.csv", "page_size": 10, "clusters": 6 }
//! ```
//!
//! Command-line flags take precedence over the file.

use crate::cluster::KMeansParams;
use crate::recommend::{DEFAULT_PAGE_SIZE, DEFAULT_TOP_N};
use anyhow::{Context, Result};
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "moodtify";

/// Returns the platform-appropriate data directory for Moodtify, creating it
/// if needed.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The moodtify subdirectory cannot be created due to permissions
///
/// # Examples
///
/// ```no_run
/// use moodtify::config::get_data_dir;
///
/// let data_dir = get_data_dir()?;
/// println!("Data location: {}", data_dir.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;

    let app_dir = data_dir.join(APP_DIR);
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create Moodtify data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir)
}

/// Path of the enrichment cache database.
pub fn get_cache_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("enrichment.db"))
}

/// Path of the default settings file. The file itself may not exist.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("config.json"))
}

/// User-tunable settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Track feature table to load at startup.
    pub dataset_path: PathBuf,
    /// Tracks per page in mood mode.
    pub page_size: usize,
    /// Results in similarity mode.
    pub top_n: usize,
    pub clusters: usize,
    pub seed: u64,
    pub max_iterations: usize,
    /// Upper bound on each enrichment HTTP request.
    pub request_timeout_secs: u64,
    /// Keep enrichment lookups in a local SQLite cache.
    pub enrichment_cache: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let clustering = KMeansParams::default();
        Self {
            dataset_path: PathBuf::from("SpotifyFeatures.csv"),
            page_size: DEFAULT_PAGE_SIZE,
            top_n: DEFAULT_TOP_N,
            clusters: clustering.k,
            seed: clustering.seed,
            max_iterations: clustering.max_iterations,
            request_timeout_secs: 10,
            enrichment_cache: true,
        }
    }
}

impl Settings {
    /// Load settings from `explicit` if given, else from the default settings
    /// file when it exists, else defaults.
    ///
    /// # Errors
    ///
    /// An explicit file that is missing, or any file that is not valid JSON.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = get_settings_path()?;
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    #[must_use]
    pub fn kmeans_params(&self) -> KMeansParams {
        KMeansParams {
            k: self.clusters,
            seed: self.seed,
            max_iterations: self.max_iterations,
            ..KMeansParams::default()
        }
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Dataset path made absolute against the current directory.
    pub fn resolved_dataset_path(&self) -> Result<PathBuf> {
        let absolute = self.dataset_path.absolutize().with_context(|| {
            format!("Failed to resolve dataset path {}", self.dataset_path.display())
        })?;
        Ok(absolute.into_owned())
    }
}
