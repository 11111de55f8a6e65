//! Loading and cleaning of the track feature table.
//!
//! The input is a header-addressed delimited text file. Columns the engine
//! does not use (duration, key, loudness, ...) are ignored. Cleaning mirrors
//! what has to hold before any derived column is computed:
//!
//! 1. exact duplicate rows collapse to their first occurrence,
//! 2. rows with a missing, unparsable or non-finite required value are dropped.

use crate::track::{AudioFeatures, TrackRecord};
use anyhow::{bail, Context, Result};
use csv::StringRecord;
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Columns every dataset must provide.
pub const REQUIRED_COLUMNS: [&str; 9] = [
    "genre",
    "artist_name",
    "track_name",
    "popularity",
    "acousticness",
    "danceability",
    "energy",
    "tempo",
    "valence",
];

#[derive(Debug, Deserialize)]
struct Row {
    genre: String,
    artist_name: String,
    track_name: String,
    #[serde(default)]
    track_id: Option<String>,
    popularity: f64,
    acousticness: f64,
    danceability: f64,
    energy: f64,
    tempo: f64,
    valence: f64,
}

impl Row {
    fn into_record(self) -> Option<TrackRecord> {
        let features = AudioFeatures {
            valence: self.valence,
            energy: self.energy,
            danceability: self.danceability,
            acousticness: self.acousticness,
            tempo: self.tempo,
        };
        let text_present = [&self.genre, &self.artist_name, &self.track_name]
            .iter()
            .all(|value| !value.trim().is_empty());
        if !text_present || !features.is_finite() || !self.popularity.is_finite() {
            return None;
        }

        Some(TrackRecord {
            track_id: self.track_id.filter(|id| !id.trim().is_empty()),
            name: self.track_name,
            artist: self.artist_name,
            genre: self.genre,
            popularity: self.popularity,
            features,
        })
    }
}

/// Counters reported after a load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    pub duplicates: usize,
    pub malformed: usize,
    pub kept: usize,
}

/// Load and clean the dataset at `path`.
///
/// # Errors
///
/// Fails if the file cannot be opened, lacks a required column, or holds no
/// usable row after cleaning.
pub fn load_tracks(path: &Path) -> Result<Vec<TrackRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open dataset at {}", path.display()))?;
    let (records, report) = read_tracks(file)
        .with_context(|| format!("Failed to read dataset at {}", path.display()))?;
    info!(
        "Loaded {} tracks from {} ({} rows, {} duplicates, {} malformed)",
        report.kept,
        path.display(),
        report.rows,
        report.duplicates,
        report.malformed
    );
    Ok(records)
}

/// Parse and clean a dataset from any reader.
///
/// # Errors
///
/// Fails on unreadable CSV structure, a missing required column, or an
/// empty result.
pub fn read_tracks<R: Read>(reader: R) -> Result<(Vec<TrackRecord>, LoadReport)> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv_reader.headers().context("Dataset has no header row")?.clone();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|header| header.trim() == *column))
        .collect();
    if !missing.is_empty() {
        bail!("Dataset is missing required columns: {}", missing.join(", "));
    }
    let headers = trimmed(&headers);

    let mut report = LoadReport::default();
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut records = Vec::new();

    for (line, result) in csv_reader.records().enumerate() {
        report.rows += 1;
        let raw = match result {
            Ok(raw) => raw,
            Err(err) => {
                debug!("Skipping unreadable row {}: {err}", line + 2);
                report.malformed += 1;
                continue;
            }
        };

        if !seen.insert(raw.iter().map(str::to_owned).collect()) {
            report.duplicates += 1;
            continue;
        }

        match raw.deserialize::<Row>(Some(&headers)).ok().and_then(Row::into_record) {
            Some(record) => records.push(record),
            None => {
                debug!("Skipping row {} with missing or invalid values", line + 2);
                report.malformed += 1;
            }
        }
    }

    if report.malformed > 0 {
        warn!("Dropped {} rows with missing or invalid values", report.malformed);
    }
    report.kept = records.len();
    if records.is_empty() {
        bail!("Dataset contains no usable tracks after cleaning");
    }

    Ok((records, report))
}

fn trimmed(headers: &StringRecord) -> StringRecord {
    headers.iter().map(str::trim).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "genre,artist_name,track_name,track_id,popularity,acousticness,danceability,duration_ms,energy,instrumentalness,key,liveness,loudness,mode,speechiness,tempo,time_signature,valence";

    fn dataset(rows: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for row in rows {
            text.push('\n');
            text.push_str(row);
        }
        text
    }

    #[test]
    fn test_reads_required_columns_and_ignores_the_rest() {
        let text = dataset(&[
            "Pop,Artist,Song,abc123,61,0.12,0.70,210000,0.80,0.0,C#,0.1,-5.2,Major,0.04,118.0,4/4,0.75",
        ]);
        let (records, report) = read_tracks(text.as_bytes()).unwrap();
        assert_eq!(report.kept, 1);
        let record = &records[0];
        assert_eq!(record.name, "Song");
        assert_eq!(record.artist, "Artist");
        assert_eq!(record.track_id.as_deref(), Some("abc123"));
        assert_eq!(record.popularity, 61.0);
        assert_eq!(record.features.tempo, 118.0);
        assert_eq!(record.features.valence, 0.75);
    }

    #[test]
    fn test_exact_duplicates_collapse() {
        let row = "Pop,Artist,Song,abc123,61,0.12,0.70,210000,0.80,0.0,C#,0.1,-5.2,Major,0.04,118.0,4/4,0.75";
        let same_song_other_genre = "Dance,Artist,Song,abc123,61,0.12,0.70,210000,0.80,0.0,C#,0.1,-5.2,Major,0.04,118.0,4/4,0.75";
        let text = dataset(&[row, row, same_song_other_genre]);
        let (records, report) = read_tracks(text.as_bytes()).unwrap();
        assert_eq!(report.duplicates, 1);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].genre, "Dance");
    }

    #[test]
    fn test_rows_with_missing_values_are_dropped() {
        let text = dataset(&[
            "Pop,Artist,Good,abc,61,0.12,0.70,210000,0.80,0.0,C#,0.1,-5.2,Major,0.04,118.0,4/4,0.75",
            "Pop,Artist,NoEnergy,abc,61,0.12,0.70,210000,,0.0,C#,0.1,-5.2,Major,0.04,118.0,4/4,0.75",
            "Pop,,NoArtist,abc,61,0.12,0.70,210000,0.80,0.0,C#,0.1,-5.2,Major,0.04,118.0,4/4,0.75",
            "Pop,Artist,BadTempo,abc,61,0.12,0.70,210000,0.80,0.0,C#,0.1,-5.2,Major,0.04,fast,4/4,0.75",
        ]);
        let (records, report) = read_tracks(text.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Good");
        assert_eq!(report.malformed, 3);
    }

    #[test]
    fn test_missing_track_id_is_kept_as_absent() {
        let text = dataset(&[
            "Pop,Artist,Song,,61,0.12,0.70,210000,0.80,0.0,C#,0.1,-5.2,Major,0.04,118.0,4/4,0.75",
        ]);
        let (records, _) = read_tracks(text.as_bytes()).unwrap();
        assert_eq!(records[0].track_id, None);
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let text = "genre,artist_name,track_name,popularity,energy\nPop,A,S,1,0.5";
        let err = read_tracks(text.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("acousticness"));
    }

    #[test]
    fn test_empty_after_cleaning_is_fatal() {
        let text = dataset(&[]);
        assert!(read_tracks(text.as_bytes()).is_err());
    }
}
