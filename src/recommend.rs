//! Recommendation selectors.
//!
//! Two modes over the labeled catalog:
//!
//! - **Mood mode**: tracks with a given mood, optionally one genre, ranked by
//!   popularity and served in pages.
//! - **Similarity mode**: the top-N nearest tracks to a reference song.
//!
//! Both modes collapse tracks sharing a `(track name, artist name)` pair to
//! their first occurrence before slicing, so a result never lists the same
//! song twice.

use crate::mood::Mood;
use crate::similarity::{self, ScoredTrack, SimilarityOutcome, SimilarityQuery};
use crate::track::Track;
use log::debug;
use serde::Serialize;
use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Default number of tracks per page in mood mode.
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Default number of results in similarity mode.
pub const DEFAULT_TOP_N: usize = 5;

/// Genre restriction for mood mode.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenreFilter {
    #[default]
    All,
    /// Case-insensitive exact genre name.
    Only(String),
}

impl GenreFilter {
    #[must_use]
    pub fn matches(&self, genre: &str) -> bool {
        match self {
            GenreFilter::All => true,
            GenreFilter::Only(wanted) => wanted.to_lowercase() == genre.to_lowercase(),
        }
    }
}

impl FromStr for GenreFilter {
    type Err = Infallible;

    /// `(All)`, `all`, `*` and the empty string select every genre.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let everything = trimmed.is_empty()
            || trimmed == "*"
            || trimmed.eq_ignore_ascii_case("all")
            || trimmed.eq_ignore_ascii_case("(all)");
        Ok(if everything {
            GenreFilter::All
        } else {
            GenreFilter::Only(trimmed.to_string())
        })
    }
}

impl fmt::Display for GenreFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenreFilter::All => f.write_str("(All)"),
            GenreFilter::Only(genre) => f.write_str(genre),
        }
    }
}

/// A mood-mode request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodRequest {
    pub mood: Mood,
    pub genre: GenreFilter,
    pub page_size: usize,
    pub offset: usize,
}

impl MoodRequest {
    /// First page, all genres, default page size.
    #[must_use]
    pub fn new(mood: Mood) -> Self {
        Self {
            mood,
            genre: GenreFilter::All,
            page_size: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }

    #[must_use]
    pub fn with_genre(self, genre: GenreFilter) -> Self {
        Self { genre, ..self }
    }

    /// Window covering page `page` (zero-based) of `page_size` tracks.
    #[must_use]
    pub fn page(self, page: usize, page_size: usize) -> Self {
        Self {
            page_size,
            offset: page.saturating_mul(page_size),
            ..self
        }
    }
}

/// A contiguous window of a ranked result, plus what is needed to page on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<'a> {
    pub tracks: Vec<&'a Track>,
    pub offset: usize,
    /// Number of distinct tracks matching the request, across all pages.
    pub total: usize,
}

impl Page<'_> {
    /// Whether a further page exists after this one.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.offset.saturating_add(self.tracks.len()) < self.total
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Mood mode: filter, collapse duplicates, rank by popularity, slice.
#[must_use]
pub fn select<'a>(tracks: &'a [Track], request: &MoodRequest) -> Page<'a> {
    let matching = tracks
        .iter()
        .filter(|track| track.mood == request.mood && request.genre.matches(&track.genre));
    let mut ranked = dedupe(matching, |track| track.identity());

    ranked.sort_by(|a, b| {
        b.popularity
            .partial_cmp(&a.popularity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let total = ranked.len();
    let tracks: Vec<&Track> = ranked
        .into_iter()
        .skip(request.offset)
        .take(request.page_size)
        .collect();

    debug!(
        "Mood {} / genre {}: {} distinct tracks, serving {} from offset {}",
        request.mood,
        request.genre,
        total,
        tracks.len(),
        request.offset
    );
    Page { tracks, offset: request.offset, total }
}

/// Similarity mode: the `top_n` closest distinct tracks to the query reference.
#[must_use]
pub fn similar<'a>(tracks: &'a [Track], query: &SimilarityQuery, top_n: usize) -> SimilarityOutcome<'a> {
    match similarity::rank_by_similarity(query, tracks) {
        SimilarityOutcome::Found { reference, results } => {
            let mut results: Vec<ScoredTrack<'a>> = dedupe(results, |scored| scored.track.identity());
            results.truncate(top_n);
            SimilarityOutcome::Found { reference, results }
        }
        not_found @ SimilarityOutcome::NotFound { .. } => not_found,
    }
}

/// Keep the first item for each identity, preserving order.
fn dedupe<'a, T, I, F>(items: I, identity: F) -> Vec<T>
where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> (&'a str, &'a str),
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(identity(item)))
        .collect()
}
