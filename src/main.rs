//! # Moodtify
//!
//! Track suggestions from audio features: pick a mood and get the most
//! popular matching songs, or name a song and get the ones that sound most
//! like it.
//!
//! ## Usage
//!
//! ```bash
//! # Mood catalog and genres in the dataset
//! moodtify --dataset SpotifyFeatures.csv moods
//! moodtify genres
//!
//! # Five most popular happy pop tracks, then the next five
//! moodtify mood happy --genre pop
//! moodtify mood happy --genre pop --page 1
//!
//! # Songs that sound like a given one, with album art and links
//! SPOTIFY_CLIENT_ID=... SPOTIFY_CLIENT_SECRET=... moodtify similar "Song" --enrich
//! ```

use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info, warn};
use moodtify::catalog::Catalog;
use moodtify::cli;
use moodtify::completion;
use moodtify::config::{self, Settings};
use moodtify::db::EnrichmentCache;
use moodtify::enrich::{CachedSource, Credentials, Enricher, SpotifyClient, TrackInfo};
use moodtify::recommend::{GenreFilter, MoodRequest};
use moodtify::similarity::{SimilarityOutcome, SimilarityQuery};
use moodtify::track::Track;
use serde::Serialize;
use serde_json::json;

/// One printed recommendation.
#[derive(Serialize)]
struct Row<'a> {
    #[serde(flatten)]
    track: &'a Track,
    #[serde(skip_serializing_if = "Option::is_none")]
    similarity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enrichment: Option<TrackInfo>,
}

/// Main entry point for the Moodtify application.
///
/// Initializes logging, parses command-line arguments, loads the catalog
/// once and routes the command. Logging is controlled via `RUST_LOG`:
/// - `RUST_LOG=debug moodtify mood happy` - Enable debug logging
/// - `RUST_LOG=moodtify::cluster=trace moodtify clusters` - Module-specific logging
fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();

    if let cli::Command::Completion { shell } = &args.command {
        let mut cmd = cli::Args::command();
        completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        return Ok(());
    }

    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(dataset) = &args.dataset {
        settings.dataset_path = dataset.clone();
    }
    let dataset = settings.resolved_dataset_path()?;

    info!("Loading catalog from {}", dataset.display());
    let catalog = Catalog::load(&dataset, &settings.kmeans_params())
        .context("Cannot serve recommendations without a loaded catalog")?;

    match &args.command {
        cli::Command::Moods => print_moods(&catalog, args.json)?,
        cli::Command::Genres => print_genres(&catalog, args.json)?,
        cli::Command::Mood { mood, genre, page, page_size, enrich } => {
            let page_size = page_size.unwrap_or(settings.page_size);
            if page_size == 0 {
                bail!("Page size must be at least 1");
            }
            let genre = genre
                .as_deref()
                .map_or(GenreFilter::All, |g| g.parse().unwrap_or_default());
            if let GenreFilter::Only(wanted) = &genre {
                if !catalog.genres().iter().any(|g| g.eq_ignore_ascii_case(wanted)) {
                    warn!("Genre `{wanted}' does not occur in the dataset");
                }
            }

            let request = MoodRequest::new(*mood).with_genre(genre).page(*page, page_size);
            let enricher = enricher_if(*enrich, &args, &settings);
            print_mood_page(&catalog, &request, *page, enricher.as_ref(), args.json)?;
        }
        cli::Command::Similar { song, artist, top, enrich } => {
            let query = SimilarityQuery { name: song.clone(), artist: artist.clone() };
            let top_n = top.unwrap_or(settings.top_n);
            let enricher = enricher_if(*enrich, &args, &settings);
            print_similar(&catalog, &query, top_n, enricher.as_ref(), args.json)?;
        }
        cli::Command::Clusters => print_clusters(&catalog, args.json)?,
        cli::Command::Completion { .. } => unreachable!("handled before loading the catalog"),
    }

    Ok(())
}

/// Build the enrichment pipeline when requested. Any problem only disables enrichment.
fn enricher_if(requested: bool, args: &cli::Args, settings: &Settings) -> Option<Enricher> {
    if !requested {
        return None;
    }
    let Some(credentials) = Credentials::from_parts(args.client_id.clone(), args.client_secret.clone())
    else {
        warn!("Enrichment needs SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET, continuing without metadata");
        return None;
    };

    let client = match SpotifyClient::new(credentials, settings.request_timeout()) {
        Ok(client) => client,
        Err(err) => {
            warn!("Continuing without metadata: {err:#}");
            return None;
        }
    };

    if settings.enrichment_cache {
        match config::get_cache_path().and_then(|path| EnrichmentCache::open(&path)) {
            Ok(cache) => return Some(Enricher::new(CachedSource::new(client, cache))),
            Err(err) => warn!("Enrichment cache unavailable, looking up directly: {err:#}"),
        }
    }
    Some(Enricher::new(client))
}

fn enrichment(enricher: Option<&Enricher>, track: &Track) -> Option<TrackInfo> {
    enricher.and_then(|enricher| enricher.enrich(track))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).context("Failed to encode JSON output")?);
    Ok(())
}

fn print_moods(catalog: &Catalog, as_json: bool) -> Result<()> {
    let counts = catalog.mood_counts();
    if as_json {
        let moods: Vec<_> = counts
            .iter()
            .map(|(mood, count)| json!({ "mood": mood, "tracks": count }))
            .collect();
        return print_json(&moods);
    }

    for (mood, count) in counts {
        println!("{:<12} {count:>8}", mood.as_str());
    }
    Ok(())
}

fn print_genres(catalog: &Catalog, as_json: bool) -> Result<()> {
    let genres = catalog.genres();
    if as_json {
        return print_json(&genres);
    }
    for genre in genres {
        println!("{genre}");
    }
    Ok(())
}

fn print_mood_page(
    catalog: &Catalog,
    request: &MoodRequest,
    page_number: usize,
    enricher: Option<&Enricher>,
    as_json: bool,
) -> Result<()> {
    let page = catalog.recommend_by_mood(request);
    debug!("Serving page {page_number} of mood {}", request.mood);

    let rows: Vec<Row<'_>> = page
        .tracks
        .iter()
        .map(|&track| Row { track, similarity: None, enrichment: enrichment(enricher, track) })
        .collect();

    if as_json {
        return print_json(&json!({
            "mood": request.mood,
            "genre": request.genre.to_string(),
            "page": page_number,
            "offset": page.offset,
            "total": page.total,
            "has_more": page.has_more(),
            "tracks": rows,
        }));
    }

    if page.is_empty() {
        if page.total == 0 {
            println!("No {} tracks for genre {}.", request.mood, request.genre);
        } else {
            println!("Page {page_number} is past the last of {} results.", page.total);
        }
        return Ok(());
    }

    println!(
        "Top {} tracks for genre {} (page {} of {}, {} tracks)",
        request.mood,
        request.genre,
        page_number + 1,
        page.total.div_ceil(request.page_size),
        page.total
    );
    println!();
    for (position, row) in rows.iter().enumerate() {
        print_row(page.offset + position + 1, row);
    }
    if page.has_more() {
        println!("More results: add --page {}", page_number + 1);
    }
    Ok(())
}

fn print_similar(
    catalog: &Catalog,
    query: &SimilarityQuery,
    top_n: usize,
    enricher: Option<&Enricher>,
    as_json: bool,
) -> Result<()> {
    match catalog.recommend_similar(query, top_n) {
        SimilarityOutcome::NotFound { query } => {
            if as_json {
                return print_json(&json!({ "found": false, "query": query }));
            }
            println!("Song `{query}' was not found in the dataset.");
        }
        SimilarityOutcome::Found { reference, results } => {
            let rows: Vec<Row<'_>> = results
                .iter()
                .map(|scored| Row {
                    track: scored.track,
                    similarity: Some(scored.similarity),
                    enrichment: enrichment(enricher, scored.track),
                })
                .collect();

            if as_json {
                return print_json(&json!({
                    "found": true,
                    "reference": reference,
                    "tracks": rows,
                }));
            }

            println!(
                "Tracks similar to {} - {} ({}, {})",
                reference.name, reference.artist, reference.genre, reference.mood
            );
            println!();
            for (position, row) in rows.iter().enumerate() {
                print_row(position + 1, row);
            }
        }
    }
    Ok(())
}

fn print_clusters(catalog: &Catalog, as_json: bool) -> Result<()> {
    let summary = catalog.cluster_summary();
    if as_json {
        return print_json(&summary);
    }
    println!(
        "{} tracks in {} clusters (inertia {:.2})",
        catalog.len(),
        summary.len(),
        catalog.model().clusters.inertia()
    );
    for cluster in summary {
        let dominant = cluster.dominant_mood.map_or("-", |mood| mood.as_str());
        println!("cluster {:>2}  {:>8} tracks  mostly {dominant}", cluster.cluster, cluster.size);
    }
    Ok(())
}

fn print_row(position: usize, row: &Row<'_>) {
    let track = row.track;
    match row.similarity {
        Some(similarity) => println!(
            "{position:>3}. {} - {}  [{}, {}, similarity {similarity:.3}]",
            track.name, track.artist, track.genre, track.mood
        ),
        None => println!(
            "{position:>3}. {} - {}  [{}, popularity {}]",
            track.name, track.artist, track.genre, track.popularity
        ),
    }
    if let Some(info) = &row.enrichment {
        println!("     album:   {}", info.album);
        println!("     listen:  {}", info.external_url);
        if let Some(image) = &info.image_url {
            println!("     cover:   {image}");
        }
        if let Some(preview) = &info.preview_url {
            println!("     preview: {preview}");
        }
    }
}
