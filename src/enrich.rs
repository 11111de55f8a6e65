//! Optional track metadata from an external music catalog.
//!
//! Enrichment is best effort. A missing identifier, a missing token, a
//! timeout or a non-success response all degrade to "no metadata" and never
//! block a recommendation.

use crate::db::EnrichmentCache;
use crate::track::Track;
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::time::Duration;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";

/// Display metadata for one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub name: String,
    pub artist: String,
    pub album: String,
    pub image_url: Option<String>,
    pub external_url: String,
    pub preview_url: Option<String>,
}

/// Anything that can look up [`TrackInfo`] by external track id.
pub trait MetadataSource {
    /// `None` whenever the metadata is unavailable, for whatever reason.
    fn track_info(&self, track_id: &str) -> Option<TrackInfo>;
}

/// Client-credentials pair for the catalog API.
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    /// Both halves present and non-empty, or `None`.
    #[must_use]
    pub fn from_parts(client_id: Option<String>, client_secret: Option<String>) -> Option<Self> {
        match (client_id, client_secret) {
            (Some(client_id), Some(client_secret))
                if !client_id.trim().is_empty() && !client_secret.trim().is_empty() =>
            {
                Some(Self { client_id, client_secret })
            }
            _ => None,
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct ApiTrack {
    name: String,
    artists: Vec<ApiNamed>,
    album: ApiAlbum,
    external_urls: ApiExternalUrls,
    preview_url: Option<String>,
}

#[derive(Deserialize)]
struct ApiNamed {
    name: String,
}

#[derive(Deserialize)]
struct ApiAlbum {
    name: String,
    #[serde(default)]
    images: Vec<ApiImage>,
}

#[derive(Deserialize)]
struct ApiImage {
    url: String,
}

#[derive(Deserialize)]
struct ApiExternalUrls {
    spotify: String,
}

impl ApiTrack {
    fn into_info(self) -> Option<TrackInfo> {
        let artist = self.artists.into_iter().next()?.name;
        Some(TrackInfo {
            name: self.name,
            artist,
            album: self.album.name,
            image_url: self.album.images.into_iter().next().map(|image| image.url),
            external_url: self.external_urls.spotify,
            preview_url: self.preview_url,
        })
    }
}

/// Blocking Spotify Web API client.
///
/// The access token is requested lazily on the first lookup and reused for
/// the rest of the process; a failed exchange disables lookups.
pub struct SpotifyClient {
    http: reqwest::blocking::Client,
    credentials: Credentials,
    token: OnceCell<Option<String>>,
    token_url: String,
    api_base: String,
}

impl SpotifyClient {
    pub fn new(credentials: Credentials, timeout: Duration) -> Result<Self> {
        Self::with_endpoints(credentials, timeout, TOKEN_URL, API_BASE)
    }

    /// Same as [`SpotifyClient::new`] against different endpoints.
    pub fn with_endpoints(
        credentials: Credentials,
        timeout: Duration,
        token_url: &str,
        api_base: &str,
    ) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            credentials,
            token: OnceCell::new(),
            token_url: token_url.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    fn token(&self) -> Option<&str> {
        self.token
            .get_or_init(|| match self.fetch_token() {
                Ok(token) => {
                    info!("Obtained catalog API access token");
                    Some(token)
                }
                Err(err) => {
                    warn!("Catalog API token exchange failed, enrichment disabled: {err:#}");
                    None
                }
            })
            .as_deref()
    }

    fn fetch_token(&self) -> Result<String> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .context("Token request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Token request rejected with status {status}");
        }
        let body: TokenResponse = response.json().context("Failed to parse token response")?;
        Ok(body.access_token)
    }

    fn fetch_track(&self, track_id: &str, token: &str) -> Result<Option<TrackInfo>> {
        let url = format!("{}/tracks/{track_id}", self.api_base);
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .with_context(|| format!("Track request for {track_id} failed"))?;

        let status = response.status();
        if !status.is_success() {
            debug!("Track lookup for {track_id} returned {status}");
            return Ok(None);
        }
        let track: ApiTrack = response
            .json()
            .with_context(|| format!("Failed to parse track {track_id}"))?;
        Ok(track.into_info())
    }
}

impl MetadataSource for SpotifyClient {
    fn track_info(&self, track_id: &str) -> Option<TrackInfo> {
        if !is_valid_track_id(track_id) {
            debug!("Not looking up malformed track id `{track_id}'");
            return None;
        }
        let token = self.token()?;
        match self.fetch_track(track_id, token) {
            Ok(info) => info,
            Err(err) => {
                warn!("Enrichment unavailable for {track_id}: {err:#}");
                None
            }
        }
    }
}

/// Read-through SQLite cache in front of another source.
pub struct CachedSource<S> {
    inner: S,
    cache: EnrichmentCache,
}

impl<S: MetadataSource> CachedSource<S> {
    pub const fn new(inner: S, cache: EnrichmentCache) -> Self {
        Self { inner, cache }
    }
}

impl<S: MetadataSource> MetadataSource for CachedSource<S> {
    fn track_info(&self, track_id: &str) -> Option<TrackInfo> {
        match self.cache.get(track_id) {
            Ok(Some(info)) => return Some(info),
            Ok(None) => {}
            Err(err) => warn!("Enrichment cache read failed: {err:#}"),
        }

        let info = self.inner.track_info(track_id)?;
        if let Err(err) = self.cache.put(track_id, &info) {
            warn!("Enrichment cache write failed: {err:#}");
        }
        Some(info)
    }
}

/// Attaches metadata to recommended tracks.
pub struct Enricher {
    source: Box<dyn MetadataSource>,
}

impl Enricher {
    pub fn new(source: impl MetadataSource + 'static) -> Self {
        Self { source: Box::new(source) }
    }

    /// `None` for tracks without an external id or when the lookup fails.
    #[must_use]
    pub fn enrich(&self, track: &Track) -> Option<TrackInfo> {
        let track_id = track.track_id.as_deref()?;
        self.source.track_info(track_id)
    }
}

/// Catalog ids are short base-62 strings; anything else never reaches a URL.
fn is_valid_track_id(track_id: &str) -> bool {
    !track_id.is_empty() && track_id.len() <= 64 && track_id.chars().all(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mood::Mood;
    use crate::track::AudioFeatures;
    use std::cell::Cell;

    struct CountingSource {
        calls: Cell<usize>,
        answer: Option<TrackInfo>,
    }

    impl MetadataSource for &CountingSource {
        fn track_info(&self, _track_id: &str) -> Option<TrackInfo> {
            self.calls.set(self.calls.get() + 1);
            self.answer.clone()
        }
    }

    struct Fixed(Option<TrackInfo>);

    impl MetadataSource for Fixed {
        fn track_info(&self, _track_id: &str) -> Option<TrackInfo> {
            self.0.clone()
        }
    }

    fn info() -> TrackInfo {
        TrackInfo {
            name: "Song".to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            image_url: None,
            external_url: "https://open.example/track/abc".to_string(),
            preview_url: Some("https://p.example/abc.mp3".to_string()),
        }
    }

    fn track(track_id: Option<&str>) -> Track {
        Track {
            track_id: track_id.map(str::to_string),
            name: "Song".to_string(),
            artist: "Artist".to_string(),
            genre: "Pop".to_string(),
            popularity: 1.0,
            features: AudioFeatures {
                valence: 0.5,
                energy: 0.5,
                danceability: 0.5,
                acousticness: 0.5,
                tempo: 120.0,
            },
            mood: Mood::Neutral,
            cluster: 0,
            vector: [0.0; 5],
        }
    }

    #[test]
    fn test_api_payload_maps_to_track_info() {
        let json = r#"{
            "name": "Song",
            "artists": [{"name": "First"}, {"name": "Second"}],
            "album": {"name": "Album", "images": [{"url": "https://i.example/big.jpg"}, {"url": "https://i.example/small.jpg"}]},
            "external_urls": {"spotify": "https://open.example/track/abc"},
            "preview_url": null,
            "popularity": 42
        }"#;
        let track: ApiTrack = serde_json::from_str(json).unwrap();
        let info = track.into_info().unwrap();
        assert_eq!(info.artist, "First");
        assert_eq!(info.image_url.as_deref(), Some("https://i.example/big.jpg"));
        assert_eq!(info.preview_url, None);
    }

    #[test]
    fn test_payload_without_artist_yields_nothing() {
        let json = r#"{"name": "Song", "artists": [], "album": {"name": "A"},
            "external_urls": {"spotify": "u"}, "preview_url": null}"#;
        let track: ApiTrack = serde_json::from_str(json).unwrap();
        assert!(track.into_info().is_none());
    }

    #[test]
    fn test_track_without_id_is_not_enriched() {
        let enricher = Enricher::new(Fixed(Some(info())));
        assert_eq!(enricher.enrich(&track(None)), None);
        assert_eq!(enricher.enrich(&track(Some("abc"))), Some(info()));
    }

    #[test]
    fn test_cache_serves_repeat_lookups() {
        let source = CountingSource { calls: Cell::new(0), answer: Some(info()) };
        let cached = CachedSource::new(&source, EnrichmentCache::in_memory().unwrap());

        assert_eq!(cached.track_info("abc"), Some(info()));
        assert_eq!(cached.track_info("abc"), Some(info()));
        assert_eq!(source.calls.get(), 1);
    }

    #[test]
    fn test_failed_lookups_are_not_cached() {
        let source = CountingSource { calls: Cell::new(0), answer: None };
        let cached = CachedSource::new(&source, EnrichmentCache::in_memory().unwrap());

        assert_eq!(cached.track_info("abc"), None);
        assert_eq!(cached.track_info("abc"), None);
        assert_eq!(source.calls.get(), 2);
    }

    #[test]
    fn test_unreachable_api_degrades_to_none() {
        let credentials = Credentials::from_parts(Some("id".into()), Some("secret".into())).unwrap();
        let client = SpotifyClient::with_endpoints(
            credentials,
            Duration::from_millis(500),
            "http://127.0.0.1:9/api/token",
            "http://127.0.0.1:9/v1",
        )
        .unwrap();
        assert_eq!(client.track_info("4uLU6hMCjMI75M1A2tKUQC"), None);
        assert_eq!(client.track_info("4uLU6hMCjMI75M1A2tKUQC"), None);
    }

    #[test]
    fn test_track_id_validation() {
        assert!(is_valid_track_id("4uLU6hMCjMI75M1A2tKUQC"));
        assert!(!is_valid_track_id(""));
        assert!(!is_valid_track_id("../me"));
        assert!(!is_valid_track_id("abc?x=1"));
    }

    #[test]
    fn test_credentials_require_both_parts() {
        assert!(Credentials::from_parts(Some("id".into()), None).is_none());
        assert!(Credentials::from_parts(Some(" ".into()), Some("s".into())).is_none());
        let credentials = Credentials::from_parts(Some("id".into()), Some("hunter2".into())).unwrap();
        assert!(!format!("{credentials:?}").contains("hunter2"));
    }
}
