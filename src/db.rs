//! SQLite cache of metadata enrichment lookups.
//!
//! One row per external track id, holding the JSON-encoded [`TrackInfo`].
//! Only successful lookups are stored.

use crate::enrich::TrackInfo;
use anyhow::{Context, Result};
use log::trace;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub struct EnrichmentCache {
    conn: Connection,
}

impl EnrichmentCache {
    /// Open (creating if needed) the cache database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open enrichment cache at {}", path.display()))?;
        Self::with_connection(conn)
    }

    /// Cache that lives only as long as the process. Used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory enrichment cache")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS enrichment (
                track_id   TEXT    PRIMARY KEY,
                payload    TEXT    NOT NULL,
                fetched_at INTEGER NOT NULL
            )",
            [],
        )
        .context("Failed to create enrichment table")?;
        Ok(Self { conn })
    }

    pub fn get(&self, track_id: &str) -> Result<Option<TrackInfo>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM enrichment WHERE track_id = ?1",
                [track_id],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to query enrichment cache for {track_id}"))?;

        payload
            .map(|json| {
                serde_json::from_str(&json)
                    .with_context(|| format!("Corrupt enrichment cache entry for {track_id}"))
            })
            .transpose()
    }

    pub fn put(&self, track_id: &str, info: &TrackInfo) -> Result<()> {
        let payload = serde_json::to_string(info).context("Failed to encode track info")?;
        let fetched_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();

        self.conn
            .execute(
                "INSERT OR REPLACE INTO enrichment (track_id, payload, fetched_at) VALUES (?1, ?2, ?3)",
                params![track_id, payload, i64::try_from(fetched_at).unwrap_or(i64::MAX)],
            )
            .with_context(|| format!("Failed to store enrichment for {track_id}"))?;
        trace!("Cached enrichment for {track_id}");
        Ok(())
    }

    /// Number of cached entries.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM enrichment", [], |row| row.get(0))
            .context("Failed to count enrichment cache entries")?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
