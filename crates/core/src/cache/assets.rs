//! Cached asset storage.
//!
//! Assets are response snapshots keyed by request. They are only ever appended or
//! overwritten during normal operation; removal happens through generation deletion.

use super::connection::CacheDb;
use super::generations::CacheGeneration;
use super::hash::compute_request_key;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAsset {
    pub request_key: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
    /// Owning generation; filled in when read back from the store.
    #[serde(default)]
    pub generation: Option<String>,
}

impl CachedAsset {
    /// Snapshot a GET response for `url`.
    pub fn new(
        url: &str, status: u16, content_type: Option<String>, headers: Vec<(String, String)>, body: Vec<u8>,
    ) -> Self {
        Self {
            request_key: compute_request_key("GET", url),
            url: url.to_string(),
            status,
            content_type,
            headers,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
            generation: None,
        }
    }
}

const SELECT_ASSET: &str = "SELECT request_key, url, status, content_type, headers_json, body, stored_at, generation
     FROM assets";

fn row_to_asset(row: &rusqlite::Row<'_>) -> rusqlite::Result<(CachedAsset, Option<String>)> {
    let asset = CachedAsset {
        request_key: row.get(0)?,
        url: row.get(1)?,
        status: row.get(2)?,
        content_type: row.get(3)?,
        headers: Vec::new(),
        body: row.get(5)?,
        stored_at: row.get(6)?,
        generation: Some(row.get(7)?),
    };
    Ok((asset, row.get(4)?))
}

fn decode_headers((mut asset, headers_json): (CachedAsset, Option<String>)) -> Result<CachedAsset, Error> {
    if let Some(json) = headers_json {
        asset.headers = serde_json::from_str(&json)?;
    }
    Ok(asset)
}

impl CacheDb {
    /// Store assets into a generation, creating the generation if needed.
    ///
    /// Runs in a single transaction: either every asset is stored or none is.
    /// Existing entries for the same request are overwritten (last write wins).
    pub async fn put_assets(&self, generation: &CacheGeneration, assets: &[CachedAsset]) -> Result<(), Error> {
        let generation = generation.clone();
        let assets = assets.to_vec();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO generations (name, kind, version, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![&generation.name, generation.kind.as_str(), &generation.version, &generation.created_at],
                )?;

                for asset in &assets {
                    let headers_json = serde_json::to_string(&asset.headers)?;
                    tx.execute(
                        "INSERT INTO assets (
                            generation, request_key, url, status, content_type, headers_json, body, stored_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                        ON CONFLICT(generation, request_key) DO UPDATE SET
                            url = excluded.url,
                            status = excluded.status,
                            content_type = excluded.content_type,
                            headers_json = excluded.headers_json,
                            body = excluded.body,
                            stored_at = excluded.stored_at",
                        params![
                            &generation.name,
                            &asset.request_key,
                            &asset.url,
                            asset.status,
                            &asset.content_type,
                            headers_json,
                            &asset.body,
                            &asset.stored_at,
                        ],
                    )?;
                }

                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store a single asset into a generation.
    pub async fn put_asset(&self, generation: &CacheGeneration, asset: &CachedAsset) -> Result<(), Error> {
        self.put_assets(generation, std::slice::from_ref(asset)).await
    }

    /// Find an asset for `url` in any generation. The most recently stored copy wins.
    pub async fn match_asset(&self, url: &str) -> Result<Option<CachedAsset>, Error> {
        let request_key = compute_request_key("GET", url);
        self.conn
            .call(move |conn| -> Result<Option<CachedAsset>, Error> {
                let mut stmt =
                    conn.prepare(&format!("{SELECT_ASSET} WHERE request_key = ?1 ORDER BY stored_at DESC LIMIT 1"))?;
                match stmt.query_row(params![request_key], row_to_asset) {
                    Ok(row) => Ok(Some(decode_headers(row)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Find an asset for `url` in one named generation.
    pub async fn match_asset_in(&self, generation: &str, url: &str) -> Result<Option<CachedAsset>, Error> {
        let generation = generation.to_string();
        let request_key = compute_request_key("GET", url);
        self.conn
            .call(move |conn| -> Result<Option<CachedAsset>, Error> {
                let mut stmt = conn.prepare(&format!("{SELECT_ASSET} WHERE generation = ?1 AND request_key = ?2"))?;
                match stmt.query_row(params![generation, request_key], row_to_asset) {
                    Ok(row) => Ok(Some(decode_headers(row)?)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Count the assets owned by a generation.
    pub async fn count_assets(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM assets WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::generations::GenerationKind;

    fn make_asset(url: &str, body: &str) -> CachedAsset {
        CachedAsset::new(
            url,
            200,
            Some("image/svg+xml".to_string()),
            vec![("cache-control".to_string(), "max-age=60".to_string())],
            body.as_bytes().to_vec(),
        )
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let generation = CacheGeneration::new("app", GenerationKind::Precache, "v1");
        let asset = make_asset("https://example.com/logo.svg", "<svg/>");

        db.put_asset(&generation, &asset).await.unwrap();

        let found = db.match_asset("https://example.com/logo.svg").await.unwrap().unwrap();
        assert_eq!(found.body, b"<svg/>");
        assert_eq!(found.headers, asset.headers);
        assert_eq!(found.generation.as_deref(), Some("app-precache-v1"));
    }

    #[tokio::test]
    async fn test_match_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.match_asset("https://example.com/nope.png").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_in_specific_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let runtime = CacheGeneration::new("app", GenerationKind::Runtime, "v1");
        db.put_asset(&runtime, &make_asset("https://example.com/a.css", "a")).await.unwrap();

        assert!(db.match_asset_in("app-runtime-v1", "https://example.com/a.css").await.unwrap().is_some());
        assert!(db.match_asset_in("app-precache-v1", "https://example.com/a.css").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_overwrite_last_write_wins() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let runtime = CacheGeneration::new("app", GenerationKind::Runtime, "v1");
        db.put_asset(&runtime, &make_asset("https://example.com/a.css", "old")).await.unwrap();
        db.put_asset(&runtime, &make_asset("https://example.com/a.css", "new")).await.unwrap();

        let found = db.match_asset("https://example.com/a.css").await.unwrap().unwrap();
        assert_eq!(found.body, b"new");
        assert_eq!(db.count_assets("app-runtime-v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_generation_delete_cascades_to_assets() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let runtime = CacheGeneration::new("app", GenerationKind::Runtime, "v1");
        db.put_assets(
            &runtime,
            &[make_asset("https://example.com/a.css", "a"), make_asset("https://example.com/b.css", "b")],
        )
        .await
        .unwrap();
        assert_eq!(db.count_assets("app-runtime-v1").await.unwrap(), 2);

        db.delete_generation("app-runtime-v1").await.unwrap();

        assert_eq!(db.count_assets("app-runtime-v1").await.unwrap(), 0);
        assert!(db.match_asset("https://example.com/a.css").await.unwrap().is_none());
    }
}
