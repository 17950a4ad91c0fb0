//! Schema versioning for the generation store.
//!
//! The applied version lives in `schema_version`; every step newer than it is
//! applied in order inside one transaction.

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Ordered schema steps.
const STEPS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_generations.sql"))];

/// Latest schema version this build knows about.
pub const LATEST: i64 = STEPS[STEPS.len() - 1].0;

/// Bring the store up to [`LATEST`].
///
/// Returns the version the store was at before.
pub async fn run(conn: &Connection) -> Result<i64, Error> {
    conn.call(|conn| -> Result<i64, Error> {
        let tx = conn.transaction()?;
        tx.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )?;

        let before: i64 = tx.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))?;
        if before > LATEST {
            return Err(Error::MigrationFailed(format!(
                "store is at version {before}, newer than this build ({LATEST})"
            )));
        }

        for (version, sql) in STEPS.iter().filter(|(v, _)| *v > before) {
            tx.execute_batch(sql)
                .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
            tx.execute(
                "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )?;
            tracing::debug!(version, "applied generation store schema");
        }

        tx.commit()?;
        Ok(before)
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_exists(conn: &Connection, name: &'static str) -> bool {
        conn.call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                [name],
                |row| row.get(0),
            )
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_fresh_store_reaches_latest() {
        let conn = Connection::open_in_memory().await.unwrap();

        assert_eq!(run(&conn).await.unwrap(), 0);
        assert!(table_exists(&conn, "generations").await);
        assert!(table_exists(&conn, "assets").await);
    }

    #[tokio::test]
    async fn test_rerun_is_noop() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();

        assert_eq!(run(&conn).await.unwrap(), LATEST);

        let rows: i64 = conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(rows, STEPS.len() as i64);
    }

    #[tokio::test]
    async fn test_newer_store_rejected() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        conn.call(|conn| {
            conn.execute("INSERT INTO schema_version (version, applied_at) VALUES (?1, 'later')", [LATEST + 1])
        })
        .await
        .unwrap();

        assert!(matches!(run(&conn).await, Err(Error::MigrationFailed(_))));
    }
}
