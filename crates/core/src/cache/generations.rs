//! Cache generation bookkeeping.
//!
//! A generation is a named, versioned key→response store. There are two kinds per
//! deployment: the eagerly populated precache and the lazily populated runtime cache.

use std::fmt;
use std::str::FromStr;

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// Which role a generation plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationKind {
    Precache,
    Runtime,
}

impl GenerationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationKind::Precache => "precache",
            GenerationKind::Runtime => "runtime",
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "precache" => Ok(GenerationKind::Precache),
            "runtime" => Ok(GenerationKind::Runtime),
            other => Err(Error::InvalidInput(format!("unknown generation kind: {other}"))),
        }
    }
}

/// A named, versioned generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheGeneration {
    pub name: String,
    pub kind: GenerationKind,
    pub version: String,
    pub created_at: String,
}

impl CacheGeneration {
    /// Describe a generation for `prefix`, `kind` and `version` without touching storage.
    pub fn new(prefix: &str, kind: GenerationKind, version: &str) -> Self {
        Self {
            name: generation_name(prefix, kind, version),
            kind,
            version: version.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Canonical generation name: `{prefix}-{kind}-{version}`.
pub fn generation_name(prefix: &str, kind: GenerationKind, version: &str) -> String {
    format!("{prefix}-{kind}-{version}")
}

impl CacheDb {
    /// List every generation in the store, regardless of version.
    pub async fn list_generations(&self) -> Result<Vec<CacheGeneration>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<CacheGeneration>, Error> {
                let mut stmt =
                    conn.prepare("SELECT name, kind, version, created_at FROM generations ORDER BY created_at, name")?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                rows.into_iter()
                    .map(|(name, kind, version, created_at)| -> Result<CacheGeneration, Error> {
                        Ok(CacheGeneration { name, kind: kind.parse()?, version, created_at })
                    })
                    .collect()
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and, by cascade, every asset it owns.
    ///
    /// Returns false if no such generation existed.
    pub async fn delete_generation(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM generations WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every generation in one statement.
    ///
    /// Returns the number of deleted generations.
    pub async fn purge_all_generations(&self) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM generations", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
