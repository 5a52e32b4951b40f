//! SQLite-backed task cache
//!
//! Every operation opens its own connection on the blocking pool, so
//! concurrent workers never queue behind an in-process lock. SQLite's
//! busy timeout serializes writers and the primary key rejects duplicates.

use super::{CacheError, CacheLookup};
use crate::fingerprint::Fingerprint;
use crate::types::TaskRecord;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// How long a connection waits on a locked database
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Persistent task cache
#[derive(Debug, Clone)]
pub struct TaskCache {
    db_path: PathBuf,
    busy_timeout: Duration,
}

impl TaskCache {
    /// Open or create the cache at `path`
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        Self::open_with_timeout(path, DEFAULT_BUSY_TIMEOUT).await
    }

    /// Open or create the cache with an explicit busy timeout
    pub async fn open_with_timeout(
        path: impl Into<PathBuf>,
        busy_timeout: Duration,
    ) -> Result<Self, CacheError> {
        let db_path = path.into();

        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                CacheError::Unavailable(format!("create {}: {}", parent.display(), e))
            })?;
        }

        let cache = Self {
            db_path,
            busy_timeout,
        };
        cache.run("init_schema", init_schema).await?;

        info!("Task cache ready at {}", cache.db_path.display());
        Ok(cache)
    }

    /// Look up a fingerprint
    ///
    /// A miss does not lock anything: callers that resolve the task race on
    /// [`TaskCache::insert_if_absent`], where the primary key picks one winner.
    pub async fn get_or_reserve(&self, fingerprint: &Fingerprint) -> Result<CacheLookup, CacheError> {
        Ok(match self.get(fingerprint).await? {
            Some(record) => CacheLookup::Hit(record),
            None => CacheLookup::Miss,
        })
    }

    /// Fetch a stored record
    pub async fn get(&self, fingerprint: &Fingerprint) -> Result<Option<TaskRecord>, CacheError> {
        let fp = fingerprint.clone();
        self.run("get", move |conn| {
            conn.query_row(
                "SELECT task_text, answer FROM tasks WHERE fingerprint = ?1",
                params![fp.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map(|found| {
                found.map(|(task_text, answer)| TaskRecord {
                    fingerprint: fp,
                    task_text,
                    answer,
                })
            })
        })
        .await
    }

    /// Insert unless a row with the same fingerprint exists.
    ///
    /// Returns true iff this call wrote the row. A primary-key conflict means
    /// another caller cached it first and is not an error.
    pub async fn insert_if_absent(&self, record: &TaskRecord) -> Result<bool, CacheError> {
        let record = record.clone();
        let inserted = self
            .run("insert_if_absent", move |conn| {
                conn.execute(
                    "INSERT INTO tasks (fingerprint, task_text, answer) VALUES (?1, ?2, ?3)
                     ON CONFLICT(fingerprint) DO NOTHING",
                    params![record.fingerprint.as_str(), &record.task_text, &record.answer],
                )
            })
            .await?;

        Ok(inserted == 1)
    }

    /// Number of cached tasks
    pub async fn count(&self) -> Result<u64, CacheError> {
        self.run("count", |conn| {
            conn.query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get::<_, i64>(0))
                .map(|n| n.max(0) as u64)
        })
        .await
    }

    /// Database file location
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run a statement on a fresh connection in the blocking pool
    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T, CacheError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let path = self.db_path.clone();
        let busy_timeout = self.busy_timeout;

        let result = tokio::task::spawn_blocking(move || -> rusqlite::Result<T> {
            let conn = Connection::open(&path)?;
            conn.busy_timeout(busy_timeout)?;
            f(&conn)
        })
        .await
        .map_err(|e| CacheError::Unavailable(format!("{}: worker failed: {}", op, e)))?;

        result.map_err(|e| {
            debug!("Task cache {} failed: {}", op, e);
            CacheError::Unavailable(format!("{}: {}", op, e))
        })
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    // WAL lets readers proceed while a writer holds the lock
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            fingerprint TEXT PRIMARY KEY,
            task_text TEXT NOT NULL,
            answer TEXT NOT NULL
        )
        "#,
        [],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::fingerprint;
    use std::sync::Arc;
    use tempfile::tempdir;

    async fn test_cache() -> (TaskCache, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let cache = TaskCache::open(dir.path().join("cache.db")).await.unwrap();
        (cache, dir)
    }

    #[tokio::test]
    async fn test_create_cache() {
        let (cache, _dir) = test_cache().await;
        assert_eq!(cache.count().await.unwrap(), 0);
        assert!(cache.path().ends_with("cache.db"));
    }

    #[tokio::test]
    async fn test_open_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("cache.db");
        let cache = TaskCache::open(&path).await.unwrap();
        assert!(path.exists());
        assert_eq!(cache.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (cache, _dir) = test_cache().await;
        let record = TaskRecord::new("Solve: x = 1", "[1]");

        assert_eq!(
            cache.get_or_reserve(&record.fingerprint).await.unwrap(),
            CacheLookup::Miss
        );
        assert!(cache.insert_if_absent(&record).await.unwrap());
        assert_eq!(
            cache.get_or_reserve(&record.fingerprint).await.unwrap(),
            CacheLookup::Hit(record)
        );
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let (cache, _dir) = test_cache().await;
        let first = TaskRecord::new("Solve: x = 1", "[1]");
        let second = TaskRecord::new("Solve: x = 1", "something else");

        assert!(cache.insert_if_absent(&first).await.unwrap());
        assert!(!cache.insert_if_absent(&second).await.unwrap());

        let stored = cache.get(&first.fingerprint).await.unwrap().unwrap();
        assert_eq!(stored.answer, "[1]");
        assert_eq!(cache.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_store_one_row() {
        let (cache, _dir) = test_cache().await;
        let cache = Arc::new(cache);
        let text = "Решите уравнение: x^2 = 9";

        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let record = TaskRecord::new(text, format!("answer-{}", i));
                cache.insert_if_absent(&record).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(cache.count().await.unwrap(), 1);

        let stored = cache.get(&fingerprint(text)).await.unwrap().unwrap();
        for _ in 0..4 {
            assert_eq!(cache.get(&fingerprint(text)).await.unwrap().unwrap(), stored);
        }
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.db");
        let record = TaskRecord::new("Solve: 3x - 6 = 0", "[2]");

        {
            let cache = TaskCache::open(&path).await.unwrap();
            assert!(cache.insert_if_absent(&record).await.unwrap());
        }

        let reopened = TaskCache::open(&path).await.unwrap();
        assert_eq!(
            reopened.get(&record.fingerprint).await.unwrap(),
            Some(record)
        );
    }

    #[tokio::test]
    async fn test_unwritable_location_is_unavailable() {
        let dir = tempdir().unwrap();
        // A directory where the database file should be
        let path = dir.path().join("cache.db");
        std::fs::create_dir_all(&path).unwrap();

        let err = TaskCache::open(&path).await.unwrap_err();
        assert!(matches!(err, CacheError::Unavailable(_)));
    }
}
