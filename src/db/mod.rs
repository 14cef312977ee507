//! Local photo store.
//!
//! `PhotoStore` is the one long-lived handle to the gallery database. It is
//! opened once at startup and cloned into the capture coordinator and the
//! views; every clone shares the same connection. Each operation runs the
//! blocking SQLite call on tokio's blocking pool, so callers only ever see
//! async methods.
//!
//! Writers on the same handle are serialized by the connection mutex.
//! Writers on other handles or in other processes are serialized by SQLite
//! itself; the database runs in WAL mode so readers are not blocked by them.

mod error;
mod photos;
mod schema;
pub mod sqlite;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

pub use error::{Result, StoreError};
pub use photos::{format_timestamp, parse_timestamp, DateFilter, FilterError, NewPhoto, PhotoRecord};

use sqlite::SqliteDb;

/// Default wait for a write lock held by another connection.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Clone)]
pub struct PhotoStore {
    inner: Arc<Mutex<SqliteDb>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for PhotoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoStore").field("path", &self.path).finish()
    }
}

impl PhotoStore {
    /// Open the store at `path`, creating the file and schema if needed.
    ///
    /// Any number of callers may open the same file concurrently; schema
    /// creation is idempotent and waits up to `busy_timeout` for a
    /// competing initializer.
    pub async fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open_path = path.clone();
        let db = tokio::task::spawn_blocking(move || SqliteDb::open(&open_path, busy_timeout))
            .await
            .map_err(|e| StoreError::init(&path, format!("open task failed: {e}")))??;

        info!("Photo store opened at {:?}", path);
        Ok(Self {
            inner: Arc::new(Mutex::new(db)),
            path: Some(path),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = SqliteDb::open_in_memory()?;
        Ok(Self {
            inner: Arc::new(Mutex::new(db)),
            path: None,
        })
    }

    /// Backing file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one record and return its id.
    pub async fn insert(&self, photo: NewPhoto) -> Result<i64> {
        let id = self.run(move |db| db.insert_photo(&photo)).await?;
        debug!("Inserted photo {}", id);
        Ok(id)
    }

    /// Every record, oldest id first.
    pub async fn list_all(&self) -> Result<Vec<PhotoRecord>> {
        self.run(|db| db.list_photos()).await
    }

    /// Records taken on the filter's month and day in any year.
    pub async fn list_by_date(&self, filter: &DateFilter) -> Result<Vec<PhotoRecord>> {
        let filter = filter.clone();
        self.run(move |db| db.list_photos_by_date(&filter)).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<PhotoRecord>> {
        self.run(move |db| db.get_photo(id)).await
    }

    /// Remove a record. Deleting an id that is not stored succeeds.
    pub async fn delete(&self, id: i64) -> Result<()> {
        let removed = self.run(move |db| db.delete_photo(id)).await?;
        debug!("Deleted photo {} ({} row(s))", id, removed);
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        self.run(|db| db.count_photos()).await
    }

    /// Release this handle. The connection closes once the last clone is
    /// gone.
    pub fn close(self) {
        if Arc::strong_count(&self.inner) == 1 {
            info!("Photo store closed");
        }
    }

    async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SqliteDb) -> Result<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let db = inner
                .lock()
                .map_err(|_| StoreError::Unavailable("connection lock poisoned".into()))?;
            op(&db)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("store task failed: {e}")))?
    }
}
