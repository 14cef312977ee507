//! SQLite backend implementation.

use rusqlite::{params, Connection, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::{Result, StoreError};
use super::photos::{DateFilter, NewPhoto, PhotoRecord};
use super::schema::{IMAGE_COLUMNS, JOURNAL_MODE, SCHEMA};

pub struct SqliteDb {
    pub(crate) conn: Connection,
}

impl SqliteDb {
    /// Open (creating if absent) the database file and ensure the schema.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::init(path, e.to_string()))?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::init(path, e.to_string()))?;

        let mut db = Self { conn };
        db.initialize(busy_timeout)
            .map_err(|e| StoreError::init(path, e.to_string()))?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::init(":memory:", e.to_string()))?;
        let mut db = Self { conn };
        db.initialize(Duration::ZERO)
            .map_err(|e| StoreError::init(":memory:", e.to_string()))?;
        Ok(db)
    }

    /// Idempotent: safe to run against a file another connection is
    /// initializing at the same time. The busy timeout is set first so that
    /// both the journal switch and the schema transaction wait for the lock.
    fn initialize(&mut self, busy_timeout: Duration) -> rusqlite::Result<()> {
        self.conn.busy_timeout(busy_timeout)?;

        let mode: String = self.conn.pragma_update_and_check(None, "journal_mode", JOURNAL_MODE, |row| row.get(0))?;
        if !mode.eq_ignore_ascii_case(JOURNAL_MODE) && mode != "memory" {
            warn!("Journal mode is {} instead of {}", mode, JOURNAL_MODE);
        }

        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute_batch(SCHEMA)?;
        tx.commit()?;

        debug!("Schema ensured (journal_mode={})", mode);
        Ok(())
    }

    pub fn journal_mode(&self) -> Result<String> {
        self.conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .map_err(StoreError::Read)
    }

    // ========================================================================
    // Photo operations
    // ========================================================================

    pub fn insert_photo(&self, photo: &NewPhoto) -> Result<i64> {
        photo.validate()?;
        self.conn
            .execute(
                "INSERT INTO images (uri, timestamp, latitude, longitude) VALUES (?1, ?2, ?3, ?4)",
                params![photo.uri, photo.timestamp_text(), photo.latitude, photo.longitude],
            )
            .map_err(StoreError::Write)?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_photos(&self) -> Result<Vec<PhotoRecord>> {
        let sql = format!("SELECT {IMAGE_COLUMNS} FROM images ORDER BY id ASC");
        self.query_photos(&sql, [])
    }

    /// Month and day are compared against the stored text
    /// (`YYYY-MM-DD...`), so the year never takes part.
    pub fn list_photos_by_date(&self, filter: &DateFilter) -> Result<Vec<PhotoRecord>> {
        let sql = format!(
            r#"
            SELECT {IMAGE_COLUMNS}
            FROM images
            WHERE substr(timestamp, 6, 2) = ?1
              AND substr(timestamp, 9, 2) = ?2
            ORDER BY id ASC
            "#
        );
        self.query_photos(&sql, params![filter.month(), filter.day()])
    }

    pub fn get_photo(&self, id: i64) -> Result<Option<PhotoRecord>> {
        let sql = format!("SELECT {IMAGE_COLUMNS} FROM images WHERE id = ?1");
        let result = self.conn.query_row(&sql, [id], PhotoRecord::from_row);
        match result {
            Ok(photo) => Ok(Some(photo)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Read(e)),
        }
    }

    /// Unknown ids are not an error. Returns the number of rows removed.
    pub fn delete_photo(&self, id: i64) -> Result<usize> {
        self.conn
            .execute("DELETE FROM images WHERE id = ?1", [id])
            .map_err(StoreError::Write)
    }

    pub fn count_photos(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| row.get(0))
            .map_err(StoreError::Read)
    }

    /// Every row must decode; a bad row fails the whole query rather than
    /// being skipped.
    fn query_photos<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<PhotoRecord>> {
        let mut stmt = self.conn.prepare(sql).map_err(StoreError::Read)?;
        let rows = stmt
            .query_map(params, PhotoRecord::from_row)
            .map_err(StoreError::Read)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Read)?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn photo(uri: &str, timestamp: &str) -> NewPhoto {
        NewPhoto::parse(uri, timestamp, "37.7749", "-122.4194").unwrap()
    }

    #[test]
    fn test_open_creates_file_with_wal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/gallery.db");

        let db = SqliteDb::open(&path, Duration::from_secs(1)).unwrap();
        assert!(path.exists());
        assert_eq!(db.journal_mode().unwrap().to_lowercase(), "wal");

        let count: i64 = db
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='images'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_reopen_keeps_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gallery.db");

        let db = SqliteDb::open(&path, Duration::from_secs(1)).unwrap();
        db.insert_photo(&photo("a.jpg", "2024-03-10T15:04:05Z")).unwrap();
        drop(db);

        let db = SqliteDb::open(&path, Duration::from_secs(1)).unwrap();
        assert_eq!(db.count_photos().unwrap(), 1);
    }

    #[test]
    fn test_open_fails_on_directory() {
        let dir = tempdir().unwrap();
        let result = SqliteDb::open(dir.path(), Duration::from_secs(1));
        assert!(matches!(result, Err(StoreError::Init { .. })));
    }

    #[test]
    fn test_insert_and_list() {
        let db = SqliteDb::open_in_memory().unwrap();
        assert!(db.list_photos().unwrap().is_empty());

        let first = db.insert_photo(&photo("a.jpg", "2024-03-10T15:04:05Z")).unwrap();
        let second = db.insert_photo(&photo("b.jpg", "2024-03-11T08:00:00Z")).unwrap();
        assert!(second > first);

        let photos = db.list_photos().unwrap();
        assert_eq!(photos.len(), 2);
        assert_eq!(photos[0].id, first);
        assert_eq!(photos[0].uri, "a.jpg");
        assert_eq!(photos[0].timestamp_text(), "2024-03-10T15:04:05Z");
        assert_eq!(photos[0].latitude, 37.7749);
        assert_eq!(photos[0].longitude, -122.4194);
        assert_eq!(photos[1].id, second);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let db = SqliteDb::open_in_memory().unwrap();
        db.insert_photo(&photo("a.jpg", "2024-03-10T15:04:05Z")).unwrap();
        let second = db.insert_photo(&photo("b.jpg", "2024-03-10T15:04:06Z")).unwrap();

        db.delete_photo(second).unwrap();
        let third = db.insert_photo(&photo("c.jpg", "2024-03-10T15:04:07Z")).unwrap();
        assert!(third > second);
    }

    #[test]
    fn test_insert_validates_before_storage() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut bad = photo("a.jpg", "2024-03-10T15:04:05Z");
        bad.uri = "   ".into();

        assert!(matches!(db.insert_photo(&bad), Err(StoreError::InvalidRecord(_))));
        assert_eq!(db.count_photos().unwrap(), 0);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let db = SqliteDb::open_in_memory().unwrap();
        let id = db.insert_photo(&photo("a.jpg", "2024-03-10T15:04:05Z")).unwrap();
        let keep = db.insert_photo(&photo("b.jpg", "2024-03-10T15:04:06Z")).unwrap();

        assert_eq!(db.delete_photo(id).unwrap(), 1);
        assert_eq!(db.delete_photo(id).unwrap(), 0);
        assert_eq!(db.delete_photo(9999).unwrap(), 0);

        let photos = db.list_photos().unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].id, keep);
    }

    #[test]
    fn test_list_by_date_ignores_year() {
        let db = SqliteDb::open_in_memory().unwrap();
        let a = db.insert_photo(&photo("a.jpg", "2023-05-17T10:00:00Z")).unwrap();
        let b = db.insert_photo(&photo("b.jpg", "2024-05-17T09:00:00Z")).unwrap();
        db.insert_photo(&photo("c.jpg", "2023-05-18T10:00:00Z")).unwrap();
        db.insert_photo(&photo("d.jpg", "2023-12-05T10:00:00Z")).unwrap();

        let filter = DateFilter::new("05", "17").unwrap();
        let ids: Vec<i64> = db.list_photos_by_date(&filter).unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a, b]);

        let expected: Vec<i64> = db
            .list_photos()
            .unwrap()
            .into_iter()
            .filter(|p| filter.matches(p))
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_list_by_date_no_match_is_empty() {
        let db = SqliteDb::open_in_memory().unwrap();
        db.insert_photo(&photo("a.jpg", "2023-05-17T10:00:00Z")).unwrap();

        let filter = DateFilter::new("02", "29").unwrap();
        assert!(db.list_photos_by_date(&filter).unwrap().is_empty());
    }

    #[test]
    fn test_get_photo() {
        let db = SqliteDb::open_in_memory().unwrap();
        let id = db.insert_photo(&photo("a.jpg", "2024-03-10T15:04:05Z")).unwrap();

        let found = db.get_photo(id).unwrap().unwrap();
        assert_eq!(found.uri, "a.jpg");
        assert!(db.get_photo(id + 1).unwrap().is_none());
    }

    #[test]
    fn test_reads_rows_from_other_writers() {
        let db = SqliteDb::open_in_memory().unwrap();
        // Other writers may bind coordinates as text or integers.
        db.conn
            .execute(
                "INSERT INTO images (uri, timestamp, latitude, longitude) VALUES (?1, ?2, ?3, ?4)",
                params!["legacy.jpg", "2022-07-04 12:00:00", "48.85", 2],
            )
            .unwrap();

        let photos = db.list_photos().unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].latitude, 48.85);
        assert_eq!(photos[0].longitude, 2.0);
        assert_eq!(photos[0].timestamp_text(), "2022-07-04T12:00:00Z");

        let filter = DateFilter::new("07", "04").unwrap();
        assert_eq!(db.list_photos_by_date(&filter).unwrap().len(), 1);
    }

    #[test]
    fn test_coordinates_decode_from_text_and_integer() {
        let db = SqliteDb::open_in_memory().unwrap();
        let record = db
            .conn
            .query_row(
                "SELECT 7, 'legacy.jpg', '2022-07-04T12:00:00Z', ' 48.85 ', 2",
                [],
                PhotoRecord::from_row,
            )
            .unwrap();
        assert_eq!(record.latitude, 48.85);
        assert_eq!(record.longitude, 2.0);

        let bad = db.conn.query_row(
            "SELECT 7, 'legacy.jpg', '2022-07-04T12:00:00Z', 'north', 2",
            [],
            PhotoRecord::from_row,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_undecodable_row_is_a_read_error() {
        let db = SqliteDb::open_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO images (uri, timestamp, latitude, longitude) VALUES ('x.jpg', 'not a date', 1.0, 2.0)",
                [],
            )
            .unwrap();

        assert!(matches!(db.list_photos(), Err(StoreError::Read(_))));
    }
}
