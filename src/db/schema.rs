/// Journal mode requested on every open. In-memory databases report
/// `memory` instead and are left alone.
pub const JOURNAL_MODE: &str = "WAL";

pub const SCHEMA: &str = r#"
-- Images table: one row per captured photo
CREATE TABLE IF NOT EXISTS images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    uri TEXT NOT NULL,
    timestamp TEXT NOT NULL,   -- RFC 3339 capture time
    latitude REAL NOT NULL,
    longitude REAL NOT NULL
);
"#;

/// Column list shared by every query that builds a `PhotoRecord`.
pub const IMAGE_COLUMNS: &str = "id, uri, timestamp, latitude, longitude";
