use rusqlite::Connection;

const CREATE_EVENT_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS event (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        start_time INTEGER NOT NULL,
        window_class TEXT NOT NULL,
        window_title TEXT,
        duration INTEGER NOT NULL CHECK (duration >= 0)
    );
    CREATE INDEX IF NOT EXISTS idx_event_start_time ON event (start_time);
"#;

pub fn apply(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE_EVENT_TABLE)
}
