use chrono::{DateTime, Utc};
use log::{debug, error, info};
use rusqlite::{params, Connection};
use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
    time::Instant,
};

use super::{
    models::{PersistedEvent, WindowChangeEvent},
    schema, EventStore,
};
use crate::error::{PersistError, QueryError};

const EVENT_INSERT_QUERY: &str = r#"
    INSERT INTO event (start_time, window_class, window_title, duration)
    VALUES (?1, ?2, ?3, ?4)
"#;

const EVENTS_BY_TIME_QUERY: &str = r#"
    SELECT start_time, window_class, window_title, duration
    FROM event
    WHERE start_time BETWEEN ?1 AND ?2
    ORDER BY start_time DESC, id ASC
"#;

pub struct DbHandler {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DbHandler {
    pub fn new(db_path: PathBuf) -> rusqlite::Result<Self> {
        if let Some(parent) = db_path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                error!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    err
                );
            }
        }

        let conn = Connection::open(&db_path)?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            error!("Failed to enable WAL mode: {err}");
        }
        schema::apply(&conn)?;
        info!("Database initialized at {}", db_path.display());

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    pub fn in_memory() -> rusqlite::Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::apply(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn lock(&self) -> Option<MutexGuard<'_, Connection>> {
        self.conn.lock().ok()
    }
}

impl EventStore for DbHandler {
    fn append_events(&self, batch: &[WindowChangeEvent]) -> Result<(), PersistError> {
        if batch.is_empty() {
            return Ok(());
        }
        let start = Instant::now();

        let mut conn = self
            .lock()
            .ok_or_else(|| PersistError::Unavailable("connection lock poisoned".into()))?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(EVENT_INSERT_QUERY)?;
            for event in batch {
                let row = PersistedEvent::from(event);
                if let Err(err) = stmt.execute(params![
                    row.start_time,
                    row.program_name,
                    row.window_title,
                    row.duration_secs,
                ]) {
                    error!(
                        "Failed to insert event for '{}': {}",
                        row.program_name, err
                    );
                    return Err(err.into());
                }
            }
        }
        tx.commit()?;

        debug!(
            "Inserted {} events in {:?}",
            batch.len(),
            start.elapsed()
        );
        Ok(())
    }

    fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PersistedEvent>, QueryError> {
        let conn = self
            .lock()
            .ok_or_else(|| QueryError::Unavailable("connection lock poisoned".into()))?;
        let mut stmt = conn.prepare_cached(EVENTS_BY_TIME_QUERY)?;
        let rows = stmt.query_map(params![start.timestamp(), end.timestamp()], |row| {
            Ok(PersistedEvent {
                start_time: row.get(0)?,
                program_name: row.get(1)?,
                window_title: row.get(2)?,
                duration_secs: row.get(3)?,
            })
        })?;
        let events = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(events)
    }
}
