pub mod connection;
pub mod models;
pub mod schema;

use chrono::{DateTime, Utc};

use crate::error::{PersistError, QueryError};
use models::{PersistedEvent, WindowChangeEvent};

/// Durable event sink. Implementations block, so async callers go through
/// `spawn_blocking`.
pub trait EventStore: Send + Sync + 'static {
    /// Writes the whole batch atomically: either every event is stored or none.
    fn append_events(&self, batch: &[WindowChangeEvent]) -> Result<(), PersistError>;

    /// Events whose start lies in `[start, end]`, newest first. Rows sharing a
    /// start time keep their insertion order.
    fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<PersistedEvent>, QueryError>;
}
