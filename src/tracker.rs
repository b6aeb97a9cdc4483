use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::{
    buffer::EventBuffer,
    clock::whole_seconds,
    db::models::WindowChangeEvent,
    platform::WindowDescriptor,
};

/// The window being tracked and when its current (unflushed) stretch began.
/// Both halves are set together or not at all.
#[derive(Debug, Clone)]
struct OpenSession {
    window: WindowDescriptor,
    started_at: DateTime<Utc>,
}

impl OpenSession {
    fn event(&self, duration_secs: u32) -> WindowChangeEvent {
        WindowChangeEvent {
            start_timestamp: self.started_at,
            window_id: self.window.id.clone(),
            program_name: self.window.class_name.clone(),
            window_title: self.window.title.clone().unwrap_or_default(),
            duration_secs,
        }
    }

    /// Ends the session at `now`. A switch inside the same second is still
    /// a session, just a zero-length one.
    fn into_event(self, now: DateTime<Utc>) -> WindowChangeEvent {
        let elapsed = (now - self.started_at).num_seconds().max(0);
        self.event(u32::try_from(elapsed).unwrap_or(u32::MAX))
    }
}

/// Focus state machine plus the buffer of completed sessions. Not
/// synchronized on its own; `ActivityService` wraps it in a mutex.
#[derive(Debug, Default)]
pub struct ActivityTracker {
    current: Option<OpenSession>,
    buffer: EventBuffer,
}

impl ActivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_window(&self) -> Option<&WindowDescriptor> {
        self.current.as_ref().map(|session| &session.window)
    }

    pub fn tracking_started_at(&self) -> Option<DateTime<Utc>> {
        self.current.as_ref().map(|session| session.started_at)
    }

    pub fn buffer(&self) -> &EventBuffer {
        &self.buffer
    }

    /// Feeds one poll result. A `None` leaves the open session untouched, so a
    /// failed poll never splits a session. Returns true when a completed
    /// session was buffered.
    pub fn observe(
        &mut self,
        descriptor: Option<WindowDescriptor>,
        record_titles: bool,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(mut descriptor) = descriptor else {
            return false;
        };
        if !record_titles {
            descriptor.title = None;
        }
        let mut now = whole_seconds(now);
        if let Some(session) = &self.current {
            now = now.max(session.started_at);
        }

        let changed = match &self.current {
            Some(session) if session.window.id == descriptor.id => return false,
            Some(_) => true,
            None => false,
        };

        let emitted = if changed {
            debug!(
                "window changed: id={} class={}",
                descriptor.id, descriptor.class_name
            );
            self.current
                .take()
                .map(|session| session.into_event(now))
        } else {
            debug!(
                "tracking started: id={} class={}",
                descriptor.id, descriptor.class_name
            );
            None
        };

        self.current = Some(OpenSession {
            window: descriptor,
            started_at: now,
        });
        match emitted {
            Some(event) => {
                self.buffer.append(event);
                true
            }
            None => false,
        }
    }

    /// Checkpoints the open session: returns its elapsed time as an event and
    /// restarts the stretch where that event ends, keeping the same window.
    /// Less than a whole second elapsed yields nothing and changes nothing.
    pub fn close_current(&mut self, now: DateTime<Utc>) -> Option<WindowChangeEvent> {
        let session = self.current.as_mut()?;
        let elapsed = (whole_seconds(now) - session.started_at).num_seconds();
        if elapsed <= 0 {
            return None;
        }
        let duration_secs = u32::try_from(elapsed).unwrap_or(u32::MAX);

        let event = session.event(duration_secs);
        session.started_at += Duration::seconds(i64::from(duration_secs));
        Some(event)
    }

    /// Checkpoints the open session into the buffer and takes everything
    /// pending, leaving the buffer empty.
    pub fn drain_for_flush(&mut self, now: DateTime<Utc>) -> Vec<WindowChangeEvent> {
        if let Some(checkpoint) = self.close_current(now) {
            self.buffer.append(checkpoint);
        }
        self.buffer.take()
    }

    /// Returns a batch that could not be persisted.
    pub fn restore(&mut self, batch: Vec<WindowChangeEvent>) {
        self.buffer.restore(batch);
    }
}
