#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(windows)]
pub mod windows;

use log::{debug, warn};

/// Snapshot of the window holding input focus.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowDescriptor {
    pub id: String,
    pub class_name: String,
    pub title: Option<String>,
}

impl WindowDescriptor {
    pub fn new(id: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class_name: class_name.into(),
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Reports the currently focused window. Failures are `None`, never an error.
pub trait FocusPoller: Send + Sync + 'static {
    fn current_window(&self) -> Option<WindowDescriptor>;
}

/// Poller for targets without a focus backend.
pub struct UnsupportedPoller;

impl FocusPoller for UnsupportedPoller {
    fn current_window(&self) -> Option<WindowDescriptor> {
        debug!("Focus polling is not supported on this platform");
        None
    }
}

/// Picks the focus backend for the platform this binary was built for.
#[cfg(target_os = "linux")]
pub fn detect(record_titles: bool) -> Box<dyn FocusPoller> {
    match linux::X11Poller::connect(record_titles) {
        Ok(poller) => Box::new(poller),
        Err(err) => {
            warn!("Unable to connect to the X server, focus tracking disabled: {err}");
            Box::new(UnsupportedPoller)
        }
    }
}

#[cfg(windows)]
pub fn detect(record_titles: bool) -> Box<dyn FocusPoller> {
    Box::new(windows::WindowsPoller::new(record_titles))
}

#[cfg(not(any(target_os = "linux", windows)))]
pub fn detect(_record_titles: bool) -> Box<dyn FocusPoller> {
    warn!("No focus backend available for this platform");
    Box::new(UnsupportedPoller)
}
