use log::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{Atom, AtomEnum, ConnectionExt, Window};
use x11rb::rust_connection::RustConnection;

use super::{FocusPoller, WindowDescriptor};
use crate::error::PollError;

fn backend<E: std::fmt::Display>(err: E) -> PollError {
    PollError::Backend(err.to_string())
}

/// EWMH focus lookup over an X11 connection.
pub struct X11Poller {
    conn: RustConnection,
    root: Window,
    net_active_window: Atom,
    net_wm_name: Atom,
    record_titles: bool,
}

impl X11Poller {
    pub fn connect(record_titles: bool) -> Result<Self, PollError> {
        let (conn, screen_num) = x11rb::connect(None).map_err(backend)?;
        let root = conn.setup().roots[screen_num].root;
        let net_active_window = intern(&conn, "_NET_ACTIVE_WINDOW")?;
        let net_wm_name = intern(&conn, "_NET_WM_NAME")?;

        Ok(Self {
            conn,
            root,
            net_active_window,
            net_wm_name,
            record_titles,
        })
    }

    fn active_window(&self) -> Result<Window, PollError> {
        let reply = self
            .conn
            .get_property(false, self.root, self.net_active_window, AtomEnum::WINDOW, 0, 1)
            .map_err(backend)?
            .reply()
            .map_err(backend)?;

        match reply.value32().and_then(|mut values| values.next()) {
            Some(0) | None => Err(PollError::NoActiveWindow),
            Some(window) => Ok(window),
        }
    }

    fn text_property(&self, window: Window, property: Atom) -> Result<Option<String>, PollError> {
        let reply = self
            .conn
            .get_property(false, window, property, AtomEnum::ANY, 0, 1024)
            .map_err(backend)?
            .reply()
            .map_err(backend)?;

        if reply.value.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&reply.value).into_owned()))
    }

    // WM_CLASS holds "instance\0class\0"; the class names the program.
    fn window_class(&self, window: Window) -> Result<String, PollError> {
        let raw = self
            .text_property(window, AtomEnum::WM_CLASS.into())?
            .unwrap_or_default();
        let mut parts = raw.split('\0').filter(|part| !part.is_empty());
        let instance = parts.next().unwrap_or_default();
        let class = parts.next().unwrap_or(instance);
        if class != instance {
            debug!("window class & instance differ: class={class} instance={instance}");
        }
        Ok(class.to_string())
    }

    fn window_title(&self, window: Window) -> Option<String> {
        match self.text_property(window, self.net_wm_name) {
            Ok(Some(title)) => return Some(title),
            Ok(None) => {}
            Err(err) => debug!("couldn't get _NET_WM_NAME for {window}: {err}"),
        }
        self.text_property(window, AtomEnum::WM_NAME.into())
            .unwrap_or_else(|err| {
                debug!("failed to get WM_NAME for {window}: {err}");
                None
            })
    }

    fn poll(&self) -> Result<WindowDescriptor, PollError> {
        let window = self.active_window()?;
        let mut descriptor = WindowDescriptor::new(window.to_string(), self.window_class(window)?);
        if self.record_titles {
            descriptor.title = self.window_title(window);
        }
        Ok(descriptor)
    }
}

fn intern(conn: &RustConnection, name: &str) -> Result<Atom, PollError> {
    Ok(conn
        .intern_atom(false, name.as_bytes())
        .map_err(backend)?
        .reply()
        .map_err(backend)?
        .atom)
}

impl FocusPoller for X11Poller {
    fn current_window(&self) -> Option<WindowDescriptor> {
        match self.poll() {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                debug!("Failed to get the current active window: {err}");
                None
            }
        }
    }
}
