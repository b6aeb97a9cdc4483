use std::{ffi::OsString, os::windows::prelude::*};

use log::{debug, error};
use windows::Win32::{
    Foundation::{CloseHandle, FALSE, HMODULE, HWND},
    System::{
        ProcessStatus::GetModuleBaseNameW,
        Threading::{OpenProcess, PROCESS_QUERY_INFORMATION, PROCESS_VM_READ},
    },
    UI::WindowsAndMessaging::{
        GetForegroundWindow, GetWindowTextLengthW, GetWindowTextW, GetWindowThreadProcessId,
    },
};

use super::{FocusPoller, WindowDescriptor};
use crate::error::PollError;

/// Foreground-window lookup through user32/psapi.
pub struct WindowsPoller {
    record_titles: bool,
}

impl WindowsPoller {
    pub fn new(record_titles: bool) -> Self {
        Self { record_titles }
    }

    fn poll(&self) -> Result<WindowDescriptor, PollError> {
        let window = unsafe { GetForegroundWindow() };
        if window.is_invalid() {
            return Err(PollError::NoActiveWindow);
        }

        let process_name = get_process_name(window)?;
        let mut descriptor =
            WindowDescriptor::new((window.0 as usize).to_string(), process_name);
        if self.record_titles {
            descriptor.title = unsafe { get_window_title(window) };
        }
        Ok(descriptor)
    }
}

impl FocusPoller for WindowsPoller {
    fn current_window(&self) -> Option<WindowDescriptor> {
        match self.poll() {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                debug!("Failed to get the foreground window: {err}");
                None
            }
        }
    }
}

unsafe fn get_window_title(window: HWND) -> Option<String> {
    let length = GetWindowTextLengthW(window);
    if length == 0 {
        return None;
    }

    let mut buffer = vec![0u16; (length + 1) as usize];
    let len = GetWindowTextW(window, &mut buffer);
    buffer.truncate(len as usize);

    String::from_utf16(&buffer).ok()
}

fn get_process_name(window: HWND) -> Result<String, PollError> {
    let mut process_id = 0;
    unsafe { GetWindowThreadProcessId(window, Some(&mut process_id)) };
    if process_id == 0 {
        return Err(PollError::Backend("GetWindowThreadProcessId returned no process".into()));
    }

    let handle = unsafe {
        OpenProcess(
            PROCESS_QUERY_INFORMATION | PROCESS_VM_READ,
            FALSE,
            process_id,
        )
    }
    .map_err(|e| PollError::Backend(format!("OpenProcess failed: {e:?}")))?;

    let mut buffer = [0u16; 260];
    let len = unsafe { GetModuleBaseNameW(handle, HMODULE::default(), &mut buffer) };
    unsafe {
        if CloseHandle(handle).is_err() {
            error!("Unable to close the process handle");
        }
    };

    if len == 0 {
        return Err(PollError::Backend("GetModuleBaseNameW failed".into()));
    }
    Ok(OsString::from_wide(&buffer[..len as usize])
        .to_string_lossy()
        .into_owned())
}
