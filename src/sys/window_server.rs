//! The windowing collaborator, and an in-memory implementation of it.
//!
//! The mosaic core never talks to a toolkit directly. Everything it needs
//! from one goes through [`WindowServer`]: creating and destroying windows,
//! reading and writing their outer frame, visibility and docking state,
//! focus, and intercepting user close requests so the controller can decide
//! what a close means for the window's group.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace, warn};

use super::geometry::Rect;

/// Opaque window identifier issued by the windowing collaborator.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct WindowHandle(u64);

impl WindowHandle {
    #[inline]
    pub fn new(id: u64) -> Self { Self(id) }

    #[inline]
    pub fn get(self) -> u64 { self.0 }
}

impl From<WindowHandle> for u64 {
    #[inline]
    fn from(handle: WindowHandle) -> Self { handle.0 }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Error, PartialEq)]
pub enum WindowServerError {
    #[error("Unknown window {0}")]
    UnknownWindow(WindowHandle),
    #[error("Window backend failure: {0}")]
    Backend(String),
}

pub trait WindowServer {
    fn create_window(&mut self, title: Option<&str>) -> Result<WindowHandle, WindowServerError>;
    fn frame(&self, handle: WindowHandle) -> Option<Rect>;
    fn set_frame(&mut self, handle: WindowHandle, frame: Rect) -> Result<(), WindowServerError>;
    /// Windows hidden by other tooling report `false` and are left alone.
    fn is_visible(&self, handle: WindowHandle) -> bool;
    /// Docked windows are positioned by the host and must not be moved.
    fn is_docked(&self, handle: WindowHandle) -> bool;
    fn focus(&mut self, handle: WindowHandle);
    fn destroy(&mut self, handle: WindowHandle);
    /// Route future user close requests for `handle` to the mosaic
    /// controller instead of destroying the window outright.
    fn intercept_close(&mut self, handle: WindowHandle);
}

/// What happened when the user asked a window to close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseRequest {
    /// The close is intercepted; forward it to the controller.
    Intercepted(WindowHandle),
    /// Nobody intercepts this window, so it is gone.
    Destroyed,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessWindow {
    pub title: Option<String>,
    pub frame: Rect,
    pub visible: bool,
    pub docked: bool,
    pub intercept_close: bool,
}

/// Windows that live only in memory. Used by the command-line host and by
/// tests; it records every frame write and focus change.
#[derive(Debug, Default)]
pub struct HeadlessWindowServer {
    windows: BTreeMap<WindowHandle, HeadlessWindow>,
    next_id: u64,
    focus_log: Vec<WindowHandle>,
    frame_writes: usize,
}

impl HeadlessWindowServer {
    pub fn new() -> Self { Self::default() }

    pub fn window(&self, handle: WindowHandle) -> Option<&HeadlessWindow> {
        self.windows.get(&handle)
    }

    pub fn windows(&self) -> impl Iterator<Item = (WindowHandle, &HeadlessWindow)> {
        self.windows.iter().map(|(h, w)| (*h, w))
    }

    pub fn len(&self) -> usize { self.windows.len() }

    pub fn is_empty(&self) -> bool { self.windows.is_empty() }

    pub fn contains(&self, handle: WindowHandle) -> bool { self.windows.contains_key(&handle) }

    pub fn set_visible(&mut self, handle: WindowHandle, visible: bool) {
        if let Some(window) = self.windows.get_mut(&handle) {
            window.visible = visible;
        }
    }

    pub fn set_docked(&mut self, handle: WindowHandle, docked: bool) {
        if let Some(window) = self.windows.get_mut(&handle) {
            window.docked = docked;
        }
    }

    /// Simulates the user clicking a window's close button.
    pub fn request_close(&mut self, handle: WindowHandle) -> CloseRequest {
        match self.windows.get(&handle) {
            None => CloseRequest::Unknown,
            Some(window) if window.intercept_close => CloseRequest::Intercepted(handle),
            Some(_) => {
                self.destroy(handle);
                CloseRequest::Destroyed
            }
        }
    }

    pub fn focus_log(&self) -> &[WindowHandle] { &self.focus_log }

    pub fn clear_focus_log(&mut self) { self.focus_log.clear(); }

    pub fn frame_writes(&self) -> usize { self.frame_writes }
}

impl WindowServer for HeadlessWindowServer {
    fn create_window(&mut self, title: Option<&str>) -> Result<WindowHandle, WindowServerError> {
        self.next_id += 1;
        let handle = WindowHandle::new(self.next_id);
        self.windows.insert(handle, HeadlessWindow {
            title: title.map(str::to_string),
            frame: Rect::ZERO,
            visible: true,
            docked: false,
            intercept_close: false,
        });
        debug!(%handle, ?title, "Created headless window");
        Ok(handle)
    }

    fn frame(&self, handle: WindowHandle) -> Option<Rect> {
        self.windows.get(&handle).map(|w| w.frame)
    }

    fn set_frame(&mut self, handle: WindowHandle, frame: Rect) -> Result<(), WindowServerError> {
        let window =
            self.windows.get_mut(&handle).ok_or(WindowServerError::UnknownWindow(handle))?;
        trace!(%handle, ?frame, "set_frame");
        window.frame = frame;
        self.frame_writes += 1;
        Ok(())
    }

    fn is_visible(&self, handle: WindowHandle) -> bool {
        self.windows.get(&handle).is_some_and(|w| w.visible)
    }

    fn is_docked(&self, handle: WindowHandle) -> bool {
        self.windows.get(&handle).is_some_and(|w| w.docked)
    }

    fn focus(&mut self, handle: WindowHandle) {
        if self.windows.contains_key(&handle) {
            self.focus_log.push(handle);
        }
    }

    fn destroy(&mut self, handle: WindowHandle) {
        if self.windows.remove(&handle).is_none() {
            warn!(%handle, "Destroy requested for unknown window");
        } else {
            debug!(%handle, "Destroyed headless window");
        }
    }

    fn intercept_close(&mut self, handle: WindowHandle) {
        if let Some(window) = self.windows.get_mut(&handle) {
            window.intercept_close = true;
        }
    }
}
