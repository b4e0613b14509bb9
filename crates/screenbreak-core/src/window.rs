//! Window hosts without a real windowing system.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::WindowError;
use crate::host::{WindowHost, WindowId, WindowSpec};

/// Logs instead of drawing. Used by one-shot CLI invocations, which have no
/// window of their own to show or close.
#[derive(Debug, Default)]
pub struct HeadlessWindowHost {
    next_id: AtomicU64,
}

impl HeadlessWindowHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WindowHost for HeadlessWindowHost {
    fn open(&self, spec: &WindowSpec) -> Result<WindowId, WindowError> {
        let id = WindowId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        tracing::info!(window = %id, page = %spec.page, "break window requested (headless)");
        Ok(id)
    }

    fn close(&self, id: WindowId) -> Result<(), WindowError> {
        tracing::debug!(window = %id, "close requested (headless)");
        Ok(())
    }
}

/// Remembers which windows are open. Opening can be made to fail.
#[derive(Debug, Default)]
pub struct RecordingWindowHost {
    next_id: AtomicU64,
    open: Mutex<Vec<WindowId>>,
    opened_total: AtomicU64,
    fail_open: AtomicBool,
}

impl RecordingWindowHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `open` fail (or succeed again).
    pub fn set_fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn open_windows(&self) -> Vec<WindowId> {
        self.open.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Number of windows successfully opened so far.
    pub fn opened_total(&self) -> u64 {
        self.opened_total.load(Ordering::SeqCst)
    }
}

impl WindowHost for RecordingWindowHost {
    fn open(&self, _spec: &WindowSpec) -> Result<WindowId, WindowError> {
        if self.fail_open.load(Ordering::SeqCst) {
            return Err(WindowError::CreateFailed("window host refused".into()));
        }
        let id = WindowId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let mut open = self
            .open
            .lock()
            .map_err(|_| WindowError::CreateFailed("window list poisoned".into()))?;
        open.push(id);
        self.opened_total.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    fn close(&self, id: WindowId) -> Result<(), WindowError> {
        let mut open = self.open.lock().map_err(|_| WindowError::NotFound(id.0))?;
        let before = open.len();
        open.retain(|w| *w != id);
        if open.len() == before {
            return Err(WindowError::NotFound(id.0));
        }
        Ok(())
    }
}
