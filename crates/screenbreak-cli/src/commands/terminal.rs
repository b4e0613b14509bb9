use std::sync::atomic::{AtomicU64, Ordering};

use screenbreak_core::{WindowError, WindowHost, WindowId, WindowSpec};

/// Shows the break window as a banner on stderr.
#[derive(Debug, Default)]
pub struct TerminalWindowHost {
    next_id: AtomicU64,
}

pub const BANNER: &str = "Time for a break: look 20 feet away for 20s";

impl WindowHost for TerminalWindowHost {
    fn open(&self, spec: &WindowSpec) -> Result<WindowId, WindowError> {
        let id = WindowId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        eprintln!();
        eprintln!("==============================================");
        eprintln!("  {BANNER}");
        eprintln!("  screenbreak countdown | start-break | snooze");
        eprintln!("==============================================");
        tracing::info!(window = %id, page = %spec.page, "break window opened");
        Ok(id)
    }

    fn close(&self, id: WindowId) -> Result<(), WindowError> {
        tracing::info!(window = %id, "break window closed");
        Ok(())
    }
}
