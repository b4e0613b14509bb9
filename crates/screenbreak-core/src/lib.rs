//! # Screenbreak Core Library
//!
//! Core logic for the Screenbreak eye-break reminder. Every 20 minutes of
//! screen time the user is asked to look away for 20 seconds; a periodic
//! tick tracks screen time and suggests a color temperature for the time
//! of day. The CLI and any GUI front end are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Coordinator**: the break state machine, driven by alarms and requests
//! - **Host**: traits for the key-value store, alarm facility, window host and clock
//! - **Storage**: SQLite-backed store and alarms, TOML configuration
//! - **Runtime**: a tokio service that owns the coordinator and polls alarms
//!
//! ## Key Components
//!
//! - [`BreakCoordinator`]: break state machine
//! - [`Database`]: persistent store and alarm table
//! - [`Config`]: application configuration
//! - [`CoordinatorService`]: async request/alarm loop

pub mod clock;
pub mod color;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod host;
pub mod protocol;
pub mod runtime;
pub mod session;
pub mod storage;
pub mod window;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{
    BreakCoordinator, BreakSettings, HostServices, BREAK_REMINDER_ALARM, SCREEN_TIME_ALARM,
};
pub use error::{ConfigError, CoreError, StoreError, ValidationError, WindowError};
pub use events::Event;
pub use host::{Alarm, AlarmScheduler, AlarmSpec, StateStore, StoreValues, WindowHost, WindowId, WindowSpec};
pub use protocol::{NextBreakIn, Request, Response, StatsResponse};
pub use runtime::{CoordinatorHandle, CoordinatorService};
pub use session::{BreakSession, SessionKey};
pub use storage::{Config, Database};
pub use window::{HeadlessWindowHost, RecordingWindowHost};
