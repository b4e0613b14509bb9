//! Break coordinator.
//!
//! A state machine over the reminder alarm and the `is_break_active` flag:
//!
//! ```text
//! Idle-Scheduled --reminder fires--> Break-Active --start/snooze--> Idle-Scheduled
//!       ^  |                                                            |
//!       |  +--toggle off--> Disabled --toggle on------------------------+
//! ```
//!
//! Every handler updates the in-memory record first, then talks to the alarm
//! facility and the store. Host failures are collected and reported to the
//! caller, never panicked on; the record stays usable either way.
//!
//! ## Usage
//!
//! ```ignore
//! let mut coordinator = BreakCoordinator::initialize(host, settings);
//! coordinator.ensure_installed()?;
//! let response = coordinator.handle(Request::GetStats);
//! ```

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::clock::Clock;
use crate::color::current_color_temperature;
use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::host::{
    minutes_to_ms, AlarmScheduler, AlarmSpec, StateStore, WindowHost, WindowId, WindowSpec,
};
use crate::protocol::{
    NextBreakIn, Request, Response, SnoozeResponse, StartBreakResponse, StatsResponse,
    ToggleResponse,
};
use crate::session::{has_record, stored_color_temp, BreakSession, SessionKey};
use crate::storage::{Config, Database};

/// One-shot alarm that may start a break.
pub const BREAK_REMINDER_ALARM: &str = "breakReminder";
/// Periodic alarm driving screen-time and color accounting.
pub const SCREEN_TIME_ALARM: &str = "screenTimeTracker";

const EVENT_CAPACITY: usize = 64;

/// Timing and window settings the coordinator runs with.
#[derive(Debug, Clone)]
pub struct BreakSettings {
    pub interval_min: u64,
    pub snooze_min: u64,
    pub tick_period_min: u64,
    pub window: WindowSpec,
}

impl BreakSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval_min: config.breaks.interval_min,
            snooze_min: config.breaks.snooze_min,
            tick_period_min: config.runtime.tick_period_min,
            window: config.notification.window_spec(),
        }
    }
}

impl Default for BreakSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// The host services a coordinator is wired to.
#[derive(Clone)]
pub struct HostServices {
    pub store: Arc<dyn StateStore>,
    pub alarms: Arc<dyn AlarmScheduler>,
    pub windows: Arc<dyn WindowHost>,
    pub clock: Arc<dyn Clock>,
}

impl HostServices {
    /// One SQLite database serving as both store and alarm facility.
    pub fn sqlite(db: Arc<Database>, windows: Arc<dyn WindowHost>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: db.clone(),
            alarms: db,
            windows,
            clock,
        }
    }
}

pub struct BreakCoordinator {
    settings: BreakSettings,
    session: BreakSession,
    notification_window: Option<WindowId>,
    needs_install: bool,
    host: HostServices,
    events: broadcast::Sender<Event>,
}

impl BreakCoordinator {
    /// Load the full record (or defaults) before any request is served.
    ///
    /// A store that cannot be read leaves the coordinator running on
    /// defaults; it is not treated as a fresh installation.
    pub fn initialize(host: HostServices, settings: BreakSettings) -> Self {
        let now = host.clock.now_ms();
        let defaults = BreakSession::install_defaults(
            settings.interval_min,
            now,
            current_color_temperature(host.clock.as_ref()),
        );

        let (session, needs_install) = match host.store.get(&SessionKey::all_names()) {
            Ok(stored) => (defaults.merge_stored(&stored), !has_record(&stored)),
            Err(e) => {
                tracing::warn!(error = %e, "could not load break state, starting from defaults");
                (defaults, false)
            }
        };

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            settings,
            session,
            notification_window: None,
            needs_install,
            host,
            events,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> &BreakSession {
        &self.session
    }

    pub fn settings(&self) -> &BreakSettings {
        &self.settings
    }

    pub fn notification_window(&self) -> Option<WindowId> {
        self.notification_window
    }

    pub fn needs_install(&self) -> bool {
        self.needs_install
    }

    /// Whether a reminder alarm is currently scheduled.
    pub fn reminder_pending(&self) -> Result<bool> {
        Ok(self.host.alarms.get(BREAK_REMINDER_ALARM)?.is_some())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<Event> {
        self.events.clone()
    }

    /// Stats as the popup sees them. Never fails: a store that cannot be
    /// read yields memory values plus an `error`.
    pub fn get_stats(&self) -> StatsResponse {
        let now = self.host.clock.now_ms();
        let interval = self.settings.interval_min;

        match self.host.store.get(&SessionKey::all_names()) {
            Ok(stored) => {
                let view = self.session.merge_stored(&stored);
                let color_temp = stored_color_temp(&stored)
                    .unwrap_or_else(|| current_color_temperature(self.host.clock.as_ref()));
                let next_break_in = if view.enabled && !view.is_break_active {
                    NextBreakIn::remaining(interval, view.last_break_time, now)
                } else {
                    NextBreakIn::full(interval)
                };
                StatsResponse {
                    is_enabled: view.enabled,
                    break_count: view.break_count,
                    total_screen_time: view.total_screen_time,
                    last_break_time: view.last_break_time,
                    color_temp,
                    next_break_in,
                    is_break_active: view.is_break_active,
                    error: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "stats read failed, answering from memory");
                StatsResponse {
                    is_enabled: self.session.enabled,
                    break_count: self.session.break_count,
                    total_screen_time: self.session.total_screen_time,
                    last_break_time: self.session.last_break_time,
                    color_temp: current_color_temperature(self.host.clock.as_ref()),
                    next_break_in: NextBreakIn::full(interval),
                    is_break_active: self.session.is_break_active,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Write the default record, start the screen-time tick and schedule
    /// the first reminder.
    pub fn install(&mut self) -> Result<()> {
        let now = self.host.clock.now_ms();
        self.session = BreakSession::install_defaults(
            self.settings.interval_min,
            now,
            current_color_temperature(self.host.clock.as_ref()),
        );
        self.close_notification_window();

        let persisted = self.persist(&SessionKey::ALL);
        let ticker = self
            .host
            .alarms
            .create(
                SCREEN_TIME_ALARM,
                AlarmSpec::every_minutes(self.settings.tick_period_min),
                now,
            )
            .map(|_| ())
            .map_err(CoreError::from);
        let scheduled = self.begin_interval(self.settings.interval_min);

        self.needs_install = false;
        if let Ok(next_break_at_ms) = scheduled {
            tracing::info!(next_break_at_ms, "installed");
            self.emit(Event::Installed {
                next_break_at_ms,
                at: self.host.clock.now_utc(),
            });
        }
        persisted?;
        ticker?;
        scheduled.map(|_| ())
    }

    /// Install on first run; otherwise keep the stored interval in step
    /// with the configured one.
    pub fn ensure_installed(&mut self) -> Result<()> {
        if self.needs_install {
            return self.install();
        }
        if self.session.break_interval_min == self.settings.interval_min {
            return Ok(());
        }

        tracing::info!(
            from = self.session.break_interval_min,
            to = self.settings.interval_min,
            "break interval changed"
        );
        self.session.break_interval_min = self.settings.interval_min;
        let persisted = self.persist(&[SessionKey::BreakInterval]);
        let rescheduled = if self.session.enabled && !self.session.is_break_active {
            self.resume_reminder().map(|_| ())
        } else {
            Ok(())
        };
        persisted?;
        rescheduled
    }

    /// Bring alarms and windows back in line with the record after a
    /// restart: the tick alarm must exist, a running interval must have a
    /// reminder, and an active break must have its window.
    pub fn reconcile_alarms(&mut self) -> Result<()> {
        self.refresh_from_store();
        let now = self.host.clock.now_ms();

        let tick_period_ms = minutes_to_ms(self.settings.tick_period_min);
        let tick = self.host.alarms.get(SCREEN_TIME_ALARM)?;
        if tick.map_or(true, |alarm| alarm.period_ms != Some(tick_period_ms)) {
            self.host.alarms.create(
                SCREEN_TIME_ALARM,
                AlarmSpec::every_minutes(self.settings.tick_period_min),
                now,
            )?;
        }

        let reminder = self.host.alarms.get(BREAK_REMINDER_ALARM)?;
        let counting_down = self.session.enabled && !self.session.is_break_active;

        if counting_down && reminder.is_none() {
            self.resume_reminder()?;
        } else if !counting_down && reminder.is_some() {
            self.host.alarms.clear(BREAK_REMINDER_ALARM)?;
        }

        if self.session.enabled
            && self.session.is_break_active
            && self.notification_window.is_none()
        {
            self.open_notification_window();
        }
        Ok(())
    }

    // ── Alarms ───────────────────────────────────────────────────────

    /// Dispatch a fired alarm by name.
    pub fn on_alarm(&mut self, name: &str) -> Result<()> {
        match name {
            BREAK_REMINDER_ALARM => self.on_break_reminder(),
            SCREEN_TIME_ALARM => self.on_screen_time_tick(),
            other => {
                tracing::warn!(alarm = other, "ignoring unknown alarm");
                Ok(())
            }
        }
    }

    /// Fire every alarm that is due now, earliest first. Returns how many
    /// fired. Handler errors are logged; only a failing alarm facility
    /// is reported.
    pub fn fire_due_alarms(&mut self) -> Result<usize> {
        let due = self.host.alarms.take_due(self.host.clock.now_ms())?;
        for alarm in &due {
            tracing::debug!(alarm = %alarm.name, scheduled_at_ms = alarm.scheduled_at_ms, "alarm fired");
            if let Err(e) = self.on_alarm(&alarm.name) {
                tracing::warn!(alarm = %alarm.name, error = %e, "alarm handler failed");
            }
        }
        Ok(due.len())
    }

    fn on_break_reminder(&mut self) -> Result<()> {
        self.refresh_from_store();
        if !self.session.enabled || self.session.is_break_active {
            tracing::debug!(
                enabled = self.session.enabled,
                is_break_active = self.session.is_break_active,
                "reminder ignored"
            );
            self.emit(Event::ReminderIgnored {
                enabled: self.session.enabled,
                is_break_active: self.session.is_break_active,
                at: self.host.clock.now_utc(),
            });
            return Ok(());
        }

        self.close_notification_window();
        let window_id = self.open_notification_window();

        self.session.break_count += 1;
        self.session.is_break_active = true;
        let cleared = self
            .host
            .alarms
            .clear(BREAK_REMINDER_ALARM)
            .map(|_| ())
            .map_err(CoreError::from);
        let persisted = self.persist(&[SessionKey::BreakCount, SessionKey::IsBreakActive]);

        tracing::info!(break_count = self.session.break_count, "break reminder shown");
        self.emit(Event::ReminderShown {
            break_count: self.session.break_count,
            window_id: window_id.map(|id| id.0),
            at: self.host.clock.now_utc(),
        });
        cleared?;
        persisted
    }

    fn on_screen_time_tick(&mut self) -> Result<()> {
        self.refresh_from_store();
        self.session.total_screen_time += 1;
        self.session.color_temp = current_color_temperature(self.host.clock.as_ref());
        let persisted = self.persist(&[SessionKey::TotalScreenTime, SessionKey::ColorTemp]);
        self.emit(Event::ScreenTimeTracked {
            total_screen_time: self.session.total_screen_time,
            color_temp: self.session.color_temp,
            at: self.host.clock.now_utc(),
        });
        persisted
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Answer one protocol request. Failures become `{success: false}`.
    pub fn handle(&mut self, request: Request) -> Response {
        match request {
            Request::StartBreak => match self.start_break() {
                Ok(break_count) => Response::StartBreak(StartBreakResponse {
                    success: true,
                    break_count,
                }),
                Err(e) => {
                    tracing::error!(error = %e, "startBreak failed");
                    Response::failure(e)
                }
            },
            Request::SnoozeBreak => match self.snooze_break() {
                Ok(()) => Response::Snooze(SnoozeResponse { success: true }),
                Err(e) => {
                    tracing::error!(error = %e, "snoozeBreak failed");
                    Response::failure(e)
                }
            },
            Request::ToggleEnabled { is_enabled } => match self.toggle_enabled(is_enabled) {
                Ok(next_break_in) => Response::Toggle(ToggleResponse {
                    success: true,
                    is_enabled: self.session.enabled,
                    next_break_in,
                }),
                Err(e) => {
                    tracing::error!(error = %e, "toggleEnabled failed");
                    Response::failure(e)
                }
            },
            Request::GetStats => Response::Stats(self.get_stats()),
        }
    }

    /// Count a break, end the break UI and start a fresh interval.
    /// Returns the new break count.
    pub fn start_break(&mut self) -> Result<u64> {
        self.refresh_from_store();
        self.session.break_count += 1;
        self.close_notification_window();
        self.session.is_break_active = false;

        let scheduled = self.begin_interval(self.settings.interval_min);
        let persisted = self.persist(&[
            SessionKey::BreakCount,
            SessionKey::IsBreakActive,
            SessionKey::LastBreakTime,
        ]);

        if let Ok(next_break_at_ms) = scheduled {
            tracing::info!(break_count = self.session.break_count, next_break_at_ms, "break started");
            self.emit(Event::BreakStarted {
                break_count: self.session.break_count,
                next_break_at_ms,
                at: self.host.clock.now_utc(),
            });
        }
        scheduled?;
        persisted?;
        Ok(self.session.break_count)
    }

    /// Postpone the reminder by the snooze length and end the break UI.
    pub fn snooze_break(&mut self) -> Result<()> {
        self.refresh_from_store();
        self.close_notification_window();
        self.session.is_break_active = false;

        let scheduled = self.begin_interval(self.settings.snooze_min);
        let persisted = self.persist(&[SessionKey::IsBreakActive, SessionKey::LastBreakTime]);

        if let Ok(next_break_at_ms) = scheduled {
            tracing::info!(next_break_at_ms, "break snoozed");
            self.emit(Event::BreakSnoozed {
                next_break_at_ms,
                at: self.host.clock.now_utc(),
            });
        }
        scheduled?;
        persisted
    }

    /// Turn reminders on (fresh interval) or off (reminder cancelled).
    pub fn toggle_enabled(&mut self, enabled: bool) -> Result<NextBreakIn> {
        self.refresh_from_store();
        self.session.enabled = enabled;
        let now = self.host.clock.now_ms();

        if enabled {
            self.close_notification_window();
            self.session.is_break_active = false;
            let scheduled = self.begin_interval(self.settings.interval_min);
            let persisted = self.persist(&[
                SessionKey::IsEnabled,
                SessionKey::IsBreakActive,
                SessionKey::LastBreakTime,
            ]);
            if let Ok(next_break_at_ms) = scheduled {
                tracing::info!(next_break_at_ms, "reminders enabled");
                self.emit(Event::RemindersEnabled {
                    next_break_at_ms,
                    at: self.host.clock.now_utc(),
                });
            }
            scheduled?;
            persisted?;
            Ok(NextBreakIn::remaining(
                self.settings.interval_min,
                self.session.last_break_time,
                now,
            ))
        } else {
            let cleared = self
                .host
                .alarms
                .clear(BREAK_REMINDER_ALARM)
                .map_err(CoreError::from);
            let persisted = self.persist(&[SessionKey::IsEnabled]);
            tracing::info!("reminders disabled");
            self.emit(Event::RemindersDisabled {
                at: self.host.clock.now_utc(),
            });
            cleared?;
            persisted?;
            Ok(NextBreakIn::full(self.settings.interval_min))
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Start a new reminder interval: `last_break_time = now` and the
    /// reminder alarm replaced by one `delay_min` from now.
    fn begin_interval(&mut self, delay_min: u64) -> Result<u64> {
        let now = self.host.clock.now_ms();
        self.session.last_break_time = now;
        let alarm = self.host.alarms.create(
            BREAK_REMINDER_ALARM,
            AlarmSpec::once_in_minutes(delay_min),
            now,
        )?;
        Ok(alarm.scheduled_at_ms)
    }

    /// Schedule the reminder for what is left of the current interval,
    /// leaving `last_break_time` untouched.
    fn resume_reminder(&mut self) -> Result<u64> {
        let now = self.host.clock.now_ms();
        let last_break = match self.session.last_break_time {
            0 => now,
            at => at,
        };
        let elapsed = now.saturating_sub(last_break);
        let delay_ms = minutes_to_ms(self.settings.interval_min).saturating_sub(elapsed);
        let alarm = self.host.alarms.create(
            BREAK_REMINDER_ALARM,
            AlarmSpec::once_in_ms(delay_ms),
            now,
        )?;
        tracing::info!(next_break_at_ms = alarm.scheduled_at_ms, "reminder restored");
        self.emit(Event::ReminderRestored {
            next_break_at_ms: alarm.scheduled_at_ms,
            at: self.host.clock.now_utc(),
        });
        Ok(alarm.scheduled_at_ms)
    }

    /// Re-merge the stored record so changes made by other processes
    /// sharing the store are seen. Stored values win. A break ended
    /// elsewhere takes our window with it.
    fn refresh_from_store(&mut self) {
        match self.host.store.get(&SessionKey::all_names()) {
            Ok(stored) => self.session = self.session.merge_stored(&stored),
            Err(e) => tracing::warn!(error = %e, "refresh failed, keeping in-memory state"),
        }
        if !self.session.is_break_active {
            self.close_notification_window();
        }
    }

    fn persist(&self, keys: &[SessionKey]) -> Result<()> {
        self.host
            .store
            .set(self.session.to_store_values(keys))
            .map_err(|e| {
                tracing::error!(error = %e, "failed to persist break state");
                CoreError::from(e)
            })
    }

    fn open_notification_window(&mut self) -> Option<WindowId> {
        match self.host.windows.open(&self.settings.window) {
            Ok(id) => {
                self.notification_window = Some(id);
                Some(id)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to create notification window");
                None
            }
        }
    }

    fn close_notification_window(&mut self) {
        if let Some(id) = self.notification_window.take() {
            if let Err(e) = self.host.windows.close(id) {
                tracing::warn!(window = %id, error = %e, "failed to close notification window");
            }
        }
    }

    fn emit(&self, event: Event) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
