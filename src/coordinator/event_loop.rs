//! Event loop driving a coordinator.
//!
//! All coordinator state is touched from the loop thread only. Host notifications,
//! toggle changes and the prefetched solar days arrive as [`CoordinatorEvent`]s on
//! one mpsc channel; the loop blocks on it with `recv_timeout` until the next
//! periodic refresh or the return-to-sunset deadline, whichever is sooner.
//!
//! In simulation the channel is drained without blocking and the simulated clock
//! is advanced instead, so a day runs in seconds.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError, channel};
use std::time::Duration as StdDuration;

use crate::constants::IDLE_WAKEUP_INTERVAL_SECS;
use crate::host::HostRuntime;
use crate::logger::Log;
use crate::manager::CoverStateChange;
use crate::time_source;

use super::scheduler::Scheduler;
use super::solar_day::SolarDay;
use super::Coordinator;

/// A runtime toggle written through from a presentation switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleChange {
    ClimateMode(bool),
    PreferOutsideTemp(bool),
    AutomaticControl(bool),
    RespectManual(bool),
    Lux(bool),
    Irradiance(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CoordinatorEvent {
    /// A tracked input entity changed.
    EntityChanged(String),
    /// One of the group's covers reported a new state.
    CoverChanged(CoverStateChange),
    Toggle(ToggleChange),
    ResetManualOverride,
    SolarWindowReady(SolarDay),
    SolarWindowFailed(NaiveDate),
    Shutdown,
}

pub struct EventLoop<H: HostRuntime> {
    coordinator: Coordinator,
    host: H,
    scheduler: Scheduler,
    sender: Sender<CoordinatorEvent>,
    receiver: Receiver<CoordinatorEvent>,
    refresh_interval: StdDuration,
    prefetching: Option<NaiveDate>,
    prefetch_failed: Option<NaiveDate>,
}

impl<H: HostRuntime> EventLoop<H> {
    pub fn new(coordinator: Coordinator, host: H) -> Self {
        let (sender, receiver) = channel();
        Self {
            coordinator,
            host,
            scheduler: Scheduler::new(),
            sender,
            receiver,
            refresh_interval: StdDuration::from_secs(IDLE_WAKEUP_INTERVAL_SECS),
            prefetching: None,
            prefetch_failed: None,
        }
    }

    /// Interval of the periodic refresh between events.
    pub fn with_refresh_interval(mut self, interval: StdDuration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Sender for host notifications and user actions.
    pub fn sender(&self) -> Sender<CoordinatorEvent> {
        self.sender.clone()
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn into_parts(self) -> (Coordinator, H) {
        (self.coordinator, self.host)
    }

    /// Run until a `Shutdown` event arrives or the simulated clock runs out.
    pub fn run(&mut self) -> Result<()> {
        self.refresh();

        while !time_source::simulation_ended() {
            let now = time_source::now();
            if self.fire_due(now) {
                continue;
            }
            self.prefetch_solar_day(now);

            let wait = self.next_wait(now);
            match self.next_event(wait) {
                Some(CoordinatorEvent::Shutdown) => break,
                Some(event) => self.handle_event(event),
                None => self.refresh(),
            }
        }

        Ok(())
    }

    /// Drain and handle every queued event without blocking.
    pub fn process_pending(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            if event == CoordinatorEvent::Shutdown {
                break;
            }
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: CoordinatorEvent) {
        let now = time_source::now();
        match event {
            CoordinatorEvent::EntityChanged(_) => self.refresh(),
            CoordinatorEvent::CoverChanged(change) => {
                self.coordinator.handle_cover_state_change(change);
                self.refresh();
            }
            CoordinatorEvent::Toggle(toggle) => {
                match self.coordinator.apply_toggle(toggle) {
                    Ok(()) => self.refresh(),
                    Err(e) => {
                        let _scope = Log::scope(self.coordinator.name());
                        log_warning!("Ignoring {toggle:?}: {e}");
                    }
                }
            }
            CoordinatorEvent::ResetManualOverride => {
                if let Err(e) = self.coordinator.reset_manual_override(&mut self.host, now) {
                    let _scope = Log::scope(self.coordinator.name());
                    log_error!("Manual override reset failed: {e}");
                }
            }
            CoordinatorEvent::SolarWindowReady(day) => {
                if self.prefetching == Some(day.date) {
                    self.prefetching = None;
                }
                self.coordinator.install_solar_day(day);
            }
            CoordinatorEvent::SolarWindowFailed(date) => {
                self.prefetching = None;
                self.prefetch_failed = Some(date);
            }
            CoordinatorEvent::Shutdown => {}
        }
    }

    fn refresh(&mut self) {
        let now = time_source::now();
        if let Err(e) = self.coordinator.refresh(&mut self.host, now) {
            let _scope = Log::scope(self.coordinator.name());
            log_error!("Refresh failed: {e:#}");
        }
        self.rearm_sunset_timer(now);
    }

    /// Keep the return-to-sunset timer in line with the resolved end time.
    fn rearm_sunset_timer(&mut self, now: DateTime<Utc>) {
        let _scope = Log::scope(self.coordinator.name());
        match self.coordinator.sunset_deadline(&self.host, now) {
            Some(deadline) => {
                let replaced = self.scheduler.deadline().is_some();
                if self.scheduler.schedule_at(deadline) && self.coordinator.debug_enabled() {
                    log_debug!(
                        "{} return to sunset position at {}",
                        if replaced { "Rescheduled" } else { "Scheduled" },
                        deadline.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
            }
            // A deadline that is already due stays armed until it has fired
            None if self.scheduler.deadline().is_some_and(|deadline| deadline <= now) => {}
            None => {
                if self.scheduler.cancel() && self.coordinator.debug_enabled() {
                    log_debug!("Cancelled return to sunset position");
                }
            }
        }
    }

    fn fire_due(&mut self, now: DateTime<Utc>) -> bool {
        if !self.scheduler.take_due(now) {
            return false;
        }
        self.coordinator.return_to_sunset(&mut self.host, now);
        self.rearm_sunset_timer(now);
        true
    }

    fn next_wait(&self, now: DateTime<Utc>) -> StdDuration {
        match self.scheduler.time_until(now) {
            Some(until) => until.min(self.refresh_interval),
            None => self.refresh_interval,
        }
    }

    /// Wait up to `wait` for the next event. `None` means the wait elapsed.
    fn next_event(&mut self, wait: StdDuration) -> Option<CoordinatorEvent> {
        if time_source::is_simulated() {
            return match self.receiver.try_recv() {
                Ok(event) => Some(event),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => {
                    time_source::sleep(wait);
                    None
                }
            };
        }

        match self.receiver.recv_timeout(wait) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) => None,
            // The loop holds a sender itself, so this only happens on teardown
            Err(RecvTimeoutError::Disconnected) => Some(CoordinatorEvent::Shutdown),
        }
    }

    /// Compute the next missing solar day on a worker thread.
    fn prefetch_solar_day(&mut self, now: DateTime<Utc>) {
        if self.prefetching.is_some() {
            return;
        }
        let Some(date) = self.coordinator.missing_solar_day(now) else {
            return;
        };
        if self.prefetch_failed == Some(date) {
            return;
        }

        self.prefetching = Some(date);
        let sun = self.coordinator.sun_data().clone();
        let window = self.coordinator.window_geometry().clone();
        let name = self.coordinator.name().to_string();
        let sender = self.sender.clone();

        std::thread::spawn(move || {
            let _scope = Log::scope(&name);
            let event = match SolarDay::compute(&sun, &window, date) {
                Ok(day) => CoordinatorEvent::SolarWindowReady(day),
                Err(e) => {
                    log_warning!("Prefetching the solar window for {date} failed: {e:#}");
                    CoordinatorEvent::SolarWindowFailed(date)
                }
            };
            let _ = sender.send(event);
        });
    }
}
