//! Broadcast scheduler: three independent interval timers.
//!
//! # How the timers work (for beginners)
//!
//! Each timer remembers when it last fired.  On every tick the session asks
//! "is it due?", and a due timer is re-armed *at the moment it fires*:
//!
//! ```text
//!   interval = 100 ms, ticks every 30 ms
//!
//!   t=0 arm ─ 30 ─ 60 ─ 90 ─ 120 FIRE ─ 150 ─ 180 ─ 210 FIRE ─ ...
//!                                 └──── next due at 220, not 200
//! ```
//!
//! Delays therefore accumulate instead of bursting: a slow frame never causes
//! two state broadcasts back to back.
//!
//! A timer is only polled while its precondition holds.  A map request timer
//! that has been ineligible for five seconds (no host known yet) fires on the
//! very first tick after a host appears, because its last firing is long past.

use std::time::{Duration, Instant};

use tileshare_core::Role;

use crate::application::session::SessionConfig;

/// A repeating timer measured from its last firing.
#[derive(Debug, Clone, Copy)]
pub struct IntervalTimer {
    interval: Duration,
    last_fired: Instant,
}

impl IntervalTimer {
    pub fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval,
            last_fired: now,
        }
    }

    /// Restarts the interval from `now`.
    pub fn rearm(&mut self, now: Instant) {
        self.last_fired = now;
    }

    /// Returns `true` once at least one full interval has elapsed.
    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_fired) >= self.interval
    }

    /// Fires and re-arms if due.
    pub fn poll(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.rearm(now);
            true
        } else {
            false
        }
    }
}

/// Which periodic messages are due on this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Due {
    pub state_broadcast: bool,
    pub host_announce: bool,
    pub map_request: bool,
}

impl Due {
    pub fn any(&self) -> bool {
        self.state_broadcast || self.host_announce || self.map_request
    }
}

/// Owns the three session timers and their eligibility rules.
#[derive(Debug, Clone)]
pub struct BroadcastScheduler {
    state: IntervalTimer,
    host_announce: IntervalTimer,
    map_request: IntervalTimer,
}

impl BroadcastScheduler {
    pub fn new(config: &SessionConfig, now: Instant) -> Self {
        Self {
            state: IntervalTimer::new(config.state_interval, now),
            host_announce: IntervalTimer::new(config.host_announce_interval, now),
            map_request: IntervalTimer::new(config.map_request_interval, now),
        }
    }

    /// Restarts every timer from `now` (called when the session starts).
    pub fn arm(&mut self, now: Instant) {
        self.state.rearm(now);
        self.host_announce.rearm(now);
        self.map_request.rearm(now);
    }

    /// Polls every eligible timer.
    ///
    /// - State broadcast: host, or guest with a known host.
    /// - Host announcement: host only.
    /// - Map request: guest with a known host and no map yet.
    pub fn poll(&mut self, now: Instant, role: Role, host_known: bool, has_map: bool) -> Due {
        let is_host = role.is_host();
        let guest_with_host = !is_host && host_known;

        Due {
            state_broadcast: (is_host || guest_with_host) && self.state.poll(now),
            host_announce: is_host && self.host_announce.poll(now),
            map_request: guest_with_host && !has_map && self.map_request.poll(now),
        }
    }
}
