//! Pre-capture countdown.
//!
//! [`Countdown`] is the bare counter; the controller drives it from
//! [`countdown_ticker`] while in `CountdownToCapture`.  The tick that brings
//! the counter to zero is the one that fires capture, so a countdown from `n`
//! fires after exactly `n` ticks and reports zero exactly once.

use std::time::Duration;

use tokio::time::{Interval, MissedTickBehavior};

/// Interval that paces the countdown.
///
/// Ticks missed while the runtime was stalled are not replayed back to back;
/// the schedule restarts from the late tick so every remaining step still
/// gets a full period.
pub fn countdown_ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Outcome of one countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    /// Still counting; seconds left.
    Remaining(u32),
    /// Counter reached zero: capture now.
    Elapsed,
}

#[derive(Debug, Clone)]
pub struct Countdown {
    remaining: u32,
    elapsed: bool,
}

impl Countdown {
    pub fn new(start: u32) -> Self {
        Self {
            remaining: start,
            elapsed: false,
        }
    }

    /// Advance by one time unit.
    ///
    /// Returns `None` once the countdown has already elapsed, so a stray
    /// extra tick can never fire capture twice.
    pub fn tick(&mut self) -> Option<CountdownTick> {
        if self.elapsed {
            return None;
        }

        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.elapsed = true;
            Some(CountdownTick::Elapsed)
        } else {
            Some(CountdownTick::Remaining(self.remaining))
        }
    }
}
