//! Single-order ETA timer.
//!
//! Some screens show one countdown for "the order in progress" rather than
//! the per-order countdowns of [`OrderTracker`](crate::stores::OrderTracker).
//! The timer is a [`Countdown`] behind an on/off gate: it only moves while
//! an order is in progress, and reaching zero switches the gate off.

use delivecrous_core::{Countdown, Tick, format_eta};

/// Default ETA timer duration, in seconds.
pub const DEFAULT_TIMER_SECS: u32 = 600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTimer {
    duration_secs: u32,
    countdown: Countdown,
    order_in_progress: bool,
}

impl Default for OrderTimer {
    fn default() -> Self {
        Self::new(DEFAULT_TIMER_SECS)
    }
}

impl OrderTimer {
    /// An idle timer that counts down `duration_secs` once started.
    #[must_use]
    pub const fn new(duration_secs: u32) -> Self {
        Self {
            duration_secs,
            countdown: Countdown::start(duration_secs),
            order_in_progress: false,
        }
    }

    #[must_use]
    pub const fn remaining_time(&self) -> u32 {
        self.countdown.remaining()
    }

    #[must_use]
    pub const fn order_in_progress(&self) -> bool {
        self.order_in_progress
    }

    /// Remaining time as `"<m> min <s> s"`.
    #[must_use]
    pub fn eta(&self) -> String {
        format_eta(self.remaining_time())
    }

    /// Restart from the full duration with an order in progress.
    pub const fn start(&mut self) {
        self.countdown = Countdown::start(self.duration_secs);
        self.order_in_progress = true;
    }

    pub const fn set_remaining_time(&mut self, secs: u32) {
        self.countdown = Countdown::start(secs);
    }

    pub const fn set_order_in_progress(&mut self, in_progress: bool) {
        self.order_in_progress = in_progress;
    }

    /// Advance one second if an order is in progress.
    pub const fn tick(&mut self) -> Tick {
        if !self.order_in_progress {
            return Tick::Idle;
        }
        let tick = self.countdown.tick();
        if !matches!(tick, Tick::Running(_)) {
            self.order_in_progress = false;
        }
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_until_started() {
        let mut timer = OrderTimer::default();
        assert_eq!(timer.remaining_time(), 600);
        assert_eq!(timer.tick(), Tick::Idle);
        assert_eq!(timer.remaining_time(), 600);
    }

    #[test]
    fn test_runs_to_zero_and_closes_the_gate() {
        let mut timer = OrderTimer::new(2);
        timer.start();
        assert_eq!(timer.tick(), Tick::Running(1));
        assert_eq!(timer.eta(), "0 min 1 s");
        assert_eq!(timer.tick(), Tick::Finished);
        assert!(!timer.order_in_progress());
        assert_eq!(timer.tick(), Tick::Idle);
    }

    #[test]
    fn test_setters() {
        let mut timer = OrderTimer::default();
        timer.set_remaining_time(125);
        timer.set_order_in_progress(true);
        assert_eq!(timer.eta(), "2 min 5 s");

        timer.set_remaining_time(0);
        assert_eq!(timer.tick(), Tick::Idle);
        assert!(!timer.order_in_progress());
    }
}
