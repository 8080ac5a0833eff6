//! The countdown primitive.
//!
//! One second per [`Countdown::tick`] until zero, then finished for good.
//! Orders embed one each; the standalone ETA timer in the session crate wraps
//! one with an on/off gate.

use serde::{Deserialize, Serialize};

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The countdown was already at zero; nothing changed.
    Idle,
    /// One second elapsed and time remains.
    Running(u32),
    /// This tick brought the countdown to zero.
    Finished,
}

/// Seconds remaining until something happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    /// Start a countdown of `duration_secs`.
    #[must_use]
    pub const fn start(duration_secs: u32) -> Self {
        Self {
            remaining: duration_secs,
        }
    }

    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// Advance by one second.
    pub const fn tick(&mut self) -> Tick {
        match self.remaining {
            0 => Tick::Idle,
            1 => {
                self.remaining = 0;
                Tick::Finished
            }
            n => {
                self.remaining = n - 1;
                Tick::Running(n - 1)
            }
        }
    }

    /// Advance by `elapsed_secs` at once, saturating at zero.
    ///
    /// Negative elapsed time (a clock that went backwards) changes nothing.
    pub fn fast_forward(&mut self, elapsed_secs: i64) {
        let elapsed = u32::try_from(elapsed_secs.max(0)).unwrap_or(u32::MAX);
        self.remaining = self.remaining.saturating_sub(elapsed);
    }
}

/// Render an ETA the way the order tracking card shows it (`"2 min 5 s"`).
#[must_use]
pub fn format_eta(seconds: u32) -> String {
    format!("{} min {} s", seconds / 60, seconds % 60)
}
