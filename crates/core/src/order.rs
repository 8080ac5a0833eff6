//! Placed orders and their delivery countdown.
//!
//! ```text
//! in-progress --(remaining_time reaches 0)--> delivered
//! ```
//!
//! `delivered` is terminal: ticks and catch-ups never touch a delivered order.
//!
//! The wall clock bounds every countdown: an order placed at `start_time`
//! with a `duration` of 180 s has at most `180 - (now - start_time)` seconds
//! left, however many ticks were missed.

use serde::{Deserialize, Serialize};

use crate::cart::CartLine;
use crate::countdown::{Countdown, Tick};
use crate::types::{Money, OrderId, OrderStatus, UserId};

/// Default delivery countdown for a new order, in seconds.
pub const DEFAULT_ORDER_COUNTDOWN_SECS: u32 = 180;

/// An order the user has paid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredOrder")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Cart snapshot at placement.
    pub items: Vec<CartLine>,
    /// `Σ unit_price × quantity` over `items`.
    pub total: Money,
    /// Placement time, epoch seconds.
    pub start_time: i64,
    /// Seconds until delivery.
    pub remaining_time: u32,
    pub status: OrderStatus,
    /// Countdown length at placement, in seconds.
    pub duration: u32,
}

/// The persisted shape of an [`Order`].
///
/// Records without a `duration` count down from their stored
/// `remaining_time` as of `start_time`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredOrder {
    id: OrderId,
    user_id: UserId,
    items: Vec<CartLine>,
    total: Money,
    start_time: i64,
    remaining_time: u32,
    status: OrderStatus,
    #[serde(default)]
    duration: Option<u32>,
}

impl From<StoredOrder> for Order {
    fn from(stored: StoredOrder) -> Self {
        Self {
            id: stored.id,
            user_id: stored.user_id,
            items: stored.items,
            total: stored.total,
            start_time: stored.start_time,
            remaining_time: stored.remaining_time,
            status: stored.status,
            duration: stored.duration.unwrap_or(stored.remaining_time),
        }
    }
}

impl Order {
    /// Place an order for `items`, starting its delivery countdown now.
    #[must_use]
    pub fn place(
        id: OrderId,
        user_id: UserId,
        items: Vec<CartLine>,
        start_time: i64,
        countdown_secs: u32,
    ) -> Self {
        let total = items.iter().map(CartLine::line_total).sum();
        let mut order = Self {
            id,
            user_id,
            items,
            total,
            start_time,
            remaining_time: countdown_secs,
            status: OrderStatus::InProgress,
            duration: countdown_secs,
        };
        if countdown_secs == 0 {
            order.status = OrderStatus::Delivered;
        }
        order
    }

    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        self.status.is_terminal()
    }

    /// Advance the countdown by one second.
    ///
    /// Returns true when this tick delivered the order.
    pub fn tick(&mut self) -> bool {
        if self.is_delivered() {
            return false;
        }
        let mut countdown = Countdown::start(self.remaining_time);
        let tick = countdown.tick();
        self.remaining_time = countdown.remaining();
        match tick {
            Tick::Finished | Tick::Idle => {
                self.status = OrderStatus::Delivered;
                true
            }
            Tick::Running(_) => false,
        }
    }

    /// Account for wall-clock time that passed while nobody was ticking.
    ///
    /// `remaining_time` drops to `max(duration - (now - start_time), 0)`
    /// when that is lower; it never goes back up. Returns true when the
    /// catch-up delivered the order.
    pub fn catch_up(&mut self, now: i64) -> bool {
        if self.is_delivered() {
            return false;
        }
        let mut countdown = Countdown::start(self.duration);
        countdown.fast_forward(now.saturating_sub(self.start_time));
        self.remaining_time = self.remaining_time.min(countdown.remaining());
        if self.remaining_time == 0 {
            self.status = OrderStatus::Delivered;
            return true;
        }
        false
    }

    /// One tick of the background ticker at wall-clock time `now`.
    ///
    /// Returns true when the order was delivered by this call.
    pub fn advance(&mut self, now: i64) -> bool {
        self.tick() || self.catch_up(now)
    }
}

/// Hands out time-based order ids that are unique within a process.
///
/// Ids are epoch milliseconds; two orders placed in the same millisecond get
/// consecutive ids.
#[derive(Debug, Default)]
pub struct OrderIdGenerator {
    last: i64,
}

impl OrderIdGenerator {
    #[must_use]
    pub const fn new() -> Self {
        Self { last: 0 }
    }

    /// Seed the generator so ids stay above every id already issued.
    pub fn observe(&mut self, id: OrderId) {
        self.last = self.last.max(id.as_i64());
    }

    /// Next id for an order placed at `now_millis`.
    pub fn next(&mut self, now_millis: i64) -> OrderId {
        self.last = now_millis.max(self.last.saturating_add(1));
        OrderId::new(self.last)
    }
}
