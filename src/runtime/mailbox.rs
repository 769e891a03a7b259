//! Bounded-wait rendezvous mailbox.
//!
//! A one-slot `embassy-sync` channel carries the message; a second one-slot
//! channel carries the receiver's acknowledgement back to the sender. A send
//! only counts as delivered once the receiver has taken the message out of
//! the slot, so the sender blocks exactly as long as an unbuffered channel
//! would, up to its timeout.
//!
//! ```text
//!            slot (T, depth 1)
//!  sender ───────────────────────▶ receiver
//!         ◀───────────────────────
//!            taken ((), depth 1)
//! ```
//!
//! On timeout the sender pulls its own message back out of the slot. If the
//! slot is already empty the receiver won the race, and the send is reported
//! as delivered once its acknowledgement lands. Either way a timed-out
//! message is never observed by the receiver later.
//!
//! Each mailbox has exactly one producer and one consumer.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant, with_timeout};

/// Outcome of [`Mailbox::send_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The receiver took the message.
    Delivered,
    /// Nobody took the message before the deadline; it was discarded.
    TimedOut,
}

impl Delivery {
    pub fn is_delivered(self) -> bool {
        self == Self::Delivered
    }
}

/// Single-producer, single-consumer rendezvous point.
pub struct Mailbox<T> {
    slot: Channel<CriticalSectionRawMutex, T, 1>,
    taken: Channel<CriticalSectionRawMutex, (), 1>,
}

impl<T> Mailbox<T> {
    pub const fn new() -> Self {
        Self {
            slot: Channel::new(),
            taken: Channel::new(),
        }
    }

    /// Hand `msg` to the receiver, waiting at most `timeout` for it to be
    /// taken.
    ///
    /// Not cancel-safe: callers must drive a send to completion rather than
    /// racing it against other futures. Every send is bounded by its own
    /// timeout, so this never stalls a loop indefinitely.
    pub async fn send_timeout(&self, msg: T, timeout: Duration) -> Delivery {
        let deadline = Instant::now().checked_add(timeout).unwrap_or(Instant::MAX);

        if with_timeout(remaining(deadline), self.slot.send(msg)).await.is_err() {
            return Delivery::TimedOut;
        }
        if with_timeout(remaining(deadline), self.taken.receive()).await.is_ok() {
            return Delivery::Delivered;
        }
        if self.slot.try_receive().is_ok() {
            return Delivery::TimedOut;
        }
        // Taken right at the deadline; the ack follows immediately.
        self.taken.receive().await;
        Delivery::Delivered
    }

    /// Wait for the next message.
    ///
    /// Cancel-safe: dropping the future before it resolves leaves any
    /// pending message in place for the next call.
    pub async fn receive(&self) -> T {
        let msg = self.slot.receive().await;
        let _ = self.taken.try_send(());
        msg
    }

    /// Take a message if one is waiting right now.
    pub fn try_receive(&self) -> Option<T> {
        let msg = self.slot.try_receive().ok()?;
        let _ = self.taken.try_send(());
        Some(msg)
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}
