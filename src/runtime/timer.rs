//! Restartable interval timer.
//!
//! Owned by exactly one loop and awaited inside that loop's select. Arming
//! replaces the whole schedule: the next tick lands one full period after
//! the call, so a partially elapsed period is discarded and the old schedule
//! can never fire again.
//!
//! If the owner falls behind by more than one period, the missed ticks are
//! skipped rather than delivered as a burst.

use embassy_time::{Duration, Instant, Timer};

#[derive(Debug)]
pub struct IntervalTimer {
    period: Option<Duration>,
    next: Instant,
}

impl IntervalTimer {
    /// A timer that never ticks until armed.
    pub fn disarmed() -> Self {
        Self {
            period: None,
            next: Instant::MAX,
        }
    }

    /// A timer armed with `period` from now.
    pub fn armed(period: Duration) -> Self {
        let mut t = Self::disarmed();
        t.arm(period);
        t
    }

    /// (Re)start the schedule. Returns `false` and leaves the timer untouched
    /// for a zero period.
    pub fn arm(&mut self, period: Duration) -> bool {
        if period == Duration::from_ticks(0) {
            log::warn!("Timer: refusing to arm with a zero period");
            return false;
        }
        self.period = Some(period);
        self.next = Instant::now().checked_add(period).unwrap_or(Instant::MAX);
        true
    }

    pub fn disarm(&mut self) {
        self.period = None;
        self.next = Instant::MAX;
    }

    pub fn period(&self) -> Option<Duration> {
        self.period
    }

    pub fn is_armed(&self) -> bool {
        self.period.is_some()
    }

    /// Resolve at the next scheduled tick. Pends forever while disarmed.
    ///
    /// Cancel-safe: the schedule only advances once the tick has fired.
    pub async fn tick(&mut self) {
        let Some(period) = self.period else {
            return core::future::pending().await;
        };
        Timer::at(self.next).await;

        let now = Instant::now();
        let period_ticks = period.as_ticks();
        let late = now.as_ticks().saturating_sub(self.next.as_ticks());
        let skipped = late / period_ticks;
        if skipped > 0 {
            log::debug!("Timer: skipped {} missed tick(s)", skipped);
        }
        let advance = period_ticks.saturating_mul(skipped + 1);
        self.next = Instant::from_ticks(self.next.as_ticks().saturating_add(advance));
    }
}
