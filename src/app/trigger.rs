//! Trigger: adaptive periodic timer that drives scheduled sampling.
//!
//! ```text
//!  Analyzer ──interval──▶ ┌─────────┐
//!                         │ Trigger │ ──Scheduled──▶ Measurer
//!       IntervalTimer ──▶ └─────────┘
//! ```
//!
//! The Trigger never reads the band configuration: its period only changes
//! when the Analyzer sends a new interval. A different interval re-arms the
//! timer from scratch, discarding whatever part of the old period had
//! already elapsed; an identical one is ignored so steady readings do not
//! keep postponing the next sample.

use std::sync::Arc;

use embassy_time::Duration;
use futures_lite::future;
use log::{debug, info, warn};

use crate::app::model::SampleKind;
use crate::runtime::{Delivery, IntervalTimer, Mailbox, StopSignal};

enum Event {
    Tick,
    Interval(Duration),
    Stop,
}

pub struct Trigger {
    initial: Duration,
    timer: IntervalTimer,
    intervals: Arc<Mailbox<Duration>>,
    measurer: Arc<Mailbox<SampleKind>>,
    send_timeout: Duration,
    stop: Arc<StopSignal>,
}

impl Trigger {
    pub fn new(
        initial: Duration,
        intervals: Arc<Mailbox<Duration>>,
        measurer: Arc<Mailbox<SampleKind>>,
        send_timeout: Duration,
        stop: Arc<StopSignal>,
    ) -> Self {
        Self {
            initial,
            timer: IntervalTimer::disarmed(),
            intervals,
            measurer,
            send_timeout,
            stop,
        }
    }

    pub async fn run(mut self) {
        self.timer.arm(self.initial);
        info!("Trigger: started, every {} ms", self.initial.as_millis());

        loop {
            let event = {
                let Self {
                    timer,
                    intervals,
                    stop,
                    ..
                } = &mut self;
                future::or(
                    async {
                        stop.stopped().await;
                        Event::Stop
                    },
                    future::or(
                        async { Event::Interval(intervals.receive().await) },
                        async {
                            timer.tick().await;
                            Event::Tick
                        },
                    ),
                )
                .await
            };

            match event {
                Event::Stop => break,
                Event::Interval(interval) => self.apply_interval(interval),
                Event::Tick => self.request_sample().await,
            }
        }

        self.timer.disarm();
        info!("Trigger: stopped");
    }

    fn apply_interval(&mut self, interval: Duration) {
        if interval == Duration::from_ticks(0) {
            warn!("Trigger: ignoring zero interval");
            return;
        }
        if self.timer.period() == Some(interval) {
            debug!("Trigger: interval unchanged ({} ms)", interval.as_millis());
            return;
        }
        let previous = self.timer.period().map_or(0, |p| p.as_millis());
        if self.timer.arm(interval) {
            info!(
                "Trigger: interval {} ms -> {} ms",
                previous,
                interval.as_millis()
            );
        }
    }

    async fn request_sample(&self) {
        debug!("Trigger: tick");
        if self.measurer.send_timeout(SampleKind::Scheduled, self.send_timeout).await == Delivery::TimedOut {
            warn!("Trigger: Measurer busy, scheduled sample skipped");
        }
    }
}
