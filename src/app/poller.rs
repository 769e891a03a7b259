//! Periodic backend pollers: ConfigWatcher and ManualMeasurementTrigger.
//!
//! Both are the same loop: on every tick ask a [`PollSource`] for news and,
//! if there is any, hand it downstream with a bounded send. Backend errors
//! and send timeouts are logged and the loop simply waits for the next tick.
//! No retries, no backoff.
//!
//! ```text
//!  ConfigWatcher            ──Configuration──▶ Analyzer
//!  ManualMeasurementTrigger ──Manual─────────▶ Measurer
//! ```

use std::sync::Arc;

use embassy_time::Duration;
use futures_lite::future;
use log::{debug, error, info, warn};

use crate::app::model::{Configuration, SampleKind};
use crate::app::ports::Backend;
use crate::error::BackendError;
use crate::runtime::{Delivery, IntervalTimer, Mailbox, StopSignal};

/// One backend read that may or may not produce a message.
pub trait PollSource {
    type Message;

    /// Loop name used in log lines.
    const NAME: &'static str;

    fn poll(&mut self) -> Result<Option<Self::Message>, BackendError>;
}

/// Fetches the node's band configuration.
pub struct ConfigSource {
    backend: Arc<dyn Backend>,
}

impl ConfigSource {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

impl PollSource for ConfigSource {
    type Message = Configuration;
    const NAME: &'static str = "ConfigWatcher";

    fn poll(&mut self) -> Result<Option<Configuration>, BackendError> {
        let config = self.backend.get_configuration()?;
        if config.is_none() {
            info!("ConfigWatcher: backend has no configuration for this node yet");
        }
        Ok(config)
    }
}

/// Checks whether an operator asked for a reading.
pub struct ManualRequestSource {
    backend: Arc<dyn Backend>,
}

impl ManualRequestSource {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }
}

impl PollSource for ManualRequestSource {
    type Message = SampleKind;
    const NAME: &'static str = "ManualMeasurementTrigger";

    fn poll(&mut self) -> Result<Option<SampleKind>, BackendError> {
        let pending = self.backend.get_manual_request_pending()?;
        Ok(pending.then_some(SampleKind::Manual))
    }
}

pub struct Poller<S: PollSource> {
    source: S,
    period: Duration,
    poll_on_start: bool,
    timer: IntervalTimer,
    downstream: Arc<Mailbox<S::Message>>,
    send_timeout: Duration,
    stop: Arc<StopSignal>,
}

pub type ConfigWatcher = Poller<ConfigSource>;
pub type ManualMeasurementTrigger = Poller<ManualRequestSource>;

impl<S: PollSource> Poller<S> {
    pub fn new(
        source: S,
        period: Duration,
        downstream: Arc<Mailbox<S::Message>>,
        send_timeout: Duration,
        stop: Arc<StopSignal>,
    ) -> Self {
        Self {
            source,
            period,
            poll_on_start: false,
            timer: IntervalTimer::disarmed(),
            downstream,
            send_timeout,
            stop,
        }
    }

    /// Poll once right away instead of waiting a full period first.
    #[must_use]
    pub fn poll_on_start(mut self, yes: bool) -> Self {
        self.poll_on_start = yes;
        self
    }

    pub async fn run(mut self) {
        info!("{}: started, every {} ms", S::NAME, self.period.as_millis());
        if self.poll_on_start && !self.stop.is_stopped() {
            self.poll_once().await;
        }
        self.timer.arm(self.period);

        loop {
            let stopped = {
                let Self { timer, stop, .. } = &mut self;
                future::or(
                    async {
                        stop.stopped().await;
                        true
                    },
                    async {
                        timer.tick().await;
                        false
                    },
                )
                .await
            };
            if stopped {
                break;
            }
            self.poll_once().await;
        }
        info!("{}: stopped", S::NAME);
    }

    /// One poll-and-forward round. Returns the delivery outcome when there
    /// was something to forward.
    pub async fn poll_once(&mut self) -> Option<Delivery> {
        let msg = match self.source.poll() {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                debug!("{}: nothing to forward", S::NAME);
                return None;
            }
            Err(e) => {
                error!("{}: poll failed: {}", S::NAME, e);
                return None;
            }
        };

        let outcome = self.downstream.send_timeout(msg, self.send_timeout).await;
        match outcome {
            Delivery::Delivered => debug!("{}: forwarded", S::NAME),
            Delivery::TimedOut => warn!("{}: downstream busy, message dropped", S::NAME),
        }
        Some(outcome)
    }
}
