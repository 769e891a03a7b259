//! Analyzer: the adaptive state machine.
//!
//! Maps each water level reading onto a configured band and tells the
//! Trigger which sampling interval applies.
//!
//! ```text
//!  ConfigWatcher ──Configuration──▶ ┌──────────┐
//!                                   │ Analyzer │ ──interval──▶ Trigger
//!  Measurer ───────────level──────▶ └──────────┘
//! ```
//!
//! The decision rules live in [`Analysis`], which does no I/O; [`Analyzer`]
//! is the loop that feeds it from the mailboxes and forwards its output.
//!
//! | current state | reading                      | next state        | emits      |
//! |---------------|------------------------------|-------------------|------------|
//! | (no config)   | any                          | unchanged         | nothing    |
//! | unknown       | inside a band / default only | band / default    | interval   |
//! | default       | inside a band / default only | band / default    | interval   |
//! | band B        | still inside B               | B                 | B.interval |
//! | band B        | outside B                    | new band/default  | interval   |
//! | any           | matches nothing              | unchanged         | nothing    |

use std::sync::Arc;

use embassy_time::Duration;
use futures_lite::future;
use log::{debug, info, warn};

use crate::app::model::{Configuration, NodeState, State};
use crate::runtime::{Delivery, Mailbox, StopSignal};

// ───────────────────────────────────────────────────────────────
// Analysis (pure decision logic)
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Analysis {
    config: Option<Configuration>,
    current: NodeState,
}

impl Analysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &NodeState {
        &self.current
    }

    pub fn configuration(&self) -> Option<&Configuration> {
        self.config.as_ref()
    }

    /// Swap in a new configuration. The current state is left alone until
    /// the next reading re-evaluates it.
    pub fn replace_configuration(&mut self, config: Configuration) {
        self.config = Some(config);
    }

    /// Process one reading. Returns the interval to hand to the Trigger,
    /// or `None` when nothing should be emitted.
    pub fn analyze(&mut self, level: f64) -> Option<Duration> {
        let Some(config) = &self.config else {
            info!("Analyzer: no configuration yet, dropping level {}", level);
            return None;
        };

        let next: Option<&State> = match &self.current {
            NodeState::Band(name) => match config.get(name) {
                Some(band) if band.contains(level) => {
                    debug!("Analyzer: level {} still in '{}'", level, name);
                    return Some(band.interval());
                }
                Some(_) => config.classify(level),
                None => {
                    warn!("Analyzer: state '{}' no longer configured, rescanning", name);
                    config.classify(level)
                }
            },
            NodeState::Default | NodeState::Unknown => config.classify(level),
        };

        let Some(state) = next else {
            warn!(
                "Analyzer: level {} matches no state and there is no default, staying '{}'",
                level, self.current
            );
            return None;
        };

        let to = NodeState::of(state);
        if to != self.current {
            info!("Analyzer: '{}' -> '{}' (level {})", self.current, to, level);
            self.current = to;
        }
        Some(state.interval())
    }
}

// ───────────────────────────────────────────────────────────────
// Analyzer loop
// ───────────────────────────────────────────────────────────────

enum Event {
    Level(f64),
    Configuration(Configuration),
    Stop,
}

pub struct Analyzer {
    analysis: Analysis,
    levels: Arc<Mailbox<f64>>,
    configurations: Arc<Mailbox<Configuration>>,
    intervals: Arc<Mailbox<Duration>>,
    send_timeout: Duration,
    stop: Arc<StopSignal>,
}

impl Analyzer {
    pub fn new(
        levels: Arc<Mailbox<f64>>,
        configurations: Arc<Mailbox<Configuration>>,
        intervals: Arc<Mailbox<Duration>>,
        send_timeout: Duration,
        stop: Arc<StopSignal>,
    ) -> Self {
        Self {
            analysis: Analysis::new(),
            levels,
            configurations,
            intervals,
            send_timeout,
            stop,
        }
    }

    pub async fn run(mut self) {
        info!("Analyzer: started");
        loop {
            let event = {
                let Self {
                    levels,
                    configurations,
                    stop,
                    ..
                } = &self;
                future::or(
                    async {
                        stop.stopped().await;
                        Event::Stop
                    },
                    future::or(
                        async { Event::Configuration(configurations.receive().await) },
                        async { Event::Level(levels.receive().await) },
                    ),
                )
                .await
            };

            match event {
                Event::Stop => break,
                Event::Configuration(config) => {
                    info!(
                        "Analyzer: configuration replaced ({} bands, default: {})",
                        config.bands().len(),
                        config.default_state().is_some()
                    );
                    self.analysis.replace_configuration(config);
                }
                Event::Level(level) => {
                    if let Some(interval) = self.analysis.analyze(level) {
                        self.emit(interval).await;
                    }
                }
            }
        }
        info!("Analyzer: stopped");
    }

    async fn emit(&self, interval: Duration) {
        match self.intervals.send_timeout(interval, self.send_timeout).await {
            Delivery::Delivered => debug!("Analyzer: interval {} ms sent", interval.as_millis()),
            Delivery::TimedOut => warn!(
                "Analyzer: Trigger did not take interval {} ms in time, dropped",
                interval.as_millis()
            ),
        }
    }
}
