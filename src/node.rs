//! Node wiring: creates the mailboxes, starts every control loop on its
//! own thread and tears them all down again.
//!
//! ```text
//!                 Configuration                     interval
//!  ConfigWatcher ───────────────▶ ┌──────────┐ ─────────────▶ ┌─────────┐
//!                                 │ Analyzer │                │ Trigger │
//!                    level ┌────▶ └──────────┘                └────┬────┘
//!                          │                                       │ Scheduled
//!                     ┌────┴─────┐ ◀───────────────────────────────┘
//!                     │ Measurer │
//!                     └──────────┘ ◀─── Manual ─── ManualMeasurementTrigger
//!
//!  PhotoCleaner (independent)
//! ```
//!
//! Shutdown signals every loop first and only then waits for each to exit,
//! so no loop is ever waited on while another still depends on it.

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use embassy_time::Duration;

use crate::app::analyzer::Analyzer;
use crate::app::cleaner::PhotoCleaner;
use crate::app::measurer::Measurer;
use crate::app::model::{Configuration, SampleKind};
use crate::app::poller::{ConfigSource, ConfigWatcher, ManualMeasurementTrigger, ManualRequestSource};
use crate::app::ports::{Backend, ImageCapture, SensorReader};
use crate::app::trigger::Trigger;
use crate::config::Timings;
use crate::runtime::{LoopHandle, Mailbox, StopSignal, shutdown_all, spawn_loop};

/// The outside world, as seen by the loops.
pub struct Collaborators {
    pub sensor: Box<dyn SensorReader + Send>,
    pub camera: Arc<Mutex<dyn ImageCapture + Send>>,
    pub backend: Arc<dyn Backend>,
}

/// Settings for the picture housekeeping loop.
#[derive(Debug, Clone)]
pub struct Housekeeping {
    pub pictures_dir: PathBuf,
    pub retention: chrono::Duration,
}

/// The five message flows between loops.
struct Links {
    configurations: Arc<Mailbox<Configuration>>,
    levels: Arc<Mailbox<f64>>,
    intervals: Arc<Mailbox<Duration>>,
    scheduled: Arc<Mailbox<SampleKind>>,
    manual: Arc<Mailbox<SampleKind>>,
}

impl Links {
    fn new() -> Self {
        Self {
            configurations: Arc::new(Mailbox::new()),
            levels: Arc::new(Mailbox::new()),
            intervals: Arc::new(Mailbox::new()),
            scheduled: Arc::new(Mailbox::new()),
            manual: Arc::new(Mailbox::new()),
        }
    }
}

/// A running node.
pub struct Node {
    handles: Vec<LoopHandle>,
}

impl Node {
    /// Start every loop. If any thread cannot be spawned, the loops already
    /// started are shut down again before the error is returned.
    pub fn start(
        timings: Timings,
        collaborators: Collaborators,
        housekeeping: Option<Housekeeping>,
    ) -> io::Result<Self> {
        let mut node = Self { handles: Vec::new() };
        if let Err(e) = node.launch(timings, collaborators, housekeeping) {
            log::error!("Node: startup failed: {}", e);
            node.shutdown();
            return Err(e);
        }
        log::info!("Node: {} loops running", node.handles.len());
        Ok(node)
    }

    fn launch(
        &mut self,
        t: Timings,
        c: Collaborators,
        housekeeping: Option<Housekeeping>,
    ) -> io::Result<()> {
        let links = Links::new();

        let stop = Arc::new(StopSignal::new());
        let analyzer = Analyzer::new(
            Arc::clone(&links.levels),
            Arc::clone(&links.configurations),
            Arc::clone(&links.intervals),
            t.interval_update_timeout,
            Arc::clone(&stop),
        );
        self.handles
            .push(spawn_loop("analyzer", stop, move || analyzer.run())?);

        let stop = Arc::new(StopSignal::new());
        let measurer = Measurer::new(
            c.sensor,
            c.camera,
            Arc::clone(&c.backend),
            Arc::clone(&links.scheduled),
            Arc::clone(&links.manual),
            Arc::clone(&links.levels),
            t.measurement_to_analyzer_timeout,
            Arc::clone(&stop),
        );
        self.handles
            .push(spawn_loop("measurer", stop, move || measurer.run())?);

        let stop = Arc::new(StopSignal::new());
        let trigger = Trigger::new(
            t.initial_trigger_interval,
            Arc::clone(&links.intervals),
            Arc::clone(&links.scheduled),
            t.trigger_to_measurer_timeout,
            Arc::clone(&stop),
        );
        self.handles
            .push(spawn_loop("trigger", stop, move || trigger.run())?);

        let stop = Arc::new(StopSignal::new());
        let watcher = ConfigWatcher::new(
            ConfigSource::new(Arc::clone(&c.backend)),
            t.configuration_update_interval,
            Arc::clone(&links.configurations),
            t.configuration_update_timeout,
            Arc::clone(&stop),
        )
        .poll_on_start(true);
        self.handles
            .push(spawn_loop("config-watcher", stop, move || watcher.run())?);

        let stop = Arc::new(StopSignal::new());
        let manual = ManualMeasurementTrigger::new(
            ManualRequestSource::new(Arc::clone(&c.backend)),
            t.manual_poll_interval,
            Arc::clone(&links.manual),
            t.manual_request_send_timeout,
            Arc::clone(&stop),
        );
        self.handles
            .push(spawn_loop("manual-trigger", stop, move || manual.run())?);

        if let Some(h) = housekeeping {
            let stop = Arc::new(StopSignal::new());
            let cleaner = PhotoCleaner::new(
                h.pictures_dir,
                h.retention,
                t.photo_cleaning_interval,
                Arc::clone(&stop),
            );
            self.handles
                .push(spawn_loop("photo-cleaner", stop, move || cleaner.run())?);
        }
        Ok(())
    }

    /// Names of the loops that are currently running.
    pub fn running_loops(&self) -> Vec<&'static str> {
        self.handles
            .iter()
            .filter(|h| !h.is_finished())
            .map(LoopHandle::name)
            .collect()
    }

    /// Stop every loop and wait for all of them to exit.
    pub fn shutdown(self) {
        log::info!("Node: shutting down");
        shutdown_all(self.handles);
        log::info!("Node: all loops exited");
    }
}
