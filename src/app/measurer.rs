//! Measurer: runs one sample-and-upload cycle per request.
//!
//! ```text
//!  Trigger ─────────Scheduled──▶ ┌──────────┐ ──level──▶ Analyzer
//!                                │ Measurer │
//!  ManualTrigger ───Manual─────▶ └──────────┘ ──▶ Backend (+ photo thread)
//! ```
//!
//! A cycle is: timestamp, sensor read, hand the level to the Analyzer
//! (bounded), persist the measurement, then capture and upload one photo on
//! a detached thread. A failed sensor read or a failed post ends the cycle;
//! a slow Analyzer does not. Photo failures never touch the persisted
//! measurement.
//!
//! When both ingress mailboxes hold a request, the one served first
//! alternates between them, so a steady scheduled cadence cannot starve a
//! manual request past its send timeout (or the reverse).

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use chrono::{DateTime, Utc};
use embassy_time::Duration;
use futures_lite::future;
use log::{debug, error, info, warn};

use crate::app::model::{Measurement, MeasurementId, Picture, SampleKind, picture_name};
use crate::app::ports::{Backend, ImageCapture, SensorReader};
use crate::error::{CameraError, Result};
use crate::runtime::{Delivery, Mailbox, StopSignal};

/// Each measurement carries a single picture.
const PICTURE_NUMBER: u32 = 1;

enum Event {
    Sample(SampleKind),
    Stop,
}

pub struct Measurer {
    sensor: Box<dyn SensorReader + Send>,
    camera: Arc<Mutex<dyn ImageCapture + Send>>,
    backend: Arc<dyn Backend>,
    scheduled: Arc<Mailbox<SampleKind>>,
    manual: Arc<Mailbox<SampleKind>>,
    levels: Arc<Mailbox<f64>>,
    analyzer_timeout: Duration,
    stop: Arc<StopSignal>,
    /// Poll the manual mailbox first on the next wait.
    manual_first: bool,
}

impl Measurer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sensor: Box<dyn SensorReader + Send>,
        camera: Arc<Mutex<dyn ImageCapture + Send>>,
        backend: Arc<dyn Backend>,
        scheduled: Arc<Mailbox<SampleKind>>,
        manual: Arc<Mailbox<SampleKind>>,
        levels: Arc<Mailbox<f64>>,
        analyzer_timeout: Duration,
        stop: Arc<StopSignal>,
    ) -> Self {
        Self {
            sensor,
            camera,
            backend,
            scheduled,
            manual,
            levels,
            analyzer_timeout,
            stop,
            manual_first: true,
        }
    }

    pub async fn run(mut self) {
        info!("Measurer: started");
        let stop = Arc::clone(&self.stop);
        loop {
            let event = future::or(
                async {
                    stop.stopped().await;
                    Event::Stop
                },
                async { Event::Sample(self.next_request().await) },
            )
            .await;

            match event {
                Event::Stop => break,
                Event::Sample(kind) => {
                    info!("Measurer: {:?} sample requested", kind);
                    if let Err(e) = self.sample(kind).await {
                        error!("Measurer: cycle aborted: {}", e);
                    }
                }
            }
        }
        info!("Measurer: stopped");
    }

    /// Wait for the next sample request. Whichever kind is served, the
    /// other one is polled first next time.
    async fn next_request(&mut self) -> SampleKind {
        let (first, second) = if self.manual_first {
            (&self.manual, &self.scheduled)
        } else {
            (&self.scheduled, &self.manual)
        };
        let kind = future::or(first.receive(), second.receive()).await;
        self.manual_first = !kind.is_manual();
        kind
    }

    /// One full measurement cycle. The photo upload is only started, not
    /// awaited.
    pub async fn sample(&mut self, kind: SampleKind) -> Result<MeasurementId> {
        let timestamp = Utc::now();
        let value = self.sensor.read_level()?;
        info!("Measurer: water level {}", value);

        match self.levels.send_timeout(value, self.analyzer_timeout).await {
            Delivery::Delivered => debug!("Measurer: level handed to Analyzer"),
            Delivery::TimedOut => warn!("Measurer: Analyzer did not take level {} in time", value),
        }

        let measurement = Measurement {
            timestamp,
            value,
            is_manual: kind.is_manual(),
        };
        let id = self.backend.post_measurement(&measurement)?;
        info!("Measurer: measurement {} persisted", id);

        self.spawn_photo_upload(id, timestamp);
        Ok(id)
    }

    fn spawn_photo_upload(&self, id: MeasurementId, taken_at: DateTime<Utc>) {
        let camera = Arc::clone(&self.camera);
        let backend = Arc::clone(&self.backend);
        let name = picture_name(taken_at);

        let spawned = thread::Builder::new()
            .name("photo-upload".into())
            .spawn(move || match upload_photo(&camera, backend.as_ref(), id, &name) {
                Ok(()) => info!("Measurer: picture '{}' uploaded for {}", name, id),
                Err(e) => error!("Measurer: picture for {} not uploaded: {}", id, e),
            });
        if let Err(e) = spawned {
            error!("Measurer: could not start photo upload: {}", e);
        }
    }
}

fn upload_photo(
    camera: &Mutex<dyn ImageCapture + Send>,
    backend: &dyn Backend,
    id: MeasurementId,
    name: &str,
) -> Result<()> {
    let path = camera
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .capture(name)?;
    let bytes = std::fs::read(&path).map_err(|e| CameraError::Io(e.kind()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name)
        .to_string();

    backend.post_picture(
        id,
        &Picture {
            number: PICTURE_NUMBER,
            file_name,
            bytes,
        },
    )?;
    Ok(())
}
