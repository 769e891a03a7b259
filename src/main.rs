//! Hydro monitor field node: entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  ArduinoLevelSensor   RaspistillCamera   HttpBackend           │
//! │  (SensorReader)       (ImageCapture)     (Backend)             │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  Control loops (one thread each)                       │    │
//! │  │  Trigger · Measurer · Analyzer · ConfigWatcher ·       │    │
//! │  │  ManualMeasurementTrigger · PhotoCleaner               │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use log::{info, warn};

use hydronode::adapters::camera::{RaspistillCamera, StaticPicture};
use hydronode::adapters::http_backend::HttpBackend;
use hydronode::app::ports::{Backend, ImageCapture, SensorReader};
use hydronode::config::{CameraMode, NodeConfig, SensorMode};
use hydronode::node::{Collaborators, Housekeeping, Node};
use hydronode::sensors::{ArduinoLevelSensor, ScriptedLevelSensor};

fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    match dotenv {
        Ok(path) => info!("Boot: environment loaded from {}", path.display()),
        Err(e) if e.not_found() => info!("Boot: no .env file, using process environment"),
        Err(e) => warn!("Boot: .env ignored: {}", e),
    }
    info!("Boot: hydronode v{}", env!("CARGO_PKG_VERSION"));

    let config = NodeConfig::from_env();
    config
        .validate()
        .map_err(hydronode::Error::from)
        .context("invalid node configuration")?;
    info!(
        "Boot: node '{}' reporting to {}",
        config.node_name, config.server_url
    );

    let collaborators = build_collaborators(&config)?;
    let housekeeping = Housekeeping {
        pictures_dir: config.pictures_dir.clone().into(),
        retention: config.picture_retention(),
    };

    let node = Node::start(config.timings(), collaborators, Some(housekeeping))
        .context("starting control loops")?;

    wait_for_shutdown_signal()?;
    node.shutdown();
    info!("Boot: bye");
    Ok(())
}

fn build_collaborators(config: &NodeConfig) -> Result<Collaborators> {
    let sensor: Box<dyn SensorReader + Send> = match config.sensor_mode {
        SensorMode::Serial => Box::new(
            ArduinoLevelSensor::open(
                &config.serial_port,
                config.baud_rate,
                config.sensor_read_timeout(),
                config.water_sensor_distance,
            )
            .context("opening water level sensor")?,
        ),
        SensorMode::Scripted => {
            info!("Boot: scripted sensor {:?}", config.measurements);
            Box::new(ScriptedLevelSensor::new(config.measurements.clone()))
        }
    };

    let camera: Arc<Mutex<dyn ImageCapture + Send>> = match config.camera_mode {
        CameraMode::Raspistill => {
            if let Err(e) = std::fs::create_dir_all(&config.pictures_dir) {
                warn!("Boot: cannot create {}: {}", config.pictures_dir, e);
            }
            Arc::new(Mutex::new(RaspistillCamera::new(&config.pictures_dir)))
        }
        CameraMode::Static => Arc::new(Mutex::new(StaticPicture::new(&config.static_picture_path))),
    };

    let backend: Arc<dyn Backend> = Arc::new(
        HttpBackend::new(config)
            .map_err(hydronode::Error::from)
            .context("building HTTP client")?,
    );

    Ok(Collaborators {
        sensor,
        camera,
        backend,
    })
}

/// Block until SIGINT or SIGTERM.
fn wait_for_shutdown_signal() -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building signal runtime")?;

    rt.block_on(async {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};
            let mut sigterm = signal(SignalKind::terminate())?;
            futures_lite::future::or(tokio::signal::ctrl_c(), async {
                sigterm.recv().await;
                Ok(())
            })
            .await
        }
        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await
        }
    })
    .context("waiting for shutdown signal")?;

    info!("Boot: shutdown signal received");
    Ok(())
}
