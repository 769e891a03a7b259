//! PhotoCleaner: periodic housekeeping of the local picture directory.
//!
//! Pictures are named after their capture time (see
//! [`picture_name`](crate::app::model::picture_name)). On every tick the
//! cleaner deletes the ones older than the retention window. Files whose
//! names do not parse are left alone, and so are timestamps in the future.
//! It talks to no other loop.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use embassy_time::Duration;
use futures_lite::future;
use log::{debug, error, info, warn};

use crate::app::model::parse_picture_name;
use crate::runtime::{IntervalTimer, StopSignal};

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    pub kept: usize,
    pub skipped: usize,
}

pub struct PhotoCleaner {
    dir: PathBuf,
    retention: chrono::Duration,
    period: Duration,
    timer: IntervalTimer,
    stop: Arc<StopSignal>,
}

impl PhotoCleaner {
    pub fn new(
        dir: impl Into<PathBuf>,
        retention: chrono::Duration,
        period: Duration,
        stop: Arc<StopSignal>,
    ) -> Self {
        Self {
            dir: dir.into(),
            retention,
            period,
            timer: IntervalTimer::disarmed(),
            stop,
        }
    }

    pub async fn run(mut self) {
        info!(
            "PhotoCleaner: started on {}, every {} s",
            self.dir.display(),
            self.period.as_secs()
        );
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

            match self.sweep(Utc::now()) {
                Ok(r) => info!(
                    "PhotoCleaner: deleted {}, kept {}, skipped {}",
                    r.deleted, r.kept, r.skipped
                ),
                Err(e) => error!("PhotoCleaner: cannot read {}: {}", self.dir.display(), e),
            }
        }
        info!("PhotoCleaner: stopped");
    }

    /// Delete every picture captured before `now - retention`.
    pub fn sweep(&self, now: DateTime<Utc>) -> io::Result<SweepReport> {
        let cutoff = now.checked_sub_signed(self.retention).unwrap_or(DateTime::<Utc>::MIN_UTC);
        let mut report = SweepReport::default();

        for entry in fs::read_dir(&self.dir)? {
            let path = match entry {
                Ok(e) => e.path(),
                Err(e) => {
                    warn!("PhotoCleaner: unreadable entry: {}", e);
                    report.skipped += 1;
                    continue;
                }
            };
            if !path.is_file() {
                continue;
            }

            let Some(taken_at) = capture_time(&path) else {
                debug!("PhotoCleaner: skipping {}", path.display());
                report.skipped += 1;
                continue;
            };

            if taken_at >= cutoff {
                report.kept += 1;
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => {
                    debug!("PhotoCleaner: deleted {}", path.display());
                    report.deleted += 1;
                }
                Err(e) => {
                    warn!("PhotoCleaner: cannot delete {}: {}", path.display(), e);
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }
}

fn capture_time(path: &Path) -> Option<DateTime<Utc>> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .and_then(parse_picture_name)
}
