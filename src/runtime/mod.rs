//! Concurrency primitives shared by every control loop.
//!
//! ```text
//!  ┌──────────── loop thread (named) ────────────┐
//!  │  block_on(loop future)                      │
//!  │    select { timer.tick(), mailbox.receive(),│
//!  │             stop.stopped() }                │
//!  └─────────────────────────────────────────────┘
//! ```
//!
//! Each loop gets its own OS thread so that blocking collaborator calls
//! (serial reads, HTTP requests) only ever stall the loop that made them.
//! Cross-thread wakeups go through `embassy-sync` primitives and the
//! `embassy-time` host driver.

pub mod mailbox;
pub mod stop;
pub mod timer;

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;

pub use mailbox::{Delivery, Mailbox};
pub use stop::StopSignal;
pub use timer::IntervalTimer;

/// Handle to a running control loop.
pub struct LoopHandle {
    name: &'static str,
    stop: Arc<StopSignal>,
    thread: JoinHandle<()>,
}

impl LoopHandle {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ask the loop to exit. Never blocks.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the loop thread to exit.
    pub fn join(self) {
        if self.thread.join().is_err() {
            log::error!("Runtime: loop '{}' panicked", self.name);
        } else {
            log::info!("Runtime: loop '{}' exited", self.name);
        }
    }
}

/// Spawn a named thread that drives the future returned by `run` to
/// completion. `stop` must be the signal the loop observes.
pub fn spawn_loop<F, Fut>(name: &'static str, stop: Arc<StopSignal>, run: F) -> io::Result<LoopHandle>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()>,
{
    log::info!("Runtime: spawning loop '{}'", name);
    let thread = std::thread::Builder::new()
        .name(name.into())
        .spawn(move || futures_lite::future::block_on(run()))?;
    Ok(LoopHandle { name, stop, thread })
}

/// Signal every loop, then wait for all of them to exit.
pub fn shutdown_all(handles: Vec<LoopHandle>) {
    for h in &handles {
        h.stop();
    }
    for h in handles {
        h.join();
    }
}
