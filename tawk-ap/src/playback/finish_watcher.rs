//! Finish watcher
//!
//! Recurring check against the main channel's last status. A completion is
//! handed to the engine's advance logic on its own task; the latch keeps a
//! second advance from starting while the first is still suspended (for
//! example on the next item's jingle).

use super::engine::PlaybackEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Background finish-detection task
pub struct FinishWatcher {
    task: JoinHandle<()>,
}

impl FinishWatcher {
    /// Spawn the watcher; it exits on its own once the engine is dropped or shut down
    pub fn spawn(engine: Weak<PlaybackEngine>, period: Duration) -> Self {
        let finishing = Arc::new(AtomicBool::new(false));
        let task = tokio::spawn(watch_loop(engine, period, finishing));
        Self { task }
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

/// Resets the latch when the advance task ends, even if it panics
struct LatchGuard(Arc<AtomicBool>);

impl Drop for LatchGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn watch_loop(engine: Weak<PlaybackEngine>, period: Duration, finishing: Arc<AtomicBool>) {
    let mut interval = time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Finish watcher started ({}ms interval)", period.as_millis());

    loop {
        interval.tick().await;

        let Some(engine) = engine.upgrade() else { break };
        if engine.is_shut_down() {
            break;
        }
        if finishing.load(Ordering::Acquire) {
            continue;
        }
        let Some(owner) = engine.take_main_finish().await else {
            continue;
        };

        finishing.store(true, Ordering::Release);
        let guard = LatchGuard(Arc::clone(&finishing));
        debug!(owner, "Main channel finished, advancing");
        tokio::spawn(async move {
            let _guard = guard;
            engine.handle_finish(owner).await;
        });
    }

    debug!("Finish watcher stopped");
}
