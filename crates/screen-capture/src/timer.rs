// Elapsed-time counter shown while recording

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

const TICK: Duration = Duration::from_secs(1);

/// Format seconds as `MM:SS`. Minutes are not wrapped into hours.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Counts whole seconds from zero, once per second, while running
pub struct ElapsedTimer {
    seconds: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl Default for ElapsedTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl ElapsedTimer {
    pub fn new() -> Self {
        Self {
            seconds: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }

    /// Restart from zero. `on_tick` receives the new count after each second.
    pub fn start<F>(&mut self, on_tick: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        self.reset();

        let seconds = Arc::clone(&self.seconds);
        self.task = Some(tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + TICK, TICK);
            loop {
                ticks.tick().await;
                let now = seconds.fetch_add(1, Ordering::SeqCst) + 1;
                on_tick(now);
            }
        }));
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Stop counting and go back to `00:00`.
    pub fn reset(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.seconds.store(0, Ordering::SeqCst);
    }

    pub fn seconds(&self) -> u64 {
        self.seconds.load(Ordering::SeqCst)
    }

    pub fn display(&self) -> String {
        format_elapsed(self.seconds())
    }
}

impl Drop for ElapsedTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
