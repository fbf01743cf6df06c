//! Dead-man's switch for liveness detection.
//!
//! A [`Watchdog`] is armed with a timeout and a callback. Every
//! [`feed`](Watchdog::feed) pushes the deadline out by one timeout; if the
//! deadline passes without a feed, the callback runs exactly once and the
//! watchdog stays fired until it is armed again.
//!
//! ```text
//! arm(t, cb) ──▶ Armed ──feed()──▶ Armed (deadline = now + t)
//!                  │
//!                  ├── deadline passes ──▶ Fired (cb runs once; feed is a no-op)
//!                  └── disarm() ─────────▶ Idle
//! ```
//!
//! The watchdog knows nothing about protocols; the gateway feeds it on every
//! heartbeat acknowledgement.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

struct State {
    /// Bumped on every arm/disarm so stale timer tasks can tell they lost.
    generation: u64,
    /// `None` when idle or fired.
    deadline: Option<Instant>,
    timeout: Duration,
    task: Option<JoinHandle<()>>,
}

/// A resettable timeout that invokes a callback once per arm cycle.
///
/// All methods are safe to call from any task. Arming requires a running
/// tokio runtime.
pub struct Watchdog {
    state: Arc<Mutex<State>>,
}

impl Watchdog {
    /// Creates an idle watchdog.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                generation: 0,
                deadline: None,
                timeout: Duration::ZERO,
                task: None,
            })),
        }
    }

    /// Arms the watchdog, replacing any previous cycle.
    pub fn arm<F>(&self, timeout: Duration, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut state = self.state.lock();
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.generation += 1;
        state.timeout = timeout;
        state.deadline = Some(Instant::now() + timeout);

        let generation = state.generation;
        let shared = Arc::clone(&self.state);
        state.task = Some(tokio::spawn(async move {
            loop {
                let deadline = {
                    let state = shared.lock();
                    match state.deadline {
                        Some(deadline) if state.generation == generation => deadline,
                        _ => return,
                    }
                };

                tokio::time::sleep_until(deadline).await;

                let expired = {
                    let mut state = shared.lock();
                    if state.generation != generation {
                        return;
                    }
                    match state.deadline {
                        Some(deadline) if Instant::now() >= deadline => {
                            state.deadline = None;
                            true
                        }
                        Some(_) => false,
                        None => return,
                    }
                };

                if expired {
                    trace!(timeout = ?timeout, "Watchdog expired");
                    on_expire();
                    return;
                }
            }
        }));
    }

    /// Pushes the deadline out by one timeout.
    ///
    /// Returns `false` (and does nothing) when the watchdog is idle or has
    /// already fired in this cycle.
    pub fn feed(&self) -> bool {
        let mut state = self.state.lock();
        match state.deadline {
            Some(_) => {
                state.deadline = Some(Instant::now() + state.timeout);
                true
            }
            None => false,
        }
    }

    /// Stops the current cycle without firing.
    pub fn disarm(&self) {
        let mut state = self.state.lock();
        state.generation += 1;
        state.deadline = None;
        if let Some(task) = state.task.take() {
            task.abort();
        }
    }

    /// Whether a cycle is running and has not fired yet.
    pub fn is_armed(&self) -> bool {
        self.state.lock().deadline.is_some()
    }
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        if let Some(task) = self.state.lock().task.take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Watchdog")
            .field("armed", &state.deadline.is_some())
            .field("timeout", &state.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_without_feed() {
        let watchdog = Watchdog::new();
        let (fired, callback) = counter();
        watchdog.arm(Duration::from_millis(100), callback);

        sleep(Duration::from_millis(150)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!watchdog.is_armed());

        sleep(Duration::from_secs(5)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn feeding_resets_the_deadline() {
        let watchdog = Watchdog::new();
        let (fired, callback) = counter();
        watchdog.arm(Duration::from_millis(100), callback);

        sleep(Duration::from_millis(60)).await;
        assert!(watchdog.feed());
        sleep(Duration::from_millis(60)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn feed_after_fire_is_a_no_op() {
        let watchdog = Watchdog::new();
        let (fired, callback) = counter();
        watchdog.arm(Duration::from_millis(10), callback);

        sleep(Duration::from_millis(20)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!watchdog.feed());

        sleep(Duration::from_millis(50)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_prevents_firing() {
        let watchdog = Watchdog::new();
        let (fired, callback) = counter();
        watchdog.arm(Duration::from_millis(100), callback);

        sleep(Duration::from_millis(50)).await;
        watchdog.disarm();
        sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(!watchdog.feed());
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_starts_a_new_cycle() {
        let watchdog = Watchdog::new();
        let (first, callback) = counter();
        watchdog.arm(Duration::from_millis(100), callback);
        let (second, callback) = counter();
        watchdog.arm(Duration::from_millis(30), callback);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }
}
