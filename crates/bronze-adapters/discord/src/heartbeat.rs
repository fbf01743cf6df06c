//! Periodic heartbeat task.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, trace, warn};

use bronze_core::BoxedTransport;

use crate::protocol;

/// Handle to a running heartbeat task.
///
/// The first heartbeat goes out one interval after start. Each one carries
/// the sequence number current at send time, `null` before any dispatch.
/// Send failures are logged and do not stop the task; the watchdog decides
/// when the connection is dead.
pub struct Heartbeat {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    pub fn start(
        transport: BoxedTransport,
        interval: Duration,
        sequence: watch::Receiver<Option<u64>>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(
            beat(transport, interval, sequence, cancel.clone()).instrument(Span::current()),
        );
        Self { cancel, handle }
    }

    /// Stops the task and waits for it to finish.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

async fn beat(
    transport: BoxedTransport,
    interval: Duration,
    sequence: watch::Receiver<Option<u64>>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let seq = *sequence.borrow();
                trace!(sequence = ?seq, "Sending heartbeat");
                if let Err(e) = transport.send_json(&protocol::heartbeat(seq)).await {
                    warn!(error = %e, "Failed to send heartbeat");
                }
            }
        }
    }
    trace!("Heartbeat stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::testing::{FakeTransport, Journal, Wire};

    #[tokio::test(start_paused = true)]
    async fn first_beat_waits_one_interval_and_carries_null() {
        let (transport, mut wire) = FakeTransport::new(Journal::default());
        let (_seq_tx, seq_rx) = watch::channel(None);
        let started = Instant::now();

        let heartbeat = Heartbeat::start(transport, Duration::from_millis(500), seq_rx);

        assert_eq!(
            wire.recv().await,
            Some(Wire::Json(json!({"op": 1, "d": null})))
        );
        assert!(started.elapsed() >= Duration::from_millis(500));
        heartbeat.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn beats_carry_latest_sequence() {
        let (transport, mut wire) = FakeTransport::new(Journal::default());
        let (seq_tx, seq_rx) = watch::channel(None);
        let heartbeat = Heartbeat::start(transport, Duration::from_millis(100), seq_rx);

        assert_eq!(
            wire.recv().await,
            Some(Wire::Json(json!({"op": 1, "d": null})))
        );
        seq_tx.send_replace(Some(7));
        assert_eq!(wire.recv().await, Some(Wire::Json(json!({"op": 1, "d": 7}))));
        heartbeat.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn send_failures_do_not_stop_the_task() {
        let (transport, mut wire) = FakeTransport::new(Journal::default());
        let (_seq_tx, seq_rx) = watch::channel(Some(3));
        transport.fail_sends(true);
        let heartbeat = Heartbeat::start(
            Arc::clone(&transport) as BoxedTransport,
            Duration::from_millis(100),
            seq_rx,
        );

        assert_eq!(wire.recv().await, Some(Wire::SendFailed));
        assert_eq!(wire.recv().await, Some(Wire::SendFailed));
        transport.fail_sends(false);
        assert_eq!(wire.recv().await, Some(Wire::Json(json!({"op": 1, "d": 3}))));
        heartbeat.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_the_beats() {
        let (transport, mut wire) = FakeTransport::new(Journal::default());
        let (_seq_tx, seq_rx) = watch::channel(None);
        let heartbeat = Heartbeat::start(transport, Duration::from_millis(100), seq_rx);

        assert!(wire.recv().await.is_some());
        heartbeat.stop().await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(wire.try_recv().is_err());
    }
}
