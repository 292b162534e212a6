//! SinkWriter - persists readings off the hot path
//!
//! Persistence is fire-and-forget: the coordinator hands a reading to the
//! writer's bounded queue and moves on. A slow or unreachable sink fills
//! the queue and subsequent readings are dropped with a warning instead of
//! throttling ingestion. Every append carries its own timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, error, instrument, trace, warn};

use crate::Reading;
use crate::sink::TimeSeriesSink;

use super::messages::{SinkCommand, SinkStats};

/// Maximum readings waiting to be persisted
const QUEUE_CAPACITY: usize = 256;

/// Default bound on a single append call
pub const DEFAULT_APPEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Actor draining the persistence queue into a [`TimeSeriesSink`]
struct SinkWriter {
    sink: Arc<dyn TimeSeriesSink>,
    timeout: Duration,
    command_rx: mpsc::Receiver<SinkCommand>,
    dropped: Arc<AtomicU64>,
    appended: u64,
    failed: u64,
}

impl SinkWriter {
    /// Run the actor's main loop
    #[instrument(skip(self))]
    async fn run(mut self) {
        debug!("starting sink writer");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                SinkCommand::Append(reading) => self.append(reading).await,

                SinkCommand::GetStats { respond_to } => {
                    let _ = respond_to.send(SinkStats {
                        appended: self.appended,
                        dropped: self.dropped.load(Ordering::Relaxed),
                        failed: self.failed,
                    });
                }

                SinkCommand::Shutdown => {
                    debug!("received shutdown command");
                    break;
                }
            }
        }

        debug!("sink writer stopped");
    }

    async fn append(&mut self, reading: Reading) {
        if reading.fields.is_empty() {
            trace!("empty reading for {}, nothing to persist", reading.tank_id);
            return;
        }

        let append = self
            .sink
            .append_point(&reading.tank_id, reading.timestamp, &reading.fields);

        match time::timeout(self.timeout, append).await {
            Ok(Ok(())) => {
                self.appended += 1;
                trace!(
                    "appended reading for {} at {}",
                    reading.tank_id, reading.timestamp
                );
            }
            Ok(Err(e)) => {
                self.failed += 1;
                error!("failed to append reading for {}: {e}", reading.tank_id);
            }
            Err(_) => {
                self.failed += 1;
                error!(
                    "sink append for {} timed out after {:?}",
                    reading.tank_id, self.timeout
                );
            }
        }
    }
}

/// Handle for the sink writer
#[derive(Clone)]
pub struct SinkHandle {
    sender: mpsc::Sender<SinkCommand>,
    dropped: Arc<AtomicU64>,
}

impl SinkHandle {
    /// Spawn a writer draining into `sink`, bounding each append by
    /// `timeout`.
    pub fn spawn(sink: Arc<dyn TimeSeriesSink>, timeout: Duration) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(QUEUE_CAPACITY);
        let dropped = Arc::new(AtomicU64::new(0));

        let writer = SinkWriter {
            sink,
            timeout,
            command_rx: cmd_rx,
            dropped: dropped.clone(),
            appended: 0,
            failed: 0,
        };

        tokio::spawn(writer.run());

        Self {
            sender: cmd_tx,
            dropped,
        }
    }

    /// Queue a reading for persistence without blocking.
    ///
    /// A full queue drops the reading: storage unavailability must never
    /// add latency to evaluation or broadcast.
    pub fn enqueue(&self, reading: Reading) {
        if self.sender.try_send(SinkCommand::Append(reading)).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("sink queue full, dropping reading");
        }
    }

    /// Readings dropped so far because the queue was full.
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Get writer statistics
    pub async fn stats(&self) -> Option<SinkStats> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.sender
            .send(SinkCommand::GetStats { respond_to: tx })
            .await
            .ok()?;

        rx.await.ok()
    }

    /// Shutdown the sink writer
    pub async fn shutdown(&self) {
        let _ = self.sender.send(SinkCommand::Shutdown).await;
    }
}
