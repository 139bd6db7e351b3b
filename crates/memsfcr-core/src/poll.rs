//! Dataframe polling
//!
//! A single worker reads both dataframes on a fixed interval. The reader lives behind
//! an async mutex and every exchange runs on the blocking pool with the lock held, so
//! only one command is ever in flight on the link.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::datalog::DataLogger;
use crate::ecu::{EcuError, EcuReader, Reading};

/// Reader shared between the poll loop and command callers
pub type SharedReader = Arc<Mutex<EcuReader>>;

/// What happened during a polling session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollSummary {
    /// Ticks run
    pub cycles: u64,
    /// Successful decodes
    pub readings: u64,
    /// Recoverable transport failures
    pub transport_errors: u64,
    /// Dataframes that failed to decode
    pub decode_errors: u64,
    /// Rows written to the log file
    pub logged: usize,
    /// Error that ended polling early
    pub terminal_error: Option<String>,
}

/// Fixed-interval poll of an ECU reader
pub struct PollLoop {
    reader: SharedReader,
    interval: Duration,
    max_cycles: Option<u64>,
    logger: Option<DataLogger>,
    cancel: CancellationToken,
}

impl PollLoop {
    /// Poll `reader` every `interval` until cancelled
    pub fn new(reader: SharedReader, interval: Duration) -> Self {
        Self {
            reader,
            interval: interval.max(Duration::from_millis(1)),
            max_cycles: None,
            logger: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop after `cycles` polls
    pub fn with_cycle_limit(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    /// Log every reading
    pub fn with_logger(mut self, logger: DataLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Stop when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops the loop
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Poll until cancelled, the cycle limit is reached or the link fails.
    /// `on_reading` is called for every decoded reading.
    pub async fn run<F>(mut self, mut on_reading: F) -> PollSummary
    where
        F: FnMut(&Reading),
    {
        let mut summary = PollSummary::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_ms = self.interval.as_millis() as u64, "polling started");

        while self.max_cycles.map_or(true, |max| summary.cycles < max) {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("polling cancelled");
                    break;
                }
                _ = ticker.tick() => {}
            }

            summary.cycles += 1;
            let reader = Arc::clone(&self.reader);
            let result =
                tokio::task::spawn_blocking(move || reader.blocking_lock().read_dataframes()).await;

            match result {
                Ok(Ok(reading)) => {
                    summary.readings += 1;
                    if let Some(logger) = self.logger.as_mut() {
                        logger.log(&reading);
                    }
                    on_reading(&reading);
                }
                Ok(Err(EcuError::Decode(e))) => {
                    summary.decode_errors += 1;
                    warn!(cycle = summary.cycles, "skipping undecodable dataframes: {}", e);
                }
                Ok(Err(e)) if e.is_recoverable() => {
                    summary.transport_errors += 1;
                    warn!(cycle = summary.cycles, "poll failed, retrying next cycle: {}", e);
                }
                Ok(Err(e)) => {
                    summary.transport_errors += 1;
                    error!(cycle = summary.cycles, "polling stopped: {}", e);
                    summary.terminal_error = Some(e.to_string());
                    break;
                }
                Err(e) => {
                    error!("poll task failed: {}", e);
                    summary.terminal_error = Some(e.to_string());
                    break;
                }
            }
        }

        if let Some(logger) = self.logger.take() {
            match logger.close().await {
                Ok(rows) => summary.logged = rows,
                Err(e) => warn!("unable to close log: {}", e),
            }
        }

        info!(
            cycles = summary.cycles,
            readings = summary.readings,
            transport_errors = summary.transport_errors,
            decode_errors = summary.decode_errors,
            "polling finished"
        );
        summary
    }
}
