//! Live packets from the ECM
//!
//! One [`LiveReader`] per process owns the ECM link and polls it once per tick,
//! each exchange bounded by a timeout. Every successful response is published
//! through a `watch` channel. Each connection holds a [`LiveSource`] that takes
//! the latest published packet without waiting, so a slow or silent ECM never
//! holds up a tick and every connection sees the same data.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::provider::{Acquire, PacketSource};
use crate::types::{PacketOrigin, RawPacket};
use crate::{EcmError, Result};

/// Shortest polling period accepted by the reader.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A packet as published by the reader.
#[derive(Debug, Clone)]
struct Reading {
    packet: RawPacket,
    received_at: Instant,
}

/// Background poller that owns the ECM link.
pub struct LiveReader<A: Acquire> {
    link: A,
    period: Duration,
    timeout: Duration,
    tx: watch::Sender<Option<Reading>>,

    /// Consecutive failed exchanges, for log throttling
    failures: u32,
}

impl<A: Acquire> LiveReader<A> {
    /// Poll `link` every `period`, giving each exchange at most `timeout`.
    pub fn new(link: A, period: Duration, timeout: Duration) -> Self {
        let (tx, _) = watch::channel(None);
        Self { link, period: period.max(MIN_PERIOD), timeout, tx, failures: 0 }
    }

    /// A source handing out packets no older than `max_age`.
    pub fn source(&self, max_age: Duration) -> LiveSource {
        LiveSource { feed: self.tx.subscribe(), max_age }
    }

    /// Consecutive failed exchanges since the last packet.
    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Run on its own task until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Poll the link until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(link = %self.link.describe(), period = ?self.period, timeout = ?self.timeout, "Live reader started");
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                polled = self.poll_once() => polled,
            };
            if let Some(packet) = polled {
                self.tx.send_replace(Some(Reading { packet, received_at: Instant::now() }));
            }
        }

        debug!("Live reader stopped");
    }

    /// One exchange with the link, bounded by the timeout.
    pub async fn exchange(&mut self) -> Result<RawPacket> {
        let timeout = self.timeout;
        let packet = tokio::time::timeout(timeout, self.link.acquire())
            .await
            .map_err(|_| EcmError::Timeout { duration: timeout })??;
        if packet.is_empty() {
            return Err(EcmError::malformed_packet("empty response"));
        }
        Ok(packet)
    }

    /// One bounded exchange. Failures are logged and resolve to `None`.
    pub async fn poll_once(&mut self) -> Option<RawPacket> {
        match self.exchange().await {
            Ok(packet) => {
                if self.failures > 0 {
                    info!("Live ECM data resumed after {} failed attempts", self.failures);
                    self.failures = 0;
                }
                trace!(len = packet.len(), "Live packet acquired");
                Some(packet)
            }
            Err(e) => {
                self.record_failure(&e);
                None
            }
        }
    }

    fn record_failure(&mut self, error: &EcmError) {
        self.failures = self.failures.saturating_add(1);

        // Log periodically to avoid spam while no ECM is attached
        if self.failures == 1 {
            info!("No live ECM data from {} ({}), using synthetic data", self.link.describe(), error);
        } else if self.failures % 100 == 0 {
            debug!("Still no live ECM data from {} after {} attempts: {}", self.link.describe(), self.failures, error);
        } else {
            trace!("Live attempt failed: {}", error);
        }
    }
}

/// Per-connection view of the reader's latest packet.
///
/// `attempt` never waits: it returns the most recent packet if it is younger
/// than `max_age`, and `None` otherwise.
#[derive(Debug, Clone)]
pub struct LiveSource {
    feed: watch::Receiver<Option<Reading>>,
    max_age: Duration,
}

impl LiveSource {
    /// Packets older than this are treated as no data.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    fn latest(&self) -> Option<RawPacket> {
        let reading = self.feed.borrow();
        reading
            .as_ref()
            .filter(|r| r.received_at.elapsed() <= self.max_age)
            .map(|r| r.packet.clone())
    }
}

#[async_trait::async_trait]
impl PacketSource for LiveSource {
    async fn attempt(&mut self) -> Option<RawPacket> {
        self.latest()
    }

    fn origin(&self) -> PacketOrigin {
        PacketOrigin::Live
    }
}
