//! Per-connection streaming loop
//!
//! Each connected client gets one [`StreamingLoop`]. Every tick it acquires a
//! packet (live first, synthetic otherwise), decodes it against the shared
//! [`FieldMap`], projects the wire subset and pushes it to the client's sink.
//! The loop ends when the sink goes away or its cancellation token fires.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::provider::PacketSource;
use crate::providers::SyntheticSource;
use crate::sink::FrameSink;
use crate::types::{FieldMap, PacketOrigin, ParsedFrame, RawPacket};
use crate::wire::WireMessage;
use crate::decode;

/// Reference tick interval.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Shortest tick interval a loop will run with.
pub const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Live-then-synthetic packet acquisition.
///
/// The choice is made again every call: there is no sticky mode, so consecutive
/// ticks may alternate between live and synthetic data.
pub struct Acquisition {
    live: Option<Box<dyn PacketSource>>,
    synthetic: SyntheticSource,
}

impl Acquisition {
    /// Acquisition with an optional live source and the synthetic fallback.
    pub fn new(live: Option<Box<dyn PacketSource>>, synthetic: SyntheticSource) -> Self {
        Self { live, synthetic }
    }

    /// Acquisition that only produces synthetic data.
    pub fn synthetic_only(synthetic: SyntheticSource) -> Self {
        Self::new(None, synthetic)
    }

    /// Acquire one packet. Never fails.
    pub async fn next(&mut self) -> (RawPacket, PacketOrigin) {
        if let Some(live) = self.live.as_mut() {
            if let Some(packet) = live.attempt().await {
                return (packet, live.origin());
            }
        }
        (self.synthetic.generate(), PacketOrigin::Synthetic)
    }
}

/// Build the wire text for one packet.
///
/// A packet the decoder rejects projects as an empty frame, so the client still
/// receives a well-formed message with default values.
pub fn render(map: &FieldMap, packet: &RawPacket) -> crate::Result<String> {
    let frame = decode(packet, map).unwrap_or_else(|e| {
        warn!("Decoding failed, sending defaults: {}", e);
        ParsedFrame::default()
    });
    WireMessage::project(&frame).to_text()
}

/// Loop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminated,
}

/// Why a loop terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The sink rejected a push (client disconnected)
    SinkClosed,
    /// The cancellation token fired (transport disconnect or shutdown)
    Cancelled,
}

/// Counters reported when a loop terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopReport {
    /// Messages successfully pushed
    pub sent: u64,
    /// Ticks served from live data
    pub live_ticks: u64,
    /// Ticks served from synthetic data
    pub synthetic_ticks: u64,
    pub termination: Termination,
}

/// Per-connection driver: tick, acquire, decode, project, push.
pub struct StreamingLoop<S: FrameSink> {
    map: Arc<FieldMap>,
    acquisition: Acquisition,
    sink: S,
    tick_interval: Duration,
    cancel: CancellationToken,
    state: LoopState,
}

impl<S: FrameSink> StreamingLoop<S> {
    pub fn new(
        map: Arc<FieldMap>,
        acquisition: Acquisition,
        sink: S,
        tick_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let tick_interval = if tick_interval < MIN_TICK_INTERVAL {
            warn!(requested = ?tick_interval, "Tick interval too short, using {:?}", MIN_TICK_INTERVAL);
            MIN_TICK_INTERVAL
        } else {
            tick_interval
        };
        Self { map, acquisition, sink, tick_interval, cancel, state: LoopState::Running }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Run until the sink disconnects or the token is cancelled.
    ///
    /// Returns immediately if the loop has already terminated.
    pub async fn run(&mut self) -> LoopReport {
        if self.state == LoopState::Terminated {
            return LoopReport {
                sent: 0,
                live_ticks: 0,
                synthetic_ticks: 0,
                termination: Termination::Cancelled,
            };
        }

        debug!(interval = ?self.tick_interval, "Streaming loop started");
        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut sent = 0u64;
        let mut live_ticks = 0u64;
        let mut synthetic_ticks = 0u64;

        let termination = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break Termination::Cancelled,
                _ = ticker.tick() => {}
            }

            let acquired = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break Termination::Cancelled,
                acquired = self.acquisition.next() => acquired,
            };
            let (packet, origin) = acquired;
            match origin {
                PacketOrigin::Live => live_ticks += 1,
                PacketOrigin::Synthetic => synthetic_ticks += 1,
            }

            let text = match render(&self.map, &packet) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to serialize wire message: {}", e);
                    continue;
                }
            };
            trace!(%origin, len = packet.len(), "Tick {}: {}", sent + 1, text);

            let pushed = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break Termination::Cancelled,
                pushed = self.sink.send(text) => pushed,
            };
            if let Err(e) = pushed {
                debug!("Sink closed: {}", e);
                break Termination::SinkClosed;
            }
            sent += 1;
        };

        if termination == Termination::Cancelled {
            if let Err(e) = self.sink.close().await {
                debug!("Closing sink failed: {}", e);
            }
        }

        self.state = LoopState::Terminated;
        info!(
            sent,
            live_ticks,
            synthetic_ticks,
            ?termination,
            "Streaming loop terminated"
        );

        LoopReport { sent, live_ticks, synthetic_ticks, termination }
    }
}
