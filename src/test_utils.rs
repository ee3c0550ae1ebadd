//! Test doubles shared by unit tests and benchmarks
//!
//! Scripted links and recording sinks let the streaming loop run against a
//! paused tokio clock without any hardware or network.

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::provider::Acquire;
use crate::sink::FrameSink;
use crate::types::{FieldMap, RawPacket};
use crate::{EcmError, Result};

/// Build a zero-filled packet covering `map` with the given fields encoded.
///
/// Panics if a name is not in the map; intended for fixtures only.
pub fn packet_with(map: &FieldMap, values: &[(&str, f64)]) -> RawPacket {
    let mut packet = RawPacket::zeroed(map.max_extent());
    for (name, value) in values {
        let spec = map.get(name).unwrap_or_else(|e| panic!("fixture field {}: {}", name, e));
        spec.encode(*value, packet.as_bytes_mut())
            .unwrap_or_else(|e| panic!("fixture encode {}: {}", name, e));
    }
    packet
}

/// Reference packet: RPM 1200, TE 90.0, Bat 14.12, everything else raw zero.
pub fn reference_packet(map: &FieldMap) -> RawPacket {
    packet_with(map, &[("RPM", 1200.0), ("TE", 90.0), ("Bat", 14.12)])
}

/// Link that replays a fixed script of acquisition results.
///
/// Once the script is exhausted every acquisition fails.
pub struct ScriptedLink {
    script: VecDeque<Result<RawPacket>>,
    hang: bool,
}

impl ScriptedLink {
    pub fn new(script: Vec<Result<RawPacket>>) -> Self {
        Self { script: script.into(), hang: false }
    }

    /// A link whose acquisitions never complete.
    pub fn hanging() -> Self {
        Self { script: VecDeque::new(), hang: true }
    }
}

#[async_trait::async_trait]
impl Acquire for ScriptedLink {
    async fn acquire(&mut self) -> Result<RawPacket> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(EcmError::acquisition_failed("script exhausted")))
    }

    fn describe(&self) -> String {
        format!("scripted link ({} left)", self.script.len())
    }
}

/// Link that answers every request with the same packet after a fixed delay.
///
/// Models a healthy ECM whose exchange takes longer than it looks.
pub struct DelayedLink {
    packet: RawPacket,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl DelayedLink {
    pub fn new(packet: RawPacket, delay: Duration) -> Self {
        Self { packet, delay, calls: Arc::new(AtomicUsize::new(0)) }
    }

    /// Number of exchanges started.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait::async_trait]
impl Acquire for DelayedLink {
    async fn acquire(&mut self) -> Result<RawPacket> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(self.packet.clone())
    }

    fn describe(&self) -> String {
        format!("delayed link ({:?})", self.delay)
    }
}

/// Sink that records what it receives and can be told to disconnect.
///
/// All recorded state is behind `Arc`s so tests keep handles after the sink has
/// been moved into a loop.
#[derive(Clone, Default)]
pub struct RecordingSink {
    accept: Option<usize>,
    attempts: Arc<AtomicUsize>,
    messages: Arc<Mutex<Vec<String>>>,
    timestamps: Arc<Mutex<Vec<Instant>>>,
}

impl RecordingSink {
    /// A sink that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that accepts `n` messages and fails every send after that.
    pub fn failing_after(n: usize) -> Self {
        Self { accept: Some(n), ..Self::default() }
    }

    /// Number of `send` calls, successful or not.
    pub fn attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }

    /// Messages accepted so far.
    pub fn messages(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.messages)
    }

    /// Clock readings taken at each accepted message.
    pub fn timestamps(&self) -> Arc<Mutex<Vec<Instant>>> {
        Arc::clone(&self.timestamps)
    }
}

#[async_trait::async_trait]
impl FrameSink for RecordingSink {
    async fn send(&mut self, text: String) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.accept.is_some_and(|n| attempt >= n) {
            return Err(EcmError::sink_closed("recording sink disconnected"));
        }

        self.timestamps.lock().expect("timestamps lock").push(Instant::now());
        self.messages.lock().expect("messages lock").push(text);
        Ok(())
    }
}
