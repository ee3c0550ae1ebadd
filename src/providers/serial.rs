//! Serial link to the ECM

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::provider::Acquire;
use crate::types::RawPacket;
use crate::{EcmError, Result};

/// Runtime data request frame: SOH, source, destination, length, EOH, SOT, 'C', EOT, checksum.
pub const RT_DATA_REQUEST: [u8; 9] = [0x01, 0x00, 0x42, 0x02, 0xFF, 0x02, 0x43, 0x03, 0xFD];

/// Default ECM baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Minimum time between attempts to reopen a port that failed to open.
const REOPEN_BACKOFF: Duration = Duration::from_secs(1);

/// Serial connection parameters.
#[derive(Debug, Clone)]
pub struct SerialSettings {
    /// Serial port path (e.g. "/dev/ttyUSB0", "COM3")
    pub path: String,
    pub baud_rate: u32,
    /// Read timeout applied to the port itself
    pub read_timeout: Duration,
    /// Request written before each read
    pub request: Vec<u8>,
    /// Number of bytes in one response
    pub packet_len: usize,
}

/// Port handle and reopen backoff, owned by whichever exchange holds the lock.
#[derive(Default)]
struct PortState {
    port: Option<Box<dyn SerialPort>>,
    next_open: Option<Instant>,
}

/// Request/response serial link to the ECM.
///
/// The port is opened lazily and dropped after any I/O error so the next
/// acquisition reopens it. Each exchange runs on tokio's blocking pool and
/// keeps the port in shared state, so an exchange whose caller gave up still
/// hands the port back when it finishes.
pub struct SerialLink {
    settings: Arc<SerialSettings>,
    state: Arc<Mutex<PortState>>,
}

impl SerialLink {
    pub fn new(settings: SerialSettings) -> Self {
        Self { settings: Arc::new(settings), state: Arc::new(Mutex::new(PortState::default())) }
    }

    pub fn settings(&self) -> &SerialSettings {
        &self.settings
    }
}

impl PortState {
    fn open(&mut self, settings: &SerialSettings) -> Result<Box<dyn SerialPort>> {
        if let Some(at) = self.next_open {
            if Instant::now() < at {
                return Err(EcmError::acquisition_failed(format!(
                    "{} unavailable, waiting before reopening",
                    settings.path
                )));
            }
        }

        let port = serialport::new(&settings.path, settings.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|e| {
                self.next_open = Some(Instant::now() + REOPEN_BACKOFF);
                EcmError::acquisition_failed_with_source(format!("cannot open {}", settings.path), Box::new(e))
            })?;

        info!("Opened serial port: {} at {} baud", settings.path, settings.baud_rate);
        self.next_open = None;
        Ok(port)
    }

    /// Open if needed, then run one exchange. The port is dropped on I/O errors.
    fn acquire(&mut self, settings: &SerialSettings) -> Result<RawPacket> {
        let mut port = match self.port.take() {
            Some(port) => port,
            None => self.open(settings)?,
        };

        let result = exchange(port.as_mut(), &settings.request, settings.packet_len);
        match &result {
            Ok(_) => self.port = Some(port),
            Err(e) => debug!("Dropping serial port after error: {}", e),
        }
        result
    }
}

/// Write the request and read one full response.
fn exchange(port: &mut dyn SerialPort, request: &[u8], packet_len: usize) -> Result<RawPacket> {
    port.clear(ClearBuffer::Input)?;
    port.write_all(request).map_err(|e| io_failure("write request", e))?;
    port.flush().map_err(|e| io_failure("flush request", e))?;

    let mut buf = vec![0u8; packet_len];
    std::io::Read::read_exact(port, &mut buf).map_err(|e| io_failure("read response", e))?;
    Ok(RawPacket::new(buf))
}

fn io_failure(operation: &str, err: std::io::Error) -> EcmError {
    EcmError::acquisition_failed_with_source(format!("serial {} failed", operation), Box::new(err))
}

#[async_trait::async_trait]
impl Acquire for SerialLink {
    async fn acquire(&mut self) -> Result<RawPacket> {
        let settings = Arc::clone(&self.settings);
        let state = Arc::clone(&self.state);

        tokio::task::spawn_blocking(move || {
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            state.acquire(&settings)
        })
        .await
        .map_err(|e| EcmError::acquisition_failed_with_source("serial task failed", Box::new(e)))?
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.settings.path, self.settings.baud_rate)
    }
}
