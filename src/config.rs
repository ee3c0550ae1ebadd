//! Runtime configuration
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! command line flags (which clap also fills from `ECMWATCH_*` environment
//! variables). The merged result is validated once before anything starts.

use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::providers::{DEFAULT_BAUD_RATE, RT_DATA_REQUEST, SerialSettings};
use crate::schema::FieldMapSource;
use crate::{EcmError, Result};

/// Default HTTP listen address.
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(std::net::IpAddr::V4(Ipv4Addr::LOCALHOST), 8000);

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub stream: StreamConfig,
    pub live: LiveConfig,
    pub field_map: FieldMapSource,
    /// Fallback tracing filter when `RUST_LOG` is unset
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Dashboard assets served for every non-API path
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: DEFAULT_BIND, static_dir: Some(PathBuf::from("frontend")) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    pub tick_interval_ms: u64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { tick_interval_ms: 100 }
    }
}

impl StreamConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Live ECM acquisition over a serial port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LiveConfig {
    /// Off by default: without hardware every tick is synthetic
    pub enabled: bool,
    pub port: String,
    pub baud_rate: u32,
    /// Upper bound on one exchange with the ECM
    pub timeout_ms: u64,
    /// Live packets older than this are not streamed; ticks fall back to synthetic
    pub max_age_ms: u64,
    /// Bytes written before each read
    pub request: Vec<u8>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_serial_port().to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: 250,
            max_age_ms: 300,
            request: RT_DATA_REQUEST.to_vec(),
        }
    }
}

fn default_serial_port() -> &'static str {
    if cfg!(windows) { "COM3" } else { "/dev/ttyUSB0" }
}

impl LiveConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_millis(self.max_age_ms)
    }

    /// Serial settings for a link returning `packet_len` byte responses.
    pub fn serial_settings(&self, packet_len: usize) -> SerialSettings {
        SerialSettings {
            path: self.port.clone(),
            baud_rate: self.baud_rate,
            read_timeout: self.timeout(),
            request: self.request.clone(),
            packet_len,
        }
    }
}

/// Command line overrides. Every flag is optional and wins over the file.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CliOverrides {
    /// Address to listen on
    #[arg(long, env = "ECMWATCH_BIND")]
    pub bind: Option<SocketAddr>,

    /// Directory holding the dashboard (index.html)
    #[arg(long, env = "ECMWATCH_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Milliseconds between pushed messages
    #[arg(long, env = "ECMWATCH_TICK_MS")]
    pub tick_ms: Option<u64>,

    /// Serial port of the ECM; setting it enables live acquisition
    #[arg(long, env = "ECMWATCH_SERIAL_PORT")]
    pub serial_port: Option<String>,

    /// Serial baud rate
    #[arg(long, env = "ECMWATCH_BAUD_RATE")]
    pub baud_rate: Option<u32>,

    /// Milliseconds allowed for one exchange with the ECM
    #[arg(long, env = "ECMWATCH_LIVE_TIMEOUT_MS")]
    pub live_timeout_ms: Option<u64>,

    /// Milliseconds a live packet stays eligible for streaming
    #[arg(long, env = "ECMWATCH_LIVE_MAX_AGE_MS")]
    pub live_max_age_ms: Option<u64>,

    /// Never try live acquisition, even if configured
    #[arg(long)]
    pub synthetic_only: bool,

    /// YAML field table replacing the built-in BUEGB layout
    #[arg(long, env = "ECMWATCH_FIELD_MAP")]
    pub field_map: Option<PathBuf>,

    /// Tracing filter used when RUST_LOG is unset (e.g. "info", "ecmwatch=debug")
    #[arg(long, env = "ECMWATCH_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Config {
    /// Parse a YAML document. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| EcmError::config(format!("invalid configuration: {}", e)))
    }

    /// Read and parse a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| EcmError::io_error(path.to_path_buf(), e))?;
        debug!("Loaded configuration file {}", path.display());
        Self::from_yaml(&text)
    }

    /// Defaults, then `file` if given, then `overrides`; validated.
    pub fn load(file: Option<&Path>, overrides: CliOverrides) -> Result<Self> {
        let base = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.merge(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Apply command line overrides on top of this configuration.
    pub fn merge(mut self, overrides: CliOverrides) -> Self {
        if let Some(bind) = overrides.bind {
            self.server.bind = bind;
        }
        if let Some(dir) = overrides.static_dir {
            self.server.static_dir = Some(dir);
        }
        if let Some(ms) = overrides.tick_ms {
            self.stream.tick_interval_ms = ms;
        }
        if let Some(port) = overrides.serial_port {
            self.live.port = port;
            self.live.enabled = true;
        }
        if let Some(baud) = overrides.baud_rate {
            self.live.baud_rate = baud;
        }
        if let Some(ms) = overrides.live_timeout_ms {
            self.live.timeout_ms = ms;
        }
        if let Some(ms) = overrides.live_max_age_ms {
            self.live.max_age_ms = ms;
        }
        if overrides.synthetic_only {
            self.live.enabled = false;
        }
        if let Some(path) = overrides.field_map {
            self.field_map = FieldMapSource::File { path };
        }
        self.log_level = overrides.log_level.or(self.log_level);
        self
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.stream.tick_interval_ms == 0 {
            return Err(EcmError::config("stream.tick_interval_ms must be greater than zero"));
        }

        if self.live.enabled {
            if self.live.timeout_ms == 0 {
                return Err(EcmError::config("live.timeout_ms must be greater than zero"));
            }
            if self.live.max_age_ms == 0 {
                return Err(EcmError::config("live.max_age_ms must be greater than zero"));
            }
            if self.live.port.trim().is_empty() {
                return Err(EcmError::config("live.port must name a serial port"));
            }
            if self.live.baud_rate == 0 {
                return Err(EcmError::config("live.baud_rate must be greater than zero"));
            }
            if self.live.request.is_empty() {
                return Err(EcmError::config("live.request must not be empty"));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:8000".parse().unwrap());
        assert_eq!(config.stream.tick_interval(), Duration::from_millis(100));
        assert!(!config.live.enabled);
        assert_eq!(config.live.baud_rate, 9600);
        assert_eq!(config.live.request, RT_DATA_REQUEST.to_vec());
        assert_eq!(config.live.max_age(), Duration::from_millis(300));
        assert_eq!(config.field_map, FieldMapSource::Buegb);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            r#"
stream:
  tick_interval_ms: 50
live:
  enabled: true
  port: /dev/ttyACM0
"#,
        )
        .unwrap();

        assert_eq!(config.stream.tick_interval_ms, 50);
        assert!(config.live.enabled);
        assert_eq!(config.live.port, "/dev/ttyACM0");
        assert_eq!(config.live.baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_yaml("stream:\n  tick: 10\n").unwrap_err();
        assert!(matches!(err, EcmError::Config { .. }));
    }

    #[test]
    fn cli_overrides_win_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server:\n  bind: 0.0.0.0:9000\nstream:\n  tick_interval_ms: 40").unwrap();

        let overrides = CliOverrides {
            tick_ms: Some(200),
            serial_port: Some("/dev/ttyUSB1".into()),
            field_map: Some(PathBuf::from("maps/custom.yaml")),
            ..Default::default()
        };
        let config = Config::load(Some(file.path()), overrides).unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.stream.tick_interval_ms, 200);
        assert!(config.live.enabled);
        assert_eq!(config.live.port, "/dev/ttyUSB1");
        assert_eq!(config.field_map, FieldMapSource::File { path: PathBuf::from("maps/custom.yaml") });
    }

    #[test]
    fn synthetic_only_disables_live() {
        let overrides = CliOverrides {
            serial_port: Some("/dev/ttyUSB0".into()),
            synthetic_only: true,
            ..Default::default()
        };
        let config = Config::default().merge(overrides);
        assert!(!config.live.enabled);
    }

    #[test]
    fn zero_tick_is_rejected() {
        let overrides = CliOverrides { tick_ms: Some(0), ..Default::default() };
        assert!(matches!(Config::load(None, overrides), Err(EcmError::Config { .. })));
    }

    #[test]
    fn zero_live_timeout_is_rejected_when_live() {
        let mut config = Config::default();
        config.live.timeout_ms = 0;
        config.validate().unwrap();

        config.live.enabled = true;
        assert!(matches!(config.validate(), Err(EcmError::Config { .. })));
    }

    #[test]
    fn live_timeout_longer_than_tick_is_accepted() {
        // the reader runs beside the loops, so a slow exchange never delays a tick
        let mut config = Config::default();
        config.live.enabled = true;
        config.live.timeout_ms = 400;
        config.validate().unwrap();
    }

    #[test]
    fn zero_max_age_is_rejected_when_live() {
        let overrides = CliOverrides {
            serial_port: Some("/dev/ttyUSB0".into()),
            live_max_age_ms: Some(0),
            ..Default::default()
        };
        assert!(matches!(Config::load(None, overrides), Err(EcmError::Config { .. })));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load(Some(Path::new("/nonexistent/ecmwatch.yaml")), CliOverrides::default()).unwrap_err();
        assert!(matches!(err, EcmError::Io { .. }));
    }

    #[test]
    fn serial_settings_follow_live_section() {
        let live = LiveConfig { port: "COM7".into(), baud_rate: 19200, timeout_ms: 120, ..Default::default() };
        let settings = live.serial_settings(107);
        assert_eq!(settings.path, "COM7");
        assert_eq!(settings.baud_rate, 19200);
        assert_eq!(settings.read_timeout, Duration::from_millis(120));
        assert_eq!(settings.packet_len, 107);
    }
}
