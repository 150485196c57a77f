use clap::ArgMatches;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serialport::Parity;
use std::path::Path;
use std::time::Duration;

use crate::utils::error::ModbusError;

pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_STATION_ADDRESS: u8 = 30;
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub connection: ConnectionConfig,
    pub server: ServerConfig,
}

/// Serial link parameters of the controller.
///
/// Only the port and station address are configurable. Framing, speed and
/// timeouts are fixed by the controller firmware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    port_name: String,
    station_address: u8,
}

impl ConnectionConfig {
    pub const BAUD_RATE: u32 = 19_200;
    pub const DATA_BITS: u8 = 8;
    pub const PARITY: Parity = Parity::Even;
    pub const STOP_BITS: u8 = 1;
    pub const RESPONSE_TIMEOUT: Duration = Duration::from_millis(500);
    pub const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

    pub fn new(port_name: impl Into<String>, station_address: u8) -> Self {
        Self {
            port_name: port_name.into(),
            station_address,
        }
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn station_address(&self) -> u8 {
        self.station_address
    }

    pub fn baud_rate(&self) -> u32 {
        Self::BAUD_RATE
    }

    pub fn parity(&self) -> Parity {
        Self::PARITY
    }

    pub fn response_timeout(&self) -> Duration {
        Self::RESPONSE_TIMEOUT
    }

    pub fn write_timeout(&self) -> Duration {
        Self::WRITE_TIMEOUT
    }

    /// Bits on the wire per character: start, data, even parity, stop.
    fn bits_per_char(&self) -> u32 {
        1 + Self::DATA_BITS as u32 + 1 + Self::STOP_BITS as u32
    }

    /// Minimum bus silence (3.5 character times) between two RTU frames.
    pub fn silent_interval(&self) -> Duration {
        let micros = 3_500_000u64 * self.bits_per_char() as u64 / self.baud_rate() as u64;
        Duration::from_micros(micros)
    }

    pub fn validate(&self) -> Result<(), ModbusError> {
        if self.port_name.trim().is_empty() {
            return Err(ModbusError::ConfigError("Serial port name is empty".to_string()));
        }
        if !(1..=247).contains(&self.station_address) {
            return Err(ModbusError::ConfigError(format!(
                "Station address {} not in range <1; 247>",
                self.station_address
            )));
        }
        Ok(())
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SERIAL_PORT, DEFAULT_STATION_ADDRESS)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_LISTEN_PORT,
        }
    }
}

impl ServerConfig {
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

impl Config {
    /// Builds the configuration from an optional `--config` file, then applies
    /// command line overrides on top of it.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = match matches.get_one::<String>("config") {
            Some(path) => {
                info!("📄 Loading configuration from {}", path);
                Self::from_file(path)?
            }
            None => Self::default(),
        };

        if let Some(port) = matches.get_one::<String>("port") {
            config.connection.port_name = port.clone();
        }
        if let Some(station) = matches.get_one::<String>("station") {
            config.connection.station_address = station.parse()?;
        }

        if let Some(("serve", serve)) = matches.subcommand() {
            if let Some(bind) = serve.get_one::<String>("bind") {
                config.server.bind_address = bind.clone();
            }
            if let Some(listen_port) = serve.get_one::<String>("listen-port") {
                config.server.port = listen_port.parse()?;
            }
        }

        config.connection.validate()?;
        debug!("Effective configuration: {:?}", config);
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.connection.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
