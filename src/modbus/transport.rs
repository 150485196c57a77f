use log::{error, info};
use serialport::{ClearBuffer, SerialPort};
use std::io::{self, Read, Write};

use crate::config::settings::ConnectionConfig;
use crate::utils::error::ModbusError;

/// Byte stream a [`ModbusClient`](super::ModbusClient) runs its transactions over.
pub trait Transport: Read + Write + Send {
    /// Drops whatever is waiting in the receive buffer.
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// RS-485 serial link to the controller.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    pub fn open(config: &ConnectionConfig) -> Result<Self, ModbusError> {
        info!("🔌 Connecting to Modbus RTU port: {}", config.port_name());
        info!(
            "⚙️  Configuration: {} baud, {} data bits, {:?} parity, {} stop bit, station {}",
            config.baud_rate(),
            ConnectionConfig::DATA_BITS,
            config.parity(),
            ConnectionConfig::STOP_BITS,
            config.station_address()
        );

        // The serialport timeout bounds both reads and writes; the controller
        // uses the same limit for each direction.
        let timeout = config.response_timeout().max(config.write_timeout());

        let port = serialport::new(config.port_name(), config.baud_rate())
            .timeout(timeout)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(config.parity())
            .open()
            .map_err(|e| {
                error!("❌ Failed to open serial port {}: {}", config.port_name(), e);
                ModbusError::ConnectionError(format!("Failed to open port: {}", e))
            })?;

        info!("✅ Modbus RTU connection established successfully");
        Ok(Self { port })
    }
}

impl Read for SerialTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl Transport for SerialTransport {
    fn discard_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}
