use async_trait::async_trait;
use log::{debug, info, warn};
use std::io::{Read, Write};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Instant;

use super::protocol::{
    decode_register, FunctionCode, ModbusRequest, ModbusResponse, RegisterValue, EXCEPTION_FLAG,
    MIN_RESPONSE_LEN,
};
use super::transport::{SerialTransport, Transport};
use crate::config::settings::ConnectionConfig;
use crate::utils::error::ModbusError;

/// Input register holding the controller's model identifier.
pub const PROBE_ADDRESS: u16 = 0;
/// Identifier reported by supported controller firmware.
pub const PROBE_IDENTITY: i64 = 22;

#[async_trait]
pub trait ModbusClientTrait: Send + Sync {
    /// Reads one register with function code 3 or 4, zero decimals.
    async fn read_register(
        &self,
        address: u16,
        function: FunctionCode,
        signed: bool,
    ) -> Result<i64, ModbusError>;

    /// Writes one register with function code 16. Returns the value that was
    /// handed in; the register is not read back.
    async fn write_register(
        &self,
        address: u16,
        value: RegisterValue,
        signed: bool,
    ) -> Result<RegisterValue, ModbusError>;

    /// Checks that the link works and the controller identifies itself.
    /// Never fails: any error yields `false`.
    async fn probe(&self) -> bool {
        match self
            .read_register(PROBE_ADDRESS, FunctionCode::ReadInput, false)
            .await
        {
            Ok(identity) => {
                if identity != PROBE_IDENTITY {
                    warn!("⚠️  Controller reported identity {} (expected {})", identity, PROBE_IDENTITY);
                }
                identity == PROBE_IDENTITY
            }
            Err(e) => {
                warn!("📵 Probe failed: {}", e);
                false
            }
        }
    }
}

struct Channel {
    transport: Box<dyn Transport>,
    last_frame_at: Option<Instant>,
}

/// Client owning the single connection to the controller.
///
/// Clones share the connection. Every transaction holds the channel lock from
/// the first request byte until the response has been read, so concurrent
/// callers are served strictly one after another.
#[derive(Clone)]
pub struct ModbusClient {
    channel: Arc<Mutex<Channel>>,
    config: Arc<ConnectionConfig>,
}

impl ModbusClient {
    /// Opens the serial port described by `config`. The port stays open for
    /// the lifetime of the client.
    pub fn new(config: ConnectionConfig) -> Result<Self, ModbusError> {
        let transport = SerialTransport::open(&config)?;
        Ok(Self::with_transport(config, Box::new(transport)))
    }

    pub fn with_transport(config: ConnectionConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            channel: Arc::new(Mutex::new(Channel {
                transport,
                last_frame_at: None,
            })),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn read_register_blocking(
        &self,
        address: u16,
        function: FunctionCode,
        signed: bool,
    ) -> Result<i64, ModbusError> {
        if !function.is_read() {
            return Err(ModbusError::InvalidData(format!(
                "Function code {} does not read registers",
                function
            )));
        }

        let request = ModbusRequest::ReadRegister {
            station: self.config.station_address(),
            function,
            address,
        };

        match self.transact(&request)? {
            ModbusResponse::Register(raw) => Ok(decode_register(raw, signed)),
            other => Err(ModbusError::InvalidResponse(format!(
                "Unexpected response to read: {:?}",
                other
            ))),
        }
    }

    pub fn write_register_blocking(
        &self,
        address: u16,
        value: RegisterValue,
        signed: bool,
    ) -> Result<RegisterValue, ModbusError> {
        let raw = value.to_register(signed)?;
        let request = ModbusRequest::WriteRegister {
            station: self.config.station_address(),
            address,
            raw,
        };

        self.transact(&request)?;
        info!("📝 Wrote {} to register {}", value, address);
        Ok(value)
    }

    fn transact(&self, request: &ModbusRequest) -> Result<ModbusResponse, ModbusError> {
        let frame = request.to_frame();

        let mut channel = self.channel.lock().map_err(|_| ModbusError::LockError)?;

        if let Some(last) = channel.last_frame_at {
            let silence = self.config.silent_interval();
            let elapsed = last.elapsed();
            if elapsed < silence {
                thread::sleep(silence - elapsed);
            }
        }

        debug!("📤 Sending frame: {}", hex::encode(&frame));
        let result = Self::exchange(channel.transport.as_mut(), &frame, request.expected_response_len());
        channel.last_frame_at = Some(Instant::now());
        drop(channel);

        let response = result?;
        debug!("📥 Received frame: {}", hex::encode(&response));
        request.parse_response(&response)
    }

    fn exchange(
        transport: &mut dyn Transport,
        frame: &[u8],
        expected_len: usize,
    ) -> Result<Vec<u8>, ModbusError> {
        transport.discard_input()?;
        transport.write_all(frame)?;
        transport.flush()?;

        let mut response = vec![0u8; MIN_RESPONSE_LEN];
        transport.read_exact(&mut response)?;

        // Exception responses stop at the minimum length.
        if response[1] & EXCEPTION_FLAG == 0 && expected_len > MIN_RESPONSE_LEN {
            response.resize(expected_len, 0);
            transport.read_exact(&mut response[MIN_RESPONSE_LEN..])?;
        }

        Ok(response)
    }
}

#[async_trait]
impl ModbusClientTrait for ModbusClient {
    async fn read_register(
        &self,
        address: u16,
        function: FunctionCode,
        signed: bool,
    ) -> Result<i64, ModbusError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.read_register_blocking(address, function, signed))
            .await?
    }

    async fn write_register(
        &self,
        address: u16,
        value: RegisterValue,
        signed: bool,
    ) -> Result<RegisterValue, ModbusError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.write_register_blocking(address, value, signed))
            .await?
    }
}
