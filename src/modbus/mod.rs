pub mod client;
pub mod crc;
pub mod protocol;
pub mod transport;

pub use client::{ModbusClient, ModbusClientTrait, PROBE_ADDRESS, PROBE_IDENTITY};
pub use crc::crc16_modbus;
pub use protocol::{FunctionCode, ModbusRequest, ModbusResponse, RegisterValue};
pub use transport::{SerialTransport, Transport};
