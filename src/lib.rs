//! CTS602 Modbus Gateway
//!
//! Validated register-level access to a CTS602 HVAC controller over a
//! Modbus RTU serial link. Untyped command descriptors are checked field by
//! field, translated into single-register transactions and executed over one
//! persistent, strictly serialized connection.

pub mod cli;
pub mod command;
pub mod config;
pub mod modbus;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use command::{Command, CommandDescriptor};
pub use config::{Config, ConnectionConfig};
pub use modbus::{FunctionCode, ModbusClient, ModbusClientTrait, RegisterValue, Transport};
pub use services::{CommandDispatcher, HealthProbe};
pub use utils::error::{CommandError, ModbusError, ValidationError};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
