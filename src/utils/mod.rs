pub mod error;

pub use error::{CommandError, ExceptionCode, ModbusError, ValidationError};
