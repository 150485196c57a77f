use std::fmt;
use thiserror::Error;

/// Failures raised by the Modbus transaction layer.
#[derive(Error, Debug)]
pub enum ModbusError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Communication error: {0}")]
    CommunicationError(String),

    #[error("CRC checksum mismatch (expected 0x{expected:04X}, received 0x{received:04X})")]
    CrcError { expected: u16, received: u16 },

    #[error("Invalid response from device: {0}")]
    InvalidResponse(String),

    #[error("Device exception for function 0x{function:02X}: {code}")]
    Exception { function: u8, code: ExceptionCode },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Lock acquisition failed")]
    LockError,

    #[error("Timeout occurred")]
    Timeout,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP server error: {0}")]
    HttpServerError(String),
}

impl ModbusError {
    /// `true` when the failure comes from the value handed to the client
    /// rather than from the link or the device.
    pub fn is_value_error(&self) -> bool {
        matches!(self, ModbusError::InvalidData(_))
    }
}

impl From<std::io::Error> for ModbusError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => ModbusError::Timeout,
            _ => ModbusError::CommunicationError(format!("IO error: {}", err)),
        }
    }
}

impl From<tokio::task::JoinError> for ModbusError {
    fn from(err: tokio::task::JoinError) -> Self {
        ModbusError::CommunicationError(format!("Transaction worker failed: {}", err))
    }
}

/// Exception codes a Modbus slave may answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionCode {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    SlaveDeviceFailure,
    Acknowledge,
    SlaveDeviceBusy,
    MemoryParityError,
    GatewayPathUnavailable,
    GatewayTargetFailedToRespond,
    Unknown(u8),
}

impl From<u8> for ExceptionCode {
    fn from(code: u8) -> Self {
        match code {
            0x01 => ExceptionCode::IllegalFunction,
            0x02 => ExceptionCode::IllegalDataAddress,
            0x03 => ExceptionCode::IllegalDataValue,
            0x04 => ExceptionCode::SlaveDeviceFailure,
            0x05 => ExceptionCode::Acknowledge,
            0x06 => ExceptionCode::SlaveDeviceBusy,
            0x08 => ExceptionCode::MemoryParityError,
            0x0A => ExceptionCode::GatewayPathUnavailable,
            0x0B => ExceptionCode::GatewayTargetFailedToRespond,
            other => ExceptionCode::Unknown(other),
        }
    }
}

impl fmt::Display for ExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionCode::IllegalFunction => write!(f, "illegal function"),
            ExceptionCode::IllegalDataAddress => write!(f, "illegal data address"),
            ExceptionCode::IllegalDataValue => write!(f, "illegal data value"),
            ExceptionCode::SlaveDeviceFailure => write!(f, "slave device failure"),
            ExceptionCode::Acknowledge => write!(f, "acknowledge"),
            ExceptionCode::SlaveDeviceBusy => write!(f, "slave device busy"),
            ExceptionCode::MemoryParityError => write!(f, "memory parity error"),
            ExceptionCode::GatewayPathUnavailable => write!(f, "gateway path unavailable"),
            ExceptionCode::GatewayTargetFailedToRespond => {
                write!(f, "gateway target device failed to respond")
            }
            ExceptionCode::Unknown(code) => write!(f, "unknown exception 0x{:02X}", code),
        }
    }
}

/// Field-level rejection of a command descriptor. The display strings are
/// returned verbatim to API callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing function code")]
    MissingFunctionCode,

    #[error("Cannot parse function code as integer")]
    FunctionCodeNotInteger,

    #[error("Function code not 3, 4, or 16")]
    UnsupportedFunctionCode,

    #[error("Missing address")]
    MissingAddress,

    #[error("Cannot parse address as integer")]
    AddressNotInteger,

    #[error("Address not in range <0; 5000>")]
    AddressOutOfRange,

    #[error("Missing value for function code 16")]
    MissingValue,

    #[error("Cannot parse value as a number")]
    ValueNotNumber,

    #[error("Value is only allowed for function code 16")]
    ValueNotAllowed,

    #[error("Value not in range <0; 65535>")]
    ValueOutOfRange,

    #[error("Cannot parse signed as boolean")]
    SignedNotBoolean,

    #[error("Invalid command parameters")]
    InvalidParameters,
}

/// Outcome classification of a dispatched command.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Modbus or communication error")]
    Connection(#[source] ModbusError),
}

impl CommandError {
    pub fn is_validation(&self) -> bool {
        matches!(self, CommandError::Validation(_))
    }
}

impl From<ModbusError> for CommandError {
    fn from(err: ModbusError) -> Self {
        if err.is_value_error() {
            CommandError::Validation(ValidationError::InvalidParameters)
        } else {
            CommandError::Connection(err)
        }
    }
}
