use serde::Serialize;
use std::fmt;

use super::crc::{append_crc, verify_crc};
use crate::utils::error::{ExceptionCode, ModbusError};

/// Smallest valid RTU response: station, function, exception code, CRC.
pub const MIN_RESPONSE_LEN: usize = 5;
pub const EXCEPTION_FLAG: u8 = 0x80;

const READ_RESPONSE_LEN: usize = 7;
const WRITE_RESPONSE_LEN: usize = 8;

/// Function codes the gateway accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionCode {
    ReadHolding = 3,
    ReadInput = 4,
    /// Write of a single register through "write multiple registers"
    /// with a quantity of one.
    WriteSingle = 16,
}

impl FunctionCode {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            3 => Some(FunctionCode::ReadHolding),
            4 => Some(FunctionCode::ReadInput),
            16 => Some(FunctionCode::WriteSingle),
            _ => None,
        }
    }

    pub fn is_read(self) -> bool {
        matches!(self, FunctionCode::ReadHolding | FunctionCode::ReadInput)
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Numeric register value as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RegisterValue {
    Integer(i64),
    Decimal(f64),
}

impl RegisterValue {
    /// Encodes the value into a raw 16-bit register with zero decimals.
    /// Fractions are truncated toward zero. Signed values must fit an `i16`.
    pub fn to_register(self, signed: bool) -> Result<u16, ModbusError> {
        let number = match self {
            RegisterValue::Integer(v) => v,
            RegisterValue::Decimal(v) if v.is_finite() => v.trunc() as i64,
            RegisterValue::Decimal(v) => {
                return Err(ModbusError::InvalidData(format!("{} is not a finite number", v)))
            }
        };

        if signed {
            i16::try_from(number)
                .map(|v| v as u16)
                .map_err(|_| {
                    ModbusError::InvalidData(format!(
                        "{} does not fit a signed register <-32768; 32767>",
                        number
                    ))
                })
        } else {
            u16::try_from(number).map_err(|_| {
                ModbusError::InvalidData(format!("{} does not fit a register <0; 65535>", number))
            })
        }
    }
}

/// Decodes a raw register with zero decimals, two's complement when `signed`.
pub fn decode_register(raw: u16, signed: bool) -> i64 {
    if signed {
        raw as i16 as i64
    } else {
        raw as i64
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterValue::Integer(v) => write!(f, "{}", v),
            RegisterValue::Decimal(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModbusRequest {
    ReadRegister {
        station: u8,
        function: FunctionCode,
        address: u16,
    },
    WriteRegister {
        station: u8,
        address: u16,
        raw: u16,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModbusResponse {
    Register(u16),
    WriteAck { address: u16 },
}

impl ModbusRequest {
    pub fn station(&self) -> u8 {
        match self {
            ModbusRequest::ReadRegister { station, .. } => *station,
            ModbusRequest::WriteRegister { station, .. } => *station,
        }
    }

    pub fn function(&self) -> FunctionCode {
        match self {
            ModbusRequest::ReadRegister { function, .. } => *function,
            ModbusRequest::WriteRegister { .. } => FunctionCode::WriteSingle,
        }
    }

    /// Full RTU frame including CRC.
    pub fn to_frame(&self) -> Vec<u8> {
        let mut frame = vec![self.station(), self.function().code()];
        match self {
            ModbusRequest::ReadRegister { address, .. } => {
                frame.extend_from_slice(&address.to_be_bytes());
                frame.extend_from_slice(&1u16.to_be_bytes());
            }
            ModbusRequest::WriteRegister { address, raw, .. } => {
                frame.extend_from_slice(&address.to_be_bytes());
                frame.extend_from_slice(&1u16.to_be_bytes());
                frame.push(2);
                frame.extend_from_slice(&raw.to_be_bytes());
            }
        }
        append_crc(&mut frame);
        frame
    }

    /// Length of a successful (non-exception) response frame.
    pub fn expected_response_len(&self) -> usize {
        match self {
            ModbusRequest::ReadRegister { .. } => READ_RESPONSE_LEN,
            ModbusRequest::WriteRegister { .. } => WRITE_RESPONSE_LEN,
        }
    }

    pub fn parse_response(&self, frame: &[u8]) -> Result<ModbusResponse, ModbusError> {
        if frame.len() < MIN_RESPONSE_LEN {
            return Err(ModbusError::InvalidResponse(format!(
                "Response too short: {} bytes",
                frame.len()
            )));
        }

        verify_crc(frame)
            .map_err(|(expected, received)| ModbusError::CrcError { expected, received })?;

        if frame[0] != self.station() {
            return Err(ModbusError::InvalidResponse(format!(
                "Response from station {} instead of {}",
                frame[0],
                self.station()
            )));
        }

        let function = self.function().code();
        if frame[1] == function | EXCEPTION_FLAG {
            return Err(ModbusError::Exception {
                function,
                code: ExceptionCode::from(frame[2]),
            });
        }
        if frame[1] != function {
            return Err(ModbusError::InvalidResponse(format!(
                "Unexpected function code 0x{:02X}",
                frame[1]
            )));
        }
        if frame.len() != self.expected_response_len() {
            return Err(ModbusError::InvalidResponse(format!(
                "Expected {} bytes, received {}",
                self.expected_response_len(),
                frame.len()
            )));
        }

        match self {
            ModbusRequest::ReadRegister { .. } => {
                if frame[2] != 2 {
                    return Err(ModbusError::InvalidResponse(format!(
                        "Unexpected byte count {}",
                        frame[2]
                    )));
                }
                Ok(ModbusResponse::Register(u16::from_be_bytes([frame[3], frame[4]])))
            }
            ModbusRequest::WriteRegister { address, .. } => {
                let echoed_address = u16::from_be_bytes([frame[2], frame[3]]);
                let echoed_quantity = u16::from_be_bytes([frame[4], frame[5]]);
                if echoed_address != *address || echoed_quantity != 1 {
                    return Err(ModbusError::InvalidResponse(format!(
                        "Write echo mismatch: address {} quantity {}",
                        echoed_address, echoed_quantity
                    )));
                }
                Ok(ModbusResponse::WriteAck { address: echoed_address })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_crc(mut bytes: Vec<u8>) -> Vec<u8> {
        append_crc(&mut bytes);
        bytes
    }

    #[test]
    fn test_read_frame_layout() {
        let request = ModbusRequest::ReadRegister {
            station: 30,
            function: FunctionCode::ReadInput,
            address: 0,
        };
        assert_eq!(request.to_frame(), vec![0x1E, 0x04, 0x00, 0x00, 0x00, 0x01, 0x33, 0xA5]);
    }

    #[test]
    fn test_write_frame_layout() {
        let request = ModbusRequest::WriteRegister {
            station: 30,
            address: 100,
            raw: 0x1234,
        };
        let frame = request.to_frame();
        assert_eq!(&frame[..9], &[0x1E, 0x10, 0x00, 0x64, 0x00, 0x01, 0x02, 0x12, 0x34]);
        assert_eq!(frame.len(), 11);
        assert!(verify_crc(&frame).is_ok());
    }

    #[test]
    fn test_parse_read_response() {
        let request = ModbusRequest::ReadRegister {
            station: 30,
            function: FunctionCode::ReadHolding,
            address: 7,
        };
        let response = with_crc(vec![30, 0x03, 0x02, 0xFF, 0xF6]);
        assert_eq!(request.parse_response(&response).unwrap(), ModbusResponse::Register(0xFFF6));
    }

    #[test]
    fn test_parse_exception_response() {
        let request = ModbusRequest::ReadRegister {
            station: 30,
            function: FunctionCode::ReadHolding,
            address: 4999,
        };
        let response = with_crc(vec![30, 0x83, 0x02]);
        match request.parse_response(&response) {
            Err(ModbusError::Exception { function, code }) => {
                assert_eq!(function, 0x03);
                assert_eq!(code, ExceptionCode::IllegalDataAddress);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_crc_and_wrong_station() {
        let request = ModbusRequest::ReadRegister {
            station: 30,
            function: FunctionCode::ReadInput,
            address: 0,
        };

        let mut corrupted = with_crc(vec![30, 0x04, 0x02, 0x00, 0x16]);
        corrupted[4] = 0x17;
        assert!(matches!(
            request.parse_response(&corrupted),
            Err(ModbusError::CrcError { .. })
        ));

        let foreign = with_crc(vec![31, 0x04, 0x02, 0x00, 0x16]);
        assert!(matches!(
            request.parse_response(&foreign),
            Err(ModbusError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_write_echo() {
        let request = ModbusRequest::WriteRegister {
            station: 30,
            address: 100,
            raw: 5,
        };
        let ack = with_crc(vec![30, 0x10, 0x00, 0x64, 0x00, 0x01]);
        assert_eq!(
            request.parse_response(&ack).unwrap(),
            ModbusResponse::WriteAck { address: 100 }
        );

        let wrong_address = with_crc(vec![30, 0x10, 0x00, 0x65, 0x00, 0x01]);
        assert!(request.parse_response(&wrong_address).is_err());
    }

    #[test]
    fn test_register_value_encoding() {
        assert_eq!(RegisterValue::Integer(65535).to_register(false).unwrap(), 0xFFFF);
        assert_eq!(RegisterValue::Decimal(10.7).to_register(false).unwrap(), 10);
        assert_eq!(RegisterValue::Integer(32767).to_register(true).unwrap(), 0x7FFF);
        assert!(RegisterValue::Integer(40000).to_register(true).unwrap_err().is_value_error());
        assert!(RegisterValue::Integer(-1).to_register(false).is_err());
    }

    #[test]
    fn test_register_value_decoding() {
        assert_eq!(decode_register(0xFFF6, true), -10);
        assert_eq!(decode_register(0xFFF6, false), 65526);
    }
}
