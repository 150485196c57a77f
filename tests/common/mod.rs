//! In-memory RTU slave used by the integration tests.
//!
//! The device decodes the real request frames the client puts on the "wire",
//! answers from its register banks and records every transaction. A write
//! that arrives while a previous response is still being read counts as an
//! interleaved transaction.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use cts602_gateway::modbus::crc16_modbus;
use cts602_gateway::{ConnectionConfig, ModbusClient, Transport};

pub const STATION: u8 = 30;

#[derive(Default)]
pub struct DeviceState {
    pub holding: HashMap<u16, u16>,
    pub input: HashMap<u16, u16>,
    /// Swallow requests without answering.
    pub muted: bool,
    /// Answer with a broken checksum.
    pub corrupt_crc: bool,
    pub frames: Vec<Vec<u8>>,
    pub interleaved: usize,
    rx: Vec<u8>,
    tx: VecDeque<u8>,
    in_flight: bool,
}

#[derive(Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<DeviceState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller reporting the supported firmware identity.
    pub fn cts602() -> Self {
        let device = Self::new();
        device.state().input.insert(0, 22);
        device
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap()
    }

    pub fn client(&self) -> ModbusClient {
        ModbusClient::with_transport(
            ConnectionConfig::new("mock", STATION),
            Box::new(self.clone()),
        )
    }
}

fn request_len(rx: &[u8]) -> Option<usize> {
    if rx.len() < 2 {
        return None;
    }
    match rx[1] {
        0x10 if rx.len() < 7 => None,
        0x10 => Some(9 + rx[6] as usize),
        _ => Some(8),
    }
}

impl DeviceState {
    fn handle(&mut self, frame: Vec<u8>) {
        let data_len = frame.len() - 2;
        let crc = u16::from_le_bytes([frame[data_len], frame[data_len + 1]]);
        if crc != crc16_modbus(&frame[..data_len]) || frame[0] != STATION {
            return;
        }
        self.frames.push(frame.clone());

        let function = frame[1];
        let address = u16::from_be_bytes([frame[2], frame[3]]);
        let mut response = vec![STATION];
        match function {
            0x03 | 0x04 => {
                let bank = if function == 0x03 { &self.holding } else { &self.input };
                match bank.get(&address) {
                    Some(value) => {
                        response.extend_from_slice(&[function, 2]);
                        response.extend_from_slice(&value.to_be_bytes());
                    }
                    None => response.extend_from_slice(&[function | 0x80, 0x02]),
                }
            }
            0x10 => {
                let value = u16::from_be_bytes([frame[7], frame[8]]);
                self.holding.insert(address, value);
                response.push(function);
                response.extend_from_slice(&frame[2..6]);
            }
            other => response.extend_from_slice(&[other | 0x80, 0x01]),
        }

        let mut crc = crc16_modbus(&response);
        if self.corrupt_crc {
            crc ^= 0xFFFF;
        }
        response.extend_from_slice(&crc.to_le_bytes());

        if !self.muted {
            self.tx.extend(response);
        }
    }
}

impl Read for MockDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        if state.tx.is_empty() {
            state.in_flight = false;
            return Err(io::Error::new(io::ErrorKind::TimedOut, "Operation timed out"));
        }
        let n = buf.len().min(state.tx.len());
        for (slot, byte) in buf.iter_mut().zip(state.tx.drain(..n)) {
            *slot = byte;
        }
        if state.tx.is_empty() {
            state.in_flight = false;
        }
        Ok(n)
    }
}

impl Write for MockDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        if state.in_flight && state.rx.is_empty() {
            state.interleaved += 1;
        }
        state.in_flight = true;
        state.rx.extend_from_slice(buf);

        while let Some(len) = request_len(&state.rx) {
            if state.rx.len() < len {
                break;
            }
            let frame: Vec<u8> = state.rx.drain(..len).collect();
            state.handle(frame);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockDevice {
    fn discard_input(&mut self) -> io::Result<()> {
        self.state().tx.clear();
        Ok(())
    }
}
