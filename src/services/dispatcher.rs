use log::{info, warn};
use std::sync::Arc;

use crate::command::types::{Command, CommandDescriptor};
use crate::command::validator;
use crate::modbus::client::ModbusClientTrait;
use crate::modbus::protocol::{FunctionCode, RegisterValue};
use crate::utils::error::{CommandError, ValidationError};

/// Turns raw command descriptors into register transactions.
#[derive(Clone)]
pub struct CommandDispatcher {
    client: Arc<dyn ModbusClientTrait>,
}

impl CommandDispatcher {
    pub fn new(client: Arc<dyn ModbusClientTrait>) -> Self {
        Self { client }
    }

    /// Validates `descriptor` and runs the resulting command.
    ///
    /// Writes answer with the validated value, not a read-back of the register.
    pub async fn process(&self, descriptor: &CommandDescriptor) -> Result<RegisterValue, CommandError> {
        let command = validator::validate(descriptor).map_err(|e| {
            warn!("❌ Rejected command {:?}: {}", descriptor, e);
            e
        })?;
        self.execute(&command).await
    }

    pub async fn execute(&self, command: &Command) -> Result<RegisterValue, CommandError> {
        let result = match command.function {
            FunctionCode::ReadHolding | FunctionCode::ReadInput => self
                .client
                .read_register(command.address, command.function, command.signed)
                .await
                .map(RegisterValue::Integer),
            FunctionCode::WriteSingle => {
                let value = command.value.ok_or(ValidationError::MissingValue)?;
                self.client
                    .write_register(command.address, value, command.signed)
                    .await
                    .map(|_| value)
            }
        };

        match result {
            Ok(value) => {
                info!(
                    "✅ fc {} @ {} (signed: {}) -> {}",
                    command.function, command.address, command.signed, value
                );
                Ok(value)
            }
            Err(e) => {
                warn!(
                    "💥 fc {} @ {} failed: {}",
                    command.function, command.address, e
                );
                Err(CommandError::from(e))
            }
        }
    }

    /// Runs every descriptor independently, preserving order.
    pub async fn process_batch(
        &self,
        descriptors: &[CommandDescriptor],
    ) -> Vec<Result<RegisterValue, CommandError>> {
        let mut results = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            results.push(self.process(descriptor).await);
        }
        results
    }
}
