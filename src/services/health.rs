use log::info;
use std::sync::Arc;

use crate::modbus::client::ModbusClientTrait;

/// Liveness check of the controller link.
#[derive(Clone)]
pub struct HealthProbe {
    client: Arc<dyn ModbusClientTrait>,
}

impl HealthProbe {
    pub fn new(client: Arc<dyn ModbusClientTrait>) -> Self {
        Self { client }
    }

    /// `true` when the controller answers and reports the expected identity.
    pub async fn check(&self) -> bool {
        let healthy = self.client.probe().await;
        info!(
            "{} Modbus communication test {}",
            if healthy { "✅" } else { "❌" },
            if healthy { "passed" } else { "failed" }
        );
        healthy
    }
}
