pub mod dispatcher;
pub mod health;
#[cfg(feature = "api")]
pub mod api_service;

pub use dispatcher::CommandDispatcher;
pub use health::HealthProbe;
#[cfg(feature = "api")]
pub use api_service::{ApiService, ApiServiceState};
