use actix_web::{http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use log::{error, info, warn};
use serde_json::{json, Value};

use crate::command::types::CommandDescriptor;
use crate::modbus::protocol::RegisterValue;
use crate::services::dispatcher::CommandDispatcher;
use crate::services::health::HealthProbe;
use crate::utils::error::{CommandError, ModbusError};

pub const TEST_PASSED: &str = "Modbus communication test passed.";
pub const TEST_FAILED: &str = "Modbus communication test failed. \
    This means a cable is unplugged, the AC unit is powered down, \
    a communication error happened, or the AC firmware has changed.";
pub const NOT_FOUND_GREETING: &str = "Ahoj, ja jsem tvoje klimatizace. Pouzij appku prosim.";

// API Service state
#[derive(Clone)]
pub struct ApiServiceState {
    pub dispatcher: CommandDispatcher,
    pub probe: HealthProbe,
}

impl ApiServiceState {
    pub fn new(dispatcher: CommandDispatcher, probe: HealthProbe) -> Self {
        Self { dispatcher, probe }
    }
}

// API Service
pub struct ApiService {
    state: ApiServiceState,
    server_handle: Option<actix_web::dev::ServerHandle>,
}

impl ApiService {
    pub fn new(state: ApiServiceState) -> Self {
        Self {
            state,
            server_handle: None,
        }
    }

    pub async fn start(&mut self, address: &str) -> Result<(), ModbusError> {
        info!("🌐 Starting HTTP API server on {}", address);

        let state_data = web::Data::new(self.state.clone());

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state_data.clone())
                .wrap(middleware::Logger::default())
                .wrap(middleware::Compress::default())
                .configure(configure_routes)
                .default_service(web::to(not_found))
        })
        .bind(address)
        .map_err(|e| ModbusError::HttpServerError(format!("Cannot bind {}: {}", address, e)))?
        .run();

        // Store server handle for graceful shutdown
        self.server_handle = Some(server.handle());

        tokio::spawn(async move {
            if let Err(e) = server.await {
                error!("❌ HTTP API server error: {}", e);
            }
        });

        info!("✅ HTTP API server started successfully on {}", address);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<(), ModbusError> {
        info!("🛑 Stopping HTTP API server...");

        if let Some(handle) = self.server_handle.take() {
            tokio::select! {
                _ = handle.stop(true) => {
                    info!("✅ HTTP API server stopped gracefully");
                }
                _ = tokio::time::sleep(tokio::time::Duration::from_secs(10)) => {
                    warn!("⚠️  HTTP API server shutdown timeout, forcing stop");
                    handle.stop(false).await;
                }
            }
        }

        Ok(())
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/single_command", web::post().to(single_command))
        .route("/batch_command", web::post().to(batch_command))
        .route("/test", web::post().to(test_communication));
}

fn command_outcome(result: Result<RegisterValue, CommandError>) -> Value {
    match result {
        Ok(value) => json!({ "result": value }),
        Err(e) => json!({ "error": e.to_string() }),
    }
}

/// Decodes a form body leniently: a missing or undecodable body yields an
/// empty descriptor so the request still gets a validation answer.
fn form_descriptor(body: &[u8]) -> CommandDescriptor {
    match serde_urlencoded::from_bytes::<Vec<(String, String)>>(body) {
        Ok(pairs) => CommandDescriptor::from_pairs(pairs),
        Err(e) => {
            warn!("⚠️  Undecodable form body: {}", e);
            CommandDescriptor::default()
        }
    }
}

// POST /single_command - form-encoded descriptor
async fn single_command(body: web::Bytes, state: web::Data<ApiServiceState>) -> HttpResponse {
    let descriptor = form_descriptor(&body);
    let result = state.dispatcher.process(&descriptor).await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) if e.is_validation() => StatusCode::BAD_REQUEST,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    HttpResponse::build(status).json(command_outcome(result))
}

// POST /batch_command - JSON array of descriptors
async fn batch_command(
    commands: web::Json<Vec<Value>>,
    state: web::Data<ApiServiceState>,
) -> HttpResponse {
    let descriptors: Vec<CommandDescriptor> =
        commands.iter().map(CommandDescriptor::from_json).collect();
    info!("📦 Processing batch of {} commands", descriptors.len());

    let responses: Vec<Value> = state
        .dispatcher
        .process_batch(&descriptors)
        .await
        .into_iter()
        .map(command_outcome)
        .collect();

    HttpResponse::Ok().json(responses)
}

// POST /test - controller health check
async fn test_communication(state: web::Data<ApiServiceState>) -> HttpResponse {
    if state.probe.check().await {
        HttpResponse::Ok().json(json!({ "result": TEST_PASSED }))
    } else {
        HttpResponse::InternalServerError().json(json!({ "error": TEST_FAILED }))
    }
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type("text/plain; charset=utf-8")
        .body(NOT_FOUND_GREETING)
}
