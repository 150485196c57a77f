use anyhow::{anyhow, Result};
use log::info;
use std::sync::Arc;

use cts602_gateway::cli::{build_cli, handle_subcommands};
use cts602_gateway::config::Config;
use cts602_gateway::modbus::{ModbusClient, ModbusClientTrait};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = build_cli().get_matches();
    let config =
        Config::from_matches(&matches).map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    info!("🖥️  CTS602 Modbus gateway v{}", cts602_gateway::VERSION);

    // One connection for the whole process; every caller shares it.
    let client: Arc<dyn ModbusClientTrait> =
        Arc::new(ModbusClient::new(config.connection.clone())?);

    if handle_subcommands(&matches, client.clone())
        .await
        .map_err(|e| anyhow!("{}", e))?
    {
        return Ok(());
    }

    serve(&config, client).await
}

#[cfg(feature = "api")]
async fn serve(config: &Config, client: Arc<dyn ModbusClientTrait>) -> Result<()> {
    use cts602_gateway::services::{ApiService, ApiServiceState, CommandDispatcher, HealthProbe};

    let state = ApiServiceState::new(
        CommandDispatcher::new(client.clone()),
        HealthProbe::new(client),
    );
    let mut api = ApiService::new(state);
    api.start(&config.server.socket_address()).await?;

    tokio::signal::ctrl_c().await?;
    info!("🛑 Shutdown signal received");
    api.stop().await?;
    Ok(())
}

#[cfg(not(feature = "api"))]
async fn serve(_config: &Config, _client: Arc<dyn ModbusClientTrait>) -> Result<()> {
    Err(anyhow!("HTTP API not compiled in; rebuild with the `api` feature"))
}
