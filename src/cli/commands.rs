use clap::{Arg, ArgAction, ArgMatches, Command};
use log::info;
use std::sync::Arc;

use crate::command::types::CommandDescriptor;
use crate::modbus::client::ModbusClientTrait;
use crate::services::{CommandDispatcher, HealthProbe};

pub fn build_cli() -> Command {
    Command::new("cts602-gateway")
        .version(crate::VERSION)
        .about("Validated Modbus RTU register gateway for CTS602 HVAC controllers")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .value_name("DEVICE")
                .help("Serial port of the RS-485 adapter, e.g. /dev/ttyUSB0"),
        )
        .arg(
            Arg::new("station")
                .long("station")
                .short('s')
                .value_name("ADDRESS")
                .help("Modbus station address of the controller"),
        )
        .subcommand(
            Command::new("serve")
                .about("Run the HTTP gateway (default)")
                .arg(Arg::new("bind").long("bind").value_name("ADDRESS"))
                .arg(Arg::new("listen-port").long("listen-port").value_name("PORT")),
        )
        .subcommand(Command::new("probe").about("Check the link and controller identity"))
        .subcommand(
            Command::new("command")
                .about("Run a single register command")
                .arg(
                    Arg::new("function-code")
                        .long("function-code")
                        .short('f')
                        .required(true)
                        .help("3 = read holding, 4 = read input, 16 = write"),
                )
                .arg(Arg::new("address").long("address").short('a').required(true))
                .arg(Arg::new("value").long("value").short('v').allow_hyphen_values(true))
                .arg(
                    Arg::new("signed")
                        .long("signed")
                        .action(ArgAction::SetTrue)
                        .help("Two's complement register value"),
                ),
        )
}

/// Runs one-shot subcommands. Returns `Ok(false)` when the gateway should be
/// served instead.
pub async fn handle_subcommands(
    matches: &ArgMatches,
    client: Arc<dyn ModbusClientTrait>,
) -> Result<bool, Box<dyn std::error::Error>> {
    if matches.subcommand_matches("probe").is_some() {
        info!("🔍 Executing probe command...");

        if HealthProbe::new(client).check().await {
            println!("✅ Modbus communication test passed.");
            return Ok(true);
        }
        return Err("Modbus communication test failed".into());
    }

    if let Some(matches) = matches.subcommand_matches("command") {
        let mut descriptor = CommandDescriptor {
            function_code: matches.get_one::<String>("function-code").cloned(),
            address: matches.get_one::<String>("address").cloned(),
            value: matches.get_one::<String>("value").cloned(),
            signed: None,
        };
        if matches.get_flag("signed") {
            descriptor.signed = Some("true".to_string());
        }

        info!("🔧 Executing command {:?}", descriptor);
        let result = CommandDispatcher::new(client).process(&descriptor).await?;
        println!("{}", result);
        return Ok(true);
    }

    Ok(false)
}
