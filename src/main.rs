use clap::Parser;
use device_relay::cli::{Cli, Commands, DeviceCommands};
use device_relay::client::RelayClient;
use device_relay::config::RelayConfig;
use device_relay::error::{ErrorResponse, RelayError};
use device_relay::logging::{init_logging, log_file_path, ApplicationMode, LoggingConfig};
use device_relay::relay::server::RelayServer;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mode = match cli.command {
        Commands::Serve(_) => ApplicationMode::Server,
        Commands::Devices(_) => ApplicationMode::Cli,
    };
    let mut log_config = LoggingConfig::from_args(mode, cli.quiet, cli.verbose, cli.json);
    if let Commands::Serve(args) = &cli.command {
        if args.log_to_file && log_config.file_output.is_none() {
            log_config.file_output = log_file_path(ApplicationMode::Server);
        }
    }

    if let Err(e) = init_logging(log_config) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        let error_response = match e.downcast_ref::<RelayError>() {
            Some(relay_error) => relay_error.to_error_response(),
            None => ErrorResponse {
                code: "INTERNAL_ERROR".to_string(),
                message: format!("{:#}", e),
            },
        };
        match serde_json::to_string_pretty(&error_response) {
            Ok(json) => eprintln!("{}", json),
            Err(_) => eprintln!("{}", error_response.message),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve(args) => {
            let config = args.apply(RelayConfig::from_env()?);
            config.validate()?;
            RelayServer::new(config)?.run().await?;
        },

        Commands::Devices(DeviceCommands::List { url }) => {
            let devices = RelayClient::new(&url)?.list_devices().await?;
            println!("{}", serde_json::to_string_pretty(&devices)?);
        },

        Commands::Devices(DeviceCommands::Add {
            id,
            device_type,
            ip,
            port,
            url,
        }) => {
            let response = RelayClient::new(&url)?
                .add_device(&id, &device_type, &ip, port)
                .await?;
            println!("{}", response.message);
        },

        Commands::Devices(DeviceCommands::Remove { id, url }) => {
            let response = RelayClient::new(&url)?.remove_device(&id).await?;
            println!("{}", response.message);
        },
    }

    Ok(())
}
