use clap::Parser;
use vacuum_bridge::cli::commands::{cmd_detect, cmd_navigate, cmd_path, cmd_rooms, cmd_screenshot};
use vacuum_bridge::cli::config::{Cli, Commands, apply_env_overrides, load_config};
use vacuum_bridge::cli::logging::init_tracing;
use vacuum_bridge::run_bridge;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Resolve settings: CLI > env > config file > defaults
    let mut config = load_config(cli.config.as_deref());
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    if let Some(serial) = cli.serial {
        config.device.serial = Some(serial);
    }

    match cli.command {
        Commands::Run => run_bridge(&config)?,
        Commands::Detect => cmd_detect(&config)?,
        Commands::Navigate { page } => {
            if !cmd_navigate(&config, page)? {
                std::process::exit(1);
            }
        }
        Commands::Path { from, to } => cmd_path(from, to),
        Commands::Rooms => cmd_rooms(&config)?,
        Commands::Screenshot { output } => cmd_screenshot(&config, &output)?,
    }

    Ok(())
}
