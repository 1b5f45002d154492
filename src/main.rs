use clap::{Parser, Subcommand};
use std::error::Error;
mod analytics;
mod cfdevd;
mod commands;
mod config;
mod error;
mod hostnet;
mod linuxkit;
mod logging;
mod process;
mod vpnkit;

#[derive(Parser, Debug)]
#[command(version, about = "cf dev CLI", long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stop and remove the local Cloud Foundry environment
    Stop,
}

fn main() {
    let args = Args::parse();
    if let Err(err) = logging::init_logging(args.verbose) {
        eprintln!("failed to initialize logging: {}", err);
    }
    log::debug!("Command line args: {:?}", args);

    if let Err(err) = run(&args) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    match &args.command {
        Some(Commands::Stop) => commands::stop::run()?,
        None => {
            log::info!("No command specified, use --help for usage information");
        }
    }
    Ok(())
}
