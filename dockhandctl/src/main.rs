use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod compose;
mod executor;
mod orchestrator;
mod probe;
mod retry;
mod stack;

#[derive(Parser)]
#[command(name = "dockhandctl", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring up the service set and wait until it is observably ready
    Up(commands::up::UpArgs),
    /// Tear down the service set; succeeds whether or not it was running
    Down(commands::down::DownArgs),
    /// Print the resolved runtime configuration
    Config(commands::show_config::ConfigArgs),
    /// Print version and exit
    Version,
}

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Up(args) => match commands::up::run(args).await {
            Ok(code) => std::process::exit(code),
            Err(e) => {
                eprintln!("Error bringing up service set: {:#}", e);
                std::process::exit(commands::up::EXIT_FAILURE);
            }
        },
        Commands::Down(args) => std::process::exit(commands::down::run(args)),
        Commands::Config(args) => {
            if let Err(e) = commands::show_config::run(args) {
                eprintln!("Error resolving configuration: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
        }
    }
    Ok(())
}
