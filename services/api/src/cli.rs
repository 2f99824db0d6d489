use crate::demo::{run_demo, run_geofence_check, DemoArgs, GeofenceCheckArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use urbanvote::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Urban Vote Enrollment Service",
    about = "Run and demonstrate the municipal voter enrollment service from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect the enrollment geofence
    Geofence {
        #[command(subcommand)]
        command: GeofenceCommand,
    },
    /// Run an end-to-end CLI demo covering the enrollment wizard and submission
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum GeofenceCommand {
    /// Check whether a coordinate falls inside the enrollment perimeter
    Check(GeofenceCheckArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Geofence {
            command: GeofenceCommand::Check(args),
        } => run_geofence_check(args),
        Command::Demo(args) => run_demo(args).await,
    }
}
