mod commands;
mod helpers;

use clap::Parser;
use rhybrid_core::domain::HybridError;

pub fn run_from_env() -> i32 {
    helpers::install_tracing();
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let hybrid_error = error.as_hybrid_error();
            eprintln!("{}", hybrid_error.diagnostic_line());
            if let Some(summary_line) = hybrid_error.fatal_exit_line() {
                eprintln!("{}", summary_line);
            }
            hybrid_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("rhybrid".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(name = "rhybrid", about = "Hybrid plasma solver bootstrap")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Initialize and finalize a run on in-process ranks
    Bootstrap(commands::BootstrapArgs),
    /// Parse spacecraft orbit files and report their extent
    OrbitCheck(commands::OrbitCheckArgs),
    /// List field profiles and optional subsystems
    Profiles,
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Bootstrap(args) => commands::run_bootstrap_command(args),
        CliCommand::OrbitCheck(args) => commands::run_orbit_check_command(args),
        CliCommand::Profiles => commands::run_profiles_command(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Bootstrap(HybridError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CliError {
    fn as_hybrid_error(&self) -> HybridError {
        match self {
            Self::Usage(message) => HybridError::configuration("CONFIG.CLI_USAGE", message.clone()),
            Self::Bootstrap(error) => error.clone(),
            Self::Internal(error) => HybridError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}

impl From<HybridError> for CliError {
    fn from(error: HybridError) -> Self {
        Self::Bootstrap(error)
    }
}
