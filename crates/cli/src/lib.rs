pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::{decide::DecideArgs, resolve::ResolveArgs, status::StatusArgs};

#[derive(Debug, Parser)]
#[command(
    name = "signoff",
    about = "Signoff operator CLI",
    long_about = "Operate Signoff migrations, demo fixtures, config inspection, and the \
                  signatory routing flow: resolve approval plans, record decisions, and \
                  inspect request status.",
    after_help = "Examples:\n  signoff migrate\n  signoff seed\n  signoff resolve --path leave-request --applicant E-100\n  signoff decide --request REQ-LEAVE-0001 --employee E-200 --decision approved\n  signoff status --request REQ-LEAVE-0001"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the deterministic demo dataset and verify it")]
    Seed,
    #[command(
        about = "Inspect effective configuration values with source attribution"
    )]
    Config,
    #[command(about = "Resolve the signatory plan for a path and applicant, creating a request")]
    Resolve(ResolveArgs),
    #[command(about = "Record one approver's decision against a request")]
    Decide(DecideArgs),
    #[command(about = "Show the approval progress of a request")]
    Status(StatusArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Resolve(args) => commands::resolve::run(&args),
        Command::Decide(args) => commands::decide::run(&args),
        Command::Status(args) => commands::status::run(&args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
