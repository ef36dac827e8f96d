use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod utils;

use commands::audit::AuditCommands;

/// civic - serve the institutional CMS and inspect its audit trail
#[derive(Parser)]
#[command(name = "civic")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to the standard search path)
    #[arg(long, global = true, value_name = "PATH", env = "CIVIC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the audit routes over HTTP
    Serve,
    /// Audit trail commands
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve => commands::serve::execute(cli.config.as_deref()).await,
        Commands::Audit { command } => {
            commands::audit::execute(command, cli.config.as_deref()).await
        }
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);

            if let Some(source) = e.source() {
                eprintln!("\n{} {}", "Caused by:".yellow(), source);
            }

            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_audit_list() {
        let cli = Cli::try_parse_from([
            "civic",
            "--config",
            "/etc/civic-cms/config.toml",
            "audit",
            "list",
            "--action",
            "update",
            "--per-page",
            "5",
        ])
        .unwrap();

        assert_eq!(
            cli.config,
            Some(PathBuf::from("/etc/civic-cms/config.toml"))
        );
        assert!(matches!(
            cli.command,
            Commands::Audit {
                command: AuditCommands::List(_)
            }
        ));
    }
}
