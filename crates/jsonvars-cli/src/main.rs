//! jsonvars CLI
//!
//! Renders JSON configuration files whose string values reference other
//! variables with `{name}` placeholders.

mod cli;
mod commands;
mod error;
mod session;

use clap::Parser;
use colored::Colorize;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match cli.command {
        Some(cmd) => execute_command(cmd),
        None => {
            println!("{} JSON variable resolver", "jsonvars".green().bold());
            println!();
            println!("Run {} for available commands.", "jsonvars --help".cyan());
            Ok(())
        }
    }
}

/// Log to stderr so rendered output stays clean.
fn init_tracing(verbose: bool) {
    let builder = FmtSubscriber::builder()
        .with_writer(std::io::stderr)
        .with_target(true);
    let result = if verbose {
        tracing::subscriber::set_global_default(builder.with_max_level(Level::DEBUG).finish())
    } else {
        tracing::subscriber::set_global_default(
            builder.with_env_filter(EnvFilter::from_default_env()).finish(),
        )
    };

    if let Err(e) = result {
        eprintln!("{} {}", "warning:".yellow().bold(), e);
    } else if verbose {
        tracing::debug!("Verbose mode enabled");
    }
}

fn execute_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Render {
            template,
            sources,
            compact,
        } => commands::run_render(&template, &sources, compact),
        Commands::Get { path, sources } => commands::run_get(&path, &sources),
        Commands::List {
            path,
            sources,
            recursive,
        } => commands::run_list(path.as_deref(), &sources, recursive),
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CliError;

    #[test]
    fn test_cli_error_user() {
        let error = CliError::user("test error");
        assert_eq!(format!("{}", error), "test error");
    }

    #[test]
    fn test_cli_error_from_core() {
        let error = CliError::from(jsonvars_core::Error::ForeignContext);
        assert_eq!(error.to_string(), jsonvars_core::Error::ForeignContext.to_string());
    }
}
