//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;

/// jsonvars - Resolve `{name}` placeholders in JSON configuration
#[derive(Parser, Debug)]
#[command(name = "jsonvars")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where variables come from
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct Sources {
    /// JSON config file to import; later files take precedence
    #[arg(short, long = "config", value_name = "FILE")]
    pub configs: Vec<PathBuf>,

    /// Set a variable, overriding every config file
    #[arg(short, long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub sets: Vec<(String, Value)>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Render a JSON template with every placeholder resolved
    ///
    /// The template's own keys are available as variables with the lowest
    /// precedence.
    ///
    /// Examples:
    ///   jsonvars render app.json -c env/prod.json
    ///   jsonvars render app.json -s port=9090 --compact
    Render {
        /// Template file (a JSON object)
        template: PathBuf,

        #[command(flatten)]
        sources: Sources,

        /// Print on one line
        #[arg(long)]
        compact: bool,
    },

    /// Print the resolved value of one variable
    Get {
        /// Dotted variable path (e.g. server.port)
        path: String,

        #[command(flatten)]
        sources: Sources,
    },

    /// List variables and their resolved values
    List {
        /// Only list the children of this path
        path: Option<String>,

        #[command(flatten)]
        sources: Sources,

        /// Include every descendant, not just direct children
        #[arg(short, long)]
        recursive: bool,
    },
}

/// Parse `KEY=VALUE`. The value is read as a JSON literal when it is one,
/// otherwise as a plain string.
fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing variable name in '{}'", raw));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
