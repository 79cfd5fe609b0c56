//! List command

use colored::Colorize;

use crate::cli::Sources;
use crate::error::{CliError, Result};
use crate::session::Session;

/// Run the list command
pub fn run_list(path: Option<&str>, sources: &Sources, recursive: bool) -> Result<()> {
    let session = Session::load(sources)?;

    if let Some(path) = path {
        if session.processor().resolve_variable(path).is_none() {
            return Err(CliError::user(format!("Variable '{}' is not defined", path)));
        }
    }

    let paths = session.paths(path, recursive);
    if paths.is_empty() {
        println!("{}", "No variables".dimmed());
        return Ok(());
    }

    for name in paths {
        let Some(value) = session.processor().resolve_variable(&name) else {
            continue;
        };
        match value.to_value() {
            Ok(value) => println!("{} = {}", name.green(), value),
            Err(e) => println!("{} = {}", name.green(), format!("<{}>", e).red()),
        }
    }
    Ok(())
}
