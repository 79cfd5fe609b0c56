//! Get command

use jsonvars_core::path::parse_path;
use serde_json::Value;

use crate::cli::Sources;
use crate::error::{CliError, Result};
use crate::session::Session;

/// Text printed for one resolved variable.
pub fn get(path: &str, sources: &Sources) -> Result<String> {
    parse_path(path)?;
    let session = Session::load(sources)?;

    let value = session
        .processor()
        .resolve_variable(path)
        .ok_or_else(|| CliError::user(format!("Variable '{}' is not defined", path)))?;

    match value.to_value()? {
        Value::String(text) => Ok(text),
        other => Ok(serde_json::to_string_pretty(&other)?),
    }
}

/// Run the get command
pub fn run_get(path: &str, sources: &Sources) -> Result<()> {
    println!("{}", get(path, sources)?);
    Ok(())
}
