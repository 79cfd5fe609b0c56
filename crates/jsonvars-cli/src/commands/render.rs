//! Render command

use std::path::Path;

use jsonvars_core::load_config;

use crate::cli::Sources;
use crate::error::Result;
use crate::session::Session;

/// Resolve every placeholder of the template file and return the JSON text.
pub fn render(template: &Path, sources: &Sources, compact: bool) -> Result<String> {
    let document = load_config(template)?;
    let session = Session::load(sources)?;
    session.import_template(&document)?;

    let value = session.processor().wrap(document).to_value()?;
    let text = if compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };
    Ok(text)
}

/// Run the render command
pub fn run_render(template: &Path, sources: &Sources, compact: bool) -> Result<()> {
    println!("{}", render(template, sources, compact)?);
    Ok(())
}
