//! Processor setup shared by every command

use std::collections::HashSet;

use jsonvars_core::{Element, VariableContext, VariablesProcessor, load_config};

use crate::cli::Sources;
use crate::error::Result;

/// A processor populated from the command-line sources.
///
/// Chain order: `--set` values in the root context, then config files from
/// last to first, then the template (if any).
pub struct Session {
    processor: VariablesProcessor,
}

impl Session {
    pub fn load(sources: &Sources) -> Result<Self> {
        let processor = VariablesProcessor::new();

        let root = processor.root_context();
        for (key, value) in &sources.sets {
            root.assign_variable(key, value.clone())?;
        }

        for path in sources.configs.iter().rev() {
            let document = load_config(path)?;
            let context = processor.create_context();
            context.import_object("", &document)?;
            processor.add_context(&context)?;
        }

        tracing::debug!(
            sets = sources.sets.len(),
            configs = sources.configs.len(),
            "Loaded variable sources"
        );
        Ok(Self { processor })
    }

    /// Make a template's own keys available with the lowest precedence.
    pub fn import_template(&self, template: &Element) -> Result<()> {
        let context = self.processor.create_context();
        context.import_object("", template)?;
        self.processor.add_context(&context)?;
        Ok(())
    }

    pub fn processor(&self) -> &VariablesProcessor {
        &self.processor
    }

    /// Every context in precedence order, root first.
    pub fn contexts(&self) -> Vec<VariableContext> {
        let mut contexts = vec![self.processor.root_context()];
        contexts.extend(self.processor.contexts());
        contexts
    }

    /// Variable paths across the chain. The first context to define a path
    /// decides its spelling.
    pub fn paths(&self, base: Option<&str>, recursive: bool) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut paths = Vec::new();

        for context in self.contexts() {
            let found = match (base, recursive) {
                (None, false) => context.root_names(),
                (None, true) => context.variables(),
                (Some(base), false) => context.get_child_variables(base),
                (Some(base), true) => context.get_child_variables_recursive(base),
            };
            for path in found {
                if seen.insert(path.to_lowercase()) {
                    paths.push(path);
                }
            }
        }
        paths
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.processor.close();
    }
}
