//! Transforms every selected function of one source file.
//!
//! The file is parsed once and its module executed once up front, which also serves the first
//! function. Values are reference counted per thread, so every further function is transformed
//! on a rayon worker that executes its own copy of the module from the shared tree.
//! Top level code therefore runs once per selected function.

use crate::compiler_frontend::CompilerFrontend;
use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::compiler_warnings::CompilerWarning;
use crate::compiler_frontend::optimizers::pipeline::{Pass, PassConfig};
use crate::compiler_frontend::syntax::ast_nodes::{FunctionDef, Stmt};
use crate::compiler_frontend::syntax::render_source::render_function;
use crate::compiler_frontend::values::value::Value;
use crate::projects::settings::{
    Config, INTERPRETER_STACK_SIZE, PassEntry, overrides_from_toml, value_from_toml,
};
use crate::runtime::function::Function;
use crate::runtime::module::Module;
use crate::{return_config_error, return_file_error, timer_log};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

/// The result for one function, plain data so it can leave a worker thread
#[derive(Debug, Clone)]
pub struct TransformedFunction {
    pub name: String,
    pub def: FunctionDef,

    /// Present when the configuration asked for source output
    pub source: Option<String>,
    pub warnings: Vec<CompilerWarning>,
}

/// Where a configuration came from, used for error locations
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub config: Config,
    pub path: PathBuf,
}

pub fn read_source(path: &Path) -> Result<String, CompilerError> {
    match fs::read_to_string(path) {
        Ok(source) => Ok(source),
        Err(e) => return_file_error!(path, format!("Could not read source file: {e}")),
    }
}

/// Transforms the configured functions (or every top level function) of a file.
/// The first reuses the module executed up front, the others run in parallel.
/// Results come back in the order the functions were requested.
pub fn transform_file(
    source_path: &Path,
    config: &ConfigSource,
) -> Result<Vec<TransformedFunction>, CompilerMessages> {
    let time = Instant::now();
    let frontend = CompilerFrontend::new(source_path);

    let source = read_source(source_path).map_err(|e| CompilerMessages::from_error(e, Vec::new()))?;
    let body = frontend
        .source_to_tree(&source)
        .map_err(|e| CompilerMessages::from_error(e, Vec::new()))?;

    // Executed once up front, so a broken module is reported once instead of per worker
    let module = frontend
        .tree_to_module(body.to_owned())
        .map_err(|e| CompilerMessages::from_error(e, Vec::new()))?;

    let names = if config.config.functions.is_empty() {
        module.function_names()
    } else {
        config.config.functions.to_owned()
    };
    let Some((first, rest)) = names.split_first() else {
        return Ok(Vec::new());
    };

    let mut results = Vec::with_capacity(names.len());
    results.push(transform_with_module(&frontend, &module, first, config));
    drop(module);

    if !rest.is_empty() {
        let pool = rayon::ThreadPoolBuilder::new()
            .stack_size(INTERPRETER_STACK_SIZE)
            .build()
            .map_err(|e| {
                CompilerMessages::from_error(
                    CompilerError::compiler_error(format!("Could not start transform workers: {e}")),
                    Vec::new(),
                )
            })?;

        let transformed_rest: Vec<Result<TransformedFunction, CompilerMessages>> = pool.install(|| {
            rest.par_iter()
                .map(|name| transform_in_worker(&frontend, &body, name, config))
                .collect()
        });
        results.extend(transformed_rest);
    }

    timer_log!(time, "Transformed file in: ");

    let mut transformed = Vec::with_capacity(results.len());
    let mut messages = CompilerMessages::new();
    for result in results {
        match result {
            Ok(function) => transformed.push(function),
            Err(failed) => {
                messages.errors.extend(failed.errors);
                messages.warnings.extend(failed.warnings);
            }
        }
    }

    if messages.has_errors() {
        for function in transformed {
            messages.warnings.extend(function.warnings);
        }
        return Err(messages);
    }

    Ok(transformed)
}

fn transform_in_worker(
    frontend: &CompilerFrontend,
    body: &[Stmt],
    name: &str,
    config: &ConfigSource,
) -> Result<TransformedFunction, CompilerMessages> {
    let module = frontend
        .tree_to_module(body.to_vec())
        .map_err(|e| CompilerMessages::from_error(e, Vec::new()))?;
    transform_with_module(frontend, &module, name, config)
}

fn transform_with_module(
    frontend: &CompilerFrontend,
    module: &Module,
    name: &str,
    config: &ConfigSource,
) -> Result<TransformedFunction, CompilerMessages> {
    let function = module
        .function(name)
        .map_err(|e| CompilerMessages::from_error(e.with_file_path(frontend.source_path.to_owned()), Vec::new()))?;

    let (transformed, warnings) = apply_configured_passes(frontend, module, &function, config)?;

    let source = if config.config.return_source {
        Some(render_function(&transformed.def))
    } else {
        None
    };

    Ok(TransformedFunction {
        name: name.to_owned(),
        def: transformed.def.as_ref().to_owned(),
        source,
        warnings,
    })
}

/// Runs the configured passes one after another, each on the callable the previous one produced.
/// Every pass sees the global overrides with its own merged over them.
pub fn apply_configured_passes(
    frontend: &CompilerFrontend,
    module: &Module,
    function: &Rc<Function>,
    config: &ConfigSource,
) -> Result<(Rc<Function>, Vec<CompilerWarning>), CompilerMessages> {
    let mut current = function.clone();
    let mut warnings = Vec::new();

    for entry in &config.config.passes {
        let (pass, pass_config) = match build_pass(entry, module, config) {
            Ok(built) => built,
            Err(error) => return Err(CompilerMessages::from_error(error, warnings)),
        };

        match frontend.transform_function(&current, &[pass], &pass_config) {
            Ok(output) => {
                warnings.extend(output.warnings.to_owned());
                if let Some(function) = output.function() {
                    current = function;
                }
            }
            Err(mut messages) => {
                warnings.append(&mut messages.warnings);
                messages.warnings = warnings;
                return Err(messages);
            }
        }
    }

    Ok((current, warnings))
}

/// Turns one `[[pass]]` table into a pass over this module
pub fn build_pass(
    entry: &PassEntry,
    module: &Module,
    config: &ConfigSource,
) -> Result<(Pass, PassConfig), CompilerError> {
    let overrides = overrides_from_toml(&config.config.overrides_for(entry), &config.path)?;
    let pass_config = PassConfig {
        return_source: false,
        overrides: overrides.into_iter().collect(),
    };

    let pass = match entry {
        PassEntry::Unroll { .. } => Pass::Unroll,
        PassEntry::CollapseLiterals { .. } => Pass::CollapseLiterals,
        PassEntry::Inline { functions, .. } => {
            let mut callees = Vec::with_capacity(functions.len());
            for name in functions {
                callees.push(module.function(name).map_err(|e| e.with_file_path(module.path.to_owned()))?);
            }
            Pass::Inline(callees)
        }
        PassEntry::Deindex { name, values, .. } => Pass::Deindex {
            name: name.to_owned(),
            values: deindex_values(name, values.as_ref(), module, &config.path)?,
        },
    };

    Ok((pass, pass_config))
}

// Values from the table, or the elements of the module global with the same name
fn deindex_values(
    name: &str,
    values: Option<&toml::Value>,
    module: &Module,
    config_path: &Path,
) -> Result<Vec<Value>, CompilerError> {
    let sequence = match values {
        Some(values) => match value_from_toml(values) {
            Ok(sequence) => sequence,
            Err(e) => return_config_error!(config_path, format!("Deindex values for '{name}': {e}"), {
                VariableName => name,
            }),
        },
        None => match module.global(name) {
            Some(sequence) => sequence,
            None => return_config_error!(config_path, format!("Deindex pass names '{name}', which is not a global of the module"), {
                VariableName => name,
                PrimarySuggestion => "Define the sequence at the top level or give its values in the pass table",
            }),
        },
    };

    match sequence.iterate() {
        Ok(elements) => Ok(elements),
        Err(e) => return_config_error!(config_path, format!("Deindex sequence '{name}' can't be iterated: {e}"), {
            VariableName => name,
        }),
    }
}

#[cfg(test)]
#[path = "tests/batch_tests.rs"]
mod batch_tests;
