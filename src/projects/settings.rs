use crate::compiler_frontend::basic_utility_functions::is_valid_identifier;
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::values::value::{FoldError, Value};
use crate::return_config_error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const SOURCE_FILE_EXTENSION: &str = "py";
pub const CONFIG_FILE_NAME: &str = "pragma.toml";
pub const TEST_CASES_DIR: &str = "tests/cases";
pub const EXPECTED_OUTPUT_EXTENSION: &str = "expected";

// Rendering
pub const INDENTATION: &str = "    ";

// The loop variable of the `for ____ in range(1):` wrapper an inlined body is rendered as
pub const INLINE_LOOP_VARIABLE: &str = "____";

// Key of the inline container that holds the callee's return value
pub const RETURN_KEY: &str = "return";

// Loops with more elements than this are left as loops
pub const MAX_UNROLL_ITERATIONS: usize = 512;

// Ranges, repetitions and other sequences longer than this are never materialized
pub const MAX_MATERIALIZED_LENGTH: i64 = 1_000_000;

// Runtime call depth before a RecursionError is raised.
// Every call nests several interpreter frames, so this has to fit in INTERPRETER_STACK_SIZE.
pub const MAX_CALL_DEPTH: usize = 48;

// Stack for threads that execute modules and transform functions
pub const INTERPRETER_STACK_SIZE: usize = 64 * 1024 * 1024;

// This is a guess about how much should be initially allocated for the token and node vecs.
// It is just a heuristic based on small snippets of code.
pub const SRC_TO_TOKEN_RATIO: usize = 5; // (Maybe) About 1/5 source code to tokens
pub const TOKEN_TO_NODE_RATIO: usize = 10; // (Maybe) About 1/10 tokens to statements
pub const MINIMUM_LIKELY_STATEMENTS: usize = 4; // How many statements the smallest common blocks will likely have

/// The contents of a pragma.toml file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Emit source text instead of a callable
    #[serde(default = "default_return_source")]
    pub return_source: bool,

    /// Functions to transform, every top level function when empty
    #[serde(default)]
    pub functions: Vec<String>,

    /// Static bindings injected into the outermost scope of every pass
    #[serde(default)]
    pub overrides: toml::Table,

    #[serde(default, rename = "pass")]
    pub passes: Vec<PassEntry>,
}

fn default_return_source() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            return_source: true,
            functions: Vec::new(),
            overrides: toml::Table::new(),
            passes: Vec::new(),
        }
    }
}

/// One `[[pass]]` table
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum PassEntry {
    Unroll {
        #[serde(default)]
        overrides: toml::Table,
    },
    CollapseLiterals {
        #[serde(default)]
        overrides: toml::Table,
    },
    Inline {
        functions: Vec<String>,
        #[serde(default)]
        overrides: toml::Table,
    },
    Deindex {
        name: String,

        // Taken from the module global of the same name when missing
        #[serde(default)]
        values: Option<toml::Value>,
        #[serde(default)]
        overrides: toml::Table,
    },
}

impl PassEntry {
    pub fn overrides(&self) -> &toml::Table {
        match self {
            PassEntry::Unroll { overrides }
            | PassEntry::CollapseLiterals { overrides }
            | PassEntry::Inline { overrides, .. }
            | PassEntry::Deindex { overrides, .. } => overrides,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Config, CompilerError> {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                return Err(CompilerError::file_error(
                    path,
                    format!("Could not read config file: {e}"),
                ));
            }
        };

        Config::from_toml(&source, path)
    }

    pub fn from_toml(source: &str, path: &Path) -> Result<Config, CompilerError> {
        match toml::from_str::<Config>(source) {
            Ok(config) => Ok(config),
            Err(e) => return_config_error!(path, e.message().to_owned(), {
                PrimarySuggestion => "Check the keys against the documented pragma.toml layout",
            }),
        }
    }

    /// The global overrides with a pass's own overrides merged over them
    pub fn overrides_for(&self, pass: &PassEntry) -> toml::Table {
        let mut merged = self.overrides.clone();
        for (name, value) in pass.overrides() {
            merged.insert(name.to_owned(), value.to_owned());
        }
        merged
    }
}

/// Converts a TOML value into a runtime value
pub fn value_from_toml(value: &toml::Value) -> Result<Value, FoldError> {
    match value {
        toml::Value::Integer(int) => Ok(Value::Int(*int)),
        toml::Value::Float(float) => Ok(Value::Float(*float)),
        toml::Value::String(text) => Ok(Value::str(text)),
        toml::Value::Boolean(boolean) => Ok(Value::Bool(*boolean)),
        toml::Value::Array(elements) => {
            let elements = elements
                .iter()
                .map(value_from_toml)
                .collect::<Result<Vec<Value>, FoldError>>()?;
            Ok(Value::list(elements))
        }
        toml::Value::Table(table) => {
            let mut entries = Vec::with_capacity(table.len());
            for (key, value) in table {
                entries.push((Value::str(key), value_from_toml(value)?));
            }
            Value::dict(entries)
        }
        toml::Value::Datetime(_) => Err(FoldError::type_error(
            "TOML dates have no value equivalent",
        )),
    }
}

pub fn overrides_from_toml(
    table: &toml::Table,
    path: &Path,
) -> Result<Vec<(String, Value)>, CompilerError> {
    let mut overrides = Vec::with_capacity(table.len());
    for (name, value) in table {
        if !is_valid_identifier(name) {
            return_config_error!(path, format!("Override '{name}' is not a variable name"), {
                VariableName => name,
            });
        }
        match value_from_toml(value) {
            Ok(value) => overrides.push((name.to_owned(), value)),
            Err(e) => return_config_error!(path, format!("Override '{name}': {e}"), {
                VariableName => name,
            }),
        }
    }
    Ok(overrides)
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod settings_tests;
