use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::syntax::ast_nodes::{Stmt, StmtKind};
use crate::compiler_frontend::syntax::parse_statements::parse_module;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::compiler_frontend::values::value::Value;
use crate::runtime::function::Function;
use crate::runtime::interpreter::run_module;
use crate::runtime::{Namespace, new_namespace};
use crate::{return_syntax_error, timer_log};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Instant;

/// A parsed and executed source file
pub struct Module {
    pub path: PathBuf,
    pub body: Vec<Stmt>,
    pub globals: Namespace,
}

impl Module {
    pub fn from_source(source: &str, path: &Path) -> Result<Module, CompilerError> {
        let time = Instant::now();
        let body = parse_module(source).map_err(|error| error.with_file_path(path.to_path_buf()))?;
        timer_log!(time, "Parsed module in: ");

        Module::from_tree(body, path)
    }

    /// Executes an already parsed module in a fresh namespace.
    /// Each thread transforming functions of the same file builds its own.
    pub fn from_tree(body: Vec<Stmt>, path: &Path) -> Result<Module, CompilerError> {
        let time = Instant::now();
        let globals = new_namespace(FxHashMap::default());
        run_module(&body, globals.clone()).map_err(|error| error.with_file_path(path.to_path_buf()))?;
        timer_log!(time, "Executed module in: ");

        Ok(Module {
            path: path.to_path_buf(),
            body,
            globals,
        })
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.borrow().get(name).cloned()
    }

    /// The function defined under this name.
    /// Builtins and other values have no source to transform.
    pub fn function(&self, name: &str) -> Result<Rc<Function>, CompilerError> {
        let location = self.definition_location(name).unwrap_or_default();

        match self.global(name) {
            Some(Value::Function(function)) => Ok(function),
            Some(other) => return_syntax_error!(
                format!("'{name}' is a {}, not a function with source code", other.type_name()),
                location,
                {
                    VariableName => name,
                    PrimarySuggestion => "Only functions defined with 'def' in this file can be transformed",
                }
            ),
            None => return_syntax_error!(
                format!("No function named '{name}' is defined in this module"),
                location,
                {
                    VariableName => name,
                }
            ),
        }
    }

    /// Names of the top level function definitions, in source order
    pub fn function_names(&self) -> Vec<String> {
        self.body
            .iter()
            .filter_map(|stmt| match &stmt.kind {
                StmtKind::FunctionDef(def) => Some(def.name.to_owned()),
                _ => None,
            })
            .collect()
    }

    fn definition_location(&self, name: &str) -> Option<TextLocation> {
        self.body.iter().find_map(|stmt| match &stmt.kind {
            StmtKind::FunctionDef(def) if def.name == name => Some(def.location),
            _ => None,
        })
    }
}
