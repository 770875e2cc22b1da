pub mod basic_utility_functions;

pub mod tokenizer {
    pub mod tokenizer;
    pub mod tokens;
}

pub mod syntax {
    pub mod ast_nodes;
    pub mod parse_expression;
    pub mod parse_statements;
    pub mod render_source;
    pub mod syntax_queries;
}

pub mod values {
    pub mod builtins;
    pub mod operators;
    pub mod value;
}

pub mod optimizers {
    pub mod collapse_literals;
    pub mod deindex;
    pub mod inline;
    pub mod pipeline;
    pub mod rewrite_engine;
    pub mod scope_stack;
    pub mod static_resolver;
    pub mod unroll;

    #[cfg(test)]
    mod tests;
}

pub mod compiler_messages {
    pub mod compiler_dev_logging;
    pub mod compiler_errors;
    pub mod compiler_warnings;
    pub mod display_messages;
}
pub use compiler_messages::compiler_errors;
pub use compiler_messages::compiler_warnings;
pub use compiler_messages::display_messages;

use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::optimizers::pipeline::{Pass, PassConfig, TransformOutput, transform};
use crate::compiler_frontend::syntax::ast_nodes::Stmt;
use crate::compiler_frontend::syntax::parse_statements::parse_module;
use crate::compiler_frontend::tokenizer::tokenizer::tokenize;
use crate::compiler_frontend::tokenizer::tokens::FileTokens;
use crate::runtime::function::Function;
use crate::runtime::module::Module;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Flags change what the CLI and the test runner print.
/// They never change what a transformation produces.
#[derive(PartialEq, Debug, Clone)]
pub enum Flag {
    DisableWarnings,
    DisableTimers,
}

/// The stages a source file goes through, in order.
/// Each stage attaches the file path to the errors it reports.
pub struct CompilerFrontend {
    pub(crate) source_path: PathBuf,
}

impl CompilerFrontend {
    pub fn new(source_path: &Path) -> Self {
        Self {
            source_path: source_path.to_path_buf(),
        }
    }

    /// -----------------------------
    /// TOKENIZER
    /// -----------------------------
    pub fn source_to_tokens(&self, source_code: &str) -> Result<FileTokens, CompilerError> {
        tokenize(source_code).map_err(|e| e.with_file_path(self.source_path.to_owned()))
    }

    /// -----------------------------
    /// SYNTAX TREE
    /// -----------------------------
    /// The whole file becomes one statement sequence.
    /// Function bodies are parsed here too, nothing is parsed lazily.
    pub fn source_to_tree(&self, source_code: &str) -> Result<Vec<Stmt>, CompilerError> {
        parse_module(source_code).map_err(|e| e.with_file_path(self.source_path.to_owned()))
    }

    /// -----------------------------
    /// MODULE EXECUTION
    /// -----------------------------
    /// Runs the top level so functions exist as values with their globals,
    /// defaults and decorators already applied.
    pub fn tree_to_module(&self, body: Vec<Stmt>) -> Result<Module, CompilerError> {
        Module::from_tree(body, &self.source_path)
    }

    /// -----------------------------
    /// TRANSFORMATION
    /// -----------------------------
    pub fn transform_function(
        &self,
        function: &Rc<Function>,
        passes: &[Pass],
        config: &PassConfig,
    ) -> Result<TransformOutput, CompilerMessages> {
        match transform(function, passes, config) {
            Ok(mut output) => {
                for warning in &mut output.warnings {
                    warning.file_path = self.source_path.to_owned();
                }
                Ok(output)
            }
            Err(mut messages) => {
                for error in &mut messages.errors {
                    if error.file_path.as_os_str().is_empty() {
                        error.file_path = self.source_path.to_owned();
                    }
                }
                for warning in &mut messages.warnings {
                    warning.file_path = self.source_path.to_owned();
                }
                Err(messages)
            }
        }
    }
}
