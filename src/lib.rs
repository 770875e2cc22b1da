//! pragma: a source-level partial evaluator.
//!
//! Functions written in a small Python-like language are parsed, executed into a module,
//! and then rewritten by composable passes (loop unrolling, literal collapsing,
//! function inlining and deindexing) into a new callable or into source text.

pub mod compiler_frontend;
pub mod projects;
pub mod runtime;

pub use compiler_frontend::optimizers::pipeline::{
    Pass, PassConfig, TransformOutput, Transformed, collapse_literals, deindex, inline, parse,
    transform, unroll,
};
pub use runtime::module::Module;
