/// # Everything around the transformation core
/// Configuration, the command line, parallel transformation of whole files
/// and the golden case runner.

// The basic CLI for transforming files and running functions
pub mod cli;

pub mod batch;
pub mod settings;
pub mod test_runner;
