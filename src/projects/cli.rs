//! Command-line entrypoints for pragma.
//!
//! This module parses CLI commands and dispatches them into file transformation,
//! running a (transformed) function and the golden test cases.

use crate::compiler_frontend::basic_utility_functions::is_valid_identifier;
use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages};
use crate::compiler_frontend::display_messages::{print_compiler_messages, print_formatted_error};
use crate::compiler_frontend::values::value::Value;
use crate::compiler_frontend::{CompilerFrontend, Flag};
use crate::projects::batch::{ConfigSource, apply_configured_passes, read_source, transform_file};
use crate::projects::settings::{CONFIG_FILE_NAME, Config, PassEntry, value_from_toml};
use crate::projects::test_runner::run_all_test_cases;
use saying::say;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug, PartialEq)]
enum Command {
    // Transforms the functions of a file and prints the result
    Transform(TransformOptions),

    // Transforms (when passes are configured) and calls one function
    Run(RunOptions),

    Help,
    Tests, // Runs the golden cases under tests/cases
}

#[derive(Debug, Default, PartialEq)]
struct TransformOptions {
    path: String,
    config_path: Option<String>,

    // Replace the configured passes when any are given
    passes: Vec<PassEntry>,
    functions: Vec<String>,
    overrides: Vec<(String, toml::Value)>,
    callable: bool,
    json: bool,
}

#[derive(Debug, Default, PartialEq)]
struct RunOptions {
    path: String,
    function: String,
    args: Vec<toml::Value>,
    config_path: Option<String>,
}

pub fn start_cli() {
    let compiler_args: Vec<String> = env::args().collect();

    if compiler_args.len() < 2 {
        print_help(false);
        return;
    }

    let command = match get_command(&compiler_args[1..]) {
        Ok(command) => command,
        Err(e) => {
            say!(Red e);
            print_help(true);
            return;
        }
    };

    // Gather a list of any additional flags
    let flags = get_flags(&compiler_args);

    match command {
        Command::Help => {
            print_help(false);
        }

        Command::Transform(options) => {
            let time = Instant::now();
            match run_transform(&options) {
                Ok(warnings) => {
                    if !flags.contains(&Flag::DisableWarnings) {
                        print_compiler_messages(warnings);
                    }
                    if !flags.contains(&Flag::DisableTimers) {
                        say!("Transformed in: ", Green #time.elapsed());
                    }
                }
                Err(messages) => print_compiler_messages(messages),
            }
        }

        Command::Run(options) => match run_function(&options) {
            Ok(result) => {
                say!(result.repr());
            }
            Err(e) => print_formatted_error(e),
        },

        Command::Tests => {
            let summary = run_all_test_cases(!flags.contains(&Flag::DisableWarnings));
            if !summary.all_correct() {
                std::process::exit(1);
            }
        }
    }
}

fn get_command(args: &[String]) -> Result<Command, String> {
    let command = args.first().map(String::as_str);

    match command {
        Some("help") => Ok(Command::Help),
        Some("transform") => parse_transform_command(args),
        Some("run") => parse_run_command(args),
        Some("tests") => Ok(Command::Tests),
        Some(other) => Err(format!("Invalid command: '{other}'")),
        None => Err(String::from("Missing command")),
    }
}

fn get_flags(args: &[String]) -> Vec<Flag> {
    let mut flags = Vec::new();

    for arg in args {
        match arg.as_str() {
            "--hide-warnings" => flags.push(Flag::DisableWarnings),
            "--hide-timers" => flags.push(Flag::DisableTimers),
            _ => {}
        }
    }

    flags
}

// The value following a flag
fn flag_value<'a>(args: &'a [String], index: usize, flag: &str) -> Result<&'a str, String> {
    match args.get(index + 1) {
        Some(value) if !value.starts_with("--") => Ok(value),
        _ => Err(format!("Missing value for {flag}")),
    }
}

fn parse_transform_command(args: &[String]) -> Result<Command, String> {
    let mut options = TransformOptions::default();
    let mut index = 1usize;

    while let Some(arg) = args.get(index) {
        match arg.as_str() {
            "--config" => {
                options.config_path = Some(flag_value(args, index, arg)?.to_owned());
                index += 2;
            }
            "--pass" => {
                options.passes.push(parse_pass(flag_value(args, index, arg)?)?);
                index += 2;
            }
            "--function" => {
                options.functions.push(flag_value(args, index, arg)?.to_owned());
                index += 2;
            }
            "--set" => {
                options.overrides.push(parse_override(flag_value(args, index, arg)?)?);
                index += 2;
            }
            "--callable" => {
                options.callable = true;
                index += 1;
            }
            "--json" => {
                options.json = true;
                index += 1;
            }
            "--hide-warnings" | "--hide-timers" => {
                index += 1;
            }
            _ if arg.starts_with("--") => {
                return Err(format!(
                    "Unknown transform flag: '{arg}'. Supported flags are --config, --pass, --function, --set, --callable, --json."
                ));
            }
            _ => {
                if options.path.is_empty() {
                    options.path = arg.to_owned();
                    index += 1;
                } else {
                    return Err(String::from("Transform command accepts one source file."));
                }
            }
        }
    }

    if options.path.is_empty() {
        return Err(String::from("Transform command needs a source file."));
    }

    Ok(Command::Transform(options))
}

fn parse_run_command(args: &[String]) -> Result<Command, String> {
    let mut options = RunOptions::default();
    let mut positional = Vec::new();
    let mut index = 1usize;

    while let Some(arg) = args.get(index) {
        match arg.as_str() {
            "--config" => {
                options.config_path = Some(flag_value(args, index, arg)?.to_owned());
                index += 2;
            }
            "--hide-warnings" | "--hide-timers" => {
                index += 1;
            }
            _ if arg.starts_with("--") => {
                return Err(format!("Unknown run flag: '{arg}'. The only run flag is --config."));
            }
            _ => {
                positional.push(arg.to_owned());
                index += 1;
            }
        }
    }

    let mut positional = positional.into_iter();
    let (Some(path), Some(function)) = (positional.next(), positional.next()) else {
        return Err(String::from("Run command needs a source file and a function name."));
    };
    options.path = path;
    options.function = function;
    for arg in positional {
        options.args.push(parse_literal(&arg)?);
    }

    Ok(Command::Run(options))
}

/// `unroll`, `collapse`, `inline:f,g` or `deindex:name`
fn parse_pass(text: &str) -> Result<PassEntry, String> {
    let (kind, argument) = match text.split_once(':') {
        Some((kind, argument)) => (kind, Some(argument)),
        None => (text, None),
    };

    let overrides = toml::Table::new();
    match (kind, argument) {
        ("unroll", None) => Ok(PassEntry::Unroll { overrides }),
        ("collapse" | "collapse_literals", None) => Ok(PassEntry::CollapseLiterals { overrides }),
        ("inline", Some(functions)) if !functions.is_empty() => Ok(PassEntry::Inline {
            functions: functions.split(',').map(|name| name.trim().to_owned()).collect(),
            overrides,
        }),
        ("deindex", Some(name)) if !name.is_empty() => Ok(PassEntry::Deindex {
            name: name.to_owned(),
            values: None,
            overrides,
        }),
        _ => Err(format!(
            "Invalid pass: '{text}'. Expected unroll, collapse, inline:<functions> or deindex:<name>."
        )),
    }
}

/// `name=<literal>`
fn parse_override(text: &str) -> Result<(String, toml::Value), String> {
    let Some((name, literal)) = text.split_once('=') else {
        return Err(format!("Invalid --set value: '{text}'. Expected name=<literal>."));
    };
    let name = name.trim();
    if !is_valid_identifier(name) {
        return Err(format!("Invalid --set value: '{text}'. '{name}' is not a variable name."));
    }

    Ok((name.to_owned(), parse_literal(literal)?))
}

/// Literals on the command line use TOML syntax: `3`, `2.5`, `"text"`, `true`, `[1, 2]`
fn parse_literal(text: &str) -> Result<toml::Value, String> {
    match toml::from_str::<toml::Table>(&format!("value = {}", text.trim())) {
        Ok(mut table) => table
            .remove("value")
            .ok_or_else(|| format!("Invalid literal: '{text}'")),
        Err(_) => Err(format!("Invalid literal: '{text}'. Use TOML syntax, e.g. 3, \"text\" or [1, 2].")),
    }
}

// An explicit --config, else pragma.toml next to the source file, else the defaults
fn load_config(source_path: &Path, config_path: Option<&str>) -> Result<ConfigSource, CompilerError> {
    if let Some(config_path) = config_path {
        let path = PathBuf::from(config_path);
        return Ok(ConfigSource {
            config: Config::from_file(&path)?,
            path,
        });
    }

    let beside_source = source_path
        .parent()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    if beside_source.exists() {
        return Ok(ConfigSource {
            config: Config::from_file(&beside_source)?,
            path: beside_source,
        });
    }

    Ok(ConfigSource {
        config: Config::default(),
        path: source_path.to_path_buf(),
    })
}

/// Returns the warnings of a successful transformation
fn run_transform(options: &TransformOptions) -> Result<CompilerMessages, CompilerMessages> {
    let source_path = PathBuf::from(&options.path);
    let mut config = load_config(&source_path, options.config_path.as_deref())
        .map_err(|e| CompilerMessages::from_error(e, Vec::new()))?;

    if !options.passes.is_empty() {
        config.config.passes = options.passes.to_owned();
    }
    if !options.functions.is_empty() {
        config.config.functions = options.functions.to_owned();
    }
    for (name, value) in &options.overrides {
        config.config.overrides.insert(name.to_owned(), value.to_owned());
    }
    if options.callable {
        config.config.return_source = false;
    }

    let functions = transform_file(&source_path, &config)?;

    let mut messages = CompilerMessages::new();
    if options.json {
        let defs: Vec<_> = functions.iter().map(|function| &function.def).collect();
        match serde_json::to_string_pretty(&defs) {
            Ok(json) => {
                say!(json);
            }
            Err(e) => {
                let error = CompilerError::compiler_error(format!("Could not serialize the transformed trees: {e}"));
                return Err(CompilerMessages::from_error(error, Vec::new()));
            }
        }
    }

    for function in functions {
        if !options.json {
            match &function.source {
                Some(source) => {
                    say!(source.trim_end().to_owned(), "\n");
                }
                None => {
                    say!(Green "✓ ", function.name.to_owned(), " transformed into a callable");
                }
            }
        }
        messages.warnings.extend(function.warnings);
    }

    Ok(messages)
}

fn run_function(options: &RunOptions) -> Result<Value, CompilerError> {
    let source_path = PathBuf::from(&options.path);
    let config = load_config(&source_path, options.config_path.as_deref())?;
    let frontend = CompilerFrontend::new(&source_path);

    let source = read_source(&source_path)?;
    let body = frontend.source_to_tree(&source)?;
    let module = frontend.tree_to_module(body)?;
    let function = module.function(&options.function)?;

    let (function, _) = apply_configured_passes(&frontend, &module, &function, &config).map_err(|messages| {
        messages
            .errors
            .into_iter()
            .next()
            .unwrap_or_else(|| CompilerError::compiler_error("Transformation failed without an error"))
    })?;

    let mut args = Vec::with_capacity(options.args.len());
    for arg in &options.args {
        match value_from_toml(arg) {
            Ok(value) => args.push(value),
            Err(e) => return Err(CompilerError::config_error(&source_path, format!("Invalid argument: {e}"))),
        }
    }

    function
        .call(args, Vec::new())
        .map_err(|e| e.with_file_path(source_path.to_owned()))
}

fn print_help(commands_only: bool) {
    if !commands_only {
        say!(Bright Black "------------------------------------");
        say!(Green Bold "pragma: a partial evaluator for Python-like functions");
        say!("Usage: ", Bold "<command> ", Italic "<args>");
    }
    say!(Green Bold "\nCommands:");
    say!("  transform <file>              - Transforms the functions of a file and prints them");
    say!("  run <file> <function> <args>  - Transforms and calls a function, printing the result");
    say!("  tests                         - Runs the golden test cases");
    say!("  help                          - Shows this message");

    say!(Green Bold "\nTransform options:");
    say!("  --config <toml>               (default: pragma.toml next to the file)");
    say!("  --pass unroll|collapse|inline:<f,..>|deindex:<name>");
    say!("  --function <name>             (default: every top level function)");
    say!("  --set <name>=<literal>");
    say!("  --callable");
    say!("  --json");

    say!(Green Bold "\nFlags:");
    say!("  --hide-warnings");
    say!("  --hide-timers");
}

#[cfg(test)]
#[path = "tests/cli_tests.rs"]
mod tests;
