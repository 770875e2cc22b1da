//! Golden case runner.
//!
//! `tests/cases/success/<name>.py` is transformed with `<name>.toml` (default configuration when
//! missing) and the rendered functions must match `<name>.expected`.
//! Files under `tests/cases/failure/` must fail to transform.

use crate::compiler_frontend::compiler_errors::{CompilerError, error_type_to_str};
use crate::compiler_frontend::compiler_warnings::print_formatted_warning;
use crate::compiler_frontend::display_messages::print_formatted_error;
use crate::projects::batch::{ConfigSource, TransformedFunction, transform_file};
use crate::projects::settings::{
    Config, EXPECTED_OUTPUT_EXTENSION, SOURCE_FILE_EXTENSION, TEST_CASES_DIR,
};
use saying::say;
use std::fs;
use std::path::{Path, PathBuf};

const SEPARATOR_LINE_LENGTH: usize = 37;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub expected_failures: usize,
    pub unexpected_successes: usize,

    /// Names of the cases that did not behave as expected
    pub incorrect: Vec<String>,
}

impl TestSummary {
    pub fn all_correct(&self) -> bool {
        self.incorrect.is_empty()
    }
}

/// Runs the cases under the default directory
pub fn run_all_test_cases(show_warnings: bool) -> TestSummary {
    run_test_cases_in(Path::new(TEST_CASES_DIR), show_warnings)
}

pub fn run_test_cases_in(cases_dir: &Path, show_warnings: bool) -> TestSummary {
    say!("Running all pragma test cases...\n");
    let timer = std::time::Instant::now();
    let mut summary = TestSummary::default();

    let success_cases = case_files(&cases_dir.join("success"));
    if !success_cases.is_empty() {
        say!(Cyan "Cases that should transform:");
        println!("{}", "-".repeat(SEPARATOR_LINE_LENGTH));
    }
    for path in success_cases {
        summary.total += 1;
        let name = case_name(&path);
        say!("  ", name.to_owned());

        match run_case(&path) {
            Ok(functions) => {
                let expected = fs::read_to_string(path.with_extension(EXPECTED_OUTPUT_EXTENSION));
                let rendered = joined_sources(&functions);

                match expected {
                    Ok(expected) if expected.trim_end() == rendered.trim_end() => {
                        say!(Green "✓ PASS");
                        summary.passed += 1;
                    }
                    Ok(expected) => {
                        say!(Red "✗ FAIL", " (output differs)");
                        say!(Dark Yellow "Expected:\n", expected.trim_end());
                        say!(Dark Yellow "Got:\n", rendered.trim_end());
                        summary.failed += 1;
                        summary.incorrect.push(name.to_owned());
                    }
                    Err(e) => {
                        say!(Red "✗ FAIL", " (no expected output: ", e.to_string(), ")");
                        summary.failed += 1;
                        summary.incorrect.push(name.to_owned());
                    }
                }

                let warnings: Vec<_> = functions.into_iter().flat_map(|function| function.warnings).collect();
                if !warnings.is_empty() {
                    say!(Yellow "With ", warnings.len().to_string(), " warnings");
                    if show_warnings {
                        for warning in warnings {
                            print_formatted_warning(warning);
                        }
                    }
                }
            }
            Err(errors) => {
                say!(Red "✗ FAIL");
                summary.failed += 1;
                summary.incorrect.push(name.to_owned());
                for error in errors {
                    print_formatted_error(error);
                }
            }
        }

        println!("{}", "-".repeat(SEPARATOR_LINE_LENGTH));
    }

    let failure_cases = case_files(&cases_dir.join("failure"));
    if !failure_cases.is_empty() {
        say!(Cyan "\nCases that should fail:");
        println!("{}", "-".repeat(SEPARATOR_LINE_LENGTH));
    }
    for path in failure_cases {
        summary.total += 1;
        let name = case_name(&path);
        say!("  ", name.to_owned());

        match run_case(&path) {
            Ok(_) => {
                say!(Yellow "✗ UNEXPECTED SUCCESS");
                summary.unexpected_successes += 1;
                summary.incorrect.push(name.to_owned());
            }
            Err(errors) => {
                say!(Green "✓ EXPECTED FAILURE");
                summary.expected_failures += 1;
                for error in errors {
                    say!(Yellow error_type_to_str(&error.error_type), ": ", error.msg);
                }
            }
        }

        println!("{}", "-".repeat(SEPARATOR_LINE_LENGTH));
    }

    println!("\n{}", "=".repeat(SEPARATOR_LINE_LENGTH));
    say!("Test Results Summary. Took: ", Green #timer.elapsed());
    say!("  Total cases: ", Yellow summary.total);
    say!("  Passed: ", Blue summary.passed);
    say!("  Failed: ", Blue summary.failed);
    say!("  Expected failures: ", Blue summary.expected_failures);
    say!("  Unexpected successes: ", Blue summary.unexpected_successes);

    if summary.all_correct() {
        say!("\n🎉 All cases behaved as expected!");
    } else {
        say!(Yellow "\n⚠ ", summary.incorrect.len().to_string(), " cases did not behave as expected: ", summary.incorrect.join(", "));
    }
    println!("{}", "=".repeat(SEPARATOR_LINE_LENGTH));

    summary
}

/// Rendered source of every function, separated by a blank line
pub fn joined_sources(functions: &[TransformedFunction]) -> String {
    functions
        .iter()
        .filter_map(|function| function.source.as_deref())
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn run_case(path: &Path) -> Result<Vec<TransformedFunction>, Vec<CompilerError>> {
    let config_path = path.with_extension("toml");
    let config = if config_path.exists() {
        Config::from_file(&config_path).map_err(|e| vec![e])?
    } else {
        Config::default()
    };

    let config = ConfigSource {
        config,
        path: config_path,
    };
    transform_file(path, &config).map_err(|messages| messages.errors)
}

fn case_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == SOURCE_FILE_EXTENSION))
        .collect();
    files.sort();
    files
}

fn case_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}
