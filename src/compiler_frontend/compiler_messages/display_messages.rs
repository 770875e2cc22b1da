use crate::compiler_frontend::compiler_errors::{CompilerError, CompilerMessages, ErrorType};
use crate::compiler_frontend::compiler_warnings::print_formatted_warning;
use saying::say;
use std::path::{Path, PathBuf};
use std::{env, fs};

fn normalize_display_path(path: &Path) -> PathBuf {
    let path_string = path.to_string_lossy();
    if let Some(stripped) = path_string.strip_prefix(r"\\?\") {
        return PathBuf::from(stripped);
    }

    path.to_path_buf()
}

fn relative_display_path(path: &Path) -> String {
    let normalized = normalize_display_path(path);

    match env::current_dir() {
        Ok(dir) => {
            let normalized_dir = normalize_display_path(&dir);
            normalized
                .strip_prefix(&normalized_dir)
                .unwrap_or(&normalized)
                .to_string_lossy()
                .to_string()
        }
        Err(_) => normalized.to_string_lossy().to_string(),
    }
}

pub fn print_compiler_messages(messages: CompilerMessages) {
    for err in messages.errors {
        print_formatted_error(err);
    }

    for warning in messages.warnings {
        print_formatted_warning(warning);
    }
}

pub fn print_formatted_error(e: CompilerError) {
    let relative_dir = relative_display_path(&e.file_path);
    let line_number = e.location.start_pos.line_number.max(0) as usize;

    // The offending line, if the file can still be read
    let line = match fs::read_to_string(normalize_display_path(&e.file_path)) {
        Ok(file) => file
            .lines()
            .nth(line_number)
            .unwrap_or_default()
            .to_string(),
        Err(_) => String::new(),
    };

    match e.error_type {
        ErrorType::Syntax => {
            if !relative_dir.is_empty() {
                say!("\n(╯°□°)╯  🔥🔥 ", Dark Magenta relative_dir, " 🔥🔥  Σ(°△°;) ");
            }

            say!(Red "Syntax");
            say!(Dark Magenta "Line ", Bright {line_number + 1});
        }

        ErrorType::SignatureBind => {
            if !relative_dir.is_empty() {
                say!("\n(ಠ_ಠ) ", Dark Magenta relative_dir);
            }

            say!(Red "Signature Bind");
            if let Some(function_name) = e.metadata_value(
                crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::FunctionName,
            ) {
                say!(Dark Magenta "Calling ", Bright function_name.to_owned());
            }
            say!(Dark Magenta "Line ", Bright {line_number + 1});
        }

        ErrorType::Runtime => {
            let exception = e.exception_type().unwrap_or("Exception").to_owned();
            say!(Red exception, ": ", e.msg);
            return;
        }

        ErrorType::File => {
            say!(Yellow "🏚 Can't find/read file or directory: ", relative_dir);
            say!(e.msg);
            return;
        }

        ErrorType::Compiler => {
            if !relative_dir.is_empty() {
                say!("\nヽ༼☉ ‿ ⚆༽ﾉ  🔥🔥🔥🔥 ", Dark Magenta relative_dir, " 🔥🔥🔥🔥  ╰(° _ o╰) ");
            }
            say!(Yellow "TRANSFORMER BUG - ");
            say!(Dark Yellow "pragma developer skill issue (not your fault)");
        }

        ErrorType::Config => {
            if !relative_dir.is_empty() {
                say!("\n (-_-)  🔥🔥🔥🔥 ", Dark Magenta relative_dir, " 🔥🔥🔥🔥  <(^~^)/ ");
            }
            say!(Yellow "CONFIG FILE ISSUE- ");
            say!(Dark Yellow "Malformed config file, something doesn't make sense inside pragma.toml");
            say!(Red e.msg);
            return;
        }
    }

    say!(Red e.msg);

    if let Some(suggestion) = e.metadata_value(
        crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::PrimarySuggestion,
    ) {
        say!(Green "Suggestion: ", suggestion.to_owned());
    }

    if line.is_empty() {
        return;
    }

    println!("\n{line}");

    // spaces before the relevant part of the line
    print!(
        "{}",
        " ".repeat(e.location.start_pos.char_column.max(0) as usize)
    );

    let length_of_underline =
        (e.location.end_pos.char_column - e.location.start_pos.char_column).max(1) as usize;
    say!(Red { "^".repeat(length_of_underline) });
}
