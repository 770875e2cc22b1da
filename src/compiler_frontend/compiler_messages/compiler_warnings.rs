use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use saying::say;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct CompilerWarning {
    pub msg: String,
    pub location: TextLocation,
    pub warning_kind: WarningKind,
    pub file_path: PathBuf,
}

impl CompilerWarning {
    pub fn new(msg: &str, location: TextLocation, warning_kind: WarningKind) -> CompilerWarning {
        CompilerWarning {
            msg: msg.to_owned(),
            location,
            warning_kind,
            file_path: PathBuf::new(),
        }
    }

    pub fn with_file_path(mut self, file_path: PathBuf) -> Self {
        self.file_path = file_path;
        self
    }

    /// Get the file path as a string for display purposes
    pub fn file_path_string(&self) -> String {
        self.file_path.to_string_lossy().to_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// Constant folding raised (type mismatch, division by zero).
    /// The expression is left as it was.
    FoldError,

    /// A construct the transformer does not model precisely was left untouched
    UnsupportedConstruct,
}

pub fn print_formatted_warning(w: CompilerWarning) {
    say!(Yellow Bold "WARNING: ");
    if !w.file_path.as_os_str().is_empty() {
        say!("File: ", Dark Magenta w.file_path_string());
    }

    let line_number = w.location.start_pos.line_number + 1;
    match w.warning_kind {
        WarningKind::FoldError => {
            say!("Could not fold expression on line ", Bright {line_number}, ": ", Yellow w.msg);
        }
        WarningKind::UnsupportedConstruct => {
            say!("Left untouched on line ", Bright {line_number}, ": ", Yellow w.msg);
        }
    }
}
