use crate::compiler_frontend::compiler_warnings::CompilerWarning;
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use std::collections::HashMap;
use std::path::PathBuf;

// The final set of errors and warnings emitted while transforming a module
#[derive(Debug, Default)]
pub struct CompilerMessages {
    pub errors: Vec<CompilerError>,
    pub warnings: Vec<CompilerWarning>,
}

impl CompilerMessages {
    pub fn new() -> Self {
        CompilerMessages {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn from_error(error: CompilerError, warnings: Vec<CompilerWarning>) -> Self {
        CompilerMessages {
            errors: vec![error],
            warnings,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Debug, Eq, Hash, PartialEq, Clone, Copy)]
pub enum ErrorMetaDataKey {
    VariableName,
    CompilationStage,

    // Optional suggestions
    PrimarySuggestion,     // One-line fix or top-level idea
    AlternativeSuggestion, // Secondary alternative
    SuggestedInsertion,    // Text that could be inserted
    SuggestedLocation,     // Relative descriptor: "before token X", "after colon"

    // Call binding information
    FunctionName,
    ExpectedArguments,
    FoundArguments,

    // Runtime exceptions carry their class name so `except` clauses can match them
    ExceptionType,
}

#[derive(Debug, Clone)]
pub struct CompilerError {
    pub msg: String,

    // Line and column inside the source file.
    // The file itself is attached later with `with_file_path` once the caller knows it.
    pub location: TextLocation,
    pub error_type: ErrorType,
    pub file_path: PathBuf,

    // This is for creating more structured and detailed error messages
    pub metadata: HashMap<ErrorMetaDataKey, String>,
}

impl CompilerError {
    pub fn new(
        msg: impl Into<String>,
        location: TextLocation,
        error_type: ErrorType,
    ) -> CompilerError {
        CompilerError {
            msg: msg.into(),
            location,
            error_type,
            file_path: PathBuf::new(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_file_path(mut self, file_path: PathBuf) -> Self {
        if self.file_path.as_os_str().is_empty() {
            self.file_path = file_path;
        }
        self
    }

    pub fn with_error_type(mut self, error_type: ErrorType) -> Self {
        self.error_type = error_type;
        self
    }

    pub fn with_location(mut self, location: TextLocation) -> Self {
        if self.location == TextLocation::default() {
            self.location = location;
        }
        self
    }

    pub fn new_metadata_entry(&mut self, key: ErrorMetaDataKey, value: impl Into<String>) {
        self.metadata.insert(key, value.into());
    }

    pub fn metadata_value(&self, key: ErrorMetaDataKey) -> Option<&str> {
        self.metadata.get(&key).map(String::as_str)
    }

    /// Create a new syntax error with a clear explanation
    pub fn new_syntax_error(msg: impl Into<String>, location: TextLocation) -> Self {
        CompilerError::new(msg, location, ErrorType::Syntax)
    }

    /// Arguments at a call site don't fit the parameters of the function being called
    pub fn new_signature_error(msg: impl Into<String>, location: TextLocation) -> Self {
        CompilerError::new(msg, location, ErrorType::SignatureBind)
    }

    /// An exception raised while running a function.
    /// The exception class name is kept in the metadata for `except` matching.
    pub fn new_runtime_error(exception_type: &str, msg: impl Into<String>) -> Self {
        let mut error = CompilerError::new(msg, TextLocation::default(), ErrorType::Runtime);
        error.new_metadata_entry(ErrorMetaDataKey::ExceptionType, exception_type);
        error
    }

    /// Create a compiler error (internal bug, not user's fault)
    pub fn compiler_error(msg: impl Into<String>) -> Self {
        CompilerError::new(msg, TextLocation::default(), ErrorType::Compiler)
    }

    /// Create a file system error
    pub fn file_error(path: &std::path::Path, msg: impl Into<String>) -> Self {
        let mut error = CompilerError::new(msg, TextLocation::default(), ErrorType::File);
        error.file_path = path.to_path_buf();
        error
    }

    pub fn config_error(path: &std::path::Path, msg: impl Into<String>) -> Self {
        let mut error = CompilerError::new(msg, TextLocation::default(), ErrorType::Config);
        error.file_path = path.to_path_buf();
        error
    }

    /// The exception class of a runtime error, if it carries one
    pub fn exception_type(&self) -> Option<&str> {
        match self.error_type {
            ErrorType::Runtime => self.metadata_value(ErrorMetaDataKey::ExceptionType),
            _ => None,
        }
    }
}

// Adds more information to the CompilerError
// So it knows what stage of the pipeline it came from
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum ErrorType {
    Syntax,
    SignatureBind,
    Config,
    File,
    Runtime,
    Compiler,
}

pub fn error_type_to_str(e_type: &ErrorType) -> &'static str {
    match e_type {
        ErrorType::Compiler => "Compiler Bug",
        ErrorType::Syntax => "Syntax Error",
        ErrorType::SignatureBind => "Signature Bind Error",
        ErrorType::Config => "Malformed Config",
        ErrorType::File => "File Error",
        ErrorType::Runtime => "Runtime Error",
    }
}

/// Returns a new CompilerError for syntax violations.
///
/// Syntax errors mean the source could not be parsed (a `ParseError`).
/// These should include clear explanations and suggestions when possible.
///
/// Usage:
/// `return_syntax_error!("message", location, {
///     CompilationStage => "Parsing",
///     PrimarySuggestion => "Did you forget a colon?",
/// })`;
#[macro_export]
macro_rules! return_syntax_error {
    ($msg:expr, $loc:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $loc,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::Syntax,
            file_path: std::path::PathBuf::new(),
            metadata: {
                let mut map = std::collections::HashMap::new();
                $(
                    map.insert($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, $value.to_string());
                )*
                map
            },
        })
    };
    ($msg:expr, $loc:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError::new_syntax_error(
            $msg, $loc,
        ))
    };
}

/// Returns a new CompilerError when call arguments can't be bound to a signature.
///
/// Usage:
/// `return_signature_error!("add() missing required argument 'b'", location, { FunctionName => "add" })`;
#[macro_export]
macro_rules! return_signature_error {
    ($msg:expr, $location:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError {
            msg: $msg.into(),
            location: $location,
            error_type: $crate::compiler_frontend::compiler_errors::ErrorType::SignatureBind,
            file_path: std::path::PathBuf::new(),
            metadata: {
                let mut map = std::collections::HashMap::new();
                $( map.insert($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, $value.to_string()); )*
                map
            },
        })
    };
    ($msg:expr, $location:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError::new_signature_error(
            $msg, $location,
        ))
    };
}

/// Returns a new CompilerError for a Python-style exception raised at run time.
///
/// Usage: `return_runtime_error!("TypeError", "unsupported operand type(s)")`;
#[macro_export]
macro_rules! return_runtime_error {
    ($exception:expr, $msg:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError::new_runtime_error(
            $exception, $msg,
        ))
    };
}

/// Returns a new CompilerError
///
/// Usage: `return_config_error!(path, "message")`;
#[macro_export]
macro_rules! return_config_error {
    ($path:expr, $msg:expr, { $( $key:ident => $value:expr ),* $(,)? }) => {{
        let mut error = $crate::compiler_frontend::compiler_errors::CompilerError::config_error(
            $path, $msg,
        );
        $( error.new_metadata_entry($crate::compiler_frontend::compiler_errors::ErrorMetaDataKey::$key, $value); )*
        return Err(error);
    }};
    ($path:expr, $msg:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError::config_error(
            $path, $msg,
        ))
    };
}

/// Returns a new CompilerError
///
/// Usage: `return_file_error!(path, "message")`;
#[macro_export]
macro_rules! return_file_error {
    ($path:expr, $msg:expr) => {
        return Err($crate::compiler_frontend::compiler_errors::CompilerError::file_error(
            $path, $msg,
        ))
    };
}

/// Returns a new CompilerError for internal bugs.
///
/// Compiler errors indicate bugs in pragma itself, not user code issues.
#[macro_export]
macro_rules! return_compiler_error {
    ($fmt:expr, $($arg:expr),+ $(,)?) => {{
        return Err($crate::compiler_frontend::compiler_errors::CompilerError::compiler_error(
            format!($fmt, $($arg),+),
        ));
    }};
    ($msg:expr) => {{
        return Err($crate::compiler_frontend::compiler_errors::CompilerError::compiler_error(
            $msg,
        ));
    }};
}
