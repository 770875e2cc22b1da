pub fn is_valid_var_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

pub fn is_valid_var_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True when the whole string could be written as a variable name
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if is_valid_var_start(first) => chars.all(is_valid_var_char),
        _ => false,
    }
}

// Traits for builtin types to help with tokenizing
pub trait NumericalParsing {
    fn is_non_newline_whitespace(&self) -> bool;
    fn is_bracket(&self) -> bool;
    fn is_digit_in_radix(&self, radix: u32) -> bool;
}

impl NumericalParsing for char {
    fn is_non_newline_whitespace(&self) -> bool {
        matches!(self, ' ' | '\t' | '\x0c' | '\r')
    }
    fn is_bracket(&self) -> bool {
        matches!(self, '(' | ')' | '{' | '}' | '[' | ']')
    }
    fn is_digit_in_radix(&self, radix: u32) -> bool {
        self.is_digit(radix) || self == &'_'
    }
}
