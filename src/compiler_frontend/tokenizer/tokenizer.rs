use crate::compiler_frontend::basic_utility_functions::{
    NumericalParsing, is_valid_var_char, is_valid_var_start,
};
use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::tokenizer::tokens::{FileTokens, Token, TokenKind, TokenStream};
use crate::projects::settings;
use crate::{return_syntax_error, token_log};

macro_rules! return_token {
    ($kind:expr, $stream:expr $(,)?) => {
        return Ok(Token::new($kind, $stream.new_location()))
    };
}

pub fn tokenize(source_code: &str) -> Result<FileTokens, CompilerError> {
    // Roughly 1/5 of the characters in source code end up as tokens
    let initial_capacity = source_code.len() / settings::SRC_TO_TOKEN_RATIO;

    let mut tokens: Vec<Token> = Vec::with_capacity(initial_capacity);
    let mut stream = TokenStream::new(source_code);

    loop {
        let token = get_token_kind(&mut stream)?;
        token_log!(#token);

        if token.kind != TokenKind::Eof {
            tokens.push(token);
            continue;
        }

        if stream.bracket_depth > 0 {
            return_syntax_error!(
                "Unexpected end of file inside brackets",
                token.location,
                {
                    CompilationStage => "Tokenization",
                    PrimarySuggestion => "Close every '(', '[' and '{' that was opened",
                }
            )
        }

        // Close the last logical line and every block that is still open
        let last_kind = tokens.last().map(|last| &last.kind);
        if !matches!(
            last_kind,
            None | Some(TokenKind::Newline) | Some(TokenKind::Dedent)
        ) {
            tokens.push(Token::new(TokenKind::Newline, token.location));
        }

        while stream.indent_stack.len() > 1 {
            stream.indent_stack.pop();
            tokens.push(Token::new(TokenKind::Dedent, token.location));
        }

        tokens.push(token);
        break;
    }

    Ok(FileTokens::new(tokens))
}

pub fn get_token_kind(stream: &mut TokenStream) -> Result<Token, CompilerError> {
    if stream.pending_dedents > 0 {
        stream.pending_dedents -= 1;
        stream.update_start_position();
        return_token!(TokenKind::Dedent, stream);
    }

    if stream.at_line_start && stream.bracket_depth == 0 {
        if let Some(token) = read_indentation(stream)? {
            return Ok(token);
        }
    }

    // Whitespace, comments and line continuations
    loop {
        match stream.peek() {
            Some(&ch) if ch.is_non_newline_whitespace() => {
                stream.next();
            }

            Some('#') => skip_comment(stream),

            Some('\\') => {
                stream.update_start_position();
                stream.next();
                if stream.peek() == Some(&'\r') {
                    stream.next();
                }
                if stream.next() != Some('\n') {
                    return_syntax_error!(
                        "Unexpected character after line continuation character '\\'",
                        stream.new_location(),
                        {
                            CompilationStage => "Tokenization",
                            PrimarySuggestion => "A backslash outside a string must be the last character on its line",
                        }
                    )
                }
            }

            Some('\n') => {
                stream.update_start_position();
                stream.next();

                // Implicit line joining inside brackets
                if stream.bracket_depth > 0 {
                    continue;
                }

                stream.at_line_start = true;
                return_token!(TokenKind::Newline, stream);
            }

            _ => break,
        }
    }

    // To ignore leading whitespace for the next token position
    stream.update_start_position();

    let current_char = match stream.next() {
        Some(ch) => ch,
        None => return_token!(TokenKind::Eof, stream),
    };

    // Strings
    if current_char == '"' || current_char == '\'' {
        return tokenize_string(stream, current_char, false);
    }

    // Names, keywords and prefixed strings
    if is_valid_var_start(current_char) {
        if let Some(&quote) = stream.peek()
            && (quote == '"' || quote == '\'')
        {
            match current_char {
                'r' | 'R' => {
                    stream.next();
                    return tokenize_string(stream, quote, true);
                }
                'u' | 'U' => {
                    stream.next();
                    return tokenize_string(stream, quote, false);
                }
                'f' | 'F' | 'b' | 'B' => {
                    return_syntax_error!(
                        format!("'{current_char}' string prefixes are not supported"),
                        stream.new_location(),
                        {
                            CompilationStage => "Tokenization",
                            PrimarySuggestion => "Use a plain string literal and build the value with '+' or str()",
                        }
                    )
                }
                _ => {}
            }
        }

        let mut word = String::from(current_char);
        while let Some(&ch) = stream.peek() {
            if !is_valid_var_char(ch) {
                break;
            }
            word.push(ch);
            stream.next();
        }

        match TokenKind::from_keyword(&word) {
            Some(keyword) => return_token!(keyword, stream),
            None => return_token!(TokenKind::Name(word), stream),
        }
    }

    // Numbers
    if current_char.is_ascii_digit() {
        return tokenize_number(stream, current_char);
    }

    if current_char == '.' {
        if let Some(next_char) = stream.peek()
            && next_char.is_ascii_digit()
        {
            return tokenize_number(stream, current_char);
        }

        return_token!(TokenKind::Dot, stream);
    }

    // Brackets
    if current_char.is_bracket() {
        let kind = match current_char {
            '(' => TokenKind::OpenParenthesis,
            '[' => TokenKind::OpenBracket,
            '{' => TokenKind::OpenCurly,
            ')' => TokenKind::CloseParenthesis,
            ']' => TokenKind::CloseBracket,
            _ => TokenKind::CloseCurly,
        };

        if matches!(
            kind,
            TokenKind::OpenParenthesis | TokenKind::OpenBracket | TokenKind::OpenCurly
        ) {
            stream.bracket_depth += 1;
        } else {
            if stream.bracket_depth == 0 {
                return_syntax_error!(
                    format!("Unmatched '{current_char}'"),
                    stream.new_location(),
                    {
                        CompilationStage => "Tokenization",
                        PrimarySuggestion => "Remove the extra closing bracket",
                    }
                )
            }
            stream.bracket_depth -= 1;
        }

        return_token!(kind, stream);
    }

    let kind = match current_char {
        ',' => TokenKind::Comma,
        ':' => TokenKind::Colon,
        ';' => TokenKind::Semicolon,
        '@' => TokenKind::At,
        '~' => TokenKind::BitNot,

        '+' => with_assign(stream, TokenKind::Add, TokenKind::AddAssign),
        '%' => with_assign(stream, TokenKind::Modulus, TokenKind::ModulusAssign),
        '&' => with_assign(stream, TokenKind::BitAnd, TokenKind::BitAndAssign),
        '|' => with_assign(stream, TokenKind::BitOr, TokenKind::BitOrAssign),
        '^' => with_assign(stream, TokenKind::BitXor, TokenKind::BitXorAssign),

        '-' => {
            if stream.peek() == Some(&'>') {
                stream.next();
                TokenKind::Arrow
            } else {
                with_assign(stream, TokenKind::Subtract, TokenKind::SubtractAssign)
            }
        }

        '*' => {
            if stream.peek() == Some(&'*') {
                stream.next();
                with_assign(stream, TokenKind::Exponent, TokenKind::ExponentAssign)
            } else {
                with_assign(stream, TokenKind::Multiply, TokenKind::MultiplyAssign)
            }
        }

        '/' => {
            if stream.peek() == Some(&'/') {
                stream.next();
                with_assign(stream, TokenKind::FloorDivide, TokenKind::FloorDivideAssign)
            } else {
                with_assign(stream, TokenKind::Divide, TokenKind::DivideAssign)
            }
        }

        '<' => match stream.peek() {
            Some('<') => {
                stream.next();
                with_assign(stream, TokenKind::ShiftLeft, TokenKind::ShiftLeftAssign)
            }
            _ => with_assign(stream, TokenKind::LessThan, TokenKind::LessThanOrEqual),
        },

        '>' => match stream.peek() {
            Some('>') => {
                stream.next();
                with_assign(stream, TokenKind::ShiftRight, TokenKind::ShiftRightAssign)
            }
            _ => with_assign(stream, TokenKind::GreaterThan, TokenKind::GreaterThanOrEqual),
        },

        '=' => with_assign(stream, TokenKind::Assign, TokenKind::Equal),

        '!' => {
            if stream.peek() == Some(&'=') {
                stream.next();
                TokenKind::NotEqual
            } else {
                return_syntax_error!(
                    "Invalid character '!'",
                    stream.new_location(),
                    {
                        CompilationStage => "Tokenization",
                        PrimarySuggestion => "Use 'not' for boolean negation or '!=' for inequality",
                    }
                )
            }
        }

        _ => {
            return_syntax_error!(
                format!("Invalid character '{current_char}' in source"),
                stream.new_location(),
                {
                    CompilationStage => "Tokenization",
                }
            )
        }
    };

    return_token!(kind, stream);
}

// Consumes a trailing '=' to turn an operator into its assigning or comparing form
fn with_assign(stream: &mut TokenStream, plain: TokenKind, assigning: TokenKind) -> TokenKind {
    if stream.peek() == Some(&'=') {
        stream.next();
        return assigning;
    }
    plain
}

fn skip_comment(stream: &mut TokenStream) {
    while let Some(&ch) = stream.peek() {
        if ch == '\n' {
            break;
        }
        stream.next();
    }
}

// Measures the indentation of a new logical line.
// Blank and comment-only lines are skipped entirely.
fn read_indentation(stream: &mut TokenStream) -> Result<Option<Token>, CompilerError> {
    loop {
        stream.update_start_position();

        let mut width: i32 = 0;
        while let Some(&ch) = stream.peek() {
            match ch {
                ' ' => width += 1,
                '\t' => width = (width / 8 + 1) * 8,
                '\x0c' => width = 0,
                _ => break,
            }
            stream.next();
        }

        match stream.peek() {
            Some('#') => {
                skip_comment(stream);
                stream.next();
                continue;
            }
            Some('\r') => {
                stream.next();
                continue;
            }
            Some('\n') => {
                stream.next();
                continue;
            }
            None => {
                stream.at_line_start = false;
                return Ok(None);
            }
            _ => {}
        }

        stream.at_line_start = false;

        let current_width = stream.indent_stack.last().copied().unwrap_or(0);

        if width > current_width {
            stream.indent_stack.push(width);
            return Ok(Some(Token::new(TokenKind::Indent, stream.new_location())));
        }

        if width < current_width {
            let mut dedents = 0;
            while let Some(&top) = stream.indent_stack.last()
                && top > width
            {
                stream.indent_stack.pop();
                dedents += 1;
            }

            if stream.indent_stack.last() != Some(&width) {
                return_syntax_error!(
                    "Unindent does not match any outer indentation level",
                    stream.new_location(),
                    {
                        CompilationStage => "Tokenization",
                        PrimarySuggestion => "Line this statement up with the block it belongs to",
                    }
                )
            }

            stream.pending_dedents = dedents - 1;
            return Ok(Some(Token::new(TokenKind::Dedent, stream.new_location())));
        }

        return Ok(None);
    }
}

fn tokenize_string(
    stream: &mut TokenStream,
    quote: char,
    raw: bool,
) -> Result<Token, CompilerError> {
    let mut triple_quoted = false;

    if stream.peek() == Some(&quote) {
        stream.next();
        if stream.peek() != Some(&quote) {
            // Just an empty string
            return_token!(TokenKind::StringLiteral(String::new()), stream);
        }
        stream.next();
        triple_quoted = true;
    }

    let mut value = String::new();

    loop {
        let ch = match stream.next() {
            Some(ch) => ch,
            None => {
                return_syntax_error!(
                    "Unterminated string literal",
                    stream.new_location(),
                    {
                        CompilationStage => "Tokenization",
                        PrimarySuggestion => "Add the closing quote at the end of the string",
                        SuggestedInsertion => quote,
                    }
                )
            }
        };

        if ch == quote {
            if !triple_quoted {
                return_token!(TokenKind::StringLiteral(value), stream);
            }

            let mut closing_quotes = 1;
            while closing_quotes < 3 && stream.peek() == Some(&quote) {
                stream.next();
                closing_quotes += 1;
            }

            if closing_quotes == 3 {
                return_token!(TokenKind::StringLiteral(value), stream);
            }

            for _ in 0..closing_quotes {
                value.push(quote);
            }
            continue;
        }

        if ch == '\n' && !triple_quoted {
            return_syntax_error!(
                "End of line while scanning string literal",
                stream.new_location(),
                {
                    CompilationStage => "Tokenization",
                    PrimarySuggestion => "Close the string before the end of the line or use a triple quoted string",
                    SuggestedInsertion => quote,
                }
            )
        }

        if ch != '\\' {
            value.push(ch);
            continue;
        }

        let escaped = match stream.next() {
            Some(escaped) => escaped,
            None => continue,
        };

        if raw {
            value.push('\\');
            value.push(escaped);
            continue;
        }

        match escaped {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            '0' => value.push('\0'),
            'a' => value.push('\x07'),
            'b' => value.push('\x08'),
            'f' => value.push('\x0c'),
            'v' => value.push('\x0b'),
            '\\' | '\'' | '"' => value.push(escaped),

            // Escaped newline continues the string on the next line
            '\n' => {}

            'x' => value.push(read_code_point(stream, 2)?),
            'u' => value.push(read_code_point(stream, 4)?),
            'U' => value.push(read_code_point(stream, 8)?),

            other => {
                value.push('\\');
                value.push(other);
            }
        }
    }
}

fn read_code_point(stream: &mut TokenStream, digits: usize) -> Result<char, CompilerError> {
    let mut hex = String::with_capacity(digits);
    for _ in 0..digits {
        match stream.next() {
            Some(ch) if ch.is_ascii_hexdigit() => hex.push(ch),
            _ => {
                return_syntax_error!(
                    format!("Truncated escape sequence, expected {digits} hex digits"),
                    stream.new_location(),
                    {
                        CompilationStage => "Tokenization",
                    }
                )
            }
        }
    }

    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
        Some(ch) => Ok(ch),
        None => {
            return_syntax_error!(
                format!("Escape sequence '{hex}' is not a valid character"),
                stream.new_location(),
                {
                    CompilationStage => "Tokenization",
                }
            )
        }
    }
}

fn tokenize_number(stream: &mut TokenStream, first_char: char) -> Result<Token, CompilerError> {
    let mut text = String::from(first_char);

    // Hex, octal and binary integers
    if first_char == '0'
        && let Some(&prefix) = stream.peek()
        && matches!(prefix, 'x' | 'X' | 'o' | 'O' | 'b' | 'B')
    {
        stream.next();
        let radix = match prefix {
            'x' | 'X' => 16,
            'o' | 'O' => 8,
            _ => 2,
        };

        let mut digits = String::new();
        while let Some(&ch) = stream.peek() {
            if !ch.is_digit_in_radix(radix) {
                break;
            }
            if ch != '_' {
                digits.push(ch);
            }
            stream.next();
        }

        match i64::from_str_radix(&digits, radix) {
            Ok(value) => return_token!(TokenKind::IntLiteral(value), stream),
            Err(_) => {
                return_syntax_error!(
                    format!("Invalid integer literal '0{prefix}{digits}'"),
                    stream.new_location(),
                    {
                        CompilationStage => "Tokenization",
                        PrimarySuggestion => "Integer literals must fit in 64 bits",
                    }
                )
            }
        }
    }

    let mut is_float = first_char == '.';
    let mut has_exponent = false;

    while let Some(&ch) = stream.peek() {
        if ch.is_ascii_digit() || ch == '_' {
            text.push(ch);
        } else if ch == '.' && !is_float {
            is_float = true;
            text.push(ch);
        } else if (ch == 'e' || ch == 'E') && !has_exponent {
            has_exponent = true;
            is_float = true;
            text.push(ch);
            stream.next();
            if let Some(&sign) = stream.peek()
                && (sign == '+' || sign == '-')
            {
                text.push(sign);
                stream.next();
            }
            continue;
        } else {
            break;
        }
        stream.next();
    }

    if let Some(&ch) = stream.peek()
        && is_valid_var_char(ch)
    {
        return_syntax_error!(
            format!("Invalid number literal '{text}{ch}'"),
            stream.new_location(),
            {
                CompilationStage => "Tokenization",
                PrimarySuggestion => "Complex and suffixed number literals are not supported",
            }
        )
    }

    let cleaned = text.replace('_', "");

    if is_float {
        match cleaned.parse::<f64>() {
            Ok(value) => return_token!(TokenKind::FloatLiteral(value), stream),
            Err(_) => {
                return_syntax_error!(
                    format!("Invalid float literal '{text}'"),
                    stream.new_location(),
                    {
                        CompilationStage => "Tokenization",
                    }
                )
            }
        }
    }

    match cleaned.parse::<i64>() {
        Ok(value) => return_token!(TokenKind::IntLiteral(value), stream),
        Err(_) => {
            return_syntax_error!(
                format!("Integer literal '{text}' is too large"),
                stream.new_location(),
                {
                    CompilationStage => "Tokenization",
                    PrimarySuggestion => "Integer literals must fit in 64 bits",
                }
            )
        }
    }
}

#[cfg(test)]
#[path = "tests/tokenizer_tests.rs"]
mod tokenizer_tests;
