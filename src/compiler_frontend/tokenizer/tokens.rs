use crate::token_log;
use serde::Serialize;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
pub struct CharPosition {
    pub line_number: i32,
    pub char_column: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TextLocation {
    pub start_pos: CharPosition,
    pub end_pos: CharPosition,
}

impl TextLocation {
    pub fn new(start: CharPosition, end: CharPosition) -> Self {
        Self {
            start_pos: start,
            end_pos: end,
        }
    }

    pub fn new_just_line(start: i32) -> Self {
        Self {
            start_pos: CharPosition {
                line_number: start,
                char_column: 0,
            },
            end_pos: CharPosition {
                line_number: start,
                char_column: 120, // Arbitrary number
            },
        }
    }

    /// A location covering both self and other
    pub fn join(self, other: TextLocation) -> TextLocation {
        TextLocation {
            start_pos: self.start_pos,
            end_pos: other.end_pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: TextLocation,
}

impl Token {
    pub fn new(kind: TokenKind, location: TextLocation) -> Self {
        Self { kind, location }
    }
}

#[derive(Clone, Debug)]
pub struct FileTokens {
    pub tokens: Vec<Token>,
    pub index: usize,
    pub length: usize,
}

impl FileTokens {
    pub fn new(tokens: Vec<Token>) -> FileTokens {
        FileTokens {
            length: tokens.len(),
            tokens,
            index: 0,
        }
    }

    // The tokenizer always finishes the stream with Eof,
    // and advance() never moves past it, so the index is always in bounds.
    pub fn current_token_kind(&self) -> &TokenKind {
        &self.tokens[self.index].kind
    }

    pub fn current_token(&self) -> Token {
        self.tokens[self.index].clone()
    }

    pub fn peek_next_token(&self) -> Option<&TokenKind> {
        self.tokens.get(self.index + 1).map(|token| &token.kind)
    }

    pub fn current_location(&self) -> TextLocation {
        self.tokens[self.index].location
    }

    /// Location of the last consumed token
    pub fn previous_location(&self) -> TextLocation {
        if self.index == 0 {
            return self.current_location();
        }
        self.tokens[self.index - 1].location
    }

    pub fn advance(&mut self) {
        if self.index >= self.length {
            token_log!(Red "Parser tried to advance past token stream bounds");
            return;
        }

        match self.current_token_kind() {
            // Can't advance past End of File
            TokenKind::Eof => {
                token_log!(Red "Parser tried to advance past EOF");
            }

            _ => {
                self.index += 1;
            }
        }
    }

    pub fn skip_newlines(&mut self) {
        while matches!(self.current_token_kind(), TokenKind::Newline) {
            self.index += 1;
        }
    }

    /// Consumes the current token if it matches
    pub fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.current_token_kind() == kind {
            self.advance();
            return true;
        }
        false
    }
}

pub struct TokenStream<'a> {
    pub chars: Peekable<Chars<'a>>,
    pub position: CharPosition,
    pub start_position: CharPosition,

    // Indentation widths of the currently open blocks. Always starts with 0.
    pub indent_stack: Vec<i32>,
    pub pending_dedents: usize,

    // Newlines and indentation are ignored inside brackets
    pub bracket_depth: i32,
    pub at_line_start: bool,
}

impl<'a> TokenStream<'a> {
    pub fn new(source_code: &'a str) -> Self {
        Self {
            chars: source_code.chars().peekable(),
            position: CharPosition::default(),
            start_position: CharPosition::default(),
            indent_stack: vec![0],
            pending_dedents: 0,
            bracket_depth: 0,
            at_line_start: true,
        }
    }

    pub fn next(&mut self) -> Option<char> {
        match self.chars.peek() {
            Some(c) => {
                if *c == '\n' {
                    self.position.line_number += 1;
                    self.position.char_column = 0;
                } else {
                    self.position.char_column += 1;
                }

                self.chars.next()
            }

            None => None,
        }
    }

    pub fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    pub fn new_location(&mut self) -> TextLocation {
        let start_pos = self.start_position;
        self.update_start_position();
        TextLocation::new(start_pos, self.position)
    }

    pub fn update_start_position(&mut self) {
        self.start_position = self.position;
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum TokenKind {
    Eof, // End of the file

    // Structure of Syntax
    Newline,
    Indent,
    Dedent,

    /// Variable name
    Name(String),

    // Values
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),

    // Keywords
    Def,
    Class,
    Return,
    Del,
    For,
    In,
    While,
    If,
    Elif,
    Else,
    With,
    As,
    Try,
    Except,
    Finally,
    Raise,
    From,
    Assert,
    Global,
    Nonlocal,
    Pass,
    Break,
    Continue,
    Yield,
    Lambda,
    Import,
    And,
    Or,
    Not,
    Is,
    None,
    True,
    False,

    // Brackets
    OpenParenthesis,  // (
    CloseParenthesis, // )
    OpenBracket,      // [
    CloseBracket,     // ]
    OpenCurly,        // {
    CloseCurly,       // }

    // Basic Grammar
    Comma,
    Colon,
    Semicolon,
    Dot,
    At,
    Arrow, // ->
    Assign,

    // Operators
    Add,
    Subtract,
    Multiply,
    Divide,
    FloorDivide,
    Modulus,
    Exponent,
    ShiftLeft,
    ShiftRight,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,

    AddAssign,
    SubtractAssign,
    MultiplyAssign,
    DivideAssign,
    FloorDivideAssign,
    ModulusAssign,
    ExponentAssign,
    ShiftLeftAssign,
    ShiftRightAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,

    // Comparisons
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl TokenKind {
    pub fn from_keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "def" => TokenKind::Def,
            "class" => TokenKind::Class,
            "return" => TokenKind::Return,
            "del" => TokenKind::Del,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "while" => TokenKind::While,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "with" => TokenKind::With,
            "as" => TokenKind::As,
            "try" => TokenKind::Try,
            "except" => TokenKind::Except,
            "finally" => TokenKind::Finally,
            "raise" => TokenKind::Raise,
            "from" => TokenKind::From,
            "assert" => TokenKind::Assert,
            "global" => TokenKind::Global,
            "nonlocal" => TokenKind::Nonlocal,
            "pass" => TokenKind::Pass,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "yield" => TokenKind::Yield,
            "lambda" => TokenKind::Lambda,
            "import" => TokenKind::Import,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "is" => TokenKind::Is,
            "None" => TokenKind::None,
            "True" => TokenKind::True,
            "False" => TokenKind::False,
            _ => return None,
        };

        Some(kind)
    }

    /// Human readable form used in parse errors
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Eof => "end of file".to_owned(),
            TokenKind::Newline => "end of line".to_owned(),
            TokenKind::Indent => "indented block".to_owned(),
            TokenKind::Dedent => "end of indented block".to_owned(),
            TokenKind::Name(name) => format!("name '{name}'"),
            TokenKind::IntLiteral(value) => format!("number {value}"),
            TokenKind::FloatLiteral(value) => format!("number {value}"),
            TokenKind::StringLiteral(_) => "string literal".to_owned(),
            other => format!("{other:?}"),
        }
    }
}
