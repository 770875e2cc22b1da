use super::*;
use crate::compiler_frontend::compiler_errors::ErrorType;

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source)
        .expect("tokenization should succeed")
        .tokens
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

fn name(text: &str) -> TokenKind {
    TokenKind::Name(text.to_owned())
}

fn tokenize_error(source: &str) -> CompilerError {
    tokenize(source).expect_err("tokenization should fail")
}

#[test]
fn simple_assignment() {
    assert_eq!(
        kinds("x = 1\n"),
        vec![
            name("x"),
            TokenKind::Assign,
            TokenKind::IntLiteral(1),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn missing_final_newline_is_added() {
    assert_eq!(
        kinds("return x"),
        vec![TokenKind::Return, name("x"), TokenKind::Newline, TokenKind::Eof]
    );
}

#[test]
fn indented_blocks_open_and_close() {
    assert_eq!(
        kinds("if x:\n    y = 1\nz = 2\n"),
        vec![
            TokenKind::If,
            name("x"),
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            name("y"),
            TokenKind::Assign,
            TokenKind::IntLiteral(1),
            TokenKind::Newline,
            TokenKind::Dedent,
            name("z"),
            TokenKind::Assign,
            TokenKind::IntLiteral(2),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn open_blocks_are_closed_at_end_of_file() {
    let tokens = kinds("def f():\n    if x:\n        return 1\n");
    let dedents = tokens
        .iter()
        .filter(|kind| **kind == TokenKind::Dedent)
        .count();

    assert_eq!(dedents, 2);
    assert_eq!(
        &tokens[tokens.len() - 3..],
        &[TokenKind::Dedent, TokenKind::Dedent, TokenKind::Eof]
    );
}

#[test]
fn several_blocks_close_on_one_line() {
    let tokens = kinds("while a:\n    if b:\n        c\nd\n");
    let position_of_d = tokens
        .iter()
        .position(|kind| *kind == name("d"))
        .expect("d should be tokenized");

    assert_eq!(tokens[position_of_d - 1], TokenKind::Dedent);
    assert_eq!(tokens[position_of_d - 2], TokenKind::Dedent);
    assert_eq!(tokens[position_of_d - 3], TokenKind::Newline);
}

#[test]
fn blank_and_comment_lines_do_not_change_indentation() {
    assert_eq!(
        kinds("x = 1  # note\n\n   # indented comment\ny = 2\n"),
        vec![
            name("x"),
            TokenKind::Assign,
            TokenKind::IntLiteral(1),
            TokenKind::Newline,
            name("y"),
            TokenKind::Assign,
            TokenKind::IntLiteral(2),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn newlines_inside_brackets_are_joined() {
    assert_eq!(
        kinds("f(1,\n      2)\n"),
        vec![
            name("f"),
            TokenKind::OpenParenthesis,
            TokenKind::IntLiteral(1),
            TokenKind::Comma,
            TokenKind::IntLiteral(2),
            TokenKind::CloseParenthesis,
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn backslash_continues_the_line() {
    assert_eq!(
        kinds("x = 1 + \\\n    2\n"),
        vec![
            name("x"),
            TokenKind::Assign,
            TokenKind::IntLiteral(1),
            TokenKind::Add,
            TokenKind::IntLiteral(2),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn keywords_and_constants() {
    assert_eq!(
        kinds("None True False and or not is lambda yield"),
        vec![
            TokenKind::None,
            TokenKind::True,
            TokenKind::False,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Not,
            TokenKind::Is,
            TokenKind::Lambda,
            TokenKind::Yield,
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn compound_operators() {
    assert_eq!(
        kinds("a //= b ** 2 != c <= d << e -> f\n"),
        vec![
            name("a"),
            TokenKind::FloorDivideAssign,
            name("b"),
            TokenKind::Exponent,
            TokenKind::IntLiteral(2),
            TokenKind::NotEqual,
            name("c"),
            TokenKind::LessThanOrEqual,
            name("d"),
            TokenKind::ShiftLeft,
            name("e"),
            TokenKind::Arrow,
            name("f"),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );

    assert_eq!(
        kinds("x **= 2; y <<= 1; z == 3")[..3],
        [name("x"), TokenKind::ExponentAssign, TokenKind::IntLiteral(2)]
    );
}

#[test]
fn number_literals() {
    assert_eq!(
        kinds("0x1F 0o17 0b101 1_000 1.5e3 .5 2.")[..7],
        [
            TokenKind::IntLiteral(31),
            TokenKind::IntLiteral(15),
            TokenKind::IntLiteral(5),
            TokenKind::IntLiteral(1000),
            TokenKind::FloatLiteral(1500.0),
            TokenKind::FloatLiteral(0.5),
            TokenKind::FloatLiteral(2.0),
        ]
    );
}

#[test]
fn string_literals_and_escapes() {
    assert_eq!(
        kinds(r#"'a\nb' "it's" r'a\nb' '\x41\u00e9' '' '''x'y'''"#)[..6],
        [
            TokenKind::StringLiteral("a\nb".to_owned()),
            TokenKind::StringLiteral("it's".to_owned()),
            TokenKind::StringLiteral("a\\nb".to_owned()),
            TokenKind::StringLiteral("Aé".to_owned()),
            TokenKind::StringLiteral(String::new()),
            TokenKind::StringLiteral("x'y".to_owned()),
        ]
    );
}

#[test]
fn triple_quoted_strings_span_lines() {
    assert_eq!(
        kinds("s = \"\"\"one\ntwo\"\"\"\n"),
        vec![
            name("s"),
            TokenKind::Assign,
            TokenKind::StringLiteral("one\ntwo".to_owned()),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn token_locations_track_lines_and_columns() {
    let tokens = tokenize("x = 1\n  \ny + 22\n").expect("tokenization should succeed");
    let y = tokens
        .tokens
        .iter()
        .find(|token| token.kind == name("y"))
        .expect("y should be tokenized");
    assert_eq!(y.location.start_pos.line_number, 2);
    assert_eq!(y.location.start_pos.char_column, 0);

    let number = tokens
        .tokens
        .iter()
        .find(|token| token.kind == TokenKind::IntLiteral(22))
        .expect("22 should be tokenized");
    assert_eq!(number.location.start_pos.char_column, 4);
    assert_eq!(number.location.end_pos.char_column, 6);
}

#[test]
fn unmatched_closing_bracket_is_a_syntax_error() {
    let error = tokenize_error("x = 1)\n");
    assert_eq!(error.error_type, ErrorType::Syntax);
    assert!(error.msg.contains("Unmatched ')'"));
}

#[test]
fn unclosed_bracket_at_end_of_file() {
    let error = tokenize_error("x = (1,\n");
    assert_eq!(error.error_type, ErrorType::Syntax);
    assert!(error.msg.contains("inside brackets"));
}

#[test]
fn inconsistent_dedent_is_rejected() {
    let error = tokenize_error("if x:\n        a\n    b\n");
    assert!(error.msg.contains("Unindent does not match"));
}

#[test]
fn broken_strings_are_rejected() {
    assert!(tokenize_error("'abc").msg.contains("Unterminated string"));
    assert!(tokenize_error("'abc\nx'\n").msg.contains("End of line"));
    assert!(tokenize_error("f'{x}'\n").msg.contains("string prefixes"));
}

#[test]
fn invalid_characters_are_rejected() {
    assert!(tokenize_error("!x\n").msg.contains("'!'"));
    assert!(tokenize_error("x = $\n").msg.contains("Invalid character '$'"));
    assert!(tokenize_error("12abc\n").msg.contains("Invalid number literal"));
    assert!(
        tokenize_error("99999999999999999999\n")
            .msg
            .contains("too large")
    );
}
