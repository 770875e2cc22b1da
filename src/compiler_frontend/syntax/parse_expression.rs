use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::syntax::ast_nodes::{
    BinaryOperator, BoolOperator, CompareOperator, Constant, Expr, Keyword, UnaryOperator,
};
use crate::compiler_frontend::syntax::parse_statements::expect_token;
use crate::compiler_frontend::tokenizer::tokens::{FileTokens, TokenKind};
use crate::return_syntax_error;

// Binary operator precedence levels, loosest first.
// Everything tighter than the last level is handled by parse_factor.
const BINARY_LEVEL_COUNT: usize = 6;

fn binary_operator_at_level(level: usize, kind: &TokenKind) -> Option<BinaryOperator> {
    let op = match (level, kind) {
        (0, TokenKind::BitOr) => BinaryOperator::BitOr,
        (1, TokenKind::BitXor) => BinaryOperator::BitXor,
        (2, TokenKind::BitAnd) => BinaryOperator::BitAnd,
        (3, TokenKind::ShiftLeft) => BinaryOperator::ShiftLeft,
        (3, TokenKind::ShiftRight) => BinaryOperator::ShiftRight,
        (4, TokenKind::Add) => BinaryOperator::Add,
        (4, TokenKind::Subtract) => BinaryOperator::Subtract,
        (5, TokenKind::Multiply) => BinaryOperator::Multiply,
        (5, TokenKind::Divide) => BinaryOperator::Divide,
        (5, TokenKind::FloorDivide) => BinaryOperator::FloorDivide,
        (5, TokenKind::Modulus) => BinaryOperator::Modulus,
        _ => return None,
    };

    Some(op)
}

/// True if this token can begin an expression.
/// Used to tell a trailing comma apart from another element.
pub fn starts_expression(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Name(_)
            | TokenKind::IntLiteral(_)
            | TokenKind::FloatLiteral(_)
            | TokenKind::StringLiteral(_)
            | TokenKind::None
            | TokenKind::True
            | TokenKind::False
            | TokenKind::OpenParenthesis
            | TokenKind::OpenBracket
            | TokenKind::OpenCurly
            | TokenKind::Subtract
            | TokenKind::Add
            | TokenKind::BitNot
            | TokenKind::Not
            | TokenKind::Multiply
            | TokenKind::Lambda
            | TokenKind::Yield
    )
}

/// A yield expression or a (possibly starred) tuple of expressions.
/// This is what can appear on either side of '=' or after 'return'.
pub fn parse_yield_or_testlist(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    if tokens.current_token_kind() == &TokenKind::Yield {
        return parse_yield(tokens);
    }

    parse_testlist_star(tokens)
}

pub fn parse_yield(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    let location = tokens.current_location();
    tokens.advance();

    if tokens.current_token_kind() == &TokenKind::From {
        return_syntax_error!(
            "'yield from' is not supported",
            location,
            {
                CompilationStage => "Parsing",
                PrimarySuggestion => "Loop over the iterable and yield each element instead",
            }
        )
    }

    if !starts_expression(tokens.current_token_kind()) {
        return Ok(Expr::Yield(None));
    }

    let value = parse_testlist_star(tokens)?;
    Ok(Expr::Yield(Some(Box::new(value))))
}

/// test (',' test)* [','] with starred elements allowed
pub fn parse_testlist_star(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    let first = parse_test_or_star(tokens)?;

    if tokens.current_token_kind() != &TokenKind::Comma {
        return Ok(first);
    }

    let mut elements = vec![first];
    while tokens.eat(&TokenKind::Comma) {
        if !starts_expression(tokens.current_token_kind()) {
            break;
        }
        elements.push(parse_test_or_star(tokens)?);
    }

    Ok(Expr::Tuple(elements))
}

/// Targets of a 'for' loop or 'del' statement.
/// These stop before 'in', so they are parsed at the bitwise-or level.
pub fn parse_target_list(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    let first = parse_star_or_bitor(tokens)?;

    if tokens.current_token_kind() != &TokenKind::Comma {
        return Ok(first);
    }

    let mut elements = vec![first];
    while tokens.eat(&TokenKind::Comma) {
        if !starts_expression(tokens.current_token_kind()) {
            break;
        }
        elements.push(parse_star_or_bitor(tokens)?);
    }

    Ok(Expr::Tuple(elements))
}

/// The single target after 'as' in a 'with' item, where a comma starts the next item
pub fn parse_target(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    parse_binary(tokens, 0)
}

fn parse_star_or_bitor(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    if tokens.eat(&TokenKind::Multiply) {
        let value = parse_binary(tokens, 0)?;
        return Ok(Expr::Starred(Box::new(value)));
    }

    parse_binary(tokens, 0)
}

fn parse_test_or_star(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    if tokens.eat(&TokenKind::Multiply) {
        let value = parse_binary(tokens, 0)?;
        return Ok(Expr::Starred(Box::new(value)));
    }

    parse_test(tokens)
}

/// A single expression, including conditional expressions
pub fn parse_test(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    if tokens.current_token_kind() == &TokenKind::Lambda {
        return_syntax_error!(
            "Lambda expressions are not supported",
            tokens.current_location(),
            {
                CompilationStage => "Parsing",
                PrimarySuggestion => "Define a named function with 'def' instead",
            }
        )
    }

    let body = parse_or_test(tokens)?;

    if !tokens.eat(&TokenKind::If) {
        return Ok(body);
    }

    let test = parse_or_test(tokens)?;
    expect_token(tokens, &TokenKind::Else, "in conditional expression")?;
    let orelse = parse_test(tokens)?;

    Ok(Expr::IfExp {
        test: Box::new(test),
        body: Box::new(body),
        orelse: Box::new(orelse),
    })
}

fn parse_or_test(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    let first = parse_and_test(tokens)?;

    if tokens.current_token_kind() != &TokenKind::Or {
        return Ok(first);
    }

    let mut values = vec![first];
    while tokens.eat(&TokenKind::Or) {
        values.push(parse_and_test(tokens)?);
    }

    Ok(Expr::BoolOp {
        op: BoolOperator::Or,
        values,
    })
}

fn parse_and_test(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    let first = parse_not_test(tokens)?;

    if tokens.current_token_kind() != &TokenKind::And {
        return Ok(first);
    }

    let mut values = vec![first];
    while tokens.eat(&TokenKind::And) {
        values.push(parse_not_test(tokens)?);
    }

    Ok(Expr::BoolOp {
        op: BoolOperator::And,
        values,
    })
}

fn parse_not_test(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    if tokens.eat(&TokenKind::Not) {
        let operand = parse_not_test(tokens)?;
        return Ok(Expr::UnaryOp {
            op: UnaryOperator::Not,
            operand: Box::new(operand),
        });
    }

    parse_comparison(tokens)
}

fn parse_comparison(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    let left = parse_binary(tokens, 0)?;

    let mut ops = Vec::new();
    let mut comparators = Vec::new();

    loop {
        let op = match tokens.current_token_kind() {
            TokenKind::Equal => CompareOperator::Equal,
            TokenKind::NotEqual => CompareOperator::NotEqual,
            TokenKind::LessThan => CompareOperator::LessThan,
            TokenKind::LessThanOrEqual => CompareOperator::LessThanOrEqual,
            TokenKind::GreaterThan => CompareOperator::GreaterThan,
            TokenKind::GreaterThanOrEqual => CompareOperator::GreaterThanOrEqual,
            TokenKind::In => CompareOperator::In,
            TokenKind::Not if tokens.peek_next_token() == Some(&TokenKind::In) => {
                tokens.advance();
                CompareOperator::NotIn
            }
            TokenKind::Is if tokens.peek_next_token() == Some(&TokenKind::Not) => {
                tokens.advance();
                CompareOperator::IsNot
            }
            TokenKind::Is => CompareOperator::Is,
            _ => break,
        };

        tokens.advance();
        ops.push(op);
        comparators.push(parse_binary(tokens, 0)?);
    }

    if ops.is_empty() {
        return Ok(left);
    }

    Ok(Expr::Compare {
        left: Box::new(left),
        ops,
        comparators,
    })
}

fn parse_binary(tokens: &mut FileTokens, level: usize) -> Result<Expr, CompilerError> {
    if level >= BINARY_LEVEL_COUNT {
        return parse_factor(tokens);
    }

    let mut left = parse_binary(tokens, level + 1)?;

    while let Some(op) = binary_operator_at_level(level, tokens.current_token_kind()) {
        tokens.advance();
        let right = parse_binary(tokens, level + 1)?;
        left = Expr::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        };
    }

    Ok(left)
}

fn parse_factor(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    let op = match tokens.current_token_kind() {
        TokenKind::Subtract => UnaryOperator::Negative,
        TokenKind::Add => UnaryOperator::Positive,
        TokenKind::BitNot => UnaryOperator::Invert,
        _ => return parse_power(tokens),
    };

    tokens.advance();
    let operand = parse_factor(tokens)?;

    Ok(Expr::UnaryOp {
        op,
        operand: Box::new(operand),
    })
}

fn parse_power(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    let base = parse_primary(tokens)?;

    if !tokens.eat(&TokenKind::Exponent) {
        return Ok(base);
    }

    // Right associative, and binds tighter than unary minus on its left only
    let exponent = parse_factor(tokens)?;
    Ok(Expr::BinOp {
        left: Box::new(base),
        op: BinaryOperator::Exponent,
        right: Box::new(exponent),
    })
}

fn parse_primary(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    let mut expr = parse_atom(tokens)?;

    loop {
        match tokens.current_token_kind() {
            TokenKind::OpenParenthesis => {
                tokens.advance();
                let (args, keywords) = parse_call_arguments(tokens)?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                    keywords,
                };
            }

            TokenKind::OpenBracket => {
                tokens.advance();
                let index = parse_subscript_list(tokens)?;
                expect_token(tokens, &TokenKind::CloseBracket, "to close the subscript")?;
                expr = Expr::subscript(expr, index);
            }

            TokenKind::Dot => {
                tokens.advance();
                let attr = match tokens.current_token_kind() {
                    TokenKind::Name(name) => name.to_owned(),
                    other => {
                        return_syntax_error!(
                            format!("Expected an attribute name after '.', found {}", other.describe()),
                            tokens.current_location(),
                            {
                                CompilationStage => "Parsing",
                            }
                        )
                    }
                };
                tokens.advance();
                expr = Expr::Attribute {
                    value: Box::new(expr),
                    attr,
                };
            }

            _ => return Ok(expr),
        }
    }
}

/// Arguments after an opening parenthesis, up to and including the closing one
pub fn parse_call_arguments(
    tokens: &mut FileTokens,
) -> Result<(Vec<Expr>, Vec<Keyword>), CompilerError> {
    let mut args = Vec::new();
    let mut keywords: Vec<Keyword> = Vec::new();

    loop {
        if tokens.eat(&TokenKind::CloseParenthesis) {
            break;
        }

        let location = tokens.current_location();

        match tokens.current_token_kind() {
            TokenKind::Multiply => {
                tokens.advance();
                let value = parse_test(tokens)?;
                args.push(Expr::Starred(Box::new(value)));
            }

            TokenKind::Exponent => {
                tokens.advance();
                let value = parse_test(tokens)?;
                keywords.push(Keyword { name: None, value });
            }

            TokenKind::Name(name) if tokens.peek_next_token() == Some(&TokenKind::Assign) => {
                let name = name.to_owned();
                tokens.advance();
                tokens.advance();
                let value = parse_test(tokens)?;
                keywords.push(Keyword {
                    name: Some(name),
                    value,
                });
            }

            _ => {
                if !keywords.is_empty() {
                    return_syntax_error!(
                        "Positional argument follows keyword argument",
                        location,
                        {
                            CompilationStage => "Parsing",
                            PrimarySuggestion => "Move positional arguments before keyword arguments",
                        }
                    )
                }
                let value = parse_test(tokens)?;
                reject_comprehension(tokens)?;
                args.push(value);
            }
        }

        if !tokens.eat(&TokenKind::Comma) {
            expect_token(tokens, &TokenKind::CloseParenthesis, "to close the call")?;
            break;
        }
    }

    Ok((args, keywords))
}

fn parse_subscript_list(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    let first = parse_subscript_item(tokens)?;

    if tokens.current_token_kind() != &TokenKind::Comma {
        return Ok(first);
    }

    let mut elements = vec![first];
    while tokens.eat(&TokenKind::Comma) {
        if tokens.current_token_kind() == &TokenKind::CloseBracket {
            break;
        }
        elements.push(parse_subscript_item(tokens)?);
    }

    Ok(Expr::Tuple(elements))
}

fn parse_subscript_item(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    let lower = if tokens.current_token_kind() == &TokenKind::Colon {
        None
    } else {
        Some(parse_test(tokens)?)
    };

    if !tokens.eat(&TokenKind::Colon) {
        if let Some(index) = lower {
            return Ok(index);
        }
    }

    let ends_slice_part = |kind: &TokenKind| {
        matches!(
            kind,
            TokenKind::Colon | TokenKind::Comma | TokenKind::CloseBracket
        )
    };

    let upper = if ends_slice_part(tokens.current_token_kind()) {
        None
    } else {
        Some(Box::new(parse_test(tokens)?))
    };

    let mut step = None;
    if tokens.eat(&TokenKind::Colon) && !ends_slice_part(tokens.current_token_kind()) {
        step = Some(Box::new(parse_test(tokens)?));
    }

    Ok(Expr::Slice {
        lower: lower.map(Box::new),
        upper,
        step,
    })
}

fn parse_atom(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    let location = tokens.current_location();

    let expr = match tokens.current_token_kind() {
        TokenKind::Name(name) => Expr::Name(name.to_owned()),
        TokenKind::IntLiteral(value) => Expr::Constant(Constant::Int(*value)),
        TokenKind::FloatLiteral(value) => Expr::Constant(Constant::Float(*value)),
        TokenKind::None => Expr::Constant(Constant::None),
        TokenKind::True => Expr::Constant(Constant::Bool(true)),
        TokenKind::False => Expr::Constant(Constant::Bool(false)),

        // Adjacent string literals are joined
        TokenKind::StringLiteral(value) => {
            let mut joined = value.to_owned();
            tokens.advance();
            while let TokenKind::StringLiteral(next) = tokens.current_token_kind() {
                joined.push_str(next);
                tokens.advance();
            }
            return Ok(Expr::Constant(Constant::Str(joined)));
        }

        TokenKind::OpenParenthesis => {
            tokens.advance();
            return parse_parenthesized(tokens);
        }

        TokenKind::OpenBracket => {
            tokens.advance();
            let elements = parse_display_elements(tokens, &TokenKind::CloseBracket)?;
            return Ok(Expr::List(elements));
        }

        TokenKind::OpenCurly => {
            tokens.advance();
            return parse_curly_display(tokens);
        }

        other => {
            return_syntax_error!(
                format!("Expected an expression, found {}", other.describe()),
                location,
                {
                    CompilationStage => "Parsing",
                }
            )
        }
    };

    tokens.advance();
    Ok(expr)
}

fn parse_parenthesized(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    if tokens.eat(&TokenKind::CloseParenthesis) {
        return Ok(Expr::Tuple(Vec::new()));
    }

    if tokens.current_token_kind() == &TokenKind::Yield {
        let value = parse_yield(tokens)?;
        expect_token(tokens, &TokenKind::CloseParenthesis, "to close the parenthesis")?;
        return Ok(value);
    }

    let first = parse_test_or_star(tokens)?;
    reject_comprehension(tokens)?;

    if tokens.eat(&TokenKind::CloseParenthesis) {
        return Ok(first);
    }

    expect_token(tokens, &TokenKind::Comma, "or ')' in parenthesized expression")?;

    let mut elements = vec![first];
    elements.extend(parse_display_elements(
        tokens,
        &TokenKind::CloseParenthesis,
    )?);

    Ok(Expr::Tuple(elements))
}

// Comma separated elements up to and including the closing token
fn parse_display_elements(
    tokens: &mut FileTokens,
    closing: &TokenKind,
) -> Result<Vec<Expr>, CompilerError> {
    let mut elements = Vec::new();

    loop {
        if tokens.eat(closing) {
            return Ok(elements);
        }

        elements.push(parse_test_or_star(tokens)?);
        reject_comprehension(tokens)?;

        if !tokens.eat(&TokenKind::Comma) {
            expect_token(tokens, closing, "to close the display")?;
            return Ok(elements);
        }
    }
}

fn parse_curly_display(tokens: &mut FileTokens) -> Result<Expr, CompilerError> {
    if tokens.eat(&TokenKind::CloseCurly) {
        return Ok(Expr::Dict(Vec::new()));
    }

    // Set display
    let first_is_set_element = match tokens.current_token_kind() {
        TokenKind::Multiply => true,
        TokenKind::Exponent => false,
        _ => {
            let first = parse_test(tokens)?;
            reject_comprehension(tokens)?;

            if tokens.eat(&TokenKind::Colon) {
                let value = parse_test(tokens)?;
                reject_comprehension(tokens)?;
                return finish_dict(tokens, vec![(Some(first), value)]);
            }

            let mut elements = vec![first];
            if tokens.eat(&TokenKind::Comma) {
                elements.extend(parse_display_elements(tokens, &TokenKind::CloseCurly)?);
            } else {
                expect_token(tokens, &TokenKind::CloseCurly, "to close the set")?;
            }
            return Ok(Expr::Set(elements));
        }
    };

    if first_is_set_element {
        let elements = parse_display_elements(tokens, &TokenKind::CloseCurly)?;
        return Ok(Expr::Set(elements));
    }

    finish_dict(tokens, Vec::new())
}

fn finish_dict(
    tokens: &mut FileTokens,
    mut entries: Vec<(Option<Expr>, Expr)>,
) -> Result<Expr, CompilerError> {
    // The first entry may already be parsed
    if !entries.is_empty() && !tokens.eat(&TokenKind::Comma) {
        expect_token(tokens, &TokenKind::CloseCurly, "to close the dict")?;
        return Ok(Expr::Dict(entries));
    }

    loop {
        if tokens.eat(&TokenKind::CloseCurly) {
            return Ok(Expr::Dict(entries));
        }

        if tokens.eat(&TokenKind::Exponent) {
            let value = parse_binary(tokens, 0)?;
            entries.push((None, value));
        } else {
            let key = parse_test(tokens)?;
            expect_token(tokens, &TokenKind::Colon, "between dict key and value")?;
            let value = parse_test(tokens)?;
            entries.push((Some(key), value));
        }

        if !tokens.eat(&TokenKind::Comma) {
            expect_token(tokens, &TokenKind::CloseCurly, "to close the dict")?;
            return Ok(Expr::Dict(entries));
        }
    }
}

fn reject_comprehension(tokens: &FileTokens) -> Result<(), CompilerError> {
    if tokens.current_token_kind() == &TokenKind::For {
        return_syntax_error!(
            "Comprehensions are not supported",
            tokens.current_location(),
            {
                CompilationStage => "Parsing",
                PrimarySuggestion => "Write the comprehension as an explicit for loop",
            }
        )
    }

    Ok(())
}
