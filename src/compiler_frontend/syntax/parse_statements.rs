use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::syntax::ast_nodes::{
    BinaryOperator, ClassDef, ExceptHandler, Expr, ForLoop, FunctionDef, Parameter, Parameters,
    Stmt, StmtKind, TryBlock, WithItem,
};
use crate::compiler_frontend::syntax::parse_expression::{
    parse_call_arguments, parse_target, parse_target_list, parse_test, parse_testlist_star,
    parse_yield_or_testlist, starts_expression,
};
use crate::compiler_frontend::tokenizer::tokenizer::tokenize;
use crate::compiler_frontend::tokenizer::tokens::{FileTokens, TextLocation, TokenKind};
use crate::projects::settings;
use crate::{ast_log, return_syntax_error};

/// Parses a whole source file into its top level statements
pub fn parse_module(source_code: &str) -> Result<Vec<Stmt>, CompilerError> {
    let mut tokens = tokenize(source_code)?;
    let mut body = Vec::with_capacity(tokens.length / settings::TOKEN_TO_NODE_RATIO);

    loop {
        tokens.skip_newlines();

        match tokens.current_token_kind() {
            TokenKind::Eof => break,
            TokenKind::Indent => {
                return_syntax_error!(
                    "Unexpected indent",
                    tokens.current_location(),
                    {
                        CompilationStage => "Parsing",
                        PrimarySuggestion => "Top level statements must start at the first column",
                    }
                )
            }
            _ => parse_statement(&mut tokens, &mut body)?,
        }
    }

    ast_log!("Parsed ", body.len(), " top level statements");

    Ok(body)
}

pub fn expect_token(
    tokens: &mut FileTokens,
    kind: &TokenKind,
    context: &str,
) -> Result<TextLocation, CompilerError> {
    let location = tokens.current_location();

    if tokens.current_token_kind() == kind {
        tokens.advance();
        return Ok(location);
    }

    return_syntax_error!(
        format!(
            "Expected {} {context}, found {}",
            kind.describe(),
            tokens.current_token_kind().describe()
        ),
        location,
        {
            CompilationStage => "Parsing",
        }
    )
}

fn expect_name(tokens: &mut FileTokens, context: &str) -> Result<String, CompilerError> {
    let name = match tokens.current_token_kind() {
        TokenKind::Name(name) => name.to_owned(),
        other => {
            return_syntax_error!(
                format!("Expected a name {context}, found {}", other.describe()),
                tokens.current_location(),
                {
                    CompilationStage => "Parsing",
                }
            )
        }
    };

    tokens.advance();
    Ok(name)
}

fn parse_statement(tokens: &mut FileTokens, body: &mut Vec<Stmt>) -> Result<(), CompilerError> {
    match tokens.current_token_kind() {
        TokenKind::Def => body.push(parse_function_def(tokens, Vec::new())?),
        TokenKind::Class => body.push(parse_class_def(tokens, Vec::new())?),
        TokenKind::At => body.push(parse_decorated(tokens)?),
        TokenKind::If => body.push(parse_if(tokens)?),
        TokenKind::For => body.push(parse_for(tokens)?),
        TokenKind::While => body.push(parse_while(tokens)?),
        TokenKind::With => body.push(parse_with(tokens)?),
        TokenKind::Try => body.push(parse_try(tokens)?),
        _ => parse_simple_statements(tokens, body)?,
    }

    Ok(())
}

/// The ':' and indented (or same line) body of a compound statement
pub fn parse_block(tokens: &mut FileTokens) -> Result<Vec<Stmt>, CompilerError> {
    expect_token(tokens, &TokenKind::Colon, "to start the block")?;

    let mut body = Vec::with_capacity(settings::MINIMUM_LIKELY_STATEMENTS);

    if tokens.current_token_kind() != &TokenKind::Newline {
        parse_simple_statements(tokens, &mut body)?;
        return Ok(body);
    }

    tokens.skip_newlines();

    if tokens.current_token_kind() != &TokenKind::Indent {
        return_syntax_error!(
            "Expected an indented block",
            tokens.current_location(),
            {
                CompilationStage => "Parsing",
                PrimarySuggestion => "Indent the body of this block, or write 'pass' for an empty one",
            }
        )
    }
    tokens.advance();

    loop {
        tokens.skip_newlines();

        match tokens.current_token_kind() {
            TokenKind::Dedent => {
                tokens.advance();
                break;
            }
            TokenKind::Eof => break,
            TokenKind::Indent => {
                return_syntax_error!(
                    "Unexpected indent",
                    tokens.current_location(),
                    {
                        CompilationStage => "Parsing",
                    }
                )
            }
            _ => parse_statement(tokens, &mut body)?,
        }
    }

    Ok(body)
}

fn parse_decorated(tokens: &mut FileTokens) -> Result<Stmt, CompilerError> {
    let mut decorators = Vec::new();

    while tokens.eat(&TokenKind::At) {
        decorators.push(parse_test(tokens)?);
        expect_token(tokens, &TokenKind::Newline, "after decorator")?;
        tokens.skip_newlines();
    }

    match tokens.current_token_kind() {
        TokenKind::Def => parse_function_def(tokens, decorators),
        TokenKind::Class => parse_class_def(tokens, decorators),
        other => {
            return_syntax_error!(
                format!("Expected 'def' or 'class' after decorators, found {}", other.describe()),
                tokens.current_location(),
                {
                    CompilationStage => "Parsing",
                }
            )
        }
    }
}

fn parse_function_def(
    tokens: &mut FileTokens,
    decorators: Vec<Expr>,
) -> Result<Stmt, CompilerError> {
    let location = tokens.current_location();
    tokens.advance();

    let name = expect_name(tokens, "after 'def'")?;
    expect_token(tokens, &TokenKind::OpenParenthesis, "to start the parameters")?;
    let params = parse_parameters(tokens)?;

    // Return annotations are accepted and dropped
    if tokens.eat(&TokenKind::Arrow) {
        parse_test(tokens)?;
    }

    let header_location = location.join(tokens.previous_location());
    let body = parse_block(tokens)?;

    Ok(Stmt::new(
        StmtKind::FunctionDef(FunctionDef {
            name,
            params,
            body,
            decorators,
            location: header_location,
        }),
        header_location,
    ))
}

fn parse_parameters(tokens: &mut FileTokens) -> Result<Parameters, CompilerError> {
    let mut params = Parameters::default();
    let mut after_star = false;

    loop {
        if tokens.eat(&TokenKind::CloseParenthesis) {
            break;
        }

        let location = tokens.current_location();

        match tokens.current_token_kind() {
            TokenKind::Multiply => {
                tokens.advance();
                if after_star {
                    return_syntax_error!(
                        "Only one '*' is allowed in a parameter list",
                        location,
                        {
                            CompilationStage => "Parsing",
                        }
                    )
                }
                after_star = true;
                if let TokenKind::Name(_) = tokens.current_token_kind() {
                    let vararg = expect_name(tokens, "for variadic parameter")?;
                    skip_annotation(tokens)?;
                    params.vararg = Some(vararg);
                }
            }

            TokenKind::Exponent => {
                tokens.advance();
                let kwarg = expect_name(tokens, "for keyword parameter")?;
                skip_annotation(tokens)?;
                params.kwarg = Some(kwarg);
            }

            // Positional only marker
            TokenKind::Divide => tokens.advance(),

            _ => {
                if params.kwarg.is_some() {
                    return_syntax_error!(
                        "Parameters cannot follow '**' parameter",
                        location,
                        {
                            CompilationStage => "Parsing",
                        }
                    )
                }

                let name = expect_name(tokens, "in parameter list")?;
                skip_annotation(tokens)?;

                let default = if tokens.eat(&TokenKind::Assign) {
                    Some(parse_test(tokens)?)
                } else {
                    None
                };

                if params.names().contains(&name.as_str()) {
                    return_syntax_error!(
                        format!("Duplicate parameter '{name}' in function definition"),
                        location,
                        {
                            CompilationStage => "Parsing",
                            VariableName => name,
                        }
                    )
                }

                if after_star {
                    params.keyword_only.push(Parameter { name, default });
                } else {
                    let follows_default = params
                        .positional
                        .last()
                        .is_some_and(|previous| previous.default.is_some());

                    if default.is_none() && follows_default {
                        return_syntax_error!(
                            "Non-default parameter follows default parameter",
                            location,
                            {
                                CompilationStage => "Parsing",
                                PrimarySuggestion => "Give this parameter a default value or move it before the defaulted ones",
                            }
                        )
                    }

                    params.positional.push(Parameter { name, default });
                }
            }
        }

        if !tokens.eat(&TokenKind::Comma) {
            expect_token(tokens, &TokenKind::CloseParenthesis, "to close the parameters")?;
            break;
        }
    }

    Ok(params)
}

// Type annotations are accepted and dropped
fn skip_annotation(tokens: &mut FileTokens) -> Result<(), CompilerError> {
    if tokens.eat(&TokenKind::Colon) {
        parse_test(tokens)?;
    }
    Ok(())
}

fn parse_class_def(tokens: &mut FileTokens, decorators: Vec<Expr>) -> Result<Stmt, CompilerError> {
    let location = tokens.current_location();
    tokens.advance();

    let name = expect_name(tokens, "after 'class'")?;

    let mut bases = Vec::new();
    if tokens.eat(&TokenKind::OpenParenthesis) {
        let (args, keywords) = parse_call_arguments(tokens)?;
        if !keywords.is_empty() {
            return_syntax_error!(
                "Keyword arguments in a class definition are not supported",
                location,
                {
                    CompilationStage => "Parsing",
                }
            )
        }
        bases = args;
    }

    let header_location = location.join(tokens.previous_location());
    let body = parse_block(tokens)?;

    Ok(Stmt::new(
        StmtKind::ClassDef(ClassDef {
            name,
            bases,
            body,
            decorators,
        }),
        header_location,
    ))
}

// Handles both 'if' and 'elif', since an elif is a nested if in the else branch
fn parse_if(tokens: &mut FileTokens) -> Result<Stmt, CompilerError> {
    let location = tokens.current_location();
    tokens.advance();

    let test = parse_test(tokens)?;
    let header_location = location.join(tokens.previous_location());
    let body = parse_block(tokens)?;

    let orelse = match tokens.current_token_kind() {
        TokenKind::Elif => vec![parse_if(tokens)?],
        TokenKind::Else => {
            tokens.advance();
            parse_block(tokens)?
        }
        _ => Vec::new(),
    };

    Ok(Stmt::new(
        StmtKind::If { test, body, orelse },
        header_location,
    ))
}

fn parse_optional_else(tokens: &mut FileTokens) -> Result<Vec<Stmt>, CompilerError> {
    if tokens.eat(&TokenKind::Else) {
        return parse_block(tokens);
    }
    Ok(Vec::new())
}

fn parse_for(tokens: &mut FileTokens) -> Result<Stmt, CompilerError> {
    let location = tokens.current_location();
    tokens.advance();

    let target = parse_target_list(tokens)?;
    validate_target(&target, location)?;
    expect_token(tokens, &TokenKind::In, "in for loop")?;
    let iter = parse_testlist_star(tokens)?;

    let header_location = location.join(tokens.previous_location());
    let body = parse_block(tokens)?;
    let orelse = parse_optional_else(tokens)?;

    Ok(Stmt::new(
        StmtKind::For(ForLoop {
            target,
            iter,
            body,
            orelse,
        }),
        header_location,
    ))
}

fn parse_while(tokens: &mut FileTokens) -> Result<Stmt, CompilerError> {
    let location = tokens.current_location();
    tokens.advance();

    let test = parse_test(tokens)?;
    let header_location = location.join(tokens.previous_location());
    let body = parse_block(tokens)?;
    let orelse = parse_optional_else(tokens)?;

    Ok(Stmt::new(
        StmtKind::While { test, body, orelse },
        header_location,
    ))
}

fn parse_with(tokens: &mut FileTokens) -> Result<Stmt, CompilerError> {
    let location = tokens.current_location();
    tokens.advance();

    let mut items = Vec::new();
    loop {
        let context = parse_test(tokens)?;
        let target = if tokens.eat(&TokenKind::As) {
            let target = parse_target(tokens)?;
            validate_target(&target, location)?;
            Some(target)
        } else {
            None
        };

        items.push(WithItem { context, target });

        if !tokens.eat(&TokenKind::Comma) {
            break;
        }
    }

    let header_location = location.join(tokens.previous_location());
    let body = parse_block(tokens)?;

    Ok(Stmt::new(StmtKind::With { items, body }, header_location))
}

fn parse_try(tokens: &mut FileTokens) -> Result<Stmt, CompilerError> {
    let location = tokens.current_location();
    tokens.advance();

    let body = parse_block(tokens)?;

    let mut handlers = Vec::new();
    while tokens.current_token_kind() == &TokenKind::Except {
        tokens.advance();

        let mut exception = None;
        let mut name = None;

        if tokens.current_token_kind() != &TokenKind::Colon {
            exception = Some(parse_test(tokens)?);
            if tokens.eat(&TokenKind::As) {
                name = Some(expect_name(tokens, "after 'as'")?);
            }
        }

        let handler_body = parse_block(tokens)?;
        handlers.push(ExceptHandler {
            exception,
            name,
            body: handler_body,
        });
    }

    let orelse = parse_optional_else(tokens)?;

    let finalbody = if tokens.eat(&TokenKind::Finally) {
        parse_block(tokens)?
    } else {
        Vec::new()
    };

    if handlers.is_empty() && finalbody.is_empty() {
        return_syntax_error!(
            "Expected 'except' or 'finally' block after 'try'",
            location,
            {
                CompilationStage => "Parsing",
            }
        )
    }

    Ok(Stmt::new(
        StmtKind::Try(TryBlock {
            body,
            handlers,
            orelse,
            finalbody,
        }),
        location,
    ))
}

// One line of ';' separated simple statements, including its Newline
fn parse_simple_statements(
    tokens: &mut FileTokens,
    body: &mut Vec<Stmt>,
) -> Result<(), CompilerError> {
    loop {
        let location = tokens.current_location();
        let kind = parse_small_statement(tokens)?;
        body.push(Stmt::new(kind, location.join(tokens.previous_location())));

        if tokens.eat(&TokenKind::Semicolon)
            && !matches!(
                tokens.current_token_kind(),
                TokenKind::Newline | TokenKind::Eof
            )
        {
            continue;
        }

        match tokens.current_token_kind() {
            TokenKind::Newline => {
                tokens.advance();
                return Ok(());
            }
            TokenKind::Eof | TokenKind::Dedent => return Ok(()),
            other => {
                return_syntax_error!(
                    format!("Expected end of statement, found {}", other.describe()),
                    tokens.current_location(),
                    {
                        CompilationStage => "Parsing",
                        PrimarySuggestion => "Put each statement on its own line or separate them with ';'",
                    }
                )
            }
        }
    }
}

fn at_statement_end(tokens: &FileTokens) -> bool {
    matches!(
        tokens.current_token_kind(),
        TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eof | TokenKind::Dedent
    )
}

fn parse_small_statement(tokens: &mut FileTokens) -> Result<StmtKind, CompilerError> {
    let location = tokens.current_location();

    match tokens.current_token_kind() {
        TokenKind::Pass => {
            tokens.advance();
            Ok(StmtKind::Pass)
        }

        TokenKind::Break => {
            tokens.advance();
            Ok(StmtKind::Break)
        }

        TokenKind::Continue => {
            tokens.advance();
            Ok(StmtKind::Continue)
        }

        TokenKind::Return => {
            tokens.advance();
            if at_statement_end(tokens) {
                return Ok(StmtKind::Return(None));
            }
            Ok(StmtKind::Return(Some(parse_testlist_star(tokens)?)))
        }

        TokenKind::Del => {
            tokens.advance();
            let targets = match parse_target_list(tokens)? {
                Expr::Tuple(elements) => elements,
                single => vec![single],
            };
            for target in &targets {
                validate_target(target, location)?;
            }
            Ok(StmtKind::Delete(targets))
        }

        TokenKind::Raise => {
            tokens.advance();
            if at_statement_end(tokens) {
                return Ok(StmtKind::Raise(None));
            }

            let exception = parse_test(tokens)?;
            if tokens.current_token_kind() == &TokenKind::From {
                return_syntax_error!(
                    "'raise ... from ...' is not supported",
                    tokens.current_location(),
                    {
                        CompilationStage => "Parsing",
                    }
                )
            }
            Ok(StmtKind::Raise(Some(exception)))
        }

        TokenKind::Global | TokenKind::Nonlocal => {
            let is_global = tokens.current_token_kind() == &TokenKind::Global;
            tokens.advance();

            let mut names = vec![expect_name(tokens, "in declaration")?];
            while tokens.eat(&TokenKind::Comma) {
                names.push(expect_name(tokens, "in declaration")?);
            }

            if is_global {
                Ok(StmtKind::Global(names))
            } else {
                Ok(StmtKind::Nonlocal(names))
            }
        }

        TokenKind::Assert => {
            tokens.advance();
            let test = parse_test(tokens)?;
            let msg = if tokens.eat(&TokenKind::Comma) {
                Some(parse_test(tokens)?)
            } else {
                None
            };
            Ok(StmtKind::Assert { test, msg })
        }

        TokenKind::Import | TokenKind::From => {
            return_syntax_error!(
                "Import statements are not supported",
                location,
                {
                    CompilationStage => "Parsing",
                    PrimarySuggestion => "Pass the imported values in as overrides instead",
                }
            )
        }

        kind if !starts_expression(kind) => {
            return_syntax_error!(
                format!("Expected a statement, found {}", kind.describe()),
                location,
                {
                    CompilationStage => "Parsing",
                }
            )
        }

        _ => parse_expression_statement(tokens, location),
    }
}

fn augmented_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    let op = match kind {
        TokenKind::AddAssign => BinaryOperator::Add,
        TokenKind::SubtractAssign => BinaryOperator::Subtract,
        TokenKind::MultiplyAssign => BinaryOperator::Multiply,
        TokenKind::DivideAssign => BinaryOperator::Divide,
        TokenKind::FloorDivideAssign => BinaryOperator::FloorDivide,
        TokenKind::ModulusAssign => BinaryOperator::Modulus,
        TokenKind::ExponentAssign => BinaryOperator::Exponent,
        TokenKind::ShiftLeftAssign => BinaryOperator::ShiftLeft,
        TokenKind::ShiftRightAssign => BinaryOperator::ShiftRight,
        TokenKind::BitAndAssign => BinaryOperator::BitAnd,
        TokenKind::BitOrAssign => BinaryOperator::BitOr,
        TokenKind::BitXorAssign => BinaryOperator::BitXor,
        _ => return None,
    };

    Some(op)
}

fn parse_expression_statement(
    tokens: &mut FileTokens,
    location: TextLocation,
) -> Result<StmtKind, CompilerError> {
    let first = parse_yield_or_testlist(tokens)?;

    if let Some(op) = augmented_operator(tokens.current_token_kind()) {
        tokens.advance();

        if !matches!(
            first,
            Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. }
        ) {
            return_syntax_error!(
                "Illegal target for augmented assignment",
                location,
                {
                    CompilationStage => "Parsing",
                }
            )
        }

        let value = parse_yield_or_testlist(tokens)?;
        return Ok(StmtKind::AugAssign {
            target: first,
            op,
            value,
        });
    }

    if tokens.current_token_kind() != &TokenKind::Assign {
        return Ok(StmtKind::Expr(first));
    }

    let mut chain = vec![first];
    while tokens.eat(&TokenKind::Assign) {
        chain.push(parse_yield_or_testlist(tokens)?);
    }

    // The last expression of the chain is the value, the rest are targets
    let value = match chain.pop() {
        Some(value) => value,
        None => return_syntax_error!("Expected a value to assign", location),
    };

    for target in &chain {
        validate_target(target, location)?;
    }

    Ok(StmtKind::Assign {
        targets: chain,
        value,
    })
}

fn validate_target(target: &Expr, location: TextLocation) -> Result<(), CompilerError> {
    match target {
        Expr::Name(_) | Expr::Attribute { .. } | Expr::Subscript { .. } => Ok(()),
        Expr::Tuple(elements) | Expr::List(elements) => {
            for element in elements {
                validate_target(element, location)?;
            }
            Ok(())
        }
        Expr::Starred(inner) => validate_target(inner, location),
        _ => {
            return_syntax_error!(
                "Cannot assign to this expression",
                location,
                {
                    CompilationStage => "Parsing",
                    PrimarySuggestion => "Only names, attributes, subscripts and tuples of them can be assigned to",
                }
            )
        }
    }
}

#[cfg(test)]
#[path = "tests/parse_statements_tests.rs"]
mod parse_statements_tests;
