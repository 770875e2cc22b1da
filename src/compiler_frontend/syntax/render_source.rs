use crate::compiler_frontend::syntax::ast_nodes::{
    BinaryOperator, BoolOperator, ClassDef, Constant, Expr, FunctionDef, Parameters, Stmt,
    StmtKind, UnaryOperator,
};
use crate::projects::settings::{INDENTATION, INLINE_LOOP_VARIABLE};

// Operator precedence, loosest first.
// A child rendered in a context tighter than its own precedence gets parentheses.
const PREC_TUPLE: u8 = 0;
const PREC_YIELD: u8 = 1;
const PREC_TEST: u8 = 2;
const PREC_OR: u8 = 3;
const PREC_AND: u8 = 4;
const PREC_NOT: u8 = 5;
const PREC_COMPARE: u8 = 6;
const PREC_BIT_OR: u8 = 7;
const PREC_BIT_XOR: u8 = 8;
const PREC_BIT_AND: u8 = 9;
const PREC_SHIFT: u8 = 10;
const PREC_ARITH: u8 = 11;
const PREC_TERM: u8 = 12;
const PREC_FACTOR: u8 = 13;
const PREC_POWER: u8 = 14;
const PREC_PRIMARY: u8 = 15;

/// Renders a whole module, decorators included
pub fn render_module(body: &[Stmt]) -> String {
    let mut out = String::new();
    for stmt in body {
        render_stmt(&mut out, stmt, 0);
    }
    out
}

/// Renders a top level function definition without its decorators.
/// This is the text form of a transformed function.
pub fn render_function(def: &FunctionDef) -> String {
    let mut out = String::new();
    render_function_def(&mut out, def, 0, false);
    out
}

pub fn render_statements(body: &[Stmt]) -> String {
    let mut out = String::new();
    render_block(&mut out, body, 0);
    out
}

pub fn render_expression(expr: &Expr) -> String {
    render_expr(expr, PREC_TUPLE)
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push_str(INDENTATION);
    }
    out.push_str(line);
    out.push('\n');
}

fn render_block(out: &mut String, body: &[Stmt], depth: usize) {
    if body.is_empty() {
        push_line(out, depth, "pass");
        return;
    }

    for stmt in body {
        render_stmt(out, stmt, depth);
    }
}

fn render_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    match &stmt.kind {
        StmtKind::FunctionDef(def) => render_function_def(out, def, depth, true),
        StmtKind::ClassDef(def) => render_class_def(out, def, depth),

        StmtKind::Return(value) => match value {
            Some(value) => push_line(out, depth, &format!("return {}", render_expr(value, PREC_TUPLE))),
            None => push_line(out, depth, "return"),
        },

        StmtKind::Delete(targets) => {
            push_line(out, depth, &format!("del {}", render_list(targets, PREC_TEST)));
        }

        StmtKind::Assign { targets, value } => {
            let mut line = String::new();
            for target in targets {
                line.push_str(&render_expr(target, PREC_TUPLE));
                line.push_str(" = ");
            }
            line.push_str(&render_expr(value, PREC_TUPLE));
            push_line(out, depth, &line);
        }

        StmtKind::AugAssign { target, op, value } => {
            push_line(
                out,
                depth,
                &format!(
                    "{} {}= {}",
                    render_expr(target, PREC_TUPLE),
                    op.symbol(),
                    render_expr(value, PREC_TUPLE)
                ),
            );
        }

        StmtKind::For(for_loop) => {
            push_line(
                out,
                depth,
                &format!(
                    "for {} in {}:",
                    render_expr(&for_loop.target, PREC_TUPLE),
                    render_expr(&for_loop.iter, PREC_TUPLE)
                ),
            );
            render_block(out, &for_loop.body, depth + 1);
            if !for_loop.orelse.is_empty() {
                push_line(out, depth, "else:");
                render_block(out, &for_loop.orelse, depth + 1);
            }
        }

        StmtKind::While { test, body, orelse } => {
            push_line(out, depth, &format!("while {}:", render_expr(test, PREC_TEST)));
            render_block(out, body, depth + 1);
            if !orelse.is_empty() {
                push_line(out, depth, "else:");
                render_block(out, orelse, depth + 1);
            }
        }

        StmtKind::If { test, body, orelse } => {
            push_line(out, depth, &format!("if {}:", render_expr(test, PREC_TEST)));
            render_block(out, body, depth + 1);
            render_else_chain(out, orelse, depth);
        }

        StmtKind::With { items, body } => {
            let rendered: Vec<String> = items
                .iter()
                .map(|item| match &item.target {
                    Some(target) => format!(
                        "{} as {}",
                        render_expr(&item.context, PREC_TEST),
                        render_expr(target, PREC_TEST)
                    ),
                    None => render_expr(&item.context, PREC_TEST),
                })
                .collect();
            push_line(out, depth, &format!("with {}:", rendered.join(", ")));
            render_block(out, body, depth + 1);
        }

        StmtKind::Raise(exception) => match exception {
            Some(exception) => push_line(out, depth, &format!("raise {}", render_expr(exception, PREC_TEST))),
            None => push_line(out, depth, "raise"),
        },

        StmtKind::Try(try_block) => {
            push_line(out, depth, "try:");
            render_block(out, &try_block.body, depth + 1);

            for handler in &try_block.handlers {
                let header = match (&handler.exception, &handler.name) {
                    (Some(exception), Some(name)) => {
                        format!("except {} as {name}:", render_expr(exception, PREC_TEST))
                    }
                    (Some(exception), None) => format!("except {}:", render_expr(exception, PREC_TEST)),
                    _ => "except:".to_owned(),
                };
                push_line(out, depth, &header);
                render_block(out, &handler.body, depth + 1);
            }

            if !try_block.orelse.is_empty() {
                push_line(out, depth, "else:");
                render_block(out, &try_block.orelse, depth + 1);
            }

            if !try_block.finalbody.is_empty() {
                push_line(out, depth, "finally:");
                render_block(out, &try_block.finalbody, depth + 1);
            }
        }

        StmtKind::Assert { test, msg } => match msg {
            Some(msg) => push_line(
                out,
                depth,
                &format!("assert {}, {}", render_expr(test, PREC_TEST), render_expr(msg, PREC_TEST)),
            ),
            None => push_line(out, depth, &format!("assert {}", render_expr(test, PREC_TEST))),
        },

        StmtKind::Global(names) => push_line(out, depth, &format!("global {}", names.join(", "))),
        StmtKind::Nonlocal(names) => push_line(out, depth, &format!("nonlocal {}", names.join(", "))),
        StmtKind::Expr(expr) => push_line(out, depth, &render_expr(expr, PREC_TUPLE)),
        StmtKind::Pass => push_line(out, depth, "pass"),
        StmtKind::Break => push_line(out, depth, "break"),
        StmtKind::Continue => push_line(out, depth, "continue"),

        // The text form has no labelled blocks, so an inlined body becomes a loop that runs once
        StmtKind::InlineBlock { body, .. } => {
            push_line(out, depth, &format!("for {INLINE_LOOP_VARIABLE} in range(1):"));
            render_block(out, body, depth + 1);
        }
        StmtKind::ExitInline(_) => push_line(out, depth, "break"),
    }
}

fn render_else_chain(out: &mut String, orelse: &[Stmt], depth: usize) {
    if orelse.is_empty() {
        return;
    }

    if let [elif] = orelse
        && let StmtKind::If { test, body, orelse } = &elif.kind
    {
        push_line(out, depth, &format!("elif {}:", render_expr(test, PREC_TEST)));
        render_block(out, body, depth + 1);
        render_else_chain(out, orelse, depth);
        return;
    }

    push_line(out, depth, "else:");
    render_block(out, orelse, depth + 1);
}

fn render_function_def(out: &mut String, def: &FunctionDef, depth: usize, with_decorators: bool) {
    if with_decorators {
        for decorator in &def.decorators {
            push_line(out, depth, &format!("@{}", render_expr(decorator, PREC_TEST)));
        }
    }

    push_line(
        out,
        depth,
        &format!("def {}({}):", def.name, render_parameters(&def.params)),
    );
    render_block(out, &def.body, depth + 1);
}

fn render_class_def(out: &mut String, def: &ClassDef, depth: usize) {
    for decorator in &def.decorators {
        push_line(out, depth, &format!("@{}", render_expr(decorator, PREC_TEST)));
    }

    if def.bases.is_empty() {
        push_line(out, depth, &format!("class {}:", def.name));
    } else {
        push_line(
            out,
            depth,
            &format!("class {}({}):", def.name, render_list(&def.bases, PREC_TEST)),
        );
    }
    render_block(out, &def.body, depth + 1);
}

pub fn render_parameters(params: &Parameters) -> String {
    let mut parts = Vec::with_capacity(params.positional.len() + params.keyword_only.len() + 2);

    let render_param = |name: &str, default: &Option<Expr>| match default {
        Some(default) => format!("{name}={}", render_expr(default, PREC_TEST)),
        None => name.to_owned(),
    };

    for param in &params.positional {
        parts.push(render_param(&param.name, &param.default));
    }

    match &params.vararg {
        Some(vararg) => parts.push(format!("*{vararg}")),
        None if !params.keyword_only.is_empty() => parts.push("*".to_owned()),
        None => {}
    }

    for param in &params.keyword_only {
        parts.push(render_param(&param.name, &param.default));
    }

    if let Some(kwarg) = &params.kwarg {
        parts.push(format!("**{kwarg}"));
    }

    parts.join(", ")
}

fn render_list(exprs: &[Expr], precedence: u8) -> String {
    exprs
        .iter()
        .map(|expr| render_expr(expr, precedence))
        .collect::<Vec<String>>()
        .join(", ")
}

fn binary_precedence(op: BinaryOperator) -> u8 {
    match op {
        BinaryOperator::BitOr => PREC_BIT_OR,
        BinaryOperator::BitXor => PREC_BIT_XOR,
        BinaryOperator::BitAnd => PREC_BIT_AND,
        BinaryOperator::ShiftLeft | BinaryOperator::ShiftRight => PREC_SHIFT,
        BinaryOperator::Add | BinaryOperator::Subtract => PREC_ARITH,
        BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::FloorDivide
        | BinaryOperator::Modulus => PREC_TERM,
        BinaryOperator::Exponent => PREC_POWER,
    }
}

fn expr_precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Tuple(elements) if elements.len() > 1 => PREC_TUPLE,
        Expr::Yield(_) => PREC_YIELD,
        Expr::IfExp { .. } | Expr::Starred(_) => PREC_TEST,
        Expr::BoolOp {
            op: BoolOperator::Or,
            ..
        } => PREC_OR,
        Expr::BoolOp {
            op: BoolOperator::And,
            ..
        } => PREC_AND,
        Expr::UnaryOp {
            op: UnaryOperator::Not,
            ..
        } => PREC_NOT,
        Expr::UnaryOp { .. } => PREC_FACTOR,
        Expr::Compare { .. } => PREC_COMPARE,
        Expr::BinOp { op, .. } => binary_precedence(*op),

        // Negative numbers render with a leading minus
        Expr::Constant(Constant::Int(value)) if *value < 0 => PREC_FACTOR,
        Expr::Constant(Constant::Float(value)) if value.is_sign_negative() => PREC_FACTOR,

        _ => PREC_PRIMARY,
    }
}

fn render_expr(expr: &Expr, context_precedence: u8) -> String {
    let rendered = render_expr_inner(expr);

    if expr_precedence(expr) < context_precedence {
        return format!("({rendered})");
    }

    rendered
}

fn render_expr_inner(expr: &Expr) -> String {
    match expr {
        Expr::Constant(constant) => render_constant(constant),
        Expr::Name(name) => name.to_owned(),

        Expr::Tuple(elements) => match elements.as_slice() {
            [] => "()".to_owned(),
            [single] => format!("({},)", render_expr(single, PREC_TEST)),
            _ => render_list(elements, PREC_TEST),
        },

        Expr::List(elements) => format!("[{}]", render_list(elements, PREC_TEST)),

        // An empty set has no display, '{}' would be a dict
        Expr::Set(elements) if elements.is_empty() => "set()".to_owned(),
        Expr::Set(elements) => format!("{{{}}}", render_list(elements, PREC_TEST)),

        Expr::Dict(entries) => {
            let rendered: Vec<String> = entries
                .iter()
                .map(|(key, value)| match key {
                    Some(key) => format!(
                        "{}: {}",
                        render_expr(key, PREC_TEST),
                        render_expr(value, PREC_TEST)
                    ),
                    None => format!("**{}", render_expr(value, PREC_BIT_OR)),
                })
                .collect();
            format!("{{{}}}", rendered.join(", "))
        }

        Expr::Attribute { value, attr } => {
            // '1.real' would lex as a float
            let base = match value.as_ref() {
                Expr::Constant(Constant::Int(_)) | Expr::Constant(Constant::Float(_)) => {
                    format!("({})", render_expr_inner(value))
                }
                _ => render_expr(value, PREC_PRIMARY),
            };
            format!("{base}.{attr}")
        }

        Expr::Subscript { value, index } => {
            let rendered_index = match index.as_ref() {
                Expr::Tuple(elements) if elements.len() > 1 => elements
                    .iter()
                    .map(|element| match element {
                        Expr::Slice { .. } => render_index(element),
                        _ => render_expr(element, PREC_TEST),
                    })
                    .collect::<Vec<String>>()
                    .join(", "),
                other => render_index(other),
            };
            format!("{}[{rendered_index}]", render_expr(value, PREC_PRIMARY))
        }

        Expr::Slice { .. } => render_index(expr),

        Expr::Call {
            func,
            args,
            keywords,
        } => {
            let mut parts: Vec<String> = args.iter().map(|arg| render_expr(arg, PREC_TEST)).collect();
            for keyword in keywords {
                match &keyword.name {
                    Some(name) => parts.push(format!("{name}={}", render_expr(&keyword.value, PREC_TEST))),
                    None => parts.push(format!("**{}", render_expr(&keyword.value, PREC_BIT_OR))),
                }
            }
            format!("{}({})", render_expr(func, PREC_PRIMARY), parts.join(", "))
        }

        Expr::Starred(value) => format!("*{}", render_expr(value, PREC_BIT_OR)),

        Expr::BinOp { left, op, right } => {
            let precedence = binary_precedence(*op);

            // Exponent is right associative and its right side may be unary
            let (left_precedence, right_precedence) = match op {
                BinaryOperator::Exponent => (PREC_POWER + 1, PREC_FACTOR),
                _ => (precedence, precedence + 1),
            };

            format!(
                "{} {} {}",
                render_expr(left, left_precedence),
                op.symbol(),
                render_expr(right, right_precedence)
            )
        }

        Expr::UnaryOp { op, operand } => match op {
            UnaryOperator::Not => format!("not {}", render_expr(operand, PREC_NOT)),
            UnaryOperator::Negative => format!("-{}", render_expr(operand, PREC_FACTOR)),
            UnaryOperator::Positive => format!("+{}", render_expr(operand, PREC_FACTOR)),
            UnaryOperator::Invert => format!("~{}", render_expr(operand, PREC_FACTOR)),
        },

        Expr::BoolOp { op, values } => {
            let (keyword, precedence) = match op {
                BoolOperator::And => (" and ", PREC_AND),
                BoolOperator::Or => (" or ", PREC_OR),
            };
            values
                .iter()
                .map(|value| render_expr(value, precedence + 1))
                .collect::<Vec<String>>()
                .join(keyword)
        }

        Expr::Compare {
            left,
            ops,
            comparators,
        } => {
            let mut rendered = render_expr(left, PREC_COMPARE + 1);
            for (op, comparator) in ops.iter().zip(comparators) {
                rendered.push(' ');
                rendered.push_str(op.symbol());
                rendered.push(' ');
                rendered.push_str(&render_expr(comparator, PREC_COMPARE + 1));
            }
            rendered
        }

        Expr::IfExp { test, body, orelse } => format!(
            "{} if {} else {}",
            render_expr(body, PREC_OR),
            render_expr(test, PREC_OR),
            render_expr(orelse, PREC_TEST)
        ),

        Expr::Yield(value) => match value {
            Some(value) => format!("yield {}", render_expr(value, PREC_TUPLE)),
            None => "yield".to_owned(),
        },
    }
}

fn render_index(index: &Expr) -> String {
    match index {
        Expr::Slice { lower, upper, step } => {
            let part = |bound: &Option<Box<Expr>>| match bound {
                Some(bound) => render_expr(bound, PREC_TEST),
                None => String::new(),
            };

            let mut rendered = format!("{}:{}", part(lower), part(upper));
            if step.is_some() {
                rendered.push(':');
                rendered.push_str(&part(step));
            }
            rendered
        }
        other => render_expr(other, PREC_TUPLE),
    }
}

pub fn render_constant(constant: &Constant) -> String {
    match constant {
        Constant::None => "None".to_owned(),
        Constant::Bool(true) => "True".to_owned(),
        Constant::Bool(false) => "False".to_owned(),

        // The most negative integer has no positive literal to negate
        Constant::Int(i64::MIN) => format!("({} - 1)", i64::MIN + 1),
        Constant::Int(value) => value.to_string(),

        Constant::Float(value) => {
            if value.is_infinite() {
                if value.is_sign_negative() {
                    return "-1e999".to_owned();
                }
                return "1e999".to_owned();
            }
            float_repr(*value)
        }

        Constant::Str(value) => string_repr(value),
    }
}

/// Shortest round-tripping float text, switching to exponent form
/// outside of 1e-4 <= |x| < 1e16 the way Python does
pub fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0.0" } else { "0.0" }.to_owned();
    }

    let scientific = format!("{value:e}");
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some(parts) => parts,
        None => return scientific,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..16).contains(&exponent) {
        let positional = format!("{value}");
        if positional.contains('.') {
            return positional;
        }
        return format!("{positional}.0");
    }

    let sign = if exponent < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exponent.abs())
}

/// Single quoted unless the string contains single quotes and no double quotes
pub fn string_repr(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut rendered = String::with_capacity(value.len() + 2);
    rendered.push(quote);

    for ch in value.chars() {
        match ch {
            '\\' => rendered.push_str("\\\\"),
            '\n' => rendered.push_str("\\n"),
            '\r' => rendered.push_str("\\r"),
            '\t' => rendered.push_str("\\t"),
            c if c == quote => {
                rendered.push('\\');
                rendered.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                rendered.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => rendered.push(c),
        }
    }

    rendered.push(quote);
    rendered
}

#[cfg(test)]
#[path = "tests/render_source_tests.rs"]
mod render_source_tests;
