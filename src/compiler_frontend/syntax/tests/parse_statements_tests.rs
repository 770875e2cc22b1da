use super::*;
use crate::compiler_frontend::compiler_errors::ErrorType;
use crate::compiler_frontend::syntax::ast_nodes::{BoolOperator, CompareOperator};

fn parse(source: &str) -> Vec<Stmt> {
    parse_module(source).expect("source should parse")
}

fn parse_error(source: &str) -> CompilerError {
    parse_module(source).expect_err("source should not parse")
}

fn only_function(source: &str) -> FunctionDef {
    match parse(source).into_iter().next().map(|stmt| stmt.kind) {
        Some(StmtKind::FunctionDef(def)) => def,
        other => panic!("expected a function definition, found {other:?}"),
    }
}

fn only_expression(source: &str) -> Expr {
    match parse(source).into_iter().next().map(|stmt| stmt.kind) {
        Some(StmtKind::Expr(expr)) => expr,
        other => panic!("expected an expression statement, found {other:?}"),
    }
}

#[test]
fn parameters_of_every_kind() {
    let def = only_function("def f(a, b=2, *args, c, d=4, **kw):\n    return a\n");

    assert_eq!(def.name, "f");
    assert_eq!(
        def.params
            .positional
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>(),
        vec!["a", "b"]
    );
    assert_eq!(def.params.positional[1].default, Some(Expr::int(2)));
    assert_eq!(def.params.vararg.as_deref(), Some("args"));
    assert_eq!(def.params.keyword_only.len(), 2);
    assert_eq!(def.params.keyword_only[0].default, None);
    assert_eq!(def.params.kwarg.as_deref(), Some("kw"));
    assert_eq!(def.params.names(), vec!["a", "b", "args", "c", "d", "kw"]);
}

#[test]
fn annotations_are_dropped() {
    let def = only_function("def f(a: int, b: str = 'x') -> int:\n    return a\n");

    assert_eq!(def.params.names(), vec!["a", "b"]);
    assert_eq!(def.params.positional[1].default, Some(Expr::string("x")));
}

#[test]
fn decorators_are_kept_in_order() {
    let def = only_function("@first\n@second(1)\ndef f():\n    pass\n");

    assert_eq!(def.decorators.len(), 2);
    assert_eq!(def.decorators[0], Expr::name("first"));
    assert_eq!(def.decorators[1], Expr::call(Expr::name("second"), vec![Expr::int(1)]));
}

#[test]
fn elif_becomes_a_nested_if() {
    let body = parse("if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n");

    let StmtKind::If { orelse, .. } = &body[0].kind else {
        panic!("expected an if statement");
    };
    assert_eq!(orelse.len(), 1);

    let StmtKind::If { test, orelse, .. } = &orelse[0].kind else {
        panic!("elif should be a nested if");
    };
    assert_eq!(test, &Expr::name("b"));
    assert_eq!(orelse.len(), 1);
}

#[test]
fn chained_assignment_keeps_every_target() {
    let body = parse("a = b = 1\n");

    let StmtKind::Assign { targets, value } = &body[0].kind else {
        panic!("expected an assignment");
    };
    assert_eq!(targets, &vec![Expr::name("a"), Expr::name("b")]);
    assert_eq!(value, &Expr::int(1));
}

#[test]
fn semicolons_and_same_line_blocks() {
    let body = parse("a = 1; b = 2\nif a: c = 3; d = 4\n");

    assert_eq!(body.len(), 3);
    let StmtKind::If { body, .. } = &body[2].kind else {
        panic!("expected an if statement");
    };
    assert_eq!(body.len(), 2);
}

#[test]
fn compound_statements_parse() {
    let body = parse(
        "for i, x in pairs:\n    pass\nelse:\n    done = True\n\
         while n > 0:\n    n -= 1\n\
         with open_it() as handle, other():\n    pass\n\
         try:\n    risky()\nexcept ValueError as e:\n    pass\nexcept:\n    raise\nelse:\n    ok = 1\nfinally:\n    cleanup()\n\
         class Point(Base):\n    x = 0\n",
    );

    assert!(matches!(&body[0].kind, StmtKind::For(for_loop) if matches!(for_loop.target, Expr::Tuple(_)) && for_loop.orelse.len() == 1));
    assert!(matches!(&body[1].kind, StmtKind::While { .. }));
    assert!(matches!(&body[2].kind, StmtKind::With { items, .. } if items.len() == 2 && items[0].target.is_some() && items[1].target.is_none()));

    let StmtKind::Try(try_block) = &body[3].kind else {
        panic!("expected a try statement");
    };
    assert_eq!(try_block.handlers.len(), 2);
    assert_eq!(try_block.handlers[0].name.as_deref(), Some("e"));
    assert_eq!(try_block.handlers[1].exception, None);
    assert_eq!(try_block.orelse.len(), 1);
    assert_eq!(try_block.finalbody.len(), 1);

    assert!(matches!(&body[4].kind, StmtKind::ClassDef(def) if def.name == "Point" && def.bases.len() == 1));
}

#[test]
fn operator_precedence() {
    let expr = only_expression("a or b and not c == d + e * f ** -g\n");

    let Expr::BoolOp { op: BoolOperator::Or, values } = expr else {
        panic!("'or' should bind loosest");
    };
    let Expr::BoolOp { op: BoolOperator::And, values } = &values[1] else {
        panic!("'and' should bind tighter than 'or'");
    };
    let Expr::UnaryOp { operand, .. } = &values[1] else {
        panic!("'not' should wrap the comparison");
    };
    let Expr::Compare { ops, comparators, .. } = operand.as_ref() else {
        panic!("comparison should bind tighter than 'not'");
    };
    assert_eq!(ops, &vec![CompareOperator::Equal]);
    assert!(matches!(
        &comparators[0],
        Expr::BinOp { op: BinaryOperator::Add, .. }
    ));
}

#[test]
fn exponent_is_right_associative() {
    let expr = only_expression("2 ** 3 ** 2\n");

    let Expr::BinOp { left, right, .. } = expr else {
        panic!("expected a binary operation");
    };
    assert_eq!(*left, Expr::int(2));
    assert!(matches!(
        *right,
        Expr::BinOp { op: BinaryOperator::Exponent, .. }
    ));
}

#[test]
fn comparison_chains_and_negated_operators() {
    let expr = only_expression("a < b <= c not in d is not e\n");

    let Expr::Compare { ops, comparators, .. } = expr else {
        panic!("expected a comparison");
    };
    assert_eq!(
        ops,
        vec![
            CompareOperator::LessThan,
            CompareOperator::LessThanOrEqual,
            CompareOperator::NotIn,
            CompareOperator::IsNot,
        ]
    );
    assert_eq!(comparators.len(), 4);
}

#[test]
fn call_arguments() {
    let expr = only_expression("f(1, *rest, key=2, **options)\n");

    let Expr::Call { args, keywords, .. } = expr else {
        panic!("expected a call");
    };
    assert_eq!(args.len(), 2);
    assert!(matches!(args[1], Expr::Starred(_)));
    assert_eq!(keywords[0].name.as_deref(), Some("key"));
    assert_eq!(keywords[1].name, None);
}

#[test]
fn displays_and_subscripts() {
    assert_eq!(only_expression("()\n"), Expr::Tuple(Vec::new()));
    assert_eq!(only_expression("(1,)\n"), Expr::Tuple(vec![Expr::int(1)]));
    assert_eq!(only_expression("(1)\n"), Expr::int(1));
    assert_eq!(only_expression("{}\n"), Expr::Dict(Vec::new()));
    assert!(matches!(only_expression("{1, 2}\n"), Expr::Set(elements) if elements.len() == 2));
    assert!(matches!(only_expression("{**a, 'k': 1}\n"), Expr::Dict(entries) if entries[0].0.is_none()));

    let Expr::Subscript { index, .. } = only_expression("x[1:]\n") else {
        panic!("expected a subscript");
    };
    assert!(matches!(
        *index,
        Expr::Slice { lower: Some(_), upper: None, step: None }
    ));

    let Expr::Subscript { index, .. } = only_expression("x[a, ::2]\n") else {
        panic!("expected a subscript");
    };
    assert!(matches!(*index, Expr::Tuple(elements) if elements.len() == 2));
}

#[test]
fn statement_locations_point_at_their_line() {
    let body = parse("x = 1\n\n\ny = 2\n");
    assert_eq!(body[0].location.start_pos.line_number, 0);
    assert_eq!(body[1].location.start_pos.line_number, 3);
}

#[test]
fn unsupported_syntax_is_reported() {
    assert!(parse_error("f = lambda x: x\n").msg.contains("Lambda"));
    assert!(parse_error("x = [y for y in z]\n").msg.contains("Comprehensions"));
    assert!(parse_error("import os\n").msg.contains("Import"));
    assert!(parse_error("def f():\n    yield from g()\n").msg.contains("yield from"));
    assert!(parse_error("raise A from B\n").msg.contains("raise ... from"));
}

#[test]
fn invalid_targets_are_rejected() {
    assert!(parse_error("1 = x\n").msg.contains("Cannot assign"));
    assert!(parse_error("f() += 1\n").msg.contains("Illegal target"));
    assert!(parse_error("del 3\n").msg.contains("Cannot assign"));
}

#[test]
fn malformed_definitions_are_rejected() {
    assert!(parse_error("def f(a, a):\n    pass\n").msg.contains("Duplicate parameter"));
    assert!(parse_error("def f(a=1, b):\n    pass\n").msg.contains("Non-default"));
    assert!(parse_error("def f(*a, *b):\n    pass\n").msg.contains("Only one '*'"));
    assert!(parse_error("f(a=1, 2)\n").msg.contains("Positional argument follows"));
    assert!(parse_error("try:\n    pass\nx = 1\n").msg.contains("'except' or 'finally'"));
}

#[test]
fn block_structure_errors() {
    let error = parse_error("if a:\nx = 1\n");
    assert_eq!(error.error_type, ErrorType::Syntax);
    assert!(error.msg.contains("indented block"));

    assert!(parse_error("  x = 1\n").msg.contains("Unexpected indent"));
    assert!(parse_error("x = 1 2\n").msg.contains("Expected end of statement"));

    let error = parse_error("x = 1\nif:\n    pass\n");
    assert_eq!(error.location.start_pos.line_number, 1);
}

#[test]
fn with_items_each_take_one_target() {
    let body = parse("with a() as h, b() as (x, y), c():\n    pass\n");

    let StmtKind::With { items, .. } = &body[0].kind else {
        panic!("expected a with statement");
    };
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].target, Some(Expr::name("h")));
    assert!(matches!(&items[1].target, Some(Expr::Tuple(elements)) if elements.len() == 2));
    assert_eq!(items[2].target, None);
    assert!(matches!(&items[2].context, Expr::Call { .. }));
}
