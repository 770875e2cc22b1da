// Read-only questions about syntax trees, shared by the rewrite passes and the runtime
use crate::compiler_frontend::syntax::ast_nodes::{Expr, Parameters, Stmt, StmtKind};
use rustc_hash::FxHashSet;

/// Direct child expressions of an expression
pub fn child_exprs(expr: &Expr) -> Vec<&Expr> {
    match expr {
        Expr::Constant(_) | Expr::Name(_) => Vec::new(),
        Expr::Tuple(elements) | Expr::List(elements) | Expr::Set(elements) => {
            elements.iter().collect()
        }
        Expr::Dict(entries) => {
            let mut children = Vec::with_capacity(entries.len() * 2);
            for (key, value) in entries {
                if let Some(key) = key {
                    children.push(key);
                }
                children.push(value);
            }
            children
        }
        Expr::Attribute { value, .. } => vec![value.as_ref()],
        Expr::Subscript { value, index } => vec![value.as_ref(), index.as_ref()],
        Expr::Slice { lower, upper, step } => [lower, upper, step]
            .into_iter()
            .filter_map(|bound| bound.as_deref())
            .collect(),
        Expr::Call {
            func,
            args,
            keywords,
        } => {
            let mut children = vec![func.as_ref()];
            children.extend(args.iter());
            children.extend(keywords.iter().map(|keyword| &keyword.value));
            children
        }
        Expr::Starred(value) => vec![value.as_ref()],
        Expr::BinOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        Expr::UnaryOp { operand, .. } => vec![operand.as_ref()],
        Expr::BoolOp { values, .. } => values.iter().collect(),
        Expr::Compare {
            left, comparators, ..
        } => {
            let mut children = vec![left.as_ref()];
            children.extend(comparators.iter());
            children
        }
        Expr::IfExp { test, body, orelse } => vec![test.as_ref(), body.as_ref(), orelse.as_ref()],
        Expr::Yield(value) => value.iter().map(|value| value.as_ref()).collect(),
    }
}

/// Expressions owned directly by a statement (not those inside its nested bodies)
pub fn stmt_exprs(stmt: &Stmt) -> Vec<&Expr> {
    match &stmt.kind {
        StmtKind::FunctionDef(def) => {
            let mut exprs: Vec<&Expr> = def.decorators.iter().collect();
            exprs.extend(def.params.iter_with_defaults().filter_map(|p| p.default.as_ref()));
            exprs
        }
        StmtKind::ClassDef(def) => def.decorators.iter().chain(def.bases.iter()).collect(),
        StmtKind::Return(value) | StmtKind::Raise(value) => value.iter().collect(),
        StmtKind::Delete(targets) => targets.iter().collect(),
        StmtKind::Assign { targets, value } => {
            let mut exprs: Vec<&Expr> = targets.iter().collect();
            exprs.push(value);
            exprs
        }
        StmtKind::AugAssign { target, value, .. } => vec![target, value],
        StmtKind::For(for_loop) => vec![&for_loop.target, &for_loop.iter],
        StmtKind::While { test, .. } | StmtKind::If { test, .. } => vec![test],
        StmtKind::With { items, .. } => {
            let mut exprs = Vec::with_capacity(items.len() * 2);
            for item in items {
                exprs.push(&item.context);
                if let Some(target) = &item.target {
                    exprs.push(target);
                }
            }
            exprs
        }
        StmtKind::Try(try_block) => try_block
            .handlers
            .iter()
            .filter_map(|handler| handler.exception.as_ref())
            .collect(),
        StmtKind::Assert { test, msg } => {
            let mut exprs = vec![test];
            exprs.extend(msg.iter());
            exprs
        }
        StmtKind::Expr(expr) => vec![expr],
        StmtKind::Global(_)
        | StmtKind::Nonlocal(_)
        | StmtKind::Pass
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::InlineBlock { .. }
        | StmtKind::ExitInline(_) => Vec::new(),
    }
}

/// Nested statement sequences that run as part of this statement.
/// Function and class bodies are not included, they run somewhere else.
pub fn stmt_bodies(stmt: &Stmt) -> Vec<&[Stmt]> {
    match &stmt.kind {
        StmtKind::For(for_loop) => vec![&for_loop.body, &for_loop.orelse],
        StmtKind::While { body, orelse, .. } | StmtKind::If { body, orelse, .. } => {
            vec![body, orelse]
        }
        StmtKind::With { body, .. } | StmtKind::InlineBlock { body, .. } => vec![body],
        StmtKind::Try(try_block) => {
            let mut bodies: Vec<&[Stmt]> = vec![&try_block.body];
            bodies.extend(try_block.handlers.iter().map(|handler| handler.body.as_slice()));
            bodies.push(&try_block.orelse);
            bodies.push(&try_block.finalbody);
            bodies
        }
        _ => Vec::new(),
    }
}

/// True if any expression in the tree (this one included) matches
pub fn expr_any(expr: &Expr, predicate: &impl Fn(&Expr) -> bool) -> bool {
    predicate(expr) || child_exprs(expr).into_iter().any(|child| expr_any(child, predicate))
}

/// True if any statement in the block matches, looking through nested bodies
/// but not into nested function or class definitions
pub fn block_any(body: &[Stmt], predicate: &impl Fn(&Stmt) -> bool) -> bool {
    body.iter().any(|stmt| {
        predicate(stmt)
            || stmt_bodies(stmt)
                .into_iter()
                .any(|nested| block_any(nested, predicate))
    })
}

/// True if any expression owned by the block matches
pub fn block_any_expr(body: &[Stmt], predicate: &impl Fn(&Expr) -> bool) -> bool {
    block_any(body, &|stmt: &Stmt| {
        stmt_exprs(stmt)
            .into_iter()
            .any(|expr| expr_any(expr, predicate))
    })
}

pub fn contains_yield(body: &[Stmt]) -> bool {
    block_any_expr(body, &|expr: &Expr| matches!(expr, Expr::Yield(_)))
}

/// A 'break' or 'continue' that belongs to the loop owning this body
pub fn contains_loop_control(body: &[Stmt]) -> bool {
    body.iter().any(|stmt| match &stmt.kind {
        StmtKind::Break | StmtKind::Continue => true,

        // These belong to the inner loop, except inside its else clause
        StmtKind::For(for_loop) => contains_loop_control(&for_loop.orelse),
        StmtKind::While { orelse, .. } => contains_loop_control(orelse),

        _ => stmt_bodies(stmt)
            .into_iter()
            .any(contains_loop_control),
    })
}

/// A 'return' nested inside a loop of this body
pub fn contains_return_in_loop(body: &[Stmt]) -> bool {
    let is_return = |stmt: &Stmt| matches!(stmt.kind, StmtKind::Return(_));

    block_any(body, &|stmt: &Stmt| match &stmt.kind {
        StmtKind::For(for_loop) => {
            block_any(&for_loop.body, &is_return) || block_any(&for_loop.orelse, &is_return)
        }
        StmtKind::While { body, orelse, .. } => {
            block_any(body, &is_return) || block_any(orelse, &is_return)
        }
        _ => false,
    })
}

/// Exits of this inline block appear only as its very last statement
pub fn exits_only_at_tail(body: &[Stmt], label: &str) -> bool {
    let is_exit = |stmt: &Stmt| matches!(&stmt.kind, StmtKind::ExitInline(exit) if exit == label);

    match body.split_last() {
        Some((last, rest)) => {
            !block_any(rest, &is_exit)
                && stmt_bodies(last)
                    .into_iter()
                    .all(|nested| !block_any(nested, &is_exit))
        }
        None => true,
    }
}

/// The name at the root of an attribute or subscript chain
pub fn root_name(expr: &Expr) -> Option<&str> {
    match expr {
        Expr::Name(name) => Some(name),
        Expr::Attribute { value, .. } | Expr::Subscript { value, .. } => root_name(value),
        _ => None,
    }
}

/// Every plain name bound by an assignment target
pub fn target_names<'a>(target: &'a Expr, names: &mut Vec<&'a str>) {
    match target {
        Expr::Name(name) => names.push(name),
        Expr::Tuple(elements) | Expr::List(elements) => {
            for element in elements {
                target_names(element, names);
            }
        }
        Expr::Starred(inner) => target_names(inner, names),
        _ => {}
    }
}

/// Names a block may rebind or mutate when it runs.
/// Includes plain bindings, roots of attribute and subscript stores,
/// and receivers of method calls.
pub fn written_names(body: &[Stmt]) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    collect_written_names(body, &mut names);
    names
}

fn collect_target(target: &Expr, names: &mut FxHashSet<String>) {
    let mut bound = Vec::new();
    target_names(target, &mut bound);
    names.extend(bound.into_iter().map(str::to_owned));

    match target {
        Expr::Attribute { .. } | Expr::Subscript { .. } => {
            if let Some(root) = root_name(target) {
                names.insert(root.to_owned());
            }
        }
        Expr::Tuple(elements) | Expr::List(elements) => {
            for element in elements {
                collect_target(element, names);
            }
        }
        Expr::Starred(inner) => collect_target(inner, names),
        _ => {}
    }
}

fn collect_written_names(body: &[Stmt], names: &mut FxHashSet<String>) {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    collect_target(target, names);
                }
            }
            StmtKind::AugAssign { target, .. } => collect_target(target, names),
            StmtKind::Delete(targets) => {
                for target in targets {
                    collect_target(target, names);
                }
            }
            StmtKind::For(for_loop) => collect_target(&for_loop.target, names),
            StmtKind::With { items, .. } => {
                for target in items.iter().filter_map(|item| item.target.as_ref()) {
                    collect_target(target, names);
                }
            }
            StmtKind::Try(try_block) => {
                names.extend(
                    try_block
                        .handlers
                        .iter()
                        .filter_map(|handler| handler.name.clone()),
                );
            }
            StmtKind::FunctionDef(def) => {
                names.insert(def.name.to_owned());
            }
            StmtKind::ClassDef(def) => {
                names.insert(def.name.to_owned());
            }
            StmtKind::Global(declared) | StmtKind::Nonlocal(declared) => {
                names.extend(declared.iter().cloned());
            }
            _ => {}
        }

        for expr in stmt_exprs(stmt) {
            collect_method_receivers(expr, names);
        }

        for nested in stmt_bodies(stmt) {
            collect_written_names(nested, names);
        }
    }
}

fn collect_method_receivers(expr: &Expr, names: &mut FxHashSet<String>) {
    if let Expr::Call { func, .. } = expr
        && let Expr::Attribute { value, .. } = func.as_ref()
        && let Some(root) = root_name(value)
    {
        names.insert(root.to_owned());
    }

    for child in child_exprs(expr) {
        collect_method_receivers(child, names);
    }
}

/// Names a function body binds locally: parameters, assignment and loop targets,
/// `del` targets, handler names and nested definitions, minus `global` and `nonlocal` declarations
pub fn local_names(params: &Parameters, body: &[Stmt]) -> FxHashSet<String> {
    let mut names: FxHashSet<String> = params.names().into_iter().map(str::to_owned).collect();
    let mut declared = FxHashSet::default();
    collect_local_names(body, &mut names, &mut declared);

    names.retain(|name| !declared.contains(name));
    names
}

fn collect_local_names(body: &[Stmt], names: &mut FxHashSet<String>, declared: &mut FxHashSet<String>) {
    for stmt in body {
        let mut bound = Vec::new();
        match &stmt.kind {
            StmtKind::Assign { targets, .. } | StmtKind::Delete(targets) => {
                for target in targets {
                    target_names(target, &mut bound);
                }
            }
            StmtKind::AugAssign { target, .. } => target_names(target, &mut bound),
            StmtKind::For(for_loop) => target_names(&for_loop.target, &mut bound),
            StmtKind::With { items, .. } => {
                for target in items.iter().filter_map(|item| item.target.as_ref()) {
                    target_names(target, &mut bound);
                }
            }
            StmtKind::Try(try_block) => {
                bound.extend(try_block.handlers.iter().filter_map(|handler| handler.name.as_deref()));
            }
            StmtKind::FunctionDef(def) => bound.push(&def.name),
            StmtKind::ClassDef(def) => bound.push(&def.name),
            StmtKind::Global(globals) | StmtKind::Nonlocal(globals) => {
                declared.extend(globals.iter().cloned());
            }
            _ => {}
        }
        names.extend(bound.into_iter().map(str::to_owned));

        for nested in stmt_bodies(stmt) {
            collect_local_names(nested, names, declared);
        }
    }
}

/// Names passed directly as arguments to calls anywhere in the block
pub fn call_argument_names(body: &[Stmt]) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    collect_call_arguments_in_block(body, &mut names);
    names
}

fn collect_call_arguments_in_block(body: &[Stmt], names: &mut FxHashSet<String>) {
    for stmt in body {
        for expr in stmt_exprs(stmt) {
            collect_call_arguments(expr, names);
        }
        for nested in stmt_bodies(stmt) {
            collect_call_arguments_in_block(nested, names);
        }
    }
}

fn collect_call_arguments(expr: &Expr, names: &mut FxHashSet<String>) {
    if let Expr::Call { args, keywords, .. } = expr {
        let passed = args
            .iter()
            .map(|arg| match arg {
                Expr::Starred(inner) => inner.as_ref(),
                other => other,
            })
            .chain(keywords.iter().map(|keyword| &keyword.value));

        for arg in passed {
            if let Expr::Name(name) = arg {
                names.insert(name.to_owned());
            }
        }
    }

    for child in child_exprs(expr) {
        collect_call_arguments(child, names);
    }
}

/// Names read anywhere in the block, nested function and class bodies included
pub fn read_names(body: &[Stmt]) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    collect_block_reads(body, &mut Vec::new(), false, &mut names);
    names
}

/// Names read anywhere in the block, except reads of a `for` loop variable
/// inside the body of the loop that binds it.
/// A name in this set may observe the value a loop left behind.
pub fn names_read_outside_their_loops(body: &[Stmt]) -> FxHashSet<String> {
    let mut names = FxHashSet::default();
    collect_block_reads(body, &mut Vec::new(), true, &mut names);
    names
}

fn collect_block_reads(
    body: &[Stmt],
    loop_variables: &mut Vec<String>,
    skip_loop_variables: bool,
    names: &mut FxHashSet<String>,
) {
    for stmt in body {
        let mut reads = Vec::new();
        match &stmt.kind {
            StmtKind::Assign { targets, value } => {
                for target in targets {
                    target_reads(target, &mut reads);
                }
                reads.push(value);
            }
            StmtKind::For(for_loop) => {
                target_reads(&for_loop.target, &mut reads);
                reads.push(&for_loop.iter);
            }
            StmtKind::With { items, .. } => {
                for item in items {
                    reads.push(&item.context);
                    if let Some(target) = &item.target {
                        target_reads(target, &mut reads);
                    }
                }
            }

            // `x += 1` and `del x` both need x bound
            _ => reads.extend(stmt_exprs(stmt)),
        }

        for expr in reads {
            collect_expr_reads(expr, loop_variables, skip_loop_variables, names);
        }

        match &stmt.kind {
            StmtKind::FunctionDef(def) => {
                collect_block_reads(&def.body, loop_variables, skip_loop_variables, names);
            }
            StmtKind::ClassDef(def) => {
                collect_block_reads(&def.body, loop_variables, skip_loop_variables, names);
            }
            StmtKind::For(for_loop) => {
                let variable = for_loop.target.as_name().map(str::to_owned);
                let pushed = variable.is_some();
                loop_variables.extend(variable);
                collect_block_reads(&for_loop.body, loop_variables, skip_loop_variables, names);
                if pushed {
                    loop_variables.pop();
                }

                // The else clause sees the value the loop left behind
                collect_block_reads(&for_loop.orelse, loop_variables, skip_loop_variables, names);
            }
            _ => {
                for nested in stmt_bodies(stmt) {
                    collect_block_reads(nested, loop_variables, skip_loop_variables, names);
                }
            }
        }
    }
}

// Parts of an assignment target that are evaluated: everything but the names it binds
fn target_reads<'a>(target: &'a Expr, reads: &mut Vec<&'a Expr>) {
    match target {
        Expr::Name(_) => {}
        Expr::Tuple(elements) | Expr::List(elements) => {
            for element in elements {
                target_reads(element, reads);
            }
        }
        Expr::Starred(inner) => target_reads(inner, reads),
        other => reads.push(other),
    }
}

fn collect_expr_reads(
    expr: &Expr,
    loop_variables: &[String],
    skip_loop_variables: bool,
    names: &mut FxHashSet<String>,
) {
    if let Expr::Name(name) = expr
        && !(skip_loop_variables && loop_variables.contains(name))
    {
        names.insert(name.to_owned());
    }

    for child in child_exprs(expr) {
        collect_expr_reads(child, loop_variables, skip_loop_variables, names);
    }
}
