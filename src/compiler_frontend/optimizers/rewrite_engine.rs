//! The traversal every rewrite pass shares.
//!
//! A pass implements [`Transformer`] and overrides only the visits it cares about.
//! The default visits rebuild the tree unchanged while keeping the scope stack
//! up to date, so every pass sees the same picture of which names hold static values.

use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::compiler_warnings::{CompilerWarning, WarningKind};
use crate::compiler_frontend::optimizers::scope_stack::ScopeStack;
use crate::compiler_frontend::optimizers::static_resolver::{Binding, StaticResolver, Unresolved};
use crate::compiler_frontend::syntax::ast_nodes::{
    ClassDef, ExceptHandler, Expr, ForLoop, FunctionDef, Keyword, Parameter, Parameters, Stmt,
    StmtKind, TryBlock, WithItem,
};
use crate::compiler_frontend::syntax::render_source::render_expression;
use crate::compiler_frontend::syntax::syntax_queries::{
    call_argument_names, child_exprs, exits_only_at_tail, expr_any, root_name, stmt_exprs,
    target_names, written_names,
};
use crate::compiler_frontend::tokenizer::tokens::TextLocation;
use crate::compiler_frontend::values::value::{FoldError, Value, dict_insert};
use crate::{return_compiler_error, transform_log};
use rustc_hash::{FxHashMap, FxHashSet};

pub type Frame = FxHashMap<String, Binding>;

/// The outcome of visiting one statement
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    Keep,
    Replace(Stmt),
    Expand(Vec<Stmt>),
    Delete,
}

pub trait Transformer {
    fn visit_stmt(&mut self, stmt: &Stmt, ctx: &mut TransformContext) -> Result<Rewrite, CompilerError> {
        walk_stmt(self, stmt, ctx)
    }

    fn visit_for(
        &mut self,
        stmt: &Stmt,
        for_loop: &ForLoop,
        ctx: &mut TransformContext,
    ) -> Result<Rewrite, CompilerError> {
        walk_for(self, stmt, for_loop, ctx)
    }

    fn visit_while(
        &mut self,
        stmt: &Stmt,
        test: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
        ctx: &mut TransformContext,
    ) -> Result<Rewrite, CompilerError> {
        walk_while(self, stmt, test, body, orelse, ctx)
    }

    fn visit_if(
        &mut self,
        stmt: &Stmt,
        test: &Expr,
        body: &[Stmt],
        orelse: &[Stmt],
        ctx: &mut TransformContext,
    ) -> Result<Rewrite, CompilerError> {
        walk_if(self, stmt, test, body, orelse, ctx)
    }

    fn visit_inline_block(
        &mut self,
        stmt: &Stmt,
        label: &str,
        body: &[Stmt],
        ctx: &mut TransformContext,
    ) -> Result<Rewrite, CompilerError> {
        walk_inline_block(self, stmt, label, body, ctx)
    }

    fn visit_expr(&mut self, expr: &Expr, ctx: &mut TransformContext) -> Result<Expr, CompilerError> {
        walk_expr(self, expr, ctx)
    }

    /// Drop statements that follow an unconditional exit in the same block
    fn prunes_unreachable(&self) -> bool {
        false
    }
}

/// Everything a pass knows while it walks one function
pub struct TransformContext {
    pub scope: ScopeStack<Binding>,

    // Free variables of the function being transformed (closure values, then globals)
    pub symbols: FxHashMap<String, Value>,

    // Names the function body binds anywhere, hidden from nested function bodies
    pub local_names: FxHashSet<String>,

    // Names read somewhere other than inside the body of a loop that binds them
    pub read_outside_loops: FxHashSet<String>,

    // New globals the transformed function needs (deindexed elements, inlined callee globals)
    pub extra_globals: FxHashMap<String, Value>,

    warnings: Vec<CompilerWarning>,
    seen_warnings: FxHashSet<(WarningKind, String, TextLocation)>,
    preludes: Vec<Stmt>,
    deferred: usize,
    location: TextLocation,
}

impl TransformContext {
    pub fn new(symbols: FxHashMap<String, Value>) -> TransformContext {
        TransformContext {
            scope: ScopeStack::new(),
            symbols,
            local_names: FxHashSet::default(),
            read_outside_loops: FxHashSet::default(),
            extra_globals: FxHashMap::default(),
            warnings: Vec::new(),
            seen_warnings: FxHashSet::default(),
            preludes: Vec::new(),
            deferred: 0,
            location: TextLocation::default(),
        }
    }

    /// The location of the statement being visited
    pub fn location(&self) -> TextLocation {
        self.location
    }

    pub fn resolver(&self) -> StaticResolver<'_> {
        StaticResolver::new(&self.scope, &self.symbols)
    }

    /// Static value of an expression.
    /// Folds that would raise are reported once as warnings.
    pub fn resolve(&mut self, expr: &Expr) -> Option<Value> {
        let resolved = self.resolver().resolve(expr);
        match resolved {
            Ok(value) => Some(value),
            Err(Unresolved::Failed(error)) => {
                self.warn_fold_error(expr, &error);
                None
            }
            Err(Unresolved::Dynamic) => None,
        }
    }

    pub fn warn_fold_error(&mut self, expr: &Expr, error: &FoldError) {
        let msg = format!("'{}' raises {error}", render_expression(expr));
        self.warn(WarningKind::FoldError, &msg);
    }

    pub fn warn(&mut self, kind: WarningKind, msg: &str) {
        let key = (kind, msg.to_owned(), self.location);
        if self.seen_warnings.insert(key) {
            transform_log!(Yellow "Warning: ", msg);
            self.warnings.push(CompilerWarning::new(msg, self.location, kind));
        }
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn take_warnings(&mut self) -> Vec<CompilerWarning> {
        self.seen_warnings.clear();
        std::mem::take(&mut self.warnings)
    }

    /// True while visiting an expression that may not run exactly once, in order
    pub fn is_deferred(&self) -> bool {
        self.deferred > 0
    }

    /// Queues statements to run right before the statement being visited
    pub fn queue_preludes(&mut self, preludes: Vec<Stmt>) -> Result<(), CompilerError> {
        if self.is_deferred() {
            return_compiler_error!("Statements can't be hoisted out of a conditionally evaluated expression");
        }
        self.preludes.extend(preludes);
        Ok(())
    }

    // ------------------------------
    //  BINDINGS
    // ------------------------------

    /// Binds a name in the innermost frame.
    /// Display and alias bindings that read the name no longer hold.
    pub fn set_binding(&mut self, name: &str, binding: Binding) -> Result<(), CompilerError> {
        self.scope.set(name, binding)?;

        for (other, existing) in self.scope.items() {
            let stale = match &existing {
                Binding::Display(elements) => elements.iter().any(|element| reads_name(element, name)),
                Binding::Alias(expr) => reads_name(expr, name),
                _ => false,
            };
            if stale && other != name {
                self.scope.set(&other, Binding::Unknown)?;
            }
        }

        Ok(())
    }

    /// The binding an assignment of this (already rewritten) expression produces
    pub fn binding_for(&mut self, value: &Expr) -> Binding {
        if let Some(resolved) = self.resolve(value) {
            return Binding::Known(resolved);
        }

        match value {
            Expr::List(elements) | Expr::Tuple(elements)
                if !elements.iter().any(|element| matches!(element, Expr::Starred(_))) =>
            {
                Binding::Display(elements.to_owned())
            }
            _ => Binding::Unknown,
        }
    }

    /// Records an assignment to a target
    pub fn bind_target(&mut self, target: &Expr, binding: Binding) -> Result<(), CompilerError> {
        match target {
            Expr::Name(name) => self.set_binding(name, binding),

            Expr::Tuple(_) | Expr::List(_) | Expr::Starred(_) => {
                let mut names = Vec::new();
                target_names(target, &mut names);
                for name in names {
                    self.mark_mutated(name)?;
                }
                self.warn(
                    WarningKind::UnsupportedConstruct,
                    &format!(
                        "values assigned through '{}' are not tracked",
                        render_expression(target)
                    ),
                );
                Ok(())
            }

            Expr::Subscript { value, index } => self.store_item(value, index, binding),

            other => match root_name(other) {
                Some(root) => self.mark_mutated(root),
                None => Ok(()),
            },
        }
    }

    // `name[index] = value` into a locally known list or dict builds an updated copy.
    // Anything else makes the container unknown.
    fn store_item(&mut self, base: &Expr, index: &Expr, binding: Binding) -> Result<(), CompilerError> {
        let Expr::Name(name) = base else {
            return match root_name(base) {
                Some(root) => self.mark_mutated(root),
                None => Ok(()),
            };
        };

        let container = match self.scope.get(name) {
            Some(Binding::Known(value)) if value.is_mutable_container() => value.to_owned(),
            _ => return self.mark_mutated(name),
        };
        let (Some(key), Binding::Known(item)) = (self.resolve(index), binding) else {
            return self.mark_mutated(name);
        };

        let updated = match &container {
            Value::List(elements) => {
                let mut elements = elements.borrow().clone();
                let length = elements.len() as i64;
                match key.as_int() {
                    Some(position) if (-length..length).contains(&position) => {
                        let position = if position < 0 { position + length } else { position };
                        elements[position as usize] = item;
                        Value::list(elements)
                    }
                    _ => return self.mark_mutated(name),
                }
            }
            Value::Dict(entries) => {
                let mut entries = entries.borrow().clone();
                if dict_insert(&mut entries, key, item).is_err() {
                    return self.mark_mutated(name);
                }
                match Value::dict(entries) {
                    Ok(updated) => updated,
                    Err(_) => return self.mark_mutated(name),
                }
            }
            _ => return self.mark_mutated(name),
        };

        self.invalidate_sharing(&container)?;
        self.set_binding(name, Binding::Known(updated))
    }

    /// The name may have been rebound or its value changed in place
    pub fn mark_mutated(&mut self, name: &str) -> Result<(), CompilerError> {
        let current = self.resolver().resolve_name(name);
        if let Ok(value) = current
            && !value.is_immutable()
        {
            self.invalidate_sharing(&value)?;
        }

        self.set_binding(name, Binding::Unknown)
    }

    // Every visible name whose known value holds this object can see it change
    fn invalidate_sharing(&mut self, changed: &Value) -> Result<(), CompilerError> {
        for (name, binding) in self.scope.items() {
            if let Binding::Known(value) = binding
                && shares_object(&value, changed)
            {
                self.scope.set(&name, Binding::Unknown)?;
            }
        }
        Ok(())
    }

    /// Method calls on known objects and known objects passed to arbitrary calls
    /// may be mutated by the statement
    pub fn forget_mutated_by(&mut self, stmt: &Stmt) -> Result<(), CompilerError> {
        let mut mutated = Vec::new();
        for expr in stmt_exprs(stmt) {
            self.collect_mutated(expr, &mut mutated);
        }
        for name in mutated {
            self.mark_mutated(&name)?;
        }
        Ok(())
    }

    fn collect_mutated(&self, expr: &Expr, mutated: &mut Vec<String>) {
        if let Expr::Call {
            func,
            args,
            keywords,
        } = expr
        {
            let holds_object = |name: &str| {
                self.resolver()
                    .resolve_name(name)
                    .is_ok_and(|value| !value.is_immutable())
            };

            if let Expr::Attribute { value, .. } = func.as_ref()
                && let Some(receiver) = root_name(value)
                && holds_object(receiver)
            {
                mutated.push(receiver.to_owned());
            }

            let pure_call = matches!(
                self.resolver().resolve(func),
                Ok(Value::Builtin(builtin)) if builtin.is_pure()
            );
            if !pure_call {
                let passed = args
                    .iter()
                    .map(|arg| match arg {
                        Expr::Starred(inner) => inner.as_ref(),
                        other => other,
                    })
                    .chain(keywords.iter().map(|keyword| &keyword.value));
                for arg in passed {
                    if let Expr::Name(name) = arg
                        && holds_object(name)
                    {
                        mutated.push(name.to_owned());
                    }
                }
            }
        }

        for child in child_exprs(expr) {
            self.collect_mutated(child, mutated);
        }
    }

    /// Before a loop that may run zero or many times,
    /// everything its body could change becomes unknown
    pub fn forget_loop_writes(&mut self, target: Option<&Expr>, bodies: &[&[Stmt]]) -> Result<(), CompilerError> {
        let mut names: Vec<String> = Vec::new();
        if let Some(target) = target {
            let mut bound = Vec::new();
            target_names(target, &mut bound);
            if let Some(root) = root_name(target) {
                bound.push(root);
            }
            names.extend(bound.into_iter().map(str::to_owned));
        }

        for body in bodies {
            names.extend(written_names(body));
            for name in call_argument_names(body) {
                let holds_object = self
                    .resolver()
                    .resolve_name(&name)
                    .is_ok_and(|value| !value.is_immutable());
                if holds_object {
                    names.push(name);
                }
            }
        }

        names.sort();
        names.dedup();
        for name in names {
            self.mark_mutated(&name)?;
        }
        Ok(())
    }

    // ------------------------------
    //  FRAMES
    // ------------------------------

    /// Bindings made inside a block that ran exactly once carry on after it
    pub fn merge_frame(&mut self, frame: Frame) -> Result<(), CompilerError> {
        let mut names: Vec<(String, Binding)> = frame.into_iter().collect();
        names.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, binding) in names {
            self.set_binding(&name, binding)?;
        }
        Ok(())
    }

    /// Joins the two outcomes of a dynamic conditional.
    /// A name stays known only when both outcomes agree on its value.
    /// A branch that always exits contributes nothing.
    pub fn merge_branches(
        &mut self,
        body: (Frame, bool),
        orelse: (Frame, bool),
    ) -> Result<(), CompilerError> {
        let ((body_frame, body_exits), (orelse_frame, orelse_exits)) = (body, orelse);

        match (body_exits, orelse_exits) {
            (true, true) => Ok(()),
            (true, false) => self.merge_frame(orelse_frame),
            (false, true) => self.merge_frame(body_frame),
            (false, false) => {
                let mut names: Vec<&String> = body_frame.keys().chain(orelse_frame.keys()).collect();
                names.sort();
                names.dedup();

                let mut merged = Vec::with_capacity(names.len());
                for name in names {
                    let before = self.scope.get(name).cloned();
                    let from_body = body_frame.get(name).cloned().or_else(|| before.clone());
                    let from_orelse = orelse_frame.get(name).cloned().or(before);

                    let binding = match (from_body, from_orelse) {
                        (Some(a), Some(b)) if a == b => a,
                        _ => Binding::Unknown,
                    };
                    merged.push((name.to_owned(), binding));
                }

                for (name, binding) in merged {
                    self.set_binding(&name, binding)?;
                }
                Ok(())
            }
        }
    }

    /// A frame for a nested function body.
    /// Every local of the enclosing function may have changed by the time it runs.
    pub fn nested_function_frame(&self, params: &Parameters) -> Frame {
        let mut frame: Frame = self
            .scope
            .keys()
            .into_iter()
            .chain(self.local_names.iter().cloned())
            .map(|name| (name, Binding::Unknown))
            .collect();

        for name in params.names() {
            frame.insert(name.to_owned(), Binding::Unknown);
        }
        frame
    }
}

fn reads_name(expr: &Expr, name: &str) -> bool {
    expr_any(expr, &|child: &Expr| child.as_name() == Some(name))
}

// Whether `value` is, or contains, the mutable object `changed`
fn shares_object(value: &Value, changed: &Value) -> bool {
    if value == changed {
        return true;
    }

    match value {
        Value::Tuple(elements) => elements.iter().any(|element| shares_object(element, changed)),
        Value::List(elements) | Value::Set(elements) => elements
            .borrow()
            .iter()
            .any(|element| shares_object(element, changed)),
        Value::Dict(entries) => entries
            .borrow()
            .iter()
            .any(|(_, element)| shares_object(element, changed)),
        _ => false,
    }
}

pub fn ends_with_exit(body: &[Stmt]) -> bool {
    body.last().is_some_and(Stmt::is_unconditional_exit)
}

// ------------------------------
//  BLOCKS
// ------------------------------

/// Visits every statement of a block and flattens the results.
/// Statements queued as preludes land right before the statement that queued them.
pub fn walk_block<T: Transformer + ?Sized>(
    t: &mut T,
    body: &[Stmt],
    ctx: &mut TransformContext,
) -> Result<Vec<Stmt>, CompilerError> {
    let mut output = Vec::with_capacity(body.len());

    for stmt in body {
        let outer_location = std::mem::replace(&mut ctx.location, stmt.location);
        let outer_preludes = std::mem::take(&mut ctx.preludes);

        ctx.forget_mutated_by(stmt)?;
        let rewrite = t.visit_stmt(stmt, ctx);

        let preludes = std::mem::replace(&mut ctx.preludes, outer_preludes);
        ctx.location = outer_location;

        output.extend(preludes);
        match rewrite? {
            Rewrite::Keep => output.push(stmt.to_owned()),
            Rewrite::Replace(replacement) => output.push(replacement),
            Rewrite::Expand(replacements) => output.extend(replacements),
            Rewrite::Delete => {}
        }

        if t.prunes_unreachable() && ends_with_exit(&output) {
            break;
        }
    }

    Ok(output)
}

/// Visits a nested block in its own frame.
/// Returns the new statements and the bindings the block made.
pub fn walk_nested_block<T: Transformer + ?Sized>(
    t: &mut T,
    body: &[Stmt],
    seed: Frame,
    ctx: &mut TransformContext,
) -> Result<(Vec<Stmt>, Frame), CompilerError> {
    ctx.scope.push_frame(seed);
    let walked = walk_block(t, body, ctx);
    let frame = ctx.scope.pop()?;
    Ok((walked?, frame))
}

// ------------------------------
//  STATEMENTS
// ------------------------------

pub fn walk_stmt<T: Transformer + ?Sized>(
    t: &mut T,
    stmt: &Stmt,
    ctx: &mut TransformContext,
) -> Result<Rewrite, CompilerError> {
    let kind = match &stmt.kind {
        StmtKind::For(for_loop) => return t.visit_for(stmt, for_loop, ctx),
        StmtKind::While { test, body, orelse } => {
            return t.visit_while(stmt, test, body, orelse, ctx);
        }
        StmtKind::If { test, body, orelse } => return t.visit_if(stmt, test, body, orelse, ctx),
        StmtKind::InlineBlock { label, body } => {
            return t.visit_inline_block(stmt, label, body, ctx);
        }

        StmtKind::FunctionDef(def) => StmtKind::FunctionDef(walk_function_def(t, def, ctx)?),
        StmtKind::ClassDef(def) => StmtKind::ClassDef(walk_class_def(t, def, ctx)?),

        StmtKind::Return(value) => StmtKind::Return(walk_optional(t, value.as_ref(), ctx)?),
        StmtKind::Raise(value) => StmtKind::Raise(walk_optional(t, value.as_ref(), ctx)?),

        StmtKind::Delete(targets) => {
            let targets = walk_targets(t, targets, ctx)?;
            for target in &targets {
                match target {
                    Expr::Name(name) => ctx.set_binding(name, Binding::Unknown)?,
                    other => ctx.bind_target(other, Binding::Unknown)?,
                }
            }
            StmtKind::Delete(targets)
        }

        StmtKind::Assign { targets, value } => {
            let value = t.visit_expr(value, ctx)?;
            let targets = walk_targets(t, targets, ctx)?;
            let binding = ctx.binding_for(&value);
            for target in &targets {
                ctx.bind_target(target, binding.clone())?;
            }
            StmtKind::Assign { targets, value }
        }

        StmtKind::AugAssign { target, op, value } => {
            let target = walk_target(t, target, ctx)?;
            let value = t.visit_expr(value, ctx)?;

            match &target {
                Expr::Name(name) => {
                    let folded = match (ctx.resolve(&target), ctx.resolve(&value)) {
                        (Some(current), Some(operand)) => {
                            match current.evaluate_operator(&operand, *op) {
                                Ok(result) => Some(result),
                                Err(FoldError::Unrepresentable) => None,
                                Err(error) => {
                                    let expr = Expr::BinOp {
                                        left: Box::new(target.to_owned()),
                                        op: *op,
                                        right: Box::new(value.to_owned()),
                                    };
                                    ctx.warn_fold_error(&expr, &error);
                                    None
                                }
                            }
                        }
                        _ => None,
                    };

                    // `+=` on a list extends it in place
                    ctx.mark_mutated(name)?;
                    if let Some(result) = folded {
                        ctx.set_binding(name, Binding::Known(result))?;
                    }
                }
                other => {
                    if let Some(root) = root_name(other) {
                        ctx.mark_mutated(root)?;
                    }
                }
            }

            StmtKind::AugAssign {
                target,
                op: *op,
                value,
            }
        }

        StmtKind::With { items, body } => {
            let mut new_items = Vec::with_capacity(items.len());
            for item in items {
                let context = t.visit_expr(&item.context, ctx)?;
                let target = match &item.target {
                    Some(target) => {
                        let target = walk_target(t, target, ctx)?;
                        ctx.bind_target(&target, Binding::Unknown)?;
                        Some(target)
                    }
                    None => None,
                };
                new_items.push(WithItem { context, target });
            }

            let (body, frame) = walk_nested_block(t, body, Frame::default(), ctx)?;
            ctx.merge_frame(frame)?;
            StmtKind::With {
                items: new_items,
                body,
            }
        }

        StmtKind::Try(try_block) => StmtKind::Try(walk_try(t, try_block, ctx)?),

        StmtKind::Assert { test, msg } => {
            let test = t.visit_expr(test, ctx)?;
            let msg = match msg {
                Some(msg) => Some(visit_deferred(t, msg, ctx)?),
                None => None,
            };
            StmtKind::Assert { test, msg }
        }

        StmtKind::Global(names) | StmtKind::Nonlocal(names) => {
            for name in names {
                ctx.set_binding(name, Binding::Unknown)?;
            }
            return Ok(Rewrite::Keep);
        }

        StmtKind::Expr(expr) => StmtKind::Expr(t.visit_expr(expr, ctx)?),

        StmtKind::Pass | StmtKind::Break | StmtKind::Continue | StmtKind::ExitInline(_) => {
            return Ok(Rewrite::Keep);
        }
    };

    Ok(Rewrite::Replace(Stmt::new(kind, stmt.location)))
}

/// A loop that stays a loop: its body may run any number of times
pub fn walk_for<T: Transformer + ?Sized>(
    t: &mut T,
    stmt: &Stmt,
    for_loop: &ForLoop,
    ctx: &mut TransformContext,
) -> Result<Rewrite, CompilerError> {
    let iter = t.visit_expr(&for_loop.iter, ctx)?;
    walk_dynamic_for(t, stmt, iter, for_loop, ctx)
}

/// The rest of [`walk_for`], for passes that already visited the iterated expression
pub fn walk_dynamic_for<T: Transformer + ?Sized>(
    t: &mut T,
    stmt: &Stmt,
    iter: Expr,
    for_loop: &ForLoop,
    ctx: &mut TransformContext,
) -> Result<Rewrite, CompilerError> {
    let target = walk_target(t, &for_loop.target, ctx)?;
    ctx.forget_loop_writes(Some(&for_loop.target), &[&for_loop.body, &for_loop.orelse])?;

    let (body, _) = walk_nested_block(t, &for_loop.body, Frame::default(), ctx)?;
    let (orelse, _) = walk_nested_block(t, &for_loop.orelse, Frame::default(), ctx)?;

    Ok(Rewrite::Replace(Stmt::new(
        StmtKind::For(ForLoop {
            target,
            iter,
            body,
            orelse,
        }),
        stmt.location,
    )))
}

pub fn walk_while<T: Transformer + ?Sized>(
    t: &mut T,
    stmt: &Stmt,
    test: &Expr,
    body: &[Stmt],
    orelse: &[Stmt],
    ctx: &mut TransformContext,
) -> Result<Rewrite, CompilerError> {
    ctx.forget_loop_writes(None, &[body, orelse])?;

    // The test runs before every iteration
    let test = visit_deferred(t, test, ctx)?;
    let (body, _) = walk_nested_block(t, body, Frame::default(), ctx)?;
    let (orelse, _) = walk_nested_block(t, orelse, Frame::default(), ctx)?;

    Ok(Rewrite::Replace(Stmt::new(
        StmtKind::While { test, body, orelse },
        stmt.location,
    )))
}

/// A conditional whose outcome isn't known: both branches are visited and their bindings joined
pub fn walk_if<T: Transformer + ?Sized>(
    t: &mut T,
    stmt: &Stmt,
    test: &Expr,
    body: &[Stmt],
    orelse: &[Stmt],
    ctx: &mut TransformContext,
) -> Result<Rewrite, CompilerError> {
    let test = t.visit_expr(test, ctx)?;
    walk_dynamic_if(t, stmt, test, body, orelse, ctx)
}

/// The rest of [`walk_if`], for passes that already visited the test
pub fn walk_dynamic_if<T: Transformer + ?Sized>(
    t: &mut T,
    stmt: &Stmt,
    test: Expr,
    body: &[Stmt],
    orelse: &[Stmt],
    ctx: &mut TransformContext,
) -> Result<Rewrite, CompilerError> {
    let (body, body_frame) = walk_nested_block(t, body, Frame::default(), ctx)?;
    let (orelse, orelse_frame) = walk_nested_block(t, orelse, Frame::default(), ctx)?;

    ctx.merge_branches(
        (body_frame, ends_with_exit(&body)),
        (orelse_frame, ends_with_exit(&orelse)),
    )?;

    Ok(Rewrite::Replace(Stmt::new(
        StmtKind::If { test, body, orelse },
        stmt.location,
    )))
}

pub fn walk_inline_block<T: Transformer + ?Sized>(
    t: &mut T,
    stmt: &Stmt,
    label: &str,
    body: &[Stmt],
    ctx: &mut TransformContext,
) -> Result<Rewrite, CompilerError> {
    let (body, frame) = walk_nested_block(t, body, Frame::default(), ctx)?;

    if exits_only_at_tail(&body, label) {
        ctx.merge_frame(frame)?;
    } else {
        // An early exit may skip any of the later assignments
        let mut names: Vec<String> = frame.into_keys().collect();
        names.sort();
        for name in names {
            ctx.mark_mutated(&name)?;
        }
    }

    Ok(Rewrite::Replace(Stmt::new(
        StmtKind::InlineBlock {
            label: label.to_owned(),
            body,
        },
        stmt.location,
    )))
}

pub fn walk_function_def<T: Transformer + ?Sized>(
    t: &mut T,
    def: &FunctionDef,
    ctx: &mut TransformContext,
) -> Result<FunctionDef, CompilerError> {
    let decorators = walk_exprs(t, &def.decorators, ctx)?;
    let params = walk_parameters(t, &def.params, ctx)?;

    let frame = ctx.nested_function_frame(&def.params);
    let (body, _) = walk_nested_block(t, &def.body, frame, ctx)?;
    ctx.set_binding(&def.name, Binding::Unknown)?;

    Ok(FunctionDef {
        name: def.name.to_owned(),
        params,
        body,
        decorators,
        location: def.location,
    })
}

fn walk_parameters<T: Transformer + ?Sized>(
    t: &mut T,
    params: &Parameters,
    ctx: &mut TransformContext,
) -> Result<Parameters, CompilerError> {
    Ok(Parameters {
        positional: walk_parameter_list(t, &params.positional, ctx)?,
        vararg: params.vararg.to_owned(),
        keyword_only: walk_parameter_list(t, &params.keyword_only, ctx)?,
        kwarg: params.kwarg.to_owned(),
    })
}

// Defaults are evaluated once, where the def statement runs
fn walk_parameter_list<T: Transformer + ?Sized>(
    t: &mut T,
    list: &[Parameter],
    ctx: &mut TransformContext,
) -> Result<Vec<Parameter>, CompilerError> {
    let mut walked = Vec::with_capacity(list.len());
    for param in list {
        walked.push(Parameter {
            name: param.name.to_owned(),
            default: walk_optional(t, param.default.as_ref(), ctx)?,
        });
    }
    Ok(walked)
}

fn walk_class_def<T: Transformer + ?Sized>(
    t: &mut T,
    def: &ClassDef,
    ctx: &mut TransformContext,
) -> Result<ClassDef, CompilerError> {
    let decorators = walk_exprs(t, &def.decorators, ctx)?;
    let bases = walk_exprs(t, &def.bases, ctx)?;
    let (body, _) = walk_nested_block(t, &def.body, Frame::default(), ctx)?;
    ctx.set_binding(&def.name, Binding::Unknown)?;

    Ok(ClassDef {
        name: def.name.to_owned(),
        bases,
        body,
        decorators,
    })
}

// Any statement of the body may be the one that raised,
// so nothing it assigned is known in the handlers or afterwards
fn walk_try<T: Transformer + ?Sized>(
    t: &mut T,
    try_block: &TryBlock,
    ctx: &mut TransformContext,
) -> Result<TryBlock, CompilerError> {
    let (body, _) = walk_nested_block(t, &try_block.body, Frame::default(), ctx)?;
    ctx.forget_loop_writes(None, &[&try_block.body])?;

    let mut handlers = Vec::with_capacity(try_block.handlers.len());
    for handler in &try_block.handlers {
        // Only evaluated once something in the body raises
        let exception = match &handler.exception {
            Some(exception) => Some(visit_deferred(t, exception, ctx)?),
            None => None,
        };

        let mut seed = Frame::default();
        if let Some(name) = &handler.name {
            seed.insert(name.to_owned(), Binding::Unknown);
        }
        let (body, _) = walk_nested_block(t, &handler.body, seed, ctx)?;

        handlers.push(ExceptHandler {
            exception,
            name: handler.name.to_owned(),
            body,
        });
    }

    let (orelse, _) = walk_nested_block(t, &try_block.orelse, Frame::default(), ctx)?;

    let handler_bodies: Vec<&[Stmt]> = try_block
        .handlers
        .iter()
        .map(|handler| handler.body.as_slice())
        .chain(std::iter::once(try_block.orelse.as_slice()))
        .collect();
    ctx.forget_loop_writes(None, &handler_bodies)?;
    for name in try_block.handlers.iter().filter_map(|handler| handler.name.as_ref()) {
        ctx.set_binding(name, Binding::Unknown)?;
    }

    let (finalbody, frame) = walk_nested_block(t, &try_block.finalbody, Frame::default(), ctx)?;
    ctx.merge_frame(frame)?;

    Ok(TryBlock {
        body,
        handlers,
        orelse,
        finalbody,
    })
}

// ------------------------------
//  EXPRESSIONS
// ------------------------------

/// Rebuilds an expression from its visited children
pub fn walk_expr<T: Transformer + ?Sized>(
    t: &mut T,
    expr: &Expr,
    ctx: &mut TransformContext,
) -> Result<Expr, CompilerError> {
    let rewritten = match expr {
        Expr::Constant(_) | Expr::Name(_) => expr.to_owned(),

        Expr::Tuple(elements) => Expr::Tuple(walk_exprs(t, elements, ctx)?),
        Expr::List(elements) => Expr::List(walk_exprs(t, elements, ctx)?),
        Expr::Set(elements) => Expr::Set(walk_exprs(t, elements, ctx)?),
        Expr::Dict(entries) => {
            let mut new_entries = Vec::with_capacity(entries.len());
            for (key, value) in entries {
                let key = walk_optional(t, key.as_ref(), ctx)?;
                new_entries.push((key, t.visit_expr(value, ctx)?));
            }
            Expr::Dict(new_entries)
        }

        Expr::Attribute { value, attr } => Expr::Attribute {
            value: Box::new(t.visit_expr(value, ctx)?),
            attr: attr.to_owned(),
        },

        Expr::Subscript { value, index } => Expr::Subscript {
            value: Box::new(t.visit_expr(value, ctx)?),
            index: Box::new(t.visit_expr(index, ctx)?),
        },

        Expr::Slice { lower, upper, step } => Expr::Slice {
            lower: walk_optional(t, lower.as_deref(), ctx)?.map(Box::new),
            upper: walk_optional(t, upper.as_deref(), ctx)?.map(Box::new),
            step: walk_optional(t, step.as_deref(), ctx)?.map(Box::new),
        },

        Expr::Call {
            func,
            args,
            keywords,
        } => {
            let func = t.visit_expr(func, ctx)?;
            let args = walk_exprs(t, args, ctx)?;
            let mut new_keywords = Vec::with_capacity(keywords.len());
            for keyword in keywords {
                new_keywords.push(Keyword {
                    name: keyword.name.to_owned(),
                    value: t.visit_expr(&keyword.value, ctx)?,
                });
            }
            Expr::Call {
                func: Box::new(func),
                args,
                keywords: new_keywords,
            }
        }

        Expr::Starred(value) => Expr::Starred(Box::new(t.visit_expr(value, ctx)?)),

        Expr::BinOp { left, op, right } => Expr::BinOp {
            left: Box::new(t.visit_expr(left, ctx)?),
            op: *op,
            right: Box::new(t.visit_expr(right, ctx)?),
        },

        Expr::UnaryOp { op, operand } => Expr::UnaryOp {
            op: *op,
            operand: Box::new(t.visit_expr(operand, ctx)?),
        },

        // Only the first operand is certain to be evaluated
        Expr::BoolOp { op, values } => {
            let mut new_values = Vec::with_capacity(values.len());
            for (position, value) in values.iter().enumerate() {
                if position == 0 {
                    new_values.push(t.visit_expr(value, ctx)?);
                } else {
                    new_values.push(visit_deferred(t, value, ctx)?);
                }
            }
            Expr::BoolOp {
                op: *op,
                values: new_values,
            }
        }

        // Later links of a chain only run when the earlier ones hold
        Expr::Compare {
            left,
            ops,
            comparators,
        } => {
            let left = t.visit_expr(left, ctx)?;
            let mut new_comparators = Vec::with_capacity(comparators.len());
            for (position, comparator) in comparators.iter().enumerate() {
                if position == 0 {
                    new_comparators.push(t.visit_expr(comparator, ctx)?);
                } else {
                    new_comparators.push(visit_deferred(t, comparator, ctx)?);
                }
            }
            Expr::Compare {
                left: Box::new(left),
                ops: ops.to_owned(),
                comparators: new_comparators,
            }
        }

        Expr::IfExp { test, body, orelse } => Expr::IfExp {
            test: Box::new(t.visit_expr(test, ctx)?),
            body: Box::new(visit_deferred(t, body, ctx)?),
            orelse: Box::new(visit_deferred(t, orelse, ctx)?),
        },

        Expr::Yield(value) => Expr::Yield(walk_optional(t, value.as_deref(), ctx)?.map(Box::new)),
    };

    Ok(rewritten)
}

/// Visits an expression that may run zero or many times
pub fn visit_deferred<T: Transformer + ?Sized>(
    t: &mut T,
    expr: &Expr,
    ctx: &mut TransformContext,
) -> Result<Expr, CompilerError> {
    ctx.deferred += 1;
    let visited = t.visit_expr(expr, ctx);
    ctx.deferred -= 1;
    visited
}

pub fn walk_exprs<T: Transformer + ?Sized>(
    t: &mut T,
    exprs: &[Expr],
    ctx: &mut TransformContext,
) -> Result<Vec<Expr>, CompilerError> {
    exprs.iter().map(|expr| t.visit_expr(expr, ctx)).collect()
}

pub fn walk_optional<T: Transformer + ?Sized>(
    t: &mut T,
    expr: Option<&Expr>,
    ctx: &mut TransformContext,
) -> Result<Option<Expr>, CompilerError> {
    match expr {
        Some(expr) => Ok(Some(t.visit_expr(expr, ctx)?)),
        None => Ok(None),
    }
}

/// Assignment targets: bound names are left alone,
/// the expressions inside subscript and attribute targets are visited
pub fn walk_target<T: Transformer + ?Sized>(
    t: &mut T,
    target: &Expr,
    ctx: &mut TransformContext,
) -> Result<Expr, CompilerError> {
    let walked = match target {
        Expr::Name(_) => target.to_owned(),
        Expr::Tuple(elements) => Expr::Tuple(walk_targets(t, elements, ctx)?),
        Expr::List(elements) => Expr::List(walk_targets(t, elements, ctx)?),
        Expr::Starred(inner) => Expr::Starred(Box::new(walk_target(t, inner, ctx)?)),
        Expr::Attribute { value, attr } => Expr::Attribute {
            value: Box::new(walk_store_base(t, value, ctx)?),
            attr: attr.to_owned(),
        },
        Expr::Subscript { value, index } => Expr::Subscript {
            value: Box::new(walk_store_base(t, value, ctx)?),
            index: Box::new(t.visit_expr(index, ctx)?),
        },
        other => t.visit_expr(other, ctx)?,
    };

    Ok(walked)
}

pub fn walk_targets<T: Transformer + ?Sized>(
    t: &mut T,
    targets: &[Expr],
    ctx: &mut TransformContext,
) -> Result<Vec<Expr>, CompilerError> {
    targets
        .iter()
        .map(|target| walk_target(t, target, ctx))
        .collect()
}

// The object being stored into must stay the same object
fn walk_store_base<T: Transformer + ?Sized>(
    t: &mut T,
    base: &Expr,
    ctx: &mut TransformContext,
) -> Result<Expr, CompilerError> {
    match base {
        Expr::Name(_) => Ok(base.to_owned()),
        other => t.visit_expr(other, ctx),
    }
}
