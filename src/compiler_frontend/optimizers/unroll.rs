use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::optimizers::rewrite_engine::{
    Frame, Rewrite, TransformContext, Transformer, walk_block, walk_dynamic_for, walk_expr,
    walk_nested_block,
};
use crate::compiler_frontend::optimizers::static_resolver::Binding;
use crate::compiler_frontend::syntax::ast_nodes::{Expr, ForLoop, Stmt, StmtKind};
use crate::compiler_frontend::syntax::syntax_queries::{
    block_any, contains_loop_control, expr_any, read_names, written_names,
};
use crate::compiler_frontend::values::value::FoldError;
use crate::projects::settings::MAX_UNROLL_ITERATIONS;
use crate::transform_log;

/// Expands `for` loops over statically known sequences into one copy of the body per element.
///
/// Inside each copy, reads of the loop variable become the element itself:
/// a literal when the element is known, or the element's expression when it isn't.
/// Loops that can't be expanded are kept, but their bodies are still visited.
#[derive(Default)]
pub struct LoopUnroller {
    // Loop variables of the copies being visited, with the binding each copy gave them
    unrolled: Vec<(String, Binding)>,
}

impl LoopUnroller {
    pub fn new() -> Self {
        LoopUnroller::default()
    }

    /// The bindings the loop variable takes, one per copy.
    /// None when the loop has to stay a loop.
    fn element_bindings(
        &self,
        iter: &Expr,
        for_loop: &ForLoop,
        ctx: &mut TransformContext,
    ) -> Option<Vec<Binding>> {
        let target = for_loop.target.as_name()?;
        if contains_loop_control(&for_loop.body) || captured_by_definition(&for_loop.body, target) {
            return None;
        }

        if let Some(sequence) = ctx.resolve(iter) {
            let elements = match sequence.iterate() {
                Ok(elements) => elements,
                Err(FoldError::Unrepresentable) => return None,
                Err(error) => {
                    ctx.warn_fold_error(iter, &error);
                    return None;
                }
            };
            if elements.len() > MAX_UNROLL_ITERATIONS
                || !elements.iter().all(|element| element.is_literal_expressible())
            {
                return None;
            }
            return Some(elements.into_iter().map(Binding::Known).collect());
        }

        let elements = display_elements(iter, ctx)?;
        if elements.len() > MAX_UNROLL_ITERATIONS {
            return None;
        }

        // A body that rebinds a name the element expressions read would change them between copies
        let written = written_names(&for_loop.body);
        let reads_written = |expr: &Expr| {
            expr_any(expr, &|child: &Expr| {
                child.as_name().is_some_and(|name| written.contains(name))
            })
        };
        if elements.iter().any(reads_written) {
            return None;
        }

        let bindings = elements
            .into_iter()
            .map(|element| match ctx.resolve(&element) {
                Some(value) if value.is_literal_expressible() => Binding::Known(value),
                _ => Binding::Alias(element),
            })
            .collect();
        Some(bindings)
    }

    // What a read of an unrolled loop variable stands for in the current copy
    fn substitution(&self, name: &str, ctx: &TransformContext) -> Option<Expr> {
        let (_, copy_binding) = self.unrolled.iter().rev().find(|(unrolled, _)| unrolled == name)?;

        // The body may have rebound the variable since the copy started
        if ctx.scope.get(name) != Some(copy_binding) {
            return None;
        }

        binding_expr(copy_binding)
    }
}

// A function or class defined in the body reads the loop variable when it runs,
// which can be after later copies or after the loop
fn captured_by_definition(body: &[Stmt], name: &str) -> bool {
    block_any(body, &|stmt: &Stmt| match &stmt.kind {
        StmtKind::FunctionDef(def) => read_names(&def.body).contains(name),
        StmtKind::ClassDef(def) => read_names(&def.body).contains(name),
        _ => false,
    })
}

// The expression a binding stands for, when it can be written back
fn binding_expr(binding: &Binding) -> Option<Expr> {
    match binding {
        Binding::Known(value) => value.literal_expr(),
        Binding::Alias(expr) => Some(expr.to_owned()),
        _ => None,
    }
}

// A list or tuple display, or a name bound to one, whose elements aren't all static
fn display_elements(iter: &Expr, ctx: &TransformContext) -> Option<Vec<Expr>> {
    let elements = match iter {
        Expr::List(elements) | Expr::Tuple(elements) => elements.to_owned(),
        Expr::Name(name) => match ctx.scope.get(name) {
            Some(Binding::Display(elements)) => elements.to_owned(),
            _ => return None,
        },
        _ => return None,
    };

    if elements.iter().any(|element| matches!(element, Expr::Starred(_))) {
        return None;
    }
    Some(elements)
}

impl Transformer for LoopUnroller {
    fn visit_for(
        &mut self,
        stmt: &Stmt,
        for_loop: &ForLoop,
        ctx: &mut TransformContext,
    ) -> Result<Rewrite, CompilerError> {
        let iter = self.visit_expr(&for_loop.iter, ctx)?;

        let (Some(bindings), Expr::Name(target)) =
            (self.element_bindings(&iter, for_loop, ctx), &for_loop.target)
        else {
            return walk_dynamic_for(self, stmt, iter, for_loop, ctx);
        };

        // The loop variable keeps the last element after the loop
        let final_value = match bindings.last() {
            Some(last) if ctx.read_outside_loops.contains(target) => match binding_expr(last) {
                Some(value) => Some(value),
                None => return walk_dynamic_for(self, stmt, iter, for_loop, ctx),
            },
            _ => None,
        };

        transform_log!("Unrolling loop over ", bindings.len().to_string(), " elements into ", Cyan target);

        let mut copies = Vec::with_capacity(bindings.len() * for_loop.body.len());
        for binding in bindings {
            let mut seed = Frame::default();
            seed.insert(target.to_owned(), binding.clone());

            ctx.scope.push_frame(seed);
            self.unrolled.push((target.to_owned(), binding));
            let copy = walk_block(self, &for_loop.body, ctx);
            self.unrolled.pop();
            let mut frame = ctx.scope.pop()?;
            copies.extend(copy?);

            // Later copies see what earlier ones assigned
            frame.remove(target);
            ctx.merge_frame(frame)?;
        }

        match final_value {
            Some(value) => {
                let binding = ctx.binding_for(&value);
                copies.push(Stmt::new(
                    StmtKind::Assign {
                        targets: vec![Expr::name(target)],
                        value,
                    },
                    stmt.location,
                ));
                ctx.set_binding(target, binding)?;
            }

            // Nothing reads the variable after the loop, so the copies never assign it
            None => ctx.mark_mutated(target)?,
        }

        // Without a break the else clause always runs, once
        let (orelse, frame) = walk_nested_block(self, &for_loop.orelse, Frame::default(), ctx)?;
        ctx.merge_frame(frame)?;
        copies.extend(orelse);

        Ok(Rewrite::Expand(copies))
    }

    fn visit_expr(&mut self, expr: &Expr, ctx: &mut TransformContext) -> Result<Expr, CompilerError> {
        if let Expr::Name(name) = expr
            && let Some(substituted) = self.substitution(name, ctx)
        {
            return Ok(substituted);
        }

        walk_expr(self, expr, ctx)
    }
}
