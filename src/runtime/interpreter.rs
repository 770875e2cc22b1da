//! Tree walking evaluation of parsed modules and functions.
//!
//! Runtime exceptions are `ErrorType::Runtime` errors carrying the exception class,
//! so they travel through `?` like every other error until a `try` catches them.

use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::optimizers::static_resolver::mapping_to_keywords;
use crate::compiler_frontend::syntax::ast_nodes::{
    BinaryOperator, BoolOperator, ExceptHandler, Expr, FunctionDef, Keyword, Stmt,
    StmtKind, TryBlock,
};
use crate::compiler_frontend::syntax::syntax_queries::stmt_bodies;
use crate::compiler_frontend::values::builtins::{Builtin, call_method, exception_matches, new_exception};
use crate::compiler_frontend::values::value::{FoldError, Value, dict_insert};
use crate::projects::settings::MAX_CALL_DEPTH;
use crate::runtime::Namespace;
use crate::runtime::function::{BoundArgument, Function, bind_arguments};
use crate::{return_runtime_error, runtime_log};
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::rc::Rc;

/// How a statement finished
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
    ExitInline(String),
}

pub struct Interpreter {
    globals: Namespace,
    enclosing: Vec<Namespace>,

    // None at module level, where assignments go to the globals
    locals: Option<Namespace>,

    declared_global: FxHashSet<String>,
    declared_nonlocal: FxHashSet<String>,

    // Values yielded so far, when running a generator body
    yielded: Option<Vec<Value>>,

    // Exceptions whose handlers are running, for bare `raise`
    handling: Vec<CompilerError>,

    depth: usize,
}

/// Runs a module's top level statements into its globals
pub fn run_module(body: &[Stmt], globals: Namespace) -> Result<(), CompilerError> {
    let mut interpreter = Interpreter {
        globals,
        enclosing: Vec::new(),
        locals: None,
        declared_global: FxHashSet::default(),
        declared_nonlocal: FxHashSet::default(),
        yielded: None,
        handling: Vec::new(),
        depth: 0,
    };

    match interpreter.exec_block(body)? {
        Flow::Normal => Ok(()),
        flow => return_runtime_error!(
            "SyntaxError",
            format!("'{}' outside function", flow_keyword(&flow))
        ),
    }
}

pub fn call_function(
    function: &Function,
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
    depth: usize,
) -> Result<Value, CompilerError> {
    if depth > MAX_CALL_DEPTH {
        return_runtime_error!("RecursionError", "maximum recursion depth exceeded");
    }

    runtime_log!("Calling ", Cyan function.name(), " at depth ", depth.to_string());

    let bound = bind_arguments(
        function.name(),
        function.params(),
        |name| function.defaults.contains_key(name),
        positional,
        keywords,
    )
    .map_err(|error| CompilerError::new_runtime_error("TypeError", error.msg))?;

    let mut locals = FxHashMap::default();
    for (name, argument) in bound {
        let value = match argument {
            BoundArgument::Passed(value) => value,
            BoundArgument::Default => function.defaults.get(&name).cloned().unwrap_or(Value::None),
        };
        locals.insert(name, value);
    }

    let mut declared_global = FxHashSet::default();
    let mut declared_nonlocal = FxHashSet::default();
    collect_declarations(&function.def.body, &mut declared_global, &mut declared_nonlocal);

    let mut interpreter = Interpreter {
        globals: function.globals.clone(),
        enclosing: function.enclosing.clone(),
        locals: Some(Rc::new(RefCell::new(locals))),
        declared_global,
        declared_nonlocal,
        yielded: function.is_generator().then(Vec::new),
        handling: Vec::new(),
        depth,
    };

    let flow = interpreter.exec_block(&function.def.body)?;
    if let Some(yielded) = interpreter.yielded.take() {
        return Ok(Value::list(yielded));
    }

    match flow {
        Flow::Return(value) => Ok(value),
        Flow::Normal => Ok(Value::None),
        other => return_runtime_error!(
            "SyntaxError",
            format!("'{}' outside loop", flow_keyword(&other))
        ),
    }
}

fn collect_declarations(body: &[Stmt], globals: &mut FxHashSet<String>, nonlocals: &mut FxHashSet<String>) {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Global(names) => globals.extend(names.iter().cloned()),
            StmtKind::Nonlocal(names) => nonlocals.extend(names.iter().cloned()),
            _ => {}
        }
        for nested in stmt_bodies(stmt) {
            collect_declarations(nested, globals, nonlocals);
        }
    }
}

fn flow_keyword(flow: &Flow) -> &'static str {
    match flow {
        Flow::Break => "break",
        Flow::Continue => "continue",
        Flow::Return(_) => "return",
        Flow::ExitInline(_) | Flow::Normal => "exit",
    }
}

fn fold(error: FoldError) -> CompilerError {
    error.into_runtime_error()
}

impl Interpreter {
    // ------------------------------
    //  STATEMENTS
    // ------------------------------

    pub fn exec_block(&mut self, body: &[Stmt]) -> Result<Flow, CompilerError> {
        for stmt in body {
            let flow = self
                .exec_stmt(stmt)
                .map_err(|error| error.with_location(stmt.location))?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, CompilerError> {
        match &stmt.kind {
            StmtKind::FunctionDef(def) => {
                let function = self.define_function(def)?;
                self.store_name(&def.name, function)?;
            }

            StmtKind::ClassDef(def) => {
                return_runtime_error!(
                    "NotImplementedError",
                    format!("class '{}': class definitions are not supported at run time", def.name)
                );
            }

            StmtKind::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }

            StmtKind::Delete(targets) => {
                for target in targets {
                    self.delete(target)?;
                }
            }

            StmtKind::Assign { targets, value } => {
                let value = self.eval(value)?;
                for target in targets {
                    self.assign(target, value.clone())?;
                }
            }

            StmtKind::AugAssign { target, op, value } => self.exec_aug_assign(target, *op, value)?,

            StmtKind::For(for_loop) => {
                let items = self.eval(&for_loop.iter)?.iterate().map_err(fold)?;
                let mut broke = false;
                for item in items {
                    self.assign(&for_loop.target, item)?;
                    match self.exec_block(&for_loop.body)? {
                        Flow::Normal | Flow::Continue => {}
                        Flow::Break => {
                            broke = true;
                            break;
                        }
                        exit => return Ok(exit),
                    }
                }
                if !broke {
                    return self.exec_block(&for_loop.orelse);
                }
            }

            StmtKind::While { test, body, orelse } => loop {
                if !self.eval(test)?.is_truthy() {
                    return self.exec_block(orelse);
                }
                match self.exec_block(body)? {
                    Flow::Normal | Flow::Continue => {}
                    Flow::Break => break,
                    exit => return Ok(exit),
                }
            },

            StmtKind::If { test, body, orelse } => {
                return if self.eval(test)?.is_truthy() {
                    self.exec_block(body)
                } else {
                    self.exec_block(orelse)
                };
            }

            StmtKind::With { .. } => {
                return_runtime_error!(
                    "NotImplementedError",
                    "'with' statements are not supported at run time"
                );
            }

            StmtKind::Raise(exception) => return Err(self.raise(exception.as_ref())?),

            StmtKind::Try(try_block) => return self.exec_try(try_block),

            StmtKind::Assert { test, msg } => {
                if !self.eval(test)?.is_truthy() {
                    let msg = match msg {
                        Some(msg) => self.eval(msg)?.display_str(),
                        None => String::new(),
                    };
                    return_runtime_error!("AssertionError", msg);
                }
            }

            // Collected before the body runs
            StmtKind::Global(_) | StmtKind::Nonlocal(_) => {}

            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }

            StmtKind::Pass => {}
            StmtKind::Break => return Ok(Flow::Break),
            StmtKind::Continue => return Ok(Flow::Continue),

            StmtKind::InlineBlock { label, body } => {
                return match self.exec_block(body)? {
                    Flow::ExitInline(exit) if exit == *label => Ok(Flow::Normal),
                    flow => Ok(flow),
                };
            }
            StmtKind::ExitInline(label) => return Ok(Flow::ExitInline(label.to_owned())),
        }

        Ok(Flow::Normal)
    }

    fn define_function(&mut self, def: &FunctionDef) -> Result<Value, CompilerError> {
        let decorators = def
            .decorators
            .iter()
            .map(|decorator| self.eval(decorator))
            .collect::<Result<Vec<Value>, CompilerError>>()?;

        let mut defaults = FxHashMap::default();
        for param in def.params.iter_with_defaults() {
            if let Some(default) = &param.default {
                defaults.insert(param.name.to_owned(), self.eval(default)?);
            }
        }

        let mut enclosing = self.enclosing.clone();
        if let Some(locals) = &self.locals {
            enclosing.push(locals.clone());
        }

        let mut function = Value::Function(Rc::new(Function::new(
            Rc::new(def.to_owned()),
            self.globals.clone(),
            enclosing,
            defaults,
        )));

        for decorator in decorators.into_iter().rev() {
            function = self.call_value(&decorator, vec![function], Vec::new())?;
        }
        Ok(function)
    }

    fn exec_aug_assign(&mut self, target: &Expr, op: BinaryOperator, value: &Expr) -> Result<(), CompilerError> {
        match target {
            Expr::Name(name) => {
                let current = self.load_name(name)?;
                let operand = self.eval(value)?;
                let result = self.augmented(&current, op, &operand)?;
                self.store_name(name, result)
            }
            Expr::Subscript { value: base, index } => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                let current = base.subscript(&index).map_err(fold)?;
                let operand = self.eval(value)?;
                let result = self.augmented(&current, op, &operand)?;
                store_item(&base, index, result)
            }
            Expr::Attribute { value: base, attr } => {
                let base = self.eval(base)?;
                let current = base.get_attribute(attr).map_err(fold)?;
                let operand = self.eval(value)?;
                let result = self.augmented(&current, op, &operand)?;
                store_attribute(&base, attr, result)
            }
            other => return_runtime_error!(
                "SyntaxError",
                format!("'{}' is an illegal expression for augmented assignment", other_kind(other))
            ),
        }
    }

    // `list += iterable` extends the list in place, everything else builds a new value
    fn augmented(&self, current: &Value, op: BinaryOperator, operand: &Value) -> Result<Value, CompilerError> {
        if let (Value::List(elements), BinaryOperator::Add) = (current, op) {
            let items = operand.iterate().map_err(fold)?;
            elements.borrow_mut().extend(items);
            return Ok(current.clone());
        }
        current.evaluate_operator(operand, op).map_err(fold)
    }

    fn exec_try(&mut self, try_block: &TryBlock) -> Result<Flow, CompilerError> {
        let outcome = match self.exec_block(&try_block.body) {
            Ok(Flow::Normal) => self.exec_block(&try_block.orelse),
            Ok(flow) => Ok(flow),
            Err(error) if error.exception_type().is_some() => self.handle(error, &try_block.handlers),
            Err(error) => Err(error),
        };

        if try_block.finalbody.is_empty() {
            return outcome;
        }

        // An exit inside finally wins over whatever the body did
        match self.exec_block(&try_block.finalbody)? {
            Flow::Normal => outcome,
            flow => Ok(flow),
        }
    }

    fn handle(&mut self, error: CompilerError, handlers: &[ExceptHandler]) -> Result<Flow, CompilerError> {
        let raised = error.exception_type().unwrap_or("Exception").to_owned();

        for handler in handlers {
            let matches = match &handler.exception {
                None => true,
                Some(exception) => {
                    let class = self.eval(exception)?;
                    handler_matches(&raised, &class)?
                }
            };
            if !matches {
                continue;
            }

            runtime_log!("Caught ", Yellow raised);
            if let Some(name) = &handler.name {
                let args = if error.msg.is_empty() {
                    Vec::new()
                } else {
                    vec![Value::Str(error.msg.to_owned())]
                };
                self.store_name(name, new_exception(&raised, args))?;
            }

            self.handling.push(error);
            let flow = self.exec_block(&handler.body);
            self.handling.pop();

            if let Some(name) = &handler.name {
                self.forget_name(name);
            }
            return flow;
        }

        Err(error)
    }

    fn raise(&mut self, exception: Option<&Expr>) -> Result<CompilerError, CompilerError> {
        let Some(exception) = exception else {
            return match self.handling.last() {
                Some(active) => Ok(active.to_owned()),
                None => Ok(CompilerError::new_runtime_error(
                    "RuntimeError",
                    "No active exception to reraise",
                )),
            };
        };

        let raised = match self.eval(exception)? {
            Value::Builtin(Builtin::Exception(class)) => CompilerError::new_runtime_error(class, ""),
            Value::Object(object)
                if Builtin::from_name(&object.class_name).is_some_and(|builtin| builtin.is_exception()) =>
            {
                let msg = Value::Object(object.clone()).display_str();
                CompilerError::new_runtime_error(&object.class_name, msg)
            }
            _ => CompilerError::new_runtime_error("TypeError", "exceptions must derive from BaseException"),
        };
        Ok(raised)
    }

    // ------------------------------
    //  TARGETS
    // ------------------------------

    fn assign(&mut self, target: &Expr, value: Value) -> Result<(), CompilerError> {
        match target {
            Expr::Name(name) => self.store_name(name, value),

            Expr::Tuple(elements) | Expr::List(elements) => {
                let items = value.iterate().map_err(fold)?;
                self.unpack(elements, items)
            }

            Expr::Subscript { value: base, index } => {
                let base = self.eval(base)?;
                let index = self.eval(index)?;
                store_item(&base, index, value)
            }

            Expr::Attribute { value: base, attr } => {
                let base = self.eval(base)?;
                store_attribute(&base, attr, value)
            }

            other => return_runtime_error!(
                "SyntaxError",
                format!("cannot assign to {}", other_kind(other))
            ),
        }
    }

    fn unpack(&mut self, targets: &[Expr], items: Vec<Value>) -> Result<(), CompilerError> {
        let starred = targets.iter().position(|target| matches!(target, Expr::Starred(_)));

        match starred {
            None => {
                if items.len() != targets.len() {
                    return_runtime_error!("ValueError", unpack_message(targets.len(), items.len()));
                }
                for (target, item) in targets.iter().zip(items) {
                    self.assign(target, item)?;
                }
            }
            Some(star) => {
                let after = targets.len() - star - 1;
                if items.len() < star + after {
                    return_runtime_error!(
                        "ValueError",
                        format!(
                            "not enough values to unpack (expected at least {}, got {})",
                            star + after,
                            items.len()
                        )
                    );
                }

                let mut items = items;
                let tail = items.split_off(items.len() - after);
                let middle = items.split_off(star);
                for (target, item) in targets[..star].iter().zip(items) {
                    self.assign(target, item)?;
                }
                if let Expr::Starred(inner) = &targets[star] {
                    self.assign(inner, Value::list(middle))?;
                }
                for (target, item) in targets[star + 1..].iter().zip(tail) {
                    self.assign(target, item)?;
                }
            }
        }
        Ok(())
    }

    fn delete(&mut self, target: &Expr) -> Result<(), CompilerError> {
        match target {
            Expr::Name(name) => {
                if !self.forget_name(name) {
                    return_runtime_error!("NameError", format!("name '{name}' is not defined"));
                }
                Ok(())
            }
            Expr::Subscript { value, index } => {
                let base = self.eval(value)?;
                let index = self.eval(index)?;
                match &base {
                    Value::List(elements) => {
                        base.subscript(&index).map_err(fold)?;
                        let length = elements.borrow().len() as i64;
                        let position = index.as_int().unwrap_or(0);
                        let position = if position < 0 { position + length } else { position };
                        elements.borrow_mut().remove(position as usize);
                        Ok(())
                    }
                    Value::Dict(entries) => {
                        base.subscript(&index).map_err(fold)?;
                        entries.borrow_mut().retain(|(key, _)| !key.py_eq(&index));
                        Ok(())
                    }
                    other => return_runtime_error!(
                        "TypeError",
                        format!("'{}' object does not support item deletion", other.type_name())
                    ),
                }
            }
            Expr::Tuple(elements) | Expr::List(elements) => {
                for element in elements {
                    self.delete(element)?;
                }
                Ok(())
            }
            other => return_runtime_error!(
                "SyntaxError",
                format!("cannot delete {}", other_kind(other))
            ),
        }
    }

    // ------------------------------
    //  NAMES
    // ------------------------------

    fn store_name(&mut self, name: &str, value: Value) -> Result<(), CompilerError> {
        if self.declared_nonlocal.contains(name) {
            for scope in self.enclosing.iter().rev() {
                if scope.borrow().contains_key(name) {
                    scope.borrow_mut().insert(name.to_owned(), value);
                    return Ok(());
                }
            }
            return_runtime_error!("SyntaxError", format!("no binding for nonlocal '{name}' found"));
        }

        match &self.locals {
            Some(locals) if !self.declared_global.contains(name) => {
                locals.borrow_mut().insert(name.to_owned(), value);
            }
            _ => {
                self.globals.borrow_mut().insert(name.to_owned(), value);
            }
        }
        Ok(())
    }

    fn load_name(&self, name: &str) -> Result<Value, CompilerError> {
        if !self.declared_global.contains(name) {
            if let Some(locals) = &self.locals
                && let Some(value) = locals.borrow().get(name)
            {
                return Ok(value.clone());
            }
            for scope in self.enclosing.iter().rev() {
                if let Some(value) = scope.borrow().get(name) {
                    return Ok(value.clone());
                }
            }
        }

        if let Some(value) = self.globals.borrow().get(name) {
            return Ok(value.clone());
        }

        match Builtin::from_name(name) {
            Some(builtin) => Ok(Value::Builtin(builtin)),
            None => return_runtime_error!("NameError", format!("name '{name}' is not defined")),
        }
    }

    // Returns whether the name was bound
    fn forget_name(&mut self, name: &str) -> bool {
        match &self.locals {
            Some(locals) if !self.declared_global.contains(name) => {
                locals.borrow_mut().remove(name).is_some()
            }
            _ => self.globals.borrow_mut().remove(name).is_some(),
        }
    }

    // ------------------------------
    //  EXPRESSIONS
    // ------------------------------

    pub fn eval(&mut self, expr: &Expr) -> Result<Value, CompilerError> {
        let value = match expr {
            Expr::Constant(constant) => Value::from_constant(constant),
            Expr::Name(name) => self.load_name(name)?,

            Expr::Tuple(elements) => Value::tuple(self.eval_elements(elements)?),
            Expr::List(elements) => Value::list(self.eval_elements(elements)?),
            Expr::Set(elements) => Value::set(self.eval_elements(elements)?).map_err(fold)?,
            Expr::Dict(entries) => {
                let mut evaluated = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    match key {
                        Some(key) => {
                            let key = self.eval(key)?;
                            let value = self.eval(value)?;
                            dict_insert(&mut evaluated, key, value).map_err(fold)?;
                        }
                        None => match self.eval(value)? {
                            Value::Dict(splat) => {
                                for (key, value) in splat.borrow().iter() {
                                    dict_insert(&mut evaluated, key.clone(), value.clone()).map_err(fold)?;
                                }
                            }
                            other => return_runtime_error!(
                                "TypeError",
                                format!("'{}' object is not a mapping", other.type_name())
                            ),
                        },
                    }
                }
                Value::dict(evaluated).map_err(fold)?
            }

            Expr::Attribute { value, attr } => self.eval(value)?.get_attribute(attr).map_err(fold)?,

            Expr::Subscript { value, index } => {
                let base = self.eval(value)?;
                match index.as_ref() {
                    Expr::Slice { lower, upper, step } => {
                        let lower = self.eval_optional(lower.as_deref())?;
                        let upper = self.eval_optional(upper.as_deref())?;
                        let step = self.eval_optional(step.as_deref())?;
                        base.slice(lower.as_ref(), upper.as_ref(), step.as_ref()).map_err(fold)?
                    }
                    index => {
                        let index = self.eval(index)?;
                        base.subscript(&index).map_err(fold)?
                    }
                }
            }

            Expr::Call {
                func,
                args,
                keywords,
            } => self.eval_call(func, args, keywords)?,

            Expr::BinOp { left, op, right } => {
                let lhs = self.eval(left)?;
                let rhs = self.eval(right)?;
                lhs.evaluate_operator(&rhs, *op).map_err(fold)?
            }

            Expr::UnaryOp { op, operand } => self.eval(operand)?.evaluate_unary(*op).map_err(fold)?,

            Expr::BoolOp { op, values } => {
                let mut result = Value::None;
                for operand in values {
                    result = self.eval(operand)?;
                    let decides = match op {
                        BoolOperator::And => !result.is_truthy(),
                        BoolOperator::Or => result.is_truthy(),
                    };
                    if decides {
                        break;
                    }
                }
                result
            }

            Expr::Compare {
                left,
                ops,
                comparators,
            } => {
                let mut lhs = self.eval(left)?;
                for (op, comparator) in ops.iter().zip(comparators) {
                    let rhs = self.eval(comparator)?;
                    if !lhs.compare(*op, &rhs).map_err(fold)? {
                        return Ok(Value::Bool(false));
                    }
                    lhs = rhs;
                }
                Value::Bool(true)
            }

            Expr::IfExp { test, body, orelse } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(body)?
                } else {
                    self.eval(orelse)?
                }
            }

            Expr::Yield(value) => {
                let value = match value {
                    Some(value) => self.eval(value)?,
                    None => Value::None,
                };
                match &mut self.yielded {
                    Some(yielded) => yielded.push(value),
                    None => return_runtime_error!("SyntaxError", "'yield' outside function"),
                }
                Value::None
            }

            Expr::Starred(_) => {
                return_runtime_error!("SyntaxError", "can't use starred expression here")
            }
            Expr::Slice { .. } => return_runtime_error!("SyntaxError", "slices are only valid as subscripts"),
        };

        Ok(value)
    }

    fn eval_optional(&mut self, expr: Option<&Expr>) -> Result<Option<Value>, CompilerError> {
        match expr {
            Some(expr) => Ok(Some(self.eval(expr)?)),
            None => Ok(None),
        }
    }

    fn eval_elements(&mut self, elements: &[Expr]) -> Result<Vec<Value>, CompilerError> {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            match element {
                Expr::Starred(inner) => values.extend(self.eval(inner)?.iterate().map_err(fold)?),
                element => values.push(self.eval(element)?),
            }
        }
        Ok(values)
    }

    fn eval_keywords(&mut self, keywords: &[Keyword]) -> Result<Vec<(String, Value)>, CompilerError> {
        let mut values = Vec::with_capacity(keywords.len());
        for keyword in keywords {
            let value = self.eval(&keyword.value)?;
            match &keyword.name {
                Some(name) => values.push((name.to_owned(), value)),
                None => values.extend(mapping_to_keywords(value).map_err(fold)?),
            }
        }
        Ok(values)
    }

    fn eval_call(&mut self, func: &Expr, args: &[Expr], keywords: &[Keyword]) -> Result<Value, CompilerError> {
        // Methods of builtin values are dispatched on the receiver
        if let Expr::Attribute { value, attr } = func {
            let receiver = self.eval(value)?;
            if !matches!(receiver, Value::Object(_) | Value::Function(_)) {
                let args = self.eval_elements(args)?;
                if !keywords.is_empty() {
                    return_runtime_error!(
                        "TypeError",
                        format!("{attr}() takes no keyword arguments")
                    );
                }
                return call_method(&receiver, attr, &args).map_err(fold);
            }

            let callee = receiver.get_attribute(attr).map_err(fold)?;
            let args = self.eval_elements(args)?;
            let keywords = self.eval_keywords(keywords)?;
            return self.call_value(&callee, args, keywords);
        }

        let callee = self.eval(func)?;
        let args = self.eval_elements(args)?;
        let keywords = self.eval_keywords(keywords)?;
        self.call_value(&callee, args, keywords)
    }

    fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        keywords: Vec<(String, Value)>,
    ) -> Result<Value, CompilerError> {
        match callee {
            Value::Builtin(builtin) => builtin.call(&args, &keywords).map_err(fold),
            Value::Function(function) => call_function(function, args, keywords, self.depth + 1),
            other => return_runtime_error!(
                "TypeError",
                format!("'{}' object is not callable", other.type_name())
            ),
        }
    }
}

fn handler_matches(raised: &str, class: &Value) -> Result<bool, CompilerError> {
    match class {
        Value::Builtin(Builtin::Exception(handler)) => Ok(exception_matches(raised, handler)),
        Value::Tuple(classes) => {
            for class in classes.iter() {
                if handler_matches(raised, class)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        _ => return_runtime_error!(
            "TypeError",
            "catching classes that do not inherit from BaseException is not allowed"
        ),
    }
}

fn store_item(base: &Value, index: Value, value: Value) -> Result<(), CompilerError> {
    match base {
        Value::List(elements) => {
            let length = elements.borrow().len() as i64;
            let Some(position) = index.as_int() else {
                return_runtime_error!(
                    "TypeError",
                    format!("list indices must be integers, not {}", index.type_name())
                );
            };
            let position = if position < 0 { position + length } else { position };
            if !(0..length).contains(&position) {
                return_runtime_error!("IndexError", "list assignment index out of range");
            }
            elements.borrow_mut()[position as usize] = value;
            Ok(())
        }
        Value::Dict(entries) => dict_insert(&mut entries.borrow_mut(), index, value).map_err(fold),
        other => return_runtime_error!(
            "TypeError",
            format!("'{}' object does not support item assignment", other.type_name())
        ),
    }
}

fn store_attribute(base: &Value, attr: &str, value: Value) -> Result<(), CompilerError> {
    match base {
        Value::Object(object) => {
            object.attrs.borrow_mut().insert(attr.to_owned(), value);
            Ok(())
        }
        other => return_runtime_error!(
            "AttributeError",
            format!("'{}' object has no attribute '{attr}'", other.type_name())
        ),
    }
}

fn unpack_message(expected: usize, got: usize) -> String {
    if got < expected {
        format!("not enough values to unpack (expected {expected}, got {got})")
    } else {
        format!("too many values to unpack (expected {expected})")
    }
}

fn other_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::Constant(_) => "literal",
        Expr::Call { .. } => "function call",
        Expr::BinOp { .. } | Expr::UnaryOp { .. } | Expr::BoolOp { .. } => "expression",
        Expr::Compare { .. } => "comparison",
        Expr::IfExp { .. } => "conditional expression",
        Expr::Yield(_) => "yield expression",
        _ => "expression",
    }
}

#[cfg(test)]
#[path = "tests/interpreter_tests.rs"]
mod interpreter_tests;
