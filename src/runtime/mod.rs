use crate::compiler_frontend::values::value::Value;
use crate::projects::settings::INTERPRETER_STACK_SIZE;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

pub mod function;
pub mod interpreter;
pub mod module;

/// A mutable name to value mapping shared by everything defined in the same scope
pub type Namespace = Rc<RefCell<FxHashMap<String, Value>>>;

pub fn new_namespace(initial: FxHashMap<String, Value>) -> Namespace {
    Rc::new(RefCell::new(initial))
}

/// Runs a task on a thread with a stack large enough for MAX_CALL_DEPTH nested calls.
/// Values are not Send, so whatever the task executes has to be created inside it.
pub fn with_interpreter_stack<T: Send, F: FnOnce() -> T + Send>(task: F) -> std::io::Result<T> {
    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name(String::from("pragma-interpreter"))
            .stack_size(INTERPRETER_STACK_SIZE)
            .spawn_scoped(scope, task)?;

        match handle.join() {
            Ok(result) => Ok(result),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}
