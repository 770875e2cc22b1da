use crate::compiler_frontend::compiler_errors::{CompilerError, ErrorMetaDataKey};
use rustc_hash::FxHashMap;

/// Nested lexical frames of name -> value.
///
/// A name present in a frame was assigned inside that block.
/// Lookups search from the innermost frame outwards, so inner frames shadow outer ones.
#[derive(Debug, Clone)]
pub struct ScopeStack<V> {
    frames: Vec<FxHashMap<String, V>>,
}

impl<V> Default for ScopeStack<V> {
    fn default() -> Self {
        ScopeStack { frames: Vec::new() }
    }
}

impl<V: Clone> ScopeStack<V> {
    pub fn new() -> Self {
        ScopeStack::default()
    }

    /// Opens an empty frame
    pub fn push(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    /// Opens a frame seeded with bindings
    pub fn push_frame(&mut self, initial: FxHashMap<String, V>) {
        self.frames.push(initial);
    }

    /// Closes the innermost frame and returns what was assigned in it
    pub fn pop(&mut self) -> Result<FxHashMap<String, V>, CompilerError> {
        match self.frames.pop() {
            Some(frame) => Ok(frame),
            None => Err(underflow("pop")),
        }
    }

    pub fn get(&self, name: &str) -> Option<&V> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// Writes into the innermost frame
    pub fn set(&mut self, name: &str, value: V) -> Result<(), CompilerError> {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.insert(name.to_owned(), value);
                Ok(())
            }
            None => Err(underflow("set")),
        }
    }

    /// Removes the binding from the innermost frame that holds it
    pub fn delete(&mut self, name: &str) -> Option<V> {
        self.frames
            .iter_mut()
            .rev()
            .find(|frame| frame.contains_key(name))
            .and_then(|frame| frame.remove(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.contains_key(name))
    }

    /// Every visible name, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.items().into_keys().collect();
        keys.sort();
        keys
    }

    /// Every visible binding, inner frames shadowing outer ones
    pub fn items(&self) -> FxHashMap<String, V> {
        let mut items = FxHashMap::default();
        for frame in &self.frames {
            for (name, value) in frame {
                items.insert(name.to_owned(), value.to_owned());
            }
        }
        items
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// The innermost frame, if any
    pub fn innermost(&self) -> Option<&FxHashMap<String, V>> {
        self.frames.last()
    }
}

fn underflow(operation: &str) -> CompilerError {
    let mut error = CompilerError::compiler_error(format!(
        "Scope stack underflow: '{operation}' was called with no open frames"
    ));
    error.new_metadata_entry(ErrorMetaDataKey::CompilationStage, "Scope Tracking");
    error
}
