use std::sync::Arc;

use super::Value;
use super::value::{FastHashMap, fast_map_new};

#[derive(Clone, Debug, Default)]
pub struct Scope {
    pub names: FastHashMap<Arc<str>, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self { names: fast_map_new() }
    }
}

/// Lexical scope chain of one execution.
///
/// The outermost frame is always present and is never popped, so `lookup`
/// and `define` never see an empty chain.
#[derive(Clone, Debug)]
pub struct Env {
    frames: Vec<Scope>,
}

impl Env {
    pub fn new() -> Self {
        Self {
            frames: vec![Scope::new()],
        }
    }

    pub fn push(&mut self) {
        self.frames.push(Scope::new());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Bind `name` in the innermost frame, shadowing outer bindings.
    pub fn define(&mut self, name: impl Into<Arc<str>>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.names.insert(name.into(), value);
        }
    }

    /// Rebind the nearest existing `name`. Returns `false` if unbound.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.names.get_mut(name) {
                *slot = value;
                return true;
            }
        }
        false
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|f| f.names.get(name))
    }

    pub fn global_frame(&self) -> &Scope {
        &self.frames[0]
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
