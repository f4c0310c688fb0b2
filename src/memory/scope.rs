//! Variable scopes
//!
//! - [`Scope`]: a lexical environment for function bodies and blocks,
//!   chained through `parent`
//! - [`GlobalScope`]: the global variable layers; sealing the global freezes
//!   the current layer and pushes a fresh one on top of it
//!
//! Function scopes hold `var` declarations and parameters; block scopes hold
//! `let`/`const` and catch parameters.

use super::value::Value;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

pub type ScopeRef = Rc<RefCell<Scope>>;

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub mutable: bool,
}

/// Outcome of writing to an existing name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    Assigned,
    /// The name is a `const` binding.
    Constant,
    /// The binding lives in a sealed global layer.
    Sealed,
    NotFound,
}

#[derive(Debug, Default)]
pub struct Scope {
    bindings: FxHashMap<String, Binding>,
    parent: Option<ScopeRef>,
    function_scope: bool,
}

impl Scope {
    pub fn new_function(parent: Option<ScopeRef>) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            bindings: FxHashMap::default(),
            parent,
            function_scope: true,
        }))
    }

    pub fn new_block(parent: Option<ScopeRef>) -> ScopeRef {
        Rc::new(RefCell::new(Scope {
            bindings: FxHashMap::default(),
            parent,
            function_scope: false,
        }))
    }

    /// Creates or overwrites a binding in this scope.
    pub fn declare(&mut self, name: &str, value: Value, mutable: bool) {
        self.bindings
            .insert(name.to_string(), Binding { value, mutable });
    }

    /// Declares `name` as `undefined` unless it already exists here.
    pub fn declare_hoisted(&mut self, name: &str) {
        self.bindings
            .entry(name.to_string())
            .or_insert(Binding {
                value: Value::Undefined,
                mutable: true,
            });
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
        self.parent = None;
    }
}

/// Looks `name` up along the scope chain starting at `scope`.
pub fn lookup(scope: &ScopeRef, name: &str) -> Option<Value> {
    let mut current = Some(scope.clone());
    while let Some(s) = current {
        let s = s.borrow();
        if let Some(binding) = s.bindings.get(name) {
            return Some(binding.value.clone());
        }
        current = s.parent.clone();
    }
    None
}

/// Writes to the nearest existing binding of `name`.
pub fn assign(scope: &ScopeRef, name: &str, value: Value) -> AssignOutcome {
    let mut current = Some(scope.clone());
    while let Some(s) = current {
        let mut s = s.borrow_mut();
        if let Some(binding) = s.bindings.get_mut(name) {
            if !binding.mutable {
                return AssignOutcome::Constant;
            }
            binding.value = value;
            return AssignOutcome::Assigned;
        }
        current = s.parent.clone();
    }
    AssignOutcome::NotFound
}

/// The innermost function scope enclosing `scope`.
pub fn function_scope(scope: &ScopeRef) -> ScopeRef {
    let mut current = scope.clone();
    loop {
        let parent = {
            let s = current.borrow();
            if s.function_scope {
                return current.clone();
            }
            s.parent.clone()
        };
        match parent {
            Some(parent) => current = parent,
            None => return current,
        }
    }
}

#[derive(Debug, Default)]
struct GlobalLayer {
    bindings: FxHashMap<String, Binding>,
    sealed: bool,
}

/// Global variables.
///
/// Lookups search the newest layer first. Writes to a name that only exists
/// in a sealed layer are refused; new names always land in the top layer.
#[derive(Debug)]
pub struct GlobalScope {
    layers: Vec<GlobalLayer>,
}

impl Default for GlobalScope {
    fn default() -> Self {
        GlobalScope {
            layers: vec![GlobalLayer::default()],
        }
    }
}

impl GlobalScope {
    pub fn get(&self, name: &str) -> Option<Value> {
        self.layers
            .iter()
            .rev()
            .find_map(|layer| layer.bindings.get(name))
            .map(|binding| binding.value.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers
            .iter()
            .any(|layer| layer.bindings.contains_key(name))
    }

    /// Defines `name` in the top layer, shadowing any sealed binding.
    pub fn define(&mut self, name: &str, value: Value, mutable: bool) {
        if let Some(top) = self.layers.last_mut() {
            top.bindings
                .insert(name.to_string(), Binding { value, mutable });
        }
    }

    /// `var` at global level: defines `name` as `undefined` unless the top
    /// layer already has it. Sealed bindings get shadowed.
    pub fn declare_hoisted(&mut self, name: &str) {
        let known = self
            .layers
            .last()
            .is_some_and(|top| top.bindings.contains_key(name));
        if !known {
            self.define(name, Value::Undefined, true);
        }
    }

    pub fn assign(&mut self, name: &str, value: Value) -> AssignOutcome {
        for layer in self.layers.iter_mut().rev() {
            if let Some(binding) = layer.bindings.get_mut(name) {
                if layer.sealed {
                    return AssignOutcome::Sealed;
                }
                if !binding.mutable {
                    return AssignOutcome::Constant;
                }
                binding.value = value;
                return AssignOutcome::Assigned;
            }
        }
        AssignOutcome::NotFound
    }

    /// Freezes the current global layer and pushes a writable one on top.
    /// Returns `false` when the global has already been sealed.
    pub fn seal(&mut self) -> bool {
        if self.is_sealed() {
            return false;
        }
        if let Some(top) = self.layers.last_mut() {
            top.sealed = true;
        }
        self.layers.push(GlobalLayer::default());
        true
    }

    pub fn is_sealed(&self) -> bool {
        self.layers.iter().any(|layer| layer.sealed)
    }

    /// Every global value, for teardown.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.layers
            .iter()
            .flat_map(|layer| layer.bindings.values())
            .map(|binding| &binding.value)
    }
}
