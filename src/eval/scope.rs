//! Lexical block scopes and variables.
//!
//! Scopes chain through `parent` links for fall-through lookup. Function
//! call scopes have no parent: callee code never sees caller locals, and
//! name lookup falls back to the context globals once a chain ends.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::value::Value;

/// A named slot owning exactly one value.
pub(crate) struct Variable {
    name: String,
    value: Value,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Variable {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }
}

/// Shared handle to a block scope.
pub(crate) type ScopeLink = Rc<RefCell<BlockScope>>;

/// One lexical block: local variables plus a parent link (absent at
/// function boundaries and at the root of an execution).
pub(crate) struct BlockScope {
    locals: FxHashMap<String, Variable>,
    parent: Option<ScopeLink>,
}

impl BlockScope {
    /// A parentless scope: the root of a function call or module body.
    pub fn root() -> ScopeLink {
        Self::nested(None)
    }

    /// A scope chained under `parent` (which may itself be absent when the
    /// block appears at the top level of a script).
    pub fn nested(parent: Option<ScopeLink>) -> ScopeLink {
        Rc::new(RefCell::new(BlockScope {
            locals: FxHashMap::default(),
            parent,
        }))
    }

    /// Bind `name` in this scope, replacing (and thereby destroying) any
    /// previous binding of the same name.
    pub fn declare(&mut self, name: String, value: Value) {
        let variable = Variable::new(name.clone(), value);
        self.locals.insert(name, variable);
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.locals.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.locals.get_mut(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.locals.contains_key(name)
    }

    pub fn parent(&self) -> Option<ScopeLink> {
        self.parent.clone()
    }
}

/// Walk the chain from `start` to the scope that binds `name`, if any.
pub(crate) fn scope_containing(start: &ScopeLink, name: &str) -> Option<ScopeLink> {
    let mut current = Rc::clone(start);
    loop {
        if current.borrow().has(name) {
            return Some(current);
        }
        let parent = current.borrow().parent();
        match parent {
            Some(p) => current = p,
            None => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_and_lookup() {
        let scope = BlockScope::root();
        scope
            .borrow_mut()
            .declare("x".to_string(), Value::null());
        assert!(scope.borrow().has("x"));
        assert_eq!(scope.borrow().get("x").unwrap().name(), "x");
    }

    #[test]
    fn test_redeclare_replaces() {
        let scope = BlockScope::root();
        scope.borrow_mut().declare("x".to_string(), Value::null());
        scope.borrow_mut().declare("x".to_string(), Value::null());
        assert!(scope.borrow().has("x"));
    }

    #[test]
    fn test_chain_lookup() {
        let parent = BlockScope::root();
        parent
            .borrow_mut()
            .declare("outer".to_string(), Value::null());
        let child = BlockScope::nested(Some(Rc::clone(&parent)));

        let found = scope_containing(&child, "outer").expect("found in parent");
        assert!(Rc::ptr_eq(&found, &parent));
        assert!(scope_containing(&child, "missing").is_none());
    }

    #[test]
    fn test_function_boundary_blocks_lookup() {
        let caller = BlockScope::root();
        caller
            .borrow_mut()
            .declare("secret".to_string(), Value::null());
        // Function scopes have no parent, so caller locals are invisible.
        let callee = BlockScope::root();
        assert!(scope_containing(&callee, "secret").is_none());
    }
}
