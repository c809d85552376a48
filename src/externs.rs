//! Bridge between scripts and native host code.
//!
//! Hosts register type-erased callables and raw variable pointers in an
//! [`ExternLibrary`]; libraries chain into fallback lists searched head
//! first. `extern fn` and `extern let` declarations resolve against the
//! chain at execution time.
//!
//! Host functions receive evaluated runtime values and return a value (or
//! [`Value::null`] for void); calls are capped at [`MAX_EXTERN_ARGS`]
//! arguments. Host pointers are opaque to the interpreter and non-owning.

use std::ffi::c_void;

use rustc_hash::FxHashMap;

use crate::errors::{extern_arity_limit, wrong_arg_count, Error};
use crate::value::Value;

/// Maximum number of arguments an extern call may pass.
pub const MAX_EXTERN_ARGS: usize = 8;

/// A registered host callable with its declared arity.
pub struct ExternFunction {
    name: String,
    arity: usize,
    callable: Box<dyn FnMut(&[Value]) -> Value>,
}

impl ExternFunction {
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Invoke the callable, enforcing the bridge argument limit and the
    /// registered arity.
    pub fn call(&mut self, args: &[Value]) -> Result<Value, Error> {
        if args.len() > MAX_EXTERN_ARGS {
            return Err(extern_arity_limit(&self.name, args.len()));
        }
        if args.len() != self.arity {
            return Err(wrong_arg_count(&self.name, self.arity, args.len()));
        }
        Ok((self.callable)(args))
    }
}

/// Registry of host functions and variables, optionally chained into a
/// fallback library searched after this one.
#[derive(Default)]
pub struct ExternLibrary {
    functions: FxHashMap<String, ExternFunction>,
    variables: FxHashMap<String, *mut c_void>,
    next: Option<Box<ExternLibrary>>,
}

impl ExternLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host function under `name` with a fixed arity.
    pub fn register_function(
        &mut self,
        name: impl Into<String>,
        arity: usize,
        callable: impl FnMut(&[Value]) -> Value + 'static,
    ) {
        let name = name.into();
        self.functions.insert(
            name.clone(),
            ExternFunction {
                name,
                arity,
                callable: Box::new(callable),
            },
        );
    }

    /// Register a raw host pointer under `name`. The host keeps ownership.
    pub fn register_variable(&mut self, name: impl Into<String>, pointer: *mut c_void) {
        self.variables.insert(name.into(), pointer);
    }

    /// Append a fallback library to the end of the chain.
    pub fn chain(&mut self, library: ExternLibrary) {
        match &mut self.next {
            Some(next) => next.chain(library),
            None => self.next = Some(Box::new(library)),
        }
    }

    /// First function registered under `name` along the chain.
    pub fn lookup_function(&mut self, name: &str) -> Option<&mut ExternFunction> {
        if self.functions.contains_key(name) {
            return self.functions.get_mut(name);
        }
        self.next.as_mut().and_then(|next| next.lookup_function(name))
    }

    /// First variable registered under `name` along the chain.
    pub fn lookup_variable(&self, name: &str) -> Option<*mut c_void> {
        match self.variables.get(name) {
            Some(ptr) => Some(*ptr),
            None => self.next.as_ref().and_then(|next| next.lookup_variable(name)),
        }
    }
}
