//! The execution context: memory pool plus the context-scoped tables.
//!
//! Functions, structs, globals and the import cache are owned by the
//! context value, never by process globals. A context persists across
//! `execute` calls, which is what makes the interactive runner's
//! line-by-line sessions work.

use std::path::PathBuf;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::errors::Error;
use crate::runtime::ExecutionContext;
use crate::script::Script;
use crate::syntax::{Ast, NodeId};
use crate::value::{PoolRef, Type, Value};

use super::exec::Executor;
use super::scope::Variable;

/// A declared function parameter.
#[derive(Clone)]
pub(crate) struct ParamDef {
    pub name: String,
    pub ty: Type,
    /// Struct name when `ty` is `Struct`, empty otherwise.
    pub type_name: String,
    pub by_ref: bool,
}

/// A registered function. `body` is absent for `extern fn` declarations;
/// the shared AST keeps the body alive past the defining script.
#[derive(Clone)]
pub(crate) struct FunctionDef {
    pub name: String,
    /// Namespace prefix the function was registered under; its body
    /// executes with this prefix so sibling definitions resolve.
    pub namespace: String,
    pub params: Vec<ParamDef>,
    pub return_type: Type,
    pub return_type_name: String,
    pub body: Option<NodeId>,
    pub ast: Rc<Ast>,
}

/// A declared struct member with its evaluated default initializer.
pub(crate) struct MemberDef {
    pub name: String,
    pub ty: Type,
    pub type_name: String,
    pub default: Value,
}

/// A registered struct definition with ordered members.
pub(crate) struct StructDef {
    pub name: String,
    pub members: Vec<MemberDef>,
}

/// Split a declared type text into its reference flag, tag, and struct
/// name (empty for built-ins).
pub(crate) fn declared_type(text: &str) -> (bool, Type, String) {
    let (by_ref, name) = match text.strip_prefix('&') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (ty, type_name) = match name {
        "int" => (Type::Int, String::new()),
        "uint" => (Type::Uint, String::new()),
        "float" => (Type::Real, String::new()),
        "str" => (Type::Str, String::new()),
        "list" => (Type::List, String::new()),
        "any" => (Type::Any, String::new()),
        other => (Type::Struct, other.to_string()),
    };
    (by_ref, ty, type_name)
}

/// Core interpreter context.
pub struct Context {
    pub(crate) pool: PoolRef,
    pub(crate) globals: FxHashMap<String, Variable>,
    pub(crate) functions: FxHashMap<String, FunctionDef>,
    pub(crate) structs: FxHashMap<String, StructDef>,
    /// Resolved file paths of executed imports; repeat imports are no-ops.
    pub(crate) imported: Vec<PathBuf>,
}

impl Context {
    /// Create a context with `mem_size` bytes of pool memory.
    pub fn new(mem_size: usize) -> Self {
        tracing::debug!(mem_size, "creating pscript context");
        Context {
            pool: PoolRef::new(mem_size),
            globals: FxHashMap::default(),
            functions: FxHashMap::default(),
            structs: FxHashMap::default(),
            imported: Vec::new(),
        }
    }

    /// The context's memory pool.
    pub fn pool(&self) -> &PoolRef {
        &self.pool
    }

    /// Bind a global variable from the host, replacing any previous one.
    pub fn create_global(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.globals
            .insert(name.clone(), Variable::new(name, value));
    }

    /// Read access to a global, mainly for hosts inspecting results.
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name).map(Variable::value)
    }

    /// Execute a script. Any error unwinds to here and is reported on the
    /// runtime's error sink; the context stays usable afterwards.
    pub fn execute(&mut self, script: &Script, runtime: &mut ExecutionContext) {
        if let Err(err) = self.try_execute(script, runtime) {
            runtime.error.write_line(&format!(
                "execution terminated due to unexpected exception: {err}"
            ));
        }
    }

    /// Execute a script, surfacing the error to the caller instead of the
    /// error sink. Embedders use this to inspect error kinds.
    pub fn try_execute(
        &mut self,
        script: &Script,
        runtime: &mut ExecutionContext,
    ) -> Result<Value, Error> {
        Executor::new(self, runtime).run(script)
    }
}
