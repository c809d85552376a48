//! Function-call dispatch, built-ins, extern calls, and imports.
//!
//! Resolution order for a call name:
//! 1. `__`-prefixed built-in markers (`__print`, `__readln`, `__time`,
//!    `__ref`).
//! 2. Member functions, when the receiver prefix of a dotted name is a
//!    variable in scope (`l.append(x)`).
//! 3. The function table, trying the active namespace prefix before the
//!    bare name; a definition without a body dispatches to the extern
//!    bridge.

use std::path::PathBuf;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::errors::{
    extern_arity_limit, extern_not_found, module_not_found, no_extern_bridge, struct_name_mismatch,
    type_mismatch, undefined_function, wrong_arg_count, Error,
};
use crate::externs::MAX_EXTERN_ARGS;
use crate::script::Script;
use crate::syntax::{Ast, NodeId};
use crate::value::{PoolRef, StrValue, Type, Value};

use super::context::FunctionDef;
use super::exec::{node_child, Executor, Flow};
use super::methods::dispatch_member;
use super::scope::{BlockScope, ScopeLink};

impl Executor<'_> {
    pub(crate) fn eval_call(
        &mut self,
        ast: &Rc<Ast>,
        node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
        _ref_mode: bool,
    ) -> Result<Value, Error> {
        let n = ast.get(node);
        let name = n.text.clone();
        let (line, column) = (n.line, n.column);
        let args_node = node_child(ast, node, 0)?;

        if name.starts_with("__") {
            return self
                .eval_builtin(ast, &name, args_node, scope, prefix)
                .map_err(|e| e.at(line, column));
        }

        // Member function: the receiver prefix of a dotted name resolves
        // to a variable in scope.
        if let Some(dot) = name.rfind('.') {
            let (receiver_name, method) = (&name[..dot], &name[dot + 1..]);
            if let Some(place) = self.lookup_place(receiver_name, scope, prefix) {
                let receiver = self.load_place(&place, true)?;
                let args = self.eval_args(ast, args_node, scope, prefix)?;
                let pool = self.ctx.pool.clone();
                return dispatch_member(&pool, &receiver, method, &args)
                    .map_err(|e| e.at(line, column));
            }
        }

        let key = self
            .resolve_function_key(prefix, &name)
            .ok_or_else(|| undefined_function(&name).at(line, column))?;
        let def = self.ctx.functions[&key].clone();
        if def.body.is_some() {
            self.call_function(ast, &def, args_node, scope, prefix)
                .map_err(|e| e.at(line, column))
        } else {
            self.call_extern(ast, &def, args_node, scope, prefix)
                .map_err(|e| e.at(line, column))
        }
    }

    fn resolve_function_key(&self, prefix: &str, name: &str) -> Option<String> {
        if !prefix.is_empty() {
            let prefixed = format!("{prefix}{name}");
            if self.ctx.functions.contains_key(&prefixed) {
                return Some(prefixed);
            }
        }
        if self.ctx.functions.contains_key(name) {
            return Some(name.to_string());
        }
        None
    }

    /// Call a user-defined function: bind arguments into a fresh function
    /// scope (no parent, so caller locals stay invisible) and execute the
    /// body until it returns.
    fn call_function(
        &mut self,
        ast: &Rc<Ast>,
        def: &FunctionDef,
        args_node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Value, Error> {
        let arg_nodes = &ast.get(args_node).children;
        if arg_nodes.len() != def.params.len() {
            return Err(wrong_arg_count(&def.name, def.params.len(), arg_nodes.len()));
        }

        let pool = self.ctx.pool.clone();
        let call_scope = BlockScope::root();
        for (param, &arg_node) in def.params.iter().zip(arg_nodes) {
            let value = self.eval_expr(ast, arg_node, scope, prefix, param.by_ref)?;
            let bound = if param.by_ref {
                check_argument(&value, param.ty, &param.type_name, &def.namespace)?;
                value
            } else {
                coerce_argument(&pool, &value, param.ty, &param.type_name, &def.namespace)?
            };
            call_scope.borrow_mut().declare(param.name.clone(), bound);
        }

        let body = def
            .body
            .ok_or_else(|| undefined_function(&def.name))?;
        match self.exec(&def.ast, body, &Some(call_scope), &def.namespace)? {
            Flow::Return(value) => coerce_return(&pool, value, def),
            Flow::Normal(_) => Ok(Value::null()),
        }
    }

    /// Call an `extern fn` through the bridge chain.
    fn call_extern(
        &mut self,
        ast: &Rc<Ast>,
        def: &FunctionDef,
        args_node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Value, Error> {
        let arg_nodes = &ast.get(args_node).children;
        if arg_nodes.len() > MAX_EXTERN_ARGS {
            return Err(extern_arity_limit(&def.name, arg_nodes.len()));
        }
        if arg_nodes.len() != def.params.len() {
            return Err(wrong_arg_count(&def.name, def.params.len(), arg_nodes.len()));
        }

        let pool = self.ctx.pool.clone();
        let mut args = Vec::with_capacity(arg_nodes.len());
        for (param, &arg_node) in def.params.iter().zip(arg_nodes) {
            let value = self.eval_expr(ast, arg_node, scope, prefix, false)?;
            args.push(coerce_argument(
                &pool,
                &value,
                param.ty,
                &param.type_name,
                &def.namespace,
            )?);
        }

        let library = self
            .runtime
            .externs
            .as_mut()
            .ok_or_else(|| no_extern_bridge(&def.name))?;
        let function = library
            .lookup_function(&def.name)
            .ok_or_else(|| extern_not_found(&def.name))?;
        function.call(&args)
    }

    // ===== Built-ins =====

    fn eval_builtin(
        &mut self,
        ast: &Rc<Ast>,
        name: &str,
        args_node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Value, Error> {
        let arg_nodes = &ast.get(args_node).children;
        let pool = self.ctx.pool.clone();
        match name {
            "__print" => {
                if arg_nodes.len() != 1 {
                    return Err(wrong_arg_count("__print", 1, arg_nodes.len()));
                }
                let value = self.eval_expr(ast, arg_nodes[0], scope, prefix, false)?;
                let text = value.display_value()?;
                self.runtime.output.write_line(&text);
                Value::int(&pool, 0)
            }
            "__readln" => {
                if !arg_nodes.is_empty() {
                    return Err(wrong_arg_count("__readln", 0, arg_nodes.len()));
                }
                let line = self.runtime.input.read_line();
                Ok(Value::string(StrValue::new(line)))
            }
            "__time" => {
                if !arg_nodes.is_empty() {
                    return Err(wrong_arg_count("__time", 0, arg_nodes.len()));
                }
                let seconds = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs() as u32)
                    .unwrap_or(0);
                Value::uint(&pool, seconds)
            }
            "__ref" => {
                if arg_nodes.len() != 1 {
                    return Err(wrong_arg_count("__ref", 1, arg_nodes.len()));
                }
                self.eval_expr(ast, arg_nodes[0], scope, prefix, true)
            }
            other => Err(undefined_function(other)),
        }
    }

    // ===== Imports =====

    /// `import a.b.c;` resolves `a/b/c.ps` against the module search
    /// roots, parses and executes it once under the prefix `a.b.c.`.
    /// Repeat imports of the same resolved file are no-ops; marking the
    /// path before execution is also what breaks import cycles.
    pub(crate) fn exec_import(&mut self, ast: &Rc<Ast>, node: NodeId) -> Result<(), Error> {
        let n = ast.get(node);
        let module = n.text.clone();
        let (line, column) = (n.line, n.column);

        let mut relative = PathBuf::new();
        for segment in module.split('.') {
            relative.push(segment);
        }
        relative.set_extension("ps");

        let path = self
            .runtime
            .module_paths
            .iter()
            .map(|root| root.join(&relative))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| module_not_found(&module).at(line, column))?;

        let resolved = match path.canonicalize() {
            Ok(canonical) => canonical,
            Err(_) => path.clone(),
        };
        if self.ctx.imported.iter().any(|p| p == &resolved) {
            return Ok(());
        }
        self.ctx.imported.push(resolved);

        let source = std::fs::read_to_string(&path).map_err(|err| {
            Error::new(
                crate::errors::ErrorKind::ModuleNotFound,
                format!("module '{module}' unreadable: {err}"),
            )
            .at(line, column)
        })?;
        tracing::debug!(module = %module, path = %path.display(), "importing module");

        let script = Script::parse(source)?;
        let module_ast = Rc::clone(script.ast());
        let module_scope = Some(BlockScope::root());
        let module_prefix = format!("{module}.");
        self.exec(&module_ast, module_ast.root(), &module_scope, &module_prefix)?;
        Ok(())
    }
}

/// Verify a reference argument against the declared parameter type
/// without copying or coercing it.
fn check_argument(
    value: &Value,
    ty: Type,
    type_name: &str,
    namespace: &str,
) -> Result<(), Error> {
    match ty {
        Type::Any => Ok(()),
        Type::Struct => match value {
            Value::Struct(s) => {
                if struct_names_match(type_name, s.borrow().type_name(), namespace) {
                    Ok(())
                } else {
                    Err(struct_name_mismatch(type_name, s.borrow().type_name()))
                }
            }
            other => Err(type_mismatch(format!(
                "expected struct {type_name}, got {}",
                other.type_of()
            ))),
        },
        t if t == value.type_of() => Ok(()),
        t => Err(type_mismatch(format!(
            "expected {t}, got {}",
            value.type_of()
        ))),
    }
}

/// Coerce a by-value argument to the declared parameter type. Numeric
/// mismatches convert along the cast matrix; struct parameters require a
/// matching type name; anything else foreign is a type error.
pub(crate) fn coerce_argument(
    pool: &PoolRef,
    value: &Value,
    ty: Type,
    type_name: &str,
    namespace: &str,
) -> Result<Value, Error> {
    match ty {
        Type::Any => value.copy(),
        Type::Struct => match value {
            Value::Struct(s) => {
                if struct_names_match(type_name, s.borrow().type_name(), namespace) {
                    value.copy()
                } else {
                    Err(struct_name_mismatch(type_name, s.borrow().type_name()))
                }
            }
            other => Err(type_mismatch(format!(
                "expected struct {type_name}, got {}",
                other.type_of()
            ))),
        },
        t if t == value.type_of() => value.copy(),
        t if t.is_scalar() && value.type_of().is_scalar() => value.coerce(pool, t),
        t => Err(type_mismatch(format!(
            "expected {t}, got {}",
            value.type_of()
        ))),
    }
}

/// Bring a returned value to the declared return type. A bodyless return
/// path yields `null`, which passes through untouched.
fn coerce_return(pool: &PoolRef, value: Value, def: &FunctionDef) -> Result<Value, Error> {
    if value.is_null() {
        return Ok(value);
    }
    match def.return_type {
        Type::Any => Ok(value),
        Type::Struct => match &value {
            Value::Struct(s) => {
                if struct_names_match(&def.return_type_name, s.borrow().type_name(), &def.namespace)
                {
                    Ok(value)
                } else {
                    Err(struct_name_mismatch(
                        &def.return_type_name,
                        s.borrow().type_name(),
                    ))
                }
            }
            other => Err(type_mismatch(format!(
                "'{}' returns struct {}, got {}",
                def.name,
                def.return_type_name,
                other.type_of()
            ))),
        },
        t if t == value.type_of() => Ok(value),
        t if t.is_scalar() && value.type_of().is_scalar() => value.coerce(pool, t),
        t => Err(type_mismatch(format!(
            "'{}' returns {t}, got {}",
            def.name,
            value.type_of()
        ))),
    }
}

/// A declared struct name matches an instance name either verbatim or
/// with the declaring namespace prepended (definitions inside a module
/// refer to siblings without their prefix).
fn struct_names_match(declared: &str, instance: &str, namespace: &str) -> bool {
    instance == declared || (!namespace.is_empty() && instance == format!("{namespace}{declared}"))
}
