//! Statement execution: node dispatch, control flow, and definition
//! registration.
//!
//! Execution is direct recursive descent over AST nodes. Non-local return
//! is an explicit [`Flow`] outcome instead of a shared return-slot stack:
//! every statement list stops iterating as soon as a child produced
//! `Flow::Return`.

use std::rc::Rc;

use crate::errors::{extern_not_found, no_extern_bridge, parse_error, Error};
use crate::runtime::ExecutionContext;
use crate::script::Script;
use crate::syntax::{Ast, NodeId, NodeKind};
use crate::value::Value;

use super::context::{declared_type, Context, FunctionDef, MemberDef, ParamDef, StructDef};
use super::scope::{BlockScope, ScopeLink, Variable};

/// Outcome of executing a node: a plain value, or a `return` unwinding to
/// the nearest call boundary.
pub(crate) enum Flow {
    Normal(Value),
    Return(Value),
}

impl Flow {
    pub fn into_value(self) -> Value {
        match self {
            Flow::Normal(v) | Flow::Return(v) => v,
        }
    }
}

/// Child accessor that degrades malformed trees into an error rather than
/// a panic.
pub(crate) fn node_child(ast: &Ast, node: NodeId, index: usize) -> Result<NodeId, Error> {
    ast.child(node, index)
        .ok_or_else(|| parse_error("malformed syntax tree node"))
}

/// One script execution: borrows the context tables and the per-run
/// runtime handles.
pub(crate) struct Executor<'a> {
    pub(crate) ctx: &'a mut Context,
    pub(crate) runtime: &'a mut ExecutionContext,
}

impl<'a> Executor<'a> {
    pub fn new(ctx: &'a mut Context, runtime: &'a mut ExecutionContext) -> Self {
        Executor { ctx, runtime }
    }

    pub fn run(&mut self, script: &Script) -> Result<Value, Error> {
        let ast = Rc::clone(script.ast());
        Ok(self.exec(&ast, ast.root(), &None, "")?.into_value())
    }

    /// Execute one node. `scope` is the current block scope (`None` at the
    /// top level, where declarations bind globals); `prefix` is the active
    /// namespace prefix.
    pub(crate) fn exec(
        &mut self,
        ast: &Rc<Ast>,
        node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Flow, Error> {
        let n = ast.get(node);
        match n.kind {
            NodeKind::Script | NodeKind::Compound | NodeKind::Statement => {
                for &child in &n.children {
                    if let Flow::Return(v) = self.exec(ast, child, scope, prefix)? {
                        return Ok(Flow::Return(v));
                    }
                }
                Ok(Flow::Normal(Value::null()))
            }

            NodeKind::Namespace => {
                let inner = format!("{prefix}{}.", n.text);
                for &child in &n.children {
                    if let Flow::Return(v) = self.exec(ast, child, scope, &inner)? {
                        return Ok(Flow::Return(v));
                    }
                }
                Ok(Flow::Normal(Value::null()))
            }

            NodeKind::Declaration => self.exec_declaration(ast, node, scope, prefix),
            NodeKind::Function => {
                self.register_function(ast, node, prefix)?;
                Ok(Flow::Normal(Value::null()))
            }
            NodeKind::Struct => {
                self.register_struct(ast, node, prefix)?;
                Ok(Flow::Normal(Value::null()))
            }
            NodeKind::ExternVar => {
                self.exec_extern_var(ast, node, prefix)?;
                Ok(Flow::Normal(Value::null()))
            }
            NodeKind::Import => {
                self.exec_import(ast, node)?;
                Ok(Flow::Normal(Value::null()))
            }

            NodeKind::Return => {
                let value = match n.children.first() {
                    Some(&expr) => self.eval_expr(ast, expr, scope, prefix, false)?,
                    None => Value::null(),
                };
                Ok(Flow::Return(value))
            }

            NodeKind::If => self.exec_if(ast, node, scope, prefix),
            NodeKind::While => self.exec_while(ast, node, scope, prefix),
            NodeKind::ForManual => self.exec_for_manual(ast, node, scope, prefix),
            NodeKind::ForEach => self.exec_for_each(ast, node, scope, prefix),

            NodeKind::OpExpr
            | NodeKind::UnaryExpr
            | NodeKind::CallExpr
            | NodeKind::MethodCall
            | NodeKind::ConstructorExpr
            | NodeKind::ListExpr
            | NodeKind::IndexExpr
            | NodeKind::MemberAccess
            | NodeKind::Identifier
            | NodeKind::Integer
            | NodeKind::Real
            | NodeKind::StringLit
            | NodeKind::BoolLit => self
                .eval_expr(ast, node, scope, prefix, false)
                .map(Flow::Normal),

            // Structural kinds with no statement meaning of their own.
            _ => Ok(Flow::Normal(Value::null())),
        }
    }

    fn exec_declaration(
        &mut self,
        ast: &Rc<Ast>,
        node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Flow, Error> {
        let init = node_child(ast, node, 0)?;
        let value = self.eval_expr(ast, init, scope, prefix, false)?;
        let name = &ast.get(node).text;
        match scope {
            Some(s) => s.borrow_mut().declare(name.clone(), value),
            None => {
                let key = format!("{prefix}{name}");
                self.ctx
                    .globals
                    .insert(key.clone(), Variable::new(key, value));
            }
        }
        Ok(Flow::Normal(Value::null()))
    }

    fn exec_if(
        &mut self,
        ast: &Rc<Ast>,
        node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Flow, Error> {
        let n = ast.get(node);
        let condition = self.eval_expr(ast, node_child(ast, node, 0)?, scope, prefix, false)?;
        if condition.is_truthy().map_err(|e| e.at(n.line, n.column))? {
            let body_scope = Some(BlockScope::nested(scope.clone()));
            return self.exec(ast, node_child(ast, node, 1)?, &body_scope, prefix);
        }
        if let Some(else_node) = ast.find_child(node, NodeKind::Else) {
            let body = node_child(ast, else_node, 0)?;
            let body_scope = Some(BlockScope::nested(scope.clone()));
            return self.exec(ast, body, &body_scope, prefix);
        }
        Ok(Flow::Normal(Value::null()))
    }

    fn exec_while(
        &mut self,
        ast: &Rc<Ast>,
        node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Flow, Error> {
        let n = ast.get(node);
        let condition = node_child(ast, node, 0)?;
        let body = node_child(ast, node, 1)?;
        loop {
            let keep_going = self
                .eval_expr(ast, condition, scope, prefix, false)?
                .is_truthy()
                .map_err(|e| e.at(n.line, n.column))?;
            if !keep_going {
                break;
            }
            let body_scope = Some(BlockScope::nested(scope.clone()));
            if let Flow::Return(v) = self.exec(ast, body, &body_scope, prefix)? {
                return Ok(Flow::Return(v));
            }
        }
        Ok(Flow::Normal(Value::null()))
    }

    fn exec_for_manual(
        &mut self,
        ast: &Rc<Ast>,
        node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Flow, Error> {
        let n = ast.get(node);
        let init = node_child(ast, node, 0)?;
        let condition = node_child(ast, node, 1)?;
        let step = node_child(ast, node, 2)?;
        let body = node_child(ast, node, 3)?;

        // The iterator variable lives in its own scope surrounding the
        // whole loop; each body iteration nests a fresh scope inside it.
        let iter_scope = Some(BlockScope::nested(scope.clone()));
        self.exec(ast, init, &iter_scope, prefix)?;
        loop {
            let keep_going = self
                .eval_expr(ast, condition, &iter_scope, prefix, false)?
                .is_truthy()
                .map_err(|e| e.at(n.line, n.column))?;
            if !keep_going {
                break;
            }
            let body_scope = Some(BlockScope::nested(iter_scope.clone()));
            if let Flow::Return(v) = self.exec(ast, body, &body_scope, prefix)? {
                return Ok(Flow::Return(v));
            }
            self.eval_expr(ast, step, &iter_scope, prefix, false)?;
        }
        Ok(Flow::Normal(Value::null()))
    }

    fn exec_for_each(
        &mut self,
        ast: &Rc<Ast>,
        node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Flow, Error> {
        let n = ast.get(node);
        let iterable = self.eval_expr(ast, node_child(ast, node, 0)?, scope, prefix, false)?;
        let body = node_child(ast, node, 1)?;

        let items: Vec<Value> = match &iterable {
            Value::List(list) => {
                let borrowed = list.borrow();
                borrowed
                    .items()
                    .iter()
                    .map(Value::copy)
                    .collect::<Result<_, _>>()?
            }
            other => {
                return Err(crate::errors::type_mismatch(format!(
                    "range-for iterates lists, got {}",
                    other.type_of()
                ))
                .at(n.line, n.column));
            }
        };

        let binding = n.text.clone();
        for item in items {
            let body_scope = BlockScope::nested(scope.clone());
            body_scope.borrow_mut().declare(binding.clone(), item);
            if let Flow::Return(v) = self.exec(ast, body, &Some(body_scope), prefix)? {
                return Ok(Flow::Return(v));
            }
        }
        Ok(Flow::Normal(Value::null()))
    }

    // ===== Definition registration =====

    fn register_function(
        &mut self,
        ast: &Rc<Ast>,
        node: NodeId,
        prefix: &str,
    ) -> Result<(), Error> {
        let n = ast.get(node);
        let full_name = format!("{prefix}{}", n.text);

        let param_list = node_child(ast, node, 0)?;
        let mut params = Vec::with_capacity(ast.children(param_list).len());
        for &param in ast.children(param_list) {
            let type_node = node_child(ast, param, 0)?;
            let (by_ref, ty, type_name) = declared_type(&ast.get(type_node).text);
            params.push(ParamDef {
                name: ast.get(param).text.clone(),
                ty,
                type_name,
                by_ref,
            });
        }

        let return_node = node_child(ast, node, 1)?;
        let (_, return_type, return_type_name) = declared_type(&ast.get(return_node).text);
        let body = ast.find_child(node, NodeKind::Compound);

        self.ctx.functions.insert(
            full_name.clone(),
            FunctionDef {
                name: full_name,
                namespace: prefix.to_string(),
                params,
                return_type,
                return_type_name,
                body,
                ast: Rc::clone(ast),
            },
        );
        Ok(())
    }

    fn register_struct(&mut self, ast: &Rc<Ast>, node: NodeId, prefix: &str) -> Result<(), Error> {
        let n = ast.get(node);
        let full_name = format!("{prefix}{}", n.text);

        let mut members = Vec::with_capacity(n.children.len());
        for &member in &n.children {
            let type_node = node_child(ast, member, 0)?;
            let (_, ty, type_name) = declared_type(&ast.get(type_node).text);
            // Member defaults are evaluated in the global scope at
            // definition time.
            let default = match ast.child(member, 1) {
                Some(init) => self.eval_expr(ast, init, &None, prefix, false)?,
                None => Value::null(),
            };
            members.push(MemberDef {
                name: ast.get(member).text.clone(),
                ty,
                type_name,
                default,
            });
        }

        self.ctx.structs.insert(
            full_name.clone(),
            StructDef {
                name: full_name,
                members,
            },
        );
        Ok(())
    }

    fn exec_extern_var(&mut self, ast: &Rc<Ast>, node: NodeId, prefix: &str) -> Result<(), Error> {
        let n = ast.get(node);
        let full_name = format!("{prefix}{}", n.text);
        let type_node = node_child(ast, node, 0)?;
        let (_, ty, _) = declared_type(&ast.get(type_node).text);

        let library = self
            .runtime
            .externs
            .as_ref()
            .ok_or_else(|| no_extern_bridge(&full_name).at(n.line, n.column))?;
        let pointer = library
            .lookup_variable(&full_name)
            .ok_or_else(|| extern_not_found(&full_name).at(n.line, n.column))?;

        let value = Value::external(pointer, ty);
        self.ctx
            .globals
            .insert(full_name.clone(), Variable::new(full_name, value));
        Ok(())
    }
}
