//! Expression evaluation: operands, operator expressions, lvalue places,
//! constructors and list literals.
//!
//! Identifier evaluation yields either a by-value copy of the bound value
//! or a reference alias, selected by the caller through `ref_mode`.
//! Mutating operators resolve their left side to a [`Place`] first: a
//! variable slot, a list element, or a struct field.

use std::rc::Rc;

use crate::errors::{
    index_out_of_bounds, not_assignable, parse_error, struct_name_mismatch, type_mismatch,
    undefined_variable, Error,
};
use crate::syntax::{Ast, NodeId, NodeKind};
use crate::value::{ListValue, PoolRef, Shared, StrValue, StructValue, Type, Value};

use super::call::coerce_argument;
use super::exec::{node_child, Executor};
use super::operators::{assign_base_op, evaluate_binary, evaluate_unary, BinaryOp, UnaryOp};
use super::scope::{scope_containing, ScopeLink};

/// An addressable storage slot, produced by lvalue resolution.
pub(crate) enum Place {
    /// Variable in a block scope.
    Local(ScopeLink, String),
    /// Variable in the context globals, by resolved key.
    Global(String),
    /// Element of a shared list.
    ListElem(Shared<ListValue>, usize),
    /// Field of a shared struct.
    StructField(Shared<StructValue>, String),
}

impl Executor<'_> {
    pub(crate) fn eval_expr(
        &mut self,
        ast: &Rc<Ast>,
        node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
        ref_mode: bool,
    ) -> Result<Value, Error> {
        let n = ast.get(node);
        let pool = self.ctx.pool.clone();
        match n.kind {
            NodeKind::Integer => {
                if let Some(digits) = n.text.strip_suffix('u') {
                    let parsed = digits.parse::<u32>().map_err(|_| {
                        parse_error(format!("invalid uint literal '{}'", n.text))
                            .at(n.line, n.column)
                    })?;
                    Value::uint(&pool, parsed)
                } else {
                    let parsed = n.text.parse::<i32>().map_err(|_| {
                        parse_error(format!("invalid integer literal '{}'", n.text))
                            .at(n.line, n.column)
                    })?;
                    Value::int(&pool, parsed)
                }
            }
            NodeKind::Real => {
                let parsed = n.text.parse::<f32>().map_err(|_| {
                    parse_error(format!("invalid float literal '{}'", n.text)).at(n.line, n.column)
                })?;
                Value::real(&pool, parsed)
            }
            NodeKind::StringLit => Ok(Value::string(StrValue::new(n.text.clone()))),
            NodeKind::BoolLit => Value::boolean(&pool, n.text == "true"),

            NodeKind::Identifier => {
                let place = self
                    .lookup_place(&n.text, scope, prefix)
                    .ok_or_else(|| undefined_variable(&n.text).at(n.line, n.column))?;
                self.load_place(&place, ref_mode)
            }

            NodeKind::OpExpr => self.eval_op_expr(ast, node, scope, prefix),
            NodeKind::UnaryExpr => self.eval_unary_expr(ast, node, scope, prefix),
            NodeKind::CallExpr => self.eval_call(ast, node, scope, prefix, ref_mode),
            NodeKind::MethodCall => self.eval_method_call(ast, node, scope, prefix),
            NodeKind::ConstructorExpr => self.eval_constructor(ast, node, scope, prefix),

            NodeKind::ListExpr => {
                let mut values = Vec::with_capacity(n.children.len());
                for &element in &n.children {
                    values.push(self.eval_expr(ast, element, scope, prefix, false)?);
                }
                Ok(Value::list(ListValue::new(values)))
            }

            NodeKind::IndexExpr | NodeKind::MemberAccess => {
                let place = self.resolve_place(ast, node, scope, prefix)?;
                self.load_place(&place, ref_mode)
            }

            _ => Ok(Value::null()),
        }
    }

    fn eval_op_expr(
        &mut self,
        ast: &Rc<Ast>,
        node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Value, Error> {
        let n = ast.get(node);
        let lhs_node = node_child(ast, node, 0)?;
        let op_node = node_child(ast, node, 1)?;
        let rhs_node = node_child(ast, node, 2)?;
        let symbol = ast.get(op_node).text.clone();
        let pool = self.ctx.pool.clone();

        if let Some(base) = assign_base_op(&symbol) {
            let lhs = ast.get(lhs_node);
            let place = match lhs.kind {
                NodeKind::Identifier | NodeKind::IndexExpr | NodeKind::MemberAccess => {
                    self.resolve_place(ast, lhs_node, scope, prefix)?
                }
                _ => return Err(not_assignable().at(lhs.line, lhs.column)),
            };
            let rhs = self.eval_expr(ast, rhs_node, scope, prefix, false)?;
            let new_value = match base {
                None => rhs,
                Some(op) => {
                    let current = self.load_place(&place, false)?;
                    evaluate_binary(&pool, &current, op, &rhs)
                        .map_err(|e| e.at(n.line, n.column))?
                }
            };
            self.store_place(&place, new_value)
                .map_err(|e| e.at(n.line, n.column))?;
            return self.load_place(&place, false);
        }

        let op = BinaryOp::from_symbol(&symbol)
            .ok_or_else(|| parse_error(format!("unknown operator '{symbol}'")))?;
        let lhs = self.eval_expr(ast, lhs_node, scope, prefix, false)?;
        let rhs = self.eval_expr(ast, rhs_node, scope, prefix, false)?;
        evaluate_binary(&pool, &lhs, op, &rhs).map_err(|e| e.at(n.line, n.column))
    }

    fn eval_unary_expr(
        &mut self,
        ast: &Rc<Ast>,
        node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Value, Error> {
        let n = ast.get(node);
        let operand = node_child(ast, node, 0)?;
        let pool = self.ctx.pool.clone();
        match n.text.as_str() {
            // Take-reference: evaluate the operand in reference mode.
            "&" => {
                let kind = ast.get(operand).kind;
                if !matches!(
                    kind,
                    NodeKind::Identifier | NodeKind::IndexExpr | NodeKind::MemberAccess
                ) {
                    return Err(not_assignable().at(n.line, n.column));
                }
                self.eval_expr(ast, operand, scope, prefix, true)
            }
            "-" => {
                let value = self.eval_expr(ast, operand, scope, prefix, false)?;
                evaluate_unary(&pool, UnaryOp::Neg, &value).map_err(|e| e.at(n.line, n.column))
            }
            "!" => {
                let value = self.eval_expr(ast, operand, scope, prefix, false)?;
                evaluate_unary(&pool, UnaryOp::Not, &value).map_err(|e| e.at(n.line, n.column))
            }
            "++" | "--" => {
                let kind = ast.get(operand).kind;
                if !matches!(
                    kind,
                    NodeKind::Identifier | NodeKind::IndexExpr | NodeKind::MemberAccess
                ) {
                    return Err(not_assignable().at(n.line, n.column));
                }
                let place = self.resolve_place(ast, operand, scope, prefix)?;
                let current = self.load_place(&place, false)?;
                let one = Value::int(&pool, 1)?;
                let op = if n.text == "++" {
                    BinaryOp::Add
                } else {
                    BinaryOp::Sub
                };
                let updated = evaluate_binary(&pool, &current, op, &one)
                    .map_err(|e| e.at(n.line, n.column))?;
                self.store_place(&place, updated)
                    .map_err(|e| e.at(n.line, n.column))?;
                self.load_place(&place, false)
            }
            other => Err(parse_error(format!("unknown unary operator '{other}'"))
                .at(n.line, n.column)),
        }
    }

    fn eval_method_call(
        &mut self,
        ast: &Rc<Ast>,
        node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Value, Error> {
        let n = ast.get(node);
        let receiver = self.eval_expr(ast, node_child(ast, node, 0)?, scope, prefix, false)?;
        let args = self.eval_args(ast, node_child(ast, node, 1)?, scope, prefix)?;
        let pool = self.ctx.pool.clone();
        super::methods::dispatch_member(&pool, &receiver, &n.text, &args)
            .map_err(|e| e.at(n.line, n.column))
    }

    fn eval_constructor(
        &mut self,
        ast: &Rc<Ast>,
        node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Value, Error> {
        let n = ast.get(node);
        let name = n.text.clone();
        let (line, column) = (n.line, n.column);
        let args = self.eval_args(ast, node_child(ast, node, 0)?, scope, prefix)?;
        let pool = self.ctx.pool.clone();

        match name.as_str() {
            // Builtin constructors are explicit casts.
            "int" | "uint" => {
                if args.len() != 1 {
                    return Err(crate::errors::wrong_arg_count(&name, 1, args.len())
                        .at(line, column));
                }
                let target = if name == "int" { Type::Int } else { Type::Uint };
                args[0].coerce(&pool, target).map_err(|e| e.at(line, column))
            }
            "float" | "str" | "list" | "any" => {
                Err(type_mismatch(format!("type '{name}' has no constructor")).at(line, column))
            }
            _ => {
                let key = self.resolve_struct_key(prefix, &name).ok_or_else(|| {
                    crate::errors::undefined_struct(&name).at(line, column)
                })?;
                let def = &self.ctx.structs[&key];
                if args.len() > def.members.len() {
                    return Err(crate::errors::wrong_arg_count(
                        &name,
                        def.members.len(),
                        args.len(),
                    )
                    .at(line, column));
                }
                let mut fields = Vec::with_capacity(def.members.len());
                for (i, member) in def.members.iter().enumerate() {
                    let value = match args.get(i) {
                        Some(arg) => {
                            coerce_argument(&pool, arg, member.ty, &member.type_name, prefix)
                                .map_err(|e| e.at(line, column))?
                        }
                        None => member.default.copy()?,
                    };
                    fields.push((member.name.clone(), value));
                }
                Ok(Value::structure(StructValue::new(def.name.clone(), fields)))
            }
        }
    }

    pub(crate) fn eval_args(
        &mut self,
        ast: &Rc<Ast>,
        arg_list: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Vec<Value>, Error> {
        let children = &ast.get(arg_list).children;
        let mut args = Vec::with_capacity(children.len());
        for &child in children {
            args.push(self.eval_expr(ast, child, scope, prefix, false)?);
        }
        Ok(args)
    }

    /// Resolve a struct name against the struct table, trying the active
    /// namespace prefix first.
    pub(crate) fn resolve_struct_key(&self, prefix: &str, name: &str) -> Option<String> {
        if !prefix.is_empty() {
            let prefixed = format!("{prefix}{name}");
            if self.ctx.structs.contains_key(&prefixed) {
                return Some(prefixed);
            }
        }
        if self.ctx.structs.contains_key(name) {
            return Some(name.to_string());
        }
        None
    }

    // ===== Lvalue places =====

    /// Find the place a bare name refers to: scope chain first, then the
    /// prefixed global, then the bare global.
    pub(crate) fn lookup_place(
        &self,
        name: &str,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Option<Place> {
        if let Some(start) = scope {
            if let Some(owner) = scope_containing(start, name) {
                return Some(Place::Local(owner, name.to_string()));
            }
        }
        if !prefix.is_empty() {
            let key = format!("{prefix}{name}");
            if self.ctx.globals.contains_key(&key) {
                return Some(Place::Global(key));
            }
        }
        if self.ctx.globals.contains_key(name) {
            return Some(Place::Global(name.to_string()));
        }
        None
    }

    pub(crate) fn resolve_place(
        &mut self,
        ast: &Rc<Ast>,
        node: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Place, Error> {
        let n = ast.get(node);
        match n.kind {
            NodeKind::Identifier => self
                .lookup_place(&n.text, scope, prefix)
                .ok_or_else(|| undefined_variable(&n.text).at(n.line, n.column)),

            NodeKind::IndexExpr => {
                let base = self.resolve_place(ast, node_child(ast, node, 0)?, scope, prefix)?;
                let base_value = self.load_place(&base, true)?;
                self.index_place(ast, base_value, node_child(ast, node, 1)?, scope, prefix)
                    .map_err(|e| e.at(n.line, n.column))
            }

            NodeKind::MemberAccess => {
                let mut place =
                    self.resolve_place(ast, node_child(ast, node, 0)?, scope, prefix)?;
                for &step in &n.children[1..] {
                    let current = self.load_place(&place, true)?;
                    let step_n = ast.get(step);
                    match step_n.kind {
                        NodeKind::Identifier => {
                            place = field_place(&current, &step_n.text)
                                .map_err(|e| e.at(step_n.line, step_n.column))?;
                        }
                        NodeKind::IndexExpr => {
                            let field_node = node_child(ast, step, 0)?;
                            let field_name = &ast.get(field_node).text;
                            let field = field_place(&current, field_name)
                                .map_err(|e| e.at(step_n.line, step_n.column))?;
                            let list_value = self.load_place(&field, true)?;
                            place = self
                                .index_place(
                                    ast,
                                    list_value,
                                    node_child(ast, step, 1)?,
                                    scope,
                                    prefix,
                                )
                                .map_err(|e| e.at(step_n.line, step_n.column))?;
                        }
                        _ => {
                            return Err(parse_error("malformed member access step")
                                .at(step_n.line, step_n.column));
                        }
                    }
                }
                Ok(place)
            }

            _ => Err(not_assignable().at(n.line, n.column)),
        }
    }

    fn index_place(
        &mut self,
        ast: &Rc<Ast>,
        base: Value,
        index_expr: NodeId,
        scope: &Option<ScopeLink>,
        prefix: &str,
    ) -> Result<Place, Error> {
        let list = match base {
            Value::List(list) => list,
            other => {
                return Err(type_mismatch(format!(
                    "indexing requires a list, got {}",
                    other.type_of()
                )));
            }
        };
        let index_value = self.eval_expr(ast, index_expr, scope, prefix, false)?;
        let index = match index_value.type_of() {
            Type::Int | Type::Uint => index_value.scalar_to_i32()?,
            other => {
                return Err(type_mismatch(format!(
                    "list index must be an integer, got {other}"
                )));
            }
        };
        let len = list.borrow().len();
        if index < 0 || index as usize >= len {
            return Err(index_out_of_bounds(i64::from(index), len));
        }
        Ok(Place::ListElem(list, index as usize))
    }

    pub(crate) fn load_place(&self, place: &Place, ref_mode: bool) -> Result<Value, Error> {
        let pick = |value: &Value| {
            if ref_mode {
                Ok(value.make_ref())
            } else {
                value.copy()
            }
        };
        match place {
            Place::Local(scope, name) => {
                let borrowed = scope.borrow();
                let variable = borrowed
                    .get(name)
                    .ok_or_else(|| undefined_variable(name))?;
                pick(variable.value())
            }
            Place::Global(key) => {
                let variable = self
                    .ctx
                    .globals
                    .get(key)
                    .ok_or_else(|| undefined_variable(key))?;
                pick(variable.value())
            }
            Place::ListElem(list, index) => {
                let borrowed = list.borrow();
                let value = borrowed
                    .get(*index)
                    .ok_or_else(|| index_out_of_bounds(*index as i64, borrowed.len()))?;
                pick(value)
            }
            Place::StructField(st, field) => {
                let borrowed = st.borrow();
                let value = borrowed
                    .field(field)
                    .ok_or_else(|| crate::errors::no_member(borrowed.type_name(), field))?;
                pick(value)
            }
        }
    }

    pub(crate) fn store_place(&mut self, place: &Place, value: Value) -> Result<(), Error> {
        let pool = self.ctx.pool.clone();
        match place {
            Place::Local(scope, name) => {
                let mut borrowed = scope.borrow_mut();
                let variable = borrowed
                    .get_mut(name)
                    .ok_or_else(|| undefined_variable(name))?;
                let new_value = assign_value(&pool, variable.value(), value)?;
                store_variable(variable, new_value)
            }
            Place::Global(key) => {
                let variable = self
                    .ctx
                    .globals
                    .get_mut(key)
                    .ok_or_else(|| undefined_variable(key))?;
                let new_value = assign_value(&pool, variable.value(), value)?;
                store_variable(variable, new_value)
            }
            Place::ListElem(list, index) => {
                let declared = list.borrow().element_type();
                let adjusted = coerce_for_slot(&pool, declared, value)?;
                let mut borrowed = list.borrow_mut();
                if *index >= borrowed.len() {
                    return Err(index_out_of_bounds(*index as i64, borrowed.len()));
                }
                borrowed.set(*index, adjusted);
                Ok(())
            }
            Place::StructField(st, field) => {
                let mut borrowed = st.borrow_mut();
                let slot = borrowed.field_mut(field)?;
                let new_value = assign_value(&pool, slot, value)?;
                *slot = new_value;
                Ok(())
            }
        }
    }
}

/// Store into a variable slot. Assignments to a scalar alias write through
/// the shared storage so the aliased source observes them; everything else
/// replaces the slot's value.
fn store_variable(
    variable: &mut super::scope::Variable,
    new_value: Value,
) -> Result<(), Error> {
    let old = variable.value();
    if old.is_reference() && old.type_of() == new_value.type_of() && old.type_of().is_scalar() {
        old.write_scalar_from(&new_value).map_err(|_| {
            type_mismatch(format!(
                "cannot write through dangling reference '{}'",
                variable.name()
            ))
        })
    } else {
        variable.set_value(new_value);
        Ok(())
    }
}

/// Assignment compatibility: struct-to-struct requires matching type
/// names; numeric slots coerce the incoming value to their tag; any other
/// combination replaces the slot wholesale (declaration shadowing rule).
fn assign_value(pool: &PoolRef, old: &Value, new: Value) -> Result<Value, Error> {
    match (old.type_of(), new.type_of()) {
        (Type::Struct, Type::Struct) => {
            if let (Value::Struct(a), Value::Struct(b)) = (old, &new) {
                let old_name = a.borrow().type_name().to_string();
                let new_name = b.borrow().type_name().to_string();
                if old_name != new_name {
                    return Err(struct_name_mismatch(&old_name, &new_name));
                }
            }
            Ok(new)
        }
        (o, n) if o.is_scalar() && n.is_scalar() && o != n => new.coerce(pool, o),
        _ => Ok(new),
    }
}

/// Coerce a value into a slot with a declared element type (list storage).
fn coerce_for_slot(pool: &PoolRef, declared: Type, value: Value) -> Result<Value, Error> {
    match declared {
        Type::Null | Type::Any => Ok(value),
        d if value.type_of() == d => Ok(value),
        d if d.is_scalar() && value.type_of().is_scalar() => value.coerce(pool, d),
        d => Err(crate::errors::list_element_mismatch(
            d.name(),
            value.type_of().name(),
        )),
    }
}

/// Place for a named field of a struct value.
fn field_place(current: &Value, field: &str) -> Result<Place, Error> {
    match current {
        Value::Struct(st) => {
            if st.borrow().field(field).is_none() {
                return Err(crate::errors::no_member(st.borrow().type_name(), field));
            }
            Ok(Place::StructField(st.clone(), field.to_string()))
        }
        other => Err(type_mismatch(format!(
            "member access requires a struct, got {}",
            other.type_of()
        ))),
    }
}
