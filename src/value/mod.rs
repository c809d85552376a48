//! Runtime values for the pscript interpreter.
//!
//! A [`Value`] pairs a type tag with its storage:
//! - Scalars (`int`, `uint`, `float`, `bool`) live in the [`MemoryPool`]
//!   and are copied on assignment; every scalar value owns (or aliases) a
//!   pool block.
//! - Composites (`str`, `list`, `struct`) live behind the counted
//!   [`Shared`] handle; assignment copies the handle and bumps the count,
//!   so copies observe each other's mutations.
//! - `null` carries no storage, and `external` wraps a non-owning host
//!   pointer.
//!
//! Heap payloads are only constructible through the factory methods on
//! `Value`; `Shared::new` is crate-private so external code cannot mint
//! uncounted handles.
//!
//! Reference-counted composites can form cycles (a list holding a struct
//! holding the same list); the runtime offers no cycle collector and such
//! graphs leak by design of the language.

mod composite;

use std::cell::{Ref, RefCell, RefMut};
use std::ffi::c_void;
use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;

use crate::errors::{invalid_cast, not_truthy, out_of_memory, type_mismatch, Error};
use crate::memory::{MemoryPool, PoolData, Pointer, NULL_POINTER};

pub use composite::{External, ListValue, StrValue, StructValue};

/// Type tag carried by every value.
///
/// `Any` only appears as a declared parameter/field/element type; no
/// runtime value ever carries it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Type {
    Null,
    Any,
    Int,
    Uint,
    Real,
    Bool,
    Str,
    List,
    Struct,
    External,
}

impl Type {
    pub fn name(self) -> &'static str {
        match self {
            Type::Null => "null",
            Type::Any => "any",
            Type::Int => "int",
            Type::Uint => "uint",
            Type::Real => "float",
            Type::Bool => "bool",
            Type::Str => "str",
            Type::List => "list",
            Type::Struct => "struct",
            Type::External => "external",
        }
    }

    /// Scalar tags participate in numeric widening and casts.
    pub fn is_scalar(self) -> bool {
        matches!(self, Type::Int | Type::Uint | Type::Real | Type::Bool)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether an explicit or implicit cast from `from` to `to` is legal.
/// Casts are identity or numeric (`bool`/`int`/`uint`/`float`); composites
/// and externals never convert.
pub fn may_cast(from: Type, to: Type) -> bool {
    from == to || (from.is_scalar() && to.is_scalar())
}

/// Cheaply cloneable handle to the context's memory pool. Scalar values
/// carry one so their storage can be released when the last holder drops.
#[derive(Clone, Debug)]
pub struct PoolRef {
    inner: Rc<RefCell<MemoryPool>>,
}

impl PoolRef {
    pub fn new(size: usize) -> Self {
        PoolRef {
            inner: Rc::new(RefCell::new(MemoryPool::new(size))),
        }
    }

    pub fn allocate(&self, bytes: usize) -> Pointer {
        self.inner.borrow_mut().allocate(bytes)
    }

    pub fn free(&self, ptr: Pointer) {
        self.inner.borrow_mut().free(ptr);
    }

    pub fn read<T: PoolData>(&self, ptr: Pointer) -> Result<T, Error> {
        self.inner.borrow().read(ptr)
    }

    pub fn write<T: PoolData>(&self, ptr: Pointer, value: T) -> Result<(), Error> {
        self.inner.borrow_mut().write(ptr, value)
    }

    pub fn verify_pointer(&self, ptr: Pointer) -> bool {
        self.inner.borrow().verify_pointer(ptr)
    }

    pub fn size(&self) -> usize {
        self.inner.borrow().size()
    }
}

/// Counted, shared handle to a composite payload. Cloning shares identity;
/// the payload drops with the last holder.
#[derive(Debug)]
pub struct Shared<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Shared<T> {
    pub(crate) fn new(value: T) -> Self {
        Shared {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    /// Whether two handles share the same payload.
    pub fn ptr_eq(&self, other: &Shared<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live holders.
    pub fn holders(&self) -> usize {
        Rc::strong_count(&self.inner)
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared {
            inner: Rc::clone(&self.inner),
        }
    }
}

/// Pool-backed storage slot of a scalar value.
///
/// An owning cell frees its block on drop; an alias borrows the same block
/// without ownership (produced by the take-reference operation) and must
/// not outlive its source. Cells are only constructible through the
/// `Value` factory methods.
#[derive(Debug)]
pub struct ScalarCell {
    pool: PoolRef,
    ptr: Pointer,
    alias: bool,
}

impl ScalarCell {
    fn alloc<T: PoolData>(pool: &PoolRef, value: T) -> Result<Self, Error> {
        let ptr = pool.allocate(T::SIZE);
        if ptr == NULL_POINTER {
            return Err(out_of_memory(T::SIZE));
        }
        pool.write(ptr, value)?;
        Ok(ScalarCell {
            pool: pool.clone(),
            ptr,
            alias: false,
        })
    }

    fn read<T: PoolData>(&self) -> Result<T, Error> {
        self.pool.read(self.ptr)
    }

    fn write<T: PoolData>(&self, value: T) -> Result<(), Error> {
        self.pool.write(self.ptr, value)
    }

    fn copy<T: PoolData>(&self) -> Result<Self, Error> {
        ScalarCell::alloc(&self.pool, self.read::<T>()?)
    }

    fn alias(&self) -> Self {
        ScalarCell {
            pool: self.pool.clone(),
            ptr: self.ptr,
            alias: true,
        }
    }
}

impl Drop for ScalarCell {
    fn drop(&mut self) {
        if !self.alias && self.ptr != NULL_POINTER {
            self.pool.free(self.ptr);
        }
    }
}

/// A typed runtime value.
#[derive(Debug)]
pub enum Value {
    Null,
    Int(ScalarCell),
    Uint(ScalarCell),
    Real(ScalarCell),
    Bool(ScalarCell),
    Str(Shared<StrValue>),
    List(Shared<ListValue>),
    Struct(Shared<StructValue>),
    External(External),
}

impl Value {
    // Factory methods (the only way to construct storage-backed values).

    pub fn null() -> Value {
        Value::Null
    }

    pub fn int(pool: &PoolRef, v: i32) -> Result<Value, Error> {
        Ok(Value::Int(ScalarCell::alloc(pool, v)?))
    }

    pub fn uint(pool: &PoolRef, v: u32) -> Result<Value, Error> {
        Ok(Value::Uint(ScalarCell::alloc(pool, v)?))
    }

    pub fn real(pool: &PoolRef, v: f32) -> Result<Value, Error> {
        Ok(Value::Real(ScalarCell::alloc(pool, v)?))
    }

    pub fn boolean(pool: &PoolRef, v: bool) -> Result<Value, Error> {
        Ok(Value::Bool(ScalarCell::alloc(pool, v)?))
    }

    pub fn string(s: StrValue) -> Value {
        Value::Str(Shared::new(s))
    }

    pub fn list(l: ListValue) -> Value {
        Value::List(Shared::new(l))
    }

    pub fn structure(s: StructValue) -> Value {
        Value::Struct(Shared::new(s))
    }

    pub fn external(ptr: *mut c_void, element_type: Type) -> Value {
        Value::External(External::new(ptr, element_type))
    }

    // Inspection

    pub fn type_of(&self) -> Type {
        match self {
            Value::Null => Type::Null,
            Value::Int(_) => Type::Int,
            Value::Uint(_) => Type::Uint,
            Value::Real(_) => Type::Real,
            Value::Bool(_) => Type::Bool,
            Value::Str(_) => Type::Str,
            Value::List(_) => Type::List,
            Value::Struct(_) => Type::Struct,
            Value::External(_) => Type::External,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this value is a non-owning alias over another value's
    /// storage. Composite handles are owning shares and never report true.
    pub fn is_reference(&self) -> bool {
        match self {
            Value::Int(c) | Value::Uint(c) | Value::Real(c) | Value::Bool(c) => c.alias,
            _ => false,
        }
    }

    // Ownership

    /// Copy this value: scalars duplicate their pool storage, composites
    /// share theirs, externals are plain copies.
    pub fn copy(&self) -> Result<Value, Error> {
        Ok(match self {
            Value::Null => Value::Null,
            Value::Int(c) => Value::Int(c.copy::<i32>()?),
            Value::Uint(c) => Value::Uint(c.copy::<u32>()?),
            Value::Real(c) => Value::Real(c.copy::<f32>()?),
            Value::Bool(c) => Value::Bool(c.copy::<bool>()?),
            Value::Str(s) => Value::Str(s.clone()),
            Value::List(l) => Value::List(l.clone()),
            Value::Struct(s) => Value::Struct(s.clone()),
            Value::External(e) => Value::External(*e),
        })
    }

    /// Produce a reference alias of this value. Scalar aliases borrow the
    /// same pool slot without ownership; composite aliases are ordinary
    /// shares of the counted handle.
    pub fn make_ref(&self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Int(c) => Value::Int(c.alias()),
            Value::Uint(c) => Value::Uint(c.alias()),
            Value::Real(c) => Value::Real(c.alias()),
            Value::Bool(c) => Value::Bool(c.alias()),
            Value::Str(s) => Value::Str(s.clone()),
            Value::List(l) => Value::List(l.clone()),
            Value::Struct(s) => Value::Struct(s.clone()),
            Value::External(e) => Value::External(*e),
        }
    }

    // Scalar accessors

    pub fn as_int(&self) -> Result<i32, Error> {
        match self {
            Value::Int(c) => c.read(),
            other => Err(type_mismatch(format!(
                "expected int, got {}",
                other.type_of()
            ))),
        }
    }

    pub fn as_uint(&self) -> Result<u32, Error> {
        match self {
            Value::Uint(c) => c.read(),
            other => Err(type_mismatch(format!(
                "expected uint, got {}",
                other.type_of()
            ))),
        }
    }

    pub fn as_real(&self) -> Result<f32, Error> {
        match self {
            Value::Real(c) => c.read(),
            other => Err(type_mismatch(format!(
                "expected float, got {}",
                other.type_of()
            ))),
        }
    }

    pub fn as_bool(&self) -> Result<bool, Error> {
        match self {
            Value::Bool(c) => c.read(),
            other => Err(type_mismatch(format!(
                "expected bool, got {}",
                other.type_of()
            ))),
        }
    }

    /// Read any scalar as an `i32`, converting along numeric lines.
    pub fn scalar_to_i32(&self) -> Result<i32, Error> {
        match self {
            Value::Int(c) => c.read(),
            Value::Uint(c) => Ok(c.read::<u32>()? as i32),
            Value::Real(c) => Ok(c.read::<f32>()? as i32),
            Value::Bool(c) => Ok(i32::from(c.read::<bool>()?)),
            other => Err(invalid_cast(other.type_of().name(), Type::Int.name())),
        }
    }

    /// Read any scalar as a `u32`, converting along numeric lines.
    pub fn scalar_to_u32(&self) -> Result<u32, Error> {
        match self {
            Value::Int(c) => Ok(c.read::<i32>()? as u32),
            Value::Uint(c) => c.read(),
            Value::Real(c) => Ok(c.read::<f32>()? as u32),
            Value::Bool(c) => Ok(u32::from(c.read::<bool>()?)),
            other => Err(invalid_cast(other.type_of().name(), Type::Uint.name())),
        }
    }

    /// Read any scalar as an `f32`, converting along numeric lines.
    pub fn scalar_to_f32(&self) -> Result<f32, Error> {
        match self {
            Value::Int(c) => Ok(c.read::<i32>()? as f32),
            Value::Uint(c) => Ok(c.read::<u32>()? as f32),
            Value::Real(c) => c.read(),
            Value::Bool(c) => Ok(f32::from(u8::from(c.read::<bool>()?))),
            other => Err(invalid_cast(other.type_of().name(), Type::Real.name())),
        }
    }

    /// Read any scalar as a `bool` (numerics compare against zero).
    pub fn scalar_to_bool(&self) -> Result<bool, Error> {
        match self {
            Value::Int(c) => Ok(c.read::<i32>()? != 0),
            Value::Uint(c) => Ok(c.read::<u32>()? != 0),
            Value::Real(c) => Ok(c.read::<f32>()? != 0.0),
            Value::Bool(c) => c.read(),
            other => Err(invalid_cast(other.type_of().name(), Type::Bool.name())),
        }
    }

    /// Overwrite this scalar's storage in place (used by reference
    /// parameters and aliases). Tags must match.
    pub(crate) fn write_scalar_from(&self, source: &Value) -> Result<(), Error> {
        match (self, source) {
            (Value::Int(dst), Value::Int(src)) => dst.write(src.read::<i32>()?),
            (Value::Uint(dst), Value::Uint(src)) => dst.write(src.read::<u32>()?),
            (Value::Real(dst), Value::Real(src)) => dst.write(src.read::<f32>()?),
            (Value::Bool(dst), Value::Bool(src)) => dst.write(src.read::<bool>()?),
            (dst, src) => Err(type_mismatch(format!(
                "cannot store {} into {} storage",
                src.type_of(),
                dst.type_of()
            ))),
        }
    }

    /// Convert this value to `target` along the numeric cast matrix. Used
    /// by parameter binding, assignment, and explicit casts alike.
    pub fn coerce(&self, pool: &PoolRef, target: Type) -> Result<Value, Error> {
        if self.type_of() == target {
            return self.copy();
        }
        if !may_cast(self.type_of(), target) {
            return Err(invalid_cast(self.type_of().name(), target.name()));
        }
        match target {
            Type::Int => Value::int(pool, self.scalar_to_i32()?),
            Type::Uint => Value::uint(pool, self.scalar_to_u32()?),
            Type::Real => Value::real(pool, self.scalar_to_f32()?),
            Type::Bool => Value::boolean(pool, self.scalar_to_bool()?),
            other => Err(invalid_cast(self.type_of().name(), other.name())),
        }
    }

    /// Truthiness for conditions: booleans as-is, numerics compare against
    /// zero, everything else is a type error.
    pub fn is_truthy(&self) -> Result<bool, Error> {
        if self.type_of().is_scalar() {
            self.scalar_to_bool()
        } else {
            Err(not_truthy(self.type_of().name()))
        }
    }

    // Display

    /// Render this value the way `__print` shows it: scalars in natural
    /// form, lists as `[a, b]`, structs as `Name {\n\tfield: value\n}`,
    /// strings as their raw characters.
    pub fn display_value(&self) -> Result<String, Error> {
        let mut out = String::new();
        self.render(&mut out)?;
        Ok(out)
    }

    fn render(&self, out: &mut String) -> Result<(), Error> {
        match self {
            Value::Null => out.push_str("null"),
            Value::Int(c) => {
                let _ = write!(out, "{}", c.read::<i32>()?);
            }
            Value::Uint(c) => {
                let _ = write!(out, "{}", c.read::<u32>()?);
            }
            Value::Real(c) => {
                let _ = write!(out, "{}", c.read::<f32>()?);
            }
            Value::Bool(c) => {
                let _ = write!(out, "{}", c.read::<bool>()?);
            }
            Value::Str(s) => out.push_str(s.borrow().as_str()),
            Value::List(l) => {
                out.push('[');
                let list = l.borrow();
                for (i, item) in list.items().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.render(out)?;
                }
                out.push(']');
            }
            Value::Struct(s) => {
                let st = s.borrow();
                let _ = write!(out, "{} {{\n", st.type_name());
                for (name, value) in st.fields() {
                    let _ = write!(out, "\t{name}: ");
                    value.render(out)?;
                    out.push('\n');
                }
                out.push('}');
            }
            Value::External(e) => {
                let _ = write!(out, "{e}");
            }
        }
        Ok(())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.display_value() {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}
