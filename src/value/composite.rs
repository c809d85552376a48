//! Composite runtime values: strings, lists, structs, and external objects.
//!
//! Composites live behind the counted [`Shared`](super::Shared) handle;
//! the types here are the payloads.

use std::ffi::c_void;
use std::fmt;

use crate::errors::{
    list_element_mismatch, no_member, type_mismatch, Error,
};
use super::{Type, Value};

/// Immutable character sequence.
#[derive(Debug)]
pub struct StrValue {
    value: String,
}

impl StrValue {
    pub fn new(value: impl Into<String>) -> Self {
        StrValue {
            value: value.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Concatenate two strings into a new one.
    pub fn concat(&self, other: &StrValue) -> StrValue {
        StrValue::new(format!("{}{}", self.value, other.value))
    }

    /// Substitute each `{}` placeholder with the display form of the next
    /// positional argument. Surplus arguments are ignored; missing ones are
    /// a type error.
    pub fn format(&self, args: &[Value]) -> Result<StrValue, Error> {
        let mut out = String::with_capacity(self.value.len());
        let mut rest = self.value.as_str();
        let mut next = 0;
        while let Some(pos) = rest.find("{}") {
            out.push_str(&rest[..pos]);
            let arg = args.get(next).ok_or_else(|| {
                type_mismatch(format!(
                    "format string expects at least {} argument(s), got {}",
                    next + 1,
                    args.len()
                ))
            })?;
            out.push_str(&arg.display_value()?);
            next += 1;
            rest = &rest[pos + 2..];
        }
        out.push_str(rest);
        Ok(StrValue::new(out))
    }

    pub fn parse_int(&self) -> Result<i32, Error> {
        self.value
            .trim()
            .parse::<i32>()
            .map_err(|_| type_mismatch(format!("cannot parse '{}' as an integer", self.value)))
    }

    pub fn parse_float(&self) -> Result<f32, Error> {
        self.value
            .trim()
            .parse::<f32>()
            .map_err(|_| type_mismatch(format!("cannot parse '{}' as a float", self.value)))
    }
}

impl fmt::Display for StrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Ordered sequence of values with a declared element type.
///
/// The element type is fixed by the first inserted element; empty lists
/// accept anything until then.
#[derive(Debug)]
pub struct ListValue {
    items: Vec<Value>,
    element_type: Type,
}

impl ListValue {
    pub fn new(items: Vec<Value>) -> Self {
        let element_type = items.first().map_or(Type::Null, Value::type_of);
        ListValue {
            items,
            element_type,
        }
    }

    pub fn element_type(&self) -> Type {
        self.element_type
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.items.get_mut(index)
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub(crate) fn set(&mut self, index: usize, value: Value) {
        self.items[index] = value;
    }

    /// Append a value, rejecting element types foreign to the declared one.
    pub fn append(&mut self, value: Value) -> Result<(), Error> {
        match self.element_type {
            Type::Null | Type::Any => {
                self.element_type = value.type_of();
            }
            declared if value.type_of() != declared => {
                return Err(list_element_mismatch(
                    declared.name(),
                    value.type_of().name(),
                ));
            }
            _ => {}
        }
        self.items.push(value);
        Ok(())
    }
}

/// Struct instance: a named mapping from field name to value. Field order
/// follows the struct declaration.
#[derive(Debug)]
pub struct StructValue {
    type_name: String,
    fields: Vec<(String, Value)>,
}

impl StructValue {
    pub fn new(type_name: impl Into<String>, fields: Vec<(String, Value)>) -> Self {
        StructValue {
            type_name: type_name.into(),
            fields,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn field_mut(&mut self, name: &str) -> Result<&mut Value, Error> {
        let type_name = self.type_name.clone();
        self.fields
            .iter_mut()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
            .ok_or_else(|| no_member(&type_name, name))
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }
}

/// Non-owning wrapper around a raw host pointer with a declared element
/// type. The host keeps ownership; the interpreter only carries it around.
#[derive(Clone, Copy, Debug)]
pub struct External {
    ptr: *mut c_void,
    element_type: Type,
}

impl External {
    pub fn new(ptr: *mut c_void, element_type: Type) -> Self {
        External { ptr, element_type }
    }

    pub fn pointer(&self) -> *mut c_void {
        self.ptr
    }

    pub fn element_type(&self) -> Type {
        self.element_type
    }
}

impl fmt::Display for External {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[external object at {:#x}]", self.ptr as usize)
    }
}
