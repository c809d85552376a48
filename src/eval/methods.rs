//! Member functions of the built-in composite types.
//!
//! Lists: `append(v)`, `size()`. Strings: `format(args)`, `parse_int()`,
//! `parse_float()`. Receivers are shared handles, so `append` through any
//! copy is visible to every holder.

use crate::errors::{undefined_function, wrong_arg_count, Error};
use crate::value::{PoolRef, Value};

/// Dispatch a member function call on `receiver`.
pub(crate) fn dispatch_member(
    pool: &PoolRef,
    receiver: &Value,
    method: &str,
    args: &[Value],
) -> Result<Value, Error> {
    match (receiver, method) {
        (Value::List(list), "append") => {
            if args.len() != 1 {
                return Err(wrong_arg_count("append", 1, args.len()));
            }
            list.borrow_mut().append(args[0].copy()?)?;
            Ok(Value::null())
        }
        (Value::List(list), "size") => {
            if !args.is_empty() {
                return Err(wrong_arg_count("size", 0, args.len()));
            }
            let len = list.borrow().len();
            Value::int(pool, len as i32)
        }

        (Value::Str(s), "format") => {
            if args.len() != 1 {
                return Err(wrong_arg_count("format", 1, args.len()));
            }
            let Value::List(format_args) = &args[0] else {
                return Err(crate::errors::type_mismatch(format!(
                    "format expects a list of arguments, got {}",
                    args[0].type_of()
                )));
            };
            let formatted = {
                let string = s.borrow();
                let items = format_args.borrow();
                string.format(items.items())?
            };
            Ok(Value::string(formatted))
        }
        (Value::Str(s), "parse_int") => {
            if !args.is_empty() {
                return Err(wrong_arg_count("parse_int", 0, args.len()));
            }
            let parsed = s.borrow().parse_int()?;
            Value::int(pool, parsed)
        }
        (Value::Str(s), "parse_float") => {
            if !args.is_empty() {
                return Err(wrong_arg_count("parse_float", 0, args.len()));
            }
            let parsed = s.borrow().parse_float()?;
            Value::real(pool, parsed)
        }

        _ => Err(undefined_function(&format!(
            "{}.{}",
            receiver.type_of(),
            method
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ListValue, StrValue};

    fn pool() -> PoolRef {
        PoolRef::new(4096)
    }

    #[test]
    fn test_list_append_and_size() {
        let p = pool();
        let list = Value::list(ListValue::new(vec![Value::int(&p, 1).unwrap()]));
        dispatch_member(&p, &list, "append", &[Value::int(&p, 2).unwrap()]).unwrap();
        let size = dispatch_member(&p, &list, "size", &[]).unwrap();
        assert_eq!(size.as_int().unwrap(), 2);
    }

    #[test]
    fn test_list_append_rejects_foreign_type() {
        let p = pool();
        let list = Value::list(ListValue::new(vec![Value::int(&p, 1).unwrap()]));
        let err =
            dispatch_member(&p, &list, "append", &[Value::string(StrValue::new("x"))]).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::Type);
    }

    #[test]
    fn test_string_format() {
        let p = pool();
        let s = Value::string(StrValue::new("Hello, {}"));
        let args = Value::list(ListValue::new(vec![Value::string(StrValue::new("pengu"))]));
        let out = dispatch_member(&p, &s, "format", &[args]).unwrap();
        assert_eq!(out.display_value().unwrap(), "Hello, pengu");
    }

    #[test]
    fn test_string_parse() {
        let p = pool();
        let s = Value::string(StrValue::new("42"));
        let n = dispatch_member(&p, &s, "parse_int", &[]).unwrap();
        assert_eq!(n.as_int().unwrap(), 42);

        let s = Value::string(StrValue::new("1.5"));
        let f = dispatch_member(&p, &s, "parse_float", &[]).unwrap();
        assert_eq!(f.as_real().unwrap(), 1.5);
    }

    #[test]
    fn test_unknown_member() {
        let p = pool();
        let list = Value::list(ListValue::new(vec![]));
        let err = dispatch_member(&p, &list, "pop", &[]).unwrap_err();
        assert_eq!(err.kind, crate::errors::ErrorKind::UndefinedFunction);
    }
}
