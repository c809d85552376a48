//! Errors raised by the pscript interpreter.
//!
//! All parse and runtime failures are represented by a single [`Error`]
//! carrying a kind, a human-readable message, and an optional source
//! location. Constructor functions below are the single import point for
//! producing errors, so messages live in one place.

use std::fmt;

/// Classification of an interpreter error.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorKind {
    /// The parser rejected the source text.
    Parse,
    /// Identifier not found in any scope or the globals.
    UndefinedVariable,
    /// Call name not in the function table and no built-in/member match.
    UndefinedFunction,
    /// Constructor references an unknown struct.
    UndefinedStruct,
    /// Call argument count differs from the declared parameter count.
    Arity,
    /// Extern call with more arguments than the bridge supports.
    ArityLimitExceeded,
    /// Incompatible assignment, cast, or member type.
    Type,
    /// Operator applied to an unsupported type pair.
    UnsupportedOperator,
    /// Mutating operator whose left operand is not an lvalue.
    NotAssignable,
    /// List index out of range.
    Index,
    /// Pool access through the sentinel or an out-of-range offset.
    InvalidPointer,
    /// The memory pool could not satisfy an allocation.
    OutOfMemory,
    /// Integer division or modulo by zero.
    DivisionByZero,
    /// Import path not found on any module search root.
    ModuleNotFound,
    /// Extern symbol not present in any chained library.
    ExternNotFound,
    /// Extern lookup attempted with no bridge configured.
    NoExternBridge,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::Parse => "ParseError",
            ErrorKind::UndefinedVariable => "UndefinedVariable",
            ErrorKind::UndefinedFunction => "UndefinedFunction",
            ErrorKind::UndefinedStruct => "UndefinedStruct",
            ErrorKind::Arity => "ArityError",
            ErrorKind::ArityLimitExceeded => "ArityLimitExceeded",
            ErrorKind::Type => "TypeError",
            ErrorKind::UnsupportedOperator => "UnsupportedOperator",
            ErrorKind::NotAssignable => "NotAssignable",
            ErrorKind::Index => "IndexError",
            ErrorKind::InvalidPointer => "InvalidPointer",
            ErrorKind::OutOfMemory => "OutOfMemory",
            ErrorKind::DivisionByZero => "DivisionByZero",
            ErrorKind::ModuleNotFound => "ModuleNotFound",
            ErrorKind::ExternNotFound => "ExternNotFound",
            ErrorKind::NoExternBridge => "NoExternBridge",
        }
    }
}

/// A parse or runtime error with an optional source location.
#[derive(Clone, Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Error {
            kind,
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Attach a source location. An already-located error keeps the original
    /// (innermost) position.
    pub fn at(mut self, line: u32, column: u32) -> Self {
        if self.line.is_none() {
            self.line = Some(line);
            self.column = Some(column);
        }
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.name(), self.message)?;
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, " (line {line}, column {column})")?;
        }
        Ok(())
    }
}

// Parse errors

pub fn parse_error(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Parse, message)
}

// Name resolution errors

pub fn undefined_variable(name: &str) -> Error {
    Error::new(
        ErrorKind::UndefinedVariable,
        format!("undefined variable '{name}'"),
    )
}

pub fn undefined_function(name: &str) -> Error {
    Error::new(
        ErrorKind::UndefinedFunction,
        format!("undefined function '{name}'"),
    )
}

pub fn undefined_struct(name: &str) -> Error {
    Error::new(
        ErrorKind::UndefinedStruct,
        format!("undefined struct '{name}'"),
    )
}

// Call errors

pub fn wrong_arg_count(name: &str, expected: usize, got: usize) -> Error {
    Error::new(
        ErrorKind::Arity,
        format!("'{name}' expects {expected} argument(s), got {got}"),
    )
}

pub fn extern_arity_limit(name: &str, got: usize) -> Error {
    Error::new(
        ErrorKind::ArityLimitExceeded,
        format!("extern call '{name}' with {got} arguments exceeds the limit of 8"),
    )
}

// Type errors

pub fn type_mismatch(message: impl Into<String>) -> Error {
    Error::new(ErrorKind::Type, message)
}

pub fn invalid_cast(from: &str, to: &str) -> Error {
    Error::new(ErrorKind::Type, format!("cannot cast {from} to {to}"))
}

pub fn struct_name_mismatch(expected: &str, got: &str) -> Error {
    Error::new(
        ErrorKind::Type,
        format!("cannot assign struct '{got}' to struct '{expected}'"),
    )
}

pub fn list_element_mismatch(declared: &str, got: &str) -> Error {
    Error::new(
        ErrorKind::Type,
        format!("cannot append {got} to a list of {declared}"),
    )
}

pub fn no_member(type_name: &str, member: &str) -> Error {
    Error::new(
        ErrorKind::Type,
        format!("'{type_name}' has no member '{member}'"),
    )
}

pub fn not_truthy(type_name: &str) -> Error {
    Error::new(
        ErrorKind::Type,
        format!("{type_name} cannot be used as a condition"),
    )
}

// Operator errors

pub fn unsupported_operator(op: &str, lhs: &str, rhs: &str) -> Error {
    Error::new(
        ErrorKind::UnsupportedOperator,
        format!("operator '{op}' not supported for {lhs} and {rhs}"),
    )
}

pub fn unsupported_unary(op: &str, operand: &str) -> Error {
    Error::new(
        ErrorKind::UnsupportedOperator,
        format!("unary operator '{op}' not supported for {operand}"),
    )
}

pub fn not_assignable() -> Error {
    Error::new(
        ErrorKind::NotAssignable,
        "left side of a mutating operator is not assignable",
    )
}

pub fn division_by_zero() -> Error {
    Error::new(ErrorKind::DivisionByZero, "division by zero")
}

pub fn modulo_by_zero() -> Error {
    Error::new(ErrorKind::DivisionByZero, "modulo by zero")
}

// Index errors

pub fn index_out_of_bounds(index: i64, len: usize) -> Error {
    Error::new(
        ErrorKind::Index,
        format!("list index {index} out of range (size {len})"),
    )
}

// Memory errors

pub fn invalid_pointer(ptr: usize) -> Error {
    Error::new(ErrorKind::InvalidPointer, format!("invalid pointer {ptr:#x}"))
}

pub fn out_of_memory(bytes: usize) -> Error {
    Error::new(
        ErrorKind::OutOfMemory,
        format!("memory pool exhausted allocating {bytes} bytes"),
    )
}

// Import and extern errors

pub fn module_not_found(module: &str) -> Error {
    Error::new(
        ErrorKind::ModuleNotFound,
        format!("module '{module}' not found on any search root"),
    )
}

pub fn extern_not_found(name: &str) -> Error {
    Error::new(
        ErrorKind::ExternNotFound,
        format!("extern symbol '{name}' not found in any library"),
    )
}

pub fn no_extern_bridge(name: &str) -> Error {
    Error::new(
        ErrorKind::NoExternBridge,
        format!("extern symbol '{name}' requested but no extern library is configured"),
    )
}
