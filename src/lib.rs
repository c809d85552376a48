//! pscript: a small statically-surface-typed, dynamically-stored
//! scripting language with an embedded-host FFI model.
//!
//! The crate is a parser-driven tree walker: scripts parse once into an
//! opaque node tree and execute by recursive descent against a runtime
//! value system backed by a buddy-allocator memory pool.
//!
//! # Embedding
//!
//! ```no_run
//! use pscript::{Context, ExecutionContext, Script};
//!
//! let mut ctx = Context::new(1024 * 1024);
//! let mut runtime = ExecutionContext::default();
//! let script = Script::parse("__print(2 + 3);").expect("parse error");
//! ctx.execute(&script, &mut runtime);
//! ```
//!
//! Host functions and variables are exposed through
//! [`ExternLibrary`]; program I/O is redirected through the sinks on
//! [`ExecutionContext`].

pub mod errors;
pub mod eval;
pub mod externs;
pub mod memory;
pub mod runtime;
pub mod script;
pub mod syntax;
pub mod value;

pub use errors::{Error, ErrorKind};
pub use eval::Context;
pub use externs::{ExternFunction, ExternLibrary, MAX_EXTERN_ARGS};
pub use memory::{MemoryPool, Pointer, MIN_BLOCK_SIZE, NULL_POINTER};
pub use runtime::{Buffer, ExecutionContext, InputSource, OutputSink};
pub use script::Script;
pub use value::{may_cast, External, ListValue, PoolRef, Shared, StrValue, StructValue, Type, Value};
