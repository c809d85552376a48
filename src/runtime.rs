//! Per-execution runtime handles: I/O sinks, the extern library chain, and
//! module search roots.
//!
//! Sinks use enum dispatch rather than trait objects; the buffer variants
//! exist so hosts and tests can capture program output or feed scripted
//! input. The interpreter is single-threaded, so buffers are plain
//! `Rc<RefCell<String>>`.

use std::cell::RefCell;
use std::io::BufRead;
use std::path::PathBuf;
use std::rc::Rc;

use crate::externs::ExternLibrary;

/// Shared text buffer used by the capturing sink variants.
#[derive(Clone, Default)]
pub struct Buffer {
    inner: Rc<RefCell<String>>,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer pre-filled with input lines for [`InputSource::Buffer`].
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Buffer {
            inner: Rc::new(RefCell::new(contents.into())),
        }
    }

    /// Snapshot of everything written so far.
    pub fn contents(&self) -> String {
        self.inner.borrow().clone()
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }

    fn push_str(&self, s: &str) {
        self.inner.borrow_mut().push_str(s);
    }

    /// Remove and return the first line (without its newline).
    fn take_line(&self) -> String {
        let mut inner = self.inner.borrow_mut();
        match inner.find('\n') {
            Some(pos) => {
                let line = inner[..pos].to_string();
                inner.drain(..=pos);
                line
            }
            None => std::mem::take(&mut *inner),
        }
    }
}

/// Where program output (or diagnostics) goes.
pub enum OutputSink {
    Stdout,
    Stderr,
    Buffer(Buffer),
}

impl OutputSink {
    /// Sink writing into a fresh capture buffer; returns the sink and the
    /// buffer to read it back from.
    pub fn buffer() -> (OutputSink, Buffer) {
        let buffer = Buffer::new();
        (OutputSink::Buffer(buffer.clone()), buffer)
    }

    pub fn write_str(&self, s: &str) {
        match self {
            OutputSink::Stdout => print!("{s}"),
            OutputSink::Stderr => eprint!("{s}"),
            OutputSink::Buffer(buffer) => buffer.push_str(s),
        }
    }

    pub fn write_line(&self, s: &str) {
        self.write_str(s);
        self.write_str("\n");
    }
}

/// Where `__readln` reads from.
pub enum InputSource {
    Stdin,
    Buffer(Buffer),
}

impl InputSource {
    /// Source reading the given text line by line.
    pub fn buffer(contents: impl Into<String>) -> InputSource {
        InputSource::Buffer(Buffer::with_contents(contents))
    }

    /// Read one line, without the trailing newline. Returns an empty
    /// string at end of input.
    pub fn read_line(&mut self) -> String {
        match self {
            InputSource::Stdin => {
                let mut line = String::new();
                let _ = std::io::stdin().lock().read_line(&mut line);
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                line
            }
            InputSource::Buffer(buffer) => buffer.take_line(),
        }
    }
}

/// Runtime handles passed along with each execution.
pub struct ExecutionContext {
    pub input: InputSource,
    pub output: OutputSink,
    pub error: OutputSink,
    /// Head of the extern library chain, if the host provides one.
    pub externs: Option<ExternLibrary>,
    /// Module roots searched by `import`, in order.
    pub module_paths: Vec<PathBuf>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        ExecutionContext {
            input: InputSource::Stdin,
            output: OutputSink::Stdout,
            error: OutputSink::Stderr,
            externs: None,
            module_paths: vec![PathBuf::from("pscript-modules/")],
        }
    }
}

impl ExecutionContext {
    /// Context with captured output and error sinks, for hosts and tests
    /// that want to observe what the script printed.
    pub fn captured() -> (Self, Buffer, Buffer) {
        let (output, out_buffer) = OutputSink::buffer();
        let (error, err_buffer) = OutputSink::buffer();
        let ctx = ExecutionContext {
            input: InputSource::buffer(""),
            output,
            error,
            externs: None,
            module_paths: vec![PathBuf::from("pscript-modules/")],
        };
        (ctx, out_buffer, err_buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_sink_captures_lines() {
        let (sink, buffer) = OutputSink::buffer();
        sink.write_line("hello");
        sink.write_str("wor");
        sink.write_str("ld");
        assert_eq!(buffer.contents(), "hello\nworld");
    }

    #[test]
    fn test_buffer_clear() {
        let (sink, buffer) = OutputSink::buffer();
        sink.write_line("x");
        buffer.clear();
        assert_eq!(buffer.contents(), "");
    }

    #[test]
    fn test_input_buffer_reads_lines() {
        let mut input = InputSource::buffer("one\ntwo\n");
        assert_eq!(input.read_line(), "one");
        assert_eq!(input.read_line(), "two");
        assert_eq!(input.read_line(), "");
    }

    #[test]
    fn test_input_buffer_last_line_without_newline() {
        let mut input = InputSource::buffer("tail");
        assert_eq!(input.read_line(), "tail");
        assert_eq!(input.read_line(), "");
    }

    #[test]
    fn test_default_module_paths() {
        let ctx = ExecutionContext::default();
        assert_eq!(ctx.module_paths, vec![PathBuf::from("pscript-modules/")]);
    }
}
