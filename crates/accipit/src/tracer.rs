//! Zero-cost execution tracing.
//!
//! `TraceSink` is threaded through the evaluator as a generic parameter
//! rather than a trait object, so a build with [`NoopTrace`] compiles the
//! trace calls away entirely instead of paying for a vtable dispatch on
//! every binding.

use crate::ast::Ident;
use crate::value::Value;

/// Observes evaluator progress without influencing it.
pub trait TraceSink {
    fn on_enter_block(&mut self, label: &Ident) {
        let _ = label;
    }

    fn on_binding(&mut self, name: &Ident, value: Value) {
        let _ = (name, value);
    }

    fn on_call(&mut self, callee: &Ident, depth: usize) {
        let _ = (callee, depth);
    }

    fn on_return(&mut self, callee: &Ident, value: Value, depth: usize) {
        let _ = (callee, value, depth);
    }
}

/// The default sink: every hook is a no-op, optimized away entirely.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTrace;

impl TraceSink for NoopTrace {}

/// Writes a line to stderr for every block entry, binding, call, and
/// return, for the CLI's `--debug` flag.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrTrace;

impl TraceSink for StderrTrace {
    fn on_enter_block(&mut self, label: &Ident) {
        eprintln!("[trace] entering block {label}");
    }

    fn on_binding(&mut self, name: &Ident, value: Value) {
        eprintln!("[trace] {name} = {value}");
    }

    fn on_call(&mut self, callee: &Ident, depth: usize) {
        eprintln!("[trace] {}call {callee}", "  ".repeat(depth));
    }

    fn on_return(&mut self, callee: &Ident, value: Value, depth: usize) {
        eprintln!("[trace] {}{callee} returned {value}", "  ".repeat(depth));
    }
}
