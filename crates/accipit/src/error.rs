//! Stage-separated error types.
//!
//! Parsing and evaluation fail in different ways and are reported differently
//! (a parse error points at source text; a runtime error points at a name or
//! value), so they stay as two enums unified by [`InterpretError`], the same
//! shape the teacher uses for its own REPL/resource error split.

use std::fmt;

/// A lexing or parsing failure, anchored to a source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
    /// The offending source line, pre-rendered so callers don't need the
    /// original buffer around to print a caret.
    pub context: String,
}

impl ParseError {
    #[must_use]
    pub fn new(line: usize, column: usize, message: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
            context: context.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "parse error at {}:{}: {}", self.line, self.column, self.message)?;
        write!(f, "  {}", self.context)?;
        if self.column > 0 {
            write!(f, "\n  {}^", " ".repeat(self.column - 1))?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

/// A failure raised while linking or evaluating an already-parsed [`crate::ast::Program`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Two global or function declarations claim the same qualified name.
    DuplicateDefinition(String),
    /// A name was referenced but never bound (unknown global, dangling label, ...).
    UnboundIdentifier(String),
    /// An operand had the wrong runtime kind for the operation (e.g. `add` on a pointer).
    TypeError(String),
    /// An arithmetic operation is undefined for its operands (division/remainder by zero).
    ArithmeticError(String),
    /// A pointer fell outside the bounds of the cell store.
    MemoryError(String),
    /// The program shape violates an invariant the parser alone can't check
    /// (call arity mismatch, a block with no terminator reachable, ...).
    MalformedIR(String),
    /// A `call` target named something that isn't a defined function or
    /// recognized built-in.
    NotCallable(String),
    /// Recursion exceeded the configured depth guard.
    Resource(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateDefinition(name) => write!(f, "duplicate definition: {name}"),
            Self::UnboundIdentifier(name) => write!(f, "unbound identifier: {name}"),
            Self::TypeError(msg) => write!(f, "type error: {msg}"),
            Self::ArithmeticError(msg) => write!(f, "arithmetic error: {msg}"),
            Self::MemoryError(msg) => write!(f, "memory error: {msg}"),
            Self::MalformedIR(msg) => write!(f, "malformed IR: {msg}"),
            Self::NotCallable(name) => write!(f, "not callable: {name}"),
            Self::Resource(msg) => write!(f, "resource limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// The error type returned by the crate's public entry points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterpretError {
    Parse(ParseError),
    Runtime(RuntimeError),
}

impl InterpretError {
    /// The process exit code a CLI should report for this failure, per spec §6:
    /// parse failures and runtime failures are distinguished at the shell.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Parse(_) => 2,
            Self::Runtime(_) => 1,
        }
    }
}

impl fmt::Display for InterpretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "{e}"),
            Self::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for InterpretError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Runtime(e) => Some(e),
        }
    }
}

impl From<ParseError> for InterpretError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<RuntimeError> for InterpretError {
    fn from(e: RuntimeError) -> Self {
        Self::Runtime(e)
    }
}
