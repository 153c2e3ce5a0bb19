//! The fixed set of I/O built-ins intercepted by name at `call` time.
//!
//! Reads and writes go through the [`Io`] trait rather than directly against
//! `std::io::stdin`/`stdout`, so tests can drive a program against an
//! in-memory buffer instead of the process's real standard streams.

use std::io::{self, BufRead, Write};

use crate::environment::Environment;
use crate::error::RuntimeError;
use crate::value::Value;

/// The host I/O surface a builtin call reads from or writes to.
pub trait Io {
    fn write_line(&mut self, text: &str) -> io::Result<()>;
    fn write_str(&mut self, text: &str) -> io::Result<()>;
    /// Writes a single raw byte, for `@putch` — distinct from `write_str`
    /// because a byte above `0x7F` is not itself valid UTF-8.
    fn write_byte(&mut self, byte: u8) -> io::Result<()>;
    fn read_int(&mut self) -> io::Result<i32>;
}

/// The real process stdin/stdout, used by the CLI.
#[derive(Debug, Default)]
pub struct StdIo;

impl Io for StdIo {
    fn write_line(&mut self, text: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{text}")
    }

    fn write_str(&mut self, text: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        write!(out, "{text}")?;
        out.flush()
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(&[byte])?;
        out.flush()
    }

    fn read_int(&mut self) -> io::Result<i32> {
        read_whitespace_delimited_int(&mut io::stdin().lock())
    }
}

fn read_whitespace_delimited_int(reader: &mut impl BufRead) -> io::Result<i32> {
    let mut digits = String::new();
    let mut started = false;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            break;
        }
        let mut consumed = 0;
        for &b in buf {
            consumed += 1;
            let c = b as char;
            if c.is_whitespace() {
                if started {
                    reader.consume(consumed);
                    return parse_int(&digits);
                }
            } else if c == '-' || c == '+' || c.is_ascii_digit() {
                started = true;
                digits.push(c);
            } else {
                return Err(io::Error::new(io::ErrorKind::InvalidData, format!("unexpected character '{c}' reading an integer")));
            }
        }
        reader.consume(consumed);
    }
    if started {
        parse_int(&digits)
    } else {
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "expected an integer, found end of input"))
    }
}

fn parse_int(digits: &str) -> io::Result<i32> {
    digits
        .parse::<i32>()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("malformed integer '{digits}': {e}")))
}

/// `Resource` is reserved for the recursion-depth guard elsewhere in the
/// evaluator, so a malformed or exhausted input stream (not a number where
/// one was expected) is a `TypeError` instead; only a genuine host I/O
/// failure (a broken pipe, a read error from the OS) is `Resource`.
fn io_err(source: io::Error) -> RuntimeError {
    match source.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => RuntimeError::TypeError(format!("malformed input: {source}")),
        _ => RuntimeError::Resource(format!("I/O error: {source}")),
    }
}

/// Returns `Some(result)` if `name` is one of the seven recognized built-ins
/// and dispatches it; `None` if the name isn't a built-in, in which case the
/// caller falls back to resolving a user `FunDefn`.
pub fn dispatch(name: &str, args: &[Value], env: &mut Environment<'_>, io: &mut dyn Io) -> Option<Result<Value, RuntimeError>> {
    Some(match name {
        "@write" => write_builtin(args, io),
        "@putint" => putint_builtin(args, io),
        "@putch" => putch_builtin(args, io),
        "@read" | "@getint" => read_builtin(io),
        "@getarray" => getarray_builtin(args, env, io),
        "@putarray" => putarray_builtin(args, env, io),
        _ => return None,
    })
}

fn expect_int(args: &[Value], idx: usize) -> Result<i32, RuntimeError> {
    match args.get(idx) {
        Some(v) => v
            .as_int()
            .ok_or_else(|| RuntimeError::TypeError(format!("builtin argument {idx} must be an i32, found {}", v.kind_name()))),
        None => Err(RuntimeError::MalformedIR(format!("builtin called with too few arguments (missing argument {idx})"))),
    }
}

fn expect_ptr(args: &[Value], idx: usize) -> Result<usize, RuntimeError> {
    match args.get(idx) {
        Some(v) => v
            .as_addr()
            .ok_or_else(|| RuntimeError::TypeError(format!("builtin argument {idx} must be a pointer, found {}", v.kind_name()))),
        None => Err(RuntimeError::MalformedIR(format!("builtin called with too few arguments (missing argument {idx})"))),
    }
}

fn write_builtin(args: &[Value], io: &mut dyn Io) -> Result<Value, RuntimeError> {
    let n = expect_int(args, 0)?;
    io.write_line(&n.to_string()).map_err(io_err)?;
    Ok(Value::Int(0))
}

fn putint_builtin(args: &[Value], io: &mut dyn Io) -> Result<Value, RuntimeError> {
    let n = expect_int(args, 0)?;
    io.write_str(&n.to_string()).map_err(io_err)?;
    Ok(Value::Int(0))
}

fn putch_builtin(args: &[Value], io: &mut dyn Io) -> Result<Value, RuntimeError> {
    let n = expect_int(args, 0)?;
    let byte = (n & 0xFF) as u8;
    io.write_byte(byte).map_err(io_err)?;
    Ok(Value::Int(0))
}

fn read_builtin(io: &mut dyn Io) -> Result<Value, RuntimeError> {
    let n = io.read_int().map_err(io_err)?;
    Ok(Value::Int(n))
}

fn getarray_builtin(args: &[Value], env: &mut Environment<'_>, io: &mut dyn Io) -> Result<Value, RuntimeError> {
    let addr = expect_ptr(args, 0)?;
    let n = io.read_int().map_err(io_err)?;
    let count = usize::try_from(n).map_err(|_| RuntimeError::MemoryError(format!("@getarray count must be non-negative, got {n}")))?;
    for i in 0..count {
        let v = io.read_int().map_err(io_err)?;
        env.store_cell(addr + i, v)?;
    }
    Ok(Value::Int(n))
}

fn putarray_builtin(args: &[Value], env: &mut Environment<'_>, io: &mut dyn Io) -> Result<Value, RuntimeError> {
    let n = expect_int(args, 0)?;
    let addr = expect_ptr(args, 1)?;
    let count = usize::try_from(n).map_err(|_| RuntimeError::MemoryError(format!("@putarray count must be non-negative, got {n}")))?;
    let mut parts = Vec::with_capacity(count);
    for i in 0..count {
        parts.push(env.load_cell(addr + i)?.to_string());
    }
    io.write_line(&parts.join(" ")).map_err(io_err)?;
    Ok(Value::Int(0))
}
