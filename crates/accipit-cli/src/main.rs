use std::io::IsTerminal;
use std::{env, fs, io, process::ExitCode};

use accipit::builtins::StdIo;
use accipit::{interpret, NoopTrace, StderrTrace, Value};

const GREEN: &str = "\x1b[1;32m";
const RED: &str = "\x1b[1;31m";
const RESET: &str = "\x1b[0m";

/// Wraps `text` in `color`/`RESET` only when stderr is an interactive
/// terminal, so piped or redirected output stays plain.
fn colorize(color: &str, text: &str) -> String {
    if io::stderr().is_terminal() {
        format!("{color}{text}{RESET}")
    } else {
        text.to_owned()
    }
}

struct Args {
    file_path: String,
    debug: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut file_path = None;
    let mut debug = false;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-d" | "--debug" => debug = true,
            _ if file_path.is_none() => file_path = Some(arg),
            other => return Err(format!("unexpected argument: {other}")),
        }
    }
    let file_path = file_path.ok_or_else(|| "usage: accipit [-d|--debug] <file.acc>".to_owned())?;
    Ok(Args { file_path, debug })
}

fn read_file(file_path: &str) -> Result<String, String> {
    match fs::metadata(file_path) {
        Ok(metadata) if !metadata.is_file() => return Err(format!("{file_path} is not a file")),
        Ok(_) => {}
        Err(err) => return Err(format!("error reading {file_path}: {err}")),
    }
    fs::read_to_string(file_path).map_err(|err| format!("error reading {file_path}: {err}"))
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    let source = match read_file(&args.file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    let mut io = StdIo;
    let result = if args.debug {
        interpret(&source, &mut StderrTrace, &mut io)
    } else {
        interpret(&source, &mut NoopTrace, &mut io)
    };

    match result {
        Ok(value) => {
            let code = exit_code_of(value);
            eprintln!("{}", colorize(GREEN, &format!("program exited with {value}")));
            ExitCode::from(code)
        }
        Err(err) => {
            eprintln!("{}", colorize(RED, &err.to_string()));
            let code = u8::try_from(err.exit_code()).unwrap_or(255);
            ExitCode::from(code)
        }
    }
}

/// `@main`'s return value becomes the process exit code: an `Int` is
/// truncated to a byte the way a C `main`'s return value would be; anything
/// else (`Unit`, a pointer, `none`) exits `0`.
fn exit_code_of(value: Value) -> u8 {
    match value {
        Value::Int(n) => (n & 0xFF) as u8,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_truncates_to_a_byte() {
        assert_eq!(exit_code_of(Value::Int(25)), 25);
        assert_eq!(exit_code_of(Value::Int(256)), 0);
        assert_eq!(exit_code_of(Value::Unit), 0);
    }
}
