//! End-to-end scenarios driving the public `accipit::interpret` entry point
//! against complete programs, the same way the CLI binary does.

use std::io::{self, Cursor, Read};

use accipit::builtins::Io;
use accipit::{interpret, InterpretError, NoopTrace, Value};
use pretty_assertions::assert_eq;

struct ScriptedIo {
    out: Vec<u8>,
    input: Cursor<Vec<u8>>,
}

impl ScriptedIo {
    fn new(input: &str) -> Self {
        Self {
            out: Vec::new(),
            input: Cursor::new(input.as_bytes().to_vec()),
        }
    }

    fn stdout(&self) -> String {
        String::from_utf8(self.out.clone()).expect("builtins only emit UTF-8 text")
    }
}

impl Io for ScriptedIo {
    fn write_line(&mut self, text: &str) -> io::Result<()> {
        self.out.extend_from_slice(text.as_bytes());
        self.out.push(b'\n');
        Ok(())
    }

    fn write_str(&mut self, text: &str) -> io::Result<()> {
        self.out.extend_from_slice(text.as_bytes());
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.out.push(byte);
        Ok(())
    }

    fn read_int(&mut self) -> io::Result<i32> {
        let mut digits = String::new();
        let mut started = false;
        let mut byte = [0u8; 1];
        loop {
            if self.input.read(&mut byte)? == 0 {
                break;
            }
            let c = byte[0] as char;
            if c.is_whitespace() {
                if started {
                    break;
                }
            } else {
                started = true;
                digits.push(c);
            }
        }
        digits
            .parse::<i32>()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
    }
}

fn run(source: &str, input: &str) -> (Result<Value, InterpretError>, String) {
    let mut io = ScriptedIo::new(input);
    let result = interpret(source, &mut NoopTrace, &mut io);
    (result, io.stdout())
}

#[test]
fn factorial_of_five() {
    let src = "fn @factorial (#n: i32) -> i32 {\n\
               %entry:\n\
               let %z = eq #n, 0\n\
               br %z, label %base, label %rec\n\
               %base:\n\
               ret 1\n\
               %rec:\n\
               let %n1 = sub #n, 1\n\
               let %r = call @factorial, %n1\n\
               let %out = mul #n, %r\n\
               ret %out\n\
               }\n\
               fn @main () -> i32 {\n\
               %entry:\n\
               let %r = call @factorial, 5\n\
               let %u = call @write, %r\n\
               ret 0\n\
               }\n";
    let (result, stdout) = run(src, "");
    assert_eq!(result.unwrap(), Value::Int(0));
    assert_eq!(stdout, "120\n");
}

#[test]
fn two_dimensional_array_printed_out_of_order() {
    let src = "@a: region i32, 8 = [1, 2, 3, 4, 5, 6, 7, 8];\n\
               fn @print_array (#p: i32*, #len: i32) -> () {\n\
               %entry:\n\
               let %z = eq #len, 0\n\
               br %z, label %done, label %step\n\
               %step:\n\
               let %v = load #p\n\
               let %u = call @write, %v\n\
               let %p1 = offset i32, #p, [1 < none]\n\
               let %len1 = sub #len, 1\n\
               let %r = call @print_array, %p1, %len1\n\
               ret ()\n\
               %done:\n\
               ret ()\n\
               }\n\
               fn @main () -> i32 {\n\
               %entry:\n\
               let %r2 = offset i32, @a, [4 < none]\n\
               let %u1 = call @print_array, %r2, 2\n\
               let %r1 = offset i32, @a, [2 < none]\n\
               let %u2 = call @print_array, %r1, 2\n\
               let %r0 = offset i32, @a, [0 < none]\n\
               let %u3 = call @print_array, %r0, 2\n\
               let %r3 = offset i32, @a, [6 < none]\n\
               let %u4 = call @print_array, %r3, 2\n\
               ret 0\n\
               }\n";
    let (result, stdout) = run(src, "");
    assert!(result.is_ok());
    assert_eq!(stdout, "5\n6\n3\n4\n1\n2\n7\n8\n");
}

#[test]
fn global_region_with_computed_offsets() {
    let src = "@a: region i32, 105;\n\
               fn @main () -> i32 {\n\
               %entry:\n\
               let %p1 = offset i32, @a, [3 < none], [2 < 3], [4 < 7]\n\
               let %u1 = store 10, %p1\n\
               let %p2 = offset i32, @a, [4 < none], [2 < 3], [6 < 7]\n\
               let %u2 = store 11, %p2\n\
               let %q1 = offset i32, @a, [3 < none], [2 < 3], [4 < 7]\n\
               let %v1 = load %q1\n\
               let %w1 = call @write, %v1\n\
               let %q2 = offset i32, @a, [4 < none], [2 < 3], [6 < 7]\n\
               let %v2 = load %q2\n\
               let %w2 = call @write, %v2\n\
               ret 0\n\
               }\n";
    let (result, stdout) = run(src, "");
    assert!(result.is_ok());
    assert_eq!(stdout, "10\n11\n");
}

#[test]
fn nested_if_yields_twenty_five() {
    let src = "fn @main () -> i32 {\n\
               %entry:\n\
               let %a0 = alloca i32, 1\n\
               let %b0 = alloca i32, 1\n\
               let %ua = store 5, %a0\n\
               let %ub = store 10, %b0\n\
               let %av = load %a0\n\
               let %c1 = gt %av, 0\n\
               br %c1, label %outer_then, label %outer_else\n\
               %outer_then:\n\
               let %bv = load %b0\n\
               let %c2 = gt %bv, 0\n\
               br %c2, label %inner_then, label %inner_else\n\
               %inner_then:\n\
               let %av2 = load %a0\n\
               let %bv2 = load %b0\n\
               let %s1 = add %av2, %bv2\n\
               let %s2 = add %s1, 10\n\
               let %u1 = store %s2, %a0\n\
               jmp label %join\n\
               %inner_else:\n\
               let %u2 = store 0, %a0\n\
               jmp label %join\n\
               %outer_else:\n\
               let %u3 = store -1, %a0\n\
               jmp label %join\n\
               %join:\n\
               let %result = load %a0\n\
               ret %result\n\
               }\n";
    let (result, _) = run(src, "");
    assert_eq!(result.unwrap(), Value::Int(25));
}

#[test]
fn empty_main_exits_cleanly() {
    let (result, stdout) = run("fn @main () -> () {\n%0:\nret ()\n}\n", "");
    assert_eq!(result.unwrap(), Value::Unit);
    assert_eq!(stdout, "");
}

#[test]
fn division_by_zero_aborts_without_emitting_a_value() {
    let (result, stdout) = run("fn @main () -> i32 {\n%0:\nlet %x = div 1, 0\nlet %u = call @write, %x\nret %x\n}\n", "");
    assert!(result.is_err());
    assert_eq!(stdout, "");
}

#[test]
fn getarray_putarray_round_trip() {
    let src = "fn @main () -> i32 {\n\
               %entry:\n\
               let %p = alloca i32, 10\n\
               let %n = call @getarray, %p\n\
               let %u = call @putarray, %n, %p\n\
               ret 0\n\
               }\n";
    let (result, stdout) = run(src, "3 10 20 30");
    assert!(result.is_ok());
    assert_eq!(stdout, "10 20 30\n");
}

#[test]
fn unbounded_recursion_is_caught_before_the_host_stack_overflows() {
    let src = "fn @spin () -> i32 {\n\
               %0:\n\
               let %r = call @spin\n\
               ret %r\n\
               }\n\
               fn @main () -> i32 {\n\
               %0:\n\
               let %r = call @spin\n\
               ret %r\n\
               }\n";
    let (result, _) = run(src, "");
    assert!(matches!(result, Err(InterpretError::Runtime(accipit::RuntimeError::Resource(_)))));
}
