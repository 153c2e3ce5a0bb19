//! The AST-walking evaluator.
//!
//! Within a function activation, block-to-block jumps (`br`/`jmp`) are
//! handled by looping over an index into `func.blocks` rather than by
//! recursive calls — an intra-function jump never grows the host stack.
//! Only `call` recurses, and [`Environment::push_frame`] bounds how deep
//! that recursion is allowed to go.

use crate::ast::{BinOp, Dim, FunDefn, Op, Operand, Terminator};
use crate::builtins::{self, Io};
use crate::environment::{Environment, Global};
use crate::error::RuntimeError;
use crate::tracer::TraceSink;
use crate::value::Value;

/// Looks up `@main`, invokes it with no arguments, and returns whatever it
/// returns.
pub fn run<'p>(env: &mut Environment<'p>, trace: &mut impl TraceSink, io: &mut dyn Io) -> Result<Value, RuntimeError> {
    let main = match env.global("@main") {
        Some(Global::Defn(f)) => f,
        Some(Global::Extern) => return Err(RuntimeError::NotCallable("@main".into())),
        Some(Global::Region(_)) => return Err(RuntimeError::TypeError("@main is a region, not a function".into())),
        None => return Err(RuntimeError::UnboundIdentifier("@main".into())),
    };
    call_function(main, &[], env, trace, io)
}

fn eval_operand(operand: &Operand, env: &Environment<'_>) -> Result<Value, RuntimeError> {
    match operand {
        Operand::Ident(id) => env.lookup(id),
        Operand::Int(n) => Ok(Value::Int(*n)),
        Operand::None => Ok(Value::None),
        Operand::Unit => Ok(Value::Unit),
    }
}

fn eval_binop(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    if matches!(op, BinOp::Eq | BinOp::Ne) {
        if let (Some(a), Some(b)) = (addr_of(lhs), addr_of(rhs)) {
            let equal = a == b;
            return Ok(Value::Int(i32::from(if op == BinOp::Eq { equal } else { !equal })));
        }
    }

    let a = lhs
        .as_int()
        .ok_or_else(|| RuntimeError::TypeError(format!("'{op}' expects an i32, found {}", lhs.kind_name())))?;
    let b = rhs
        .as_int()
        .ok_or_else(|| RuntimeError::TypeError(format!("'{op}' expects an i32, found {}", rhs.kind_name())))?;

    let result = match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(RuntimeError::ArithmeticError(format!("division by zero: {a} / {b}")));
            }
            a.wrapping_div(b)
        }
        BinOp::Rem => {
            if b == 0 {
                return Err(RuntimeError::ArithmeticError(format!("remainder by zero: {a} % {b}")));
            }
            a.wrapping_rem(b)
        }
        BinOp::And => a & b,
        BinOp::Or => a | b,
        BinOp::Xor => a ^ b,
        BinOp::Eq => i32::from(a == b),
        BinOp::Ne => i32::from(a != b),
        BinOp::Lt => i32::from(a < b),
        BinOp::Le => i32::from(a <= b),
        BinOp::Gt => i32::from(a > b),
        BinOp::Ge => i32::from(a >= b),
    };
    Ok(Value::Int(result))
}

/// A `Ptr`'s address, or an `Int`'s value reinterpreted as an address — used
/// only by the pointer/int equality exception in `eq`/`ne`.
fn addr_of(v: Value) -> Option<i64> {
    match v {
        Value::Ptr(a) => Some(a as i64),
        Value::Int(n) => Some(i64::from(n)),
        _ => None,
    }
}

/// `store`'s value is coerced to the cell's `i32` word: an `Int` stores
/// directly, a `Ptr` stores its address (the same coercion `link` applies to
/// a global initializer that references an earlier region).
fn coerce_to_cell(v: Value) -> Result<i32, RuntimeError> {
    match v {
        Value::Int(n) => Ok(n),
        Value::Ptr(addr) => {
            i32::try_from(addr).map_err(|_| RuntimeError::MemoryError(format!("address {addr} does not fit in an i32 cell")))
        }
        other => Err(RuntimeError::TypeError(format!("cannot store a {} value into a cell", other.kind_name()))),
    }
}

fn eval_offset(base_addr: usize, indices: &[(Operand, Dim)], env: &Environment<'_>) -> Result<Value, RuntimeError> {
    let mut addr = base_addr as i64;
    for (operand, dim) in indices {
        let i = eval_operand(operand, env)?
            .as_int()
            .ok_or_else(|| RuntimeError::TypeError("offset index must be an i32".into()))?;
        addr = match dim {
            Dim::None => addr + i64::from(i),
            Dim::Const(d) => addr * i64::from(*d) + i64::from(i),
        };
    }
    let addr = usize::try_from(addr).map_err(|_| RuntimeError::MemoryError(format!("offset produced a negative address ({addr})")))?;
    Ok(Value::Ptr(addr))
}

fn eval_op(op: &Op, env: &mut Environment<'_>, trace: &mut impl TraceSink, io: &mut dyn Io) -> Result<Value, RuntimeError> {
    match op {
        Op::Bin { op, lhs, rhs } => {
            let lhs = eval_operand(lhs, env)?;
            let rhs = eval_operand(rhs, env)?;
            eval_binop(*op, lhs, rhs)
        }
        Op::Alloca { count, .. } => env.allocate(*count, &[]),
        Op::Load { ptr } => {
            let v = env.lookup(ptr)?;
            let addr = v
                .as_addr()
                .ok_or_else(|| RuntimeError::TypeError(format!("cannot load through a {} value", v.kind_name())))?;
            Ok(Value::Int(env.load_cell(addr)?))
        }
        Op::Store { value, ptr } => {
            let v = eval_operand(value, env)?;
            let target = env.lookup(ptr)?;
            let addr = target
                .as_addr()
                .ok_or_else(|| RuntimeError::TypeError(format!("cannot store through a {} value", target.kind_name())))?;
            let n = coerce_to_cell(v)?;
            env.store_cell(addr, n)?;
            Ok(Value::Unit)
        }
        Op::Offset { base, indices, .. } => {
            let base_val = env.lookup(base)?;
            let base_addr = base_val
                .as_addr()
                .ok_or_else(|| RuntimeError::TypeError(format!("offset base must be a pointer, found {}", base_val.kind_name())))?;
            eval_offset(base_addr, indices, env)
        }
        Op::Call { callee, args } => {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_operand(arg, env)?);
            }
            eval_call(&callee.qualified(), &values, env, trace, io)
        }
    }
}

fn eval_call<'p>(
    name: &str,
    args: &[Value],
    env: &mut Environment<'p>,
    trace: &mut impl TraceSink,
    io: &mut dyn Io,
) -> Result<Value, RuntimeError> {
    if let Some(result) = builtins::dispatch(name, args, env, io) {
        return result;
    }
    match env.global(name) {
        Some(Global::Defn(f)) => call_function(f, args, env, trace, io),
        Some(Global::Extern) => Err(RuntimeError::NotCallable(name.to_string())),
        Some(Global::Region(_)) => Err(RuntimeError::TypeError(format!("{name} is a region, not a function"))),
        None => Err(RuntimeError::UnboundIdentifier(name.to_string())),
    }
}

fn call_function<'p>(
    func: &'p FunDefn,
    args: &[Value],
    env: &mut Environment<'p>,
    trace: &mut impl TraceSink,
    io: &mut dyn Io,
) -> Result<Value, RuntimeError> {
    if args.len() != func.params.len() {
        return Err(RuntimeError::MalformedIR(format!(
            "{} expects {} argument(s), got {}",
            func.name,
            func.params.len(),
            args.len()
        )));
    }

    env.push_frame(func)?;
    let depth = env.depth();
    trace.on_call(&func.name, depth);

    for (param, value) in func.params.iter().zip(args) {
        env.bind_local(&param.name, *value)?;
    }

    let result = run_blocks(func, env, trace, io);

    trace.on_return(&func.name, result.clone().unwrap_or(Value::Unit), depth);
    env.pop_frame();
    result
}

/// Executes basic blocks, starting at the entry block, following `br`/`jmp`
/// in a plain loop rather than recursing, until a `ret` produces a value.
fn run_blocks<'p>(
    func: &'p FunDefn,
    env: &mut Environment<'p>,
    trace: &mut impl TraceSink,
    io: &mut dyn Io,
) -> Result<Value, RuntimeError> {
    let mut block_idx = 0usize;
    loop {
        let block = &func.blocks[block_idx];
        trace.on_enter_block(&block.label);

        for binding in &block.bindings {
            let value = eval_op(&binding.op, env, trace, io)?;
            env.bind_local(&binding.name, value)?;
            trace.on_binding(&binding.name, value);
        }

        match &block.terminator {
            Terminator::Ret { value } => return eval_operand(value, env),
            Terminator::Jmp { label } => {
                block_idx = func
                    .block_index(&label.body)
                    .ok_or_else(|| RuntimeError::MalformedIR(format!("jump to unknown label {label}")))?;
            }
            Terminator::Br { cond, then_label, else_label } => {
                let taken = eval_operand(cond, env)?.is_truthy();
                let target = if taken { then_label } else { else_label };
                block_idx = func
                    .block_index(&target.body)
                    .ok_or_else(|| RuntimeError::MalformedIR(format!("branch to unknown label {target}")))?;
            }
        }
    }
}
