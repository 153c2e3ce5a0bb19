//! The load pass: turns a parsed [`Program`] into a populated [`Environment`].
//!
//! Kept separate from both parsing and evaluation. The original reference
//! interpreter registers a global the moment its AST node is constructed;
//! here construction (`crate::parser`) and registration are two distinct
//! passes over an already-complete, immutable `Program`.

use crate::ast::{Decl, Operand, Program};
use crate::environment::{Environment, Global};
use crate::error::RuntimeError;

/// Walks `program`'s top-level declarations in order, allocating global
/// regions and registering function definitions/declarations.
pub fn link(program: &Program) -> Result<Environment<'_>, RuntimeError> {
    let mut env = Environment::new();

    for decl in &program.decls {
        match decl {
            Decl::Global(g) => {
                let init = match &g.init {
                    Some(values) => values.iter().map(|v| eval_global_operand(v, &env)).collect::<Result<Vec<_>, _>>()?,
                    None => Vec::new(),
                };
                if let Some(values) = &g.init {
                    if values.len() as i64 != i64::from(g.size) {
                        return Err(RuntimeError::MalformedIR(format!(
                            "{} declares size {} but lists {} initializer(s)",
                            g.name,
                            g.size,
                            values.len()
                        )));
                    }
                }
                let ptr = env.allocate(g.size, &init)?;
                env.bind_global(&g.name, Global::Region(ptr))?;
            }
            Decl::Defn(f) => env.bind_global(&f.name, Global::Defn(f))?,
            Decl::Decl(d) => env.bind_global(&d.name, Global::Extern)?,
        }
    }

    Ok(env)
}

/// A global initializer element may reference an earlier global (its
/// address becomes the stored cell value); everything else must be a plain
/// integer constant.
fn eval_global_operand(operand: &Operand, env: &Environment<'_>) -> Result<i32, RuntimeError> {
    match operand {
        Operand::Int(n) => Ok(*n),
        Operand::Ident(id) => {
            let v = env.lookup(id)?;
            match v {
                crate::value::Value::Int(n) => Ok(n),
                crate::value::Value::Ptr(addr) => i32::try_from(addr)
                    .map_err(|_| RuntimeError::MemoryError(format!("address {addr} does not fit in an i32 cell"))),
                other => Err(RuntimeError::TypeError(format!(
                    "global initializer cannot hold a {} value",
                    other.kind_name()
                ))),
            }
        }
        Operand::None => Err(RuntimeError::TypeError("global initializer cannot be 'none'".into())),
        Operand::Unit => Err(RuntimeError::TypeError("global initializer cannot be '()'".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn links_a_global_region_with_matching_initializer() {
        let prog = parse("@a: region i32, 3 = [1, 2, 3];\n").unwrap();
        let env = link(&prog).unwrap();
        assert!(env.global("@a").is_some());
    }

    #[test]
    fn rejects_size_initializer_mismatch() {
        let prog = parse("@a: region i32, 2 = [1, 2, 3];\n").unwrap();
        assert!(link(&prog).is_err());
    }

    #[test]
    fn registers_function_definitions_and_declarations() {
        let prog = parse("fn @putint (#x: i32) -> ();\nfn @main () -> i32 {\n%e:\nret 0\n}\n").unwrap();
        let env = link(&prog).unwrap();
        assert!(matches!(env.global("@putint"), Some(Global::Extern)));
        assert!(matches!(env.global("@main"), Some(Global::Defn(_))));
    }

    #[test]
    fn rejects_duplicate_global_names() {
        let prog = parse("@a: region i32, 1;\n@a: region i32, 1;\n").unwrap();
        assert!(link(&prog).is_err());
    }
}
