//! Runtime storage: the global table, the call-frame stack, and the single
//! linear cell store every pointer addresses into.
//!
//! Frames borrow their function definition directly (`&'p FunDefn`) rather
//! than going through an index table — the program is immutable for the
//! whole run, so there's no aliasing hazard, and it avoids building a
//! parent-pointer graph the way a tree-walking interpreter over a mutable
//! object graph would need to.

use indexmap::IndexMap;

use crate::ast::{FunDefn, Ident};
use crate::error::RuntimeError;
use crate::value::Value;

/// A guard against runaway `call` recursion. Generous: the Accipit programs
/// this interpreter targets are shallow by construction, so a depth this
/// large only ever trips on a genuine infinite recursion bug in the
/// interpreted program, not on a legitimate deep call chain.
pub const MAX_CALL_DEPTH: usize = 4096;

/// A module-level binding: either a region (an allocated block of cells,
/// observed as a `Value::Ptr`) or a function.
#[derive(Debug, Clone, Copy)]
pub enum Global<'p> {
    Region(Value),
    Defn(&'p FunDefn),
    /// Declared (`fn @name(...) -> T;`) but never defined locally — callable
    /// only if `crate::builtins` recognizes the name.
    Extern,
}

struct Frame<'p> {
    func: &'p FunDefn,
    locals: IndexMap<String, Value>,
}

/// All mutable state threaded through evaluation.
pub struct Environment<'p> {
    globals: IndexMap<String, Global<'p>>,
    frames: Vec<Frame<'p>>,
    cells: Vec<i32>,
}

impl<'p> Environment<'p> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            globals: IndexMap::new(),
            frames: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn bind_global(&mut self, name: &Ident, binding: Global<'p>) -> Result<(), RuntimeError> {
        let key = name.qualified();
        if self.globals.contains_key(&key) {
            return Err(RuntimeError::DuplicateDefinition(key));
        }
        self.globals.insert(key, binding);
        Ok(())
    }

    #[must_use]
    pub fn global(&self, qualified_name: &str) -> Option<Global<'p>> {
        self.globals.get(qualified_name).copied()
    }

    /// Grows the cell store by `count` cells, writes `init` into the
    /// leading cells (padding the rest with zero), and returns a pointer to
    /// the first cell.
    pub fn allocate(&mut self, count: i32, init: &[i32]) -> Result<Value, RuntimeError> {
        let count = usize::try_from(count)
            .map_err(|_| RuntimeError::MemoryError(format!("allocation size must be non-negative, got {count}")))?;
        if init.len() > count {
            return Err(RuntimeError::MemoryError(format!(
                "initializer has {} values, exceeding the declared size {count}",
                init.len()
            )));
        }
        let addr = self.cells.len();
        self.cells.reserve(count);
        self.cells.extend_from_slice(init);
        self.cells.resize(addr + count, 0);
        Ok(Value::Ptr(addr))
    }

    pub fn load_cell(&self, addr: usize) -> Result<i32, RuntimeError> {
        self.cells
            .get(addr)
            .copied()
            .ok_or_else(|| RuntimeError::MemoryError(format!("load out of bounds at address {addr}")))
    }

    pub fn store_cell(&mut self, addr: usize, value: i32) -> Result<(), RuntimeError> {
        match self.cells.get_mut(addr) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::MemoryError(format!("store out of bounds at address {addr}"))),
        }
    }

    pub fn push_frame(&mut self, func: &'p FunDefn) -> Result<(), RuntimeError> {
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(RuntimeError::Resource(format!(
                "call depth exceeded {MAX_CALL_DEPTH} while entering {}",
                func.name
            )));
        }
        self.frames.push(Frame {
            func,
            locals: IndexMap::new(),
        });
        Ok(())
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn frame(&self) -> &Frame<'p> {
        self.frames.last().expect("no active call frame")
    }

    fn frame_mut(&mut self) -> &mut Frame<'p> {
        self.frames.last_mut().expect("no active call frame")
    }

    #[must_use]
    pub fn current_function(&self) -> &'p FunDefn {
        self.frame().func
    }

    pub fn bind_local(&mut self, name: &Ident, value: Value) -> Result<(), RuntimeError> {
        let key = name.qualified();
        if self.frame().locals.contains_key(&key) {
            return Err(RuntimeError::MalformedIR(format!("{key} is bound more than once in this activation")));
        }
        self.frame_mut().locals.insert(key, value);
        Ok(())
    }

    /// Resolves an identifier to a value: a param/local in the active frame,
    /// or a global region pointer. Referencing a function by name as a
    /// plain value (rather than as a `call` target) is a type error.
    pub fn lookup(&self, id: &Ident) -> Result<Value, RuntimeError> {
        let key = id.qualified();
        match id.region {
            crate::ast::Region::Param | crate::ast::Region::Local => self
                .frame()
                .locals
                .get(&key)
                .copied()
                .ok_or_else(|| RuntimeError::UnboundIdentifier(key)),
            crate::ast::Region::Global => match self.globals.get(&key) {
                Some(Global::Region(v)) => Ok(*v),
                Some(Global::Defn(_) | Global::Extern) => {
                    Err(RuntimeError::TypeError(format!("{key} names a function, not a value")))
                }
                None => Err(RuntimeError::UnboundIdentifier(key)),
            },
        }
    }
}

impl Default for Environment<'_> {
    fn default() -> Self {
        Self::new()
    }
}
