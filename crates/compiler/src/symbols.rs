//! Scope-aware symbol tables.
//!
//! One global scope plus a stack of local scopes. Entering a function pushes
//! a scope and resets the argument/local offset counters; entering a block
//! pushes a nested scope. Offsets are handed out monotonically per storage
//! class:
//!
//! - globals from `len(string pool)` (the pool occupies the first slots)
//! - arguments from `num_return_values` (slot 0 is the return value when the
//!   function has one)
//! - locals from 0
//!
//! Argument and local offsets live in distinct spaces because they are
//! addressed by distinct opcodes (`arga` vs `loca`).
//!
//! Scope tables are `IndexMap`s: global symbols must be emitted in
//! declaration order, and the order is also what keeps output byte-identical
//! across runs.

use indexmap::IndexMap;

use navm_core::{Instruction, Opcode};

use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::types::Ty;

/// Where a variable's slot lives, which picks its address-load opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Global,
    Argument,
    Local,
}

/// Attributes of a declared variable or function argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarAttrs {
    pub offset: u32,
    pub storage: Storage,
    pub is_int: bool,
    pub initialized: bool,
    pub is_const: bool,
}

impl VarAttrs {
    pub fn ty(&self) -> Ty {
        Ty::from_is_int(self.is_int)
    }

    /// The instruction that loads this variable's address.
    pub fn load_address(&self) -> Instruction {
        let opcode = match self.storage {
            Storage::Global => Opcode::Globa,
            Storage::Argument => Opcode::Arga,
            Storage::Local => Opcode::Loca,
        };
        Instruction::with_u32(opcode, self.offset)
    }
}

/// Attributes of a declared function.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncAttrs {
    /// Index in the global symbol list.
    pub offset: u32,
    pub name: String,
    pub arg_types: Vec<Ty>,
    pub num_local_vars: u32,
    pub return_ty: Ty,
    pub body: Vec<Instruction>,
}

impl FuncAttrs {
    pub fn num_return_values(&self) -> u32 {
        u32::from(self.return_ty != Ty::Void)
    }
}

/// Call-site view of a function: everything a call needs, nothing borrowed.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncSig {
    pub offset: u32,
    pub arg_types: Vec<Ty>,
    pub return_ty: Ty,
}

impl FuncSig {
    pub fn has_return_value(&self) -> bool {
        self.return_ty != Ty::Void
    }
}

/// A symbol table entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    Var(VarAttrs),
    Func(FuncAttrs),
}

struct Scope {
    entries: IndexMap<String, Symbol>,
}

impl Scope {
    fn new() -> Self {
        Scope {
            entries: IndexMap::new(),
        }
    }

    /// Entries are write-once: a second declaration of the same name within
    /// one scope is rejected.
    fn insert(&mut self, name: &str, symbol: Symbol) -> Result<(), SyntaxError> {
        if self.entries.contains_key(name) {
            return Err(SyntaxError::new(
                SyntaxErrorKind::Declaration,
                format!("conflicting declaration of symbol \"{name}\""),
            ));
        }
        self.entries.insert(name.to_string(), symbol);
        Ok(())
    }
}

/// The scope stack plus the offset counters.
pub struct SymbolTable {
    global: Scope,
    locals: Vec<Scope>,
    global_count: u32,
    arg_count: u32,
    local_count: u32,
    num_return_values: u32,
}

impl SymbolTable {
    /// `num_string_literals` reserves the pool's global slots: the first
    /// declared global gets that offset.
    pub fn new(num_string_literals: u32) -> Self {
        SymbolTable {
            global: Scope::new(),
            locals: Vec::new(),
            global_count: num_string_literals,
            arg_count: 0,
            local_count: 0,
            num_return_values: 0,
        }
    }

    pub fn in_global_scope(&self) -> bool {
        self.locals.is_empty()
    }

    /// Open a function: reset the argument/local counters and push the
    /// function's own scope (arguments and top-level locals share it).
    pub fn enter_func(&mut self, has_return_value: bool) {
        self.arg_count = 0;
        self.local_count = 0;
        self.num_return_values = u32::from(has_return_value);
        self.locals.push(Scope::new());
    }

    /// Close a function: pop its scope and report how many local slots its
    /// frame needs.
    pub fn exit_func(&mut self) -> u32 {
        self.locals.pop();
        self.local_count
    }

    /// Open a nested block scope (`if`/`else`/`while`/bare block).
    pub fn enter_scope(&mut self) {
        self.locals.push(Scope::new());
    }

    pub fn exit_scope(&mut self) {
        self.locals.pop();
    }

    /// Declare a function in the global table at the next free offset.
    pub fn declare_func(
        &mut self,
        name: &str,
        arg_types: Vec<Ty>,
        num_local_vars: u32,
        return_ty: Ty,
        body: Vec<Instruction>,
    ) -> Result<u32, SyntaxError> {
        let offset = self.global_count;
        self.global.insert(
            name,
            Symbol::Func(FuncAttrs {
                offset,
                name: name.to_string(),
                arg_types,
                num_local_vars,
                return_ty,
                body,
            }),
        )?;
        self.global_count += 1;
        Ok(offset)
    }

    /// Declare a function argument in the current (function-entry) scope.
    ///
    /// Slot 0 holds the return value when the function has one, so the first
    /// argument lands at `num_return_values`.
    pub fn declare_func_arg(
        &mut self,
        name: &str,
        is_int: bool,
        is_const: bool,
    ) -> Result<VarAttrs, SyntaxError> {
        let attrs = VarAttrs {
            offset: self.num_return_values + self.arg_count,
            storage: Storage::Argument,
            is_int,
            initialized: true,
            is_const,
        };
        let scope = self
            .locals
            .last_mut()
            .ok_or_else(|| no_function_scope(name))?;
        scope.insert(name, Symbol::Var(attrs))?;
        self.arg_count += 1;
        Ok(attrs)
    }

    /// Declare a variable in the innermost scope (the global table when no
    /// local scope is open), taking the next offset of the matching counter.
    pub fn declare_var(
        &mut self,
        name: &str,
        is_int: bool,
        initialized: bool,
        is_const: bool,
    ) -> Result<VarAttrs, SyntaxError> {
        let (scope, storage, counter) = match self.locals.last_mut() {
            None => (&mut self.global, Storage::Global, &mut self.global_count),
            Some(scope) => (scope, Storage::Local, &mut self.local_count),
        };
        let attrs = VarAttrs {
            offset: *counter,
            storage,
            is_int,
            initialized,
            is_const,
        };
        scope.insert(name, Symbol::Var(attrs))?;
        *counter += 1;
        Ok(attrs)
    }

    /// Resolve a variable or argument, innermost scope first. Entries of the
    /// wrong kind do not shadow: the search keeps walking outward past them.
    pub fn get_var(&self, name: &str) -> Result<VarAttrs, SyntaxError> {
        for scope in self.locals.iter().rev().chain(std::iter::once(&self.global)) {
            if let Some(Symbol::Var(attrs)) = scope.entries.get(name) {
                return Ok(*attrs);
            }
        }
        Err(SyntaxError::new(
            SyntaxErrorKind::Reference,
            format!("reference of undefined variable or argument \"{name}\""),
        ))
    }

    /// Resolve a function by name.
    pub fn get_func(&self, name: &str) -> Result<FuncSig, SyntaxError> {
        if let Some(Symbol::Func(attrs)) = self.global.entries.get(name) {
            return Ok(FuncSig {
                offset: attrs.offset,
                arg_types: attrs.arg_types.clone(),
                return_ty: attrs.return_ty,
            });
        }
        Err(SyntaxError::new(
            SyntaxErrorKind::Reference,
            format!("reference of undefined function \"{name}\""),
        ))
    }

    /// Resolve a variable and mark it initialized.
    pub fn init_var(&mut self, name: &str) -> Result<VarAttrs, SyntaxError> {
        for scope in self
            .locals
            .iter_mut()
            .rev()
            .chain(std::iter::once(&mut self.global))
        {
            if let Some(Symbol::Var(attrs)) = scope.entries.get_mut(name) {
                attrs.initialized = true;
                return Ok(*attrs);
            }
        }
        Err(SyntaxError::new(
            SyntaxErrorKind::Reference,
            format!("reference of undefined variable or argument \"{name}\""),
        ))
    }

    /// All global symbols in declaration order, consuming the table.
    pub fn into_global_symbols(self) -> Vec<Symbol> {
        self.global.entries.into_values().collect()
    }
}

fn no_function_scope(name: &str) -> SyntaxError {
    SyntaxError::new(
        SyntaxErrorKind::Declaration,
        format!("argument \"{name}\" declared outside a function"),
    )
}
