//! c0 compiler library
//!
//! Compiles c0 source text into navm object files in one pass:
//!
//! ```text
//! source -> lexer -> tokens + string pool
//!        -> parser/analyzer/emitter -> ObjectProgram
//!        -> object writer -> big-endian bytes
//! ```
//!
//! The middle stage is a single recursive descent that parses, resolves
//! names through nested scopes, checks types and emits stack-machine
//! instructions with branch back-patching. There is no AST and no separate
//! type-checking pass.
//!
//! ```rust
//! let bytes = c0c::compile_to_bytes("fn main() -> void { putstr(\"hi\"); }").unwrap();
//! assert_eq!(&bytes[..4], [0x72, 0x30, 0x3b, 0x3e]);
//! ```

pub mod analyzer;
pub mod error;
pub mod lexer;
pub mod symbols;
pub mod token;
pub mod types;

pub use error::{CompileError, LexError, SyntaxError, SyntaxErrorKind};
pub use types::Ty;

// The object model lives in navm-core; re-export what callers of the
// compiler need to inspect results.
pub use navm_core::{FunctionDef, GlobalSymbol, Instruction, ObjectProgram, Opcode};

use tracing::debug;

/// Compile source text into the object model (pool, globals, functions).
pub fn compile_source(source: &str) -> Result<ObjectProgram, CompileError> {
    let (tokens, string_literals) = lexer::tokenize(source)?;
    debug!(
        tokens = tokens.len(),
        string_literals = string_literals.len(),
        "lexed source"
    );
    let program = analyzer::analyze(tokens, string_literals)?;
    debug!(
        globals = program.globals.len(),
        functions = program.functions.iter().filter(|f| !f.body.is_empty()).count(),
        "analyzed program"
    );
    Ok(program)
}

/// Compile source text straight to object bytes.
pub fn compile_to_bytes(source: &str) -> Result<Vec<u8>, CompileError> {
    Ok(compile_source(source)?.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_to_bytes_header() {
        let bytes = compile_to_bytes("fn main() -> void {}").unwrap();
        assert_eq!(&bytes[..4], [0x72, 0x30, 0x3b, 0x3e]);
        assert_eq!(&bytes[4..8], [0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_lex_errors_surface_as_compile_errors() {
        let err = compile_to_bytes("fn main() -> void { putstr(\"oops); }").unwrap_err();
        assert!(matches!(err, CompileError::Lex(_)));
    }

    #[test]
    fn test_syntax_errors_surface_as_compile_errors() {
        let err = compile_to_bytes("fn main() -> int {}").unwrap_err();
        match err {
            CompileError::Syntax(e) => assert_eq!(e.kind, SyntaxErrorKind::Declaration),
            other => panic!("expected syntax error, got {other:?}"),
        }
    }
}
