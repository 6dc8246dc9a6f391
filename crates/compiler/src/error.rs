//! Compile error types.
//!
//! Errors are split by pipeline stage: [`LexError`] for tokenization and
//! [`SyntaxError`] for everything the single parse/analyze/emit pass can
//! reject. Both abort the compile immediately; there is no recovery and no
//! partial object file.
//!
//! A [`SyntaxError`] carries a short rendering of the upcoming tokens at the
//! failure point, which is usually enough to locate the offending construct
//! without line tracking inside the parser.

use std::fmt;

/// Errors raised while turning source text into tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A string literal was still open at the end of its line.
    QuoteMismatch { line: usize },
    /// An escape other than `\\ \" \' \n \r \t` inside a string or char
    /// literal.
    InvalidEscape { escape: char, line: usize },
    /// A word that matches no token rule.
    UnknownToken { lexeme: String, line: usize },
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::QuoteMismatch { line } => {
                write!(f, "line {line}: unterminated string literal")
            }
            LexError::InvalidEscape { escape, line } => {
                write!(f, "line {line}: unsupported escape sequence '\\{escape}'")
            }
            LexError::UnknownToken { lexeme, line } => {
                write!(f, "line {line}: unknown token \"{lexeme}\"")
            }
        }
    }
}

impl std::error::Error for LexError {}

/// What kind of rule a [`SyntaxError`] violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// An unexpected token where a specific one was required.
    Token,
    /// Malformed top-level item.
    Program,
    /// Bad declaration: duplicate name, missing `;`, uninitialized `const`,
    /// non-void function without a guaranteed return.
    Declaration,
    /// Reference to an undefined name, or to a name of the wrong kind.
    Reference,
    /// Assignment to something that is not a mutable variable.
    Assignment,
    /// Operand, operator, parameter or return type mismatch.
    Type,
    /// `break`/`continue` outside a loop.
    Statement,
    /// Malformed function call.
    Call,
}

impl SyntaxErrorKind {
    fn label(self) -> &'static str {
        match self {
            SyntaxErrorKind::Token => "token error",
            SyntaxErrorKind::Program => "program error",
            SyntaxErrorKind::Declaration => "declaration error",
            SyntaxErrorKind::Reference => "reference error",
            SyntaxErrorKind::Assignment => "assignment error",
            SyntaxErrorKind::Type => "type error",
            SyntaxErrorKind::Statement => "statement error",
            SyntaxErrorKind::Call => "call error",
        }
    }
}

/// An error from the parse/analyze/emit pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    /// Rendering of the next few tokens at the failure point; empty at
    /// end of input.
    pub context: String,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind, message: impl Into<String>) -> Self {
        SyntaxError {
            kind,
            message: message.into(),
            context: String::new(),
        }
    }

    pub fn with_context(mut self, context: String) -> Self {
        self.context = context;
        self
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)?;
        if !self.context.is_empty() {
            write!(f, " (near: {})", self.context)?;
        }
        Ok(())
    }
}

impl std::error::Error for SyntaxError {}

/// Any failure of the compile pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Lex(LexError),
    Syntax(SyntaxError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Lex(e) => write!(f, "lexical error: {e}"),
            CompileError::Syntax(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Lex(e) => Some(e),
            CompileError::Syntax(e) => Some(e),
        }
    }
}

impl From<LexError> for CompileError {
    fn from(e: LexError) -> Self {
        CompileError::Lex(e)
    }
}

impl From<SyntaxError> for CompileError {
    fn from(e: SyntaxError) -> Self {
        CompileError::Syntax(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_error_display() {
        let err = LexError::UnknownToken {
            lexeme: "@".to_string(),
            line: 3,
        };
        assert_eq!(err.to_string(), "line 3: unknown token \"@\"");
    }

    #[test]
    fn test_syntax_error_display_with_context() {
        let err = SyntaxError::new(SyntaxErrorKind::Declaration, "conflicting declaration of \"x\"")
            .with_context("let x : int".to_string());
        assert_eq!(
            err.to_string(),
            "declaration error: conflicting declaration of \"x\" (near: let x : int)"
        );
    }

    #[test]
    fn test_compile_error_wraps_stage_errors() {
        let err: CompileError = LexError::QuoteMismatch { line: 1 }.into();
        assert!(err.to_string().starts_with("lexical error:"));
        let err: CompileError =
            SyntaxError::new(SyntaxErrorKind::Statement, "break statement not within a loop")
                .into();
        assert_eq!(
            err.to_string(),
            "statement error: break statement not within a loop"
        );
    }
}
