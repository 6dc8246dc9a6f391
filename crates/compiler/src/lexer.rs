//! Lexer for c0 source text.
//!
//! A single-pass, character-at-a-time scanner. String, char and double
//! literals are consumed directly where they appear, so a `//` inside a
//! string literal never starts a comment and operator glyphs inside strings
//! are never split. Multi-character operators (`==`, `!=`, `<=`, `>=`, `->`)
//! are recognized by maximal munch: `==` must be adjacent, `= =` is two
//! assignment tokens.
//!
//! Output is the token stream (terminated by two [`TokenKind::Eof`]
//! sentinels, so the parser can always peek one token ahead) plus the
//! string-literal pool. Pool indices are assigned in source order and double
//! as the literals' global-symbol offsets later on.

use crate::error::LexError;
use crate::token::{Token, TokenKind, keyword_from_ident};

/// Tokenize `source`, returning the token stream and the string pool.
pub fn tokenize(source: &str) -> Result<(Vec<Token>, Vec<String>), LexError> {
    Lexer::new(source).run()
}

struct Lexer {
    src: Vec<char>,
    pos: usize,
    line: usize,
    pool: Vec<String>,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Lexer {
            src: source.chars().collect(),
            pos: 0,
            line: 1,
            pool: Vec::new(),
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<(Vec<Token>, Vec<String>), LexError> {
        loop {
            self.skip_whitespace_and_comments();
            let Some(c) = self.peek() else { break };
            match c {
                '"' => self.lex_string()?,
                '\'' => self.lex_char()?,
                c if c.is_ascii_digit() => self.lex_number()?,
                c if is_ident_start(c) => self.lex_word(),
                c => self.lex_operator(c)?,
            }
        }
        // Two sentinels: the parser uses one token of lookahead past the
        // current one.
        self.push(TokenKind::Eof);
        self.push(TokenKind::Eof);
        Ok((self.tokens, self.pool))
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_string(&mut self) -> Result<(), LexError> {
        let start_line = self.line;
        self.advance(); // opening quote
        let mut decoded = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => return Err(LexError::QuoteMismatch { line: start_line }),
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    decoded.push(self.lex_escape(start_line)?);
                }
                Some(c) => {
                    self.advance();
                    decoded.push(c);
                }
            }
        }
        let index = self.pool.len() as u32;
        self.pool.push(decoded);
        self.push(TokenKind::StringLiteral(index));
        Ok(())
    }

    /// A char literal becomes an integer token carrying its code point; c0
    /// has no char type in expressions.
    fn lex_char(&mut self) -> Result<(), LexError> {
        let start_line = self.line;
        self.advance(); // opening quote
        let c = match self.peek() {
            None | Some('\n') => return Err(LexError::QuoteMismatch { line: start_line }),
            Some('\'') => {
                return Err(LexError::UnknownToken {
                    lexeme: "''".to_string(),
                    line: start_line,
                });
            }
            Some('\\') => {
                self.advance();
                self.lex_escape(start_line)?
            }
            Some(c) => {
                self.advance();
                c
            }
        };
        if self.peek() != Some('\'') {
            return Err(LexError::QuoteMismatch { line: start_line });
        }
        self.advance();
        self.push(TokenKind::IntLiteral(c as u64));
        Ok(())
    }

    fn lex_escape(&mut self, line: usize) -> Result<char, LexError> {
        let Some(escape) = self.peek() else {
            return Err(LexError::QuoteMismatch { line });
        };
        self.advance();
        match escape {
            '\\' => Ok('\\'),
            '"' => Ok('"'),
            '\'' => Ok('\''),
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            _ => Err(LexError::InvalidEscape { escape, line }),
        }
    }

    fn lex_number(&mut self) -> Result<(), LexError> {
        let line = self.line;
        let mut lexeme = String::new();
        self.take_digits(&mut lexeme);

        // `\d+\.\d+([eE][+-]?\d+)?` makes a double; a lone trailing dot
        // stays with the next token.
        let mut is_double = false;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_double = true;
            lexeme.push('.');
            self.advance();
            self.take_digits(&mut lexeme);
            if let Some(e) = self.peek() {
                if (e == 'e' || e == 'E') && self.exponent_follows() {
                    lexeme.push(e);
                    self.advance();
                    if let Some(sign @ ('+' | '-')) = self.peek() {
                        lexeme.push(sign);
                        self.advance();
                    }
                    self.take_digits(&mut lexeme);
                }
            }
        }

        // "123abc" is a single malformed word, not an integer then an
        // identifier.
        if self.peek().is_some_and(is_ident_start) {
            while let Some(c) = self.peek() {
                if !is_ident_continue(c) {
                    break;
                }
                lexeme.push(c);
                self.advance();
            }
            return Err(LexError::UnknownToken { lexeme, line });
        }

        if is_double {
            let value: f64 = lexeme
                .parse()
                .map_err(|_| LexError::UnknownToken {
                    lexeme: lexeme.clone(),
                    line,
                })?;
            self.push(TokenKind::FloatLiteral(value));
        } else {
            let value: u64 = lexeme
                .parse()
                .map_err(|_| LexError::UnknownToken {
                    lexeme: lexeme.clone(),
                    line,
                })?;
            self.push(TokenKind::IntLiteral(value));
        }
        Ok(())
    }

    fn take_digits(&mut self, into: &mut String) {
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            into.push(c);
            self.advance();
        }
    }

    /// True when the `e`/`E` at the cursor starts a well-formed exponent.
    fn exponent_follows(&self) -> bool {
        match self.peek_at(1) {
            Some(c) if c.is_ascii_digit() => true,
            Some('+') | Some('-') => self.peek_at(2).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    fn lex_word(&mut self) {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if !is_ident_continue(c) {
                break;
            }
            word.push(c);
            self.advance();
        }
        match keyword_from_ident(&word) {
            Some(kind) => self.push(kind),
            None => self.push(TokenKind::Ident(word)),
        }
    }

    fn lex_operator(&mut self, c: char) -> Result<(), LexError> {
        let line = self.line;
        self.advance();
        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => {
                if self.eat('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '=' => {
                if self.eat('=') {
                    TokenKind::Eq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.eat('=') {
                    TokenKind::Neq
                } else {
                    return Err(LexError::UnknownToken {
                        lexeme: "!".to_string(),
                        line,
                    });
                }
            }
            '<' => {
                if self.eat('=') {
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            other => {
                return Err(LexError::UnknownToken {
                    lexeme: other.to_string(),
                    line,
                });
            }
        };
        self.push(kind);
        Ok(())
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.src.get(self.pos + ahead).copied()
    }

    fn advance(&mut self) {
        if let Some('\n') = self.peek() {
            self.line += 1;
        }
        self.pos += 1;
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn push(&mut self, kind: TokenKind) {
        self.tokens.push(Token::new(kind, self.line));
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, _) = tokenize(source).unwrap();
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_function() {
        let kinds = kinds("fn main() -> void {}");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Fn,
                TokenKind::Ident("main".to_string()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Arrow,
                TokenKind::VoidType,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Eof,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_two_eof_sentinels() {
        let (tokens, _) = tokenize("").unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Eof));
    }

    #[test]
    fn test_maximal_munch_operators() {
        assert_eq!(
            kinds("== != <= >= -> < > = -")[..9],
            [
                TokenKind::Eq,
                TokenKind::Neq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Arrow,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Assign,
                TokenKind::Minus,
            ]
        );
    }

    #[test]
    fn test_spaced_equals_is_two_assignments() {
        assert_eq!(
            kinds("= =")[..2],
            [TokenKind::Assign, TokenKind::Assign]
        );
    }

    #[test]
    fn test_line_comment_removed() {
        assert_eq!(
            kinds("let x // trailing = 1\n;")[..3],
            [
                TokenKind::Let,
                TokenKind::Ident("x".to_string()),
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_comment_marker_inside_string_kept() {
        let (tokens, pool) = tokenize("putstr(\"http://x\");").unwrap();
        assert_eq!(pool, vec!["http://x".to_string()]);
        assert_eq!(tokens[2].kind, TokenKind::StringLiteral(0));
        assert_eq!(tokens[3].kind, TokenKind::RParen);
    }

    #[test]
    fn test_string_escapes_decoded() {
        let (_, pool) = tokenize(r#"putstr("a\n\t\\\"\'b");"#).unwrap();
        assert_eq!(pool, vec!["a\n\t\\\"'b".to_string()]);
    }

    #[test]
    fn test_string_pool_indices_in_source_order() {
        let (tokens, pool) = tokenize(r#"putstr("one"); putstr("two");"#).unwrap();
        assert_eq!(pool, vec!["one".to_string(), "two".to_string()]);
        let literals: Vec<_> = tokens
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::StringLiteral(i) => Some(i),
                _ => None,
            })
            .collect();
        assert_eq!(literals, vec![0, 1]);
    }

    #[test]
    fn test_unterminated_string() {
        assert_eq!(
            tokenize("putstr(\"oops);\n").unwrap_err(),
            LexError::QuoteMismatch { line: 1 }
        );
    }

    #[test]
    fn test_invalid_escape() {
        assert_eq!(
            tokenize(r#"putstr("\q");"#).unwrap_err(),
            LexError::InvalidEscape { escape: 'q', line: 1 }
        );
    }

    #[test]
    fn test_char_literal_is_integer_token() {
        assert_eq!(kinds("'A'")[0], TokenKind::IntLiteral(65));
        assert_eq!(kinds("'\\n'")[0], TokenKind::IntLiteral(10));
        assert_eq!(kinds("'\\''")[0], TokenKind::IntLiteral(39));
    }

    #[test]
    fn test_double_literals() {
        assert_eq!(kinds("1.5")[0], TokenKind::FloatLiteral(1.5));
        assert_eq!(kinds("1.0e3")[0], TokenKind::FloatLiteral(1000.0));
        assert_eq!(kinds("1.0E-3")[0], TokenKind::FloatLiteral(0.001));
        assert_eq!(kinds("2.5e+2")[0], TokenKind::FloatLiteral(250.0));
    }

    #[test]
    fn test_integer_then_dot_is_not_a_double() {
        let err = tokenize("let x: int = 123.;").unwrap_err();
        assert_eq!(
            err,
            LexError::UnknownToken {
                lexeme: ".".to_string(),
                line: 1
            }
        );
    }

    #[test]
    fn test_digits_with_letter_tail_rejected() {
        assert_eq!(
            tokenize("123abc").unwrap_err(),
            LexError::UnknownToken {
                lexeme: "123abc".to_string(),
                line: 1
            }
        );
    }

    #[test]
    fn test_bare_bang_rejected() {
        assert_eq!(
            tokenize("if a ! b {}").unwrap_err(),
            LexError::UnknownToken {
                lexeme: "!".to_string(),
                line: 1
            }
        );
    }

    #[test]
    fn test_unknown_character() {
        let err = tokenize("let @x = 1;").unwrap_err();
        assert_eq!(
            err,
            LexError::UnknownToken {
                lexeme: "@".to_string(),
                line: 1
            }
        );
    }

    #[test]
    fn test_line_numbers_follow_newlines() {
        let (tokens, _) = tokenize("fn main() -> void\n{\n}\n").unwrap();
        let brace = tokens
            .iter()
            .find(|t| t.kind == TokenKind::RBrace)
            .unwrap();
        assert_eq!(brace.line, 3);
    }

    #[test]
    fn test_underscore_identifier() {
        assert_eq!(
            kinds("_x_1")[0],
            TokenKind::Ident("_x_1".to_string())
        );
    }
}
