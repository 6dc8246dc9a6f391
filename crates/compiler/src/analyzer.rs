//! Single-pass parser, semantic analyzer and code emitter.
//!
//! One recursive descent over the token stream simultaneously parses the
//! grammar, resolves names through the scope stack, checks types, and
//! appends navm instructions to the active body: the synthetic `_start`
//! body while at global scope (global initializers), the current function's
//! body otherwise.
//!
//! Branches are emitted with placeholder offsets and patched by index as
//! soon as their target is known, before the enclosing construct finishes
//! parsing. An instruction's `ip` equals its index in its body, so patch
//! targets are plain vector indices.
//!
//! `_start` is declared before anything else, then the eight builtins, so
//! they occupy fixed global slots. After the whole program is parsed,
//! `_start` is finalized with the call to `main`.

use navm_core::{FunctionDef, GlobalSymbol, Instruction, ObjectProgram, Opcode};

use crate::error::{SyntaxError, SyntaxErrorKind};
use crate::symbols::{Symbol, SymbolTable};
use crate::token::{Token, TokenKind};
use crate::types::Ty;

/// Run the pass over a token stream and produce the object model.
pub fn analyze(
    tokens: Vec<Token>,
    string_literals: Vec<String>,
) -> Result<ObjectProgram, SyntaxError> {
    let mut analyzer = Analyzer::new(tokens, string_literals);
    analyzer.declare_start_and_builtins()?;
    analyzer.parse_program()?;
    analyzer.finish_start()?;
    Ok(analyzer.into_object_program())
}

/// Branch indices collected inside a loop body, patched when the loop's
/// extent is known.
#[derive(Default)]
struct LoopPatches {
    breaks: Vec<usize>,
    continues: Vec<usize>,
}

struct Analyzer {
    tokens: Vec<Token>,
    pos: usize,
    symbols: SymbolTable,
    string_literals: Vec<String>,
    /// Body of `_start`: global initializers, then the call to `main`.
    start_body: Vec<Instruction>,
    /// Body of the function currently being parsed.
    func_body: Vec<Instruction>,
    /// Return type of the function currently being parsed.
    return_ty: Ty,
}

impl Analyzer {
    fn new(mut tokens: Vec<Token>, string_literals: Vec<String>) -> Self {
        // The grammar peeks one token past the current one; the lexer ends
        // streams with two EOF sentinels, but don't rely on callers.
        while tokens.len() < 2 {
            tokens.push(Token::new(TokenKind::Eof, 0));
        }
        let num_literals = string_literals.len() as u32;
        Analyzer {
            tokens,
            pos: 0,
            symbols: SymbolTable::new(num_literals),
            string_literals,
            start_body: Vec::new(),
            func_body: Vec::new(),
            return_ty: Ty::Void,
        }
    }

    /// `_start` and the builtins take the global slots right after the
    /// string pool, in this fixed order. Builtins have empty bodies; the VM
    /// resolves them by the name string at their global offset.
    fn declare_start_and_builtins(&mut self) -> Result<(), SyntaxError> {
        self.symbols
            .declare_func("_start", Vec::new(), 0, Ty::Void, Vec::new())?;
        let builtins: [(&str, Vec<Ty>, Ty); 8] = [
            ("getint", Vec::new(), Ty::Int),
            ("getdouble", Vec::new(), Ty::Double),
            ("getchar", Vec::new(), Ty::Int),
            ("putint", vec![Ty::Int], Ty::Void),
            ("putdouble", vec![Ty::Double], Ty::Void),
            ("putchar", vec![Ty::Int], Ty::Void),
            ("putstr", vec![Ty::Int], Ty::Void),
            ("putln", Vec::new(), Ty::Void),
        ];
        for (name, arg_types, return_ty) in builtins {
            self.symbols
                .declare_func(name, arg_types, 0, return_ty, Vec::new())?;
        }
        Ok(())
    }

    /// Finalize `_start`: reserve `main`'s return slot if it has one, then
    /// call it. `main` must exist and take no arguments.
    fn finish_start(&mut self) -> Result<(), SyntaxError> {
        let main = self.symbols.get_func("main").map_err(|e| self.ctx(e))?;
        if !main.arg_types.is_empty() {
            return Err(SyntaxError::new(
                SyntaxErrorKind::Program,
                "arguments found in the \"main\" function",
            ));
        }
        if main.has_return_value() {
            self.emit(Instruction::with_u32(Opcode::StackAlloc, 1));
        }
        self.emit(Instruction::with_u32(Opcode::CallName, main.offset));
        Ok(())
    }

    fn into_object_program(self) -> ObjectProgram {
        let Analyzer {
            symbols,
            string_literals,
            start_body,
            ..
        } = self;
        let mut start_body = Some(start_body);
        let mut globals = Vec::new();
        let mut functions = Vec::new();
        for symbol in symbols.into_global_symbols() {
            match symbol {
                Symbol::Var(v) => globals.push(GlobalSymbol::Variable {
                    is_const: v.is_const,
                }),
                Symbol::Func(f) => {
                    globals.push(GlobalSymbol::Function {
                        name: f.name.clone(),
                    });
                    let num_return_values = f.num_return_values();
                    let body = if f.name == "_start" {
                        start_body.take().unwrap_or_default()
                    } else {
                        f.body
                    };
                    functions.push(FunctionDef {
                        name: f.name,
                        name_offset: f.offset,
                        num_return_values,
                        num_args: f.arg_types.len() as u32,
                        num_local_vars: f.num_local_vars,
                        body,
                    });
                }
            }
        }
        ObjectProgram {
            string_literals,
            globals,
            functions,
        }
    }

    // ------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_second(&self) -> &TokenKind {
        &self.tokens[self.pos + 1].kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        // Never step past the final sentinel pair, so one-token lookahead
        // stays in bounds.
        if self.pos + 2 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &TokenKind, what: &str) -> Result<Token, SyntaxError> {
        let token = self.advance();
        if token.kind == *expected {
            Ok(token)
        } else {
            Err(self.err(
                SyntaxErrorKind::Token,
                format!("unexpected token; {what} expected (got \"{}\")", token.kind),
            ))
        }
    }

    /// Rendering of the next few tokens, attached to errors in place of
    /// line/column positions.
    fn upcoming(&self) -> String {
        let mut parts = Vec::new();
        for token in self.tokens.iter().skip(self.pos).take(12) {
            let is_eof = token.kind == TokenKind::Eof;
            parts.push(token.kind.to_string());
            if is_eof {
                break;
            }
        }
        parts.join(" ")
    }

    fn err(&self, kind: SyntaxErrorKind, message: impl Into<String>) -> SyntaxError {
        SyntaxError::new(kind, message).with_context(self.upcoming())
    }

    /// Attach upcoming-token context to errors bubbling out of the symbol
    /// table, which has no view of the token stream.
    fn ctx(&self, e: SyntaxError) -> SyntaxError {
        if e.context.is_empty() {
            e.with_context(self.upcoming())
        } else {
            e
        }
    }

    // ------------------------------------------------------------------
    // Emission
    // ------------------------------------------------------------------

    /// Append to the active body: `_start` at global scope, the current
    /// function otherwise. Returns the instruction's index (== its ip).
    fn emit(&mut self, mut instr: Instruction) -> usize {
        let body = if self.symbols.in_global_scope() {
            &mut self.start_body
        } else {
            &mut self.func_body
        };
        instr.ip = body.len() as u32;
        body.push(instr);
        body.len() - 1
    }

    fn emit_op(&mut self, opcode: Opcode) -> usize {
        self.emit(Instruction::new(opcode))
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// program -> ( fn_decl | var_decl(let) | var_decl(const) )*
    fn parse_program(&mut self) -> Result<(), SyntaxError> {
        while *self.peek() != TokenKind::Eof {
            match self.peek() {
                TokenKind::Fn => self.parse_func_decl()?,
                TokenKind::Let => self.parse_var_decl(false)?,
                TokenKind::Const => self.parse_var_decl(true)?,
                other => {
                    return Err(self.err(
                        SyntaxErrorKind::Program,
                        format!(
                            "unexpected token; \"fn\", \"let\" or \"const\" expected (got \"{other}\")"
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// fn_decl -> 'fn' IDENT '(' fn_args? ')' '->' TYPE block
    fn parse_func_decl(&mut self) -> Result<(), SyntaxError> {
        self.advance(); // fn
        let token = self.advance();
        let TokenKind::Ident(name) = token.kind else {
            return Err(self.err(SyntaxErrorKind::Declaration, "function name missing"));
        };

        self.expect(&TokenKind::LParen, "\"(\"")?;
        let mut args: Vec<(String, bool, bool)> = Vec::new();
        if *self.peek() != TokenKind::RParen {
            self.parse_func_args(&mut args)?;
        }
        self.expect(&TokenKind::RParen, "\")\"")?;
        self.expect(&TokenKind::Arrow, "\"->\"")?;

        let token = self.advance();
        let return_ty = match token.kind {
            TokenKind::IntType => Ty::Int,
            TokenKind::DoubleType => Ty::Double,
            TokenKind::VoidType => Ty::Void,
            other => {
                return Err(self.err(
                    SyntaxErrorKind::Token,
                    format!(
                        "unexpected token; \"int\", \"double\" or \"void\" expected (got \"{other}\")"
                    ),
                ));
            }
        };
        self.return_ty = return_ty;
        let has_return_value = return_ty != Ty::Void;

        self.func_body = Vec::new();
        self.symbols.enter_func(has_return_value);
        let arg_types: Vec<Ty> = args
            .iter()
            .map(|(_, is_int, _)| Ty::from_is_int(*is_int))
            .collect();
        for (arg_name, is_int, is_const) in &args {
            self.symbols
                .declare_func_arg(arg_name, *is_int, *is_const)
                .map_err(|e| self.ctx(e))?;
        }

        let all_returned = self.parse_block(None, true)?;
        if !all_returned {
            if has_return_value {
                return Err(self.err(
                    SyntaxErrorKind::Declaration,
                    format!("control reaches end of non-void function \"{name}\""),
                ));
            }
            self.emit_op(Opcode::Ret);
        }

        let num_local_vars = self.symbols.exit_func();
        let body = std::mem::take(&mut self.func_body);
        self.symbols
            .declare_func(&name, arg_types, num_local_vars, return_ty, body)
            .map_err(|e| self.ctx(e))?;
        Ok(())
    }

    /// fn_args -> fn_arg (',' fn_arg)* ; fn_arg -> 'const'? IDENT ':' TYPE
    fn parse_func_args(
        &mut self,
        args: &mut Vec<(String, bool, bool)>,
    ) -> Result<(), SyntaxError> {
        loop {
            let mut is_const = false;
            let mut token = self.advance();
            if token.kind == TokenKind::Const {
                is_const = true;
                token = self.advance();
            }
            let TokenKind::Ident(name) = token.kind else {
                return Err(self.err(SyntaxErrorKind::Declaration, "argument name missing"));
            };
            let ty = self.parse_type_specifier()?;
            args.push((name, ty == Ty::Int, is_const));

            if *self.peek() != TokenKind::Comma {
                return Ok(());
            }
            self.advance();
        }
    }

    /// type_specifier -> ':' ('int' | 'double')
    fn parse_type_specifier(&mut self) -> Result<Ty, SyntaxError> {
        self.expect(&TokenKind::Colon, "\":\"")?;
        let token = self.advance();
        match token.kind {
            TokenKind::IntType => Ok(Ty::Int),
            TokenKind::DoubleType => Ok(Ty::Double),
            other => Err(self.err(
                SyntaxErrorKind::Token,
                format!("unexpected token; \"int\" or \"double\" expected (got \"{other}\")"),
            )),
        }
    }

    /// var_decl -> ('let' | 'const') IDENT ':' TYPE ('=' expr)? ';'
    ///
    /// At global scope the initializer is emitted into `_start`; inside a
    /// function it goes into the current body.
    fn parse_var_decl(&mut self, is_const: bool) -> Result<(), SyntaxError> {
        self.advance(); // let / const
        let token = self.advance();
        let TokenKind::Ident(name) = token.kind else {
            return Err(self.err(SyntaxErrorKind::Declaration, "identifier missing"));
        };
        let decl_ty = self.parse_type_specifier()?;

        let initialized = *self.peek() == TokenKind::Assign;
        if !initialized && is_const {
            return Err(self.err(
                SyntaxErrorKind::Declaration,
                format!("uninitialized const \"{name}\""),
            ));
        }

        let attrs = self
            .symbols
            .declare_var(&name, decl_ty == Ty::Int, initialized, is_const)
            .map_err(|e| self.ctx(e))?;

        if initialized {
            self.advance(); // =
            self.emit(attrs.load_address());
            let value_ty = self.parse_expression()?;
            if value_ty != decl_ty {
                return Err(self.err(
                    SyntaxErrorKind::Type,
                    format!("invalid assignment from \"{value_ty}\" to \"{decl_ty}\""),
                ));
            }
            self.emit_op(Opcode::Store64);
        }

        let token = self.advance();
        if token.kind != TokenKind::Semicolon {
            return Err(self.err(
                SyntaxErrorKind::Declaration,
                format!("\";\" missing in the declaration of \"{name}\""),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// block -> '{' stmt* '}'
    ///
    /// Returns whether every path through the block returns. Once that flag
    /// is set, the remaining statements are still parsed and checked but
    /// their instructions are rolled back (dead code emits nothing).
    fn parse_block(
        &mut self,
        mut loop_ctx: Option<&mut LoopPatches>,
        is_func: bool,
    ) -> Result<bool, SyntaxError> {
        // The function scope (arguments + top-level locals) is opened by the
        // caller; nested blocks get their own scope.
        if !is_func {
            self.symbols.enter_scope();
        }
        self.expect(&TokenKind::LBrace, "\"{\"")?;

        let mut all_returned = false;
        while !matches!(self.peek(), TokenKind::RBrace | TokenKind::Eof) {
            if all_returned {
                let mark = self.func_body.len();
                let patch_marks = loop_ctx
                    .as_deref()
                    .map(|c| (c.breaks.len(), c.continues.len()));
                self.parse_stmt(loop_ctx.as_deref_mut())?;
                self.func_body.truncate(mark);
                if let (Some(ctx), Some((breaks, continues))) =
                    (loop_ctx.as_deref_mut(), patch_marks)
                {
                    ctx.breaks.truncate(breaks);
                    ctx.continues.truncate(continues);
                }
            } else {
                all_returned = self.parse_stmt(loop_ctx.as_deref_mut())?;
            }
        }

        self.expect(&TokenKind::RBrace, "\"}\"")?;
        if !is_func {
            self.symbols.exit_scope();
        }
        Ok(all_returned)
    }

    /// Returns whether the statement guarantees a return on every path.
    fn parse_stmt(&mut self, loop_ctx: Option<&mut LoopPatches>) -> Result<bool, SyntaxError> {
        match self.peek() {
            TokenKind::If => self.parse_if(loop_ctx),
            TokenKind::While => {
                // Conservative: a loop may run zero times, so it never
                // counts toward all-paths-return.
                self.parse_while()?;
                Ok(false)
            }
            TokenKind::Let => {
                self.parse_var_decl(false)?;
                Ok(false)
            }
            TokenKind::Const => {
                self.parse_var_decl(true)?;
                Ok(false)
            }
            TokenKind::Break => {
                self.parse_break(loop_ctx)?;
                Ok(false)
            }
            TokenKind::Continue => {
                self.parse_continue(loop_ctx)?;
                Ok(false)
            }
            TokenKind::Return => {
                self.parse_return()?;
                Ok(true)
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(false)
            }
            TokenKind::LBrace => self.parse_block(loop_ctx, false),
            _ => {
                self.parse_expr_stmt()?;
                Ok(false)
            }
        }
    }

    /// if_stmt -> 'if' expr block ('else' 'if' expr block)* ('else' block)?
    ///
    /// Every branch ends in a `br` to the common join point; each condition's
    /// `br.false` skips past its own branch's trailing `br`. The chain is
    /// all-returning only when every branch is and a final unconditional
    /// `else` exists.
    fn parse_if(&mut self, mut loop_ctx: Option<&mut LoopPatches>) -> Result<bool, SyntaxError> {
        self.advance(); // if

        let mut end_jumps: Vec<usize> = Vec::new();
        let mut all_branches = self.parse_if_branch(true, &mut end_jumps, loop_ctx.as_deref_mut())?;
        let mut has_final_else = false;

        while *self.peek() == TokenKind::Else {
            self.advance();
            let has_cond = if *self.peek() == TokenKind::If {
                self.advance();
                true
            } else {
                false
            };
            all_branches &= self.parse_if_branch(has_cond, &mut end_jumps, loop_ctx.as_deref_mut())?;
            if !has_cond {
                has_final_else = true;
                break;
            }
        }

        // Join: everything lands one past the last branch's trailing br
        // (the last br itself becomes a no-op forward jump).
        if let Some(&last) = end_jumps.last() {
            let join_ip = self.func_body[last].ip;
            for &index in &end_jumps {
                self.func_body[index].patch_to_skip(join_ip);
            }
        }

        Ok(all_branches && has_final_else)
    }

    fn parse_if_branch(
        &mut self,
        has_cond: bool,
        end_jumps: &mut Vec<usize>,
        loop_ctx: Option<&mut LoopPatches>,
    ) -> Result<bool, SyntaxError> {
        let br_false = if has_cond {
            let cond_ty = self.parse_expression()?;
            if !cond_ty.evaluable() {
                return Err(self.err(
                    SyntaxErrorKind::Type,
                    format!("could not convert \"{cond_ty}\" to \"bool\""),
                ));
            }
            Some(self.emit(Instruction::branch(Opcode::BrFalse)))
        } else {
            None
        };

        let all_returned = self.parse_block(loop_ctx, false)?;

        let end_jump = self.emit(Instruction::branch(Opcode::Br));
        end_jumps.push(end_jump);
        if let Some(index) = br_false {
            let target_ip = self.func_body[end_jump].ip;
            self.func_body[index].patch_to_skip(target_ip);
        }
        Ok(all_returned)
    }

    /// while_stmt -> 'while' expr block
    fn parse_while(&mut self) -> Result<(), SyntaxError> {
        self.advance(); // while

        let cond_ip = self.func_body.len() as u32;
        let cond_ty = self.parse_expression()?;
        if !cond_ty.evaluable() {
            return Err(self.err(
                SyntaxErrorKind::Type,
                format!("could not convert \"{cond_ty}\" to \"bool\""),
            ));
        }
        let br_false = self.emit(Instruction::branch(Opcode::BrFalse));

        let mut patches = LoopPatches::default();
        self.parse_block(Some(&mut patches), false)?;

        let br_back = self.emit(Instruction::branch(Opcode::Br));
        let back_ip = self.func_body[br_back].ip;
        self.func_body[br_back].patch_to_reach(cond_ip);
        // Loop exit: one past the back edge.
        self.func_body[br_false].patch_to_skip(back_ip);
        for &index in &patches.breaks {
            self.func_body[index].patch_to_skip(back_ip);
        }
        for &index in &patches.continues {
            self.func_body[index].patch_to_reach(cond_ip);
        }
        Ok(())
    }

    /// break_stmt -> 'break' ';'
    fn parse_break(&mut self, loop_ctx: Option<&mut LoopPatches>) -> Result<(), SyntaxError> {
        self.advance(); // break
        self.expect(&TokenKind::Semicolon, "\";\"")?;
        let Some(patches) = loop_ctx else {
            return Err(self.err(
                SyntaxErrorKind::Statement,
                "break statement not within a loop",
            ));
        };
        let index = self.emit(Instruction::branch(Opcode::Br));
        patches.breaks.push(index);
        Ok(())
    }

    /// continue_stmt -> 'continue' ';'
    fn parse_continue(&mut self, loop_ctx: Option<&mut LoopPatches>) -> Result<(), SyntaxError> {
        self.advance(); // continue
        self.expect(&TokenKind::Semicolon, "\";\"")?;
        let Some(patches) = loop_ctx else {
            return Err(self.err(
                SyntaxErrorKind::Statement,
                "continue statement not within a loop",
            ));
        };
        let index = self.emit(Instruction::branch(Opcode::Br));
        patches.continues.push(index);
        Ok(())
    }

    /// return_stmt -> 'return' expr? ';'
    ///
    /// A returned value is stored into the return slot at argument offset 0
    /// before `ret`.
    fn parse_return(&mut self) -> Result<(), SyntaxError> {
        self.advance(); // return
        if self.return_ty == Ty::Void {
            self.expect(&TokenKind::Semicolon, "\";\"")?;
        } else {
            self.emit(Instruction::with_u32(Opcode::Arga, 0));
            let value_ty = self.parse_expression()?;
            if value_ty != self.return_ty {
                return Err(self.err(
                    SyntaxErrorKind::Type,
                    format!(
                        "invalid conversion from \"{value_ty}\" to \"{}\"",
                        self.return_ty
                    ),
                ));
            }
            self.expect(&TokenKind::Semicolon, "\";\"")?;
            self.emit_op(Opcode::Store64);
        }
        self.emit_op(Opcode::Ret);
        Ok(())
    }

    /// expr_stmt -> (IDENT '=' expr | expr) ';'
    fn parse_expr_stmt(&mut self) -> Result<(), SyntaxError> {
        if matches!(self.peek(), TokenKind::Ident(_)) && *self.peek_second() == TokenKind::Assign {
            self.parse_assignment()?;
        } else {
            let ty = self.parse_expression()?;
            // The VM requires stack balance at statement boundaries.
            if ty != Ty::Void {
                self.emit_op(Opcode::Pop);
            }
        }
        self.expect(&TokenKind::Semicolon, "\";\"")?;
        Ok(())
    }

    fn parse_assignment(&mut self) -> Result<(), SyntaxError> {
        let token = self.advance();
        let TokenKind::Ident(name) = token.kind else {
            return Err(self.err(SyntaxErrorKind::Assignment, "identifier missing"));
        };
        let var = self.symbols.get_var(&name).map_err(|e| self.ctx(e))?;
        if var.is_const {
            return Err(self.err(
                SyntaxErrorKind::Assignment,
                format!("assignment of read-only variable \"{name}\""),
            ));
        }

        self.emit(var.load_address());
        self.expect(&TokenKind::Assign, "\"=\"")?;
        let value_ty = self.parse_expression()?;
        if value_ty != var.ty() {
            return Err(self.err(
                SyntaxErrorKind::Type,
                format!("invalid conversion from \"{value_ty}\" to \"{}\"", var.ty()),
            ));
        }
        self.emit_op(Opcode::Store64);
        self.symbols.init_var(&name).map_err(|e| self.ctx(e))?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expressions (each production leaves its value on the VM stack)
    // ------------------------------------------------------------------

    /// expr -> sum ( ('<' | '>' | '<=' | '>=' | '==' | '!=') sum )?
    ///
    /// `cmp.*` leaves -1/0/1; the suffix turns that into 0/1 except for
    /// `!=`, where any non-zero result is already truthy.
    fn parse_expression(&mut self) -> Result<Ty, SyntaxError> {
        let lhs = self.parse_sum()?;
        let op = match self.peek() {
            TokenKind::Gt
            | TokenKind::Lt
            | TokenKind::Ge
            | TokenKind::Le
            | TokenKind::Eq
            | TokenKind::Neq => self.advance().kind,
            _ => return Ok(lhs),
        };

        if !lhs.numeric() {
            return Err(self.err(
                SyntaxErrorKind::Type,
                format!("\"{lhs}\" cannot be compared"),
            ));
        }
        let rhs = self.parse_sum()?;
        if lhs != rhs {
            return Err(self.err(
                SyntaxErrorKind::Type,
                format!("cannot compare \"{lhs}\" with \"{rhs}\""),
            ));
        }

        self.emit_op(if lhs == Ty::Int {
            Opcode::CmpI
        } else {
            Opcode::CmpF
        });
        match op {
            TokenKind::Gt => {
                self.emit_op(Opcode::SetGt);
            }
            TokenKind::Lt => {
                self.emit_op(Opcode::SetLt);
            }
            TokenKind::Ge => {
                self.emit_op(Opcode::SetLt);
                self.emit_op(Opcode::Not);
            }
            TokenKind::Le => {
                self.emit_op(Opcode::SetGt);
                self.emit_op(Opcode::Not);
            }
            TokenKind::Eq => {
                self.emit_op(Opcode::Not);
            }
            _ => {} // !=
        }
        Ok(Ty::Bool)
    }

    /// sum -> prod ( ('+' | '-') prod )*
    fn parse_sum(&mut self) -> Result<Ty, SyntaxError> {
        let lhs = self.parse_product()?;
        while matches!(self.peek(), TokenKind::Plus | TokenKind::Minus) {
            let op = self.advance().kind;
            if !lhs.numeric() {
                return Err(self.err(
                    SyntaxErrorKind::Type,
                    format!("\"{lhs}\" cannot be calculated"),
                ));
            }
            let rhs = self.parse_product()?;
            if lhs != rhs {
                return Err(self.err(
                    SyntaxErrorKind::Type,
                    format!("cannot add \"{lhs}\" and \"{rhs}\""),
                ));
            }
            let opcode = match (op, lhs) {
                (TokenKind::Plus, Ty::Int) => Opcode::AddI,
                (TokenKind::Plus, _) => Opcode::AddF,
                (_, Ty::Int) => Opcode::SubI,
                _ => Opcode::SubF,
            };
            self.emit_op(opcode);
        }
        Ok(lhs)
    }

    /// prod -> fact ( ('*' | '/') fact )*
    fn parse_product(&mut self) -> Result<Ty, SyntaxError> {
        let lhs = self.parse_factor()?;
        while matches!(self.peek(), TokenKind::Star | TokenKind::Slash) {
            let op = self.advance().kind;
            if !lhs.numeric() {
                return Err(self.err(
                    SyntaxErrorKind::Type,
                    format!("\"{lhs}\" cannot be calculated"),
                ));
            }
            let rhs = self.parse_factor()?;
            if lhs != rhs {
                return Err(self.err(
                    SyntaxErrorKind::Type,
                    format!("cannot multiply \"{lhs}\" and \"{rhs}\""),
                ));
            }
            let opcode = match (op, lhs) {
                (TokenKind::Star, Ty::Int) => Opcode::MulI,
                (TokenKind::Star, _) => Opcode::MulF,
                (_, Ty::Int) => Opcode::DivI,
                _ => Opcode::DivF,
            };
            self.emit_op(opcode);
        }
        Ok(lhs)
    }

    /// fact -> elem ( 'as' TYPE )*
    ///
    /// Casts exist only between `int` and `double`; a cast to the same type
    /// emits nothing.
    fn parse_factor(&mut self) -> Result<Ty, SyntaxError> {
        let mut ty = self.parse_element()?;
        while *self.peek() == TokenKind::As {
            self.advance();
            let token = self.advance();
            let target = match token.kind {
                TokenKind::IntType => Ty::Int,
                TokenKind::DoubleType => Ty::Double,
                other => {
                    return Err(self.err(
                        SyntaxErrorKind::Token,
                        format!(
                            "unexpected token; \"int\" or \"double\" expected after \"as\" (got \"{other}\")"
                        ),
                    ));
                }
            };
            if ty == target {
                continue;
            }
            if !ty.numeric() {
                return Err(self.err(
                    SyntaxErrorKind::Type,
                    format!("cannot cast \"{ty}\" to \"{target}\""),
                ));
            }
            self.emit_op(if ty == Ty::Int {
                Opcode::Itof
            } else {
                Opcode::Ftoi
            });
            ty = target;
        }
        Ok(ty)
    }

    /// elem -> '-'* ( literal | fn_call | IDENT | '(' expr ')' )
    fn parse_element(&mut self) -> Result<Ty, SyntaxError> {
        let mut negate = false;
        while *self.peek() == TokenKind::Minus {
            self.advance();
            negate = !negate;
        }

        let ty = match self.peek().clone() {
            TokenKind::IntLiteral(value) => {
                self.advance();
                self.emit(Instruction::push_int(value));
                Ty::Int
            }
            TokenKind::FloatLiteral(value) => {
                self.advance();
                self.emit(Instruction::push_float(value));
                Ty::Double
            }
            TokenKind::StringLiteral(index) => {
                // The pool index is the pushed value; it doubles as the
                // literal's global-symbol offset.
                self.advance();
                self.emit(Instruction::push_int(u64::from(index)));
                Ty::Str
            }
            TokenKind::Ident(name) => {
                if *self.peek_second() == TokenKind::LParen {
                    self.parse_call()?
                } else {
                    self.advance();
                    let var = self.symbols.get_var(&name).map_err(|e| self.ctx(e))?;
                    self.emit(var.load_address());
                    self.emit_op(Opcode::Load64);
                    var.ty()
                }
            }
            _ => {
                self.expect(&TokenKind::LParen, "an expression")?;
                let ty = self.parse_expression()?;
                self.expect(&TokenKind::RParen, "\")\"")?;
                ty
            }
        };

        if negate {
            if !ty.numeric() {
                return Err(self.err(
                    SyntaxErrorKind::Type,
                    format!("cannot negate \"{ty}\""),
                ));
            }
            self.emit_op(if ty == Ty::Int {
                Opcode::NegI
            } else {
                Opcode::NegF
            });
        }
        Ok(ty)
    }

    /// fn_call -> IDENT '(' (expr (',' expr)*)? ')'
    ///
    /// A callee with a return value gets its slot reserved first
    /// (`stackalloc 1`), then arguments are emitted left to right, then
    /// `callname`.
    fn parse_call(&mut self) -> Result<Ty, SyntaxError> {
        let token = self.advance();
        let TokenKind::Ident(name) = token.kind else {
            return Err(self.err(SyntaxErrorKind::Call, "function name missing"));
        };
        let func = self.symbols.get_func(&name).map_err(|e| self.ctx(e))?;

        if func.has_return_value() {
            self.emit(Instruction::with_u32(Opcode::StackAlloc, 1));
        }

        self.expect(&TokenKind::LParen, "\"(\"")?;
        let mut param_types = Vec::new();
        if *self.peek() != TokenKind::RParen {
            param_types.push(self.parse_expression()?);
            while *self.peek() == TokenKind::Comma {
                self.advance();
                param_types.push(self.parse_expression()?);
            }
        }
        self.expect(&TokenKind::RParen, "\")\"")?;

        if param_types.len() != func.arg_types.len() {
            return Err(self.err(
                SyntaxErrorKind::Type,
                format!(
                    "\"{name}\" expects {} argument(s), got {}",
                    func.arg_types.len(),
                    param_types.len()
                ),
            ));
        }
        for (position, (param, arg)) in param_types.iter().zip(&func.arg_types).enumerate() {
            if !param.satisfies_param(*arg) {
                return Err(self.err(
                    SyntaxErrorKind::Type,
                    format!(
                        "argument {} of \"{name}\": expected \"{arg}\", got \"{param}\"",
                        position + 1
                    ),
                ));
            }
        }

        self.emit(Instruction::with_u32(Opcode::CallName, func.offset));
        Ok(func.return_ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use navm_core::Operand;

    fn compile(source: &str) -> ObjectProgram {
        let (tokens, pool) = crate::lexer::tokenize(source).unwrap();
        analyze(tokens, pool).unwrap()
    }

    fn compile_err(source: &str) -> SyntaxError {
        let (tokens, pool) = crate::lexer::tokenize(source).unwrap();
        analyze(tokens, pool).unwrap_err()
    }

    fn func<'a>(program: &'a ObjectProgram, name: &str) -> &'a FunctionDef {
        program
            .functions
            .iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("no function {name}"))
    }

    fn opcodes(f: &FunctionDef) -> Vec<Opcode> {
        f.body.iter().map(|i| i.opcode).collect()
    }

    // Global layout: _start, then the eight builtins, then user symbols
    // (all after the string pool).
    const START: u32 = 0;
    const PUTINT: u32 = 4;
    const PUTLN: u32 = 8;
    const FIRST_USER: u32 = 9;

    #[test]
    fn test_empty_void_main() {
        let program = compile("fn main() -> void {}");
        assert!(program.string_literals.is_empty());
        assert_eq!(program.globals.len(), 10); // _start + 8 builtins + main
        let main = func(&program, "main");
        assert_eq!(main.name_offset, FIRST_USER);
        assert_eq!(opcodes(main), vec![Opcode::Ret]);

        let start = func(&program, "_start");
        assert_eq!(start.name_offset, START);
        assert_eq!(
            start.body,
            vec![Instruction::with_u32(Opcode::CallName, FIRST_USER)]
        );
    }

    #[test]
    fn test_int_main_reserves_return_slot() {
        let program = compile("fn main() -> int { return 1; }");
        let start = func(&program, "_start");
        assert_eq!(opcodes(start), vec![Opcode::StackAlloc, Opcode::CallName]);
        assert_eq!(start.body[0].operand, Some(Operand::U32(1)));

        let main = func(&program, "main");
        assert_eq!(main.num_return_values, 1);
        assert_eq!(
            opcodes(main),
            vec![Opcode::Arga, Opcode::Push, Opcode::Store64, Opcode::Ret]
        );
        assert_eq!(main.body[0].operand, Some(Operand::U32(0)));
        assert_eq!(main.body[1].operand, Some(Operand::U64(1)));
    }

    #[test]
    fn test_global_initializer_goes_into_start() {
        let program = compile("let g: int = 3; fn main() -> void {}");
        assert_eq!(
            program.globals[FIRST_USER as usize],
            GlobalSymbol::Variable { is_const: false }
        );
        let start = func(&program, "_start");
        assert_eq!(
            opcodes(start),
            vec![Opcode::Globa, Opcode::Push, Opcode::Store64, Opcode::CallName]
        );
        assert_eq!(start.body[0].operand, Some(Operand::U32(FIRST_USER)));
        // main was declared after g
        assert_eq!(start.body[3].operand, Some(Operand::U32(FIRST_USER + 1)));
    }

    #[test]
    fn test_local_declare_assign_call() {
        let program = compile("fn main() -> void { let x: int; x = 2; putint(x); }");
        let main = func(&program, "main");
        assert_eq!(main.num_local_vars, 1);
        assert_eq!(
            opcodes(main),
            vec![
                Opcode::Loca,
                Opcode::Push,
                Opcode::Store64,
                Opcode::Loca,
                Opcode::Load64,
                Opcode::CallName,
                Opcode::Ret,
            ]
        );
        assert_eq!(main.body[5].operand, Some(Operand::U32(PUTINT)));
    }

    #[test]
    fn test_while_break_patching() {
        let program = compile("fn main() -> void { while 1 { break; } }");
        let main = func(&program, "main");
        assert_eq!(
            opcodes(main),
            vec![Opcode::Push, Opcode::BrFalse, Opcode::Br, Opcode::Br, Opcode::Ret]
        );
        // br.false exits one past the back edge
        assert_eq!(main.body[1].operand, Some(Operand::I32(2)));
        // break skips past the back edge
        assert_eq!(main.body[2].operand, Some(Operand::I32(1)));
        // back edge re-evaluates the condition
        assert_eq!(main.body[3].operand, Some(Operand::I32(-4)));
    }

    #[test]
    fn test_while_continue_patches_to_condition() {
        let program = compile("fn main() -> void { while 1 { continue; } }");
        let main = func(&program, "main");
        assert_eq!(main.body[2].opcode, Opcode::Br);
        assert_eq!(main.body[2].operand, Some(Operand::I32(-3)));
        assert_eq!(main.body[3].operand, Some(Operand::I32(-4)));
    }

    #[test]
    fn test_missing_return_in_non_void_function() {
        let err = compile_err("fn main() -> int { }");
        assert_eq!(err.kind, SyntaxErrorKind::Declaration);
        assert!(err.message.contains("control reaches end"));
    }

    #[test]
    fn test_if_else_chain_joins_at_common_point() {
        let program = compile("fn main() -> void { if 1 { putln(); } else { putln(); } }");
        let main = func(&program, "main");
        assert_eq!(
            opcodes(main),
            vec![
                Opcode::Push,     // 0: condition
                Opcode::BrFalse,  // 1: to else
                Opcode::CallName, // 2: then
                Opcode::Br,       // 3: to join
                Opcode::CallName, // 4: else
                Opcode::Br,       // 5: to join
                Opcode::Ret,      // 6
            ]
        );
        assert_eq!(main.body[1].operand, Some(Operand::I32(2))); // lands on 4
        assert_eq!(main.body[3].operand, Some(Operand::I32(2))); // lands on 6
        assert_eq!(main.body[5].operand, Some(Operand::I32(0))); // lands on 6
        assert_eq!(main.body[2].operand, Some(Operand::U32(PUTLN)));
    }

    #[test]
    fn test_if_without_else_is_not_all_returning() {
        let err = compile_err("fn f() -> int { if 1 { return 1; } } fn main() -> void {}");
        assert_eq!(err.kind, SyntaxErrorKind::Declaration);
    }

    #[test]
    fn test_if_with_final_else_returns_on_all_paths() {
        let program = compile(
            "fn f() -> int { if 1 { return 1; } else if 2 { return 2; } else { return 3; } } \
             fn main() -> void {}",
        );
        let f = func(&program, "f");
        // no trailing auto-ret beyond the branch returns
        assert_eq!(f.body.last().map(|i| i.opcode), Some(Opcode::Br));
    }

    #[test]
    fn test_while_never_counts_as_returning() {
        let err = compile_err("fn f() -> int { while 1 { return 1; } } fn main() -> void {}");
        assert_eq!(err.kind, SyntaxErrorKind::Declaration);
    }

    #[test]
    fn test_dead_code_after_return_emits_nothing() {
        let program = compile("fn main() -> int { return 1; putln(); 2 + 3; }");
        let main = func(&program, "main");
        assert_eq!(
            opcodes(main),
            vec![Opcode::Arga, Opcode::Push, Opcode::Store64, Opcode::Ret]
        );
    }

    #[test]
    fn test_dead_code_is_still_checked() {
        let err = compile_err("fn main() -> int { return 1; nope(); }");
        assert_eq!(err.kind, SyntaxErrorKind::Reference);
    }

    #[test]
    fn test_break_outside_loop() {
        let err = compile_err("fn main() -> void { break; }");
        assert_eq!(err.kind, SyntaxErrorKind::Statement);
        let err = compile_err("fn main() -> void { continue; }");
        assert_eq!(err.kind, SyntaxErrorKind::Statement);
    }

    #[test]
    fn test_break_inside_if_inside_loop_is_allowed() {
        let program =
            compile("fn main() -> void { while 1 { if 1 { break; } } }");
        let main = func(&program, "main");
        // condition, br.false, inner condition, br.false, break br, branch br,
        // back edge, ret
        assert_eq!(opcodes(main).len(), 8);
        let exit = main.body.len() as i32 - 2; // back edge ip
        let brk = &main.body[4];
        assert_eq!(brk.opcode, Opcode::Br);
        assert_eq!(brk.operand, Some(Operand::I32(exit - brk.ip as i32)));
    }

    #[test]
    fn test_comparison_suffixes() {
        let cases = [
            ("1 < 2", vec![Opcode::CmpI, Opcode::SetLt]),
            ("1 > 2", vec![Opcode::CmpI, Opcode::SetGt]),
            ("1 >= 2", vec![Opcode::CmpI, Opcode::SetLt, Opcode::Not]),
            ("1 <= 2", vec![Opcode::CmpI, Opcode::SetGt, Opcode::Not]),
            ("1 == 2", vec![Opcode::CmpI, Opcode::Not]),
            ("1 != 2", vec![Opcode::CmpI]),
        ];
        for (expr, suffix) in cases {
            let program = compile(&format!("fn main() -> void {{ if {expr} {{ }} }}"));
            let main = func(&program, "main");
            let ops = opcodes(main);
            // push, push, then the comparison sequence
            assert_eq!(&ops[2..2 + suffix.len()], &suffix[..], "{expr}");
        }
    }

    #[test]
    fn test_double_comparison_uses_cmp_f() {
        let program = compile("fn main() -> void { if 1.0 < 2.0 { } }");
        let main = func(&program, "main");
        assert!(opcodes(main).contains(&Opcode::CmpF));
    }

    #[test]
    fn test_arithmetic_opcodes_per_type() {
        let program = compile("fn main() -> void { 1 + 2 * 3 - 4 / 5; 1.0 + 2.0 * 3.0; }");
        let main = func(&program, "main");
        let ops = opcodes(main);
        for op in [
            Opcode::AddI,
            Opcode::MulI,
            Opcode::SubI,
            Opcode::DivI,
            Opcode::AddF,
            Opcode::MulF,
        ] {
            assert!(ops.contains(&op), "{op:?}");
        }
    }

    #[test]
    fn test_mixed_arithmetic_rejected() {
        let err = compile_err("fn main() -> void { 1 + 2.0; }");
        assert_eq!(err.kind, SyntaxErrorKind::Type);
    }

    #[test]
    fn test_casts() {
        let program = compile("fn main() -> void { 1 as double; 1.5 as int; 1 as int; }");
        let main = func(&program, "main");
        let ops = opcodes(main);
        assert!(ops.contains(&Opcode::Itof));
        assert!(ops.contains(&Opcode::Ftoi));
        // same-type cast emits nothing: push, itof, pop, push, ftoi, pop,
        // push, pop, ret
        assert_eq!(ops.len(), 9);
    }

    #[test]
    fn test_unary_minus_parity() {
        let program = compile("fn main() -> void { -1; --2; -1.5; }");
        let main = func(&program, "main");
        let ops = opcodes(main);
        assert_eq!(ops.iter().filter(|o| **o == Opcode::NegI).count(), 1);
        assert_eq!(ops.iter().filter(|o| **o == Opcode::NegF).count(), 1);
    }

    #[test]
    fn test_call_with_return_value_reserves_slot() {
        let program = compile("fn main() -> void { getint(); }");
        let main = func(&program, "main");
        assert_eq!(
            opcodes(main),
            vec![Opcode::StackAlloc, Opcode::CallName, Opcode::Pop, Opcode::Ret]
        );
        assert_eq!(main.body[0].operand, Some(Operand::U32(1)));
    }

    #[test]
    fn test_void_call_statement_has_no_pop() {
        let program = compile("fn main() -> void { putln(); }");
        let main = func(&program, "main");
        assert_eq!(opcodes(main), vec![Opcode::CallName, Opcode::Ret]);
    }

    #[test]
    fn test_user_function_call_arguments_left_to_right() {
        let program = compile(
            "fn add(a: int, b: int) -> int { return a + b; } \
             fn main() -> void { putint(add(1, 2)); }",
        );
        let add = func(&program, "add");
        // return slot at arga 0, args at 1 and 2
        assert_eq!(
            add.body,
            vec![
                Instruction::with_u32(Opcode::Arga, 0),
                Instruction {
                    ip: 1,
                    ..Instruction::with_u32(Opcode::Arga, 1)
                },
                Instruction {
                    ip: 2,
                    ..Instruction::new(Opcode::Load64)
                },
                Instruction {
                    ip: 3,
                    ..Instruction::with_u32(Opcode::Arga, 2)
                },
                Instruction {
                    ip: 4,
                    ..Instruction::new(Opcode::Load64)
                },
                Instruction {
                    ip: 5,
                    ..Instruction::new(Opcode::AddI)
                },
                Instruction {
                    ip: 6,
                    ..Instruction::new(Opcode::Store64)
                },
                Instruction {
                    ip: 7,
                    ..Instruction::new(Opcode::Ret)
                },
            ]
        );

        let main = func(&program, "main");
        assert_eq!(
            opcodes(main),
            vec![
                Opcode::StackAlloc, // add's return slot
                Opcode::Push,       // 1
                Opcode::Push,       // 2
                Opcode::CallName,   // add
                Opcode::CallName,   // putint
                Opcode::Ret,
            ]
        );
        assert_eq!(main.body[3].operand, Some(Operand::U32(FIRST_USER)));
    }

    #[test]
    fn test_call_arity_mismatch() {
        let err = compile_err("fn main() -> void { putint(); }");
        assert_eq!(err.kind, SyntaxErrorKind::Type);
        assert!(err.message.contains("expects 1 argument(s), got 0"));
    }

    #[test]
    fn test_call_argument_type_mismatch() {
        let err = compile_err("fn main() -> void { putdouble(1); }");
        assert_eq!(err.kind, SyntaxErrorKind::Type);
        assert!(err.message.contains("argument 1"));
    }

    #[test]
    fn test_string_literal_argument_to_putstr() {
        let program = compile("fn main() -> void { putstr(\"hi\"); putstr(\"there\"); }");
        assert_eq!(program.string_literals, vec!["hi", "there"]);
        let main = func(&program, "main");
        // pool indices pushed as integers
        assert_eq!(main.body[0].operand, Some(Operand::U64(0)));
        assert_eq!(main.body[2].operand, Some(Operand::U64(1)));
        // user symbols shift past the pool
        let start = func(&program, "_start");
        assert_eq!(start.body[0].operand, Some(Operand::U32(2 + FIRST_USER)));
    }

    #[test]
    fn test_string_literal_rejected_elsewhere() {
        let err = compile_err("fn main() -> void { putdouble(\"hi\"); }");
        assert_eq!(err.kind, SyntaxErrorKind::Type);
        let err = compile_err("fn main() -> void { let x: int = \"hi\"; }");
        assert_eq!(err.kind, SyntaxErrorKind::Type);
    }

    #[test]
    fn test_condition_must_be_evaluable() {
        let err = compile_err("fn main() -> void { if putln() { } }");
        assert_eq!(err.kind, SyntaxErrorKind::Type);
        assert!(err.message.contains("bool"));
    }

    #[test]
    fn test_const_rules() {
        let err = compile_err("fn main() -> void { const c: int = 1; c = 2; }");
        assert_eq!(err.kind, SyntaxErrorKind::Assignment);
        let err = compile_err("fn main() -> void { const c: int; }");
        assert_eq!(err.kind, SyntaxErrorKind::Declaration);
        let err = compile_err("fn f(const a: int) -> void { a = 1; } fn main() -> void {}");
        assert_eq!(err.kind, SyntaxErrorKind::Assignment);
    }

    #[test]
    fn test_duplicate_declarations() {
        let err = compile_err("fn main() -> void { let x: int; let x: double; }");
        assert_eq!(err.kind, SyntaxErrorKind::Declaration);
        let err = compile_err("fn f() -> void {} fn f() -> void {} fn main() -> void {}");
        assert_eq!(err.kind, SyntaxErrorKind::Declaration);
    }

    #[test]
    fn test_shadowing_uses_innermost_slot() {
        let program = compile(
            "fn main() -> void { let x: int = 1; { let x: int = 2; x = 3; } x = 4; }",
        );
        let main = func(&program, "main");
        assert_eq!(main.num_local_vars, 2);
        let loca_offsets: Vec<u32> = main
            .body
            .iter()
            .filter(|i| i.opcode == Opcode::Loca)
            .map(|i| match i.operand {
                Some(Operand::U32(v)) => v,
                _ => unreachable!(),
            })
            .collect();
        // init x@0, init x@1, assign x@1 (inner), assign x@0 (outer again)
        assert_eq!(loca_offsets, vec![0, 1, 1, 0]);
    }

    #[test]
    fn test_undefined_references() {
        let err = compile_err("fn main() -> void { x = 1; }");
        assert_eq!(err.kind, SyntaxErrorKind::Reference);
        let err = compile_err("fn main() -> void { nope(); }");
        assert_eq!(err.kind, SyntaxErrorKind::Reference);
    }

    #[test]
    fn test_main_is_required() {
        let err = compile_err("fn f() -> void {}");
        assert_eq!(err.kind, SyntaxErrorKind::Reference);
        assert!(err.message.contains("main"));
    }

    #[test]
    fn test_main_must_take_no_arguments() {
        let err = compile_err("fn main(a: int) -> void {}");
        assert_eq!(err.kind, SyntaxErrorKind::Program);
    }

    #[test]
    fn test_return_type_checked() {
        let err = compile_err("fn f() -> int { return 1.5; } fn main() -> void {}");
        assert_eq!(err.kind, SyntaxErrorKind::Type);
        // `return e;` in a void function stops at the missing semicolon
        let err = compile_err("fn main() -> void { return 1; }");
        assert_eq!(err.kind, SyntaxErrorKind::Token);
    }

    #[test]
    fn test_global_initializer_type_checked() {
        let err = compile_err("let g: int = 1.5; fn main() -> void {}");
        assert_eq!(err.kind, SyntaxErrorKind::Type);
    }

    #[test]
    fn test_malformed_top_level() {
        let err = compile_err("putln(); fn main() -> void {}");
        assert_eq!(err.kind, SyntaxErrorKind::Program);
    }

    #[test]
    fn test_error_context_carries_upcoming_tokens() {
        let err = compile_err("fn main() -> void { break; }");
        assert!(err.context.contains("}"), "context: {}", err.context);
    }

    #[test]
    fn test_deterministic_output() {
        let source = "let g: double = 1.5; fn main() -> void { putstr(\"x\"); }";
        assert_eq!(compile(source).to_bytes(), compile(source).to_bytes());
    }
}
