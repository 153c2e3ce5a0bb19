//! Recursive-descent parser.
//!
//! Builds an [`ast::Program`] directly from the token stream; there's no
//! intermediate parse tree. Context alone disambiguates the grammar's two
//! uses of a bare `'('` — a parameter list's parens vs. the `()` Unit
//! literal — so the lexer doesn't need to special-case it (see
//! [`crate::lexer`]).

use crate::ast::{
    BasicBlock, BinOp, Decl, Dim, FunDecl, FunDefn, GlobalDecl, Ident, Op, Operand, Param, Program, Region,
    Terminator, Type, ValueBinding,
};
use crate::error::ParseError;
use crate::lexer::{lex, TokKind, Token};

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    lines: Vec<String>,
}

type PResult<T> = Result<T, ParseError>;

impl Parser {
    fn new(source: &str, tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            lines: source.lines().map(str::to_owned).collect(),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, message: impl Into<String>) -> ParseError {
        let tok = self.peek();
        let ctx = self.lines.get(tok.line - 1).cloned().unwrap_or_default();
        ParseError::new(tok.line, tok.column, message.into(), ctx)
    }

    fn expect(&mut self, kind: &TokKind) -> PResult<Token> {
        if &self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.err(format!("expected {:?}, found {:?}", kind, self.peek().kind)))
        }
    }

    fn expect_word(&mut self, word: &str) -> PResult<()> {
        match &self.peek().kind {
            TokKind::Word(w) if w == word => {
                self.advance();
                Ok(())
            }
            other => Err(self.err(format!("expected '{word}', found {other:?}"))),
        }
    }

    fn at_word(&self, word: &str) -> bool {
        matches!(&self.peek().kind, TokKind::Word(w) if w == word)
    }

    fn global_ident(&mut self) -> PResult<Ident> {
        match self.advance().kind {
            TokKind::Global(body) => Ok(Ident::new(Region::Global, body)),
            other => Err(self.err(format!("expected a '@'-prefixed identifier, found {other:?}"))),
        }
    }

    fn param_ident(&mut self) -> PResult<Ident> {
        match self.advance().kind {
            TokKind::Param(body) => Ok(Ident::new(Region::Param, body)),
            other => Err(self.err(format!("expected a '#'-prefixed identifier, found {other:?}"))),
        }
    }

    fn local_ident(&mut self) -> PResult<Ident> {
        match self.advance().kind {
            TokKind::Local(body) => Ok(Ident::new(Region::Local, body)),
            other => Err(self.err(format!("expected a '%'-prefixed identifier, found {other:?}"))),
        }
    }

    /// Any region-qualified identifier.
    fn ident(&mut self) -> PResult<Ident> {
        match self.advance().kind {
            TokKind::Global(body) => Ok(Ident::new(Region::Global, body)),
            TokKind::Param(body) => Ok(Ident::new(Region::Param, body)),
            TokKind::Local(body) => Ok(Ident::new(Region::Local, body)),
            other => Err(self.err(format!("expected an identifier, found {other:?}"))),
        }
    }

    fn int_const(&mut self) -> PResult<i32> {
        match self.advance().kind {
            TokKind::Int(n) => Ok(n),
            other => Err(self.err(format!("expected an integer literal, found {other:?}"))),
        }
    }

    /// `value := ident | int_const | 'none' | '()'`
    fn value(&mut self) -> PResult<Operand> {
        match &self.peek().kind {
            TokKind::Global(_) | TokKind::Param(_) | TokKind::Local(_) => Ok(Operand::Ident(self.ident()?)),
            TokKind::Int(_) => Ok(Operand::Int(self.int_const()?)),
            TokKind::Word(w) if w == "none" => {
                self.advance();
                Ok(Operand::None)
            }
            TokKind::LParen => {
                self.advance();
                self.expect(&TokKind::RParen)?;
                Ok(Operand::Unit)
            }
            other => Err(self.err(format!("expected a value, found {other:?}"))),
        }
    }

    /// `dim := int_const | 'none'`
    fn dim(&mut self) -> PResult<Dim> {
        match &self.peek().kind {
            TokKind::Int(_) => Ok(Dim::Const(self.int_const()?)),
            TokKind::Word(w) if w == "none" => {
                self.advance();
                Ok(Dim::None)
            }
            other => Err(self.err(format!("expected an integer or 'none', found {other:?}"))),
        }
    }

    /// `type := 'i32' | '()' | type '*' | 'fn' '(' (type (',' type)*)? ')' '->' type`
    fn parse_type(&mut self) -> PResult<Type> {
        let mut ty = match &self.peek().kind {
            TokKind::Word(w) if w == "i32" => {
                self.advance();
                Type::I32
            }
            TokKind::Word(w) if w == "fn" => {
                self.advance();
                self.expect(&TokKind::LParen)?;
                let mut params = Vec::new();
                if self.peek().kind != TokKind::RParen {
                    params.push(self.parse_type()?);
                    while self.peek().kind == TokKind::Comma {
                        self.advance();
                        params.push(self.parse_type()?);
                    }
                }
                self.expect(&TokKind::RParen)?;
                self.expect(&TokKind::Arrow)?;
                let ret = self.parse_type()?;
                Type::Fn(params, Box::new(ret))
            }
            TokKind::LParen => {
                self.advance();
                self.expect(&TokKind::RParen)?;
                Type::Unit
            }
            other => return Err(self.err(format!("expected a type, found {other:?}"))),
        };
        while self.peek().kind == TokKind::Star {
            self.advance();
            ty = Type::Ptr(Box::new(ty));
        }
        Ok(ty)
    }

    /// `plist := (param_ident ':' type (',' param_ident ':' type)*)?`
    fn plist(&mut self) -> PResult<Vec<Param>> {
        let mut params = Vec::new();
        if self.peek().kind == TokKind::RParen {
            return Ok(params);
        }
        loop {
            let name = self.param_ident()?;
            self.expect(&TokKind::Colon)?;
            let ty = self.parse_type()?;
            params.push(Param { name, ty });
            if self.peek().kind == TokKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        Ok(params)
    }

    fn op(&mut self) -> PResult<Op> {
        if let TokKind::Word(w) = &self.peek().kind {
            if let Some(binop) = BinOp::from_word(w) {
                self.advance();
                let lhs = self.value()?;
                self.expect(&TokKind::Comma)?;
                let rhs = self.value()?;
                return Ok(Op::Bin { op: binop, lhs, rhs });
            }
            match w.as_str() {
                "alloca" => {
                    self.advance();
                    let ty = self.parse_type()?;
                    self.expect(&TokKind::Comma)?;
                    let count = self.int_const()?;
                    return Ok(Op::Alloca { ty, count });
                }
                "load" => {
                    self.advance();
                    let ptr = self.local_ident_or_global()?;
                    return Ok(Op::Load { ptr });
                }
                "store" => {
                    self.advance();
                    let value = self.value()?;
                    self.expect(&TokKind::Comma)?;
                    let ptr = self.local_ident_or_global()?;
                    return Ok(Op::Store { value, ptr });
                }
                "offset" => {
                    self.advance();
                    let ty = self.parse_type()?;
                    self.expect(&TokKind::Comma)?;
                    let base = self.local_ident_or_global()?;
                    let mut indices = Vec::new();
                    loop {
                        self.expect(&TokKind::Comma)?;
                        self.expect(&TokKind::LBracket)?;
                        let idx = self.value()?;
                        self.expect(&TokKind::Lt)?;
                        let d = self.dim()?;
                        self.expect(&TokKind::RBracket)?;
                        indices.push((idx, d));
                        if self.peek().kind != TokKind::Comma {
                            break;
                        }
                    }
                    return Ok(Op::Offset { ty, base, indices });
                }
                "call" => {
                    self.advance();
                    let callee = self.global_ident()?;
                    let mut args = Vec::new();
                    while self.peek().kind == TokKind::Comma {
                        self.advance();
                        args.push(self.value()?);
                    }
                    return Ok(Op::Call { callee, args });
                }
                _ => {}
            }
        }
        Err(self.err(format!("expected an operator, found {:?}", self.peek().kind)))
    }

    /// `load`/`store`/`offset` take a pointer that is syntactically any
    /// identifier (a global region or a local/param holding a pointer).
    fn local_ident_or_global(&mut self) -> PResult<Ident> {
        self.ident()
    }

    fn value_binding(&mut self) -> PResult<ValueBinding> {
        self.expect_word("let")?;
        let name = self.local_ident()?;
        let ty = if self.peek().kind == TokKind::Colon {
            self.advance();
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(&TokKind::Eq)?;
        let op = self.op()?;
        Ok(ValueBinding { name, ty, op })
    }

    fn terminator(&mut self) -> PResult<Terminator> {
        match &self.peek().kind {
            TokKind::Word(w) if w == "br" => {
                self.advance();
                let cond = self.value()?;
                self.expect(&TokKind::Comma)?;
                self.expect_word("label")?;
                let then_label = self.local_ident()?;
                self.expect(&TokKind::Comma)?;
                self.expect_word("label")?;
                let else_label = self.local_ident()?;
                Ok(Terminator::Br { cond, then_label, else_label })
            }
            TokKind::Word(w) if w == "jmp" => {
                self.advance();
                self.expect_word("label")?;
                let label = self.local_ident()?;
                Ok(Terminator::Jmp { label })
            }
            TokKind::Word(w) if w == "ret" => {
                self.advance();
                let value = self.value()?;
                Ok(Terminator::Ret { value })
            }
            other => Err(self.err(format!("expected a terminator (br/jmp/ret), found {other:?}"))),
        }
    }

    fn basic_block(&mut self) -> PResult<BasicBlock> {
        let label = self.local_ident()?;
        self.expect(&TokKind::Colon)?;
        let mut bindings = Vec::new();
        while self.at_word("let") {
            bindings.push(self.value_binding()?);
            if self.peek().kind == TokKind::Semi {
                self.advance();
            }
        }
        let terminator = self.terminator()?;
        if self.peek().kind == TokKind::Semi {
            self.advance();
        }
        Ok(BasicBlock { label, bindings, terminator })
    }

    fn fun_signature(&mut self) -> PResult<(Ident, Vec<Param>, Type)> {
        self.expect_word("fn")?;
        let name = self.global_ident()?;
        self.expect(&TokKind::LParen)?;
        let params = self.plist()?;
        self.expect(&TokKind::RParen)?;
        self.expect(&TokKind::Arrow)?;
        let ret = self.parse_type()?;
        Ok((name, params, ret))
    }

    fn global_decl(&mut self) -> PResult<GlobalDecl> {
        let name = self.global_ident()?;
        self.expect(&TokKind::Colon)?;
        self.expect_word("region")?;
        let ty = self.parse_type()?;
        self.expect(&TokKind::Comma)?;
        let size = self.int_const()?;
        let init = if self.peek().kind == TokKind::Eq {
            self.advance();
            self.expect(&TokKind::LBracket)?;
            let mut values = vec![self.value()?];
            while self.peek().kind == TokKind::Comma {
                self.advance();
                values.push(self.value()?);
            }
            self.expect(&TokKind::RBracket)?;
            Some(values)
        } else {
            None
        };
        if self.peek().kind == TokKind::Semi {
            self.advance();
        }
        Ok(GlobalDecl { name, ty, size, init })
    }

    fn decl(&mut self) -> PResult<Decl> {
        match &self.peek().kind {
            TokKind::Global(_) => Ok(Decl::Global(self.global_decl()?)),
            TokKind::Word(w) if w == "fn" => {
                let (name, params, ret) = self.fun_signature()?;
                if self.peek().kind == TokKind::Semi {
                    self.advance();
                    Ok(Decl::Decl(FunDecl { name, params, ret }))
                } else {
                    self.expect(&TokKind::LBrace)?;
                    let mut blocks = Vec::new();
                    while self.peek().kind != TokKind::RBrace {
                        blocks.push(self.basic_block()?);
                    }
                    self.expect(&TokKind::RBrace)?;
                    if blocks.is_empty() {
                        return Err(self.err("a function definition needs at least one basic block"));
                    }
                    Ok(Decl::Defn(FunDefn { name, params, ret, blocks }))
                }
            }
            other => Err(self.err(format!("expected a global or function declaration, found {other:?}"))),
        }
    }

    fn program(&mut self) -> PResult<Program> {
        let mut decls = Vec::new();
        while self.peek().kind != TokKind::Eof {
            decls.push(self.decl()?);
        }
        Ok(Program { decls })
    }
}

/// Lexes and parses a complete Accipit source text into a [`Program`].
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let tokens = lex(source)?;
    Parser::new(source, tokens).program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_main() {
        let prog = parse("fn @main () -> i32 {\n%entry:\n  ret 0\n}\n").unwrap();
        assert_eq!(prog.decls.len(), 1);
        match &prog.decls[0] {
            Decl::Defn(f) => {
                assert_eq!(f.name.body, "main");
                assert_eq!(f.blocks.len(), 1);
            }
            _ => panic!("expected a function definition"),
        }
    }

    #[test]
    fn parses_global_region_with_initializer() {
        let prog = parse("@a: region i32, 3 = [1, 2, 3];\n").unwrap();
        match &prog.decls[0] {
            Decl::Global(g) => {
                assert_eq!(g.size, 3);
                assert_eq!(g.init.as_ref().unwrap().len(), 3);
            }
            _ => panic!("expected a global declaration"),
        }
    }

    #[test]
    fn parses_call_and_branch() {
        let src = "fn @id (#n: i32) -> i32 {\n\
                    %entry:\n\
                    let %r = call @id, #n\n\
                    br %r, label %t, label %f\n\
                    %t:\n\
                    ret 1\n\
                    %f:\n\
                    ret 0\n\
                    }\n";
        let prog = parse(src).unwrap();
        match &prog.decls[0] {
            Decl::Defn(f) => assert_eq!(f.blocks.len(), 3),
            _ => panic!("expected a function definition"),
        }
    }

    #[test]
    fn parses_offset_with_none_dimension() {
        let src = "fn @f (#p: i32*) -> i32* {\n\
                    %entry:\n\
                    let %q = offset i32, #p, [0 < none], [1 < 3]\n\
                    ret %q\n\
                    }\n";
        let prog = parse(src).unwrap();
        match &prog.decls[0] {
            Decl::Defn(f) => match &f.blocks[0].bindings[0].op {
                Op::Offset { indices, .. } => {
                    assert_eq!(indices.len(), 2);
                    assert!(matches!(indices[0].1, Dim::None));
                    assert!(matches!(indices[1].1, Dim::Const(3)));
                }
                _ => panic!("expected an offset op"),
            },
            _ => panic!("expected a function definition"),
        }
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(parse("fn @main (").is_err());
    }

    #[test]
    fn parses_function_declaration_without_body() {
        let prog = parse("fn @putint (#x: i32) -> ();\n").unwrap();
        assert!(matches!(prog.decls[0], Decl::Decl(_)));
    }

    #[test]
    fn parses_call_with_no_parentheses_and_no_arguments() {
        let src = "fn @main () -> i32 {\n%entry:\nlet %n = call @getint\nret %n\n}\n";
        let prog = parse(src).unwrap();
        match &prog.decls[0] {
            Decl::Defn(f) => match &f.blocks[0].bindings[0].op {
                Op::Call { callee, args } => {
                    assert_eq!(callee.body, "getint");
                    assert!(args.is_empty());
                }
                _ => panic!("expected a call op"),
            },
            _ => panic!("expected a function definition"),
        }
    }

    #[test]
    fn rejects_offset_with_no_dimensions() {
        let src = "fn @f (#p: i32*) -> i32* {\n%entry:\nlet %q = offset i32, #p\nret %q\n}\n";
        assert!(parse(src).is_err());
    }
}
