//! Hand-written scanner.
//!
//! The grammar has roughly thirty bare keywords and no nested string/escape
//! handling, so a char-by-char scanner is simpler than pulling in a
//! tokenizer crate for it. Region-prefixed identifiers (`@`, `#`, `%`) are
//! recognized at the lexer level since the prefix character is part of a
//! name's identity throughout the rest of the pipeline.

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokKind {
    /// Body after `@`.
    Global(String),
    /// Body after `#`.
    Param(String),
    /// Body after `%`.
    Local(String),
    /// A bare lowercase word: a keyword, a binop, or the `i32` type name.
    Word(String),
    Int(i32),
    Colon,
    Comma,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Lt,
    Eq,
    Arrow,
    Semi,
    Star,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokKind,
    pub line: usize,
    pub column: usize,
}

/// Valid first character of a region-prefixed identifier's body (after the
/// `@`/`#`/`%`).
fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '.' || c == '_' || c == '-'
}

fn is_name_continue(c: char) -> bool {
    is_name_start(c) || c.is_ascii_digit()
}

/// Valid first character of a bare word (keyword, binop, or `i32`). Bare
/// words are always plain lowercase identifiers, so `-` doesn't start one —
/// that keeps `->` from being swallowed as a one-character word.
fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic()
}

/// Scans `source` into a token stream, terminated by a single trailing `Eof`.
pub fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    let lines: Vec<&str> = source.lines().collect();
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0usize;
    let mut line = 1usize;
    let mut column = 1usize;

    let err_at = |line: usize, column: usize, msg: String| -> ParseError {
        let ctx = lines.get(line - 1).copied().unwrap_or("");
        ParseError::new(line, column, msg, ctx)
    };

    let advance = |pos: &mut usize, line: &mut usize, column: &mut usize, chars: &[char]| {
        if chars[*pos] == '\n' {
            *line += 1;
            *column = 1;
        } else {
            *column += 1;
        }
        *pos += 1;
    };

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            advance(&mut pos, &mut line, &mut column, &chars);
            continue;
        }

        if c == '/' && chars.get(pos + 1) == Some(&'/') {
            while pos < chars.len() && chars[pos] != '\n' {
                advance(&mut pos, &mut line, &mut column, &chars);
            }
            continue;
        }

        if c == '/' && chars.get(pos + 1) == Some(&'*') {
            let (start_line, start_col) = (line, column);
            advance(&mut pos, &mut line, &mut column, &chars);
            advance(&mut pos, &mut line, &mut column, &chars);
            let mut closed = false;
            while pos < chars.len() {
                if chars[pos] == '*' && chars.get(pos + 1) == Some(&'/') {
                    advance(&mut pos, &mut line, &mut column, &chars);
                    advance(&mut pos, &mut line, &mut column, &chars);
                    closed = true;
                    break;
                }
                advance(&mut pos, &mut line, &mut column, &chars);
            }
            if !closed {
                return Err(err_at(start_line, start_col, "unterminated block comment".into()));
            }
            continue;
        }

        let (tok_line, tok_col) = (line, column);

        if c == '@' || c == '#' || c == '%' {
            advance(&mut pos, &mut line, &mut column, &chars);
            let start = pos;
            if pos < chars.len() && chars[pos].is_ascii_digit() {
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    advance(&mut pos, &mut line, &mut column, &chars);
                }
            } else if pos < chars.len() && is_name_start(chars[pos]) {
                while pos < chars.len() && is_name_continue(chars[pos]) {
                    advance(&mut pos, &mut line, &mut column, &chars);
                }
            } else {
                return Err(err_at(tok_line, tok_col, format!("expected a name after '{c}'")));
            }
            let body: String = chars[start..pos].iter().collect();
            let kind = match c {
                '@' => TokKind::Global(body),
                '#' => TokKind::Param(body),
                _ => TokKind::Local(body),
            };
            tokens.push(Token { kind, line: tok_line, column: tok_col });
            continue;
        }

        if c.is_ascii_digit() || ((c == '+' || c == '-') && chars.get(pos + 1).is_some_and(|n| n.is_ascii_digit())) {
            let start = pos;
            advance(&mut pos, &mut line, &mut column, &chars);
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                advance(&mut pos, &mut line, &mut column, &chars);
            }
            let text: String = chars[start..pos].iter().collect();
            let n = text
                .parse::<i32>()
                .map_err(|_| err_at(tok_line, tok_col, format!("integer literal out of range: {text}")))?;
            tokens.push(Token { kind: TokKind::Int(n), line: tok_line, column: tok_col });
            continue;
        }

        if is_word_start(c) {
            let start = pos;
            while pos < chars.len() && is_name_continue(chars[pos]) {
                advance(&mut pos, &mut line, &mut column, &chars);
            }
            let word: String = chars[start..pos].iter().collect();
            tokens.push(Token { kind: TokKind::Word(word), line: tok_line, column: tok_col });
            continue;
        }

        let kind = match c {
            ':' => TokKind::Colon,
            ',' => TokKind::Comma,
            '(' => TokKind::LParen,
            ')' => TokKind::RParen,
            '{' => TokKind::LBrace,
            '}' => TokKind::RBrace,
            '[' => TokKind::LBracket,
            ']' => TokKind::RBracket,
            '<' => TokKind::Lt,
            ';' => TokKind::Semi,
            '*' => TokKind::Star,
            '=' => TokKind::Eq,
            '-' if chars.get(pos + 1) == Some(&'>') => {
                advance(&mut pos, &mut line, &mut column, &chars);
                advance(&mut pos, &mut line, &mut column, &chars);
                tokens.push(Token { kind: TokKind::Arrow, line: tok_line, column: tok_col });
                continue;
            }
            other => return Err(err_at(tok_line, tok_col, format!("unexpected character '{other}'"))),
        };
        advance(&mut pos, &mut line, &mut column, &chars);
        tokens.push(Token { kind, line: tok_line, column: tok_col });
    }

    tokens.push(Token { kind: TokKind::Eof, line, column });
    Ok(tokens)
}
