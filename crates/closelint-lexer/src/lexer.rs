// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The lexer implementation using logos.

use closelint_ast::token::{Token, TokenKind};
use closelint_ast::Span;
use logos::Logos;
use thiserror::Error;

/// Raw token type for logos - literal values are decoded in a second pass.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\f]+")] // horizontal whitespace only; newlines are significant
enum RawToken {
    // === Keywords ===
    #[token("package")]
    Package,
    #[token("import")]
    Import,
    #[token("fun")]
    Fun,
    #[token("val")]
    Val,
    #[token("var")]
    Var,
    #[token("class")]
    Class,
    #[token("interface")]
    Interface,
    #[token("object")]
    Object,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("when")]
    When,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("finally")]
    Finally,
    #[token("throw")]
    Throw,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("this")]
    This,
    #[token("super")]
    Super,
    #[token("null")]
    Null,
    #[token("is")]
    Is,
    #[token("as")]
    As,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // === Operators (longer first) ===
    #[token("===")]
    EqEqEq,
    #[token("!==")]
    BangEqEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("!!")]
    BangBang,
    #[token("?.")]
    QuestionDot,
    #[token("?:")]
    Elvis,
    #[token("..")]
    DotDot,
    #[token("->")]
    Arrow,
    #[token("::")]
    ColonColon,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token("?")]
    Question,
    #[token(".")]
    Dot,
    #[token("@")]
    At,

    // === Delimiters ===
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(":")]
    Colon,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,

    #[token("\n")]
    #[token("\r\n")]
    Newline,

    // === Comments ===
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    // Block comments nest in Kotlin
    #[token("/*", block_comment)]
    BlockComment,

    // === Literals ===
    #[regex(r"0[xX][0-9a-fA-F_]+[lL]?")]
    HexInt,

    #[regex(r"0[bB][01_]+[lL]?")]
    BinInt,

    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?[fF]?")]
    Float,

    #[regex(r"[0-9][0-9_]*[lL]?")]
    DecInt,

    #[regex(r"'([^'\\\n]|\\.|\\u[0-9a-fA-F]{4})'")]
    Char,

    #[token("\"\"\"", raw_string)]
    RawString,

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    String,

    // Missing the closing quote; the terminated form is always one byte longer.
    #[regex(r#""([^"\\\n]|\\.)*"#)]
    UnterminatedString,

    // === Identifiers (after keywords) ===
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"`[^`\n]+`")]
    BacktickIdent,
}

/// Skip block comments, handling nesting.
fn block_comment(lexer: &mut logos::Lexer<RawToken>) -> logos::Skip {
    let mut depth = 1;
    let mut chars = lexer.remainder().chars().peekable();
    let mut consumed = 0;

    while depth > 0 {
        match chars.next() {
            Some('/') if chars.peek() == Some(&'*') => {
                chars.next();
                consumed += 2;
                depth += 1;
            }
            Some('*') if chars.peek() == Some(&'/') => {
                chars.next();
                consumed += 2;
                depth -= 1;
            }
            Some(c) => consumed += c.len_utf8(),
            None => break,
        }
    }

    lexer.bump(consumed);
    logos::Skip
}

/// Consume a raw `"""..."""` string. Fails when the closing quotes are missing.
fn raw_string(lexer: &mut logos::Lexer<RawToken>) -> bool {
    match lexer.remainder().find("\"\"\"") {
        Some(end) => {
            lexer.bump(end + 3);
            true
        }
        None => false,
    }
}

/// Maximum number of errors to collect before stopping.
const MAX_ERRORS: usize = 20;

/// The lexer for analyzed source code.
pub struct Lexer<'a> {
    source: &'a str,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, errors: Vec::new() }
    }

    /// Tokenize the entire source, collecting multiple errors.
    pub fn tokenize(&mut self) -> LexResult {
        let mut tokens = Vec::new();
        let mut logos_lexer = RawToken::lexer(self.source);

        while let Some(result) = logos_lexer.next() {
            if self.errors.len() >= MAX_ERRORS {
                break;
            }

            let span = logos_lexer.span();
            let slice = logos_lexer.slice();

            let kind = match result {
                Ok(raw) => match self.convert_token(raw, slice, span.start, span.end) {
                    Ok(kind) => kind,
                    Err(e) => {
                        self.errors.push(e);
                        continue;
                    }
                },
                Err(()) => {
                    let ch = self.source[span.start..].chars().next().unwrap_or('?');
                    self.errors.push(LexError::unexpected_char(ch, span.start));
                    continue;
                }
            };

            tokens.push(Token { kind, span: Span::new(span.start, span.end) });
        }

        tokens.push(Token {
            kind: TokenKind::Eof,
            span: Span::new(self.source.len(), self.source.len()),
        });

        LexResult { tokens, errors: std::mem::take(&mut self.errors) }
    }

    fn convert_token(&self, raw: RawToken, slice: &str, start: usize, end: usize) -> Result<TokenKind, LexError> {
        Ok(match raw {
            RawToken::Package => TokenKind::Package,
            RawToken::Import => TokenKind::Import,
            RawToken::Fun => TokenKind::Fun,
            RawToken::Val => TokenKind::Val,
            RawToken::Var => TokenKind::Var,
            RawToken::Class => TokenKind::Class,
            RawToken::Interface => TokenKind::Interface,
            RawToken::Object => TokenKind::Object,
            RawToken::Return => TokenKind::Return,
            RawToken::If => TokenKind::If,
            RawToken::Else => TokenKind::Else,
            RawToken::When => TokenKind::When,
            RawToken::For => TokenKind::For,
            RawToken::In => TokenKind::In,
            RawToken::While => TokenKind::While,
            RawToken::Do => TokenKind::Do,
            RawToken::Try => TokenKind::Try,
            RawToken::Catch => TokenKind::Catch,
            RawToken::Finally => TokenKind::Finally,
            RawToken::Throw => TokenKind::Throw,
            RawToken::Break => TokenKind::Break,
            RawToken::Continue => TokenKind::Continue,
            RawToken::This => TokenKind::This,
            RawToken::Super => TokenKind::Super,
            RawToken::Null => TokenKind::Null,
            RawToken::Is => TokenKind::Is,
            RawToken::As => TokenKind::As,
            RawToken::True => TokenKind::Bool(true),
            RawToken::False => TokenKind::Bool(false),

            RawToken::EqEqEq => TokenKind::EqEqEq,
            RawToken::BangEqEq => TokenKind::BangEqEq,
            RawToken::EqEq => TokenKind::EqEq,
            RawToken::BangEq => TokenKind::BangEq,
            RawToken::LtEq => TokenKind::LtEq,
            RawToken::GtEq => TokenKind::GtEq,
            RawToken::AmpAmp => TokenKind::AmpAmp,
            RawToken::PipePipe => TokenKind::PipePipe,
            RawToken::BangBang => TokenKind::BangBang,
            RawToken::QuestionDot => TokenKind::QuestionDot,
            RawToken::Elvis => TokenKind::Elvis,
            RawToken::DotDot => TokenKind::DotDot,
            RawToken::Arrow => TokenKind::Arrow,
            RawToken::ColonColon => TokenKind::ColonColon,
            RawToken::PlusPlus => TokenKind::PlusPlus,
            RawToken::MinusMinus => TokenKind::MinusMinus,
            RawToken::PlusEq => TokenKind::PlusEq,
            RawToken::MinusEq => TokenKind::MinusEq,
            RawToken::StarEq => TokenKind::StarEq,
            RawToken::SlashEq => TokenKind::SlashEq,
            RawToken::PercentEq => TokenKind::PercentEq,
            RawToken::Plus => TokenKind::Plus,
            RawToken::Minus => TokenKind::Minus,
            RawToken::Star => TokenKind::Star,
            RawToken::Slash => TokenKind::Slash,
            RawToken::Percent => TokenKind::Percent,
            RawToken::Eq => TokenKind::Eq,
            RawToken::Lt => TokenKind::Lt,
            RawToken::Gt => TokenKind::Gt,
            RawToken::Bang => TokenKind::Bang,
            RawToken::Question => TokenKind::Question,
            RawToken::Dot => TokenKind::Dot,
            RawToken::At => TokenKind::At,

            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBracket => TokenKind::LBracket,
            RawToken::RBracket => TokenKind::RBracket,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Semi => TokenKind::Semi,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Newline => TokenKind::Newline,

            // Skipped by logos; never produced.
            RawToken::LineComment | RawToken::BlockComment => TokenKind::Newline,

            RawToken::HexInt => parse_radix(&slice[2..], 16, start, end)?,
            RawToken::BinInt => parse_radix(&slice[2..], 2, start, end)?,
            RawToken::DecInt => parse_radix(slice, 10, start, end)?,
            RawToken::Float => {
                let clean: String = slice
                    .trim_end_matches(['f', 'F'])
                    .chars()
                    .filter(|c| *c != '_')
                    .collect();
                let value = clean
                    .parse::<f64>()
                    .map_err(|_| LexError::invalid_number(start, end))?;
                TokenKind::Float(value)
            }
            RawToken::Char => TokenKind::Char(parse_char(&slice[1..slice.len() - 1], start)?),
            RawToken::RawString => TokenKind::String(slice[3..slice.len() - 3].to_string()),
            RawToken::String => TokenKind::String(parse_string(&slice[1..slice.len() - 1], start)?),
            RawToken::UnterminatedString => return Err(LexError::unterminated_string(start, end)),
            RawToken::Ident => TokenKind::Ident(slice.to_string()),
            RawToken::BacktickIdent => TokenKind::Ident(slice[1..slice.len() - 1].to_string()),
        })
    }
}

/// Parse an integer literal body, dropping `_` separators and the `L` suffix.
fn parse_radix(digits: &str, radix: u32, start: usize, end: usize) -> Result<TokenKind, LexError> {
    let clean: String = digits
        .trim_end_matches(['l', 'L'])
        .chars()
        .filter(|c| *c != '_')
        .collect();
    i64::from_str_radix(&clean, radix)
        .map(TokenKind::Int)
        .map_err(|_| LexError::invalid_number(start, end))
}

fn parse_char(s: &str, pos: usize) -> Result<char, LexError> {
    let mut chars = s.chars();
    let c = match chars.next() {
        Some('\\') => parse_escape(&mut chars, pos)?,
        Some(c) => c,
        None => return Err(LexError::invalid_escape(pos)),
    };
    Ok(c)
}

/// Decode escapes in a string literal. Templates (`$name`, `${...}`) are kept verbatim.
fn parse_string(s: &str, pos: usize) -> Result<String, LexError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            result.push(parse_escape(&mut chars, pos)?);
        } else {
            result.push(c);
        }
    }

    Ok(result)
}

fn parse_escape(chars: &mut impl Iterator<Item = char>, pos: usize) -> Result<char, LexError> {
    match chars.next() {
        Some('n') => Ok('\n'),
        Some('r') => Ok('\r'),
        Some('t') => Ok('\t'),
        Some('b') => Ok('\u{8}'),
        Some('\\') => Ok('\\'),
        Some('\'') => Ok('\''),
        Some('"') => Ok('"'),
        Some('$') => Ok('$'),
        Some('u') => {
            let hex: String = chars.take(4).collect();
            if hex.len() != 4 {
                return Err(LexError::invalid_escape(pos));
            }
            let code = u32::from_str_radix(&hex, 16).map_err(|_| LexError::invalid_escape(pos))?;
            char::from_u32(code).ok_or(LexError::invalid_escape(pos))
        }
        _ => Err(LexError::invalid_escape(pos)),
    }
}

/// Result of lexing: tokens plus any errors found.
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub errors: Vec<LexError>,
}

impl LexResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A lexer error with location and friendly message.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LexError {
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
}

impl LexError {
    fn unexpected_char(ch: char, pos: usize) -> Self {
        Self {
            span: Span::new(pos, pos + ch.len_utf8()),
            message: format!("Unexpected character '{}'", ch),
            hint: None,
        }
    }

    fn unterminated_string(start: usize, end: usize) -> Self {
        Self {
            span: Span::new(start, end),
            message: "Unterminated string".to_string(),
            hint: Some("Add a closing '\"'".to_string()),
        }
    }

    fn invalid_escape(pos: usize) -> Self {
        Self {
            span: Span::new(pos, pos + 1),
            message: "Invalid escape sequence".to_string(),
            hint: Some("Valid: \\n \\r \\t \\b \\\\ \\' \\\" \\$ \\uXXXX".to_string()),
        }
    }

    fn invalid_number(start: usize, end: usize) -> Self {
        Self {
            span: Span::new(start, end),
            message: "Invalid number".to_string(),
            hint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let result = Lexer::new(src).tokenize();
        assert!(result.is_ok(), "lex errors: {:?}", result.errors);
        result.tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_soft_keywords() {
        assert_eq!(
            kinds("fun val override"),
            vec![
                TokenKind::Fun,
                TokenKind::Val,
                TokenKind::Ident("override".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn safe_call_elvis_and_not_null() {
        assert_eq!(
            kinds("a?.b ?: c!!"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::QuestionDot,
                TokenKind::Ident("b".to_string()),
                TokenKind::Elvis,
                TokenKind::Ident("c".to_string()),
                TokenKind::BangBang,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn marker_comment_is_skipped_but_offsets_survive() {
        let src = "reader./**/readLines()";
        let result = Lexer::new(src).tokenize();
        assert!(result.is_ok());
        let method = &result.tokens[2];
        assert_eq!(method.kind, TokenKind::Ident("readLines".to_string()));
        assert_eq!(method.span.start, src.find("readLines").unwrap());
    }

    #[test]
    fn nested_block_comments() {
        assert_eq!(kinds("/* a /* b */ c */ x"), vec![TokenKind::Ident("x".to_string()), TokenKind::Eof]);
    }

    #[test]
    fn numbers_and_ranges() {
        assert_eq!(
            kinds("1..10 0xFF 1_000L 2.5f"),
            vec![
                TokenKind::Int(1),
                TokenKind::DotDot,
                TokenKind::Int(10),
                TokenKind::Int(255),
                TokenKind::Int(1000),
                TokenKind::Float(2.5),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn strings_keep_templates() {
        assert_eq!(
            kinds(r#""line: $line\n""#),
            vec![TokenKind::String("line: $line\n".to_string()), TokenKind::Eof]
        );
        assert_eq!(
            kinds("\"\"\"raw \"quoted\" text\"\"\""),
            vec![TokenKind::String("raw \"quoted\" text".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn newlines_are_tokens() {
        assert_eq!(
            kinds("a\r\nb"),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Newline,
                TokenKind::Ident("b".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn unterminated_string_is_reported() {
        let result = Lexer::new("val s = \"oops\nval t = 1").tokenize();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].message, "Unterminated string");
        assert!(result.tokens.iter().any(|t| t.kind == TokenKind::Ident("t".to_string())));
    }

    #[test]
    fn unexpected_character_recovers() {
        let result = Lexer::new("val a = #1").tokenize();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].span, Span::new(8, 9));
        assert!(result.tokens.iter().any(|t| t.kind == TokenKind::Int(1)));
    }
}
