// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Token definitions for the lexer.

use crate::Span;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// The kind of token.
///
/// Soft keywords and modifiers (`private`, `override`, `data`, `constructor`,
/// ...) are lexed as identifiers; the parser recognizes them by position.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    String(String),
    Char(char),
    Bool(bool),

    Ident(String),

    // Hard keywords
    Package,
    Import,
    Fun,
    Val,
    Var,
    Class,
    Interface,
    Object,
    Return,
    If,
    Else,
    When,
    For,
    In,
    While,
    Do,
    Try,
    Catch,
    Finally,
    Throw,
    Break,
    Continue,
    This,
    Super,
    Null,
    Is,
    As,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    EqEq,
    EqEqEq,
    BangEq,
    BangEqEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    AmpAmp,
    PipePipe,
    Bang,
    BangBang,
    Question,
    QuestionDot,
    Elvis,
    Dot,
    DotDot,
    Arrow,
    ColonColon,
    At,
    PlusPlus,
    MinusMinus,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,

    // Delimiters
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Colon,
    Semi,
    Comma,

    // Special
    Newline,
    Eof,
}

impl TokenKind {
    /// Returns a human-readable name for this token kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            TokenKind::Int(_) | TokenKind::Float(_) => "a number",
            TokenKind::String(_) => "a string",
            TokenKind::Char(_) => "a character",
            TokenKind::Bool(_) => "'true' or 'false'",
            TokenKind::Ident(_) => "a name",

            TokenKind::Package => "'package'",
            TokenKind::Import => "'import'",
            TokenKind::Fun => "'fun'",
            TokenKind::Val => "'val'",
            TokenKind::Var => "'var'",
            TokenKind::Class => "'class'",
            TokenKind::Interface => "'interface'",
            TokenKind::Object => "'object'",
            TokenKind::Return => "'return'",
            TokenKind::If => "'if'",
            TokenKind::Else => "'else'",
            TokenKind::When => "'when'",
            TokenKind::For => "'for'",
            TokenKind::In => "'in'",
            TokenKind::While => "'while'",
            TokenKind::Do => "'do'",
            TokenKind::Try => "'try'",
            TokenKind::Catch => "'catch'",
            TokenKind::Finally => "'finally'",
            TokenKind::Throw => "'throw'",
            TokenKind::Break => "'break'",
            TokenKind::Continue => "'continue'",
            TokenKind::This => "'this'",
            TokenKind::Super => "'super'",
            TokenKind::Null => "'null'",
            TokenKind::Is => "'is'",
            TokenKind::As => "'as'",

            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Eq => "'='",
            TokenKind::EqEq => "'=='",
            TokenKind::EqEqEq => "'==='",
            TokenKind::BangEq => "'!='",
            TokenKind::BangEqEq => "'!=='",
            TokenKind::Lt => "'<'",
            TokenKind::Gt => "'>'",
            TokenKind::LtEq => "'<='",
            TokenKind::GtEq => "'>='",
            TokenKind::AmpAmp => "'&&'",
            TokenKind::PipePipe => "'||'",
            TokenKind::Bang => "'!'",
            TokenKind::BangBang => "'!!'",
            TokenKind::Question => "'?'",
            TokenKind::QuestionDot => "'?.'",
            TokenKind::Elvis => "'?:'",
            TokenKind::Dot => "'.'",
            TokenKind::DotDot => "'..'",
            TokenKind::Arrow => "'->'",
            TokenKind::ColonColon => "'::'",
            TokenKind::At => "'@'",
            TokenKind::PlusPlus => "'++'",
            TokenKind::MinusMinus => "'--'",
            TokenKind::PlusEq => "'+='",
            TokenKind::MinusEq => "'-='",
            TokenKind::StarEq => "'*='",
            TokenKind::SlashEq => "'/='",
            TokenKind::PercentEq => "'%='",

            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Colon => "':'",
            TokenKind::Semi => "';'",
            TokenKind::Comma => "','",

            TokenKind::Newline => "end of line",
            TokenKind::Eof => "end of file",
        }
    }
}
