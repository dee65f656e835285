// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The parser implementation using Pratt parsing for expressions.

use closelint_ast::decl::{ClassDecl, ClassKind, Decl, DeclKind, FnBody, FnDecl, ImportDecl, Param, PropertyDecl};
use closelint_ast::expr::{BinOp, CatchClause, Expr, ExprKind, LambdaParam, PostfixOp, UnaryOp, WhenArm, WhenCondition};
use closelint_ast::stmt::{Stmt, StmtKind};
use closelint_ast::token::{Token, TokenKind};
use closelint_ast::ty::{TypeRef, TypeRefKind};
use closelint_ast::{NodeId, Span};
use thiserror::Error;

/// Maximum number of errors to collect before stopping.
const MAX_ERRORS: usize = 20;

/// Identifiers treated as modifiers when they precede a declaration.
const MODIFIERS: &[&str] = &[
    "public", "private", "protected", "internal", "open", "abstract", "final", "override",
    "data", "sealed", "inline", "suspend", "operator", "infix", "tailrec", "external",
    "const", "lateinit", "enum", "annotation", "inner", "companion", "vararg", "noinline",
    "crossinline", "value", "actual", "expect", "reified", "out",
];

/// Identifiers that never start an infix call.
const NON_INFIX: &[&str] = &["by", "where", "get", "set"];

/// The parser for analyzed source files.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Controls whether `{` after a callee starts a trailing lambda (false in delegation clauses)
    allow_trailing_lambda: bool,
    /// Collected errors during parsing
    errors: Vec<ParseError>,
    /// Counter for generating unique NodeIds
    next_node_id: u32,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
            tokens.push(Token { kind: TokenKind::Eof, span: Span::new(end, end) });
        }
        Self { tokens, pos: 0, allow_trailing_lambda: true, errors: Vec::new(), next_node_id: 0 }
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    /// Record error, return if should continue.
    fn record_error(&mut self, error: ParseError) -> bool {
        self.errors.push(error);
        self.errors.len() < MAX_ERRORS
    }

    /// Skip to next declaration after error.
    fn synchronize(&mut self) {
        let mut brace_depth = 0;

        while !self.at_end() {
            match self.current_kind() {
                TokenKind::LBrace => {
                    brace_depth += 1;
                    self.advance();
                }
                TokenKind::RBrace => {
                    if brace_depth == 0 {
                        return;
                    }
                    brace_depth -= 1;
                    self.advance();
                    if brace_depth == 0 {
                        self.skip_newlines();
                        return;
                    }
                }
                TokenKind::Fun | TokenKind::Class | TokenKind::Interface |
                TokenKind::Object | TokenKind::Import | TokenKind::Package |
                TokenKind::Val | TokenKind::Var if brace_depth == 0 => {
                    return;
                }
                _ => { self.advance(); }
            }
        }
    }

    /// Skip to the next statement inside a block after error.
    fn synchronize_in_block(&mut self) {
        let mut depth = 0usize;
        while !self.at_end() {
            match self.current_kind() {
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::LBrace | TokenKind::LParen => depth += 1,
                TokenKind::RBrace | TokenKind::RParen => depth = depth.saturating_sub(1),
                TokenKind::Newline | TokenKind::Semi if depth == 0 => {
                    self.skip_separators();
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }

    // =========================================================================
    // Token Navigation
    // =========================================================================

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek(&self, n: usize) -> &TokenKind {
        self.tokens.get(self.pos + n).map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    /// The first token at or after the cursor that is not a newline.
    fn peek_past_newlines(&self) -> &TokenKind {
        self.tokens[self.pos..]
            .iter()
            .map(|t| &t.kind)
            .find(|k| !matches!(k, TokenKind::Newline))
            .unwrap_or(&TokenKind::Eof)
    }

    fn at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        let index = self.pos.min(self.tokens.len() - 1);
        if !self.at_end() {
            self.pos += 1;
        }
        &self.tokens[index]
    }

    fn prev_end(&self) -> usize {
        self.tokens[self.pos.saturating_sub(1)].span.end
    }

    /// True when the current token starts right where the previous one ended.
    fn adjacent(&self) -> bool {
        self.pos > 0 && self.current().span.start == self.prev_end()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.current_kind()) == std::mem::discriminant(kind)
    }

    fn check_ident(&self, name: &str) -> bool {
        matches!(self.current_kind(), TokenKind::Ident(n) if n == name)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<&Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::expected(kind.display_name(), self.current_kind(), self.current().span))
        }
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    fn skip_separators(&mut self) {
        while self.check(&TokenKind::Newline) || self.check(&TokenKind::Semi) {
            self.advance();
        }
    }

    fn expect_terminator(&mut self) -> Result<(), ParseError> {
        match self.current_kind() {
            TokenKind::Newline | TokenKind::Semi => {
                self.skip_separators();
                Ok(())
            }
            TokenKind::RBrace | TokenKind::Eof => Ok(()),
            _ => Err(ParseError::expected("newline or ';'", self.current_kind(), self.current().span)),
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        self.expect_ident_spanned().map(|(name, _)| name)
    }

    fn expect_ident_spanned(&mut self) -> Result<(String, Span), ParseError> {
        match self.current_kind().clone() {
            TokenKind::Ident(name) => {
                let span = self.advance().span;
                Ok((name, span))
            }
            _ => Err(ParseError::expected("a name", self.current_kind(), self.current().span)),
        }
    }

    /// Member names after `.` or `::` may be keywords (`Foo::class`).
    fn expect_member_name(&mut self) -> Result<(String, Span), ParseError> {
        if let Some(text) = keyword_text(self.current_kind()) {
            let span = self.advance().span;
            return Ok((text.to_string(), span));
        }
        self.expect_ident_spanned()
    }

    fn mk_expr(&mut self, kind: ExprKind, start: usize) -> Expr {
        let end = self.prev_end();
        Expr { id: self.next_id(), kind, span: Span::new(start, end) }
    }

    fn mk_stmt(&mut self, kind: StmtKind, start: usize) -> Stmt {
        let end = self.prev_end();
        Stmt { id: self.next_id(), kind, span: Span::new(start, end) }
    }

    fn mk_decl(&mut self, kind: DeclKind, start: usize) -> Decl {
        let end = self.prev_end();
        Decl { id: self.next_id(), kind, span: Span::new(start, end) }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    pub fn parse(&mut self) -> ParseResult {
        let mut decls = Vec::new();
        self.skip_separators();

        while !self.at_end() {
            let before = self.pos;
            match self.parse_decl() {
                Ok(Some(decl)) => decls.push(decl),
                Ok(None) => {}
                Err(e) => {
                    if !self.record_error(e) {
                        break;
                    }
                    self.synchronize();
                    if self.pos == before {
                        self.advance();
                    }
                }
            }
            self.skip_separators();
        }

        ParseResult { decls, errors: std::mem::take(&mut self.errors) }
    }

    fn parse_decl(&mut self) -> Result<Option<Decl>, ParseError> {
        let start = self.current().span.start;
        self.skip_annotations()?;
        let modifiers = self.parse_modifiers();

        match self.current_kind().clone() {
            TokenKind::Package => {
                self.advance();
                let path = self.parse_dotted_path()?;
                Ok(Some(self.mk_decl(DeclKind::Package(path), start)))
            }
            TokenKind::Import => self.parse_import(start).map(Some),
            TokenKind::Ident(name) if name == "typealias" => {
                self.advance();
                self.expect_ident()?;
                self.parse_type_params()?;
                self.expect(&TokenKind::Eq)?;
                self.parse_type()?;
                Ok(None)
            }
            _ => self.parse_decl_body(modifiers, start).map(Some),
        }
    }

    /// Parse a function, class or property after its modifiers.
    fn parse_decl_body(&mut self, modifiers: Vec<String>, start: usize) -> Result<Decl, ParseError> {
        match self.current_kind() {
            TokenKind::Fun => {
                let f = self.parse_fn(modifiers)?;
                Ok(self.mk_decl(DeclKind::Fn(f), start))
            }
            TokenKind::Class | TokenKind::Interface | TokenKind::Object => {
                let c = self.parse_class(modifiers)?;
                Ok(self.mk_decl(DeclKind::Class(c), start))
            }
            TokenKind::Val | TokenKind::Var => {
                let p = self.parse_property(modifiers)?;
                Ok(self.mk_decl(DeclKind::Property(p), start))
            }
            _ => Err(ParseError::expected(
                "declaration (fun, class, object, interface, val, var)",
                self.current_kind(),
                self.current().span,
            )),
        }
    }

    fn parse_import(&mut self, start: usize) -> Result<Decl, ParseError> {
        self.expect(&TokenKind::Import)?;
        let mut path = vec![self.expect_ident()?];
        let mut wildcard = false;

        while self.match_token(&TokenKind::Dot) {
            if self.match_token(&TokenKind::Star) {
                wildcard = true;
                break;
            }
            path.push(self.expect_member_name()?.0);
        }

        let alias = if self.match_token(&TokenKind::As) { Some(self.expect_ident()?) } else { None };

        Ok(self.mk_decl(DeclKind::Import(ImportDecl { path, wildcard, alias }), start))
    }

    fn parse_dotted_path(&mut self) -> Result<Vec<String>, ParseError> {
        let mut path = vec![self.expect_ident()?];
        while self.match_token(&TokenKind::Dot) {
            path.push(self.expect_ident()?);
        }
        Ok(path)
    }

    /// Skip `@Annotation`, `@Annotation(args)` and `@file:Annotation` prefixes.
    fn skip_annotations(&mut self) -> Result<(), ParseError> {
        while self.check(&TokenKind::At) {
            self.advance();
            if matches!(self.peek(1), TokenKind::Colon) {
                self.advance();
                self.advance();
            }
            self.parse_type()?;
            if self.check(&TokenKind::LParen) {
                self.parse_call_args()?;
            }
            self.skip_newlines();
        }
        Ok(())
    }

    fn at_modifier(&self) -> bool {
        match self.current_kind() {
            TokenKind::Ident(name) => {
                MODIFIERS.contains(&name.as_str())
                    && matches!(
                        self.peek(1),
                        TokenKind::Ident(_) | TokenKind::Fun | TokenKind::Val | TokenKind::Var |
                        TokenKind::Class | TokenKind::Interface | TokenKind::Object | TokenKind::At
                    )
            }
            _ => false,
        }
    }

    /// Inside bodies, modifiers count only when a declaration keyword follows them.
    fn modifiers_precede_decl(&self) -> bool {
        let mut i = self.pos;
        while let Some(TokenKind::Ident(name)) = self.tokens.get(i).map(|t| &t.kind) {
            if !MODIFIERS.contains(&name.as_str()) {
                return false;
            }
            i += 1;
        }
        i > self.pos
            && matches!(
                self.tokens.get(i).map(|t| &t.kind),
                Some(TokenKind::Fun | TokenKind::Val | TokenKind::Var | TokenKind::Class | TokenKind::Interface | TokenKind::Object)
            )
    }

    fn parse_modifiers(&mut self) -> Vec<String> {
        let mut modifiers = Vec::new();
        while self.at_modifier() {
            if let TokenKind::Ident(name) = self.current_kind() {
                modifiers.push(name.clone());
            }
            self.advance();
        }
        modifiers
    }

    /// Parse `<T, reified R : Closeable>` if present, returning the names.
    fn parse_type_params(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = Vec::new();
        if !self.match_token(&TokenKind::Lt) {
            return Ok(names);
        }
        loop {
            self.parse_modifiers();
            self.match_token(&TokenKind::In);
            names.push(self.expect_ident()?);
            if self.match_token(&TokenKind::Colon) {
                self.parse_type()?;
            }
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Gt)?;
        Ok(names)
    }

    fn skip_where_clause(&mut self) -> Result<(), ParseError> {
        if !self.check_ident("where") {
            return Ok(());
        }
        self.advance();
        loop {
            self.expect_ident()?;
            self.expect(&TokenKind::Colon)?;
            self.parse_type()?;
            if !self.match_token(&TokenKind::Comma) {
                return Ok(());
            }
            self.skip_newlines();
        }
    }

    /// Parse `Receiver.name` or `name` in a function or property header.
    fn parse_receiver_and_name(&mut self) -> Result<(Option<TypeRef>, String, Span), ParseError> {
        let ty = self.parse_type()?;

        if self.match_token(&TokenKind::Dot) {
            let (name, span) = self.expect_ident_spanned()?;
            return Ok((Some(ty), name, span));
        }
        // `String?.name` lexes the nullable marker and dot together
        if self.match_token(&TokenKind::QuestionDot) {
            let mut receiver = ty;
            receiver.nullable = true;
            receiver.span = Span::new(receiver.span.start, receiver.span.end + 1);
            let (name, span) = self.expect_ident_spanned()?;
            return Ok((Some(receiver), name, span));
        }

        match ty.kind {
            TypeRefKind::Named { mut path, args } if args.is_empty() && !ty.nullable => {
                let name_span = self.tokens[self.pos - 1].span;
                let name = path.pop().unwrap_or_default();
                if path.is_empty() {
                    return Ok((None, name, name_span));
                }
                let receiver_end = self.tokens[self.pos.saturating_sub(3)].span.end;
                let receiver = TypeRef {
                    kind: TypeRefKind::Named { path, args: Vec::new() },
                    nullable: false,
                    span: Span::new(ty.span.start, receiver_end),
                };
                Ok((Some(receiver), name, name_span))
            }
            _ => Err(ParseError::expected("a name", self.current_kind(), ty.span)),
        }
    }

    fn parse_fn(&mut self, modifiers: Vec<String>) -> Result<FnDecl, ParseError> {
        self.expect(&TokenKind::Fun)?;
        let type_params = self.parse_type_params()?;
        let (receiver, name, name_span) = self.parse_receiver_and_name()?;
        let params = self.parse_params()?;
        let ret_ty = if self.match_token(&TokenKind::Colon) { Some(self.parse_type()?) } else { None };
        self.skip_where_clause()?;
        let body = self.parse_fn_body()?;

        Ok(FnDecl { name, name_span, modifiers, type_params, receiver, params, ret_ty, body })
    }

    fn parse_fn_body(&mut self) -> Result<FnBody, ParseError> {
        if matches!(self.peek_past_newlines(), TokenKind::LBrace) {
            self.skip_newlines();
            return Ok(FnBody::Block(self.parse_block()?));
        }
        if self.match_token(&TokenKind::Eq) {
            self.skip_newlines();
            return Ok(FnBody::Expr(self.parse_expr()?));
        }
        Ok(FnBody::None)
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        self.skip_newlines();
        let mut params = Vec::new();

        while !self.check(&TokenKind::RParen) {
            self.skip_annotations()?;
            let modifiers = self.parse_modifiers();
            let is_property = self.match_token(&TokenKind::Val) || self.match_token(&TokenKind::Var);
            let name = self.expect_ident()?;
            self.expect(&TokenKind::Colon)?;
            let ty = self.parse_type()?;
            let default = if self.match_token(&TokenKind::Eq) {
                self.skip_newlines();
                Some(self.parse_expr()?)
            } else {
                None
            };
            params.push(Param {
                name,
                ty,
                default,
                is_property,
                is_vararg: modifiers.iter().any(|m| m == "vararg"),
            });
            self.skip_newlines();
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }

        self.expect(&TokenKind::RParen)?;
        Ok(params)
    }

    fn parse_class(&mut self, modifiers: Vec<String>) -> Result<ClassDecl, ParseError> {
        let keyword = self.advance().kind.clone();
        let kind = match keyword {
            TokenKind::Interface => ClassKind::Interface,
            TokenKind::Object => ClassKind::Object,
            _ => ClassKind::Class,
        };

        let (name, name_span) = if kind == ClassKind::Object && !matches!(self.current_kind(), TokenKind::Ident(_)) {
            ("Companion".to_string(), self.tokens[self.pos - 1].span)
        } else {
            self.expect_ident_spanned()?
        };
        let type_params = self.parse_type_params()?;

        // Primary constructor, optionally with visibility: `private constructor(...)`
        self.parse_modifiers();
        if self.check_ident("constructor") {
            self.advance();
        }
        let params = if self.check(&TokenKind::LParen) { self.parse_params()? } else { Vec::new() };

        let mut supertypes = Vec::new();
        if self.match_token(&TokenKind::Colon) {
            self.skip_newlines();
            loop {
                supertypes.push(self.parse_type()?);
                if self.check(&TokenKind::LParen) {
                    self.parse_call_args()?;
                }
                if self.check_ident("by") {
                    self.advance();
                    let saved = self.allow_trailing_lambda;
                    self.allow_trailing_lambda = false;
                    let delegate = self.parse_expr();
                    self.allow_trailing_lambda = saved;
                    delegate?;
                }
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
                self.skip_newlines();
            }
        }
        self.skip_where_clause()?;

        let members = if matches!(self.peek_past_newlines(), TokenKind::LBrace) {
            self.skip_newlines();
            self.parse_class_body(modifiers.iter().any(|m| m == "enum"))?
        } else {
            Vec::new()
        };

        Ok(ClassDecl { name, name_span, kind, modifiers, type_params, params, supertypes, members })
    }

    fn parse_class_body(&mut self, is_enum: bool) -> Result<Vec<Decl>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        if is_enum {
            self.skip_enum_entries()?;
        }
        self.skip_separators();

        let mut members = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            let before = self.pos;
            match self.parse_member() {
                Ok(Some(member)) => members.push(member),
                Ok(None) => {}
                Err(e) => {
                    if !self.record_error(e) {
                        break;
                    }
                    self.synchronize();
                    if self.pos == before && !self.check(&TokenKind::RBrace) {
                        self.advance();
                    }
                }
            }
            self.skip_separators();
        }

        self.expect(&TokenKind::RBrace)?;
        Ok(members)
    }

    /// Enum entries carry no resources of their own; only their class bodies are parsed.
    fn skip_enum_entries(&mut self) -> Result<(), ParseError> {
        loop {
            self.skip_newlines();
            self.skip_annotations()?;
            let is_entry = matches!(self.current_kind(), TokenKind::Ident(_))
                && matches!(
                    self.peek(1),
                    TokenKind::LParen | TokenKind::Comma | TokenKind::Semi |
                    TokenKind::LBrace | TokenKind::RBrace | TokenKind::Newline
                );
            if !is_entry {
                self.match_token(&TokenKind::Semi);
                return Ok(());
            }
            self.advance();
            if self.check(&TokenKind::LParen) {
                self.parse_call_args()?;
            }
            if self.check(&TokenKind::LBrace) {
                self.parse_class_body(false)?;
            }
            self.skip_newlines();
            if self.match_token(&TokenKind::Semi) {
                return Ok(());
            }
            if !self.match_token(&TokenKind::Comma) {
                return Ok(());
            }
        }
    }

    fn parse_member(&mut self) -> Result<Option<Decl>, ParseError> {
        let start = self.current().span.start;
        self.skip_annotations()?;
        let modifiers = self.parse_modifiers();

        if self.check_ident("init") && matches!(self.peek(1), TokenKind::LBrace) {
            self.advance();
            let body = self.parse_block()?;
            return Ok(Some(self.mk_decl(DeclKind::Init(body), start)));
        }

        if self.check_ident("constructor") {
            let name_span = self.advance().span;
            let params = self.parse_params()?;
            if self.match_token(&TokenKind::Colon) {
                self.skip_newlines();
                if !self.match_token(&TokenKind::This) {
                    self.expect(&TokenKind::Super)?;
                }
                self.parse_call_args()?;
            }
            let body = if matches!(self.peek_past_newlines(), TokenKind::LBrace) {
                self.skip_newlines();
                FnBody::Block(self.parse_block()?)
            } else {
                FnBody::None
            };
            let ctor = FnDecl {
                name: "constructor".to_string(),
                name_span,
                modifiers,
                type_params: Vec::new(),
                receiver: None,
                params,
                ret_ty: None,
                body,
            };
            return Ok(Some(self.mk_decl(DeclKind::Fn(ctor), start)));
        }

        if self.check_ident("typealias") {
            return self.parse_decl();
        }

        self.parse_decl_body(modifiers, start).map(Some)
    }

    fn parse_property(&mut self, modifiers: Vec<String>) -> Result<PropertyDecl, ParseError> {
        let mutable = matches!(self.advance().kind, TokenKind::Var);
        self.parse_type_params()?;
        let (receiver, name, name_span) = self.parse_receiver_and_name()?;
        let ty = if self.match_token(&TokenKind::Colon) { Some(self.parse_type()?) } else { None };
        let init = self.parse_initializer()?;
        let getter = self.parse_accessors()?;

        Ok(PropertyDecl { name, name_span, modifiers, mutable, receiver, ty, init, getter })
    }

    /// `= value` or `by delegate`.
    fn parse_initializer(&mut self) -> Result<Option<Expr>, ParseError> {
        if self.match_token(&TokenKind::Eq) || self.check_ident("by") {
            if self.check_ident("by") {
                self.advance();
            }
            self.skip_newlines();
            return Ok(Some(self.parse_expr()?));
        }
        Ok(None)
    }

    /// Parse `get() = ...` and `set(value) { ... }` accessors. Only the getter is kept.
    fn parse_accessors(&mut self) -> Result<Option<FnBody>, ParseError> {
        let mut getter = None;

        loop {
            let save = self.pos;
            self.skip_newlines();
            self.parse_modifiers();

            let is_get = self.check_ident("get");
            if !is_get && !self.check_ident("set") {
                self.pos = save;
                break;
            }
            if !matches!(
                self.peek(1),
                TokenKind::LParen | TokenKind::Newline | TokenKind::Semi | TokenKind::RBrace | TokenKind::Eof
            ) {
                self.pos = save;
                break;
            }
            self.advance();

            if !self.match_token(&TokenKind::LParen) {
                continue;
            }
            if !is_get {
                self.skip_annotations()?;
                self.expect_ident()?;
                if self.match_token(&TokenKind::Colon) {
                    self.parse_type()?;
                }
            }
            self.expect(&TokenKind::RParen)?;
            if self.match_token(&TokenKind::Colon) {
                self.parse_type()?;
            }
            let body = self.parse_fn_body()?;
            if is_get {
                getter = Some(body);
            }
        }

        Ok(getter)
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn parse_type(&mut self) -> Result<TypeRef, ParseError> {
        let start = self.current().span.start;

        if self.check_ident("suspend") && matches!(self.peek(1), TokenKind::LParen) {
            self.advance();
        }

        let mut ty = match self.current_kind().clone() {
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let mut params = Vec::new();
                while !self.check(&TokenKind::RParen) {
                    // Named function type parameters: `(reader: Reader) -> Unit`
                    if matches!(self.current_kind(), TokenKind::Ident(_)) && matches!(self.peek(1), TokenKind::Colon) {
                        self.advance();
                        self.advance();
                    }
                    params.push(self.parse_type()?);
                    self.skip_newlines();
                    if !self.match_token(&TokenKind::Comma) {
                        break;
                    }
                    self.skip_newlines();
                }
                self.expect(&TokenKind::RParen)?;

                if self.match_token(&TokenKind::Arrow) {
                    let ret = self.parse_type()?;
                    TypeRef {
                        span: Span::new(start, ret.span.end),
                        kind: TypeRefKind::Function { receiver: None, params, ret: Box::new(ret) },
                        nullable: false,
                    }
                } else if params.len() == 1 {
                    let mut inner = params.remove(0);
                    inner.span = Span::new(start, self.prev_end());
                    inner
                } else {
                    return Err(ParseError::expected("'->'", self.current_kind(), self.current().span));
                }
            }
            TokenKind::Star => {
                self.advance();
                TypeRef { kind: TypeRefKind::Star, nullable: false, span: Span::new(start, self.prev_end()) }
            }
            TokenKind::Ident(_) => {
                let mut path = vec![self.expect_ident()?];
                while self.check(&TokenKind::Dot) && matches!(self.peek(1), TokenKind::Ident(_)) {
                    self.advance();
                    path.push(self.expect_ident()?);
                }
                let args = if self.check(&TokenKind::Lt) { self.parse_type_args()? } else { Vec::new() };
                TypeRef { kind: TypeRefKind::Named { path, args }, nullable: false, span: Span::new(start, self.prev_end()) }
            }
            _ => return Err(ParseError::expected("type", self.current_kind(), self.current().span)),
        };

        if self.check(&TokenKind::Question) && self.adjacent() {
            self.advance();
            ty.nullable = true;
            ty.span = Span::new(start, self.prev_end());
        }

        // Function type with receiver: `Reader.() -> Unit`
        if self.check(&TokenKind::Dot) && matches!(self.peek(1), TokenKind::LParen) {
            self.advance();
            let fn_ty = self.parse_type()?;
            if let TypeRefKind::Function { params, ret, .. } = fn_ty.kind {
                ty = TypeRef {
                    kind: TypeRefKind::Function { receiver: Some(Box::new(ty)), params, ret },
                    nullable: fn_ty.nullable,
                    span: Span::new(start, self.prev_end()),
                };
            } else {
                return Err(ParseError::expected("'->'", self.current_kind(), self.current().span));
            }
        }

        Ok(ty)
    }

    fn parse_type_args(&mut self) -> Result<Vec<TypeRef>, ParseError> {
        self.expect(&TokenKind::Lt)?;
        let mut args = Vec::new();
        loop {
            self.skip_newlines();
            // Variance annotations are irrelevant here
            if self.check(&TokenKind::In) || (self.check_ident("out") && matches!(self.peek(1), TokenKind::Ident(_))) {
                self.advance();
            }
            args.push(self.parse_type()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(&TokenKind::Gt)?;
        Ok(args)
    }

    /// Decide whether `<` at the cursor opens type arguments of a call (`listOf<Reader>(`).
    fn looks_like_type_args(&self) -> bool {
        let mut depth = 0usize;
        let mut i = self.pos;
        loop {
            let Some(token) = self.tokens.get(i) else { return false };
            match token.kind {
                TokenKind::Lt => depth += 1,
                TokenKind::Gt => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(
                            self.tokens.get(i + 1).map(|t| &t.kind),
                            Some(TokenKind::LParen) | Some(TokenKind::ColonColon)
                        );
                    }
                }
                TokenKind::Ident(_) | TokenKind::Dot | TokenKind::Comma | TokenKind::Question |
                TokenKind::Star | TokenKind::LParen | TokenKind::RParen | TokenKind::Arrow |
                TokenKind::In => {}
                _ => return false,
            }
            i += 1;
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(&TokenKind::LBrace)?;
        let saved = self.allow_trailing_lambda;
        self.allow_trailing_lambda = true;
        let stmts = self.parse_stmts_until_rbrace();
        self.allow_trailing_lambda = saved;
        self.expect(&TokenKind::RBrace)?;
        Ok(stmts)
    }

    /// Parse statements up to (not including) the closing `}`, recovering per statement.
    fn parse_stmts_until_rbrace(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        self.skip_separators();

        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            let before = self.pos;
            let result = self.parse_stmt().and_then(|stmt| {
                stmts.push(stmt);
                self.expect_terminator()
            });
            if let Err(e) = result {
                if !self.record_error(e) {
                    break;
                }
                self.synchronize_in_block();
                if self.pos == before && !self.check(&TokenKind::RBrace) {
                    self.advance();
                }
            }
            self.skip_separators();
        }

        stmts
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        let start = self.current().span.start;
        self.skip_annotations()?;

        if self.modifiers_precede_decl() {
            let modifiers = self.parse_modifiers();
            if matches!(self.current_kind(), TokenKind::Val | TokenKind::Var) {
                return self.parse_local(start);
            }
            let decl = self.parse_decl_body(modifiers, start)?;
            return Ok(self.mk_stmt(StmtKind::Decl(Box::new(decl)), start));
        }

        match self.current_kind().clone() {
            TokenKind::Val | TokenKind::Var => self.parse_local(start),
            TokenKind::Fun | TokenKind::Class | TokenKind::Interface => {
                let decl = self.parse_decl_body(Vec::new(), start)?;
                Ok(self.mk_stmt(StmtKind::Decl(Box::new(decl)), start))
            }
            TokenKind::Object if matches!(self.peek(1), TokenKind::Ident(_)) => {
                let decl = self.parse_decl_body(Vec::new(), start)?;
                Ok(self.mk_stmt(StmtKind::Decl(Box::new(decl)), start))
            }
            TokenKind::Ident(label)
                if matches!(self.peek(1), TokenKind::At)
                    && matches!(self.peek(2), TokenKind::For | TokenKind::While | TokenKind::Do) =>
            {
                self.advance();
                self.advance();
                self.parse_loop(Some(label), start)
            }
            TokenKind::For | TokenKind::While | TokenKind::Do => self.parse_loop(None, start),
            _ => {
                let target = self.parse_expr()?;
                let op = match self.current_kind() {
                    TokenKind::Eq => None,
                    TokenKind::PlusEq => Some(BinOp::Add),
                    TokenKind::MinusEq => Some(BinOp::Sub),
                    TokenKind::StarEq => Some(BinOp::Mul),
                    TokenKind::SlashEq => Some(BinOp::Div),
                    TokenKind::PercentEq => Some(BinOp::Mod),
                    _ => return Ok(self.mk_stmt(StmtKind::Expr(target), start)),
                };
                self.advance();
                self.skip_newlines();
                let value = self.parse_expr()?;
                Ok(self.mk_stmt(StmtKind::Assign { target, op, value }, start))
            }
        }
    }

    fn parse_local(&mut self, start: usize) -> Result<Stmt, ParseError> {
        let mutable = matches!(self.advance().kind, TokenKind::Var);

        if self.match_token(&TokenKind::LParen) {
            let names = self.parse_destructuring_names()?;
            self.expect(&TokenKind::Eq)?;
            self.skip_newlines();
            let init = self.parse_expr()?;
            return Ok(self.mk_stmt(StmtKind::LocalTuple { names, mutable, init }, start));
        }

        let (name, name_span) = self.expect_ident_spanned()?;
        let ty = if self.match_token(&TokenKind::Colon) { Some(self.parse_type()?) } else { None };
        let init = self.parse_initializer()?;

        Ok(self.mk_stmt(StmtKind::Local { name, name_span, mutable, ty, init }, start))
    }

    /// Names of `(a, b: T, _)` after the opening parenthesis has been consumed.
    fn parse_destructuring_names(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = Vec::new();
        loop {
            self.skip_newlines();
            names.push(self.expect_ident()?);
            if self.match_token(&TokenKind::Colon) {
                self.parse_type()?;
            }
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.skip_newlines();
        self.expect(&TokenKind::RParen)?;
        Ok(names)
    }

    fn parse_loop(&mut self, label: Option<String>, start: usize) -> Result<Stmt, ParseError> {
        let keyword = self.advance().kind.clone();
        match keyword {
            TokenKind::For => {
                self.expect(&TokenKind::LParen)?;
                let binding = if self.match_token(&TokenKind::LParen) {
                    format!("({})", self.parse_destructuring_names()?.join(", "))
                } else {
                    let name = self.expect_ident()?;
                    if self.match_token(&TokenKind::Colon) {
                        self.parse_type()?;
                    }
                    name
                };
                self.expect(&TokenKind::In)?;
                let iter = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                let body = self.parse_loop_body()?;
                Ok(self.mk_stmt(StmtKind::For { label, binding, iter, body }, start))
            }
            TokenKind::While => {
                self.expect(&TokenKind::LParen)?;
                self.skip_newlines();
                let cond = self.parse_expr()?;
                self.skip_newlines();
                self.expect(&TokenKind::RParen)?;
                let body = self.parse_loop_body()?;
                Ok(self.mk_stmt(StmtKind::While { label, cond, body }, start))
            }
            _ => {
                let body = self.parse_loop_body()?;
                self.skip_newlines();
                self.expect(&TokenKind::While)?;
                self.expect(&TokenKind::LParen)?;
                self.skip_newlines();
                let cond = self.parse_expr()?;
                self.skip_newlines();
                self.expect(&TokenKind::RParen)?;
                Ok(self.mk_stmt(StmtKind::DoWhile { label, body, cond }, start))
            }
        }
    }

    fn parse_loop_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        if self.check(&TokenKind::Semi) {
            return Ok(Vec::new());
        }
        self.skip_newlines();
        if self.check(&TokenKind::LBrace) {
            self.parse_block()
        } else {
            Ok(vec![self.parse_stmt()?])
        }
    }

    /// Body of an `if` branch or `when` arm: a braced block or a single statement.
    fn parse_control_body(&mut self) -> Result<Expr, ParseError> {
        self.skip_newlines();
        let start = self.current().span.start;
        if self.check(&TokenKind::LBrace) {
            let stmts = self.parse_block()?;
            return Ok(self.mk_expr(ExprKind::Block(stmts), start));
        }
        let stmt = self.parse_stmt()?;
        match stmt.kind {
            StmtKind::Expr(expr) => Ok(expr),
            _ => Ok(self.mk_expr(ExprKind::Block(vec![stmt]), start)),
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_expr_bp(0)
    }

    /// A newline before `.`, `?.`, `?:`, `&&` or `||` continues the expression.
    fn newline_continues_expr(&self) -> bool {
        matches!(
            self.peek_past_newlines(),
            TokenKind::Dot | TokenKind::QuestionDot | TokenKind::Elvis | TokenKind::AmpAmp | TokenKind::PipePipe
        )
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let start = self.current().span.start;
        let mut lhs = self.parse_prefix()?;

        loop {
            if self.check(&TokenKind::Newline) && self.newline_continues_expr() {
                self.skip_newlines();
            }

            if self.postfix_applies(&lhs) {
                lhs = self.parse_postfix(lhs)?;
                continue;
            }

            if self.check(&TokenKind::As) {
                let bp = 21;
                if bp < min_bp { break; }
                self.advance();
                let safe = self.check(&TokenKind::Question) && self.adjacent();
                if safe {
                    self.advance();
                }
                let ty = self.parse_type()?;
                lhs = self.mk_expr(ExprKind::Cast { expr: Box::new(lhs), ty, safe }, start);
                continue;
            }

            let Some((l_bp, r_bp)) = self.infix_bp() else { break };
            if l_bp < min_bp { break; }

            let negated = self.match_token(&TokenKind::Bang);
            match self.current_kind().clone() {
                TokenKind::Is => {
                    self.advance();
                    let ty = self.parse_type()?;
                    lhs = self.mk_expr(ExprKind::Is { expr: Box::new(lhs), ty, negated }, start);
                }
                TokenKind::Elvis => {
                    self.advance();
                    self.skip_newlines();
                    let default = self.parse_expr_bp(r_bp)?;
                    lhs = self.mk_expr(ExprKind::Elvis { value: Box::new(lhs), default: Box::new(default) }, start);
                }
                TokenKind::Ident(method) => {
                    // Infix call: `a to b`
                    let method_span = self.advance().span;
                    self.skip_newlines();
                    let arg = self.parse_expr_bp(r_bp)?;
                    lhs = self.mk_expr(
                        ExprKind::MethodCall {
                            receiver: Box::new(lhs),
                            method,
                            method_span,
                            type_args: Vec::new(),
                            args: vec![arg],
                            safe: false,
                        },
                        start,
                    );
                }
                _ => {
                    let op = match self.parse_binop()? {
                        BinOp::In if negated => BinOp::NotIn,
                        op => op,
                    };
                    self.skip_newlines();
                    let rhs = self.parse_expr_bp(r_bp)?;
                    lhs = self.mk_expr(ExprKind::Binary { op, left: Box::new(lhs), right: Box::new(rhs) }, start);
                }
            }
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span.start;

        let kind = match self.current_kind().clone() {
            TokenKind::Int(n) => { self.advance(); ExprKind::Int(n) }
            TokenKind::Float(n) => { self.advance(); ExprKind::Float(n) }
            TokenKind::String(s) => { self.advance(); ExprKind::String(s) }
            TokenKind::Char(c) => { self.advance(); ExprKind::Char(c) }
            TokenKind::Bool(b) => { self.advance(); ExprKind::Bool(b) }
            TokenKind::Null => { self.advance(); ExprKind::Null }
            TokenKind::Ident(name) => { self.advance(); ExprKind::Ident(name) }
            TokenKind::This => {
                self.advance();
                ExprKind::This(self.parse_label()?)
            }
            TokenKind::Super => {
                self.advance();
                if self.check(&TokenKind::Lt) {
                    self.parse_type_args()?;
                }
                self.parse_label()?;
                ExprKind::Super
            }
            TokenKind::LParen => {
                self.advance();
                self.skip_newlines();
                let saved = self.allow_trailing_lambda;
                self.allow_trailing_lambda = true;
                let inner = self.parse_expr();
                self.allow_trailing_lambda = saved;
                let inner = inner?;
                self.skip_newlines();
                self.expect(&TokenKind::RParen)?;
                ExprKind::Paren(Box::new(inner))
            }
            TokenKind::LBrace => return self.parse_lambda(),
            TokenKind::Minus | TokenKind::Plus | TokenKind::Bang | TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = match self.advance().kind {
                    TokenKind::Minus => UnaryOp::Neg,
                    TokenKind::Plus => UnaryOp::Plus,
                    TokenKind::Bang => UnaryOp::Not,
                    TokenKind::PlusPlus => UnaryOp::PreInc,
                    _ => UnaryOp::PreDec,
                };
                let operand = self.parse_expr_bp(23)?;
                ExprKind::Unary { op, operand: Box::new(operand) }
            }
            TokenKind::If => return self.parse_if(),
            TokenKind::When => return self.parse_when(),
            TokenKind::Try => return self.parse_try(),
            TokenKind::Return => {
                self.advance();
                let label = self.parse_label()?;
                let value = if self.is_expr_start() { Some(Box::new(self.parse_expr()?)) } else { None };
                ExprKind::Return { label, value }
            }
            TokenKind::Throw => {
                self.advance();
                ExprKind::Throw(Box::new(self.parse_expr()?))
            }
            TokenKind::Break => {
                self.advance();
                ExprKind::Break(self.parse_label()?)
            }
            TokenKind::Continue => {
                self.advance();
                ExprKind::Continue(self.parse_label()?)
            }
            TokenKind::ColonColon => {
                self.advance();
                let (name, _) = self.expect_member_name()?;
                ExprKind::CallableRef { receiver: None, name }
            }
            TokenKind::Object => {
                return Err(ParseError::not_supported(
                    "Object expressions",
                    "declare a named class and instantiate it instead",
                    self.current().span,
                ));
            }
            _ => {
                return Err(ParseError::expected("expression", self.current_kind(), self.current().span));
            }
        };

        Ok(self.mk_expr(kind, start))
    }

    /// `@label` directly attached to the previous keyword.
    fn parse_label(&mut self) -> Result<Option<String>, ParseError> {
        if self.check(&TokenKind::At) && self.adjacent() {
            self.advance();
            return Ok(Some(self.expect_ident()?));
        }
        Ok(None)
    }

    fn is_expr_start(&self) -> bool {
        matches!(
            self.current_kind(),
            TokenKind::Int(_) | TokenKind::Float(_) | TokenKind::String(_) | TokenKind::Char(_) |
            TokenKind::Bool(_) | TokenKind::Ident(_) | TokenKind::This | TokenKind::Super |
            TokenKind::Null | TokenKind::LParen | TokenKind::LBrace | TokenKind::Minus |
            TokenKind::Plus | TokenKind::Bang | TokenKind::PlusPlus | TokenKind::MinusMinus |
            TokenKind::If | TokenKind::When | TokenKind::Try | TokenKind::Return |
            TokenKind::Throw | TokenKind::Break | TokenKind::Continue | TokenKind::ColonColon
        )
    }

    fn postfix_applies(&self, lhs: &Expr) -> bool {
        match self.current_kind() {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::Dot | TokenKind::QuestionDot |
            TokenKind::BangBang | TokenKind::PlusPlus | TokenKind::MinusMinus |
            TokenKind::ColonColon => true,
            TokenKind::LBrace => {
                self.allow_trailing_lambda
                    && matches!(
                        lhs.kind,
                        ExprKind::Ident(_) | ExprKind::Call { .. } | ExprKind::MethodCall { .. } | ExprKind::Field { .. }
                    )
            }
            TokenKind::Lt => matches!(lhs.kind, ExprKind::Ident(_)) && self.looks_like_type_args(),
            _ => false,
        }
    }

    fn parse_postfix(&mut self, lhs: Expr) -> Result<Expr, ParseError> {
        let start = lhs.span.start;

        match self.current_kind().clone() {
            TokenKind::LParen => {
                let args = self.parse_call_args()?;
                Ok(self.mk_expr(ExprKind::Call { callee: Box::new(lhs), type_args: Vec::new(), args }, start))
            }

            TokenKind::Lt => {
                let type_args = self.parse_type_args()?;
                let args = self.parse_call_args()?;
                Ok(self.mk_expr(ExprKind::Call { callee: Box::new(lhs), type_args, args }, start))
            }

            TokenKind::Dot | TokenKind::QuestionDot => {
                let safe = matches!(self.advance().kind, TokenKind::QuestionDot);
                self.skip_newlines();
                let (name, name_span) = self.expect_member_name()?;

                let type_args = if self.check(&TokenKind::Lt) && self.looks_like_type_args() {
                    self.parse_type_args()?
                } else {
                    Vec::new()
                };

                if self.check(&TokenKind::LParen) {
                    let args = self.parse_call_args()?;
                    Ok(self.mk_expr(
                        ExprKind::MethodCall {
                            receiver: Box::new(lhs),
                            method: name,
                            method_span: name_span,
                            type_args,
                            args,
                            safe,
                        },
                        start,
                    ))
                } else if !type_args.is_empty() {
                    Err(ParseError::expected("'('", self.current_kind(), self.current().span)
                        .with_hint("type arguments must be followed by ()"))
                } else {
                    Ok(self.mk_expr(
                        ExprKind::Field { object: Box::new(lhs), field: name, field_span: name_span, safe },
                        start,
                    ))
                }
            }

            // Trailing lambda
            TokenKind::LBrace => {
                let lambda = self.parse_lambda()?;
                let kind = match lhs.kind {
                    ExprKind::Call { callee, type_args, mut args } => {
                        args.push(lambda);
                        ExprKind::Call { callee, type_args, args }
                    }
                    ExprKind::MethodCall { receiver, method, method_span, type_args, mut args, safe } => {
                        args.push(lambda);
                        ExprKind::MethodCall { receiver, method, method_span, type_args, args, safe }
                    }
                    ExprKind::Field { object, field, field_span, safe } => ExprKind::MethodCall {
                        receiver: object,
                        method: field,
                        method_span: field_span,
                        type_args: Vec::new(),
                        args: vec![lambda],
                        safe,
                    },
                    other => ExprKind::Call {
                        callee: Box::new(Expr { id: lhs.id, kind: other, span: lhs.span }),
                        type_args: Vec::new(),
                        args: vec![lambda],
                    },
                };
                Ok(self.mk_expr(kind, start))
            }

            TokenKind::LBracket => {
                self.advance();
                self.skip_newlines();
                let mut indices = Vec::new();
                while !self.check(&TokenKind::RBracket) {
                    indices.push(self.parse_expr()?);
                    self.skip_newlines();
                    if !self.match_token(&TokenKind::Comma) {
                        break;
                    }
                    self.skip_newlines();
                }
                self.expect(&TokenKind::RBracket)?;
                Ok(self.mk_expr(ExprKind::Index { object: Box::new(lhs), indices }, start))
            }

            TokenKind::BangBang => {
                self.advance();
                Ok(self.mk_expr(ExprKind::NotNull(Box::new(lhs)), start))
            }

            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if matches!(self.advance().kind, TokenKind::PlusPlus) { PostfixOp::Inc } else { PostfixOp::Dec };
                Ok(self.mk_expr(ExprKind::Postfix { op, operand: Box::new(lhs) }, start))
            }

            TokenKind::ColonColon => {
                self.advance();
                let (name, _) = self.expect_member_name()?;
                let receiver = match &lhs.kind {
                    ExprKind::Ident(n) => Some(n.clone()),
                    ExprKind::This(_) => Some("this".to_string()),
                    _ => None,
                };
                Ok(self.mk_expr(ExprKind::CallableRef { receiver, name }, start))
            }

            _ => Err(ParseError::expected("expression", self.current_kind(), self.current().span)),
        }
    }

    /// Parse `(args)` including named and spread arguments.
    fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(&TokenKind::LParen)?;
        let saved = self.allow_trailing_lambda;
        self.allow_trailing_lambda = true;
        let args = self.parse_call_args_inner();
        self.allow_trailing_lambda = saved;
        let args = args?;
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_call_args_inner(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        self.skip_newlines();

        while !self.check(&TokenKind::RParen) {
            // Named argument: `name = value`
            if matches!(self.current_kind(), TokenKind::Ident(_)) && matches!(self.peek(1), TokenKind::Eq) {
                self.advance();
                self.advance();
                self.skip_newlines();
            }
            // Spread: `*values`
            self.match_token(&TokenKind::Star);

            args.push(self.parse_expr()?);
            self.skip_newlines();
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }

        Ok(args)
    }

    fn parse_lambda(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span.start;
        self.expect(&TokenKind::LBrace)?;
        self.skip_newlines();

        let params = if self.lambda_has_params() { self.parse_lambda_params()? } else { Vec::new() };

        let saved = self.allow_trailing_lambda;
        self.allow_trailing_lambda = true;
        let body = self.parse_stmts_until_rbrace();
        self.allow_trailing_lambda = saved;

        self.expect(&TokenKind::RBrace)?;
        Ok(self.mk_expr(ExprKind::Lambda { params, body }, start))
    }

    /// Scan ahead for `a, b: T ->` at the start of a lambda body.
    fn lambda_has_params(&self) -> bool {
        let mut depth = 0usize;
        for token in &self.tokens[self.pos..] {
            match token.kind {
                TokenKind::Arrow if depth == 0 => return true,
                TokenKind::Arrow | TokenKind::Ident(_) | TokenKind::Comma | TokenKind::Colon |
                TokenKind::Dot | TokenKind::Question | TokenKind::Newline => {}
                TokenKind::Lt | TokenKind::LParen => depth += 1,
                TokenKind::Gt | TokenKind::RParen if depth > 0 => depth -= 1,
                _ => return false,
            }
        }
        false
    }

    fn parse_lambda_params(&mut self) -> Result<Vec<LambdaParam>, ParseError> {
        let mut params = Vec::new();

        while !self.check(&TokenKind::Arrow) {
            self.skip_newlines();
            let name = if self.match_token(&TokenKind::LParen) {
                format!("({})", self.parse_destructuring_names()?.join(", "))
            } else {
                self.expect_ident()?
            };
            let ty = if self.match_token(&TokenKind::Colon) { Some(self.parse_type()?) } else { None };
            params.push(LambdaParam { name, ty });
            self.skip_newlines();
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect(&TokenKind::Arrow)?;
        Ok(params)
    }

    fn parse_if(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span.start;
        self.expect(&TokenKind::If)?;
        self.expect(&TokenKind::LParen)?;
        self.skip_newlines();
        let cond = self.parse_expr()?;
        self.skip_newlines();
        self.expect(&TokenKind::RParen)?;

        let then_branch = self.parse_control_body()?;

        let else_branch = if matches!(self.peek_past_newlines(), TokenKind::Else) {
            self.skip_newlines();
            self.advance();
            Some(Box::new(self.parse_control_body()?))
        } else {
            None
        };

        Ok(self.mk_expr(
            ExprKind::If { cond: Box::new(cond), then_branch: Box::new(then_branch), else_branch },
            start,
        ))
    }

    fn parse_when(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span.start;
        self.expect(&TokenKind::When)?;

        let subject = if self.match_token(&TokenKind::LParen) {
            self.skip_newlines();
            // `when (val x = expr)`
            if self.match_token(&TokenKind::Val) {
                self.expect_ident()?;
                if self.match_token(&TokenKind::Colon) {
                    self.parse_type()?;
                }
                self.expect(&TokenKind::Eq)?;
                self.skip_newlines();
            }
            let subject = self.parse_expr()?;
            self.skip_newlines();
            self.expect(&TokenKind::RParen)?;
            Some(Box::new(subject))
        } else {
            None
        };

        self.skip_newlines();
        self.expect(&TokenKind::LBrace)?;
        self.skip_separators();

        let mut arms = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.at_end() {
            let mut conditions = Vec::new();
            loop {
                conditions.push(self.parse_when_condition()?);
                self.skip_newlines();
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
                self.skip_newlines();
            }
            self.expect(&TokenKind::Arrow)?;
            let body = self.parse_control_body()?;
            arms.push(WhenArm { conditions, body: Box::new(body) });
            self.skip_separators();
        }

        self.expect(&TokenKind::RBrace)?;
        Ok(self.mk_expr(ExprKind::When { subject, arms }, start))
    }

    fn parse_when_condition(&mut self) -> Result<WhenCondition, ParseError> {
        if self.match_token(&TokenKind::Else) {
            return Ok(WhenCondition::Else);
        }
        let negated = self.check(&TokenKind::Bang) && matches!(self.peek(1), TokenKind::Is | TokenKind::In);
        if negated {
            self.advance();
        }
        if self.match_token(&TokenKind::Is) {
            return Ok(WhenCondition::Is { ty: self.parse_type()?, negated });
        }
        if self.match_token(&TokenKind::In) {
            return Ok(WhenCondition::In { expr: self.parse_expr()?, negated });
        }
        Ok(WhenCondition::Expr(self.parse_expr()?))
    }

    fn parse_try(&mut self) -> Result<Expr, ParseError> {
        let start = self.current().span.start;
        self.expect(&TokenKind::Try)?;
        self.skip_newlines();
        let body = self.parse_block()?;

        let mut catches = Vec::new();
        while matches!(self.peek_past_newlines(), TokenKind::Catch) {
            self.skip_newlines();
            self.advance();
            self.expect(&TokenKind::LParen)?;
            let name = self.expect_ident()?;
            self.expect(&TokenKind::Colon)?;
            let ty = self.parse_type()?;
            self.expect(&TokenKind::RParen)?;
            self.skip_newlines();
            let body = self.parse_block()?;
            catches.push(CatchClause { name, ty, body });
        }

        let finally = if matches!(self.peek_past_newlines(), TokenKind::Finally) {
            self.skip_newlines();
            self.advance();
            self.skip_newlines();
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(self.mk_expr(ExprKind::Try { body, catches, finally }, start))
    }

    fn infix_bp(&self) -> Option<(u8, u8)> {
        match self.current_kind() {
            TokenKind::PipePipe => Some((1, 2)),
            TokenKind::AmpAmp => Some((3, 4)),
            TokenKind::EqEq | TokenKind::BangEq | TokenKind::EqEqEq | TokenKind::BangEqEq => Some((5, 6)),
            TokenKind::Lt | TokenKind::Gt | TokenKind::LtEq | TokenKind::GtEq => Some((7, 8)),
            TokenKind::Is | TokenKind::In => Some((9, 10)),
            TokenKind::Bang if matches!(self.peek(1), TokenKind::Is | TokenKind::In) => Some((9, 10)),
            TokenKind::Elvis => Some((11, 12)),
            TokenKind::Ident(name) if !NON_INFIX.contains(&name.as_str()) => Some((13, 14)),
            TokenKind::DotDot => Some((15, 16)),
            TokenKind::Plus | TokenKind::Minus => Some((17, 18)),
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Some((19, 20)),
            _ => None,
        }
    }

    fn parse_binop(&mut self) -> Result<BinOp, ParseError> {
        let op = match self.current_kind() {
            TokenKind::Plus => BinOp::Add,
            TokenKind::Minus => BinOp::Sub,
            TokenKind::Star => BinOp::Mul,
            TokenKind::Slash => BinOp::Div,
            TokenKind::Percent => BinOp::Mod,
            TokenKind::EqEq => BinOp::Eq,
            TokenKind::BangEq => BinOp::Ne,
            TokenKind::EqEqEq => BinOp::Identical,
            TokenKind::BangEqEq => BinOp::NotIdentical,
            TokenKind::Lt => BinOp::Lt,
            TokenKind::Gt => BinOp::Gt,
            TokenKind::LtEq => BinOp::Le,
            TokenKind::GtEq => BinOp::Ge,
            TokenKind::AmpAmp => BinOp::And,
            TokenKind::PipePipe => BinOp::Or,
            TokenKind::DotDot => BinOp::Range,
            TokenKind::In => BinOp::In,
            _ => return Err(ParseError::expected(
                "operator like '+' or '-'",
                self.current_kind(),
                self.current().span,
            )),
        };
        self.advance();
        Ok(op)
    }
}

/// Source text of keywords that may appear as member names.
fn keyword_text(kind: &TokenKind) -> Option<&'static str> {
    Some(match kind {
        TokenKind::Class => "class",
        TokenKind::Object => "object",
        TokenKind::Interface => "interface",
        TokenKind::Fun => "fun",
        TokenKind::Val => "val",
        TokenKind::Var => "var",
        TokenKind::In => "in",
        TokenKind::Is => "is",
        TokenKind::As => "as",
        TokenKind::Do => "do",
        TokenKind::When => "when",
        TokenKind::Try => "try",
        TokenKind::Package => "package",
        TokenKind::Import => "import",
        _ => return None,
    })
}

/// Result of parsing: declarations plus any errors found.
#[derive(Debug)]
pub struct ParseResult {
    pub decls: Vec<Decl>,
    pub errors: Vec<ParseError>,
}

impl ParseResult {
    /// Returns true if parsing completed without errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A parser error with location and friendly message.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub span: Span,
    pub message: String,
    pub hint: Option<String>,
}

impl ParseError {
    fn expected(expected: &str, found: &TokenKind, span: Span) -> Self {
        let message = format_expected_message(expected, found);
        let hint = crate::hints::for_expected(expected, found).map(String::from);
        Self { span, message, hint }
    }

    fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn not_supported(feature: &str, hint: &str, span: Span) -> Self {
        Self {
            span,
            message: format!("{} are not supported", feature),
            hint: Some(hint.to_string()),
        }
    }
}

/// Format a user-friendly "expected X, found Y" message.
fn format_expected_message(expected: &str, found: &TokenKind) -> String {
    match expected {
        "';'" | "newline or ';'" => "Expected ';' or newline after statement".to_string(),
        "'{'" => format!("Expected '{{' to start block, found {}", found.display_name()),
        "'}'" => format!("Expected '}}' to close block, found {}", found.display_name()),
        "')'" if matches!(found, TokenKind::Eof) => "Unclosed '(' - missing ')'".to_string(),
        "']'" if matches!(found, TokenKind::Eof) => "Unclosed '[' - missing ']'".to_string(),
        "a name" => format!("Expected name, found {}", found.display_name()),
        s if s.starts_with("declaration") => format!("Expected declaration, found {}", found.display_name()),
        _ => format!("Expected {}, found {}", expected, found.display_name()),
    }
}
