//! Recursive-descent parser with error recovery.
//!
//! One method per grammar production, `Option<T>` returns threaded through
//! a shared error-recovery helper, and a convention of never failing to
//! produce a node: every production that cannot fully parse still returns a
//! node, flagged `has_parse_error`, with synthesized missing identifiers so
//! later phases don't re-report the same location.

use crate::diagnostics::{Diagnostic, DiagnosticCode, DiagnosticTarget, Span};
use crate::scanner::{Keyword, Punctuation, Scanner, Token, TokenKind};
use crate::tree::*;

pub struct ParseResult {
    pub tree: SyntaxTree,
    pub diagnostics: Vec<Diagnostic>,
}

pub fn parse(file_path: &str, text: &str) -> ParseResult {
    let (tokens, mut diagnostics) = Scanner::new(file_path, text).tokenize();
    let tokens: Vec<Token> = tokens.into_iter().filter(|t| !matches!(t.kind, TokenKind::Trivia(_))).collect();
    let mut parser = Parser {
        tokens,
        pos: 0,
        file_path: file_path.to_string(),
        nodes: Vec::new(),
        diagnostics: Vec::new(),
        printable: true,
        last_error_pos: None,
        blockless_namespace_seen: false,
        seen_non_import: false,
    };
    let root = parser.parse_script();
    diagnostics.extend(parser.diagnostics);
    let tree = SyntaxTree::new(file_path.to_string(), parser.nodes, root, parser.printable);
    ParseResult { tree, diagnostics }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file_path: String,
    nodes: Vec<Node>,
    diagnostics: Vec<Diagnostic>,
    printable: bool,
    last_error_pos: Option<u32>,
    blockless_namespace_seen: bool,
    seen_non_import: bool,
}

impl Parser {
    // ---- token stream -----------------------------------------------

    fn raw_at(&self, idx: usize) -> &Token {
        &self.tokens[idx.min(self.tokens.len() - 1)]
    }

    /// Skip Newline tokens (treated as trivia outside directive parsing).
    fn skip_trivia(&mut self) {
        while matches!(self.raw_at(self.pos).kind, TokenKind::Newline) {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> &Token {
        self.skip_trivia();
        self.raw_at(self.pos)
    }

    fn peek_kind(&mut self) -> TokenKind {
        self.peek().kind.clone()
    }

    fn current_span(&mut self) -> Span {
        self.peek().span
    }

    fn prev_end(&self) -> u32 {
        if self.pos == 0 {
            0
        } else {
            self.raw_at(self.pos - 1).span.end
        }
    }

    fn advance(&mut self) -> Token {
        self.skip_trivia();
        let tok = self.raw_at(self.pos).clone();
        if !matches!(tok.kind, TokenKind::EndOfFile) {
            self.pos += 1;
        }
        tok
    }

    fn is_eof(&mut self) -> bool {
        matches!(self.peek().kind, TokenKind::EndOfFile)
    }

    fn at_punct(&mut self, p: Punctuation) -> bool {
        matches!(self.peek().kind, TokenKind::Punctuation(ref x) if *x == p)
    }

    fn at_keyword(&mut self, k: Keyword) -> bool {
        matches!(self.peek().kind, TokenKind::Keyword(ref x) if *x == k)
    }

    fn eat_punct(&mut self, p: Punctuation) -> bool {
        if self.at_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    // ---- node arena ---------------------------------------------------

    fn alloc(&mut self, kind: NodeKind, pos: u32, end: u32) -> NodeId {
        self.nodes.push(Node {
            pos,
            end,
            parent: None,
            flags: NodeFlags::empty(),
            directives: Default::default(),
            symbol: None,
            locals: None,
            exports: None,
            kind,
        });
        NodeId((self.nodes.len() - 1) as u32)
    }

    fn mark_error(&mut self, id: NodeId) {
        self.nodes[id.0 as usize].flags.insert(NodeFlags::HAS_PARSE_ERROR);
        self.printable = false;
    }

    fn synthetic_identifier(&mut self, pos: u32) -> NodeId {
        let id = self.alloc(
            NodeKind::Identifier(IdentifierNode { text: String::new(), missing: true }),
            pos,
            pos,
        );
        self.nodes[id.0 as usize].flags.insert(NodeFlags::SYNTHETIC);
        self.mark_error(id);
        id
    }

    // ---- diagnostics ----------------------------------------------------

    /// No two errors at the same real position.
    fn error_at(&mut self, span: Span, code: DiagnosticCode, msg: impl Into<String>) {
        if self.last_error_pos == Some(span.pos) {
            return;
        }
        self.last_error_pos = Some(span.pos);
        self.diagnostics.push(Diagnostic::new(code, msg, DiagnosticTarget::span(&self.file_path, span)));
    }

    /// A missing punctuation is squiggled at the end of the previous token,
    /// not on the (unrelated) token that follows it.
    fn missing_punct(&mut self, expected: &str) {
        let pos = self.prev_end();
        self.error_at(Span::empty_at(pos), DiagnosticCode::MissingToken, format!("Expected '{expected}'."));
    }

    fn expect_punct(&mut self, p: Punctuation, expected: &str) -> bool {
        if self.eat_punct(p) {
            true
        } else {
            self.missing_punct(expected);
            false
        }
    }

    // ---- script ---------------------------------------------------------

    fn parse_script(&mut self) -> NodeId {
        let start = self.current_span().pos;
        let mut statements = Vec::new();
        while !self.is_eof() {
            let (directives, decorators) = self.collect_leading_annotations();
            if !decorators.is_empty() {
                let span = self.current_span();
                self.error_at(span, DiagnosticCode::InvalidDecoratorLocation, "Decorators are not valid on import statements here.");
            }
            if self.at_keyword(Keyword::Import) {
                if self.seen_non_import {
                    let span = self.current_span();
                    self.error_at(span, DiagnosticCode::InvalidDirectiveLocation, "Imports must come before any other statement.");
                }
                let stmt = self.parse_import();
                self.attach_directives(stmt, directives);
                statements.push(stmt);
                continue;
            }
            self.seen_non_import = true;
            let stmt = self.parse_top_level_statement(decorators);
            self.attach_directives(stmt, directives);
            statements.push(stmt);
        }
        let end = self.prev_end();
        self.alloc(NodeKind::Script(ScriptNode { statements }), start, end)
    }

    fn attach_directives(&mut self, node: NodeId, directives: Vec<NodeId>) {
        self.nodes[node.0 as usize].directives = directives.into();
    }

    /// Leading `#...` directives and `@...` decorators at a statement-like
    /// position.
    fn collect_leading_annotations(&mut self) -> (Vec<NodeId>, Vec<NodeId>) {
        let mut directives = Vec::new();
        let mut decorators = Vec::new();
        loop {
            if self.at_punct(Punctuation::Hash) {
                directives.push(self.parse_directive());
            } else if self.at_punct(Punctuation::At) {
                decorators.push(self.parse_decorator());
            } else {
                break;
            }
        }
        (directives, decorators)
    }

    /// `#suppress <code> [message]`, newline-terminated; newline is *not*
    /// trivia while parsing a directive.
    fn parse_directive(&mut self) -> NodeId {
        let start = self.current_span().pos;
        self.advance(); // '#'
        let name = match self.advance().kind {
            TokenKind::Identifier(s) => s,
            _ => {
                self.error_at(Span::empty_at(start), DiagnosticCode::UnknownDirective, "Expected a directive name.");
                String::new()
            }
        };
        let mut args = Vec::new();
        while !matches!(self.raw_at(self.pos).kind, TokenKind::Newline | TokenKind::EndOfFile) {
            let tok = self.raw_at(self.pos).clone();
            self.pos += 1;
            match tok.kind {
                TokenKind::Trivia(_) => continue,
                TokenKind::Identifier(s) => args.push(s),
                TokenKind::StringLiteral(s) => args.push(s),
                TokenKind::Punctuation(_) => continue,
                _ => continue,
            }
        }
        if name != "suppress" {
            let span = Span::new(start, self.prev_end());
            self.error_at(span, DiagnosticCode::UnknownDirective, format!("Unknown directive '#{name}'."));
        }
        let end = self.prev_end();
        self.alloc(NodeKind::Directive(DirectiveNode { name, args }), start, end)
    }

    fn parse_decorator(&mut self) -> NodeId {
        let start = self.current_span().pos;
        self.advance(); // '@'
        let path = self.parse_reference_path();
        let args = if self.at_punct(Punctuation::OpenParen) {
            self.parse_delimited_list(
                Punctuation::OpenParen,
                Punctuation::CloseParen,
                Punctuation::Comma,
                None,
                false,
                true,
                |p| p.parse_expr(),
            )
        } else {
            Vec::new()
        };
        let end = self.prev_end();
        self.alloc(NodeKind::Decorator(DecoratorNode { path, args }), start, end)
    }

    /// A dotted reference path used by decorators and `using` (no template
    /// arguments).
    fn parse_reference_path(&mut self) -> NodeId {
        let mut node = self.parse_identifier();
        while self.at_punct(Punctuation::Dot) {
            self.advance();
            let member = self.parse_identifier();
            let start = self.nodes[node.0 as usize].pos;
            let end = self.nodes[member.0 as usize].end;
            node = self.alloc(NodeKind::MemberExpr(MemberExprNode { base: node, member }), start, end);
        }
        node
    }

    fn parse_identifier(&mut self) -> NodeId {
        let span = self.current_span();
        match self.peek().kind.clone() {
            TokenKind::Identifier(text) => {
                self.advance();
                self.alloc(NodeKind::Identifier(IdentifierNode { text, missing: false }), span.pos, span.end)
            }
            TokenKind::Keyword(_) => {
                self.advance();
                self.error_at(span, DiagnosticCode::ReservedIdentifierUsed, "Keyword used as an identifier.");
                self.alloc(NodeKind::Identifier(IdentifierNode { text: String::new(), missing: false }), span.pos, span.end)
            }
            _ => {
                self.error_at(Span::empty_at(self.prev_end()), DiagnosticCode::MissingToken, "Expected an identifier.");
                self.synthetic_identifier(self.prev_end())
            }
        }
    }

    // ---- delimited-list driver -------------------------------------------

    /// Every comma/semicolon list shares this routine. Guaranteed to
    /// terminate: if one iteration neither consumes a delimiter nor the
    /// close token nor any token, it logs one error at the stall position
    /// and exits.
    fn parse_delimited_list<T>(
        &mut self,
        open: Punctuation,
        close: Punctuation,
        primary_delim: Punctuation,
        tolerated_delim: Option<Punctuation>,
        allow_trailing: bool,
        forbid_decorators: bool,
        mut parse_item: impl FnMut(&mut Self) -> T,
    ) -> Vec<T> {
        self.expect_punct(open, punct_name(open));
        let mut items = Vec::new();
        loop {
            if self.at_punct(close) {
                self.advance();
                break;
            }
            if self.is_eof() {
                self.missing_punct(punct_name(close));
                break;
            }
            if forbid_decorators && self.at_punct(Punctuation::At) {
                let span = self.current_span();
                self.error_at(span, DiagnosticCode::InvalidDecoratorLocation, "Decorators are not allowed here.");
            }
            let before = self.pos;
            items.push(parse_item(self));
            let consumed_delim = self.eat_punct(primary_delim)
                || tolerated_delim.map(|d| {
                    if self.at_punct(d) {
                        let span = self.current_span();
                        self.error_at(span, DiagnosticCode::TrailingDelimiterDisallowed, "Use the standard delimiter here.");
                        self.advance();
                        true
                    } else {
                        false
                    }
                }).unwrap_or(false);
            if self.at_punct(close) {
                if consumed_delim && !allow_trailing {
                    let span = self.current_span();
                    self.error_at(span, DiagnosticCode::TrailingDelimiterDisallowed, "Trailing delimiter is not allowed here.");
                }
                self.advance();
                break;
            }
            if !consumed_delim {
                if self.pos == before {
                    // Stall guard: nothing was consumed at all this round.
                    let span = self.current_span();
                    self.error_at(span, DiagnosticCode::MissingToken, format!("Expected '{}' or '{}'.", punct_name(primary_delim), punct_name(close)));
                    self.advance();
                } else {
                    self.missing_punct(punct_name(primary_delim));
                }
            }
        }
        items
    }

    // ---- imports / namespaces / using ------------------------------------

    fn parse_import(&mut self) -> NodeId {
        let start = self.current_span().pos;
        self.advance(); // 'import'
        let path = self.parse_string_literal();
        self.eat_punct(Punctuation::Semicolon);
        let end = self.prev_end();
        self.alloc(NodeKind::Import(ImportNode { path }), start, end)
    }

    fn parse_string_literal(&mut self) -> NodeId {
        let span = self.current_span();
        match self.peek().kind.clone() {
            TokenKind::StringLiteral(value) => {
                self.advance();
                self.alloc(NodeKind::StringLiteral(StringLiteralNode { value }), span.pos, span.end)
            }
            _ => {
                self.error_at(Span::empty_at(self.prev_end()), DiagnosticCode::MissingToken, "Expected a string literal.");
                self.alloc(NodeKind::StringLiteral(StringLiteralNode { value: String::new() }), self.prev_end(), self.prev_end())
            }
        }
    }

    fn parse_top_level_statement(&mut self, decorators: Vec<NodeId>) -> NodeId {
        match self.peek().kind.clone() {
            TokenKind::Keyword(Keyword::Namespace) => self.parse_namespace(decorators),
            TokenKind::Keyword(Keyword::Using) => self.parse_using(),
            TokenKind::Keyword(Keyword::Model) => self.parse_model(decorators),
            TokenKind::Keyword(Keyword::Interface) => self.parse_interface(decorators),
            TokenKind::Keyword(Keyword::Union) => self.parse_union(decorators),
            TokenKind::Keyword(Keyword::Enum) => self.parse_enum(decorators),
            TokenKind::Keyword(Keyword::Alias) => self.parse_alias(decorators),
            TokenKind::Keyword(Keyword::Op) => self.parse_operation(decorators),
            TokenKind::Punctuation(Punctuation::Semicolon) => {
                let span = self.current_span();
                self.advance();
                self.alloc(NodeKind::EmptyStatement, span.pos, span.end)
            }
            _ => {
                let span = self.current_span();
                self.error_at(span, DiagnosticCode::MissingToken, "Expected a declaration.");
                self.advance();
                let id = self.alloc(NodeKind::InvalidStatement, span.pos, span.end);
                self.mark_error(id);
                id
            }
        }
    }

    /// `namespace A.B.C { .. }` desugars into three nested namespace nodes
    /// sharing `pos`/`end`. A namespace with no body and no following `{`
    /// is blockless: the rest
    /// of the file becomes its body. Only one blockless namespace is valid
    /// per file, and it must precede any non-import statement.
    fn parse_namespace(&mut self, decorators: Vec<NodeId>) -> NodeId {
        let start = self.current_span().pos;
        self.advance(); // 'namespace'
        let mut segments = vec![self.parse_identifier()];
        while self.at_punct(Punctuation::Dot) {
            self.advance();
            segments.push(self.parse_identifier());
        }
        if self.at_punct(Punctuation::OpenBrace) {
            let body = self.parse_delimited_block();
            let end = self.prev_end();
            self.build_namespace_chain(segments, Some(body), decorators, start, end, false)
        } else {
            self.eat_punct(Punctuation::Semicolon);
            if self.blockless_namespace_seen {
                let span = Span::new(start, self.prev_end());
                self.error_at(span, DiagnosticCode::InvalidDirectiveLocation, "Multiple blockless namespaces are not allowed.");
            }
            if self.seen_non_import {
                let span = Span::new(start, self.prev_end());
                self.error_at(span, DiagnosticCode::InvalidDirectiveLocation, "A blockless namespace must be the first statement.");
            }
            self.blockless_namespace_seen = true;
            let mut rest = Vec::new();
            while !self.is_eof() {
                let (d, dec) = self.collect_leading_annotations();
                let stmt = self.parse_top_level_statement(dec);
                self.attach_directives(stmt, d);
                rest.push(stmt);
            }
            let end = self.prev_end();
            self.build_namespace_chain(segments, Some(rest), decorators, start, end, true)
        }
    }

    fn build_namespace_chain(
        &mut self,
        segments: Vec<NodeId>,
        body: Option<Vec<NodeId>>,
        decorators: Vec<NodeId>,
        start: u32,
        end: u32,
        blockless: bool,
    ) -> NodeId {
        let mut iter = segments.into_iter().rev();
        let innermost_name = iter.next().expect("namespace always has one segment");
        let mut current = self.alloc(
            NodeKind::Namespace(NamespaceNode { name: innermost_name, body, decorators, blockless }),
            start,
            end,
        );
        for name in iter {
            current = self.alloc(
                NodeKind::Namespace(NamespaceNode { name, body: Some(vec![current]), decorators: Vec::new(), blockless: false }),
                start,
                end,
            );
        }
        current
    }

    fn parse_delimited_block(&mut self) -> Vec<NodeId> {
        self.advance(); // '{'
        let mut statements = Vec::new();
        while !self.at_punct(Punctuation::CloseBrace) && !self.is_eof() {
            let (directives, decorators) = self.collect_leading_annotations();
            let stmt = self.parse_top_level_statement(decorators);
            self.attach_directives(stmt, directives);
            statements.push(stmt);
        }
        self.expect_punct(Punctuation::CloseBrace, "}");
        statements
    }

    fn parse_using(&mut self) -> NodeId {
        let start = self.current_span().pos;
        self.advance(); // 'using'
        let path = self.parse_reference_path();
        self.eat_punct(Punctuation::Semicolon);
        let end = self.prev_end();
        self.alloc(NodeKind::Using(UsingNode { path }), start, end)
    }

    // ---- declarations -----------------------------------------------------

    fn parse_template_params(&mut self) -> Vec<NodeId> {
        if !self.at_punct(Punctuation::LessThan) {
            return Vec::new();
        }
        self.parse_delimited_list(
            Punctuation::LessThan,
            Punctuation::GreaterThan,
            Punctuation::Comma,
            None,
            false,
            true,
            |p| {
                let start = p.current_span().pos;
                let name = p.parse_identifier();
                let default = if p.eat_punct(Punctuation::Equals) { Some(p.parse_expr()) } else { None };
                let end = p.prev_end();
                p.alloc(NodeKind::TemplateParameter(TemplateParameterNode { name, default }), start, end)
            },
        )
    }

    fn parse_model(&mut self, decorators: Vec<NodeId>) -> NodeId {
        let start = self.current_span().pos;
        self.advance(); // 'model'
        let name = Some(self.parse_identifier());
        let template_params = self.parse_template_params();
        let (extends, is_clause) = self.parse_heritage_clauses();
        let members = self.parse_model_body();
        let end = self.prev_end();
        self.alloc(
            NodeKind::Model(ModelNode { name, template_params, extends, is_clause, members, decorators }),
            start,
            end,
        )
    }

    fn parse_heritage_clauses(&mut self) -> (Option<NodeId>, Option<NodeId>) {
        let mut extends = None;
        let mut is_clause = None;
        loop {
            if self.at_keyword(Keyword::Extends) {
                self.advance();
                extends = Some(self.parse_expr());
            } else if self.at_keyword(Keyword::Is) {
                self.advance();
                is_clause = Some(self.parse_expr());
            } else {
                break;
            }
        }
        (extends, is_clause)
    }

    fn parse_model_body(&mut self) -> Vec<NodeId> {
        self.parse_delimited_list(
            Punctuation::OpenBrace,
            Punctuation::CloseBrace,
            Punctuation::Comma,
            Some(Punctuation::Semicolon),
            true,
            false,
            |p| p.parse_model_member(),
        )
    }

    fn parse_model_member(&mut self) -> NodeId {
        let (directives, decorators) = self.collect_leading_annotations();
        let node = if self.at_punct(Punctuation::Ellipsis) {
            let start = self.current_span().pos;
            self.advance();
            let target = self.parse_expr();
            let end = self.prev_end();
            if !decorators.is_empty() {
                let span = Span::new(start, end);
                self.error_at(span, DiagnosticCode::InvalidDecoratorLocation, "Decorators are not valid on a spread.");
            }
            self.alloc(NodeKind::ModelSpread(ModelSpreadNode { target }), start, end)
        } else {
            let start = self.current_span().pos;
            let name = self.parse_property_name();
            let optional = self.eat_punct(Punctuation::Question);
            self.expect_punct(Punctuation::Colon, ":");
            let type_expr = self.parse_expr();
            let default = if self.eat_punct(Punctuation::Equals) { Some(self.parse_expr()) } else { None };
            let end = self.prev_end();
            self.alloc(
                NodeKind::ModelProperty(ModelPropertyNode { name, type_expr, optional, default, decorators }),
                start,
                end,
            )
        };
        self.attach_directives(node, directives);
        node
    }

    fn parse_property_name(&mut self) -> NodeId {
        match self.peek().kind.clone() {
            TokenKind::StringLiteral(_) => self.parse_string_literal(),
            _ => self.parse_identifier(),
        }
    }

    fn parse_interface(&mut self, decorators: Vec<NodeId>) -> NodeId {
        let start = self.current_span().pos;
        self.advance(); // 'interface'
        let name = self.parse_identifier();
        let template_params = self.parse_template_params();
        let mut mixes = Vec::new();
        if self.at_keyword_word("mixes") {
            self.advance();
            loop {
                mixes.push(self.parse_expr());
                if !self.eat_punct(Punctuation::Comma) {
                    break;
                }
            }
        }
        let operations = self.parse_delimited_list(
            Punctuation::OpenBrace,
            Punctuation::CloseBrace,
            Punctuation::Semicolon,
            Some(Punctuation::Comma),
            true,
            false,
            |p| p.parse_operation(Vec::new()),
        );
        let end = self.prev_end();
        self.alloc(
            NodeKind::Interface(InterfaceNode { name, template_params, mixes, operations, decorators }),
            start,
            end,
        )
    }

    /// `mixes` is a contextual keyword, not a reserved one.
    fn at_keyword_word(&mut self, word: &str) -> bool {
        matches!(self.peek().kind, TokenKind::Identifier(ref s) if s == word)
    }

    fn parse_operation(&mut self, decorators: Vec<NodeId>) -> NodeId {
        let (directives, mut decorators_here) = self.collect_leading_annotations();
        decorators_here.extend(decorators);
        let start = self.current_span().pos;
        if self.at_keyword(Keyword::Op) {
            self.advance();
        }
        let name = self.parse_identifier();
        let template_params = self.parse_template_params();
        let params_start = self.current_span().pos;
        let members = self.parse_delimited_list(
            Punctuation::OpenParen,
            Punctuation::CloseParen,
            Punctuation::Comma,
            Some(Punctuation::Semicolon),
            true,
            false,
            |p| p.parse_model_member(),
        );
        let params_end = self.prev_end();
        let params = self.alloc(
            NodeKind::Model(ModelNode {
                name: None,
                template_params: Vec::new(),
                extends: None,
                is_clause: None,
                members,
                decorators: Vec::new(),
            }),
            params_start,
            params_end,
        );
        self.expect_punct(Punctuation::Colon, ":");
        let return_type = self.parse_expr();
        let end = self.prev_end();
        let node = self.alloc(
            NodeKind::Operation(OperationNode { name, template_params, params, return_type, decorators: decorators_here }),
            start,
            end,
        );
        self.attach_directives(node, directives);
        node
    }

    fn parse_union(&mut self, decorators: Vec<NodeId>) -> NodeId {
        let start = self.current_span().pos;
        self.advance(); // 'union'
        let name = Some(self.parse_identifier());
        let template_params = self.parse_template_params();
        let variants = self.parse_delimited_list(
            Punctuation::OpenBrace,
            Punctuation::CloseBrace,
            Punctuation::Comma,
            None,
            true,
            false,
            |p| p.parse_union_variant(),
        );
        let end = self.prev_end();
        self.alloc(NodeKind::Union(UnionNode { name, template_params, variants, decorators }), start, end)
    }

    fn parse_union_variant(&mut self) -> NodeId {
        let (directives, decorators) = self.collect_leading_annotations();
        let start = self.current_span().pos;
        // `name: Type` or a bare `Type` (anonymous variant).
        let checkpoint = self.pos;
        let name = if matches!(self.peek().kind, TokenKind::Identifier(_)) {
            let candidate = self.parse_identifier();
            if self.eat_punct(Punctuation::Colon) {
                Some(candidate)
            } else {
                self.pos = checkpoint;
                None
            }
        } else {
            None
        };
        let type_expr = self.parse_expr();
        let end = self.prev_end();
        let node = self.alloc(NodeKind::UnionVariant(UnionVariantNode { name, type_expr, decorators }), start, end);
        self.attach_directives(node, directives);
        node
    }

    fn parse_enum(&mut self, decorators: Vec<NodeId>) -> NodeId {
        let start = self.current_span().pos;
        self.advance(); // 'enum'
        let name = self.parse_identifier();
        let members = self.parse_delimited_list(
            Punctuation::OpenBrace,
            Punctuation::CloseBrace,
            Punctuation::Comma,
            Some(Punctuation::Semicolon),
            true,
            false,
            |p| p.parse_enum_member(),
        );
        let end = self.prev_end();
        self.alloc(NodeKind::Enum(EnumNode { name, members, decorators }), start, end)
    }

    fn parse_enum_member(&mut self) -> NodeId {
        let (directives, decorators) = self.collect_leading_annotations();
        let start = self.current_span().pos;
        let name = self.parse_property_name();
        let value = if self.eat_punct(Punctuation::Colon) { Some(self.parse_expr()) } else { None };
        let end = self.prev_end();
        let node = self.alloc(NodeKind::EnumMember(EnumMemberNode { name, value, decorators }), start, end);
        self.attach_directives(node, directives);
        node
    }

    fn parse_alias(&mut self, decorators: Vec<NodeId>) -> NodeId {
        let start = self.current_span().pos;
        if !decorators.is_empty() {
            let span = self.current_span();
            self.error_at(span, DiagnosticCode::InvalidDecoratorLocation, "Decorators are not valid on an alias.");
        }
        self.advance(); // 'alias'
        let name = self.parse_identifier();
        let template_params = self.parse_template_params();
        self.expect_punct(Punctuation::Equals, "=");
        let value = self.parse_expr();
        self.eat_punct(Punctuation::Semicolon);
        let end = self.prev_end();
        self.alloc(NodeKind::Alias(AliasNode { name, template_params, value }), start, end)
    }

    // ---- expression grammar -----------------------------------------------
    // union (`|`) -> intersection (`&`) -> postfix array suffix (`[]`) ->
    // primary (reference w/ `<..>`, literal, model expression, tuple,
    // parenthesized).

    fn parse_expr(&mut self) -> NodeId {
        self.parse_union_expr()
    }

    fn parse_union_expr(&mut self) -> NodeId {
        let mut left = self.parse_intersection_expr();
        while self.at_punct(Punctuation::Bar) {
            self.advance();
            let right = self.parse_intersection_expr();
            let start = self.nodes[left.0 as usize].pos;
            let end = self.nodes[right.0 as usize].end;
            left = self.alloc(NodeKind::UnionExpr(UnionExprNode { left, right }), start, end);
        }
        left
    }

    fn parse_intersection_expr(&mut self) -> NodeId {
        let mut left = self.parse_array_expr();
        while self.at_punct(Punctuation::Ampersand) {
            self.advance();
            let right = self.parse_array_expr();
            let start = self.nodes[left.0 as usize].pos;
            let end = self.nodes[right.0 as usize].end;
            left = self.alloc(NodeKind::IntersectionExpr(IntersectionExprNode { left, right }), start, end);
        }
        left
    }

    fn parse_array_expr(&mut self) -> NodeId {
        let mut expr = self.parse_primary_expr();
        while self.at_punct(Punctuation::OpenBracket) {
            let start = self.nodes[expr.0 as usize].pos;
            self.advance();
            self.expect_punct(Punctuation::CloseBracket, "]");
            let end = self.prev_end();
            expr = self.alloc(NodeKind::ArrayExpr(ArrayExprNode { element: expr }), start, end);
        }
        expr
    }

    fn parse_primary_expr(&mut self) -> NodeId {
        let span = self.current_span();
        match self.peek().kind.clone() {
            TokenKind::StringLiteral(value) => {
                self.advance();
                self.alloc(NodeKind::StringLiteral(StringLiteralNode { value }), span.pos, span.end)
            }
            TokenKind::NumericLiteral(raw) => {
                self.advance();
                self.alloc(NodeKind::NumericLiteral(NumericLiteralNode { raw }), span.pos, span.end)
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                self.alloc(NodeKind::BooleanLiteral(BooleanLiteralNode { value: true }), span.pos, span.end)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                self.alloc(NodeKind::BooleanLiteral(BooleanLiteralNode { value: false }), span.pos, span.end)
            }
            TokenKind::Punctuation(Punctuation::OpenBrace) => self.parse_model_expression(),
            TokenKind::Punctuation(Punctuation::OpenBracket) => self.parse_tuple_expression(),
            TokenKind::Punctuation(Punctuation::OpenParen) => {
                self.advance();
                let inner = self.parse_expr();
                self.expect_punct(Punctuation::CloseParen, ")");
                inner
            }
            TokenKind::Identifier(_) => self.parse_reference_expr(),
            _ => {
                self.error_at(span, DiagnosticCode::MissingToken, "Expected a type expression.");
                self.synthetic_identifier(span.pos)
            }
        }
    }

    fn parse_reference_expr(&mut self) -> NodeId {
        let start = self.current_span().pos;
        let mut target = self.parse_identifier();
        while self.at_punct(Punctuation::Dot) {
            self.advance();
            let member = self.parse_identifier();
            let end = self.prev_end();
            target = self.alloc(NodeKind::MemberExpr(MemberExprNode { base: target, member }), start, end);
        }
        let args = if self.at_punct(Punctuation::LessThan) {
            self.parse_delimited_list(
                Punctuation::LessThan,
                Punctuation::GreaterThan,
                Punctuation::Comma,
                None,
                false,
                true,
                |p| p.parse_expr(),
            )
        } else {
            Vec::new()
        };
        let end = self.prev_end();
        self.alloc(NodeKind::TypeReference(TypeReferenceNode { target, args }), start, end)
    }

    fn parse_model_expression(&mut self) -> NodeId {
        let start = self.current_span().pos;
        let members = self.parse_model_body();
        let end = self.prev_end();
        self.alloc(
            NodeKind::Model(ModelNode {
                name: None,
                template_params: Vec::new(),
                extends: None,
                is_clause: None,
                members,
                decorators: Vec::new(),
            }),
            start,
            end,
        )
    }

    fn parse_tuple_expression(&mut self) -> NodeId {
        let start = self.current_span().pos;
        let elements = self.parse_delimited_list(
            Punctuation::OpenBracket,
            Punctuation::CloseBracket,
            Punctuation::Comma,
            None,
            true,
            true,
            |p| p.parse_expr(),
        );
        let end = self.prev_end();
        self.alloc(NodeKind::TupleExpr(TupleExprNode { elements }), start, end)
    }
}

fn punct_name(p: Punctuation) -> &'static str {
    use Punctuation::*;
    match p {
        OpenBrace => "{",
        CloseBrace => "}",
        OpenParen => "(",
        CloseParen => ")",
        OpenBracket => "[",
        CloseBracket => "]",
        LessThan => "<",
        GreaterThan => ">",
        Comma => ",",
        Semicolon => ";",
        Colon => ":",
        Dot => ".",
        Ellipsis => "...",
        Question => "?",
        Equals => "=",
        Bar => "|",
        Ampersand => "&",
        At => "@",
        Hash => "#",
        Star => "*",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_members(tree: &SyntaxTree, name: &str) -> Vec<String> {
        for (_, node) in tree.iter() {
            if let NodeKind::Model(m) = &node.kind {
                if let Some(n) = m.name {
                    if let NodeKind::Identifier(id) = &tree.get(n).kind {
                        if id.text == name {
                            return m
                                .members
                                .iter()
                                .filter_map(|&id| match &tree.get(id).kind {
                                    NodeKind::ModelProperty(p) => match &tree.get(p.name).kind {
                                        NodeKind::Identifier(i) => Some(i.text.clone()),
                                        _ => None,
                                    },
                                    _ => None,
                                })
                                .collect();
                        }
                    }
                }
            }
        }
        Vec::new()
    }

    #[test]
    fn parses_simple_model() {
        let r = parse("t.cadl", "model Foo { x: int32, y?: string }");
        assert!(r.diagnostics.is_empty());
        assert_eq!(model_members(&r.tree, "Foo"), vec!["x", "y"]);
    }

    #[test]
    fn recovers_from_missing_closing_brace() {
        let r = parse("t.cadl", "model Foo { x: int32");
        assert!(!r.diagnostics.is_empty());
        assert!(!r.tree.printable);
        assert_eq!(model_members(&r.tree, "Foo"), vec!["x"]);
    }

    #[test]
    fn dotted_namespace_desugars_to_nested_chain() {
        let r = parse("t.cadl", "namespace A.B.C { model X {} }");
        let NodeKind::Script(script) = &r.tree.get(r.tree.root).kind else { unreachable!() };
        let outer = r.tree.get(script.statements[0]);
        let NodeKind::Namespace(a) = &outer.kind else { panic!() };
        assert_eq!(name_of(&r.tree, a.name), "A");
        let NodeKind::Namespace(b) = &r.tree.get(a.body.as_ref().unwrap()[0]).kind else { panic!() };
        assert_eq!(name_of(&r.tree, b.name), "B");
    }

    #[test]
    fn blockless_namespace_consumes_rest_of_file() {
        let r = parse("t.cadl", "namespace N;\nmodel X {}");
        assert!(r.diagnostics.is_empty());
        let NodeKind::Script(script) = &r.tree.get(r.tree.root).kind else { unreachable!() };
        assert_eq!(script.statements.len(), 1);
    }

    #[test]
    fn decorator_and_directive_attach_to_next_statement() {
        let r = parse("t.cadl", "#suppress some-code\n@mark\nmodel Foo {}");
        let NodeKind::Script(script) = &r.tree.get(r.tree.root).kind else { unreachable!() };
        let stmt = r.tree.get(script.statements[0]);
        assert_eq!(stmt.directives.len(), 1);
        let NodeKind::Model(m) = &stmt.kind else { panic!() };
        assert_eq!(m.decorators.len(), 1);
    }

    #[test]
    fn union_and_intersection_precedence() {
        let r = parse("t.cadl", "alias X = A & B | C;");
        let NodeKind::Script(script) = &r.tree.get(r.tree.root).kind else { unreachable!() };
        let NodeKind::Alias(a) = &r.tree.get(script.statements[0]).kind else { panic!() };
        let NodeKind::UnionExpr(u) = &r.tree.get(a.value).kind else { panic!("expected union at top level") };
        assert!(matches!(r.tree.get(u.left).kind, NodeKind::IntersectionExpr(_)));
    }

    fn name_of(tree: &SyntaxTree, id: NodeId) -> String {
        match &tree.get(id).kind {
            NodeKind::Identifier(i) => i.text.clone(),
            _ => panic!("not an identifier"),
        }
    }
}
