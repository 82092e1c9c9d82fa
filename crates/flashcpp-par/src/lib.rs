//! flashcpp-par - turns a token stream into an AST plus the symbol,
//! namespace, and template tables the parser builds incrementally while it
//! walks the source (§4.2-§4.4).
//!
//! Semantic analysis (overload resolution, type checking, constexpr
//! evaluation) is not this crate's job; the parser only needs enough
//! bookkeeping to know what a name refers to syntactically - is it a type,
//! is it a template, which scope declared it - so that expressions like
//! `T * p` parse as a declaration when `T` is a type and a multiplication
//! otherwise.

pub mod ast;
mod expr;
mod items;
mod pattern;
mod registry;
mod stmt;
mod types;

use flashcpp_lex::{Keyword, Lexer, LexerPosition, OperatorKind, PunctuatorKind, Token, TokenKind};
use flashcpp_util::{Handler, Span, StringHandle, StringInterner};

pub use ast::*;
pub use registry::{
    NamespaceEntry, NamespaceRegistry, Scope, ScopeKind, SpecializationRank, SymbolTable,
    TemplateArgExtension, TemplateEntry, TemplateInstantiationKey, TemplateRegistry,
    TemplateSpecialization, MAX_INSTANTIATION_DEPTH,
};

/// Parses one translation unit, building the [`Ast`] plus the registries
/// needed for subsequent semantic analysis.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    pub ast: Ast,
    pub symbols: SymbolTable,
    pub namespaces: NamespaceRegistry,
    pub templates: TemplateRegistry,

    /// Nesting depth of `<...>` template argument lists currently open;
    /// the lexer's `>>`-splitting mode is on whenever this is nonzero.
    template_arg_depth: u32,
    /// True while parsing the body of a class template member - bodies are
    /// not parsed eagerly there, only skipped and recorded as a
    /// [`DeferredBody`] for later re-parsing once template parameters are
    /// bound (§4.4).
    in_class_template: bool,
    /// Enclosing namespace names, outermost first, used to build the
    /// fully-qualified handle `NamespaceRegistry` keys on (§4.3).
    namespace_path: Vec<StringHandle>,
}

/// Everything a completed parse produced: the AST plus the three registries
/// it populated along the way.
pub struct ParseOutput {
    pub ast: Ast,
    pub symbols: SymbolTable,
    pub namespaces: NamespaceRegistry,
    pub templates: TemplateRegistry,
}

/// Snapshot of parser state for a trial parse that may be abandoned
/// (SFINAE-by-trial-parse, §4.4). Restoring replays neither lexer input nor
/// emitted diagnostics: `rollback` is two O(1) resets.
pub struct TrialCheckpoint {
    position: LexerPosition,
    diagnostic_len: usize,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, handler: &'a mut Handler, interner: &'a mut StringInterner) -> Self {
        Self {
            lexer: Lexer::new(source, handler, interner),
            ast: Ast::new(),
            symbols: SymbolTable::new(),
            namespaces: NamespaceRegistry::new(),
            templates: TemplateRegistry::new(),
            template_arg_depth: 0,
            in_class_template: false,
            namespace_path: Vec::new(),
        }
    }

    /// Parses the whole translation unit, consuming `self`. A declaration
    /// that fails to parse does not abort the unit: the parser resyncs at
    /// the next top-level `;` or matching `}` and keeps going, so a single
    /// malformed declaration yields one error instead of a cascade.
    pub fn parse(self) -> Ast {
        self.parse_unit().ast
    }

    /// Like [`Parser::parse`], but also hands back the symbol, namespace,
    /// and template registries the parse built up - semantic analysis needs
    /// all three, not just the AST (§3.4: "parser + code generator run
    /// interleaved").
    pub fn parse_unit(mut self) -> ParseOutput {
        while !self.at_eof() {
            match self.parse_declaration() {
                Some(decl) => self.ast.top_level.push(decl),
                None => self.resync_to_next_declaration(),
            }
        }
        ParseOutput {
            ast: self.ast,
            symbols: self.symbols,
            namespaces: self.namespaces,
            templates: self.templates,
        }
    }

    // ---- token access -----------------------------------------------

    pub(crate) fn current(&mut self) -> Token {
        self.lexer.peek(0).clone()
    }

    pub(crate) fn peek_kind(&mut self, k: usize) -> TokenKind {
        self.lexer.peek(k).kind.clone()
    }

    pub(crate) fn current_span(&mut self) -> Span {
        self.lexer.peek(0).span
    }

    pub(crate) fn at_eof(&mut self) -> bool {
        matches!(self.lexer.peek(0).kind, TokenKind::Eof)
    }

    pub(crate) fn advance(&mut self) -> Token {
        self.lexer.consume()
    }

    pub(crate) fn check_kw(&mut self, kw: Keyword) -> bool {
        matches!(self.lexer.peek(0).kind, TokenKind::Keyword(k) if k == kw)
    }

    pub(crate) fn eat_kw(&mut self, kw: Keyword) -> bool {
        if self.check_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check_punct(&mut self, p: PunctuatorKind) -> bool {
        matches!(self.lexer.peek(0).kind, TokenKind::Punctuator(k) if k == p)
    }

    pub(crate) fn eat_punct(&mut self, p: PunctuatorKind) -> bool {
        if self.check_punct(p) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check_op(&mut self, o: OperatorKind) -> bool {
        matches!(self.lexer.peek(0).kind, TokenKind::Operator(k) if k == o)
    }

    pub(crate) fn eat_op(&mut self, o: OperatorKind) -> bool {
        if self.check_op(o) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check_ident(&mut self) -> bool {
        matches!(self.lexer.peek(0).kind, TokenKind::Identifier(_))
    }

    pub(crate) fn expect_ident(&mut self) -> Option<StringHandle> {
        match self.lexer.peek(0).kind.clone() {
            TokenKind::Identifier(handle) => {
                self.advance();
                Some(handle)
            }
            _ => {
                self.error("expected an identifier");
                None
            }
        }
    }

    pub(crate) fn expect_punct(&mut self, p: PunctuatorKind, what: &str) -> Option<()> {
        if self.eat_punct(p) {
            Some(())
        } else {
            self.error(&format!("expected '{}'", what));
            None
        }
    }

    pub(crate) fn expect_kw(&mut self, kw: Keyword, what: &str) -> Option<()> {
        if self.eat_kw(kw) {
            Some(())
        } else {
            self.error(&format!("expected '{}'", what));
            None
        }
    }

    pub(crate) fn expect_op(&mut self, op: OperatorKind) -> Option<()> {
        if self.eat_op(op) {
            Some(())
        } else {
            self.error("expected an operator");
            None
        }
    }

    pub(crate) fn error(&mut self, message: &str) {
        let span = self.current_span();
        self.lexer.handler.build_error(span, message.to_string()).emit(self.lexer.handler);
    }

    pub(crate) fn intern(&mut self, text: &str) -> StringHandle {
        self.lexer.interner.intern(text)
    }

    /// `override` and `final` carry meaning only in a member-declarator
    /// tail and are otherwise ordinary identifiers, so the lexer doesn't
    /// reserve them; match by spelling and consume only on a hit.
    pub(crate) fn eat_contextual_keyword(&mut self, text: &str) -> bool {
        if let TokenKind::Identifier(handle) = self.lexer.peek(0).kind {
            if self.lexer.interner.resolve(handle) == text {
                self.advance();
                return true;
            }
        }
        false
    }

    // ---- template argument list mode ---------------------------------

    /// Entered while parsing a `<...>` template argument list so the lexer
    /// splits `>>` into two `>` tokens. Depth-counted so a nested
    /// template-id inside the argument list doesn't prematurely turn the
    /// mode off when it closes its own `<...>`.
    pub(crate) fn enter_template_arg_mode(&mut self) {
        self.template_arg_depth += 1;
        self.lexer.set_template_arg_mode(true);
    }

    pub(crate) fn exit_template_arg_mode(&mut self) {
        self.template_arg_depth = self.template_arg_depth.saturating_sub(1);
        if self.template_arg_depth == 0 {
            self.lexer.set_template_arg_mode(false);
        }
    }

    // ---- SFINAE trial parse --------------------------------------------

    /// Snapshots lexer position and diagnostic count so a speculative parse
    /// (substituting template arguments to see whether a candidate
    /// overload is viable) can be thrown away without a trace if it fails.
    pub(crate) fn begin_trial(&mut self) -> TrialCheckpoint {
        TrialCheckpoint {
            position: self.lexer.save_position(),
            diagnostic_len: self.lexer.handler.len(),
        }
    }

    /// Discards the trial: rewinds the lexer and drops every diagnostic
    /// emitted since `begin_trial`, leaving the handler as if the trial had
    /// never been attempted.
    pub(crate) fn rollback_trial(&mut self, checkpoint: TrialCheckpoint) {
        self.lexer.restore_position(checkpoint.position);
        self.lexer.handler.truncate(checkpoint.diagnostic_len);
    }

    /// Keeps the trial's side effects: the parse succeeded so its tokens
    /// and diagnostics stand.
    pub(crate) fn commit_trial(&mut self, _checkpoint: TrialCheckpoint) {}

    /// True if the checkpoint captured zero errors, i.e. the region parsed
    /// since then is well-formed.
    pub(crate) fn trial_clean(&self, checkpoint: &TrialCheckpoint) -> bool {
        self.lexer.handler.len() == checkpoint.diagnostic_len
    }

    // ---- deferred template bodies ---------------------------------------

    /// Skips a balanced `{ ... }` block without building statements,
    /// recording the token range so the body can be re-parsed once the
    /// enclosing template's parameters are bound (§4.4). Assumes the
    /// opening `{` has already been consumed.
    pub(crate) fn skip_deferred_body(&mut self) -> DeferredBody {
        let start = self.lexer.save_position();
        let mut depth: u32 = 1;
        while depth > 0 && !self.at_eof() {
            if self.check_punct(PunctuatorKind::LBrace) {
                depth += 1;
            } else if self.check_punct(PunctuatorKind::RBrace) {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            self.advance();
        }
        let end = self.lexer.save_position();
        self.eat_punct(PunctuatorKind::RBrace);
        DeferredBody { start, end }
    }

    /// Re-parses a previously deferred function body at the lexer position
    /// it was recorded at. The caller (semantic analysis, during template
    /// instantiation) is responsible for restoring the lexer afterward if
    /// it needs to keep parsing past the deferred region.
    pub fn parse_deferred_body(&mut self, body: DeferredBody) -> Option<StmtId> {
        let resume = self.lexer.save_position();
        self.lexer.restore_position(body.start);
        let block = self.parse_block_stmt();
        self.lexer.restore_position(resume);
        block
    }

    pub(crate) fn enter_class_template(&mut self) -> bool {
        std::mem::replace(&mut self.in_class_template, true)
    }

    pub(crate) fn restore_class_template(&mut self, previous: bool) {
        self.in_class_template = previous;
    }

    pub(crate) fn is_in_class_template(&self) -> bool {
        self.in_class_template
    }

    // ---- namespace path ------------------------------------------------

    pub(crate) fn push_namespace(&mut self, name: StringHandle) {
        self.namespace_path.push(name);
    }

    pub(crate) fn pop_namespace(&mut self) {
        self.namespace_path.pop();
    }

    /// Interns `a::b::c` for the current namespace path plus `name`, so
    /// `NamespaceRegistry` lookups cost one hash probe rather than one per
    /// segment (§4.3).
    pub(crate) fn qualify_with_namespace(&mut self, name: StringHandle) -> StringHandle {
        if self.namespace_path.is_empty() {
            return name;
        }
        let mut text = String::new();
        for segment in &self.namespace_path {
            text.push_str(self.lexer.interner.resolve(*segment));
            text.push_str("::");
        }
        text.push_str(self.lexer.interner.resolve(name));
        self.intern(&text)
    }

    // ---- error recovery ------------------------------------------------

    /// After a failed top-level declaration, skip tokens until a `;` (the
    /// usual declaration terminator) or a `}` that closes back past the
    /// current brace depth, then stop so the next `parse_declaration` call
    /// starts clean.
    pub(crate) fn resync_to_next_declaration(&mut self) {
        let mut depth: i32 = 0;
        loop {
            if self.at_eof() {
                return;
            }
            if depth == 0 && self.check_punct(PunctuatorKind::Semi) {
                self.advance();
                return;
            }
            if self.check_punct(PunctuatorKind::LBrace) {
                depth += 1;
            } else if self.check_punct(PunctuatorKind::RBrace) {
                if depth == 0 {
                    self.advance();
                    return;
                }
                depth -= 1;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod edge_cases;
