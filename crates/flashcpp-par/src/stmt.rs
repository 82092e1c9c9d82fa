//! Statement parsing: compound statements, selection/iteration statements,
//! jump statements, try/catch, and the declaration-vs-expression-statement
//! disambiguation a statement starting with an identifier requires (§4.2).

use flashcpp_lex::{Keyword, OperatorKind, PunctuatorKind, TokenKind};

use crate::ast::*;
use crate::registry::ScopeKind;
use crate::Parser;

impl<'a> Parser<'a> {
    /// Parses one statement, including a trailing declaration statement's
    /// `;` where applicable - the caller never needs to consume it itself.
    pub fn parse_stmt(&mut self) -> Option<StmtId> {
        let span_start = self.current_span();

        if self.check_punct(PunctuatorKind::LBrace) {
            self.advance();
            let body = self.parse_block_after_brace()?;
            return Some(body);
        }
        if self.check_kw(Keyword::If) {
            return self.parse_if_stmt();
        }
        if self.check_kw(Keyword::Switch) {
            return self.parse_switch_stmt();
        }
        if self.check_kw(Keyword::For) {
            return self.parse_for_stmt();
        }
        if self.check_kw(Keyword::While) {
            return self.parse_while_stmt();
        }
        if self.check_kw(Keyword::Do) {
            return self.parse_do_while_stmt();
        }
        if self.eat_kw(Keyword::Return) {
            let value = if self.check_punct(PunctuatorKind::Semi) { None } else { self.parse_expr() };
            self.expect_punct(PunctuatorKind::Semi, ";")?;
            let span = self.span_from(span_start);
            return Some(self.ast.push_stmt(StmtKind::Return(value), span));
        }
        if self.eat_kw(Keyword::Break) {
            self.expect_punct(PunctuatorKind::Semi, ";")?;
            let span = self.span_from(span_start);
            return Some(self.ast.push_stmt(StmtKind::Break, span));
        }
        if self.eat_kw(Keyword::Continue) {
            self.expect_punct(PunctuatorKind::Semi, ";")?;
            let span = self.span_from(span_start);
            return Some(self.ast.push_stmt(StmtKind::Continue, span));
        }
        if self.eat_kw(Keyword::Goto) {
            let label = self.expect_ident()?;
            self.expect_punct(PunctuatorKind::Semi, ";")?;
            let span = self.span_from(span_start);
            return Some(self.ast.push_stmt(StmtKind::Goto(label), span));
        }
        if self.check_kw(Keyword::Try) {
            return self.parse_try_stmt();
        }
        if self.check_punct(PunctuatorKind::Semi) {
            self.advance();
            let span = self.span_from(span_start);
            return Some(self.ast.push_stmt(StmtKind::Empty, span));
        }

        // `identifier ':' ...` not followed by `::` is a label.
        if self.check_ident() {
            if let TokenKind::Punctuator(PunctuatorKind::Colon) = self.peek_kind(1) {
                let name = self.expect_ident()?;
                self.advance(); // ':'
                let stmt = self.parse_stmt()?;
                let span = self.span_from(span_start);
                return Some(self.ast.push_stmt(StmtKind::Label { name, stmt }, span));
            }
        }

        if self.starts_declaration() {
            let decl = self.parse_simple_declaration()?;
            let span = self.span_from(span_start);
            return Some(self.ast.push_stmt(StmtKind::Declaration(decl), span));
        }

        let expr = self.parse_expr()?;
        self.expect_punct(PunctuatorKind::Semi, ";")?;
        let span = self.span_from(span_start);
        Some(self.ast.push_stmt(StmtKind::ExpressionStmt(expr), span))
    }

    /// A statement begins a declaration if it opens with a builtin-type
    /// keyword, a storage-class/cv keyword, `auto`, or a name the symbol
    /// table already knows to be a type. An unresolved identifier defaults
    /// to being treated as an expression, matching this subset's choice not
    /// to do full name lookup during parsing for every bare identifier.
    fn starts_declaration(&mut self) -> bool {
        if matches!(
            self.peek_kind(0),
            TokenKind::Keyword(
                Keyword::Const
                    | Keyword::Volatile
                    | Keyword::Static
                    | Keyword::Extern
                    | Keyword::ThreadLocal
                    | Keyword::Mutable
                    | Keyword::Constexpr
                    | Keyword::Auto
                    | Keyword::Void
                    | Keyword::Bool
                    | Keyword::Char
                    | Keyword::Char8T
                    | Keyword::Char16T
                    | Keyword::Char32T
                    | Keyword::WcharT
                    | Keyword::Short
                    | Keyword::Int
                    | Keyword::Long
                    | Keyword::Float
                    | Keyword::Double
                    | Keyword::Signed
                    | Keyword::Unsigned
                    | Keyword::Struct
                    | Keyword::Class
                    | Keyword::Union
                    | Keyword::Enum
            )
        ) {
            return true;
        }
        if let TokenKind::Identifier(name) = self.peek_kind(0) {
            return self.symbols.lookup(name).is_some_and(|decl| self.decl_is_type(decl));
        }
        false
    }

    fn decl_is_type(&self, decl: DeclId) -> bool {
        matches!(self.ast.decls[decl].kind, DeclKind::Record(_) | DeclKind::Enum(_) | DeclKind::UsingAlias(_))
    }

    /// A declaration-statement: storage classes, a type-specifier, and one
    /// or more declarators (possibly with initializers), `;`-terminated.
    fn parse_simple_declaration(&mut self) -> Option<DeclId> {
        let span_start = self.current_span();
        let storage = self.parse_storage_class();
        let is_constexpr = self.eat_kw(Keyword::Constexpr);
        let ty = self.parse_type_spec()?;

        if matches!(self.ast.type_specs[ty].kind, TypeSpecKind::Auto) && self.check_punct(PunctuatorKind::LBracket) {
            return self.parse_structured_binding_decl(ty, storage, is_constexpr, span_start);
        }

        let name = self.expect_ident()?;
        let (ty, init) = self.parse_declarator_tail(ty)?;

        self.expect_punct(PunctuatorKind::Semi, ";")?;

        let span = self.span_from(span_start);
        let decl = self.ast.push_decl(
            DeclKind::Variable(VariableDecl {
                name,
                ty,
                init,
                storage,
                is_constexpr,
                structured_bindings: Vec::new(),
            }),
            span,
        );
        self.symbols.declare(name, decl);
        Some(decl)
    }

    /// `auto [a, b] = pair;` - the bound names all resolve to the same
    /// declaration node since they share one initializer and storage
    /// duration; a later semantic pass splits out each binding's type.
    fn parse_structured_binding_decl(
        &mut self,
        ty: TypeSpecId,
        storage: StorageClass,
        is_constexpr: bool,
        span_start: flashcpp_util::Span,
    ) -> Option<DeclId> {
        let names = self.parse_structured_binding_list()?;
        self.expect_op(OperatorKind::Assign)?;
        let init = self.parse_assignment_expr()?;
        self.expect_punct(PunctuatorKind::Semi, ";")?;

        let span = self.span_from(span_start);
        let decl = self.ast.push_decl(
            DeclKind::Variable(VariableDecl {
                name: names[0],
                ty,
                init: Some(init),
                storage,
                is_constexpr,
                structured_bindings: names.clone(),
            }),
            span,
        );
        for name in names {
            self.symbols.declare(name, decl);
        }
        Some(decl)
    }

    pub(crate) fn parse_storage_class(&mut self) -> StorageClass {
        if self.eat_kw(Keyword::Static) {
            StorageClass::Static
        } else if self.eat_kw(Keyword::Extern) {
            StorageClass::Extern
        } else if self.eat_kw(Keyword::ThreadLocal) {
            StorageClass::ThreadLocal
        } else if self.eat_kw(Keyword::Mutable) {
            StorageClass::Mutable
        } else {
            StorageClass::None
        }
    }

    /// Parses the `[]`-array-suffix-then-initializer tail of a declarator.
    /// Array suffixes here (rather than in `parse_type_spec`) so
    /// `int a[3], b;` declares `b` as plain `int`.
    pub(crate) fn parse_declarator_tail(&mut self, base_ty: TypeSpecId) -> Option<(TypeSpecId, Option<ExprId>)> {
        let mut ty = base_ty;
        while self.check_punct(PunctuatorKind::LBracket) {
            let span_start = self.current_span();
            self.advance();
            let size = if self.check_punct(PunctuatorKind::RBracket) { None } else { self.parse_expr() };
            self.expect_punct(PunctuatorKind::RBracket, "]")?;
            let span = self.span_from(span_start);
            ty = self.ast.push_type_spec(TypeSpecKind::Array { element: ty, size }, span);
        }

        let init = if self.eat_op(OperatorKind::Assign) {
            self.parse_assignment_expr()
        } else if self.check_punct(PunctuatorKind::LParen) {
            self.advance();
            let span_start = self.current_span();
            let args = self.parse_ctor_args()?;
            self.expect_punct(PunctuatorKind::RParen, ")")?;
            let span = self.span_from(span_start);
            Some(self.ast.push_expr(ExprKind::Constructor { type_spec: ty, args }, span))
        } else if self.check_punct(PunctuatorKind::LBrace) {
            self.advance();
            let span_start = self.current_span();
            let args = self.parse_brace_init_args()?;
            self.expect_punct(PunctuatorKind::RBrace, "}")?;
            let span = self.span_from(span_start);
            Some(self.ast.push_expr(ExprKind::Constructor { type_spec: ty, args }, span))
        } else {
            None
        };

        Some((ty, init))
    }

    fn parse_ctor_args(&mut self) -> Option<Vec<ExprId>> {
        let mut args = Vec::new();
        if self.check_punct(PunctuatorKind::RParen) {
            return Some(args);
        }
        loop {
            args.push(self.parse_assignment_expr()?);
            if !self.eat_punct(PunctuatorKind::Comma) {
                break;
            }
        }
        Some(args)
    }

    fn parse_brace_init_args(&mut self) -> Option<Vec<ExprId>> {
        let mut args = Vec::new();
        if self.check_punct(PunctuatorKind::RBrace) {
            return Some(args);
        }
        loop {
            args.push(self.parse_assignment_expr()?);
            if !self.eat_punct(PunctuatorKind::Comma) {
                break;
            }
        }
        Some(args)
    }

    /// Parses statements until the matching `}`, assuming the opening `{`
    /// has already been consumed by the caller.
    pub(crate) fn parse_block_after_brace(&mut self) -> Option<StmtId> {
        let span_start = self.current_span();
        self.symbols.push_scope(ScopeKind::Block);

        let mut stmts = Vec::new();
        while !self.at_eof() && !self.check_punct(PunctuatorKind::RBrace) {
            match self.parse_stmt() {
                Some(s) => stmts.push(s),
                None => self.resync_to_stmt_boundary(),
            }
        }
        self.symbols.pop_scope();
        self.expect_punct(PunctuatorKind::RBrace, "}")?;

        let span = self.span_from(span_start);
        Some(self.ast.push_stmt(StmtKind::Block(stmts), span))
    }

    /// Entry point used when re-entering a [`DeferredBody`] at its recorded
    /// start position: the lexer is already positioned right after the
    /// opening `{`.
    pub(crate) fn parse_block_stmt(&mut self) -> Option<StmtId> {
        self.parse_block_after_brace()
    }

    fn resync_to_stmt_boundary(&mut self) {
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
                    return;
                }
                depth -= 1;
            }
            self.advance();
        }
    }

    fn parse_if_stmt(&mut self) -> Option<StmtId> {
        let span_start = self.current_span();
        self.advance();
        self.expect_punct(PunctuatorKind::LParen, "(")?;
        let cond = self.parse_expr()?;
        self.expect_punct(PunctuatorKind::RParen, ")")?;
        let then_branch = self.parse_stmt()?;
        let else_branch = if self.eat_kw(Keyword::Else) { Some(self.parse_stmt()?) } else { None };
        let span = self.span_from(span_start);
        Some(self.ast.push_stmt(StmtKind::If { cond, then_branch, else_branch }, span))
    }

    fn parse_switch_stmt(&mut self) -> Option<StmtId> {
        let span_start = self.current_span();
        self.advance();
        self.expect_punct(PunctuatorKind::LParen, "(")?;
        let cond = self.parse_expr()?;
        self.expect_punct(PunctuatorKind::RParen, ")")?;

        self.expect_punct(PunctuatorKind::LBrace, "{")?;
        let body_span_start = self.current_span();
        self.symbols.push_scope(ScopeKind::Block);

        let mut stmts = Vec::new();
        let mut cases = Vec::new();
        while !self.at_eof() && !self.check_punct(PunctuatorKind::RBrace) {
            if self.eat_kw(Keyword::Case) {
                let value = self.parse_expr()?;
                self.expect_punct(PunctuatorKind::Colon, ":")?;
                cases.push(SwitchCase { value: Some(value), stmt_index: stmts.len() });
                continue;
            }
            if self.eat_kw(Keyword::Default) {
                self.expect_punct(PunctuatorKind::Colon, ":")?;
                cases.push(SwitchCase { value: None, stmt_index: stmts.len() });
                continue;
            }
            match self.parse_stmt() {
                Some(s) => stmts.push(s),
                None => self.resync_to_stmt_boundary(),
            }
        }
        self.symbols.pop_scope();
        self.expect_punct(PunctuatorKind::RBrace, "}")?;
        let body_span = self.span_from(body_span_start);
        let body = self.ast.push_stmt(StmtKind::Block(stmts), body_span);

        let span = self.span_from(span_start);
        Some(self.ast.push_stmt(StmtKind::Switch { cond, body, cases }, span))
    }

    fn parse_for_stmt(&mut self) -> Option<StmtId> {
        let span_start = self.current_span();
        self.advance();
        self.expect_punct(PunctuatorKind::LParen, "(")?;
        self.symbols.push_scope(ScopeKind::Block);

        // Range-based for: `for ( type-spec name : range ) stmt`. Decided
        // by trying a declarator then checking for `:` rather than `;`.
        let checkpoint = self.begin_trial();
        if self.starts_declaration() {
            if let Some(decl) = self.try_parse_range_for_decl() {
                if self.eat_punct(PunctuatorKind::Colon) {
                    self.commit_trial(checkpoint);
                    let range = self.parse_expr()?;
                    self.expect_punct(PunctuatorKind::RParen, ")")?;
                    let body = self.parse_stmt()?;
                    self.symbols.pop_scope();
                    let span = self.span_from(span_start);
                    return Some(self.ast.push_stmt(StmtKind::RangeFor { decl, range, body }, span));
                }
            }
        }
        self.rollback_trial(checkpoint);

        let init = if self.check_punct(PunctuatorKind::Semi) {
            self.advance();
            None
        } else if self.starts_declaration() {
            Some(self.parse_simple_declaration_as_stmt()?)
        } else {
            let e = self.parse_expr()?;
            self.expect_punct(PunctuatorKind::Semi, ";")?;
            let span = self.span_from(span_start);
            Some(self.ast.push_stmt(StmtKind::ExpressionStmt(e), span))
        };

        let cond = if self.check_punct(PunctuatorKind::Semi) { None } else { self.parse_expr() };
        self.expect_punct(PunctuatorKind::Semi, ";")?;
        let step = if self.check_punct(PunctuatorKind::RParen) { None } else { self.parse_expr() };
        self.expect_punct(PunctuatorKind::RParen, ")")?;
        let body = self.parse_stmt()?;
        self.symbols.pop_scope();

        let span = self.span_from(span_start);
        Some(self.ast.push_stmt(StmtKind::For { init, cond, step, body }, span))
    }

    fn parse_simple_declaration_as_stmt(&mut self) -> Option<StmtId> {
        let span_start = self.current_span();
        let decl = self.parse_simple_declaration()?;
        let span = self.span_from(span_start);
        Some(self.ast.push_stmt(StmtKind::Declaration(decl), span))
    }

    fn try_parse_range_for_decl(&mut self) -> Option<DeclId> {
        let span_start = self.current_span();
        let storage = self.parse_storage_class();
        let ty = self.parse_type_spec()?;
        let name = self.expect_ident()?;
        let span = self.span_from(span_start);
        let decl = self.ast.push_decl(
            DeclKind::Variable(VariableDecl {
                name,
                ty,
                init: None,
                storage,
                is_constexpr: false,
                structured_bindings: Vec::new(),
            }),
            span,
        );
        self.symbols.declare(name, decl);
        Some(decl)
    }

    fn parse_while_stmt(&mut self) -> Option<StmtId> {
        let span_start = self.current_span();
        self.advance();
        self.expect_punct(PunctuatorKind::LParen, "(")?;
        let cond = self.parse_expr()?;
        self.expect_punct(PunctuatorKind::RParen, ")")?;
        let body = self.parse_stmt()?;
        let span = self.span_from(span_start);
        Some(self.ast.push_stmt(StmtKind::While { cond, body }, span))
    }

    fn parse_do_while_stmt(&mut self) -> Option<StmtId> {
        let span_start = self.current_span();
        self.advance();
        let body = self.parse_stmt()?;
        self.expect_kw(Keyword::While, "while")?;
        self.expect_punct(PunctuatorKind::LParen, "(")?;
        let cond = self.parse_expr()?;
        self.expect_punct(PunctuatorKind::RParen, ")")?;
        self.expect_punct(PunctuatorKind::Semi, ";")?;
        let span = self.span_from(span_start);
        Some(self.ast.push_stmt(StmtKind::DoWhile { body, cond }, span))
    }

    fn parse_try_stmt(&mut self) -> Option<StmtId> {
        let span_start = self.current_span();
        self.advance();
        self.expect_punct(PunctuatorKind::LBrace, "{")?;
        let try_block = self.parse_block_after_brace()?;

        let mut catches = Vec::new();
        while self.eat_kw(Keyword::Catch) {
            self.expect_punct(PunctuatorKind::LParen, "(")?;
            let param = if self.eat_punct(PunctuatorKind::Ellipsis) {
                None
            } else {
                let ty = self.parse_type_spec()?;
                let name = if self.check_ident() { self.expect_ident() } else { None };
                Some(ParamDecl { name, ty, default: None })
            };
            self.expect_punct(PunctuatorKind::RParen, ")")?;
            self.expect_punct(PunctuatorKind::LBrace, "{")?;
            let body = self.parse_block_after_brace()?;
            catches.push(CatchClause { param, body });
        }

        let span = self.span_from(span_start);
        Some(self.ast.push_stmt(StmtKind::TryCatch { try_block, catches }, span))
    }
}

#[cfg(test)]
mod tests {
    use flashcpp_util::{Handler, StringInterner};

    use super::*;

    fn parse_stmt(src: &str) -> (Option<StmtId>, Ast, bool) {
        let mut handler = Handler::new();
        let mut interner = StringInterner::new();
        let mut parser = Parser::new(src, &mut handler, &mut interner);
        let stmt = parser.parse_stmt();
        (stmt, parser.ast, handler.has_errors())
    }

    #[test]
    fn bare_identifier_parses_as_expression_statement() {
        let (stmt, ast, errors) = parse_stmt("x;");
        assert!(!errors);
        let stmt = stmt.expect("parsed");
        assert!(matches!(ast.stmts[stmt].kind, StmtKind::ExpressionStmt(_)));
    }

    #[test]
    fn builtin_type_keyword_parses_as_declaration() {
        let (stmt, ast, errors) = parse_stmt("int x = 1;");
        assert!(!errors);
        let stmt = stmt.expect("parsed");
        assert!(matches!(ast.stmts[stmt].kind, StmtKind::Declaration(_)));
    }

    #[test]
    fn parses_if_else() {
        let (stmt, ast, errors) = parse_stmt("if (x) y; else z;");
        assert!(!errors);
        let stmt = stmt.expect("parsed");
        match &ast.stmts[stmt].kind {
            StmtKind::If { else_branch, .. } => assert!(else_branch.is_some()),
            _ => panic!("expected an if statement"),
        }
    }

    #[test]
    fn parses_classic_for_loop() {
        let (stmt, ast, errors) = parse_stmt("for (int i = 0; i < 10; i = i + 1) x;");
        assert!(!errors);
        let stmt = stmt.expect("parsed");
        assert!(matches!(ast.stmts[stmt].kind, StmtKind::For { .. }));
    }

    #[test]
    fn parses_range_based_for_loop() {
        let (stmt, ast, errors) = parse_stmt("for (int x : values) y;");
        assert!(!errors);
        let stmt = stmt.expect("parsed");
        assert!(matches!(ast.stmts[stmt].kind, StmtKind::RangeFor { .. }));
    }

    #[test]
    fn parses_structured_binding_declaration() {
        let (stmt, ast, errors) = parse_stmt("auto [a, b] = pair;");
        assert!(!errors);
        let stmt = stmt.expect("parsed");
        let StmtKind::Declaration(decl) = &ast.stmts[stmt].kind else { panic!("expected a declaration") };
        let decl = *decl;
        match &ast.decls[decl].kind {
            DeclKind::Variable(v) => assert_eq!(v.structured_bindings.len(), 2),
            _ => panic!("expected a variable decl"),
        }
    }

    #[test]
    fn parses_try_catch() {
        let (stmt, ast, errors) = parse_stmt("try { f(); } catch (int e) { g(); } catch (...) { h(); }");
        assert!(!errors);
        let stmt = stmt.expect("parsed");
        match &ast.stmts[stmt].kind {
            StmtKind::TryCatch { catches, .. } => assert_eq!(catches.len(), 2),
            _ => panic!("expected a try/catch statement"),
        }
    }
}
