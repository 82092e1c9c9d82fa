//! Declaration parsing: functions (with two-phase template bodies),
//! records, enums, namespaces, using-declarations, templates, and concepts
//! (§4.2-§4.4).

use flashcpp_lex::{Keyword, OperatorKind, PunctuatorKind, TokenKind};

use crate::ast::*;
use crate::registry::ScopeKind;
use crate::Parser;

impl<'a> Parser<'a> {
    /// Top-level (and class-member, and namespace-member) declaration
    /// entry point.
    pub fn parse_declaration(&mut self) -> Option<DeclId> {
        if self.check_kw(Keyword::Namespace) {
            return self.parse_namespace_decl();
        }
        if self.check_kw(Keyword::Using) {
            return self.parse_using_decl();
        }
        if self.check_kw(Keyword::Template) {
            return self.parse_template_decl();
        }
        if self.check_kw(Keyword::Concept) {
            return self.parse_concept_decl(Vec::new());
        }
        if self.check_kw(Keyword::StaticAssert) {
            return self.parse_static_assert();
        }
        if matches!(self.peek_kind(0), TokenKind::Keyword(Keyword::Struct | Keyword::Class | Keyword::Union)) {
            return self.parse_record_decl(Vec::new());
        }
        if self.check_kw(Keyword::Enum) {
            return self.parse_enum_decl();
        }
        if matches!(self.peek_kind(0), TokenKind::Keyword(Keyword::Public | Keyword::Protected | Keyword::Private)) {
            return self.parse_access_specifier();
        }
        self.parse_function_or_variable_decl(Vec::new())
    }

    fn parse_access_specifier(&mut self) -> Option<DeclId> {
        let span_start = self.current_span();
        let spec = if self.eat_kw(Keyword::Public) {
            AccessSpec::Public
        } else if self.eat_kw(Keyword::Protected) {
            AccessSpec::Protected
        } else {
            self.advance();
            AccessSpec::Private
        };
        self.expect_punct(PunctuatorKind::Colon, ":")?;
        let span = self.span_from(span_start);
        Some(self.ast.push_decl(DeclKind::AccessSpecifier(spec), span))
    }

    fn parse_static_assert(&mut self) -> Option<DeclId> {
        let span_start = self.current_span();
        self.advance();
        self.expect_punct(PunctuatorKind::LParen, "(")?;
        let cond = self.parse_assignment_expr()?;
        let message = if self.eat_punct(PunctuatorKind::Comma) {
            match self.peek_kind(0) {
                TokenKind::Str(lit) => {
                    self.advance();
                    Some(lit)
                }
                _ => {
                    self.error("expected a string literal");
                    None
                }
            }
        } else {
            None
        };
        self.expect_punct(PunctuatorKind::RParen, ")")?;
        self.expect_punct(PunctuatorKind::Semi, ";")?;
        let span = self.span_from(span_start);
        Some(self.ast.push_decl(DeclKind::StaticAssert { cond, message }, span))
    }

    fn parse_namespace_decl(&mut self) -> Option<DeclId> {
        let span_start = self.current_span();
        self.advance();
        let name = if self.check_ident() { self.expect_ident() } else { None };

        self.expect_punct(PunctuatorKind::LBrace, "{")?;
        if let Some(n) = name {
            self.push_namespace(n);
        }
        self.symbols.push_scope(ScopeKind::Namespace);

        let mut members = Vec::new();
        while !self.at_eof() && !self.check_punct(PunctuatorKind::RBrace) {
            match self.parse_declaration() {
                Some(decl) => members.push(decl),
                None => self.resync_to_next_declaration(),
            }
        }
        self.symbols.pop_scope();
        self.expect_punct(PunctuatorKind::RBrace, "}")?;

        let span = self.span_from(span_start);
        let decl = self.ast.push_decl(DeclKind::Namespace(NamespaceDecl { name, members }), span);

        if let Some(n) = name {
            // Pop first: `namespace_path` still holds `n` itself at this
            // point, and qualifying against it would double it up.
            self.pop_namespace();
            let qualified = self.qualify_with_namespace(n);
            self.namespaces.register(qualified, decl);
        }
        Some(decl)
    }

    /// `using Name = Type;`, `using Namespace::member;`, or
    /// `using namespace Namespace;`.
    fn parse_using_decl(&mut self) -> Option<DeclId> {
        let span_start = self.current_span();
        self.advance();

        if self.eat_kw(Keyword::Namespace) {
            let qid = self.parse_qualified_id()?;
            self.expect_punct(PunctuatorKind::Semi, ";")?;
            if let Some(last) = qid.segments.last() {
                self.symbols.add_using_directive(last.name);
            }
            let span = self.span_from(span_start);
            return Some(self.ast.push_decl(DeclKind::UsingDirective(qid), span));
        }

        let name = self.expect_ident()?;
        if self.eat_op(OperatorKind::Assign) {
            let ty = self.parse_type_spec()?;
            self.expect_punct(PunctuatorKind::Semi, ";")?;
            let span = self.span_from(span_start);
            let decl = self
                .ast
                .push_decl(DeclKind::UsingAlias(UsingAliasDecl { name, target: UsingTarget::Type(ty) }), span);
            self.symbols.declare(name, decl);
            return Some(decl);
        }

        // `using Base::member;` bringing a name into scope unqualified.
        self.expect_punct(PunctuatorKind::Semi, ";")?;
        let span = self.span_from(span_start);
        let qid = QualifiedId { leading_colon_colon: false, segments: vec![IdSegment { name, template_args: None }] };
        Some(self.ast.push_decl(
            DeclKind::UsingAlias(UsingAliasDecl { name, target: UsingTarget::Namespace(qid) }),
            span,
        ))
    }

    /// `template <params> declaration`. The declaration that follows is
    /// either a function, a record (class template), or a variable
    /// template; `template<> ...` with empty `<>` is a full specialization.
    fn parse_template_decl(&mut self) -> Option<DeclId> {
        self.advance();
        let params = self.parse_template_param_list()?;

        if matches!(self.peek_kind(0), TokenKind::Keyword(Keyword::Struct | Keyword::Class | Keyword::Union)) {
            return self.parse_record_decl(params);
        }
        if self.check_kw(Keyword::Concept) {
            return self.parse_concept_decl(params);
        }
        self.parse_function_or_variable_decl(params)
    }

    fn parse_template_param_list(&mut self) -> Option<Vec<DeclId>> {
        self.expect_op(OperatorKind::Lt)?;
        self.enter_template_arg_mode();

        let mut params = Vec::new();
        if !self.check_op(OperatorKind::Gt) {
            loop {
                params.push(self.parse_template_param()?);
                if !self.eat_punct(PunctuatorKind::Comma) {
                    break;
                }
            }
        }
        let closed = self.eat_op(OperatorKind::Gt);
        self.exit_template_arg_mode();
        if !closed {
            self.error("expected '>' to close template parameter list");
            return None;
        }
        Some(params)
    }

    fn parse_template_param(&mut self) -> Option<DeclId> {
        let span_start = self.current_span();

        if self.eat_kw(Keyword::Template) {
            let params = self.parse_template_param_list()?;
            self.expect_kw(Keyword::Class, "class")?;
            let name = self.expect_ident()?;
            let default = if self.eat_op(OperatorKind::Assign) { self.parse_qualified_id() } else { None };
            let span = self.span_from(span_start);
            let decl = self
                .ast
                .push_decl(DeclKind::TemplateParam(TemplateParamDecl::TemplateTemplate { name, params, default }), span);
            self.symbols.declare(name, decl);
            return Some(decl);
        }

        if self.eat_kw(Keyword::Class) || self.eat_kw(Keyword::Typename) {
            let is_variadic = self.eat_punct(PunctuatorKind::Ellipsis);
            let name = self.expect_ident()?;
            let default = if self.eat_op(OperatorKind::Assign) { self.parse_type_spec() } else { None };
            let span = self.span_from(span_start);
            let decl = self
                .ast
                .push_decl(DeclKind::TemplateParam(TemplateParamDecl::Type { name, default, is_variadic }), span);
            self.symbols.declare(name, decl);
            return Some(decl);
        }

        // Non-type template parameter: `T N` or `T... N`.
        let ty = self.parse_type_spec()?;
        let is_variadic = self.eat_punct(PunctuatorKind::Ellipsis);
        let name = self.expect_ident()?;
        let default = if self.eat_op(OperatorKind::Assign) { self.parse_assignment_expr() } else { None };
        let span = self.span_from(span_start);
        let decl = self
            .ast
            .push_decl(DeclKind::TemplateParam(TemplateParamDecl::NonType { name, ty, default, is_variadic }), span);
        self.symbols.declare(name, decl);
        Some(decl)
    }

    fn parse_concept_decl(&mut self, template_params: Vec<DeclId>) -> Option<DeclId> {
        let span_start = self.current_span();
        self.advance();
        let name = self.expect_ident()?;
        self.expect_op(OperatorKind::Assign)?;
        let constraint = self.parse_expr()?;
        self.expect_punct(PunctuatorKind::Semi, ";")?;
        let span = self.span_from(span_start);
        let decl = self.ast.push_decl(DeclKind::Concept(ConceptDecl { name, template_params, constraint }), span);
        self.symbols.declare(name, decl);
        Some(decl)
    }

    fn parse_record_decl(&mut self, template_params: Vec<DeclId>) -> Option<DeclId> {
        let span_start = self.current_span();
        let kind = if self.eat_kw(Keyword::Struct) {
            RecordKind::Struct
        } else if self.eat_kw(Keyword::Class) {
            RecordKind::Class
        } else {
            self.advance();
            RecordKind::Union
        };

        let name = self.expect_ident()?;
        let bases = self.parse_base_clause_list(&template_params)?;

        self.expect_punct(PunctuatorKind::LBrace, "{")?;
        self.symbols.push_scope(ScopeKind::Class);

        let was_template = !template_params.is_empty();
        let previous_template = if was_template { self.enter_class_template() } else { self.is_in_class_template() };

        let mut members = Vec::new();
        while !self.at_eof() && !self.check_punct(PunctuatorKind::RBrace) {
            match self.parse_declaration() {
                Some(decl) => members.push(decl),
                None => self.resync_to_next_declaration(),
            }
        }

        if was_template {
            self.restore_class_template(previous_template);
        }
        self.symbols.pop_scope();
        self.expect_punct(PunctuatorKind::RBrace, "}")?;
        self.expect_punct(PunctuatorKind::Semi, ";")?;

        let span = self.span_from(span_start);
        let decl = self.ast.push_decl(
            DeclKind::Record(RecordDecl { name, kind, template_params: template_params.clone(), bases, members }),
            span,
        );
        self.symbols.declare(name, decl);
        if !template_params.is_empty() {
            self.templates.register_primary(name, decl);
        }
        Some(decl)
    }

    fn parse_base_clause_list(&mut self, template_params: &[DeclId]) -> Option<Vec<BaseClause>> {
        let mut bases = Vec::new();
        if !self.eat_punct(PunctuatorKind::Colon) {
            return Some(bases);
        }
        loop {
            let mut is_virtual = self.eat_kw(Keyword::Virtual);
            let access = if self.eat_kw(Keyword::Public) {
                AccessSpec::Public
            } else if self.eat_kw(Keyword::Protected) {
                AccessSpec::Protected
            } else {
                self.eat_kw(Keyword::Private);
                AccessSpec::Private
            };
            is_virtual |= self.eat_kw(Keyword::Virtual);

            // A base named by a bare template-parameter name can't resolve
            // to a concrete type until instantiation (§4.4).
            if let TokenKind::Identifier(name) = self.peek_kind(0) {
                let is_bare_param = !matches!(self.peek_kind(1), TokenKind::Punctuator(PunctuatorKind::ColonColon))
                    && template_params.iter().any(|p| self.template_param_name(*p) == Some(name));
                if is_bare_param {
                    self.advance();
                    bases.push(BaseClause { ty: BaseType::DeferredTemplateParam(name), access, is_virtual });
                    if !self.eat_punct(PunctuatorKind::Comma) {
                        break;
                    }
                    continue;
                }
            }

            let ty = self.parse_type_spec()?;
            bases.push(BaseClause { ty: BaseType::Concrete(ty), access, is_virtual });
            if !self.eat_punct(PunctuatorKind::Comma) {
                break;
            }
        }
        Some(bases)
    }

    fn template_param_name(&self, decl: DeclId) -> Option<flashcpp_util::StringHandle> {
        match &self.ast.decls[decl].kind {
            DeclKind::TemplateParam(TemplateParamDecl::Type { name, .. }) => Some(*name),
            DeclKind::TemplateParam(TemplateParamDecl::NonType { name, .. }) => Some(*name),
            DeclKind::TemplateParam(TemplateParamDecl::TemplateTemplate { name, .. }) => Some(*name),
            _ => None,
        }
    }

    fn parse_enum_decl(&mut self) -> Option<DeclId> {
        let span_start = self.current_span();
        self.advance();
        let is_scoped = self.eat_kw(Keyword::Class) || self.eat_kw(Keyword::Struct);

        let name = if self.check_ident() { self.expect_ident() } else { None };
        let underlying_type = if self.eat_punct(PunctuatorKind::Colon) { self.parse_type_spec() } else { None };

        self.expect_punct(PunctuatorKind::LBrace, "{")?;
        let mut enumerators = Vec::new();
        while !self.at_eof() && !self.check_punct(PunctuatorKind::RBrace) {
            let Some(enumerator_name) = self.expect_ident() else { break };
            let value = if self.eat_op(OperatorKind::Assign) { self.parse_assignment_expr() } else { None };
            enumerators.push((enumerator_name, value));
            if !self.eat_punct(PunctuatorKind::Comma) {
                break;
            }
        }
        self.expect_punct(PunctuatorKind::RBrace, "}")?;
        self.expect_punct(PunctuatorKind::Semi, ";")?;

        let span = self.span_from(span_start);
        let decl = self.ast.push_decl(DeclKind::Enum(EnumDecl { name, is_scoped, underlying_type, enumerators }), span);
        if let Some(n) = name {
            self.symbols.declare(n, decl);
        }
        Some(decl)
    }

    /// Parses either a function declaration/definition or a variable
    /// declaration - both start with an optional storage class and a
    /// type-specifier, and only diverge after the declarator name once a
    /// `(` does or doesn't follow.
    fn parse_function_or_variable_decl(&mut self, template_params: Vec<DeclId>) -> Option<DeclId> {
        let span_start = self.current_span();

        let is_virtual = self.eat_kw(Keyword::Virtual);
        let is_explicit = self.eat_kw(Keyword::Explicit);
        let storage = self.parse_storage_class();
        let is_constexpr = self.eat_kw(Keyword::Constexpr) || self.eat_kw(Keyword::Consteval);

        // Destructor: `~Name(...)`.
        if self.check_op(OperatorKind::Tilde) {
            self.advance();
            let _name = self.expect_ident()?;
            return self.parse_function_tail(
                FunctionName::Destructor,
                template_params,
                is_virtual,
                is_explicit,
                storage,
                is_constexpr,
                span_start,
            );
        }

        // `operator<op>` / `operator T()`.
        if self.check_kw(Keyword::Operator) {
            let fname = self.parse_operator_function_name()?;
            return self.parse_function_tail(fname, template_params, is_virtual, is_explicit, storage, is_constexpr, span_start);
        }

        let ty = self.parse_type_spec()?;

        // Constructor: `ClassName(...)` - an unqualified single-segment
        // named type directly followed by `(`, with no declarator name.
        if self.check_punct(PunctuatorKind::LParen) {
            if let TypeSpecKind::Named(qid) = &self.ast.type_specs[ty].kind {
                if qid.segments.len() == 1 && !qid.leading_colon_colon {
                    return self.parse_function_tail(
                        FunctionName::Constructor,
                        template_params,
                        is_virtual,
                        is_explicit,
                        storage,
                        is_constexpr,
                        span_start,
                    );
                }
            }
        }

        let name = self.expect_ident()?;

        if self.check_punct(PunctuatorKind::LParen) {
            return self.parse_function_tail_with_ret(
                FunctionName::Named(name),
                Some(ty),
                template_params,
                is_virtual,
                is_explicit,
                storage,
                is_constexpr,
                span_start,
            );
        }

        let (ty, init) = self.parse_declarator_tail(ty)?;
        self.expect_punct(PunctuatorKind::Semi, ";")?;
        let span = self.span_from(span_start);
        let decl = self.ast.push_decl(
            DeclKind::Variable(VariableDecl { name, ty, init, storage, is_constexpr, structured_bindings: Vec::new() }),
            span,
        );
        self.symbols.declare(name, decl);
        Some(decl)
    }

    /// `operator+`, `operator==`, `operator[]`/`operator()` (no matching
    /// [`OperatorKind`] variant, so spelled out as a synthesized name), or a
    /// conversion operator `operator T`.
    fn parse_operator_function_name(&mut self) -> Option<FunctionName> {
        self.advance(); // `operator`
        if let TokenKind::Operator(op) = self.peek_kind(0) {
            self.advance();
            return Some(FunctionName::OperatorOverload(op));
        }
        if self.check_punct(PunctuatorKind::LBracket) {
            self.advance();
            self.expect_punct(PunctuatorKind::RBracket, "]")?;
            let name = self.intern("operator[]");
            return Some(FunctionName::Named(name));
        }
        if self.check_punct(PunctuatorKind::LParen) && matches!(self.peek_kind(1), TokenKind::Punctuator(PunctuatorKind::RParen)) {
            self.advance();
            self.advance();
            let name = self.intern("operator()");
            return Some(FunctionName::Named(name));
        }
        if self.check_kw(Keyword::New) || self.check_kw(Keyword::Delete) {
            let is_new = self.check_kw(Keyword::New);
            self.advance();
            let is_array = self.eat_punct(PunctuatorKind::LBracket) && self.eat_punct(PunctuatorKind::RBracket);
            let name = self.intern(match (is_new, is_array) {
                (true, false) => "operator new",
                (true, true) => "operator new[]",
                (false, false) => "operator delete",
                (false, true) => "operator delete[]",
            });
            return Some(FunctionName::Named(name));
        }
        let ty = self.parse_type_spec()?;
        Some(FunctionName::ConversionOperator(ty))
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_function_tail(
        &mut self,
        fname: FunctionName,
        template_params: Vec<DeclId>,
        is_virtual: bool,
        is_explicit: bool,
        storage: StorageClass,
        is_constexpr: bool,
        span_start: flashcpp_util::Span,
    ) -> Option<DeclId> {
        self.parse_function_tail_with_ret(fname, None, template_params, is_virtual, is_explicit, storage, is_constexpr, span_start)
    }

    #[allow(clippy::too_many_arguments)]
    fn parse_function_tail_with_ret(
        &mut self,
        name: FunctionName,
        ret_type: Option<TypeSpecId>,
        template_params: Vec<DeclId>,
        is_virtual: bool,
        is_explicit: bool,
        storage: StorageClass,
        is_constexpr: bool,
        span_start: flashcpp_util::Span,
    ) -> Option<DeclId> {
        self.expect_punct(PunctuatorKind::LParen, "(")?;
        self.symbols.push_scope(ScopeKind::Function);
        let params = self.parse_param_list()?;
        self.expect_punct(PunctuatorKind::RParen, ")")?;

        let is_const = self.eat_kw(Keyword::Const);
        let is_noexcept = self.eat_kw(Keyword::Noexcept);
        let is_override = self.eat_contextual_keyword("override");

        let ret_type = if ret_type.is_none() && self.eat_op(OperatorKind::Arrow) {
            self.parse_type_spec()
        } else {
            ret_type
        };

        let (is_deleted, is_defaulted) = if self.eat_op(OperatorKind::Assign) {
            if self.eat_kw(Keyword::Delete) {
                (true, false)
            } else {
                self.expect_kw(Keyword::Default, "default")?;
                (false, true)
            }
        } else {
            (false, false)
        };

        let (body, deferred_body) = if is_deleted || is_defaulted || self.check_punct(PunctuatorKind::Semi) {
            (None, None)
        } else {
            self.expect_punct(PunctuatorKind::LBrace, "{")?;
            if self.is_in_class_template() {
                (None, Some(self.skip_deferred_body()))
            } else {
                (self.parse_block_after_brace(), None)
            }
        };

        self.symbols.pop_scope();
        if body.is_none() && deferred_body.is_none() {
            self.expect_punct(PunctuatorKind::Semi, ";")?;
        }

        let span = self.span_from(span_start);
        let decl = self.ast.push_decl(
            DeclKind::Function(FunctionDecl {
                name: name.clone(),
                template_params: template_params.clone(),
                params,
                ret_type,
                body,
                deferred_body,
                is_static: storage == StorageClass::Static,
                is_virtual,
                is_override,
                is_const,
                is_constexpr,
                is_explicit,
                is_noexcept,
                is_deleted,
                is_defaulted,
            }),
            span,
        );

        if let FunctionName::Named(n) = name {
            self.symbols.declare(n, decl);
            if !template_params.is_empty() {
                self.templates.register_primary(n, decl);
            }
        }
        Some(decl)
    }

    fn parse_param_list(&mut self) -> Option<Vec<ParamDecl>> {
        let mut params = Vec::new();
        if self.check_punct(PunctuatorKind::RParen) {
            return Some(params);
        }
        if self.check_kw(Keyword::Void) && matches!(self.peek_kind(1), TokenKind::Punctuator(PunctuatorKind::RParen)) {
            self.advance();
            return Some(params);
        }
        loop {
            let ty = self.parse_type_spec()?;
            let name = if self.check_ident() { self.expect_ident() } else { None };
            let default = if self.eat_op(OperatorKind::Assign) { self.parse_assignment_expr() } else { None };
            if let Some(n) = name {
                // Declared in the function's scope so the body can resolve it.
                let span = self.current_span();
                let decl = self.ast.push_decl(
                    DeclKind::Variable(VariableDecl {
                        name: n,
                        ty,
                        init: None,
                        storage: StorageClass::None,
                        is_constexpr: false,
                        structured_bindings: Vec::new(),
                    }),
                    span,
                );
                self.symbols.declare(n, decl);
            }
            params.push(ParamDecl { name, ty, default });
            if !self.eat_punct(PunctuatorKind::Comma) {
                break;
            }
        }
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use flashcpp_util::{Handler, StringInterner};

    use super::*;

    fn parse_one(src: &str) -> (Option<DeclId>, Ast, bool) {
        let mut handler = Handler::new();
        let mut interner = StringInterner::new();
        let mut parser = Parser::new(src, &mut handler, &mut interner);
        let decl = parser.parse_declaration();
        (decl, parser.ast, handler.has_errors())
    }

    #[test]
    fn parses_free_function_with_body() {
        let (decl, ast, errors) = parse_one("int add(int a, int b) { return a + b; }");
        assert!(!errors);
        let decl = decl.expect("function parsed");
        match &ast.decls[decl].kind {
            DeclKind::Function(f) => {
                assert!(matches!(f.name, FunctionName::Named(_)));
                assert_eq!(f.params.len(), 2);
                assert!(f.body.is_some());
            }
            _ => panic!("expected a function decl"),
        }
    }

    #[test]
    fn parses_struct_with_base_and_members() {
        let (decl, ast, errors) = parse_one("struct Derived : public Base { int x; void f(); };");
        assert!(!errors);
        let decl = decl.expect("struct parsed");
        match &ast.decls[decl].kind {
            DeclKind::Record(r) => {
                assert_eq!(r.kind, RecordKind::Struct);
                assert_eq!(r.bases.len(), 1);
                assert_eq!(r.members.len(), 2);
            }
            _ => panic!("expected a record decl"),
        }
    }

    #[test]
    fn class_template_member_body_is_deferred() {
        let (decl, ast, errors) = parse_one(
            "template <typename T> struct Box { T get() { return value; } T value; };",
        );
        assert!(!errors);
        let decl = decl.expect("template struct parsed");
        let DeclKind::Record(record) = &ast.decls[decl].kind else { panic!("expected record") };
        let DeclKind::Function(f) = &ast.decls[record.members[0]].kind else { panic!("expected function") };
        assert!(f.body.is_none());
        assert!(f.deferred_body.is_some());
    }

    #[test]
    fn parses_operator_overload() {
        let (decl, ast, errors) = parse_one("Vec operator+(Vec other) { return other; }");
        assert!(!errors);
        let decl = decl.expect("operator parsed");
        match &ast.decls[decl].kind {
            DeclKind::Function(f) => assert!(matches!(f.name, FunctionName::OperatorOverload(OperatorKind::Plus))),
            _ => panic!("expected a function decl"),
        }
    }

    #[test]
    fn parses_namespace_with_nested_declaration() {
        let (decl, ast, errors) = parse_one("namespace geo { struct Point { int x; int y; }; }");
        assert!(!errors);
        let decl = decl.expect("namespace parsed");
        match &ast.decls[decl].kind {
            DeclKind::Namespace(n) => assert_eq!(n.members.len(), 1),
            _ => panic!("expected a namespace decl"),
        }
    }

    #[test]
    fn parses_static_assert() {
        let (decl, _ast, errors) = parse_one("static_assert(sizeof(int) == 4, \"bad int size\");");
        assert!(!errors);
        assert!(decl.is_some());
    }

    #[test]
    fn missing_semicolon_after_variable_reports_error() {
        let (_decl, _ast, errors) = parse_one("int x");
        assert!(errors);
    }
}
