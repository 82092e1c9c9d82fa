//! Overload-set collection (§3.2: "symbol map (name handle -> vector of
//! overloads)").
//!
//! `flashcpp-par::registry::SymbolTable` stores one [`DeclId`] per name per
//! scope - enough for the parser's own "is this name a type?" question, but
//! not enough to represent a C++ overload set. Rather than widen that table
//! (and risk the parser's already-tested lookup order), this module derives
//! overload sets directly from a sibling-declaration list in the AST: a
//! namespace's `members`, a record's `members`, or a translation unit's
//! `top_level`.

use flashcpp_par::{Ast, DeclId, DeclKind, FunctionName};
use flashcpp_util::{FxHashMap, StringHandle};

/// All function declarations sharing one name within a single scope.
#[derive(Debug, Default, Clone)]
pub struct OverloadSet {
    pub candidates: Vec<DeclId>,
}

/// Groups the `DeclId`s in `siblings` that name a function by
/// [`FunctionName::Named`] spelling. Constructors, destructors, operator
/// overloads, and conversion operators are collected separately since they
/// don't share the ordinary-identifier namespace and are looked up by a
/// different rule (e.g. "the constructor set" rather than "overloads of
/// `X`").
pub struct OverloadIndex {
    named: FxHashMap<StringHandle, OverloadSet>,
    constructors: OverloadSet,
    destructor: Option<DeclId>,
    operators: FxHashMap<flashcpp_lex::OperatorKind, OverloadSet>,
    conversions: Vec<DeclId>,
}

impl OverloadIndex {
    pub fn build(ast: &Ast, siblings: &[DeclId]) -> Self {
        let mut named: FxHashMap<StringHandle, OverloadSet> = FxHashMap::default();
        let mut constructors = OverloadSet::default();
        let mut destructor = None;
        let mut operators: FxHashMap<flashcpp_lex::OperatorKind, OverloadSet> = FxHashMap::default();
        let mut conversions = Vec::new();

        for &decl in siblings {
            let DeclKind::Function(func) = &ast.decls[decl].kind else { continue };
            match &func.name {
                FunctionName::Named(handle) => {
                    named.entry(*handle).or_default().candidates.push(decl);
                }
                FunctionName::Constructor => constructors.candidates.push(decl),
                FunctionName::Destructor => destructor = Some(decl),
                FunctionName::OperatorOverload(op) => {
                    operators.entry(*op).or_default().candidates.push(decl);
                }
                FunctionName::ConversionOperator(_) => conversions.push(decl),
            }
        }

        Self { named, constructors, destructor, operators, conversions }
    }

    pub fn named(&self, name: StringHandle) -> &[DeclId] {
        self.named.get(&name).map(|s| s.candidates.as_slice()).unwrap_or(&[])
    }

    pub fn constructors(&self) -> &[DeclId] {
        &self.constructors.candidates
    }

    pub fn destructor(&self) -> Option<DeclId> {
        self.destructor
    }

    pub fn operator(&self, op: flashcpp_lex::OperatorKind) -> &[DeclId] {
        self.operators.get(&op).map(|s| s.candidates.as_slice()).unwrap_or(&[])
    }

    pub fn conversions(&self) -> &[DeclId] {
        &self.conversions
    }
}

/// A name-resolution environment the analyzer maintains as it walks the
/// AST. `flashcpp-par::SymbolTable` is exhausted by the time parsing ends
/// (every `push_scope`/`pop_scope` pair it opened is already balanced), so
/// semantic analysis keeps its own stack instead of trying to resurrect it.
#[derive(Debug, Default)]
pub struct NameEnv {
    scopes: Vec<FxHashMap<StringHandle, DeclId>>,
}

impl NameEnv {
    pub fn new() -> Self {
        Self { scopes: vec![FxHashMap::default()] }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    pub fn pop_scope(&mut self) {
        assert!(self.scopes.len() > 1, "cannot pop the global scope");
        self.scopes.pop();
    }

    pub fn declare(&mut self, name: StringHandle, decl: DeclId) {
        self.scopes.last_mut().expect("scope stack is never empty").insert(name, decl);
    }

    /// Innermost-to-outermost lookup, matching `flashcpp_par::SymbolTable`'s
    /// unqualified lookup order (§4.3).
    pub fn lookup(&self, name: StringHandle) -> Option<DeclId> {
        for scope in self.scopes.iter().rev() {
            if let Some(&decl) = scope.get(&name) {
                return Some(decl);
            }
        }
        None
    }
}

/// Returns the sibling-declaration list a given scope-introducing decl owns,
/// or `None` for decls that don't introduce one (functions, variables, ...).
pub fn members_of(ast: &Ast, decl: DeclId) -> Option<&[DeclId]> {
    match &ast.decls[decl].kind {
        DeclKind::Namespace(ns) => Some(&ns.members),
        DeclKind::Record(rec) => Some(&rec.members),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcpp_par::FunctionDecl;
    use flashcpp_util::{Idx, Span, StringInterner};

    fn push_fn(ast: &mut Ast, name: FunctionName) -> DeclId {
        ast.push_decl(
            DeclKind::Function(FunctionDecl {
                name,
                template_params: Vec::new(),
                params: Vec::new(),
                ret_type: None,
                body: None,
                deferred_body: None,
                is_static: false,
                is_virtual: false,
                is_override: false,
                is_const: false,
                is_constexpr: false,
                is_explicit: false,
                is_noexcept: false,
                is_deleted: false,
                is_defaulted: false,
            }),
            Span::DUMMY,
        )
    }

    #[test]
    fn groups_same_named_functions_into_one_overload_set() {
        let mut ast = Ast::new();
        let mut interner = StringInterner::new();
        let foo = interner.intern("foo");

        let a = push_fn(&mut ast, FunctionName::Named(foo));
        let b = push_fn(&mut ast, FunctionName::Named(foo));
        let ctor = push_fn(&mut ast, FunctionName::Constructor);

        let siblings = vec![a, b, ctor];
        let index = OverloadIndex::build(&ast, &siblings);

        assert_eq!(index.named(foo), &[a, b]);
        assert_eq!(index.constructors(), &[ctor]);
    }

    #[test]
    fn unknown_name_yields_empty_slice() {
        let ast = Ast::new();
        let mut interner = StringInterner::new();
        let missing = interner.intern("missing");
        let index = OverloadIndex::build(&ast, &[]);
        assert!(index.named(missing).is_empty());
    }

    #[test]
    fn name_env_shadows_inner_over_outer() {
        let mut interner = StringInterner::new();
        let x = interner.intern("x");
        let outer_decl = DeclId::from_usize(0);
        let inner_decl = DeclId::from_usize(1);

        let mut env = NameEnv::new();
        env.declare(x, outer_decl);
        env.push_scope();
        env.declare(x, inner_decl);
        assert_eq!(env.lookup(x), Some(inner_decl));
        env.pop_scope();
        assert_eq!(env.lookup(x), Some(outer_decl));
    }
}
