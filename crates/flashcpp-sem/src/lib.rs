//! Semantic analysis for flashcpp (§3-§5).
//!
//! Consumes the [`flashcpp_par::Ast`] produced by `flashcpp-par` and builds
//! the type table, name environment, and constant-evaluated values the code
//! generator needs. `flashcpp-par` already resolves grammar ambiguities and
//! names types it can recognize purely syntactically (§4.3); this crate
//! fills in everything that requires looking at more than one declaration at
//! once - overload sets, class layout, `auto` deduction, constexpr.
//!
//! - [`types`] - the [`types::TypeTable`], the single source of truth for
//!   what a [`flashcpp_par::TypeIndex`] actually denotes.
//! - [`scope`] - [`scope::NameEnv`] (lexical name resolution) and
//!   [`scope::OverloadIndex`] (grouping sibling declarations into overload
//!   sets, since the parser's symbol table only stores one `DeclId` per
//!   name).
//! - [`infer`] - conversion ranking, overload resolution, and expression
//!   type inference.
//! - [`hir`] - constant expression evaluation (enumerators, `static_assert`,
//!   array bounds, the closed type-trait/math intrinsic set).
//! - [`analysis`] - [`analysis::SemanticAnalyzer`], the driver that walks a
//!   translation unit once and ties the above together.

pub mod analysis;
pub mod hir;
pub mod infer;
pub mod scope;
pub mod types;

pub use analysis::SemanticAnalyzer;
pub use hir::{ConstEvalError, ConstEvaluator, ConstValue, PointerConst};
pub use infer::{classify_conversion, resolve_overload, ConversionRank, OverloadResolution, TypeResolver};
pub use scope::{NameEnv, OverloadIndex};
pub use types::{BaseInfo, LayoutFrozenError, MemberInfo, StructInfo, TypeInfo, TypeKind, TypeTable};

/// Runs semantic analysis over a whole translation unit and returns the
/// populated type table and name environment, ready for `flashcpp-ir` to
/// consult while lowering.
pub fn analyze(
    ast: &mut flashcpp_par::Ast,
    interner: &flashcpp_util::StringInterner,
    handler: &flashcpp_util::Handler,
) -> (TypeTable, NameEnv) {
    SemanticAnalyzer::new(ast, interner, handler).analyze()
}

#[cfg(test)]
mod edge_cases;
