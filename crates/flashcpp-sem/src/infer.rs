//! Type resolution, conversion ranking, and overload resolution (§4.5).

use flashcpp_lex::OperatorKind;
use flashcpp_par::{
    Ast, BaseType, DeclId, DeclKind, ExprId, ExprKind, QualifiedId, TypeIndex, TypeSpecId,
    TypeSpecKind,
};
use flashcpp_util::{FxHashSet, StringHandle};

use crate::scope::NameEnv;
use crate::types::{TypeKind, TypeTable};

/// Standard conversion ranking (§4.5): exact match beats promotion beats
/// standard conversion beats a user-defined conversion beats the variadic
/// ellipsis fallback. Lower variants rank better; derive order gives the
/// comparison for free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConversionRank {
    ExactMatch,
    Promotion,
    Standard,
    UserDefined,
    Ellipsis,
}

/// Best-effort standard-conversion classification between two arithmetic or
/// pointer types. Returns `None` when no implicit conversion exists.
pub fn classify_conversion(table: &TypeTable, from: TypeIndex, to: TypeIndex) -> Option<ConversionRank> {
    if from == to {
        return Some(ConversionRank::ExactMatch);
    }

    let from_kind = &table.get(from).kind;
    let to_kind = &table.get(to).kind;

    // Integral/float promotion: the "small" integer types and float->double
    // widen for free in an arithmetic context.
    let is_promotion = matches!(
        (from_kind, to_kind),
        (TypeKind::Bool, TypeKind::Int)
            | (TypeKind::Char, TypeKind::Int)
            | (TypeKind::SignedChar, TypeKind::Int)
            | (TypeKind::UnsignedChar, TypeKind::Int)
            | (TypeKind::Short, TypeKind::Int)
            | (TypeKind::UnsignedShort, TypeKind::Int)
            | (TypeKind::Float, TypeKind::Double)
    );
    if is_promotion {
        return Some(ConversionRank::Promotion);
    }

    if table.is_arithmetic(from) && table.is_arithmetic(to) {
        return Some(ConversionRank::Standard);
    }

    match (from_kind, to_kind) {
        // nullptr_t -> any pointer, and pointer -> bool.
        (TypeKind::NullptrT, TypeKind::Pointer(_)) => Some(ConversionRank::Standard),
        (TypeKind::Pointer(_), TypeKind::Bool) => Some(ConversionRank::Standard),
        // A derived class's pointer converts to a base class pointer.
        (TypeKind::Pointer(from_pointee), TypeKind::Pointer(to_pointee)) => {
            if from_pointee == to_pointee {
                Some(ConversionRank::ExactMatch)
            } else if is_base_of(table, *to_pointee, *from_pointee) {
                Some(ConversionRank::Standard)
            } else {
                None
            }
        }
        (TypeKind::Record(from_decl), TypeKind::Record(to_decl)) if from_decl == to_decl => {
            Some(ConversionRank::ExactMatch)
        }
        (TypeKind::Record(_), TypeKind::Record(to_decl)) if is_base_of(table, *to_decl, derived_decl(from_kind)?) => {
            Some(ConversionRank::Standard)
        }
        _ => None,
    }
}

fn derived_decl(kind: &TypeKind) -> Option<DeclId> {
    match kind {
        TypeKind::Record(decl) => Some(*decl),
        _ => None,
    }
}

fn is_base_of(table: &TypeTable, base_decl: DeclId, derived_decl: DeclId) -> bool {
    if base_decl == derived_decl {
        return true;
    }
    let Some(info) = table.struct_info(derived_decl) else { return false };
    info.bases.iter().any(|b| match &table.get(b.ty).kind {
        TypeKind::Record(d) => is_base_of(table, base_decl, *d),
        _ => false,
    })
}

/// Picks the best-ranked overload for a call, per §4.5's conversion
/// ordering. Ties at the best rank are ambiguous (`None` candidate list has
/// more than one entry at that rank).
pub fn resolve_overload(
    candidates: &[(DeclId, Vec<TypeIndex>)],
    arg_types: &[TypeIndex],
    table: &TypeTable,
) -> OverloadResolution {
    let mut ranked: Vec<(DeclId, ConversionRank)> = Vec::new();

    'candidate: for (decl, params) in candidates {
        if params.len() != arg_types.len() {
            continue;
        }
        let mut worst = ConversionRank::ExactMatch;
        for (param_ty, arg_ty) in params.iter().zip(arg_types.iter()) {
            match classify_conversion(table, *arg_ty, *param_ty) {
                Some(rank) => worst = worst.max(rank),
                None => continue 'candidate,
            }
        }
        ranked.push((*decl, worst));
    }

    if ranked.is_empty() {
        return OverloadResolution::NoViableCandidate;
    }

    let best_rank = ranked.iter().map(|(_, r)| *r).min().unwrap();
    let best: Vec<DeclId> = ranked.iter().filter(|(_, r)| *r == best_rank).map(|(d, _)| *d).collect();

    match best.len() {
        1 => OverloadResolution::Resolved(best[0]),
        _ => OverloadResolution::Ambiguous(best),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverloadResolution {
    Resolved(DeclId),
    Ambiguous(Vec<DeclId>),
    NoViableCandidate,
}

/// Resolves syntactic type specifiers and infers expression types,
/// bounding recursive lookups the way `flashcpp_par`'s template
/// instantiation bounds recursive substitution (§4.5: "must detect cycles
/// on variadic-template member access").
pub struct TypeResolver<'a> {
    pub table: &'a mut TypeTable,
}

/// Mirrors `flashcpp_par::MAX_INSTANTIATION_DEPTH`; expression-type
/// inference can recurse through member accesses on dependent types just
/// as deeply as template instantiation can.
pub const MAX_RESOLUTION_DEPTH: usize = flashcpp_par::MAX_INSTANTIATION_DEPTH;

impl<'a> TypeResolver<'a> {
    pub fn new(table: &'a mut TypeTable) -> Self {
        Self { table }
    }

    pub fn resolve_type_spec(&mut self, ast: &Ast, env: &NameEnv, spec: TypeSpecId) -> TypeIndex {
        let node = &ast.type_specs[spec];
        match &node.kind {
            TypeSpecKind::Void => self.table.void(),
            TypeSpecKind::Builtin(kind) => self.table.builtin(*kind),
            TypeSpecKind::Auto => {
                // `auto` without a deduction context (e.g. an unresolved
                // template parameter) degrades to an error placeholder;
                // callers with an initializer expression should infer the
                // type from it directly rather than calling this.
                self.table.error_type()
            }
            TypeSpecKind::Pointer(inner) => {
                let target = self.resolve_type_spec(ast, env, *inner);
                self.table.pointer_to(target, node.cv)
            }
            TypeSpecKind::Reference { target, is_rvalue } => {
                let resolved = self.resolve_type_spec(ast, env, *target);
                if *is_rvalue {
                    self.table.rvalue_ref_to(resolved)
                } else {
                    self.table.lvalue_ref_to(resolved)
                }
            }
            TypeSpecKind::Array { element, size: _ } => {
                let element_ty = self.resolve_type_spec(ast, env, *element);
                // Constant array bounds are filled in by the constexpr
                // evaluator once the initializer/bound expression is known;
                // here we only need the element type's shape.
                self.table.array_of(element_ty, None)
            }
            TypeSpecKind::Function { params, ret } => {
                let param_tys = params.iter().map(|p| self.resolve_type_spec(ast, env, *p)).collect();
                let ret_ty = self.resolve_type_spec(ast, env, *ret);
                self.table.function_of(param_tys, ret_ty, false)
            }
            TypeSpecKind::Named(qid) => self.resolve_named(ast, env, qid),
            TypeSpecKind::TemplateId { name, .. } => {
                // Instantiation is out of scope here; treat the template
                // name itself as a dependent placeholder until a later
                // instantiation pass substitutes it.
                let spelling = last_segment(name);
                self.table.dependent(spelling)
            }
            TypeSpecKind::Dependent(name) => self.table.dependent(*name),
        }
    }

    fn resolve_named(&mut self, ast: &Ast, env: &NameEnv, qid: &QualifiedId) -> TypeIndex {
        let Some(last) = qid.segments.last() else { return self.table.error_type() };
        // Qualified names (`A::B`) need cross-scope lookup that this
        // resolver doesn't attempt; only the common single-segment case is
        // resolved against the local environment.
        if qid.segments.len() != 1 {
            return self.table.dependent(last.name);
        }
        match env.lookup(last.name) {
            Some(decl) => match &ast.decls[decl].kind {
                DeclKind::Record(_) | DeclKind::Enum(_) => {
                    self.table.type_of_decl(decl).unwrap_or_else(|| self.table.error_type())
                }
                DeclKind::UsingAlias(alias) => match &alias.target {
                    flashcpp_par::UsingTarget::Type(spec) => self.resolve_type_spec(ast, env, *spec),
                    flashcpp_par::UsingTarget::Namespace(_) => self.table.error_type(),
                },
                _ => self.table.error_type(),
            },
            None => self.table.dependent(last.name),
        }
    }

    /// Infers an expression's static type. `visited` guards against the
    /// cyclic member-access chains variadic template packs can produce;
    /// exceeding `MAX_RESOLUTION_DEPTH` degrades to the error type rather
    /// than overflowing the stack.
    pub fn infer_expr_type(
        &mut self,
        ast: &Ast,
        env: &NameEnv,
        expr: ExprId,
        visited: &mut FxHashSet<ExprId>,
        depth: usize,
    ) -> TypeIndex {
        if depth > MAX_RESOLUTION_DEPTH || !visited.insert(expr) {
            return self.table.error_type();
        }
        let result = self.infer_expr_type_inner(ast, env, expr, visited, depth);
        visited.remove(&expr);
        result
    }

    fn infer_expr_type_inner(
        &mut self,
        ast: &Ast,
        env: &NameEnv,
        expr: ExprId,
        visited: &mut FxHashSet<ExprId>,
        depth: usize,
    ) -> TypeIndex {
        let node = &ast.exprs[expr];
        match &node.kind {
            ExprKind::BoolLiteral(_) => self.table.builtin(flashcpp_par::BuiltinKind::Bool),
            ExprKind::NullptrLiteral => self.table.builtin(flashcpp_par::BuiltinKind::Nullptr),
            ExprKind::CharLiteral(_) => self.table.builtin(flashcpp_par::BuiltinKind::Char),
            ExprKind::StringLiteral(lit) => {
                let char_ty = match lit.encoding {
                    flashcpp_lex::Encoding::Narrow | flashcpp_lex::Encoding::Utf8 => {
                        self.table.builtin(flashcpp_par::BuiltinKind::Char)
                    }
                    flashcpp_lex::Encoding::Wide => self.table.builtin(flashcpp_par::BuiltinKind::WCharT),
                    flashcpp_lex::Encoding::Utf16 => self.table.builtin(flashcpp_par::BuiltinKind::Char16T),
                    flashcpp_lex::Encoding::Utf32 => self.table.builtin(flashcpp_par::BuiltinKind::Char32T),
                };
                // `+1` for the implicit trailing NUL, matching how C++
                // sizes a string literal's array type.
                self.table.array_of(char_ty, Some(lit.bytes.len() as u64 + 1))
            }
            ExprKind::NumericLiteral(lit) => self.numeric_literal_type(lit),
            ExprKind::IdentifierRef(name) => match env.lookup(*name) {
                Some(decl) => self.decl_value_type(ast, env, decl),
                None => self.table.error_type(),
            },
            ExprKind::QualifiedId(qid) => match qid.segments.last() {
                Some(seg) => match env.lookup(seg.name) {
                    Some(decl) => self.decl_value_type(ast, env, decl),
                    None => self.table.error_type(),
                },
                None => self.table.error_type(),
            },
            ExprKind::BinaryOp { op, lhs, rhs } => {
                let lhs_ty = self.infer_expr_type(ast, env, *lhs, visited, depth + 1);
                let rhs_ty = self.infer_expr_type(ast, env, *rhs, visited, depth + 1);
                self.binary_result_type(*op, lhs_ty, rhs_ty)
            }
            ExprKind::UnaryOp { op, operand, .. } => {
                let operand_ty = self.infer_expr_type(ast, env, *operand, visited, depth + 1);
                match op {
                    OperatorKind::Star => match self.table.get(operand_ty).kind.clone() {
                        TypeKind::Pointer(pointee) => pointee,
                        _ => self.table.error_type(),
                    },
                    OperatorKind::Amp => self.table.lvalue_ref_to(operand_ty),
                    OperatorKind::LogicalNot => self.table.builtin(flashcpp_par::BuiltinKind::Bool),
                    _ => operand_ty,
                }
            }
            ExprKind::MemberAccess { base, member, is_arrow } => {
                let base_ty = self.infer_expr_type(ast, env, *base, visited, depth + 1);
                let record_ty = if *is_arrow { self.deref_once(base_ty) } else { base_ty };
                self.member_type(record_ty, *member)
            }
            ExprKind::ArraySubscript { base, .. } => {
                let base_ty = self.infer_expr_type(ast, env, *base, visited, depth + 1);
                match self.table.get(base_ty).kind.clone() {
                    TypeKind::Array { element, .. } => element,
                    TypeKind::Pointer(pointee) => pointee,
                    _ => self.table.error_type(),
                }
            }
            ExprKind::Call { callee, .. } => {
                let callee_ty = self.infer_expr_type(ast, env, *callee, visited, depth + 1);
                match self.table.get(callee_ty).kind.clone() {
                    TypeKind::Function { ret, .. } => ret,
                    _ => self.table.error_type(),
                }
            }
            ExprKind::Constructor { type_spec, .. } | ExprKind::Cast { target: type_spec, .. } => {
                self.resolve_type_spec(ast, env, *type_spec)
            }
            ExprKind::Sizeof(_) => self.table.builtin(flashcpp_par::BuiltinKind::UnsignedLong),
            ExprKind::Alignof(_) => self.table.builtin(flashcpp_par::BuiltinKind::UnsignedLong),
            ExprKind::SizeofPack(_) => self.table.builtin(flashcpp_par::BuiltinKind::UnsignedLong),
            ExprKind::Conditional { then_expr, else_expr, .. } => {
                let then_ty = self.infer_expr_type(ast, env, *then_expr, visited, depth + 1);
                let else_ty = self.infer_expr_type(ast, env, *else_expr, visited, depth + 1);
                if then_ty == else_ty {
                    then_ty
                } else if classify_conversion(self.table, else_ty, then_ty).is_some() {
                    then_ty
                } else {
                    else_ty
                }
            }
            ExprKind::Assign { place, .. } => self.infer_expr_type(ast, env, *place, visited, depth + 1),
            ExprKind::Comma(exprs) => match exprs.last() {
                Some(last) => self.infer_expr_type(ast, env, *last, visited, depth + 1),
                None => self.table.void(),
            },
            ExprKind::New(new_expr) => {
                let pointee = self.resolve_type_spec(ast, env, new_expr.type_spec);
                self.table.pointer_to(pointee, flashcpp_par::CvQualifiers::default())
            }
            ExprKind::Delete { .. } => self.table.void(),
            ExprKind::Throw(_) => self.table.void(),
            ExprKind::Lambda(_) => self.table.error_type(),
            ExprKind::TypeTraitIntrinsic { .. } => self.table.builtin(flashcpp_par::BuiltinKind::Bool),
            ExprKind::FoldExpression { pack, .. } => self.infer_expr_type(ast, env, *pack, visited, depth + 1),
            ExprKind::PointerToMember { .. } => self.table.error_type(),
        }
    }

    fn numeric_literal_type(&mut self, lit: &flashcpp_lex::NumericLiteral) -> TypeIndex {
        use flashcpp_lex::FloatSuffix;
        use flashcpp_par::BuiltinKind;
        if lit.is_float {
            return match lit.float_suffix {
                FloatSuffix::Float => self.table.builtin(BuiltinKind::Float),
                FloatSuffix::LongDouble => self.table.builtin(BuiltinKind::LongDouble),
                FloatSuffix::None => self.table.builtin(BuiltinKind::Double),
            };
        }
        let kind = match (lit.int_suffix.unsigned, lit.int_suffix.long_count) {
            (false, 0) => BuiltinKind::Int,
            (true, 0) => BuiltinKind::UnsignedInt,
            (false, 1) => BuiltinKind::Long,
            (true, 1) => BuiltinKind::UnsignedLong,
            (false, _) => BuiltinKind::LongLong,
            (true, _) => BuiltinKind::UnsignedLongLong,
        };
        self.table.builtin(kind)
    }

    fn deref_once(&self, ty: TypeIndex) -> TypeIndex {
        match self.table.get(ty).kind.clone() {
            TypeKind::Pointer(pointee) => pointee,
            _ => ty,
        }
    }

    fn member_type(&self, record_ty: TypeIndex, member: StringHandle) -> TypeIndex {
        let stripped = self.table.strip_references(record_ty);
        match &self.table.get(stripped).kind {
            TypeKind::Record(decl) => self
                .table
                .struct_info(*decl)
                .and_then(|info| info.members.get(&member))
                .map(|m| m.ty)
                .unwrap_or(stripped),
            _ => stripped,
        }
    }

    fn decl_value_type(&mut self, ast: &Ast, env: &NameEnv, decl: DeclId) -> TypeIndex {
        match &ast.decls[decl].kind {
            // An `auto`-typed variable's real type was deduced from its
            // initializer by the analyzer and cached, since re-resolving
            // its type spec here would only see `TypeSpecKind::Auto` again.
            DeclKind::Variable(_) if self.table.type_of_decl(decl).is_some() => {
                self.table.type_of_decl(decl).unwrap()
            }
            DeclKind::Variable(var) => self.resolve_type_spec(ast, env, var.ty),
            DeclKind::Function(func) => {
                let params = func
                    .params
                    .iter()
                    .map(|p| self.resolve_type_spec(ast, env, p.ty))
                    .collect();
                let ret = func
                    .ret_type
                    .map(|rt| self.resolve_type_spec(ast, env, rt))
                    .unwrap_or_else(|| self.table.void());
                self.table.function_of(params, ret, false)
            }
            DeclKind::Record(_) | DeclKind::Enum(_) => {
                self.table.type_of_decl(decl).unwrap_or_else(|| self.table.error_type())
            }
            _ => self.table.error_type(),
        }
    }

    fn binary_result_type(&mut self, op: OperatorKind, lhs: TypeIndex, rhs: TypeIndex) -> TypeIndex {
        use OperatorKind::*;
        match op {
            Eq | NotEq | Lt | Gt | LtEq | GtEq | AndAnd | OrOr | Spaceship => {
                self.table.builtin(flashcpp_par::BuiltinKind::Bool)
            }
            Plus | Minus if self.table.is_pointer(lhs) => lhs,
            Plus | Minus if self.table.is_pointer(rhs) => rhs,
            _ => {
                if self.table.is_floating_point(lhs) || self.table.is_floating_point(rhs) {
                    if self.rank_of(lhs) >= self.rank_of(rhs) {
                        lhs
                    } else {
                        rhs
                    }
                } else if self.table.size_of(lhs) >= self.table.size_of(rhs) {
                    lhs
                } else {
                    rhs
                }
            }
        }
    }

    fn rank_of(&self, ty: TypeIndex) -> u64 {
        if self.table.is_floating_point(ty) {
            self.table.size_of(ty)
        } else {
            0
        }
    }
}

fn last_segment(qid: &QualifiedId) -> StringHandle {
    qid.segments.last().map(|s| s.name).expect("a qualified-id always has at least one segment")
}

/// Resolves a base-class clause to the `TypeIndex` of the class it names,
/// looking the base's name up in `env`. A deferred template-parameter base
/// isn't resolvable until instantiation, so it yields the error type.
pub fn resolve_base(
    resolver: &mut TypeResolver<'_>,
    ast: &Ast,
    env: &NameEnv,
    base: &BaseType,
) -> TypeIndex {
    match base {
        BaseType::Concrete(spec) => resolver.resolve_type_spec(ast, env, *spec),
        BaseType::DeferredTemplateParam(_) => resolver.table.error_type(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcpp_par::BuiltinKind;

    #[test]
    fn exact_match_beats_promotion() {
        let table = TypeTable::new();
        let int = table.builtin(BuiltinKind::Int);
        assert_eq!(classify_conversion(&table, int, int), Some(ConversionRank::ExactMatch));
    }

    #[test]
    fn char_to_int_is_a_promotion() {
        let table = TypeTable::new();
        let char_ty = table.builtin(BuiltinKind::Char);
        let int = table.builtin(BuiltinKind::Int);
        assert_eq!(classify_conversion(&table, char_ty, int), Some(ConversionRank::Promotion));
    }

    #[test]
    fn int_to_record_has_no_conversion() {
        let mut table = TypeTable::new();
        let mut interner = flashcpp_util::StringInterner::new();
        let decl = decl_id(1);
        let name = interner.intern("S");
        let record = table.register_struct(decl, name, flashcpp_par::RecordKind::Struct);
        let int = table.builtin(BuiltinKind::Int);
        assert_eq!(classify_conversion(&table, int, record), None);
    }

    fn decl_id(n: usize) -> DeclId {
        use flashcpp_util::Idx;
        DeclId::from_usize(n)
    }

    #[test]
    fn overload_resolution_picks_unique_best_rank() {
        let table = TypeTable::new();
        let int = table.builtin(BuiltinKind::Int);
        let double = table.builtin(BuiltinKind::Double);
        let char_ty = table.builtin(BuiltinKind::Char);

        let exact = decl_id(10);
        let promoted = decl_id(11);
        let candidates = vec![(exact, vec![int]), (promoted, vec![double])];

        let resolution = resolve_overload(&candidates, &[int], &table);
        assert_eq!(resolution, OverloadResolution::Resolved(exact));

        let resolution2 = resolve_overload(&candidates, &[char_ty], &table);
        assert_eq!(resolution2, OverloadResolution::Resolved(promoted));
    }

    #[test]
    fn overload_resolution_reports_no_viable_candidate() {
        let table = TypeTable::new();
        let int = table.builtin(BuiltinKind::Int);
        let decl = decl_id(20);
        let candidates = vec![(decl, vec![int, int])];
        let resolution = resolve_overload(&candidates, &[int], &table);
        assert_eq!(resolution, OverloadResolution::NoViableCandidate);
    }
}
