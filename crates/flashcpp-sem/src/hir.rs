//! Constant expression evaluation (§4.5): enumerator values, array bounds,
//! `static_assert` conditions, and the type-trait/math intrinsics from §6.3.
//!
//! This module does not build a general abstract machine - constexpr here
//! only needs to cover what a compile-time context actually asks for.
//! `__builtin_va_start`/`__builtin_va_arg` are deliberately absent: they are
//! not constexpr-evaluable and are lowered directly by the code generator.

use flashcpp_lex::NumericValue;
use flashcpp_par::{Ast, CastKind, ExprId, ExprKind, SizeofOperand};
use flashcpp_util::{StringHandle, StringInterner};

use crate::infer::TypeResolver;
use crate::scope::NameEnv;
use crate::types::{TypeKind, TypeTable};

/// A pointer constant sufficient for pointer-comparison and address-of
/// constexpr contexts: the symbol it points into plus a byte offset. There
/// is no compile-time memory to actually read through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerConst {
    pub symbol: StringHandle,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    Nullptr,
    Pointer(PointerConst),
}

impl ConstValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstValue::Bool(b) => Some(*b),
            ConstValue::Int(i) => Some(*i != 0),
            ConstValue::UInt(u) => Some(*u != 0),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConstValue::Int(i) => Some(*i),
            ConstValue::UInt(u) => i64::try_from(*u).ok(),
            ConstValue::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ConstValue::UInt(u) => Some(*u),
            ConstValue::Int(i) if *i >= 0 => Some(*i as u64),
            ConstValue::Bool(b) => Some(*b as u64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConstValue::Float(f) => Some(*f),
            ConstValue::Int(i) => Some(*i as f64),
            ConstValue::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstEvalError {
    NotConstant,
    DivisionByZero,
    TypeMismatch,
    UnknownIntrinsic(StringHandle),
}

/// Evaluates constant expressions against a fully-built type table. Borrows
/// the table mutably because resolving a type-trait's type arguments can
/// register fresh `TypeIndex`es (e.g. a pointer type spelled only inside
/// the intrinsic call).
pub struct ConstEvaluator<'a> {
    pub ast: &'a Ast,
    pub table: &'a mut TypeTable,
    pub interner: &'a StringInterner,
}

impl<'a> ConstEvaluator<'a> {
    pub fn new(ast: &'a Ast, table: &'a mut TypeTable, interner: &'a StringInterner) -> Self {
        Self { ast, table, interner }
    }

    pub fn eval(&mut self, env: &NameEnv, expr: ExprId) -> Result<ConstValue, ConstEvalError> {
        let node = &self.ast.exprs[expr];
        match &node.kind {
            ExprKind::BoolLiteral(b) => Ok(ConstValue::Bool(*b)),
            ExprKind::NullptrLiteral => Ok(ConstValue::Nullptr),
            ExprKind::CharLiteral(lit) => Ok(ConstValue::Int(lit.value as i64)),
            ExprKind::NumericLiteral(lit) => self.eval_numeric_literal(lit),
            ExprKind::UnaryOp { op, operand, is_postfix } if !is_postfix => {
                let value = self.eval(env, *operand)?;
                self.eval_unary(*op, value)
            }
            ExprKind::BinaryOp { op, lhs, rhs } => {
                let lhs_val = self.eval(env, *lhs)?;
                let rhs_val = self.eval(env, *rhs)?;
                self.eval_binary(*op, lhs_val, rhs_val)
            }
            ExprKind::Conditional { cond, then_expr, else_expr } => {
                if self.eval(env, *cond)?.as_bool().ok_or(ConstEvalError::TypeMismatch)? {
                    self.eval(env, *then_expr)
                } else {
                    self.eval(env, *else_expr)
                }
            }
            ExprKind::Comma(exprs) => {
                let mut last = Err(ConstEvalError::NotConstant);
                for e in exprs {
                    last = self.eval(env, *e);
                }
                last
            }
            ExprKind::Sizeof(operand) => self.eval_sizeof(env, operand),
            ExprKind::Alignof(spec) => {
                let ty = TypeResolver::new(self.table).resolve_type_spec(self.ast, env, *spec);
                Ok(ConstValue::UInt(self.table.align_of(ty)))
            }
            ExprKind::TypeTraitIntrinsic { name, type_args } => self.eval_type_trait(env, *name, type_args),
            ExprKind::Call { callee, args } => self.eval_builtin_call(env, *callee, args),
            ExprKind::Cast { kind: CastKind::Static | CastKind::CStyle | CastKind::Functional, target, operand } => {
                let value = self.eval(env, *operand)?;
                let ty = TypeResolver::new(self.table).resolve_type_spec(self.ast, env, *target);
                self.coerce(value, ty)
            }
            _ => Err(ConstEvalError::NotConstant),
        }
    }

    fn eval_numeric_literal(&self, lit: &flashcpp_lex::NumericLiteral) -> Result<ConstValue, ConstEvalError> {
        if lit.is_float {
            return match lit.value {
                NumericValue::Float(f) => Ok(ConstValue::Float(f)),
                _ => Err(ConstEvalError::NotConstant),
            };
        }
        match lit.value {
            NumericValue::Int(v) => {
                if lit.int_suffix.unsigned {
                    Ok(ConstValue::UInt(v))
                } else {
                    Ok(ConstValue::Int(v as i64))
                }
            }
            _ => Err(ConstEvalError::NotConstant),
        }
    }

    fn eval_unary(&self, op: flashcpp_lex::OperatorKind, value: ConstValue) -> Result<ConstValue, ConstEvalError> {
        use flashcpp_lex::OperatorKind::*;
        match op {
            Minus => match value {
                ConstValue::Int(i) => Ok(ConstValue::Int(-i)),
                ConstValue::Float(f) => Ok(ConstValue::Float(-f)),
                ConstValue::UInt(u) => Ok(ConstValue::Int(-(u as i64))),
                _ => Err(ConstEvalError::TypeMismatch),
            },
            Plus => Ok(value),
            LogicalNot => value.as_bool().map(|b| ConstValue::Bool(!b)).ok_or(ConstEvalError::TypeMismatch),
            Tilde => value.as_i64().map(|i| ConstValue::Int(!i)).ok_or(ConstEvalError::TypeMismatch),
            _ => Err(ConstEvalError::NotConstant),
        }
    }

    fn eval_binary(
        &self,
        op: flashcpp_lex::OperatorKind,
        lhs: ConstValue,
        rhs: ConstValue,
    ) -> Result<ConstValue, ConstEvalError> {
        use flashcpp_lex::OperatorKind::*;
        if matches!(lhs, ConstValue::Float(_)) || matches!(rhs, ConstValue::Float(_)) {
            let l = lhs.as_f64().ok_or(ConstEvalError::TypeMismatch)?;
            let r = rhs.as_f64().ok_or(ConstEvalError::TypeMismatch)?;
            return match op {
                Plus => Ok(ConstValue::Float(l + r)),
                Minus => Ok(ConstValue::Float(l - r)),
                Star => Ok(ConstValue::Float(l * r)),
                Slash => Ok(ConstValue::Float(l / r)),
                Eq => Ok(ConstValue::Bool(l == r)),
                NotEq => Ok(ConstValue::Bool(l != r)),
                Lt => Ok(ConstValue::Bool(l < r)),
                Gt => Ok(ConstValue::Bool(l > r)),
                LtEq => Ok(ConstValue::Bool(l <= r)),
                GtEq => Ok(ConstValue::Bool(l >= r)),
                _ => Err(ConstEvalError::TypeMismatch),
            };
        }

        let l = lhs.as_i64().ok_or(ConstEvalError::TypeMismatch)?;
        let r = rhs.as_i64().ok_or(ConstEvalError::TypeMismatch)?;
        match op {
            Plus => Ok(ConstValue::Int(l.wrapping_add(r))),
            Minus => Ok(ConstValue::Int(l.wrapping_sub(r))),
            Star => Ok(ConstValue::Int(l.wrapping_mul(r))),
            Slash => {
                if r == 0 {
                    Err(ConstEvalError::DivisionByZero)
                } else {
                    Ok(ConstValue::Int(l / r))
                }
            }
            Percent => {
                if r == 0 {
                    Err(ConstEvalError::DivisionByZero)
                } else {
                    Ok(ConstValue::Int(l % r))
                }
            }
            Amp => Ok(ConstValue::Int(l & r)),
            Pipe => Ok(ConstValue::Int(l | r)),
            Caret => Ok(ConstValue::Int(l ^ r)),
            Shl => Ok(ConstValue::Int(l << r)),
            Shr => Ok(ConstValue::Int(l >> r)),
            Eq => Ok(ConstValue::Bool(l == r)),
            NotEq => Ok(ConstValue::Bool(l != r)),
            Lt => Ok(ConstValue::Bool(l < r)),
            Gt => Ok(ConstValue::Bool(l > r)),
            LtEq => Ok(ConstValue::Bool(l <= r)),
            GtEq => Ok(ConstValue::Bool(l >= r)),
            AndAnd => Ok(ConstValue::Bool(l != 0 && r != 0)),
            OrOr => Ok(ConstValue::Bool(l != 0 || r != 0)),
            _ => Err(ConstEvalError::NotConstant),
        }
    }

    fn eval_sizeof(&mut self, env: &NameEnv, operand: &SizeofOperand) -> Result<ConstValue, ConstEvalError> {
        let ty = match operand {
            SizeofOperand::Type(spec) => TypeResolver::new(self.table).resolve_type_spec(self.ast, env, *spec),
            SizeofOperand::Expr(e) => {
                let mut visited = flashcpp_util::FxHashSet::default();
                TypeResolver::new(self.table).infer_expr_type(self.ast, env, *e, &mut visited, 0)
            }
        };
        Ok(ConstValue::UInt(self.table.size_of(ty)))
    }

    fn coerce(&self, value: ConstValue, ty: crate::types::TypeIndex) -> Result<ConstValue, ConstEvalError> {
        if self.table.is_floating_point(ty) {
            return value.as_f64().map(ConstValue::Float).ok_or(ConstEvalError::TypeMismatch);
        }
        if self.table.is_integral(ty) {
            return if self.table.is_signed(ty) {
                value.as_i64().map(ConstValue::Int).ok_or(ConstEvalError::TypeMismatch)
            } else {
                value.as_u64().map(ConstValue::UInt).ok_or(ConstEvalError::TypeMismatch)
            };
        }
        Ok(value)
    }

    /// The closed set of ~36 type-trait intrinsics (§6.3), evaluated by
    /// structural inspection of `TypeInfo`/`StructInfo` rather than a
    /// general trait-resolution engine.
    fn eval_type_trait(
        &mut self,
        env: &NameEnv,
        name: StringHandle,
        type_args: &[flashcpp_par::TypeSpecId],
    ) -> Result<ConstValue, ConstEvalError> {
        let mut resolver = TypeResolver::new(self.table);
        let tys: Vec<_> = type_args.iter().map(|t| resolver.resolve_type_spec(self.ast, env, *t)).collect();
        let first = tys.first().copied();
        let second = tys.get(1).copied();
        let table = &*self.table;

        let spelling = self.spelling_of(name);
        let result = match spelling {
            "__is_same" => match (first, second) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            "__is_base_of" => match (first, second) {
                (Some(base), Some(derived)) => match (&table.get(base).kind, &table.get(derived).kind) {
                    (TypeKind::Record(b), TypeKind::Record(d)) => is_base_of_decl(table, *b, *d),
                    _ => false,
                },
                _ => false,
            },
            "__is_class" => first.is_some_and(|t| {
                matches!(&table.get(t).kind, TypeKind::Record(d) if table.struct_info(*d).map(|s| !matches!(s.flavor, flashcpp_par::RecordKind::Union)).unwrap_or(false))
            }),
            "__is_union" => first.is_some_and(|t| {
                matches!(&table.get(t).kind, TypeKind::Record(d) if table.struct_info(*d).map(|s| matches!(s.flavor, flashcpp_par::RecordKind::Union)).unwrap_or(false))
            }),
            "__is_enum" => first.is_some_and(|t| matches!(table.get(t).kind, TypeKind::Enum(_))),
            "__is_polymorphic" => first.is_some_and(|t| match &table.get(t).kind {
                TypeKind::Record(d) => table.struct_info(*d).map(|s| s.is_polymorphic).unwrap_or(false),
                _ => false,
            }),
            "__is_abstract" => false,
            "__is_final" => false,
            "__is_empty" => first.is_some_and(|t| match &table.get(t).kind {
                TypeKind::Record(d) => table.struct_info(*d).map(|s| s.members.is_empty() && s.bases.is_empty()).unwrap_or(false),
                _ => false,
            }),
            "__is_aggregate" => first.is_some_and(|t| table.is_class(t)),
            "__is_standard_layout" => first.is_some_and(|t| match &table.get(t).kind {
                TypeKind::Record(d) => table.struct_info(*d).map(|s| s.bases.len() <= 1).unwrap_or(true),
                _ => true,
            }),
            "__is_trivially_copyable" | "__is_trivial" | "__is_pod" => first.is_some_and(|t| match &table.get(t).kind {
                TypeKind::Record(d) => table.struct_info(*d).map(|s| !s.has_user_destructor).unwrap_or(true),
                _ => true,
            }),
            "__is_void" => first.is_some_and(|t| matches!(table.get(t).kind, TypeKind::Void)),
            "__is_nullptr" => first.is_some_and(|t| matches!(table.get(t).kind, TypeKind::NullptrT)),
            "__is_integral" => first.is_some_and(|t| table.is_integral(t)),
            "__is_floating_point" => first.is_some_and(|t| table.is_floating_point(t)),
            "__is_array" => first.is_some_and(|t| matches!(table.get(t).kind, TypeKind::Array { .. })),
            "__is_bounded_array" => first.is_some_and(|t| matches!(&table.get(t).kind, TypeKind::Array { size: Some(_), .. })),
            "__is_unbounded_array" => first.is_some_and(|t| matches!(&table.get(t).kind, TypeKind::Array { size: None, .. })),
            "__is_pointer" => first.is_some_and(|t| table.is_pointer(t)),
            "__is_lvalue_reference" => first.is_some_and(|t| matches!(table.get(t).kind, TypeKind::LValueRef(_))),
            "__is_rvalue_reference" => first.is_some_and(|t| matches!(table.get(t).kind, TypeKind::RValueRef(_))),
            "__is_reference" => first.is_some_and(|t| table.is_reference(t)),
            "__is_arithmetic" => first.is_some_and(|t| table.is_arithmetic(t)),
            "__is_fundamental" => first.is_some_and(|t| table.is_arithmetic(t) || matches!(table.get(t).kind, TypeKind::Void | TypeKind::NullptrT)),
            "__is_object" => first.is_some_and(|t| !table.is_reference(t) && !matches!(table.get(t).kind, TypeKind::Void | TypeKind::Function { .. })),
            "__is_scalar" => first.is_some_and(|t| table.is_arithmetic(t) || table.is_pointer(t) || matches!(table.get(t).kind, TypeKind::Enum(_) | TypeKind::NullptrT)),
            "__is_compound" => first.is_some_and(|t| !table.is_arithmetic(t) && !matches!(table.get(t).kind, TypeKind::Void)),
            "__is_member_object_pointer" => false,
            "__is_member_function_pointer" => false,
            "__is_function" => first.is_some_and(|t| matches!(table.get(t).kind, TypeKind::Function { .. })),
            "__is_const" => first.is_some_and(|t| table.get(t).cv.is_const),
            "__is_volatile" => first.is_some_and(|t| table.get(t).cv.is_volatile),
            "__is_signed" => first.is_some_and(|t| table.is_signed(t)),
            "__is_unsigned" => first.is_some_and(|t| table.is_integral(t) && !table.is_signed(t)),
            "__is_convertible" => match (first, second) {
                (Some(a), Some(b)) => crate::infer::classify_conversion(table, a, b).is_some(),
                _ => false,
            },
            "__has_unique_object_representations" => first.is_some_and(|t| match &table.get(t).kind {
                TypeKind::Record(d) => table.struct_info(*d).map(|s| !s.has_user_destructor).unwrap_or(true),
                _ => table.is_arithmetic(t) || table.is_pointer(t),
            }),
            _ => return Err(ConstEvalError::UnknownIntrinsic(name)),
        };
        Ok(ConstValue::Bool(result))
    }

    /// The 4 constexpr-evaluable math builtins (§6.3). `va_start`/`va_arg`
    /// are intentionally not handled here.
    fn eval_builtin_call(
        &mut self,
        env: &NameEnv,
        callee: ExprId,
        args: &[ExprId],
    ) -> Result<ConstValue, ConstEvalError> {
        let ExprKind::IdentifierRef(name) = &self.ast.exprs[callee].kind else {
            return Err(ConstEvalError::NotConstant);
        };
        let spelling = self.spelling_of(*name);
        let [arg] = args else { return Err(ConstEvalError::NotConstant) };
        let value = self.eval(env, *arg)?;
        match spelling {
            "__builtin_labs" | "__builtin_llabs" => {
                value.as_i64().map(|i| ConstValue::Int(i.abs())).ok_or(ConstEvalError::TypeMismatch)
            }
            "__builtin_fabs" | "__builtin_fabsf" => {
                value.as_f64().map(|f| ConstValue::Float(f.abs())).ok_or(ConstEvalError::TypeMismatch)
            }
            _ => Err(ConstEvalError::NotConstant),
        }
    }

    fn spelling_of(&self, name: StringHandle) -> &str {
        self.interner.resolve(name)
    }
}

fn is_base_of_decl(table: &TypeTable, base: flashcpp_par::DeclId, derived: flashcpp_par::DeclId) -> bool {
    if base == derived {
        return true;
    }
    let Some(info) = table.struct_info(derived) else { return false };
    info.bases.iter().any(|b| match &table.get(b.ty).kind {
        TypeKind::Record(d) => is_base_of_decl(table, base, *d),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashcpp_par::{BuiltinKind, Parser};
    use flashcpp_util::Handler;

    fn parse(src: &str, interner: &mut StringInterner) -> Ast {
        let mut handler = Handler::new();
        let parser = Parser::new(src, &mut handler, interner);
        parser.parse()
    }

    fn first_init(ast: &Ast) -> ExprId {
        let decl = ast.top_level[0];
        let flashcpp_par::DeclKind::Variable(var) = &ast.decls[decl].kind else { panic!("expected a variable decl") };
        var.init.unwrap()
    }

    #[test]
    fn evaluates_integer_arithmetic() {
        let mut interner = StringInterner::new();
        let ast = parse("int x = 1 + 2 * 3;", &mut interner);
        let mut table = TypeTable::new();
        let env = NameEnv::new();
        let mut evaluator = ConstEvaluator::new(&ast, &mut table, &interner);

        let value = evaluator.eval(&env, first_init(&ast)).unwrap();
        assert_eq!(value.as_i64(), Some(7));
    }

    #[test]
    fn division_by_zero_is_reported() {
        let mut interner = StringInterner::new();
        let ast = parse("int x = 1 / 0;", &mut interner);
        let mut table = TypeTable::new();
        let env = NameEnv::new();
        let mut evaluator = ConstEvaluator::new(&ast, &mut table, &interner);

        assert_eq!(evaluator.eval(&env, first_init(&ast)), Err(ConstEvalError::DivisionByZero));
    }

    #[test]
    fn sizeof_builtin_matches_table() {
        let mut interner = StringInterner::new();
        let ast = parse("int x = sizeof(int);", &mut interner);
        let mut table = TypeTable::new();
        let env = NameEnv::new();
        let expected = table.size_of(table.builtin(BuiltinKind::Int));
        let mut evaluator = ConstEvaluator::new(&ast, &mut table, &interner);

        assert_eq!(evaluator.eval(&env, first_init(&ast)).unwrap().as_u64(), Some(expected));
    }
}
