//! AST node definitions (§4.2).
//!
//! Nodes are stored in append-only [`flashcpp_util::IndexVec`] arenas, one per
//! node category, and referenced by stable handles (`ExprId`, `StmtId`,
//! `DeclId`, `TypeSpecId`). A node is always pushed only after its children,
//! so a node's handle is always numerically greater than any handle it
//! contains - a node never points to a later node.

use flashcpp_lex::{CharLiteral, NumericLiteral, OperatorKind, StringLiteral};
use flashcpp_util::{define_idx, IndexVec, Span, StringHandle};

define_idx!(ExprId);
define_idx!(StmtId);
define_idx!(DeclId);
define_idx!(TypeSpecId);

/// Semantic type table index. Parsing resolves a type specifier to one of
/// these as early as possible; inside a template it may stay `None` until
/// instantiation substitutes the dependent name.
define_idx!(TypeIndex);

/// Per-translation-unit AST arena.
#[derive(Debug, Default)]
pub struct Ast {
    pub exprs: IndexVec<ExprId, ExprNode>,
    pub stmts: IndexVec<StmtId, StmtNode>,
    pub decls: IndexVec<DeclId, DeclNode>,
    pub type_specs: IndexVec<TypeSpecId, TypeSpecNode>,
    /// Top-level declarations in source order.
    pub top_level: Vec<DeclId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_expr(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.exprs.push(ExprNode { kind, span })
    }

    pub fn push_stmt(&mut self, kind: StmtKind, span: Span) -> StmtId {
        self.stmts.push(StmtNode { kind, span })
    }

    pub fn push_decl(&mut self, kind: DeclKind, span: Span) -> DeclId {
        self.decls.push(DeclNode { kind, span })
    }

    pub fn push_type_spec(&mut self, kind: TypeSpecKind, span: Span) -> TypeSpecId {
        self.type_specs.push(TypeSpecNode {
            kind,
            span,
            resolved_type: None,
            cv: CvQualifiers::default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ExprNode {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StmtNode {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct DeclNode {
    pub kind: DeclKind,
    pub span: Span,
}

/// A parsed type specifier. `resolved_type` is filled in by semantic
/// analysis as soon as the name can be looked up; it stays `None` for a
/// type that depends on an unsubstituted template parameter.
#[derive(Debug, Clone)]
pub struct TypeSpecNode {
    pub kind: TypeSpecKind,
    pub span: Span,
    pub resolved_type: Option<TypeIndex>,
    pub cv: CvQualifiers,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CvQualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
}

/// A (possibly qualified, possibly templated) id-expression: `x`, `std::vector`,
/// `A::B<int>::C`.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedId {
    pub leading_colon_colon: bool,
    pub segments: Vec<IdSegment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdSegment {
    pub name: StringHandle,
    pub template_args: Option<Vec<TemplateArg>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateArg {
    Type(TypeSpecId),
    Expr(ExprId),
}

#[derive(Debug, Clone)]
pub enum TypeSpecKind {
    Builtin(BuiltinKind),
    Named(QualifiedId),
    Pointer(TypeSpecId),
    Reference { target: TypeSpecId, is_rvalue: bool },
    Array { element: TypeSpecId, size: Option<ExprId> },
    Function { params: Vec<TypeSpecId>, ret: TypeSpecId },
    /// `name` resolves to a class/alias template; `args` are its arguments.
    TemplateId { name: QualifiedId, args: Vec<TemplateArg> },
    /// A name that can't be resolved until an enclosing template is
    /// instantiated (e.g. `T::value_type` or a template type parameter).
    Dependent(StringHandle),
    Auto,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    Char8T,
    Char16T,
    Char32T,
    WCharT,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    LongDouble,
    Nullptr,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Single, unqualified identifier reference: `x`.
    IdentifierRef(StringHandle),
    /// Multi-segment or templated id-expression: `std::vector<int>`.
    QualifiedId(QualifiedId),
    NumericLiteral(NumericLiteral),
    StringLiteral(StringLiteral),
    CharLiteral(CharLiteral),
    BoolLiteral(bool),
    NullptrLiteral,
    BinaryOp {
        op: OperatorKind,
        lhs: ExprId,
        rhs: ExprId,
    },
    UnaryOp {
        op: OperatorKind,
        operand: ExprId,
        /// true for postfix `x++`/`x--`, false for prefix.
        is_postfix: bool,
    },
    MemberAccess {
        base: ExprId,
        member: StringHandle,
        /// `->` rather than `.`.
        is_arrow: bool,
    },
    /// `base->*member` / `base.*member`.
    PointerToMember {
        base: ExprId,
        member: ExprId,
        is_arrow: bool,
    },
    ArraySubscript {
        base: ExprId,
        index: ExprId,
    },
    Call {
        callee: ExprId,
        args: Vec<ExprId>,
    },
    Constructor {
        type_spec: TypeSpecId,
        args: Vec<ExprId>,
    },
    Cast {
        kind: CastKind,
        target: TypeSpecId,
        operand: ExprId,
    },
    Sizeof(SizeofOperand),
    Alignof(TypeSpecId),
    TypeTraitIntrinsic {
        name: StringHandle,
        type_args: Vec<TypeSpecId>,
    },
    /// `(pack op ... )`, `(... op pack)`, `(pack op ... op init)`.
    FoldExpression {
        op: OperatorKind,
        pack: ExprId,
        init: Option<ExprId>,
        /// Whether `...` is on the right (`pack op ...`) vs left (`... op pack`).
        right_fold: bool,
    },
    Lambda(Box<LambdaExpr>),
    Conditional {
        cond: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    Assign {
        op: OperatorKind,
        place: ExprId,
        value: ExprId,
    },
    Comma(Vec<ExprId>),
    New(Box<NewExpr>),
    Delete {
        operand: ExprId,
        is_array: bool,
    },
    Throw(Option<ExprId>),
    /// `sizeof...(pack)`.
    SizeofPack(StringHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    CStyle,
    Static,
    Dynamic,
    Const,
    Reinterpret,
    Functional,
}

#[derive(Debug, Clone)]
pub enum SizeofOperand {
    Type(TypeSpecId),
    Expr(ExprId),
}

#[derive(Debug, Clone)]
pub struct LambdaExpr {
    pub captures: Vec<LambdaCapture>,
    pub params: Vec<ParamDecl>,
    pub ret_type: Option<TypeSpecId>,
    pub body: StmtId,
}

#[derive(Debug, Clone)]
pub struct LambdaCapture {
    /// `None` captures `this`.
    pub name: Option<StringHandle>,
    pub by_ref: bool,
    pub init: Option<ExprId>,
}

#[derive(Debug, Clone)]
pub struct NewExpr {
    pub placement: Vec<ExprId>,
    pub type_spec: TypeSpecId,
    pub array_size: Option<ExprId>,
    pub initializer: Vec<ExprId>,
}

#[derive(Debug, Clone)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    If {
        cond: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    Switch {
        cond: ExprId,
        body: StmtId,
        cases: Vec<SwitchCase>,
    },
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        step: Option<ExprId>,
        body: StmtId,
    },
    RangeFor {
        decl: DeclId,
        range: ExprId,
        body: StmtId,
    },
    While {
        cond: ExprId,
        body: StmtId,
    },
    DoWhile {
        body: StmtId,
        cond: ExprId,
    },
    Return(Option<ExprId>),
    Break,
    Continue,
    Goto(StringHandle),
    Label {
        name: StringHandle,
        stmt: StmtId,
    },
    TryCatch {
        try_block: StmtId,
        catches: Vec<CatchClause>,
    },
    ExpressionStmt(ExprId),
    Declaration(DeclId),
    Empty,
}

/// A single `case`/`default` label and the statement index range it guards
/// is recorded at the switch level rather than per-statement, since C++
/// switch bodies are a single compound statement with fallthrough.
#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` is the `default:` label.
    pub value: Option<ExprId>,
    /// Index into the switch body's statement list where this case's code starts.
    pub stmt_index: usize,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    /// `None` is `catch (...)`.
    pub param: Option<ParamDecl>,
    pub body: StmtId,
}

#[derive(Debug, Clone)]
pub enum DeclKind {
    Variable(VariableDecl),
    Function(FunctionDecl),
    Record(RecordDecl),
    Enum(EnumDecl),
    Namespace(NamespaceDecl),
    UsingAlias(UsingAliasDecl),
    UsingDirective(QualifiedId),
    TemplateParam(TemplateParamDecl),
    Concept(ConceptDecl),
    /// A member-access-specifier pseudo-declaration inside a class body
    /// (`public:` / `protected:` / `private:`), kept as a node so member
    /// order and the specifier that governed each member are both visible
    /// in the arena.
    AccessSpecifier(AccessSpec),
    /// `static_assert(cond, message)`.
    StaticAssert { cond: ExprId, message: Option<StringLiteral> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessSpec {
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    None,
    Static,
    Extern,
    ThreadLocal,
    Mutable,
}

#[derive(Debug, Clone)]
pub struct VariableDecl {
    pub name: StringHandle,
    pub ty: TypeSpecId,
    pub init: Option<ExprId>,
    pub storage: StorageClass,
    pub is_constexpr: bool,
    /// `auto [a, b] = pair;` - structured-binding names, empty otherwise.
    pub structured_bindings: Vec<StringHandle>,
}

#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: Option<StringHandle>,
    pub ty: TypeSpecId,
    pub default: Option<ExprId>,
}

/// How a function's name was spelled: an ordinary name, `operator<op>`
/// (a single function name per §4.4), a conversion operator (whose "return
/// type" is folded into the name, with no separate return-type token), or a
/// special member.
#[derive(Debug, Clone)]
pub enum FunctionName {
    Named(StringHandle),
    OperatorOverload(OperatorKind),
    ConversionOperator(TypeSpecId),
    Constructor,
    Destructor,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: FunctionName,
    pub template_params: Vec<DeclId>,
    pub params: Vec<ParamDecl>,
    pub ret_type: Option<TypeSpecId>,
    pub body: Option<StmtId>,
    /// Recorded lexer buffer range for a template member-function body whose
    /// parse is deferred until instantiation (§4.4 two-phase parsing).
    /// `Some` only when `body` is `None` and this function belongs to a
    /// class template.
    pub deferred_body: Option<DeferredBody>,
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_override: bool,
    pub is_const: bool,
    pub is_constexpr: bool,
    pub is_explicit: bool,
    pub is_noexcept: bool,
    pub is_deleted: bool,
    pub is_defaulted: bool,
}

/// Saved lexer positions bracketing an unparsed function body. Re-entering
/// the lexer at `start` and stopping at `end` reproduces exactly the token
/// range that was skipped; re-parsing never touches source text outside it.
#[derive(Debug, Clone, Copy)]
pub struct DeferredBody {
    pub start: flashcpp_lex::LexerPosition,
    pub end: flashcpp_lex::LexerPosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Struct,
    Class,
    Union,
}

#[derive(Debug, Clone)]
pub struct RecordDecl {
    pub name: StringHandle,
    pub kind: RecordKind,
    pub template_params: Vec<DeclId>,
    pub bases: Vec<BaseClause>,
    pub members: Vec<DeclId>,
}

#[derive(Debug, Clone)]
pub struct BaseClause {
    pub ty: BaseType,
    pub access: AccessSpec,
    pub is_virtual: bool,
}

/// A base-class clause may name a concrete/qualified type, or a template
/// parameter whose actual base is only known once the enclosing template is
/// instantiated (§4.4).
#[derive(Debug, Clone)]
pub enum BaseType {
    Concrete(TypeSpecId),
    DeferredTemplateParam(StringHandle),
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: Option<StringHandle>,
    pub is_scoped: bool,
    pub underlying_type: Option<TypeSpecId>,
    pub enumerators: Vec<(StringHandle, Option<ExprId>)>,
}

#[derive(Debug, Clone)]
pub struct NamespaceDecl {
    /// `None` for an anonymous namespace.
    pub name: Option<StringHandle>,
    pub members: Vec<DeclId>,
}

#[derive(Debug, Clone)]
pub enum UsingTarget {
    Type(TypeSpecId),
    Namespace(QualifiedId),
}

#[derive(Debug, Clone)]
pub struct UsingAliasDecl {
    pub name: StringHandle,
    pub target: UsingTarget,
}

#[derive(Debug, Clone)]
pub enum TemplateParamDecl {
    Type {
        name: StringHandle,
        default: Option<TypeSpecId>,
        is_variadic: bool,
    },
    NonType {
        name: StringHandle,
        ty: TypeSpecId,
        default: Option<ExprId>,
        is_variadic: bool,
    },
    TemplateTemplate {
        name: StringHandle,
        params: Vec<DeclId>,
        default: Option<QualifiedId>,
    },
}

#[derive(Debug, Clone)]
pub struct ConceptDecl {
    pub name: StringHandle,
    pub template_params: Vec<DeclId>,
    pub constraint: ExprId,
}
