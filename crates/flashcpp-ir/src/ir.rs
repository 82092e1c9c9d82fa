//! The typed IR instruction set (§4.6): a linear, per-function opcode
//! stream rather than a basic-block CFG. Instructions appear in exact
//! emission order and `flashcpp-codegen` never reorders them (§5).

use flashcpp_par::TypeIndex;
use flashcpp_util::{define_idx, StringHandle};

define_idx!(TempVar);
define_idx!(LabelId);
define_idx!(StackSlot);

/// Target object format/ABI/mangling family. Selected by `--target-linux`
/// / `--target-windows` (§6.1); defaults to the host when neither is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Linux,
    Windows,
}

impl Target {
    pub fn host() -> Self {
        if cfg!(target_os = "windows") {
            Target::Windows
        } else {
            Target::Linux
        }
    }
}

/// An operand: either a previously computed temporary or a literal
/// constant known at IR-construction time.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Temp(TempVar),
    IntConst(i64),
    FloatConst(f64),
    /// Index into the translation unit's string literal pool.
    StringConst(u32),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypedValue {
    pub ty: TypeIndex,
    pub operand: Operand,
}

impl TypedValue {
    pub fn temp(ty: TypeIndex, t: TempVar) -> Self {
        Self { ty, operand: Operand::Temp(t) }
    }

    pub fn int_const(ty: TypeIndex, v: i64) -> Self {
        Self { ty, operand: Operand::IntConst(v) }
    }
}

/// How a value produced by an instruction should be treated by the
/// destructor-scheduling and lvalue-assignment passes (§4.6).
#[derive(Debug, Clone, PartialEq)]
pub enum ValueCategory {
    LValue(LValueStorage),
    XValue(LValueStorage),
    PRValue { eligible_for_rvo: bool, is_return_value: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LValueStorage {
    Direct { stack_slot: StackSlot },
    Indirect { pointer: TempVar },
    Member { base: TempVar, offset: u64, name: StringHandle },
    ArrayElement { array: TempVar, index: TempVar, elem_type: TypeIndex },
    Temporary { slot: StackSlot },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    LogicalAnd,
    LogicalOr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOpKind {
    Neg,
    Not,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    IntToInt,
    IntToFloat,
    FloatToInt,
    FloatToFloat,
    PointerToPointer,
    PointerToInt,
    IntToPointer,
    Bitcast,
}

/// One step of a chained address computation (`a.b[i].c`): either an
/// array-index step (scaled by `elem_size`) or a fixed member offset.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressStep {
    ArrayIndex { index: TypedValue, elem_size: u64 },
    MemberOffset { offset: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum CallingConvention {
    /// SysV AMD64 on Linux, Microsoft x64 on Windows - selected from the
    /// enclosing function's `Target` rather than spelled per-call, since
    /// this IR has no notion of calling an ABI foreign to its own target.
    Native,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    /// A direct call to a function named by its already-mangled symbol.
    Direct(StringHandle),
    Indirect(TypedValue),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub mangled_name: StringHandle,
    pub return_type: TypeIndex,
    pub params: Vec<TypeIndex>,
    pub has_hidden_return_param: bool,
    pub calling_convention: CallingConvention,
    pub is_external: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GlobalInit {
    Zero,
    Bytes(Vec<u8>),
}

/// The minimum opcode set from §4.6. `TempVar` results carry their value
/// category in the owning [`Function`]'s `categories` table rather than
/// inline, since most instructions that produce a category (locals,
/// members, array elements) need to look it up again at every later use,
/// not just at the point of definition.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // Arithmetic / logic
    BinaryOp { op: BinOpKind, lhs: TypedValue, rhs: TypedValue, result: TempVar },
    UnaryOp { op: UnOpKind, operand: TypedValue, result: TempVar },
    Compare { op: CmpOp, lhs: TypedValue, rhs: TypedValue, result: TempVar },
    Cast { kind: CastKind, operand: TypedValue, result: TempVar },

    // Memory
    StackAlloc { slot: StackSlot, ty: TypeIndex },
    Load { slot: StackSlot, ty: TypeIndex, result: TempVar },
    Store { slot: StackSlot, value: TypedValue },
    Dereference { pointer: TypedValue, result: TempVar },
    AddressOf { operand: TypedValue, result: TempVar },
    MemberLoad { base: TypedValue, offset: u64, member_type: TypeIndex, result: TempVar },
    MemberStore { base: TypedValue, offset: u64, member_type: TypeIndex, value: TypedValue },
    ArrayLoad { array: TypedValue, index: TypedValue, elem_size: u64, elem_type: TypeIndex, result: TempVar },
    ArrayStore { array: TypedValue, index: TypedValue, elem_size: u64, elem_type: TypeIndex, value: TypedValue },
    ComputeAddress { base: TypedValue, chain: Vec<AddressStep>, result: TempVar },

    // Control
    Label(LabelId),
    Jump(LabelId),
    CondBranch { cond: TypedValue, then_label: LabelId, else_label: LabelId },
    Return(Option<TypedValue>),
    Call {
        callee: CallTarget,
        args: Vec<TypedValue>,
        result: Option<TempVar>,
        uses_return_slot: bool,
        return_slot: Option<TempVar>,
    },

    // Functions
    FunctionDecl(FunctionSignature),
    FunctionEnd,

    // Objects
    ConstructorCall { target: StringHandle, args: Vec<TypedValue>, use_return_slot: bool, return_slot_offset: u64 },
    DestructorCall { target: StringHandle, target_address: TypedValue, struct_type: TypeIndex },

    // Globals
    GlobalVariableDecl { name: StringHandle, ty: TypeIndex, init: GlobalInit, element_count: Option<u64> },
    GlobalLoad { name: StringHandle, ty: TypeIndex, result: TempVar },
    GlobalStore { name: StringHandle, value: TypedValue },

    // Exceptions
    TryBegin,
    TryEnd,
    CatchBegin { catch_type: TypeIndex, continuation_label: LabelId },
    CatchEnd { continuation_label: LabelId },
    Throw { type_descriptor: TypeIndex, operand: Option<TypedValue> },
    ReThrow,
}

/// One function's linear instruction stream plus the per-`TempVar`
/// metadata codegen needs that doesn't fit inline in an `Instruction`.
#[derive(Debug, Clone, Default)]
pub struct Function {
    pub instructions: Vec<Instruction>,
    pub categories: flashcpp_util::FxHashMap<TempVar, ValueCategory>,
    pub slot_types: flashcpp_util::FxHashMap<StackSlot, TypeIndex>,
    /// Incoming parameter stack slots in calling-convention order - the
    /// hidden return-value pointer and `this` come first when present,
    /// matching `FunctionSignature::params`'s own ordering.
    pub param_slots: Vec<StackSlot>,
    next_temp: u32,
    next_label: u32,
    next_slot: u32,
}

impl Function {
    pub fn new_temp(&mut self) -> TempVar {
        let t = TempVar(self.next_temp);
        self.next_temp += 1;
        t
    }

    pub fn new_label(&mut self) -> LabelId {
        let l = LabelId(self.next_label);
        self.next_label += 1;
        l
    }

    pub fn new_slot(&mut self, ty: TypeIndex) -> StackSlot {
        let s = StackSlot(self.next_slot);
        self.next_slot += 1;
        self.slot_types.insert(s, ty);
        s
    }

    pub fn push(&mut self, inst: Instruction) {
        self.instructions.push(inst);
    }

    pub fn set_category(&mut self, temp: TempVar, category: ValueCategory) {
        self.categories.insert(temp, category);
    }

    pub fn category_of(&self, temp: TempVar) -> Option<&ValueCategory> {
        self.categories.get(&temp)
    }
}

/// The whole translation unit's IR: one [`Function`] per function
/// definition plus the translation-unit-level global declarations, in
/// source order (§5).
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    pub functions: Vec<(StringHandle, Function)>,
    pub globals: Vec<Instruction>,
    /// String literals in first-use order; `Operand::StringConst(i)` indexes
    /// this pool. The object writer places it in `.rodata`.
    pub string_pool: Vec<Vec<u8>>,
}
