//! Lowers a type-checked `flashcpp_par::Ast` into the typed, linear
//! per-function IR described by §4.6: the seam between semantic analysis
//! and the machine-code converter in `flashcpp-codegen`.

pub mod builder;
pub mod ir;
pub mod mangle;

pub use builder::build;
pub use ir::{
    AddressStep, BinOpKind, CallTarget, CallingConvention, CastKind, CmpOp, Function,
    FunctionSignature, GlobalInit, Instruction, LValueStorage, LabelId, Operand, StackSlot, Target,
    TempVar, TranslationUnit, TypedValue, UnOpKind, ValueCategory,
};
