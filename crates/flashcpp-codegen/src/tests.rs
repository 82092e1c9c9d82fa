//! LIR and lowering integration tests.

use crate::*;
use flashcpp_ir::{
    BinOpKind, CallingConvention, Function as IrFunction, FunctionSignature, Instruction as IrInstruction,
    Operand as IrOperand, Target, TranslationUnit, TypedValue,
};
use flashcpp_par::BuiltinKind;
use flashcpp_sem::TypeTable;
use flashcpp_util::StringInterner;

#[test]
fn test_virtual_register_creation() {
    let reg = VirtualRegister::new(0);
    assert_eq!(reg.id, 0);
    assert_eq!(reg.width, RegisterWidth::W64);

    let reg_w32 = VirtualRegister::with_width(1, RegisterWidth::W32);
    assert_eq!(reg_w32.id, 1);
    assert_eq!(reg_w32.width, RegisterWidth::W32);
}

#[test]
fn test_physical_register_properties() {
    assert!(PhysicalRegister::RAX.is_caller_saved());
    assert!(PhysicalRegister::RCX.is_caller_saved());
    assert!(PhysicalRegister::R10.is_caller_saved());

    assert!(PhysicalRegister::RBX.is_callee_saved());
    assert!(PhysicalRegister::RBP.is_callee_saved());
    assert!(PhysicalRegister::R12.is_callee_saved());

    assert!(!PhysicalRegister::RAX.is_callee_saved());
}

#[test]
fn test_function_creation() {
    let mut interner = StringInterner::new();
    let name = interner.intern("test_fn");
    let func = lir::Function::new(name);

    assert_eq!(func.name, name);
    assert_eq!(func.instruction_count(), 0);
    assert!(!func.is_external);
}

#[test]
fn test_lir_instructions() {
    let reg1 = VirtualRegister::new(0);
    let reg2 = VirtualRegister::new(1);

    let mov = Instruction::Mov { dest: Operand::Reg(reg1), src: Operand::Imm(42) };
    assert!(matches!(mov, Instruction::Mov { .. }));

    let add = Instruction::Add { dest: Operand::Reg(reg1), src: Operand::Reg(reg2) };
    assert!(matches!(add, Instruction::Add { .. }));

    let cmp = Instruction::Cmp { src1: Operand::Reg(reg1), src2: Operand::Imm(0) };
    assert!(matches!(cmp, Instruction::Cmp { .. }));
}

#[test]
fn test_addressing_modes() {
    let base = Address::Base { base: PhysicalRegister::RBP };
    assert!(matches!(base, Address::Base { .. }));

    let base_off = Address::BaseOffset { base: PhysicalRegister::RBP, offset: 16 };
    assert!(matches!(base_off, Address::BaseOffset { .. }));

    let indexed = Address::Indexed { base: PhysicalRegister::RBP, index: PhysicalRegister::RAX, scale: 8, offset: 0 };
    assert!(matches!(indexed, Address::Indexed { .. }));

    let stack = Address::StackRelative { offset: -16 };
    assert!(matches!(stack, Address::StackRelative { .. }));
}

#[test]
fn test_systemv_abi_arg_registers() {
    assert_eq!(SystemVAbi::get_arg_register(0), Some(PhysicalRegister::RDI));
    assert_eq!(SystemVAbi::get_arg_register(1), Some(PhysicalRegister::RSI));
    assert_eq!(SystemVAbi::get_arg_register(2), Some(PhysicalRegister::RDX));
    assert_eq!(SystemVAbi::get_arg_register(3), Some(PhysicalRegister::RCX));
    assert_eq!(SystemVAbi::get_arg_register(4), Some(PhysicalRegister::R8));
    assert_eq!(SystemVAbi::get_arg_register(5), Some(PhysicalRegister::R9));
    assert_eq!(SystemVAbi::get_arg_register(6), None);
}

#[test]
fn test_stack_frame_layout() {
    let mut frame = StackFrame::new();
    frame.frame_size(4, 2, true);

    assert!(frame.frame_size > 0);
    assert_eq!(frame.local_offsets.len(), 4);
    assert!(!frame.saved_callee_regs.is_empty());
    assert_eq!(frame.frame_size % 16, 0);
}

#[test]
fn test_spill_slot_allocation() {
    let mut frame = StackFrame::new();
    frame.frame_size(2, 0, false);

    let slot1 = frame.allocate_spill_slot();
    let slot2 = frame.allocate_spill_slot();

    assert_eq!(slot2 - slot1, 8);
}

#[test]
fn test_param_assignment() {
    let assign0 = ParamAssignment::from_systemv(0, 0, false);
    assert!(matches!(assign0.location, ParamLocation::Register(PhysicalRegister::RDI)));

    let assign6 = ParamAssignment::from_systemv(6, 6, false);
    assert!(matches!(assign6.location, ParamLocation::Stack(_)));
}

/// Builds `int add(int a, int b) { return a + b; }` directly in
/// `flashcpp-ir` form, bypassing the parser/builder, to exercise lowering
/// in isolation.
fn add_function_ir() -> (TranslationUnit, TypeTable, StringInterner) {
    let mut table = TypeTable::new();
    let mut interner = StringInterner::new();
    let int = table.builtin(BuiltinKind::Int);
    let name = interner.intern("_Z3addii");

    let mut f = IrFunction::default();
    let a_slot = f.new_slot(int);
    let b_slot = f.new_slot(int);
    f.param_slots = vec![a_slot, b_slot];

    f.push(IrInstruction::FunctionDecl(FunctionSignature {
        mangled_name: name,
        return_type: int,
        params: vec![int, int],
        has_hidden_return_param: false,
        calling_convention: CallingConvention::Native,
        is_external: false,
    }));

    let a = f.new_temp();
    f.push(IrInstruction::Load { slot: a_slot, ty: int, result: a });
    let b = f.new_temp();
    f.push(IrInstruction::Load { slot: b_slot, ty: int, result: b });
    let sum = f.new_temp();
    f.push(IrInstruction::BinaryOp {
        op: BinOpKind::Add,
        lhs: TypedValue { ty: int, operand: IrOperand::Temp(a) },
        rhs: TypedValue { ty: int, operand: IrOperand::Temp(b) },
        result: sum,
    });
    f.push(IrInstruction::Return(Some(TypedValue { ty: int, operand: IrOperand::Temp(sum) })));
    f.push(IrInstruction::FunctionEnd);

    let mut tu = TranslationUnit::default();
    tu.functions.push((name, f));
    (tu, table, interner)
}

#[test]
fn lowers_a_two_parameter_function_to_lir() {
    let (tu, table, _interner) = add_function_ir();
    let module = lower_translation_unit(&tu, &table, Target::Linux);

    assert_eq!(module.functions.len(), 1);
    let f = &module.functions[0];
    assert!(!f.instructions.is_empty());
    assert!(f.instructions.iter().any(|i| matches!(i, Instruction::Add { .. })));
    assert!(f.instructions.iter().any(|i| matches!(i, Instruction::Ret { .. })));
}

#[test]
fn parameters_land_in_sysv_argument_registers() {
    let (tu, table, _interner) = add_function_ir();
    let module = lower_translation_unit(&tu, &table, Target::Linux);
    let f = &module.functions[0];

    let stores_from_rdi = f.instructions.iter().any(|i| {
        matches!(i, Instruction::Store { src: Operand::PhysReg(PhysicalRegister::RDI), .. })
    });
    assert!(stores_from_rdi, "first integer parameter should come from RDI");
}
