//! Encoder and object-writer integration tests.

use flashcpp_codegen::{CallTarget, Function as LirFunction, GlobalData, GlobalSymbol, Instruction, Operand, PhysicalRegister, VirtualRegister};
use flashcpp_ir::Target;
use flashcpp_util::StringInterner;

use crate::encode::encode_function;
use crate::writer::write_object;

/// `int add(int a, int b) { return a + b; }` already lowered to LIR, the
/// way `flashcpp-codegen::lower` would leave it: parameters stored from
/// RDI/RSI into virtual registers, added, result moved into RAX.
fn add_function(interner: &mut StringInterner) -> LirFunction {
    let name = interner.intern("_Z3addii");
    let a = VirtualRegister::new(0);
    let b = VirtualRegister::new(1);

    let mut f = LirFunction::new(name);
    f.registers = vec![a, b];
    f.param_count = 2;
    f.instructions = vec![
        Instruction::Push { src: Operand::PhysReg(PhysicalRegister::RBP) },
        Instruction::Mov { dest: Operand::PhysReg(PhysicalRegister::RBP), src: Operand::PhysReg(PhysicalRegister::RSP) },
        Instruction::Mov { dest: Operand::Reg(a), src: Operand::PhysReg(PhysicalRegister::RDI) },
        Instruction::Mov { dest: Operand::Reg(b), src: Operand::PhysReg(PhysicalRegister::RSI) },
        Instruction::Add { dest: Operand::Reg(a), src: Operand::Reg(b) },
        Instruction::Mov { dest: Operand::PhysReg(PhysicalRegister::RAX), src: Operand::Reg(a) },
        Instruction::Pop { dest: Operand::PhysReg(PhysicalRegister::RBP) },
        Instruction::Ret { value: None },
    ];
    f.frame_size = 16;
    f
}

fn caller_function(interner: &mut StringInterner, callee: flashcpp_util::StringHandle) -> LirFunction {
    let name = interner.intern("_Z6callerv");
    let mut f = LirFunction::new(name);
    f.instructions = vec![
        Instruction::Mov { dest: Operand::PhysReg(PhysicalRegister::RDI), src: Operand::Imm(1) },
        Instruction::Mov { dest: Operand::PhysReg(PhysicalRegister::RSI), src: Operand::Imm(2) },
        Instruction::Call { target: CallTarget::Direct(callee) },
        Instruction::Ret { value: None },
    ];
    f
}

#[test]
fn encodes_a_function_with_no_relocations() {
    let mut interner = StringInterner::new();
    let f = add_function(&mut interner);
    let encoded = encode_function(&f).expect("encodes");
    assert!(!encoded.code.is_empty());
    assert!(encoded.relocations.is_empty());
}

#[test]
fn encodes_a_direct_call_with_a_branch_relocation() {
    let mut interner = StringInterner::new();
    let add = add_function(&mut interner);
    let caller = caller_function(&mut interner, add.name);
    let encoded = encode_function(&caller).expect("encodes");
    assert_eq!(encoded.relocations.len(), 1);
    assert_eq!(encoded.relocations[0].symbol, add.name);
}

#[test]
fn writes_an_elf_object_with_both_function_symbols() {
    let mut interner = StringInterner::new();
    let add = add_function(&mut interner);
    let caller = caller_function(&mut interner, add.name);
    let add_encoded = encode_function(&add).expect("encodes");
    let caller_encoded = encode_function(&caller).expect("encodes");

    let globals = vec![GlobalSymbol { name: interner.intern("counter"), size: 4, data: GlobalData::Zero }];
    let bytes = write_object(Target::Linux, &[add_encoded, caller_encoded], &globals, &interner).expect("writes object");

    assert_eq!(&bytes[0..4], &[0x7f, b'E', b'L', b'F']);
}

#[test]
fn writes_a_coff_object_for_the_windows_target() {
    let mut interner = StringInterner::new();
    let add = add_function(&mut interner);
    let add_encoded = encode_function(&add).expect("encodes");

    let bytes = write_object(Target::Windows, &[add_encoded], &[], &interner).expect("writes object");
    // COFF's machine field (IMAGE_FILE_MACHINE_AMD64 = 0x8664) opens the file.
    assert_eq!(&bytes[0..2], &0x8664u16.to_le_bytes());
}
