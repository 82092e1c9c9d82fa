//! IR to LIR Lowering (§4.7 steps 1-6)
//!
//! Converts a `flashcpp_ir::TranslationUnit` into x86-64 LIR: frame
//! layout, SysV/Win64 parameter assignment, direct instruction selection,
//! signed/unsigned handling and branch patching. Every IR temporary
//! becomes its own virtual register - selection and register allocation
//! are separate passes, and this module only does the former.

use crate::calling_convention::SystemVAbi;
use crate::lir::{self, Address, CallTarget, Condition, Instruction, Operand, PhysicalRegister, RegisterWidth, VirtualRegister};
use flashcpp_ir::{
    AddressStep, BinOpKind, CallTarget as IrCallTarget, CastKind, CmpOp, Function as IrFunction,
    GlobalInit, Instruction as IrInstruction, LValueStorage, LabelId, Operand as IrOperand,
    StackSlot, Target, TempVar, TranslationUnit, TypedValue, UnOpKind, ValueCategory,
};
use flashcpp_sem::TypeTable;
use flashcpp_util::{FxHashMap, Idx, StringHandle};

/// The lowered translation unit: one LIR function per IR function, in the
/// same order (§5 - no reordering), plus the global data the object writer
/// places in `.data`/`.bss`/`.rodata`.
pub struct Module {
    pub functions: Vec<lir::Function>,
    pub globals: Vec<GlobalSymbol>,
    pub target: Target,
}

/// One global variable's worth of object-writer input: a mangled symbol
/// name, its size, and either a zero fill (`.bss`) or explicit bytes
/// (`.data`). Source-order position is preserved (§5).
pub struct GlobalSymbol {
    pub name: StringHandle,
    pub size: u64,
    pub data: GlobalData,
}

pub enum GlobalData {
    Zero,
    Bytes(Vec<u8>),
}

pub fn lower_translation_unit(tu: &TranslationUnit, table: &TypeTable, target: Target) -> Module {
    let functions = tu.functions.iter().map(|(_, f)| lower_function(f, table, target)).collect();
    let globals = tu.globals.iter().filter_map(|inst| lower_global(inst, table)).collect();
    Module { functions, globals, target }
}

fn lower_global(inst: &IrInstruction, table: &TypeTable) -> Option<GlobalSymbol> {
    let IrInstruction::GlobalVariableDecl { name, ty, init, element_count } = inst else {
        return None;
    };
    let element_size = table.size_of(*ty).max(1);
    let size = element_size * element_count.unwrap_or(1);
    let data = match init {
        GlobalInit::Zero => GlobalData::Zero,
        GlobalInit::Bytes(bytes) => GlobalData::Bytes(bytes.clone()),
    };
    Some(GlobalSymbol { name: *name, size, data })
}

/// Stack-slot offsets (relative to `rbp`) and the final frame size for one
/// function. Slots are packed in declaration order rather than reusing
/// `StackFrame`'s fixed 8-byte-per-local layout, since a local's size here
/// is whatever its semantic type actually needs.
struct FrameLayout {
    offsets: FxHashMap<StackSlot, i32>,
    size: u32,
}

fn layout_frame(irf: &IrFunction, table: &TypeTable) -> FrameLayout {
    let mut slots: Vec<StackSlot> = irf.slot_types.keys().copied().collect();
    slots.sort_by_key(|s| s.index());

    let mut offsets = FxHashMap::default();
    let mut cursor: i64 = 0;
    for slot in slots {
        let ty = irf.slot_types[&slot];
        let size = table.size_of(ty).max(1) as i64;
        let align = table.align_of(ty).max(1) as i64;
        cursor += size;
        cursor = align_up(cursor, align);
        offsets.insert(slot, -(cursor as i32));
    }
    let size = align_up(cursor, 16) as u32;
    FrameLayout { offsets, size }
}

fn align_up(v: i64, align: i64) -> i64 {
    (v + align - 1) / align * align
}

fn width_of(table: &TypeTable, ty: flashcpp_par::TypeIndex) -> RegisterWidth {
    match table.size_of(ty) {
        1 => RegisterWidth::W8,
        2 => RegisterWidth::W16,
        4 => RegisterWidth::W32,
        _ => RegisterWidth::W64,
    }
}

struct Lowerer<'a> {
    table: &'a TypeTable,
    target: Target,
    frame: FrameLayout,
    categories: &'a FxHashMap<TempVar, ValueCategory>,
    regs: FxHashMap<TempVar, VirtualRegister>,
    labels: FxHashMap<LabelId, String>,
    next_reg: u32,
    next_label_ordinal: u32,
    epilogue_label: String,
    out: Vec<Instruction>,
}

impl<'a> Lowerer<'a> {
    fn new_reg(&mut self) -> VirtualRegister {
        let r = VirtualRegister::new(self.next_reg);
        self.next_reg += 1;
        r
    }

    fn new_reg_width(&mut self, width: RegisterWidth) -> VirtualRegister {
        let r = VirtualRegister::with_width(self.next_reg, width);
        self.next_reg += 1;
        r
    }

    fn reg_for(&mut self, t: TempVar) -> VirtualRegister {
        if let Some(r) = self.regs.get(&t) {
            *r
        } else {
            let r = self.new_reg();
            self.regs.insert(t, r);
            r
        }
    }

    fn label_name(&mut self, l: LabelId) -> String {
        if let Some(name) = self.labels.get(&l) {
            name.clone()
        } else {
            let name = format!(".L{}", self.next_label_ordinal);
            self.next_label_ordinal += 1;
            self.labels.insert(l, name.clone());
            name
        }
    }

    fn slot_address(&self, slot: StackSlot) -> Address {
        Address::StackRelative {
            offset: *self.frame.offsets.get(&slot).unwrap_or(&0),
        }
    }

    fn lower_typed(&mut self, v: &TypedValue) -> Operand {
        match &v.operand {
            IrOperand::Temp(t) => Operand::Reg(self.reg_for(*t)),
            IrOperand::IntConst(i) => Operand::Imm(*i),
            IrOperand::FloatConst(f) => Operand::Imm(f.to_bits() as i64),
            IrOperand::StringConst(idx) => Operand::Label(format!(".Lstr{idx}")),
            IrOperand::Null => Operand::Imm(0),
        }
    }

    fn lower_typed_to_reg(&mut self, v: &TypedValue) -> VirtualRegister {
        match self.lower_typed(v) {
            Operand::Reg(r) => r,
            other => {
                let r = self.new_reg();
                self.out.push(Instruction::Mov { dest: Operand::Reg(r), src: other });
                r
            }
        }
    }

    fn is_float(&self, v: &TypedValue) -> bool {
        self.table.is_floating_point(v.ty)
    }

    fn lower_instruction(&mut self, inst: &IrInstruction) {
        match inst {
            IrInstruction::BinaryOp { op, lhs, rhs, result } => self.lower_binary(*op, lhs, rhs, *result),
            IrInstruction::UnaryOp { op, operand, result } => self.lower_unary(*op, operand, *result),
            IrInstruction::Compare { op, lhs, rhs, result } => self.lower_compare(*op, lhs, rhs, *result),
            IrInstruction::Cast { kind, operand, result } => self.lower_cast(*kind, operand, *result),

            IrInstruction::StackAlloc { .. } => {
                // Space is reserved up front by `layout_frame`; nothing to emit.
            }
            IrInstruction::Load { slot, ty, result } => {
                let dest = self.new_reg_width(width_of(self.table, *ty));
                self.regs.insert(*result, dest);
                self.out.push(Instruction::Load {
                    dest: Operand::Reg(dest),
                    addr: self.slot_address(*slot),
                    width: dest.width,
                });
            }
            IrInstruction::Store { slot, value } => {
                let width = width_of(self.table, value.ty);
                let src = self.lower_typed(value);
                self.out.push(Instruction::Store { addr: self.slot_address(*slot), src, width });
            }
            IrInstruction::Dereference { pointer, result } => {
                let base = self.lower_typed_to_reg(pointer);
                let dest = self.new_reg();
                self.regs.insert(*result, dest);
                self.out.push(Instruction::Load {
                    dest: Operand::Reg(dest),
                    addr: Address::RegIndirect { base, offset: 0 },
                    width: RegisterWidth::W64,
                });
            }
            IrInstruction::AddressOf { operand, result } => {
                let dest = self.new_reg();
                self.regs.insert(*result, dest);
                let addr = match &operand.operand {
                    IrOperand::Temp(t) => match self.categories.get(t) {
                        Some(ValueCategory::LValue(LValueStorage::Direct { stack_slot }))
                        | Some(ValueCategory::XValue(LValueStorage::Direct { stack_slot })) => {
                            self.slot_address(*stack_slot)
                        }
                        Some(ValueCategory::LValue(LValueStorage::Indirect { pointer }))
                        | Some(ValueCategory::XValue(LValueStorage::Indirect { pointer })) => {
                            Address::RegIndirect { base: self.reg_for(*pointer), offset: 0 }
                        }
                        Some(ValueCategory::LValue(LValueStorage::Member { base, offset, .. }))
                        | Some(ValueCategory::XValue(LValueStorage::Member { base, offset, .. })) => {
                            Address::RegIndirect { base: self.reg_for(*base), offset: *offset as i32 }
                        }
                        _ => Address::RegIndirect { base: self.reg_for(*t), offset: 0 },
                    },
                    _ => Address::Absolute(0),
                };
                self.out.push(Instruction::Lea { dest: Operand::Reg(dest), addr });
            }
            IrInstruction::MemberLoad { base, offset, result, member_type } => {
                let base_reg = self.lower_typed_to_reg(base);
                let dest = self.new_reg();
                self.regs.insert(*result, dest);
                self.out.push(Instruction::Load {
                    dest: Operand::Reg(dest),
                    addr: Address::RegIndirect { base: base_reg, offset: *offset as i32 },
                    width: width_of(self.table, *member_type),
                });
            }
            IrInstruction::MemberStore { base, offset, member_type, value } => {
                let base_reg = self.lower_typed_to_reg(base);
                let src = self.lower_typed(value);
                self.out.push(Instruction::Store {
                    addr: Address::RegIndirect { base: base_reg, offset: *offset as i32 },
                    src,
                    width: width_of(self.table, *member_type),
                });
            }
            IrInstruction::ArrayLoad { array, index, elem_size, elem_type, result } => {
                let array_reg = self.lower_typed_to_reg(array);
                let offset_reg = self.scale_index(index, *elem_size);
                let addr_reg = self.new_reg();
                self.out.push(Instruction::Mov { dest: Operand::Reg(addr_reg), src: Operand::Reg(array_reg) });
                self.out.push(Instruction::Add { dest: Operand::Reg(addr_reg), src: Operand::Reg(offset_reg) });
                let dest = self.new_reg();
                self.regs.insert(*result, dest);
                self.out.push(Instruction::Load {
                    dest: Operand::Reg(dest),
                    addr: Address::RegIndirect { base: addr_reg, offset: 0 },
                    width: width_of(self.table, *elem_type),
                });
            }
            IrInstruction::ArrayStore { array, index, elem_size, elem_type, value } => {
                let array_reg = self.lower_typed_to_reg(array);
                let offset_reg = self.scale_index(index, *elem_size);
                let addr_reg = self.new_reg();
                self.out.push(Instruction::Mov { dest: Operand::Reg(addr_reg), src: Operand::Reg(array_reg) });
                self.out.push(Instruction::Add { dest: Operand::Reg(addr_reg), src: Operand::Reg(offset_reg) });
                let src = self.lower_typed(value);
                self.out.push(Instruction::Store {
                    addr: Address::RegIndirect { base: addr_reg, offset: 0 },
                    src,
                    width: width_of(self.table, *elem_type),
                });
            }
            IrInstruction::ComputeAddress { base, chain, result } => {
                let mut addr_reg = self.lower_typed_to_reg(base);
                for step in chain {
                    match step {
                        AddressStep::MemberOffset { offset } => {
                            let next = self.new_reg();
                            self.out.push(Instruction::Mov { dest: Operand::Reg(next), src: Operand::Reg(addr_reg) });
                            self.out.push(Instruction::Add { dest: Operand::Reg(next), src: Operand::Imm(*offset as i64) });
                            addr_reg = next;
                        }
                        AddressStep::ArrayIndex { index, elem_size } => {
                            let offset_reg = self.scale_index(index, *elem_size);
                            let next = self.new_reg();
                            self.out.push(Instruction::Mov { dest: Operand::Reg(next), src: Operand::Reg(addr_reg) });
                            self.out.push(Instruction::Add { dest: Operand::Reg(next), src: Operand::Reg(offset_reg) });
                            addr_reg = next;
                        }
                    }
                }
                self.regs.insert(*result, addr_reg);
            }

            IrInstruction::Label(l) => {
                let name = self.label_name(*l);
                self.out.push(Instruction::Label { name });
            }
            IrInstruction::Jump(l) => {
                let name = self.label_name(*l);
                self.out.push(Instruction::Jmp { target: name });
            }
            IrInstruction::CondBranch { cond, then_label, else_label } => {
                let c = self.lower_typed(cond);
                self.out.push(Instruction::Test { src1: c.clone(), src2: c });
                let then_name = self.label_name(*then_label);
                let else_name = self.label_name(*else_label);
                self.out.push(Instruction::Jcc { cond: Condition::Ne, target: then_name });
                self.out.push(Instruction::Jmp { target: else_name });
            }
            IrInstruction::Return(value) => {
                if let Some(v) = value {
                    let src = self.lower_typed(v);
                    let ret_reg = if self.is_float(v) { PhysicalRegister::XMM0 } else { PhysicalRegister::RAX };
                    self.out.push(Instruction::Mov { dest: Operand::PhysReg(ret_reg), src });
                }
                self.out.push(Instruction::Jmp { target: self.epilogue_label.clone() });
            }
            IrInstruction::Call { callee, args, result, uses_return_slot: _, return_slot: _ } => {
                self.lower_call(callee, args, *result);
            }

            IrInstruction::FunctionDecl(_) | IrInstruction::FunctionEnd => {
                // Prologue/epilogue are spliced in by `lower_function`, which
                // already knows the frame size these mark the bounds of.
            }

            IrInstruction::ConstructorCall { target, args, .. } => {
                self.lower_call(&IrCallTarget::Direct(*target), args, None);
            }
            IrInstruction::DestructorCall { target, target_address, .. } => {
                let this = self.lower_typed(target_address);
                self.out.push(Instruction::Mov { dest: Operand::PhysReg(PhysicalRegister::RDI), src: this });
                self.out.push(Instruction::Call { target: CallTarget::Direct(*target) });
            }

            IrInstruction::GlobalVariableDecl { .. } => {
                // Globals are emitted once at module scope by `lower_globals`,
                // not per reference here.
            }
            IrInstruction::GlobalLoad { name, ty, result } => {
                let dest = self.new_reg_width(width_of(self.table, *ty));
                self.regs.insert(*result, dest);
                self.out.push(Instruction::Load {
                    dest: Operand::Reg(dest),
                    addr: Address::RipRelative { offset: 0, symbol: Some(*name) },
                    width: dest.width,
                });
            }
            IrInstruction::GlobalStore { name, value } => {
                let width = width_of(self.table, value.ty);
                let src = self.lower_typed(value);
                self.out.push(Instruction::Store {
                    addr: Address::RipRelative { offset: 0, symbol: Some(*name) },
                    src,
                    width,
                });
            }

            IrInstruction::TryBegin => {
                self.out.push(Instruction::EhRegionStart { region_id: self.next_label_ordinal });
            }
            IrInstruction::TryEnd => {
                self.out.push(Instruction::EhRegionEnd { region_id: self.next_label_ordinal });
            }
            IrInstruction::CatchBegin { catch_type: _, continuation_label: _ } => {
                // The catch type's RTTI symbol is resolved by the object
                // writer from `struct_type`'s mangled type-info name, not
                // threaded through here.
                self.out.push(Instruction::EhLandingPad { region_id: self.next_label_ordinal, catch_type: None });
                self.out.push(Instruction::EhBeginCatch);
            }
            IrInstruction::CatchEnd { continuation_label } => {
                self.out.push(Instruction::EhEndCatch);
                let name = self.label_name(*continuation_label);
                self.out.push(Instruction::Jmp { target: name });
            }
            IrInstruction::Throw { type_descriptor: _, operand } => {
                if let Some(v) = operand {
                    let src = self.lower_typed(v);
                    self.out.push(Instruction::Mov { dest: Operand::PhysReg(PhysicalRegister::RDI), src });
                }
                self.out.push(Instruction::EhThrow { type_info_symbol: StringHandle::DUMMY });
            }
            IrInstruction::ReThrow => self.out.push(Instruction::EhRethrow),
        }
    }

    fn scale_index(&mut self, index: &TypedValue, elem_size: u64) -> VirtualRegister {
        let idx_reg = self.lower_typed_to_reg(index);
        let scaled = self.new_reg();
        self.out.push(Instruction::Mov { dest: Operand::Reg(scaled), src: Operand::Reg(idx_reg) });
        self.out.push(Instruction::Imul {
            src1: Operand::Reg(scaled),
            src2: Some(Operand::Imm(elem_size as i64)),
        });
        scaled
    }

    fn lower_binary(&mut self, op: BinOpKind, lhs: &TypedValue, rhs: &TypedValue, result: TempVar) {
        let float = self.is_float(lhs) || self.is_float(rhs);
        let a = self.lower_typed(lhs);
        let b = self.lower_typed(rhs);
        let dest = self.new_reg();
        self.regs.insert(result, dest);
        self.out.push(Instruction::Mov { dest: Operand::Reg(dest), src: a });

        if float {
            let double = self.table.size_of(lhs.ty) == 8;
            let inst = match (op, double) {
                (BinOpKind::Add, true) => Instruction::Addsd { dest: Operand::Reg(dest), src: b },
                (BinOpKind::Add, false) => Instruction::Addss { dest: Operand::Reg(dest), src: b },
                (BinOpKind::Sub, true) => Instruction::Subsd { dest: Operand::Reg(dest), src: b },
                (BinOpKind::Sub, false) => Instruction::Subss { dest: Operand::Reg(dest), src: b },
                (BinOpKind::Mul, true) => Instruction::Mulsd { dest: Operand::Reg(dest), src: b },
                (BinOpKind::Mul, false) => Instruction::Mulss { dest: Operand::Reg(dest), src: b },
                (BinOpKind::Div, true) => Instruction::Divsd { dest: Operand::Reg(dest), src: b },
                (BinOpKind::Div, false) => Instruction::Divss { dest: Operand::Reg(dest), src: b },
                _ => Instruction::Nop,
            };
            self.out.push(inst);
            return;
        }

        let signed = self.table.is_signed(lhs.ty);
        match op {
            BinOpKind::Add => self.out.push(Instruction::Add { dest: Operand::Reg(dest), src: b }),
            BinOpKind::Sub => self.out.push(Instruction::Sub { dest: Operand::Reg(dest), src: b }),
            BinOpKind::Mul => self.out.push(Instruction::Mul { dest: Operand::Reg(dest), src: b, signed }),
            BinOpKind::Div => {
                self.out.push(Instruction::Mov { dest: Operand::PhysReg(PhysicalRegister::RAX), src: Operand::Reg(dest) });
                if signed {
                    self.out.push(Instruction::IdivSigned { divisor: b });
                } else {
                    self.out.push(Instruction::IdivUnsigned { dest: Operand::PhysReg(PhysicalRegister::RAX), src: b });
                }
                self.out.push(Instruction::Mov { dest: Operand::Reg(dest), src: Operand::PhysReg(PhysicalRegister::RAX) });
            }
            BinOpKind::Rem => {
                self.out.push(Instruction::Mov { dest: Operand::PhysReg(PhysicalRegister::RAX), src: Operand::Reg(dest) });
                self.out.push(Instruction::IdivSigned { divisor: b });
                self.out.push(Instruction::Mov { dest: Operand::Reg(dest), src: Operand::PhysReg(PhysicalRegister::RDX) });
            }
            BinOpKind::And | BinOpKind::LogicalAnd => self.out.push(Instruction::And { dest: Operand::Reg(dest), src: b }),
            BinOpKind::Or | BinOpKind::LogicalOr => self.out.push(Instruction::Or { dest: Operand::Reg(dest), src: b }),
            BinOpKind::Xor => self.out.push(Instruction::Xor { dest: Operand::Reg(dest), src: b }),
            BinOpKind::Shl => self.out.push(Instruction::Shl { dest: Operand::Reg(dest), count: b }),
            BinOpKind::Shr => {
                if signed {
                    self.out.push(Instruction::Sar { dest: Operand::Reg(dest), count: b });
                } else {
                    self.out.push(Instruction::Shr { dest: Operand::Reg(dest), count: b });
                }
            }
        }
    }

    fn lower_unary(&mut self, op: UnOpKind, operand: &TypedValue, result: TempVar) {
        let src = self.lower_typed(operand);
        let dest = self.new_reg();
        self.regs.insert(result, dest);
        self.out.push(Instruction::Mov { dest: Operand::Reg(dest), src });
        match op {
            UnOpKind::Neg => self.out.push(Instruction::Neg { dest: Operand::Reg(dest) }),
            UnOpKind::Not => {
                self.out.push(Instruction::Test { src1: Operand::Reg(dest), src2: Operand::Reg(dest) });
                self.out.push(Instruction::Mov { dest: Operand::Reg(dest), src: Operand::Imm(0) });
                let one = self.new_reg();
                self.out.push(Instruction::Mov { dest: Operand::Reg(one), src: Operand::Imm(1) });
                self.out.push(Instruction::Cmov { cond: Condition::Eq, dest: Operand::Reg(dest), src: Operand::Reg(one) });
            }
            UnOpKind::BitNot => self.out.push(Instruction::Not { dest: Operand::Reg(dest) }),
            UnOpKind::PreInc | UnOpKind::PostInc => self.out.push(Instruction::Inc { dest: Operand::Reg(dest) }),
            UnOpKind::PreDec | UnOpKind::PostDec => self.out.push(Instruction::Dec { dest: Operand::Reg(dest) }),
        }
    }

    fn lower_compare(&mut self, op: CmpOp, lhs: &TypedValue, rhs: &TypedValue, result: TempVar) {
        let float = self.is_float(lhs) || self.is_float(rhs);
        let a = self.lower_typed(lhs);
        let b = self.lower_typed(rhs);
        if float {
            let double = self.table.size_of(lhs.ty) == 8;
            if double {
                self.out.push(Instruction::Ucomisd { src1: a, src2: b });
            } else {
                self.out.push(Instruction::Ucomiss { src1: a, src2: b });
            }
        } else {
            self.out.push(Instruction::Cmp { src1: a, src2: b });
        }

        let signed = self.table.is_signed(lhs.ty);
        let cond = match (op, signed || float) {
            (CmpOp::Eq, _) => Condition::Eq,
            (CmpOp::Ne, _) => Condition::Ne,
            (CmpOp::Lt, true) => Condition::L,
            (CmpOp::Lt, false) => Condition::B,
            (CmpOp::Le, true) => Condition::Le,
            (CmpOp::Le, false) => Condition::Be,
            (CmpOp::Gt, true) => Condition::G,
            (CmpOp::Gt, false) => Condition::A,
            (CmpOp::Ge, true) => Condition::Ge,
            (CmpOp::Ge, false) => Condition::Ae,
        };

        let dest = self.new_reg();
        self.regs.insert(result, dest);
        let zero = self.new_reg();
        let one = self.new_reg();
        self.out.push(Instruction::Mov { dest: Operand::Reg(zero), src: Operand::Imm(0) });
        self.out.push(Instruction::Mov { dest: Operand::Reg(one), src: Operand::Imm(1) });
        self.out.push(Instruction::Mov { dest: Operand::Reg(dest), src: Operand::Reg(zero) });
        self.out.push(Instruction::Cmov { cond, dest: Operand::Reg(dest), src: Operand::Reg(one) });
    }

    fn lower_cast(&mut self, kind: CastKind, operand: &TypedValue, result: TempVar) {
        let src = self.lower_typed(operand);
        let dest = self.new_reg();
        self.regs.insert(result, dest);
        match kind {
            CastKind::IntToInt | CastKind::Bitcast | CastKind::PointerToPointer | CastKind::PointerToInt | CastKind::IntToPointer => {
                self.out.push(Instruction::Mov { dest: Operand::Reg(dest), src });
            }
            CastKind::IntToFloat => {
                self.out.push(Instruction::ConvertIntFloat { dest: Operand::Reg(dest), src, to_float: true, double_precision: true });
            }
            CastKind::FloatToInt => {
                self.out.push(Instruction::ConvertIntFloat { dest: Operand::Reg(dest), src, to_float: false, double_precision: true });
            }
            CastKind::FloatToFloat => {
                self.out.push(Instruction::Cvtss2sd { dest: Operand::Reg(dest), src });
            }
        }
    }

    fn lower_call(&mut self, callee: &IrCallTarget, args: &[TypedValue], result: Option<TempVar>) {
        let (int_regs, fp_regs): (&[PhysicalRegister], &[PhysicalRegister]) = match self.target {
            Target::Linux => (&SystemVAbi::ARG_REGS, &SystemVAbi::FP_ARG_REGS),
            Target::Windows => (&WIN64_ARG_REGS, &WIN64_FP_ARG_REGS),
        };
        let mut int_idx = 0;
        let mut fp_idx = 0;
        for arg in args {
            let value = self.lower_typed(arg);
            if self.table.is_floating_point(arg.ty) {
                if let Some(&reg) = fp_regs.get(fp_idx) {
                    self.out.push(Instruction::Mov { dest: Operand::PhysReg(reg), src: value });
                } else {
                    self.out.push(Instruction::Push { src: value });
                }
                fp_idx += 1;
            } else {
                if let Some(&reg) = int_regs.get(int_idx) {
                    self.out.push(Instruction::Mov { dest: Operand::PhysReg(reg), src: value });
                } else {
                    self.out.push(Instruction::Push { src: value });
                }
                int_idx += 1;
            }
        }

        let target = match callee {
            IrCallTarget::Direct(name) => CallTarget::Direct(*name),
            IrCallTarget::Indirect(v) => CallTarget::Indirect(self.lower_typed(v)),
        };
        self.out.push(Instruction::Call { target });

        if let Some(result) = result {
            let dest = self.new_reg();
            self.regs.insert(result, dest);
            self.out.push(Instruction::Mov { dest: Operand::Reg(dest), src: Operand::PhysReg(PhysicalRegister::RAX) });
        }
    }
}

/// Integer/pointer argument registers for Microsoft x64 - the first four
/// arguments regardless of class, with 32 bytes of caller-reserved shadow
/// space instead of SysV's six-register window.
const WIN64_ARG_REGS: [PhysicalRegister; 4] =
    [PhysicalRegister::RCX, PhysicalRegister::RDX, PhysicalRegister::R8, PhysicalRegister::R9];
const WIN64_FP_ARG_REGS: [PhysicalRegister; 4] =
    [PhysicalRegister::XMM0, PhysicalRegister::XMM1, PhysicalRegister::XMM2, PhysicalRegister::XMM3];

fn lower_function(irf: &IrFunction, table: &TypeTable, target: Target) -> lir::Function {
    let frame = layout_frame(irf, table);
    let mut lowerer = Lowerer {
        table,
        target,
        frame,
        categories: &irf.categories,
        regs: FxHashMap::default(),
        labels: FxHashMap::default(),
        next_reg: 0,
        next_label_ordinal: 0,
        epilogue_label: ".Lepilogue".to_owned(),
        out: Vec::new(),
    };

    let mut name = StringHandle::DUMMY;
    let mut param_count = 0;
    let mut is_external = false;

    let uses_callee_saved = irf.param_slots.len() > 6;
    lowerer.out.extend(SystemVAbi::generate_prologue(lowerer.frame.size, uses_callee_saved));

    let mut int_idx = 0;
    let mut fp_idx = 0;
    for slot in &irf.param_slots {
        let ty = *irf.slot_types.get(slot).unwrap_or(&flashcpp_par::TypeIndex::from_usize(0));
        let width = width_of(table, ty);
        let is_fp = table.is_floating_point(ty);
        let src = match target {
            Target::Linux if is_fp => {
                let reg = SystemVAbi::get_fp_arg_register(fp_idx);
                fp_idx += 1;
                reg.map(Operand::PhysReg).unwrap_or(Operand::Mem(lowerer.slot_address(*slot)))
            }
            Target::Linux => {
                let reg = SystemVAbi::get_arg_register(int_idx);
                int_idx += 1;
                reg.map(Operand::PhysReg).unwrap_or(Operand::Mem(lowerer.slot_address(*slot)))
            }
            Target::Windows if is_fp => {
                let reg = WIN64_FP_ARG_REGS.get(fp_idx).copied();
                fp_idx += 1;
                reg.map(Operand::PhysReg).unwrap_or(Operand::Mem(lowerer.slot_address(*slot)))
            }
            Target::Windows => {
                let reg = WIN64_ARG_REGS.get(int_idx).copied();
                int_idx += 1;
                reg.map(Operand::PhysReg).unwrap_or(Operand::Mem(lowerer.slot_address(*slot)))
            }
        };
        lowerer.out.push(Instruction::Store { addr: lowerer.slot_address(*slot), src, width });
    }

    for inst in &irf.instructions {
        if let IrInstruction::FunctionDecl(sig) = inst {
            name = sig.mangled_name;
            param_count = sig.params.len();
            is_external = sig.is_external;
        }
        lowerer.lower_instruction(inst);
    }

    lowerer.out.push(Instruction::Label { name: lowerer.epilogue_label.clone() });
    lowerer.out.extend(SystemVAbi::generate_epilogue(lowerer.frame.size, uses_callee_saved));
    lowerer.out.push(Instruction::Ret { value: None });

    lir::Function {
        name,
        registers: (0..lowerer.next_reg).map(VirtualRegister::new).collect(),
        instructions: lowerer.out,
        labels: Vec::new(),
        frame_size: lowerer.frame.size,
        param_count,
        is_external,
    }
}
