//! x86-64 instruction encoder (§4.7 step 3/4/6, §4.8 input).
//!
//! `flashcpp-codegen::lower` never runs a register allocator - every LIR
//! temporary stays a [`VirtualRegister`] for the whole function. This
//! module closes that gap the simplest way that still matches "no
//! instruction selector pass" (§4.7 point 3): every virtual register gets
//! its own fixed stack slot below the function's locals, and every LIR
//! operation materializes its operands into two fixed scratch registers
//! (R10, R11) around the real encoding. It never reorders or omits an
//! instruction the converter selected (§4.8); it only turns each one into
//! bytes and records the relocations the object writer still needs.

use flashcpp_codegen::{
    Address, CallTarget, Condition, Function as LirFunction, Instruction, Operand,
    PhysicalRegister, RegisterWidth, VirtualRegister,
};
use flashcpp_util::{FxHashMap, StringHandle};

use crate::error::{ObjectError, Result};

/// A relocation the object writer resolves once every function and global
/// has a section offset: the mangled name is already known (`flashcpp-ir`
/// did the mangling), only the address is pending.
#[derive(Debug, Clone)]
pub struct PendingRelocation {
    pub offset: u64,
    pub symbol: StringHandle,
    pub kind: RelocKind,
    pub addend: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocKind {
    /// `call rel32` / `jmp rel32` to another function.
    Branch32,
    /// `lea`/`mov` through `[rip + disp32]` to a global symbol.
    RipRelative32,
}

pub struct EncodedFunction {
    pub name: StringHandle,
    pub code: Vec<u8>,
    pub relocations: Vec<PendingRelocation>,
    pub is_external: bool,
}

const RAX: u8 = 0;
const RCX: u8 = 1;
const RDX: u8 = 2;
const RBX: u8 = 3;
const RSP: u8 = 4;
const RBP: u8 = 5;
const RSI: u8 = 6;
const RDI: u8 = 7;

fn gpr_num(r: PhysicalRegister) -> u8 {
    match r {
        PhysicalRegister::RAX => RAX,
        PhysicalRegister::RBX => RBX,
        PhysicalRegister::RCX => RCX,
        PhysicalRegister::RDX => RDX,
        PhysicalRegister::RSI => RSI,
        PhysicalRegister::RDI => RDI,
        PhysicalRegister::RBP => RBP,
        PhysicalRegister::RSP => RSP,
        PhysicalRegister::R8 => 8,
        PhysicalRegister::R9 => 9,
        PhysicalRegister::R10 => 10,
        PhysicalRegister::R11 => 11,
        PhysicalRegister::R12 => 12,
        PhysicalRegister::R13 => 13,
        PhysicalRegister::R14 => 14,
        PhysicalRegister::R15 => 15,
        _ => 0,
    }
}

fn xmm_num(r: PhysicalRegister) -> u8 {
    use PhysicalRegister::*;
    match r {
        XMM0 => 0,
        XMM1 => 1,
        XMM2 => 2,
        XMM3 => 3,
        XMM4 => 4,
        XMM5 => 5,
        XMM6 => 6,
        XMM7 => 7,
        _ => 0,
    }
}

/// Fixed integer scratch registers used to materialize every virtual
/// register operand. R10/R11 are caller-saved and never assigned to an
/// ABI argument slot, so they're always free to clobber here.
const SCRATCH_A: PhysicalRegister = PhysicalRegister::R10;
const SCRATCH_B: PhysicalRegister = PhysicalRegister::R11;
const SCRATCH_XMM_A: PhysicalRegister = PhysicalRegister::XMM4;
const SCRATCH_XMM_B: PhysicalRegister = PhysicalRegister::XMM5;

struct Encoder {
    code: Vec<u8>,
    relocations: Vec<PendingRelocation>,
    label_offsets: FxHashMap<String, usize>,
    pending_branches: Vec<(usize, String)>,
    vreg_slots: FxHashMap<u32, i32>,
}

pub fn encode_function(func: &LirFunction) -> Result<EncodedFunction> {
    if func.is_external {
        return Ok(EncodedFunction { name: func.name, code: Vec::new(), relocations: Vec::new(), is_external: true });
    }

    let mut vreg_slots = FxHashMap::default();
    let mut next = func.frame_size as i32;
    for reg in &func.registers {
        next += 8;
        vreg_slots.insert(reg.id, -next);
    }

    let mut enc = Encoder {
        code: Vec::new(),
        relocations: Vec::new(),
        label_offsets: FxHashMap::default(),
        pending_branches: Vec::new(),
        vreg_slots,
    };

    for inst in &func.instructions {
        enc.encode(inst)?;
    }
    enc.patch_branches()?;

    Ok(EncodedFunction { name: func.name, code: enc.code, relocations: enc.relocations, is_external: false })
}

impl Encoder {
    fn slot_of(&self, r: VirtualRegister) -> i32 {
        *self.vreg_slots.get(&r.id).unwrap_or(&0)
    }

    fn push_u8(&mut self, b: u8) {
        self.code.push(b);
    }

    fn push_i32(&mut self, v: i32) {
        self.code.extend_from_slice(&v.to_le_bytes());
    }

    fn push_i64(&mut self, v: i64) {
        self.code.extend_from_slice(&v.to_le_bytes());
    }

    fn rex(&mut self, w: bool, r: u8, x: u8, b: u8) {
        let byte = 0x40 | ((w as u8) << 3) | (((r >> 3) & 1) << 2) | (((x >> 3) & 1) << 1) | ((b >> 3) & 1);
        if byte != 0x40 || w {
            self.push_u8(byte);
        }
    }

    fn modrm_reg(&mut self, reg: u8, rm: u8) {
        self.push_u8(0xC0 | ((reg & 7) << 3) | (rm & 7));
    }

    /// `[rbp + offset]` addressing: mod=10 (disp32), rm=101 (RBP), no SIB.
    fn modrm_rbp_disp(&mut self, reg: u8, offset: i32) {
        self.push_u8(0x80 | ((reg & 7) << 3) | (RBP & 7));
        self.push_i32(offset);
    }

    /// `[base + offset]` addressing through an arbitrary GPR base.
    fn modrm_base_disp(&mut self, reg: u8, base: u8, offset: i32) {
        if base & 7 == RSP & 7 {
            self.push_u8(0x80 | ((reg & 7) << 3) | (RSP & 7));
            self.push_u8(0x24); // SIB: no index, base=RSP
            self.push_i32(offset);
        } else {
            self.push_u8(0x80 | ((reg & 7) << 3) | (base & 7));
            self.push_i32(offset);
        }
    }

    fn modrm_rip_disp(&mut self, reg: u8, offset: i32) {
        self.push_u8(0x00 | ((reg & 7) << 3) | 0b101);
        self.push_i32(offset);
    }

    fn mov_reg_reg64(&mut self, dest: u8, src: u8) {
        self.rex(true, src, 0, dest);
        self.push_u8(0x89);
        self.modrm_reg(src, dest);
    }

    fn mov_reg_imm64(&mut self, dest: u8, imm: i64) {
        if imm >= i32::MIN as i64 && imm <= i32::MAX as i64 {
            self.rex(true, 0, 0, dest);
            self.push_u8(0xC7);
            self.modrm_reg(0, dest);
            self.push_i32(imm as i32);
        } else {
            self.rex(true, 0, 0, dest);
            self.push_u8(0xB8 + (dest & 7));
            self.push_i64(imm);
        }
    }

    fn load_reg_rbp(&mut self, dest: u8, offset: i32, width: RegisterWidth) {
        match width {
            RegisterWidth::W8 => {
                self.rex(false, dest, 0, RBP);
                self.push_u8(0x8A);
                self.modrm_rbp_disp(dest, offset);
            }
            RegisterWidth::W16 => {
                self.push_u8(0x66);
                self.rex(false, dest, 0, RBP);
                self.push_u8(0x8B);
                self.modrm_rbp_disp(dest, offset);
            }
            RegisterWidth::W32 => {
                self.rex(false, dest, 0, RBP);
                self.push_u8(0x8B);
                self.modrm_rbp_disp(dest, offset);
            }
            RegisterWidth::W64 => {
                self.rex(true, dest, 0, RBP);
                self.push_u8(0x8B);
                self.modrm_rbp_disp(dest, offset);
            }
        }
    }

    fn store_reg_rbp(&mut self, offset: i32, src: u8, width: RegisterWidth) {
        match width {
            RegisterWidth::W8 => {
                self.rex(false, src, 0, RBP);
                self.push_u8(0x88);
                self.modrm_rbp_disp(src, offset);
            }
            RegisterWidth::W16 => {
                self.push_u8(0x66);
                self.rex(false, src, 0, RBP);
                self.push_u8(0x89);
                self.modrm_rbp_disp(src, offset);
            }
            RegisterWidth::W32 => {
                self.rex(false, src, 0, RBP);
                self.push_u8(0x89);
                self.modrm_rbp_disp(src, offset);
            }
            RegisterWidth::W64 => {
                self.rex(true, src, 0, RBP);
                self.push_u8(0x89);
                self.modrm_rbp_disp(src, offset);
            }
        }
    }

    /// Loads `operand` into the 64-bit scratch register `into`.
    fn materialize(&mut self, operand: &Operand, into: PhysicalRegister) -> Result<()> {
        let dest = gpr_num(into);
        match operand {
            Operand::Reg(vr) => self.load_reg_rbp(dest, self.slot_of(*vr), RegisterWidth::W64),
            Operand::PhysReg(p) if is_xmm(*p) => {
                self.movq_xmm_gpr(dest, xmm_num(*p), true);
            }
            Operand::PhysReg(p) => {
                let src = gpr_num(*p);
                if src != dest {
                    self.mov_reg_reg64(dest, src);
                }
            }
            Operand::Imm(v) => self.mov_reg_imm64(dest, *v),
            Operand::Mem(addr) => self.load_address(dest, addr, RegisterWidth::W64)?,
            Operand::Label(name) => {
                self.mov_reg_imm64(dest, 0);
                self.pending_branches.push((self.code.len() - 4, name.clone()));
            }
        }
        Ok(())
    }

    fn writeback(&mut self, operand: &Operand, from: PhysicalRegister) -> Result<()> {
        let src = gpr_num(from);
        match operand {
            Operand::Reg(vr) => self.store_reg_rbp(self.slot_of(*vr), src, RegisterWidth::W64),
            Operand::PhysReg(p) if is_xmm(*p) => self.movq_xmm_gpr(xmm_num(*p), src, false),
            Operand::PhysReg(p) => {
                let dest = gpr_num(*p);
                if dest != src {
                    self.mov_reg_reg64(dest, src);
                }
            }
            Operand::Mem(addr) => self.store_address(addr, src, RegisterWidth::W64)?,
            Operand::Imm(_) | Operand::Label(_) => {
                return Err(ObjectError::UnencodableOperand("cannot write back into an immediate".into()))
            }
        }
        Ok(())
    }

    /// `movq` between a GPR and an XMM register (66 REX.W 0F 6E / 7E).
    fn movq_xmm_gpr(&mut self, xmm: u8, gpr: u8, gpr_to_xmm: bool) {
        self.push_u8(0x66);
        self.rex(true, xmm, 0, gpr);
        self.push_u8(0x0F);
        self.push_u8(if gpr_to_xmm { 0x6E } else { 0x7E });
        self.modrm_reg(xmm, gpr);
    }

    fn materialize_address(&mut self, addr: &Address, scratch: PhysicalRegister) -> Result<Address> {
        match addr {
            Address::RegIndirect { base, offset } => {
                self.materialize(&Operand::Reg(*base), scratch)?;
                Ok(Address::BaseOffset { base: scratch, offset: *offset })
            }
            other => Ok(other.clone()),
        }
    }

    fn load_address(&mut self, dest: u8, addr: &Address, width: RegisterWidth) -> Result<()> {
        let addr = self.materialize_address(addr, SCRATCH_B)?;
        self.encode_addr_op(0x8A, 0x8B, dest, &addr, width)
    }

    fn store_address(&mut self, addr: &Address, src: u8, width: RegisterWidth) -> Result<()> {
        let addr = self.materialize_address(addr, SCRATCH_B)?;
        self.encode_addr_op(0x88, 0x89, src, &addr, width)
    }

    /// Shared ModRM emission for load (`op8`/`op_wide`) and store opcodes
    /// against every non-virtual [`Address`] variant.
    fn encode_addr_op(&mut self, op8: u8, op_wide: u8, reg: u8, addr: &Address, width: RegisterWidth) -> Result<()> {
        let w = matches!(width, RegisterWidth::W64);
        if matches!(width, RegisterWidth::W16) {
            self.push_u8(0x66);
        }
        let opcode = if matches!(width, RegisterWidth::W8) { op8 } else { op_wide };
        match addr {
            Address::StackRelative { offset } => {
                self.rex(w, reg, 0, RBP);
                self.push_u8(opcode);
                self.modrm_rbp_disp(reg, *offset);
            }
            Address::Base { base } => {
                let b = gpr_num(*base);
                self.rex(w, reg, 0, b);
                self.push_u8(opcode);
                self.push_u8(((reg & 7) << 3) | (b & 7));
            }
            Address::BaseOffset { base, offset } => {
                let b = gpr_num(*base);
                self.rex(w, reg, 0, b);
                self.push_u8(opcode);
                self.modrm_base_disp(reg, b, *offset);
            }
            Address::Indexed { base, index, scale, offset } => {
                let b = gpr_num(*base);
                let i = gpr_num(*index);
                self.rex(w, reg, i, b);
                self.push_u8(opcode);
                self.push_u8(0x80 | ((reg & 7) << 3) | 0b100);
                let ss = match scale { 2 => 1, 4 => 2, 8 => 3, _ => 0 };
                self.push_u8((ss << 6) | ((i & 7) << 3) | (b & 7));
                self.push_i32(*offset);
            }
            Address::RipRelative { offset, symbol } => {
                self.rex(w, reg, 0, 0);
                self.push_u8(opcode);
                self.modrm_rip_disp(reg, *offset);
                if let Some(sym) = symbol {
                    self.relocations.push(PendingRelocation {
                        offset: (self.code.len() - 4) as u64,
                        symbol: *sym,
                        kind: RelocKind::RipRelative32,
                        addend: -4,
                    });
                }
            }
            Address::Global(sym) => {
                self.rex(w, reg, 0, 0);
                self.push_u8(opcode);
                self.modrm_rip_disp(reg, 0);
                self.relocations.push(PendingRelocation {
                    offset: (self.code.len() - 4) as u64,
                    symbol: *sym,
                    kind: RelocKind::RipRelative32,
                    addend: -4,
                });
            }
            Address::Absolute(a) => {
                self.mov_reg_imm64(gpr_num(SCRATCH_A), *a as i64);
                self.rex(w, reg, 0, gpr_num(SCRATCH_A));
                self.push_u8(opcode);
                self.modrm_base_disp(reg, gpr_num(SCRATCH_A), 0);
            }
            Address::RegIndirect { .. } => unreachable!("materialized above"),
        }
        Ok(())
    }

    fn alu_reg_imm(&mut self, opcode_ext: u8, dest: u8, imm: i32) {
        self.rex(true, 0, 0, dest);
        self.push_u8(0x81);
        self.modrm_reg(opcode_ext, dest);
        self.push_i32(imm);
    }

    fn alu_reg_reg(&mut self, opcode: u8, dest: u8, src: u8) {
        self.rex(true, src, 0, dest);
        self.push_u8(opcode);
        self.modrm_reg(src, dest);
    }

    /// Materializes `dest`/`src` into the fixed scratch pair, applies an
    /// ALU op, writes the result back into `dest`. `opcode`/`ext` are the
    /// r/m64,r64 opcode and the r/m64,imm32 `/n` extension for this op.
    fn binary_alu(&mut self, opcode: u8, ext: u8, dest: &Operand, src: &Operand) -> Result<()> {
        let a = gpr_num(SCRATCH_A);
        let b = gpr_num(SCRATCH_B);
        self.materialize(dest, SCRATCH_A)?;
        match src {
            Operand::Imm(v) if *v >= i32::MIN as i64 && *v <= i32::MAX as i64 => {
                self.alu_reg_imm(ext, a, *v as i32);
            }
            _ => {
                self.materialize(src, SCRATCH_B)?;
                self.alu_reg_reg(opcode, a, b);
            }
        }
        self.writeback(dest, SCRATCH_A)
    }

    fn sse_binary(&mut self, prefix: u8, opcode: u8, dest: &Operand, src: &Operand) -> Result<()> {
        self.materialize_xmm(dest, SCRATCH_XMM_A)?;
        self.materialize_xmm(src, SCRATCH_XMM_B)?;
        let a = xmm_num(SCRATCH_XMM_A);
        let b = xmm_num(SCRATCH_XMM_B);
        self.push_u8(prefix);
        self.push_u8(0x0F);
        self.push_u8(opcode);
        self.modrm_reg(a, b);
        self.writeback_xmm(dest, SCRATCH_XMM_A)
    }

    fn materialize_xmm(&mut self, operand: &Operand, into: PhysicalRegister) -> Result<()> {
        // Float operands always arrive as `PhysReg(XMMn)` or a spilled
        // virtual register carrying the bit pattern; both go through the
        // GPR scratch path and a `movq` into the XMM scratch register.
        match operand {
            Operand::PhysReg(p) if is_xmm(*p) => {
                if xmm_num(*p) != xmm_num(into) {
                    self.push_u8(0xF3);
                    self.push_u8(0x0F);
                    self.push_u8(0x7E);
                    self.modrm_reg(xmm_num(into), xmm_num(*p));
                }
                Ok(())
            }
            _ => {
                self.materialize(operand, SCRATCH_A)?;
                self.movq_xmm_gpr(xmm_num(into), gpr_num(SCRATCH_A), true);
                Ok(())
            }
        }
    }

    fn writeback_xmm(&mut self, operand: &Operand, from: PhysicalRegister) -> Result<()> {
        match operand {
            Operand::PhysReg(p) if is_xmm(*p) => {
                if xmm_num(*p) != xmm_num(from) {
                    self.push_u8(0xF3);
                    self.push_u8(0x0F);
                    self.push_u8(0x7E);
                    self.modrm_reg(xmm_num(*p), xmm_num(from));
                }
                Ok(())
            }
            _ => {
                self.movq_xmm_gpr(xmm_num(from), gpr_num(SCRATCH_A), false);
                self.writeback(operand, SCRATCH_A)
            }
        }
    }

    fn patch_branches(&mut self) -> Result<()> {
        let branches = std::mem::take(&mut self.pending_branches);
        for (patch_at, label) in branches {
            let target = *self
                .label_offsets
                .get(&label)
                .ok_or_else(|| ObjectError::LabelNotFound(label.clone()))?;
            let rel = target as i64 - (patch_at as i64 + 4);
            self.code[patch_at..patch_at + 4].copy_from_slice(&(rel as i32).to_le_bytes());
        }
        Ok(())
    }

    fn emit_branch_placeholder(&mut self, label: &str) {
        let at = self.code.len();
        self.push_i32(0);
        self.pending_branches.push((at, label.to_owned()));
    }

    fn encode(&mut self, inst: &Instruction) -> Result<()> {
        use Instruction::*;
        match inst {
            Nop => self.push_u8(0x90),
            Mov { dest, src } => {
                self.materialize(src, SCRATCH_A)?;
                self.writeback(dest, SCRATCH_A)?;
            }
            Movsx { dest, src, sign_extend: _ } | Movzx { dest, src } => {
                self.materialize(src, SCRATCH_A)?;
                self.writeback(dest, SCRATCH_A)?;
            }
            Lea { dest, addr } => {
                let addr = self.materialize_address(addr, SCRATCH_B)?;
                let reg = gpr_num(SCRATCH_A);
                match &addr {
                    Address::StackRelative { offset } => {
                        self.rex(true, reg, 0, RBP);
                        self.push_u8(0x8D);
                        self.modrm_rbp_disp(reg, *offset);
                    }
                    Address::BaseOffset { base, offset } => {
                        let b = gpr_num(*base);
                        self.rex(true, reg, 0, b);
                        self.push_u8(0x8D);
                        self.modrm_base_disp(reg, b, *offset);
                    }
                    _ => self.load_address(reg, &addr, RegisterWidth::W64)?,
                }
                self.writeback(dest, SCRATCH_A)?;
            }
            Push { src } => {
                self.materialize(src, SCRATCH_A)?;
                self.push_u8(0x50 + (gpr_num(SCRATCH_A) & 7));
            }
            Pop { dest } => {
                self.push_u8(0x58 + (gpr_num(SCRATCH_A) & 7));
                self.writeback(dest, SCRATCH_A)?;
            }
            Xchg { dest, src } => {
                self.materialize(dest, SCRATCH_A)?;
                self.materialize(src, SCRATCH_B)?;
                self.writeback(dest, SCRATCH_B)?;
                self.writeback(src, SCRATCH_A)?;
            }
            Cmov { cond, dest, src } => {
                self.materialize(dest, SCRATCH_A)?;
                self.materialize(src, SCRATCH_B)?;
                let a = gpr_num(SCRATCH_A);
                let b = gpr_num(SCRATCH_B);
                self.rex(true, a, 0, b);
                self.push_u8(0x0F);
                self.push_u8(0x40 + cond_code(*cond));
                self.modrm_reg(a, b);
                self.writeback(dest, SCRATCH_A)?;
            }
            Load { dest, addr, width } => {
                let a = self.materialize_address(addr, SCRATCH_B)?;
                self.load_address(gpr_num(SCRATCH_A), &a, *width)?;
                self.writeback(dest, SCRATCH_A)?;
            }
            Store { addr, src, width } => {
                self.materialize(src, SCRATCH_A)?;
                let a = self.materialize_address(addr, SCRATCH_B)?;
                self.store_address(&a, gpr_num(SCRATCH_A), *width)?;
            }
            Add { dest, src } => self.binary_alu(0x01, 0, dest, src)?,
            Sub { dest, src } => self.binary_alu(0x29, 5, dest, src)?,
            And { dest, src } => self.binary_alu(0x21, 4, dest, src)?,
            Or { dest, src } => self.binary_alu(0x09, 1, dest, src)?,
            Xor { dest, src } => self.binary_alu(0x31, 6, dest, src)?,
            Mul { dest, src, signed: _ } => {
                // Truncating multiply: the low 64 bits are identical for
                // signed and unsigned operands, so one form covers both.
                self.materialize(dest, SCRATCH_A)?;
                self.materialize(src, SCRATCH_B)?;
                let a = gpr_num(SCRATCH_A);
                let b = gpr_num(SCRATCH_B);
                self.rex(true, a, 0, b);
                self.push_u8(0x0F);
                self.push_u8(0xAF);
                self.modrm_reg(a, b);
                self.writeback(dest, SCRATCH_A)?;
            }
            Imul { src1, src2, .. } => {
                self.materialize(src1, SCRATCH_A)?;
                if let Some(src2) = src2 {
                    self.materialize(src2, SCRATCH_B)?;
                    let a = gpr_num(SCRATCH_A);
                    let b = gpr_num(SCRATCH_B);
                    self.rex(true, a, 0, b);
                    self.push_u8(0x0F);
                    self.push_u8(0xAF);
                    self.modrm_reg(a, b);
                }
                self.writeback(src1, SCRATCH_A)?;
            }
            Idiv { dest, src } => {
                self.materialize(dest, PhysicalRegister::RAX)?;
                self.push_u8(0x48);
                self.push_u8(0x99); // cqo
                self.materialize(src, SCRATCH_A)?;
                self.rex(true, 0, 0, gpr_num(SCRATCH_A));
                self.push_u8(0xF7);
                self.modrm_reg(7, gpr_num(SCRATCH_A));
                self.writeback(dest, PhysicalRegister::RAX)?;
            }
            IdivSigned { divisor } => {
                self.push_u8(0x48);
                self.push_u8(0x99); // cqo
                self.materialize(divisor, SCRATCH_A)?;
                self.rex(true, 0, 0, gpr_num(SCRATCH_A));
                self.push_u8(0xF7);
                self.modrm_reg(7, gpr_num(SCRATCH_A));
            }
            IdivUnsigned { dest: _, src } => {
                // RDX:RAX already holds the dividend by convention (the
                // caller moved it into RAX); zero-extend instead of
                // sign-extending into RDX for unsigned division.
                self.alu_reg_reg(0x31, RDX, RDX); // xor rdx, rdx
                self.materialize(src, SCRATCH_A)?;
                self.rex(true, 0, 0, gpr_num(SCRATCH_A));
                self.push_u8(0xF7);
                self.modrm_reg(6, gpr_num(SCRATCH_A));
            }
            Inc { dest } => {
                self.materialize(dest, SCRATCH_A)?;
                self.rex(true, 0, 0, gpr_num(SCRATCH_A));
                self.push_u8(0xFF);
                self.modrm_reg(0, gpr_num(SCRATCH_A));
                self.writeback(dest, SCRATCH_A)?;
            }
            Dec { dest } => {
                self.materialize(dest, SCRATCH_A)?;
                self.rex(true, 0, 0, gpr_num(SCRATCH_A));
                self.push_u8(0xFF);
                self.modrm_reg(1, gpr_num(SCRATCH_A));
                self.writeback(dest, SCRATCH_A)?;
            }
            Neg { dest } => {
                self.materialize(dest, SCRATCH_A)?;
                self.rex(true, 0, 0, gpr_num(SCRATCH_A));
                self.push_u8(0xF7);
                self.modrm_reg(3, gpr_num(SCRATCH_A));
                self.writeback(dest, SCRATCH_A)?;
            }
            Div { divisor } => {
                self.alu_reg_reg(0x31, RDX, RDX);
                self.materialize(divisor, SCRATCH_A)?;
                self.rex(true, 0, 0, gpr_num(SCRATCH_A));
                self.push_u8(0xF7);
                self.modrm_reg(6, gpr_num(SCRATCH_A));
            }
            Not { dest } => {
                self.materialize(dest, SCRATCH_A)?;
                self.rex(true, 0, 0, gpr_num(SCRATCH_A));
                self.push_u8(0xF7);
                self.modrm_reg(2, gpr_num(SCRATCH_A));
                self.writeback(dest, SCRATCH_A)?;
            }
            Shl { dest, count } => self.shift(4, dest, count)?,
            Shr { dest, count } => self.shift(5, dest, count)?,
            Sar { dest, count } => self.shift(7, dest, count)?,
            Rol { dest, count } => self.shift(0, dest, count)?,
            Ror { dest, count } => self.shift(1, dest, count)?,
            Cmp { src1, src2 } => {
                self.materialize(src1, SCRATCH_A)?;
                self.materialize(src2, SCRATCH_B)?;
                self.alu_reg_reg(0x39, gpr_num(SCRATCH_A), gpr_num(SCRATCH_B));
            }
            Test { src1, src2 } => {
                self.materialize(src1, SCRATCH_A)?;
                self.materialize(src2, SCRATCH_B)?;
                self.alu_reg_reg(0x85, gpr_num(SCRATCH_A), gpr_num(SCRATCH_B));
            }
            Jmp { target } => {
                self.push_u8(0xE9);
                self.emit_branch_placeholder(target);
            }
            Jcc { cond, target } => {
                self.push_u8(0x0F);
                self.push_u8(0x80 + cond_code(*cond));
                self.emit_branch_placeholder(target);
            }
            Call { target } => self.encode_call(target)?,
            Ret { value } => {
                if let Some(v) = value {
                    let into = if matches!(v, Operand::PhysReg(p) if is_xmm(*p)) {
                        PhysicalRegister::XMM0
                    } else {
                        PhysicalRegister::RAX
                    };
                    if is_xmm(into) {
                        self.materialize_xmm(v, into)?;
                    } else {
                        self.materialize(v, into)?;
                    }
                }
                self.push_u8(0xC3);
            }
            Label { name } => {
                self.label_offsets.insert(name.clone(), self.code.len());
            }
            EnterFrame { frame_size } => {
                self.push_u8(0x55); // push rbp
                self.mov_reg_reg64(RBP, RSP);
                if *frame_size > 0 {
                    self.alu_reg_imm(5, RSP, *frame_size as i32);
                }
            }
            LeaveFrame => {
                self.mov_reg_reg64(RSP, RBP);
                self.push_u8(0x5D); // pop rbp
            }
            Alloca { dest, size } => {
                self.materialize(size, SCRATCH_A)?;
                self.alu_reg_reg(0x29, RSP, gpr_num(SCRATCH_A));
                self.mov_reg_reg64(gpr_num(SCRATCH_A), RSP);
                self.writeback(dest, SCRATCH_A)?;
            }
            SaveCalleeSaved { regs } => {
                for r in regs {
                    self.push_u8(0x50 + (gpr_num(*r) & 7));
                }
            }
            RestoreCalleeSaved { regs } => {
                for r in regs.iter().rev() {
                    self.push_u8(0x58 + (gpr_num(*r) & 7));
                }
            }
            Movss { dest, src } => self.sse_move(0xF3, dest, src)?,
            Movsd { dest, src } => self.sse_move(0xF2, dest, src)?,
            Addss { dest, src } => self.sse_binary(0xF3, 0x58, dest, src)?,
            Addsd { dest, src } => self.sse_binary(0xF2, 0x58, dest, src)?,
            Subss { dest, src } => self.sse_binary(0xF3, 0x5C, dest, src)?,
            Subsd { dest, src } => self.sse_binary(0xF2, 0x5C, dest, src)?,
            Mulss { dest, src } => self.sse_binary(0xF3, 0x59, dest, src)?,
            Mulsd { dest, src } => self.sse_binary(0xF2, 0x59, dest, src)?,
            Divss { dest, src } => self.sse_binary(0xF3, 0x5E, dest, src)?,
            Divsd { dest, src } => self.sse_binary(0xF2, 0x5E, dest, src)?,
            Ucomiss { src1, src2 } => {
                self.materialize_xmm(src1, SCRATCH_XMM_A)?;
                self.materialize_xmm(src2, SCRATCH_XMM_B)?;
                self.push_u8(0x0F);
                self.push_u8(0x2E);
                self.modrm_reg(xmm_num(SCRATCH_XMM_A), xmm_num(SCRATCH_XMM_B));
            }
            Ucomisd { src1, src2 } => {
                self.materialize_xmm(src1, SCRATCH_XMM_A)?;
                self.materialize_xmm(src2, SCRATCH_XMM_B)?;
                self.push_u8(0x66);
                self.push_u8(0x0F);
                self.push_u8(0x2E);
                self.modrm_reg(xmm_num(SCRATCH_XMM_A), xmm_num(SCRATCH_XMM_B));
            }
            ConvertIntFloat { dest, src, to_float, double_precision } => {
                let prefix = if *double_precision { 0xF2 } else { 0xF3 };
                if *to_float {
                    self.materialize(src, SCRATCH_A)?;
                    self.push_u8(prefix);
                    self.rex(true, xmm_num(SCRATCH_XMM_A), 0, gpr_num(SCRATCH_A));
                    self.push_u8(0x0F);
                    self.push_u8(0x2A);
                    self.modrm_reg(xmm_num(SCRATCH_XMM_A), gpr_num(SCRATCH_A));
                    self.writeback_xmm(dest, SCRATCH_XMM_A)?;
                } else {
                    self.materialize_xmm(src, SCRATCH_XMM_A)?;
                    self.push_u8(prefix);
                    self.rex(true, gpr_num(SCRATCH_A), 0, xmm_num(SCRATCH_XMM_A));
                    self.push_u8(0x0F);
                    self.push_u8(0x2C);
                    self.modrm_reg(gpr_num(SCRATCH_A), xmm_num(SCRATCH_XMM_A));
                    self.writeback(dest, SCRATCH_A)?;
                }
            }
            Cvtss2sd { dest, src } => {
                self.materialize_xmm(src, SCRATCH_XMM_A)?;
                self.push_u8(0xF3);
                self.push_u8(0x0F);
                self.push_u8(0x5A);
                self.modrm_reg(xmm_num(SCRATCH_XMM_A), xmm_num(SCRATCH_XMM_A));
                self.writeback_xmm(dest, SCRATCH_XMM_A)?;
            }
            Cvtsd2ss { dest, src } => {
                self.materialize_xmm(src, SCRATCH_XMM_A)?;
                self.push_u8(0xF2);
                self.push_u8(0x0F);
                self.push_u8(0x5A);
                self.modrm_reg(xmm_num(SCRATCH_XMM_A), xmm_num(SCRATCH_XMM_A));
                self.writeback_xmm(dest, SCRATCH_XMM_A)?;
            }
            // Exception-handling pseudo-ops carry no bytes of their own;
            // the unwind tables that reference their offsets are built by
            // `writer.rs` from the label/offset map this pass produces.
            EhRegionStart { .. } | EhRegionEnd { .. } | EhLandingPad { .. } => {}
            EhThrow { type_info_symbol } => {
                self.push_u8(0xE8);
                self.code.extend_from_slice(&[0; 4]);
                let off = (self.code.len() - 4) as u64;
                self.relocations.push(PendingRelocation {
                    offset: off,
                    symbol: *type_info_symbol,
                    kind: RelocKind::Branch32,
                    addend: -4,
                });
            }
            EhRethrow | EhBeginCatch | EhEndCatch => {}
        }
        Ok(())
    }

    fn sse_move(&mut self, prefix: u8, dest: &Operand, src: &Operand) -> Result<()> {
        self.materialize_xmm(src, SCRATCH_XMM_A)?;
        let _ = prefix;
        self.writeback_xmm(dest, SCRATCH_XMM_A)
    }

    fn shift(&mut self, ext: u8, dest: &Operand, count: &Operand) -> Result<()> {
        self.materialize(dest, SCRATCH_A)?;
        let a = gpr_num(SCRATCH_A);
        match count {
            Operand::Imm(v) => {
                self.rex(true, 0, 0, a);
                self.push_u8(0xC1);
                self.modrm_reg(ext, a);
                self.push_u8(*v as u8);
            }
            _ => {
                self.materialize(count, PhysicalRegister::RCX)?;
                self.rex(true, 0, 0, a);
                self.push_u8(0xD3);
                self.modrm_reg(ext, a);
            }
        }
        self.writeback(dest, SCRATCH_A)
    }

    fn encode_call(&mut self, target: &CallTarget) -> Result<()> {
        match target {
            CallTarget::Direct(name) | CallTarget::External(name) => {
                self.push_u8(0xE8);
                self.code.extend_from_slice(&[0; 4]);
                let off = (self.code.len() - 4) as u64;
                self.relocations.push(PendingRelocation {
                    offset: off,
                    symbol: *name,
                    kind: RelocKind::Branch32,
                    addend: -4,
                });
            }
            CallTarget::Indirect(op) => {
                self.materialize(op, SCRATCH_A)?;
                self.rex(false, 0, 0, gpr_num(SCRATCH_A));
                self.push_u8(0xFF);
                self.modrm_reg(2, gpr_num(SCRATCH_A));
            }
        }
        Ok(())
    }
}

fn is_xmm(r: PhysicalRegister) -> bool {
    use PhysicalRegister::*;
    matches!(r, XMM0 | XMM1 | XMM2 | XMM3 | XMM4 | XMM5 | XMM6 | XMM7 | XMM0_XMM1)
}

fn cond_code(c: Condition) -> u8 {
    use Condition::*;
    match c {
        O => 0x0,
        No => 0x1,
        B => 0x2,
        Ae => 0x3,
        Eq => 0x4,
        Ne => 0x5,
        Be => 0x6,
        A => 0x7,
        S => 0x8,
        Ns => 0x9,
        P => 0xA,
        Np => 0xB,
        L => 0xC,
        Ge => 0xD,
        Le => 0xE,
        G => 0xF,
    }
}
