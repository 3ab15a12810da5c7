use crate::error::RuntimeError;
use crate::opcode::*;

use super::registers::RegisterOps;

/// Trait for ALU instruction handlers
pub trait ArithmeticOps {
    fn handle_alu(&mut self, insn: Instruction, pc: usize) -> Result<(), RuntimeError>;
}

impl ArithmeticOps for super::vm::VM<'_> {
    fn handle_alu(&mut self, insn: Instruction, pc: usize) -> Result<(), RuntimeError> {
        let invalid = RuntimeError::InvalidOpcode {
            opcode: insn.opcode,
            pc,
        };
        let op = insn.operation();
        let dst = self.get_reg(insn.dst, pc)?;

        if op == ALU_END {
            if insn.class() != CLASS_ALU {
                return Err(invalid);
            }
            let res = byte_swap(dst, insn.imm, insn.uses_src_reg()).ok_or(invalid)?;
            return self.set_reg(insn.dst, res, pc);
        }
        if op > ALU_ARSH || (op == ALU_NEG && insn.uses_src_reg()) {
            return Err(invalid);
        }

        // Immediates are sign-extended to 64 bits before use.
        let src = if insn.uses_src_reg() {
            self.get_reg(insn.src, pc)?
        } else {
            insn.imm as i64 as u64
        };

        let res = if insn.class() == CLASS_ALU64 {
            alu64(op, dst, src, pc)?
        } else {
            // 32-bit results are zero-extended.
            alu32(op, dst as u32, src as u32, pc)? as u64
        };
        self.set_reg(insn.dst, res, pc)
    }
}

fn alu64(op: u8, dst: u64, src: u64, pc: usize) -> Result<u64, RuntimeError> {
    Ok(match op {
        ALU_ADD => dst.wrapping_add(src),
        ALU_SUB => dst.wrapping_sub(src),
        ALU_MUL => dst.wrapping_mul(src),
        ALU_DIV => dst.checked_div(src).ok_or(RuntimeError::DivisionByZero { pc })?,
        ALU_OR => dst | src,
        ALU_AND => dst & src,
        ALU_LSH => dst.wrapping_shl(src as u32),
        ALU_RSH => dst.wrapping_shr(src as u32),
        ALU_NEG => dst.wrapping_neg(),
        ALU_MOD => dst.checked_rem(src).ok_or(RuntimeError::DivisionByZero { pc })?,
        ALU_XOR => dst ^ src,
        ALU_MOV => src,
        ALU_ARSH => (dst as i64).wrapping_shr(src as u32) as u64,
        _ => {
            return Err(RuntimeError::InvalidOpcode {
                opcode: CLASS_ALU64 | op,
                pc,
            })
        }
    })
}

fn alu32(op: u8, dst: u32, src: u32, pc: usize) -> Result<u32, RuntimeError> {
    Ok(match op {
        ALU_ADD => dst.wrapping_add(src),
        ALU_SUB => dst.wrapping_sub(src),
        ALU_MUL => dst.wrapping_mul(src),
        ALU_DIV => dst.checked_div(src).ok_or(RuntimeError::DivisionByZero { pc })?,
        ALU_OR => dst | src,
        ALU_AND => dst & src,
        ALU_LSH => dst.wrapping_shl(src),
        ALU_RSH => dst.wrapping_shr(src),
        ALU_NEG => dst.wrapping_neg(),
        ALU_MOD => dst.checked_rem(src).ok_or(RuntimeError::DivisionByZero { pc })?,
        ALU_XOR => dst ^ src,
        ALU_MOV => src,
        ALU_ARSH => (dst as i32).wrapping_shr(src) as u32,
        _ => {
            return Err(RuntimeError::InvalidOpcode {
                opcode: CLASS_ALU | op,
                pc,
            })
        }
    })
}

/// `le16/32/64` truncates, `be16/32/64` swaps bytes within the width.
fn byte_swap(val: u64, bits: i32, big: bool) -> Option<u64> {
    Some(match (bits, big) {
        (16, false) => val & 0xffff,
        (32, false) => val & 0xffff_ffff,
        (64, false) => val,
        (16, true) => (val as u16).swap_bytes() as u64,
        (32, true) => (val as u32).swap_bytes() as u64,
        (64, true) => val.swap_bytes(),
        _ => return None,
    })
}
