use crate::error::RuntimeError;
use crate::opcode::*;

use super::registers::RegisterOps;

/// Trait for load/store instruction handlers
pub trait DataOps {
    fn handle_ld(&mut self, insn: Instruction, pc: usize) -> Result<(), RuntimeError>;
    fn handle_load(&mut self, insn: Instruction, pc: usize) -> Result<(), RuntimeError>;
    fn handle_store(&mut self, insn: Instruction, pc: usize) -> Result<(), RuntimeError>;
}

fn width(size: u8) -> usize {
    match size {
        SIZE_B => 1,
        SIZE_H => 2,
        SIZE_W => 4,
        _ => 8,
    }
}

fn effective_addr(base: u64, off: i16) -> u64 {
    base.wrapping_add(off as i64 as u64)
}

impl DataOps for super::vm::VM<'_> {
    fn handle_ld(&mut self, insn: Instruction, pc: usize) -> Result<(), RuntimeError> {
        // Packet loads: big-endian context reads into R0.
        let offset = match insn.mode() {
            MODE_IMM if insn.opcode == OP_LDDW => None,
            MODE_ABS => Some(insn.imm as i64 as u64),
            MODE_IND => Some(self.get_reg(insn.src, pc)?.wrapping_add(insn.imm as i64 as u64)),
            _ => {
                return Err(RuntimeError::InvalidOpcode {
                    opcode: insn.opcode,
                    pc,
                })
            }
        };
        if let Some(offset) = offset {
            let value = self.memory.load_context_be(offset, width(insn.size()))?;
            return self.set_reg(0, value, pc);
        }

        let word = *self
            .code
            .get(self.pc)
            .ok_or(RuntimeError::PcOutOfRange(self.pc))?;
        let high = Instruction::decode(word);
        if high.opcode != 0 {
            return Err(RuntimeError::InvalidOpcode {
                opcode: high.opcode,
                pc: self.pc,
            });
        }
        self.pc += 1;

        let value = (insn.imm as u32 as u64) | ((high.imm as u32 as u64) << 32);
        self.set_reg(insn.dst, value, pc)
    }

    fn handle_load(&mut self, insn: Instruction, pc: usize) -> Result<(), RuntimeError> {
        if insn.mode() != MODE_MEM {
            return Err(RuntimeError::InvalidOpcode {
                opcode: insn.opcode,
                pc,
            });
        }
        let base = self.get_reg(insn.src, pc)?;
        let value = self
            .memory
            .load(effective_addr(base, insn.off), width(insn.size()))?;
        self.set_reg(insn.dst, value, pc)
    }

    fn handle_store(&mut self, insn: Instruction, pc: usize) -> Result<(), RuntimeError> {
        let base = self.get_reg(insn.dst, pc)?;
        let addr = effective_addr(base, insn.off);
        let len = width(insn.size());

        match (insn.class(), insn.mode()) {
            (CLASS_ST, MODE_MEM) => self.memory.store(addr, len, insn.imm as i64 as u64),
            (CLASS_STX, MODE_MEM) => {
                let value = self.get_reg(insn.src, pc)?;
                self.memory.store(addr, len, value)
            }
            // Atomic add; other atomic operations are not supported.
            (CLASS_STX, MODE_ATOMIC) if insn.imm == 0 && (len == 4 || len == 8) => {
                let value = self.get_reg(insn.src, pc)?;
                let old = self.memory.load(addr, len)?;
                let sum = if len == 4 {
                    (old as u32).wrapping_add(value as u32) as u64
                } else {
                    old.wrapping_add(value)
                };
                self.memory.store(addr, len, sum)
            }
            _ => Err(RuntimeError::InvalidOpcode {
                opcode: insn.opcode,
                pc,
            }),
        }
    }
}
