use tracing::debug;

use crate::error::{RuntimeError, TrapKind};
use crate::opcode::*;
use crate::specs::MAX_ARGS;

use super::registers::RegisterOps;

/// Trait for jump, call and exit handlers
pub trait ControlFlowOps {
    /// Returns `Some(r0)` when the program exits.
    fn handle_jump(&mut self, insn: Instruction, pc: usize) -> Result<Option<u64>, TrapKind>;

    fn call_helper(&mut self, insn: Instruction, pc: usize) -> Result<(), TrapKind>;
}

impl ControlFlowOps for super::vm::VM<'_> {
    fn handle_jump(&mut self, insn: Instruction, pc: usize) -> Result<Option<u64>, TrapKind> {
        let invalid = RuntimeError::InvalidOpcode {
            opcode: insn.opcode,
            pc,
        };
        let wide = insn.class() == CLASS_JMP;

        match insn.operation() {
            JMP_JA if wide => {
                self.jump_relative(insn.off)?;
                return Ok(None);
            }
            JMP_CALL if wide => {
                self.call_helper(insn, pc)?;
                return Ok(None);
            }
            JMP_EXIT if wide => {
                return Ok(Some(self.get_reg(0, pc)?));
            }
            JMP_JA | JMP_CALL | JMP_EXIT => return Err(invalid.into()),
            _ => {}
        }

        let dst = self.get_reg(insn.dst, pc)?;
        let src = if insn.uses_src_reg() {
            self.get_reg(insn.src, pc)?
        } else {
            insn.imm as i64 as u64
        };

        let taken = if wide {
            compare64(insn.operation(), dst, src)
        } else {
            compare32(insn.operation(), dst as u32, src as u32)
        }
        .ok_or(invalid)?;

        if taken {
            self.jump_relative(insn.off)?;
        }
        Ok(None)
    }

    fn call_helper(&mut self, insn: Instruction, pc: usize) -> Result<(), TrapKind> {
        if insn.src != CALL_HELPER {
            return Err(RuntimeError::UnsupportedCall { pc }.into());
        }

        let (table, program) = (self.table, self.program);
        let id = insn.helper_id();
        let helper = table.get(id).ok_or(TrapKind::UnknownHelper { id })?;

        // Linking normally catches this; checked again for unlinked runs.
        if let Some(declared) = program.declared_signature(id) {
            if declared != helper.signature {
                return Err(TrapKind::SignatureMismatch {
                    id,
                    declared,
                    registered: helper.signature,
                });
            }
        }

        let mut args = [0u64; MAX_ARGS];
        for (i, slot) in args.iter_mut().enumerate() {
            *slot = self.get_reg((i + 1) as u8, pc)?;
        }
        let args = &args[..helper.signature.arity() as usize];

        debug!(id, helper = %helper.name, ?args, pc, "helper call");

        let ret = (helper.func)(args).map_err(|e| match e {
            RuntimeError::HelperFailed { reason, .. } => RuntimeError::HelperFailed { id, reason },
            other => other,
        })?;

        // R0 is only written by helpers that return a value.
        if helper.signature.returns() {
            self.set_reg(0, ret, pc)?;
        }
        Ok(())
    }
}

fn compare64(op: u8, a: u64, b: u64) -> Option<bool> {
    Some(match op {
        JMP_JEQ => a == b,
        JMP_JGT => a > b,
        JMP_JGE => a >= b,
        JMP_JSET => a & b != 0,
        JMP_JNE => a != b,
        JMP_JSGT => (a as i64) > (b as i64),
        JMP_JSGE => (a as i64) >= (b as i64),
        JMP_JLT => a < b,
        JMP_JLE => a <= b,
        JMP_JSLT => (a as i64) < (b as i64),
        JMP_JSLE => (a as i64) <= (b as i64),
        _ => return None,
    })
}

fn compare32(op: u8, a: u32, b: u32) -> Option<bool> {
    Some(match op {
        JMP_JEQ => a == b,
        JMP_JGT => a > b,
        JMP_JGE => a >= b,
        JMP_JSET => a & b != 0,
        JMP_JNE => a != b,
        JMP_JSGT => (a as i32) > (b as i32),
        JMP_JSGE => (a as i32) >= (b as i32),
        JMP_JLT => a < b,
        JMP_JLE => a <= b,
        JMP_JSLT => (a as i32) < (b as i32),
        JMP_JSLE => (a as i32) <= (b as i32),
        _ => return None,
    })
}
