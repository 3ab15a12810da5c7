use crate::error::RuntimeError;
use crate::specs::{NUM_REGS, REG_FP};

/// Per-invocation register file: R0 return, R1-R5 arguments, R6-R9
/// callee-saved scratch, R10 read-only frame pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFile {
    regs: [u64; NUM_REGS],
}

impl RegisterFile {
    pub fn new(frame_pointer: u64) -> Self {
        let mut regs = [0; NUM_REGS];
        regs[REG_FP as usize] = frame_pointer;
        Self { regs }
    }

    #[inline]
    pub fn get(&self, reg: u8) -> Option<u64> {
        self.regs.get(reg as usize).copied()
    }

    /// Write a general purpose register. R10 and out-of-range indices are
    /// refused.
    #[inline]
    pub fn set(&mut self, reg: u8, val: u64) -> bool {
        if reg >= REG_FP {
            return false;
        }
        self.regs[reg as usize] = val;
        true
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.regs
    }
}

/// Trait for register access from instruction handlers
pub trait RegisterOps {
    fn get_reg(&self, reg: u8, pc: usize) -> Result<u64, RuntimeError>;
    fn set_reg(&mut self, reg: u8, val: u64, pc: usize) -> Result<(), RuntimeError>;
}

impl RegisterOps for super::vm::VM<'_> {
    #[inline(always)]
    fn get_reg(&self, reg: u8, pc: usize) -> Result<u64, RuntimeError> {
        self.regs
            .get(reg)
            .ok_or(RuntimeError::InvalidRegister { reg, pc })
    }

    #[inline(always)]
    fn set_reg(&mut self, reg: u8, val: u64, pc: usize) -> Result<(), RuntimeError> {
        if self.regs.set(reg, val) {
            Ok(())
        } else {
            Err(RuntimeError::InvalidRegister { reg, pc })
        }
    }
}
