use tracing::trace;

use crate::error::{RuntimeError, TrapKind};
use crate::opcode::{
    Instruction, CLASS_ALU, CLASS_ALU64, CLASS_JMP, CLASS_JMP32, CLASS_LD, CLASS_LDX, CLASS_ST,
    CLASS_STX,
};
use crate::program::{Function, Program};
use crate::specs::{DEFAULT_MAX_STEPS, MAX_ARGS};
use crate::table::HelperTable;

use super::arithmetic::ArithmeticOps;
use super::control::ControlFlowOps;
use super::data::DataOps;
use super::memory::Memory;
use super::registers::RegisterFile;

/// Execution environment settings for one invocation.
#[derive(Debug, Clone)]
pub struct VmConfig {
    /// Instructions executed before the run is aborted
    pub max_steps: u64,
    /// Bytes mapped at `DATA_START`
    pub context: Vec<u8>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            context: Vec::new(),
        }
    }
}

impl VmConfig {
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_context(mut self, context: Vec<u8>) -> Self {
        self.context = context;
        self
    }
}

/// The Virtual Machine struct
///
/// One `VM` runs exactly one invocation of a program's entry point. It owns
/// its register file and memory and only borrows the program and the helper
/// table, so any number of machines can share them.
pub struct VM<'a> {
    pub regs: RegisterFile,
    pub memory: Memory,
    pub pc: usize,
    pub steps: u64,
    pub(super) program: &'a Program,
    pub(super) table: &'a HelperTable,
    pub(super) code: &'a [u64],
    max_steps: u64,
}

impl<'a> VM<'a> {
    /// Prepare a machine positioned at the entry point of `program`.
    pub fn new(program: &'a Program, table: &'a HelperTable, config: VmConfig) -> Result<Self, TrapKind> {
        let entry = program.entry()?;
        let memory = Memory::new(config.context)?;
        Ok(Self {
            regs: RegisterFile::new(Memory::frame_pointer()),
            memory,
            pc: 0,
            steps: 0,
            program,
            table,
            code: &entry.function.code,
            max_steps: config.max_steps,
        })
    }

    pub fn entry(&self) -> Result<&'a Function, TrapKind> {
        self.program.entry().map(|e| e.function)
    }

    /// Write argument `index` (0-based) into R(index + 1).
    pub fn set_arg(&mut self, index: usize, value: u64) -> Result<(), RuntimeError> {
        if index >= MAX_ARGS {
            return Err(RuntimeError::InvalidRegister {
                reg: (index + 1) as u8,
                pc: self.pc,
            });
        }
        self.regs.set((index + 1) as u8, value);
        Ok(())
    }

    /// Main interpretation loop. Returns R0 when the program exits.
    pub fn interpret(&mut self) -> Result<u64, TrapKind> {
        loop {
            if self.steps >= self.max_steps {
                return Err(RuntimeError::StepLimitExceeded(self.max_steps).into());
            }

            let pc = self.pc;
            let word = *self.code.get(pc).ok_or(RuntimeError::PcOutOfRange(pc))?;
            let insn = Instruction::decode(word);
            self.pc += 1;
            self.steps += 1;

            trace!(pc, insn = %insn, "step");

            match insn.class() {
                // ALU (delegated to arithmetic.rs)
                CLASS_ALU | CLASS_ALU64 => self.handle_alu(insn, pc)?,

                // Jumps, helper calls and exit (delegated to control.rs)
                CLASS_JMP | CLASS_JMP32 => {
                    if let Some(ret) = self.handle_jump(insn, pc)? {
                        return Ok(ret);
                    }
                }

                // Loads and stores (delegated to data.rs)
                CLASS_LD => self.handle_ld(insn, pc)?,
                CLASS_LDX => self.handle_load(insn, pc)?,
                CLASS_ST | CLASS_STX => self.handle_store(insn, pc)?,

                _ => {
                    return Err(RuntimeError::InvalidOpcode {
                        opcode: insn.opcode,
                        pc,
                    }
                    .into())
                }
            }
        }
    }

    /// Move the program counter by `off` relative to the next instruction.
    pub(super) fn jump_relative(&mut self, off: i16) -> Result<(), RuntimeError> {
        let target = self.pc as i64 + off as i64;
        if target < 0 || target as usize > self.code.len() {
            return Err(RuntimeError::PcOutOfRange(target.max(0) as usize));
        }
        self.pc = target as usize;
        Ok(())
    }
}
