use anyhow::Result;
use vm::opcode::OP_LDDW;
use vm::{Instruction, Program, Signature};

use super::load_program_file;

pub fn disassemble_program(program: &Program) -> Vec<String> {
    let mut lines = Vec::new();

    for func in program.functions() {
        lines.push(format!("== {} {} ==", func.name, func.signature));

        let mut pc = 0;
        while pc < func.code.len() {
            let insn = Instruction::decode(func.code[pc]);
            if insn.opcode == OP_LDDW {
                if let Some(&high) = func.code.get(pc + 1) {
                    let high = Instruction::decode(high).imm as u32 as u64;
                    let value = (insn.imm as u32 as u64) | (high << 32);
                    lines.push(format!("{:04} lddw r{}, {:#x}", pc, insn.dst, value));
                    pc += 2;
                    continue;
                }
            }
            lines.push(format!("{:04} {}", pc, insn));
            pc += 1;
        }
    }

    for decl in program.imports() {
        lines.push(format!(
            "import {:#x} {} {}",
            decl.id,
            decl.name.as_deref().unwrap_or("-"),
            decl.signature
        ));
    }
    lines
}

pub fn disassemble_file(path: &str) -> Result<()> {
    let program = load_program_file(path, Signature::new(0, true)?)?;
    println!("== Disassembly of {} ==", path);
    for line in disassemble_program(&program) {
        println!("{}", line);
    }
    Ok(())
}
