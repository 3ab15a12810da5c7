//! Instruction set definitions for the hBPF machine
//!
//! Instructions are 64-bit words. Viewed as a little-endian integer the
//! fields are laid out as:
//!
//! ```text
//! MSB                                                        LSB
//! +------------------------+----------------+----+----+--------+
//! |immediate               |offset          |src |dst |opcode  |
//! +------------------------+----------------+----+----+--------+
//! 63                     32               16   12    8        0
//! ```
//!
//! The opcode byte splits into a 3-bit class and class-specific bits:
//! ALU/JMP use `[4-bit operation][1-bit source][3-bit class]`,
//! loads/stores use `[3-bit mode][2-bit size][3-bit class]`.

use std::fmt;

// ===== Classes =====
pub const CLASS_LD: u8 = 0x00;
pub const CLASS_LDX: u8 = 0x01;
pub const CLASS_ST: u8 = 0x02;
pub const CLASS_STX: u8 = 0x03;
pub const CLASS_ALU: u8 = 0x04;
pub const CLASS_JMP: u8 = 0x05;
pub const CLASS_JMP32: u8 = 0x06;
pub const CLASS_ALU64: u8 = 0x07;

// ===== Source operand =====
/// 32-bit immediate
pub const SRC_K: u8 = 0x00;
/// `src` register
pub const SRC_X: u8 = 0x08;

// ===== ALU operations =====
pub const ALU_ADD: u8 = 0x00;
pub const ALU_SUB: u8 = 0x10;
pub const ALU_MUL: u8 = 0x20;
pub const ALU_DIV: u8 = 0x30;
pub const ALU_OR: u8 = 0x40;
pub const ALU_AND: u8 = 0x50;
pub const ALU_LSH: u8 = 0x60;
pub const ALU_RSH: u8 = 0x70;
pub const ALU_NEG: u8 = 0x80;
pub const ALU_MOD: u8 = 0x90;
pub const ALU_XOR: u8 = 0xa0;
pub const ALU_MOV: u8 = 0xb0;
pub const ALU_ARSH: u8 = 0xc0;
pub const ALU_END: u8 = 0xd0;

// ===== Jump operations =====
pub const JMP_JA: u8 = 0x00;
pub const JMP_JEQ: u8 = 0x10;
pub const JMP_JGT: u8 = 0x20;
pub const JMP_JGE: u8 = 0x30;
pub const JMP_JSET: u8 = 0x40;
pub const JMP_JNE: u8 = 0x50;
pub const JMP_JSGT: u8 = 0x60;
pub const JMP_JSGE: u8 = 0x70;
pub const JMP_CALL: u8 = 0x80;
pub const JMP_EXIT: u8 = 0x90;
pub const JMP_JLT: u8 = 0xa0;
pub const JMP_JLE: u8 = 0xb0;
pub const JMP_JSLT: u8 = 0xc0;
pub const JMP_JSLE: u8 = 0xd0;

// ===== Load/store sizes =====
pub const SIZE_W: u8 = 0x00;
pub const SIZE_H: u8 = 0x08;
pub const SIZE_B: u8 = 0x10;
pub const SIZE_DW: u8 = 0x18;

// ===== Load/store modes =====
pub const MODE_IMM: u8 = 0x00;
pub const MODE_ABS: u8 = 0x20;
pub const MODE_IND: u8 = 0x40;
pub const MODE_MEM: u8 = 0x60;
pub const MODE_ATOMIC: u8 = 0xc0;

// ===== Frequently used full opcodes =====
/// `lddw dst, imm64` (occupies two slots)
pub const OP_LDDW: u8 = CLASS_LD | MODE_IMM | SIZE_DW;
/// `call imm`
pub const OP_CALL: u8 = CLASS_JMP | JMP_CALL;
/// `exit`
pub const OP_EXIT: u8 = CLASS_JMP | JMP_EXIT;

/// `src` value of a `call` that targets a helper
pub const CALL_HELPER: u8 = 0;
/// `src` value of a bpf-to-bpf call (not supported)
pub const CALL_PSEUDO: u8 = 1;

/// Decoded view of one instruction slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub dst: u8,
    pub src: u8,
    pub off: i16,
    pub imm: i32,
}

impl Instruction {
    pub fn decode(word: u64) -> Self {
        Self {
            opcode: (word & 0xff) as u8,
            dst: ((word >> 8) & 0x0f) as u8,
            src: ((word >> 12) & 0x0f) as u8,
            off: ((word >> 16) & 0xffff) as u16 as i16,
            imm: ((word >> 32) & 0xffff_ffff) as u32 as i32,
        }
    }

    pub fn encode(self) -> u64 {
        instruction::encode(self.opcode, self.dst, self.src, self.off, self.imm)
    }

    #[inline]
    pub fn class(&self) -> u8 {
        self.opcode & 0x07
    }

    /// Operation bits of an ALU or JMP opcode
    #[inline]
    pub fn operation(&self) -> u8 {
        self.opcode & 0xf0
    }

    #[inline]
    pub fn uses_src_reg(&self) -> bool {
        self.opcode & SRC_X != 0
    }

    #[inline]
    pub fn size(&self) -> u8 {
        self.opcode & 0x18
    }

    #[inline]
    pub fn mode(&self) -> u8 {
        self.opcode & 0xe0
    }

    /// True for `call imm` targeting a helper.
    pub fn is_helper_call(&self) -> bool {
        self.opcode == OP_CALL && self.src == CALL_HELPER
    }

    /// Helper identifier carried by a `call` instruction.
    pub fn helper_id(&self) -> u32 {
        self.imm as u32
    }

    /// Human-readable mnemonic
    pub fn mnemonic(&self) -> &'static str {
        match self.class() {
            CLASS_ALU | CLASS_ALU64 => {
                let wide = self.class() == CLASS_ALU64;
                match (self.operation(), wide) {
                    (ALU_ADD, true) => "add",
                    (ALU_ADD, false) => "add32",
                    (ALU_SUB, true) => "sub",
                    (ALU_SUB, false) => "sub32",
                    (ALU_MUL, true) => "mul",
                    (ALU_MUL, false) => "mul32",
                    (ALU_DIV, true) => "div",
                    (ALU_DIV, false) => "div32",
                    (ALU_OR, true) => "or",
                    (ALU_OR, false) => "or32",
                    (ALU_AND, true) => "and",
                    (ALU_AND, false) => "and32",
                    (ALU_LSH, true) => "lsh",
                    (ALU_LSH, false) => "lsh32",
                    (ALU_RSH, true) => "rsh",
                    (ALU_RSH, false) => "rsh32",
                    (ALU_NEG, true) => "neg",
                    (ALU_NEG, false) => "neg32",
                    (ALU_MOD, true) => "mod",
                    (ALU_MOD, false) => "mod32",
                    (ALU_XOR, true) => "xor",
                    (ALU_XOR, false) => "xor32",
                    (ALU_MOV, true) => "mov",
                    (ALU_MOV, false) => "mov32",
                    (ALU_ARSH, true) => "arsh",
                    (ALU_ARSH, false) => "arsh32",
                    (ALU_END, _) if self.uses_src_reg() => "be",
                    (ALU_END, _) => "le",
                    _ => "unknown",
                }
            }
            CLASS_JMP | CLASS_JMP32 => match self.operation() {
                JMP_JA => "ja",
                JMP_JEQ => "jeq",
                JMP_JGT => "jgt",
                JMP_JGE => "jge",
                JMP_JSET => "jset",
                JMP_JNE => "jne",
                JMP_JSGT => "jsgt",
                JMP_JSGE => "jsge",
                JMP_CALL => "call",
                JMP_EXIT => "exit",
                JMP_JLT => "jlt",
                JMP_JLE => "jle",
                JMP_JSLT => "jslt",
                JMP_JSLE => "jsle",
                _ => "unknown",
            },
            CLASS_LD if self.opcode == OP_LDDW => "lddw",
            CLASS_LD if self.mode() == MODE_ABS => "ldabs",
            CLASS_LD if self.mode() == MODE_IND => "ldind",
            CLASS_LDX => "ldx",
            CLASS_ST => "st",
            CLASS_STX if self.mode() == MODE_ATOMIC => "xadd",
            CLASS_STX => "stx",
            _ => "unknown",
        }
    }

    fn size_suffix(&self) -> &'static str {
        match self.size() {
            SIZE_W => "w",
            SIZE_H => "h",
            SIZE_B => "b",
            _ => "dw",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.mnemonic();
        match self.class() {
            CLASS_ALU | CLASS_ALU64 => match self.operation() {
                ALU_NEG => write!(f, "{} r{}", name, self.dst),
                ALU_END => write!(f, "{}{} r{}", name, self.imm, self.dst),
                _ if self.uses_src_reg() => write!(f, "{} r{}, r{}", name, self.dst, self.src),
                _ => write!(f, "{} r{}, {}", name, self.dst, self.imm),
            },
            CLASS_JMP | CLASS_JMP32 => {
                let suffix = if self.class() == CLASS_JMP32 { "32" } else { "" };
                match self.operation() {
                    JMP_JA => write!(f, "ja {:+}", self.off),
                    JMP_CALL if self.src == CALL_PSEUDO => write!(f, "call pc{:+}", self.imm),
                    JMP_CALL => write!(f, "call {:#x}", self.helper_id()),
                    JMP_EXIT => write!(f, "exit"),
                    _ if self.uses_src_reg() => write!(
                        f,
                        "{}{} r{}, r{}, {:+}",
                        name, suffix, self.dst, self.src, self.off
                    ),
                    _ => write!(
                        f,
                        "{}{} r{}, {}, {:+}",
                        name, suffix, self.dst, self.imm, self.off
                    ),
                }
            }
            CLASS_LD if self.opcode == OP_LDDW => write!(f, "lddw r{}, {:#x}", self.dst, self.imm),
            CLASS_LD if self.mode() == MODE_ABS => {
                write!(f, "{}{} {}", name, self.size_suffix(), self.imm)
            }
            CLASS_LD if self.mode() == MODE_IND => write!(
                f,
                "{}{} r{}, {}",
                name,
                self.size_suffix(),
                self.src,
                self.imm
            ),
            CLASS_LDX => write!(
                f,
                "ldx{} r{}, [r{}{:+}]",
                self.size_suffix(),
                self.dst,
                self.src,
                self.off
            ),
            CLASS_ST => write!(
                f,
                "st{} [r{}{:+}], {}",
                self.size_suffix(),
                self.dst,
                self.off,
                self.imm
            ),
            CLASS_STX => write!(
                f,
                "{}{} [r{}{:+}], r{}",
                name,
                self.size_suffix(),
                self.dst,
                self.off,
                self.src
            ),
            _ => write!(f, "unknown {:#04x}", self.opcode),
        }
    }
}

/// Instruction encoding utilities
///
/// These build raw instruction words the same way a compiler back end
/// would emit them, so hosts and tests can assemble programs directly.
pub mod instruction {
    use super::*;

    /// Encode an instruction from its fields
    #[inline]
    pub fn encode(opcode: u8, dst: u8, src: u8, off: i16, imm: i32) -> u64 {
        (opcode as u64)
            | (((dst & 0x0f) as u64) << 8)
            | (((src & 0x0f) as u64) << 12)
            | ((off as u16 as u64) << 16)
            | ((imm as u32 as u64) << 32)
    }

    /// 64-bit ALU operation with an immediate operand: `dst op= imm`
    pub fn alu64_imm(op: u8, dst: u8, imm: i32) -> u64 {
        encode(CLASS_ALU64 | op | SRC_K, dst, 0, 0, imm)
    }

    /// 64-bit ALU operation with a register operand: `dst op= src`
    pub fn alu64_reg(op: u8, dst: u8, src: u8) -> u64 {
        encode(CLASS_ALU64 | op | SRC_X, dst, src, 0, 0)
    }

    /// 32-bit ALU operation with an immediate operand
    pub fn alu32_imm(op: u8, dst: u8, imm: i32) -> u64 {
        encode(CLASS_ALU | op | SRC_K, dst, 0, 0, imm)
    }

    /// 32-bit ALU operation with a register operand
    pub fn alu32_reg(op: u8, dst: u8, src: u8) -> u64 {
        encode(CLASS_ALU | op | SRC_X, dst, src, 0, 0)
    }

    pub fn mov64_imm(dst: u8, imm: i32) -> u64 {
        alu64_imm(ALU_MOV, dst, imm)
    }

    pub fn mov64_reg(dst: u8, src: u8) -> u64 {
        alu64_reg(ALU_MOV, dst, src)
    }

    pub fn add64_imm(dst: u8, imm: i32) -> u64 {
        alu64_imm(ALU_ADD, dst, imm)
    }

    pub fn add64_reg(dst: u8, src: u8) -> u64 {
        alu64_reg(ALU_ADD, dst, src)
    }

    /// Byte swap (`be16/32/64`) or truncation (`le16/32/64`)
    pub fn endian(dst: u8, bits: i32, big: bool) -> u64 {
        let src = if big { SRC_X } else { SRC_K };
        encode(CLASS_ALU | ALU_END | src, dst, 0, 0, bits)
    }

    /// Conditional jump against an immediate: `if dst op imm goto +off`
    pub fn jmp_imm(op: u8, dst: u8, imm: i32, off: i16) -> u64 {
        encode(CLASS_JMP | op | SRC_K, dst, 0, off, imm)
    }

    /// Conditional jump against a register: `if dst op src goto +off`
    pub fn jmp_reg(op: u8, dst: u8, src: u8, off: i16) -> u64 {
        encode(CLASS_JMP | op | SRC_X, dst, src, off, 0)
    }

    /// 32-bit conditional jump against an immediate
    pub fn jmp32_imm(op: u8, dst: u8, imm: i32, off: i16) -> u64 {
        encode(CLASS_JMP32 | op | SRC_K, dst, 0, off, imm)
    }

    /// Unconditional jump
    pub fn ja(off: i16) -> u64 {
        encode(CLASS_JMP | JMP_JA, 0, 0, off, 0)
    }

    /// Call the helper with the given identifier
    pub fn call(id: u32) -> u64 {
        encode(OP_CALL, 0, CALL_HELPER, 0, id as i32)
    }

    pub fn exit() -> u64 {
        encode(OP_EXIT, 0, 0, 0, 0)
    }

    /// `lddw dst, imm64`, returned as its two slots
    pub fn lddw(dst: u8, imm: u64) -> [u64; 2] {
        [
            encode(OP_LDDW, dst, 0, 0, imm as u32 as i32),
            encode(0, 0, 0, 0, (imm >> 32) as u32 as i32),
        ]
    }

    /// `r0 = ntoh(context[imm])`
    pub fn ldabs(size: u8, imm: i32) -> u64 {
        encode(CLASS_LD | MODE_ABS | size, 0, 0, 0, imm)
    }

    /// `r0 = ntoh(context[src + imm])`
    pub fn ldind(size: u8, src: u8, imm: i32) -> u64 {
        encode(CLASS_LD | MODE_IND | size, 0, src, 0, imm)
    }

    /// `dst = *(size *)(src + off)`
    pub fn ldx(size: u8, dst: u8, src: u8, off: i16) -> u64 {
        encode(CLASS_LDX | MODE_MEM | size, dst, src, off, 0)
    }

    /// `*(size *)(dst + off) = src`
    pub fn stx(size: u8, dst: u8, off: i16, src: u8) -> u64 {
        encode(CLASS_STX | MODE_MEM | size, dst, src, off, 0)
    }

    /// `*(size *)(dst + off) = imm`
    pub fn st(size: u8, dst: u8, off: i16, imm: i32) -> u64 {
        encode(CLASS_ST | MODE_MEM | size, dst, 0, off, imm)
    }

    /// `*(size *)(dst + off) += src`
    pub fn xadd(size: u8, dst: u8, off: i16, src: u8) -> u64 {
        encode(CLASS_STX | MODE_ATOMIC | size, dst, src, off, 0)
    }
}
