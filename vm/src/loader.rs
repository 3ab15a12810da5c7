//! Program container (`.hbf`) and raw binary loading
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! magic "HBF\x01"
//! u16 function count
//!   u16 name len, name, u8 arity, u8 returns, u32 slot count, u64 slots
//! u16 import count
//!   u32 id, u8 arity, u8 returns, u16 name len, name (empty = unnamed)
//! ```

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::error::ProgramError;
use crate::program::{Function, HelperDecl, Program, Signature};
use crate::specs::MAX_INSNS;

pub const MAGIC: &[u8; 4] = b"HBF\x01";

pub const MAX_FUNCTIONS: usize = 64;
pub const MAX_IMPORTS: usize = 256;
pub const MAX_NAME_LEN: usize = 256;

/// Name given to the function of a raw binary.
pub const RAW_ENTRY_NAME: &str = "entry";

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid container: {0}")]
    Format(String),
    #[error("container exceeds limit: {0}")]
    Security(String),
    #[error(transparent)]
    Program(#[from] ProgramError),
}

/// Read a container into a `Program`.
///
/// # Security
/// Every count and length is checked against its limit before anything is
/// allocated for it.
pub fn load_program<R: Read>(reader: &mut R) -> Result<Program, LoaderError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(LoaderError::Format("invalid magic or version".to_string()));
    }

    // --- Functions ---
    let func_count = reader.read_u16::<LittleEndian>()? as usize;
    if func_count > MAX_FUNCTIONS {
        return Err(LoaderError::Security(format!(
            "function count {} exceeds {}",
            func_count, MAX_FUNCTIONS
        )));
    }

    let mut functions = Vec::with_capacity(func_count);
    for _ in 0..func_count {
        let name_len = reader.read_u16::<LittleEndian>()? as usize;
        let name = read_name(reader, name_len)?;
        let signature = read_signature(reader)?;

        let slot_count = reader.read_u32::<LittleEndian>()? as usize;
        if slot_count > MAX_INSNS {
            return Err(LoaderError::Security(format!(
                "function `{}` has {} slots, limit is {}",
                name, slot_count, MAX_INSNS
            )));
        }
        let mut code = Vec::with_capacity(slot_count);
        for _ in 0..slot_count {
            code.push(reader.read_u64::<LittleEndian>()?);
        }

        functions.push(Function::new(name, signature, code));
    }

    // --- Imports ---
    let import_count = reader.read_u16::<LittleEndian>()? as usize;
    if import_count > MAX_IMPORTS {
        return Err(LoaderError::Security(format!(
            "import count {} exceeds {}",
            import_count, MAX_IMPORTS
        )));
    }

    let mut imports = Vec::with_capacity(import_count);
    for _ in 0..import_count {
        let id = reader.read_u32::<LittleEndian>()?;
        let signature = read_signature(reader)?;
        let name_len = reader.read_u16::<LittleEndian>()? as usize;
        let name = read_name(reader, name_len)?;
        imports.push(if name.is_empty() {
            HelperDecl::new(id, signature)
        } else {
            HelperDecl::named(id, name, signature)
        });
    }

    Ok(Program::new(functions, imports)?)
}

fn read_name<R: Read>(reader: &mut R, len: usize) -> Result<String, LoaderError> {
    if len > MAX_NAME_LEN {
        return Err(LoaderError::Security(format!(
            "name length {} exceeds {}",
            len, MAX_NAME_LEN
        )));
    }
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| LoaderError::Format("invalid UTF-8 in name".to_string()))
}

fn read_signature<R: Read>(reader: &mut R) -> Result<Signature, LoaderError> {
    let arity = reader.read_u8()?;
    let returns = match reader.read_u8()? {
        0 => false,
        1 => true,
        other => {
            return Err(LoaderError::Format(format!(
                "return arity must be 0 or 1, got {}",
                other
            )))
        }
    };
    Ok(Signature::new(arity, returns)?)
}

/// Serialize `program` in the container format read by `load_program`.
///
/// Nothing is written unless the whole program fits the container limits.
pub fn write_program<W: Write>(program: &Program, writer: &mut W) -> Result<(), LoaderError> {
    check_writable(program)?;

    writer.write_all(MAGIC)?;

    let functions = program.functions();
    writer.write_u16::<LittleEndian>(functions.len() as u16)?;
    for func in functions {
        write_name(writer, &func.name)?;
        write_signature(writer, func.signature)?;
        writer.write_u32::<LittleEndian>(func.code.len() as u32)?;
        for &slot in &func.code {
            writer.write_u64::<LittleEndian>(slot)?;
        }
    }

    let imports: Vec<&HelperDecl> = program.imports().collect();
    writer.write_u16::<LittleEndian>(imports.len() as u16)?;
    for decl in imports {
        writer.write_u32::<LittleEndian>(decl.id)?;
        write_signature(writer, decl.signature)?;
        write_name(writer, decl.name.as_deref().unwrap_or(""))?;
    }

    Ok(())
}

/// Apply the limits `load_program` enforces, so a written container always
/// loads back. `Program` itself only bounds code size.
fn check_writable(program: &Program) -> Result<(), LoaderError> {
    let functions = program.functions();
    if functions.len() > MAX_FUNCTIONS {
        return Err(LoaderError::Security(format!(
            "function count {} exceeds {}",
            functions.len(),
            MAX_FUNCTIONS
        )));
    }
    for func in functions {
        check_name(&func.name)?;
    }

    let import_count = program.imports().count();
    if import_count > MAX_IMPORTS {
        return Err(LoaderError::Security(format!(
            "import count {} exceeds {}",
            import_count, MAX_IMPORTS
        )));
    }
    for decl in program.imports() {
        check_name(decl.name.as_deref().unwrap_or(""))?;
    }
    Ok(())
}

fn check_name(name: &str) -> Result<(), LoaderError> {
    if name.len() > MAX_NAME_LEN {
        return Err(LoaderError::Security(format!(
            "name `{}` is longer than {} bytes",
            name, MAX_NAME_LEN
        )));
    }
    Ok(())
}

fn write_name<W: Write>(writer: &mut W, name: &str) -> Result<(), LoaderError> {
    writer.write_u16::<LittleEndian>(name.len() as u16)?;
    writer.write_all(name.as_bytes())?;
    Ok(())
}

fn write_signature<W: Write>(writer: &mut W, signature: Signature) -> Result<(), LoaderError> {
    writer.write_u8(signature.arity())?;
    writer.write_u8(signature.return_arity())?;
    Ok(())
}

/// Wrap a flat binary of instruction words as a single-function program.
pub fn load_raw(bytes: &[u8], signature: Signature) -> Result<Program, LoaderError> {
    if bytes.len() % 8 != 0 {
        return Err(LoaderError::Format(format!(
            "raw binary length {} is not a multiple of 8",
            bytes.len()
        )));
    }
    let slots = bytes.len() / 8;
    if slots > MAX_INSNS {
        return Err(LoaderError::Security(format!(
            "raw binary has {} slots, limit is {}",
            slots, MAX_INSNS
        )));
    }

    let mut reader = bytes;
    let mut code = Vec::with_capacity(slots);
    for _ in 0..slots {
        code.push(reader.read_u64::<LittleEndian>()?);
    }

    Ok(Program::single(Function::new(RAW_ENTRY_NAME, signature, code))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::instruction::*;

    #[test]
    fn test_rejects_bad_magic() {
        let bytes = b"ACH\x08\x00\x00\x00\x00".to_vec();
        let err = load_program(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, LoaderError::Format(_)));
    }

    #[test]
    fn test_truncated_container_is_io_error() {
        let mut bytes = MAGIC.to_vec();
        bytes.extend_from_slice(&1u16.to_le_bytes());
        let err = load_program(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, LoaderError::Io(_)));
    }

    #[test]
    fn test_raw_binary_must_be_whole_words() {
        let sig = Signature::new(0, true).unwrap();
        assert!(matches!(
            load_raw(&[0u8; 12], sig),
            Err(LoaderError::Format(_))
        ));

        let mut bytes = Vec::new();
        bytes.extend_from_slice(&mov64_imm(0, 9).to_le_bytes());
        bytes.extend_from_slice(&exit().to_le_bytes());
        let program = load_raw(&bytes, sig).unwrap();
        let entry = program.entry().unwrap();
        assert_eq!(entry.name(), RAW_ENTRY_NAME);
        assert_eq!(entry.function.code, vec![mov64_imm(0, 9), exit()]);
    }
}
