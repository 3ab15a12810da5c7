pub mod disassemble;
pub mod helpers;
pub mod run;
pub mod verify;

use std::fs::{self, File};
use std::io::BufReader;

use anyhow::{Context, Result};
use vm::loader::{load_program, load_raw};
use vm::{Program, Signature};

/// Container extension; every other file is treated as a raw binary.
pub const CONTAINER_EXT: &str = ".hbf";

/// Load a program from disk. `raw_signature` describes the entry point of a
/// raw binary and is ignored for containers, which carry their own.
pub fn load_program_file(path: &str, raw_signature: Signature) -> Result<Program> {
    if path.ends_with(CONTAINER_EXT) {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path))?;
        let mut reader = BufReader::new(file);
        load_program(&mut reader).with_context(|| format!("Failed to load container {}", path))
    } else {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path))?;
        load_raw(&bytes, raw_signature).with_context(|| format!("Failed to load raw binary {}", path))
    }
}
