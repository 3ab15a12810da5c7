//! Machine module - reference execution environment
//!
//! The interpreter is split into focused submodules, one trait per
//! instruction family, all implemented on `VM`.

mod arithmetic;
mod control;
mod data;
mod memory;
mod registers;
mod vm;

// Public API
pub use memory::Memory;
pub use registers::RegisterFile;
pub use vm::{VmConfig, VM};
