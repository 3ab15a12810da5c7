use anyhow::{anyhow, Result};
use vm::{link, LinkReport, Signature};

use super::load_program_file;
use crate::config::Config;

/// Link the program at `path` against the configured helper table.
pub fn verify_program(path: &str, config: Option<&str>) -> Result<LinkReport> {
    let config = Config::load(config)?;
    let table = config.helper_table()?;
    // Raw binaries carry no signature; arity does not affect linking.
    let program = load_program_file(path, Signature::new(0, true)?)?;
    link(&program, &table).map_err(|trap| anyhow!("Link failed: {}", trap))
}

pub fn verify_file(path: &str, config: Option<&str>) -> Result<()> {
    let report = verify_program(path, config)?;

    println!("entry: {}", report.entry);
    for call in &report.calls {
        println!(
            "  pc {:04}: call {:#x} -> {} {}",
            call.pc, call.id, call.helper, call.signature
        );
    }
    for name in &report.unreachable {
        println!("  unreachable: {}", name);
    }
    println!("ok");
    Ok(())
}
