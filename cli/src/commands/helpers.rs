use anyhow::Result;
use serde::Serialize;
use vm::specs::well_known_by_id;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HelperEntry {
    pub id: u32,
    pub name: String,
    pub arity: u8,
    pub returns: bool,
    /// Canonical name when the id belongs to the well-known registry
    pub well_known: Option<&'static str>,
}

pub fn list_helpers(config: Option<&str>) -> Result<Vec<HelperEntry>> {
    let table = Config::load(config)?.helper_table()?;
    Ok(table
        .iter()
        .map(|(id, helper)| HelperEntry {
            id,
            name: helper.name.clone(),
            arity: helper.signature.arity(),
            returns: helper.signature.returns(),
            well_known: well_known_by_id(id).map(|m| m.name),
        })
        .collect())
}

pub fn helpers_command(config: Option<&str>, json: bool) -> Result<()> {
    let entries = list_helpers(config)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{:>6}  {:<22} {:<10} well-known", "id", "routine", "signature");
    for e in &entries {
        println!(
            "{:>#6x}  {:<22} {:<10} {}",
            e.id,
            e.name,
            format!("({}) -> {}", e.arity, e.returns as u8),
            e.well_known.unwrap_or("-")
        );
    }
    Ok(())
}
