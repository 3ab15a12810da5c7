//! Link-time verification of a program against a helper table
//!
//! Every call site of the entry point must name a helper that exists in the
//! table, and the signature it was compiled against must match the
//! registered one. Catching this here means an invocation never starts with
//! a call it cannot complete.

use tracing::debug;

use crate::error::{RuntimeError, TrapKind};
use crate::program::{Program, Signature};
use crate::table::HelperTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCall {
    pub pc: usize,
    pub id: u32,
    pub helper: String,
    pub signature: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReport {
    pub entry: String,
    pub calls: Vec<ResolvedCall>,
    /// Functions present in the unit that the host can never reach
    pub unreachable: Vec<String>,
}

pub fn link(program: &Program, table: &HelperTable) -> Result<LinkReport, TrapKind> {
    let entry = program.entry()?;

    let mut calls = Vec::new();
    for site in entry.function.call_sites() {
        if site.pseudo {
            return Err(RuntimeError::UnsupportedCall { pc: site.pc }.into());
        }

        let helper = table
            .get(site.id)
            .ok_or(TrapKind::UnknownHelper { id: site.id })?;

        if let Some(declared) = program.declared_signature(site.id) {
            if declared != helper.signature {
                return Err(TrapKind::SignatureMismatch {
                    id: site.id,
                    declared,
                    registered: helper.signature,
                });
            }
        }

        calls.push(ResolvedCall {
            pc: site.pc,
            id: site.id,
            helper: helper.name.clone(),
            signature: helper.signature,
        });
    }

    let unreachable: Vec<String> = program
        .unreachable_functions()
        .iter()
        .map(|f| f.name.clone())
        .collect();
    for name in &unreachable {
        debug!(function = %name, "function is not reachable from the host");
    }

    Ok(LinkReport {
        entry: entry.name().to_string(),
        calls,
        unreachable,
    })
}
