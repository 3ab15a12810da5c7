//! Compiled units and entry-point resolution
//!
//! A `Program` is what a front end hands to the host: an ordered list of
//! functions plus the helper declarations its call sites were compiled
//! against. Only the first function is reachable from the host.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ProgramError, TrapKind};
use crate::opcode::{Instruction, CALL_HELPER, OP_CALL, OP_LDDW};
use crate::specs::{well_known_by_id, well_known_by_name, MAX_ARGS, MAX_INSNS};

/// Scalar arity of an entry point or helper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    arity: u8,
    returns: bool,
}

impl Signature {
    pub fn new(arity: u8, returns: bool) -> Result<Self, ProgramError> {
        if arity as usize > MAX_ARGS {
            return Err(ProgramError::InvalidArity(arity));
        }
        Ok(Self { arity, returns })
    }

    /// For const tables whose arities are known to be in range.
    pub(crate) const fn new_unchecked(arity: u8, returns: bool) -> Self {
        Self { arity, returns }
    }

    pub fn arity(&self) -> u8 {
        self.arity
    }

    pub fn returns(&self) -> bool {
        self.returns
    }

    /// Number of scalar results (0 or 1)
    pub fn return_arity(&self) -> u8 {
        self.returns as u8
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) -> {}", self.arity, self.return_arity())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub signature: Signature,
    pub code: Vec<u64>,
}

impl Function {
    pub fn new(name: impl Into<String>, signature: Signature, code: Vec<u64>) -> Self {
        Self {
            name: name.into(),
            signature,
            code,
        }
    }

    /// Every `call` instruction in the body, in program order.
    ///
    /// The second slot of `lddw` holds raw immediate bits and is skipped.
    pub fn call_sites(&self) -> Vec<CallSite> {
        let mut sites = Vec::new();
        let mut pc = 0;
        while pc < self.code.len() {
            let insn = Instruction::decode(self.code[pc]);
            if insn.opcode == OP_CALL {
                sites.push(CallSite {
                    pc,
                    id: insn.helper_id(),
                    pseudo: insn.src != CALL_HELPER,
                });
            }
            pc += if insn.opcode == OP_LDDW { 2 } else { 1 };
        }
        sites
    }
}

/// A `call` instruction found in a function body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub pc: usize,
    pub id: u32,
    /// bpf-to-bpf (or otherwise non-helper) call
    pub pseudo: bool,
}

/// Call-site declaration of a helper: identifier plus the signature the
/// code was compiled against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperDecl {
    pub id: u32,
    pub name: Option<String>,
    pub signature: Signature,
}

impl HelperDecl {
    /// Ad-hoc declaration with an explicit identifier.
    pub fn new(id: u32, signature: Signature) -> Self {
        Self {
            id,
            name: None,
            signature,
        }
    }

    pub fn named(id: u32, name: impl Into<String>, signature: Signature) -> Self {
        Self {
            id,
            name: Some(name.into()),
            signature,
        }
    }

    /// Declaration of a helper from the canonical registry.
    pub fn well_known(name: &str) -> Result<Self, ProgramError> {
        let meta = well_known_by_name(name)
            .ok_or_else(|| ProgramError::UnknownWellKnown(name.to_string()))?;
        Ok(Self::named(meta.id, meta.name, meta.signature))
    }
}

/// The host-visible entry point of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryDescriptor<'a> {
    pub function: &'a Function,
}

impl<'a> EntryDescriptor<'a> {
    pub fn name(&self) -> &'a str {
        &self.function.name
    }

    pub fn arity(&self) -> u8 {
        self.function.signature.arity()
    }

    pub fn returns(&self) -> bool {
        self.function.signature.returns()
    }
}

/// Immutable compiled unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    functions: Vec<Function>,
    imports: BTreeMap<u32, HelperDecl>,
}

impl Program {
    pub fn new(functions: Vec<Function>, imports: Vec<HelperDecl>) -> Result<Self, ProgramError> {
        for func in &functions {
            if func.code.len() > MAX_INSNS {
                return Err(ProgramError::CodeTooLarge {
                    name: func.name.clone(),
                    len: func.code.len(),
                    max: MAX_INSNS,
                });
            }
        }

        let mut table: BTreeMap<u32, HelperDecl> = BTreeMap::new();
        for decl in imports {
            match table.get(&decl.id) {
                Some(prev) if prev.signature != decl.signature => {
                    return Err(ProgramError::ConflictingImport { id: decl.id });
                }
                Some(_) => {}
                None => {
                    table.insert(decl.id, decl);
                }
            }
        }

        Ok(Self {
            functions,
            imports: table,
        })
    }

    /// Single-function program with no explicit imports.
    pub fn single(function: Function) -> Result<Self, ProgramError> {
        Self::new(vec![function], Vec::new())
    }

    /// Resolve the entry point: the first function in declaration order,
    /// whatever its name.
    pub fn entry(&self) -> Result<EntryDescriptor<'_>, TrapKind> {
        self.functions
            .first()
            .map(|function| EntryDescriptor { function })
            .ok_or(TrapKind::NoEntryPoint)
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    /// Functions after the entry point. They are kept in the unit but the
    /// host cannot call them and no instruction can reach them.
    pub fn unreachable_functions(&self) -> &[Function] {
        self.functions.get(1..).unwrap_or(&[])
    }

    pub fn imports(&self) -> impl Iterator<Item = &HelperDecl> {
        self.imports.values()
    }

    /// Signature a call site with this identifier was compiled against:
    /// the program's own declaration first, then the canonical registry.
    pub fn declared_signature(&self, id: u32) -> Option<Signature> {
        self.imports
            .get(&id)
            .map(|d| d.signature)
            .or_else(|| well_known_by_id(id).map(|m| m.signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::instruction::*;

    fn sig(arity: u8, returns: bool) -> Signature {
        Signature::new(arity, returns).unwrap()
    }

    #[test]
    fn test_signature_arity_limit() {
        assert!(Signature::new(5, true).is_ok());
        assert_eq!(Signature::new(6, true), Err(ProgramError::InvalidArity(6)));
    }

    #[test]
    fn test_entry_is_first_function_regardless_of_name() {
        let program = Program::new(
            vec![
                Function::new("function", sig(2, true), vec![exit()]),
                Function::new("main", sig(0, true), vec![exit()]),
            ],
            vec![],
        )
        .unwrap();
        let entry = program.entry().unwrap();
        assert_eq!(entry.name(), "function");
        assert_eq!(entry.arity(), 2);
        assert!(entry.returns());
        assert_eq!(program.unreachable_functions().len(), 1);
        assert_eq!(program.unreachable_functions()[0].name, "main");
    }

    #[test]
    fn test_empty_unit_has_no_entry_point() {
        let program = Program::new(vec![], vec![]).unwrap();
        assert_eq!(program.entry().unwrap_err(), TrapKind::NoEntryPoint);
        assert!(program.unreachable_functions().is_empty());
    }

    #[test]
    fn test_call_sites_skip_lddw_payload() {
        // lddw occupies slots 1 and 2.
        let mut code = vec![call(7)];
        code.extend(lddw(1, 0x85_0000_0000));
        code.push(call(200));
        code.push(exit());
        let func = Function::new("f", sig(0, true), code);
        let sites = func.call_sites();
        assert_eq!(sites.len(), 2);
        assert_eq!((sites[0].pc, sites[0].id), (0, 7));
        assert_eq!((sites[1].pc, sites[1].id), (3, 200));
    }

    #[test]
    fn test_conflicting_imports_rejected() {
        let result = Program::new(
            vec![],
            vec![
                HelperDecl::new(200, sig(1, true)),
                HelperDecl::new(200, sig(2, true)),
            ],
        );
        assert_eq!(result.unwrap_err(), ProgramError::ConflictingImport { id: 200 });
    }

    #[test]
    fn test_declared_signature_prefers_imports() {
        let program = Program::new(vec![], vec![HelperDecl::new(7, sig(1, true))]).unwrap();
        assert_eq!(program.declared_signature(7), Some(sig(1, true)));
        assert_eq!(program.declared_signature(5), Some(sig(0, true)));
        assert_eq!(program.declared_signature(200), None);
    }

    #[test]
    fn test_well_known_declaration() {
        let decl = HelperDecl::well_known("bpf_get_prandom_u32").unwrap();
        assert_eq!(decl.id, 7);
        assert!(matches!(
            HelperDecl::well_known("bpf_nope"),
            Err(ProgramError::UnknownWellKnown(_))
        ));
    }
}
