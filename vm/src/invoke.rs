//! Invocation of a program's entry point
//!
//! An invocation walks `Ready → ArgsBound → Running → {Returned | Trapped}`.
//! Terminal states are final: `Returned` carries the R0 value (or nothing
//! for a void entry point), `Trapped` carries the failure.

use tracing::{info, warn};

use crate::error::{RuntimeError, TrapKind};
use crate::link::link;
use crate::machine::{VmConfig, VM};
use crate::program::Program;
use crate::table::HelperTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationState {
    Ready,
    ArgsBound,
    Running,
    Returned(Option<u64>),
    Trapped(TrapKind),
}

impl InvocationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, InvocationState::Returned(_) | InvocationState::Trapped(_))
    }
}

pub struct Invocation<'a> {
    program: &'a Program,
    table: &'a HelperTable,
    config: Option<VmConfig>,
    machine: Option<VM<'a>>,
    state: InvocationState,
}

impl<'a> Invocation<'a> {
    pub fn new(program: &'a Program, table: &'a HelperTable) -> Self {
        Self::with_config(program, table, VmConfig::default())
    }

    pub fn with_config(program: &'a Program, table: &'a HelperTable, config: VmConfig) -> Self {
        Self {
            program,
            table,
            config: Some(config),
            machine: None,
            state: InvocationState::Ready,
        }
    }

    pub fn state(&self) -> &InvocationState {
        &self.state
    }

    /// Resolve the entry point and write `args[i]` into R(i+1).
    ///
    /// Arguments beyond the entry point's arity are ignored; fewer is an
    /// `ArityMismatch`. Unbound registers are left to the machine.
    pub fn bind(&mut self, args: &[u64]) -> Result<(), TrapKind> {
        if self.state != InvocationState::Ready {
            return Err(self.bad_transition("bind"));
        }

        let bound = self.prepare(args);
        match bound {
            Ok(vm) => {
                self.machine = Some(vm);
                self.state = InvocationState::ArgsBound;
                Ok(())
            }
            Err(trap) => Err(self.trap(trap)),
        }
    }

    fn prepare(&mut self, args: &[u64]) -> Result<VM<'a>, TrapKind> {
        let entry = self.program.entry()?;
        let arity = entry.arity() as usize;
        if args.len() < arity {
            return Err(TrapKind::ArityMismatch {
                expected: entry.arity(),
                got: args.len(),
            });
        }

        let config = self.config.take().unwrap_or_default();
        let mut vm = VM::new(self.program, self.table, config)?;
        for (i, &value) in args.iter().take(arity).enumerate() {
            vm.set_arg(i, value)?;
        }
        Ok(vm)
    }

    /// Link the program against the table and run the entry point.
    ///
    /// Calling `run` again after a terminal state returns the same outcome.
    pub fn run(&mut self) -> Result<Option<u64>, TrapKind> {
        match &self.state {
            InvocationState::ArgsBound => {}
            InvocationState::Returned(value) => return Ok(*value),
            InvocationState::Trapped(trap) => return Err(trap.clone()),
            _ => return Err(self.bad_transition("run")),
        }

        if let Err(trap) = link(self.program, self.table) {
            return Err(self.trap(trap));
        }

        let Some(mut vm) = self.machine.take() else {
            return Err(self.bad_transition("run"));
        };
        self.state = InvocationState::Running;

        let returns = match vm.entry() {
            Ok(entry) => entry.signature.returns(),
            Err(trap) => return Err(self.trap(trap)),
        };

        match vm.interpret() {
            Ok(r0) => {
                let value = returns.then_some(r0);
                info!(steps = vm.steps, ?value, "invocation returned");
                self.state = InvocationState::Returned(value);
                Ok(value)
            }
            Err(trap) => Err(self.trap(trap)),
        }
    }

    fn trap(&mut self, trap: TrapKind) -> TrapKind {
        warn!(%trap, "invocation trapped");
        self.state = InvocationState::Trapped(trap.clone());
        trap
    }

    fn bad_transition(&self, op: &str) -> TrapKind {
        TrapKind::Fault(RuntimeError::InvalidTransition(format!(
            "cannot {} in state {:?}",
            op, self.state
        )))
    }
}

/// Invoke the entry point of `program` with `args` against `table`.
pub fn invoke(program: &Program, args: &[u64], table: &HelperTable) -> Result<Option<u64>, TrapKind> {
    invoke_with(program, args, table, VmConfig::default())
}

pub fn invoke_with(
    program: &Program,
    args: &[u64],
    table: &HelperTable,
    config: VmConfig,
) -> Result<Option<u64>, TrapKind> {
    let mut invocation = Invocation::with_config(program, table, config);
    invocation.bind(args)?;
    invocation.run()
}
