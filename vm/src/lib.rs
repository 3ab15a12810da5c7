pub mod error;
pub mod helper;
pub mod invoke;
pub mod link;
pub mod loader;
pub mod machine;
pub mod opcode;
pub mod program;
pub mod specs;
pub mod stdlib;
pub mod table;

pub use error::{ProgramError, RegistryError, RuntimeError, TrapKind};
pub use helper::{HelperFn, HelperObj};
pub use invoke::{invoke, invoke_with, Invocation, InvocationState};
pub use link::{link, LinkReport, ResolvedCall};
pub use loader::LoaderError;
pub use machine::{VmConfig, VM};
pub use opcode::Instruction;
pub use program::{EntryDescriptor, Function, HelperDecl, Program, Signature};
pub use table::{HelperRegistry, HelperTable, SharedHelperTable};
