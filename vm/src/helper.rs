use std::fmt;
use std::sync::Arc;

use crate::error::RuntimeError;
use crate::program::Signature;

// The unified signature for ALL helpers (well-known or ad hoc).
// args: exactly `signature.arity()` values taken from R1..R5.
// Return: the R0 value; ignored when the signature returns nothing.
// Helpers get no access to the machine, so they cannot re-enter the program.
pub type HelperFn = Arc<dyn Fn(&[u64]) -> Result<u64, RuntimeError> + Send + Sync>;

#[derive(Clone)]
pub struct HelperObj {
    pub name: String,
    pub signature: Signature,
    pub func: HelperFn,
}

impl HelperObj {
    pub fn new<F>(name: impl Into<String>, signature: Signature, func: F) -> Self
    where
        F: Fn(&[u64]) -> Result<u64, RuntimeError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            signature,
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for HelperObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperObj")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}
