//! Host routine catalog
//!
//! Named routines a host can bind to helper identifiers. Routines that
//! implement a well-known helper carry its canonical id.

pub mod core;

use crate::helper::HelperObj;
use crate::program::Signature;
use crate::specs::{ID_GET_PRANDOM_U32, ID_GET_SMP_PROCESSOR_ID, ID_KTIME_GET_NS};

pub type RoutineFn = fn(args: &[u64]) -> Result<u64, crate::error::RuntimeError>;

pub struct RoutineMeta {
    pub name: &'static str,
    pub signature: Signature,
    pub func: RoutineFn,
    /// Canonical helper id this routine implements, if any
    pub well_known: Option<u32>,
}

const fn routine_meta(
    name: &'static str,
    arity: u8,
    returns: bool,
    func: RoutineFn,
    well_known: Option<u32>,
) -> RoutineMeta {
    RoutineMeta {
        name,
        signature: Signature::new_unchecked(arity, returns),
        func,
        well_known,
    }
}

pub const ROUTINES: &[RoutineMeta] = &[
    routine_meta("get_prandom_u32", 0, true, self::core::get_prandom_u32, Some(ID_GET_PRANDOM_U32)),
    routine_meta("ktime_get_ns", 0, true, self::core::ktime_get_ns, Some(ID_KTIME_GET_NS)),
    routine_meta(
        "get_smp_processor_id",
        0,
        true,
        self::core::get_smp_processor_id,
        Some(ID_GET_SMP_PROCESSOR_ID),
    ),
    routine_meta("pack_args", 5, true, self::core::pack_args, None),
    routine_meta("increment", 1, true, self::core::increment, None),
    routine_meta("trace_value", 1, false, self::core::trace_value, None),
];

impl RoutineMeta {
    pub fn to_helper(&self) -> HelperObj {
        HelperObj::new(self.name, self.signature, self.func)
    }
}

/// Look up a catalog routine by name.
pub fn routine(name: &str) -> Option<HelperObj> {
    ROUTINES.iter().find(|r| r.name == name).map(RoutineMeta::to_helper)
}

/// Catalog routines paired with their canonical ids.
pub fn well_known_routines() -> impl Iterator<Item = (u32, HelperObj)> {
    ROUTINES
        .iter()
        .filter_map(|r| r.well_known.map(|id| (id, r.to_helper())))
}
