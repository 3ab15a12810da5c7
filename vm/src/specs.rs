use crate::program::Signature;

pub struct HelperMeta {
    pub id: u32,
    pub name: &'static str,
    pub signature: Signature,
}

const fn meta(id: u32, name: &'static str, arity: u8, returns: bool) -> HelperMeta {
    HelperMeta {
        id,
        name,
        signature: Signature::new_unchecked(arity, returns),
    }
}

/// Identifier 0 never names a helper.
pub const HELPER_UNSPEC: u32 = 0;

// THE SINGLE SOURCE OF TRUTH
// Canonical helper identifiers shared by front ends and hosts.
// Numbers and names follow the kernel's `bpf_func_id` enumeration.
pub const WELL_KNOWN_HELPERS: &[HelperMeta] = &[
    meta(1, "bpf_map_lookup_elem", 2, true),
    meta(2, "bpf_map_update_elem", 4, true),
    meta(3, "bpf_map_delete_elem", 2, true),
    meta(4, "bpf_probe_read", 3, true),
    meta(5, "bpf_ktime_get_ns", 0, true),
    meta(6, "bpf_trace_printk", 5, true),
    meta(7, "bpf_get_prandom_u32", 0, true),
    meta(8, "bpf_get_smp_processor_id", 0, true),
];

// Expected helper count. Update this when adding or removing entries.
// Compile-time assertion prevents silent drift of the registry.
pub const WELL_KNOWN_COUNT: usize = 8;
const _: () = assert!(
    WELL_KNOWN_HELPERS.len() == WELL_KNOWN_COUNT,
    "WELL_KNOWN_HELPERS length changed, update WELL_KNOWN_COUNT"
);

pub const ID_KTIME_GET_NS: u32 = 5;
pub const ID_GET_PRANDOM_U32: u32 = 7;
pub const ID_GET_SMP_PROCESSOR_ID: u32 = 8;

pub fn well_known_by_id(id: u32) -> Option<&'static HelperMeta> {
    WELL_KNOWN_HELPERS.iter().find(|m| m.id == id)
}

pub fn well_known_by_name(name: &str) -> Option<&'static HelperMeta> {
    WELL_KNOWN_HELPERS.iter().find(|m| m.name == name)
}

// --- EXECUTION LIMITS ---
/// Argument registers R1..R5
pub const MAX_ARGS: usize = 5;
/// R0..R10
pub const NUM_REGS: usize = 11;
/// Frame pointer register, read-only
pub const REG_FP: u8 = 10;
/// Instruction slots per function
pub const MAX_INSNS: usize = 4096;
/// Context memory (bytes)
pub const MAX_DATA_MEM: usize = 2048;
/// Stack size (bytes)
pub const MAX_STACK: usize = 512;
/// Guest address of the first context byte
pub const DATA_START: u64 = 0x1000_0000;
/// Guest address of the lowest stack byte; R10 starts at `STACK_START + MAX_STACK`
pub const STACK_START: u64 = 0x2000_0000;
pub const DEFAULT_MAX_STEPS: u64 = 1_000_000;
