use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use vm::opcode::instruction::*;
use vm::{
    invoke, Function, HelperRegistry, HelperTable, Program, RegistryError, SharedHelperTable,
    Signature,
};

fn sig(arity: u8, returns: bool) -> Signature {
    Signature::new(arity, returns).unwrap()
}

fn calls_200() -> Program {
    Program::single(Function::new(
        "main",
        sig(1, true),
        vec![call(200), exit()],
    ))
    .unwrap()
}

#[test]
fn test_concurrent_invocations_share_program_and_table() {
    let program = calls_200();
    let mut table = HelperTable::new();
    table.register_routine(200, "increment").unwrap();

    thread::scope(|s| {
        let handles: Vec<_> = (0..8u64)
            .map(|t| {
                let program = &program;
                let table = &table;
                s.spawn(move || {
                    for i in 0..200u64 {
                        let x = t * 1000 + i;
                        assert_eq!(invoke(program, &[x], table), Ok(Some(x + 1)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    });
}

#[test]
fn test_snapshots_never_see_partial_updates() {
    let program = calls_200();
    let mut initial = HelperTable::new();
    initial
        .define_helper(200, "add_one", sig(1, true), |a| Ok(a[0] + 1))
        .unwrap();
    let shared = SharedHelperTable::new(initial);
    let done = AtomicBool::new(false);

    thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                while !done.load(Ordering::Relaxed) {
                    let table = shared.snapshot();
                    let result = invoke(&program, &[10], &table).unwrap();
                    // Every snapshot is one of the two complete bindings.
                    assert!(result == Some(11) || result == Some(12), "{:?}", result);
                }
            });
        }

        for round in 0..100 {
            shared
                .update(|t| {
                    let step = if round % 2 == 0 { 2 } else { 1 };
                    t.define_helper(200, "add", sig(1, true), move |a| Ok(a[0] + step))
                })
                .unwrap();
        }
        done.store(true, Ordering::Relaxed);
    });
}

#[test]
fn test_failed_update_publishes_nothing() {
    let shared = SharedHelperTable::new(HelperTable::with_defaults());
    let before = shared.snapshot().len();

    let result: Result<(), RegistryError> = shared.update(|t| {
        t.register_routine(300, "increment")?;
        t.register_routine(301, "missing")?;
        Ok(())
    });

    assert_eq!(result, Err(RegistryError::UnknownRoutine("missing".into())));
    assert_eq!(shared.snapshot().len(), before);
    assert!(!shared.snapshot().contains(300));
}
