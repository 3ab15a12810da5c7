use vm::loader::{
    load_program, load_raw, write_program, LoaderError, MAGIC, MAX_FUNCTIONS, MAX_IMPORTS,
    MAX_NAME_LEN,
};
use vm::opcode::instruction::*;
use vm::{invoke, Function, HelperDecl, HelperRegistry, HelperTable, Program, Signature};

fn sig(arity: u8, returns: bool) -> Signature {
    Signature::new(arity, returns).unwrap()
}

fn sample_program() -> Program {
    Program::new(
        vec![
            Function::new(
                "f",
                sig(2, true),
                vec![
                    mov64_reg(6, 1),
                    add64_reg(6, 2),
                    call(7),
                    add64_reg(6, 0),
                    mov64_imm(1, 42),
                    call(200),
                    add64_reg(0, 6),
                    exit(),
                ],
            ),
            Function::new("unused", sig(0, false), vec![exit()]),
        ],
        vec![
            HelperDecl::well_known("bpf_get_prandom_u32").unwrap(),
            HelperDecl::new(200, sig(1, true)),
        ],
    )
    .unwrap()
}

#[test]
fn test_container_preserves_program() {
    let program = sample_program();
    let mut bytes = Vec::new();
    write_program(&program, &mut bytes).unwrap();
    assert_eq!(&bytes[..4], MAGIC);

    let loaded = load_program(&mut bytes.as_slice()).unwrap();
    assert_eq!(loaded, program);

    let mut table = HelperTable::new();
    table.define_helper(7, "four", sig(0, true), |_| Ok(4)).unwrap();
    table
        .define_helper(200, "foo", sig(1, true), |a| Ok(a[0] + 1))
        .unwrap();
    assert_eq!(invoke(&loaded, &[3, 5], &table), Ok(Some(55)));
}

#[test]
fn test_function_count_limit() {
    let mut bytes = MAGIC.to_vec();
    bytes.extend_from_slice(&((MAX_FUNCTIONS as u16) + 1).to_le_bytes());
    let err = load_program(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(err, LoaderError::Security(_)), "{:?}", err);
}

#[test]
fn test_slot_count_limit() {
    let mut bytes = MAGIC.to_vec();
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.push(b'f');
    bytes.extend_from_slice(&[0, 1]);
    bytes.extend_from_slice(&u32::MAX.to_le_bytes());
    let err = load_program(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(err, LoaderError::Security(_)), "{:?}", err);
}

#[test]
fn test_invalid_arity_in_container() {
    let mut bytes = MAGIC.to_vec();
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.push(b'f');
    bytes.extend_from_slice(&[6, 1]);
    let err = load_program(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(err, LoaderError::Program(_)), "{:?}", err);
}

#[test]
fn test_conflicting_imports_in_container() {
    let mut bytes = MAGIC.to_vec();
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    for arity in [1u8, 2] {
        bytes.extend_from_slice(&200u32.to_le_bytes());
        bytes.extend_from_slice(&[arity, 1]);
        bytes.extend_from_slice(&0u16.to_le_bytes());
    }
    let err = load_program(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(err, LoaderError::Program(_)), "{:?}", err);
}

fn one_function_header(name: &[u8]) -> Vec<u8> {
    let mut bytes = MAGIC.to_vec();
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
    bytes.extend_from_slice(name);
    bytes
}

#[test]
fn test_name_length_limit() {
    let mut bytes = MAGIC.to_vec();
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&((MAX_NAME_LEN as u16) + 44).to_le_bytes());
    bytes.extend(std::iter::repeat(b'a').take(MAX_NAME_LEN + 44));
    let err = load_program(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(err, LoaderError::Security(_)), "{:?}", err);
}

#[test]
fn test_import_count_limit() {
    let mut bytes = MAGIC.to_vec();
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&((MAX_IMPORTS as u16) + 1).to_le_bytes());
    let err = load_program(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(err, LoaderError::Security(_)), "{:?}", err);
}

#[test]
fn test_name_must_be_utf8() {
    let bytes = one_function_header(&[0xff, 0xfe]);
    let err = load_program(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(err, LoaderError::Format(_)), "{:?}", err);
}

#[test]
fn test_returns_byte_is_zero_or_one() {
    let mut bytes = one_function_header(b"f");
    bytes.extend_from_slice(&[1, 2]);
    let err = load_program(&mut bytes.as_slice()).unwrap_err();
    assert!(matches!(err, LoaderError::Format(_)), "{:?}", err);
    assert!(err.to_string().contains("got 2"), "{err}");
}

#[test]
fn test_write_too_many_functions_writes_nothing() {
    let functions = (0..=MAX_FUNCTIONS)
        .map(|i| {
            let code = vec![mov64_imm(0, i as i32), exit()];
            Function::new(format!("f{i}"), sig(0, true), code)
        })
        .collect();
    let program = Program::new(functions, vec![]).unwrap();

    // Still a valid in-memory program.
    assert_eq!(invoke(&program, &[], &HelperTable::new()), Ok(Some(0)));

    let mut bytes = Vec::new();
    let err = write_program(&program, &mut bytes).unwrap_err();
    assert!(matches!(err, LoaderError::Security(_)), "{:?}", err);
    assert!(bytes.is_empty());
}

#[test]
fn test_write_long_import_name_writes_nothing() {
    let program = Program::new(
        vec![Function::new("f", sig(0, true), vec![exit()])],
        vec![HelperDecl::named(200, "x".repeat(MAX_NAME_LEN + 1), sig(1, true))],
    )
    .unwrap();

    let mut bytes = Vec::new();
    let err = write_program(&program, &mut bytes).unwrap_err();
    assert!(matches!(err, LoaderError::Security(_)), "{:?}", err);
    assert!(bytes.is_empty());
}

#[test]
fn test_raw_binary_runs() {
    let words = [mov64_reg(0, 1), add64_imm(0, 1), exit()];
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
    let program = load_raw(&bytes, sig(1, true)).unwrap();
    assert_eq!(invoke(&program, &[41], &HelperTable::new()), Ok(Some(42)));
}

#[test]
fn test_raw_binary_size_limit() {
    let bytes = vec![0u8; 8 * 4097];
    let err = load_raw(&bytes, sig(0, true)).unwrap_err();
    assert!(matches!(err, LoaderError::Security(_)), "{:?}", err);
}
