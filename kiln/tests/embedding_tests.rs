//! End-to-end behavior through the embedding API

use kiln::prelude::*;
use proptest::prelude::*;

fn wasm(text: &str) -> Vec<u8> {
    wat::parse_str(text).unwrap()
}

fn run(text: &str) -> (Store, Instance) {
    let module = kiln::compile(&wasm(text)).unwrap();
    let mut store = Store::new(&Engine::default(), ());
    let instance = kiln::instantiate(&mut store, &module, &Linker::new()).unwrap();
    (store, instance)
}

#[test]
fn add_returns_sum() {
    let (mut store, instance) = run(r#"(module
        (func (export "add") (param i32 i32) (result i32)
          local.get 0
          local.get 1
          i32.add))"#);
    let add = instance.get_func(&store, "add").unwrap();
    assert_eq!(add.call(&mut store, &[Value::I32(2), Value::I32(3)]).unwrap(), vec![Value::I32(5)]);
}

#[test]
fn malformed_binaries_fail_to_decode() {
    let cases: [&[u8]; 4] = [
        b"",
        b"\0asn\x01\0\0\0",
        b"\0asm\x01\0\0",
        // function section before type section
        b"\0asm\x01\0\0\0\x03\x01\x00\x01\x01\x00",
    ];
    for bytes in cases {
        let err = kiln::compile(bytes).unwrap_err();
        assert_eq!(err.category, ErrorCategory::Parse, "{bytes:?}: {err}");
    }
}

#[test]
fn ill_typed_code_fails_validation() {
    let bytes = wasm(r#"(module (func (result i32) i64.const 1))"#);
    let err = kiln::compile(&bytes).unwrap_err();
    assert_eq!(err.category, ErrorCategory::Validation);
    assert_eq!(err.func_index(), Some(0));
}

#[test]
fn memory_grows_into_previously_trapping_range() {
    let (mut store, instance) = run(r#"(module (memory (export "memory") 1))"#);
    let memory = instance.get_memory(&store, "memory").unwrap();
    let mut byte = [0u8; 1];

    let err = memory.read(&store, 65536, &mut byte).unwrap_err();
    assert_eq!(err.trap_code(), Some(TrapCode::OutOfBoundsMemoryAccess));
    assert!(memory.write(&mut store, 65535, &[1, 2]).is_err());
    assert_eq!(memory.data(&store).unwrap()[65535], 0);

    assert_eq!(memory.grow(&mut store, 1).unwrap(), 1);
    memory.read(&store, 65536, &mut byte).unwrap();
    assert_eq!(memory.size(&store).unwrap(), 2);
    assert_eq!(memory.data_size(&store).unwrap(), 2 * kiln::PAGE_SIZE);
}

#[test]
fn integer_division_traps() {
    let (mut store, instance) = run(r#"(module
        (func (export "div") (param i32 i32) (result i32)
          local.get 0
          local.get 1
          i32.div_s))"#);
    let div = instance.get_typed_func::<(i32, i32), i32>(&store, "div").unwrap();
    assert_eq!(div.call(&mut store, (7, -2)).unwrap(), -3);

    let err = div.call(&mut store, (1, 0)).unwrap_err();
    assert_eq!(err.trap_code(), Some(TrapCode::IntegerDivideByZero));
    let err = div.call(&mut store, (i32::MIN, -1)).unwrap_err();
    assert_eq!(err.trap_code(), Some(TrapCode::IntegerOverflow));

    let trace = err.trap().unwrap().trace();
    assert_eq!(trace.len(), 1);
    assert_eq!(trace[0].func_index, 0);
    assert!(trace[0].instr_offset > 8);
}

#[test]
fn traps_keep_committed_memory_writes() {
    let (mut store, instance) = run(r#"(module
        (memory (export "memory") 1)
        (func (export "write_then_trap")
          i32.const 0
          i32.const 7
          i32.store8
          unreachable))"#);
    let func = instance.get_func(&store, "write_then_trap").unwrap();
    let err = func.call(&mut store, &[]).unwrap_err();
    assert_eq!(err.trap_code(), Some(TrapCode::Unreachable));

    let memory = instance.get_memory(&store, "memory").unwrap();
    assert_eq!(memory.data(&store).unwrap()[0], 7);
}

#[cfg(feature = "logging")]
#[test]
fn logging_import_is_available() {
    let module = kiln::compile(&wasm(r#"(module
        (import "env" "log" (func $log (param i32 i32 i32)))
        (memory 1)
        (data (i32.const 0) "hi")
        (func (export "hello")
          i32.const 2
          i32.const 0
          i32.const 2
          call $log))"#))
    .unwrap();
    let mut linker = Linker::new();
    linker.define_logging().unwrap();
    let mut store = Store::new(&Engine::default(), ());
    let instance = kiln::instantiate(&mut store, &module, &linker).unwrap();
    let hello = instance.get_typed_func::<(), ()>(&store, "hello").unwrap();
    hello.call(&mut store, ()).unwrap();
}

const COLLATZ: &str = r#"(module
    (func (export "steps") (param $n i64) (result i32)
      (local $count i32)
      (block $done
        (loop $next
          local.get $n
          i64.const 1
          i64.le_u
          br_if $done
          local.get $count
          i32.const 1
          i32.add
          local.set $count
          local.get $n
          i64.const 1
          i64.and
          i64.eqz
          if (result i64)
            local.get $n
            i64.const 1
            i64.shr_u
          else
            local.get $n
            i64.const 3
            i64.mul
            i64.const 1
            i64.add
          end
          local.set $n
          br $next))
      local.get $count))"#;

fn collatz_steps(mut n: u64) -> i32 {
    let mut count = 0;
    while n > 1 {
        count += 1;
        n = if n % 2 == 0 { n / 2 } else { n.wrapping_mul(3).wrapping_add(1) };
    }
    count
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn fresh_instances_agree(n in 1u64..100_000) {
        let first = {
            let (mut store, instance) = run(COLLATZ);
            instance.get_typed_func::<i64, i32>(&store, "steps").unwrap().call(&mut store, n as i64).unwrap()
        };
        let (mut store, instance) = run(COLLATZ);
        let second = instance.get_typed_func::<i64, i32>(&store, "steps").unwrap().call(&mut store, n as i64).unwrap();
        prop_assert_eq!(first, second);
        prop_assert_eq!(first, collatz_steps(n));
    }
}
