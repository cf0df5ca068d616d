//! Guests logging through `env.log`

use std::sync::{Arc, Mutex};

use kiln_logging::{LogHandler, LogLevel, LogOperation, LoggingExt};
use kiln_runtime::{Engine, Instance, Linker, Store, TrapCode};

const GUEST: &str = r#"(module $greeter
    (import "env" "log" (func $log (param i32 i32 i32)))
    (memory (export "memory") 1)
    (data (i32.const 16) "hello from wasm")
    (data (i32.const 64) "\ff\fe")
    (func (export "greet")
      i32.const 2
      i32.const 16
      i32.const 15
      call $log)
    (func (export "log_raw") (param i32 i32 i32)
      local.get 0
      local.get 1
      local.get 2
      call $log))"#;

fn setup(handler: LogHandler) -> (Store, Instance) {
    let engine = Engine::default();
    let module = engine.compile(&wat::parse_str(GUEST).unwrap()).unwrap();
    let mut linker = Linker::new();
    linker.define_log_handler(handler).unwrap();
    let mut store = Store::new(&engine, ());
    let instance = linker.instantiate(&mut store, &module).unwrap();
    (store, instance)
}

fn recording() -> (Arc<Mutex<Vec<LogOperation>>>, LogHandler) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler: LogHandler = Arc::new(move |op: &LogOperation| sink.lock().unwrap().push(op.clone()));
    (seen, handler)
}

#[test]
fn guest_messages_reach_the_handler() {
    let (seen, handler) = recording();
    let (mut store, instance) = setup(handler);
    let greet = instance.get_typed_func::<(), ()>(&store, "greet").unwrap();
    greet.call(&mut store, ()).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0], LogOperation::with_module(LogLevel::Info, "hello from wasm", "greeter"));
}

#[test]
fn bad_log_calls_trap_with_host_error() {
    let (seen, handler) = recording();
    let (mut store, instance) = setup(handler);
    let log_raw = instance.get_typed_func::<(i32, i32, i32), ()>(&store, "log_raw").unwrap();

    for (args, code) in [
        ((9, 16, 5), TrapCode::HostError),
        ((1, 64, 2), TrapCode::HostError),
        ((1, 65530, 100), TrapCode::OutOfBoundsMemoryAccess),
    ] {
        let err = log_raw.call(&mut store, args).unwrap_err();
        assert_eq!(err.trap_code(), Some(code), "{args:?}");
    }
    log_raw.call(&mut store, (5, 16, 5)).unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].level, LogLevel::Critical);
    assert_eq!(seen[0].message, "hello");
}

#[test]
fn default_handler_forwards_to_log() {
    let engine = Engine::default();
    let module = engine.compile(&wat::parse_str(GUEST).unwrap()).unwrap();
    let mut linker = Linker::new();
    linker.define_logging().unwrap();
    let mut store = Store::new(&engine, ());
    let instance = linker.instantiate(&mut store, &module).unwrap();
    let greet = instance.get_func(&store, "greet").unwrap();
    assert!(greet.call(&mut store, &[]).unwrap().is_empty());
}
