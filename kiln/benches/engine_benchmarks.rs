//! Interpreter benchmarks

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use kiln::{Engine, Linker, Module, Store};

const FIB: &str = r#"(module
    (func $fib (export "fib") (param i32) (result i32)
      local.get 0
      i32.const 2
      i32.lt_u
      if (result i32)
        local.get 0
      else
        local.get 0
        i32.const 1
        i32.sub
        call $fib
        local.get 0
        i32.const 2
        i32.sub
        call $fib
        i32.add
      end)
    (func (export "sum") (param $n i32) (result i64)
      (local $acc i64)
      (block $done
        (loop $next
          local.get $n
          i32.eqz
          br_if $done
          local.get $acc
          local.get $n
          i64.extend_i32_u
          i64.add
          local.set $acc
          local.get $n
          i32.const 1
          i32.sub
          local.set $n
          br $next))
      local.get $acc))"#;

fn load() -> (Vec<u8>, Module) {
    let wasm = wat::parse_str(FIB).unwrap();
    let module = kiln::compile(&wasm).unwrap();
    (wasm, module)
}

fn benchmark_compile(c: &mut Criterion) {
    let (wasm, module) = load();
    let engine = Engine::default();
    let mut group = c.benchmark_group("module_loading");

    group.bench_function("compile", |b| b.iter(|| engine.compile(black_box(&wasm)).unwrap()));
    group.bench_function("instantiate", |b| {
        let linker = Linker::new();
        b.iter(|| {
            let mut store = Store::new(&engine, ());
            black_box(linker.instantiate(&mut store, &module).unwrap())
        });
    });

    group.finish();
}

fn benchmark_execution(c: &mut Criterion) {
    let (_, module) = load();
    let mut store = Store::new(&Engine::default(), ());
    let instance = kiln::instantiate(&mut store, &module, &Linker::new()).unwrap();
    let fib = instance.get_typed_func::<i32, i32>(&store, "fib").unwrap();
    let sum = instance.get_typed_func::<i32, i64>(&store, "sum").unwrap();
    let mut group = c.benchmark_group("execution");

    group.bench_function("fib_20", |b| b.iter(|| fib.call(&mut store, black_box(20)).unwrap()));
    group.bench_function("loop_100k", |b| b.iter(|| sum.call(&mut store, black_box(100_000)).unwrap()));

    group.finish();
}

criterion_group!(benches, benchmark_compile, benchmark_execution);
criterion_main!(benches);
