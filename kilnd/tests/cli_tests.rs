//! Runs the `kilnd` binary against small modules

use std::{fs, path::PathBuf, process::Command};

use tempfile::TempDir;

const MODULE: &str = r#"(module $demo
    (import "env" "log" (func $log (param i32 i32 i32)))
    (memory 1)
    (data (i32.const 0) "starting")
    (func (export "add") (param i32 i32) (result i32)
      local.get 0
      local.get 1
      i32.add)
    (func (export "pair") (param i64 f64) (result f64 i64)
      local.get 1
      local.get 0)
    (func $fault (export "fault")
      unreachable)
    (func (export "spin")
      (loop $forever
        br $forever))
    (func $deep (export "deep") (param i32) (result i32)
      local.get 0
      i32.const 1
      i32.add
      call $deep)
    (func (export "hello")
      i32.const 2
      i32.const 0
      i32.const 8
      call $log))"#;

struct Fixture {
    dir:  TempDir,
    path: PathBuf,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo.wat");
    fs::write(&path, MODULE).unwrap();
    Fixture { dir, path }
}

fn kilnd(fixture: &Fixture, args: &[&str]) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_kilnd"))
        .arg(&fixture.path)
        .args(args)
        .env("RUST_LOG_FORMAT", "compact")
        .env("RUST_LOG", "warn")
        .output()
        .unwrap();
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

#[test]
fn invoke_prints_results_one_per_line() {
    let fixture = fixture();
    let (ok, stdout, _) = kilnd(&fixture, &["--invoke", "add", "2", "-5"]);
    assert!(ok);
    assert_eq!(stdout, "-3\n");

    let (ok, stdout, _) = kilnd(&fixture, &["--invoke", "pair", "7", "0.5"]);
    assert!(ok);
    assert_eq!(stdout, "0.5\n7\n");
}

#[test]
fn without_invoke_lists_exported_functions() {
    let fixture = fixture();
    let (ok, stdout, _) = kilnd(&fixture, &[]);
    assert!(ok);
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines.len(), 6);
    assert!(lines[0].starts_with("add: "));
    assert!(lines.iter().any(|line| line.starts_with("hello: ")));
}

#[test]
fn trap_reports_cause_and_trace_and_fails() {
    let fixture = fixture();
    let (ok, stdout, stderr) = kilnd(&fixture, &["--invoke", "fault"]);
    assert!(!ok);
    assert!(stdout.is_empty());
    assert!(stderr.contains("unreachable executed"), "{stderr}");
    assert!(stderr.contains("wasm backtrace"), "{stderr}");
    assert!(stderr.contains("<fault>"), "{stderr}");
}

#[test]
fn resource_limits_stop_runaway_code() {
    let fixture = fixture();
    let (ok, _, stderr) = kilnd(&fixture, &["--invoke", "spin", "--fuel", "1000"]);
    assert!(!ok);
    assert!(stderr.contains("fuel"), "{stderr}");

    let (ok, _, stderr) = kilnd(&fixture, &["--invoke", "spin", "--timeout-ms", "50"]);
    assert!(!ok);
    assert!(stderr.contains("interrupt"), "{stderr}");

    let (ok, _, stderr) = kilnd(&fixture, &["--invoke", "deep", "0", "--max-call-depth", "100"]);
    assert!(!ok);
    assert!(stderr.contains("call stack exhausted"), "{stderr}");
}

#[test]
fn config_file_sets_limits() {
    let fixture = fixture();
    let config = fixture.dir.path().join("kilnd.toml");
    fs::write(&config, "fuel = 500\n").unwrap();
    let config = config.to_str().unwrap();

    let (ok, _, stderr) = kilnd(&fixture, &["--invoke", "spin", "--config", config]);
    assert!(!ok);
    assert!(stderr.contains("fuel"), "{stderr}");

    let (ok, stdout, stderr) = kilnd(&fixture, &["--invoke", "add", "1", "1", "--config", config, "--stats"]);
    assert!(ok);
    assert_eq!(stdout, "2\n");
    assert!(stderr.contains("fuel consumed"), "{stderr}");
}

#[test]
fn bad_input_fails() {
    let fixture = fixture();
    let (ok, _, _) = kilnd(&fixture, &["--invoke", "add", "1"]);
    assert!(!ok);
    let (ok, _, _) = kilnd(&fixture, &["--invoke", "add", "x", "1"]);
    assert!(!ok);
    let (ok, _, stderr) = kilnd(&fixture, &["--invoke", "missing"]);
    assert!(!ok);
    assert!(stderr.contains("missing"), "{stderr}");

    let broken = fixture.dir.path().join("broken.wasm");
    fs::write(&broken, b"\0asm\x02\0\0\0").unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_kilnd")).arg(&broken).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn guest_logging_is_wired_up() {
    let fixture = fixture();
    let (ok, stdout, _) = kilnd(&fixture, &["--invoke", "hello"]);
    assert!(ok);
    assert!(stdout.is_empty());
}
