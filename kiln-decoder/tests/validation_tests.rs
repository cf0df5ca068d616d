//! Decoding and validation of whole modules written in the text format

use kiln_decoder::{compile, decode_module, validate, DecodeLimits, Module};
use kiln_error::{codes, ErrorCategory, Result};
use kiln_foundation::{ExternKind, Features, ValueType};
use kiln_instructions::{BranchTarget, NumericOp, Op};

fn compile_wat(text: &str) -> Result<Module> {
    let bytes = wat::parse_str(text).expect("valid text format");
    compile(&bytes, &Features::default(), &DecodeLimits::default())
}

fn validation_code(text: &str) -> u16 {
    let err = compile_wat(text).expect_err("module should be rejected");
    assert_eq!(err.category, ErrorCategory::Validation, "{err}");
    err.code
}

#[test]
fn add_function_lowers_to_three_ops_and_return() {
    let module = compile_wat(
        r#"(module (func (export "add") (param i32 i32) (result i32)
            local.get 0 local.get 1 i32.add))"#,
    )
    .unwrap();

    assert_eq!(module.exports()[0].kind, ExternKind::Func);
    let ty = module.func_type(0).unwrap();
    assert_eq!(ty.params(), &[ValueType::I32, ValueType::I32]);

    let body = &module.bodies()[0];
    assert_eq!(
        &*body.ops,
        &[Op::LocalGet(0), Op::LocalGet(1), Op::Numeric(NumericOp::I32Add), Op::Return]
    );
    assert_eq!(body.max_stack_height, 2);
    assert_eq!(body.ops.len(), body.offsets.len());
}

#[test]
fn loop_back_edge_targets_loop_start() {
    let module = compile_wat(
        r#"(module (func (param i32) (result i32)
            (loop $l
              local.get 0
              i32.const 1
              i32.sub
              local.tee 0
              br_if $l)
            local.get 0))"#,
    )
    .unwrap();
    let ops = &module.bodies()[0].ops;
    let branch = ops.iter().position(|op| matches!(op, Op::BrIf(_))).expect("loop has a br_if");
    assert_eq!(branch, 4);
    assert_eq!(ops[branch], Op::BrIf(BranchTarget { pc: 0, keep: 0, drop: 0 }));
}

#[test]
fn forward_branch_keeps_block_result_and_drops_rest() {
    let module = compile_wat(
        r#"(module (func (result i32)
            (block (result i32)
              i32.const 7
              i32.const 8
              i32.const 9
              br 0)))"#,
    )
    .unwrap();
    let ops = &module.bodies()[0].ops;
    // three constants, the branch, then the function's return
    assert_eq!(ops[3], Op::Br(BranchTarget { pc: 4, keep: 1, drop: 2 }));
    assert_eq!(ops[4], Op::Return);
}

#[test]
fn if_else_lowering_patches_both_jumps() {
    let module = compile_wat(
        r#"(module (func (param i32) (result i32)
            (if (result i32) (local.get 0)
              (then i32.const 1)
              (else i32.const 2))))"#,
    )
    .unwrap();
    let ops = &module.bodies()[0].ops;
    assert_eq!(ops[1], Op::BrUnless(4));
    assert_eq!(ops[3], Op::Jump(5));
    assert_eq!(ops[5], Op::Return);
}

#[test]
fn operand_type_mismatch_reports_function_and_offset() {
    let text = r#"(module
        (func)
        (func (result i32) i32.const 1 f64.const 2 i32.add))"#;
    let err = compile_wat(text).unwrap_err();
    assert_eq!(err.category, ErrorCategory::Validation);
    assert_eq!(err.code, codes::TYPE_MISMATCH);
    assert_eq!(err.func_index(), Some(1));
    let bytes = wat::parse_str(text).unwrap();
    let offset = err.offset().unwrap();
    assert_eq!(bytes[offset], 0x6A, "offset should point at i32.add");
}

#[test]
fn invalid_modules_are_rejected() {
    assert_eq!(validation_code("(module (func (result i32)))"), codes::TYPE_MISMATCH);
    assert_eq!(validation_code("(module (func br 1))"), codes::INVALID_BRANCH_TARGET);
    assert_eq!(validation_code("(module (func local.get 0 drop))"), codes::UNKNOWN_LOCAL);
    assert_eq!(validation_code("(module (func call 5))"), codes::UNKNOWN_FUNCTION);
    assert_eq!(
        validation_code("(module (global i32 (i32.const 0)) (func i32.const 1 global.set 0))"),
        codes::IMMUTABLE_GLOBAL
    );
    assert_eq!(
        validation_code("(module (memory 1) (func i32.const 0 i32.load align=8 drop))"),
        codes::INVALID_ALIGNMENT
    );
    assert_eq!(validation_code("(module (func i32.const 0 i32.load drop))"), codes::UNKNOWN_MEMORY);
    assert_eq!(
        validation_code(r#"(module (func (export "a")) (func (export "a")))"#),
        codes::DUPLICATE_EXPORT
    );
    assert_eq!(validation_code("(module (func $s (param i32)) (start $s))"), codes::INVALID_START);
    assert_eq!(validation_code("(module (memory 2 1))"), codes::INVALID_LIMITS);
    assert_eq!(validation_code("(module (memory 65537))"), codes::INVALID_LIMITS);
    assert_eq!(validation_code("(module (func ref.func 0 drop))"), codes::UNDECLARED_FUNC_REF);
    assert_eq!(
        validation_code(
            r#"(module (memory 1) (data "x") (func i32.const 0 i32.const 0 i32.const 1 memory.init 1))"#
        ),
        codes::UNKNOWN_DATA
    );
}

#[test]
fn unreachable_code_is_type_permissive() {
    compile_wat("(module (func (result i32) unreachable i32.add))").unwrap();
    compile_wat("(module (func (result i64) (block br 0) i64.const 0))").unwrap();
    compile_wat("(module (func (result f32) return f32.const 0 i32.eqz drop))").unwrap_err();
}

#[test]
fn multi_value_blocks() {
    compile_wat(
        r#"(module (func (result i32 i64)
            (block (result i32 i64) i32.const 1 i64.const 2)))"#,
    )
    .unwrap();

    let bytes = wat::parse_str("(module (func (result i32 i32) i32.const 1 i32.const 2))").unwrap();
    let features = Features { multi_value: false, ..Features::default() };
    let decoded = decode_module(&bytes, &features, &DecodeLimits::default()).unwrap();
    assert!(validate(decoded, &features).is_err());
}

#[test]
fn ref_func_declared_by_element_segment() {
    compile_wat(
        r#"(module
            (table 1 funcref)
            (func $f)
            (elem declare func $f)
            (func (result funcref) ref.func $f))"#,
    )
    .unwrap();
}

#[test]
fn names_are_available_for_traces() {
    let module = compile_wat(r#"(module $m (func $inner) (func $outer call $inner))"#).unwrap();
    assert_eq!(module.name(), Some("m"));
    assert_eq!(module.func_name(0), Some("inner"));
    assert_eq!(module.func_name(1), Some("outer"));
}

#[test]
fn truncated_modules_fail_with_parse_errors() {
    let bytes = wat::parse_str(
        r#"(module
            (memory 1)
            (global (mut i32) (i32.const 3))
            (func (export "f") (param i32) (result i32) local.get 0 global.get 0 i32.add)
            (data (i32.const 0) "hi"))"#,
    )
    .unwrap();
    assert!(compile(&bytes, &Features::default(), &DecodeLimits::default()).is_ok());
    let mut rejected = 0;
    for len in 0..bytes.len() {
        // Prefixes ending on a section boundary before the function section are
        // themselves well-formed modules.
        if let Err(err) = compile(&bytes[..len], &Features::default(), &DecodeLimits::default()) {
            assert_eq!(err.category, ErrorCategory::Parse, "prefix of {len} bytes: {err}");
            rejected += 1;
        } else {
            assert!(len >= 8, "header prefix of {len} bytes accepted");
        }
    }
    assert!(rejected > bytes.len() / 2);
}
