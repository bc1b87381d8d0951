// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Single-process execution tests.
//!
//! Programs are assembled with the builder, loaded into a kernel and
//! stepped deterministically on the test thread; only timer waits make
//! the harness sleep. Multi-process behaviour is covered by the
//! scheduler tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{Process, ProcessState, StepResult, Termination};
use crate::bytecode::builder::{ProgramBuilder, Reg};
use crate::bytecode::image::ImageKind;
use crate::bytecode::op;
use crate::kernel::{Config, Kernel};
use viua_core::{Pid, RegisterSetId, Value};

/// Load `main/0` from the builder and run it to termination.
///
/// Returns the termination together with the deepest call stack
/// observed.
fn run_main(builder: &ProgramBuilder) -> (Termination, usize) {
    let mut kernel = Kernel::new(Config::default());
    kernel
        .load(&builder.to_bytes(ImageKind::Executable))
        .expect("image loads");
    let entry = kernel.function_entry("main/0").expect("main/0 exists");

    let mut frame = super::Frame::new(0, 16);
    frame.function_name = "main/0".to_owned();
    let mut process = Process::new(Pid::from_raw(0), frame, entry, false, false);

    let mut max_depth = 0;
    loop {
        max_depth = max_depth.max(process.stack_depth());
        match process.step(&kernel) {
            StepResult::Continue => {}
            StepResult::Yielded => match process.state() {
                ProcessState::AwaitingMessage {
                    deadline: Some(deadline),
                }
                | ProcessState::Joining {
                    deadline: Some(deadline),
                    ..
                } => {
                    let now = std::time::Instant::now();
                    if *deadline > now {
                        std::thread::sleep(*deadline - now);
                    }
                }
                other => panic!("single-process harness deadlocked in {other:?}"),
            },
            StepResult::Terminated => return (process.into_termination(), max_depth),
            StepResult::Halt => panic!("unexpected halt"),
        }
    }
}

fn returned_int(termination: &Termination) -> i64 {
    match termination {
        Termination::Returned(Some(value)) => match &*value.borrow() {
            Value::Integer(n) => *n,
            other => panic!("expected Integer result, got {other:?}"),
        },
        other => panic!("expected a return value, got {other:?}"),
    }
}

fn returned_text(termination: &Termination) -> String {
    match termination {
        Termination::Returned(Some(value)) => value.borrow().to_text(),
        other => panic!("expected a return value, got {other:?}"),
    }
}

#[test]
fn returns_value_from_local_register_zero() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(0)).int(42);
    b.op(op::RETURN);

    let (termination, depth) = run_main(&b);
    assert_eq!(returned_int(&termination), 42);
    assert_eq!(depth, 1);
}

#[test]
fn returns_zero_register_unset() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert!(matches!(termination, Termination::Returned(None)));
}

#[test]
fn arithmetic_with_promotion() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(1)).int(40);
    b.op(op::ISTORE).reg(Reg::local(2)).int(2);
    b.op(op::ADD)
        .reg(Reg::local(0))
        .reg(Reg::local(1))
        .reg(Reg::local(2));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 42);
}

#[test]
fn calls_transfer_arguments_and_return_values() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(1)).int(20);
    b.op(op::FRAME).uint(1).uint(16);
    b.op(op::PARAM).uint(0).reg(Reg::local(1));
    b.op(op::CALL).reg(Reg::local(2)).atom("double/1");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(2));
    b.op(op::RETURN);

    b.begin_function("double/1");
    b.op(op::ARG).reg(Reg::local(1)).uint(0);
    b.op(op::ADD)
        .reg(Reg::local(0))
        .reg(Reg::local(1))
        .reg(Reg::local(1));
    b.op(op::RETURN);

    let (termination, depth) = run_main(&b);
    assert_eq!(returned_int(&termination), 40);
    assert_eq!(depth, 2);
}

#[test]
fn argc_reports_supplied_arguments() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(1)).int(1);
    b.op(op::FRAME).uint(3).uint(16);
    b.op(op::PARAM).uint(0).reg(Reg::local(1));
    b.op(op::PARAM).uint(1).reg(Reg::local(1));
    b.op(op::PARAM).uint(2).reg(Reg::local(1));
    b.op(op::CALL).reg(Reg::local(2)).atom("count/3");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(2));
    b.op(op::RETURN);

    b.begin_function("count/3");
    b.op(op::ARGC).reg(Reg::local(0));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 3);
}

#[test]
fn pass_by_move_empties_the_source_register() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(1)).int(9);
    b.op(op::FRAME).uint(1).uint(16);
    b.op(op::PAMV).uint(0).reg(Reg::local(1));
    b.op(op::CALL).void().atom("sink/1");
    b.op(op::ISNULL).reg(Reg::local(2)).reg(Reg::local(1));
    // Boolean -> Integer via numeric widening.
    b.op(op::ISTORE).reg(Reg::local(3)).int(0);
    b.op(op::ADD)
        .reg(Reg::local(0))
        .reg(Reg::local(2))
        .reg(Reg::local(3));
    b.op(op::RETURN);

    b.begin_function("sink/1");
    b.op(op::ARG).void().uint(0);
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 1);
}

#[test]
fn tail_calls_keep_stack_depth_bounded() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(1)).int(100);
    b.op(op::FRAME).uint(1).uint(16);
    b.op(op::PAMV).uint(0).reg(Reg::local(1));
    b.op(op::CALL).reg(Reg::local(2)).atom("countdown/1");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(2));
    b.op(op::RETURN);

    b.begin_function("countdown/1");
    b.op(op::ARG).reg(Reg::local(1)).uint(0);
    b.op(op::IZERO).reg(Reg::local(2));
    b.op(op::EQ)
        .reg(Reg::local(3))
        .reg(Reg::local(1))
        .reg(Reg::local(2));
    b.op(op::IF).reg(Reg::local(3));
    let done = b.address_placeholder();
    let again = b.address_placeholder();

    let again_at = b.here();
    b.patch_address(again, again_at);
    b.op(op::IDEC).reg(Reg::local(1));
    b.op(op::FRAME).uint(1).uint(16);
    b.op(op::PAMV).uint(0).reg(Reg::local(1));
    b.op(op::TAILCALL).atom("countdown/1");

    let done_at = b.here();
    b.patch_address(done, done_at);
    b.op(op::ISTORE).reg(Reg::local(0)).int(77);
    b.op(op::RETURN);

    let (termination, depth) = run_main(&b);
    assert_eq!(returned_int(&termination), 77);
    // 100 tail calls, but never deeper than main plus one callee.
    assert_eq!(depth, 2);
}

#[test]
fn vector_pack_pop_len() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(5)).int(1);
    b.op(op::ISTORE).reg(Reg::local(6)).int(2);
    b.op(op::ISTORE).reg(Reg::local(7)).int(3);
    b.op(op::VEC).reg(Reg::local(4)).reg(Reg::local(5)).uint(3);
    // Pop index 0 -> 1, then length -> 2; result 1 * 10 + 2.
    b.op(op::IZERO).reg(Reg::local(9));
    b.op(op::VPOP)
        .reg(Reg::local(8))
        .reg(Reg::local(4))
        .reg(Reg::local(9));
    b.op(op::VLEN).reg(Reg::local(10)).reg(Reg::local(4));
    b.op(op::ISTORE).reg(Reg::local(11)).int(10);
    b.op(op::MUL)
        .reg(Reg::local(12))
        .reg(Reg::local(8))
        .reg(Reg::local(11));
    b.op(op::ADD)
        .reg(Reg::local(0))
        .reg(Reg::local(12))
        .reg(Reg::local(10));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 12);
}

#[test]
fn vector_pack_empties_source_registers() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(5)).int(1);
    b.op(op::VEC).reg(Reg::local(4)).reg(Reg::local(5)).uint(1);
    b.op(op::ISNULL).reg(Reg::local(1)).reg(Reg::local(5));
    b.op(op::IZERO).reg(Reg::local(2));
    b.op(op::ADD)
        .reg(Reg::local(0))
        .reg(Reg::local(1))
        .reg(Reg::local(2));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 1);
}

#[test]
fn text_operations() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::TEXT).reg(Reg::local(1)).text("hello ");
    b.op(op::TEXT).reg(Reg::local(2)).text("wörld");
    b.op(op::TEXTCONCAT)
        .reg(Reg::local(3))
        .reg(Reg::local(1))
        .reg(Reg::local(2));
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(3));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_text(&termination), "hello wörld");
}

#[test]
fn text_indexes_count_scalars() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::TEXT).reg(Reg::local(1)).text("äöü");
    b.op(op::TEXTLENGTH).reg(Reg::local(2)).reg(Reg::local(1));
    b.op(op::ISTORE).reg(Reg::local(3)).int(1);
    b.op(op::TEXTAT)
        .reg(Reg::local(4))
        .reg(Reg::local(1))
        .reg(Reg::local(3));
    // "ö" == "ö" -> true -> 1; plus length 3 -> 4.
    b.op(op::TEXT).reg(Reg::local(5)).text("ö");
    b.op(op::TEXTEQ)
        .reg(Reg::local(6))
        .reg(Reg::local(4))
        .reg(Reg::local(5));
    b.op(op::ADD)
        .reg(Reg::local(0))
        .reg(Reg::local(6))
        .reg(Reg::local(2));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 4);
}

#[test]
fn conversion_instructions() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::TEXT).reg(Reg::local(1)).text("41");
    b.op(op::STOI).reg(Reg::local(2)).reg(Reg::local(1));
    b.op(op::ITOF).reg(Reg::local(3)).reg(Reg::local(2));
    b.op(op::FSTORE).reg(Reg::local(4)).float(1.5);
    b.op(op::ADD)
        .reg(Reg::local(5))
        .reg(Reg::local(3))
        .reg(Reg::local(4));
    b.op(op::FTOI).reg(Reg::local(0)).reg(Reg::local(5));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 42);
}

#[test]
fn indirect_register_access() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(1)).int(7);
    // Register 7 through the index read from register 1.
    b.op(op::ISTORE).reg(Reg::local(1).indirect()).int(5);
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(7));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 5);
}

#[test]
fn negative_indirect_index_is_catchable() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::TRY);
    b.op(op::CATCH).atom("InvalidIndex").atom("main/0::catch");
    b.op(op::ENTER).atom("main/0::body");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(3));
    b.op(op::RETURN);

    b.begin_block("main/0::body");
    b.op(op::ISTORE).reg(Reg::local(1)).int(-1);
    b.op(op::ISTORE).reg(Reg::local(1).indirect()).int(5);
    b.op(op::ISTORE).reg(Reg::local(3)).int(1);
    b.op(op::LEAVE);

    b.begin_block("main/0::catch");
    b.op(op::DRAW).reg(Reg::local(4));
    b.op(op::ISTORE).reg(Reg::local(3)).int(2);
    b.op(op::LEAVE);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 2);
}

#[test]
fn static_registers_persist_across_calls() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::FRAME).uint(0).uint(16);
    b.op(op::CALL).void().atom("counter/0");
    b.op(op::FRAME).uint(0).uint(16);
    b.op(op::CALL).reg(Reg::local(1)).atom("counter/0");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(1));
    b.op(op::RETURN);

    b.begin_function("counter/0");
    b.op(op::ISNULL).reg(Reg::local(1)).reg(Reg::statics(0));
    b.op(op::IF).reg(Reg::local(1));
    let init = b.address_placeholder();
    let bump = b.address_placeholder();

    let init_at = b.here();
    b.patch_address(init, init_at);
    b.op(op::IZERO).reg(Reg::statics(0));

    let bump_at = b.here();
    b.patch_address(bump, bump_at);
    b.op(op::IINC).reg(Reg::statics(0));
    b.op(op::COPY).reg(Reg::local(0)).reg(Reg::statics(0));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 2);
}

#[test]
fn ress_switches_the_current_set() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::RESS)
        .uint(u32::from(RegisterSetId::Global.as_marker()));
    b.op(op::ISTORE).reg(Reg::current(3)).int(9);
    b.op(op::COPY).reg(Reg::local(0)).reg(Reg::global(3));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 9);
}

#[test]
fn copy_is_deep() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(5)).int(1);
    b.op(op::VEC).reg(Reg::local(1)).reg(Reg::local(5)).uint(1);
    b.op(op::COPY).reg(Reg::local(2)).reg(Reg::local(1));
    // Mutate the original; the copy must stay at length 1.
    b.op(op::ISTORE).reg(Reg::local(6)).int(2);
    b.op(op::VPUSH).reg(Reg::local(1)).reg(Reg::local(6));
    b.op(op::VLEN).reg(Reg::local(0)).reg(Reg::local(2));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 1);
}

#[test]
fn struct_insert_remove_keys() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::STRUCT).reg(Reg::local(1));
    b.op(op::ATOM).reg(Reg::local(2)).atom("answer");
    b.op(op::ISTORE).reg(Reg::local(3)).int(40);
    b.op(op::STRUCTINSERT)
        .reg(Reg::local(1))
        .reg(Reg::local(2))
        .reg(Reg::local(3));
    b.op(op::ATOM).reg(Reg::local(4)).atom("other");
    b.op(op::ISTORE).reg(Reg::local(5)).int(2);
    b.op(op::STRUCTINSERT)
        .reg(Reg::local(1))
        .reg(Reg::local(4))
        .reg(Reg::local(5));
    b.op(op::STRUCTREMOVE)
        .reg(Reg::local(6))
        .reg(Reg::local(1))
        .reg(Reg::local(2));
    b.op(op::STRUCTKEYS).reg(Reg::local(7)).reg(Reg::local(1));
    b.op(op::VLEN).reg(Reg::local(8)).reg(Reg::local(7));
    b.op(op::ADD)
        .reg(Reg::local(0))
        .reg(Reg::local(6))
        .reg(Reg::local(8));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 41);
}

#[test]
fn missing_struct_key_is_catchable() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::TRY);
    b.op(op::CATCH).atom("MissingKey").atom("main/0::catch");
    b.op(op::ENTER).atom("main/0::body");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(3));
    b.op(op::RETURN);

    b.begin_block("main/0::body");
    b.op(op::STRUCT).reg(Reg::local(1));
    b.op(op::ATOM).reg(Reg::local(2)).atom("absent");
    b.op(op::STRUCTREMOVE)
        .reg(Reg::local(4))
        .reg(Reg::local(1))
        .reg(Reg::local(2));
    b.op(op::ISTORE).reg(Reg::local(3)).int(1);
    b.op(op::LEAVE);

    b.begin_block("main/0::catch");
    b.op(op::DRAW).reg(Reg::local(5));
    b.op(op::ISTORE).reg(Reg::local(3)).int(2);
    b.op(op::LEAVE);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 2);
}

#[test]
fn closure_capture_shares_the_value() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(1)).int(5);
    b.op(op::CLOSURE).reg(Reg::local(2)).atom("captured/0").uint(1);
    b.op(op::CAPTURE).reg(Reg::local(2)).uint(0).reg(Reg::local(1));
    // Mutation after capture is visible inside the closure.
    b.op(op::IINC).reg(Reg::local(1));
    b.op(op::FRAME).uint(0).uint(16);
    b.op(op::CALL).reg(Reg::local(3)).reg(Reg::local(2));
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(3));
    b.op(op::RETURN);

    // The captured set becomes the frame's locals: register 0 holds the
    // captured value, which doubles as the return value.
    b.begin_function("captured/0");
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 6);
}

#[test]
fn closure_capturecopy_isolates_the_value() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(1)).int(5);
    b.op(op::CLOSURE).reg(Reg::local(2)).atom("captured/0").uint(1);
    b.op(op::CAPTURECOPY)
        .reg(Reg::local(2))
        .uint(0)
        .reg(Reg::local(1));
    b.op(op::IINC).reg(Reg::local(1));
    b.op(op::FRAME).uint(0).uint(16);
    b.op(op::CALL).reg(Reg::local(3)).reg(Reg::local(2));
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(3));
    b.op(op::RETURN);

    b.begin_function("captured/0");
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 5);
}

#[test]
fn closure_capturemove_empties_the_source() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(1)).int(5);
    b.op(op::CLOSURE).reg(Reg::local(2)).atom("captured/0").uint(1);
    b.op(op::CAPTUREMOVE)
        .reg(Reg::local(2))
        .uint(0)
        .reg(Reg::local(1));
    b.op(op::ISNULL).reg(Reg::local(4)).reg(Reg::local(1));
    b.op(op::FRAME).uint(0).uint(16);
    b.op(op::CALL).reg(Reg::local(3)).reg(Reg::local(2));
    b.op(op::ADD)
        .reg(Reg::local(0))
        .reg(Reg::local(3))
        .reg(Reg::local(4));
    b.op(op::RETURN);

    b.begin_function("captured/0");
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    // Captured 5 plus true(1) for the emptied source register.
    assert_eq!(returned_int(&termination), 6);
}

#[test]
fn bool_stores_literals_and_truthiness() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::BOOL).reg(Reg::local(1)).boolean(true);
    b.op(op::TEXT).reg(Reg::local(2)).text("x");
    b.op(op::BOOL).reg(Reg::local(3)).reg(Reg::local(2));
    b.op(op::IZERO).reg(Reg::local(4));
    b.op(op::BOOL).reg(Reg::local(5)).reg(Reg::local(4));
    // true + true + false widens to 1 + 1 + 0.
    b.op(op::ADD)
        .reg(Reg::local(6))
        .reg(Reg::local(1))
        .reg(Reg::local(3));
    b.op(op::ADD)
        .reg(Reg::local(0))
        .reg(Reg::local(6))
        .reg(Reg::local(5));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 2);
}

#[test]
fn exception_matches_base_type_in_chain() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::TRY);
    // ArithmeticError derives from Exception, so the base catcher
    // claims a division by zero.
    b.op(op::CATCH).atom("Exception").atom("main/0::catch");
    b.op(op::ENTER).atom("main/0::body");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(3));
    b.op(op::RETURN);

    b.begin_block("main/0::body");
    b.op(op::ISTORE).reg(Reg::local(1)).int(1);
    b.op(op::IZERO).reg(Reg::local(2));
    b.op(op::DIV)
        .reg(Reg::local(4))
        .reg(Reg::local(1))
        .reg(Reg::local(2));
    b.op(op::ISTORE).reg(Reg::local(3)).int(1);
    b.op(op::LEAVE);

    b.begin_block("main/0::catch");
    b.op(op::DRAW).reg(Reg::local(5));
    b.op(op::ISTORE).reg(Reg::local(3)).int(2);
    b.op(op::LEAVE);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 2);
}

#[test]
fn catcher_priority_follows_the_inheritance_chain() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::TRY);
    // Both catchers match a division by zero (chain ArithmeticError,
    // Exception, Value); the more specific type must win even though
    // the base catcher was registered first.
    b.op(op::CATCH).atom("Exception").atom("main/0::base");
    b.op(op::CATCH)
        .atom("ArithmeticError")
        .atom("main/0::specific");
    b.op(op::ENTER).atom("main/0::body");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(3));
    b.op(op::RETURN);

    b.begin_block("main/0::body");
    b.op(op::ISTORE).reg(Reg::local(1)).int(1);
    b.op(op::IZERO).reg(Reg::local(2));
    b.op(op::DIV)
        .reg(Reg::local(4))
        .reg(Reg::local(1))
        .reg(Reg::local(2));
    b.op(op::ISTORE).reg(Reg::local(3)).int(1);
    b.op(op::LEAVE);

    b.begin_block("main/0::base");
    b.op(op::DRAW).reg(Reg::local(5));
    b.op(op::ISTORE).reg(Reg::local(3)).int(2);
    b.op(op::LEAVE);

    b.begin_block("main/0::specific");
    b.op(op::DRAW).reg(Reg::local(5));
    b.op(op::ISTORE).reg(Reg::local(3)).int(3);
    b.op(op::LEAVE);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 3);
}

#[test]
fn unmatched_catcher_propagates_and_kills() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::TRY);
    b.op(op::CATCH).atom("Timeout").atom("main/0::catch");
    b.op(op::ENTER).atom("main/0::body");
    b.op(op::IZERO).reg(Reg::local(0));
    b.op(op::RETURN);

    b.begin_block("main/0::body");
    b.op(op::ISTORE).reg(Reg::local(1)).int(1);
    b.op(op::IZERO).reg(Reg::local(2));
    b.op(op::DIV)
        .reg(Reg::local(3))
        .reg(Reg::local(1))
        .reg(Reg::local(2));
    b.op(op::LEAVE);

    b.begin_block("main/0::catch");
    b.op(op::DRAW).reg(Reg::local(5));
    b.op(op::LEAVE);

    let (termination, _) = run_main(&b);
    match termination {
        Termination::Crashed(exception) => {
            assert_eq!(exception.borrow().type_name(), "ArithmeticError");
        }
        other => panic!("expected a crash, got {other:?}"),
    }
}

#[test]
fn user_throw_is_caught_by_value_type() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::TRY);
    b.op(op::CATCH).atom("Integer").atom("main/0::catch");
    b.op(op::ENTER).atom("main/0::body");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(3));
    b.op(op::RETURN);

    b.begin_block("main/0::body");
    b.op(op::ISTORE).reg(Reg::local(1)).int(42);
    b.op(op::THROW).reg(Reg::local(1));
    b.op(op::LEAVE);

    b.begin_block("main/0::catch");
    // The thrown value itself is drawn into a register.
    b.op(op::DRAW).reg(Reg::local(3));
    b.op(op::LEAVE);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 42);
}

#[test]
fn receive_timeout_raises_catchable_timeout() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::TRY);
    b.op(op::CATCH).atom("Timeout").atom("main/0::catch");
    b.op(op::ENTER).atom("main/0::body");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(3));
    b.op(op::RETURN);

    b.begin_block("main/0::body");
    b.op(op::RECEIVE).reg(Reg::local(1)).timeout_ms(10);
    b.op(op::TEXT).reg(Reg::local(3)).text("on time");
    b.op(op::LEAVE);

    b.begin_block("main/0::catch");
    b.op(op::DRAW).reg(Reg::local(4));
    b.op(op::TEXT).reg(Reg::local(3)).text("late");
    b.op(op::LEAVE);

    let started = std::time::Instant::now();
    let (termination, _) = run_main(&b);
    assert!(started.elapsed() >= std::time::Duration::from_millis(10));
    assert_eq!(returned_text(&termination), "late");
}

#[test]
fn deferred_calls_run_in_reverse_order_before_return() {
    let mut b = ProgramBuilder::new();
    // Deferred functions append their mark to a vector in the global
    // set, which survives frames within the process.
    b.begin_function("main/0");
    b.op(op::VEC).reg(Reg::global(1)).reg(Reg::local(9)).uint(0);
    b.op(op::FRAME).uint(0).uint(16);
    b.op(op::CALL).void().atom("work/0");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::global(1));
    b.op(op::RETURN);

    b.begin_function("work/0");
    b.op(op::FRAME).uint(0).uint(16);
    b.op(op::DEFER).atom("mark_one/0");
    b.op(op::FRAME).uint(0).uint(16);
    b.op(op::DEFER).atom("mark_two/0");
    b.op(op::RETURN);

    b.begin_function("mark_one/0");
    b.op(op::ATOM).reg(Reg::local(1)).atom("one");
    b.op(op::VPUSH).reg(Reg::global(1)).reg(Reg::local(1));
    b.op(op::RETURN);

    b.begin_function("mark_two/0");
    b.op(op::ATOM).reg(Reg::local(1)).atom("two");
    b.op(op::VPUSH).reg(Reg::global(1)).reg(Reg::local(1));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    // Registered one then two; executed two then one.
    assert_eq!(returned_text(&termination), "['two, 'one]");
}

#[test]
fn deferred_calls_run_during_unwinding() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::VEC).reg(Reg::global(1)).reg(Reg::local(9)).uint(0);
    b.op(op::TRY);
    b.op(op::CATCH).atom("Exception").atom("main/0::catch");
    b.op(op::ENTER).atom("main/0::body");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::global(1));
    b.op(op::RETURN);

    b.begin_block("main/0::body");
    b.op(op::FRAME).uint(0).uint(16);
    b.op(op::CALL).void().atom("work/0");
    b.op(op::LEAVE);

    b.begin_block("main/0::catch");
    b.op(op::DRAW).reg(Reg::local(5));
    b.op(op::ATOM).reg(Reg::local(6)).atom("caught");
    b.op(op::VPUSH).reg(Reg::global(1)).reg(Reg::local(6));
    b.op(op::LEAVE);

    // work/0 defers a cleanup mark and then throws.
    b.begin_function("work/0");
    b.op(op::FRAME).uint(0).uint(16);
    b.op(op::DEFER).atom("mark_one/0");
    b.op(op::ISTORE).reg(Reg::local(1)).int(1);
    b.op(op::IZERO).reg(Reg::local(2));
    b.op(op::DIV)
        .reg(Reg::local(3))
        .reg(Reg::local(1))
        .reg(Reg::local(2));
    b.op(op::RETURN);

    b.begin_function("mark_one/0");
    b.op(op::ATOM).reg(Reg::local(1)).atom("one");
    b.op(op::VPUSH).reg(Reg::global(1)).reg(Reg::local(1));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    // The deferred call runs before the catcher observes the exception.
    assert_eq!(returned_text(&termination), "['one, 'caught]");
}

#[test]
fn dynamic_dispatch_walks_the_inheritance_chain() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    // class A with method m bound to a_m/1.
    b.op(op::CLASS).reg(Reg::local(1)).atom("A");
    b.op(op::ATTACH).reg(Reg::local(1)).atom("a_m/1").atom("m");
    b.op(op::REGISTER).reg(Reg::local(1));
    // class B derives from A and does not override m.
    b.op(op::CLASS).reg(Reg::local(2)).atom("B");
    b.op(op::DERIVE).reg(Reg::local(2)).atom("A");
    b.op(op::REGISTER).reg(Reg::local(2));

    b.op(op::NEW).reg(Reg::local(3)).atom("B");
    b.op(op::FRAME).uint(1).uint(16);
    b.op(op::PARAM).uint(0).reg(Reg::local(3));
    b.op(op::MSG).reg(Reg::local(4)).atom("m");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(4));
    b.op(op::RETURN);

    b.begin_function("a_m/1");
    b.op(op::ARG).void().uint(0);
    b.op(op::ISTORE).reg(Reg::local(0)).int(7);
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 7);
}

#[test]
fn msg_on_unknown_method_is_catchable() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::TRY);
    b.op(op::CATCH).atom("MethodNotFound").atom("main/0::catch");
    b.op(op::ENTER).atom("main/0::body");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(3));
    b.op(op::RETURN);

    b.begin_block("main/0::body");
    b.op(op::CLASS).reg(Reg::local(1)).atom("A");
    b.op(op::REGISTER).reg(Reg::local(1));
    b.op(op::NEW).reg(Reg::local(2)).atom("A");
    b.op(op::FRAME).uint(1).uint(16);
    b.op(op::PARAM).uint(0).reg(Reg::local(2));
    b.op(op::MSG).reg(Reg::local(4)).atom("missing");
    b.op(op::ISTORE).reg(Reg::local(3)).int(1);
    b.op(op::LEAVE);

    b.begin_block("main/0::catch");
    b.op(op::DRAW).reg(Reg::local(5));
    b.op(op::ISTORE).reg(Reg::local(3)).int(2);
    b.op(op::LEAVE);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 2);
}

#[test]
fn duplicate_class_registration_is_rejected() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::TRY);
    b.op(op::CATCH).atom("DuplicateClass").atom("main/0::catch");
    b.op(op::ENTER).atom("main/0::body");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(3));
    b.op(op::RETURN);

    b.begin_block("main/0::body");
    b.op(op::CLASS).reg(Reg::local(1)).atom("X");
    b.op(op::REGISTER).reg(Reg::local(1));
    b.op(op::CLASS).reg(Reg::local(2)).atom("X");
    b.op(op::REGISTER).reg(Reg::local(2));
    b.op(op::ISTORE).reg(Reg::local(3)).int(1);
    b.op(op::LEAVE);

    b.begin_block("main/0::catch");
    b.op(op::DRAW).reg(Reg::local(5));
    b.op(op::ISTORE).reg(Reg::local(3)).int(2);
    b.op(op::LEAVE);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 2);
}

#[test]
fn object_attributes_insert_and_remove() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::CLASS).reg(Reg::local(1)).atom("Point");
    b.op(op::REGISTER).reg(Reg::local(1));
    b.op(op::NEW).reg(Reg::local(2)).atom("Point");
    b.op(op::TEXT).reg(Reg::local(3)).text("x");
    b.op(op::ISTORE).reg(Reg::local(4)).int(11);
    b.op(op::INSERT)
        .reg(Reg::local(2))
        .reg(Reg::local(3))
        .reg(Reg::local(4));
    b.op(op::REMOVE)
        .reg(Reg::local(5))
        .reg(Reg::local(2))
        .reg(Reg::local(3));
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(5));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 11);
}

#[test]
fn stale_pointer_dereference_is_catchable() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::TRY);
    b.op(op::CATCH).atom("StalePointer").atom("main/0::catch");
    b.op(op::ENTER).atom("main/0::body");
    b.op(op::MOVE).reg(Reg::local(0)).reg(Reg::local(3));
    b.op(op::RETURN);

    b.begin_block("main/0::body");
    // A vector in register 1, a pointer to it in register 5.
    b.op(op::VEC).reg(Reg::local(1)).reg(Reg::local(9)).uint(0);
    b.op(op::PTR).reg(Reg::local(5)).reg(Reg::local(1));
    // Moving the vector keeps the pointer valid...
    b.op(op::MOVE).reg(Reg::local(2)).reg(Reg::local(1));
    b.op(op::VLEN).reg(Reg::local(6)).reg(Reg::local(5).deref());
    // ...deleting it does not.
    b.op(op::DELETE).reg(Reg::local(2));
    b.op(op::VLEN).reg(Reg::local(7)).reg(Reg::local(5).deref());
    b.op(op::ISTORE).reg(Reg::local(3)).int(1);
    b.op(op::LEAVE);

    b.begin_block("main/0::catch");
    b.op(op::DRAW).reg(Reg::local(8));
    b.op(op::ISTORE).reg(Reg::local(3)).int(2);
    b.op(op::LEAVE);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 2);
}

#[test]
fn vat_yields_a_pointer_to_the_element() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(5)).int(41);
    b.op(op::VEC).reg(Reg::local(1)).reg(Reg::local(5)).uint(1);
    b.op(op::IZERO).reg(Reg::local(2));
    b.op(op::VAT)
        .reg(Reg::local(3))
        .reg(Reg::local(1))
        .reg(Reg::local(2));
    // Mutating through the pointer mutates the element.
    b.op(op::IINC).reg(Reg::local(3).deref());
    b.op(op::IZERO).reg(Reg::local(4));
    b.op(op::VPOP)
        .reg(Reg::local(0))
        .reg(Reg::local(1))
        .reg(Reg::local(4));
    b.op(op::RETURN);

    let (termination, _) = run_main(&b);
    assert_eq!(returned_int(&termination), 42);
}

#[test]
fn halt_stops_the_machine() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(op::ISTORE).reg(Reg::local(0)).int(7);
    b.op(op::HALT);

    let mut kernel = Kernel::new(Config::default());
    kernel
        .load(&b.to_bytes(ImageKind::Executable))
        .expect("image loads");
    let entry = kernel.function_entry("main/0").expect("main/0 exists");
    let mut frame = super::Frame::new(0, 16);
    frame.function_name = "main/0".to_owned();
    let mut process = Process::new(Pid::from_raw(0), frame, entry, false, false);

    loop {
        match process.step(&kernel) {
            StepResult::Continue => {}
            StepResult::Halt => break,
            other => panic!("expected halt, got {other:?}"),
        }
    }
}

#[test]
fn illegal_instruction_is_fatal_to_the_process() {
    let mut b = ProgramBuilder::new();
    b.begin_function("main/0");
    b.op(crate::bytecode::OPCODE_COUNT); // not a valid opcode

    let (termination, _) = run_main(&b);
    match termination {
        Termination::Crashed(exception) => {
            assert_eq!(exception.borrow().type_name(), "FatalError");
        }
        other => panic!("expected a crash, got {other:?}"),
    }
}
