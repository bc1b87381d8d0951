// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Instruction dispatch.
//!
//! One handler per opcode; each decodes its own operands from the cursor
//! and returns where execution continues. The handlers live in
//! [`super::instr`], one file per instruction family.

use super::{Fault, Process, Step};
use crate::bytecode::op;
use crate::bytecode::operands::Cursor;
use crate::kernel::Kernel;

/// Dispatch one decoded opcode to its handler.
///
/// The cursor is positioned just past the opcode byte; handlers consume
/// their operands from it.
pub fn dispatch(
    process: &mut Process,
    opcode: u8,
    cur: &mut Cursor,
    kernel: &Kernel,
) -> Result<Step, Fault> {
    match opcode {
        op::NOP => Ok(Step::Next(cur.ip())),

        op::IZERO => process.op_izero(cur),
        op::ISTORE => process.op_istore(cur),
        op::IINC => process.op_iinc(cur),
        op::IDEC => process.op_idec(cur),

        op::FSTORE => process.op_fstore(cur),

        op::ITOF => process.op_itof(cur),
        op::FTOI => process.op_ftoi(cur),
        op::STOI => process.op_stoi(cur),
        op::STOF => process.op_stof(cur),

        op::ADD => process.op_add(cur),
        op::SUB => process.op_sub(cur),
        op::MUL => process.op_mul(cur),
        op::DIV => process.op_div(cur),
        op::LT => process.op_lt(cur),
        op::LTE => process.op_lte(cur),
        op::GT => process.op_gt(cur),
        op::GTE => process.op_gte(cur),
        op::EQ => process.op_eq(cur),

        op::STRSTORE => process.op_strstore(cur),
        op::TEXT => process.op_text(cur),
        op::TEXTEQ => process.op_texteq(cur),
        op::TEXTAT => process.op_textat(cur),
        op::TEXTSUB => process.op_textsub(cur),
        op::TEXTLENGTH => process.op_textlength(cur),
        op::TEXTCOMMONPREFIX => process.op_textcommonprefix(cur),
        op::TEXTCOMMONSUFFIX => process.op_textcommonsuffix(cur),
        op::TEXTCONCAT => process.op_textconcat(cur),

        op::ATOM => process.op_atom(cur),
        op::ATOMEQ => process.op_atomeq(cur),

        op::BITS => process.op_bits(cur),

        op::VEC => process.op_vec(cur),
        op::VINSERT => process.op_vinsert(cur),
        op::VPUSH => process.op_vpush(cur),
        op::VPOP => process.op_vpop(cur),
        op::VAT => process.op_vat(cur),
        op::VLEN => process.op_vlen(cur),

        op::STRUCT => process.op_struct(cur),
        op::STRUCTINSERT => process.op_structinsert(cur),
        op::STRUCTREMOVE => process.op_structremove(cur),
        op::STRUCTKEYS => process.op_structkeys(cur),

        op::BOOL => process.op_bool(cur),
        op::NOT => process.op_not(cur),
        op::AND => process.op_and(cur),
        op::OR => process.op_or(cur),

        op::MOVE => process.op_move(cur),
        op::COPY => process.op_copy(cur),
        op::PTR => process.op_ptr(cur),
        op::SWAP => process.op_swap(cur),
        op::DELETE => process.op_delete(cur),
        op::ISNULL => process.op_isnull(cur),
        op::RESS => process.op_ress(cur),

        op::PRINT => process.op_print(cur),
        op::ECHO => process.op_echo(cur),

        op::CAPTURE => process.op_capture(cur),
        op::CAPTURECOPY => process.op_capturecopy(cur),
        op::CAPTUREMOVE => process.op_capturemove(cur),
        op::CLOSURE => process.op_closure(cur, kernel),
        op::FUNCTION => process.op_function(cur, kernel),

        op::FRAME => process.op_frame(cur),
        op::PARAM => process.op_param(cur),
        op::PAMV => process.op_pamv(cur),
        op::ARG => process.op_arg(cur),
        op::ARGC => process.op_argc(cur),
        op::CALL => process.op_call(cur, kernel),
        op::TAILCALL => process.op_tailcall(cur, kernel),
        op::DEFER => process.op_defer(cur, kernel),

        op::PROCESS => process.op_process(cur, kernel),
        op::SELF => process.op_self(cur),
        op::JOIN => process.op_join(cur, kernel),
        op::SEND => process.op_send(cur, kernel),
        op::RECEIVE => process.op_receive(cur, kernel),
        op::WATCHDOG => process.op_watchdog(cur, kernel),

        op::JUMP => process.op_jump(cur),
        op::IF => process.op_if(cur),

        op::THROW => process.op_throw(cur),
        op::CATCH => process.op_catch(cur, kernel),
        op::DRAW => process.op_draw(cur),
        op::TRY => process.op_try(cur),
        op::ENTER => process.op_enter(cur, kernel),
        op::LEAVE => process.op_leave(cur),

        op::IMPORT => process.op_import(cur, kernel),

        op::CLASS => process.op_class(cur),
        op::DERIVE => process.op_derive(cur, kernel),
        op::ATTACH => process.op_attach(cur, kernel),
        op::REGISTER => process.op_register(cur, kernel),

        op::NEW => process.op_new(cur, kernel),
        op::MSG => process.op_msg(cur, kernel),
        op::INSERT => process.op_insert(cur),
        op::REMOVE => process.op_remove(cur),

        op::RETURN => process.op_return(cur, kernel),
        op::HALT => Ok(Step::Halted),

        // fetch_opcode validated the byte; this arm is unreachable but
        // keeps the match total.
        _ => Err(Fault::Fatal(
            crate::bytecode::operands::DecodeError::IllegalInstruction {
                at: cur.ip().saturating_sub(1),
                opcode,
            },
        )),
    }
}
