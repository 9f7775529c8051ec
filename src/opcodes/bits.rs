//! CB-prefixed handlers: rotates/shifts, nibble swap, and bit test/set/reset.
//!
//! `n` (and the register selector) are decoded from the CB opcode's own bits, never from
//! a trailing immediate, unlike a decoder that mistakes the bit index for a second
//! operand byte.

use crate::cpu::{Context, Outcome};
use crate::error::CoreError;
use crate::registers::Flags;

use super::operand::{read_operand, write_operand};

pub(super) fn rlc_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    let carry = value & 0x80 != 0;
    let result = value.rotate_left(1);
    write_operand(ctx, opcode, result)?;
    ctx.registers.f = Flags { zero: result == 0, subtract: false, half_carry: false, carry };
    Ok(Outcome::default())
}

pub(super) fn rrc_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    let carry = value & 0x01 != 0;
    let result = value.rotate_right(1);
    write_operand(ctx, opcode, result)?;
    ctx.registers.f = Flags { zero: result == 0, subtract: false, half_carry: false, carry };
    Ok(Outcome::default())
}

pub(super) fn rl_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    let carry_in = u8::from(ctx.registers.f.carry);
    let carry_out = value & 0x80 != 0;
    let result = (value << 1) | carry_in;
    write_operand(ctx, opcode, result)?;
    ctx.registers.f =
        Flags { zero: result == 0, subtract: false, half_carry: false, carry: carry_out };
    Ok(Outcome::default())
}

pub(super) fn rr_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    let carry_in = u8::from(ctx.registers.f.carry);
    let carry_out = value & 0x01 != 0;
    let result = (value >> 1) | (carry_in << 7);
    write_operand(ctx, opcode, result)?;
    ctx.registers.f =
        Flags { zero: result == 0, subtract: false, half_carry: false, carry: carry_out };
    Ok(Outcome::default())
}

pub(super) fn sla(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    let carry = value & 0x80 != 0;
    let result = value << 1;
    write_operand(ctx, opcode, result)?;
    ctx.registers.f = Flags { zero: result == 0, subtract: false, half_carry: false, carry };
    Ok(Outcome::default())
}

pub(super) fn sra(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    let carry = value & 0x01 != 0;
    let result = (value >> 1) | (value & 0x80);
    write_operand(ctx, opcode, result)?;
    ctx.registers.f = Flags { zero: result == 0, subtract: false, half_carry: false, carry };
    Ok(Outcome::default())
}

pub(super) fn srl(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    let carry = value & 0x01 != 0;
    let result = value >> 1;
    write_operand(ctx, opcode, result)?;
    ctx.registers.f = Flags { zero: result == 0, subtract: false, half_carry: false, carry };
    Ok(Outcome::default())
}

pub(super) fn swap(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    let result = (value << 4) | (value >> 4);
    write_operand(ctx, opcode, result)?;
    ctx.registers.f = Flags { zero: result == 0, ..Flags::default() };
    Ok(Outcome::default())
}

pub(super) fn bit(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let n = (opcode >> 3) & 0x7;
    let value = read_operand(ctx, opcode)?;
    ctx.registers.f.zero = (value >> n) & 1 == 0;
    ctx.registers.f.subtract = false;
    ctx.registers.f.half_carry = true;
    Ok(Outcome::default())
}

pub(super) fn set(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let n = (opcode >> 3) & 0x7;
    let value = read_operand(ctx, opcode)?;
    write_operand(ctx, opcode, value | (1 << n))?;
    Ok(Outcome::default())
}

pub(super) fn res(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let n = (opcode >> 3) & 0x7;
    let value = read_operand(ctx, opcode)?;
    write_operand(ctx, opcode, value & !(1 << n))?;
    Ok(Outcome::default())
}
