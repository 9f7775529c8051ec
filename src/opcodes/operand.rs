//! Shared operand decoding: the 3-bit `r` register selector (including the `(HL)`
//! indirect case), the 2-bit `rr` register-pair selector, condition codes, and
//! little-endian immediate fetches relative to the still-unadvanced PC.

use crate::cpu::Context;
use crate::error::CoreError;

pub(super) fn read_operand(ctx: &mut Context<'_>, bits: u8) -> Result<u8, CoreError> {
    if bits & 0x7 == 0x6 {
        let address = ctx.registers.hl();
        ctx.bus.read(address).ok_or(CoreError::UnmappedRead { address })
    } else {
        Ok(ctx.registers.read_r8(bits))
    }
}

pub(super) fn write_operand(ctx: &mut Context<'_>, bits: u8, value: u8) -> Result<(), CoreError> {
    if bits & 0x7 == 0x6 {
        let address = ctx.registers.hl();
        if ctx.bus.write(address, value) {
            Ok(())
        } else {
            Err(CoreError::UnmappedWrite { address })
        }
    } else {
        ctx.registers.write_r8(bits, value);
        Ok(())
    }
}

/// Reads the immediate byte at `PC + 1`.
pub(super) fn imm8(ctx: &mut Context<'_>) -> Result<u8, CoreError> {
    imm8_at(ctx, 1)
}

pub(super) fn imm8_at(ctx: &mut Context<'_>, offset: u16) -> Result<u8, CoreError> {
    let address = ctx.registers.pc.wrapping_add(offset);
    ctx.bus.read(address).ok_or(CoreError::UnmappedRead { address })
}

/// Reads the little-endian immediate word at `PC + 1`/`PC + 2`.
pub(super) fn imm16(ctx: &mut Context<'_>) -> Result<u16, CoreError> {
    let lo = imm8_at(ctx, 1)?;
    let hi = imm8_at(ctx, 2)?;
    Ok(u16::from_le_bytes([lo, hi]))
}

/// The `rr` field used by `LD rr,nn` / `INC rr` / `DEC rr` / `ADD HL,rr`: 00=BC, 01=DE,
/// 10=HL, 11=SP.
pub(super) fn read_rr(ctx: &Context<'_>, selector: u8) -> u16 {
    match selector & 0x3 {
        0 => ctx.registers.bc(),
        1 => ctx.registers.de(),
        2 => ctx.registers.hl(),
        _ => ctx.registers.sp,
    }
}

pub(super) fn write_rr(ctx: &mut Context<'_>, selector: u8, value: u16) {
    match selector & 0x3 {
        0 => ctx.registers.set_bc(value),
        1 => ctx.registers.set_de(value),
        2 => ctx.registers.set_hl(value),
        _ => ctx.registers.sp = value,
    }
}

/// The same field as used by `PUSH`/`POP`, which substitute AF for SP at selector 11.
pub(super) fn read_rr_stack(ctx: &Context<'_>, selector: u8) -> u16 {
    match selector & 0x3 {
        0 => ctx.registers.bc(),
        1 => ctx.registers.de(),
        2 => ctx.registers.hl(),
        _ => ctx.registers.af(),
    }
}

pub(super) fn write_rr_stack(ctx: &mut Context<'_>, selector: u8, value: u16) {
    match selector & 0x3 {
        0 => ctx.registers.set_bc(value),
        1 => ctx.registers.set_de(value),
        2 => ctx.registers.set_hl(value),
        _ => ctx.registers.set_af(value),
    }
}

/// The `cc` field used by conditional jumps/calls/returns: 00=NZ, 01=Z, 10=NC, 11=C.
pub(super) fn condition(ctx: &Context<'_>, selector: u8) -> bool {
    match selector & 0x3 {
        0 => !ctx.registers.f.zero,
        1 => ctx.registers.f.zero,
        2 => !ctx.registers.f.carry,
        _ => ctx.registers.f.carry,
    }
}

pub(super) fn push_word(ctx: &mut Context<'_>, value: u16) -> Result<(), CoreError> {
    ctx.registers.decrement_sp();
    ctx.registers.decrement_sp();
    let sp = ctx.registers.sp;
    if ctx.bus.write_u16(sp, value) {
        Ok(())
    } else {
        Err(CoreError::UnmappedWrite { address: sp })
    }
}

pub(super) fn pop_word(ctx: &mut Context<'_>) -> Result<u16, CoreError> {
    let sp = ctx.registers.sp;
    let value = ctx.bus.read_u16(sp).ok_or(CoreError::UnmappedRead { address: sp })?;
    ctx.registers.increment_sp();
    ctx.registers.increment_sp();
    Ok(value)
}
