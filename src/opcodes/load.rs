//! 8-bit and 16-bit load handlers, plus stack PUSH/POP: little-endian pairing rules and
//! the LDH/high-page addressing forms over the 0xFF00 window.

use crate::cpu::{Context, Outcome};
use crate::error::CoreError;

use super::arithmetic::{add_signed_imm_to, sp_plus_e_flags};
use super::operand::{
    imm16, imm8, pop_word, push_word, read_operand, read_rr_stack, write_operand, write_rr,
    write_rr_stack,
};

pub(super) fn ld_rr_nn(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = imm16(ctx)?;
    write_rr(ctx, opcode >> 4, value);
    Ok(Outcome::default())
}

pub(super) fn ld_bc_a(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let address = ctx.registers.bc();
    write_byte(ctx, address, ctx.registers.a)
}

pub(super) fn ld_a_bc(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let address = ctx.registers.bc();
    ctx.registers.a = read_byte(ctx, address)?;
    Ok(Outcome::default())
}

pub(super) fn ld_de_a(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let address = ctx.registers.de();
    write_byte(ctx, address, ctx.registers.a)
}

pub(super) fn ld_a_de(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let address = ctx.registers.de();
    ctx.registers.a = read_byte(ctx, address)?;
    Ok(Outcome::default())
}

pub(super) fn ld_hl_a_postinc(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let address = ctx.registers.hl();
    write_byte(ctx, address, ctx.registers.a)?;
    ctx.registers.increment_hl();
    Ok(Outcome::default())
}

pub(super) fn ld_a_hl_postinc(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let address = ctx.registers.hl();
    ctx.registers.a = read_byte(ctx, address)?;
    ctx.registers.increment_hl();
    Ok(Outcome::default())
}

pub(super) fn ld_hl_a_postdec(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let address = ctx.registers.hl();
    write_byte(ctx, address, ctx.registers.a)?;
    ctx.registers.decrement_hl();
    Ok(Outcome::default())
}

pub(super) fn ld_a_hl_postdec(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let address = ctx.registers.hl();
    ctx.registers.a = read_byte(ctx, address)?;
    ctx.registers.decrement_hl();
    Ok(Outcome::default())
}

/// `LD (nn),SP`: writes the stack pointer, low byte first, at the given absolute address.
pub(super) fn ld_indirect_sp(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let address = imm16(ctx)?;
    let sp = ctx.registers.sp;
    if ctx.bus.write_u16(address, sp) {
        Ok(Outcome::default())
    } else {
        Err(CoreError::UnmappedWrite { address })
    }
}

pub(super) fn ld_r_imm(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = imm8(ctx)?;
    write_operand(ctx, opcode >> 3, value)?;
    Ok(Outcome::default())
}

pub(super) fn ld_r_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    write_operand(ctx, opcode >> 3, value)?;
    Ok(Outcome::default())
}

pub(super) fn pop_rr(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = pop_word(ctx)?;
    write_rr_stack(ctx, opcode >> 4, value);
    Ok(Outcome::default())
}

pub(super) fn push_rr(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_rr_stack(ctx, opcode >> 4);
    push_word(ctx, value)?;
    Ok(Outcome::default())
}

pub(super) fn ldh_imm_a(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let offset = imm8(ctx)?;
    let address = 0xFF00 + u16::from(offset);
    write_byte(ctx, address, ctx.registers.a)
}

pub(super) fn ldh_a_imm(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let offset = imm8(ctx)?;
    let address = 0xFF00 + u16::from(offset);
    ctx.registers.a = read_byte(ctx, address)?;
    Ok(Outcome::default())
}

pub(super) fn ld_c_a_high_page(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let address = 0xFF00 + u16::from(ctx.registers.c);
    write_byte(ctx, address, ctx.registers.a)
}

pub(super) fn ld_a_c_high_page(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let address = 0xFF00 + u16::from(ctx.registers.c);
    ctx.registers.a = read_byte(ctx, address)?;
    Ok(Outcome::default())
}

pub(super) fn ld_indirect_a(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let address = imm16(ctx)?;
    write_byte(ctx, address, ctx.registers.a)
}

pub(super) fn ld_a_indirect(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let address = imm16(ctx)?;
    ctx.registers.a = read_byte(ctx, address)?;
    Ok(Outcome::default())
}

pub(super) fn ld_sp_hl(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    ctx.registers.sp = ctx.registers.hl();
    Ok(Outcome::default())
}

/// `LDHL SP,e`: same signed-byte flag algorithm as `ADD SP,e`, written to HL instead of SP.
pub(super) fn ld_hl_sp_e(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let imm = imm8(ctx)?;
    let sp = ctx.registers.sp;
    ctx.registers.f = sp_plus_e_flags(sp, imm);
    ctx.registers.set_hl(add_signed_imm_to(sp, imm));
    Ok(Outcome::default())
}

fn read_byte(ctx: &mut Context<'_>, address: u16) -> Result<u8, CoreError> {
    ctx.bus.read(address).ok_or(CoreError::UnmappedRead { address })
}

fn write_byte(ctx: &mut Context<'_>, address: u16, value: u8) -> Result<Outcome, CoreError> {
    if ctx.bus.write(address, value) {
        Ok(Outcome::default())
    } else {
        Err(CoreError::UnmappedWrite { address })
    }
}
