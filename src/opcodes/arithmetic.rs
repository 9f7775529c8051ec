//! 8-bit and 16-bit arithmetic/logic handlers.
//!
//! Structurally adapted from `z80-emu/src/core/instructions/arithmetic.rs`, which
//! separates the numeric operation from the opcode that invokes it the same way
//! `add`/`sub` do here.

use crate::cpu::{Context, Outcome};
use crate::error::CoreError;
use crate::registers::Flags;

use super::operand::{imm8, read_operand, read_rr, write_operand};

fn add(ctx: &mut Context<'_>, value: u8, carry_in: bool) {
    let a = ctx.registers.a;
    let carry = u8::from(carry_in);
    let sum = u16::from(a) + u16::from(value) + u16::from(carry);
    let result = sum as u8;
    let half_carry = (a & 0xF) + (value & 0xF) + carry > 0xF;
    ctx.registers.a = result;
    ctx.registers.f = Flags { zero: result == 0, subtract: false, half_carry, carry: sum > 0xFF };
}

/// Returns the result without writing it to A, so `CP` can reuse the flag computation.
fn sub(ctx: &mut Context<'_>, value: u8, carry_in: bool) -> u8 {
    let a = ctx.registers.a;
    let carry = i16::from(carry_in);
    let diff = i16::from(a) - i16::from(value) - carry;
    let result = diff as u8;
    let half_carry = i16::from(a & 0xF) - i16::from(value & 0xF) - carry < 0;
    ctx.registers.f = Flags { zero: result == 0, subtract: true, half_carry, carry: diff < 0 };
    result
}

pub(super) fn add_a_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    add(ctx, value, false);
    Ok(Outcome::default())
}

pub(super) fn adc_a_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    add(ctx, value, ctx.registers.f.carry);
    Ok(Outcome::default())
}

pub(super) fn sub_a_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    ctx.registers.a = sub(ctx, value, false);
    Ok(Outcome::default())
}

pub(super) fn sbc_a_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    let carry_in = ctx.registers.f.carry;
    ctx.registers.a = sub(ctx, value, carry_in);
    Ok(Outcome::default())
}

pub(super) fn cp_a_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    sub(ctx, value, false);
    Ok(Outcome::default())
}

pub(super) fn and_a_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    ctx.registers.a &= value;
    ctx.registers.f =
        Flags { zero: ctx.registers.a == 0, subtract: false, half_carry: true, carry: false };
    Ok(Outcome::default())
}

pub(super) fn xor_a_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    ctx.registers.a ^= value;
    ctx.registers.f = Flags { zero: ctx.registers.a == 0, ..Flags::default() };
    Ok(Outcome::default())
}

pub(super) fn or_a_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let value = read_operand(ctx, opcode)?;
    ctx.registers.a |= value;
    ctx.registers.f = Flags { zero: ctx.registers.a == 0, ..Flags::default() };
    Ok(Outcome::default())
}

pub(super) fn add_a_imm(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let value = imm8(ctx)?;
    add(ctx, value, false);
    Ok(Outcome::default())
}

pub(super) fn adc_a_imm(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let value = imm8(ctx)?;
    add(ctx, value, ctx.registers.f.carry);
    Ok(Outcome::default())
}

pub(super) fn sub_a_imm(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let value = imm8(ctx)?;
    ctx.registers.a = sub(ctx, value, false);
    Ok(Outcome::default())
}

pub(super) fn sbc_a_imm(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let value = imm8(ctx)?;
    let carry_in = ctx.registers.f.carry;
    ctx.registers.a = sub(ctx, value, carry_in);
    Ok(Outcome::default())
}

pub(super) fn cp_a_imm(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let value = imm8(ctx)?;
    sub(ctx, value, false);
    Ok(Outcome::default())
}

pub(super) fn and_a_imm(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let value = imm8(ctx)?;
    ctx.registers.a &= value;
    ctx.registers.f =
        Flags { zero: ctx.registers.a == 0, subtract: false, half_carry: true, carry: false };
    Ok(Outcome::default())
}

pub(super) fn xor_a_imm(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let value = imm8(ctx)?;
    ctx.registers.a ^= value;
    ctx.registers.f = Flags { zero: ctx.registers.a == 0, ..Flags::default() };
    Ok(Outcome::default())
}

pub(super) fn or_a_imm(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let value = imm8(ctx)?;
    ctx.registers.a |= value;
    ctx.registers.f = Flags { zero: ctx.registers.a == 0, ..Flags::default() };
    Ok(Outcome::default())
}

/// `INC r8` / `INC (HL)`. Unlike the source's pointer-increment bug, this stores the
/// incremented value back through the same operand path it was read from.
pub(super) fn inc_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let bits = opcode >> 3;
    let value = read_operand(ctx, bits)?;
    let result = value.wrapping_add(1);
    write_operand(ctx, bits, result)?;
    ctx.registers.f.zero = result == 0;
    ctx.registers.f.subtract = false;
    ctx.registers.f.half_carry = (value & 0xF) + 1 > 0xF;
    Ok(Outcome::default())
}

pub(super) fn dec_r(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let bits = opcode >> 3;
    let value = read_operand(ctx, bits)?;
    let result = value.wrapping_sub(1);
    write_operand(ctx, bits, result)?;
    ctx.registers.f.zero = result == 0;
    ctx.registers.f.subtract = true;
    ctx.registers.f.half_carry = value & 0xF == 0;
    Ok(Outcome::default())
}

pub(super) fn inc_rr(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let selector = opcode >> 4;
    let value = read_rr(ctx, selector).wrapping_add(1);
    super::operand::write_rr(ctx, selector, value);
    Ok(Outcome::default())
}

pub(super) fn dec_rr(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let selector = opcode >> 4;
    let value = read_rr(ctx, selector).wrapping_sub(1);
    super::operand::write_rr(ctx, selector, value);
    Ok(Outcome::default())
}

/// `ADD HL,rr`. Preserves Z, unlike an implementation that lets the 16-bit add's
/// flag update clobber it.
pub(super) fn add_hl_rr(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let selector = opcode >> 4;
    let hl = ctx.registers.hl();
    let value = read_rr(ctx, selector);
    let sum = u32::from(hl) + u32::from(value);
    let half_carry = (hl & 0x0FFF) + (value & 0x0FFF) > 0x0FFF;
    ctx.registers.set_hl(sum as u16);
    ctx.registers.f.subtract = false;
    ctx.registers.f.half_carry = half_carry;
    ctx.registers.f.carry = sum > 0xFFFF;
    Ok(Outcome::default())
}

/// Shared by `ADD SP,e` and `LDHL SP,e`: both use the same signed-byte flag algorithm,
/// computed from the immediate's unsigned byte pattern rather than its sign-extended value.
pub(super) fn sp_plus_e_flags(sp: u16, imm: u8) -> Flags {
    let half_carry = (sp & 0xF) + u16::from(imm & 0xF) > 0xF;
    let carry = (sp & 0xFF) + u16::from(imm) > 0xFF;
    Flags { zero: false, subtract: false, half_carry, carry }
}

pub(super) fn add_signed_imm_to(sp: u16, imm: u8) -> u16 {
    sp.wrapping_add((imm as i8) as i16 as u16)
}

pub(super) fn add_sp_e(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let imm = imm8(ctx)?;
    let sp = ctx.registers.sp;
    ctx.registers.f = sp_plus_e_flags(sp, imm);
    ctx.registers.sp = add_signed_imm_to(sp, imm);
    Ok(Outcome::default())
}

pub(super) fn daa(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let mut a = ctx.registers.a;
    let flags = ctx.registers.f;
    let mut carry = flags.carry;

    if flags.subtract {
        if flags.carry {
            a = a.wrapping_sub(0x60);
        }
        if flags.half_carry {
            a = a.wrapping_sub(0x06);
        }
    } else {
        if flags.carry || a > 0x99 {
            a = a.wrapping_add(0x60);
            carry = true;
        }
        if flags.half_carry || (a & 0xF) > 0x9 {
            a = a.wrapping_add(0x06);
        }
    }

    ctx.registers.a = a;
    ctx.registers.f.zero = a == 0;
    ctx.registers.f.half_carry = false;
    ctx.registers.f.carry = carry;
    Ok(Outcome::default())
}

pub(super) fn cpl(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    ctx.registers.a = !ctx.registers.a;
    ctx.registers.f.subtract = true;
    ctx.registers.f.half_carry = true;
    Ok(Outcome::default())
}

pub(super) fn ccf(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    ctx.registers.f.subtract = false;
    ctx.registers.f.half_carry = false;
    ctx.registers.f.carry = !ctx.registers.f.carry;
    Ok(Outcome::default())
}

pub(super) fn scf(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    ctx.registers.f.subtract = false;
    ctx.registers.f.half_carry = false;
    ctx.registers.f.carry = true;
    Ok(Outcome::default())
}

/// Rotate-A opcodes always clear Z, unlike their CB-prefixed `RLC r` etc. counterparts.
pub(super) fn rlca(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let a = ctx.registers.a;
    let carry = a & 0x80 != 0;
    ctx.registers.a = a.rotate_left(1);
    ctx.registers.f = Flags { zero: false, subtract: false, half_carry: false, carry };
    Ok(Outcome::default())
}

pub(super) fn rrca(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let a = ctx.registers.a;
    let carry = a & 0x01 != 0;
    ctx.registers.a = a.rotate_right(1);
    ctx.registers.f = Flags { zero: false, subtract: false, half_carry: false, carry };
    Ok(Outcome::default())
}

pub(super) fn rla(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let a = ctx.registers.a;
    let carry_in = u8::from(ctx.registers.f.carry);
    let carry_out = a & 0x80 != 0;
    ctx.registers.a = (a << 1) | carry_in;
    ctx.registers.f = Flags { zero: false, subtract: false, half_carry: false, carry: carry_out };
    Ok(Outcome::default())
}

pub(super) fn rra(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let a = ctx.registers.a;
    let carry_in = u8::from(ctx.registers.f.carry);
    let carry_out = a & 0x01 != 0;
    ctx.registers.a = (a >> 1) | (carry_in << 7);
    ctx.registers.f = Flags { zero: false, subtract: false, half_carry: false, carry: carry_out };
    Ok(Outcome::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Bus;
    use crate::cpu::CpuState;
    use crate::interrupts::InterruptController;
    use crate::registers::Registers;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn context<'a>(
        registers: &'a mut Registers,
        bus: &'a mut Bus,
        state: &'a mut CpuState,
    ) -> Context<'a> {
        Context {
            registers,
            bus,
            interrupts: Rc::new(RefCell::new(InterruptController::new())),
            state,
        }
    }

    #[test]
    fn adc_matches_the_invariant_for_random_operands() {
        for _ in 0..256 {
            let a: u8 = rand::random();
            let b: u8 = rand::random();
            let carry_in: bool = rand::random();

            let mut registers = Registers::new();
            registers.a = a;
            let mut bus = Bus::new();
            let mut state = CpuState::Normal;
            let mut ctx = context(&mut registers, &mut bus, &mut state);

            add(&mut ctx, b, carry_in);

            let expected_sum = u16::from(a) + u16::from(b) + u16::from(carry_in);
            assert_eq!(ctx.registers.a, expected_sum as u8);
            assert_eq!(ctx.registers.f.carry, expected_sum > 0xFF);
            assert_eq!(
                ctx.registers.f.half_carry,
                (a & 0xF) + (b & 0xF) + u8::from(carry_in) > 0xF
            );
            assert!(!ctx.registers.f.subtract);
            assert_eq!(ctx.registers.f.zero, ctx.registers.a == 0);
        }
    }

    #[test]
    fn sub_symmetry_recovers_the_absolute_difference_magnitude() {
        for _ in 0..256 {
            let a: u8 = rand::random();
            let b: u8 = rand::random();

            let mut registers = Registers::new();
            registers.a = a;
            let mut bus = Bus::new();
            let mut state = CpuState::Normal;
            let mut ctx = context(&mut registers, &mut bus, &mut state);
            let forward = sub(&mut ctx, b, false);

            registers.a = b;
            let mut ctx = context(&mut registers, &mut bus, &mut state);
            let backward = sub(&mut ctx, a, false);

            let magnitude = a.wrapping_sub(b).min(b.wrapping_sub(a));
            assert!(forward == magnitude || forward == magnitude.wrapping_neg());
            assert!(backward == magnitude || backward == magnitude.wrapping_neg());
        }
    }

    #[test]
    fn zero_flag_on_inc_a_overflow() {
        let mut registers = Registers::new();
        registers.a = 0xFF;
        let mut bus = Bus::new();
        let mut state = CpuState::Normal;
        let mut ctx = context(&mut registers, &mut bus, &mut state);
        inc_r(&mut ctx, 0x3C).unwrap();
        assert_eq!(ctx.registers.a, 0x00);
        assert!(ctx.registers.f.zero);
        assert!(!ctx.registers.f.subtract);
        assert!(ctx.registers.f.half_carry);
    }

    #[test]
    fn and_with_h_reads_h_not_a() {
        // The "AND A,H"-shaped opcode must read H, not A.
        let mut registers = Registers::new();
        registers.a = 0xF0;
        registers.h = 0x0F;
        let mut bus = Bus::new();
        let mut state = CpuState::Normal;
        let mut ctx = context(&mut registers, &mut bus, &mut state);
        and_a_r(&mut ctx, 0xA4).unwrap(); // AND A,H
        assert_eq!(ctx.registers.a, 0x00);
    }

    #[test]
    fn add_hl_preserves_the_zero_flag() {
        let mut registers = Registers::new();
        registers.set_hl(0xFFFF);
        registers.set_bc(0x0001);
        registers.f.zero = true;
        let mut bus = Bus::new();
        let mut state = CpuState::Normal;
        let mut ctx = context(&mut registers, &mut bus, &mut state);
        add_hl_rr(&mut ctx, 0x09).unwrap();
        assert_eq!(ctx.registers.hl(), 0x0000);
        assert!(ctx.registers.f.zero, "Z must be preserved by ADD HL,rr");
        assert!(ctx.registers.f.carry);
    }

    #[test]
    fn dec_register_pair_does_not_alias_increment() {
        let mut registers = Registers::new();
        registers.set_bc(0x0100);
        let mut bus = Bus::new();
        let mut state = CpuState::Normal;
        let mut ctx = context(&mut registers, &mut bus, &mut state);
        dec_rr(&mut ctx, 0x0B).unwrap();
        assert_eq!(ctx.registers.bc(), 0x00FF);
    }

    #[test]
    fn daa_corrects_a_simple_bcd_addition() {
        let mut registers = Registers::new();
        registers.a = 0x3C;
        registers.f.half_carry = true;
        let mut bus = Bus::new();
        let mut state = CpuState::Normal;
        let mut ctx = context(&mut registers, &mut bus, &mut state);
        daa(&mut ctx, 0x27).unwrap();
        assert_eq!(ctx.registers.a, 0x42);
        assert!(!ctx.registers.f.carry);
    }
}
