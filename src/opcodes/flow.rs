//! Jumps, conditional branches, calls, returns, and restarts. The conditional forms
//! charge a taken-branch penalty on top of the table's base cost, expressed here through
//! [`Outcome::extra_cycles`].

use crate::cpu::{Context, Outcome};
use crate::error::CoreError;

use super::operand::{condition, imm16, imm8, pop_word, push_word};

fn signed_offset(imm: u8) -> i16 {
    i16::from(imm as i8)
}

pub(super) fn jr_e(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let imm = imm8(ctx)?;
    let next_pc = ctx.registers.pc.wrapping_add(2);
    ctx.registers.pc = next_pc.wrapping_add(signed_offset(imm) as u16);
    Ok(Outcome { pc_written: true, extra_cycles: 0 })
}

pub(super) fn jr_cc_e(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let imm = imm8(ctx)?;
    let next_pc = ctx.registers.pc.wrapping_add(2);
    if condition(ctx, opcode >> 3) {
        ctx.registers.pc = next_pc.wrapping_add(signed_offset(imm) as u16);
        Ok(Outcome { pc_written: true, extra_cycles: 4 })
    } else {
        Ok(Outcome::default())
    }
}

pub(super) fn jp_nn(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    ctx.registers.pc = imm16(ctx)?;
    Ok(Outcome { pc_written: true, extra_cycles: 0 })
}

pub(super) fn jp_cc_nn(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let target = imm16(ctx)?;
    if condition(ctx, opcode >> 3) {
        ctx.registers.pc = target;
        Ok(Outcome { pc_written: true, extra_cycles: 4 })
    } else {
        Ok(Outcome::default())
    }
}

/// `PC ← HL`, not a memory indirection despite the mnemonic.
pub(super) fn jp_hl(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    ctx.registers.pc = ctx.registers.hl();
    Ok(Outcome { pc_written: true, extra_cycles: 0 })
}

pub(super) fn call_nn(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    let target = imm16(ctx)?;
    let return_address = ctx.registers.pc.wrapping_add(3);
    push_word(ctx, return_address)?;
    ctx.registers.pc = target;
    Ok(Outcome { pc_written: true, extra_cycles: 0 })
}

pub(super) fn call_cc_nn(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let target = imm16(ctx)?;
    if condition(ctx, opcode >> 3) {
        let return_address = ctx.registers.pc.wrapping_add(3);
        push_word(ctx, return_address)?;
        ctx.registers.pc = target;
        Ok(Outcome { pc_written: true, extra_cycles: 12 })
    } else {
        Ok(Outcome::default())
    }
}

pub(super) fn ret(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    ctx.registers.pc = pop_word(ctx)?;
    Ok(Outcome { pc_written: true, extra_cycles: 0 })
}

pub(super) fn ret_cc(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    if condition(ctx, opcode >> 3) {
        ctx.registers.pc = pop_word(ctx)?;
        Ok(Outcome { pc_written: true, extra_cycles: 12 })
    } else {
        Ok(Outcome::default())
    }
}

/// Unlike `RET`, also sets IME immediately, with no one-instruction delay.
pub(super) fn reti(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    ctx.registers.pc = pop_word(ctx)?;
    ctx.interrupts.borrow_mut().enable_immediately();
    Ok(Outcome { pc_written: true, extra_cycles: 0 })
}

pub(super) fn rst(ctx: &mut Context<'_>, opcode: u8) -> Result<Outcome, CoreError> {
    let vector = u16::from(opcode & 0x38);
    let return_address = ctx.registers.pc.wrapping_add(1);
    push_word(ctx, return_address)?;
    ctx.registers.pc = vector;
    Ok(Outcome { pc_written: true, extra_cycles: 0 })
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

    fn bus_with_ram() -> Bus {
        let mut bus = Bus::new();
        let ram = Rc::new(RefCell::new([0u8; 0x10000]));
        let read_ram = Rc::clone(&ram);
        let write_ram = Rc::clone(&ram);
        bus.add_connection(
            0,
            0xFFFF,
            move |offset| read_ram.borrow()[offset as usize],
            move |offset, value| write_ram.borrow_mut()[offset as usize] = value,
        )
        .unwrap();
        bus
    }

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
    fn jr_uses_offset_relative_to_the_instruction_after_it() {
        let mut registers = Registers::new();
        registers.pc = 0x0200;
        let mut bus = bus_with_ram();
        bus.write(0x0201, 0xFE); // -2
        let mut state = CpuState::Normal;
        let mut ctx = context(&mut registers, &mut bus, &mut state);
        jr_e(&mut ctx, 0x18).unwrap();
        assert_eq!(ctx.registers.pc, 0x0200);
    }

    #[test]
    fn untaken_conditional_jump_reports_no_extra_cycles() {
        let mut registers = Registers::new();
        registers.pc = 0x0200;
        registers.f.zero = false;
        let mut bus = bus_with_ram();
        bus.write(0x0201, 0x34);
        bus.write(0x0202, 0x12);
        let mut state = CpuState::Normal;
        let mut ctx = context(&mut registers, &mut bus, &mut state);
        let outcome = jp_cc_nn(&mut ctx, 0xCA).unwrap(); // JP Z,nn; Z is false
        assert!(!outcome.pc_written);
        assert_eq!(outcome.extra_cycles, 0);
    }

    #[test]
    fn call_pushes_the_address_after_the_instruction() {
        let mut registers = Registers::new();
        registers.pc = 0x0100;
        registers.sp = 0xFFFE;
        let mut bus = bus_with_ram();
        bus.write(0x0101, 0x34);
        bus.write(0x0102, 0x12);
        let mut state = CpuState::Normal;
        let mut ctx = context(&mut registers, &mut bus, &mut state);
        call_nn(&mut ctx, 0xCD).unwrap();
        assert_eq!(ctx.registers.pc, 0x1234);
        assert_eq!(ctx.registers.sp, 0xFFFC);
        assert_eq!(ctx.bus.read_u16(0xFFFC), Some(0x0103));
    }

    #[test]
    fn rst_computes_the_vector_from_the_opcode_bits() {
        let mut registers = Registers::new();
        registers.pc = 0x0050;
        registers.sp = 0xFFFE;
        let mut bus = bus_with_ram();
        let mut state = CpuState::Normal;
        let mut ctx = context(&mut registers, &mut bus, &mut state);
        rst(&mut ctx, 0xEF).unwrap(); // RST 28h
        assert_eq!(ctx.registers.pc, 0x0028);
    }

    #[test]
    fn reti_sets_ime_with_no_delay() {
        let mut registers = Registers::new();
        registers.pc = 0x0100;
        registers.sp = 0xFFFC;
        let mut bus = bus_with_ram();
        bus.write_u16(0xFFFC, 0x9999);
        let mut state = CpuState::Normal;
        let interrupts = Rc::new(RefCell::new(InterruptController::new()));
        let mut ctx = Context {
            registers: &mut registers,
            bus: &mut bus,
            interrupts: Rc::clone(&interrupts),
            state: &mut state,
        };
        reti(&mut ctx, 0xD9).unwrap();
        assert_eq!(ctx.registers.pc, 0x9999);
        assert!(interrupts.borrow().ime());
    }
}
