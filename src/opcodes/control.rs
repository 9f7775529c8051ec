//! CPU control: NOP, HALT, STOP, DI, EI. These opcodes touch only `state` and the
//! interrupt controller's pending-toggle counters, never the bus.

use crate::cpu::{Context, CpuState, Outcome};
use crate::error::CoreError;

pub(super) fn nop(_ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    Ok(Outcome::default())
}

pub(super) fn halt(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    *ctx.state = CpuState::Halt;
    log::trace!("HALT");
    Ok(Outcome::default())
}

/// STOP's encoding reads a second byte (conventionally 0x00) that this core does not
/// interpret; the host owns whatever joypad/DIV-reset behavior real STOP entails.
pub(super) fn stop(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    *ctx.state = CpuState::Stop;
    log::debug!("STOP entered");
    Ok(Outcome::default())
}

pub(super) fn di(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    ctx.interrupts.borrow_mut().schedule_disable();
    Ok(Outcome::default())
}

pub(super) fn ei(ctx: &mut Context<'_>, _opcode: u8) -> Result<Outcome, CoreError> {
    ctx.interrupts.borrow_mut().schedule_enable();
    Ok(Outcome::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::Bus;
    use crate::interrupts::InterruptController;
    use crate::registers::Registers;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn context<'a>(
        registers: &'a mut Registers,
        bus: &'a mut Bus,
        interrupts: &Rc<RefCell<InterruptController>>,
        state: &'a mut CpuState,
    ) -> Context<'a> {
        Context { registers, bus, interrupts: Rc::clone(interrupts), state }
    }

    #[test]
    fn halt_sets_state_without_touching_registers() {
        let mut registers = Registers::new();
        let mut bus = Bus::new();
        let interrupts = Rc::new(RefCell::new(InterruptController::new()));
        let mut state = CpuState::Normal;
        let mut ctx = context(&mut registers, &mut bus, &interrupts, &mut state);
        halt(&mut ctx, 0x76).unwrap();
        assert_eq!(state, CpuState::Halt);
    }

    #[test]
    fn ei_schedules_without_committing_immediately() {
        let mut registers = Registers::new();
        let mut bus = Bus::new();
        let interrupts = Rc::new(RefCell::new(InterruptController::new()));
        let mut state = CpuState::Normal;
        let mut ctx = context(&mut registers, &mut bus, &interrupts, &mut state);
        ei(&mut ctx, 0xFB).unwrap();
        assert!(!interrupts.borrow().ime());
    }
}
