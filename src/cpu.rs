//! The fetch/decode/execute scheduling loop and the top-level [`Emulator`] handle.
//!
//! Grounded on `original_source/src/cpu.c`'s `cpu_loop`: a single cycle budget, charged in
//! a lump sum per dispatched instruction and ticked down one machine cycle at a time, with
//! the timer advancing on every tick. Unlike a design that ticks the bus once per bus
//! access from inside each opcode handler, this core's instruction handlers never tick
//! anything themselves, so the loop can charge cycles purely from the dispatch table.
//!
//! One difference from the literal C loop: here, while halted and nothing is charged,
//! every tick still re-checks pending interrupts (`cycles_remaining` never goes negative;
//! see [`Emulator::tick_once`]) rather than counting down from zero as an unsigned
//! wraparound would, which is the reading that matches §5's "idle boundary... may be the
//! immediately following tick" guarantee.

use std::cell::RefCell;
use std::rc::Rc;

use crate::bus::Bus;
use crate::error::CoreError;
use crate::interrupts::{InterruptController, ServiceOutcome};
use crate::opcodes::{self, OpcodeEntry};
use crate::registers::Registers;
use crate::timer::Timer;

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

/// Execution state of the core. `Stop` is reachable only as a state transition; its
/// hardware behavior (joypad wake, DIV reset) is left to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub enum CpuState {
    Normal,
    Halt,
    Stop,
}

/// Mutable view into the core's owned state, threaded through every opcode handler.
/// `interrupts` is a clone of the controller's `Rc`, not a live borrow, so a handler that
/// writes IF/IE through `bus` doesn't deadlock against one already held open here.
pub(crate) struct Context<'a> {
    pub registers: &'a mut Registers,
    pub bus: &'a mut Bus,
    pub interrupts: Rc<RefCell<InterruptController>>,
    pub state: &'a mut CpuState,
}

/// What a handler did, beyond mutating `Context` in place.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Outcome {
    /// Set by jumps, calls, returns, RST, and interrupt vectoring: anything that leaves PC
    /// somewhere other than "the next instruction", so the loop must not also add the
    /// opcode's byte size on top.
    pub pc_written: bool,
    /// Additional cycles on top of the opcode table's `base_cycles`, charged when a
    /// conditional branch is taken.
    pub extra_cycles: u8,
}

/// Owns the bus, register file, CPU state, interrupt controller, and timer, and wires the
/// timer/interrupt-controller bus connections at construction the way
/// `original_source/src/cpu.c`'s `cpu_init` wires `irq_init`/`timer_init` onto the bus.
pub struct Emulator {
    bus: Bus,
    registers: Registers,
    state: CpuState,
    interrupts: Rc<RefCell<InterruptController>>,
    timer: Rc<RefCell<Timer>>,
    primary_table: [OpcodeEntry; 256],
    cb_table: [OpcodeEntry; 256],
    cycles_remaining: u32,
}

impl Emulator {
    #[must_use]
    pub fn new() -> Self {
        let interrupts = Rc::new(RefCell::new(InterruptController::new()));
        let timer = Rc::new(RefCell::new(Timer::new()));
        let mut bus = Bus::new();

        let timer_read = Rc::clone(&timer);
        let timer_write = Rc::clone(&timer);
        bus.add_connection(
            0xFF04,
            4,
            move |offset| {
                let timer = timer_read.borrow();
                match offset {
                    0 => timer.read_div(),
                    1 => timer.read_tima(),
                    2 => timer.read_tma(),
                    _ => timer.read_tac(),
                }
            },
            move |offset, value| {
                let mut timer = timer_write.borrow_mut();
                match offset {
                    0 => timer.write_div(),
                    1 => timer.write_tima(value),
                    2 => timer.write_tma(value),
                    _ => timer.write_tac(value),
                }
            },
        )
        .expect("0xFF04..0xFF08 is registered exactly once, at construction");

        let if_read = Rc::clone(&interrupts);
        let if_write = Rc::clone(&interrupts);
        bus.add_connection(
            0xFF0F,
            1,
            move |_| if_read.borrow().read_if(),
            move |_, value| if_write.borrow_mut().write_if(value),
        )
        .expect("0xFF0F is registered exactly once, at construction");

        let ie_read = Rc::clone(&interrupts);
        let ie_write = Rc::clone(&interrupts);
        bus.add_connection(
            0xFFFF,
            1,
            move |_| ie_read.borrow().read_ie(),
            move |_, value| ie_write.borrow_mut().write_ie(value),
        )
        .expect("0xFFFF is registered exactly once, at construction");

        Self {
            bus,
            registers: Registers::new(),
            state: CpuState::Normal,
            interrupts,
            timer,
            primary_table: opcodes::primary_table(),
            cb_table: opcodes::cb_table(),
            cycles_remaining: 0,
        }
    }

    /// Exposes the bus so a host can register ROM/VRAM/PPU/APU/joypad connections before
    /// running. Address 0x0100 must be readable before the first `step`/`run` call.
    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Runs the scheduling loop for exactly one dispatched instruction: services pending
    /// interrupts, optionally fetches and executes, then ticks the timer once per elapsed
    /// machine cycle until the cycle budget reaches zero again. If nothing was dispatched
    /// (halted or stopped with no pending interrupt), advances by a single machine cycle
    /// instead, so a host interleaving other devices gets a chance to act between calls.
    pub fn step(&mut self) -> Result<(), CoreError> {
        if self.cycles_remaining == 0 {
            self.service_interrupts();
            if self.state == CpuState::Normal && self.cycles_remaining == 0 {
                self.fetch_and_execute()?;
            }
        }

        self.tick_once();
        while self.cycles_remaining > 0 {
            self.tick_once();
        }
        Ok(())
    }

    /// Runs `step` until a fatal error, tears down the core's own bus connections, and
    /// returns the error. Never returns normally.
    pub fn run(&mut self) -> CoreError {
        loop {
            if let Err(error) = self.step() {
                self.teardown();
                return error;
            }
        }
    }

    fn teardown(&mut self) {
        let _ = self.bus.remove_connection(0xFF04);
        let _ = self.bus.remove_connection(0xFF0F);
        let _ = self.bus.remove_connection(0xFFFF);
    }

    fn service_interrupts(&mut self) {
        let outcome = {
            let mut interrupts = self.interrupts.borrow_mut();
            interrupts.service(&mut self.registers, &mut self.state, &mut self.bus)
        };
        match outcome {
            ServiceOutcome::Idle => {}
            ServiceOutcome::WokeWithoutVector => self.cycles_remaining = 4,
            ServiceOutcome::Vectored { from_halt, .. } => {
                self.cycles_remaining = if from_halt { 24 } else { 20 };
            }
        }
    }

    fn fetch_and_execute(&mut self) -> Result<(), CoreError> {
        let pc = self.registers.pc;
        let opcode = self.bus.read(pc).ok_or(CoreError::UnmappedRead { address: pc })?;
        log::trace!("fetch {opcode:#04X} at {pc:#06X}");

        let (entry, dispatch_byte) = if opcode == 0xCB {
            let cb_pc = pc.wrapping_add(1);
            let cb_opcode =
                self.bus.read(cb_pc).ok_or(CoreError::UnmappedRead { address: cb_pc })?;
            (self.cb_table[cb_opcode as usize], cb_opcode)
        } else {
            (self.primary_table[opcode as usize], opcode)
        };

        let mut ctx = Context {
            registers: &mut self.registers,
            bus: &mut self.bus,
            interrupts: Rc::clone(&self.interrupts),
            state: &mut self.state,
        };
        let outcome = (entry.handler)(&mut ctx, dispatch_byte)?;

        if !outcome.pc_written {
            self.registers.pc = pc.wrapping_add(u16::from(entry.size));
        }
        self.cycles_remaining = u32::from(entry.base_cycles) + u32::from(outcome.extra_cycles);
        Ok(())
    }

    fn tick_once(&mut self) {
        let mut interrupts = self.interrupts.borrow_mut();
        self.timer.borrow_mut().tick(&mut interrupts);
        self.cycles_remaining = self.cycles_remaining.saturating_sub(1);
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interrupts::InterruptType;

    fn test_emulator() -> Emulator {
        let mut emulator = Emulator::new();

        let ram = Rc::new(RefCell::new(vec![0u8; 0xFF00]));
        let read_ram = Rc::clone(&ram);
        let write_ram = Rc::clone(&ram);
        emulator
            .bus_mut()
            .add_connection(
                0x0000,
                0xFF00,
                move |offset| read_ram.borrow()[offset as usize],
                move |offset, value| write_ram.borrow_mut()[offset as usize] = value,
            )
            .unwrap();

        let hram = Rc::new(RefCell::new([0u8; 0x7E]));
        let read_hram = Rc::clone(&hram);
        let write_hram = Rc::clone(&hram);
        emulator
            .bus_mut()
            .add_connection(
                0xFF80,
                0x7E,
                move |offset| read_hram.borrow()[offset as usize],
                move |offset, value| write_hram.borrow_mut()[offset as usize] = value,
            )
            .unwrap();

        emulator
    }

    #[test]
    fn call_then_ret_round_trips_through_the_stack() {
        let mut emulator = test_emulator();
        emulator.registers.sp = 0xFFFE;
        emulator.registers.pc = 0x0100;
        emulator.bus_mut().write(0x0100, 0xCD);
        emulator.bus_mut().write(0x0101, 0x34);
        emulator.bus_mut().write(0x0102, 0x12);
        emulator.bus_mut().write(0x1234, 0xC9);

        emulator.step().unwrap();
        assert_eq!(emulator.registers.pc, 0x1234);
        assert_eq!(emulator.registers.sp, 0xFFFC);
        assert_eq!(emulator.bus_mut().read(0xFFFC), Some(0x03));
        assert_eq!(emulator.bus_mut().read(0xFFFD), Some(0x01));

        emulator.step().unwrap();
        assert_eq!(emulator.registers.pc, 0x0103);
        assert_eq!(emulator.registers.sp, 0xFFFE);
    }

    #[test]
    fn zero_flag_on_inc() {
        let mut emulator = test_emulator();
        emulator.registers.pc = 0x0100;
        emulator.registers.a = 0xFF;
        emulator.bus_mut().write(0x0100, 0x3C); // INC A

        emulator.step().unwrap();
        assert_eq!(emulator.registers.a, 0x00);
        assert!(emulator.registers.f.zero);
        assert!(!emulator.registers.f.subtract);
        assert!(emulator.registers.f.half_carry);
    }

    #[test]
    fn half_carry_on_add() {
        let mut emulator = test_emulator();
        emulator.registers.pc = 0x0100;
        emulator.registers.a = 0x0F;
        emulator.registers.b = 0x01;
        emulator.bus_mut().write(0x0100, 0x80); // ADD A,B

        emulator.step().unwrap();
        assert_eq!(emulator.registers.a, 0x10);
        assert!(!emulator.registers.f.zero);
        assert!(!emulator.registers.f.subtract);
        assert!(emulator.registers.f.half_carry);
        assert!(!emulator.registers.f.carry);
    }

    #[test]
    fn sub_borrow_on_cp() {
        let mut emulator = test_emulator();
        emulator.registers.pc = 0x0100;
        emulator.registers.a = 0x10;
        emulator.registers.b = 0x01;
        emulator.bus_mut().write(0x0100, 0xB8); // CP A,B

        emulator.step().unwrap();
        assert_eq!(emulator.registers.a, 0x10, "CP must not mutate A");
        assert!(!emulator.registers.f.zero);
        assert!(emulator.registers.f.subtract);
        assert!(emulator.registers.f.half_carry);
        assert!(!emulator.registers.f.carry);
    }

    #[test]
    fn ei_defers_dispatch_until_after_the_following_instruction() {
        let mut emulator = test_emulator();
        emulator.registers.sp = 0xFFFE;
        emulator.registers.pc = 0x0100;
        emulator.bus_mut().write(0x0100, 0xFB); // EI
        emulator.bus_mut().write(0x0101, 0x00); // NOP
        emulator.bus_mut().write(0xFFFF, InterruptType::Timer.mask());
        emulator.bus_mut().write(0xFF0F, InterruptType::Timer.mask());

        emulator.step().unwrap(); // EI itself
        assert_eq!(emulator.registers.pc, 0x0101);
        assert!(!emulator.interrupts.borrow().ime());

        emulator.step().unwrap(); // NOP: still no vectoring
        assert_eq!(emulator.registers.pc, 0x0102);
        assert!(!emulator.interrupts.borrow().ime());

        emulator.step().unwrap(); // next idle boundary: dispatches
        assert_eq!(emulator.registers.pc, InterruptType::Timer.vector());
        assert!(!emulator.interrupts.borrow().ime());
        assert!(!emulator.interrupts.borrow().has_pending());
    }

    #[test]
    fn invalid_opcode_is_fatal() {
        let mut emulator = test_emulator();
        emulator.registers.pc = 0x0100;
        emulator.bus_mut().write(0x0100, 0xD3); // unassigned in the primary table

        let error = emulator.step().unwrap_err();
        assert!(matches!(error, CoreError::InvalidOpcode { opcode: 0xD3, .. }));
    }

    #[test]
    fn unmapped_fetch_is_fatal() {
        let mut emulator = Emulator::new();
        emulator.registers.pc = 0x9ABC; // nothing registered there
        let error = emulator.step().unwrap_err();
        assert!(matches!(error, CoreError::UnmappedRead { address: 0x9ABC }));
    }
}
