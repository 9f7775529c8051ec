//! Interrupt controller: IME, IF, IE, and the EI/DI one-instruction commit delay.
//!
//! Grounded on `original_source/src/interrupts.c`'s `handle_interrups` for the dispatch
//! algorithm and priority order, generalized from jgenesis `gb-core`'s `InterruptType` /
//! `InterruptRegisters` split (`backend/gb-core/src/sm83.rs`, `interrupts.rs`) into one
//! owned component.

#[cfg(feature = "bincode")]
use bincode::{Decode, Encode};

use crate::bus::Bus;
use crate::cpu::CpuState;
use crate::registers::Registers;

/// In descending priority order, matching the fixed vector table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptType {
    VBlank,
    Lcd,
    Timer,
    Serial,
    Joypad,
}

impl InterruptType {
    pub const ALL: [Self; 5] = [Self::VBlank, Self::Lcd, Self::Timer, Self::Serial, Self::Joypad];

    #[must_use]
    pub fn mask(self) -> u8 {
        match self {
            Self::VBlank => 1 << 0,
            Self::Lcd => 1 << 1,
            Self::Timer => 1 << 2,
            Self::Serial => 1 << 3,
            Self::Joypad => 1 << 4,
        }
    }

    #[must_use]
    pub fn vector(self) -> u16 {
        match self {
            Self::VBlank => 0x0040,
            Self::Lcd => 0x0048,
            Self::Timer => 0x0050,
            Self::Serial => 0x0058,
            Self::Joypad => 0x0060,
        }
    }

    /// The lowest-index (highest-priority) interrupt present in `bits`.
    #[must_use]
    pub fn from_pending_bits(bits: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| bits & ty.mask() != 0)
    }
}

/// Outcome of one `service` call, used by the CPU loop to decide how many cycles to
/// charge and whether to proceed to a normal fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceOutcome {
    /// Nothing to do; proceed to fetch/decode/execute if `state == Normal`.
    Idle,
    /// HALT woke without dispatching (IME was 0). Charge 4 cycles.
    WokeWithoutVector,
    /// An interrupt was dispatched. Charge 20 cycles, or 24 if `from_halt`.
    Vectored { interrupt: InterruptType, from_halt: bool },
}

/// Two-stage delay counter implementing "EI/DI take effect after the following
/// instruction". A plain boolean can't express this: the commit must happen on the
/// *second* scheduling point after the opcode runs, not the first, so that the
/// instruction immediately following EI/DI still observes the old IME value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
struct PendingToggle(u8);

impl PendingToggle {
    fn schedule(&mut self) {
        self.0 = 1;
    }

    fn cancel(&mut self) {
        self.0 = 0;
    }

    /// Advances the counter by one scheduling point. Returns `true` exactly once, on the
    /// call where the toggle should commit.
    fn advance(&mut self) -> bool {
        match self.0 {
            0 => false,
            1 => {
                self.0 = 2;
                false
            }
            _ => {
                self.0 = 0;
                true
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "bincode", derive(Encode, Decode))]
pub struct InterruptController {
    ime: bool,
    if_bits: u8,
    ie_bits: u8,
    ei_pending: PendingToggle,
    di_pending: PendingToggle,
}

impl InterruptController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn ime(&self) -> bool {
        self.ime
    }

    /// Read the IF register: the three unused high bits read as ones by convention.
    #[must_use]
    pub fn read_if(&self) -> u8 {
        self.if_bits | 0xE0
    }

    pub fn write_if(&mut self, value: u8) {
        self.if_bits = value & 0x1F;
    }

    /// Read the IE register; the high bits are don't-care and read back as written.
    #[must_use]
    pub fn read_ie(&self) -> u8 {
        self.ie_bits
    }

    pub fn write_ie(&mut self, value: u8) {
        self.ie_bits = value & 0x1F;
    }

    pub fn request(&mut self, interrupt: InterruptType) {
        self.if_bits |= interrupt.mask();
    }

    #[must_use]
    pub fn pending_mask(&self) -> u8 {
        self.if_bits & self.ie_bits & 0x1F
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending_mask() != 0
    }

    /// EI: schedules IME←1 after the following instruction.
    pub fn schedule_enable(&mut self) {
        self.ei_pending.schedule();
    }

    /// DI: schedules IME←0 after the following instruction.
    pub fn schedule_disable(&mut self) {
        self.di_pending.schedule();
    }

    /// RETI sets IME immediately, with no one-instruction delay, unlike EI.
    pub fn enable_immediately(&mut self) {
        self.ime = true;
        self.ei_pending.cancel();
        self.di_pending.cancel();
    }

    /// Advances both pending counters by one scheduling point. If EI and DI were both
    /// scheduled and commit on the same call, DI wins (processed second, below) since it
    /// is the one a program would expect to take priority when issued after EI.
    fn advance_pending(&mut self) {
        if self.ei_pending.advance() {
            self.ime = true;
        }
        if self.di_pending.advance() {
            self.ime = false;
        }
    }

    /// Runs the dispatch algorithm once, at a scheduling point immediately before fetch.
    /// May mutate `registers` (pushing PC) and `state` (waking from HALT).
    pub fn service(&mut self, registers: &mut Registers, state: &mut CpuState, bus: &mut Bus) -> ServiceOutcome {
        self.advance_pending();

        let pending = self.pending_mask();

        if self.ime && pending != 0 {
            let interrupt =
                InterruptType::from_pending_bits(pending).expect("pending != 0 implies a set bit");

            registers.decrement_sp();
            registers.decrement_sp();
            let pushed = bus.write_u16(registers.sp, registers.pc);
            debug_assert!(pushed, "interrupt vector push must target mapped stack RAM");

            registers.pc = interrupt.vector();
            self.if_bits &= !interrupt.mask();
            self.ime = false;

            let from_halt = *state == CpuState::Halt;
            *state = CpuState::Normal;

            log::trace!("Dispatching interrupt {interrupt:?} -> {:#06X}", interrupt.vector());

            return ServiceOutcome::Vectored { interrupt, from_halt };
        }

        if *state == CpuState::Halt && pending != 0 {
            *state = CpuState::Normal;
            log::debug!("HALT woke without vectoring (IME=0, pending={pending:#04X})");
            return ServiceOutcome::WokeWithoutVector;
        }

        ServiceOutcome::Idle
    }
}
