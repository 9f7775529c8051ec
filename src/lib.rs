//! Sharp SM83 (Game Boy DMG) CPU core.
//!
//! [`Emulator`] owns the register file, an address-decoded [`bus::Bus`], the
//! [`interrupts::InterruptController`], and the [`timer::Timer`], and drives the
//! fetch/decode/execute loop one dispatched instruction at a time via [`Emulator::step`].
//! A host registers its own ROM/RAM/PPU/APU/joypad connections on [`Emulator::bus_mut`]
//! before calling `step`/`run`; this crate owns none of that memory.
//!
//! Enable the `bincode` feature to derive `Encode`/`Decode` on the state types, for save
//! states.

pub mod bus;
pub mod cpu;
pub mod error;
pub mod interrupts;
pub(crate) mod opcodes;
pub mod registers;
pub mod timer;

pub use bus::Bus;
pub use cpu::{CpuState, Emulator};
pub use error::CoreError;
pub use interrupts::{InterruptController, InterruptType};
pub use registers::{Flags, Registers};
pub use timer::Timer;
