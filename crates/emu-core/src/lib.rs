//! Core traits for cycle-accurate 6502-family emulation.
//!
//! Every bus access costs one clock cycle. All component timing derives
//! from that rule; there is no separate cycle ledger.

mod bus;
mod cpu;
mod ram;

pub use bus::Bus;
pub use cpu::Cpu;
pub use ram::RamBus;
