//! Cycle-accurate Commodore 64 core.
//!
//! The three subsystems that define the machine's observable behaviour
//! at the bus-cycle level:
//!
//! - the 6510 CPU (via the `mos-6510` crate) with its on-chip port at
//!   $00/$01 driving the PLA banking
//! - the PLA memory map: 64K RAM, BASIC/Kernal/character ROMs, colour
//!   RAM and the I/O page, resolved per access
//! - two CIA 6526 chips (via `mos-cia-6526`) on the IRQ and NMI lines
//!
//! The VIC-II and SID participate at register level: the VIC as a
//! raster/BA/IRQ source, the SID as a register file. Rendering and
//! synthesis are external collaborators.
//!
//! # ROMs
//!
//! The core does no file I/O; the host loads the 8K BASIC, 8K Kernal
//! and 4K character images into [`C64Config`] before construction.

mod bus;
mod c64;
mod config;
mod memory;
mod port;
mod sid;
mod vic;

pub use bus::SystemBus;
pub use c64::{C64, FrameHook};
pub use config::{C64Config, C64Model};
pub use memory::Memory;
pub use port::CpuPort;
pub use sid::Sid;
pub use vic::Vic;
