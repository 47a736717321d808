//! The C64 machine: CPU wired to the system bus.
//!
//! The machine is strictly single-threaded and cooperative. The CPU is
//! the only active component; everything else advances inside the bus
//! tick that each CPU memory access performs. Interrupt lines are
//! sampled between instructions: CIA1 and the VIC wire-OR into IRQ,
//! CIA2 drives NMI (edge-triggered at the CPU).

use emu_core::Cpu;
use mos_6510::Mos6510;

use crate::bus::SystemBus;
use crate::config::{C64Config, C64Model};
use crate::memory::Memory;
use crate::vic::Vic;

/// Called after each completed raster frame.
pub type FrameHook = Box<dyn FnMut()>;

/// A Commodore 64.
pub struct C64 {
    cpu: Mos6510,
    bus: SystemBus,
    model: C64Model,
    /// Previous CIA2 line level, for NMI edge detection.
    nmi_level: bool,
    frame_hook: Option<FrameHook>,
}

impl C64 {
    /// Build a machine from the configuration and reset it. Fails if
    /// any ROM image has the wrong size.
    pub fn new(config: &C64Config) -> Result<Self, String> {
        let mut memory = Memory::new();
        memory.load_kernal(&config.kernal_rom)?;
        memory.load_basic(&config.basic_rom)?;
        memory.load_chargen(&config.char_rom)?;

        let mut c64 = Self {
            cpu: Mos6510::new(),
            bus: SystemBus::new(memory, Vic::new(config.model)),
            model: config.model,
            nmi_level: false,
            frame_hook: None,
        };
        c64.reset();
        Ok(c64)
    }

    /// Hardware reset: chips to power-on state, then the CPU reset
    /// sequence (which loads PC from $FFFC through the banked bus).
    /// RAM contents survive, as on the real machine.
    pub fn reset(&mut self) {
        assert!(self.bus.memory.roms_loaded(), "reset without ROMs loaded");
        self.bus.memory.reset();
        self.bus.vic.reset();
        self.bus.cia1.reset();
        self.bus.cia2.reset();
        self.bus.sid.reset();
        self.nmi_level = false;
        self.cpu.reset(&mut self.bus);
    }

    /// Execute one instruction (or interrupt entry). Returns the cycles
    /// consumed, including any badline stall.
    pub fn step(&mut self) -> u32 {
        self.sync_interrupt_lines();
        self.cpu.step(&mut self.bus)
    }

    /// Run until the VIC completes the current frame. Returns the
    /// cycles consumed. Feeds the CIAs their mains-frequency TOD input
    /// once per frame (the frame rate matches the mains on both PAL and
    /// NTSC machines). Stops early if the CPU jams.
    pub fn run_frame(&mut self) -> u64 {
        let start = self.bus.cycles();
        loop {
            self.step();
            if self.bus.vic.take_frame_complete() {
                self.bus.cia1.tod_input_tick();
                self.bus.cia2.tod_input_tick();
                if let Some(hook) = self.frame_hook.as_mut() {
                    hook();
                }
                break;
            }
            if self.cpu.is_jammed() {
                break;
            }
        }
        self.bus.cycles() - start
    }

    /// Interrupt lines are sampled at instruction boundaries. IRQ is
    /// level-sensitive; NMI fires on the CIA2 line's rising edge only.
    fn sync_interrupt_lines(&mut self) {
        self.cpu.set_irq(self.bus.irq_line());
        let nmi = self.bus.nmi_line();
        if nmi && !self.nmi_level {
            self.cpu.nmi();
        }
        self.nmi_level = nmi;
    }

    /// False once the CPU has executed a JAM opcode; only `reset`
    /// brings the machine back.
    #[must_use]
    pub fn running(&self) -> bool {
        !self.cpu.is_jammed()
    }

    /// Install the end-of-frame hook (renderer notification).
    pub fn set_frame_hook(&mut self, hook: FrameHook) {
        self.frame_hook = Some(hook);
    }

    /// Copy a program into RAM, bypassing banking and the clock.
    pub fn load_ram(&mut self, addr: u16, data: &[u8]) {
        for (i, &byte) in data.iter().enumerate() {
            self.bus.memory.ram_write(addr.wrapping_add(i as u16), byte);
        }
    }

    #[must_use]
    pub fn model(&self) -> C64Model {
        self.model
    }

    #[must_use]
    pub fn cpu(&self) -> &Mos6510 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Mos6510 {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &SystemBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut SystemBus {
        &mut self.bus
    }

    /// Total φ2 cycles since power-on.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.bus.cycles()
    }
}
