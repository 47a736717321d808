//! The C64 system bus.
//!
//! Implements `emu_core::Bus` over the whole machine. Every CPU access
//! costs one φ2 cycle, and each cycle clocks the VIC and both CIAs in a
//! fixed order before the access's own side effects apply. When the VIC
//! holds BA low (a badline), the access spins — still clocking the
//! peripherals — until the bus is released. That is the entire timing
//! model: there is no separate cycle ledger anywhere.
//!
//! I/O page decode ($D000-$DFFF when the PLA maps it in):
//!
//! | Range       | Device    | Mirror stride |
//! |-------------|-----------|---------------|
//! | $D000-$D3FF | VIC-II    | 64 bytes      |
//! | $D400-$D7FF | SID       | 32 bytes      |
//! | $D800-$DBFF | colour RAM| —             |
//! | $DC00-$DCFF | CIA1      | 16 bytes      |
//! | $DD00-$DDFF | CIA2      | 16 bytes      |
//! | $DE00-$DFFF | expansion | open bus      |

use emu_core::Bus;
use mos_cia_6526::Cia;

use crate::memory::Memory;
use crate::sid::Sid;
use crate::vic::Vic;

/// The C64 bus: memory plus every memory-mapped chip, and the clock.
pub struct SystemBus {
    pub memory: Memory,
    pub vic: Vic,
    pub sid: Sid,
    pub cia1: Cia,
    pub cia2: Cia,
    cycles: u64,
}

impl SystemBus {
    #[must_use]
    pub fn new(memory: Memory, vic: Vic) -> Self {
        Self {
            memory,
            vic,
            sid: Sid::new(),
            cia1: Cia::new(),
            cia2: Cia::new(),
            cycles: 0,
        }
    }

    /// Total φ2 cycles since power-on.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// The wired-OR CPU IRQ input: CIA1 or the VIC.
    #[must_use]
    pub fn irq_line(&self) -> bool {
        self.cia1.irq_asserted() || self.vic.irq_asserted()
    }

    /// The CPU NMI input: CIA2 (the RESTORE key would also land here).
    #[must_use]
    pub fn nmi_line(&self) -> bool {
        self.cia2.irq_asserted()
    }

    /// One φ2 cycle: the video chip and both CIAs advance together.
    fn tick_once(&mut self) {
        self.cycles += 1;
        self.vic.step();
        self.cia1.clock();
        self.cia2.clock();
    }

    /// Spin while the VIC owns the bus. The CIAs keep counting; the
    /// stall is bounded by the badline fetch window.
    fn wait_for_bus(&mut self) {
        while self.vic.ba_low() {
            self.tick_once();
        }
    }

    fn io_read(&mut self, addr: u16) -> u8 {
        match addr {
            0xD000..=0xD3FF => self.vic.read((addr & 0x3F) as u8),
            0xD400..=0xD7FF => self.sid.read((addr & 0x1F) as u8),
            0xD800..=0xDBFF => self.memory.colour_ram_read(addr - 0xD800),
            0xDC00..=0xDCFF => self.cia1.read((addr & 0x0F) as u8),
            0xDD00..=0xDDFF => self.cia2.read((addr & 0x0F) as u8),
            // Expansion area: open bus
            _ => 0xFF,
        }
    }

    fn io_write(&mut self, addr: u16, value: u8) {
        match addr {
            0xD000..=0xD3FF => self.vic.write((addr & 0x3F) as u8, value),
            0xD400..=0xD7FF => self.sid.write((addr & 0x1F) as u8, value),
            0xD800..=0xDBFF => self.memory.colour_ram_write(addr - 0xD800, value),
            0xDC00..=0xDCFF => self.cia1.write((addr & 0x0F) as u8, value),
            0xDD00..=0xDDFF => {
                self.cia2.write((addr & 0x0F) as u8, value);
                // Port A bits 0-1 (inverted) select the VIC bank
                if addr & 0x0F == 0x00 || addr & 0x0F == 0x02 {
                    self.sync_vic_bank();
                }
            }
            // Expansion area: writes disappear
            _ => {}
        }
    }

    fn sync_vic_bank(&mut self) {
        self.vic.set_bank(!self.cia2.port_a_output() & 0x03);
    }

    // =========================================================================
    // Untimed access
    // =========================================================================

    /// Read without a tick, a stall, or device side effects. Used by
    /// loaders and test harnesses to inspect the CPU's view.
    #[must_use]
    pub fn raw_read(&self, addr: u16) -> u8 {
        if (0xD000..=0xDFFF).contains(&addr) && self.memory.io_visible() {
            return match addr {
                0xD000..=0xD3FF => self.vic.peek((addr & 0x3F) as u8),
                0xD400..=0xD7FF => self.sid.read((addr & 0x1F) as u8),
                0xD800..=0xDBFF => self.memory.colour_ram_read(addr - 0xD800),
                0xDC00..=0xDCFF => self.cia1.peek((addr & 0x0F) as u8),
                0xDD00..=0xDDFF => self.cia2.peek((addr & 0x0F) as u8),
                _ => 0xFF,
            };
        }
        self.memory.cpu_read(addr)
    }

    /// Write without a tick or a stall. Device side effects still
    /// apply, so a loader can set up chip registers.
    pub fn raw_write(&mut self, addr: u16, value: u8) {
        if (0xD000..=0xDFFF).contains(&addr) && self.memory.io_visible() {
            self.io_write(addr, value);
        } else {
            self.memory.cpu_write(addr, value);
        }
    }

    /// A VIC fetch: resolve a 14-bit address through the bank selected
    /// by CIA2 port A. No tick — the VIC fetches on its own bus phase.
    #[must_use]
    pub fn vic_read(&self, addr: u16) -> u8 {
        let bank = !self.cia2.port_a_output() & 0x03;
        self.memory.vic_read(bank, addr)
    }
}

impl Bus for SystemBus {
    fn read(&mut self, addr: u16) -> u8 {
        self.wait_for_bus();
        self.tick_once();
        if (0xD000..=0xDFFF).contains(&addr) && self.memory.io_visible() {
            return self.io_read(addr);
        }
        self.memory.cpu_read(addr)
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.wait_for_bus();
        self.tick_once();
        if (0xD000..=0xDFFF).contains(&addr) && self.memory.io_visible() {
            self.io_write(addr, value);
        } else {
            self.memory.cpu_write(addr, value);
        }
    }

    fn tick(&mut self, cycles: u32) {
        for _ in 0..cycles {
            self.tick_once();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::C64Model;

    fn make_bus() -> SystemBus {
        let mut memory = Memory::new();
        memory.load_kernal(&[0xEE; 8192]).unwrap();
        memory.load_basic(&[0xBB; 8192]).unwrap();
        memory.load_chargen(&[0xCC; 4096]).unwrap();
        SystemBus::new(memory, Vic::new(C64Model::Pal))
    }

    #[test]
    fn every_access_costs_one_cycle() {
        let mut bus = make_bus();
        bus.write(0x8000, 0xAB);
        assert_eq!(bus.read(0x8000), 0xAB);
        assert_eq!(bus.cycles(), 2);
    }

    #[test]
    fn raw_access_is_free() {
        let mut bus = make_bus();
        bus.raw_write(0x8000, 0x42);
        assert_eq!(bus.raw_read(0x8000), 0x42);
        assert_eq!(bus.cycles(), 0);
    }

    #[test]
    fn cia_registers_mirror_every_16_bytes() {
        let mut bus = make_bus();
        bus.write(0xDC04, 0x99);
        assert_eq!(bus.read(0xDC04), bus.read(0xDC14));
        assert_eq!(bus.read(0xDC04), bus.read(0xDCF4));

        bus.write(0xDD02, 0x3F);
        assert_eq!(bus.read(0xDD12), 0x3F);
    }

    #[test]
    fn vic_registers_mirror_every_64_bytes() {
        let mut bus = make_bus();
        bus.write(0xD020, 0x07);
        assert_eq!(bus.read(0xD020), bus.read(0xD060));
        assert_eq!(bus.read(0xD020), bus.read(0xD3E0));
    }

    #[test]
    fn expansion_area_is_open_bus() {
        let mut bus = make_bus();
        bus.write(0xDE00, 0x12);
        assert_eq!(bus.read(0xDE00), 0xFF);
        assert_eq!(bus.read(0xDF80), 0xFF);
        assert_eq!(bus.memory.ram_read(0xDE00), 0x00, "the write went nowhere");
    }

    #[test]
    fn colour_ram_via_the_bus() {
        let mut bus = make_bus();
        bus.write(0xD800, 0x21);
        assert_eq!(bus.read(0xD800), 0xF1);
    }

    #[test]
    fn io_invisible_exposes_ram_or_char_rom() {
        let mut bus = make_bus();
        // CHAREN low: reads see the character ROM, writes land in RAM
        bus.write(0x0001, 0x33);
        assert_eq!(bus.read(0xD000), 0xCC);
        bus.write(0xD000, 0x42);
        assert_eq!(bus.memory.ram_read(0xD000), 0x42);

        // All-RAM config
        bus.write(0x0001, 0x30);
        assert_eq!(bus.read(0xD000), 0x42);
    }

    #[test]
    fn cia2_port_a_selects_vic_bank() {
        let mut bus = make_bus();
        // Power-on CIA state drives the port high: %11 -> bank 0
        bus.sync_vic_bank();
        assert_eq!(bus.vic.bank(), 0);

        bus.write(0xDD00, 0xFD); // %01 -> bank 2
        assert_eq!(bus.vic.bank(), 2);

        bus.memory.ram_write(0x8400, 0x5A);
        assert_eq!(bus.vic_read(0x0400), 0x5A, "fetches come from bank 2");
    }

    #[test]
    fn ba_stall_spins_the_clock_until_released() {
        let mut bus = make_bus();
        // Advance to the start of a badline fetch window (power-on
        // $D011: DEN set, yscroll 3 -> line $33, cycle 12)
        bus.tick(0x33 * 63 + 12);
        assert!(bus.vic.ba_low());

        let before = bus.cycles();
        bus.read(0x0002);
        // 43 stall cycles (12..=54) plus the access itself
        assert_eq!(bus.cycles() - before, 44);

        // CIAs kept counting through the stall
        let mut bus = make_bus();
        bus.raw_write(0xDC04, 0xFF);
        bus.raw_write(0xDC05, 0xFF);
        bus.write(0xDC0E, 0x01); // start Timer A
        let timer_before = u16::from_le_bytes([bus.cia1.peek(0x04), bus.cia1.peek(0x05)]);
        bus.tick(0x33 * 63 + 12 - u32::try_from(bus.cycles()).unwrap());
        assert!(bus.vic.ba_low());
        let stall_start = u16::from_le_bytes([bus.cia1.peek(0x04), bus.cia1.peek(0x05)]);
        bus.read(0x0002);
        let after = u16::from_le_bytes([bus.cia1.peek(0x04), bus.cia1.peek(0x05)]);
        assert!(timer_before >= stall_start);
        assert_eq!(u32::from(stall_start - after), 44, "timer counted the stall");
    }
}
