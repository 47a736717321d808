//! The 6510's on-chip I/O port at $00 (DDR) and $01 (data).
//!
//! The three low bits drive the PLA banking inputs (LORAM, HIRAM,
//! CHAREN); bits 3-5 belong to the cassette interface; bits 6-7 are not
//! connected and float. Real floating lines decay over milliseconds —
//! here they simply read back the last written value, which makes
//! programs that probe them for randomness deterministic.
//!
//! Bit assignment:
//! - 0: LORAM
//! - 1: HIRAM
//! - 2: CHAREN
//! - 3: cassette motor (output, external hook)
//! - 4: cassette sense (input)
//! - 5: cassette write line (output, external hook)
//! - 6-7: unconnected, sticky

/// Lines with pull-up resistors: undriven bits read high.
const PULLUPS: u8 = 0x2F;

/// External hook for a cassette output line.
pub type LineWriteFn = Box<dyn FnMut(bool)>;

/// The 6510 processor port.
pub struct CpuPort {
    ddr: u8,
    data: u8,
    /// Cassette sense line (bit 4 input); high with no key pressed.
    cassette_sense: bool,
    motor_fn: Option<LineWriteFn>,
    write_line_fn: Option<LineWriteFn>,
}

impl CpuPort {
    pub(crate) fn new() -> Self {
        Self {
            // Power-on defaults: banking and cassette lines as outputs,
            // all ROMs and I/O visible
            ddr: 0x2F,
            data: 0x37,
            cassette_sense: true,
            motor_fn: None,
            write_line_fn: None,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.ddr = 0x2F;
        self.data = 0x37;
    }

    /// Install the cassette motor hook (port bit 3).
    pub fn set_motor_hook(&mut self, hook: LineWriteFn) {
        self.motor_fn = Some(hook);
    }

    /// Install the cassette write-line hook (port bit 5).
    pub fn set_write_line_hook(&mut self, hook: LineWriteFn) {
        self.write_line_fn = Some(hook);
    }

    /// Drive the cassette sense input (port bit 4).
    pub fn set_cassette_sense(&mut self, level: bool) {
        self.cassette_sense = level;
    }

    pub(crate) fn read_ddr(&self) -> u8 {
        self.ddr
    }

    /// Read $01: output bits from the data register, input bits from
    /// the pins (pull-ups high, sense from the cassette), and the two
    /// unconnected bits sticky at their last written value.
    pub(crate) fn read_data(&self) -> u8 {
        let external =
            (PULLUPS & !0x10) | (u8::from(self.cassette_sense) << 4) | (self.data & 0xC0);
        (self.data & self.ddr) | (external & !self.ddr)
    }

    pub(crate) fn write_ddr(&mut self, value: u8) {
        self.ddr = value;
        self.sync_outputs();
    }

    pub(crate) fn write_data(&mut self, value: u8) {
        self.data = value;
        self.sync_outputs();
    }

    /// The banking inputs the PLA sees: driven bits from the data
    /// register, undriven bits pulled high.
    pub(crate) fn banking_bits(&self) -> u8 {
        ((self.data & self.ddr) | (PULLUPS & !self.ddr)) & 0x07
    }

    fn sync_outputs(&mut self) {
        let pins = (self.data & self.ddr) | (PULLUPS & !self.ddr);
        if let Some(hook) = self.motor_fn.as_mut() {
            hook(pins & 0x08 != 0);
        }
        if let Some(hook) = self.write_line_fn.as_mut() {
            hook(pins & 0x20 != 0);
        }
    }
}
