//! C64 configuration: model timing and ROM images.

/// C64 model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum C64Model {
    /// PAL C64 (6569 VIC-II, 985,248 Hz CPU).
    #[default]
    Pal,
    /// NTSC C64 (6567 VIC-II, 1,022,727 Hz CPU).
    Ntsc,
}

impl C64Model {
    /// CPU clock frequency in Hz.
    #[must_use]
    pub const fn cpu_clock(self) -> u32 {
        match self {
            C64Model::Pal => 985_248,
            C64Model::Ntsc => 1_022_727,
        }
    }

    /// CPU cycles per raster line.
    #[must_use]
    pub const fn cycles_per_line(self) -> u16 {
        match self {
            C64Model::Pal => 63,
            C64Model::Ntsc => 65,
        }
    }

    /// Raster lines per frame.
    #[must_use]
    pub const fn lines_per_frame(self) -> u16 {
        match self {
            C64Model::Pal => 312,
            C64Model::Ntsc => 263,
        }
    }

    /// CPU cycles per frame.
    #[must_use]
    pub const fn cycles_per_frame(self) -> u32 {
        self.cycles_per_line() as u32 * self.lines_per_frame() as u32
    }

    /// Frames per second.
    #[must_use]
    pub const fn fps(self) -> f32 {
        match self {
            C64Model::Pal => 50.125,
            C64Model::Ntsc => 59.826,
        }
    }
}

/// Configuration for constructing a C64 instance.
///
/// The ROM images come from an external loader; construction fails if
/// any of them has the wrong size.
pub struct C64Config {
    /// Model variant.
    pub model: C64Model,
    /// Kernal ROM (8,192 bytes, mapped at $E000-$FFFF).
    pub kernal_rom: Vec<u8>,
    /// BASIC ROM (8,192 bytes, mapped at $A000-$BFFF).
    pub basic_rom: Vec<u8>,
    /// Character ROM (4,096 bytes, mapped at $D000-$DFFF).
    pub char_rom: Vec<u8>,
}
