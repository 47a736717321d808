//! 6510 addressing modes.
//!
//! The 6502 core has 13 addressing modes:
//! - Implied: no operand (CLC, RTS, ...)
//! - Accumulator: operates on A (ASL A, ...)
//! - Immediate: #$nn
//! - Zero page: $nn
//! - Zero page,X / zero page,Y: $nn,X — the add wraps within page zero
//! - Absolute: $nnnn
//! - Absolute,X / absolute,Y: $nnnn,X — may cross a page
//! - Indirect: ($nnnn), JMP only, with the page-wrap bug
//! - Indexed indirect: ($nn,X)
//! - Indirect indexed: ($nn),Y
//! - Relative: branch offset, -128..+127
//!
//! Every cycle of an instruction is a bus access, so the helpers here
//! perform the same dummy reads the silicon does: the wasted read during
//! a zero-page index add, the wrong-page read when an index crosses a
//! page, the re-read of the instruction stream on a taken branch. The
//! machine observes those accesses (they matter for clear-on-read I/O
//! registers), and the cycle count of an instruction is exactly the
//! number of accesses it performed.

use crate::Mos6510;
use emu_core::Bus;

impl Mos6510 {
    /// Fetch the byte at PC and increment PC.
    pub(crate) fn fetch(&mut self, bus: &mut impl Bus) -> u8 {
        let value = bus.read(self.pc);
        self.pc = self.pc.wrapping_add(1);
        value
    }

    /// Fetch a little-endian word at PC.
    pub(crate) fn fetch_word(&mut self, bus: &mut impl Bus) -> u16 {
        let low = self.fetch(bus);
        let high = self.fetch(bus);
        u16::from_le_bytes([low, high])
    }

    /// The second cycle of implied/accumulator opcodes: the 6502 re-reads
    /// the next opcode byte and throws it away.
    pub(crate) fn dummy_fetch(&mut self, bus: &mut impl Bus) {
        bus.read(self.pc);
    }

    /// Read a little-endian word.
    pub(crate) fn read_word(&self, bus: &mut impl Bus, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high = bus.read(addr.wrapping_add(1));
        u16::from_le_bytes([low, high])
    }

    /// Read a word with the 6502 page-wrap bug: if `addr` is $xxFF the
    /// high byte comes from $xx00, not the next page. Used by JMP ($nnnn)
    /// and the zero-page indirect pointer reads.
    pub(crate) fn read_word_page_wrap(&self, bus: &mut impl Bus, addr: u16) -> u16 {
        let low = bus.read(addr);
        let high_addr = (addr & 0xFF00) | (addr.wrapping_add(1) & 0x00FF);
        let high = bus.read(high_addr);
        u16::from_le_bytes([low, high])
    }

    /// Push a byte onto the stack (page 1, SP post-decrement).
    pub(crate) fn push(&mut self, bus: &mut impl Bus, value: u8) {
        bus.write(0x0100 | u16::from(self.sp), value);
        self.sp = self.sp.wrapping_sub(1);
    }

    /// Pull a byte from the stack (SP pre-increment).
    pub(crate) fn pull(&mut self, bus: &mut impl Bus) -> u8 {
        self.sp = self.sp.wrapping_add(1);
        bus.read(0x0100 | u16::from(self.sp))
    }

    /// The dead cycle stack pulls spend incrementing SP: a read of the
    /// current stack slot whose value is discarded.
    pub(crate) fn dummy_stack_read(&mut self, bus: &mut impl Bus) {
        bus.read(0x0100 | u16::from(self.sp));
    }

    /// Push a word, high byte first.
    pub(crate) fn push_word(&mut self, bus: &mut impl Bus, value: u16) {
        self.push(bus, (value >> 8) as u8);
        self.push(bus, value as u8);
    }

    /// Pull a word, low byte first.
    pub(crate) fn pull_word(&mut self, bus: &mut impl Bus) -> u16 {
        let low = self.pull(bus);
        let high = self.pull(bus);
        u16::from_le_bytes([low, high])
    }

    // =========================================================================
    // Addressing mode helpers
    // =========================================================================

    /// Zero page: $nn.
    pub(crate) fn addr_zero_page(&mut self, bus: &mut impl Bus) -> u16 {
        u16::from(self.fetch(bus))
    }

    /// Zero page,X: $nn,X. The index add wraps within page zero and costs
    /// one cycle, spent re-reading the unindexed address.
    pub(crate) fn addr_zero_page_x(&mut self, bus: &mut impl Bus) -> u16 {
        let base = self.fetch(bus);
        bus.read(u16::from(base));
        u16::from(base.wrapping_add(self.x))
    }

    /// Zero page,Y: $nn,Y.
    pub(crate) fn addr_zero_page_y(&mut self, bus: &mut impl Bus) -> u16 {
        let base = self.fetch(bus);
        bus.read(u16::from(base));
        u16::from(base.wrapping_add(self.y))
    }

    /// Absolute: $nnnn.
    pub(crate) fn addr_absolute(&mut self, bus: &mut impl Bus) -> u16 {
        self.fetch_word(bus)
    }

    /// Absolute,X for read instructions. If the index crosses a page the
    /// CPU first reads from the un-carried address; that wasted read is
    /// the +1 penalty cycle. Returns the effective address and whether
    /// the penalty applied.
    pub(crate) fn addr_absolute_x(&mut self, bus: &mut impl Bus) -> (u16, bool) {
        let base = self.fetch_word(bus);
        let addr = base.wrapping_add(u16::from(self.x));
        let crossed = (base & 0xFF00) != (addr & 0xFF00);
        if crossed {
            bus.read((base & 0xFF00) | (addr & 0x00FF));
        }
        (addr, crossed)
    }

    /// Absolute,X for stores and read-modify-write: the wrong-page read
    /// happens whether or not the page crossed.
    pub(crate) fn addr_absolute_x_store(&mut self, bus: &mut impl Bus) -> u16 {
        let base = self.fetch_word(bus);
        let addr = base.wrapping_add(u16::from(self.x));
        bus.read((base & 0xFF00) | (addr & 0x00FF));
        addr
    }

    /// Absolute,Y for read instructions.
    pub(crate) fn addr_absolute_y(&mut self, bus: &mut impl Bus) -> (u16, bool) {
        let base = self.fetch_word(bus);
        let addr = base.wrapping_add(u16::from(self.y));
        let crossed = (base & 0xFF00) != (addr & 0xFF00);
        if crossed {
            bus.read((base & 0xFF00) | (addr & 0x00FF));
        }
        (addr, crossed)
    }

    /// Absolute,Y for stores and read-modify-write.
    pub(crate) fn addr_absolute_y_store(&mut self, bus: &mut impl Bus) -> u16 {
        let base = self.fetch_word(bus);
        let addr = base.wrapping_add(u16::from(self.y));
        bus.read((base & 0xFF00) | (addr & 0x00FF));
        addr
    }

    /// Indexed indirect: ($nn,X). The pointer lives at (operand + X) in
    /// page zero, wrapping within the page; the add costs a wasted read
    /// of the unindexed operand.
    pub(crate) fn addr_indirect_x(&mut self, bus: &mut impl Bus) -> u16 {
        let base = self.fetch(bus);
        bus.read(u16::from(base));
        let ptr = base.wrapping_add(self.x);
        self.read_word_page_wrap(bus, u16::from(ptr))
    }

    /// Indirect indexed: ($nn),Y for read instructions.
    pub(crate) fn addr_indirect_y(&mut self, bus: &mut impl Bus) -> (u16, bool) {
        let ptr = self.fetch(bus);
        let base = self.read_word_page_wrap(bus, u16::from(ptr));
        let addr = base.wrapping_add(u16::from(self.y));
        let crossed = (base & 0xFF00) != (addr & 0xFF00);
        if crossed {
            bus.read((base & 0xFF00) | (addr & 0x00FF));
        }
        (addr, crossed)
    }

    /// Indirect indexed: ($nn),Y for stores and read-modify-write.
    pub(crate) fn addr_indirect_y_store(&mut self, bus: &mut impl Bus) -> u16 {
        let ptr = self.fetch(bus);
        let base = self.read_word_page_wrap(bus, u16::from(ptr));
        let addr = base.wrapping_add(u16::from(self.y));
        bus.read((base & 0xFF00) | (addr & 0x00FF));
        addr
    }

    /// Conditional branch. Not taken: 0 extra cycles. Taken: one cycle
    /// re-reading the instruction stream at the pre-branch PC, and one
    /// more reading the un-carried target if the branch crosses a page.
    /// The page test uses the pre-branch PC.
    pub(crate) fn branch_if(&mut self, bus: &mut impl Bus, condition: bool) -> u32 {
        let offset = self.fetch(bus) as i8;
        if !condition {
            return 0;
        }
        bus.read(self.pc);
        let target = self.pc.wrapping_add(offset as u16);
        let crossed = (self.pc & 0xFF00) != (target & 0xFF00);
        if crossed {
            bus.read((self.pc & 0xFF00) | (target & 0x00FF));
        }
        self.pc = target;
        1 + u32::from(crossed)
    }
}
