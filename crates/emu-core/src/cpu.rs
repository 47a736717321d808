use crate::Bus;

/// A CPU that executes instructions against a bus.
///
/// The type parameter `B` is the bus type this CPU operates on.
pub trait Cpu<B: Bus> {
    /// Execute one instruction. Returns the cycles consumed, which equals
    /// the number of bus accesses the instruction performed.
    fn step(&mut self, bus: &mut B) -> u32;

    /// Reset the CPU: load the reset vector, set the initial register state.
    fn reset(&mut self, bus: &mut B);

    /// Drive the level-sensitive IRQ input. The line stays asserted until
    /// the caller lowers it; the CPU samples it before each opcode fetch.
    fn set_irq(&mut self, asserted: bool);

    /// Signal a non-maskable interrupt edge. Latched until serviced.
    fn nmi(&mut self);

    /// Current program counter.
    fn pc(&self) -> u16;

    /// True after a JAM opcode has halted the CPU. Cleared by `reset`.
    fn is_jammed(&self) -> bool;
}
