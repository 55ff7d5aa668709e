use crate::interrupts::InterruptController;

/// The CPU's view of the address space.
///
/// `read` and `write` are the CPU access path: implementations apply DMA bus
/// locking and any access side effects there. `peek` is the debugger path and
/// must not perturb anything.
pub trait MemoryBus {
    fn read(&mut self, addr: u16) -> u8;

    fn write(&mut self, addr: u16, val: u8);

    /// Side-effect-free read for diagnostics; ignores DMA bus locking.
    fn peek(&self, addr: u16) -> u8;

    /// Bring clocked peripherals forward to `offset` T-cycles into the current
    /// CPU step, ahead of an access made at that point. The host's end-of-step
    /// tick then only covers what is left of the step.
    fn sync(&mut self, _offset: u32) {}

    /// IE/IF state consulted by the CPU at instruction boundaries and during
    /// interrupt dispatch.
    fn interrupts(&mut self) -> &mut InterruptController;
}
