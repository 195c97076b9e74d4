//! Memory bus interface.

/// Memory and I/O bus as seen by the CPU.
///
/// The bus handles address decoding and routing to RAM, peripherals and
/// the cartridge. The CPU is generic over this trait so it can run
/// against a plain 64 KiB test image as well as the full machine.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, addr: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, addr: u16, value: u8);

    /// Read a little-endian 16-bit word.
    fn read_word(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr);
        let hi = self.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Take a pending OAM-DMA request (the page written to `$4014`), if
    /// one occurred since the last call. The CPU polls this at each
    /// instruction boundary and performs the stalled transfer itself.
    fn take_oam_dma(&mut self) -> Option<u8> {
        None
    }

    /// Deliver one byte into sprite memory during an OAM-DMA transfer.
    /// The destination address is the sprite memory's current address
    /// register, which advances (with wrap) per byte.
    fn oam_dma_write(&mut self, _value: u8) {}
}
