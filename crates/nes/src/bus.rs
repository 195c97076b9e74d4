//! CPU address routing.
//!
//! Memory map:
//! - `$0000-$07FF`: 2 KiB internal RAM, mirrored through `$1FFF`
//! - `$2000-$2007`: PPU registers, mirrored through `$3FFF`
//! - `$4000-$4013`, `$4015`: APU stub
//! - `$4014`: OAM DMA trigger (write-only)
//! - `$4016-$4017`: controller ports ($4017 writes go to the APU)
//! - `$4020-$FFFF`: cartridge space, backed by the mapper-projected
//!   memory image; writes inside the mapper's register window are also
//!   forwarded to the mapper
//!
//! Reads of write-only or unmapped locations return the open-bus value:
//! the low byte of the last value transferred on the bus.

use famicore_core::Bus;

use crate::apu::Apu;
use crate::input::InputPorts;
use crate::mapper::Mapper;
use crate::memory::CpuMemory;
use crate::ppu::Ppu;

/// The NES CPU bus, owning the machine's passive components.
pub struct NesBus {
    mem: CpuMemory,
    ppu: Ppu,
    apu: Apu,
    input: InputPorts,
    mapper: Option<Box<dyn Mapper>>,
    /// Mapper register window, when the mapper has one.
    reg_window: Option<(u16, u16)>,
    /// Pending OAM-DMA page from a `$4014` write.
    oam_dma_page: Option<u8>,
    /// Low byte of the last bus transfer.
    open_bus: u8,
}

impl NesBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            mem: CpuMemory::new(),
            ppu: Ppu::new(),
            apu: Apu::new(),
            input: InputPorts::new(),
            mapper: None,
            reg_window: None,
            oam_dma_page: None,
            open_bus: 0,
        }
    }

    /// Install a cartridge: project its PRG and CHR and record the
    /// register window. Replaces any previous cartridge.
    pub fn install_mapper(&mut self, mut mapper: Box<dyn Mapper>) {
        let info = mapper.info();
        mapper.on_load_ram(&mut self.mem);
        mapper.on_load_ppu(&mut self.ppu);
        self.ppu.set_mirroring(info.mirroring);
        self.reg_window = info
            .has_registers
            .then_some((info.reg_start, info.reg_end));
        self.mapper = Some(mapper);
    }

    /// Power-on: clear everything, drop nothing (the cartridge stays
    /// installed and is re-projected).
    pub fn power_on(&mut self) {
        self.mem.clear();
        self.ppu.power_on();
        self.apu.reset();
        self.input.reset();
        self.oam_dma_page = None;
        self.open_bus = 0;
        if let Some(mapper) = self.mapper.take() {
            self.install_mapper(mapper);
        }
    }

    /// Soft reset: RAM is preserved, the PPU and I/O state cleared.
    pub fn reset(&mut self) {
        self.ppu.reset();
        self.apu.reset();
        self.input.reset();
        self.oam_dma_page = None;
        self.open_bus = 0;
    }

    /// Peek a byte without bus side effects (inspection and tests).
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.mem.read(addr & 0x07FF),
            0x4020..=0xFFFF => self.mem.read(addr),
            _ => 0,
        }
    }

    /// Peek a little-endian word without side effects.
    #[must_use]
    pub fn peek_word(&self, addr: u16) -> u16 {
        let lo = self.peek(addr);
        let hi = self.peek(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub fn ppu(&self) -> &Ppu {
        &self.ppu
    }

    pub fn ppu_mut(&mut self) -> &mut Ppu {
        &mut self.ppu
    }

    pub fn mem(&self) -> &CpuMemory {
        &self.mem
    }

    pub fn mem_mut(&mut self) -> &mut CpuMemory {
        &mut self.mem
    }

    pub fn input_mut(&mut self) -> &mut InputPorts {
        &mut self.input
    }
}

impl Default for NesBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Bus for NesBus {
    fn read(&mut self, addr: u16) -> u8 {
        let value = match addr {
            0x0000..=0x1FFF => self.mem.read(addr & 0x07FF),
            0x2000..=0x3FFF => self.ppu.read_reg(addr & 0x07).unwrap_or(self.open_bus),
            0x4014 => self.open_bus,
            0x4016 | 0x4017 => self.input.read(addr),
            0x4000..=0x4015 => self.apu.read(addr),
            0x4018..=0x401F => self.open_bus,
            0x4020..=0xFFFF => self.mem.read(addr),
        };
        self.open_bus = value;
        value
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.open_bus = value;
        match addr {
            0x0000..=0x1FFF => self.mem.write(addr & 0x07FF, value),
            0x2000..=0x3FFF => self.ppu.write_reg(addr & 0x07, value),
            0x4014 => self.oam_dma_page = Some(value),
            0x4016 => self.input.write(value),
            0x4000..=0x4013 | 0x4015 | 0x4017 => self.apu.write(addr, value),
            0x4018..=0x401F => {}
            0x4020..=0xFFFF => {
                let in_window = self
                    .reg_window
                    .is_some_and(|(start, end)| addr >= start && addr <= end);
                if in_window {
                    if let Some(mapper) = self.mapper.as_deref_mut() {
                        mapper.write_reg(addr, value, &mut self.mem, &mut self.ppu);
                    }
                } else if addr < 0x8000 {
                    // Expansion area and PRG RAM are plain bytes.
                    self.mem.write(addr, value);
                }
                // Writes to ROM without a register window are dropped.
            }
        }
    }

    fn take_oam_dma(&mut self) -> Option<u8> {
        self.oam_dma_page.take()
    }

    fn oam_dma_write(&mut self, value: u8) {
        self.ppu.oam_dma_write(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::Nrom;

    fn loaded_bus() -> NesBus {
        let mut prg = vec![0xEA; 0x4000];
        prg[0] = 0x42;
        let mut bus = NesBus::new();
        bus.install_mapper(Box::new(Nrom::new(prg, vec![0; 0x2000], false)));
        bus
    }

    #[test]
    fn ram_mirrors_every_2k() {
        let mut bus = NesBus::new();
        bus.write(0x0000, 0xAB);
        assert_eq!(bus.read(0x0800), 0xAB);
        assert_eq!(bus.read(0x1000), 0xAB);
        assert_eq!(bus.read(0x1800), 0xAB);
    }

    #[test]
    fn prg_visible_in_cartridge_space() {
        let mut bus = loaded_bus();
        assert_eq!(bus.read(0x8000), 0x42);
        assert_eq!(bus.read(0xC000), 0x42); // 16K mirror
        assert_eq!(bus.read(0x8001), 0xEA);
    }

    #[test]
    fn rom_writes_are_dropped_without_registers() {
        let mut bus = loaded_bus();
        bus.write(0x8000, 0x13);
        assert_eq!(bus.read(0x8000), 0x42);
    }

    #[test]
    fn prg_ram_is_writable() {
        let mut bus = loaded_bus();
        bus.write(0x6000, 0x77);
        assert_eq!(bus.read(0x6000), 0x77);
        assert_eq!(bus.peek(0x6000), 0x77);
    }

    #[test]
    fn ppu_registers_mirror_through_3fff() {
        let mut bus = NesBus::new();
        bus.write(0x2006, 0x21);
        bus.write(0x3FFE, 0x08); // mirror of $2006
        assert_eq!(bus.ppu().vram_addr(), 0x2108);
    }

    #[test]
    fn oam_dma_write_latches_page() {
        let mut bus = NesBus::new();
        bus.write(0x4014, 0x02);
        assert_eq!(bus.take_oam_dma(), Some(0x02));
        assert_eq!(bus.take_oam_dma(), None);
    }

    #[test]
    fn write_only_registers_read_open_bus() {
        let mut bus = NesBus::new();
        bus.write(0x2000, 0x00);
        let _ = bus.read(0x0123); // RAM is zero
        assert_eq!(bus.read(0x2000), 0x00);
        bus.write(0x0200, 0x5A);
        let _ = bus.read(0x0200);
        assert_eq!(bus.read(0x2000), 0x5A); // open bus follows last transfer
        assert_eq!(bus.read(0x4014), 0x5A);
    }

    #[test]
    fn apu_stub_accepts_writes() {
        let mut bus = NesBus::new();
        for addr in 0x4000..=0x4013u16 {
            bus.write(addr, 0xFF);
        }
        bus.write(0x4015, 0x0F);
        bus.write(0x4017, 0x40);
        assert_eq!(bus.read(0x4015), 0x0F);
        assert_eq!(bus.read(0x4000), 0x00);
    }
}
