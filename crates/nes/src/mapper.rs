//! Cartridge mappers.
//!
//! Mappers own the PRG and CHR byte vectors and *project* the selected
//! banks into the CPU memory image and the PPU pattern tables with bulk
//! copies. Bank-switch commits re-project the affected window. The bus
//! forwards CPU writes inside the mapper's reported register range to
//! `write_reg`.

use log::debug;

use crate::memory::CpuMemory;
use crate::ppu::Ppu;

const PRG_BANK_16K: usize = 0x4000;
const PRG_BANK_8K: usize = 0x2000;
const CHR_BANK_8K: usize = 0x2000;
const CHR_BANK_4K: usize = 0x1000;
const CHR_BANK_1K: usize = 0x0400;

/// Nametable mirroring arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    SingleScreenLower,
    SingleScreenUpper,
    Vertical,
    Horizontal,
}

impl Mirroring {
    fn from_cartridge_flag(vertical: bool) -> Self {
        if vertical {
            Self::Vertical
        } else {
            Self::Horizontal
        }
    }
}

/// Static facts the scheduler and bus need from a mapper.
#[derive(Debug, Clone, Copy)]
pub struct MapperInfo {
    /// Where direct-execution mode starts running code.
    pub code_addr: u16,
    /// First address of the register window (inclusive).
    pub reg_start: u16,
    /// Last address of the register window (inclusive).
    pub reg_end: u16,
    /// Initial nametable mirroring.
    pub mirroring: Mirroring,
    /// Whether the mapper has a register window at all.
    pub has_registers: bool,
}

/// Cartridge banking logic.
pub trait Mapper: std::fmt::Debug {
    /// Project the initial PRG banks into the CPU memory image.
    fn on_load_ram(&mut self, mem: &mut CpuMemory);

    /// Project the initial CHR banks into the PPU pattern tables.
    fn on_load_ppu(&mut self, ppu: &mut Ppu);

    /// Mapper facts: code entry, register window, mirroring.
    fn info(&self) -> MapperInfo;

    /// CPU write inside the register window. The memory image and PPU
    /// are passed in so bank commits can re-project immediately.
    fn write_reg(&mut self, _addr: u16, _value: u8, _mem: &mut CpuMemory, _ppu: &mut Ppu) {}
}

// =============================================================================
// NROM (mapper 0)
// =============================================================================

/// NROM: no bank switching. 16 KiB PRG is mirrored at $C000.
#[derive(Debug)]
pub struct Nrom {
    prg: Vec<u8>,
    chr: Vec<u8>,
    vertical_mirroring: bool,
}

impl Nrom {
    #[must_use]
    pub fn new(prg: Vec<u8>, chr: Vec<u8>, vertical_mirroring: bool) -> Self {
        Self {
            prg,
            chr,
            vertical_mirroring,
        }
    }
}

impl Mapper for Nrom {
    fn on_load_ram(&mut self, mem: &mut CpuMemory) {
        mem.set_bytes(0x8000, &self.prg);
        if self.prg.len() == PRG_BANK_16K {
            mem.set_bytes(0xC000, &self.prg);
        }
    }

    fn on_load_ppu(&mut self, ppu: &mut Ppu) {
        ppu.load_pattern(0x0000, &self.chr[..CHR_BANK_8K]);
    }

    fn info(&self) -> MapperInfo {
        MapperInfo {
            // With 16 KiB of PRG the image occupies $C000-$FFFF via the
            // mirror, which is where test ROMs expect to start.
            code_addr: if self.prg.len() == PRG_BANK_16K {
                0xC000
            } else {
                0x8000
            },
            reg_start: 0,
            reg_end: 0,
            mirroring: Mirroring::from_cartridge_flag(self.vertical_mirroring),
            has_registers: false,
        }
    }
}

// =============================================================================
// MMC1 (mapper 1)
// =============================================================================

/// MMC1: serial shift-register interface, 16/32 KiB PRG banking,
/// 4/8 KiB CHR banking, software-controlled mirroring.
#[derive(Debug)]
pub struct Mmc1 {
    prg: Vec<u8>,
    chr: Vec<u8>,
    vertical_mirroring: bool,

    /// Serial load latch; five writes fill it LSB-first.
    shift: u8,
    write_count: u8,
    /// Control register: mirroring (0-1), PRG mode (2-3), CHR mode (4).
    control: u8,
    chr_bank_0: u8,
    chr_bank_1: u8,
    prg_bank: u8,
}

impl Mmc1 {
    #[must_use]
    pub fn new(prg: Vec<u8>, chr: Vec<u8>, vertical_mirroring: bool) -> Self {
        Self {
            prg,
            chr,
            vertical_mirroring,
            shift: 0,
            write_count: 0,
            // Power-on: PRG mode 3 (switch $8000, fix last at $C000).
            control: 0x0C,
            chr_bank_0: 0,
            chr_bank_1: 0,
            prg_bank: 0,
        }
    }

    fn prg_bank_count(&self) -> usize {
        self.prg.len() / PRG_BANK_16K
    }

    fn prg_slice(&self, bank: usize) -> &[u8] {
        let bank = bank % self.prg_bank_count();
        &self.prg[bank * PRG_BANK_16K..(bank + 1) * PRG_BANK_16K]
    }

    fn chr_slice(&self, bank_4k: usize) -> &[u8] {
        let banks = self.chr.len() / CHR_BANK_4K;
        let bank = bank_4k % banks;
        &self.chr[bank * CHR_BANK_4K..(bank + 1) * CHR_BANK_4K]
    }

    fn project_prg(&self, mem: &mut CpuMemory) {
        let bank = usize::from(self.prg_bank & 0x0F);
        match (self.control >> 2) & 0x03 {
            // 32 KiB mode: low bit of the bank number is ignored.
            0 | 1 => {
                let bank = bank & !1;
                mem.set_bytes(0x8000, self.prg_slice(bank));
                mem.set_bytes(0xC000, self.prg_slice(bank + 1));
            }
            // Fix first bank at $8000, switch $C000.
            2 => {
                mem.set_bytes(0x8000, self.prg_slice(0));
                mem.set_bytes(0xC000, self.prg_slice(bank));
            }
            // Switch $8000, fix last bank at $C000.
            _ => {
                mem.set_bytes(0x8000, self.prg_slice(bank));
                mem.set_bytes(0xC000, self.prg_slice(self.prg_bank_count() - 1));
            }
        }
    }

    fn project_chr(&self, ppu: &mut Ppu) {
        if self.control & 0x10 == 0 {
            // 8 KiB mode: low bit of the bank number is ignored.
            let bank = usize::from(self.chr_bank_0 & 0x1E);
            ppu.load_pattern(0x0000, self.chr_slice(bank));
            ppu.load_pattern(0x1000, self.chr_slice(bank + 1));
        } else {
            ppu.load_pattern(0x0000, self.chr_slice(usize::from(self.chr_bank_0)));
            ppu.load_pattern(0x1000, self.chr_slice(usize::from(self.chr_bank_1)));
        }
    }

    fn mirroring(&self) -> Mirroring {
        match self.control & 0x03 {
            0 => Mirroring::SingleScreenLower,
            1 => Mirroring::SingleScreenUpper,
            2 => Mirroring::Vertical,
            _ => Mirroring::Horizontal,
        }
    }
}

impl Mapper for Mmc1 {
    fn on_load_ram(&mut self, mem: &mut CpuMemory) {
        self.project_prg(mem);
    }

    fn on_load_ppu(&mut self, ppu: &mut Ppu) {
        self.project_chr(ppu);
    }

    fn info(&self) -> MapperInfo {
        MapperInfo {
            code_addr: 0x8000,
            reg_start: 0x8000,
            reg_end: 0xFFFF,
            mirroring: Mirroring::from_cartridge_flag(self.vertical_mirroring),
            has_registers: true,
        }
    }

    fn write_reg(&mut self, addr: u16, value: u8, mem: &mut CpuMemory, ppu: &mut Ppu) {
        if value & 0x80 != 0 {
            // Reset: clear the latch and force PRG mode 3.
            self.shift = 0;
            self.write_count = 0;
            self.control |= 0x0C;
            self.project_prg(mem);
            return;
        }

        self.shift |= (value & 0x01) << self.write_count;
        self.write_count += 1;
        if self.write_count < 5 {
            return;
        }

        // Fifth write: commit the latch to the register selected by the
        // high address bits.
        let data = self.shift;
        self.shift = 0;
        self.write_count = 0;

        match addr {
            0x8000..=0x9FFF => {
                self.control = data;
                debug!("mmc1 control ${data:02X}");
                ppu.set_mirroring(self.mirroring());
                self.project_prg(mem);
                self.project_chr(ppu);
            }
            0xA000..=0xBFFF => {
                self.chr_bank_0 = data;
                self.project_chr(ppu);
            }
            0xC000..=0xDFFF => {
                self.chr_bank_1 = data;
                self.project_chr(ppu);
            }
            _ => {
                self.prg_bank = data;
                debug!("mmc1 prg bank {}", data & 0x0F);
                self.project_prg(mem);
            }
        }
    }
}

// =============================================================================
// MMC3 (mapper 4)
// =============================================================================

/// MMC3: 8 KiB PRG windows and 1/2 KiB CHR windows behind a bank-select
/// register. The scanline IRQ counter is not implemented; its registers
/// are accepted silently, so games relying on mid-frame IRQs will
/// misrender.
#[derive(Debug)]
pub struct Mmc3 {
    prg: Vec<u8>,
    chr: Vec<u8>,
    vertical_mirroring: bool,

    /// Bank select: sub-register in bits 0-2, PRG mode bit 6, CHR
    /// inversion bit 7.
    bank_select: u8,
    banks: [u8; 8],
    /// Previous PRG mode; starts as a value that is neither 0 nor 0x40
    /// so the first bank-select write always projects.
    prev_prg_mode: u8,
}

impl Mmc3 {
    #[must_use]
    pub fn new(prg: Vec<u8>, chr: Vec<u8>, vertical_mirroring: bool) -> Self {
        Self {
            prg,
            chr,
            vertical_mirroring,
            bank_select: 0,
            // R6/R7 default to the first two banks.
            banks: [0, 2, 4, 5, 6, 7, 0, 1],
            prev_prg_mode: 1,
        }
    }

    fn prg_bank_count(&self) -> usize {
        self.prg.len() / PRG_BANK_8K
    }

    fn prg_slice(&self, bank: usize) -> &[u8] {
        let bank = bank % self.prg_bank_count();
        &self.prg[bank * PRG_BANK_8K..(bank + 1) * PRG_BANK_8K]
    }

    fn chr_slice(&self, bank_1k: usize, len: usize) -> &[u8] {
        let banks = self.chr.len() / CHR_BANK_1K;
        let bank = bank_1k % banks;
        let start = bank * CHR_BANK_1K;
        &self.chr[start..(start + len).min(self.chr.len())]
    }

    fn prg_mode(&self) -> u8 {
        self.bank_select & 0x40
    }

    fn project_prg(&self, mem: &mut CpuMemory) {
        let last = self.prg_bank_count() - 1;
        let second_last = last - 1;
        let r6 = usize::from(self.banks[6]);
        let r7 = usize::from(self.banks[7]);

        let layout = if self.prg_mode() == 0 {
            [r6, r7, second_last, last]
        } else {
            [second_last, r7, r6, last]
        };

        for (slot, bank) in layout.into_iter().enumerate() {
            let addr = 0x8000 + (slot * PRG_BANK_8K) as u16;
            mem.set_bytes(addr, self.prg_slice(bank));
        }
    }

    fn project_chr(&self, ppu: &mut Ppu) {
        // R0/R1 select 2 KiB windows (low bit ignored), R2-R5 1 KiB.
        // CHR inversion swaps the $0000 and $1000 halves.
        let base = if self.bank_select & 0x80 == 0 { 0x0000 } else { 0x1000 };
        let alt = base ^ 0x1000;

        ppu.load_pattern(base, self.chr_slice(usize::from(self.banks[0] & 0xFE), 2 * CHR_BANK_1K));
        ppu.load_pattern(
            base + 0x0800,
            self.chr_slice(usize::from(self.banks[1] & 0xFE), 2 * CHR_BANK_1K),
        );
        for (i, reg) in (2usize..6).enumerate() {
            ppu.load_pattern(
                alt + (i * CHR_BANK_1K) as u16,
                self.chr_slice(usize::from(self.banks[reg]), CHR_BANK_1K),
            );
        }
    }
}

impl Mapper for Mmc3 {
    fn on_load_ram(&mut self, mem: &mut CpuMemory) {
        self.project_prg(mem);
        self.prev_prg_mode = self.prg_mode();
    }

    fn on_load_ppu(&mut self, ppu: &mut Ppu) {
        self.project_chr(ppu);
    }

    fn info(&self) -> MapperInfo {
        MapperInfo {
            code_addr: 0x8000,
            reg_start: 0x8000,
            reg_end: 0xFFFF,
            mirroring: Mirroring::from_cartridge_flag(self.vertical_mirroring),
            has_registers: true,
        }
    }

    fn write_reg(&mut self, addr: u16, value: u8, mem: &mut CpuMemory, ppu: &mut Ppu) {
        match (addr, addr & 1) {
            (0x8000..=0x9FFF, 0) => {
                self.bank_select = value;
                if self.prg_mode() != self.prev_prg_mode {
                    self.prev_prg_mode = self.prg_mode();
                    self.project_prg(mem);
                }
            }
            (0x8000..=0x9FFF, _) => {
                self.banks[usize::from(self.bank_select & 0x07)] = value;
                if self.bank_select & 0x07 >= 6 {
                    self.project_prg(mem);
                } else {
                    self.project_chr(ppu);
                }
            }
            (0xA000..=0xBFFF, 0) => {
                let mirroring = if value & 1 == 0 {
                    Mirroring::Vertical
                } else {
                    Mirroring::Horizontal
                };
                ppu.set_mirroring(mirroring);
            }
            // PRG-RAM protect and the four IRQ registers (latch, reload,
            // disable, enable) are accepted without effect.
            _ => {}
        }
    }
}
