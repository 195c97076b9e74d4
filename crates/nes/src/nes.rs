//! The machine scheduler.
//!
//! [`Nes`] owns the CPU and the bus (which owns everything else) and
//! advances a master cycle counter in CPU-cycle units. Each `step`
//! drives the CPU to the master count and the PPU to three times it, so
//! for any master cycle C every CPU effect up to C is materialised
//! before any PPU dot past 3C, and vice versa. An NMI the PPU raised
//! while catching up is delivered afterwards and taken by the CPU at
//! its next instruction boundary.

use famicore_core::MasterCycles;
use log::{debug, info};
use ricoh_2a03::Ricoh2A03;

use crate::bus::NesBus;
use crate::cartridge::load_ines;
use crate::error::Error;

/// How `load_rom` chooses the initial program counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Start at the mapper's reported code address. Used by test ROM
    /// automation which bypasses the reset handler.
    Direct,
    /// Start at the reset vector stored at `$FFFC`, as hardware does.
    Reset,
}

/// The NES system: CPU, bus and master clock.
pub struct Nes {
    cpu: Ricoh2A03,
    bus: NesBus,
    master: MasterCycles,
    stop_requested: bool,
}

impl Nes {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cpu: Ricoh2A03::new(),
            bus: NesBus::new(),
            master: MasterCycles::ZERO,
            stop_requested: false,
        }
    }

    /// Reset every component to its power-on state. An installed
    /// cartridge stays installed and is re-projected.
    pub fn power_on(&mut self) {
        debug!("power on");
        self.master = MasterCycles::ZERO;
        self.stop_requested = false;
        self.cpu.power_on();
        self.bus.power_on();
    }

    /// Soft reset: RAM survives, the CPU restarts from the reset
    /// vector, the PPU and I/O state clear.
    pub fn reset(&mut self) {
        debug!("reset");
        self.master = MasterCycles::ZERO;
        self.stop_requested = false;
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
    }

    /// Parse an iNES image, install its mapper, and point the CPU at
    /// the entry for `mode`.
    ///
    /// # Errors
    ///
    /// Any [`Error`] from the loader; the scheduler is left powered on
    /// with no cartridge change on failure.
    pub fn load_rom(&mut self, rom: &[u8], mode: ExecMode) -> Result<(), Error> {
        let mapper = load_ines(rom)?;
        let info = mapper.info();

        self.power_on();
        self.bus.install_mapper(mapper);

        let entry = match mode {
            ExecMode::Direct => info.code_addr,
            ExecMode::Reset => self.bus.peek_word(0xFFFC),
        };
        info!("entry point ${entry:04X} ({mode:?})");
        self.cpu.set_pc(entry);
        Ok(())
    }

    /// Advance the master clock by `cycles` and drive both components
    /// to it.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::IllegalOpcode`] in strict mode.
    pub fn step(&mut self, cycles: MasterCycles) -> Result<(), Error> {
        self.master += cycles;

        self.cpu.step_to(&mut self.bus, self.master)?;
        self.bus.ppu_mut().step_to(self.master.to_dots());

        if self.bus.ppu_mut().take_nmi() {
            self.cpu.request_nmi();
        }
        if self.bus.ppu().frame_limit_reached() {
            self.stop_requested = true;
        }
        Ok(())
    }

    /// `load_rom` then tick the master clock until `stop` is requested.
    ///
    /// # Errors
    ///
    /// Loader errors, or [`Error::IllegalOpcode`] in strict mode.
    pub fn run_rom(&mut self, rom: &[u8], mode: ExecMode) -> Result<(), Error> {
        self.load_rom(rom, mode)?;
        self.run()
    }

    /// Copy a raw 6502 program into memory at `addr` and run it. No
    /// cartridge required; used by CPU-level automation.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalOpcode`] in strict mode.
    pub fn run_program(&mut self, program: &[u8], addr: u16) -> Result<(), Error> {
        self.power_on();
        self.bus.mem_mut().set_bytes(addr, program);
        self.cpu.set_pc(addr);
        self.run()
    }

    /// Tick until `stop` is requested.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalOpcode`] in strict mode.
    pub fn run(&mut self) -> Result<(), Error> {
        while !self.stop_requested {
            self.step(MasterCycles::new(1))?;
        }
        Ok(())
    }

    /// Request cooperative stop; every stepping loop exits at its next
    /// safe point.
    pub fn stop(&mut self) {
        self.stop_requested = true;
    }

    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    /// Stop automatically after this many completed frames.
    pub fn set_frame_limit(&mut self, frames: Option<u64>) {
        self.bus.ppu_mut().set_frame_limit(frames);
    }

    /// Make undocumented opcodes fatal.
    pub fn set_strict_opcodes(&mut self, strict: bool) {
        self.cpu.set_strict(strict);
    }

    /// Supply a controller state byte for the coming frame.
    pub fn set_buttons(&mut self, port: usize, state: u8) {
        self.bus.input_mut().set_buttons(port, state);
    }

    /// The last completed frame (256x240 palette indices).
    #[must_use]
    pub fn frame(&self) -> &[u8] {
        self.bus.ppu().frame()
    }

    /// Peek CPU-visible memory without side effects.
    #[must_use]
    pub fn peek(&self, addr: u16) -> u8 {
        self.bus.peek(addr)
    }

    #[must_use]
    pub fn master_cycles(&self) -> MasterCycles {
        self.master
    }

    #[must_use]
    pub fn cpu(&self) -> &Ricoh2A03 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Ricoh2A03 {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &NesBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut NesBus {
        &mut self.bus
    }
}

impl Default for Nes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal NROM image: 16 KiB PRG of NOPs, reset vector at $8000.
    fn nop_rom() -> Vec<u8> {
        let mut rom = vec![0u8; 16 + 0x4000 + 0x2000];
        rom[0..4].copy_from_slice(b"NES\x1a");
        rom[4] = 1; // 16 KiB PRG
        rom[5] = 1; // 8 KiB CHR
        for byte in &mut rom[16..16 + 0x4000] {
            *byte = 0xEA;
        }
        // Reset vector ($FFFC within the $C000 mirror) -> $8000
        rom[16 + 0x3FFC] = 0x00;
        rom[16 + 0x3FFD] = 0x80;
        rom
    }

    #[test]
    fn direct_mode_uses_mapper_code_addr() {
        let mut nes = Nes::new();
        nes.load_rom(&nop_rom(), ExecMode::Direct).unwrap();
        assert_eq!(nes.cpu().pc(), 0xC000);
    }

    #[test]
    fn reset_mode_uses_reset_vector() {
        let mut nes = Nes::new();
        nes.load_rom(&nop_rom(), ExecMode::Reset).unwrap();
        assert_eq!(nes.cpu().pc(), 0x8000);
    }

    #[test]
    fn cpu_and_ppu_stay_in_lockstep() {
        let mut nes = Nes::new();
        nes.load_rom(&nop_rom(), ExecMode::Reset).unwrap();
        for _ in 0..1000 {
            nes.step(MasterCycles::new(1)).unwrap();
        }
        // CPU runs to at least the master count; PPU to exactly 3x.
        assert!(nes.cpu().cycles() >= MasterCycles::new(1000));
        assert_eq!(nes.bus().ppu().dots().get(), 3000);
    }

    #[test]
    fn frame_limit_stops_the_run_loop() {
        let mut nes = Nes::new();
        nes.set_frame_limit(Some(1));
        nes.run_rom(&nop_rom(), ExecMode::Reset).unwrap();
        assert!(nes.stop_requested());
        assert_eq!(nes.bus().ppu().frame_count(), 1);
    }

    #[test]
    fn run_program_executes_without_cartridge() {
        let mut nes = Nes::new();
        // LDA #$42 / STA $0010 / loop: JMP loop ... stopped by frame limit
        nes.set_frame_limit(Some(1));
        nes.run_program(&[0xA9, 0x42, 0x85, 0x10, 0x4C, 0x04, 0x02], 0x0200)
            .unwrap();
        assert_eq!(nes.peek(0x0010), 0x42);
    }

    #[test]
    fn stop_is_cooperative() {
        let mut nes = Nes::new();
        nes.load_rom(&nop_rom(), ExecMode::Reset).unwrap();
        nes.stop();
        nes.run().unwrap(); // returns immediately
        assert!(nes.stop_requested());
    }

    #[test]
    fn soft_reset_preserves_ram() {
        let mut nes = Nes::new();
        nes.load_rom(&nop_rom(), ExecMode::Reset).unwrap();
        nes.bus_mut().mem_mut().write(0x0010, 0x99);
        nes.reset();
        assert_eq!(nes.peek(0x0010), 0x99);
        assert_eq!(nes.cpu().pc(), 0x8000); // from the reset vector
    }
}
