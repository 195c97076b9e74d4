//! Cycle-synchronous NES machine core.
//!
//! The NTSC master crystal runs at 21,477,272 Hz. The CPU divides it by
//! 12 (1,789,773 Hz) and the PPU by 4 (5,369,318 Hz), so one CPU cycle
//! is exactly three PPU dots. The scheduler in [`Nes`] counts master
//! cycles in CPU units and steps the CPU and PPU to the same point in
//! time; one frame is 341 dots x 262 scanlines = 89,342 dots, less one
//! dot on odd frames while background rendering is on.
//!
//! The core consumes an iNES image and per-frame controller bytes, and
//! produces 256x240 frames of 8-bit palette indices. Mapping palette
//! indices to RGB, windowing, and audio are the presenter's job.

mod apu;
mod bus;
mod cartridge;
mod error;
mod input;
mod mapper;
mod memory;
mod nes;
mod ppu;

pub use bus::NesBus;
pub use cartridge::load_ines;
pub use error::Error;
pub use input::{button, InputPorts};
pub use mapper::{Mapper, MapperInfo, Mirroring};
pub use memory::CpuMemory;
pub use nes::{ExecMode, Nes};
pub use ppu::{Ppu, FB_HEIGHT, FB_WIDTH};

/// NTSC timing constants.
pub mod ntsc {
    /// CPU clock in Hz (crystal / 12).
    pub const CPU_HZ: u32 = 1_789_773;
    /// PPU dots per scanline.
    pub const DOTS_PER_LINE: u16 = 341;
    /// Scanlines per frame, including post-render, VBlank and pre-render.
    pub const LINES_PER_FRAME: u16 = 262;
    /// CPU cycles per frame (341 * 262 / 3, rounded down).
    pub const CYCLES_PER_FRAME: u32 = 29780;
}
