//! Core types for cycle-synchronous NES emulation.
//!
//! Everything is driven by a single master cycle counter. On NTSC
//! hardware the master crystal runs at 21,477,272 Hz; the CPU divides it
//! by 12 and the PPU by 4, so one CPU cycle always equals three PPU dots.
//! The scalar types here keep those two clock domains from mixing.

mod bus;
mod ticks;

pub use bus::Bus;
pub use ticks::{MasterCycles, PpuDots};
