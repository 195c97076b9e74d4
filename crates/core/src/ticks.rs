//! Cycle scalars.
//!
//! `MasterCycles` counts master clock cycles; one master cycle is one CPU
//! cycle. `PpuDots` counts PPU dots; the PPU produces exactly three dots
//! per master cycle on NTSC. Keeping them as distinct types makes a
//! cross-domain comparison or addition a compile error instead of a
//! timing bug.

/// A count of master clock cycles (equal to CPU cycles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MasterCycles(u64);

impl MasterCycles {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The PPU dot count corresponding to this many master cycles.
    #[must_use]
    pub const fn to_dots(self) -> PpuDots {
        PpuDots(self.0 * 3)
    }

    /// True when the cycle count is odd (used for the OAM-DMA stall
    /// parity).
    #[must_use]
    pub const fn is_odd(self) -> bool {
        self.0 & 1 == 1
    }
}

impl core::ops::Add for MasterCycles {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::ops::AddAssign for MasterCycles {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl core::ops::Sub for MasterCycles {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

/// A count of PPU dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PpuDots(u64);

impl PpuDots {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl core::ops::Add for PpuDots {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl core::ops::AddAssign for PpuDots {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl core::ops::Sub for PpuDots {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn master_to_dots_is_three_to_one() {
        assert_eq!(MasterCycles::new(0).to_dots(), PpuDots::ZERO);
        assert_eq!(MasterCycles::new(1).to_dots(), PpuDots::new(3));
        assert_eq!(MasterCycles::new(29780).to_dots(), PpuDots::new(89340));
    }

    #[test]
    fn arithmetic() {
        let a = MasterCycles::new(10) + MasterCycles::new(5);
        assert_eq!(a.get(), 15);
        let mut b = PpuDots::new(3);
        b += PpuDots::new(4);
        assert_eq!(b, PpuDots::new(7));
        // Sub saturates rather than wrapping.
        assert_eq!(MasterCycles::new(1) - MasterCycles::new(2), MasterCycles::ZERO);
    }

    #[test]
    fn odd_parity() {
        assert!(!MasterCycles::new(0).is_odd());
        assert!(MasterCycles::new(513).is_odd());
    }
}
