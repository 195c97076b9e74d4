//! Ricoh 2A03 CPU emulator.
//!
//! The 2A03 is the NES's CPU: an NMOS 6502 core with the decimal mode
//! wired out. The D flag can still be set and tested, but ADC/SBC always
//! compute in binary.
//!
//! This is an instruction-level interpreter with per-opcode cycle
//! accounting. `step_to` runs whole instructions until the cumulative
//! cycle counter reaches a master-clock target, which is how the machine
//! scheduler keeps the CPU and PPU in lockstep. Interrupts are taken at
//! instruction boundaries: NMI is edge-latched, IRQ is level-sensitive
//! and masked by the I flag. An OAM-DMA request posted on the bus stalls
//! the CPU for 513 cycles (514 when triggered on an odd cycle) while the
//! 256-byte transfer runs.
//!
//! Undocumented opcodes are not implemented. By default the well-known
//! NOP-alikes execute as NOPs of their documented width and cycle count
//! (test ROMs rely on them); in strict mode any undocumented opcode is a
//! fatal [`IllegalOpcode`] error.

use famicore_core::{Bus, MasterCycles};
use thiserror::Error;

mod addressing;
mod flags;

use flags::{FLAG_C, FLAG_D, FLAG_I, FLAG_N, FLAG_U, FLAG_V, FLAG_Z};

/// Fatal error for an undocumented opcode in strict mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal opcode ${opcode:02X} at ${pc:04X}")]
pub struct IllegalOpcode {
    /// Address the opcode was fetched from.
    pub pc: u16,
    /// The offending opcode byte.
    pub opcode: u8,
}

/// The Ricoh 2A03 CPU state.
pub struct Ricoh2A03 {
    /// Accumulator.
    pub(crate) a: u8,
    /// X index register.
    pub(crate) x: u8,
    /// Y index register.
    pub(crate) y: u8,
    /// Stack pointer (stack lives in $0100-$01FF).
    pub(crate) sp: u8,
    /// Program counter.
    pub(crate) pc: u16,
    /// Status register (NV-BDIZC).
    pub(crate) p: u8,

    /// Cumulative executed cycles, in master-clock units.
    cycles: MasterCycles,
    /// Edge-latched NMI request.
    nmi_pending: bool,
    /// Level-sensitive IRQ line.
    irq_line: bool,
    /// When set, undocumented opcodes are fatal instead of NOPs.
    strict: bool,
}

impl Ricoh2A03 {
    /// Create a CPU in its power-on state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: 0xFD,
            pc: 0,
            p: 0x24, // I set, bit 5 always 1
            cycles: MasterCycles::ZERO,
            nmi_pending: false,
            irq_line: false,
            strict: false,
        }
    }

    /// Return to the power-on state, clearing the cycle counter.
    pub fn power_on(&mut self) {
        let strict = self.strict;
        *self = Self::new();
        self.strict = strict;
    }

    /// Soft reset: reload PC from the reset vector at `$FFFC/D`, reset
    /// the stack pointer, mask interrupts. A/X/Y survive; the cycle
    /// counter restarts so it stays in step with a restarted scheduler.
    pub fn reset(&mut self, bus: &mut impl Bus) {
        self.pc = bus.read_word(0xFFFC);
        self.sp = 0xFD;
        self.set_flag(FLAG_I, true);
        self.nmi_pending = false;
        self.irq_line = false;
        self.cycles = MasterCycles::ZERO;
    }

    // =========================================================================
    // Register accessors
    // =========================================================================

    #[must_use]
    pub fn pc(&self) -> u16 {
        self.pc
    }

    pub fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }

    #[must_use]
    pub fn a(&self) -> u8 {
        self.a
    }

    #[must_use]
    pub fn x(&self) -> u8 {
        self.x
    }

    #[must_use]
    pub fn y(&self) -> u8 {
        self.y
    }

    #[must_use]
    pub fn sp(&self) -> u8 {
        self.sp
    }

    #[must_use]
    pub fn status(&self) -> u8 {
        self.p
    }

    /// Cumulative executed cycles.
    #[must_use]
    pub fn cycles(&self) -> MasterCycles {
        self.cycles
    }

    /// Latch an NMI edge, serviced at the next instruction boundary.
    pub fn request_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Drive the IRQ line (level-sensitive, masked by the I flag).
    pub fn set_irq(&mut self, asserted: bool) {
        self.irq_line = asserted;
    }

    /// Make undocumented opcodes fatal.
    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    /// Run instructions while the cumulative cycle count is below
    /// `target`.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalOpcode`] when an undocumented opcode is fetched
    /// in strict mode.
    pub fn step_to(&mut self, bus: &mut impl Bus, target: MasterCycles) -> Result<(), IllegalOpcode> {
        while self.cycles < target {
            self.step(bus)?;
        }
        Ok(())
    }

    /// Execute one instruction boundary: a pending interrupt, a pending
    /// OAM-DMA stall, or one instruction.
    ///
    /// # Errors
    ///
    /// Returns [`IllegalOpcode`] when an undocumented opcode is fetched
    /// in strict mode.
    pub fn step(&mut self, bus: &mut impl Bus) -> Result<(), IllegalOpcode> {
        if self.nmi_pending {
            self.nmi_pending = false;
            self.service_interrupt(bus, 0xFFFA);
            return Ok(());
        }

        if self.irq_line && !self.interrupt_disable() {
            self.service_interrupt(bus, 0xFFFE);
            return Ok(());
        }

        if let Some(page) = bus.take_oam_dma() {
            self.oam_dma(bus, page);
            return Ok(());
        }

        let pc = self.pc;
        let opcode = self.fetch(bus);
        let cycles = self.execute(bus, pc, opcode)?;
        self.cycles += MasterCycles::new(u64::from(cycles));
        Ok(())
    }

    /// Push PC and P (B clear), mask interrupts, load the vector. Both
    /// NMI and IRQ take 7 cycles.
    fn service_interrupt(&mut self, bus: &mut impl Bus, vector: u16) {
        self.push_word(bus, self.pc);
        let p = self.status_for_push(false);
        self.push(bus, p);
        self.set_flag(FLAG_I, true);
        self.pc = bus.read_word(vector);
        self.cycles += MasterCycles::new(7);
    }

    /// Perform the OAM-DMA transfer: 256 bytes from `page << 8` into
    /// sprite memory, suspending instruction execution for the full
    /// stall.
    fn oam_dma(&mut self, bus: &mut impl Bus, page: u8) {
        let base = u16::from(page) << 8;
        for i in 0..256u16 {
            let value = bus.read(base | i);
            bus.oam_dma_write(value);
        }
        let stall = if self.cycles.is_odd() { 514 } else { 513 };
        self.cycles += MasterCycles::new(stall);
    }

    // =========================================================================
    // ALU operations
    // =========================================================================

    /// ADC — add with carry. The 2A03 always computes in binary; the D
    /// flag is ignored.
    fn adc(&mut self, value: u8) {
        let a = u16::from(self.a);
        let v = u16::from(value);
        let c = u16::from(self.carry());

        let result = a + v + c;
        let result8 = result as u8;

        self.set_flag(FLAG_C, result > 0xFF);
        self.set_flag(FLAG_V, (self.a ^ result8) & (value ^ result8) & 0x80 != 0);
        self.set_zn(result8);
        self.a = result8;
    }

    /// SBC — subtract with borrow (binary only, as ADC).
    fn sbc(&mut self, value: u8) {
        let a = u16::from(self.a);
        let v = u16::from(value);
        let borrow = u16::from(!self.carry());

        let result = a.wrapping_sub(v).wrapping_sub(borrow);
        let result8 = result as u8;

        self.set_flag(FLAG_C, result < 0x100);
        self.set_flag(FLAG_V, (self.a ^ value) & (self.a ^ result8) & 0x80 != 0);
        self.set_zn(result8);
        self.a = result8;
    }

    /// CMP/CPX/CPY — compare a register against a value.
    fn compare(&mut self, reg: u8, value: u8) {
        let result = reg.wrapping_sub(value);
        self.set_flag(FLAG_C, reg >= value);
        self.set_zn(result);
    }

    /// ASL — arithmetic shift left.
    fn asl(&mut self, value: u8) -> u8 {
        self.set_flag(FLAG_C, value & 0x80 != 0);
        let result = value << 1;
        self.set_zn(result);
        result
    }

    /// LSR — logical shift right.
    fn lsr(&mut self, value: u8) -> u8 {
        self.set_flag(FLAG_C, value & 0x01 != 0);
        let result = value >> 1;
        self.set_zn(result);
        result
    }

    /// ROL — rotate left through carry.
    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = u8::from(self.carry());
        self.set_flag(FLAG_C, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.set_zn(result);
        result
    }

    /// ROR — rotate right through carry.
    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = if self.carry() { 0x80 } else { 0 };
        self.set_flag(FLAG_C, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.set_zn(result);
        result
    }

    /// BIT — bit test.
    fn bit(&mut self, value: u8) {
        self.set_flag(FLAG_Z, self.a & value == 0);
        self.set_flag(FLAG_N, value & 0x80 != 0);
        self.set_flag(FLAG_V, value & 0x40 != 0);
    }

    /// Read-modify-write on a memory operand.
    fn rmw(&mut self, bus: &mut impl Bus, addr: u16, op: fn(&mut Self, u8) -> u8) {
        let value = bus.read(addr);
        let result = op(self, value);
        bus.write(addr, result);
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    #[allow(clippy::too_many_lines)]
    fn execute(&mut self, bus: &mut impl Bus, pc: u16, opcode: u8) -> Result<u32, IllegalOpcode> {
        let cycles = match opcode {
            // =================================================================
            // Load / store
            // =================================================================

            // LDA
            0xA9 => {
                self.a = self.fetch(bus);
                self.set_zn(self.a);
                2
            }
            0xA5 => {
                let addr = self.addr_zero_page(bus);
                self.a = bus.read(addr);
                self.set_zn(self.a);
                3
            }
            0xB5 => {
                let addr = self.addr_zero_page_x(bus);
                self.a = bus.read(addr);
                self.set_zn(self.a);
                4
            }
            0xAD => {
                let addr = self.addr_absolute(bus);
                self.a = bus.read(addr);
                self.set_zn(self.a);
                4
            }
            0xBD => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                self.a = bus.read(addr);
                self.set_zn(self.a);
                4 + u32::from(crossed)
            }
            0xB9 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                self.a = bus.read(addr);
                self.set_zn(self.a);
                4 + u32::from(crossed)
            }
            0xA1 => {
                let addr = self.addr_indexed_indirect(bus);
                self.a = bus.read(addr);
                self.set_zn(self.a);
                6
            }
            0xB1 => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                self.a = bus.read(addr);
                self.set_zn(self.a);
                5 + u32::from(crossed)
            }

            // LDX
            0xA2 => {
                self.x = self.fetch(bus);
                self.set_zn(self.x);
                2
            }
            0xA6 => {
                let addr = self.addr_zero_page(bus);
                self.x = bus.read(addr);
                self.set_zn(self.x);
                3
            }
            0xB6 => {
                let addr = self.addr_zero_page_y(bus);
                self.x = bus.read(addr);
                self.set_zn(self.x);
                4
            }
            0xAE => {
                let addr = self.addr_absolute(bus);
                self.x = bus.read(addr);
                self.set_zn(self.x);
                4
            }
            0xBE => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                self.x = bus.read(addr);
                self.set_zn(self.x);
                4 + u32::from(crossed)
            }

            // LDY
            0xA0 => {
                self.y = self.fetch(bus);
                self.set_zn(self.y);
                2
            }
            0xA4 => {
                let addr = self.addr_zero_page(bus);
                self.y = bus.read(addr);
                self.set_zn(self.y);
                3
            }
            0xB4 => {
                let addr = self.addr_zero_page_x(bus);
                self.y = bus.read(addr);
                self.set_zn(self.y);
                4
            }
            0xAC => {
                let addr = self.addr_absolute(bus);
                self.y = bus.read(addr);
                self.set_zn(self.y);
                4
            }
            0xBC => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                self.y = bus.read(addr);
                self.set_zn(self.y);
                4 + u32::from(crossed)
            }

            // STA (indexed stores always pay the index cycle)
            0x85 => {
                let addr = self.addr_zero_page(bus);
                bus.write(addr, self.a);
                3
            }
            0x95 => {
                let addr = self.addr_zero_page_x(bus);
                bus.write(addr, self.a);
                4
            }
            0x8D => {
                let addr = self.addr_absolute(bus);
                bus.write(addr, self.a);
                4
            }
            0x9D => {
                let (addr, _) = self.addr_absolute_x(bus);
                bus.write(addr, self.a);
                5
            }
            0x99 => {
                let (addr, _) = self.addr_absolute_y(bus);
                bus.write(addr, self.a);
                5
            }
            0x81 => {
                let addr = self.addr_indexed_indirect(bus);
                bus.write(addr, self.a);
                6
            }
            0x91 => {
                let (addr, _) = self.addr_indirect_indexed(bus);
                bus.write(addr, self.a);
                6
            }

            // STX
            0x86 => {
                let addr = self.addr_zero_page(bus);
                bus.write(addr, self.x);
                3
            }
            0x96 => {
                let addr = self.addr_zero_page_y(bus);
                bus.write(addr, self.x);
                4
            }
            0x8E => {
                let addr = self.addr_absolute(bus);
                bus.write(addr, self.x);
                4
            }

            // STY
            0x84 => {
                let addr = self.addr_zero_page(bus);
                bus.write(addr, self.y);
                3
            }
            0x94 => {
                let addr = self.addr_zero_page_x(bus);
                bus.write(addr, self.y);
                4
            }
            0x8C => {
                let addr = self.addr_absolute(bus);
                bus.write(addr, self.y);
                4
            }

            // =================================================================
            // Register transfers
            // =================================================================
            0xAA => {
                self.x = self.a;
                self.set_zn(self.x);
                2
            }
            0xA8 => {
                self.y = self.a;
                self.set_zn(self.y);
                2
            }
            0x8A => {
                self.a = self.x;
                self.set_zn(self.a);
                2
            }
            0x98 => {
                self.a = self.y;
                self.set_zn(self.a);
                2
            }
            0xBA => {
                self.x = self.sp;
                self.set_zn(self.x);
                2
            }
            0x9A => {
                // TXS does not touch flags
                self.sp = self.x;
                2
            }

            // =================================================================
            // Stack
            // =================================================================
            0x48 => {
                self.push(bus, self.a);
                3
            }
            0x08 => {
                let p = self.status_for_push(true);
                self.push(bus, p);
                3
            }
            0x68 => {
                self.a = self.pull(bus);
                self.set_zn(self.a);
                4
            }
            0x28 => {
                let p = self.pull(bus);
                self.set_status_from_stack(p);
                4
            }

            // =================================================================
            // Logical
            // =================================================================

            // AND
            0x29 => {
                let v = self.fetch(bus);
                self.a &= v;
                self.set_zn(self.a);
                2
            }
            0x25 => {
                let addr = self.addr_zero_page(bus);
                self.a &= bus.read(addr);
                self.set_zn(self.a);
                3
            }
            0x35 => {
                let addr = self.addr_zero_page_x(bus);
                self.a &= bus.read(addr);
                self.set_zn(self.a);
                4
            }
            0x2D => {
                let addr = self.addr_absolute(bus);
                self.a &= bus.read(addr);
                self.set_zn(self.a);
                4
            }
            0x3D => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                self.a &= bus.read(addr);
                self.set_zn(self.a);
                4 + u32::from(crossed)
            }
            0x39 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                self.a &= bus.read(addr);
                self.set_zn(self.a);
                4 + u32::from(crossed)
            }
            0x21 => {
                let addr = self.addr_indexed_indirect(bus);
                self.a &= bus.read(addr);
                self.set_zn(self.a);
                6
            }
            0x31 => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                self.a &= bus.read(addr);
                self.set_zn(self.a);
                5 + u32::from(crossed)
            }

            // EOR
            0x49 => {
                let v = self.fetch(bus);
                self.a ^= v;
                self.set_zn(self.a);
                2
            }
            0x45 => {
                let addr = self.addr_zero_page(bus);
                self.a ^= bus.read(addr);
                self.set_zn(self.a);
                3
            }
            0x55 => {
                let addr = self.addr_zero_page_x(bus);
                self.a ^= bus.read(addr);
                self.set_zn(self.a);
                4
            }
            0x4D => {
                let addr = self.addr_absolute(bus);
                self.a ^= bus.read(addr);
                self.set_zn(self.a);
                4
            }
            0x5D => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                self.a ^= bus.read(addr);
                self.set_zn(self.a);
                4 + u32::from(crossed)
            }
            0x59 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                self.a ^= bus.read(addr);
                self.set_zn(self.a);
                4 + u32::from(crossed)
            }
            0x41 => {
                let addr = self.addr_indexed_indirect(bus);
                self.a ^= bus.read(addr);
                self.set_zn(self.a);
                6
            }
            0x51 => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                self.a ^= bus.read(addr);
                self.set_zn(self.a);
                5 + u32::from(crossed)
            }

            // ORA
            0x09 => {
                let v = self.fetch(bus);
                self.a |= v;
                self.set_zn(self.a);
                2
            }
            0x05 => {
                let addr = self.addr_zero_page(bus);
                self.a |= bus.read(addr);
                self.set_zn(self.a);
                3
            }
            0x15 => {
                let addr = self.addr_zero_page_x(bus);
                self.a |= bus.read(addr);
                self.set_zn(self.a);
                4
            }
            0x0D => {
                let addr = self.addr_absolute(bus);
                self.a |= bus.read(addr);
                self.set_zn(self.a);
                4
            }
            0x1D => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                self.a |= bus.read(addr);
                self.set_zn(self.a);
                4 + u32::from(crossed)
            }
            0x19 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                self.a |= bus.read(addr);
                self.set_zn(self.a);
                4 + u32::from(crossed)
            }
            0x01 => {
                let addr = self.addr_indexed_indirect(bus);
                self.a |= bus.read(addr);
                self.set_zn(self.a);
                6
            }
            0x11 => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                self.a |= bus.read(addr);
                self.set_zn(self.a);
                5 + u32::from(crossed)
            }

            // BIT
            0x24 => {
                let addr = self.addr_zero_page(bus);
                let v = bus.read(addr);
                self.bit(v);
                3
            }
            0x2C => {
                let addr = self.addr_absolute(bus);
                let v = bus.read(addr);
                self.bit(v);
                4
            }

            // =================================================================
            // Arithmetic
            // =================================================================

            // ADC
            0x69 => {
                let v = self.fetch(bus);
                self.adc(v);
                2
            }
            0x65 => {
                let addr = self.addr_zero_page(bus);
                let v = bus.read(addr);
                self.adc(v);
                3
            }
            0x75 => {
                let addr = self.addr_zero_page_x(bus);
                let v = bus.read(addr);
                self.adc(v);
                4
            }
            0x6D => {
                let addr = self.addr_absolute(bus);
                let v = bus.read(addr);
                self.adc(v);
                4
            }
            0x7D => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let v = bus.read(addr);
                self.adc(v);
                4 + u32::from(crossed)
            }
            0x79 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                let v = bus.read(addr);
                self.adc(v);
                4 + u32::from(crossed)
            }
            0x61 => {
                let addr = self.addr_indexed_indirect(bus);
                let v = bus.read(addr);
                self.adc(v);
                6
            }
            0x71 => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                let v = bus.read(addr);
                self.adc(v);
                5 + u32::from(crossed)
            }

            // SBC
            0xE9 => {
                let v = self.fetch(bus);
                self.sbc(v);
                2
            }
            0xE5 => {
                let addr = self.addr_zero_page(bus);
                let v = bus.read(addr);
                self.sbc(v);
                3
            }
            0xF5 => {
                let addr = self.addr_zero_page_x(bus);
                let v = bus.read(addr);
                self.sbc(v);
                4
            }
            0xED => {
                let addr = self.addr_absolute(bus);
                let v = bus.read(addr);
                self.sbc(v);
                4
            }
            0xFD => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let v = bus.read(addr);
                self.sbc(v);
                4 + u32::from(crossed)
            }
            0xF9 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                let v = bus.read(addr);
                self.sbc(v);
                4 + u32::from(crossed)
            }
            0xE1 => {
                let addr = self.addr_indexed_indirect(bus);
                let v = bus.read(addr);
                self.sbc(v);
                6
            }
            0xF1 => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                let v = bus.read(addr);
                self.sbc(v);
                5 + u32::from(crossed)
            }

            // CMP
            0xC9 => {
                let v = self.fetch(bus);
                self.compare(self.a, v);
                2
            }
            0xC5 => {
                let addr = self.addr_zero_page(bus);
                let v = bus.read(addr);
                self.compare(self.a, v);
                3
            }
            0xD5 => {
                let addr = self.addr_zero_page_x(bus);
                let v = bus.read(addr);
                self.compare(self.a, v);
                4
            }
            0xCD => {
                let addr = self.addr_absolute(bus);
                let v = bus.read(addr);
                self.compare(self.a, v);
                4
            }
            0xDD => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let v = bus.read(addr);
                self.compare(self.a, v);
                4 + u32::from(crossed)
            }
            0xD9 => {
                let (addr, crossed) = self.addr_absolute_y(bus);
                let v = bus.read(addr);
                self.compare(self.a, v);
                4 + u32::from(crossed)
            }
            0xC1 => {
                let addr = self.addr_indexed_indirect(bus);
                let v = bus.read(addr);
                self.compare(self.a, v);
                6
            }
            0xD1 => {
                let (addr, crossed) = self.addr_indirect_indexed(bus);
                let v = bus.read(addr);
                self.compare(self.a, v);
                5 + u32::from(crossed)
            }

            // CPX
            0xE0 => {
                let v = self.fetch(bus);
                self.compare(self.x, v);
                2
            }
            0xE4 => {
                let addr = self.addr_zero_page(bus);
                let v = bus.read(addr);
                self.compare(self.x, v);
                3
            }
            0xEC => {
                let addr = self.addr_absolute(bus);
                let v = bus.read(addr);
                self.compare(self.x, v);
                4
            }

            // CPY
            0xC0 => {
                let v = self.fetch(bus);
                self.compare(self.y, v);
                2
            }
            0xC4 => {
                let addr = self.addr_zero_page(bus);
                let v = bus.read(addr);
                self.compare(self.y, v);
                3
            }
            0xCC => {
                let addr = self.addr_absolute(bus);
                let v = bus.read(addr);
                self.compare(self.y, v);
                4
            }

            // =================================================================
            // Increments / decrements
            // =================================================================
            0xE6 => {
                let addr = self.addr_zero_page(bus);
                self.rmw(bus, addr, |cpu, v| {
                    let r = v.wrapping_add(1);
                    cpu.set_zn(r);
                    r
                });
                5
            }
            0xF6 => {
                let addr = self.addr_zero_page_x(bus);
                self.rmw(bus, addr, |cpu, v| {
                    let r = v.wrapping_add(1);
                    cpu.set_zn(r);
                    r
                });
                6
            }
            0xEE => {
                let addr = self.addr_absolute(bus);
                self.rmw(bus, addr, |cpu, v| {
                    let r = v.wrapping_add(1);
                    cpu.set_zn(r);
                    r
                });
                6
            }
            0xFE => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.rmw(bus, addr, |cpu, v| {
                    let r = v.wrapping_add(1);
                    cpu.set_zn(r);
                    r
                });
                7
            }
            0xC6 => {
                let addr = self.addr_zero_page(bus);
                self.rmw(bus, addr, |cpu, v| {
                    let r = v.wrapping_sub(1);
                    cpu.set_zn(r);
                    r
                });
                5
            }
            0xD6 => {
                let addr = self.addr_zero_page_x(bus);
                self.rmw(bus, addr, |cpu, v| {
                    let r = v.wrapping_sub(1);
                    cpu.set_zn(r);
                    r
                });
                6
            }
            0xCE => {
                let addr = self.addr_absolute(bus);
                self.rmw(bus, addr, |cpu, v| {
                    let r = v.wrapping_sub(1);
                    cpu.set_zn(r);
                    r
                });
                6
            }
            0xDE => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.rmw(bus, addr, |cpu, v| {
                    let r = v.wrapping_sub(1);
                    cpu.set_zn(r);
                    r
                });
                7
            }
            0xE8 => {
                self.x = self.x.wrapping_add(1);
                self.set_zn(self.x);
                2
            }
            0xC8 => {
                self.y = self.y.wrapping_add(1);
                self.set_zn(self.y);
                2
            }
            0xCA => {
                self.x = self.x.wrapping_sub(1);
                self.set_zn(self.x);
                2
            }
            0x88 => {
                self.y = self.y.wrapping_sub(1);
                self.set_zn(self.y);
                2
            }

            // =================================================================
            // Shifts
            // =================================================================
            0x0A => {
                self.a = self.asl(self.a);
                2
            }
            0x06 => {
                let addr = self.addr_zero_page(bus);
                self.rmw(bus, addr, Self::asl);
                5
            }
            0x16 => {
                let addr = self.addr_zero_page_x(bus);
                self.rmw(bus, addr, Self::asl);
                6
            }
            0x0E => {
                let addr = self.addr_absolute(bus);
                self.rmw(bus, addr, Self::asl);
                6
            }
            0x1E => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.rmw(bus, addr, Self::asl);
                7
            }
            0x4A => {
                self.a = self.lsr(self.a);
                2
            }
            0x46 => {
                let addr = self.addr_zero_page(bus);
                self.rmw(bus, addr, Self::lsr);
                5
            }
            0x56 => {
                let addr = self.addr_zero_page_x(bus);
                self.rmw(bus, addr, Self::lsr);
                6
            }
            0x4E => {
                let addr = self.addr_absolute(bus);
                self.rmw(bus, addr, Self::lsr);
                6
            }
            0x5E => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.rmw(bus, addr, Self::lsr);
                7
            }
            0x2A => {
                self.a = self.rol(self.a);
                2
            }
            0x26 => {
                let addr = self.addr_zero_page(bus);
                self.rmw(bus, addr, Self::rol);
                5
            }
            0x36 => {
                let addr = self.addr_zero_page_x(bus);
                self.rmw(bus, addr, Self::rol);
                6
            }
            0x2E => {
                let addr = self.addr_absolute(bus);
                self.rmw(bus, addr, Self::rol);
                6
            }
            0x3E => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.rmw(bus, addr, Self::rol);
                7
            }
            0x6A => {
                self.a = self.ror(self.a);
                2
            }
            0x66 => {
                let addr = self.addr_zero_page(bus);
                self.rmw(bus, addr, Self::ror);
                5
            }
            0x76 => {
                let addr = self.addr_zero_page_x(bus);
                self.rmw(bus, addr, Self::ror);
                6
            }
            0x6E => {
                let addr = self.addr_absolute(bus);
                self.rmw(bus, addr, Self::ror);
                6
            }
            0x7E => {
                let (addr, _) = self.addr_absolute_x(bus);
                self.rmw(bus, addr, Self::ror);
                7
            }

            // =================================================================
            // Jumps / subroutines
            // =================================================================
            0x4C => {
                self.pc = self.fetch_word(bus);
                3
            }
            0x6C => {
                let ptr = self.fetch_word(bus);
                self.pc = self.read_word_page_bug(bus, ptr);
                5
            }
            0x20 => {
                let target = self.fetch_word(bus);
                // JSR pushes the address of its own last byte
                self.push_word(bus, self.pc.wrapping_sub(1));
                self.pc = target;
                6
            }
            0x60 => {
                self.pc = self.pull_word(bus).wrapping_add(1);
                6
            }
            0x40 => {
                let p = self.pull(bus);
                self.set_status_from_stack(p);
                self.pc = self.pull_word(bus);
                6
            }

            // =================================================================
            // Branches (base 2 cycles; +1 taken, +2 taken across a page)
            // =================================================================
            0x10 => 2 + self.branch_if(bus, !self.get_flag(FLAG_N)),
            0x30 => 2 + self.branch_if(bus, self.get_flag(FLAG_N)),
            0x50 => 2 + self.branch_if(bus, !self.get_flag(FLAG_V)),
            0x70 => 2 + self.branch_if(bus, self.get_flag(FLAG_V)),
            0x90 => 2 + self.branch_if(bus, !self.get_flag(FLAG_C)),
            0xB0 => 2 + self.branch_if(bus, self.get_flag(FLAG_C)),
            0xD0 => 2 + self.branch_if(bus, !self.get_flag(FLAG_Z)),
            0xF0 => 2 + self.branch_if(bus, self.get_flag(FLAG_Z)),

            // =================================================================
            // Flag operations
            // =================================================================
            0x18 => {
                self.set_flag(FLAG_C, false);
                2
            }
            0x38 => {
                self.set_flag(FLAG_C, true);
                2
            }
            0x58 => {
                self.set_flag(FLAG_I, false);
                2
            }
            0x78 => {
                self.set_flag(FLAG_I, true);
                2
            }
            0xB8 => {
                self.set_flag(FLAG_V, false);
                2
            }
            0xD8 => {
                self.set_flag(FLAG_D, false);
                2
            }
            0xF8 => {
                self.set_flag(FLAG_D, true);
                2
            }

            // =================================================================
            // System
            // =================================================================
            0x00 => {
                // BRK pushes the address past its padding byte, then P
                // with the B bit set.
                self.pc = self.pc.wrapping_add(1);
                self.push_word(bus, self.pc);
                let p = self.status_for_push(true);
                self.push(bus, p);
                self.set_flag(FLAG_I, true);
                self.pc = bus.read_word(0xFFFE);
                7
            }
            0xEA => 2,

            // =================================================================
            // Undocumented opcodes
            // =================================================================
            _ => {
                if self.strict {
                    return Err(IllegalOpcode { pc, opcode });
                }
                self.undocumented_nop(bus, opcode)
            }
        };

        // Keep bit 5 pinned; flag stores never clear it but PLP/RTI paths
        // are belt-and-braces'd here too.
        self.p |= 1 << FLAG_U;

        Ok(cycles)
    }

    /// Execute an undocumented opcode as a NOP of the documented width
    /// and cycle count. Opcodes outside the well-known NOP-alike set
    /// consume no operand and take 2 cycles.
    fn undocumented_nop(&mut self, bus: &mut impl Bus, opcode: u8) -> u32 {
        match opcode {
            // Implied single-byte NOPs
            0x1A | 0x3A | 0x5A | 0x7A | 0xDA | 0xFA => 2,
            // Immediate NOPs (skip one operand byte)
            0x80 | 0x82 | 0x89 | 0xC2 | 0xE2 => {
                let _ = self.fetch(bus);
                2
            }
            // Zero page NOPs
            0x04 | 0x44 | 0x64 => {
                let addr = self.addr_zero_page(bus);
                let _ = bus.read(addr);
                3
            }
            // Zero page,X NOPs
            0x14 | 0x34 | 0x54 | 0x74 | 0xD4 | 0xF4 => {
                let addr = self.addr_zero_page_x(bus);
                let _ = bus.read(addr);
                4
            }
            // Absolute NOP
            0x0C => {
                let addr = self.addr_absolute(bus);
                let _ = bus.read(addr);
                4
            }
            // Absolute,X NOPs (page cross still costs a cycle)
            0x1C | 0x3C | 0x5C | 0x7C | 0xDC | 0xFC => {
                let (addr, crossed) = self.addr_absolute_x(bus);
                let _ = bus.read(addr);
                4 + u32::from(crossed)
            }
            _ => 2,
        }
    }
}

impl Default for Ricoh2A03 {
    fn default() -> Self {
        Self::new()
    }
}
