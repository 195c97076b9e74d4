//! Whole-machine integration tests.
//!
//! Each test hand-assembles an iNES image in memory and runs it through
//! the scheduler, observing results through RAM peeks, OAM, the status
//! register or cycle counters.

use famicore_core::{Bus, MasterCycles};
use famicore_nes::{ExecMode, Nes};

const PRG_16K: usize = 0x4000;
const CHR_8K: usize = 0x2000;

/// Assemble an NROM image from 16 KiB PRG contents.
fn nrom(prg: &[u8; PRG_16K], chr_banks: u8) -> Vec<u8> {
    let mut rom = vec![0u8; 16 + PRG_16K + usize::from(chr_banks) * CHR_8K];
    rom[0..4].copy_from_slice(b"NES\x1a");
    rom[4] = 1;
    rom[5] = chr_banks;
    rom[16..16 + PRG_16K].copy_from_slice(prg);
    rom
}

/// 16 KiB PRG: infinite JMP loop at $8000, reset vector pointing at it.
fn idle_prg() -> [u8; PRG_16K] {
    let mut prg = [0u8; PRG_16K];
    // $8000: JMP $8000
    prg[0..3].copy_from_slice(&[0x4C, 0x00, 0x80]);
    prg[0x3FFC] = 0x00;
    prg[0x3FFD] = 0x80;
    prg
}

#[test]
fn three_frames_cost_three_frames_of_cycles() {
    let mut nes = Nes::new();
    nes.set_frame_limit(Some(3));
    nes.run_rom(&nrom(&idle_prg(), 1), ExecMode::Reset).unwrap();

    // 341 * 262 / 3 master cycles per frame with rendering off.
    let expected = 341 * 262 * 3 / 3;
    let cycles = nes.cpu().cycles().get();
    assert!(
        (expected..=expected + 3).contains(&cycles),
        "cycles {cycles} outside frame budget {expected}"
    );
    assert_eq!(nes.bus().ppu().frame_count(), 3);
    // The PPU never runs ahead of 3x the master clock.
    assert_eq!(nes.bus().ppu().dots().get(), 3 * nes.master_cycles().get());
}

#[test]
fn vblank_nmi_increments_counter_once_per_frame() {
    let mut prg = [0u8; PRG_16K];
    // Reset at $8000:
    //   LDA #$80 / STA $2000   (NMI on VBlank)
    //   idle: JMP idle
    prg[0..8].copy_from_slice(&[0xA9, 0x80, 0x8D, 0x00, 0x20, 0x4C, 0x05, 0x80]);
    // NMI handler at $9000: INC $00 / RTI
    prg[0x1000..0x1003].copy_from_slice(&[0xE6, 0x00, 0x40]);
    prg[0x3FFA] = 0x00; // NMI vector -> $9000
    prg[0x3FFB] = 0x90;
    prg[0x3FFC] = 0x00; // reset vector -> $8000
    prg[0x3FFD] = 0x80;

    let mut nes = Nes::new();
    nes.set_frame_limit(Some(10));
    nes.run_rom(&nrom(&prg, 1), ExecMode::Reset).unwrap();

    assert_eq!(nes.peek(0x0000), 10, "one NMI per frame for 10 frames");
}

#[test]
fn oam_dma_copies_a_page_and_stalls() {
    let mut nes = Nes::new();
    nes.load_rom(&nrom(&idle_prg(), 1), ExecMode::Reset).unwrap();

    for i in 0..=255u16 {
        nes.bus_mut().mem_mut().write(0x0200 + i, i as u8);
    }
    Bus::write(nes.bus_mut(), 0x4014, 0x02);

    let before = nes.cpu().cycles();
    nes.step(MasterCycles::new(1)).unwrap();
    let stall = (nes.cpu().cycles() - before).get();

    assert!(
        stall == 513 || stall == 514,
        "DMA stall was {stall}, expected 513/514"
    );
    for i in 0..=255u8 {
        assert_eq!(nes.bus().ppu().read_oam(i), i);
    }
}

#[test]
fn oam_dma_respects_current_oam_address() {
    let mut nes = Nes::new();
    nes.load_rom(&nrom(&idle_prg(), 1), ExecMode::Reset).unwrap();

    for i in 0..=255u16 {
        nes.bus_mut().mem_mut().write(0x0300 + i, i as u8);
    }
    Bus::write(nes.bus_mut(), 0x2003, 0x80); // OAMADDR = $80
    Bus::write(nes.bus_mut(), 0x4014, 0x03);
    nes.step(MasterCycles::new(1)).unwrap();

    // Byte 0 of the source page landed at OAM $80, wrapping past $FF.
    assert_eq!(nes.bus().ppu().read_oam(0x80), 0);
    assert_eq!(nes.bus().ppu().read_oam(0xFF), 0x7F);
    assert_eq!(nes.bus().ppu().read_oam(0x00), 0x80);
}

#[test]
fn sprite_zero_hit_on_scanline_32() {
    let mut nes = Nes::new();
    // CHR-RAM cartridge so the pattern table is written through PPUDATA.
    nes.load_rom(&nrom(&idle_prg(), 0), ExecMode::Reset).unwrap();
    let bus = nes.bus_mut();

    // Tile 1: plane 0 solid -> every pixel pattern value 01.
    Bus::write(bus, 0x2006, 0x00);
    Bus::write(bus, 0x2006, 0x10);
    for _ in 0..8 {
        Bus::write(bus, 0x2007, 0xFF);
    }

    // Background: fill nametable row 4 (scanlines 32-39) with tile 1.
    Bus::write(bus, 0x2006, 0x20);
    Bus::write(bus, 0x2006, 0x80);
    for _ in 0..32 {
        Bus::write(bus, 0x2007, 0x01);
    }

    // Sprite 0 at (100, Y=31): first visible on scanline 32.
    Bus::write(bus, 0x2003, 0x00);
    for byte in [31u8, 0x01, 0x00, 100] {
        Bus::write(bus, 0x2004, byte);
    }

    // Scroll home, rendering on (background + sprites, no clipping).
    Bus::write(bus, 0x2000, 0x00);
    Bus::write(bus, 0x2005, 0x00);
    Bus::write(bus, 0x2005, 0x00);
    Bus::write(bus, 0x2001, 0x1E);

    // Run through frame 1 (its pre-render loads v from t) and into
    // frame 2 past scanline 33.
    let dots_to_line_34_of_frame_2 = (262 + 34) * 341;
    nes.step(MasterCycles::new(dots_to_line_34_of_frame_2 / 3 + 1))
        .unwrap();

    let status = Bus::read(nes.bus_mut(), 0x2002);
    assert!(status & 0x40 != 0, "sprite 0 hit not flagged");
}

#[test]
fn mmc1_bank_switch_changes_visible_prg() {
    // 64 KiB PRG: banks 0-2 are marker bytes, bank 3 carries the code.
    let mut rom = vec![0u8; 16 + 4 * PRG_16K + CHR_8K];
    rom[0..4].copy_from_slice(b"NES\x1a");
    rom[4] = 4;
    rom[5] = 1;
    rom[6] = 0x10; // mapper 1

    for bank in 0..3usize {
        let start = 16 + bank * PRG_16K;
        rom[start..start + PRG_16K].fill(0x11 * (bank as u8 + 1));
    }

    // Bank 3 (fixed at $C000):
    //   LDA #$01 / STA $E000          ; serial bit 0 = 1
    //   LDA #$00 / STA $E000 x4       ; bits 1-4 = 0 -> PRG bank = 1
    //   LDA $8000 / STA $10
    //   idle: JMP idle
    let code: &[u8] = &[
        0xA9, 0x01, 0x8D, 0x00, 0xE0, // LDA #$01 / STA $E000
        0xA9, 0x00, // LDA #$00
        0x8D, 0x00, 0xE0, 0x8D, 0x00, 0xE0, 0x8D, 0x00, 0xE0, 0x8D, 0x00, 0xE0,
        0xAD, 0x00, 0x80, // LDA $8000
        0x85, 0x10, // STA $10
        0x4C, 0x18, 0xC0, // JMP $C018
    ];
    let bank3 = 16 + 3 * PRG_16K;
    rom[bank3..bank3 + code.len()].copy_from_slice(code);
    rom[bank3 + 0x3FFC] = 0x00; // reset vector -> $C000
    rom[bank3 + 0x3FFD] = 0xC0;

    let mut nes = Nes::new();
    nes.set_frame_limit(Some(1));
    nes.run_rom(&rom, ExecMode::Reset).unwrap();

    assert_eq!(nes.peek(0x0010), 0x22, "PRG bank 1 visible at $8000");
}

#[test]
fn controller_bits_shift_in_button_order() {
    let mut prg = [0u8; PRG_16K];
    // Strobe $4016 with 1, read 8 bits of controller 1, pack them into
    // $00 (A first = bit 0), then idle.
    //   LDA #$01 / STA $4016
    //   LDX #$08
    //   loop: LDA $4016 / LSR A / ROR $00 / DEX / BNE loop
    //   done: ROR is 8 deep now; idle: JMP idle
    let code: &[u8] = &[
        0xA9, 0x01, 0x8D, 0x16, 0x40, // LDA #$01 / STA $4016
        0xA2, 0x08, // LDX #$08
        0xAD, 0x16, 0x40, // loop: LDA $4016
        0x4A, // LSR A (bit 0 -> carry)
        0x66, 0x00, // ROR $00
        0xCA, // DEX
        0xD0, 0xF7, // BNE loop
        0x4C, 0x10, 0x80, // idle: JMP $8010
    ];
    prg[0..code.len()].copy_from_slice(code);
    prg[0x3FFC] = 0x00;
    prg[0x3FFD] = 0x80;

    let mut nes = Nes::new();
    nes.set_frame_limit(Some(1));
    nes.load_rom(&nrom(&prg, 1), ExecMode::Reset).unwrap();
    // A, Start, Right pressed.
    nes.set_buttons(0, 0b1000_1001);
    nes.run().unwrap();

    assert_eq!(nes.peek(0x0000), 0b1000_1001);
}
