//! iNES ROM loader.
//!
//! Parses the 16-byte iNES v1 header, skips the optional 512-byte
//! trainer, and hands the PRG/CHR payloads to the mapper named by the
//! header. NES 2.0 extension bits are ignored.

use log::info;

use crate::error::Error;
use crate::mapper::{Mapper, Mmc1, Mmc3, Nrom};

const MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A]; // "NES\x1A"
const HEADER_LEN: usize = 16;
const TRAINER_LEN: usize = 512;
const PRG_UNIT: usize = 16 * 1024;
const CHR_UNIT: usize = 8 * 1024;

const FLAG6_VERTICAL_MIRRORING: u8 = 0x01;
const FLAG6_TRAINER: u8 = 0x04;
const FLAG6_MAPPER_LO: u8 = 0xF0;
const FLAG7_MAPPER_HI: u8 = 0xF0;

/// Parse an iNES image into a mapper owning its PRG and CHR data.
///
/// # Errors
///
/// [`Error::InvalidInesHeader`] on a bad magic or truncated header,
/// [`Error::RomTooShort`] when the payload is smaller than the header
/// claims, and [`Error::UnsupportedMapper`] for mapper ids other than
/// 0, 1 and 4.
pub fn load_ines(rom: &[u8]) -> Result<Box<dyn Mapper>, Error> {
    if rom.len() < HEADER_LEN || rom[0..4] != MAGIC {
        return Err(Error::InvalidInesHeader);
    }

    let prg_size = usize::from(rom[4]) * PRG_UNIT;
    let chr_size = usize::from(rom[5]) * CHR_UNIT;
    let flag6 = rom[6];
    let mut flag7 = rom[7];

    // "DiskDude!" dumps smear ASCII over bytes 7-15; flag7 == $44 is
    // the tell, and its mapper nibble is garbage.
    if flag7 == 0x44 {
        info!("flag7 $44 looks like a corrupt early dump, clearing");
        flag7 = 0;
    }

    let mapper_id = ((flag6 & FLAG6_MAPPER_LO) >> 4) | (flag7 & FLAG7_MAPPER_HI);
    let vertical_mirroring = flag6 & FLAG6_VERTICAL_MIRRORING != 0;

    let mut offset = HEADER_LEN;
    if flag6 & FLAG6_TRAINER != 0 {
        offset += TRAINER_LEN;
    }

    let expected = offset + prg_size + chr_size;
    if rom.len() < expected {
        return Err(Error::RomTooShort {
            expected,
            actual: rom.len(),
        });
    }

    let prg = rom[offset..offset + prg_size].to_vec();
    let chr = if chr_size == 0 {
        // CHR-RAM board: the mapper supplies 8 KiB of RAM.
        vec![0u8; CHR_UNIT]
    } else {
        rom[offset + prg_size..offset + prg_size + chr_size].to_vec()
    };

    info!(
        "mapper {mapper_id}, PRG {}K, CHR {}{}, {} mirroring",
        prg_size / 1024,
        if chr_size == 0 { CHR_UNIT } else { chr_size } / 1024,
        if chr_size == 0 { "K RAM" } else { "K" },
        if vertical_mirroring { "vertical" } else { "horizontal" },
    );

    match mapper_id {
        0 => Ok(Box::new(Nrom::new(prg, chr, vertical_mirroring))),
        1 => Ok(Box::new(Mmc1::new(prg, chr, vertical_mirroring))),
        4 => Ok(Box::new(Mmc3::new(prg, chr, vertical_mirroring))),
        id => Err(Error::UnsupportedMapper { id }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_rom(prg_banks: u8, chr_banks: u8, flag6: u8, flag7: u8) -> Vec<u8> {
        let prg = usize::from(prg_banks) * PRG_UNIT;
        let chr = usize::from(chr_banks) * CHR_UNIT;
        let mut rom = vec![0u8; HEADER_LEN + prg + chr];
        rom[0..4].copy_from_slice(&MAGIC);
        rom[4] = prg_banks;
        rom[5] = chr_banks;
        rom[6] = flag6;
        rom[7] = flag7;
        rom
    }

    #[test]
    fn rejects_bad_magic() {
        let mut rom = make_rom(1, 1, 0, 0);
        rom[0] = b'X';
        assert!(matches!(load_ines(&rom), Err(Error::InvalidInesHeader)));
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(matches!(load_ines(&[0x4E, 0x45]), Err(Error::InvalidInesHeader)));
    }

    #[test]
    fn rejects_short_payload() {
        let mut rom = make_rom(1, 1, 0, 0);
        rom.truncate(rom.len() - 1);
        let err = load_ines(&rom).unwrap_err();
        assert!(matches!(err, Error::RomTooShort { .. }));
    }

    #[test]
    fn rejects_unsupported_mapper() {
        let rom = make_rom(1, 1, 0x20, 0); // mapper 2
        assert!(matches!(
            load_ines(&rom),
            Err(Error::UnsupportedMapper { id: 2 })
        ));
    }

    #[test]
    fn mapper_id_combines_both_nibbles() {
        let rom = make_rom(1, 1, 0x40, 0x00); // low nibble 4 -> MMC3
        assert!(load_ines(&rom).is_ok());
        let rom = make_rom(1, 1, 0x00, 0x40); // high nibble -> mapper 64
        assert!(matches!(
            load_ines(&rom),
            Err(Error::UnsupportedMapper { id: 64 })
        ));
    }

    #[test]
    fn diskdude_flag7_is_sanitised() {
        // flag6 nibble says mapper 4; flag7 $44 would claim 0x44 | 4.
        let rom = make_rom(1, 1, 0x40, 0x44);
        assert!(load_ines(&rom).is_ok());
    }

    #[test]
    fn trainer_is_skipped() {
        let prg = PRG_UNIT;
        let mut rom = vec![0u8; HEADER_LEN + TRAINER_LEN + prg + CHR_UNIT];
        rom[0..4].copy_from_slice(&MAGIC);
        rom[4] = 1;
        rom[5] = 1;
        rom[6] = FLAG6_TRAINER;
        // First PRG byte sits after the trainer.
        rom[HEADER_LEN + TRAINER_LEN] = 0xA9;
        let mut mapper = load_ines(&rom).unwrap();
        let mut mem = crate::memory::CpuMemory::new();
        mapper.on_load_ram(&mut mem);
        assert_eq!(mem.read(0x8000), 0xA9);
    }

    #[test]
    fn chr_ram_allocated_when_absent() {
        let rom = make_rom(2, 0, 0, 0);
        let mut mapper = load_ines(&rom).unwrap();
        let mut ppu = crate::ppu::Ppu::new();
        mapper.on_load_ppu(&mut ppu); // must not panic on an 8K buffer
    }
}
