//! Turns an IDENTIFY DEVICE response into a [`DeviceRecord`].
//!
//! Word numbers follow the ATA/ATAPI command set specification.

use bit_field::BitField;
use core::ops::Range;

use super::identify::IdentifyData;
use super::regs::{Channel, DrivePosition};

pub const DEFAULT_SECTOR_SIZE: u32 = 512;

const SERIAL_WORDS: Range<usize> = 10..20;
const MODEL_WORDS: Range<usize> = 27..47;
const LBA28_SECTORS: usize = 60;
const COMMAND_SET_2: usize = 83;
const UDMA_MODES: usize = 88;
const LBA48_SECTORS: usize = 100;
const SECTOR_SIZES: usize = 106;
const WORDS_PER_LOGICAL_SECTOR: usize = 117;
const SECTOR_ALIGNMENT: usize = 209;

const MODEL_LEN: usize = 2 * (MODEL_WORDS.end - MODEL_WORDS.start);
const SERIAL_LEN: usize = 2 * (SERIAL_WORDS.end - SERIAL_WORDS.start);

/// A probed drive. Built once at probe time and never modified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRecord {
    pub channel: Channel,
    pub position: DrivePosition,
    pub logical_sector_size: u32,
    pub physical_sector_size: u32,
    /// Logical sector offset of the first physical sector boundary.
    pub logical_sector_alignment: u16,
    pub lba28_sector_count: u32,
    /// Zero when the drive has no 48-bit addressing.
    pub lba48_sector_count: u64,
    /// Bit n-1 set means UDMA mode n is supported.
    pub supported_udma_mask: u8,
    pub active_udma_mode: u8,
    model: [u8; MODEL_LEN],
    serial: [u8; SERIAL_LEN],
}

impl DeviceRecord {
    pub fn channel_base(&self) -> u16 {
        self.channel.ports().base
    }

    pub fn is_master(&self) -> bool {
        self.position.is_master()
    }

    pub fn supports_lba48(&self) -> bool {
        self.lba48_sector_count != 0
    }

    pub fn supports_udma(&self, mode: u8) -> bool {
        (1..=8).contains(&mode) && self.supported_udma_mask.get_bit(usize::from(mode - 1))
    }

    /// Addressable sectors using the widest mode the drive reports.
    pub fn capacity_sectors(&self) -> u64 {
        if self.supports_lba48() {
            self.lba48_sector_count
        } else {
            u64::from(self.lba28_sector_count)
        }
    }

    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_sectors().saturating_mul(u64::from(self.logical_sector_size))
    }

    pub fn model(&self) -> &str {
        ata_str(&self.model)
    }

    pub fn serial(&self) -> &str {
        ata_str(&self.serial)
    }
}

fn ata_str(bytes: &[u8]) -> &str {
    core::str::from_utf8(bytes)
        .unwrap_or("")
        .trim_matches(|c: char| c == ' ' || c == '\0')
}

/// IDENTIFY strings store the first character in the high byte of each word.
fn ata_string<const N: usize>(words: &[u16]) -> [u8; N] {
    let mut out = [0u8; N];
    for (pair, word) in out.chunks_exact_mut(2).zip(words) {
        pair.copy_from_slice(&word.to_be_bytes());
    }
    out
}

fn dword(low: u16, high: u16) -> u32 {
    u32::from(low) | u32::from(high) << 16
}

/// Decodes `identify` for the drive at `channel`/`position`.
pub fn decode(identify: &IdentifyData, channel: Channel, position: DrivePosition) -> DeviceRecord {
    let w = identify.words();

    let lba28_sector_count = dword(w[LBA28_SECTORS], w[LBA28_SECTORS + 1]);

    let lba48_sector_count = if w[COMMAND_SET_2].get_bit(10) {
        let low = dword(w[LBA48_SECTORS], w[LBA48_SECTORS + 1]);
        let high = dword(w[LBA48_SECTORS + 2], w[LBA48_SECTORS + 3]);
        u64::from(low) | u64::from(high) << 32
    } else {
        0
    };

    let udma = w[UDMA_MODES];
    let supported_udma_mask = udma.get_bits(0..8) as u8;
    let active_udma_mode = udma.get_bits(8..16) as u8;

    // Word 106 is only meaningful with bit 15 clear and bit 14 set.
    let sizes = w[SECTOR_SIZES];
    let (logical_sector_size, physical_sector_size) = if !sizes.get_bit(15) && sizes.get_bit(14) {
        let logical = if sizes.get_bit(12) {
            let words = dword(w[WORDS_PER_LOGICAL_SECTOR], w[WORDS_PER_LOGICAL_SECTOR + 1]);
            words
                .checked_mul(2)
                .filter(|&bytes| bytes != 0)
                .unwrap_or(DEFAULT_SECTOR_SIZE)
        } else {
            DEFAULT_SECTOR_SIZE
        };
        let physical = if sizes.get_bit(13) {
            logical << u32::from(sizes.get_bits(0..4))
        } else {
            logical
        };
        (logical, physical)
    } else {
        (DEFAULT_SECTOR_SIZE, DEFAULT_SECTOR_SIZE)
    };

    let alignment = w[SECTOR_ALIGNMENT];
    let logical_sector_alignment =
        if sizes.get_bit(13) && !alignment.get_bit(15) && alignment.get_bit(14) {
            alignment & 0xC
        } else {
            0
        };

    DeviceRecord {
        channel,
        position,
        logical_sector_size,
        physical_sector_size,
        logical_sector_alignment,
        lba28_sector_count,
        lba48_sector_count,
        supported_udma_mask,
        active_udma_mode,
        model: ata_string(&w[MODEL_WORDS]),
        serial: ata_string(&w[SERIAL_WORDS]),
    }
}
