//! 28-bit LBA PIO sector transfers.
//!
//! Both directions issue one command for the whole run and then move one
//! sector per DRQ block. A failed sector ends the call; sectors already moved
//! stay moved.

use super::channel::ChannelBus;
use super::config::DriverConfig;
use super::decode::DeviceRecord;
use super::error::{AtaError, AtaResult, TransferError, TransferResult};
use super::io::PortIo;
use super::regs::Register;
use super::status::{Command, DeviceSelect, Status};

/// Highest LBA the 28-bit commands can address.
pub const MAX_LBA28: u32 = 0x0FFF_FFFF;

/// Sector count register is eight bits wide; zero would mean 256.
pub const MAX_SECTORS_PER_COMMAND: usize = u8::MAX as usize;

/// A run of whole sectors derived from a byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorRange {
    pub lba: u64,
    pub count: u64,
}

impl SectorRange {
    /// Converts a byte range on `device` to sectors. Both ends must sit on a
    /// logical sector boundary and the run must fit the device.
    pub fn from_bytes(device: &DeviceRecord, byte_offset: u64, byte_size: usize) -> AtaResult<SectorRange> {
        let sector = u64::from(device.logical_sector_size);
        let size = byte_size as u64;
        if byte_offset % sector != 0 || size % sector != 0 {
            return Err(AtaError::Misaligned);
        }

        let range = SectorRange {
            lba: byte_offset / sector,
            count: size / sector,
        };
        match range.lba.checked_add(range.count) {
            Some(end) if end <= device.capacity_sectors() => Ok(range),
            _ => Err(AtaError::OutOfRange),
        }
    }

    /// True when every sector of the run is reachable with 28-bit commands.
    pub fn fits_lba28(&self) -> bool {
        self.count == 0 || self.lba + self.count - 1 <= u64::from(MAX_LBA28)
    }

    /// Splits the run into pieces one command can carry. No piece is longer
    /// than [`MAX_SECTORS_PER_COMMAND`] or straddles the end of the 28-bit
    /// space.
    pub fn commands(self) -> Commands {
        Commands {
            lba: self.lba,
            end: self.lba + self.count,
        }
    }
}

/// Iterator returned by [`SectorRange::commands`].
#[derive(Debug, Clone)]
pub struct Commands {
    lba: u64,
    end: u64,
}

impl Iterator for Commands {
    type Item = SectorRange;

    fn next(&mut self) -> Option<SectorRange> {
        if self.lba >= self.end {
            return None;
        }
        let mut count = (self.end - self.lba).min(MAX_SECTORS_PER_COMMAND as u64);
        let lba28_end = u64::from(MAX_LBA28) + 1;
        if self.lba < lba28_end {
            count = count.min(lba28_end - self.lba);
        }
        let piece = SectorRange { lba: self.lba, count };
        self.lba += count;
        Some(piece)
    }
}

fn check_lba28(lba: u32, count: u8) -> AtaResult<()> {
    if lba & !MAX_LBA28 != 0 {
        return Err(AtaError::UnsupportedAddress);
    }
    // The last sector of the run must not spill into bit 28 either.
    if count > 0 && lba + u32::from(count - 1) > MAX_LBA28 {
        return Err(AtaError::UnsupportedAddress);
    }
    Ok(())
}

fn run_bytes(device: &DeviceRecord, count: u8, buffer_len: usize) -> AtaResult<usize> {
    let bytes = usize::from(count) * device.logical_sector_size as usize;
    if buffer_len < bytes {
        return Err(AtaError::BufferTooSmall);
    }
    Ok(bytes)
}

/// Waits for the drive to accept a command, then loads the task file.
fn issue<IO: PortIo>(
    bus: &mut ChannelBus<IO>,
    device: &DeviceRecord,
    lba: u32,
    count: u8,
    command: Command,
    config: &DriverConfig,
) -> AtaResult<()> {
    bus.poll(Status::is_idle, Status::empty(), &config.poll).into_result()?;

    bus.write_reg(Register::DeviceSelect, DeviceSelect::lba28(device.is_master(), lba));
    bus.settle(config.select_settle_reads);
    bus.write_reg(Register::SectorCount, count);
    bus.write_reg(Register::LbaLow, lba as u8);
    bus.write_reg(Register::LbaMid, (lba >> 8) as u8);
    bus.write_reg(Register::LbaHigh, (lba >> 16) as u8);
    bus.write_reg(Register::Command, command.opcode());
    Ok(())
}

/// Reads `count` sectors starting at `lba` into `out`.
///
/// The drive must already be selected on `bus`. An LBA outside the 28-bit
/// range is rejected before any port is written.
pub fn read_sectors<IO: PortIo>(
    bus: &mut ChannelBus<IO>,
    device: &DeviceRecord,
    lba: u32,
    count: u8,
    out: &mut [u8],
    config: &DriverConfig,
) -> TransferResult {
    check_lba28(lba, count)?;
    let len = run_bytes(device, count, out.len())?;
    if count == 0 {
        return Ok(0);
    }

    issue(bus, device, lba, count, Command::ReadSectors, config)?;

    let sector = device.logical_sector_size as usize;
    for (done, block) in out[..len].chunks_exact_mut(sector).enumerate() {
        bus.poll(Status::is_data_ready, Status::TRANSFER_ERRORS, &config.poll)
            .into_result()
            .map_err(|cause| TransferError::after(done, cause))?;

        for pair in block.chunks_exact_mut(2) {
            pair.copy_from_slice(&bus.read_data().to_le_bytes());
        }

        // Give the drive time to drop DRQ before the next block is polled.
        for _ in 0..config.read_settle_reads {
            if !bus.status().contains(Status::DATA_REQUEST) {
                break;
            }
        }
    }
    Ok(usize::from(count))
}

/// Writes `count` sectors from `data` starting at `lba`.
///
/// Each sector is followed by FLUSH CACHE and a bounded wait for BUSY to
/// clear, so a sector counts as completed only once the drive has flushed it.
pub fn write_sectors<IO: PortIo>(
    bus: &mut ChannelBus<IO>,
    device: &DeviceRecord,
    lba: u32,
    count: u8,
    data: &[u8],
    config: &DriverConfig,
) -> TransferResult {
    check_lba28(lba, count)?;
    let len = run_bytes(device, count, data.len())?;
    if count == 0 {
        return Ok(0);
    }

    issue(bus, device, lba, count, Command::WriteSectors, config)?;

    let sector = device.logical_sector_size as usize;
    for (done, block) in data[..len].chunks_exact(sector).enumerate() {
        bus.poll(Status::is_data_ready, Status::TRANSFER_ERRORS, &config.poll)
            .into_result()
            .map_err(|cause| TransferError::after(done, cause))?;

        for pair in block.chunks_exact(2) {
            bus.write_data(u16::from_le_bytes([pair[0], pair[1]]));
        }

        bus.write_reg(Register::Command, Command::FlushCache.opcode());
        bus.poll(Status::is_idle, Status::TRANSFER_ERRORS, &config.flush)
            .into_result()
            .map_err(|cause| TransferError::after(done, cause))?;
    }
    Ok(usize::from(count))
}

/// 48-bit reads are not implemented.
pub fn read_sectors_ext<IO: PortIo>(
    _bus: &mut ChannelBus<IO>,
    _device: &DeviceRecord,
    _lba: u64,
    _count: u16,
    _out: &mut [u8],
    _config: &DriverConfig,
) -> TransferResult {
    Err(AtaError::Unimplemented.into())
}

/// 48-bit writes are not implemented.
pub fn write_sectors_ext<IO: PortIo>(
    _bus: &mut ChannelBus<IO>,
    _device: &DeviceRecord,
    _lba: u64,
    _count: u16,
    _data: &[u8],
    _config: &DriverConfig,
) -> TransferResult {
    Err(AtaError::Unimplemented.into())
}
