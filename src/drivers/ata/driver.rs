//! The driver context: both channels, their locks and the probe result.

use spin::{Mutex, Once};

use super::channel::{ChannelBus, Selection};
use super::config::DriverConfig;
use super::decode::{decode, DeviceRecord};
use super::error::{AtaError, AtaResult, TransferError, TransferResult};
use super::identify::identify;
use super::io::PortIo;
use super::registry::DeviceRegistry;
use super::regs::{Channel, DrivePosition};
use super::transfer::{self, SectorRange};
use crate::{log_info, log_warn};

/// PIO driver for the two legacy IDE channels.
///
/// Each channel sits behind its own lock: master and slave on one channel
/// are serialized, the two channels are not. Selection state is kept in the
/// channel, so it is only ever changed with that lock held.
pub struct AtaDriver<IO> {
    channels: [Mutex<ChannelBus<IO>>; 2],
    registry: Once<DeviceRegistry>,
    config: DriverConfig,
}

impl<IO: PortIo> AtaDriver<IO> {
    pub fn new(primary: IO, secondary: IO, config: DriverConfig) -> AtaDriver<IO> {
        AtaDriver {
            channels: [
                Mutex::new(ChannelBus::new(Channel::Primary, primary)),
                Mutex::new(ChannelBus::new(Channel::Secondary, secondary)),
            ],
            registry: Once::new(),
            config,
        }
    }

    /// Probes all four positions and returns how many drives were found.
    ///
    /// Only the first call touches the hardware. Later calls log a warning
    /// and return the count from the first probe.
    pub fn init(&self) -> usize {
        let mut probed = false;
        let registry = self.registry.call_once(|| {
            probed = true;
            self.probe()
        });
        if !probed {
            log_warn!("ATA: already initialised, {} device(s)", registry.len());
        }
        registry.len()
    }

    fn probe(&self) -> DeviceRegistry {
        if self.config.disable_interrupts {
            for channel in &self.channels {
                channel.lock().disable_interrupts();
            }
        }

        let registry = DeviceRegistry::probe_all(|channel, position| self.probe_one(channel, position));

        for (id, dev) in registry.iter().enumerate() {
            log_info!(
                "ATA: device {}: {} {}, \"{}\", {} sectors of {} bytes",
                id,
                dev.channel.name(),
                dev.position.name(),
                dev.model(),
                dev.capacity_sectors(),
                dev.logical_sector_size
            );
        }

        // Probing leaves whichever slave it tried last selected; only a found
        // drive becomes the default.
        for channel in &self.channels {
            channel.lock().invalidate_selection();
        }
        if let Some(first) = registry.get(0) {
            self.bus(first.channel)
                .lock()
                .select(first.position, self.config.select_settle_reads);
        }
        registry
    }

    fn probe_one(&self, channel: Channel, position: DrivePosition) -> AtaResult<DeviceRecord> {
        let mut bus = self.bus(channel).lock();
        let data = identify(&mut bus, position, &self.config)?;
        Ok(decode(&data, channel, position))
    }

    fn bus(&self, channel: Channel) -> &Mutex<ChannelBus<IO>> {
        &self.channels[channel.index()]
    }

    pub fn is_initialised(&self) -> bool {
        self.registry.is_completed()
    }

    /// Drives found by [`init`](Self::init); zero before it has run.
    pub fn device_count(&self) -> usize {
        self.registry.get().map_or(0, DeviceRegistry::len)
    }

    pub fn device(&self, id: usize) -> Option<&DeviceRecord> {
        self.registry.get()?.get(id)
    }

    /// Which drive on `channel` the driver last selected.
    pub fn selection(&self, channel: Channel) -> Selection {
        self.bus(channel).lock().selection()
    }

    /// Reads `byte_size` bytes starting at `byte_offset` on `device_id` into
    /// the front of `buffer`. Offset and size must be whole logical sectors.
    ///
    /// Returns the number of sectors read.
    pub fn read(&self, device_id: usize, buffer: &mut [u8], byte_offset: u64, byte_size: usize) -> TransferResult {
        let (device, range) = self.request(device_id, buffer.len(), byte_offset, byte_size)?;
        if range.count == 0 {
            return Ok(0);
        }

        let sector = device.logical_sector_size as usize;
        let mut bus = self.bus(device.channel).lock();
        bus.select_if_needed(device.position, self.config.select_settle_reads);

        let mut completed = 0;
        for piece in range.commands() {
            let out = &mut buffer[completed * sector..][..piece.count as usize * sector];
            let result = if piece.fits_lba28() {
                transfer::read_sectors(&mut bus, device, piece.lba as u32, piece.count as u8, out, &self.config)
            } else if device.supports_lba48() {
                transfer::read_sectors_ext(&mut bus, device, piece.lba, piece.count as u16, out, &self.config)
            } else {
                Err(AtaError::UnsupportedAddress.into())
            };
            completed += result.map_err(move |e| aborted("read", device_id, range, completed, e))?;
        }
        Ok(completed)
    }

    /// Writes `byte_size` bytes from the front of `buffer` to `device_id`
    /// starting at `byte_offset`. Offset and size must be whole logical
    /// sectors.
    ///
    /// Returns the number of sectors written and flushed.
    pub fn write(&self, device_id: usize, buffer: &[u8], byte_offset: u64, byte_size: usize) -> TransferResult {
        let (device, range) = self.request(device_id, buffer.len(), byte_offset, byte_size)?;
        if range.count == 0 {
            return Ok(0);
        }

        let sector = device.logical_sector_size as usize;
        let mut bus = self.bus(device.channel).lock();
        bus.select_if_needed(device.position, self.config.select_settle_reads);

        let mut completed = 0;
        for piece in range.commands() {
            let data = &buffer[completed * sector..][..piece.count as usize * sector];
            let result = if piece.fits_lba28() {
                transfer::write_sectors(&mut bus, device, piece.lba as u32, piece.count as u8, data, &self.config)
            } else if device.supports_lba48() {
                transfer::write_sectors_ext(&mut bus, device, piece.lba, piece.count as u16, data, &self.config)
            } else {
                Err(AtaError::UnsupportedAddress.into())
            };
            completed += result.map_err(move |e| aborted("write", device_id, range, completed, e))?;
        }
        Ok(completed)
    }

    fn request(
        &self,
        device_id: usize,
        buffer_len: usize,
        byte_offset: u64,
        byte_size: usize,
    ) -> AtaResult<(&DeviceRecord, SectorRange)> {
        let device = self.device(device_id).ok_or(AtaError::NoSuchDevice)?;
        let range = SectorRange::from_bytes(device, byte_offset, byte_size)?;
        if buffer_len < byte_size {
            return Err(AtaError::BufferTooSmall);
        }
        Ok((device, range))
    }
}

fn aborted(op: &str, device_id: usize, range: SectorRange, before: usize, err: TransferError) -> TransferError {
    let err = TransferError::after(before + err.completed, err.cause);
    log_warn!(
        "ATA: device {}: {} of {} sector(s) at LBA {} stopped after {}: {}",
        device_id,
        op,
        range.count,
        range.lba,
        err.completed,
        err.cause
    );
    err
}
