use super::channel::ChannelBus;
use super::config::DriverConfig;
use super::error::{AtaError, AtaResult};
use super::io::PortIo;
use super::regs::{DrivePosition, Register};
use super::status::{Command, Status};
use crate::log_debug;

pub const IDENTIFY_WORDS: usize = 256;

/// Raw IDENTIFY DEVICE response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifyData {
    words: [u16; IDENTIFY_WORDS],
}

impl IdentifyData {
    pub const fn from_words(words: [u16; IDENTIFY_WORDS]) -> IdentifyData {
        IdentifyData { words }
    }

    pub fn words(&self) -> &[u16; IDENTIFY_WORDS] {
        &self.words
    }
}

/// Names the signature a non-ATA device leaves in LBA mid/high after
/// IDENTIFY DEVICE is aborted.
fn signature_name(lba_mid: u8, lba_high: u8) -> &'static str {
    match (lba_mid, lba_high) {
        (0x14, 0xEB) => "ATAPI",
        (0x3C, 0xC3) => "SATA",
        (0x69, 0x96) => "SATAPI",
        _ => "unknown",
    }
}

/// Runs IDENTIFY DEVICE against `position` on `bus`.
///
/// Every failure, including error bits and timeouts, comes back as
/// [`AtaError::NotPresent`]: during probing there is nothing else to do with
/// a slot that does not answer properly.
pub fn identify<IO: PortIo>(
    bus: &mut ChannelBus<IO>,
    position: DrivePosition,
    config: &DriverConfig,
) -> AtaResult<IdentifyData> {
    let (channel, drive) = (bus.channel().name(), position.name());

    bus.select(position, config.select_settle_reads);
    bus.write_reg(Register::SectorCount, 0);
    bus.write_reg(Register::LbaLow, 0);
    bus.write_reg(Register::LbaMid, 0);
    bus.write_reg(Register::LbaHigh, 0);
    bus.write_reg(Register::Command, Command::IdentifyDevice.opcode());

    if bus.read_reg(Register::Status) == 0 {
        log_debug!("ATA: {} {}: no device", channel, drive);
        return Err(AtaError::NotPresent);
    }

    if let Err(e) = bus.poll(Status::is_idle, Status::ERROR, &config.poll).into_result() {
        log_debug!("ATA: {} {}: IDENTIFY did not complete: {}", channel, drive, e);
        return Err(AtaError::NotPresent);
    }

    let lba_mid = bus.read_reg(Register::LbaMid);
    let lba_high = bus.read_reg(Register::LbaHigh);
    if lba_mid != 0 || lba_high != 0 {
        log_debug!(
            "ATA: {} {}: skipping {} device ({:#04x}/{:#04x})",
            channel,
            drive,
            signature_name(lba_mid, lba_high),
            lba_mid,
            lba_high
        );
        return Err(AtaError::NotPresent);
    }

    let data_request = |status: Status| status.contains(Status::DATA_REQUEST);
    if let Err(e) = bus.poll(data_request, Status::ERROR, &config.poll).into_result() {
        log_debug!("ATA: {} {}: no IDENTIFY data: {}", channel, drive, e);
        return Err(AtaError::NotPresent);
    }

    let mut words = [0u16; IDENTIFY_WORDS];
    for word in words.iter_mut() {
        *word = bus.read_data();
    }
    Ok(IdentifyData::from_words(words))
}
