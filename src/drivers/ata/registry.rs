use heapless::Vec;

use super::decode::DeviceRecord;
use super::error::AtaResult;
use super::regs::{Channel, DrivePosition};

/// Two channels with two drives each.
pub const MAX_DEVICES: usize = 4;

/// Positions are probed in this order; device IDs follow it with gaps closed.
pub const PROBE_ORDER: [(Channel, DrivePosition); MAX_DEVICES] = [
    (Channel::Primary, DrivePosition::Master),
    (Channel::Primary, DrivePosition::Slave),
    (Channel::Secondary, DrivePosition::Master),
    (Channel::Secondary, DrivePosition::Slave),
];

/// Drives found at probe time, indexed by device ID.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<DeviceRecord, MAX_DEVICES>,
}

impl DeviceRegistry {
    /// Calls `probe` for every position in [`PROBE_ORDER`] and keeps the
    /// records it returns. A failed probe leaves no hole.
    pub fn probe_all<F>(mut probe: F) -> DeviceRegistry
    where
        F: FnMut(Channel, DrivePosition) -> AtaResult<DeviceRecord>,
    {
        let mut devices = Vec::new();
        for (channel, position) in PROBE_ORDER {
            if let Ok(record) = probe(channel, position) {
                // At most one record per position, so this cannot overflow.
                let _ = devices.push(record);
            }
        }
        DeviceRegistry { devices }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&DeviceRecord> {
        self.devices.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord> {
        self.devices.iter()
    }

    /// Device ID of the drive at `channel`/`position`, if one was found.
    pub fn find(&self, channel: Channel, position: DrivePosition) -> Option<usize> {
        self.devices
            .iter()
            .position(|dev| dev.channel == channel && dev.position == position)
    }
}
