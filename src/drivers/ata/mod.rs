pub mod channel;
pub mod config;
pub mod decode;
pub mod driver;
pub mod error;
pub mod identify;
pub mod io;
pub mod poll;
pub mod registry;
pub mod regs;
pub mod status;
pub mod transfer;

#[cfg(test)]
mod sim;

pub use config::DriverConfig;
pub use decode::DeviceRecord;
pub use driver::AtaDriver;
pub use error::{AtaError, AtaResult, TransferError, TransferResult};
pub use io::{PortIo, X86PortIo};
pub use regs::{Channel, DrivePosition};

use lazy_static::lazy_static;

// ──────────────────────────────────────────────────────────────
//  Kernel-wide instance on the legacy x86 ports
// ──────────────────────────────────────────────────────────────

lazy_static! {
    static ref ATA: AtaDriver<X86PortIo> = {
        // This is the only owner of the legacy IDE ports.
        let (primary, secondary) = unsafe { (X86PortIo::new(), X86PortIo::new()) };
        AtaDriver::new(primary, secondary, DriverConfig::DEFAULT)
    };
}

/// Probes both channels. Returns the number of drives found; calling it
/// again returns the same number without probing.
pub fn init() -> usize {
    ATA.init()
}

pub fn device_count() -> usize {
    ATA.device_count()
}

pub fn device(id: usize) -> Option<DeviceRecord> {
    ATA.device(id).copied()
}

pub fn read(device_id: usize, buffer: &mut [u8], byte_offset: u64, byte_size: usize) -> TransferResult {
    ATA.read(device_id, buffer, byte_offset, byte_size)
}

pub fn write(device_id: usize, buffer: &[u8], byte_offset: u64, byte_size: usize) -> TransferResult {
    ATA.write(device_id, buffer, byte_offset, byte_size)
}
