use core::fmt;

use super::status::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtaError {
    /// Nothing usable answered at a probe position. Expected for empty slots.
    NotPresent,
    /// ERROR or DRIVE-FAULT was raised while waiting on the drive.
    ProtocolError { status: Status },
    /// The poll budget ran out.
    Timeout,
    /// The LBA does not fit the 28-bit command set.
    UnsupportedAddress,
    /// 48-bit commands are not implemented.
    Unimplemented,
    NoSuchDevice,
    Misaligned,
    BufferTooSmall,
    OutOfRange,
}

impl fmt::Display for AtaError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AtaError::NotPresent => write!(f, "Device not present"),
            AtaError::ProtocolError { status } => {
                write!(f, "Drive reported an error (status {:#04x})", status.bits())
            }
            AtaError::Timeout => write!(f, "Timed out waiting for drive"),
            AtaError::UnsupportedAddress => write!(f, "LBA not addressable with 28 bits"),
            AtaError::Unimplemented => write!(f, "48-bit LBA transfers are not implemented"),
            AtaError::NoSuchDevice => write!(f, "No such device"),
            AtaError::Misaligned => write!(f, "Offset or size is not sector aligned"),
            AtaError::BufferTooSmall => write!(f, "Buffer too small for request"),
            AtaError::OutOfRange => write!(f, "Request extends past end of device"),
        }
    }
}

pub type AtaResult<T> = Result<T, AtaError>;

/// A sector transfer that stopped early.
///
/// Sectors before `completed` were moved (and, for writes, flushed); they are
/// not rolled back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferError {
    pub completed: usize,
    pub cause: AtaError,
}

impl TransferError {
    pub const fn after(completed: usize, cause: AtaError) -> TransferError {
        TransferError { completed, cause }
    }
}

impl From<AtaError> for TransferError {
    fn from(cause: AtaError) -> TransferError {
        TransferError::after(0, cause)
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} after {} sector(s)", self.cause, self.completed)
    }
}

/// Sectors transferred on success.
pub type TransferResult = Result<usize, TransferError>;
