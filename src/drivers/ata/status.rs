use bitflags::bitflags;

bitflags! {
    /// Bits of the status (and alternate status) register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        const ERROR         = 1 << 0;
        /// The drive has a PIO data block ready or wants one.
        const DATA_REQUEST  = 1 << 3;
        const DRIVE_FAULT   = 1 << 5;
        const DRIVE_READY   = 1 << 6;
        /// While set, every other bit is meaningless.
        const BUSY          = 1 << 7;
    }
}

impl Status {
    /// Error bits that abort a sector transfer.
    pub const TRANSFER_ERRORS: Status = Status::ERROR.union(Status::DRIVE_FAULT);

    pub const fn from_raw(raw: u8) -> Status {
        Status::from_bits_retain(raw)
    }

    pub const fn is_busy(self) -> bool {
        self.contains(Status::BUSY)
    }

    /// BUSY clear.
    pub const fn is_idle(self) -> bool {
        !self.is_busy()
    }

    /// BUSY clear and DATA-REQUEST set.
    pub const fn is_data_ready(self) -> bool {
        self.is_idle() && self.contains(Status::DATA_REQUEST)
    }
}

bitflags! {
    /// Bits written to the device-control register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Control: u8 {
        /// Stop the drive from raising IRQ 14/15.
        const NO_INTERRUPTS = 1 << 1;
    }
}

bitflags! {
    /// Bits of the device-select (drive/head) register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceSelect: u8 {
        /// Always set on legacy controllers.
        const OBSOLETE = 0xA0;
        const SLAVE    = 1 << 4;
        const LBA      = 1 << 6;
    }
}

impl DeviceSelect {
    /// Select byte written before a command: 0xA0 master, 0xB0 slave.
    pub const fn select(is_master: bool) -> u8 {
        if is_master {
            DeviceSelect::OBSOLETE.bits()
        } else {
            DeviceSelect::OBSOLETE.union(DeviceSelect::SLAVE).bits()
        }
    }

    /// Select byte for an LBA28 command: 0xE0/0xF0 ORed with LBA bits 24..28.
    pub const fn lba28(is_master: bool, lba: u32) -> u8 {
        let base = DeviceSelect::OBSOLETE.union(DeviceSelect::LBA);
        let base = if is_master { base } else { base.union(DeviceSelect::SLAVE) };
        base.bits() | ((lba >> 24) as u8 & 0x0F)
    }
}

/// Opcodes written to the command register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    ReadSectors = 0x20,
    WriteSectors = 0x30,
    FlushCache = 0xE7,
    IdentifyDevice = 0xEC,
}

impl Command {
    pub const fn opcode(self) -> u8 {
        self as u8
    }
}
