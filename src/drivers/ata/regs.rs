//! Legacy IDE port map.
//!
//! Each channel decodes eight command-block registers at `base + 0..=7` and
//! the alternate-status/device-control register at `base + 0x206`.

/// One of the two legacy IDE buses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Primary,
    Secondary,
}

impl Channel {
    pub const fn index(self) -> usize {
        match self {
            Channel::Primary => 0,
            Channel::Secondary => 1,
        }
    }

    pub const fn ports(self) -> ChannelPorts {
        match self {
            Channel::Primary => ChannelPorts::PRIMARY,
            Channel::Secondary => ChannelPorts::SECONDARY,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Channel::Primary => "primary",
            Channel::Secondary => "secondary",
        }
    }
}

/// Master or slave position on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrivePosition {
    Master,
    Slave,
}

impl DrivePosition {
    pub const fn is_master(self) -> bool {
        matches!(self, DrivePosition::Master)
    }

    pub const fn name(self) -> &'static str {
        match self {
            DrivePosition::Master => "master",
            DrivePosition::Slave => "slave",
        }
    }
}

/// Registers reachable through a channel's ports. Pairs that share a port
/// (status/command, alt-status/control) are split by
/// direction so call sites say what they mean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Data,
    SectorCount,
    LbaLow,
    LbaMid,
    LbaHigh,
    DeviceSelect,
    Status,
    Command,
    AltStatus,
    DeviceControl,
}

const CONTROL_OFFSET: u16 = 0x206;

/// Base of the command block and location of the control block for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPorts {
    pub base: u16,
    pub control: u16,
}

impl ChannelPorts {
    pub const PRIMARY: ChannelPorts = ChannelPorts::legacy(0x1F0);
    pub const SECONDARY: ChannelPorts = ChannelPorts::legacy(0x170);

    const fn legacy(base: u16) -> ChannelPorts {
        ChannelPorts {
            base,
            control: base + CONTROL_OFFSET,
        }
    }

    pub const fn port(&self, reg: Register) -> u16 {
        match reg {
            Register::Data => self.base,
            Register::SectorCount => self.base + 2,
            Register::LbaLow => self.base + 3,
            Register::LbaMid => self.base + 4,
            Register::LbaHigh => self.base + 5,
            Register::DeviceSelect => self.base + 6,
            Register::Status | Register::Command => self.base + 7,
            Register::AltStatus | Register::DeviceControl => self.control,
        }
    }
}

/// Port number of `reg` on `channel`.
pub const fn port(channel: Channel, reg: Register) -> u16 {
    channel.ports().port(reg)
}
