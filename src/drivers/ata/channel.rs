use super::io::PortIo;
use super::poll::{self, PollBudget, PollOutcome};
use super::regs::{Channel, ChannelPorts, DrivePosition, Register};
use super::status::{Control, DeviceSelect, Status};

/// Which drive on a channel currently answers register accesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Unselected,
    Selected(DrivePosition),
}

/// One IDE channel: its ports, the handle used to reach them and the
/// drive-select state. Master and slave share every register, so all access
/// to either drive goes through the one `ChannelBus`.
pub struct ChannelBus<IO> {
    channel: Channel,
    ports: ChannelPorts,
    io: IO,
    selection: Selection,
}

impl<IO: PortIo> ChannelBus<IO> {
    pub fn new(channel: Channel, io: IO) -> ChannelBus<IO> {
        ChannelBus {
            channel,
            ports: channel.ports(),
            io,
            selection: Selection::Unselected,
        }
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    // ── Drive selection ──────────────────────────────────────

    /// Writes the select byte for `position` and waits out the ~400ns the
    /// drive needs before its registers can be trusted.
    pub fn select(&mut self, position: DrivePosition, settle_reads: u8) {
        self.write_reg(Register::DeviceSelect, DeviceSelect::select(position.is_master()));
        self.settle(settle_reads);
        self.selection = Selection::Selected(position);
    }

    /// Selects `position` unless it is already selected. Returns whether a
    /// select was issued.
    pub fn select_if_needed(&mut self, position: DrivePosition, settle_reads: u8) -> bool {
        if self.selection == Selection::Selected(position) {
            return false;
        }
        self.select(position, settle_reads);
        true
    }

    /// Forgets which drive was selected without touching the bus. The next
    /// `select_if_needed` will write the select byte.
    pub fn invalidate_selection(&mut self) {
        self.selection = Selection::Unselected;
    }

    /// Each alternate-status read takes roughly 100ns on ISA timing.
    pub fn settle(&mut self, reads: u8) {
        let port = self.ports.port(Register::AltStatus);
        for _ in 0..reads {
            let _ = self.io.read_u8(port);
        }
    }

    pub fn disable_interrupts(&mut self) {
        self.write_reg(Register::DeviceControl, Control::NO_INTERRUPTS.bits());
    }

    // ── Register access ──────────────────────────────────────

    pub fn read_reg(&mut self, reg: Register) -> u8 {
        self.io.read_u8(self.ports.port(reg))
    }

    pub fn write_reg(&mut self, reg: Register, value: u8) {
        self.io.write_u8(self.ports.port(reg), value);
    }

    pub fn status(&mut self) -> Status {
        Status::from_raw(self.read_reg(Register::Status))
    }

    pub fn read_data(&mut self) -> u16 {
        self.io.read_u16(self.ports.port(Register::Data))
    }

    pub fn write_data(&mut self, word: u16) {
        self.io.write_u16(self.ports.port(Register::Data), word);
    }

    pub fn poll<F>(&mut self, ready: F, error_mask: Status, budget: &PollBudget) -> PollOutcome
    where
        F: Fn(Status) -> bool,
    {
        poll::poll(&mut self.io, &self.ports, ready, error_mask, budget)
    }

    #[cfg(test)]
    pub fn io(&self) -> &IO {
        &self.io
    }
}
