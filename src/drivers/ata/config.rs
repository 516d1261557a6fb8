use super::poll::PollBudget;

/// Tunables for the PIO driver. All waits are bounded by one of these.
#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    /// Budget for every status wait during probing and transfers.
    pub poll: PollBudget,
    /// Budget for the BUSY wait after FLUSH CACHE.
    pub flush: PollBudget,
    /// Alternate-status reads after a drive select (~100ns each).
    pub select_settle_reads: u8,
    /// Upper bound on status reads waiting for DRQ to drop after a sector.
    pub read_settle_reads: u16,
    /// Set nIEN on both channels before probing.
    pub disable_interrupts: bool,
}

impl DriverConfig {
    pub const DEFAULT: DriverConfig = DriverConfig {
        poll: PollBudget::DEFAULT,
        flush: PollBudget::DEFAULT,
        select_settle_reads: 4,
        read_settle_reads: 400,
        disable_interrupts: true,
    };
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig::DEFAULT
    }
}
