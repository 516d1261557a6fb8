//! Bounded status polling.
//!
//! Every wait in the protocol goes through [`poll`]. The bound is an iteration
//! count, so how long it lasts depends on the CPU and the bus; a [`Deadline`]
//! can be added on top when a tick source is available.

use super::error::{AtaError, AtaResult};
use super::io::PortIo;
use super::regs::{ChannelPorts, Register};
use super::status::Status;

/// Iterations per wait unless configured otherwise.
pub const DEFAULT_POLL_ITERATIONS: u32 = 0xFF_FFFF;

/// A tick source and how many ticks a single wait may take.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    pub clock: fn() -> u64,
    pub max_ticks: u64,
}

impl Deadline {
    pub const fn new(clock: fn() -> u64, max_ticks: u64) -> Deadline {
        Deadline { clock, max_ticks }
    }

    /// Deadline counted in time-stamp-counter cycles.
    pub const fn tsc(max_cycles: u64) -> Deadline {
        Deadline::new(read_tsc, max_cycles)
    }

    fn expired(&self, started: u64) -> bool {
        (self.clock)().wrapping_sub(started) > self.max_ticks
    }
}

fn read_tsc() -> u64 {
    unsafe { core::arch::x86_64::_rdtsc() }
}

#[derive(Debug, Clone, Copy)]
pub struct PollBudget {
    pub iterations: u32,
    pub deadline: Option<Deadline>,
}

impl PollBudget {
    pub const DEFAULT: PollBudget = PollBudget::iterations(DEFAULT_POLL_ITERATIONS);

    pub const fn iterations(iterations: u32) -> PollBudget {
        PollBudget {
            iterations,
            deadline: None,
        }
    }

    pub const fn with_deadline(mut self, deadline: Deadline) -> PollBudget {
        self.deadline = Some(deadline);
        self
    }
}

impl Default for PollBudget {
    fn default() -> Self {
        PollBudget::DEFAULT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Ready(Status),
    ErrorFlagged(Status),
    TimedOut,
}

impl PollOutcome {
    pub fn into_result(self) -> AtaResult<Status> {
        match self {
            PollOutcome::Ready(status) => Ok(status),
            PollOutcome::ErrorFlagged(status) => Err(AtaError::ProtocolError { status }),
            PollOutcome::TimedOut => Err(AtaError::Timeout),
        }
    }
}

/// Reads the status register until `ready` holds, a bit in `error_mask`
/// shows up, or the budget runs out. Errors are checked first on each read.
pub fn poll<IO, F>(
    io: &mut IO,
    ports: &ChannelPorts,
    ready: F,
    error_mask: Status,
    budget: &PollBudget,
) -> PollOutcome
where
    IO: PortIo,
    F: Fn(Status) -> bool,
{
    let status_port = ports.port(Register::Status);
    let started = budget.deadline.map(|deadline| (deadline, (deadline.clock)()));

    for _ in 0..budget.iterations {
        let status = Status::from_raw(io.read_u8(status_port));
        if status.intersects(error_mask) {
            return PollOutcome::ErrorFlagged(status);
        }
        if ready(status) {
            return PollOutcome::Ready(status);
        }
        if let Some((deadline, start)) = started {
            if deadline.expired(start) {
                return PollOutcome::TimedOut;
            }
        }
        core::hint::spin_loop();
    }
    PollOutcome::TimedOut
}
