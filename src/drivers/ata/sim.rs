//! Register-level model of one legacy IDE channel for the tests.
//!
//! Drives answer IDENTIFY, READ SECTORS, WRITE SECTORS and FLUSH CACHE. Every
//! command spends a couple of status reads BUSY before the result shows up,
//! and sectors can be made to fail to exercise the abort paths.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::decode::decode;
use super::identify::{IdentifyData, IDENTIFY_WORDS};
use super::io::PortIo;
use super::regs::{Channel, ChannelPorts, DrivePosition};

const ERR: u8 = 0x01;
const DRQ: u8 = 0x08;
const DF: u8 = 0x20;
const DRDY: u8 = 0x40;
const BSY: u8 = 0x80;

/// Status reads that report BUSY after each command or sector.
const BUSY_READS: u32 = 2;

/// IDENTIFY words for a plain ATA disk of `sectors` sectors of `sector_size` bytes.
pub fn identify_words(sectors: u32, sector_size: u32) -> [u16; IDENTIFY_WORDS] {
    let mut words = [0u16; IDENTIFY_WORDS];
    words[60] = sectors as u16;
    words[61] = (sectors >> 16) as u16;
    if sector_size != 512 {
        let per_sector = sector_size / 2;
        words[106] = 1 << 14 | 1 << 12;
        words[117] = per_sector as u16;
        words[118] = (per_sector >> 16) as u16;
    }
    put_string(&mut words[27..47], b"SIM DISK");
    put_string(&mut words[10..20], b"SIM0001");
    words
}

/// IDENTIFY words for a disk that reports 48-bit addressing.
pub fn identify_words_lba48(sectors: u64) -> [u16; IDENTIFY_WORDS] {
    let mut words = identify_words(sectors.min(0x0FFF_FFFF) as u32, 512);
    words[83] |= 1 << 10;
    for (i, word) in words[100..104].iter_mut().enumerate() {
        *word = (sectors >> (16 * i)) as u16;
    }
    words
}

fn put_string(words: &mut [u16], text: &[u8]) {
    for (i, word) in words.iter_mut().enumerate() {
        let hi = text.get(2 * i).copied().unwrap_or(b' ');
        let lo = text.get(2 * i + 1).copied().unwrap_or(b' ');
        *word = u16::from_be_bytes([hi, lo]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DriveKind {
    Ata,
    Atapi,
}

#[derive(Debug, Clone)]
pub struct SimDrive {
    kind: DriveKind,
    identify: [u16; IDENTIFY_WORDS],
    sector_size: usize,
    sectors: BTreeMap<u64, Vec<u8>>,
    fail_identify: bool,
    fail_at: Option<u64>,
}

impl SimDrive {
    pub fn ata(identify: [u16; IDENTIFY_WORDS]) -> SimDrive {
        let record = decode(&IdentifyData::from_words(identify), Channel::Primary, DrivePosition::Master);
        SimDrive {
            kind: DriveKind::Ata,
            identify,
            sector_size: record.logical_sector_size as usize,
            sectors: BTreeMap::new(),
            fail_identify: false,
            fail_at: None,
        }
    }

    pub fn disk(sectors: u32, sector_size: u32) -> SimDrive {
        SimDrive::ata(identify_words(sectors, sector_size))
    }

    pub fn atapi() -> SimDrive {
        SimDrive {
            kind: DriveKind::Atapi,
            ..SimDrive::ata([0; IDENTIFY_WORDS])
        }
    }

    pub fn failing_identify(mut self) -> SimDrive {
        self.fail_identify = true;
        self
    }

    /// Reads and writes of `lba` raise ERR (and DF on writes).
    pub fn failing_at(mut self, lba: u64) -> SimDrive {
        self.fail_at = Some(lba);
        self
    }

    fn sector(&self, lba: u64) -> Vec<u8> {
        self.sectors
            .get(&lba)
            .cloned()
            .unwrap_or_else(|| vec![0; self.sector_size])
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Read { lba: u64, remaining: u32 },
    Write { lba: u64, remaining: u32, awaiting_flush: bool },
}

#[derive(Debug)]
struct SimState {
    ports: ChannelPorts,
    drives: [Option<SimDrive>; 2],
    selected: usize,
    device_reg: u8,
    sector_count: u8,
    lba: [u8; 3],
    status: u8,
    busy_reads: u32,
    after_busy: u8,
    stuck_busy: bool,
    /// Next write sector starts once the flush completion has been seen.
    write_pending: bool,
    phase: Phase,
    data_out: VecDeque<u16>,
    data_in: Vec<u16>,

    port_writes: usize,
    byte_writes: Vec<(u16, u8)>,
    status_reads: usize,
    alt_reads: usize,
    data_reads: usize,
    flushes: usize,
    commands: Vec<u8>,
    selects: Vec<u8>,
    control_writes: Vec<u8>,
}

impl SimState {
    fn drive(&self) -> Option<&SimDrive> {
        self.drives[self.selected].as_ref()
    }

    fn begin(&mut self, after: u8) {
        self.busy_reads = BUSY_READS;
        self.after_busy = after;
        self.status = BSY;
    }

    fn current_status(&self) -> u8 {
        if self.drive().is_none() {
            0
        } else if self.stuck_busy || self.busy_reads > 0 {
            BSY
        } else {
            self.status
        }
    }

    fn read_status(&mut self) -> u8 {
        self.status_reads += 1;
        let status = self.current_status();
        if self.drive().is_some() && !self.stuck_busy {
            if self.busy_reads > 0 {
                self.busy_reads -= 1;
                if self.busy_reads == 0 {
                    self.status = self.after_busy;
                }
            } else if self.write_pending {
                self.write_pending = false;
                self.start_write_sector();
            }
        }
        status
    }

    fn lba28(&self) -> u64 {
        u64::from(self.device_reg & 0x0F) << 24
            | u64::from(self.lba[2]) << 16
            | u64::from(self.lba[1]) << 8
            | u64::from(self.lba[0])
    }

    fn count(&self) -> u32 {
        match self.sector_count {
            0 => 256,
            n => u32::from(n),
        }
    }

    fn command(&mut self, cmd: u8) {
        self.commands.push(cmd);
        self.write_pending = false;
        let (kind, fail_identify, identify) = match self.drive() {
            Some(drive) => (drive.kind, drive.fail_identify, drive.identify),
            None => return,
        };
        match cmd {
            0xEC => match kind {
                DriveKind::Atapi => {
                    self.lba[1] = 0x14;
                    self.lba[2] = 0xEB;
                    self.begin(DRDY);
                }
                DriveKind::Ata if fail_identify => self.begin(DRDY | ERR),
                DriveKind::Ata => {
                    self.data_out = identify.iter().copied().collect();
                    self.begin(DRDY | DRQ);
                }
            },
            0x20 => {
                self.phase = Phase::Read { lba: self.lba28(), remaining: self.count() };
                self.start_read_sector();
            }
            0x30 => {
                self.phase = Phase::Write {
                    lba: self.lba28(),
                    remaining: self.count(),
                    awaiting_flush: false,
                };
                self.start_write_sector();
            }
            0xE7 => {
                self.flushes += 1;
                match self.phase {
                    Phase::Write { lba, remaining, awaiting_flush: true } if remaining > 1 => {
                        self.phase = Phase::Write {
                            lba: lba + 1,
                            remaining: remaining - 1,
                            awaiting_flush: false,
                        };
                        self.write_pending = true;
                        self.begin(DRDY);
                    }
                    _ => {
                        self.phase = Phase::Idle;
                        self.begin(DRDY);
                    }
                }
            }
            _ => self.begin(DRDY | ERR),
        }
    }

    fn start_read_sector(&mut self) {
        let Phase::Read { lba, .. } = self.phase else { return };
        let drive = self.drive().expect("read on empty slot");
        if drive.fail_at == Some(lba) {
            self.phase = Phase::Idle;
            self.begin(DRDY | ERR);
            return;
        }
        let bytes = drive.sector(lba);
        self.data_out = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        self.begin(DRDY | DRQ);
    }

    fn start_write_sector(&mut self) {
        let Phase::Write { lba, .. } = self.phase else { return };
        let drive = self.drive().expect("write on empty slot");
        if drive.fail_at == Some(lba) {
            self.phase = Phase::Idle;
            self.begin(DRDY | DF | ERR);
            return;
        }
        self.data_in.clear();
        self.begin(DRDY | DRQ);
    }

    fn read_data(&mut self) -> u16 {
        self.data_reads += 1;
        let word = self.data_out.pop_front().unwrap_or(0);
        if self.data_out.is_empty() {
            match self.phase {
                Phase::Read { lba, remaining } if remaining > 1 => {
                    self.phase = Phase::Read { lba: lba + 1, remaining: remaining - 1 };
                    self.start_read_sector();
                }
                Phase::Read { .. } => {
                    self.phase = Phase::Idle;
                    self.begin(DRDY);
                }
                _ => self.status = DRDY,
            }
        }
        word
    }

    fn write_data(&mut self, word: u16) {
        let Phase::Write { lba, remaining, awaiting_flush: false } = self.phase else { return };
        self.data_in.push(word);
        let selected = self.selected;
        let Some(drive) = self.drives[selected].as_mut() else { return };
        if self.data_in.len() * 2 == drive.sector_size {
            let bytes = self.data_in.iter().flat_map(|w| w.to_le_bytes()).collect();
            drive.sectors.insert(lba, bytes);
            self.phase = Phase::Write { lba, remaining, awaiting_flush: true };
            self.status = DRDY;
        }
    }

    fn offset(&self, port: u16) -> u16 {
        assert!(
            (self.ports.base..self.ports.base + 8).contains(&port),
            "port {:#x} is not on this channel",
            port
        );
        port - self.ports.base
    }

    fn read_u8(&mut self, port: u16) -> u8 {
        if port == self.ports.control {
            self.alt_reads += 1;
            return self.current_status();
        }
        match self.offset(port) {
            1 => self.status & ERR,
            2 => self.sector_count,
            3 => self.lba[0],
            4 => self.lba[1],
            5 => self.lba[2],
            6 => self.device_reg,
            7 => self.read_status(),
            _ => panic!("byte read from data port"),
        }
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        self.port_writes += 1;
        self.byte_writes.push((port, value));
        if port == self.ports.control {
            self.control_writes.push(value);
            return;
        }
        match self.offset(port) {
            1 => {}
            2 => self.sector_count = value,
            3 => self.lba[0] = value,
            4 => self.lba[1] = value,
            5 => self.lba[2] = value,
            6 => {
                self.device_reg = value;
                self.selected = usize::from(value >> 4 & 1);
                self.selects.push(value);
            }
            7 => self.command(value),
            _ => panic!("byte write to data port"),
        }
    }
}

/// One simulated channel. Clones share the same state, so a test can keep a
/// handle while the driver owns another.
#[derive(Debug, Clone)]
pub struct SimChannel {
    state: Arc<Mutex<SimState>>,
}

impl SimChannel {
    pub fn new(channel: Channel) -> SimChannel {
        let state = SimState {
            ports: channel.ports(),
            drives: [None, None],
            selected: 0,
            device_reg: 0,
            sector_count: 0,
            lba: [0; 3],
            status: DRDY,
            busy_reads: 0,
            after_busy: DRDY,
            stuck_busy: false,
            write_pending: false,
            phase: Phase::Idle,
            data_out: VecDeque::new(),
            data_in: Vec::new(),
            port_writes: 0,
            byte_writes: Vec::new(),
            status_reads: 0,
            alt_reads: 0,
            data_reads: 0,
            flushes: 0,
            commands: Vec::new(),
            selects: Vec::new(),
            control_writes: Vec::new(),
        };
        SimChannel { state: Arc::new(Mutex::new(state)) }
    }

    pub fn with_drive(self, position: DrivePosition, drive: SimDrive) -> SimChannel {
        self.lock().drives[slot(position)] = Some(drive);
        self
    }

    pub fn stuck_busy(self) -> SimChannel {
        self.set_stuck_busy(true);
        self
    }

    pub fn set_stuck_busy(&self, stuck: bool) {
        self.lock().stuck_busy = stuck;
    }

    pub fn sector(&self, position: DrivePosition, lba: u64) -> Vec<u8> {
        let state = self.lock();
        state.drives[slot(position)].as_ref().expect("no drive").sector(lba)
    }

    pub fn fill_sector(&self, position: DrivePosition, lba: u64, bytes: &[u8]) {
        let mut state = self.lock();
        let drive = state.drives[slot(position)].as_mut().expect("no drive");
        assert_eq!(bytes.len(), drive.sector_size);
        drive.sectors.insert(lba, bytes.to_vec());
    }

    pub fn commands(&self) -> Vec<u8> {
        self.lock().commands.clone()
    }

    pub fn selects(&self) -> Vec<u8> {
        self.lock().selects.clone()
    }

    pub fn control_writes(&self) -> Vec<u8> {
        self.lock().control_writes.clone()
    }

    pub fn port_writes(&self) -> usize {
        self.lock().port_writes
    }

    pub fn status_reads(&self) -> usize {
        self.lock().status_reads
    }

    /// Alternate-status reads, i.e. settle delays.
    pub fn alt_reads(&self) -> usize {
        self.lock().alt_reads
    }

    /// Every byte written, in order, as (port, value).
    pub fn byte_writes(&self) -> Vec<(u16, u8)> {
        self.lock().byte_writes.clone()
    }

    pub fn data_reads(&self) -> usize {
        self.lock().data_reads
    }

    pub fn flushes(&self) -> usize {
        self.lock().flushes
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().expect("sim state poisoned")
    }
}

fn slot(position: DrivePosition) -> usize {
    match position {
        DrivePosition::Master => 0,
        DrivePosition::Slave => 1,
    }
}

impl PortIo for SimChannel {
    fn read_u8(&mut self, port: u16) -> u8 {
        self.lock().read_u8(port)
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        self.lock().write_u8(port, value)
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        let mut state = self.lock();
        assert_eq!(port, state.ports.base, "word read off the data port");
        state.read_data()
    }

    fn write_u16(&mut self, port: u16, value: u16) {
        let mut state = self.lock();
        assert_eq!(port, state.ports.base, "word write off the data port");
        state.port_writes += 1;
        state.write_data(value)
    }
}
