pub mod ata;

pub fn init() {
    let disks = ata::init();
    crate::log_info!("Drivers subsystem initialized, {} ATA disk(s).", disks);
}
