use x86_64::instructions::port::Port;

/// Byte and word access to I/O ports.
///
/// The driver never touches ports directly; every register access goes
/// through one of these, so a channel can be backed by the real bus or by a
/// register model.
pub trait PortIo {
    fn read_u8(&mut self, port: u16) -> u8;
    fn write_u8(&mut self, port: u16, value: u8);
    fn read_u16(&mut self, port: u16) -> u16;
    fn write_u16(&mut self, port: u16, value: u16);
}

/// `in`/`out` instructions on the legacy x86 I/O space.
#[derive(Debug)]
pub struct X86PortIo {
    _private: (),
}

impl X86PortIo {
    /// # Safety
    /// The caller must own the ports this handle will be pointed at; nothing
    /// else in the kernel may drive the same IDE channel.
    pub const unsafe fn new() -> X86PortIo {
        X86PortIo { _private: () }
    }
}

impl PortIo for X86PortIo {
    fn read_u8(&mut self, port: u16) -> u8 {
        let mut port = Port::<u8>::new(port);
        unsafe { port.read() }
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        let mut port = Port::<u8>::new(port);
        unsafe { port.write(value) }
    }

    fn read_u16(&mut self, port: u16) -> u16 {
        let mut port = Port::<u16>::new(port);
        unsafe { port.read() }
    }

    fn write_u16(&mut self, port: u16, value: u16) {
        let mut port = Port::<u16>::new(port);
        unsafe { port.write(value) }
    }
}
