//! Byte channels underneath the live ECU transport

use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::time::Duration;

use super::serial::{clear_buffers, configure_port, open_port};
use super::ProtocolError;

/// Abstraction for the byte stream to the ECU
pub trait CommunicationChannel: Read + Write + Send {
    /// Set timeout for read operations
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Discard anything waiting in the input and output buffers
    fn clear_buffers(&mut self) -> io::Result<()>;
}

fn to_io(e: serialport::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

/// Live link over the diagnostic cable
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Open `name` at `baud_rate`, 8N1, with stale bytes discarded
    pub fn open(name: &str, baud_rate: u32, timeout: Duration) -> Result<Self, ProtocolError> {
        let mut port = open_port(name, Some(baud_rate), timeout)?;
        configure_port(port.as_mut())?;
        clear_buffers(port.as_mut())?;
        Ok(Self { port })
    }

    /// Port name as reported by the driver
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl CommunicationChannel for SerialChannel {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port.set_timeout(timeout).map_err(to_io)
    }

    fn clear_buffers(&mut self) -> io::Result<()> {
        self.port.clear(serialport::ClearBuffer::All).map_err(to_io)
    }
}
