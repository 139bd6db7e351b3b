//! Live MEMS link
//!
//! Drives the serial diagnostic protocol: open the port, run the initialisation
//! handshake, then exchange one command at a time. Each response is sized from the
//! response table, assembled from as many reads as it takes and checked for the
//! command echo.

use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{
    Command, CommunicationChannel, ProtocolError, ResponseTable, SerialChannel, Transport,
    DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS,
};

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Port open, handshake in progress
    Initialising,
    /// Connected and initialised
    Connected,
}

/// Serial connection settings
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
}

impl ConnectionConfig {
    /// Read timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Opens the byte channel for a connection
pub type Connector<C> = Box<dyn FnMut(&ConnectionConfig) -> Result<C, ProtocolError> + Send>;

/// Transport for a real ECU behind a byte channel
pub struct MemsTransport<C: CommunicationChannel = SerialChannel> {
    config: ConnectionConfig,
    connector: Connector<C>,
    channel: Option<C>,
    responses: Arc<ResponseTable>,
    state: ConnectionState,
    tx_bytes: u64,
    rx_bytes: u64,
}

impl MemsTransport<SerialChannel> {
    /// Transport over the serial port named in `config`
    pub fn new(config: ConnectionConfig, responses: Arc<ResponseTable>) -> Self {
        Self::with_connector(
            config,
            responses,
            Box::new(|cfg: &ConnectionConfig| {
                SerialChannel::open(&cfg.port_name, cfg.baud_rate, cfg.timeout())
            }),
        )
    }
}

impl<C: CommunicationChannel> MemsTransport<C> {
    /// Transport over whatever channel `connector` opens
    pub fn with_connector(
        config: ConnectionConfig,
        responses: Arc<ResponseTable>,
        connector: Connector<C>,
    ) -> Self {
        Self {
            config,
            connector,
            channel: None,
            responses,
            state: ConnectionState::Disconnected,
            tx_bytes: 0,
            rx_bytes: 0,
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Port this transport connects to
    pub fn port_name(&self) -> &str {
        &self.config.port_name
    }

    /// Cumulative bytes sent and received
    pub fn counters(&self) -> (u64, u64) {
        (self.tx_bytes, self.rx_bytes)
    }

    /// Send the initialisation sequence.
    ///
    /// Returns `Ok(false)` when the first command is not echoed back, which is how a
    /// virtual port with nothing behind it behaves.
    fn initialise(&mut self) -> Result<bool, ProtocolError> {
        match self.exchange(Command::InitA.code()) {
            Ok(_) => {}
            Err(ProtocolError::Timeout { .. }) => {
                return Err(ProtocolError::ConnectionFailed(format!(
                    "no response to initialisation from {}",
                    self.config.port_name
                )));
            }
            Err(ProtocolError::EchoMismatch { actual, .. }) => {
                warn!(
                    port = %self.config.port_name,
                    received = %format!("{:02X}", actual),
                    "initialisation not echoed, port is not connected to an ECU"
                );
                return Ok(false);
            }
            Err(e) => return Err(e),
        }

        for command in [
            Command::InitB,
            Command::Heartbeat,
            Command::EcuId,
            Command::IacPosition,
        ] {
            self.exchange(command.code())?;
        }

        Ok(true)
    }

    /// Write one command byte and read back its response
    fn exchange(&mut self, command: u8) -> Result<Vec<u8>, ProtocolError> {
        let size = self.responses.response_size(command);
        let channel = self.channel.as_mut().ok_or(ProtocolError::NotConnected)?;

        channel.write_all(&[command])?;
        channel.flush()?;
        self.tx_bytes = self.tx_bytes.saturating_add(1);
        debug!(command = %format!("{:02X}", command), "sent command");

        let result = read_response(channel, command, size);
        let received = match &result {
            Ok(data) => data.len(),
            Err(e) => e.partial_response().map_or(0, <[u8]>::len),
        };
        self.rx_bytes = self.rx_bytes.saturating_add(received as u64);

        match &result {
            Ok(data) => debug!(
                command = %format!("{:02X}", command),
                response = %hex::encode_upper(data),
                "received response"
            ),
            Err(e) => warn!(command = %format!("{:02X}", command), "{}", e),
        }
        result
    }

    fn close_channel(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            if let Err(e) = channel.flush() {
                debug!("flush on close failed: {}", e);
            }
        }
        self.state = ConnectionState::Disconnected;
    }
}

/// Accumulate reads until `size` bytes have arrived, then check the echo
fn read_response<C: CommunicationChannel + ?Sized>(
    channel: &mut C,
    command: u8,
    size: usize,
) -> Result<Vec<u8>, ProtocolError> {
    let mut data = Vec::with_capacity(size);
    let mut buf = vec![0u8; size.max(1)];

    while data.len() < size {
        match channel.read(&mut buf) {
            Ok(0) => {
                return Err(ProtocolError::Timeout {
                    expected: size,
                    received: data,
                })
            }
            Ok(n) => data.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                return Err(ProtocolError::Timeout {
                    expected: size,
                    received: data,
                })
            }
            Err(e) => return Err(ProtocolError::SerialError(e.to_string())),
        }
    }

    if data.len() > size {
        return Err(ProtocolError::SizeMismatch {
            expected: size,
            received: data.len(),
            response: data,
        });
    }

    let echo = data.first().copied();
    match echo {
        Some(actual) if actual != command => Err(ProtocolError::EchoMismatch {
            expected: command,
            actual,
            response: data,
        }),
        _ => Ok(data),
    }
}

impl<C: CommunicationChannel> Transport for MemsTransport<C> {
    fn connect(&mut self) -> Result<bool, ProtocolError> {
        if self.state == ConnectionState::Connected {
            return Ok(true);
        }

        info!(port = %self.config.port_name, baud = self.config.baud_rate, "connecting to ECU");
        let mut channel = (self.connector)(&self.config)?;
        channel.set_timeout(self.config.timeout())?;
        channel.clear_buffers()?;
        self.channel = Some(channel);
        self.state = ConnectionState::Initialising;

        match self.initialise() {
            Ok(true) => {
                self.state = ConnectionState::Connected;
                info!(port = %self.config.port_name, "ECU initialised");
                Ok(true)
            }
            Ok(false) => {
                self.close_channel();
                Ok(false)
            }
            Err(e) => {
                self.close_channel();
                Err(e)
            }
        }
    }

    fn send_and_receive(&mut self, command: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        if self.state != ConnectionState::Connected {
            return Err(ProtocolError::NotConnected);
        }
        let code = command.first().copied().ok_or(ProtocolError::EmptyCommand)?;
        self.exchange(code)
    }

    fn disconnect(&mut self) -> Result<(), ProtocolError> {
        if self.channel.is_some() {
            info!(
                port = %self.config.port_name,
                tx = self.tx_bytes,
                rx = self.rx_bytes,
                "disconnecting from ECU"
            );
        }
        self.close_channel();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

impl<C: CommunicationChannel> Drop for MemsTransport<C> {
    fn drop(&mut self) {
        self.close_channel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::{self, Read, Write};

    /// Channel that replays scripted reads; `None` stands for a read timeout
    struct ScriptedChannel {
        reads: VecDeque<Option<Vec<u8>>>,
    }

    impl ScriptedChannel {
        fn new(reads: Vec<Option<Vec<u8>>>) -> Self {
            Self {
                reads: reads.into(),
            }
        }
    }

    impl Read for ScriptedChannel {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.reads.pop_front() {
                Some(Some(chunk)) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(None) | None => Err(io::Error::new(ErrorKind::TimedOut, "timed out")),
            }
        }
    }

    impl Write for ScriptedChannel {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CommunicationChannel for ScriptedChannel {
        fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
            Ok(())
        }

        fn clear_buffers(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_read_response_accumulates_chunks() {
        let mut channel = ScriptedChannel::new(vec![
            Some(vec![0xd0, 0x99]),
            Some(vec![0x00]),
            Some(vec![0x03, 0x03]),
        ]);
        let data = read_response(&mut channel, 0xd0, 5).unwrap();
        assert_eq!(data, vec![0xd0, 0x99, 0x00, 0x03, 0x03]);
    }

    #[test]
    fn test_read_response_timeout_keeps_partial() {
        let mut channel = ScriptedChannel::new(vec![Some(vec![0x80, 0x1c]), None]);
        match read_response(&mut channel, 0x80, 29) {
            Err(ProtocolError::Timeout { expected, received }) => {
                assert_eq!(expected, 29);
                assert_eq!(received, vec![0x80, 0x1c]);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_read_response_zero_bytes_is_timeout() {
        let mut channel = ScriptedChannel::new(vec![Some(vec![])]);
        assert!(matches!(
            read_response(&mut channel, 0xf4, 2),
            Err(ProtocolError::Timeout { .. })
        ));
    }

    #[test]
    fn test_read_response_oversize() {
        let mut channel = ScriptedChannel::new(vec![Some(vec![0xf4]), Some(vec![0x00, 0x00])]);
        match read_response(&mut channel, 0xf4, 2) {
            Err(ProtocolError::SizeMismatch {
                expected,
                received,
                response,
            }) => {
                assert_eq!(expected, 2);
                assert_eq!(received, 3);
                assert_eq!(response, vec![0xf4, 0x00, 0x00]);
            }
            other => panic!("expected size mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_read_response_echo_mismatch() {
        let mut channel = ScriptedChannel::new(vec![Some(vec![0x7d, 0x00])]);
        assert!(matches!(
            read_response(&mut channel, 0xf4, 2),
            Err(ProtocolError::EchoMismatch {
                expected: 0xf4,
                actual: 0x7d,
                ..
            })
        ));
    }

    #[test]
    fn test_phantom_port_reports_not_connected() {
        let mut transport = MemsTransport::<ScriptedChannel>::with_connector(
            ConnectionConfig::default(),
            ResponseTable::shared(),
            Box::new(|_: &ConnectionConfig| Ok(ScriptedChannel::new(vec![Some(vec![0x00])]))),
        );
        assert!(!transport.connect().unwrap());
        assert!(!transport.is_connected());
        assert_eq!(transport.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_silent_port_fails_to_connect() {
        let mut transport = MemsTransport::<ScriptedChannel>::with_connector(
            ConnectionConfig::default(),
            ResponseTable::shared(),
            Box::new(|_: &ConnectionConfig| Ok(ScriptedChannel::new(vec![None]))),
        );
        assert!(matches!(
            transport.connect(),
            Err(ProtocolError::ConnectionFailed(_))
        ));
        assert!(!transport.is_connected());
    }
}
