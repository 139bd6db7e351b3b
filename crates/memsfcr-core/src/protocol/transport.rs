//! Transport selection
//!
//! Every way of reaching an ECU (a live serial link, the synthetic loopback and a
//! recorded scenario) implements [`Transport`]. [`EcuTransport`] picks one of them
//! once, from the connection descriptor.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::{
    ConnectionConfig, LoopbackTransport, MemsTransport, PlaybackTransport, ProtocolError,
    ResponseTable,
};
use crate::config::MemsConfig;

/// One-in-flight command/response exchange with an ECU
pub trait Transport: Send {
    /// Open the link and run any initialisation it needs.
    ///
    /// `Ok(false)` means the link opened but nothing answered like an ECU.
    fn connect(&mut self) -> Result<bool, ProtocolError>;

    /// Send a command and return the assembled response
    fn send_and_receive(&mut self, command: &[u8]) -> Result<Vec<u8>, ProtocolError>;

    /// Release the link. Calling this on a closed transport is a no-op.
    fn disconnect(&mut self) -> Result<(), ProtocolError>;

    /// Whether the link is open and initialised
    fn is_connected(&self) -> bool;
}

/// Kind of transport a connection descriptor resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Serial port
    Serial,
    /// Built in simulated ECU
    Loopback,
    /// Recorded `.csv` or `.fcr` file
    Playback,
}

impl TransportKind {
    /// Classify a connection descriptor
    pub fn from_descriptor(descriptor: &str) -> Self {
        let lower = descriptor.to_ascii_lowercase();
        if lower.ends_with(".csv") || lower.ends_with(".fcr") {
            TransportKind::Playback
        } else if lower.contains("loopback") {
            TransportKind::Loopback
        } else {
            TransportKind::Serial
        }
    }
}

/// The transport an ECU reader talks through
pub enum EcuTransport {
    /// Live ECU on a serial port
    Serial(MemsTransport),
    /// Simulated ECU
    Loopback(LoopbackTransport),
    /// Scenario replay
    Playback(PlaybackTransport),
}

impl EcuTransport {
    /// Build the transport named by `descriptor`
    pub fn from_descriptor(descriptor: &str, config: &MemsConfig) -> Self {
        let responses = Arc::new(ResponseTable::mems());
        let kind = TransportKind::from_descriptor(descriptor);
        info!(descriptor, ?kind, "selected transport");

        match kind {
            TransportKind::Playback => {
                let path = config.resolve_scenario_path(descriptor);
                EcuTransport::Playback(PlaybackTransport::new(path, responses))
            }
            TransportKind::Loopback => EcuTransport::Loopback(LoopbackTransport::new(responses)),
            TransportKind::Serial => {
                let connection = ConnectionConfig {
                    port_name: descriptor.to_string(),
                    baud_rate: config.baud_rate,
                    timeout_ms: config.read_timeout_ms,
                };
                EcuTransport::Serial(MemsTransport::new(connection, responses))
            }
        }
    }

    /// Loopback transport with the recorded response table
    pub fn loopback() -> Self {
        EcuTransport::Loopback(LoopbackTransport::new(ResponseTable::shared()))
    }

    /// Playback transport for a scenario or log file
    pub fn playback(path: impl AsRef<Path>) -> Self {
        EcuTransport::Playback(PlaybackTransport::new(
            path.as_ref().to_path_buf(),
            ResponseTable::shared(),
        ))
    }

    /// Which variant this is
    pub fn kind(&self) -> TransportKind {
        match self {
            EcuTransport::Serial(_) => TransportKind::Serial,
            EcuTransport::Loopback(_) => TransportKind::Loopback,
            EcuTransport::Playback(_) => TransportKind::Playback,
        }
    }

    /// The playback transport, when replaying a scenario
    pub fn as_playback_mut(&mut self) -> Option<&mut PlaybackTransport> {
        match self {
            EcuTransport::Playback(p) => Some(p),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn Transport {
        match self {
            EcuTransport::Serial(t) => t,
            EcuTransport::Loopback(t) => t,
            EcuTransport::Playback(t) => t,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Transport {
        match self {
            EcuTransport::Serial(t) => t,
            EcuTransport::Loopback(t) => t,
            EcuTransport::Playback(t) => t,
        }
    }
}

impl Transport for EcuTransport {
    fn connect(&mut self) -> Result<bool, ProtocolError> {
        self.inner_mut().connect()
    }

    fn send_and_receive(&mut self, command: &[u8]) -> Result<Vec<u8>, ProtocolError> {
        self.inner_mut().send_and_receive(command)
    }

    fn disconnect(&mut self) -> Result<(), ProtocolError> {
        self.inner_mut().disconnect()
    }

    fn is_connected(&self) -> bool {
        self.inner().is_connected()
    }
}
