//! Serial Protocol Communication
//!
//! Implements the Rover MEMS 1.6 diagnostic protocol: single-byte commands answered
//! by an echo of the command followed by a fixed-size payload.
//!
//! The live link, a synthetic loopback ECU and scenario playback all sit behind the
//! [`Transport`] trait.

pub mod commands;
mod error;
mod loopback;
mod mems;
mod playback;
mod responses;
pub mod serial;
mod stream;
mod transport;

pub use commands::{
    Actuator, Adjustment, Command, FUEL_TRIM_DEFAULT, IAC_POSITION_DEFAULT, IDLE_DECAY_DEFAULT,
    IDLE_SPEED_DEFAULT, IGNITION_ADVANCE_OFFSET_DEFAULT,
};
pub use error::ProtocolError;
pub use loopback::LoopbackTransport;
pub use mems::{ConnectionConfig, ConnectionState, Connector, MemsTransport};
pub use playback::PlaybackTransport;
pub use responses::{ResponseTable, DEFAULT_RESPONSE_SIZE, SAMPLE_DATAFRAME_7D, SAMPLE_DATAFRAME_80};
pub use serial::{clear_buffers, configure_port, list_ports, open_port, PortInfo};
pub use stream::{CommunicationChannel, SerialChannel};
pub use transport::{EcuTransport, Transport, TransportKind};

/// Baud rate of the MEMS diagnostic link
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default timeout for responses in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;
