//! ECU command layer
//!
//! [`EcuReader`] sits on top of a transport and turns raw exchanges into ECU
//! operations: identity, dataframe polling with diagnosis, adjustments, actuator
//! tests and resets.

mod reader;
mod status;

pub use reader::EcuReader;
pub use status::{EcuStatus, Reading};

use thiserror::Error;

use crate::decoder::DecodeError;
use crate::protocol::ProtocolError;

/// Errors from ECU operations
#[derive(Error, Debug)]
pub enum EcuError {
    /// Transport failure
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Malformed dataframe
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Zero steps requested
    #[error("0 step adjustment requested, value left at default {default}")]
    NoAdjustment {
        /// Default value of the adjustment
        default: i32,
    },

    /// Adjustment or status response shorter than two bytes
    #[error("Response to {command:#04x} has no value byte")]
    MissingValue {
        /// Command sent
        command: u8,
        /// Response received
        response: Vec<u8>,
    },
}

impl EcuError {
    /// Whether polling can carry on after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            EcuError::Protocol(e) => e.is_recoverable(),
            EcuError::Decode(_) | EcuError::NoAdjustment { .. } | EcuError::MissingValue { .. } => {
                true
            }
        }
    }
}
