//! # MemsFCR Core Library
//!
//! Core functionality for reading and diagnosing Rover MEMS 1.6 engine management units.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - The MEMS serial protocol over a live port, a loopback ECU or scenario playback
//! - Decoding of the 0x80 and 0x7D dataframes into engineering values
//! - Sliding-window statistics and engine fault diagnosis
//! - ECU commands: identity, adjustments, actuator tests and resets
//! - A fixed-interval poll loop with CSV data logging
//!
//! ## Example
//!
//! ```rust,ignore
//! use memsfcr_core::{ecu::EcuReader, protocol::EcuTransport};
//!
//! let mut reader = EcuReader::new(EcuTransport::loopback());
//! reader.connect()?;
//!
//! let reading = reader.read_dataframes()?;
//! println!("RPM: {}", reading.sample.engine_rpm);
//! println!("faults: {:?}", reading.report.active_faults());
//! ```

pub mod config;
pub mod datalog;
pub mod decoder;
pub mod diagnostics;
pub mod ecu;
pub mod poll;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::MemsConfig;
    pub use crate::datalog::{DataLogger, Playbook, ScenarioFile};
    pub use crate::decoder::{decode, Sample};
    pub use crate::diagnostics::{AnalysisReport, DiagnosticsEngine, Metric, MetricStatistics};
    pub use crate::ecu::{EcuError, EcuReader, EcuStatus, Reading};
    pub use crate::poll::{PollLoop, PollSummary};
    pub use crate::protocol::{Actuator, Adjustment, Command, EcuTransport, Transport};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
