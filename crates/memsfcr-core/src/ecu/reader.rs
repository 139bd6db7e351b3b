//! ECU reader

use chrono::Local;
use tracing::{info, warn};

use super::status::{parse_ecu_id, parse_ecu_serial};
use super::{EcuError, EcuStatus, Reading};
use crate::config::MemsConfig;
use crate::decoder;
use crate::diagnostics::{DiagnosticsEngine, DEFAULT_WINDOW_SIZE};
use crate::protocol::{
    Actuator, Adjustment, Command, EcuTransport, ProtocolError, Transport, IAC_POSITION_DEFAULT,
};

/// Command layer over a transport, with diagnostics for every polled sample
pub struct EcuReader {
    transport: EcuTransport,
    status: EcuStatus,
    diagnostics: DiagnosticsEngine,
    window_size: usize,
}

impl EcuReader {
    /// Create a reader with the default diagnostics window
    pub fn new(transport: EcuTransport) -> Self {
        Self::with_window_size(transport, DEFAULT_WINDOW_SIZE)
    }

    /// Create a reader whose diagnostics window holds `window_size` samples
    pub fn with_window_size(transport: EcuTransport, window_size: usize) -> Self {
        Self {
            transport,
            status: EcuStatus::default(),
            diagnostics: DiagnosticsEngine::new(window_size),
            window_size,
        }
    }

    /// Create a reader for the configured connection
    pub fn from_config(config: &MemsConfig) -> Self {
        let transport = EcuTransport::from_descriptor(&config.connection, config);
        Self::with_window_size(transport, config.window_size)
    }

    /// Current status
    pub fn status(&self) -> &EcuStatus {
        &self.status
    }

    /// Diagnostics over the samples read so far
    pub fn diagnostics(&self) -> &DiagnosticsEngine {
        &self.diagnostics
    }

    /// Underlying transport
    pub fn transport(&self) -> &EcuTransport {
        &self.transport
    }

    /// Underlying transport, for playback seeking
    pub fn transport_mut(&mut self) -> &mut EcuTransport {
        &mut self.transport
    }

    /// True once `connect` succeeded and the transport is still open
    pub fn is_connected(&self) -> bool {
        self.status.connected && self.transport.is_connected()
    }

    /// Connect and read the ECU identity.
    ///
    /// Returns `Ok(false)` when the port opened but no ECU answered. The status is
    /// cleared unless the connection succeeds.
    pub fn connect(&mut self) -> Result<bool, EcuError> {
        self.status = EcuStatus::default();
        if !self.transport.connect()? {
            return Ok(false);
        }
        self.status.connected = true;

        match self.send(Command::EcuId.code()) {
            Ok(response) => self.status.ecu_id = parse_ecu_id(&response),
            Err(e) => warn!("unable to read ECU ID: {}", e),
        }
        match self.send(Command::EcuSerial.code()) {
            Ok(response) => self.status.ecu_serial = parse_ecu_serial(&response),
            Err(e) => warn!("unable to read ECU serial: {}", e),
        }
        self.status.iac_position = self.iac_position();

        info!(
            ecu_id = %self.status.ecu_id,
            serial = %self.status.ecu_serial,
            iac = self.status.iac_position,
            "connected to ECU"
        );
        Ok(true)
    }

    /// Disconnect and clear the status. Safe to call when already disconnected.
    pub fn disconnect(&mut self) -> Result<(), EcuError> {
        let result = self.transport.disconnect();
        self.status = EcuStatus::default();
        result.map_err(EcuError::from)
    }

    /// Discard all diagnostic history
    pub fn reset_diagnostics(&mut self) {
        self.diagnostics = DiagnosticsEngine::new(self.window_size);
        info!(window = self.window_size, "diagnostics reset");
    }

    /// Poll both dataframes, decode them and run the diagnostics
    pub fn read_dataframes(&mut self) -> Result<Reading, EcuError> {
        let frame_80 = self.send(Command::Dataframe80.code())?;
        let frame_7d = self.send(Command::Dataframe7d.code())?;

        let timestamp = Local::now().naive_local();
        let sample = decoder::decode(timestamp, &frame_80, &frame_7d)?;
        let report = self.diagnostics.analyse(&sample);

        if !report.active_faults().is_empty() {
            info!(faults = ?report.active_faults(), "faults detected");
        }

        Ok(Reading { sample, report })
    }

    /// Step an adjustable value up (positive) or down (negative) and return its new value
    pub fn adjust(&mut self, adjustment: Adjustment, steps: i32) -> Result<i32, EcuError> {
        if steps == 0 {
            warn!(?adjustment, "0 step adjustment requested, ignoring");
            return Err(EcuError::NoAdjustment {
                default: adjustment.default_value(),
            });
        }

        let command = if steps > 0 {
            adjustment.increment()
        } else {
            adjustment.decrement()
        };

        let mut response = Vec::new();
        for _ in 0..steps.unsigned_abs() {
            response = self.send(command)?;
        }

        let value = value_byte(command, &response)?;
        info!(?adjustment, steps, value, "adjustment applied");
        Ok(value)
    }

    /// Step the short term fuel trim
    pub fn adjust_short_term_fuel_trim(&mut self, steps: i32) -> Result<i32, EcuError> {
        self.adjust(Adjustment::ShortTermFuelTrim, steps)
    }

    /// Step the long term fuel trim
    pub fn adjust_long_term_fuel_trim(&mut self, steps: i32) -> Result<i32, EcuError> {
        self.adjust(Adjustment::LongTermFuelTrim, steps)
    }

    /// Step the idle decay
    pub fn adjust_idle_decay(&mut self, steps: i32) -> Result<i32, EcuError> {
        self.adjust(Adjustment::IdleDecay, steps)
    }

    /// Step the target idle speed
    pub fn adjust_idle_speed(&mut self, steps: i32) -> Result<i32, EcuError> {
        self.adjust(Adjustment::IdleSpeed, steps)
    }

    /// Step the ignition advance offset
    pub fn adjust_ignition_advance_offset(&mut self, steps: i32) -> Result<i32, EcuError> {
        self.adjust(Adjustment::IgnitionAdvanceOffset, steps)
    }

    /// Move the IAC stepper, keeping the status in step
    pub fn adjust_iac_position(&mut self, steps: i32) -> Result<i32, EcuError> {
        let value = self.adjust(Adjustment::IacPosition, steps)?;
        self.status.iac_position = value;
        Ok(value)
    }

    /// Switch an actuator on or off
    pub fn activate(&mut self, actuator: Actuator, on: bool) -> Result<(), EcuError> {
        let command = if on { actuator.on() } else { actuator.off() };
        self.send(command)?;
        info!(?actuator, on, "actuator switched");
        Ok(())
    }

    /// Pulse the injectors
    pub fn test_injectors(&mut self) -> Result<(), EcuError> {
        self.send(Command::TestInjectors.code()).map(drop)
    }

    /// Pulse the MPI injectors
    pub fn test_mpi_injectors(&mut self) -> Result<(), EcuError> {
        self.send(Command::TestMpiInjectors.code()).map(drop)
    }

    /// Fire the coil once
    pub fn fire_coil(&mut self) -> Result<(), EcuError> {
        self.send(Command::FireCoil.code()).map(drop)
    }

    /// Keep the diagnostic session alive
    pub fn heartbeat(&mut self) -> Result<(), EcuError> {
        self.send(Command::Heartbeat.code()).map(drop)
    }

    /// Clear all adjustable values
    pub fn reset_adjustments(&mut self) -> Result<(), EcuError> {
        self.send(Command::ResetAdjustments.code()).map(drop)
    }

    /// Clear faults, adjustments and learnt values
    pub fn reset_ecu(&mut self) -> Result<(), EcuError> {
        self.send(Command::ResetEcu.code()).map(drop)
    }

    /// Clear the ECU fault codes
    pub fn clear_faults(&mut self) -> Result<(), EcuError> {
        self.send(Command::ClearFaults.code()).map(drop)
    }

    /// Read the IAC stepper position, falling back to the default when it can't be read
    pub fn iac_position(&mut self) -> i32 {
        let command = Command::IacPosition.code();
        match self
            .send(command)
            .and_then(|response| value_byte(command, &response))
        {
            Ok(position) => position,
            Err(e) => {
                warn!("unable to read IAC position, using default: {}", e);
                IAC_POSITION_DEFAULT
            }
        }
    }

    fn send(&mut self, command: u8) -> Result<Vec<u8>, EcuError> {
        if !self.status.connected {
            return Err(ProtocolError::NotConnected.into());
        }
        Ok(self.transport.send_and_receive(&[command])?)
    }
}

fn value_byte(command: u8, response: &[u8]) -> Result<i32, EcuError> {
    response
        .get(1)
        .map(|&b| i32::from(b))
        .ok_or_else(|| EcuError::MissingValue {
            command,
            response: response.to_vec(),
        })
}
