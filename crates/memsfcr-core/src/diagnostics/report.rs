//! Analysis report

use serde::{Deserialize, Serialize};

/// Engine status and fault flags for one sample
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    // status
    /// Sample admitted with the engine turning
    pub is_engine_running: bool,
    /// Coolant below 78 °C
    pub is_engine_warming: bool,
    /// Coolant at 78 °C or above
    pub is_at_operating_temp: bool,
    /// Running with the throttle nearly closed
    pub is_engine_idle: bool,
    /// Steady RPM above 900 off idle
    pub is_cruising: bool,
    /// Fuelling on lambda feedback
    pub is_closed_loop: bool,
    /// Throttle open or RPM above idle
    pub is_throttle_active: bool,

    // faults derived from the readings
    /// Battery below 13.0 V
    pub battery_fault: bool,
    /// Coil charge time above 4 ms with a healthy battery
    pub coil_fault: bool,
    /// Idle manifold pressure above 45 kPa
    pub map_fault: bool,
    /// Same threshold as `map_fault`, points at a split vacuum hose
    pub vacuum_fault: bool,
    /// ECU reports the O2 system inactive
    pub o2_system_fault: bool,
    /// Idle base position out of range for the engine temperature
    pub idle_fault: bool,
    /// Learnt hot idle outside 10 to 55
    pub idle_hot_fault: bool,
    /// ECU not holding idle speed over the window
    pub idle_speed_fault: bool,
    /// Large idle offset with the IAC stepper closed
    pub idle_air_control_fault: bool,
    /// Throttle re-learn count at 50 or more
    pub idle_air_control_jack_fault: bool,
    /// Lambda outside 10 to 900 mV while running
    pub lambda_range_fault: bool,
    /// Lambda not switching over a full window
    pub lambda_oscillation_fault: bool,
    /// Still cold past the predicted warm-up time
    pub thermostat_fault: bool,
    /// No crankshaft sensor signal
    pub crankshaft_sensor_fault: bool,

    // faults reported by the ECU
    /// Coolant sensor circuit
    pub coolant_temp_sensor_fault: bool,
    /// Intake air sensor circuit
    pub intake_air_temp_sensor_fault: bool,
    /// Fuel pump circuit
    pub fuel_pump_circuit_fault: bool,
    /// Throttle pot circuit
    pub throttle_pot_circuit_fault: bool,

    /// Latest IAC stepper position
    pub iac_position: i32,
}

impl AnalysisReport {
    /// Status flags as (name, value) in log column order
    pub fn status_flags(&self) -> [(&'static str, bool); 7] {
        [
            ("is_engine_running", self.is_engine_running),
            ("is_engine_warming", self.is_engine_warming),
            ("is_at_operating_temp", self.is_at_operating_temp),
            ("is_engine_idle", self.is_engine_idle),
            ("is_cruising", self.is_cruising),
            ("is_closed_loop", self.is_closed_loop),
            ("is_throttle_active", self.is_throttle_active),
        ]
    }

    /// Fault flags as (name, value) in log column order
    pub fn fault_flags(&self) -> [(&'static str, bool); 18] {
        [
            ("battery_fault", self.battery_fault),
            ("coil_fault", self.coil_fault),
            ("map_fault", self.map_fault),
            ("vacuum_fault", self.vacuum_fault),
            ("o2_system_fault", self.o2_system_fault),
            ("idle_fault", self.idle_fault),
            ("idle_hot_fault", self.idle_hot_fault),
            ("idle_speed_fault", self.idle_speed_fault),
            ("idle_air_control_fault", self.idle_air_control_fault),
            ("idle_air_control_jack_fault", self.idle_air_control_jack_fault),
            ("lambda_range_fault", self.lambda_range_fault),
            ("lambda_oscillation_fault", self.lambda_oscillation_fault),
            ("thermostat_fault", self.thermostat_fault),
            ("crankshaft_sensor_fault", self.crankshaft_sensor_fault),
            ("coolant_temp_sensor_fault", self.coolant_temp_sensor_fault),
            ("intake_air_temp_sensor_fault", self.intake_air_temp_sensor_fault),
            ("fuel_pump_circuit_fault", self.fuel_pump_circuit_fault),
            ("throttle_pot_circuit_fault", self.throttle_pot_circuit_fault),
        ]
    }

    /// Names of the faults that are set
    pub fn active_faults(&self) -> Vec<&'static str> {
        self.fault_flags()
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }

    /// Whether any fault is set
    pub fn has_faults(&self) -> bool {
        self.fault_flags().iter().any(|(_, set)| *set)
    }
}
