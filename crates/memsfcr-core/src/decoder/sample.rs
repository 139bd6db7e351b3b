//! Decoded engine readings

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One decoded pair of dataframes in engineering units
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the frames were read
    pub timestamp: NaiveDateTime,

    // 0x80 frame
    /// Engine speed
    pub engine_rpm: i32,
    /// Degrees C
    pub coolant_temp: i32,
    /// Degrees C, 200 when no sensor is fitted
    pub ambient_temp: i32,
    /// Degrees C
    pub intake_air_temp: i32,
    /// Degrees C, 200 when no sensor is fitted
    pub fuel_temp: i32,
    /// kPa
    pub manifold_absolute_pressure: f32,
    /// Volts
    pub battery_voltage: f32,
    /// Volts
    pub throttle_pot_sensor: f32,
    /// Throttle closed
    pub idle_switch: bool,
    /// A/C requested
    pub aircon_switch: bool,
    /// Automatic gearbox in park or neutral
    pub park_neutral_switch: bool,
    /// Fault byte 0: coolant (bit 0) and air temperature (bit 1) sensors
    pub dtc0: u8,
    /// Fault byte 1: fuel pump (bit 1) and throttle pot (bit 7) circuits
    pub dtc1: u8,
    /// Target idle speed step
    pub idle_set_point: i32,
    /// Learnt hot idle value
    pub idle_hot: i32,
    /// IAC stepper position in steps
    pub iac_position: i32,
    /// RPM away from target idle
    pub idle_speed_deviation: i32,
    /// Ignition advance offset from the 0x80 frame
    pub ignition_advance_offset_80: i32,
    /// Degrees
    pub ignition_advance: f32,
    /// Milliseconds
    pub coil_time: f32,
    /// 0 when the sensor signal is missing
    pub crankshaft_position_sensor: i32,

    // 0x7D frame
    /// Ignition on
    pub ignition_switch: bool,
    /// Degrees
    pub throttle_angle: i32,
    /// Air/fuel ratio
    pub air_fuel_ratio: f32,
    /// Fault byte 2
    pub dtc2: u8,
    /// Millivolts
    pub lambda_voltage: i32,
    /// Lambda sensor switching frequency
    pub lambda_frequency: i32,
    /// Lambda sensor duty cycle
    pub lambda_duty_cycle: i32,
    /// 1 when the O2 system is active
    pub lambda_status: i32,
    /// Fuelling follows the lambda sensor
    pub closed_loop: bool,
    /// LTFT
    pub long_term_fuel_trim: i32,
    /// STFT
    pub short_term_fuel_trim: i32,
    /// STFT relative to 100
    pub fuel_trim_correction: i32,
    /// Purge valve duty
    pub carbon_canister_purge_valve: i32,
    /// Fault byte 3
    pub dtc3: u8,
    /// Base idle stepper position
    pub idle_base_position: i32,
    /// Fault byte 4
    pub dtc4: u8,
    /// Ignition advance offset from the 0x7D frame
    pub ignition_advance_offset_7d: i32,
    /// Idle speed offset in RPM
    pub idle_speed_offset: i32,
    /// Fault byte 5, 255 on a valid frame
    pub dtc5: u8,
    /// Throttle re-learn count
    pub jack_count: i32,

    // circuit faults reported by the ECU
    /// Coolant sensor circuit fault (dtc0 bit 0)
    pub coolant_temp_sensor_fault: bool,
    /// Intake air sensor circuit fault (dtc0 bit 1)
    pub intake_air_temp_sensor_fault: bool,
    /// Fuel pump circuit fault (dtc1 bit 1)
    pub fuel_pump_circuit_fault: bool,
    /// Throttle pot circuit fault (dtc1 bit 7)
    pub throttle_pot_circuit_fault: bool,

    /// 0x80 frame as upper-case hex
    pub dataframe_80: String,
    /// 0x7D frame as upper-case hex
    pub dataframe_7d: String,
}

impl Sample {
    /// A zeroed sample
    pub fn empty(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    /// Time of day with milliseconds, as written to logs
    pub fn time_of_day(&self) -> String {
        self.timestamp.format("%H:%M:%S%.3f").to_string()
    }

    /// Whether the engine is turning
    pub fn is_running(&self) -> bool {
        self.engine_rpm > 0
    }
}
