//! Dataframe decoding
//!
//! Turns the raw 0x80 and 0x7D frames into a [`Sample`] of engineering values.
//!
//! Each field applies a fixed scale or offset to its raw byte:
//!
//! | Field | Transform |
//! |-------|-----------|
//! | temperatures | `b - 55` |
//! | battery | `b / 10` |
//! | throttle angle | `round(b * 6 / 10)` |
//! | coil time | `w * 0.002` (2dp) |
//! | ignition advance | `b / 2 - 24` |
//! | lambda voltage | `b * 5` mV |
//! | idle speed offset | `(b - 128) * 25` |
//! | LTFT / fuel trim correction | `b - 128` / `b - 100` |

mod frames;
mod sample;

pub use frames::{Dataframe7d, Dataframe80, DATAFRAME_7D_SIZE, DATAFRAME_80_SIZE};
pub use sample::Sample;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Idle switch bit in the 0x80 idle switch byte
pub const IDLE_SWITCH_ACTIVE: u8 = 1 << 4;
/// Coolant sensor fault bit in DTC0
pub const COOLANT_SENSOR_FAULT: u8 = 1 << 0;
/// Intake air sensor fault bit in DTC0
pub const AIR_SENSOR_FAULT: u8 = 1 << 1;
/// Fuel pump circuit fault bit in DTC1
pub const FUEL_PUMP_FAULT: u8 = 1 << 1;
/// Throttle pot circuit fault bit in DTC1
pub const THROTTLE_POT_FAULT: u8 = 1 << 7;

/// Errors from decoding a dataframe
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame is not its fixed size
    #[error("Dataframe {frame:#04x} is {actual} bytes, expected {expected}")]
    Length {
        /// Command the frame answers
        frame: u8,
        /// Fixed frame size
        expected: usize,
        /// Bytes received
        actual: usize,
    },

    /// First byte is not the command echo
    #[error("Dataframe {frame:#04x} starts with {actual:#04x}")]
    Echo {
        /// Command the frame answers
        frame: u8,
        /// Byte found instead
        actual: u8,
    },
}

fn round_2dp(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

fn temperature(raw: u8) -> i32 {
    i32::from(raw) - 55
}

/// Decode both dataframes into a sample
pub fn decode(
    timestamp: NaiveDateTime,
    frame_80: &[u8],
    frame_7d: &[u8],
) -> Result<Sample, DecodeError> {
    let df80 = Dataframe80::parse(frame_80)?;
    let df7d = Dataframe7d::parse(frame_7d)?;

    Ok(Sample {
        timestamp,
        engine_rpm: i32::from(df80.engine_rpm),
        coolant_temp: temperature(df80.coolant_temp),
        ambient_temp: temperature(df80.ambient_temp),
        intake_air_temp: temperature(df80.intake_air_temp),
        fuel_temp: temperature(df80.fuel_temp),
        manifold_absolute_pressure: f32::from(df80.map_kpa),
        battery_voltage: f32::from(df80.battery_voltage) / 10.0,
        throttle_pot_sensor: round_2dp(f32::from(df80.throttle_pot) * 0.02),
        idle_switch: df80.idle_switch & IDLE_SWITCH_ACTIVE != 0,
        aircon_switch: df80.aircon_switch != 0,
        park_neutral_switch: df80.park_neutral_switch != 0,
        dtc0: df80.dtc0,
        dtc1: df80.dtc1,
        idle_set_point: i32::from(df80.idle_set_point),
        idle_hot: i32::from(df80.idle_hot) - 35,
        iac_position: i32::from(df80.iac_position),
        idle_speed_deviation: i32::from(df80.idle_speed_deviation),
        ignition_advance_offset_80: i32::from(df80.ignition_advance_offset),
        ignition_advance: f32::from(df80.ignition_advance) / 2.0 - 24.0,
        coil_time: round_2dp(f32::from(df80.coil_time) * 0.002),
        crankshaft_position_sensor: i32::from(df80.crankshaft_position_sensor),

        ignition_switch: df7d.ignition_switch != 0,
        throttle_angle: (f64::from(df7d.throttle_angle) * 6.0 / 10.0).round() as i32,
        air_fuel_ratio: f32::from(df7d.air_fuel_ratio) / 10.0,
        dtc2: df7d.dtc2,
        lambda_voltage: i32::from(df7d.lambda_voltage) * 5,
        lambda_frequency: i32::from(df7d.lambda_frequency),
        lambda_duty_cycle: i32::from(df7d.lambda_duty_cycle),
        lambda_status: i32::from(df7d.lambda_status),
        closed_loop: df7d.loop_indicator != 0,
        long_term_fuel_trim: i32::from(df7d.long_term_fuel_trim) - 128,
        short_term_fuel_trim: i32::from(df7d.short_term_fuel_trim),
        fuel_trim_correction: i32::from(df7d.short_term_fuel_trim) - 100,
        carbon_canister_purge_valve: i32::from(df7d.carbon_canister_purge_valve),
        dtc3: df7d.dtc3,
        idle_base_position: i32::from(df7d.idle_base_position),
        dtc4: df7d.dtc4,
        ignition_advance_offset_7d: i32::from(df7d.ignition_advance_offset) - 48,
        idle_speed_offset: (i32::from(df7d.idle_speed_offset) - 128) * 25,
        dtc5: df7d.dtc5,
        jack_count: i32::from(df7d.jack_count),

        coolant_temp_sensor_fault: df80.dtc0 & COOLANT_SENSOR_FAULT != 0,
        intake_air_temp_sensor_fault: df80.dtc0 & AIR_SENSOR_FAULT != 0,
        fuel_pump_circuit_fault: df80.dtc1 & FUEL_PUMP_FAULT != 0,
        throttle_pot_circuit_fault: df80.dtc1 & THROTTLE_POT_FAULT != 0,

        dataframe_80: hex::encode_upper(frame_80),
        dataframe_7d: hex::encode_upper(frame_7d),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{SAMPLE_DATAFRAME_7D, SAMPLE_DATAFRAME_80};

    fn noon() -> NaiveDateTime {
        chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    #[test]
    fn test_fault_bits() {
        let mut d80 = SAMPLE_DATAFRAME_80;
        d80[14] = COOLANT_SENSOR_FAULT | AIR_SENSOR_FAULT;
        d80[15] = THROTTLE_POT_FAULT;
        let sample = decode(noon(), &d80, &SAMPLE_DATAFRAME_7D).unwrap();
        assert!(sample.coolant_temp_sensor_fault);
        assert!(sample.intake_air_temp_sensor_fault);
        assert!(!sample.fuel_pump_circuit_fault);
        assert!(sample.throttle_pot_circuit_fault);
    }

    #[test]
    fn test_idle_switch_bit() {
        let mut d80 = SAMPLE_DATAFRAME_80;
        d80[11] = 0x08;
        assert!(!decode(noon(), &d80, &SAMPLE_DATAFRAME_7D).unwrap().idle_switch);
        d80[11] = 0x10;
        assert!(decode(noon(), &d80, &SAMPLE_DATAFRAME_7D).unwrap().idle_switch);
    }

    #[test]
    fn test_signed_transforms() {
        let mut d7d = SAMPLE_DATAFRAME_7D;
        d7d[12] = 0x70;
        d7d[20] = 0x7e;
        let sample = decode(noon(), &SAMPLE_DATAFRAME_80, &d7d).unwrap();
        assert_eq!(sample.long_term_fuel_trim, -16);
        assert_eq!(sample.idle_speed_offset, -50);
    }

    #[test]
    fn test_empty_sample() {
        let sample = Sample::empty(noon());
        assert_eq!(sample.timestamp, noon());
        assert_eq!(sample.engine_rpm, 0);
        assert!(sample.dataframe_80.is_empty());
        assert!(!sample.is_running());
    }
}
