//! Raw dataframe layouts
//!
//! Both frames start with the command echo and a length byte, followed by fixed
//! offset fields. Multi-byte fields are big-endian.

use byteorder::{BigEndian, ByteOrder};

use super::DecodeError;

/// Size of the 0x80 frame including echo and length bytes
pub const DATAFRAME_80_SIZE: usize = 29;

/// Size of the 0x7D frame including echo and length bytes
pub const DATAFRAME_7D_SIZE: usize = 33;

fn check(frame: u8, expected: usize, data: &[u8]) -> Result<(), DecodeError> {
    if data.len() != expected {
        return Err(DecodeError::Length {
            frame,
            expected,
            actual: data.len(),
        });
    }
    if data[0] != frame {
        return Err(DecodeError::Echo {
            frame,
            actual: data[0],
        });
    }
    Ok(())
}

/// Undecoded 0x80 frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dataframe80 {
    /// Bytes 2-3, RPM
    pub engine_rpm: u16,
    /// Byte 4
    pub coolant_temp: u8,
    /// Byte 5
    pub ambient_temp: u8,
    /// Byte 6
    pub intake_air_temp: u8,
    /// Byte 7
    pub fuel_temp: u8,
    /// Byte 8
    pub map_kpa: u8,
    /// Byte 9, tenths of a volt
    pub battery_voltage: u8,
    /// Byte 10
    pub throttle_pot: u8,
    /// Byte 11
    pub idle_switch: u8,
    /// Byte 12
    pub aircon_switch: u8,
    /// Byte 13
    pub park_neutral_switch: u8,
    /// Byte 14
    pub dtc0: u8,
    /// Byte 15
    pub dtc1: u8,
    /// Byte 16
    pub idle_set_point: u8,
    /// Byte 17
    pub idle_hot: u8,
    /// Byte 19
    pub iac_position: u8,
    /// Bytes 20-21
    pub idle_speed_deviation: u16,
    /// Byte 22
    pub ignition_advance_offset: u8,
    /// Byte 23
    pub ignition_advance: u8,
    /// Bytes 24-25, in 2 µs units
    pub coil_time: u16,
    /// Byte 26
    pub crankshaft_position_sensor: u8,
}

impl Dataframe80 {
    /// Parse a complete frame
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        check(0x80, DATAFRAME_80_SIZE, data)?;

        Ok(Self {
            engine_rpm: BigEndian::read_u16(&data[2..4]),
            coolant_temp: data[4],
            ambient_temp: data[5],
            intake_air_temp: data[6],
            fuel_temp: data[7],
            map_kpa: data[8],
            battery_voltage: data[9],
            throttle_pot: data[10],
            idle_switch: data[11],
            aircon_switch: data[12],
            park_neutral_switch: data[13],
            dtc0: data[14],
            dtc1: data[15],
            idle_set_point: data[16],
            idle_hot: data[17],
            // 18 unknown
            iac_position: data[19],
            idle_speed_deviation: BigEndian::read_u16(&data[20..22]),
            ignition_advance_offset: data[22],
            ignition_advance: data[23],
            coil_time: BigEndian::read_u16(&data[24..26]),
            crankshaft_position_sensor: data[26],
            // 27, 28 unknown
        })
    }
}

/// Undecoded 0x7D frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dataframe7d {
    /// Byte 2
    pub ignition_switch: u8,
    /// Byte 3
    pub throttle_angle: u8,
    /// Byte 5
    pub air_fuel_ratio: u8,
    /// Byte 6
    pub dtc2: u8,
    /// Byte 7, in 5 mV units
    pub lambda_voltage: u8,
    /// Byte 8
    pub lambda_frequency: u8,
    /// Byte 9
    pub lambda_duty_cycle: u8,
    /// Byte 10
    pub lambda_status: u8,
    /// Byte 11, 0 when open loop
    pub loop_indicator: u8,
    /// Byte 12
    pub long_term_fuel_trim: u8,
    /// Byte 13
    pub short_term_fuel_trim: u8,
    /// Byte 14
    pub carbon_canister_purge_valve: u8,
    /// Byte 15
    pub dtc3: u8,
    /// Byte 16
    pub idle_base_position: u8,
    /// Byte 18
    pub dtc4: u8,
    /// Byte 19
    pub ignition_advance_offset: u8,
    /// Byte 20
    pub idle_speed_offset: u8,
    /// Byte 23
    pub dtc5: u8,
    /// Byte 32
    pub jack_count: u8,
}

impl Dataframe7d {
    /// Parse a complete frame
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        check(0x7d, DATAFRAME_7D_SIZE, data)?;

        Ok(Self {
            ignition_switch: data[2],
            throttle_angle: data[3],
            // 4 unknown
            air_fuel_ratio: data[5],
            dtc2: data[6],
            lambda_voltage: data[7],
            lambda_frequency: data[8],
            lambda_duty_cycle: data[9],
            lambda_status: data[10],
            loop_indicator: data[11],
            long_term_fuel_trim: data[12],
            short_term_fuel_trim: data[13],
            carbon_canister_purge_valve: data[14],
            dtc3: data[15],
            idle_base_position: data[16],
            // 17 unknown
            dtc4: data[18],
            ignition_advance_offset: data[19],
            idle_speed_offset: data[20],
            // 21, 22 unknown
            dtc5: data[23],
            // 24 to 31 unknown
            jack_count: data[32],
        })
    }
}
