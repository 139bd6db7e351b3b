//! Protocol commands
//!
//! The MEMS 1.6 diagnostic command set. Every command is a single byte and every
//! response starts with an echo of that byte.

use serde::{Deserialize, Serialize};

/// Commands used by the reader for status, initialisation and data requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Command {
    /// First initialisation command (0xCA)
    InitA,
    /// Second initialisation command (0x75)
    InitB,
    /// Keep-alive (0xF4)
    Heartbeat,
    /// Request the ECU identifier (0xD0)
    EcuId,
    /// Request the ECU serial number (0xD1)
    EcuSerial,
    /// Request the 0x80 dataframe
    Dataframe80,
    /// Request the 0x7D dataframe
    Dataframe7d,
    /// Read the idle air control stepper position (0xFB)
    IacPosition,
    /// Clear all adjustable values (0x0F)
    ResetAdjustments,
    /// Clear recorded fault codes (0xCC)
    ClearFaults,
    /// Clear faults, adjustments and learnt values (0xFA)
    ResetEcu,
    /// Fire the multipoint injectors (0xEF)
    TestMpiInjectors,
    /// Fire the injectors (0xF7)
    TestInjectors,
    /// Fire the ignition coil (0xF8)
    FireCoil,
}

impl Command {
    /// Command byte sent on the wire
    pub fn code(&self) -> u8 {
        match self {
            Command::InitA => 0xca,
            Command::InitB => 0x75,
            Command::Heartbeat => 0xf4,
            Command::EcuId => 0xd0,
            Command::EcuSerial => 0xd1,
            Command::Dataframe80 => 0x80,
            Command::Dataframe7d => 0x7d,
            Command::IacPosition => 0xfb,
            Command::ResetAdjustments => 0x0f,
            Command::ClearFaults => 0xcc,
            Command::ResetEcu => 0xfa,
            Command::TestMpiInjectors => 0xef,
            Command::TestInjectors => 0xf7,
            Command::FireCoil => 0xf8,
        }
    }

    /// Command as a one byte request buffer
    pub fn bytes(&self) -> [u8; 1] {
        [self.code()]
    }

    /// Whether this command requests one of the two telemetry dataframes
    pub fn is_dataframe(code: u8) -> bool {
        code == Command::Dataframe80.code() || code == Command::Dataframe7d.code()
    }
}

/// Values the ECU allows to be stepped up or down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adjustment {
    /// Short term fuel trim
    ShortTermFuelTrim,
    /// Long term fuel trim
    LongTermFuelTrim,
    /// Idle decay
    IdleDecay,
    /// Idle speed
    IdleSpeed,
    /// Ignition advance offset
    IgnitionAdvanceOffset,
    /// Idle air control stepper position
    IacPosition,
}

impl Adjustment {
    /// Command that increments the value by one step
    pub fn increment(&self) -> u8 {
        match self {
            Adjustment::ShortTermFuelTrim => 0x79,
            Adjustment::LongTermFuelTrim => 0x7b,
            Adjustment::IdleDecay => 0x89,
            Adjustment::IdleSpeed => 0x91,
            Adjustment::IgnitionAdvanceOffset => 0x93,
            Adjustment::IacPosition => 0xfd,
        }
    }

    /// Command that decrements the value by one step
    pub fn decrement(&self) -> u8 {
        match self {
            Adjustment::ShortTermFuelTrim => 0x7a,
            Adjustment::LongTermFuelTrim => 0x7c,
            Adjustment::IdleDecay => 0x8a,
            Adjustment::IdleSpeed => 0x92,
            Adjustment::IgnitionAdvanceOffset => 0x94,
            Adjustment::IacPosition => 0xfe,
        }
    }

    /// Value reported by an ECU with no adjustment applied
    pub fn default_value(&self) -> i32 {
        match self {
            Adjustment::ShortTermFuelTrim | Adjustment::LongTermFuelTrim => FUEL_TRIM_DEFAULT,
            Adjustment::IdleDecay => IDLE_DECAY_DEFAULT,
            Adjustment::IdleSpeed => IDLE_SPEED_DEFAULT,
            Adjustment::IgnitionAdvanceOffset => IGNITION_ADVANCE_OFFSET_DEFAULT,
            Adjustment::IacPosition => IAC_POSITION_DEFAULT,
        }
    }
}

/// Relays, valves and fans that can be switched from the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Actuator {
    /// Fuel pump relay
    FuelPump,
    /// Inlet manifold heater relay
    PtcRelay,
    /// A/C clutch relay
    AirconRelay,
    /// Carbon canister purge valve
    PurgeValve,
    /// Lambda sensor heater
    O2Heater,
    /// Turbo boost valve (MEMS 1.9 turbo only)
    BoostValve,
    /// Radiator fan 1
    Fan1,
    /// Radiator fan 2
    Fan2,
}

impl Actuator {
    /// Command that switches the actuator on
    pub fn on(&self) -> u8 {
        match self {
            Actuator::FuelPump => 0x11,
            Actuator::PtcRelay => 0x12,
            Actuator::AirconRelay => 0x13,
            Actuator::PurgeValve => 0x18,
            Actuator::O2Heater => 0x19,
            Actuator::BoostValve => 0x1b,
            Actuator::Fan1 => 0x1d,
            Actuator::Fan2 => 0x1e,
        }
    }

    /// Command that switches the actuator off
    pub fn off(&self) -> u8 {
        match self {
            Actuator::FuelPump => 0x01,
            Actuator::PtcRelay => 0x02,
            Actuator::AirconRelay => 0x03,
            Actuator::PurgeValve => 0x08,
            Actuator::O2Heater => 0x09,
            Actuator::BoostValve => 0x0b,
            Actuator::Fan1 => 0x0d,
            Actuator::Fan2 => 0x0e,
        }
    }
}

/// Default fuel trim reading (short and long term)
pub const FUEL_TRIM_DEFAULT: i32 = 138;

/// Default idle decay reading
pub const IDLE_DECAY_DEFAULT: i32 = 35;

/// Default idle speed reading
pub const IDLE_SPEED_DEFAULT: i32 = 128;

/// Default ignition advance offset reading
pub const IGNITION_ADVANCE_OFFSET_DEFAULT: i32 = 128;

/// Default IAC stepper position, also used when the position cannot be read
pub const IAC_POSITION_DEFAULT: i32 = 128;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_codes() {
        assert_eq!(Command::InitA.code(), 0xca);
        assert_eq!(Command::Dataframe80.bytes(), [0x80]);
        assert!(Command::is_dataframe(0x7d));
        assert!(!Command::is_dataframe(0xd0));
    }

    #[test]
    fn test_adjustment_pairs() {
        assert_eq!(Adjustment::ShortTermFuelTrim.increment(), 0x79);
        assert_eq!(Adjustment::ShortTermFuelTrim.decrement(), 0x7a);
        assert_eq!(Adjustment::IacPosition.default_value(), 128);
        assert_eq!(Adjustment::IdleDecay.default_value(), 35);
    }

    #[test]
    fn test_actuator_pairs() {
        assert_eq!(Actuator::FuelPump.on(), 0x11);
        assert_eq!(Actuator::FuelPump.off(), 0x01);
        assert_eq!(Actuator::Fan2.on(), 0x1e);
        assert_eq!(Actuator::Fan2.off(), 0x0e);
    }
}
