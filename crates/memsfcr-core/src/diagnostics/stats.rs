//! Per-metric statistics
//!
//! Metrics are selected by an explicit enum rather than by field name lookups.
//! Every statistic is recomputed from the window each time it is asked for.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::decoder::Sample;

/// Numeric sample fields that statistics can be computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// [`Sample::engine_rpm`]
    EngineRpm,
    /// [`Sample::coolant_temp`]
    CoolantTemp,
    /// [`Sample::ambient_temp`]
    AmbientTemp,
    /// [`Sample::intake_air_temp`]
    IntakeAirTemp,
    /// [`Sample::fuel_temp`]
    FuelTemp,
    /// [`Sample::manifold_absolute_pressure`]
    ManifoldAbsolutePressure,
    /// [`Sample::battery_voltage`]
    BatteryVoltage,
    /// [`Sample::throttle_pot_sensor`]
    ThrottlePotSensor,
    /// [`Sample::idle_set_point`]
    IdleSetPoint,
    /// [`Sample::idle_hot`]
    IdleHot,
    /// [`Sample::iac_position`]
    IacPosition,
    /// [`Sample::idle_speed_deviation`]
    IdleSpeedDeviation,
    /// [`Sample::ignition_advance_offset_80`]
    IgnitionAdvanceOffset80,
    /// [`Sample::ignition_advance`]
    IgnitionAdvance,
    /// [`Sample::coil_time`]
    CoilTime,
    /// [`Sample::crankshaft_position_sensor`]
    CrankshaftPositionSensor,
    /// [`Sample::throttle_angle`]
    ThrottleAngle,
    /// [`Sample::air_fuel_ratio`]
    AirFuelRatio,
    /// [`Sample::lambda_voltage`]
    LambdaVoltage,
    /// [`Sample::lambda_frequency`]
    LambdaFrequency,
    /// [`Sample::lambda_duty_cycle`]
    LambdaDutyCycle,
    /// [`Sample::lambda_status`]
    LambdaStatus,
    /// [`Sample::long_term_fuel_trim`]
    LongTermFuelTrim,
    /// [`Sample::short_term_fuel_trim`]
    ShortTermFuelTrim,
    /// [`Sample::fuel_trim_correction`]
    FuelTrimCorrection,
    /// [`Sample::carbon_canister_purge_valve`]
    CarbonCanisterPurgeValve,
    /// [`Sample::idle_base_position`]
    IdleBasePosition,
    /// [`Sample::ignition_advance_offset_7d`]
    IgnitionAdvanceOffset7d,
    /// [`Sample::idle_speed_offset`]
    IdleSpeedOffset,
    /// [`Sample::jack_count`]
    JackCount,
}

impl Metric {
    /// Every metric
    pub const ALL: [Metric; 30] = [
        Metric::EngineRpm,
        Metric::CoolantTemp,
        Metric::AmbientTemp,
        Metric::IntakeAirTemp,
        Metric::FuelTemp,
        Metric::ManifoldAbsolutePressure,
        Metric::BatteryVoltage,
        Metric::ThrottlePotSensor,
        Metric::IdleSetPoint,
        Metric::IdleHot,
        Metric::IacPosition,
        Metric::IdleSpeedDeviation,
        Metric::IgnitionAdvanceOffset80,
        Metric::IgnitionAdvance,
        Metric::CoilTime,
        Metric::CrankshaftPositionSensor,
        Metric::ThrottleAngle,
        Metric::AirFuelRatio,
        Metric::LambdaVoltage,
        Metric::LambdaFrequency,
        Metric::LambdaDutyCycle,
        Metric::LambdaStatus,
        Metric::LongTermFuelTrim,
        Metric::ShortTermFuelTrim,
        Metric::FuelTrimCorrection,
        Metric::CarbonCanisterPurgeValve,
        Metric::IdleBasePosition,
        Metric::IgnitionAdvanceOffset7d,
        Metric::IdleSpeedOffset,
        Metric::JackCount,
    ];

    /// Field name of the metric
    pub fn name(&self) -> &'static str {
        match self {
            Metric::EngineRpm => "engine_rpm",
            Metric::CoolantTemp => "coolant_temp",
            Metric::AmbientTemp => "ambient_temp",
            Metric::IntakeAirTemp => "intake_air_temp",
            Metric::FuelTemp => "fuel_temp",
            Metric::ManifoldAbsolutePressure => "manifold_absolute_pressure",
            Metric::BatteryVoltage => "battery_voltage",
            Metric::ThrottlePotSensor => "throttle_pot_sensor",
            Metric::IdleSetPoint => "idle_set_point",
            Metric::IdleHot => "idle_hot",
            Metric::IacPosition => "iac_position",
            Metric::IdleSpeedDeviation => "idle_speed_deviation",
            Metric::IgnitionAdvanceOffset80 => "ignition_advance_offset_80",
            Metric::IgnitionAdvance => "ignition_advance",
            Metric::CoilTime => "coil_time",
            Metric::CrankshaftPositionSensor => "crankshaft_position_sensor",
            Metric::ThrottleAngle => "throttle_angle",
            Metric::AirFuelRatio => "air_fuel_ratio",
            Metric::LambdaVoltage => "lambda_voltage",
            Metric::LambdaFrequency => "lambda_frequency",
            Metric::LambdaDutyCycle => "lambda_duty_cycle",
            Metric::LambdaStatus => "lambda_status",
            Metric::LongTermFuelTrim => "long_term_fuel_trim",
            Metric::ShortTermFuelTrim => "short_term_fuel_trim",
            Metric::FuelTrimCorrection => "fuel_trim_correction",
            Metric::CarbonCanisterPurgeValve => "carbon_canister_purge_valve",
            Metric::IdleBasePosition => "idle_base_position",
            Metric::IgnitionAdvanceOffset7d => "ignition_advance_offset_7d",
            Metric::IdleSpeedOffset => "idle_speed_offset",
            Metric::JackCount => "jack_count",
        }
    }

    /// Read this metric from a sample
    pub fn value(&self, s: &Sample) -> f64 {
        match self {
            Metric::EngineRpm => f64::from(s.engine_rpm),
            Metric::CoolantTemp => f64::from(s.coolant_temp),
            Metric::AmbientTemp => f64::from(s.ambient_temp),
            Metric::IntakeAirTemp => f64::from(s.intake_air_temp),
            Metric::FuelTemp => f64::from(s.fuel_temp),
            Metric::ManifoldAbsolutePressure => f64::from(s.manifold_absolute_pressure),
            Metric::BatteryVoltage => f64::from(s.battery_voltage),
            Metric::ThrottlePotSensor => f64::from(s.throttle_pot_sensor),
            Metric::IdleSetPoint => f64::from(s.idle_set_point),
            Metric::IdleHot => f64::from(s.idle_hot),
            Metric::IacPosition => f64::from(s.iac_position),
            Metric::IdleSpeedDeviation => f64::from(s.idle_speed_deviation),
            Metric::IgnitionAdvanceOffset80 => f64::from(s.ignition_advance_offset_80),
            Metric::IgnitionAdvance => f64::from(s.ignition_advance),
            Metric::CoilTime => f64::from(s.coil_time),
            Metric::CrankshaftPositionSensor => f64::from(s.crankshaft_position_sensor),
            Metric::ThrottleAngle => f64::from(s.throttle_angle),
            Metric::AirFuelRatio => f64::from(s.air_fuel_ratio),
            Metric::LambdaVoltage => f64::from(s.lambda_voltage),
            Metric::LambdaFrequency => f64::from(s.lambda_frequency),
            Metric::LambdaDutyCycle => f64::from(s.lambda_duty_cycle),
            Metric::LambdaStatus => f64::from(s.lambda_status),
            Metric::LongTermFuelTrim => f64::from(s.long_term_fuel_trim),
            Metric::ShortTermFuelTrim => f64::from(s.short_term_fuel_trim),
            Metric::FuelTrimCorrection => f64::from(s.fuel_trim_correction),
            Metric::CarbonCanisterPurgeValve => f64::from(s.carbon_canister_purge_valve),
            Metric::IdleBasePosition => f64::from(s.idle_base_position),
            Metric::IgnitionAdvanceOffset7d => f64::from(s.ignition_advance_offset_7d),
            Metric::IdleSpeedOffset => f64::from(s.idle_speed_offset),
            Metric::JackCount => f64::from(s.jack_count),
        }
    }

    /// Whether the underlying field is a float rather than a whole number
    pub fn is_fractional(&self) -> bool {
        matches!(
            self,
            Metric::ManifoldAbsolutePressure
                | Metric::BatteryVoltage
                | Metric::ThrottlePotSensor
                | Metric::IgnitionAdvance
                | Metric::CoilTime
                | Metric::AirFuelRatio
        )
    }

    /// Step between consecutive readings that counts as a swing
    pub fn swing_threshold(&self) -> f64 {
        match self {
            Metric::LambdaVoltage => 300.0,
            Metric::EngineRpm => 100.0,
            Metric::ManifoldAbsolutePressure => 10.0,
            Metric::ThrottleAngle | Metric::IacPosition => 5.0,
            Metric::AirFuelRatio => 1.0,
            Metric::BatteryVoltage | Metric::CoilTime => 0.5,
            _ => 1.0,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an unrecognised metric name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown metric: {0}")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}

/// Summary of one metric over the window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStatistics {
    /// Metric the figures describe
    pub metric: Metric,
    /// Readings in the window
    pub count: usize,
    /// Latest reading
    pub value: f64,
    /// Lowest reading
    pub min: f64,
    /// Highest reading
    pub max: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation, 0 for fewer than two readings
    pub stddev: f64,
    /// Least-squares slope per reading
    pub trend_slope: f64,
    /// Slope as a fraction of the mean
    pub trend: f64,
    /// Consecutive steps larger than the metric's swing threshold
    pub oscillation: usize,
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

impl MetricStatistics {
    /// Compute statistics for a series, oldest reading first
    pub fn from_series(metric: Metric, series: &[f64]) -> Self {
        let n = series.len();
        let Some(&value) = series.last() else {
            return Self::empty(metric);
        };

        let (min, max) = series
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });

        let count = n as f64;
        let mean = series.iter().sum::<f64>() / count;

        let stddev = if n > 1 {
            let ss: f64 = series.iter().map(|x| (x - mean).powi(2)).sum();
            (ss / (count - 1.0)).sqrt()
        } else {
            0.0
        };

        // x is the index 0..n-1
        let trend_slope = if n > 1 {
            let x_mean = (count - 1.0) / 2.0;
            let (sxy, sxx) = series
                .iter()
                .enumerate()
                .fold((0.0, 0.0), |(sxy, sxx), (i, &y)| {
                    let dx = i as f64 - x_mean;
                    (sxy + dx * (y - mean), sxx + dx * dx)
                });
            sxy / sxx
        } else {
            0.0
        };

        let trend = if mean == 0.0 { 0.0 } else { trend_slope / mean };

        let threshold = metric.swing_threshold();
        let oscillation = series
            .windows(2)
            .filter(|pair| (pair[1] - pair[0]).abs() > threshold)
            .count();

        Self {
            metric,
            count: n,
            value: finite(value),
            min: finite(min),
            max: finite(max),
            mean: finite(mean),
            stddev: finite(stddev),
            trend_slope: finite(trend_slope),
            trend: finite(trend),
            oscillation,
        }
    }

    /// Statistics for an empty window
    pub fn empty(metric: Metric) -> Self {
        Self {
            metric,
            count: 0,
            value: 0.0,
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            stddev: 0.0,
            trend_slope: 0.0,
            trend: 0.0,
            oscillation: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_round_trip() {
        for metric in Metric::ALL {
            assert_eq!(metric.name().parse::<Metric>(), Ok(metric));
        }
        assert_eq!("LAMBDA_VOLTAGE".parse::<Metric>(), Ok(Metric::LambdaVoltage));
        assert!("boost_pressure".parse::<Metric>().is_err());
    }

    #[test]
    fn test_basic_statistics() {
        let stats = MetricStatistics::from_series(Metric::CoolantTemp, &[2.0, 4.0, 4.0, 4.0, 6.0]);
        assert_eq!(stats.count, 5);
        assert_eq!(stats.value, 6.0);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 6.0);
        assert_eq!(stats.mean, 4.0);
        assert!((stats.stddev - 2.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_trend() {
        let stats = MetricStatistics::from_series(Metric::CoolantTemp, &[10.0, 12.0, 14.0, 16.0]);
        assert!((stats.trend_slope - 2.0).abs() < 1e-9);
        assert!((stats.trend - 2.0 / 13.0).abs() < 1e-9);

        let flat = MetricStatistics::from_series(Metric::CoolantTemp, &[0.0, 0.0, 0.0]);
        assert_eq!(flat.trend, 0.0);
    }

    #[test]
    fn test_oscillation_counts_large_swings() {
        let series = [200.0, 700.0, 200.0, 450.0, 500.0, 900.0];
        let stats = MetricStatistics::from_series(Metric::LambdaVoltage, &series);
        assert_eq!(stats.oscillation, 3);
    }

    #[test]
    fn test_empty_series() {
        let stats = MetricStatistics::from_series(Metric::EngineRpm, &[]);
        assert_eq!(stats, MetricStatistics::empty(Metric::EngineRpm));
    }
}
