//! Engine diagnostics
//!
//! Keeps a sliding window of running samples, computes statistics over it and
//! classifies engine status and faults for every new sample.

mod engine;
mod report;
mod stats;
mod window;

pub use engine::DiagnosticsEngine;
pub use report::AnalysisReport;
pub use stats::{Metric, MetricStatistics, UnknownMetric};
pub use window::Window;

/// Default number of samples held for statistics
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Metrics included in a statistics snapshot
pub const KEY_METRICS: [Metric; 7] = [
    Metric::CoolantTemp,
    Metric::EngineRpm,
    Metric::ManifoldAbsolutePressure,
    Metric::LambdaVoltage,
    Metric::AirFuelRatio,
    Metric::IacPosition,
    Metric::ThrottleAngle,
];

// sample admission
pub(crate) const MAXIMUM_ENGINE_RPM: i32 = 6000;
pub(crate) const MAXIMUM_COOLANT_TEMPERATURE: i32 = 120;
pub(crate) const MAXIMUM_AIR_INTAKE_TEMPERATURE: i32 = 80;
pub(crate) const MAXIMUM_IDLE_BASE_POSITION: i32 = 250;
pub(crate) const EXPECTED_DTC5_VALUE: u8 = 255;

// status
pub(crate) const IDLE_THROTTLE_ANGLE: i32 = 14;
pub(crate) const HIGHEST_IDLE_RPM: i32 = 1300;
pub(crate) const LOWEST_ENGINE_WARM_TEMPERATURE: i32 = 78;
pub(crate) const CRUISING_RPM_STDDEV: f64 = 10.0;
pub(crate) const CRUISING_MINIMUM_RPM: f64 = 900.0;

// warm-up prediction
pub(crate) const ENGINE_OPERATING_TEMPERATURE: i32 = 80;
pub(crate) const SECONDS_PER_DEGREE: i64 = 11;

// faults
pub(crate) const LOWEST_BATTERY_VOLTAGE: f32 = 13.0;
pub(crate) const HIGHEST_COIL_TIME: f32 = 4.0;
pub(crate) const HIGHEST_IDLE_MAP: f32 = 45.0;
pub(crate) const O2_SYSTEM_ACTIVE: i32 = 1;
pub(crate) const LOWEST_IDLE_BASE_POSITION: i32 = 45;
pub(crate) const HIGHEST_IDLE_BASE_POSITION: i32 = 55;
pub(crate) const MINIMUM_IDLE_HOT: i32 = 10;
pub(crate) const MAXIMUM_IDLE_HOT: i32 = 55;
pub(crate) const MAXIMUM_IDLE_OFFSET: i32 = 50;
pub(crate) const INVALID_IAC_POSITION: i32 = 0;
pub(crate) const HIGHEST_JACK_COUNT: i32 = 50;
pub(crate) const INVALID_CRANKSHAFT_POSITION: i32 = 0;
pub(crate) const LOWEST_LAMBDA_VOLTAGE: i32 = 10;
pub(crate) const HIGHEST_LAMBDA_VOLTAGE: i32 = 900;
pub(crate) const MINIMUM_LAMBDA_OSCILLATIONS: usize = 2;
pub(crate) const HIGHEST_IDLE_SPEED_DEVIATION: f64 = 150.0;
