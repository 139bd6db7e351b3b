//! Fault classification
//!
//! [`DiagnosticsEngine::analyse`] is called once per decoded sample, in poll order.
//! A sample that fails the admission checks only reports the ECU circuit faults.
//! A valid sample also gets a status, and when the engine is running it is added to
//! the window and the operational fault rules are evaluated against it.

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, trace};

use super::*;
use crate::decoder::Sample;

/// Sliding-window fault analysis for one engine
#[derive(Debug, Clone)]
pub struct DiagnosticsEngine {
    window: Window,
    first: Option<Sample>,
    latest: Option<Sample>,
    warm_by: Option<NaiveDateTime>,
}

impl Default for DiagnosticsEngine {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_SIZE)
    }
}

impl DiagnosticsEngine {
    /// Create an engine whose window holds `window_size` samples (at least 1)
    pub fn new(window_size: usize) -> Self {
        Self {
            window: Window::new(window_size),
            first: None,
            latest: None,
            warm_by: None,
        }
    }

    /// Admitted samples
    pub fn window(&self) -> &Window {
        &self.window
    }

    /// First sample admitted to the window
    pub fn first_sample(&self) -> Option<&Sample> {
        self.first.as_ref()
    }

    /// Most recent sample admitted to the window
    pub fn latest_sample(&self) -> Option<&Sample> {
        self.latest.as_ref()
    }

    /// Time by which the engine should have reached operating temperature
    pub fn warm_by(&self) -> Option<NaiveDateTime> {
        self.warm_by
    }

    /// Statistics for one metric over the current window
    pub fn statistics(&self, metric: Metric) -> MetricStatistics {
        MetricStatistics::from_series(metric, &self.window.series(metric))
    }

    /// Statistics for the key metrics
    pub fn snapshot(&self) -> Vec<MetricStatistics> {
        KEY_METRICS.iter().map(|&m| self.statistics(m)).collect()
    }

    /// Analyse the next sample
    pub fn analyse(&mut self, sample: &Sample) -> AnalysisReport {
        let mut report = AnalysisReport {
            iac_position: sample.iac_position,
            ..AnalysisReport::default()
        };
        apply_ecu_faults(&mut report, sample);

        if !is_valid(sample) {
            debug!(
                rpm = sample.engine_rpm,
                coolant = sample.coolant_temp,
                dtc5 = sample.dtc5,
                "sample rejected from analysis"
            );
            return report;
        }

        apply_status(&mut report, sample);

        if report.is_engine_running {
            self.admit(sample);
            self.apply_operational_faults(&mut report, sample);

            let rpm = self.statistics(Metric::EngineRpm);
            report.is_cruising = !report.is_engine_idle
                && rpm.stddev <= CRUISING_RPM_STDDEV
                && rpm.mean > CRUISING_MINIMUM_RPM;
        }

        trace!(faults = ?report.active_faults(), "analysis complete");
        report
    }

    fn admit(&mut self, sample: &Sample) {
        if self.first.is_none() {
            let warm_by = expected_warm_time(sample);
            debug!(%warm_by, coolant = sample.coolant_temp, "engine start recorded");
            self.first = Some(sample.clone());
            self.warm_by = Some(warm_by);
        }
        self.latest = Some(sample.clone());
        self.window.push(sample.clone());
    }

    fn apply_operational_faults(&self, report: &mut AnalysisReport, sample: &Sample) {
        let idle = report.is_engine_idle;
        let warm = report.is_at_operating_temp;
        let full = self.window.is_full();

        let battery_low = sample.battery_voltage < LOWEST_BATTERY_VOLTAGE;
        let map_high = idle && sample.manifold_absolute_pressure > HIGHEST_IDLE_MAP;

        report.battery_fault = battery_low;
        report.coil_fault = !battery_low && sample.coil_time > HIGHEST_COIL_TIME;
        report.map_fault = map_high;
        report.vacuum_fault = map_high;
        report.o2_system_fault = sample.lambda_status != O2_SYSTEM_ACTIVE;

        report.idle_fault = idle
            && if warm {
                sample.idle_base_position > HIGHEST_IDLE_BASE_POSITION
            } else {
                sample.idle_base_position < LOWEST_IDLE_BASE_POSITION
            };
        report.idle_hot_fault = idle
            && warm
            && (sample.idle_hot < MINIMUM_IDLE_HOT || sample.idle_hot > MAXIMUM_IDLE_HOT);
        report.idle_air_control_fault = idle
            && sample.idle_speed_offset > MAXIMUM_IDLE_OFFSET
            && sample.iac_position == INVALID_IAC_POSITION;
        report.idle_air_control_jack_fault = sample.jack_count >= HIGHEST_JACK_COUNT;
        report.crankshaft_sensor_fault =
            sample.crankshaft_position_sensor == INVALID_CRANKSHAFT_POSITION;

        report.lambda_range_fault = sample.lambda_voltage < LOWEST_LAMBDA_VOLTAGE
            || sample.lambda_voltage > HIGHEST_LAMBDA_VOLTAGE;
        report.lambda_oscillation_fault = full
            && self.statistics(Metric::LambdaVoltage).oscillation < MINIMUM_LAMBDA_OSCILLATIONS;

        report.thermostat_fault = self
            .warm_by
            .map(|deadline| {
                sample.timestamp > deadline && sample.coolant_temp < LOWEST_ENGINE_WARM_TEMPERATURE
            })
            .unwrap_or(false);

        report.idle_speed_fault = full
            && self.statistics(Metric::IdleBasePosition).mean > HIGHEST_IDLE_SPEED_DEVIATION;
    }
}

/// Whether a sample is trustworthy enough to analyse
pub(crate) fn is_valid(sample: &Sample) -> bool {
    sample.engine_rpm < MAXIMUM_ENGINE_RPM
        && sample.coolant_temp < MAXIMUM_COOLANT_TEMPERATURE
        && sample.intake_air_temp < MAXIMUM_AIR_INTAKE_TEMPERATURE
        && sample.idle_base_position < MAXIMUM_IDLE_BASE_POSITION
        && sample.dtc5 == EXPECTED_DTC5_VALUE
}

fn apply_ecu_faults(report: &mut AnalysisReport, sample: &Sample) {
    report.coolant_temp_sensor_fault = sample.coolant_temp_sensor_fault;
    report.intake_air_temp_sensor_fault = sample.intake_air_temp_sensor_fault;
    report.fuel_pump_circuit_fault = sample.fuel_pump_circuit_fault;
    report.throttle_pot_circuit_fault = sample.throttle_pot_circuit_fault;
}

fn apply_status(report: &mut AnalysisReport, sample: &Sample) {
    let running = sample.is_running();
    report.is_engine_running = running;
    report.is_engine_warming = sample.coolant_temp < LOWEST_ENGINE_WARM_TEMPERATURE;
    report.is_at_operating_temp = sample.coolant_temp >= LOWEST_ENGINE_WARM_TEMPERATURE;
    report.is_engine_idle = running && sample.throttle_angle <= IDLE_THROTTLE_ANGLE;
    report.is_closed_loop = sample.closed_loop;
    report.is_throttle_active =
        sample.throttle_angle > IDLE_THROTTLE_ANGLE || sample.engine_rpm > HIGHEST_IDLE_RPM;
}

/// Engine warms at roughly 11 seconds per degree up to 80C
fn expected_warm_time(sample: &Sample) -> NaiveDateTime {
    let degrees = i64::from(ENGINE_OPERATING_TEMPERATURE - sample.coolant_temp);
    sample.timestamp + Duration::seconds(degrees * SECONDS_PER_DEGREE)
}
