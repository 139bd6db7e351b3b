use chrono::{Duration, NaiveDate, NaiveDateTime};
use memsfcr_core::decoder::Sample;
use memsfcr_core::diagnostics::{DiagnosticsEngine, Metric, MetricStatistics, Window};
use pretty_assertions::assert_eq;

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 4, 5)
        .and_then(|d| d.and_hms_opt(9, 0, 0))
        .unwrap()
}

/// A warm engine idling normally
fn healthy(secs: i64) -> Sample {
    Sample {
        timestamp: start() + Duration::seconds(secs),
        engine_rpm: 1100,
        coolant_temp: 82,
        intake_air_temp: 30,
        throttle_angle: 5,
        manifold_absolute_pressure: 35.0,
        battery_voltage: 13.2,
        coil_time: 2.0,
        lambda_voltage: if secs % 2 == 0 { 200 } else { 700 },
        lambda_status: 1,
        iac_position: 90,
        idle_base_position: 50,
        idle_hot: 30,
        crankshaft_position_sensor: 16,
        jack_count: 3,
        dtc5: 255,
        ..Sample::default()
    }
}

#[test]
fn test_healthy_idle_scenario() {
    let mut engine = DiagnosticsEngine::default();
    let mut last = None;
    for secs in 0..30 {
        last = Some(engine.analyse(&healthy(secs)));
    }
    let report = last.unwrap();

    assert!(report.is_engine_running);
    assert!(report.is_engine_idle);
    assert!(report.is_at_operating_temp);
    assert!(!report.is_engine_warming);
    assert!(!report.is_cruising);
    assert_eq!(report.active_faults(), Vec::<&str>::new());
    assert!(!report.has_faults());
    assert_eq!(report.iac_position, 90);

    assert!(engine.window().is_full());
    assert_eq!(engine.window().len(), 20);
    let lambda = engine.statistics(Metric::LambdaVoltage);
    assert_eq!(lambda.oscillation, 19);
    assert_eq!(lambda.mean, 450.0);
}

#[test]
fn test_stopped_engine_never_admitted() {
    let mut engine = DiagnosticsEngine::new(5);
    for secs in 0..10 {
        let stopped = Sample {
            engine_rpm: 0,
            ..healthy(secs)
        };
        let report = engine.analyse(&stopped);
        assert!(!report.is_engine_running);
        assert!(report.is_at_operating_temp);
    }
    assert!(engine.window().is_empty());
    assert!(engine.first_sample().is_none());
}

#[test]
fn test_admission_boundaries() {
    let rejected = [
        Sample {
            engine_rpm: 6000,
            ..healthy(0)
        },
        Sample {
            coolant_temp: 120,
            ..healthy(0)
        },
        Sample {
            intake_air_temp: 80,
            ..healthy(0)
        },
        Sample {
            idle_base_position: 250,
            ..healthy(0)
        },
        Sample {
            dtc5: 254,
            ..healthy(0)
        },
    ];
    for sample in &rejected {
        let mut engine = DiagnosticsEngine::new(5);
        let report = engine.analyse(sample);
        assert!(!report.is_engine_running, "admitted {:?}", sample);
        assert!(engine.window().is_empty());
    }

    let accepted = [
        Sample {
            engine_rpm: 5999,
            ..healthy(0)
        },
        Sample {
            coolant_temp: 119,
            ..healthy(0)
        },
        Sample {
            intake_air_temp: 79,
            ..healthy(0)
        },
        Sample {
            idle_base_position: 249,
            ..healthy(0)
        },
    ];
    for sample in &accepted {
        let mut engine = DiagnosticsEngine::new(5);
        assert!(engine.analyse(sample).is_engine_running);
        assert_eq!(engine.window().len(), 1);
    }
}

#[test]
fn test_rejected_sample_still_reports_circuit_faults() {
    let mut engine = DiagnosticsEngine::new(5);
    let sample = Sample {
        dtc5: 0,
        coolant_temp_sensor_fault: true,
        throttle_pot_circuit_fault: true,
        ..healthy(0)
    };
    let report = engine.analyse(&sample);
    assert_eq!(
        report.active_faults(),
        vec!["coolant_temp_sensor_fault", "throttle_pot_circuit_fault"]
    );
}

#[test]
fn test_thermostat_deadline() {
    let cold_start = Sample {
        coolant_temp: 70,
        ..healthy(0)
    };

    let mut engine = DiagnosticsEngine::new(20);
    engine.analyse(&cold_start);
    assert_eq!(engine.warm_by(), Some(start() + Duration::seconds(110)));

    let before = Sample {
        coolant_temp: 75,
        ..healthy(109)
    };
    assert!(!engine.analyse(&before).thermostat_fault);

    let after = Sample {
        coolant_temp: 75,
        ..healthy(111)
    };
    assert!(engine.analyse(&after).thermostat_fault);

    let warmed = Sample {
        coolant_temp: 78,
        ..healthy(112)
    };
    assert!(!engine.analyse(&warmed).thermostat_fault);
}

#[test]
fn test_coil_fault_suppressed_by_low_battery() {
    let mut engine = DiagnosticsEngine::new(5);

    let slow_coil = Sample {
        battery_voltage: 13.0,
        coil_time: 4.1,
        ..healthy(0)
    };
    let report = engine.analyse(&slow_coil);
    assert!(report.coil_fault);
    assert!(!report.battery_fault);

    let low_battery = Sample {
        battery_voltage: 12.7,
        coil_time: 4.1,
        ..healthy(1)
    };
    let report = engine.analyse(&low_battery);
    assert!(!report.coil_fault);
    assert!(report.battery_fault);
}

#[test]
fn test_stuck_lambda_flagged_once_window_full() {
    let mut engine = DiagnosticsEngine::new(4);
    let stuck = |secs| Sample {
        lambda_voltage: 450,
        ..healthy(secs)
    };
    for secs in 0..3 {
        assert!(!engine.analyse(&stuck(secs)).lambda_oscillation_fault);
    }
    assert!(engine.analyse(&stuck(3)).lambda_oscillation_fault);
}

#[test]
fn test_operational_faults() {
    let mut engine = DiagnosticsEngine::new(5);
    let report = engine.analyse(&Sample {
        manifold_absolute_pressure: 50.0,
        lambda_status: 0,
        jack_count: 50,
        crankshaft_position_sensor: 0,
        lambda_voltage: 5,
        ..healthy(0)
    });
    assert!(report.map_fault);
    assert!(report.vacuum_fault);
    assert!(report.o2_system_fault);
    assert!(report.idle_air_control_jack_fault);
    assert!(report.crankshaft_sensor_fault);
    assert!(report.lambda_range_fault);
}

#[test]
fn test_window_fifo_eviction() {
    let mut window = Window::new(3);
    for secs in 0..4 {
        window.push(Sample {
            engine_rpm: 1000 + secs as i32,
            ..healthy(secs)
        });
    }
    assert_eq!(window.len(), 3);
    assert_eq!(window.oldest().map(|s| s.engine_rpm), Some(1001));
    assert_eq!(window.newest().map(|s| s.engine_rpm), Some(1003));
    assert_eq!(window.series(Metric::EngineRpm), vec![1001.0, 1002.0, 1003.0]);
}

#[test]
fn test_single_element_statistics() {
    let stats = MetricStatistics::from_series(Metric::CoolantTemp, &[82.0]);
    assert_eq!(stats.count, 1);
    assert_eq!(stats.stddev, 0.0);
    assert_eq!(stats.oscillation, 0);
    assert_eq!(stats.min, 82.0);
    assert_eq!(stats.max, 82.0);
    assert_eq!(stats.value, 82.0);
    assert_eq!(stats.trend_slope, 0.0);
}

#[test]
fn test_metric_selection_by_name() {
    let metric: Metric = "Lambda_Voltage".parse().unwrap();
    assert_eq!(metric, Metric::LambdaVoltage);
    assert!("boost_pressure".parse::<Metric>().is_err());
}

#[test]
fn test_reset_by_swapping_engine() {
    let mut engine = DiagnosticsEngine::new(5);
    engine.analyse(&healthy(0));
    assert_eq!(engine.window().len(), 1);

    engine = DiagnosticsEngine::new(engine.window().capacity());
    assert!(engine.window().is_empty());
    assert!(engine.warm_by().is_none());
}
