//! End-to-end queries against synthetic rasters.

use grid_environment::{
    ClipWindow, EngineConfig, Environment, GridError, GribEnvironment, MemoryBand, MemoryDataset,
    Position, Variable,
};
use std::f64::consts::PI;
use test_utils::grid::{GridSpec, GLOBAL_1DEG, NORTH_SEA};
use test_utils::{assert_approx_eq, minutes_after, reference_time, uniform_band};

fn velocity_dataset(spec: &GridSpec, layers: &[(Variable, i64, f64)]) -> MemoryDataset {
    let mut ds = MemoryDataset::new("synthetic", spec.transform(), spec.width, spec.height);
    for (variable, minutes, value) in layers {
        ds.push_band(MemoryBand::velocity(
            *variable,
            minutes_after(*minutes),
            uniform_band(spec.width, spec.height, *value),
        ));
    }
    ds
}

/// u=3, v=4 at the reference time, u=0, v=5 an hour later.
fn north_sea_wind(config: EngineConfig) -> GribEnvironment {
    let ds = velocity_dataset(
        &NORTH_SEA,
        &[
            (Variable::WindU, 0, 3.0),
            (Variable::WindV, 0, 4.0),
            (Variable::WindU, 60, 0.0),
            (Variable::WindV, 60, 5.0),
        ],
    );
    let mut engine = GribEnvironment::new(config);
    assert_eq!(engine.load(&ds).unwrap(), 4);
    engine
}

#[test]
fn test_wind_blend_at_half_hour() {
    let engine = north_sea_wind(EngineConfig::default());
    let positions = [
        Position::from_degrees(52.5, 5.5),
        Position::from_degrees(50.0, 3.0),
        Position::from_degrees(55.0, 8.0),
    ];
    let wind = engine.get_wind(&positions, minutes_after(30)).unwrap();

    let magnitude = (1.5_f64 * 1.5 + 4.5 * 4.5).sqrt();
    for (angle, speed) in wind.iter() {
        assert_approx_eq!(speed, magnitude, 1e-9);
        assert_approx_eq!(angle, 1.5_f64.atan2(4.5) + PI, 1e-9);
    }
    assert_approx_eq!(wind.speeds[0], 4.743, 1e-3);
}

#[test]
fn test_exact_layer_times() {
    let engine = north_sea_wind(EngineConfig::default());
    let position = [Position::from_degrees(52.0, 4.0)];

    let wind = engine.get_wind(&position, reference_time()).unwrap();
    assert_approx_eq!(wind.speeds[0], 5.0, 1e-9);

    // The last layer time is outside the span
    let err = engine.get_wind(&position, minutes_after(60)).unwrap_err();
    assert!(err.is_span_error());
    let err = engine.get_wind(&position, minutes_after(-1)).unwrap_err();
    assert!(err.is_span_error());
}

#[test]
fn test_no_current_loaded() {
    let engine = north_sea_wind(EngineConfig::default());
    let err = engine
        .get_current(&[Position::from_degrees(52.0, 4.0)], minutes_after(30), false)
        .unwrap_err();
    assert!(err.is_span_error());
}

#[test]
fn test_out_of_range_without_sentinel() {
    let engine = north_sea_wind(EngineConfig::default());
    let positions = [
        Position::from_degrees(52.0, 9.0),
        Position::from_degrees(49.0, 5.0),
    ];
    match engine.get_wind(&positions, minutes_after(30)) {
        Err(GridError::Range { axis, values }) => {
            assert_eq!(axis, "latitude");
            assert_eq!(values.len(), 1);
            assert_approx_eq!(values[0], 49.0_f64.to_radians(), 1e-12);
        }
        other => panic!("expected range error, got {:?}", other),
    }
}

#[test]
fn test_out_of_range_with_sentinel() {
    let config = EngineConfig {
        no_data_value: Some(-1.0),
        ..EngineConfig::default()
    };
    let engine = north_sea_wind(config);
    let positions = [
        Position::from_degrees(52.5, 5.5),
        Position::from_degrees(49.0, 5.0),
        Position::from_degrees(52.5, 8.5),
    ];
    let wind = engine.get_wind(&positions, minutes_after(30)).unwrap();
    assert_approx_eq!(wind.speeds[0], 4.743, 1e-3);
    assert_eq!(wind.angles[1..], [0.0, 0.0]);
    assert_eq!(wind.speeds[1..], [-1.0, -1.0]);

    // Time errors are never masked by the sentinel
    assert!(engine
        .get_wind(&positions, minutes_after(90))
        .unwrap_err()
        .is_span_error());
}

#[test]
fn test_range_and_span() {
    let engine = north_sea_wind(EngineConfig::default());
    let (lat_min, lat_max, lon_min, lon_max) = engine.range().to_degrees();
    assert_approx_eq!(lat_min, 50.0, 1e-9);
    assert_approx_eq!(lat_max, 55.0, 1e-9);
    assert_approx_eq!(lon_min, 3.0, 1e-9);
    assert_approx_eq!(lon_max, 8.0, 1e-9);

    let span = engine.span();
    assert_eq!(span.start, reference_time());
    assert_eq!(span.duration.num_minutes(), 60);
}

#[test]
fn test_clip_window_narrows_coverage() {
    let config = EngineConfig {
        clip: Some(ClipWindow::new(51.5, 53.5, 4.5, 6.5)),
        ..EngineConfig::default()
    };
    let engine = north_sea_wind(config);
    let (lat_min, lat_max, lon_min, lon_max) = engine.range().to_degrees();
    assert_approx_eq!(lat_min, 52.0, 1e-9);
    assert_approx_eq!(lat_max, 53.0, 1e-9);
    assert_approx_eq!(lon_min, 5.0, 1e-9);
    assert_approx_eq!(lon_max, 6.0, 1e-9);
    assert_eq!(engine.mesh().unwrap().shape(), (2, 2));

    let wind = engine
        .get_wind(&[Position::from_degrees(52.5, 5.5)], minutes_after(30))
        .unwrap();
    assert_approx_eq!(wind.speeds[0], 4.743, 1e-3);
    assert!(engine
        .get_wind(&[Position::from_degrees(51.0, 5.5)], minutes_after(30))
        .unwrap_err()
        .is_range_error());
}

#[test]
fn test_current_direction() {
    let ds = velocity_dataset(
        &NORTH_SEA,
        &[
            (Variable::CurrentU, 0, -1.0),
            (Variable::CurrentV, 0, 0.0),
            (Variable::CurrentU, 60, -1.0),
            (Variable::CurrentV, 60, 0.0),
        ],
    );
    let mut engine = GribEnvironment::new(EngineConfig::default());
    engine.load(&ds).unwrap();

    // Flowing west
    let current = engine
        .get_current(&[Position::from_degrees(51.0, 4.0)], minutes_after(10), false)
        .unwrap();
    assert_approx_eq!(current.angles[0], 1.5 * PI, 1e-9);
    assert_approx_eq!(current.speeds[0], 1.0, 1e-9);

    // Wind-less current data still defines the span
    assert_eq!(engine.span().start, reference_time());
}

#[test]
fn test_global_wraparound() {
    let ds = velocity_dataset(
        &GLOBAL_1DEG,
        &[
            (Variable::WindU, 0, 0.0),
            (Variable::WindV, 0, 5.0),
            (Variable::WindU, 180, 0.0),
            (Variable::WindV, 180, 5.0),
        ],
    );
    let mut engine = GribEnvironment::new(EngineConfig::default());
    engine.load(&ds).unwrap();

    let mesh = engine.mesh().unwrap();
    assert!(mesh.wraparound());
    assert_eq!(mesh.shape(), (161, 361));
    assert_approx_eq!(engine.range().lon_max, 2.0 * PI, 1e-9);

    // Between the last column and the repeated first one, and west of Greenwich
    let positions = [
        Position::from_degrees(10.0, 359.7),
        Position::from_degrees(-20.0, -0.2),
    ];
    let wind = engine.get_wind(&positions, minutes_after(45)).unwrap();
    for speed in &wind.speeds {
        assert_approx_eq!(*speed, 5.0, 1e-9);
    }
}

#[test]
fn test_environment_trait_object() {
    let mut engine: Box<dyn Environment> = Box::new(north_sea_wind(EngineConfig::default()));
    assert!(!engine.check().unwrap());
    let wind = engine
        .get_wind(&[Position::from_degrees(52.5, 5.5)], minutes_after(30))
        .unwrap();
    assert_eq!(wind.len(), 1);
}
