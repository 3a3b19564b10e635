//! File-based ingestion and live reloading.

use chrono::{DateTime, Duration, TimeZone, Utc};
use grid_environment::{
    EngineConfig, Environment, GribEnvironment, JsonRasterDriver, LiveGribEnvironment, LoadEvent,
    MemoryBand, MemoryDataset, MonitorState, Position, ProviderConfig, Variable,
};
use std::path::PathBuf;
use std::time::SystemTime;
use test_utils::grid::NORTH_SEA;
use test_utils::{assert_approx_eq, epoch_plus, uniform_band, FeedDir};

/// The current hour, so layers survive the 24 hour prune.
fn this_hour() -> DateTime<Utc> {
    let now = Utc::now().timestamp();
    Utc.timestamp_opt(now - now % 3600, 0).unwrap()
}

fn write_wind(feed: &FeedDir, name: &str, layers: &[(i64, f64)]) -> PathBuf {
    let spec = NORTH_SEA;
    let mut ds = MemoryDataset::new(name, spec.transform(), spec.width, spec.height);
    for (hours, speed) in layers {
        let time = this_hour() + Duration::hours(*hours);
        ds.push_band(MemoryBand::velocity(
            Variable::WindU,
            time,
            uniform_band(spec.width, spec.height, 0.0),
        ));
        ds.push_band(MemoryBand::velocity(
            Variable::WindV,
            time,
            uniform_band(spec.width, spec.height, *speed),
        ));
    }
    let path = feed.file(name);
    JsonRasterDriver::new().save(&ds, &path).unwrap();
    path
}

fn config(feed: &FeedDir) -> EngineConfig {
    EngineConfig {
        provider: ProviderConfig::gfs().with_cache_dir(feed.path()),
        ..EngineConfig::default()
    }
}

fn live(feed: &FeedDir) -> LiveGribEnvironment<JsonRasterDriver> {
    LiveGribEnvironment::new(GribEnvironment::new(config(feed)), JsonRasterDriver::new())
}

#[test]
fn test_open_discovers_provider_files() {
    let feed = FeedDir::new().unwrap();
    write_wind(&feed, "gfs-a.json", &[(-1, 2.0), (1, 2.0)]);
    write_wind(&feed, "gfs-b.json", &[(3, 4.0)]);
    write_wind(&feed, "gefs-00-a.json", &[(5, 9.0)]);

    let engine = GribEnvironment::open(config(&feed), &JsonRasterDriver::new()).unwrap();
    assert_eq!(engine.fileset().len(), 2);
    assert_eq!(engine.series(Variable::WindV).len(), 3);

    let wind = engine
        .get_wind(&[Position::from_degrees(52.0, 5.0)], this_hour() + Duration::hours(2))
        .unwrap();
    assert_approx_eq!(wind.speeds[0], 3.0, 1e-9);
}

#[test]
fn test_update_skips_missing_files() {
    let feed = FeedDir::new().unwrap();
    let present = write_wind(&feed, "gfs-a.json", &[(0, 1.0), (1, 1.0)]);
    let missing = feed.file("gfs-gone.json");

    let mut engine = GribEnvironment::with_fileset(config(&feed), vec![missing, present]);
    let stored = engine.update(&JsonRasterDriver::new()).unwrap();
    assert_eq!(stored, 4);

    // A second pass replaces the same layers
    let events: Vec<LoadEvent> = engine
        .update_cursor(&JsonRasterDriver::new())
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(events
        .iter()
        .filter(|e| e.is_stored())
        .all(|e| matches!(e, LoadEvent::Stored { replaced: true, .. })));
    assert_eq!(engine.series(Variable::WindU).len(), 2);
}

#[test]
fn test_load_file_tracks_path() {
    let feed = FeedDir::new().unwrap();
    let path = write_wind(&feed, "gfs-a.json", &[(0, 1.0)]);
    let mut engine = GribEnvironment::new(EngineConfig::default());
    assert_eq!(engine.load_file(&JsonRasterDriver::new(), &path).unwrap(), 2);
    assert_eq!(engine.fileset(), &[path]);
}

#[test]
fn test_live_reload_cycle() {
    let feed = FeedDir::new().unwrap();
    write_wind(&feed, "gfs-1.json", &[(0, 1.0), (1, 1.0)]);
    let mut live = live(&feed);

    // First use always ingests, even without a marker
    assert!(live.check().unwrap());
    assert_eq!(live.engine().series(Variable::WindU).len(), 2);
    assert_eq!(live.monitor().stamp(), SystemTime::UNIX_EPOCH);
    assert_eq!(live.updated().timestamp(), 0);
    assert_eq!(live.monitor().state(), MonitorState::Idle);

    // No marker, nothing to do
    assert!(!live.check().unwrap());

    // A new download plus a marker triggers a reload that also prunes
    write_wind(&feed, "gfs-2.json", &[(-30, 7.0), (2, 3.0)]);
    feed.touch("updated.gfs", epoch_plus(1_000_000)).unwrap();
    assert!(live.check().unwrap());
    assert_eq!(live.monitor().stamp(), epoch_plus(1_000_000));
    assert_eq!(live.engine().fileset().len(), 2);
    assert_eq!(live.engine().series(Variable::WindV).len(), 3);
    assert!(live.engine().span().start >= this_hour());

    assert!(!live.check().unwrap());

    // An older marker does not trigger
    feed.touch("updated.gfs", epoch_plus(500_000)).unwrap();
    assert!(!live.check().unwrap());
}

#[test]
fn test_live_cursor_events_and_cancellation() {
    let feed = FeedDir::new().unwrap();
    write_wind(&feed, "gfs-1.json", &[(0, 1.0)]);
    write_wind(&feed, "gfs-2.json", &[(1, 1.0)]);
    let mut live = live(&feed);

    let events: Vec<LoadEvent> = live
        .check_cursor()
        .unwrap()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    let finished = events
        .iter()
        .filter(|e| matches!(e, LoadEvent::Finished { .. }))
        .count();
    assert_eq!(finished, 2);
    assert_eq!(events.len(), 8);

    feed.touch("updated.gfs", epoch_plus(2_000_000)).unwrap();
    {
        let mut cursor = live.check_cursor().unwrap().unwrap();
        assert!(matches!(cursor.next(), Some(Ok(LoadEvent::Opened { .. }))));
    }
    assert_eq!(live.monitor().state(), MonitorState::Idle);
    assert_eq!(live.monitor().stamp(), SystemTime::UNIX_EPOCH);

    // The cancelled reload is still due
    assert!(live.check().unwrap());
    assert_eq!(live.monitor().stamp(), epoch_plus(2_000_000));
}

#[test]
fn test_live_starts_on_empty_cache_dir() {
    let feed = FeedDir::new().unwrap();
    let mut live = live(&feed);

    // Nothing downloaded yet
    assert!(live.check().unwrap());
    assert!(live.engine().fileset().is_empty());
    assert!(!live.check().unwrap());

    write_wind(&feed, "gfs-1.json", &[(0, 2.0), (1, 2.0)]);
    feed.touch("updated.gfs", epoch_plus(1_000_000)).unwrap();
    assert!(live.check().unwrap());
    assert_eq!(live.engine().fileset().len(), 1);
    assert_eq!(live.engine().series(Variable::WindV).len(), 2);
    assert_eq!(live.monitor().stamp(), epoch_plus(1_000_000));
}

#[test]
fn test_cancelled_first_load_is_retried_without_marker() {
    let feed = FeedDir::new().unwrap();
    write_wind(&feed, "gfs-1.json", &[(0, 1.0), (1, 1.0)]);
    let mut live = live(&feed);

    {
        let mut cursor = live.check_cursor().unwrap().unwrap();
        assert!(matches!(cursor.next(), Some(Ok(LoadEvent::Opened { .. }))));
    }
    assert_eq!(live.monitor().state(), MonitorState::Idle);
    assert!(live.engine().series(Variable::WindU).is_empty());

    assert!(live.check().unwrap());
    assert_eq!(live.engine().series(Variable::WindU).len(), 2);
    assert!(!live.check().unwrap());
}

#[test]
fn test_live_reload_error() {
    let feed = FeedDir::new().unwrap();
    write_wind(&feed, "gfs-1.json", &[(0, 1.0)]);
    feed.write("gfs-2.json", "{ truncated").unwrap();
    let mut live = live(&feed);

    assert!(live.check().is_err());
    assert_eq!(live.monitor().state(), MonitorState::Idle);
    assert_eq!(live.engine().series(Variable::WindU).len(), 1);
}

#[test]
fn test_live_environment_trait() {
    let feed = FeedDir::new().unwrap();
    write_wind(&feed, "gfs-1.json", &[(0, 4.0), (1, 4.0)]);
    let mut env: Box<dyn Environment> = Box::new(live(&feed));
    assert!(env.check().unwrap());
    let wind = env
        .get_wind(&[Position::from_degrees(53.0, 6.0)], this_hour() + Duration::minutes(20))
        .unwrap();
    assert_approx_eq!(wind.speeds[0], 4.0, 1e-9);
}
