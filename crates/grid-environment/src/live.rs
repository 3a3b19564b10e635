//! Live reloading driven by a freshness marker file.
//!
//! Downloaders touch a marker file once new GRIB files are complete. The
//! monitor compares the marker's modification time against the stamp it
//! recorded after the last ingestion and, when the marker is newer,
//! re-scans the provider directory, ingests every file and prunes old
//! layers.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::engine::GribEnvironment;
use crate::environment::Environment;
use crate::error::Result;
use crate::ingest::{LoadEvent, UpdateCursor};
use crate::raster::RasterDriver;
use crate::types::{Position, VectorField};

/// Where the monitor is in its check/reload cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    CheckPending,
    Reloading,
}

/// Tracks the freshness marker and the last ingestion stamp.
#[derive(Debug, Clone)]
pub struct UpdateMonitor {
    marker: String,
    dir: Option<PathBuf>,
    stamp: SystemTime,
    first_use: bool,
    state: MonitorState,
}

impl UpdateMonitor {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            dir: None,
            stamp: SystemTime::UNIX_EPOCH,
            first_use: true,
            state: MonitorState::Idle,
        }
    }

    /// Resolve a bare marker name in `dir` rather than next to the files.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Modification time of the marker when the last file was ingested.
    pub fn stamp(&self) -> SystemTime {
        self.stamp
    }

    /// The marker path. A bare file name resolves in the monitored
    /// directory, or next to the first source file when there is none.
    pub fn marker_path(&self, fileset: &[PathBuf]) -> PathBuf {
        let marker = Path::new(&self.marker);
        if marker.components().count() > 1 || marker.is_absolute() {
            return marker.to_path_buf();
        }
        if let Some(dir) = &self.dir {
            return dir.join(marker);
        }
        match fileset.first().and_then(|f| f.parent()) {
            Some(dir) => dir.join(marker),
            None => marker.to_path_buf(),
        }
    }

    /// Whether a reload is due. The first check always is.
    pub fn should_update(&self, fileset: &[PathBuf]) -> bool {
        if self.first_use {
            return true;
        }
        match modified(&self.marker_path(fileset)) {
            Some(mtime) => mtime > self.stamp,
            None => false,
        }
    }

    /// Record the marker's current modification time, or zero when absent.
    pub fn record_stamp(&mut self, fileset: &[PathBuf]) {
        let path = self.marker_path(fileset);
        self.stamp = match modified(&path) {
            Some(mtime) => mtime,
            None => {
                warn!(marker = %path.display(), "Update file does not exist");
                SystemTime::UNIX_EPOCH
            }
        };
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// A [`GribEnvironment`] that reloads itself when its provider signals new
/// data.
pub struct LiveGribEnvironment<D> {
    engine: GribEnvironment,
    driver: D,
    monitor: UpdateMonitor,
}

impl<D: RasterDriver> LiveGribEnvironment<D> {
    /// Wrap `engine`, watching its provider's update marker.
    pub fn new(engine: GribEnvironment, driver: D) -> Self {
        let provider = &engine.config().provider;
        let mut monitor = UpdateMonitor::new(provider.update_marker.clone());
        if !provider.cache_dir.as_os_str().is_empty() {
            monitor = monitor.in_dir(provider.cache_dir.clone());
        }
        Self {
            engine,
            driver,
            monitor,
        }
    }

    pub fn engine(&self) -> &GribEnvironment {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut GribEnvironment {
        &mut self.engine
    }

    pub fn monitor(&self) -> &UpdateMonitor {
        &self.monitor
    }

    /// Stamp of the last ingestion.
    pub fn updated(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.monitor.stamp())
    }

    /// Start a reload if the marker is newer than the last ingestion.
    ///
    /// Returns `None` when nothing changed. Dropping the cursor early
    /// cancels the reload without recording a new stamp.
    pub fn check_cursor(&mut self) -> Result<Option<LiveCursor<'_>>> {
        self.monitor.state = MonitorState::CheckPending;
        if !self.monitor.should_update(self.engine.fileset()) {
            self.monitor.state = MonitorState::Idle;
            return Ok(None);
        }

        let files = match self.engine.config().provider.discover_files() {
            Ok(files) => files,
            Err(e) => {
                self.monitor.state = MonitorState::Idle;
                return Err(e);
            }
        };
        for file in &files {
            self.engine.add_file(file);
        }
        info!(files = self.engine.fileset().len(), "Reloading grib set");

        self.monitor.state = MonitorState::Reloading;
        let prune_age = self.engine.config().prune_age();
        Ok(Some(LiveCursor {
            update: self.engine.update_cursor(&self.driver),
            monitor: &mut self.monitor,
            prune_age,
            finished: false,
        }))
    }

    /// Reload if needed. Returns whether a reload happened.
    pub fn check(&mut self) -> Result<bool> {
        match self.check_cursor()? {
            Some(cursor) => {
                for event in cursor {
                    event?;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl<D: RasterDriver> Environment for LiveGribEnvironment<D> {
    fn get_wind(&self, positions: &[Position], time: DateTime<Utc>) -> Result<VectorField> {
        self.engine.get_wind(positions, time)
    }

    fn get_current(
        &self,
        positions: &[Position],
        time: DateTime<Utc>,
        filter_nodata: bool,
    ) -> Result<VectorField> {
        self.engine.get_current(positions, time, filter_nodata)
    }

    fn check(&mut self) -> Result<bool> {
        LiveGribEnvironment::check(self)
    }
}

/// An in-progress reload.
///
/// Records the marker stamp after every ingested file and prunes old
/// layers once every file was read.
pub struct LiveCursor<'a> {
    update: UpdateCursor<'a>,
    monitor: &'a mut UpdateMonitor,
    prune_age: Duration,
    finished: bool,
}

impl Iterator for LiveCursor<'_> {
    type Item = Result<LoadEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.update.next() {
            Some(Ok(event)) => {
                if let LoadEvent::Finished { .. } = event {
                    self.monitor.record_stamp(self.update.engine().fileset());
                }
                Some(Ok(event))
            }
            Some(Err(e)) => {
                self.finished = true;
                self.monitor.state = MonitorState::Idle;
                Some(Err(e))
            }
            None => {
                let pruned = self.update.engine_mut().prune(self.prune_age);
                info!(pruned, "Reload complete");
                self.finished = true;
                self.monitor.first_use = false;
                self.monitor.state = MonitorState::Idle;
                None
            }
        }
    }
}

impl Drop for LiveCursor<'_> {
    fn drop(&mut self) {
        if !self.finished {
            info!("Reload cancelled");
            self.monitor.state = MonitorState::Idle;
        }
    }
}
