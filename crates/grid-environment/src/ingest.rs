//! Resumable ingestion.
//!
//! Loading a raster is exposed as an iterator of [`LoadEvent`]s. Every
//! `Stored` event completes one whole layer insertion, so a caller can stop
//! pulling between events and leave the engine consistent.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::engine::GribEnvironment;
use crate::error::Result;
use crate::raster::{RasterDataset, RasterDriver};
use crate::types::Variable;

/// Progress of an ingestion cursor.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    /// The dataset's grid was checked and the mesh is ready.
    Opened { source: String },
    /// One band became a layer.
    Stored {
        variable: Variable,
        time: DateTime<Utc>,
        index: usize,
        replaced: bool,
    },
    /// Every band of the dataset was processed.
    Finished { source: String },
}

impl LoadEvent {
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored { .. })
    }
}

/// Where a cursor is within one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stage {
    Open,
    Band(usize),
    Done,
}

/// Ingests the bands of one dataset.
pub struct LoadCursor<'a> {
    engine: &'a mut GribEnvironment,
    dataset: &'a dyn RasterDataset,
    stage: Stage,
}

impl<'a> LoadCursor<'a> {
    pub(crate) fn new(engine: &'a mut GribEnvironment, dataset: &'a dyn RasterDataset) -> Self {
        Self {
            engine,
            dataset,
            stage: Stage::Open,
        }
    }
}

impl Iterator for LoadCursor<'_> {
    type Item = Result<LoadEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.engine.step(self.dataset, &mut self.stage)
    }
}

/// Ingests every existing file of the engine's file set, in order.
///
/// Missing files are logged and skipped. The first error ends the cursor.
pub struct UpdateCursor<'a> {
    engine: &'a mut GribEnvironment,
    driver: &'a dyn RasterDriver,
    paths: Vec<PathBuf>,
    next: usize,
    current: Option<(Box<dyn RasterDataset>, Stage)>,
}

impl<'a> UpdateCursor<'a> {
    pub(crate) fn new(engine: &'a mut GribEnvironment, driver: &'a dyn RasterDriver) -> Self {
        info!("Updating grib set");
        let paths = engine.fileset().to_vec();
        if paths.is_empty() {
            warn!("No files in fileset");
        }
        Self {
            engine,
            driver,
            paths,
            next: 0,
            current: None,
        }
    }

    pub fn engine(&self) -> &GribEnvironment {
        &*self.engine
    }

    pub(crate) fn engine_mut(&mut self) -> &mut GribEnvironment {
        &mut *self.engine
    }

    fn stop(&mut self) {
        self.current = None;
        self.next = self.paths.len();
    }
}

impl Iterator for UpdateCursor<'_> {
    type Item = Result<LoadEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let outcome = match self.current.as_mut() {
                Some((dataset, stage)) => self.engine.step(&**dataset, stage),
                None => None,
            };
            match outcome {
                Some(Ok(event)) => return Some(Ok(event)),
                Some(Err(e)) => {
                    self.stop();
                    return Some(Err(e));
                }
                None => self.current = None,
            }

            let path = self.paths.get(self.next)?.clone();
            self.next += 1;
            if !path.exists() {
                warn!(path = %path.display(), "Source file does not exist");
                continue;
            }
            info!(path = %path.display(), "Attempting to open");
            match self.driver.open(&path) {
                Ok(dataset) => {
                    self.engine.add_file(&path);
                    self.current = Some((dataset, Stage::Open));
                }
                Err(e) => {
                    self.stop();
                    return Some(Err(e));
                }
            }
        }
    }
}
