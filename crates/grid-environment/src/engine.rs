//! The gridded wind/current engine.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::compositor::blend_components;
use crate::config::EngineConfig;
use crate::environment::{current_field, wind_field, Environment};
use crate::error::{GridError, Result};
use crate::ingest::{LoadCursor, LoadEvent, Stage, UpdateCursor};
use crate::layer::{Layer, VariableSeries};
use crate::mesh::Mesh;
use crate::nodata::reconstruct;
use crate::range_guard::RangeGuard;
use crate::raster::{classify_band, RasterDataset, RasterDriver};
use crate::types::{Coverage, GeoTransform, Position, TimeSpan, Variable, VectorField};

/// Wind and current interpolated from a set of GRIB-style rasters.
///
/// All rasters must share one geo-transform. The first loaded raster fixes
/// the mesh; later ones are checked against it.
#[derive(Debug, Clone)]
pub struct GribEnvironment {
    config: EngineConfig,
    fileset: Vec<PathBuf>,
    transform: Option<[f64; 6]>,
    mesh: Option<Mesh>,
    series: [VariableSeries; 4],
}

fn slot(variable: Variable) -> usize {
    match variable {
        Variable::WindU => 0,
        Variable::WindV => 1,
        Variable::CurrentU => 2,
        Variable::CurrentV => 3,
    }
}

impl GribEnvironment {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            fileset: Vec::new(),
            transform: None,
            mesh: None,
            series: Variable::ALL.map(VariableSeries::new),
        }
    }

    /// An engine that will ingest `files` on [`update`](Self::update).
    pub fn with_fileset(config: EngineConfig, files: Vec<PathBuf>) -> Self {
        let mut engine = Self::new(config);
        for file in &files {
            engine.add_file(file);
        }
        engine
    }

    /// Discover the provider's files and ingest them.
    pub fn open(config: EngineConfig, driver: &dyn RasterDriver) -> Result<Self> {
        let files = config.provider.discover_files()?;
        info!(provider = %config.provider.name, dir = %config.provider.cache_dir.display(), files = files.len(), "Looked for files");
        let mut engine = Self::with_fileset(config, files);
        engine.update(driver)?;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn fileset(&self) -> &[PathBuf] {
        &self.fileset
    }

    /// Track `path` for future updates.
    pub fn add_file(&mut self, path: &Path) {
        if !self.fileset.iter().any(|f| f == path) {
            self.fileset.push(path.to_path_buf());
        }
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    pub fn series(&self, variable: Variable) -> &VariableSeries {
        &self.series[slot(variable)]
    }

    pub fn no_data_value(&self) -> Option<f64> {
        self.config.no_data_value
    }

    pub fn set_no_data_value(&mut self, value: Option<f64>) {
        self.config.no_data_value = value;
    }

    /// Forget the mesh and every layer. The file set is kept.
    pub fn reset(&mut self) {
        self.transform = None;
        self.mesh = None;
        for series in &mut self.series {
            series.clear();
        }
    }

    /// Cursor ingesting the bands of `dataset`.
    pub fn load_dataset<'a>(&'a mut self, dataset: &'a dyn RasterDataset) -> LoadCursor<'a> {
        LoadCursor::new(self, dataset)
    }

    /// Ingest every band of `dataset`. Returns the number of layers stored.
    pub fn load(&mut self, dataset: &dyn RasterDataset) -> Result<usize> {
        drain(self.load_dataset(dataset))
    }

    /// Open `path` with `driver`, track it and ingest it.
    pub fn load_file(&mut self, driver: &dyn RasterDriver, path: &Path) -> Result<usize> {
        info!(path = %path.display(), "Attempting to open");
        let dataset = driver.open(path)?;
        self.add_file(path);
        self.load(dataset.as_ref())
    }

    /// Cursor ingesting every existing file of the file set.
    pub fn update_cursor<'a>(&'a mut self, driver: &'a dyn RasterDriver) -> UpdateCursor<'a> {
        UpdateCursor::new(self, driver)
    }

    /// Ingest every existing file of the file set.
    pub fn update(&mut self, driver: &dyn RasterDriver) -> Result<usize> {
        drain(self.update_cursor(driver))
    }

    /// Drop layers strictly older than `threshold` from every series.
    pub fn prune_before(&mut self, threshold: DateTime<Utc>) -> usize {
        self.series
            .iter_mut()
            .map(|s| s.prune_before(threshold))
            .sum()
    }

    /// Drop layers older than `older_than` before now.
    pub fn prune(&mut self, older_than: Duration) -> usize {
        self.prune_before(Utc::now() - older_than)
    }

    /// Mesh coverage in radians, or all zeros before anything was loaded.
    pub fn range(&self) -> Coverage {
        self.mesh.as_ref().map(Mesh::coverage).unwrap_or_default()
    }

    /// Time span of the wind data, else the current data.
    pub fn span(&self) -> TimeSpan {
        let wind = self.series(Variable::WindU);
        if !wind.is_empty() {
            return wind.span();
        }
        self.series(Variable::CurrentU).span()
    }

    pub fn get_wind(&self, positions: &[Position], time: DateTime<Utc>) -> Result<VectorField> {
        let positions = self.normalize(positions);
        let blend = blend_components(
            self.series(Variable::WindU),
            self.series(Variable::WindV),
            time,
            &positions,
        )?;
        let mut field = wind_field(&blend.u, &blend.v);
        self.guard(&positions, &mut field)?;
        Ok(field)
    }

    pub fn get_current(
        &self,
        positions: &[Position],
        time: DateTime<Utc>,
        filter_nodata: bool,
    ) -> Result<VectorField> {
        let positions = self.normalize(positions);
        let u = self.series(Variable::CurrentU);
        let blend = blend_components(u, self.series(Variable::CurrentV), time, &positions)?;
        let mut field = current_field(&blend.u, &blend.v);

        if filter_nodata {
            let layer = &u.layers()[blend.bracket.earlier()];
            self.filter_nodata(layer, &positions, &mut field);
        }
        self.guard(&positions, &mut field)?;
        Ok(field)
    }

    pub fn get_wind_now(&self, positions: &[Position]) -> Result<VectorField> {
        self.get_wind(positions, Utc::now())
    }

    pub fn get_current_now(&self, positions: &[Position], filter_nodata: bool) -> Result<VectorField> {
        self.get_current(positions, Utc::now(), filter_nodata)
    }

    fn normalize(&self, positions: &[Position]) -> Vec<Position> {
        match &self.mesh {
            Some(mesh) => positions
                .iter()
                .map(|p| Position::new(p.lat, mesh.normalize_longitude(p.lon)))
                .collect(),
            None => positions.to_vec(),
        }
    }

    fn filter_nodata(&self, layer: &Layer, positions: &[Position], field: &mut VectorField) {
        if layer.nodata().is_none() {
            return;
        }
        let cutoff = self.config.reconstruction.nodata_fraction_cutoff;
        let blank = self.config.no_data_value.unwrap_or(0.0);
        for (i, p) in positions.iter().enumerate() {
            if layer.nodata_fraction(p.lat, p.lon).unwrap_or(0.0) > cutoff {
                field.blank(i, blank);
            }
        }
    }

    fn guard(&self, positions: &[Position], field: &mut VectorField) -> Result<()> {
        let coverage = self
            .mesh
            .as_ref()
            .map(Mesh::coverage)
            .ok_or_else(|| GridError::span("no data loaded"))?;
        let guard = RangeGuard::new(coverage, self.config.no_data_value);
        let out_of_range = guard.check(positions)?;
        guard.apply(field, &out_of_range);
        Ok(())
    }

    /// Advance ingestion of `dataset` by one event.
    pub(crate) fn step(
        &mut self,
        dataset: &dyn RasterDataset,
        stage: &mut Stage,
    ) -> Option<Result<LoadEvent>> {
        loop {
            match *stage {
                Stage::Open => {
                    *stage = Stage::Done;
                    if let Err(e) = self.attach(dataset) {
                        return Some(Err(e));
                    }
                    *stage = Stage::Band(0);
                    return Some(Ok(LoadEvent::Opened {
                        source: dataset.description(),
                    }));
                }
                Stage::Band(index) if index < dataset.band_count() => {
                    *stage = Stage::Done;
                    match self.ingest_band(dataset, index) {
                        Ok(event) => {
                            *stage = Stage::Band(index + 1);
                            if event.is_some() {
                                return event.map(Ok);
                            }
                        }
                        Err(e) => return Some(Err(e)),
                    }
                }
                Stage::Band(_) => {
                    *stage = Stage::Done;
                    let range = self.range().to_degrees();
                    let span = self.span();
                    info!(
                        source = %dataset.description(),
                        range = ?range,
                        start = %span.start,
                        duration_hours = span.duration.num_minutes() as f64 / 60.0,
                        "Read file"
                    );
                    return Some(Ok(LoadEvent::Finished {
                        source: dataset.description(),
                    }));
                }
                Stage::Done => return None,
            }
        }
    }

    /// Build the mesh from the first dataset, or check a later one matches.
    fn attach(&mut self, dataset: &dyn RasterDataset) -> Result<()> {
        let transform = dataset.geo_transform();
        info!(source = %dataset.description(), "Opened");
        match self.transform {
            Some(existing) if existing == transform => Ok(()),
            Some(existing) => Err(GridError::data(format!(
                "expected data on matching grid: {:?} differs from {:?}",
                transform, existing
            ))),
            None => {
                info!(transform = ?transform, "Set origin and step");
                let (width, height) = dataset.raster_size();
                let mesh = Mesh::from_transform(
                    &GeoTransform::from_gdal_degrees(transform),
                    width,
                    height,
                    self.config.clip.as_ref(),
                )?;
                self.mesh = Some(mesh);
                self.transform = Some(transform);
                Ok(())
            }
        }
    }

    fn ingest_band(&mut self, dataset: &dyn RasterDataset, index: usize) -> Result<Option<LoadEvent>> {
        let info = match classify_band(dataset, index)? {
            Some(info) => info,
            None => return Ok(None),
        };
        let mesh = self
            .mesh
            .as_ref()
            .ok_or_else(|| GridError::data("band read before the mesh was built"))?;

        debug!(variable = %info.variable, time = %info.time, band = index, "Reading band");
        let raw = dataset.read_band(index)?;
        let band = mesh.prepare_band(&raw)?;
        let rec = reconstruct(&band, mesh.lats(), mesh.lons(), &self.config.reconstruction)?;
        let keep = if self.config.save_mem { None } else { Some(band) };
        let layer = Layer::new(info.time, rec.surface, rec.nodata, keep);

        let insertion = self.series[slot(info.variable)].insert_or_replace(layer);
        Ok(Some(LoadEvent::Stored {
            variable: info.variable,
            time: info.time,
            index: insertion.index(),
            replaced: insertion.replaced(),
        }))
    }
}

impl Environment for GribEnvironment {
    fn get_wind(&self, positions: &[Position], time: DateTime<Utc>) -> Result<VectorField> {
        GribEnvironment::get_wind(self, positions, time)
    }

    fn get_current(
        &self,
        positions: &[Position],
        time: DateTime<Utc>,
        filter_nodata: bool,
    ) -> Result<VectorField> {
        GribEnvironment::get_current(self, positions, time, filter_nodata)
    }
}

/// Run a cursor to completion, counting stored layers.
pub(crate) fn drain(events: impl Iterator<Item = Result<LoadEvent>>) -> Result<usize> {
    let mut stored = 0;
    for event in events {
        if event?.is_stored() {
            stored += 1;
        }
    }
    Ok(stored)
}
