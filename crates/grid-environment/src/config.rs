//! Engine and data-provider configuration.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{GridError, Result};
use crate::nodata::ReconstructionParams;
use crate::types::ClipWindow;

/// Default age after which layers are pruned on live updates.
pub const DEFAULT_PRUNE_AGE_HOURS: u64 = 24;

/// Configuration for a [`GribEnvironment`](crate::GribEnvironment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Magnitude reported for out-of-range or filtered positions. Without
    /// one, out-of-range queries fail.
    pub no_data_value: Option<f64>,

    /// Restrict the mesh to this window (degrees).
    pub clip: Option<ClipWindow>,

    /// Drop the prepared raw grids after fitting.
    pub save_mem: bool,

    /// Live updates prune layers older than this many hours.
    pub prune_age_hours: u64,

    /// Missing-data reconstruction constants.
    pub reconstruction: ReconstructionParams,

    /// Where source files come from.
    pub provider: ProviderConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            no_data_value: None,
            clip: None,
            save_mem: false,
            prune_age_hours: DEFAULT_PRUNE_AGE_HOURS,
            reconstruction: ReconstructionParams::default(),
            provider: ProviderConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(val) = lookup("GRID_NO_DATA_VALUE") {
            let value = val
                .trim()
                .parse()
                .map_err(|_| GridError::config(format!("invalid GRID_NO_DATA_VALUE: {}", val)))?;
            config.no_data_value = Some(value);
        }

        if let Some(val) = lookup("GRID_CLIP") {
            let clip = ClipWindow::parse(&val).ok_or_else(|| {
                GridError::config(format!(
                    "invalid GRID_CLIP {:?}, expected lat_min,lat_max,lon_min,lon_max",
                    val
                ))
            })?;
            config.clip = Some(clip);
        }

        if let Some(val) = lookup("GRID_SAVE_MEM") {
            config.save_mem = val.to_lowercase() == "true" || val == "1";
        }

        if let Some(val) = lookup("GRID_PRUNE_AGE_HOURS") {
            config.prune_age_hours = val
                .trim()
                .parse()
                .map_err(|_| GridError::config(format!("invalid GRID_PRUNE_AGE_HOURS: {}", val)))?;
        }

        if let Some(val) = lookup("GRID_PROVIDER") {
            config.provider = ProviderConfig::named(&val)?;
        }

        if let Some(val) = lookup("GRID_CACHE_DIR") {
            config.provider.cache_dir = PathBuf::from(val);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML or JSON file, chosen by extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        let config: Self = match extension.as_deref() {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(GridError::config(format!(
                    "unsupported config format: {}",
                    path.display()
                )))
            }
        };
        debug!(path = %path.display(), "Loaded engine configuration");
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.prune_age_hours == 0 {
            return Err(GridError::config("prune_age_hours must be at least 1"));
        }
        if let Some(clip) = &self.clip {
            if clip.lat_min >= clip.lat_max || clip.lon_min >= clip.lon_max {
                return Err(GridError::config(format!(
                    "clip window is empty: {:?}",
                    clip
                )));
            }
        }
        if let Some(value) = self.no_data_value {
            if !value.is_finite() {
                return Err(GridError::config("no_data_value must be finite"));
            }
        }
        let r = &self.reconstruction;
        if !(r.sentinel_threshold > 0.0) {
            return Err(GridError::config("sentinel_threshold must be positive"));
        }
        if !(r.antialias_weight >= 0.0) {
            return Err(GridError::config("antialias_weight must not be negative"));
        }
        if !(r.nodata_fraction_cutoff > 0.0 && r.nodata_fraction_cutoff <= 1.0) {
            return Err(GridError::config("nodata_fraction_cutoff must be in (0, 1]"));
        }
        self.provider.validate()
    }

    pub fn prune_age(&self) -> Duration {
        Duration::hours(self.prune_age_hours as i64)
    }
}

/// A named source of GRIB files: where they live, how they are named and
/// which marker file signals a completed download.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: String,
    /// File-name wildcard; `*` matches any run, `?` one character.
    pub file_pattern: String,
    /// Marker file touched after each download. Relative names resolve in
    /// the directory of the first source file.
    pub update_marker: String,
    pub cache_dir: PathBuf,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::preset("default", "*", "updated")
    }
}

impl ProviderConfig {
    fn preset(name: &str, file_pattern: &str, update_marker: &str) -> Self {
        Self {
            name: name.to_string(),
            file_pattern: file_pattern.to_string(),
            update_marker: update_marker.to_string(),
            cache_dir: default_cache_dir(),
        }
    }

    /// NOAA GFS wind forecasts.
    pub fn gfs() -> Self {
        Self::preset("gfs", "gfs*", "updated.gfs")
    }

    /// NOAA GEFS ensemble member `set`.
    pub fn gefs(set: u8) -> Self {
        Self::preset(
            &format!("gefs-{:02}", set),
            &format!("gefs-{:02}-*", set),
            "updated.gefs",
        )
    }

    /// BSH North Sea currents.
    pub fn bsh_north_sea() -> Self {
        Self::preset("bsh-north-sea", "Current_no_*", "updated.bsh")
    }

    /// BSH German Bight currents.
    pub fn bsh_german_bight() -> Self {
        Self::preset("bsh-german-bight", "Current_db_*", "updated.bsh")
    }

    /// BSH Baltic currents.
    pub fn bsh_baltic() -> Self {
        Self::preset("bsh-baltic", "Current_ba_*", "updated.bsh")
    }

    /// BSH western Baltic currents.
    pub fn bsh_west_baltic() -> Self {
        Self::preset("bsh-west-baltic", "Current_wb_*", "updated.bsh")
    }

    /// Look up a preset by name. `gefs` is member 0; `gefs-NN` selects a member.
    pub fn named(name: &str) -> Result<Self> {
        let name = name.trim().to_lowercase();
        match name.as_str() {
            "default" => Ok(Self::default()),
            "gfs" => Ok(Self::gfs()),
            "gefs" => Ok(Self::gefs(0)),
            "bsh-north-sea" => Ok(Self::bsh_north_sea()),
            "bsh-german-bight" => Ok(Self::bsh_german_bight()),
            "bsh-baltic" => Ok(Self::bsh_baltic()),
            "bsh-west-baltic" => Ok(Self::bsh_west_baltic()),
            other => match other.strip_prefix("gefs-").map(str::parse::<u8>) {
                Some(Ok(set)) => Ok(Self::gefs(set)),
                _ => Err(GridError::config(format!("unknown provider: {}", other))),
            },
        }
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.file_pattern.is_empty() {
            return Err(GridError::config("file_pattern must not be empty"));
        }
        if self.update_marker.is_empty() {
            return Err(GridError::config("update_marker must not be empty"));
        }
        Ok(())
    }

    /// Source files in the cache directory matching the file pattern,
    /// sorted by name. The update marker itself is never included.
    pub fn discover_files(&self) -> Result<Vec<PathBuf>> {
        if !self.cache_dir.is_dir() {
            warn!(dir = %self.cache_dir.display(), provider = %self.name, "Cache directory does not exist");
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.cache_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| GridError::config(format!("scanning cache directory: {}", e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if name != self.update_marker.as_str() && wildcard_match(&self.file_pattern, &name) {
                files.push(entry.into_path());
            }
        }
        debug!(provider = %self.name, count = files.len(), "Discovered source files");
        Ok(files)
    }
}

/// `$XDG_CACHE_HOME/gribs`, else `$HOME/.cache/gribs`, else `./gribs`.
pub fn default_cache_dir() -> PathBuf {
    let non_empty = |key: &str| env::var_os(key).filter(|v| !v.is_empty());
    if let Some(dir) = non_empty("XDG_CACHE_HOME") {
        PathBuf::from(dir).join("gribs")
    } else if let Some(home) = non_empty("HOME") {
        PathBuf::from(home).join(".cache").join("gribs")
    } else {
        PathBuf::from("gribs")
    }
}

/// Shell-style match of `name` against `pattern` (`*` and `?` only).
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ni));
            pi += 1;
        } else if let Some((sp, sn)) = star {
            // Let the last star absorb one more character
            pi = sp + 1;
            ni = sn + 1;
            star = Some((sp, sn + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '*')
}
