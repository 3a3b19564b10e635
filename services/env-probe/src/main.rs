//! Wind and current probe.
//!
//! Loads a provider's pre-decoded rasters, prints the wind or current at
//! one position and optionally keeps watching the provider's update marker.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use grid_environment::units::{angle_diff, to_knots};
use grid_environment::{
    EngineConfig, Environment, GribEnvironment, JsonRasterDriver, LiveGribEnvironment, Position,
    ProviderConfig, VectorField,
};

#[derive(Parser, Debug)]
#[command(name = "env-probe")]
#[command(about = "Query gridded wind and current at a position")]
struct Args {
    /// Engine configuration file (YAML or JSON); environment variables otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Provider preset (gfs, gefs-NN, bsh-north-sea, ...)
    #[arg(short, long)]
    provider: Option<String>,

    /// Directory holding the provider's files
    #[arg(short, long)]
    dir: Option<PathBuf>,

    /// Latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lat: f64,

    /// Longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lon: f64,

    /// Query time (RFC 3339), default now
    #[arg(short, long)]
    time: Option<String>,

    /// Query the current instead of the wind
    #[arg(long)]
    current: bool,

    /// Suppress current where the source data was mostly missing
    #[arg(long)]
    filter_nodata: bool,

    /// Keep polling the update marker at this interval
    #[arg(long)]
    watch_secs: Option<u64>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&args)?;
    info!(
        provider = %config.provider.name,
        dir = %config.provider.cache_dir.display(),
        "Loaded configuration"
    );

    let mut env = LiveGribEnvironment::new(GribEnvironment::new(config), JsonRasterDriver::new());
    env.check().context("initial load failed")?;

    let engine = env.engine();
    let span = engine.span();
    info!(
        range = ?engine.range().to_degrees(),
        start = %span.start,
        end = %span.end(),
        "Environment ready"
    );

    let time = match &args.time {
        Some(t) => DateTime::parse_from_rfc3339(t)
            .with_context(|| format!("invalid --time {:?}", t))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let watch_secs = match args.watch_secs {
        Some(secs) => secs.max(1),
        None => return probe(&env, &args, time).map(|_| ()),
    };

    let mut last = match probe(&env, &args, time) {
        Ok(field) => Some(field),
        Err(e) => {
            warn!(error = %e, "Query failed");
            None
        }
    };

    info!(interval_secs = watch_secs, "Watching for updates");
    let mut interval = tokio::time::interval(Duration::from_secs(watch_secs));
    interval.tick().await;
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        }

        match env.check() {
            Ok(true) => {
                let time = args.time.as_ref().map_or_else(Utc::now, |_| time);
                match probe(&env, &args, time) {
                    Ok(field) => {
                        if let Some(prev) = &last {
                            report_change(prev, &field);
                        }
                        last = Some(field);
                    }
                    Err(e) => warn!(error = %e, "Query failed"),
                }
            }
            Ok(false) => debug!("No update"),
            Err(e) => warn!(error = %e, "Update failed"),
        }
    }
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::from_env()?,
    };
    if let Some(name) = &args.provider {
        let cache_dir = config.provider.cache_dir.clone();
        config.provider = ProviderConfig::named(name)?.with_cache_dir(cache_dir);
    }
    if let Some(dir) = &args.dir {
        config.provider.cache_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

fn probe(env: &dyn Environment, args: &Args, time: DateTime<Utc>) -> Result<VectorField> {
    let position = [Position::from_degrees(args.lat, args.lon)];
    let (kind, field) = if args.current {
        ("current", env.get_current(&position, time, args.filter_nodata)?)
    } else {
        ("wind", env.get_wind(&position, time)?)
    };
    for (angle, speed) in field.iter() {
        println!(
            "{} at {:.4},{:.4} {}: {:.0}° {:.2} m/s ({:.1} kn)",
            kind,
            args.lat,
            args.lon,
            time.to_rfc3339(),
            angle.to_degrees(),
            speed,
            to_knots(speed)
        );
    }
    Ok(field)
}

/// Log how direction and speed moved since the previous reload.
fn report_change(prev: &VectorField, next: &VectorField) {
    for ((a0, s0), (a1, s1)) in prev.iter().zip(next.iter()) {
        info!(
            turn_deg = angle_diff(a0, a1).to_degrees(),
            speed_change = s1 - s0,
            "Changed since last update"
        );
    }
}
