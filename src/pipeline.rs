//! Pipeline entry points used by the binaries.
//!
//! All settings arrive through the config structs; nothing is read from
//! the process environment here.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::collect::{collect_concurrent, CollectionReport};
use crate::config::{RegionConfig, SearchConfig, TransformConfig};
use crate::grid::{generate_grid, Grid};
use crate::models::{Coordinate, NormalizedRecord, PlaceRecord};
use crate::pip::{filter_to_region, unique_points, Region, RegionMatch};
use crate::places::PlaceSearch;
use crate::transform::{aggregate, normalize, summarize, SummaryStats};

/// The grid, its region matches, and the points to search
#[derive(Debug, Clone)]
pub struct SearchPlan {
    pub grid: Grid,
    pub matches: Vec<RegionMatch>,
    /// Distinct matched points, each searched once
    pub points: Vec<Coordinate>,
}

/// Load the region boundaries from a URL or a local GeoJSON file.
pub async fn load_region(config: &RegionConfig) -> Result<Region> {
    let text = if config.source.starts_with("http://") || config.source.starts_with("https://") {
        info!("Downloading region boundaries from {}", config.source);
        reqwest::get(&config.source)
            .await
            .context("Failed to request region boundaries")?
            .error_for_status()
            .context("Region boundary service returned an error")?
            .text()
            .await
            .context("Failed to read region boundaries")?
    } else {
        info!("Reading region boundaries from {}", config.source);
        tokio::fs::read_to_string(&config.source)
            .await
            .with_context(|| format!("Failed to read {}", config.source))?
    };

    let region = Region::from_geojson(&text, &config.name_property)?;
    if config.select.is_empty() {
        Ok(region)
    } else {
        Ok(region.select(&config.select)?)
    }
}

/// Generate the grid and keep the points inside `region`.
///
/// Runs before any external call, so bad parameters fail the run cheaply.
pub fn plan_search(search: &SearchConfig, region: &Region) -> Result<SearchPlan> {
    let grid = generate_grid(search.start, search.spacing_m, search.iterations)
        .context("Failed to generate search grid")?;
    info!("{} grid points generated", grid.len());

    let matches = filter_to_region(grid.points(), region);
    let points = unique_points(&matches);
    info!("{} grid points within region", points.len());

    Ok(SearchPlan {
        grid,
        matches,
        points,
    })
}

/// Search every planned point, showing progress.
pub async fn run_collection<S>(
    plan: &SearchPlan,
    search: &S,
    concurrency: usize,
) -> Result<CollectionReport>
where
    S: PlaceSearch + ?Sized,
{
    let progress = ProgressBar::new(plan.points.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )?
            .progress_chars("#>-"),
    );

    let report = collect_concurrent(&plan.points, search, concurrency, &progress).await;
    progress.finish_and_clear();

    Ok(report?)
}

/// Normalize, aggregate and summarize collected records.
pub fn compile(
    records: &[PlaceRecord],
    transform: &TransformConfig,
) -> Result<(Vec<NormalizedRecord>, SummaryStats)> {
    let normalized = normalize(records, &transform.allowed_categories)
        .context("Failed to normalize records")?;
    let aggregated = aggregate(normalized, &transform.reference);
    let stats = summarize(&aggregated, &transform.summary);
    Ok((aggregated, stats))
}
