//! Collection driver: one places search per grid point.
//!
//! A failing point is recorded and skipped; only a fatal service error
//! (bad credentials) stops the run.

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{error, info, warn};

use crate::error::{GridScoutError, Result};
use crate::models::{Coordinate, PlaceRecord};
use crate::places::PlaceSearch;

/// A point whose search failed, and why
#[derive(Debug, Clone, PartialEq)]
pub struct PointFailure {
    /// Position of the point in the collection order
    pub index: usize,
    pub point: Coordinate,
    pub error: String,
}

/// Records collected over a batch of points plus the points that failed
#[derive(Debug, Clone, Default)]
pub struct CollectionReport {
    /// Concatenated search results, in point order. Not deduplicated.
    pub records: Vec<PlaceRecord>,
    pub failures: Vec<PointFailure>,
    pub points_attempted: usize,
}

impl CollectionReport {
    pub fn points_succeeded(&self) -> usize {
        self.points_attempted - self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    fn absorb(&mut self, index: usize, point: Coordinate, result: Result<Vec<PlaceRecord>>) -> Result<()> {
        self.points_attempted += 1;
        match result {
            Ok(records) => {
                self.records.extend(records);
                Ok(())
            }
            Err(e) if e.is_fatal() => {
                error!("Aborting collection at point {} ({}): {}", index, point, e);
                Err(e)
            }
            Err(e) => {
                warn!("Search failed at point {} ({}): {}", index, point, e);
                self.failures.push(PointFailure {
                    index,
                    point,
                    error: e.to_string(),
                });
                Ok(())
            }
        }
    }

    fn log_summary(&self) {
        info!(
            "Collected {} records from {}/{} points ({} failed)",
            self.records.len(),
            self.points_succeeded(),
            self.points_attempted,
            self.failures.len()
        );
    }
}

/// Run `fetch` for each point in order and concatenate the results.
pub fn collect<F>(points: &[Coordinate], mut fetch: F) -> Result<CollectionReport>
where
    F: FnMut(Coordinate) -> Result<Vec<PlaceRecord>>,
{
    let mut report = CollectionReport::default();

    for (index, &point) in points.iter().enumerate() {
        report.absorb(index, point, fetch(point))?;
    }

    report.log_summary();
    Ok(report)
}

/// Search every point with at most `concurrency` requests in flight.
///
/// Results are absorbed in point order, so the report is identical to
/// what [`collect`] would produce with the same responses.
pub async fn collect_concurrent<S>(
    points: &[Coordinate],
    search: &S,
    concurrency: usize,
    progress: &ProgressBar,
) -> Result<CollectionReport>
where
    S: PlaceSearch + ?Sized,
{
    if concurrency == 0 {
        return Err(GridScoutError::invalid("collection concurrency must be at least 1"));
    }

    let mut report = CollectionReport::default();

    let mut results = stream::iter(points.iter().copied().enumerate())
        .map(|(index, point)| async move {
            let result = search.search(point).await;
            (index, point, result)
        })
        .buffered(concurrency);

    while let Some((index, point, result)) = results.next().await {
        progress.inc(1);
        report.absorb(index, point, result)?;
    }

    report.log_summary();
    Ok(report)
}
