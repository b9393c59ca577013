//! Summary statistics over an aggregated record set.

use chrono::{DateTime, Utc};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::models::NormalizedRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryOptions {
    /// Records with fewer ratings are left out of the rating statistics
    pub min_ratings: u32,
    /// Names with fewer locations are not ranked as chains
    pub chain_min_locations: usize,
    /// Length of every ranked list
    pub top_n: usize,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            min_ratings: 100,
            chain_min_locations: 3,
            top_n: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingDistribution {
    pub mean: f64,
    pub min: f64,
    pub first_quartile: f64,
    pub median: f64,
    pub third_quartile: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceLine {
    pub name: String,
    pub address: String,
    pub rating: f64,
    pub rating_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainLine {
    pub name: String,
    pub average_rating: Option<f64>,
    pub rating_total: u64,
    pub locations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryStats {
    pub generated_at: DateTime<Utc>,
    /// Records considered (those near the reference point excluded)
    pub observations: usize,
    /// Of those, records with at least `min_ratings` ratings
    pub well_rated_observations: usize,
    pub ratings: Option<RatingDistribution>,
    pub top_rated: Vec<PlaceLine>,
    /// Lowest rated first
    pub bottom_rated: Vec<PlaceLine>,
    pub most_popular: Vec<PlaceLine>,
    pub top_chains: Vec<ChainLine>,
    /// Lowest rated first
    pub bottom_chains: Vec<ChainLine>,
}

/// Linear-interpolated quantile of an ascending slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

fn distribution(ratings: &mut [f64]) -> Option<RatingDistribution> {
    if ratings.is_empty() {
        return None;
    }
    ratings.sort_by(f64::total_cmp);
    Some(RatingDistribution {
        mean: ratings.iter().sum::<f64>() / ratings.len() as f64,
        min: ratings[0],
        first_quartile: quantile(ratings, 0.25),
        median: quantile(ratings, 0.5),
        third_quartile: quantile(ratings, 0.75),
        max: ratings[ratings.len() - 1],
    })
}

fn place_line(record: &NormalizedRecord, rating: f64) -> PlaceLine {
    PlaceLine {
        name: record.name.clone(),
        address: record.address.clone(),
        rating,
        rating_count: record.rating_count,
    }
}

/// Descending by value, missing values last
fn desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Compute the summary of an aggregated record set.
///
/// Records flagged `near_reference` are excluded throughout.
pub fn summarize(records: &[NormalizedRecord], options: &SummaryOptions) -> SummaryStats {
    let considered: Vec<&NormalizedRecord> =
        records.iter().filter(|r| !r.near_reference).collect();

    let mut well_rated: Vec<(&NormalizedRecord, f64)> = considered
        .iter()
        .filter(|r| r.rating_count >= options.min_ratings)
        .filter_map(|r| r.rating.map(|rating| (*r, rating)))
        .collect();

    let mut ratings: Vec<f64> = well_rated.iter().map(|(_, rating)| *rating).collect();
    let ratings_distribution = distribution(&mut ratings);

    // stable sort: ties keep input order
    well_rated.sort_by(|a, b| b.1.total_cmp(&a.1));
    let top_rated = well_rated
        .iter()
        .take(options.top_n)
        .map(|(r, rating)| place_line(r, *rating))
        .collect();
    let bottom_rated = well_rated
        .iter()
        .rev()
        .take(options.top_n)
        .map(|(r, rating)| place_line(r, *rating))
        .collect();

    let mut popular = well_rated.clone();
    popular.sort_by(|a, b| b.0.rating_count.cmp(&a.0.rating_count));
    let most_popular = popular
        .iter()
        .take(options.top_n)
        .map(|(r, rating)| place_line(r, *rating))
        .collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut chains: Vec<ChainLine> = considered
        .iter()
        .filter(|r| r.location_count >= options.chain_min_locations)
        .filter(|r| seen.insert(r.name.clone()))
        .map(|r| ChainLine {
            name: r.name.clone(),
            average_rating: r.chain_average_rating,
            rating_total: r.chain_rating_total,
            locations: r.location_count,
        })
        .collect();
    chains.sort_by(|a, b| desc(a.average_rating, b.average_rating));

    let top_chains = chains.iter().take(options.top_n).cloned().collect();
    let bottom_chains = chains
        .iter()
        .rev()
        .filter(|c| c.average_rating.is_some())
        .take(options.top_n)
        .cloned()
        .collect();

    SummaryStats {
        generated_at: Utc::now(),
        observations: considered.len(),
        well_rated_observations: well_rated.len(),
        ratings: ratings_distribution,
        top_rated,
        bottom_rated,
        most_popular,
        top_chains,
        bottom_chains,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, rating: f64, count: u32, locations: usize, chain_avg: f64) -> NormalizedRecord {
        NormalizedRecord {
            id: String::new(),
            name: name.to_string(),
            rating: Some(rating),
            rating_count: count,
            address: format!("{} address", name),
            price_tier: None,
            latitude: 40.7,
            longitude: -111.9,
            categories: vec!["restaurant".to_string()],
            primary_category: "restaurant".to_string(),
            weighted_score: Some(rating * f64::from(count)),
            location_count: locations,
            chain_weighted_score: 0.0,
            chain_rating_total: u64::from(count) * locations as u64,
            chain_average_rating: Some(chain_avg),
            near_reference: false,
        }
    }

    #[test]
    fn test_quantiles_interpolate() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0];
        let d = distribution(&mut values).unwrap();
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, 4.0);
        assert_eq!(d.median, 2.5);
        assert_eq!(d.first_quartile, 1.75);
        assert_eq!(d.third_quartile, 3.25);
        assert_eq!(d.mean, 2.5);
    }

    #[test]
    fn test_rankings() {
        let mut airport = rec("Airport Grill", 1.0, 500, 1, 1.0);
        airport.near_reference = true;
        let records = vec![
            rec("A", 4.8, 150, 1, 4.8),
            rec("B", 3.1, 900, 1, 3.1),
            rec("C", 4.2, 50, 1, 4.2),
            rec("D", 2.5, 120, 1, 2.5),
            rec("Chain", 4.0, 300, 3, 3.9),
            rec("Chain", 3.8, 300, 3, 3.9),
            rec("Chain", 3.9, 300, 3, 3.9),
            rec("Duo", 4.9, 300, 2, 4.9),
            airport,
        ];
        let options = SummaryOptions {
            top_n: 2,
            ..Default::default()
        };
        let stats = summarize(&records, &options);

        assert_eq!(stats.observations, 8);
        // C is under 100 ratings
        assert_eq!(stats.well_rated_observations, 7);
        assert_eq!(
            stats.top_rated.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["Duo", "A"]
        );
        assert_eq!(
            stats.bottom_rated.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            vec!["D", "B"]
        );
        assert_eq!(stats.most_popular[0].name, "B");
        assert_eq!(stats.top_chains.len(), 1);
        assert_eq!(stats.top_chains[0].name, "Chain");
        assert_eq!(stats.top_chains[0].locations, 3);
        assert_eq!(stats.ratings.unwrap().max, 4.9);
    }

    #[test]
    fn test_empty_summary() {
        let stats = summarize(&[], &SummaryOptions::default());
        assert_eq!(stats.observations, 0);
        assert!(stats.ratings.is_none());
        assert!(stats.top_rated.is_empty());
        assert!(stats.top_chains.is_empty());
    }
}
