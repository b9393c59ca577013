//! Meter offsets to degree offsets on a spherical earth.

use crate::error::{GridScoutError, Result};

/// Earth radius in kilometers used by every offset calculation
pub const EARTH_RADIUS_KM: f64 = 6378.0;

/// Latitudes closer than this to a pole have no usable longitude scale.
const POLE_EPSILON_DEG: f64 = 1e-6;

fn meters_to_degrees(meters: f64) -> f64 {
    (meters / 1000.0 / EARTH_RADIUS_KM).to_degrees()
}

fn check_latitude(lat: f64) -> Result<()> {
    if !lat.is_finite() || lat.abs() > 90.0 {
        return Err(GridScoutError::invalid(format!(
            "latitude {} outside [-90, 90]",
            lat
        )));
    }
    Ok(())
}

/// Latitude reached by moving `meters` north (negative: south) from `lat0`.
pub fn destination_latitude(lat0: f64, meters: f64) -> Result<f64> {
    check_latitude(lat0)?;
    if !meters.is_finite() {
        return Err(GridScoutError::invalid(format!("offset {} m", meters)));
    }

    let lat1 = lat0 + meters_to_degrees(meters);
    if lat1.abs() > 90.0 {
        return Err(GridScoutError::GeometryDegenerate(format!(
            "moving {} m from latitude {} crosses a pole",
            meters, lat0
        )));
    }
    Ok(lat1)
}

/// Longitude reached by moving `meters` east (negative: west) from
/// `(lat0, lon0)`.
///
/// The degree offset grows with `1 / cos(lat0)`, so this fails with
/// `GeometryDegenerate` at the poles instead of returning infinity.
pub fn destination_longitude(lon0: f64, lat0: f64, meters: f64) -> Result<f64> {
    check_latitude(lat0)?;
    if !lon0.is_finite() || !meters.is_finite() {
        return Err(GridScoutError::invalid(format!(
            "longitude {} with offset {} m",
            lon0, meters
        )));
    }
    if 90.0 - lat0.abs() < POLE_EPSILON_DEG {
        return Err(GridScoutError::GeometryDegenerate(format!(
            "longitude offset undefined at latitude {}",
            lat0
        )));
    }

    let lon1 = lon0 + meters_to_degrees(meters) / lat0.to_radians().cos();
    if !lon1.is_finite() {
        return Err(GridScoutError::GeometryDegenerate(format!(
            "longitude offset of {} m at latitude {} is not finite",
            meters, lat0
        )));
    }

    // Only wrap when needed; re-normalizing in-range values would perturb them.
    if (-180.0..=180.0).contains(&lon1) {
        Ok(lon1)
    } else {
        Ok((lon1 + 180.0).rem_euclid(360.0) - 180.0)
    }
}

/// Great-circle distance in meters on the same sphere the offsets use.
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * 1000.0 * a.sqrt().asin()
}
