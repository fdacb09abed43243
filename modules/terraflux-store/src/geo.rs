use serde::Serialize;

use terraflux_common::{haversine_km, validate_coordinates, TerrafluxError};
use terraflux_common::config::{DEFAULT_RADIUS_KM, MAX_RADIUS_KM};

use crate::record::Queryable;

/// A point-in-space query: either a radius around a coordinate, or an exact
/// grid cell.
#[derive(Debug, Clone)]
pub enum GeoQuery {
    Near {
        lat: f64,
        lon: f64,
        radius_km: Option<f64>,
    },
    Cell {
        grid_cell_id: String,
    },
}

/// A record paired with its great-circle distance from the query point.
#[derive(Debug, Clone, Serialize)]
pub struct Nearby<R> {
    #[serde(flatten)]
    pub record: R,
    pub distance_km: f64,
}

/// Records whose location falls within `radius_km` of the point, nearest
/// first. Ties broken by id ascending. Records without a location never
/// match.
pub fn find_near<R: Queryable>(
    records: &[R],
    lat: f64,
    lon: f64,
    radius_km: Option<f64>,
) -> Result<Vec<Nearby<R>>, TerrafluxError> {
    validate_coordinates(lat, lon)?;
    let radius = radius_km.unwrap_or(DEFAULT_RADIUS_KM);
    if !radius.is_finite() || radius <= 0.0 {
        return Err(TerrafluxError::InvalidFilter(format!(
            "radius {radius} must be a positive number of kilometers"
        )));
    }
    let radius = radius.min(MAX_RADIUS_KM);

    // Bounding-box prefilter before haversine.
    // ~1 degree lat ≈ 111km, 1 degree lon ≈ 111km * cos(lat)
    let lat_delta = radius / 111.0;
    let lon_scale = lat.to_radians().cos().abs().max(1e-6);
    let lon_delta = (radius / (111.0 * lon_scale)).min(180.0);

    let mut hits: Vec<Nearby<R>> = records
        .iter()
        .filter_map(|record| {
            let loc = record.location()?;
            if (loc.lat - lat).abs() > lat_delta {
                return None;
            }
            if lon_delta < 180.0 && (loc.lon - lon).abs() > lon_delta {
                return None;
            }
            let distance_km = haversine_km(lat, lon, loc.lat, loc.lon);
            (distance_km <= radius).then(|| Nearby {
                record: record.clone(),
                distance_km,
            })
        })
        .collect();

    hits.sort_by(|a, b| {
        a.distance_km
            .total_cmp(&b.distance_km)
            .then_with(|| a.record.id().cmp(&b.record.id()))
    });
    Ok(hits)
}

/// Records sharing the grid cell, in store order.
pub fn in_cell<R: Queryable>(records: &[R], grid_cell_id: &str) -> Vec<R> {
    records
        .iter()
        .filter(|r| r.grid_cell() == Some(grid_cell_id))
        .cloned()
        .collect()
}

/// The single most recent record (by canonical timestamp) for the cell, or
/// None when the cell has no records. Ties broken by id ascending.
pub fn latest_in_cell<R: Queryable>(records: &[R], grid_cell_id: &str) -> Option<R> {
    records
        .iter()
        .filter(|r| r.grid_cell() == Some(grid_cell_id))
        .max_by(|a, b| {
            a.timestamp()
                .cmp(&b.timestamp())
                .then_with(|| b.id().cmp(&a.id()))
        })
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use terraflux_common::{
        grid_cell_for, GeoPoint, Intervention, InterventionStatus, InterventionType,
        SatelliteReading,
    };
    use uuid::Uuid;

    fn site(name: &str, lat: f64, lon: f64) -> Intervention {
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        Intervention {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind: InterventionType::Reforestation,
            location: GeoPoint { lat, lon },
            deployment_date: now,
            capacity_tonnes_co2: 100.0,
            status: InterventionStatus::Active,
            operator: "acme".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn reading(cell: &str, observed_offset_min: i64) -> SatelliteReading {
        let base = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        SatelliteReading {
            id: Uuid::new_v4(),
            grid_cell_id: cell.to_string(),
            satellite_id: "sentinel-5p".to_string(),
            observed_at: base + Duration::minutes(observed_offset_min),
            co2_ppm: Some(417.0),
            temperature_c: None,
            biomass_index: None,
            data_quality: None,
            created_at: base,
            updated_at: base,
        }
    }

    #[test]
    fn out_of_range_latitude_is_rejected() {
        let records: Vec<Intervention> = Vec::new();
        let err = find_near(&records, 95.0, 0.0, Some(10.0)).unwrap_err();
        assert!(matches!(err, TerrafluxError::InvalidCoordinate(_)));
    }

    #[test]
    fn near_returns_only_records_within_radius_nearest_first() {
        // Query point: lower Manhattan. Jersey City ~5km, Newark ~14km,
        // Philadelphia ~130km.
        let jersey_city = site("jersey-city", 40.7178, -74.0431);
        let newark = site("newark", 40.7357, -74.1724);
        let philly = site("philadelphia", 39.9526, -75.1652);
        let records = vec![philly, newark.clone(), jersey_city.clone()];

        let hits = find_near(&records, 40.7, -74.0, Some(50.0)).unwrap();
        let names: Vec<&str> = hits.iter().map(|h| h.record.name.as_str()).collect();
        assert_eq!(names, vec!["jersey-city", "newark"]);
        assert!(hits[0].distance_km < hits[1].distance_km);
        assert!(hits.iter().all(|h| h.distance_km <= 50.0));
    }

    #[test]
    fn near_radius_must_be_positive() {
        let records: Vec<Intervention> = Vec::new();
        assert!(find_near(&records, 0.0, 0.0, Some(-1.0)).is_err());
        assert!(find_near(&records, 0.0, 0.0, Some(0.0)).is_err());
    }

    #[test]
    fn cell_query_matches_exact_cell_only() {
        let cell_a = grid_cell_for(40.7, -74.0).unwrap();
        let cell_b = grid_cell_for(51.5, -0.1).unwrap();
        let records = vec![reading(&cell_a, 0), reading(&cell_b, 0), reading(&cell_a, 5)];

        assert_eq!(in_cell(&records, &cell_a).len(), 2);
        assert_eq!(in_cell(&records, &cell_b).len(), 1);
        assert!(in_cell(&records, "zzzzz").is_empty());
    }

    #[test]
    fn latest_in_cell_picks_most_recent_observation() {
        let cell = grid_cell_for(40.7, -74.0).unwrap();
        let older = reading(&cell, 0);
        let newer = reading(&cell, 90);
        let records = vec![older, newer.clone()];

        let latest = latest_in_cell(&records, &cell).unwrap();
        assert_eq!(latest.id, newer.id);
    }

    #[test]
    fn latest_in_empty_cell_is_none_not_error() {
        let records: Vec<SatelliteReading> = Vec::new();
        assert!(latest_in_cell(&records, "gcpvj").is_none());
    }
}
