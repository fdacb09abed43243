use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TerrafluxError;

// --- Geo Types ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Haversine great-circle distance between two lat/lon points in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let lat1_r = lat1.to_radians();
    let lat2_r = lat2.to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1_r.cos() * lat2_r.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Reject coordinates outside the WGS84 domain.
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), TerrafluxError> {
    if !lat.is_finite() || lat.abs() > 90.0 {
        return Err(TerrafluxError::InvalidCoordinate(format!(
            "latitude {lat} out of range [-90, 90]"
        )));
    }
    if !lon.is_finite() || lon.abs() > 180.0 {
        return Err(TerrafluxError::InvalidCoordinate(format!(
            "longitude {lon} out of range [-180, 180]"
        )));
    }
    Ok(())
}

// --- Grid Cells ---

/// Geohash precision for grid cell ids. Five characters ≈ 4.9 km × 4.9 km cells.
pub const GRID_CELL_PRECISION: usize = 5;

/// Bucket a point into its grid cell id. None for out-of-range coordinates.
pub fn grid_cell_for(lat: f64, lon: f64) -> Option<String> {
    if validate_coordinates(lat, lon).is_err() {
        return None;
    }
    geohash::encode(geohash::Coord { x: lon, y: lat }, GRID_CELL_PRECISION).ok()
}

/// A grid cell id is any decodable geohash string.
pub fn is_valid_grid_cell(id: &str) -> bool {
    !id.is_empty() && geohash::decode(id).is_ok()
}

/// Center point of a grid cell, if the id decodes.
pub fn grid_cell_center(id: &str) -> Option<GeoPoint> {
    let (coord, _, _) = geohash::decode(id).ok()?;
    Some(GeoPoint {
        lat: coord.y,
        lon: coord.x,
    })
}

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionType {
    Dac,
    Biochar,
    Reforestation,
    OceanFertilization,
    EnhancedWeathering,
    SolarRadiation,
}

impl std::fmt::Display for InterventionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterventionType::Dac => write!(f, "dac"),
            InterventionType::Biochar => write!(f, "biochar"),
            InterventionType::Reforestation => write!(f, "reforestation"),
            InterventionType::OceanFertilization => write!(f, "ocean_fertilization"),
            InterventionType::EnhancedWeathering => write!(f, "enhanced_weathering"),
            InterventionType::SolarRadiation => write!(f, "solar_radiation"),
        }
    }
}

impl InterventionType {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "dac" | "direct_air_capture" => Some(Self::Dac),
            "biochar" => Some(Self::Biochar),
            "reforestation" => Some(Self::Reforestation),
            "ocean_fertilization" => Some(Self::OceanFertilization),
            "enhanced_weathering" => Some(Self::EnhancedWeathering),
            "solar_radiation" => Some(Self::SolarRadiation),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionStatus {
    Planned,
    Active,
    Completed,
    Cancelled,
}

impl std::fmt::Display for InterventionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterventionStatus::Planned => write!(f, "planned"),
            InterventionStatus::Active => write!(f, "active"),
            InterventionStatus::Completed => write!(f, "completed"),
            InterventionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl InterventionStatus {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "planned" => Some(Self::Planned),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationStatus {
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimizationStatus::Running => write!(f, "running"),
            OptimizationStatus::Completed => write!(f, "completed"),
            OptimizationStatus::Failed => write!(f, "failed"),
        }
    }
}

impl OptimizationStatus {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
    Satellite,
    GroundStation,
    Model,
    Reanalysis,
}

impl std::fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSourceKind::Satellite => write!(f, "satellite"),
            DataSourceKind::GroundStation => write!(f, "ground_station"),
            DataSourceKind::Model => write!(f, "model"),
            DataSourceKind::Reanalysis => write!(f, "reanalysis"),
        }
    }
}

impl DataSourceKind {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "satellite" => Some(Self::Satellite),
            "ground_station" | "ground-station" => Some(Self::GroundStation),
            "model" => Some(Self::Model),
            "reanalysis" => Some(Self::Reanalysis),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateFrequency {
    Hourly,
    Daily,
    Weekly,
    Monthly,
}

impl std::fmt::Display for UpdateFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateFrequency::Hourly => write!(f, "hourly"),
            UpdateFrequency::Daily => write!(f, "daily"),
            UpdateFrequency::Weekly => write!(f, "weekly"),
            UpdateFrequency::Monthly => write!(f, "monthly"),
        }
    }
}

impl UpdateFrequency {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            _ => None,
        }
    }
}

// --- Records ---

/// A deployed (or planned) climate intervention: a DAC plant, a biochar
/// facility, a reforestation project, and so on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    pub id: Uuid,
    pub name: String,
    pub kind: InterventionType,
    pub location: GeoPoint,
    pub deployment_date: DateTime<Utc>,
    /// Annual CO2 removal capacity in tonnes. Non-negative.
    pub capacity_tonnes_co2: f64,
    pub status: InterventionStatus,
    /// External operator identifier. Weak reference, not owned by this layer.
    pub operator: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One satellite observation bucketed into a grid cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteReading {
    pub id: Uuid,
    /// Geohash grid cell id at `GRID_CELL_PRECISION`.
    pub grid_cell_id: String,
    pub satellite_id: String,
    pub observed_at: DateTime<Utc>,
    pub co2_ppm: Option<f64>,
    pub temperature_c: Option<f64>,
    pub biomass_index: Option<f64>,
    /// Instrument quality score, 0–1.
    pub data_quality: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Measured impact of an intervention over a grid cell and period.
/// Cannot exist without its intervention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactReport {
    pub id: Uuid,
    pub intervention_id: Uuid,
    pub grid_cell_id: String,
    /// Overall effectiveness, 0–1.
    pub effectiveness_score: f64,
    pub confidence_level: Option<f64>,
    pub temperature_change_c: Option<f64>,
    pub co2_change_ppm: Option<f64>,
    pub observed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub id: Uuid,
    /// External operator identifier. Weak reference.
    pub operator: String,
    pub grid_cell_id: String,
    pub algorithm: String,
    pub status: OptimizationStatus,
    /// Objective score found by the run. Non-negative.
    pub score: f64,
    pub objective: Option<String>,
    pub iterations: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An upstream data feed we ingest readings from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub id: Uuid,
    pub name: String,
    pub provider: String,
    pub kind: DataSourceKind,
    pub requires_auth: bool,
    pub update_frequency: UpdateFrequency,
    pub active: bool,
    pub url: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_sf_to_oakland() {
        // SF to Oakland is ~13km
        let dist = haversine_km(37.7749, -122.4194, 37.8044, -122.2712);
        assert!(
            (dist - 13.0).abs() < 2.0,
            "SF to Oakland should be ~13km, got {dist}"
        );
    }

    #[test]
    fn haversine_sf_to_la() {
        // SF to LA is ~559km
        let dist = haversine_km(37.7749, -122.4194, 34.0522, -118.2437);
        assert!(
            (dist - 559.0).abs() < 10.0,
            "SF to LA should be ~559km, got {dist}"
        );
    }

    #[test]
    fn haversine_same_point_is_zero() {
        let dist = haversine_km(44.9778, -93.265, 44.9778, -93.265);
        assert!(dist < 0.001, "Same point should be 0km, got {dist}");
    }

    #[test]
    fn coordinates_out_of_range_rejected() {
        assert!(validate_coordinates(95.0, 0.0).is_err());
        assert!(validate_coordinates(-90.5, 0.0).is_err());
        assert!(validate_coordinates(0.0, 181.0).is_err());
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
        assert!(validate_coordinates(40.7, -74.0).is_ok());
        assert!(validate_coordinates(90.0, 180.0).is_ok());
    }

    #[test]
    fn grid_cell_round_trip() {
        let cell = grid_cell_for(40.7128, -74.006).unwrap();
        assert_eq!(cell.len(), GRID_CELL_PRECISION);
        assert!(is_valid_grid_cell(&cell));
        let center = grid_cell_center(&cell).unwrap();
        // A precision-5 cell is ~4.9km across; the center must be nearby.
        assert!(haversine_km(40.7128, -74.006, center.lat, center.lon) < 5.0);
    }

    #[test]
    fn grid_cell_rejects_garbage() {
        assert!(!is_valid_grid_cell(""));
        assert!(!is_valid_grid_cell("not a geohash!"));
        assert!(grid_cell_for(95.0, 0.0).is_none());
    }

    #[test]
    fn intervention_type_serde_snake_case() {
        let json = serde_json::to_string(&InterventionType::OceanFertilization).unwrap();
        assert_eq!(json, "\"ocean_fertilization\"");
        let back: InterventionType = serde_json::from_str("\"enhanced_weathering\"").unwrap();
        assert_eq!(back, InterventionType::EnhancedWeathering);
    }

    #[test]
    fn intervention_type_loose_parse() {
        assert_eq!(
            InterventionType::from_str_loose("DAC"),
            Some(InterventionType::Dac)
        );
        assert_eq!(
            InterventionType::from_str_loose("Reforestation"),
            Some(InterventionType::Reforestation)
        );
        assert_eq!(InterventionType::from_str_loose("cloud_seeding"), None);
    }

    #[test]
    fn status_loose_parse_accepts_both_spellings() {
        assert_eq!(
            InterventionStatus::from_str_loose("canceled"),
            Some(InterventionStatus::Cancelled)
        );
        assert_eq!(
            InterventionStatus::from_str_loose("cancelled"),
            Some(InterventionStatus::Cancelled)
        );
    }
}
