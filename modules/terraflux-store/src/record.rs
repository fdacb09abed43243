use chrono::{DateTime, Utc};
use uuid::Uuid;

use terraflux_common::{
    grid_cell_center, DataSource, GeoPoint, ImpactReport, Intervention, OptimizationResult,
    SatelliteReading,
};

/// Uniform query surface over a record kind. The filter builder, ranking
/// engine, and geospatial lookup all operate through this trait, so each
/// resource kind opts into exactly the dimensions it carries.
pub trait Queryable: Clone + Send + Sync + 'static {
    /// Resource name used in not-found errors ("intervention", "impact report", ...).
    const KIND: &'static str;

    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
    /// Canonical timestamp for date-range filters and latest-in-cell lookups.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Enumerated type field, rendered to its wire string.
    fn kind_key(&self) -> Option<String> {
        None
    }
    fn status_key(&self) -> Option<String> {
        None
    }
    /// External reference identifier (operator, satellite id), where the
    /// record carries one.
    fn reference_key(&self) -> Option<&str> {
        None
    }
    fn grid_cell(&self) -> Option<&str> {
        None
    }
    /// Named numeric field access. Absent fields return None, never zero.
    fn metric(&self, field: &str) -> Option<f64> {
        let _ = field;
        None
    }
    /// Text fields participating in substring search.
    fn search_text(&self) -> Vec<&str> {
        Vec::new()
    }
    /// Location attribute for radius queries. Cell-bucketed records resolve
    /// to their cell center.
    fn location(&self) -> Option<GeoPoint> {
        None
    }
}

impl Queryable for Intervention {
    const KIND: &'static str = "intervention";

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.deployment_date
    }

    fn kind_key(&self) -> Option<String> {
        Some(self.kind.to_string())
    }

    fn status_key(&self) -> Option<String> {
        Some(self.status.to_string())
    }

    fn reference_key(&self) -> Option<&str> {
        Some(&self.operator)
    }

    fn metric(&self, field: &str) -> Option<f64> {
        match field {
            "capacity_tonnes_co2" => Some(self.capacity_tonnes_co2),
            _ => None,
        }
    }

    fn search_text(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.operator.as_str()];
        if let Some(d) = &self.description {
            fields.push(d.as_str());
        }
        fields
    }

    fn location(&self) -> Option<GeoPoint> {
        Some(self.location)
    }
}

impl Queryable for SatelliteReading {
    const KIND: &'static str = "satellite reading";

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.observed_at
    }

    fn reference_key(&self) -> Option<&str> {
        Some(&self.satellite_id)
    }

    fn grid_cell(&self) -> Option<&str> {
        Some(&self.grid_cell_id)
    }

    fn metric(&self, field: &str) -> Option<f64> {
        match field {
            "co2_ppm" => self.co2_ppm,
            "temperature_c" => self.temperature_c,
            "biomass_index" => self.biomass_index,
            "data_quality" => self.data_quality,
            _ => None,
        }
    }

    fn search_text(&self) -> Vec<&str> {
        vec![self.satellite_id.as_str()]
    }

    fn location(&self) -> Option<GeoPoint> {
        grid_cell_center(&self.grid_cell_id)
    }
}

impl Queryable for ImpactReport {
    const KIND: &'static str = "impact report";

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.observed_at
    }

    fn grid_cell(&self) -> Option<&str> {
        Some(&self.grid_cell_id)
    }

    fn metric(&self, field: &str) -> Option<f64> {
        match field {
            "effectiveness_score" => Some(self.effectiveness_score),
            "confidence_level" => self.confidence_level,
            "temperature_change_c" => self.temperature_change_c,
            "co2_change_ppm" => self.co2_change_ppm,
            _ => None,
        }
    }

    fn location(&self) -> Option<GeoPoint> {
        grid_cell_center(&self.grid_cell_id)
    }
}

impl Queryable for OptimizationResult {
    const KIND: &'static str = "optimization result";

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn status_key(&self) -> Option<String> {
        Some(self.status.to_string())
    }

    fn reference_key(&self) -> Option<&str> {
        Some(&self.operator)
    }

    fn grid_cell(&self) -> Option<&str> {
        Some(&self.grid_cell_id)
    }

    fn metric(&self, field: &str) -> Option<f64> {
        match field {
            "score" => Some(self.score),
            "iterations" => self.iterations.map(f64::from),
            _ => None,
        }
    }

    fn search_text(&self) -> Vec<&str> {
        let mut fields = vec![self.algorithm.as_str(), self.operator.as_str()];
        if let Some(o) = &self.objective {
            fields.push(o.as_str());
        }
        fields
    }

    fn location(&self) -> Option<GeoPoint> {
        grid_cell_center(&self.grid_cell_id)
    }
}

impl Queryable for DataSource {
    const KIND: &'static str = "data source";

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn kind_key(&self) -> Option<String> {
        Some(self.kind.to_string())
    }

    fn search_text(&self) -> Vec<&str> {
        let mut fields = vec![self.name.as_str(), self.provider.as_str()];
        if let Some(d) = &self.description {
            fields.push(d.as_str());
        }
        fields
    }
}

// --- Pagination ---

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

pub const DEFAULT_PAGE_LIMIT: usize = 100;
pub const MAX_PAGE_LIMIT: usize = 1000;

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Page {
    pub fn new(offset: Option<usize>, limit: Option<usize>) -> Self {
        Self {
            offset: offset.unwrap_or(0),
            limit: limit.unwrap_or(DEFAULT_PAGE_LIMIT).min(MAX_PAGE_LIMIT),
        }
    }
}

/// One page of matches plus the total match count, so callers can compute
/// further pages without re-querying.
#[derive(Debug, Clone)]
pub struct PageResult<R> {
    pub items: Vec<R>,
    pub total: usize,
}
