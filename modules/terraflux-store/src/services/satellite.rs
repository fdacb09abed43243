use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use terraflux_common::{SatelliteReading, TerrafluxError};

use crate::filter::{DateRange, FilterConfig};
use crate::geo::{find_near, in_cell, latest_in_cell, GeoQuery};
use crate::rank::{summary, MetricSummary};
use crate::record::{Page, PageResult};
use crate::store::{next_updated_at, Store};

use super::{finish_validation, require_finite, require_grid_cell, require_non_empty, require_unit_interval};

#[derive(Debug, Clone, Deserialize)]
pub struct ReadingDraft {
    pub grid_cell_id: String,
    pub satellite_id: String,
    pub observed_at: DateTime<Utc>,
    #[serde(default)]
    pub co2_ppm: Option<f64>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub biomass_index: Option<f64>,
    #[serde(default)]
    pub data_quality: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadingPatch {
    pub grid_cell_id: Option<String>,
    pub satellite_id: Option<String>,
    pub observed_at: Option<DateTime<Utc>>,
    pub co2_ppm: Option<f64>,
    pub temperature_c: Option<f64>,
    pub biomass_index: Option<f64>,
    pub data_quality: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct SatelliteStats {
    pub total: usize,
    pub co2_ppm: MetricSummary,
    pub temperature_c: MetricSummary,
    pub biomass_index: MetricSummary,
    pub data_quality: MetricSummary,
}

fn validate_record(record: &SatelliteReading) -> Vec<String> {
    let mut violations = Vec::new();
    require_grid_cell(&mut violations, "grid_cell_id", &record.grid_cell_id);
    require_non_empty(&mut violations, "satellite_id", &record.satellite_id);
    for (field, value) in [
        ("co2_ppm", record.co2_ppm),
        ("temperature_c", record.temperature_c),
        ("biomass_index", record.biomass_index),
    ] {
        if let Some(v) = value {
            require_finite(&mut violations, field, v);
        }
    }
    if let Some(q) = record.data_quality {
        require_unit_interval(&mut violations, "data_quality", q);
    }
    violations
}

#[derive(Clone)]
pub struct SatelliteService {
    store: Arc<Store>,
}

impl SatelliteService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, draft: ReadingDraft) -> Result<SatelliteReading, TerrafluxError> {
        let now = Utc::now();
        let record = SatelliteReading {
            id: Uuid::new_v4(),
            grid_cell_id: draft.grid_cell_id,
            satellite_id: draft.satellite_id,
            observed_at: draft.observed_at,
            co2_ppm: draft.co2_ppm,
            temperature_c: draft.temperature_c,
            biomass_index: draft.biomass_index,
            data_quality: draft.data_quality,
            created_at: now,
            updated_at: now,
        };
        finish_validation(validate_record(&record))?;
        self.store.readings.insert(record.clone()).await;
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<SatelliteReading, TerrafluxError> {
        self.store.readings.get(id).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        patch: ReadingPatch,
    ) -> Result<SatelliteReading, TerrafluxError> {
        let mut record = self.store.readings.get(id).await?;

        if let Some(cell) = patch.grid_cell_id {
            record.grid_cell_id = cell;
        }
        if let Some(sat) = patch.satellite_id {
            record.satellite_id = sat;
        }
        if let Some(at) = patch.observed_at {
            record.observed_at = at;
        }
        if let Some(v) = patch.co2_ppm {
            record.co2_ppm = Some(v);
        }
        if let Some(v) = patch.temperature_c {
            record.temperature_c = Some(v);
        }
        if let Some(v) = patch.biomass_index {
            record.biomass_index = Some(v);
        }
        if let Some(v) = patch.data_quality {
            record.data_quality = Some(v);
        }

        finish_validation(validate_record(&record))?;
        record.updated_at = next_updated_at(record.updated_at);
        self.store.readings.replace(record.clone()).await?;
        Ok(record)
    }

    pub async fn delete(&self, id: Uuid) -> Result<SatelliteReading, TerrafluxError> {
        self.store.readings.remove(id).await
    }

    pub async fn list(
        &self,
        filter: FilterConfig,
        page: Page,
    ) -> Result<PageResult<SatelliteReading>, TerrafluxError> {
        self.store.readings.list(filter, page).await
    }

    pub async fn by_grid_cell(
        &self,
        grid_cell_id: &str,
        range: Option<DateRange>,
        page: Page,
    ) -> Result<PageResult<SatelliteReading>, TerrafluxError> {
        let builder = FilterConfig::builder().grid_cell(grid_cell_id);
        let filter = match range {
            Some(r) => builder.date_range(r).build(),
            None => builder.build(),
        };
        self.list(filter, page).await
    }

    pub async fn by_satellite(
        &self,
        satellite_id: &str,
        page: Page,
    ) -> Result<PageResult<SatelliteReading>, TerrafluxError> {
        self.list(
            FilterConfig::builder().reference(satellite_id).build(),
            page,
        )
        .await
    }

    pub async fn time_range(
        &self,
        range: DateRange,
        page: Page,
    ) -> Result<PageResult<SatelliteReading>, TerrafluxError> {
        self.list(FilterConfig::builder().date_range(range).build(), page)
            .await
    }

    /// Point-in-space lookup: radius queries come back nearest first, exact
    /// cell queries in store order.
    pub async fn locate(&self, query: GeoQuery) -> Result<Vec<SatelliteReading>, TerrafluxError> {
        let records = self.store.readings.snapshot().await;
        match query {
            GeoQuery::Near {
                lat,
                lon,
                radius_km,
            } => Ok(find_near(&records, lat, lon, radius_km)?
                .into_iter()
                .map(|n| n.record)
                .collect()),
            GeoQuery::Cell { grid_cell_id } => Ok(in_cell(&records, &grid_cell_id)),
        }
    }

    /// Most recent reading for a cell, or None when the cell has none.
    pub async fn latest(&self, grid_cell_id: &str) -> Option<SatelliteReading> {
        let records = self.store.readings.snapshot().await;
        latest_in_cell(&records, grid_cell_id)
    }

    pub async fn statistics(&self) -> SatelliteStats {
        let records = self.store.readings.snapshot().await;
        SatelliteStats {
            total: records.len(),
            co2_ppm: summary(&records, "co2_ppm"),
            temperature_c: summary(&records, "temperature_c"),
            biomass_index: summary(&records, "biomass_index"),
            data_quality: summary(&records, "data_quality"),
        }
    }
}
