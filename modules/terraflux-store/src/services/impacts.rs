use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use terraflux_common::{ImpactReport, TerrafluxError};

use crate::filter::{FilterConfig, NumericRange};
use crate::rank::{aggregate, summary, top_n, MetricSummary};
use crate::record::{Page, PageResult};
use crate::store::{next_updated_at, Store};

use super::{
    finish_validation, paginate_filtered, require_finite, require_grid_cell, require_unit_interval,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ImpactDraft {
    pub intervention_id: Uuid,
    pub grid_cell_id: String,
    pub effectiveness_score: f64,
    #[serde(default)]
    pub confidence_level: Option<f64>,
    #[serde(default)]
    pub temperature_change_c: Option<f64>,
    #[serde(default)]
    pub co2_change_ppm: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImpactPatch {
    pub intervention_id: Option<Uuid>,
    pub grid_cell_id: Option<String>,
    pub effectiveness_score: Option<f64>,
    pub confidence_level: Option<f64>,
    pub temperature_change_c: Option<f64>,
    pub co2_change_ppm: Option<f64>,
    pub observed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ImpactStats {
    pub total: usize,
    pub effectiveness_score: MetricSummary,
    pub confidence_level: MetricSummary,
    pub effectiveness_by_intervention: BTreeMap<String, MetricSummary>,
}

fn validate_record(record: &ImpactReport) -> Vec<String> {
    let mut violations = Vec::new();
    require_grid_cell(&mut violations, "grid_cell_id", &record.grid_cell_id);
    require_unit_interval(
        &mut violations,
        "effectiveness_score",
        record.effectiveness_score,
    );
    if let Some(c) = record.confidence_level {
        require_unit_interval(&mut violations, "confidence_level", c);
    }
    for (field, value) in [
        ("temperature_change_c", record.temperature_change_c),
        ("co2_change_ppm", record.co2_change_ppm),
    ] {
        if let Some(v) = value {
            require_finite(&mut violations, field, v);
        }
    }
    violations
}

/// A report cannot exist without its intervention: the reference is checked
/// at write time, and intervention deletion is restricted while reports
/// remain (see `Store::delete_intervention`).
#[derive(Clone)]
pub struct ImpactService {
    store: Arc<Store>,
}

impl ImpactService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, draft: ImpactDraft) -> Result<ImpactReport, TerrafluxError> {
        let mut violations = Vec::new();
        if !self.store.intervention_exists(draft.intervention_id).await {
            violations.push(format!(
                "intervention_id {} does not reference an existing intervention",
                draft.intervention_id
            ));
        }

        let now = Utc::now();
        let record = ImpactReport {
            id: Uuid::new_v4(),
            intervention_id: draft.intervention_id,
            grid_cell_id: draft.grid_cell_id,
            effectiveness_score: draft.effectiveness_score,
            confidence_level: draft.confidence_level,
            temperature_change_c: draft.temperature_change_c,
            co2_change_ppm: draft.co2_change_ppm,
            observed_at: draft.observed_at,
            created_at: now,
            updated_at: now,
        };
        violations.extend(validate_record(&record));
        finish_validation(violations)?;

        self.store.impacts.insert(record.clone()).await;
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<ImpactReport, TerrafluxError> {
        self.store.impacts.get(id).await
    }

    pub async fn update(&self, id: Uuid, patch: ImpactPatch) -> Result<ImpactReport, TerrafluxError> {
        let mut record = self.store.impacts.get(id).await?;
        let mut violations = Vec::new();

        if let Some(intervention_id) = patch.intervention_id {
            if !self.store.intervention_exists(intervention_id).await {
                violations.push(format!(
                    "intervention_id {intervention_id} does not reference an existing intervention"
                ));
            }
            record.intervention_id = intervention_id;
        }
        if let Some(cell) = patch.grid_cell_id {
            record.grid_cell_id = cell;
        }
        if let Some(score) = patch.effectiveness_score {
            record.effectiveness_score = score;
        }
        if let Some(c) = patch.confidence_level {
            record.confidence_level = Some(c);
        }
        if let Some(t) = patch.temperature_change_c {
            record.temperature_change_c = Some(t);
        }
        if let Some(c) = patch.co2_change_ppm {
            record.co2_change_ppm = Some(c);
        }
        if let Some(at) = patch.observed_at {
            record.observed_at = at;
        }

        violations.extend(validate_record(&record));
        finish_validation(violations)?;

        record.updated_at = next_updated_at(record.updated_at);
        self.store.impacts.replace(record.clone()).await?;
        Ok(record)
    }

    pub async fn delete(&self, id: Uuid) -> Result<ImpactReport, TerrafluxError> {
        self.store.impacts.remove(id).await
    }

    pub async fn list(
        &self,
        filter: FilterConfig,
        page: Page,
    ) -> Result<PageResult<ImpactReport>, TerrafluxError> {
        self.store.impacts.list(filter, page).await
    }

    pub async fn by_intervention(
        &self,
        intervention_id: Uuid,
        page: Page,
    ) -> Result<PageResult<ImpactReport>, TerrafluxError> {
        let snapshot = self.store.impacts.snapshot().await;
        Ok(paginate_filtered(snapshot, page, |r| {
            r.intervention_id == intervention_id
        }))
    }

    pub async fn by_grid_cell(
        &self,
        grid_cell_id: &str,
        page: Page,
    ) -> Result<PageResult<ImpactReport>, TerrafluxError> {
        self.list(FilterConfig::builder().grid_cell(grid_cell_id).build(), page)
            .await
    }

    /// Reports whose effectiveness falls within [min, max] inclusive.
    /// An inverted range is an InvalidFilter, never silently corrected.
    pub async fn effectiveness_range(
        &self,
        min: Option<f64>,
        max: Option<f64>,
        page: Page,
    ) -> Result<PageResult<ImpactReport>, TerrafluxError> {
        let filter = FilterConfig::builder()
            .numeric_range(NumericRange {
                field: "effectiveness_score".to_string(),
                min,
                max,
            })
            .build();
        self.list(filter, page).await
    }

    /// The n reports with the highest effectiveness score.
    pub async fn best_performing(&self, n: usize) -> Vec<ImpactReport> {
        let records = self.store.impacts.snapshot().await;
        top_n(&records, "effectiveness_score", n)
    }

    pub async fn statistics(&self) -> ImpactStats {
        let records = self.store.impacts.snapshot().await;
        ImpactStats {
            total: records.len(),
            effectiveness_score: summary(&records, "effectiveness_score"),
            confidence_level: summary(&records, "confidence_level"),
            effectiveness_by_intervention: aggregate(
                &records,
                |r| Some(r.intervention_id.to_string()),
                "effectiveness_score",
            ),
        }
    }
}
