use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use terraflux_common::{
    validate_coordinates, GeoPoint, Intervention, InterventionStatus, InterventionType,
    TerrafluxError,
};

use crate::filter::FilterConfig;
use crate::geo::{find_near, Nearby};
use crate::rank::{aggregate, summary, MetricSummary};
use crate::record::{Page, PageResult, Queryable};
use crate::store::{next_updated_at, Store};

use super::{finish_validation, require_non_empty, require_non_negative};

#[derive(Debug, Clone, Deserialize)]
pub struct InterventionDraft {
    pub name: String,
    pub kind: String,
    pub lat: f64,
    pub lon: f64,
    pub deployment_date: DateTime<Utc>,
    pub capacity_tonnes_co2: f64,
    #[serde(default)]
    pub status: Option<String>,
    pub operator: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterventionPatch {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub deployment_date: Option<DateTime<Utc>>,
    pub capacity_tonnes_co2: Option<f64>,
    pub status: Option<String>,
    pub operator: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InterventionStats {
    pub total: usize,
    pub total_capacity_tonnes_co2: f64,
    pub capacity_by_kind: BTreeMap<String, MetricSummary>,
}

fn validate_record(record: &Intervention) -> Vec<String> {
    let mut violations = Vec::new();
    require_non_empty(&mut violations, "name", &record.name);
    require_non_empty(&mut violations, "operator", &record.operator);
    require_non_negative(
        &mut violations,
        "capacity_tonnes_co2",
        record.capacity_tonnes_co2,
    );
    if let Err(e) = validate_coordinates(record.location.lat, record.location.lon) {
        violations.push(format!("location: {e}"));
    }
    violations
}

#[derive(Clone)]
pub struct InterventionService {
    store: Arc<Store>,
}

impl InterventionService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, draft: InterventionDraft) -> Result<Intervention, TerrafluxError> {
        let mut violations = Vec::new();
        let kind = match InterventionType::from_str_loose(&draft.kind) {
            Some(k) => k,
            None => {
                violations.push(format!(
                    "kind '{}' is not a recognized intervention type",
                    draft.kind
                ));
                InterventionType::Dac
            }
        };
        let status = match draft.status.as_deref() {
            None => InterventionStatus::Planned,
            Some(s) => match InterventionStatus::from_str_loose(s) {
                Some(st) => st,
                None => {
                    violations.push(format!("status '{s}' is not a recognized status"));
                    InterventionStatus::Planned
                }
            },
        };

        let now = Utc::now();
        let record = Intervention {
            id: Uuid::new_v4(),
            name: draft.name,
            kind,
            location: GeoPoint {
                lat: draft.lat,
                lon: draft.lon,
            },
            deployment_date: draft.deployment_date,
            capacity_tonnes_co2: draft.capacity_tonnes_co2,
            status,
            operator: draft.operator,
            description: draft.description,
            created_at: now,
            updated_at: now,
        };
        violations.extend(validate_record(&record));
        finish_validation(violations)?;

        self.store.interventions.insert(record.clone()).await;
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<Intervention, TerrafluxError> {
        self.store.interventions.get(id).await
    }

    /// Merge only supplied fields, re-validate the merged record, and
    /// strictly advance `updated_at`.
    pub async fn update(
        &self,
        id: Uuid,
        patch: InterventionPatch,
    ) -> Result<Intervention, TerrafluxError> {
        let mut record = self.store.interventions.get(id).await?;
        let mut violations = Vec::new();

        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(kind) = patch.kind {
            match InterventionType::from_str_loose(&kind) {
                Some(k) => record.kind = k,
                None => {
                    violations.push(format!("kind '{kind}' is not a recognized intervention type"))
                }
            }
        }
        if let Some(lat) = patch.lat {
            record.location.lat = lat;
        }
        if let Some(lon) = patch.lon {
            record.location.lon = lon;
        }
        if let Some(date) = patch.deployment_date {
            record.deployment_date = date;
        }
        if let Some(capacity) = patch.capacity_tonnes_co2 {
            record.capacity_tonnes_co2 = capacity;
        }
        if let Some(status) = patch.status {
            // Any value-to-value transition is legal; only the value domain is checked.
            match InterventionStatus::from_str_loose(&status) {
                Some(s) => record.status = s,
                None => violations.push(format!("status '{status}' is not a recognized status")),
            }
        }
        if let Some(operator) = patch.operator {
            record.operator = operator;
        }
        if let Some(description) = patch.description {
            record.description = Some(description);
        }

        violations.extend(validate_record(&record));
        finish_validation(violations)?;

        record.updated_at = next_updated_at(record.updated_at);
        self.store.interventions.replace(record.clone()).await?;
        Ok(record)
    }

    pub async fn delete(&self, id: Uuid) -> Result<Intervention, TerrafluxError> {
        self.store.delete_intervention(id).await
    }

    pub async fn list(
        &self,
        filter: FilterConfig,
        page: Page,
    ) -> Result<PageResult<Intervention>, TerrafluxError> {
        self.store.interventions.list(filter, page).await
    }

    pub async fn by_operator(
        &self,
        operator: &str,
        page: Page,
    ) -> Result<PageResult<Intervention>, TerrafluxError> {
        self.list(FilterConfig::builder().reference(operator).build(), page)
            .await
    }

    pub async fn by_kind(
        &self,
        kind: InterventionType,
        page: Page,
    ) -> Result<PageResult<Intervention>, TerrafluxError> {
        self.list(
            FilterConfig::builder().kind(kind.to_string()).build(),
            page,
        )
        .await
    }

    pub async fn by_status(
        &self,
        status: InterventionStatus,
        page: Page,
    ) -> Result<PageResult<Intervention>, TerrafluxError> {
        self.list(
            FilterConfig::builder().status(status.to_string()).build(),
            page,
        )
        .await
    }

    /// Interventions within `radius_km` of a point, nearest first.
    pub async fn near(
        &self,
        lat: f64,
        lon: f64,
        radius_km: Option<f64>,
    ) -> Result<Vec<Nearby<Intervention>>, TerrafluxError> {
        let records = self.store.interventions.snapshot().await;
        find_near(&records, lat, lon, radius_km)
    }

    /// Total CO2 removal capacity across all interventions.
    pub async fn total_capacity(&self) -> f64 {
        let records = self.store.interventions.snapshot().await;
        summary(&records, "capacity_tonnes_co2").sum
    }

    pub async fn capacity_by_kind(&self) -> BTreeMap<String, MetricSummary> {
        let records = self.store.interventions.snapshot().await;
        aggregate(&records, |r| r.kind_key(), "capacity_tonnes_co2")
    }

    pub async fn statistics(&self) -> InterventionStats {
        let records = self.store.interventions.snapshot().await;
        let capacity = summary(&records, "capacity_tonnes_co2");
        InterventionStats {
            total: records.len(),
            total_capacity_tonnes_co2: capacity.sum,
            capacity_by_kind: aggregate(&records, |r| r.kind_key(), "capacity_tonnes_co2"),
        }
    }
}
