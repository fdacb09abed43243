use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use terraflux_common::{OptimizationResult, OptimizationStatus, TerrafluxError};

use crate::filter::FilterConfig;
use crate::rank::{aggregate, summary, top_n, MetricSummary};
use crate::record::{Page, PageResult};
use crate::store::{next_updated_at, Store};

use super::{
    finish_validation, paginate_filtered, require_grid_cell, require_non_empty,
    require_non_negative,
};

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizationDraft {
    pub operator: String,
    pub grid_cell_id: String,
    pub algorithm: String,
    #[serde(default)]
    pub status: Option<String>,
    pub score: f64,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub iterations: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptimizationPatch {
    pub operator: Option<String>,
    pub grid_cell_id: Option<String>,
    pub algorithm: Option<String>,
    pub status: Option<String>,
    pub score: Option<f64>,
    pub objective: Option<String>,
    pub iterations: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct OptimizationStats {
    pub total: usize,
    pub score: MetricSummary,
    pub score_by_algorithm: BTreeMap<String, MetricSummary>,
}

fn validate_record(record: &OptimizationResult) -> Vec<String> {
    let mut violations = Vec::new();
    require_non_empty(&mut violations, "operator", &record.operator);
    require_non_empty(&mut violations, "algorithm", &record.algorithm);
    require_grid_cell(&mut violations, "grid_cell_id", &record.grid_cell_id);
    require_non_negative(&mut violations, "score", record.score);
    violations
}

#[derive(Clone)]
pub struct OptimizationService {
    store: Arc<Store>,
}

impl OptimizationService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn create(
        &self,
        draft: OptimizationDraft,
    ) -> Result<OptimizationResult, TerrafluxError> {
        let mut violations = Vec::new();
        let status = match draft.status.as_deref() {
            None => OptimizationStatus::Completed,
            Some(s) => match OptimizationStatus::from_str_loose(s) {
                Some(st) => st,
                None => {
                    violations.push(format!("status '{s}' is not a recognized status"));
                    OptimizationStatus::Completed
                }
            },
        };

        let now = Utc::now();
        let record = OptimizationResult {
            id: Uuid::new_v4(),
            operator: draft.operator,
            grid_cell_id: draft.grid_cell_id,
            algorithm: draft.algorithm,
            status,
            score: draft.score,
            objective: draft.objective,
            iterations: draft.iterations,
            created_at: now,
            updated_at: now,
        };
        violations.extend(validate_record(&record));
        finish_validation(violations)?;

        self.store.optimizations.insert(record.clone()).await;
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<OptimizationResult, TerrafluxError> {
        self.store.optimizations.get(id).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        patch: OptimizationPatch,
    ) -> Result<OptimizationResult, TerrafluxError> {
        let mut record = self.store.optimizations.get(id).await?;
        let mut violations = Vec::new();

        if let Some(operator) = patch.operator {
            record.operator = operator;
        }
        if let Some(cell) = patch.grid_cell_id {
            record.grid_cell_id = cell;
        }
        if let Some(algorithm) = patch.algorithm {
            record.algorithm = algorithm;
        }
        if let Some(status) = patch.status {
            match OptimizationStatus::from_str_loose(&status) {
                Some(s) => record.status = s,
                None => violations.push(format!("status '{status}' is not a recognized status")),
            }
        }
        if let Some(score) = patch.score {
            record.score = score;
        }
        if let Some(objective) = patch.objective {
            record.objective = Some(objective);
        }
        if let Some(iterations) = patch.iterations {
            record.iterations = Some(iterations);
        }

        violations.extend(validate_record(&record));
        finish_validation(violations)?;

        record.updated_at = next_updated_at(record.updated_at);
        self.store.optimizations.replace(record.clone()).await?;
        Ok(record)
    }

    pub async fn delete(&self, id: Uuid) -> Result<OptimizationResult, TerrafluxError> {
        self.store.optimizations.remove(id).await
    }

    pub async fn list(
        &self,
        filter: FilterConfig,
        page: Page,
    ) -> Result<PageResult<OptimizationResult>, TerrafluxError> {
        self.store.optimizations.list(filter, page).await
    }

    pub async fn by_operator(
        &self,
        operator: &str,
        page: Page,
    ) -> Result<PageResult<OptimizationResult>, TerrafluxError> {
        self.list(FilterConfig::builder().reference(operator).build(), page)
            .await
    }

    pub async fn by_grid_cell(
        &self,
        grid_cell_id: &str,
        page: Page,
    ) -> Result<PageResult<OptimizationResult>, TerrafluxError> {
        self.list(FilterConfig::builder().grid_cell(grid_cell_id).build(), page)
            .await
    }

    pub async fn by_algorithm(
        &self,
        algorithm: &str,
        page: Page,
    ) -> Result<PageResult<OptimizationResult>, TerrafluxError> {
        let snapshot = self.store.optimizations.snapshot().await;
        Ok(paginate_filtered(snapshot, page, |r| {
            r.algorithm == algorithm
        }))
    }

    pub async fn by_status(
        &self,
        status: OptimizationStatus,
        page: Page,
    ) -> Result<PageResult<OptimizationResult>, TerrafluxError> {
        self.list(
            FilterConfig::builder().status(status.to_string()).build(),
            page,
        )
        .await
    }

    /// The n results with the highest score.
    pub async fn best_performing(&self, n: usize) -> Vec<OptimizationResult> {
        let records = self.store.optimizations.snapshot().await;
        top_n(&records, "score", n)
    }

    pub async fn statistics(&self) -> OptimizationStats {
        let records = self.store.optimizations.snapshot().await;
        OptimizationStats {
            total: records.len(),
            score: summary(&records, "score"),
            score_by_algorithm: aggregate(&records, |r| Some(r.algorithm.clone()), "score"),
        }
    }
}
