pub mod impacts;
pub mod interventions;
pub mod optimizations;
pub mod satellite;
pub mod sources;

pub use impacts::{ImpactDraft, ImpactPatch, ImpactService, ImpactStats};
pub use interventions::{
    InterventionDraft, InterventionPatch, InterventionService, InterventionStats,
};
pub use optimizations::{
    OptimizationDraft, OptimizationPatch, OptimizationService, OptimizationStats,
};
pub use satellite::{ReadingDraft, ReadingPatch, SatelliteService, SatelliteStats};
pub use sources::{DataSourceDraft, DataSourcePatch, DataSourceService, DataSourceStats};

use terraflux_common::{is_valid_grid_cell, TerrafluxError};

use crate::record::{Page, PageResult, Queryable};

/// Page a snapshot by an ad-hoc predicate with the same ordering as `list`:
/// created_at descending, id ascending tie-break.
pub(crate) fn paginate_filtered<R, F>(mut records: Vec<R>, page: Page, keep: F) -> PageResult<R>
where
    R: Queryable,
    F: Fn(&R) -> bool,
{
    records.retain(|r| keep(r));
    records.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.id().cmp(&b.id()))
    });
    let total = records.len();
    let items = records
        .into_iter()
        .skip(page.offset)
        .take(page.limit)
        .collect();
    PageResult { items, total }
}

// --- Shared validation helpers ---

pub(crate) fn require_non_empty(violations: &mut Vec<String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        violations.push(format!("{field} must not be empty"));
    }
}

pub(crate) fn require_non_negative(violations: &mut Vec<String>, field: &str, value: f64) {
    if !value.is_finite() || value < 0.0 {
        violations.push(format!("{field} must be a non-negative number, got {value}"));
    }
}

/// Domain-bounded score fields (effectiveness, confidence, quality): 0–1.
pub(crate) fn require_unit_interval(violations: &mut Vec<String>, field: &str, value: f64) {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        violations.push(format!("{field} must be within [0, 1], got {value}"));
    }
}

pub(crate) fn require_finite(violations: &mut Vec<String>, field: &str, value: f64) {
    if !value.is_finite() {
        violations.push(format!("{field} must be a finite number"));
    }
}

pub(crate) fn require_grid_cell(violations: &mut Vec<String>, field: &str, value: &str) {
    if !is_valid_grid_cell(value) {
        violations.push(format!("{field} '{value}' is not a valid grid cell id"));
    }
}

/// Turn collected violations into a single ValidationError carrying all of
/// them, or pass.
pub(crate) fn finish_validation(violations: Vec<String>) -> Result<(), TerrafluxError> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(TerrafluxError::validation(violations))
    }
}
