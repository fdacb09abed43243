use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use terraflux_common::{
    DataSource, ImpactReport, Intervention, OptimizationResult, SatelliteReading, TerrafluxError,
};

use crate::filter::FilterConfig;
use crate::record::{Page, PageResult, Queryable};

/// One record collection. Writers are serialized through the lock; readers
/// work on snapshots, so reads never block reads.
pub struct Collection<R> {
    inner: RwLock<HashMap<Uuid, R>>,
}

impl<R: Queryable> Default for Collection<R> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<R: Queryable> Collection<R> {
    pub async fn insert(&self, record: R) {
        self.inner.write().await.insert(record.id(), record);
    }

    pub async fn get(&self, id: Uuid) -> Result<R, TerrafluxError> {
        self.inner
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| TerrafluxError::not_found(R::KIND, id))
    }

    /// Replace an existing record wholesale (update path). Fails if the id
    /// was deleted since it was read.
    pub async fn replace(&self, record: R) -> Result<(), TerrafluxError> {
        let mut guard = self.inner.write().await;
        let id = record.id();
        if !guard.contains_key(&id) {
            return Err(TerrafluxError::not_found(R::KIND, id));
        }
        guard.insert(id, record);
        Ok(())
    }

    /// Remove by id. A second delete of the same id is a detectable failure,
    /// not a silent success.
    pub async fn remove(&self, id: Uuid) -> Result<R, TerrafluxError> {
        self.inner
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| TerrafluxError::not_found(R::KIND, id))
    }

    /// Stable snapshot in store order: created_at ascending, id tie-break.
    pub async fn snapshot(&self) -> Vec<R> {
        let mut records: Vec<R> = self.inner.read().await.values().cloned().collect();
        records.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        records
    }

    /// Filter + stable sort (created_at descending, id ascending tie-break)
    /// + offset/limit. Returns the page and the total match count.
    pub async fn list(
        &self,
        filter: FilterConfig,
        page: Page,
    ) -> Result<PageResult<R>, TerrafluxError> {
        let compiled = filter.compile()?;
        let mut matches: Vec<R> = self
            .inner
            .read()
            .await
            .values()
            .filter(|r| compiled.matches(*r))
            .cloned()
            .collect();
        matches.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        let total = matches.len();
        let items: Vec<R> = matches
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();
        Ok(PageResult { items, total })
    }
}

/// The shared record store: one collection per resource kind. Cross-kind
/// rules (impact reports cannot outlive their intervention) live here.
#[derive(Default)]
pub struct Store {
    pub interventions: Collection<Intervention>,
    pub readings: Collection<SatelliteReading>,
    pub impacts: Collection<ImpactReport>,
    pub optimizations: Collection<OptimizationResult>,
    pub sources: Collection<DataSource>,
}

impl Store {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn intervention_exists(&self, id: Uuid) -> bool {
        self.interventions.get(id).await.is_ok()
    }

    /// Delete an intervention under the restrict policy: rejected while any
    /// impact report still references it.
    pub async fn delete_intervention(&self, id: Uuid) -> Result<Intervention, TerrafluxError> {
        let referencing = self
            .impacts
            .snapshot()
            .await
            .iter()
            .filter(|r| r.intervention_id == id)
            .count();
        if referencing > 0 {
            debug!(%id, referencing, "intervention delete restricted by live impact reports");
            return Err(TerrafluxError::Conflict(format!(
                "intervention {id} still has {referencing} impact report(s); delete them first"
            )));
        }
        self.interventions.remove(id).await
    }
}

/// Timestamp for a mutation. `updated_at` must move strictly forward even
/// when the clock reads at or before the previous stamp.
pub fn next_updated_at(prev: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > prev {
        now
    } else {
        prev + Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use terraflux_common::{GeoPoint, InterventionStatus, InterventionType};

    fn intervention(id: Uuid) -> Intervention {
        let now = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
        Intervention {
            id,
            name: "Orca".to_string(),
            kind: InterventionType::Dac,
            location: GeoPoint {
                lat: 64.05,
                lon: -21.41,
            },
            deployment_date: now,
            capacity_tonnes_co2: 4000.0,
            status: InterventionStatus::Active,
            operator: "climeworks".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn double_delete_is_detectable() {
        let store = Store::new();
        let id = Uuid::new_v4();
        store.interventions.insert(intervention(id)).await;

        assert!(store.delete_intervention(id).await.is_ok());
        let err = store.delete_intervention(id).await.unwrap_err();
        assert!(matches!(err, TerrafluxError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_restricted_while_impacts_reference() {
        let store = Store::new();
        let id = Uuid::new_v4();
        store.interventions.insert(intervention(id)).await;

        let now = Utc::now();
        store
            .impacts
            .insert(ImpactReport {
                id: Uuid::new_v4(),
                intervention_id: id,
                grid_cell_id: "gcpvj".to_string(),
                effectiveness_score: 0.7,
                confidence_level: None,
                temperature_change_c: None,
                co2_change_ppm: None,
                observed_at: now,
                created_at: now,
                updated_at: now,
            })
            .await;

        let err = store.delete_intervention(id).await.unwrap_err();
        assert!(matches!(err, TerrafluxError::Conflict(_)));
        // The intervention is still there.
        assert!(store.intervention_exists(id).await);
    }

    #[test]
    fn updated_at_always_advances() {
        let future = Utc::now() + Duration::days(1);
        let next = next_updated_at(future);
        assert!(next > future);
    }
}
