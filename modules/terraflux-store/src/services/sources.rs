use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use terraflux_common::{DataSource, DataSourceKind, TerrafluxError, UpdateFrequency};

use crate::filter::FilterConfig;
use crate::record::{Page, PageResult};
use crate::store::{next_updated_at, Store};

use super::{finish_validation, paginate_filtered, require_non_empty};

#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceDraft {
    pub name: String,
    pub provider: String,
    pub kind: String,
    #[serde(default)]
    pub requires_auth: bool,
    pub update_frequency: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DataSourcePatch {
    pub name: Option<String>,
    pub provider: Option<String>,
    pub kind: Option<String>,
    pub requires_auth: Option<bool>,
    pub update_frequency: Option<String>,
    pub active: Option<bool>,
    pub url: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DataSourceStats {
    pub total: usize,
    pub active: usize,
    pub requiring_auth: usize,
    pub by_provider: BTreeMap<String, usize>,
}

fn validate_record(record: &DataSource) -> Vec<String> {
    let mut violations = Vec::new();
    require_non_empty(&mut violations, "name", &record.name);
    require_non_empty(&mut violations, "provider", &record.provider);
    if let Some(u) = &record.url {
        if url::Url::parse(u).is_err() {
            violations.push(format!("url '{u}' is not a valid URL"));
        }
    }
    violations
}

#[derive(Clone)]
pub struct DataSourceService {
    store: Arc<Store>,
}

impl DataSourceService {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, draft: DataSourceDraft) -> Result<DataSource, TerrafluxError> {
        let mut violations = Vec::new();
        let kind = match DataSourceKind::from_str_loose(&draft.kind) {
            Some(k) => k,
            None => {
                violations.push(format!("kind '{}' is not a recognized source kind", draft.kind));
                DataSourceKind::Satellite
            }
        };
        let update_frequency = match UpdateFrequency::from_str_loose(&draft.update_frequency) {
            Some(f) => f,
            None => {
                violations.push(format!(
                    "update_frequency '{}' is not a recognized frequency",
                    draft.update_frequency
                ));
                UpdateFrequency::Daily
            }
        };

        let now = Utc::now();
        let record = DataSource {
            id: Uuid::new_v4(),
            name: draft.name,
            provider: draft.provider,
            kind,
            requires_auth: draft.requires_auth,
            update_frequency,
            active: draft.active,
            url: draft.url,
            description: draft.description,
            created_at: now,
            updated_at: now,
        };
        violations.extend(validate_record(&record));
        finish_validation(violations)?;

        self.store.sources.insert(record.clone()).await;
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<DataSource, TerrafluxError> {
        self.store.sources.get(id).await
    }

    pub async fn update(
        &self,
        id: Uuid,
        patch: DataSourcePatch,
    ) -> Result<DataSource, TerrafluxError> {
        let mut record = self.store.sources.get(id).await?;
        let mut violations = Vec::new();

        if let Some(name) = patch.name {
            record.name = name;
        }
        if let Some(provider) = patch.provider {
            record.provider = provider;
        }
        if let Some(kind) = patch.kind {
            match DataSourceKind::from_str_loose(&kind) {
                Some(k) => record.kind = k,
                None => violations.push(format!("kind '{kind}' is not a recognized source kind")),
            }
        }
        if let Some(requires_auth) = patch.requires_auth {
            record.requires_auth = requires_auth;
        }
        if let Some(frequency) = patch.update_frequency {
            match UpdateFrequency::from_str_loose(&frequency) {
                Some(f) => record.update_frequency = f,
                None => violations.push(format!(
                    "update_frequency '{frequency}' is not a recognized frequency"
                )),
            }
        }
        if let Some(active) = patch.active {
            record.active = active;
        }
        if let Some(u) = patch.url {
            record.url = Some(u);
        }
        if let Some(d) = patch.description {
            record.description = Some(d);
        }

        violations.extend(validate_record(&record));
        finish_validation(violations)?;

        record.updated_at = next_updated_at(record.updated_at);
        self.store.sources.replace(record.clone()).await?;
        Ok(record)
    }

    pub async fn delete(&self, id: Uuid) -> Result<DataSource, TerrafluxError> {
        self.store.sources.remove(id).await
    }

    pub async fn list(
        &self,
        filter: FilterConfig,
        page: Page,
    ) -> Result<PageResult<DataSource>, TerrafluxError> {
        self.store.sources.list(filter, page).await
    }

    pub async fn by_provider(
        &self,
        provider: &str,
        page: Page,
    ) -> Result<PageResult<DataSource>, TerrafluxError> {
        let snapshot = self.store.sources.snapshot().await;
        Ok(paginate_filtered(snapshot, page, |r| r.provider == provider))
    }

    pub async fn by_kind(
        &self,
        kind: DataSourceKind,
        page: Page,
    ) -> Result<PageResult<DataSource>, TerrafluxError> {
        self.list(
            FilterConfig::builder().kind(kind.to_string()).build(),
            page,
        )
        .await
    }

    pub async fn active(&self, page: Page) -> Result<PageResult<DataSource>, TerrafluxError> {
        let snapshot = self.store.sources.snapshot().await;
        Ok(paginate_filtered(snapshot, page, |r| r.active))
    }

    pub async fn by_auth(
        &self,
        requires_auth: bool,
        page: Page,
    ) -> Result<PageResult<DataSource>, TerrafluxError> {
        let snapshot = self.store.sources.snapshot().await;
        Ok(paginate_filtered(snapshot, page, |r| {
            r.requires_auth == requires_auth
        }))
    }

    pub async fn by_frequency(
        &self,
        frequency: UpdateFrequency,
        page: Page,
    ) -> Result<PageResult<DataSource>, TerrafluxError> {
        let snapshot = self.store.sources.snapshot().await;
        Ok(paginate_filtered(snapshot, page, |r| {
            r.update_frequency == frequency
        }))
    }

    pub async fn search(
        &self,
        term: &str,
        page: Page,
    ) -> Result<PageResult<DataSource>, TerrafluxError> {
        self.list(FilterConfig::builder().search(term).build(), page)
            .await
    }

    pub async fn statistics(&self) -> DataSourceStats {
        let records = self.store.sources.snapshot().await;
        let mut by_provider: BTreeMap<String, usize> = BTreeMap::new();
        for r in &records {
            *by_provider.entry(r.provider.clone()).or_default() += 1;
        }
        DataSourceStats {
            total: records.len(),
            active: records.iter().filter(|r| r.active).count(),
            requiring_auth: records.iter().filter(|r| r.requires_auth).count(),
            by_provider,
        }
    }
}
