//! End-to-end contract tests for the resource query services: CRUD
//! lifecycles, referential integrity, filtered listing, and pagination.

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use terraflux_common::{grid_cell_for, InterventionStatus, TerrafluxError};
use terraflux_store::{
    FilterConfig, ImpactDraft, ImpactPatch, ImpactService, InterventionDraft, InterventionPatch,
    InterventionService, Page, ReadingDraft, SatelliteService, Store,
};

fn intervention_draft(name: &str, kind: &str, capacity: f64) -> InterventionDraft {
    InterventionDraft {
        name: name.to_string(),
        kind: kind.to_string(),
        lat: 64.05,
        lon: -21.41,
        deployment_date: Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap(),
        capacity_tonnes_co2: capacity,
        status: Some("active".to_string()),
        operator: "climeworks".to_string(),
        description: None,
    }
}

fn impact_draft(intervention_id: Uuid, score: f64) -> ImpactDraft {
    ImpactDraft {
        intervention_id,
        grid_cell_id: grid_cell_for(64.05, -21.41).unwrap(),
        effectiveness_score: score,
        confidence_level: Some(0.9),
        temperature_change_c: None,
        co2_change_ppm: None,
        observed_at: Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn create_assigns_id_and_timestamps() {
    let store = Store::new();
    let svc = InterventionService::new(store);

    let created = svc
        .create(intervention_draft("Orca", "dac", 4000.0))
        .await
        .unwrap();
    assert_eq!(created.created_at, created.updated_at);

    let fetched = svc.get(created.id).await.unwrap();
    assert_eq!(fetched.name, "Orca");
}

#[tokio::test]
async fn create_reports_every_violation_at_once() {
    let store = Store::new();
    let svc = InterventionService::new(store);

    let mut draft = intervention_draft("", "warp_drive", -5.0);
    draft.lat = 95.0;
    let err = svc.create(draft).await.unwrap_err();

    let TerrafluxError::Validation { violations } = err else {
        panic!("expected validation error");
    };
    assert!(violations.iter().any(|v| v.contains("name")));
    assert!(violations.iter().any(|v| v.contains("kind")));
    assert!(violations.iter().any(|v| v.contains("capacity_tonnes_co2")));
    assert!(violations.iter().any(|v| v.contains("location")));
}

#[tokio::test]
async fn partial_update_touches_only_supplied_fields() {
    let store = Store::new();
    let svc = InterventionService::new(store);
    let created = svc
        .create(intervention_draft("Orca", "dac", 4000.0))
        .await
        .unwrap();

    let updated = svc
        .update(
            created.id,
            InterventionPatch {
                status: Some("completed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, InterventionStatus::Completed);
    // Omitted fields retain their prior values exactly.
    assert_eq!(updated.name, created.name);
    assert_eq!(updated.capacity_tonnes_co2, created.capacity_tonnes_co2);
    assert_eq!(updated.operator, created.operator);
    assert_eq!(updated.created_at, created.created_at);
    // updated_at advances strictly beyond its prior value.
    assert!(updated.updated_at > created.updated_at);
}

#[tokio::test]
async fn update_rejects_bad_values_and_leaves_record_intact() {
    let store = Store::new();
    let svc = InterventionService::new(store);
    let created = svc
        .create(intervention_draft("Orca", "dac", 4000.0))
        .await
        .unwrap();

    let err = svc
        .update(
            created.id,
            InterventionPatch {
                capacity_tonnes_co2: Some(-1.0),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TerrafluxError::Validation { .. }));

    let fetched = svc.get(created.id).await.unwrap();
    assert_eq!(fetched.capacity_tonnes_co2, 4000.0);
    assert_eq!(fetched.updated_at, created.updated_at);
}

#[tokio::test]
async fn update_missing_id_is_not_found() {
    let store = Store::new();
    let svc = InterventionService::new(store);
    let err = svc
        .update(Uuid::new_v4(), InterventionPatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TerrafluxError::NotFound { .. }));
}

#[tokio::test]
async fn double_delete_fails_second_time() {
    let store = Store::new();
    let svc = InterventionService::new(store);
    let created = svc
        .create(intervention_draft("Orca", "dac", 4000.0))
        .await
        .unwrap();

    svc.delete(created.id).await.unwrap();
    let err = svc.delete(created.id).await.unwrap_err();
    assert!(matches!(err, TerrafluxError::NotFound { .. }));
}

#[tokio::test]
async fn impact_requires_existing_intervention() {
    let store = Store::new();
    let impacts = ImpactService::new(store.clone());

    let err = impacts
        .create(impact_draft(Uuid::new_v4(), 0.85))
        .await
        .unwrap_err();
    let TerrafluxError::Validation { violations } = err else {
        panic!("expected validation error");
    };
    assert!(violations.iter().any(|v| v.contains("intervention_id")));
}

#[tokio::test]
async fn impact_with_valid_reference_is_retrievable() {
    let store = Store::new();
    let interventions = InterventionService::new(store.clone());
    let impacts = ImpactService::new(store);

    let parent = interventions
        .create(intervention_draft("Orca", "dac", 4000.0))
        .await
        .unwrap();
    let report = impacts.create(impact_draft(parent.id, 0.85)).await.unwrap();

    let fetched = impacts.get(report.id).await.unwrap();
    assert_eq!(fetched.effectiveness_score, 0.85);
    assert_eq!(fetched.intervention_id, parent.id);
}

#[tokio::test]
async fn deleting_intervention_with_reports_is_rejected() {
    let store = Store::new();
    let interventions = InterventionService::new(store.clone());
    let impacts = ImpactService::new(store);

    let parent = interventions
        .create(intervention_draft("Orca", "dac", 4000.0))
        .await
        .unwrap();
    let report = impacts.create(impact_draft(parent.id, 0.7)).await.unwrap();

    let err = interventions.delete(parent.id).await.unwrap_err();
    assert!(matches!(err, TerrafluxError::Conflict(_)));

    // Remove the report and the delete goes through.
    impacts.delete(report.id).await.unwrap();
    interventions.delete(parent.id).await.unwrap();
}

#[tokio::test]
async fn impact_update_rejects_dangling_reference() {
    let store = Store::new();
    let interventions = InterventionService::new(store.clone());
    let impacts = ImpactService::new(store);

    let parent = interventions
        .create(intervention_draft("Orca", "dac", 4000.0))
        .await
        .unwrap();
    let report = impacts.create(impact_draft(parent.id, 0.7)).await.unwrap();

    let err = impacts
        .update(
            report.id,
            ImpactPatch {
                intervention_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, TerrafluxError::Validation { .. }));
}

#[tokio::test]
async fn list_is_deterministic_and_paginates_with_total() {
    let store = Store::new();
    let svc = InterventionService::new(store);

    for i in 0..5 {
        svc.create(intervention_draft(&format!("site-{i}"), "biochar", 100.0))
            .await
            .unwrap();
    }
    svc.create(intervention_draft("dac-site", "dac", 500.0))
        .await
        .unwrap();

    let filter = FilterConfig::builder().kind("biochar").build();
    let page = Page::new(Some(1), Some(2));

    let first = svc.list(filter.clone(), page).await.unwrap();
    assert_eq!(first.total, 5, "total counts all matches, not the page");
    assert_eq!(first.items.len(), 2);

    // Same args against an unchanged store: identical page, identical order.
    let second = svc.list(filter, page).await.unwrap();
    let ids_a: Vec<Uuid> = first.items.iter().map(|r| r.id).collect();
    let ids_b: Vec<Uuid> = second.items.iter().map(|r| r.id).collect();
    assert_eq!(ids_a, ids_b);
}

#[tokio::test]
async fn filter_sugar_matches_single_dimension() {
    let store = Store::new();
    let svc = InterventionService::new(store);

    svc.create(intervention_draft("Orca", "dac", 4000.0))
        .await
        .unwrap();
    let mut cancelled = intervention_draft("Husavik", "biochar", 50.0);
    cancelled.status = Some("cancelled".to_string());
    cancelled.operator = "carbfix".to_string();
    svc.create(cancelled).await.unwrap();

    let by_status = svc
        .by_status(InterventionStatus::Cancelled, Page::default())
        .await
        .unwrap();
    assert_eq!(by_status.total, 1);
    assert_eq!(by_status.items[0].name, "Husavik");

    let by_operator = svc.by_operator("carbfix", Page::default()).await.unwrap();
    assert_eq!(by_operator.total, 1);

    let none = svc.by_operator("nobody", Page::default()).await.unwrap();
    assert_eq!(none.total, 0);
}

#[tokio::test]
async fn best_performing_and_statistics() {
    let store = Store::new();
    let interventions = InterventionService::new(store.clone());
    let impacts = ImpactService::new(store);

    let parent = interventions
        .create(intervention_draft("Orca", "dac", 4000.0))
        .await
        .unwrap();
    for score in [0.2, 0.9, 0.5] {
        impacts.create(impact_draft(parent.id, score)).await.unwrap();
    }

    let best = impacts.best_performing(2).await;
    assert_eq!(best.len(), 2);
    assert_eq!(best[0].effectiveness_score, 0.9);
    assert_eq!(best[1].effectiveness_score, 0.5);

    let stats = impacts.statistics().await;
    assert_eq!(stats.total, 3);
    assert_eq!(stats.effectiveness_score.count, 3);
    let mean = stats.effectiveness_score.mean.unwrap();
    assert!((mean - 0.5333).abs() < 0.001);
    assert_eq!(
        stats
            .effectiveness_by_intervention
            .get(&parent.id.to_string())
            .map(|s| s.count),
        Some(3)
    );
}

#[tokio::test]
async fn effectiveness_range_rejects_inverted_bounds() {
    let store = Store::new();
    let impacts = ImpactService::new(store);

    let err = impacts
        .effectiveness_range(Some(0.9), Some(0.1), Page::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TerrafluxError::InvalidFilter(_)));
}

#[tokio::test]
async fn satellite_latest_per_cell() {
    let store = Store::new();
    let svc = SatelliteService::new(store);
    let cell = grid_cell_for(40.7, -74.0).unwrap();

    let first = svc
        .create(ReadingDraft {
            grid_cell_id: cell.clone(),
            satellite_id: "sentinel-5p".to_string(),
            observed_at: Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap(),
            co2_ppm: Some(416.0),
            temperature_c: None,
            biomass_index: None,
            data_quality: Some(0.95),
        })
        .await
        .unwrap();
    let later = svc
        .create(ReadingDraft {
            grid_cell_id: cell.clone(),
            satellite_id: "oco-2".to_string(),
            observed_at: Utc.with_ymd_and_hms(2025, 3, 2, 6, 0, 0).unwrap(),
            co2_ppm: Some(417.5),
            temperature_c: None,
            biomass_index: None,
            data_quality: Some(0.9),
        })
        .await
        .unwrap();

    let latest = svc.latest(&cell).await.unwrap();
    assert_eq!(latest.id, later.id);
    assert_ne!(latest.id, first.id);

    assert!(svc.latest("u4pru").await.is_none());
}
