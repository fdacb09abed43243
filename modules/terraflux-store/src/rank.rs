use std::collections::BTreeMap;

use serde::Serialize;

use crate::record::Queryable;

/// Four-number summary over a metric. `count == 0` is the well-defined
/// "no data" value: sum is 0.0 and mean/min/max are None.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummary {
    pub count: u64,
    pub sum: f64,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl MetricSummary {
    pub fn empty() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            mean: None,
            min: None,
            max: None,
        }
    }

    fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::empty();
        }
        let sum: f64 = values.iter().sum();
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Self {
            count: values.len() as u64,
            sum,
            mean: Some(sum / values.len() as f64),
            min: Some(min),
            max: Some(max),
        }
    }
}

fn finite_metric<R: Queryable>(record: &R, metric: &str) -> Option<f64> {
    record.metric(metric).filter(|v| v.is_finite())
}

/// The `n` records with the largest `metric`, descending; ties broken by id
/// ascending for determinism. Records missing the metric are excluded, not
/// treated as zero. `n` larger than the input yields everything ranked.
pub fn top_n<R: Queryable>(records: &[R], metric: &str, n: usize) -> Vec<R> {
    if n == 0 {
        return Vec::new();
    }
    let mut ranked: Vec<(f64, R)> = records
        .iter()
        .filter_map(|r| finite_metric(r, metric).map(|v| (v, r.clone())))
        .collect();
    ranked.sort_by(|(va, a), (vb, b)| vb.total_cmp(va).then_with(|| a.id().cmp(&b.id())));
    ranked.truncate(n);
    ranked.into_iter().map(|(_, r)| r).collect()
}

/// Per-group summaries over `metric`, keyed by `group_key`. Records where
/// the metric or the key is absent contribute nothing; groups with no
/// contributing records are omitted. BTreeMap keeps group order stable.
pub fn aggregate<R, K>(records: &[R], group_key: K, metric: &str) -> BTreeMap<String, MetricSummary>
where
    R: Queryable,
    K: Fn(&R) -> Option<String>,
{
    let mut buckets: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for record in records {
        let (Some(key), Some(value)) = (group_key(record), finite_metric(record, metric)) else {
            continue;
        };
        buckets.entry(key).or_default().push(value);
    }
    buckets
        .into_iter()
        .map(|(key, values)| (key, MetricSummary::from_values(&values)))
        .collect()
}

/// Whole-set summary, no grouping. Empty input is a "no data" summary, not
/// a failure.
pub fn summary<R: Queryable>(records: &[R], metric: &str) -> MetricSummary {
    let values: Vec<f64> = records
        .iter()
        .filter_map(|r| finite_metric(r, metric))
        .collect();
    MetricSummary::from_values(&values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use terraflux_common::ImpactReport;
    use uuid::Uuid;

    fn report(id: Uuid, score: f64) -> ImpactReport {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap();
        ImpactReport {
            id,
            intervention_id: Uuid::new_v4(),
            grid_cell_id: "gcpvj".to_string(),
            effectiveness_score: score,
            confidence_level: None,
            temperature_change_c: None,
            co2_change_ppm: None,
            observed_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    fn uuid(n: u8) -> Uuid {
        Uuid::from_bytes([n; 16])
    }

    #[test]
    fn top_n_breaks_ties_by_id_ascending() {
        // ids a..e with metric values [10, 30, 20, 30, 5]; b and d tie at 30.
        let a = report(uuid(1), 10.0);
        let b = report(uuid(2), 30.0);
        let c = report(uuid(3), 20.0);
        let d = report(uuid(4), 30.0);
        let e = report(uuid(5), 5.0);
        let records = vec![a, b.clone(), c.clone(), d.clone(), e];

        let top = top_n(&records, "effectiveness_score", 3);
        let ids: Vec<Uuid> = top.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![b.id, d.id, c.id]);
    }

    #[test]
    fn top_n_zero_is_empty() {
        let records = vec![report(uuid(1), 1.0)];
        assert!(top_n(&records, "effectiveness_score", 0).is_empty());
    }

    #[test]
    fn top_n_larger_than_input_returns_all() {
        let records = vec![report(uuid(1), 1.0), report(uuid(2), 2.0)];
        assert_eq!(top_n(&records, "effectiveness_score", 10).len(), 2);
    }

    #[test]
    fn top_n_excludes_missing_metric() {
        let mut with = report(uuid(1), 0.9);
        with.confidence_level = Some(0.7);
        let without = report(uuid(2), 0.95);
        let records = vec![with.clone(), without];

        let top = top_n(&records, "confidence_level", 5);
        assert_eq!(top.len(), 1, "record without the metric must be excluded");
        assert_eq!(top[0].id, with.id);
    }

    #[test]
    fn aggregate_empty_input_is_empty_map() {
        let records: Vec<ImpactReport> = Vec::new();
        let groups = aggregate(&records, |r| Some(r.grid_cell_id.clone()), "effectiveness_score");
        assert!(groups.is_empty());
    }

    #[test]
    fn aggregate_omits_groups_with_no_metric() {
        let mut no_metric = report(uuid(1), 0.5);
        no_metric.grid_cell_id = "u4pru".to_string();
        let records = vec![report(uuid(2), 0.5), no_metric];
        let groups = aggregate(&records, |r| Some(r.grid_cell_id.clone()), "confidence_level");
        // Neither record carries confidence_level, so no group appears.
        assert!(groups.is_empty());
    }

    #[test]
    fn aggregate_computes_four_number_summary() {
        let mut r1 = report(uuid(1), 0.2);
        let mut r2 = report(uuid(2), 0.8);
        r1.grid_cell_id = "gcpvj".to_string();
        r2.grid_cell_id = "gcpvj".to_string();
        let groups = aggregate(
            &[r1, r2],
            |r| Some(r.grid_cell_id.clone()),
            "effectiveness_score",
        );
        let s = &groups["gcpvj"];
        assert_eq!(s.count, 2);
        assert!((s.sum - 1.0).abs() < 1e-9);
        assert_eq!(s.mean, Some(0.5));
        assert_eq!(s.min, Some(0.2));
        assert_eq!(s.max, Some(0.8));
    }

    #[test]
    fn summary_of_empty_is_no_data_not_error() {
        let records: Vec<ImpactReport> = Vec::new();
        let s = summary(&records, "effectiveness_score");
        assert_eq!(s.count, 0);
        assert_eq!(s.sum, 0.0);
        assert_eq!(s.mean, None);
        assert_eq!(s.min, None);
        assert_eq!(s.max, None);
    }
}
