use chrono::{DateTime, Utc};
use typed_builder::TypedBuilder;

use terraflux_common::TerrafluxError;

use crate::record::Queryable;

/// Inclusive bounds over a record's canonical timestamp. Either end may be
/// open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Inclusive bounds over a named numeric field. Records missing the field
/// never match.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericRange {
    pub field: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Recognized filter options. Absent options never narrow the result;
/// populated options AND together.
#[derive(Debug, Clone, Default, TypedBuilder)]
pub struct FilterConfig {
    #[builder(default, setter(strip_option, into))]
    pub kind: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub status: Option<String>,
    /// Exact match on the record's external reference field (operator,
    /// satellite id).
    #[builder(default, setter(strip_option, into))]
    pub reference: Option<String>,
    #[builder(default, setter(strip_option, into))]
    pub grid_cell: Option<String>,
    #[builder(default, setter(strip_option))]
    pub date_range: Option<DateRange>,
    #[builder(default, setter(strip_option))]
    pub numeric_range: Option<NumericRange>,
    #[builder(default, setter(strip_option, into))]
    pub search: Option<String>,
}

impl FilterConfig {
    /// Validate ranges and lower-case the search term once. Malformed ranges
    /// are reported, never silently corrected.
    pub fn compile(self) -> Result<CompiledFilter, TerrafluxError> {
        if let Some(range) = &self.date_range {
            if let (Some(from), Some(to)) = (range.from, range.to) {
                if from > to {
                    return Err(TerrafluxError::InvalidFilter(format!(
                        "date range is inverted: from {from} > to {to}"
                    )));
                }
            }
        }
        if let Some(range) = &self.numeric_range {
            if range.field.trim().is_empty() {
                return Err(TerrafluxError::InvalidFilter(
                    "numeric range needs a field name".to_string(),
                ));
            }
            for bound in [range.min, range.max].into_iter().flatten() {
                if !bound.is_finite() {
                    return Err(TerrafluxError::InvalidFilter(format!(
                        "numeric range bound {bound} is not finite"
                    )));
                }
            }
            if let (Some(min), Some(max)) = (range.min, range.max) {
                if min > max {
                    return Err(TerrafluxError::InvalidFilter(format!(
                        "numeric range is inverted: min {min} > max {max}"
                    )));
                }
            }
        }
        let search_lower = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        Ok(CompiledFilter {
            config: self,
            search_lower,
        })
    }
}

/// A validated filter, applied as a pure predicate per record.
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    config: FilterConfig,
    search_lower: Option<String>,
}

impl CompiledFilter {
    pub fn matches<R: Queryable>(&self, record: &R) -> bool {
        let cfg = &self.config;

        if let Some(kind) = &cfg.kind {
            if record.kind_key().as_deref() != Some(kind.as_str()) {
                return false;
            }
        }
        if let Some(status) = &cfg.status {
            if record.status_key().as_deref() != Some(status.as_str()) {
                return false;
            }
        }
        if let Some(reference) = &cfg.reference {
            if record.reference_key() != Some(reference.as_str()) {
                return false;
            }
        }
        if let Some(cell) = &cfg.grid_cell {
            if record.grid_cell() != Some(cell.as_str()) {
                return false;
            }
        }
        if let Some(range) = &cfg.date_range {
            let ts = record.timestamp();
            if range.from.is_some_and(|from| ts < from) {
                return false;
            }
            if range.to.is_some_and(|to| ts > to) {
                return false;
            }
        }
        if let Some(range) = &cfg.numeric_range {
            let Some(value) = record.metric(&range.field) else {
                return false;
            };
            if range.min.is_some_and(|min| value < min) {
                return false;
            }
            if range.max.is_some_and(|max| value > max) {
                return false;
            }
        }
        if let Some(needle) = &self.search_lower {
            let hit = record
                .search_text()
                .iter()
                .any(|text| text.to_lowercase().contains(needle));
            if !hit {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use terraflux_common::{GeoPoint, Intervention, InterventionStatus, InterventionType};
    use uuid::Uuid;

    fn intervention(name: &str, kind: InterventionType, capacity: f64) -> Intervention {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        Intervention {
            id: Uuid::new_v4(),
            name: name.to_string(),
            kind,
            location: GeoPoint {
                lat: 64.1,
                lon: -21.9,
            },
            deployment_date: now,
            capacity_tonnes_co2: capacity,
            status: InterventionStatus::Active,
            operator: "climeworks".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = FilterConfig::default().compile().unwrap();
        let rec = intervention("Orca", InterventionType::Dac, 4000.0);
        assert!(filter.matches(&rec));
    }

    #[test]
    fn kind_filter_is_exact() {
        let filter = FilterConfig::builder().kind("dac").build().compile().unwrap();
        assert!(filter.matches(&intervention("Orca", InterventionType::Dac, 4000.0)));
        assert!(!filter.matches(&intervention("Grove", InterventionType::Reforestation, 10.0)));
    }

    #[test]
    fn options_combine_with_and() {
        let filter = FilterConfig::builder()
            .kind("dac")
            .status("active")
            .reference("climeworks")
            .build()
            .compile()
            .unwrap();
        assert!(filter.matches(&intervention("Orca", InterventionType::Dac, 4000.0)));

        let mut wrong_status = intervention("Orca", InterventionType::Dac, 4000.0);
        wrong_status.status = InterventionStatus::Cancelled;
        assert!(!filter.matches(&wrong_status));
    }

    #[test]
    fn numeric_range_excludes_missing_metric() {
        // "score" is not a field interventions carry, so nothing matches.
        let filter = FilterConfig::builder()
            .numeric_range(NumericRange {
                field: "score".to_string(),
                min: Some(0.0),
                max: None,
            })
            .build()
            .compile()
            .unwrap();
        assert!(!filter.matches(&intervention("Orca", InterventionType::Dac, 4000.0)));
    }

    #[test]
    fn numeric_range_bounds_are_inclusive() {
        let filter = FilterConfig::builder()
            .numeric_range(NumericRange {
                field: "capacity_tonnes_co2".to_string(),
                min: Some(4000.0),
                max: Some(4000.0),
            })
            .build()
            .compile()
            .unwrap();
        assert!(filter.matches(&intervention("Orca", InterventionType::Dac, 4000.0)));
        assert!(!filter.matches(&intervention("Mammoth", InterventionType::Dac, 36000.0)));
    }

    #[test]
    fn inverted_numeric_range_is_rejected() {
        let err = FilterConfig::builder()
            .numeric_range(NumericRange {
                field: "capacity_tonnes_co2".to_string(),
                min: Some(10.0),
                max: Some(1.0),
            })
            .build()
            .compile()
            .unwrap_err();
        assert!(matches!(err, TerrafluxError::InvalidFilter(_)));
    }

    #[test]
    fn inverted_date_range_is_rejected() {
        let from = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let err = FilterConfig::builder()
            .date_range(DateRange {
                from: Some(from),
                to: Some(to),
            })
            .build()
            .compile()
            .unwrap_err();
        assert!(matches!(err, TerrafluxError::InvalidFilter(_)));
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let day = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let filter = FilterConfig::builder()
            .date_range(DateRange {
                from: Some(day),
                to: Some(day),
            })
            .build()
            .compile()
            .unwrap();
        assert!(filter.matches(&intervention("Orca", InterventionType::Dac, 4000.0)));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let filter = FilterConfig::builder()
            .search("CLIME")
            .build()
            .compile()
            .unwrap();
        assert!(filter.matches(&intervention("Orca", InterventionType::Dac, 4000.0)));

        let filter = FilterConfig::builder()
            .search("nothing-like-this")
            .build()
            .compile()
            .unwrap();
        assert!(!filter.matches(&intervention("Orca", InterventionType::Dac, 4000.0)));
    }

    #[test]
    fn blank_search_is_a_no_op() {
        let filter = FilterConfig::builder()
            .search("   ")
            .build()
            .compile()
            .unwrap();
        assert!(filter.matches(&intervention("Orca", InterventionType::Dac, 4000.0)));
    }
}
