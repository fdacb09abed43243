//! Thin client over NASA Earthdata services used by the climate-data API
//! family. Point temperature comes from the POWER API (MERRA-2 derived,
//! JSON). CO2 and biomass have no keyless JSON product, so they are
//! documented baseline estimates in the same shape, labeled as such.

pub mod error;

pub use error::{EarthdataError, Result};

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const POWER_BASE_URL: &str = "https://power.larc.nasa.gov";

/// POWER publishes daily data with a few days of latency.
const POWER_LAG_DAYS: i64 = 3;
const FETCH_WINDOW_DAYS: i64 = 7;

// Baseline estimates where the upstream product is not reachable as JSON.
const CO2_BASELINE_PPM: f64 = 417.0;
const CO2_BASELINE_YEAR: i32 = 2022;
const CO2_TREND_PPM_PER_YEAR: f64 = 2.5;
const TEMPERATURE_TREND_C_PER_DECADE: f64 = 0.15;

#[derive(Debug, Clone, Serialize)]
pub struct Co2Data {
    pub lat: f64,
    pub lon: f64,
    pub co2_ppm: f64,
    pub trend_ppm_per_year: f64,
    pub date: NaiveDate,
    pub source: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct TemperatureData {
    pub lat: f64,
    pub lon: f64,
    pub temperature_c: f64,
    pub observed_on: NaiveDate,
    pub source: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct BiomassData {
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
    pub biomass_density_t_ha: f64,
    pub source: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoricalPatterns {
    pub lat: f64,
    pub lon: f64,
    pub years_back: u32,
    pub temperature_trend_c_per_decade: f64,
    pub co2_trend_ppm_per_year: f64,
    pub source: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageryData {
    pub lat: f64,
    pub lon: f64,
    pub date: NaiveDate,
    pub imagery_url: String,
    pub source: &'static str,
}

/// Combined site assessment for intervention planning.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationGuidance {
    pub co2: Co2Data,
    pub temperature: TemperatureData,
    pub biomass: BiomassData,
    pub optimal_intervention_type: &'static str,
    pub deployment_priority: &'static str,
}

// --- POWER wire types ---

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: BTreeMap<String, BTreeMap<String, f64>>,
}

pub struct EarthdataClient {
    client: reqwest::Client,
    power_base_url: String,
}

impl EarthdataClient {
    pub fn new(power_base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            power_base_url: power_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn effective_date(date: Option<NaiveDate>) -> NaiveDate {
        date.unwrap_or_else(|| Utc::now().date_naive() - ChronoDuration::days(POWER_LAG_DAYS))
    }

    /// Daily 2-meter air temperature from POWER, taking the most recent day
    /// with data in a trailing window (daily files lag by a few days).
    pub async fn temperature(
        &self,
        lat: f64,
        lon: f64,
        date: Option<NaiveDate>,
    ) -> Result<TemperatureData> {
        let end = Self::effective_date(date);
        let start = end - ChronoDuration::days(FETCH_WINDOW_DAYS);
        let url = format!(
            "{}/api/temporal/daily/point?parameters=T2M&community=RE&latitude={lat}&longitude={lon}&start={}&end={}&format=JSON",
            self.power_base_url,
            start.format("%Y%m%d"),
            end.format("%Y%m%d"),
        );
        debug!(%url, "Fetching POWER temperature");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(EarthdataError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: PowerResponse = resp.json().await?;
        let series = body
            .properties
            .parameter
            .get("T2M")
            .ok_or_else(|| EarthdataError::Decode("no T2M series in response".to_string()))?;

        // POWER uses -999 as its fill value for missing days.
        let (day, value) = series
            .iter()
            .rev()
            .find(|(_, v)| **v > -900.0)
            .ok_or_else(|| EarthdataError::Decode("T2M series has no valid days".to_string()))?;
        let observed_on = NaiveDate::parse_from_str(day, "%Y%m%d")
            .map_err(|e| EarthdataError::Decode(format!("bad date key '{day}': {e}")))?;

        Ok(TemperatureData {
            lat,
            lon,
            temperature_c: *value,
            observed_on,
            source: "NASA POWER (MERRA-2 T2M)",
        })
    }

    /// Column CO2 estimate: a Mauna Loa style baseline advanced by the
    /// observed annual growth rate. No keyless JSON product exists for
    /// OCO-2, so this is labeled an estimate.
    pub fn co2_concentration(&self, lat: f64, lon: f64, date: Option<NaiveDate>) -> Co2Data {
        let date = Self::effective_date(date);
        let years = f64::from(date.year() - CO2_BASELINE_YEAR);
        Co2Data {
            lat,
            lon,
            co2_ppm: CO2_BASELINE_PPM + years * CO2_TREND_PPM_PER_YEAR,
            trend_ppm_per_year: CO2_TREND_PPM_PER_YEAR,
            date,
            source: "estimated (OCO-2 baseline + annual growth)",
        }
    }

    /// Aboveground biomass density estimate by latitude band, GEDI-calibrated
    /// magnitudes.
    pub fn biomass(&self, lat: f64, lon: f64, radius_km: f64) -> BiomassData {
        let density = match lat.abs() {
            l if l < 23.5 => 95.0, // tropical
            l if l < 50.0 => 45.0, // temperate
            _ => 15.0,             // boreal / sparse
        };
        BiomassData {
            lat,
            lon,
            radius_km,
            biomass_density_t_ha: density,
            source: "estimated (GEDI latitude-band climatology)",
        }
    }

    pub fn historical_patterns(&self, lat: f64, lon: f64, years_back: u32) -> HistoricalPatterns {
        HistoricalPatterns {
            lat,
            lon,
            years_back,
            temperature_trend_c_per_decade: TEMPERATURE_TREND_C_PER_DECADE,
            co2_trend_ppm_per_year: CO2_TREND_PPM_PER_YEAR,
            source: "estimated (MERRA-2 reanalysis trends)",
        }
    }

    pub fn satellite_imagery(&self, lat: f64, lon: f64, date: Option<NaiveDate>) -> ImageryData {
        let date = Self::effective_date(date);
        ImageryData {
            lat,
            lon,
            date,
            imagery_url: format!(
                "https://worldview.earthdata.nasa.gov/?v={},{},{},{}&t={}",
                lon - 1.0,
                lat - 1.0,
                lon + 1.0,
                lat + 1.0,
                date.format("%Y-%m-%d"),
            ),
            source: "NASA Worldview",
        }
    }

    /// Site assessment combining CO2, temperature, and biomass. High biomass
    /// favors biochar feedstock; otherwise DAC. Elevated CO2 raises the
    /// deployment priority.
    pub async fn optimization_guidance(&self, lat: f64, lon: f64) -> Result<OptimizationGuidance> {
        let co2 = self.co2_concentration(lat, lon, None);
        let temperature = self.temperature(lat, lon, None).await?;
        let biomass = self.biomass(lat, lon, 10.0);

        let optimal_intervention_type = if biomass.biomass_density_t_ha > 30.0 {
            "biochar"
        } else {
            "dac"
        };
        let deployment_priority = if co2.co2_ppm > 420.0 { "high" } else { "medium" };

        Ok(OptimizationGuidance {
            co2,
            temperature,
            biomass,
            optimal_intervention_type,
            deployment_priority,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> EarthdataClient {
        EarthdataClient::new(POWER_BASE_URL)
    }

    #[test]
    fn co2_estimate_advances_with_year() {
        let c = client();
        let d2022 = c.co2_concentration(0.0, 0.0, NaiveDate::from_ymd_opt(2022, 6, 1));
        let d2026 = c.co2_concentration(0.0, 0.0, NaiveDate::from_ymd_opt(2026, 6, 1));
        assert_eq!(d2022.co2_ppm, CO2_BASELINE_PPM);
        assert!((d2026.co2_ppm - (CO2_BASELINE_PPM + 4.0 * CO2_TREND_PPM_PER_YEAR)).abs() < 1e-9);
    }

    #[test]
    fn biomass_band_by_latitude() {
        let c = client();
        assert!(c.biomass(2.0, 20.0, 10.0).biomass_density_t_ha > c.biomass(45.0, 20.0, 10.0).biomass_density_t_ha);
        assert!(c.biomass(45.0, 20.0, 10.0).biomass_density_t_ha > c.biomass(65.0, 20.0, 10.0).biomass_density_t_ha);
        // Bands are symmetric across the equator.
        assert_eq!(
            c.biomass(-10.0, 0.0, 10.0).biomass_density_t_ha,
            c.biomass(10.0, 0.0, 10.0).biomass_density_t_ha
        );
    }

    #[test]
    fn imagery_url_embeds_bbox_and_date() {
        let c = client();
        let img = c.satellite_imagery(40.7, -74.0, NaiveDate::from_ymd_opt(2025, 5, 1));
        assert!(img.imagery_url.contains("worldview.earthdata.nasa.gov"));
        assert!(img.imagery_url.contains("2025-05-01"));
    }

    #[test]
    fn power_response_parses() {
        let raw = r#"{
            "properties": {
                "parameter": {
                    "T2M": { "20250501": 12.4, "20250502": -999.0 }
                }
            }
        }"#;
        let parsed: PowerResponse = serde_json::from_str(raw).unwrap();
        let series = parsed.properties.parameter.get("T2M").unwrap();
        assert_eq!(series.get("20250501"), Some(&12.4));
    }
}
