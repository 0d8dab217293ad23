//! NASA POWER climatology client.
//!
//! Fetches long-term monthly mean irradiance for a point and folds it into
//! annual totals.
//! See: https://power.larc.nasa.gov/docs/services/api/temporal/climatology/

use std::collections::HashMap;

use serde::Deserialize;

use crate::errors::AppError;
use crate::helpers::DAYS_IN_MONTH;
use crate::services::http::get_with_retry;

/// Name reported in `dataSources` when this provider contributed.
pub const SOURCE_NAME: &str = "NASA POWER Climatology";

/// How monthly means become annual totals, echoed in `assumptions`.
pub const AGGREGATION: &str = "sum over months of mean daily value x days in month (365-day year)";

const PARAM_GHI: &str = "ALLSKY_SFC_SW_DWN";
const PARAM_DNI: &str = "ALLSKY_SFC_SW_DNI";
const PARAM_DHI: &str = "ALLSKY_SFC_SW_DIFF";

const MONTH_KEYS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Annual irradiance totals in kWh/m²/yr. A component is `None` when the
/// provider had no valid monthly values for it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IrradianceStats {
    pub ghi_kwh_m2_yr: Option<f64>,
    pub dni_kwh_m2_yr: Option<f64>,
    pub dhi_kwh_m2_yr: Option<f64>,
}

impl IrradianceStats {
    fn is_empty(&self) -> bool {
        self.ghi_kwh_m2_yr.is_none() && self.dni_kwh_m2_yr.is_none() && self.dhi_kwh_m2_yr.is_none()
    }
}

// --- POWER JSON response types ---

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    parameter: HashMap<String, HashMap<String, Option<f64>>>,
}

/// Client for the NASA POWER API.
#[derive(Debug, Clone)]
pub struct PowerClient {
    client: reqwest::Client,
    base_url: String,
    start_year: u16,
    end_year: u16,
}

impl PowerClient {
    pub fn new(client: reqwest::Client, base_url: &str, start_year: u16, end_year: u16) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            start_year,
            end_year,
        }
    }

    /// Climatology window, e.g. "2001-2020".
    pub fn years(&self) -> String {
        format!("{}-{}", self.start_year, self.end_year)
    }

    /// Fetch annual GHI/DNI/DHI totals for a coordinate.
    ///
    /// Any failure (transport, status, body) is reported as
    /// `AppError::DataUnavailable`; callers treat irradiance as optional.
    pub async fn fetch_irradiance(&self, lat: f64, lon: f64) -> Result<IrradianceStats, AppError> {
        let url = format!("{}/temporal/climatology/point", self.base_url);
        let query = [
            ("parameters", format!("{},{},{}", PARAM_GHI, PARAM_DNI, PARAM_DHI)),
            ("community", "RE".to_string()),
            ("longitude", format!("{:.4}", lon)),
            ("latitude", format!("{:.4}", lat)),
            ("start", self.start_year.to_string()),
            ("end", self.end_year.to_string()),
            ("format", "JSON".to_string()),
        ];

        let response = get_with_retry(&self.client, &url, &query, "NASA POWER")
            .await
            .map_err(|e| AppError::DataUnavailable(format!("NASA POWER request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::DataUnavailable(format!(
                "NASA POWER returned HTTP {}",
                response.status()
            )));
        }

        let raw_json: serde_json::Value = response.json().await.map_err(|e| {
            AppError::DataUnavailable(format!("NASA POWER JSON parse error: {}", e))
        })?;

        parse_climatology(&raw_json)
    }
}

/// Annual total from monthly mean daily values keyed `JAN`..`DEC`.
///
/// Missing months, fill values (-999) and negatives are skipped. Returns
/// `None` when no month is usable.
fn annual_total(monthly: &HashMap<String, Option<f64>>) -> Option<f64> {
    let valid: Vec<f64> = MONTH_KEYS
        .iter()
        .zip(DAYS_IN_MONTH.iter())
        .filter_map(|(key, &days)| {
            monthly
                .get(*key)
                .copied()
                .flatten()
                .filter(|v| v.is_finite() && *v >= 0.0)
                .map(|v| v * f64::from(days))
        })
        .collect();

    if valid.is_empty() {
        None
    } else {
        Some(valid.iter().sum())
    }
}

/// Extract annual totals from a POWER climatology response.
fn parse_climatology(raw_json: &serde_json::Value) -> Result<IrradianceStats, AppError> {
    let response: PowerResponse = serde_json::from_value(raw_json.clone()).map_err(|e| {
        AppError::DataUnavailable(format!("NASA POWER response structure error: {}", e))
    })?;

    let params = &response.properties.parameter;
    let component = |key: &str| params.get(key).and_then(annual_total);

    let stats = IrradianceStats {
        ghi_kwh_m2_yr: component(PARAM_GHI),
        dni_kwh_m2_yr: component(PARAM_DNI),
        dhi_kwh_m2_yr: component(PARAM_DHI),
    };

    if stats.is_empty() {
        return Err(AppError::DataUnavailable(
            "NASA POWER returned no usable irradiance values".to_string(),
        ));
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn flat_months(value: f64) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for key in MONTH_KEYS {
            map.insert(key.to_string(), serde_json::json!(value));
        }
        map.insert("ANN".to_string(), serde_json::json!(value));
        serde_json::Value::Object(map)
    }

    fn sample_response() -> serde_json::Value {
        serde_json::json!({
            "type": "Feature",
            "geometry": { "type": "Point", "coordinates": [3.3792, 6.5244, 10.0] },
            "properties": {
                "parameter": {
                    "ALLSKY_SFC_SW_DWN": flat_months(5.0),
                    "ALLSKY_SFC_SW_DNI": flat_months(3.0),
                    "ALLSKY_SFC_SW_DIFF": flat_months(2.0)
                }
            }
        })
    }

    fn test_client(base: &str) -> PowerClient {
        let client = crate::services::http::build_client("test", Duration::from_secs(5)).unwrap();
        PowerClient::new(client, base, 2001, 2020)
    }

    #[test]
    fn test_parse_climatology_flat_values() {
        let stats = parse_climatology(&sample_response()).unwrap();
        assert!((stats.ghi_kwh_m2_yr.unwrap() - 1825.0).abs() < 1e-9);
        assert!((stats.dni_kwh_m2_yr.unwrap() - 1095.0).abs() < 1e-9);
        assert!((stats.dhi_kwh_m2_yr.unwrap() - 730.0).abs() < 1e-9);
    }

    #[test]
    fn test_annual_total_weights_by_days() {
        let mut monthly: HashMap<String, Option<f64>> = HashMap::new();
        monthly.insert("JAN".to_string(), Some(1.0));
        monthly.insert("FEB".to_string(), Some(1.0));
        assert_eq!(annual_total(&monthly), Some(59.0));
    }

    #[test]
    fn test_annual_total_skips_fill_values() {
        let mut monthly: HashMap<String, Option<f64>> = HashMap::new();
        monthly.insert("JAN".to_string(), Some(-999.0));
        monthly.insert("FEB".to_string(), None);
        monthly.insert("MAR".to_string(), Some(2.0));
        assert_eq!(annual_total(&monthly), Some(62.0));
    }

    #[test]
    fn test_annual_total_all_missing() {
        let mut monthly: HashMap<String, Option<f64>> = HashMap::new();
        monthly.insert("JAN".to_string(), Some(-999.0));
        assert_eq!(annual_total(&monthly), None);
    }

    #[test]
    fn test_parse_climatology_missing_component() {
        let json = serde_json::json!({
            "properties": { "parameter": { "ALLSKY_SFC_SW_DWN": flat_months(5.0) } }
        });
        let stats = parse_climatology(&json).unwrap();
        assert!(stats.ghi_kwh_m2_yr.is_some());
        assert_eq!(stats.dni_kwh_m2_yr, None);
        assert_eq!(stats.dhi_kwh_m2_yr, None);
    }

    #[test]
    fn test_parse_climatology_empty_is_unavailable() {
        let json = serde_json::json!({ "properties": { "parameter": {} } });
        assert!(matches!(
            parse_climatology(&json),
            Err(AppError::DataUnavailable(_))
        ));
    }

    #[test]
    fn test_parse_climatology_malformed() {
        let json = serde_json::json!({ "messages": ["bad request"] });
        assert!(matches!(
            parse_climatology(&json),
            Err(AppError::DataUnavailable(_))
        ));
    }

    #[test]
    fn test_years() {
        assert_eq!(test_client("http://localhost").years(), "2001-2020");
    }

    #[tokio::test]
    async fn test_fetch_irradiance() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/temporal/climatology/point"))
            .and(query_param("latitude", "6.5244"))
            .and(query_param("longitude", "3.3792"))
            .and(query_param("start", "2001"))
            .and(query_param("end", "2020"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_response()))
            .expect(1)
            .mount(&server)
            .await;

        let stats = test_client(&server.uri())
            .fetch_irradiance(6.5244, 3.3792)
            .await
            .unwrap();
        assert!((stats.ghi_kwh_m2_yr.unwrap() - 1825.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_fetch_irradiance_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = test_client(&server.uri())
            .fetch_irradiance(6.5244, 3.3792)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }

    #[tokio::test]
    async fn test_fetch_irradiance_unreachable() {
        let err = test_client(&crate::services::http::unreachable_url())
            .fetch_irradiance(6.5244, 3.3792)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DataUnavailable(_)));
    }
}
