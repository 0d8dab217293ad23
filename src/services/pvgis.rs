//! PVGIS PVcalc client.
//!
//! Simulates monthly and annual energy yield for a grid-connected fixed
//! array.
//! See: https://joint-research-centre.ec.europa.eu/photovoltaic-geographical-information-system-pvgis/getting-started-pvgis/api-non-interactive-service_en

use serde::Deserialize;

use crate::errors::AppError;
use crate::services::http::get_with_retry;

/// Name reported in `dataSources`.
pub const SOURCE_NAME: &str = "PVGIS v5_2 PVcalc";

/// Capacity simulated when the array capacity is unknown or zero; results
/// are scaled afterwards.
const UNIT_PEAK_KW: f64 = 1.0;

/// Convert a compass azimuth (0 = north, 180 = south) to the PVGIS aspect
/// as `180 - azimuth`, wrapped into (-180, 180].
///
/// For azimuths in [0, 360) no wrapping happens except at 360 itself, so the
/// result is exactly `180 - azimuth`.
pub fn azimuth_to_aspect(azimuth_deg: f64) -> f64 {
    let mut aspect = 180.0 - azimuth_deg;
    while aspect <= -180.0 {
        aspect += 360.0;
    }
    while aspect > 180.0 {
        aspect -= 360.0;
    }
    aspect
}

/// Inverse of [`azimuth_to_aspect`], wrapped into [0, 360).
pub fn aspect_to_azimuth(aspect_deg: f64) -> f64 {
    let mut azimuth = 180.0 - aspect_deg;
    while azimuth < 0.0 {
        azimuth += 360.0;
    }
    while azimuth >= 360.0 {
        azimuth -= 360.0;
    }
    azimuth
}

/// Array and site parameters for one simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PvSite {
    pub lat: f64,
    pub lon: f64,
    pub tilt_deg: f64,
    /// PVGIS aspect (0 = south), see [`azimuth_to_aspect`].
    pub aspect_deg: f64,
    /// Array capacity in kWp.
    pub peak_kw: f64,
    pub losses_percent: f64,
}

/// Simulated energy yield.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YieldEstimate {
    /// January first.
    pub monthly_kwh: [f64; 12],
    pub annual_kwh: f64,
}

impl YieldEstimate {
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            monthly_kwh: self.monthly_kwh.map(|v| v * factor),
            annual_kwh: self.annual_kwh * factor,
        }
    }
}

// --- PVGIS JSON response types ---

#[derive(Debug, Deserialize)]
struct PvgisResponse {
    outputs: PvgisOutputs,
}

#[derive(Debug, Deserialize)]
struct PvgisOutputs {
    monthly: PvgisMonthly,
    totals: Option<PvgisTotals>,
}

#[derive(Debug, Deserialize)]
struct PvgisMonthly {
    fixed: Vec<PvgisMonth>,
}

#[derive(Debug, Deserialize)]
struct PvgisMonth {
    month: u8,
    #[serde(rename = "E_m")]
    e_m: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PvgisTotals {
    fixed: Option<PvgisTotalsFixed>,
}

#[derive(Debug, Deserialize)]
struct PvgisTotalsFixed {
    #[serde(rename = "E_y")]
    e_y: Option<f64>,
}

/// Client for the PVGIS API.
#[derive(Debug, Clone)]
pub struct PvgisClient {
    client: reqwest::Client,
    base_url: String,
}

impl PvgisClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Simulate the yield of `site`.
    ///
    /// A non-positive capacity is simulated at 1 kWp and scaled, so a zero
    /// capacity yields twelve zero months. Any failure is reported as
    /// `AppError::Upstream`.
    pub async fn fetch_yield(&self, site: &PvSite) -> Result<YieldEstimate, AppError> {
        let (simulated_kw, scale) = if site.peak_kw.is_finite() && site.peak_kw > 0.0 {
            (site.peak_kw, 1.0)
        } else {
            (UNIT_PEAK_KW, site.peak_kw.max(0.0) / UNIT_PEAK_KW)
        };

        let url = format!("{}/PVcalc", self.base_url);
        let query = [
            ("lat", format!("{:.4}", site.lat)),
            ("lon", format!("{:.4}", site.lon)),
            ("peakpower", simulated_kw.to_string()),
            ("loss", site.losses_percent.to_string()),
            ("angle", site.tilt_deg.to_string()),
            ("aspect", site.aspect_deg.to_string()),
            ("outputformat", "json".to_string()),
        ];

        let response = get_with_retry(&self.client, &url, &query, "PVGIS")
            .await
            .map_err(|e| AppError::Upstream(format!("PVGIS request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "PVGIS returned HTTP {}",
                response.status()
            )));
        }

        let raw_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("PVGIS JSON parse error: {}", e)))?;

        let estimate = parse_pvcalc(&raw_json)?;
        Ok(if scale == 1.0 {
            estimate
        } else {
            estimate.scaled(scale)
        })
    }
}

/// Extract monthly and annual energy from a PVcalc response.
///
/// All 12 months must be present. The annual total falls back to the sum of
/// the months when `E_y` is missing.
fn parse_pvcalc(raw_json: &serde_json::Value) -> Result<YieldEstimate, AppError> {
    let response: PvgisResponse = serde_json::from_value(raw_json.clone())
        .map_err(|e| AppError::Upstream(format!("PVGIS response structure error: {}", e)))?;

    let mut monthly: [Option<f64>; 12] = [None; 12];
    for entry in &response.outputs.monthly.fixed {
        if (1..=12).contains(&entry.month) {
            monthly[usize::from(entry.month - 1)] = entry.e_m.filter(|v| v.is_finite());
        }
    }

    let mut monthly_kwh = [0.0; 12];
    for (i, value) in monthly.iter().enumerate() {
        monthly_kwh[i] = value.ok_or_else(|| {
            AppError::Upstream(format!("PVGIS response missing energy for month {}", i + 1))
        })?;
    }

    let annual_kwh = response
        .outputs
        .totals
        .and_then(|t| t.fixed)
        .and_then(|f| f.e_y)
        .filter(|v| v.is_finite())
        .unwrap_or_else(|| monthly_kwh.iter().sum());

    Ok(YieldEstimate {
        monthly_kwh,
        annual_kwh,
    })
}
