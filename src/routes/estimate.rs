//! Solar estimate HTTP endpoint.
//!
//! - POST /api/v1/solar/estimate

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::errors::{AppError, ErrorResponse};
use crate::services::assembler::{assemble, EstimateParts, EstimateResponse};
use crate::services::geometry::{self, LonLat};
use crate::services::power::PowerClient;
use crate::services::pvgis::{azimuth_to_aspect, PvSite, PvgisClient};
use crate::services::sizing::{
    size_panels, size_without_roof, SizingAssumptions, DEFAULT_PANEL_AREA_M2,
};

const DEFAULT_TILT_DEG: f64 = 10.0;
const DEFAULT_AZIMUTH_DEG: f64 = 180.0;
const DEFAULT_PANEL_WATTS: i64 = 400;
const MAX_PANEL_WATTS: i64 = 100_000;
const DEFAULT_PACKING_RATIO: f64 = 0.85;
const DEFAULT_LOSSES_PERCENT: f64 = 14.0;
const MAX_LOSSES_PERCENT: f64 = 40.0;

/// Shared application state for the estimate endpoint.
#[derive(Clone)]
pub struct AppState {
    pub power: PowerClient,
    pub pvgis: PvgisClient,
    /// System size (kW) used when there is no roof polygon and no `system_kw`.
    pub default_system_kw: f64,
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub enum PolygonType {
    Polygon,
}

/// GeoJSON Polygon. Only the outer ring (`coordinates[0]`) is used.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GeoJsonPolygon {
    #[serde(rename = "type")]
    pub kind: PolygonType,
    /// Rings of `[lon, lat]` positions
    pub coordinates: Vec<Vec<Vec<f64>>>,
}

/// Estimate request body.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EstimateRequest {
    /// Latitude (WGS84), -90..90
    pub lat: f64,
    /// Longitude (WGS84), -180..180
    pub lon: f64,
    /// Optional roof outline
    pub polygon: Option<GeoJsonPolygon>,
    /// Panel tilt from horizontal, 0..90 (default 10)
    pub tilt_deg: Option<f64>,
    /// Compass bearing the panels face, 0..360 with 180 = south (default 180)
    pub azimuth_deg: Option<f64>,
    /// Requested system size in kW
    pub system_kw: Option<f64>,
    /// Module rating in watts (default 400)
    pub panel_watts: Option<i64>,
    /// Module footprint in m² (default 1.95)
    pub panel_area_m2: Option<f64>,
    /// Usable fraction of the roof area, (0, 1] (default 0.85)
    pub packing_ratio: Option<f64>,
    /// System losses in percent, 0..40 (default 14)
    pub losses_percent: Option<f64>,
}

/// A request that passed validation, with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ValidatedRequest {
    pub(crate) lat: f64,
    pub(crate) lon: f64,
    pub(crate) tilt_deg: f64,
    pub(crate) azimuth_deg: f64,
    pub(crate) system_kw: Option<f64>,
    pub(crate) panel_watts: i64,
    pub(crate) panel_area_m2: f64,
    pub(crate) packing_ratio: f64,
    pub(crate) losses_percent: f64,
    /// Outer roof ring, when a polygon was given.
    pub(crate) ring: Option<Vec<LonLat>>,
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<f64, AppError> {
    // NaN fails every comparison, so check finiteness first.
    if !value.is_finite() || value < min || value > max {
        return Err(AppError::Validation(format!(
            "{} must be between {} and {}, got {}",
            name, min, max, value
        )));
    }
    Ok(value)
}

fn check_positive(name: &str, value: f64) -> Result<f64, AppError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(AppError::Validation(format!(
            "{} must be a positive number, got {}",
            name, value
        )));
    }
    Ok(value)
}

fn validate_ring(polygon: &GeoJsonPolygon) -> Result<Vec<LonLat>, AppError> {
    let outer = polygon.coordinates.first().ok_or_else(|| {
        AppError::Validation("polygon.coordinates must contain an outer ring".to_string())
    })?;

    let mut ring = Vec::with_capacity(outer.len());
    for (i, position) in outer.iter().enumerate() {
        let (lon, lat) = match position.as_slice() {
            [lon, lat, ..] => (*lon, *lat),
            _ => {
                return Err(AppError::Validation(format!(
                    "polygon vertex {} must be a [lon, lat] pair",
                    i
                )))
            }
        };
        check_range(&format!("polygon vertex {} longitude", i), lon, -180.0, 180.0)?;
        check_range(&format!("polygon vertex {} latitude", i), lat, -90.0, 90.0)?;
        ring.push([lon, lat]);
    }

    let distinct = geometry::distinct_vertex_count(&ring);
    if distinct < 3 {
        return Err(AppError::Validation(format!(
            "polygon outer ring needs at least 3 distinct vertices, got {}",
            distinct
        )));
    }
    Ok(ring)
}

impl EstimateRequest {
    /// Check every field and apply defaults. Self-intersecting rings are
    /// accepted.
    pub(crate) fn validate(self) -> Result<ValidatedRequest, AppError> {
        let lat = check_range("lat", self.lat, -90.0, 90.0)?;
        let lon = check_range("lon", self.lon, -180.0, 180.0)?;
        let tilt_deg = check_range("tilt_deg", self.tilt_deg.unwrap_or(DEFAULT_TILT_DEG), 0.0, 90.0)?;
        let azimuth_deg = check_range(
            "azimuth_deg",
            self.azimuth_deg.unwrap_or(DEFAULT_AZIMUTH_DEG),
            0.0,
            360.0,
        )?;

        let panel_watts = self.panel_watts.unwrap_or(DEFAULT_PANEL_WATTS);
        if !(1..=MAX_PANEL_WATTS).contains(&panel_watts) {
            return Err(AppError::Validation(format!(
                "panel_watts must be an integer between 1 and {}, got {}",
                MAX_PANEL_WATTS, panel_watts
            )));
        }

        let panel_area_m2 =
            check_positive("panel_area_m2", self.panel_area_m2.unwrap_or(DEFAULT_PANEL_AREA_M2))?;
        let packing_ratio =
            check_range("packing_ratio", self.packing_ratio.unwrap_or(DEFAULT_PACKING_RATIO), 0.0, 1.0)?;
        if packing_ratio == 0.0 {
            return Err(AppError::Validation(
                "packing_ratio must be greater than 0".to_string(),
            ));
        }
        let losses_percent = check_range(
            "losses_percent",
            self.losses_percent.unwrap_or(DEFAULT_LOSSES_PERCENT),
            0.0,
            MAX_LOSSES_PERCENT,
        )?;
        let system_kw = self
            .system_kw
            .map(|kw| check_positive("system_kw", kw))
            .transpose()?;

        let ring = self.polygon.as_ref().map(validate_ring).transpose()?;

        Ok(ValidatedRequest {
            lat,
            lon,
            tilt_deg,
            azimuth_deg,
            system_kw,
            panel_watts,
            panel_area_m2,
            packing_ratio,
            losses_percent,
            ring,
        })
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Estimate the solar potential of a location or roof.
///
/// Computes the roof area (when a polygon is given), sizes the panel array,
/// then queries NASA POWER for irradiance and PVGIS for energy yield in
/// parallel. Irradiance is optional: if NASA POWER fails the response is
/// still returned without `irradianceStats`. A PVGIS failure fails the request.
#[utoipa::path(
    post,
    path = "/api/v1/solar/estimate",
    tag = "Estimate",
    request_body = EstimateRequest,
    responses(
        (status = 200, description = "Solar potential estimate", body = EstimateResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 502, description = "PVGIS unreachable or returned bad data", body = ErrorResponse),
    )
)]
pub async fn estimate_solar_potential(
    State(state): State<AppState>,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<EstimateResponse>, AppError> {
    let Json(request) = payload?;
    let req = request.validate()?;
    tracing::debug!(
        lat = req.lat,
        lon = req.lon,
        has_polygon = req.ring.is_some(),
        "Estimate request validated"
    );

    let sizing = SizingAssumptions {
        panel_area_m2: req.panel_area_m2,
        ..SizingAssumptions::default()
    };

    let roof_area_m2 = req.ring.as_deref().map(|ring| {
        geometry::roof_area(ring).unwrap_or_else(|e| {
            tracing::warn!("Roof polygon unusable ({}), sizing without roof area", e);
            0.0
        })
    });
    if let Some(area) = roof_area_m2 {
        tracing::debug!(area_m2 = area, "Roof geometry computed");
    }

    let (layout, fallback_system_kw) = match roof_area_m2 {
        Some(area) if area > 0.0 => (
            size_panels(area, req.panel_watts, req.packing_ratio, req.system_kw, &sizing),
            None,
        ),
        _ => {
            let fallback = req.system_kw.is_none().then_some(state.default_system_kw);
            let target_kw = req.system_kw.unwrap_or(state.default_system_kw);
            (size_without_roof(req.panel_watts, target_kw), fallback)
        }
    };
    tracing::debug!(
        max_panels = ?layout.max_panels,
        recommended_panels = layout.recommended_panels,
        capacity_kw = layout.capacity_kw(),
        "Panel sizing computed"
    );

    let aspect_deg = azimuth_to_aspect(req.azimuth_deg);
    let site = PvSite {
        lat: req.lat,
        lon: req.lon,
        tilt_deg: req.tilt_deg,
        aspect_deg,
        peak_kw: layout.capacity_kw(),
        losses_percent: req.losses_percent,
    };

    let (irradiance, energy) = futures::future::join(
        state.power.fetch_irradiance(req.lat, req.lon),
        state.pvgis.fetch_yield(&site),
    )
    .await;

    let energy = energy.inspect_err(|e| {
        tracing::error!("Yield simulation failed: {}", e);
    })?;
    let irradiance = match irradiance {
        Ok(stats) => Some(stats),
        Err(e) => {
            tracing::warn!("Irradiance unavailable, omitting from response: {}", e);
            None
        }
    };

    let response = assemble(EstimateParts {
        roof_area_m2,
        tilt_deg: req.tilt_deg,
        azimuth_deg: req.azimuth_deg,
        aspect_deg,
        panel_watts: req.panel_watts,
        packing_ratio: req.packing_ratio,
        losses_percent: req.losses_percent,
        sizing,
        layout,
        fallback_system_kw,
        irradiance,
        irradiance_years: state.power.years(),
        energy,
    });
    tracing::debug!(
        annual_kwh = response.solar_potential.annual_kwh,
        "Estimate assembled"
    );

    Ok(Json(response))
}
