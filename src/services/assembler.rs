//! Builds the `buildingInsights`-shaped response from the computed parts.
//!
//! Field names follow the Google Solar API response this service stands in
//! for. Optional fields are omitted rather than sent as `null`.

use serde::Serialize;
use utoipa::ToSchema;

use crate::helpers::{opt_round_1dp, round_1dp, round_2dp, round_3dp};
use crate::services::power::{self, IrradianceStats};
use crate::services::pvgis::{self, YieldEstimate};
use crate::services::sizing::{PanelLayout, SizingAssumptions};

/// Marks every response as a modeled estimate rather than imagery-derived.
pub const IMAGERY_QUALITY: &str = "ESTIMATED";

/// Top-level estimate response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EstimateResponse {
    pub building_insights: BuildingInsights,
    pub solar_potential: SolarPotential,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BuildingInsights {
    /// Always "ESTIMATED": figures are modeled, not derived from imagery
    pub imagery_quality: String,
    /// Which providers the estimate was computed from
    pub note: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SolarPotential {
    /// Array capacity: recommended panels × panel wattage
    pub panel_capacity_watts: u64,
    /// Panels that fit on the roof polygon (omitted without a polygon)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_array_panels_count: Option<u32>,
    pub recommended_panel_count: u32,
    pub capacity_kw: f64,
    pub annual_kwh: f64,
    /// Exactly 12 values, January first
    pub monthly_kwh: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roof_segments: Option<Vec<RoofSegment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irradiance_stats: Option<IrradianceStatsResponse>,
    pub assumptions: Assumptions,
    /// Providers actually consulted for this response
    pub data_sources: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoofSegment {
    pub id: String,
    pub area_m2: f64,
    pub tilt_deg: f64,
    pub azimuth_deg: f64,
}

/// Annual irradiance totals in kWh/m²/yr.
#[derive(Debug, Serialize, ToSchema)]
pub struct IrradianceStatsResponse {
    #[serde(rename = "GHI_kWh_m2_yr", skip_serializing_if = "Option::is_none")]
    pub ghi_kwh_m2_yr: Option<f64>,
    #[serde(rename = "DNI_kWh_m2_yr", skip_serializing_if = "Option::is_none")]
    pub dni_kwh_m2_yr: Option<f64>,
    #[serde(rename = "DHI_kWh_m2_yr", skip_serializing_if = "Option::is_none")]
    pub dhi_kwh_m2_yr: Option<f64>,
}

impl From<IrradianceStats> for IrradianceStatsResponse {
    fn from(stats: IrradianceStats) -> Self {
        Self {
            ghi_kwh_m2_yr: opt_round_1dp(stats.ghi_kwh_m2_yr),
            dni_kwh_m2_yr: opt_round_1dp(stats.dni_kwh_m2_yr),
            dhi_kwh_m2_yr: opt_round_1dp(stats.dhi_kwh_m2_yr),
        }
    }
}

/// Constants and inputs the estimate was computed with.
#[derive(Debug, Serialize, ToSchema)]
pub struct Assumptions {
    pub panel_area_m2: f64,
    pub packing_ratio: f64,
    pub panel_watts: i64,
    pub tilt_deg: f64,
    pub azimuth_deg: f64,
    /// Azimuth translated to the PVGIS aspect convention (0 = south)
    pub pvgis_aspect_deg: f64,
    pub losses_percent: f64,
    pub recommended_panel_fraction: f64,
    /// System size used when no roof polygon was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_system_kw: Option<f64>,
    pub irradiance_aggregation: String,
    pub irradiance_years: String,
}

/// Everything the assembler needs from the earlier steps.
#[derive(Debug, Clone)]
pub struct EstimateParts {
    /// Roof area in m²; `None` without a polygon, 0 for a degenerate one.
    pub roof_area_m2: Option<f64>,
    pub tilt_deg: f64,
    pub azimuth_deg: f64,
    pub aspect_deg: f64,
    pub panel_watts: i64,
    pub packing_ratio: f64,
    pub losses_percent: f64,
    pub sizing: SizingAssumptions,
    pub layout: PanelLayout,
    pub fallback_system_kw: Option<f64>,
    /// `None` when the irradiance provider failed.
    pub irradiance: Option<IrradianceStats>,
    pub irradiance_years: String,
    pub energy: YieldEstimate,
}

/// Merge the computed parts into the response schema.
pub fn assemble(parts: EstimateParts) -> EstimateResponse {
    let mut data_sources = vec![pvgis::SOURCE_NAME.to_string()];
    if parts.irradiance.is_some() {
        data_sources.push(power::SOURCE_NAME.to_string());
    }

    let note = format!(
        "Modeled estimate computed from {}. Not Google Solar API imagery.",
        data_sources.join(" + ")
    );

    let roof_segments = parts.roof_area_m2.map(|area_m2| {
        vec![RoofSegment {
            id: "seg_0".to_string(),
            area_m2: round_2dp(area_m2),
            tilt_deg: round_2dp(parts.tilt_deg),
            azimuth_deg: round_1dp(parts.azimuth_deg),
        }]
    });

    let assumptions = Assumptions {
        panel_area_m2: parts.sizing.panel_area_m2,
        packing_ratio: parts.packing_ratio,
        panel_watts: parts.panel_watts,
        tilt_deg: parts.tilt_deg,
        azimuth_deg: parts.azimuth_deg,
        pvgis_aspect_deg: parts.aspect_deg,
        losses_percent: parts.losses_percent,
        recommended_panel_fraction: parts.sizing.recommended_fraction,
        fallback_system_kw: parts.fallback_system_kw,
        irradiance_aggregation: power::AGGREGATION.to_string(),
        irradiance_years: parts.irradiance_years,
    };

    EstimateResponse {
        building_insights: BuildingInsights {
            imagery_quality: IMAGERY_QUALITY.to_string(),
            note,
        },
        solar_potential: SolarPotential {
            panel_capacity_watts: parts.layout.capacity_watts,
            max_array_panels_count: parts.layout.max_panels,
            recommended_panel_count: parts.layout.recommended_panels,
            capacity_kw: round_3dp(parts.layout.capacity_kw()),
            annual_kwh: round_1dp(parts.energy.annual_kwh),
            monthly_kwh: parts.energy.monthly_kwh.iter().map(|v| round_1dp(*v)).collect(),
            roof_segments,
            irradiance_stats: parts.irradiance.map(IrradianceStatsResponse::from),
            assumptions,
            data_sources,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sizing::size_without_roof;

    fn parts() -> EstimateParts {
        EstimateParts {
            roof_area_m2: None,
            tilt_deg: 10.0,
            azimuth_deg: 180.0,
            aspect_deg: 0.0,
            panel_watts: 400,
            packing_ratio: 0.85,
            losses_percent: 14.0,
            sizing: SizingAssumptions::default(),
            layout: size_without_roof(400, 3.0),
            fallback_system_kw: Some(3.0),
            irradiance: Some(IrradianceStats {
                ghi_kwh_m2_yr: Some(1825.04),
                dni_kwh_m2_yr: Some(1095.0),
                dhi_kwh_m2_yr: None,
            }),
            irradiance_years: "2001-2020".to_string(),
            energy: YieldEstimate {
                monthly_kwh: [350.04; 12],
                annual_kwh: 4200.46,
            },
        }
    }

    #[test]
    fn test_assemble_without_roof() {
        let response = assemble(parts());
        let sp = &response.solar_potential;
        assert_eq!(response.building_insights.imagery_quality, "ESTIMATED");
        assert_eq!(sp.panel_capacity_watts, 3200);
        assert_eq!(sp.recommended_panel_count, 8);
        assert_eq!(sp.max_array_panels_count, None);
        assert_eq!(sp.capacity_kw, 3.2);
        assert_eq!(sp.annual_kwh, 4200.5);
        assert_eq!(sp.monthly_kwh, vec![350.0; 12]);
        assert!(sp.roof_segments.is_none());
        assert_eq!(
            sp.data_sources,
            vec!["PVGIS v5_2 PVcalc", "NASA POWER Climatology"]
        );
    }

    #[test]
    fn test_assemble_omits_failed_irradiance_source() {
        let mut p = parts();
        p.irradiance = None;
        let response = assemble(p);
        assert_eq!(response.solar_potential.data_sources, vec!["PVGIS v5_2 PVcalc"]);
        assert!(response.solar_potential.irradiance_stats.is_none());
        assert!(!response.building_insights.note.contains("NASA POWER"));
    }

    #[test]
    fn test_assemble_roof_segment() {
        let mut p = parts();
        p.roof_area_m2 = Some(2933.3309);
        let response = assemble(p);
        let segments = response.solar_potential.roof_segments.unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].id, "seg_0");
        assert_eq!(segments[0].area_m2, 2933.33);
        assert_eq!(segments[0].azimuth_deg, 180.0);
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(assemble(parts())).unwrap();

        assert_eq!(json["buildingInsights"]["imageryQuality"], "ESTIMATED");
        assert!(json["buildingInsights"]["note"].is_string());

        let sp = &json["solarPotential"];
        assert_eq!(sp["panelCapacityWatts"], 3200);
        assert_eq!(sp["recommendedPanelCount"], 8);
        assert_eq!(sp["capacityKw"], 3.2);
        assert_eq!(sp["monthlyKwh"].as_array().unwrap().len(), 12);
        assert_eq!(sp["irradianceStats"]["GHI_kWh_m2_yr"], 1825.0);
        assert_eq!(sp["irradianceStats"]["DNI_kWh_m2_yr"], 1095.0);
        assert!(sp["irradianceStats"].get("DHI_kWh_m2_yr").is_none());
        assert!(sp.get("maxArrayPanelsCount").is_none());
        assert!(sp.get("roofSegments").is_none());
        assert_eq!(sp["assumptions"]["panel_area_m2"], 1.95);
        assert_eq!(sp["assumptions"]["fallback_system_kw"], 3.0);
        assert_eq!(sp["assumptions"]["irradiance_years"], "2001-2020");
    }
}
