//! Panel count and array capacity from roof area and module wattage.

/// Footprint of one module in m² (a typical 400 W panel).
pub const DEFAULT_PANEL_AREA_M2: f64 = 1.95;

/// Share of the maximum panel count that is recommended. 1.0 recommends the
/// full array.
pub const RECOMMENDED_PANEL_FRACTION: f64 = 1.0;

/// Constants used by the sizing step, echoed back in `assumptions`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizingAssumptions {
    pub panel_area_m2: f64,
    pub recommended_fraction: f64,
}

impl Default for SizingAssumptions {
    fn default() -> Self {
        Self {
            panel_area_m2: DEFAULT_PANEL_AREA_M2,
            recommended_fraction: RECOMMENDED_PANEL_FRACTION,
        }
    }
}

/// Result of panel sizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelLayout {
    /// Panels that physically fit on the usable roof area.
    /// `None` when no roof area was available.
    pub max_panels: Option<u32>,
    pub recommended_panels: u32,
    /// Array capacity: recommended panels × panel wattage.
    pub capacity_watts: u64,
}

impl PanelLayout {
    pub fn capacity_kw(&self) -> f64 {
        self.capacity_watts as f64 / 1000.0
    }
}

fn panels_for_kw(target_kw: f64, panel_watts: i64) -> u32 {
    if panel_watts <= 0 || !target_kw.is_finite() || target_kw <= 0.0 {
        return 0;
    }
    (target_kw * 1000.0 / panel_watts as f64).round() as u32
}

fn layout(max_panels: Option<u32>, recommended_panels: u32, panel_watts: i64) -> PanelLayout {
    let watts = panel_watts.max(0) as u64;
    PanelLayout {
        max_panels,
        recommended_panels,
        capacity_watts: u64::from(recommended_panels).saturating_mul(watts),
    }
}

/// Size an array for a roof of `area_m2`.
///
/// `max = floor(area × packing_ratio / panel_area)`. The recommended count is
/// `floor(max × recommended_fraction)`, or the panel count closest to
/// `target_kw` when one is requested, never exceeding `max`. Non-positive or
/// non-finite inputs give zero panels.
pub fn size_panels(
    area_m2: f64,
    panel_watts: i64,
    packing_ratio: f64,
    target_kw: Option<f64>,
    assumptions: &SizingAssumptions,
) -> PanelLayout {
    let usable_m2 = area_m2 * packing_ratio;
    let usable = usable_m2.is_finite()
        && usable_m2 > 0.0
        && panel_watts > 0
        && assumptions.panel_area_m2.is_finite()
        && assumptions.panel_area_m2 > 0.0;
    if !usable {
        return layout(Some(0), 0, panel_watts);
    }

    let max_panels = (usable_m2 / assumptions.panel_area_m2).floor() as u32;
    let recommended = match target_kw {
        Some(kw) => panels_for_kw(kw, panel_watts),
        None => {
            let fraction = assumptions.recommended_fraction.clamp(0.0, 1.0);
            (f64::from(max_panels) * fraction).floor() as u32
        }
    };

    layout(Some(max_panels), recommended.min(max_panels), panel_watts)
}

/// Size an array without roof geometry: the panel count closest to
/// `target_kw`, with no maximum.
pub fn size_without_roof(panel_watts: i64, target_kw: f64) -> PanelLayout {
    layout(None, panels_for_kw(target_kw, panel_watts), panel_watts)
}
