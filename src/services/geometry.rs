//! Roof polygon area via UTM projection.
//!
//! Vertices arrive as WGS84 `[lon, lat]` pairs. Each ring is projected into
//! the UTM zone of its centroid (transverse Mercator, Krüger series) and its
//! planar area is taken with the shoelace formula.

use thiserror::Error;

/// WGS84 semi-major axis in meters.
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// UTM central scale factor.
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Rings with area below this fraction of perimeter² are treated as lines.
/// A square scores 1/16.
const DEGENERATE_AREA_RATIO: f64 = 1e-6;

/// A single `[lon, lat]` vertex in degrees.
pub type LonLat = [f64; 2];

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("polygon is degenerate (area {area_m2} m²)")]
    Degenerate { area_m2: f64 },
}

/// UTM zone number (1..=60) for a longitude in degrees.
///
/// Longitude 180 falls in zone 60. The Norway/Svalbard zone exceptions are
/// not applied.
pub fn utm_zone(lon: f64) -> u8 {
    let zone = ((lon + 180.0) / 6.0).floor() as i32 + 1;
    zone.clamp(1, 60) as u8
}

/// Transverse Mercator projection for one UTM zone on the WGS84 ellipsoid.
#[derive(Debug, Clone)]
pub struct UtmProjection {
    pub zone: u8,
    pub south: bool,
    /// Central meridian in degrees
    central_meridian: f64,
    /// Rectifying radius scaled by k0
    k0_a: f64,
    /// Krüger coefficients alpha_1..alpha_3
    alpha: [f64; 3],
    /// 2√n / (1 + n), used for conformal latitude
    conformal_c: f64,
}

impl UtmProjection {
    pub fn new(zone: u8, south: bool) -> Self {
        let n = WGS84_F / (2.0 - WGS84_F);
        let n2 = n * n;
        let n3 = n2 * n;
        let rectifying_radius = WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0);

        Self {
            zone,
            south,
            central_meridian: f64::from(zone) * 6.0 - 183.0,
            k0_a: UTM_K0 * rectifying_radius,
            alpha: [
                n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3,
                13.0 / 48.0 * n2 - 3.0 / 5.0 * n3,
                61.0 / 240.0 * n3,
            ],
            conformal_c: 2.0 * n.sqrt() / (1.0 + n),
        }
    }

    /// Projection for the zone and hemisphere containing `(lon, lat)`.
    pub fn for_point(lon: f64, lat: f64) -> Self {
        Self::new(utm_zone(lon), lat < 0.0)
    }

    /// Project `(lon, lat)` degrees to `(easting, northing)` meters.
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        let phi = lat.to_radians();
        let lambda = (lon - self.central_meridian).to_radians();

        let sin_phi = phi.sin();
        let c = self.conformal_c;
        let t = (sin_phi.atanh() - c * (c * sin_phi).atanh()).sinh();

        let xi_prime = t.atan2(lambda.cos());
        let eta_prime = (lambda.sin() / (1.0 + t * t).sqrt()).atanh();

        let mut xi = xi_prime;
        let mut eta = eta_prime;
        for (j, alpha_j) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi += alpha_j * (k * xi_prime).sin() * (k * eta_prime).cosh();
            eta += alpha_j * (k * xi_prime).cos() * (k * eta_prime).sinh();
        }

        let false_northing = if self.south {
            UTM_FALSE_NORTHING_SOUTH
        } else {
            0.0
        };
        (
            UTM_FALSE_EASTING + self.k0_a * eta,
            false_northing + self.k0_a * xi,
        )
    }
}

/// Vertices of the ring without the closing duplicate, if the caller repeated
/// the first vertex at the end.
fn open_ring(ring: &[LonLat]) -> &[LonLat] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

/// Number of distinct vertices in the ring.
pub fn distinct_vertex_count(ring: &[LonLat]) -> usize {
    let mut seen: Vec<LonLat> = Vec::with_capacity(ring.len());
    for v in ring {
        if !seen.contains(v) {
            seen.push(*v);
        }
    }
    seen.len()
}

/// Mean of the ring's vertices, excluding a closing duplicate. Longitudes are
/// averaged as given; `compute_area` unwraps them first.
pub fn ring_centroid(ring: &[LonLat]) -> Option<LonLat> {
    let open = open_ring(ring);
    if open.is_empty() {
        return None;
    }
    let count = open.len() as f64;
    let (sum_lon, sum_lat) = open
        .iter()
        .fold((0.0, 0.0), |(lon, lat), v| (lon + v[0], lat + v[1]));
    Some([sum_lon / count, sum_lat / count])
}

/// Longitudes shifted by ±360 so every vertex lies within 180° of the first.
/// Rings crossing the antimeridian become contiguous.
fn unwrap_longitudes(ring: &[LonLat]) -> Vec<LonLat> {
    let Some(first) = ring.first() else {
        return Vec::new();
    };
    ring.iter()
        .map(|&[lon, lat]| {
            let mut lon = lon;
            while lon - first[0] > 180.0 {
                lon -= 360.0;
            }
            while lon - first[0] < -180.0 {
                lon += 360.0;
            }
            [lon, lat]
        })
        .collect()
}

/// Planar area in m² of a `[lon, lat]` ring, projected into the UTM zone of
/// its centroid.
///
/// The ring is closed implicitly. Orientation does not matter. Rings with
/// fewer than 3 vertices, or whose area is negligible against their
/// perimeter (collinear vertices), have area 0.
pub fn compute_area(ring: &[LonLat]) -> f64 {
    let open = unwrap_longitudes(open_ring(ring));
    if open.len() < 3 {
        return 0.0;
    }
    let Some([c_lon, c_lat]) = ring_centroid(&open) else {
        return 0.0;
    };
    let projection = UtmProjection::for_point(c_lon, c_lat);

    let projected: Vec<(f64, f64)> = open
        .iter()
        .map(|v| projection.project(v[0], v[1]))
        .collect();

    // Shift to the first vertex so the products stay small.
    let (x0, y0) = projected[0];
    let local: Vec<(f64, f64)> = projected.iter().map(|(x, y)| (x - x0, y - y0)).collect();

    let (twice_area, perimeter) = local
        .iter()
        .zip(local.iter().cycle().skip(1))
        .fold((0.0, 0.0), |(twice, perim), ((x1, y1), (x2, y2))| {
            (twice + x1 * y2 - x2 * y1, perim + (x2 - x1).hypot(y2 - y1))
        });

    let area = twice_area.abs() / 2.0;
    // Straight lines in lon/lat bend slightly under the projection.
    if area <= DEGENERATE_AREA_RATIO * perimeter * perimeter {
        return 0.0;
    }
    area
}

/// Area of a roof ring, rejecting rings with no usable area.
pub fn roof_area(ring: &[LonLat]) -> Result<f64, GeometryError> {
    let area_m2 = compute_area(ring);
    if !area_m2.is_finite() || area_m2 <= 0.0 {
        return Err(GeometryError::Degenerate { area_m2 });
    }
    Ok(area_m2)
}
