//! Transverse Mercator projection on the WGS84 ellipsoid
//!
//! Krüger series to third order in the third flattening `n`, accurate to well
//! under a millimetre within a few thousand kilometres of the central
//! meridian. Used only to build metric buffers around points.

use serde::{Deserialize, Serialize};

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const UTM_K0: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Planar coordinate system used when buffering a point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BufferProjection {
    /// Transverse Mercator centred on the point's own meridian (scale 1)
    #[default]
    LocalTransverseMercator,
    /// A fixed UTM zone, e.g. zone 34 north (EPSG:32634)
    Utm { zone: u8, north: bool },
}

impl BufferProjection {
    /// The legacy fixed projection (EPSG:32634)
    pub const LEGACY: BufferProjection = BufferProjection::Utm {
        zone: 34,
        north: true,
    };

    /// Resolve to concrete projection parameters for a point at `lon`
    pub fn for_longitude(&self, lon: f64) -> TransverseMercator {
        match *self {
            BufferProjection::LocalTransverseMercator => TransverseMercator {
                central_meridian: lon,
                scale: 1.0,
                false_easting: 0.0,
                false_northing: 0.0,
            },
            BufferProjection::Utm { zone, north } => TransverseMercator {
                central_meridian: f64::from(zone) * 6.0 - 183.0,
                scale: UTM_K0,
                false_easting: UTM_FALSE_EASTING,
                false_northing: if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH },
            },
        }
    }
}

/// Concrete transverse Mercator parameters (degrees / metres)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    pub central_meridian: f64,
    pub scale: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

struct Series {
    n: f64,
    big_a: f64,
    alpha: [f64; 3],
    beta: [f64; 3],
    delta: [f64; 3],
}

fn series() -> Series {
    let n = WGS84_F / (2.0 - WGS84_F);
    let n2 = n * n;
    let n3 = n2 * n;
    Series {
        n,
        big_a: WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n2 * n2 / 64.0),
        alpha: [
            n / 2.0 - 2.0 * n2 / 3.0 + 5.0 * n3 / 16.0,
            13.0 * n2 / 48.0 - 3.0 * n3 / 5.0,
            61.0 * n3 / 240.0,
        ],
        beta: [
            n / 2.0 - 2.0 * n2 / 3.0 + 37.0 * n3 / 96.0,
            n2 / 48.0 + n3 / 15.0,
            17.0 * n3 / 480.0,
        ],
        delta: [
            2.0 * n - 2.0 * n2 / 3.0 - 2.0 * n3,
            7.0 * n2 / 3.0 - 8.0 * n3 / 5.0,
            56.0 * n3 / 15.0,
        ],
    }
}

impl TransverseMercator {
    /// Geographic (lon, lat) degrees → projected (easting, northing) metres
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        let s = series();
        let phi = lat.to_radians();
        let dlambda = (lon - self.central_meridian).to_radians();
        let c = 2.0 * s.n.sqrt() / (1.0 + s.n);

        let t = (phi.sin().atanh() - c * (c * phi.sin()).atanh()).sinh();
        let xi_p = t.atan2(dlambda.cos());
        let eta_p = (dlambda.sin() / (1.0 + t * t).sqrt()).atanh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, a) in s.alpha.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi += a * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += a * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        let k0a = self.scale * s.big_a;
        (self.false_easting + k0a * eta, self.false_northing + k0a * xi)
    }

    /// Projected (easting, northing) metres → geographic (lon, lat) degrees
    pub fn inverse(&self, easting: f64, northing: f64) -> (f64, f64) {
        let s = series();
        let k0a = self.scale * s.big_a;
        let xi = (northing - self.false_northing) / k0a;
        let eta = (easting - self.false_easting) / k0a;

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, b) in s.beta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            xi_p -= b * (k * xi).sin() * (k * eta).cosh();
            eta_p -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let chi = (xi_p.sin() / eta_p.cosh()).asin();
        let mut phi = chi;
        for (j, d) in s.delta.iter().enumerate() {
            let k = 2.0 * (j as f64 + 1.0);
            phi += d * (k * chi).sin();
        }
        let dlambda = eta_p.sinh().atan2(xi_p.cos());

        (self.central_meridian + dlambda.to_degrees(), phi.to_degrees())
    }
}
