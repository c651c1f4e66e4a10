//! Projection Transverse Mercator (inverse)
//!
//! Sert pour les 19 zones du système de coordonnées planes rectangulaires
//! japonais (平面直角座標系) et pour les zones UTM.

use super::ellipsoid::Ellipsoid;
use super::Geographic;
use anyhow::{ensure, Result};

/// Paramètres d'une projection Transverse Mercator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransverseMercator {
    pub ellipsoid: Ellipsoid,
    /// Latitude origine (radians)
    pub lat0: f64,
    /// Méridien central (radians)
    pub lon0: f64,
    /// Facteur d'échelle sur le méridien central
    pub k0: f64,
    /// False easting
    pub x0: f64,
    /// False northing
    pub y0: f64,
}

impl TransverseMercator {
    /// Zone du système plan rectangulaire japonais (échelle 0.9999, pas de false easting)
    pub fn plane_rectangular(lat0_deg: f64, lon0_deg: f64, ellipsoid: Ellipsoid) -> Self {
        Self {
            ellipsoid,
            lat0: lat0_deg.to_radians(),
            lon0: lon0_deg.to_radians(),
            k0: 0.9999,
            x0: 0.0,
            y0: 0.0,
        }
    }

    /// Zone UTM (1..=60)
    pub fn utm(zone: u32, south: bool, ellipsoid: Ellipsoid) -> Self {
        Self {
            ellipsoid,
            lat0: 0.0,
            lon0: ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians(),
            k0: 0.9996,
            x0: 500000.0,
            y0: if south { 10000000.0 } else { 0.0 },
        }
    }

    /// Convertit (easting, northing) vers coordonnées géographiques
    pub fn to_geographic(&self, x: f64, y: f64) -> Result<Geographic> {
        ensure!(
            x.is_finite() && y.is_finite(),
            "Non-finite coordinate ({}, {})",
            x,
            y
        );

        let a = self.ellipsoid.a;
        let e2 = self.ellipsoid.e2();
        let ep2 = self.ellipsoid.ep2();
        let k0 = self.k0;

        // Coordonnées réduites
        let x = x - self.x0;
        let y = y - self.y0;

        // Calcul du footprint latitude
        let m = self.ellipsoid.meridian_arc(self.lat0) + y / k0;
        let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));

        // Coefficients pour la série
        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        let sin_phi1 = phi1.sin();
        let cos_phi1 = phi1.cos();
        let tan_phi1 = phi1.tan();

        let n1 = a / (1.0 - e2 * sin_phi1.powi(2)).sqrt();
        let t1 = tan_phi1.powi(2);
        let c1 = ep2 * cos_phi1.powi(2);
        let r1 = a * (1.0 - e2) / (1.0 - e2 * sin_phi1.powi(2)).powf(1.5);
        let d = x / (n1 * k0);

        let lat = phi1
            - (n1 * tan_phi1 / r1)
                * (d.powi(2) / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1.powi(2) - 9.0 * ep2) * d.powi(4)
                        / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1.powi(2)
                        - 252.0 * ep2
                        - 3.0 * c1.powi(2))
                        * d.powi(6)
                        / 720.0);

        let lon = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1.powi(2) + 8.0 * ep2
                    + 24.0 * t1.powi(2))
                    * d.powi(5)
                    / 120.0)
                / cos_phi1;

        Ok(Geographic::new(lon, lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reproject_lite::ellipsoid::{GRS80, WGS84};

    #[test]
    fn test_zone_origin() {
        // Zone IX : origine 36°N, 139°50'E
        let tm = TransverseMercator::plane_rectangular(36.0, 139.0 + 50.0 / 60.0, GRS80);
        let (lon, lat) = tm.to_geographic(0.0, 0.0).unwrap().to_degrees();

        assert!((lon - 139.833333).abs() < 1e-6, "lon={}", lon);
        assert!((lat - 36.0).abs() < 1e-6, "lat={}", lat);
    }

    #[test]
    fn test_tokyo_station() {
        // Gare de Tokyo en zone IX : environ E -5994, N -35362
        let tm = TransverseMercator::plane_rectangular(36.0, 139.0 + 50.0 / 60.0, GRS80);
        let (lon, lat) = tm.to_geographic(-5994.0, -35362.0).unwrap().to_degrees();

        // 139.7671°E, 35.6812°N
        assert!((lon - 139.7671).abs() < 0.005, "lon={}", lon);
        assert!((lat - 35.6812).abs() < 0.005, "lat={}", lat);
    }

    #[test]
    fn test_utm_martinique() {
        // Fort-de-France, UTM Zone 20N: 708000, 1615000
        let tm = TransverseMercator::utm(20, false, WGS84);
        let (lon, lat) = tm.to_geographic(708000.0, 1615000.0).unwrap().to_degrees();

        assert!((lon - (-61.07)).abs() < 0.2, "lon={}", lon);
        assert!((lat - 14.60).abs() < 0.2, "lat={}", lat);
    }

    #[test]
    fn test_non_finite() {
        let tm = TransverseMercator::utm(54, false, GRS80);
        assert!(tm.to_geographic(f64::NAN, 0.0).is_err());
    }
}
