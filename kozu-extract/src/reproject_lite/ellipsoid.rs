//! Définitions des ellipsoïdes

/// Paramètres d'un ellipsoïde de référence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    /// Demi-grand axe (rayon équatorial) en mètres
    pub a: f64,

    /// Aplatissement
    pub f: f64,
}

impl Ellipsoid {
    /// Première excentricité au carré
    pub fn e2(&self) -> f64 {
        2.0 * self.f - self.f * self.f
    }

    /// Deuxième excentricité au carré
    pub fn ep2(&self) -> f64 {
        let e2 = self.e2();
        e2 / (1.0 - e2)
    }

    /// Longueur de l'arc de méridien depuis l'équateur jusqu'à `lat` (radians)
    pub fn meridian_arc(&self, lat: f64) -> f64 {
        let e2 = self.e2();
        let e4 = e2 * e2;
        let e6 = e4 * e2;

        self.a
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
    }
}

/// Ellipsoïde WGS84
pub const WGS84: Ellipsoid = Ellipsoid {
    a: 6378137.0,
    f: 1.0 / 298.257223563,
};

/// Ellipsoïde GRS80 (JGD2000 / JGD2011)
/// Note: Quasi identique à WGS84, différence < 0.1mm
pub const GRS80: Ellipsoid = Ellipsoid {
    a: 6378137.0,
    f: 1.0 / 298.257222101,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meridian_arc() {
        assert_eq!(GRS80.meridian_arc(0.0), 0.0);
        // Quart de méridien ≈ 10 001 966 m
        let quarter = GRS80.meridian_arc(std::f64::consts::FRAC_PI_2);
        assert!((quarter - 10_001_965.7).abs() < 1.0, "quarter={}", quarter);
    }
}
