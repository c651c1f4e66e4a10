//! Reprojection légère en Rust pur (sans dépendances externes)
//!
//! Supporte les systèmes des cartes cadastrales japonaises :
//! - Système plan rectangulaire, zones I à XIX
//!   - JGD2000 (EPSG:2443 à 2461)
//!   - JGD2011 (EPSG:6669 à 6687)
//! - UTM 51N à 55N : JGD2000 (EPSG:3097 à 3101), JGD2011 (EPSG:6688 à 6692)
//! - UTM WGS84 (EPSG:32601 à 32660, 32701 à 32760)
//! - Géographique JGD2000 / JGD2011 (EPSG:4612, 6668)
//!
//! Cible supportée : WGS84 (EPSG:4326). JGD2000 et JGD2011 sont assimilés à
//! WGS84 (écart inférieur au mètre, sans importance pour l'affichage KML).

mod ellipsoid;
mod transverse_mercator;
mod wgs84;

pub use ellipsoid::{Ellipsoid, GRS80, WGS84};
pub use transverse_mercator::TransverseMercator;
pub use wgs84::{ToWgs84, KML_EPSG};

use anyhow::{bail, Result};
use geo::{Coord, Geometry, MapCoords};

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }
}

/// Origines des 19 zones du système plan rectangulaire (latitude, longitude en degrés)
const PLANE_RECTANGULAR_ORIGINS: [(f64, f64); 19] = [
    (33.0, 129.5),                // I
    (33.0, 131.0),                // II
    (36.0, 132.0 + 10.0 / 60.0),  // III
    (33.0, 133.5),                // IV
    (36.0, 134.0 + 20.0 / 60.0),  // V
    (36.0, 136.0),                // VI
    (36.0, 137.0 + 10.0 / 60.0),  // VII
    (36.0, 138.5),                // VIII
    (36.0, 139.0 + 50.0 / 60.0),  // IX
    (40.0, 140.0 + 50.0 / 60.0),  // X
    (44.0, 140.25),               // XI
    (44.0, 142.25),               // XII
    (44.0, 144.25),               // XIII
    (26.0, 142.0),                // XIV
    (26.0, 127.5),                // XV
    (26.0, 124.0),                // XVI
    (26.0, 131.0),                // XVII
    (20.0, 136.0),                // XVIII
    (26.0, 154.0),                // XIX
];

/// Système source résolu depuis un code EPSG
#[derive(Debug, Clone, Copy)]
enum Source {
    /// Degrés, datum assimilé à WGS84
    Geographic,
    Projected(TransverseMercator),
}

impl Source {
    fn from_epsg(epsg: u32) -> Option<Self> {
        let source = match epsg {
            4612 | 6668 => Self::Geographic,
            2443..=2461 => Self::plane_rectangular(epsg - 2443),
            6669..=6687 => Self::plane_rectangular(epsg - 6669),
            3097..=3101 => Self::Projected(TransverseMercator::utm(epsg - 3097 + 51, false, GRS80)),
            6688..=6692 => Self::Projected(TransverseMercator::utm(epsg - 6688 + 51, false, GRS80)),
            32601..=32660 => Self::Projected(TransverseMercator::utm(epsg - 32600, false, WGS84)),
            32701..=32760 => Self::Projected(TransverseMercator::utm(epsg - 32700, true, WGS84)),
            _ => return None,
        };
        Some(source)
    }

    fn plane_rectangular(zone_index: u32) -> Self {
        let (lat0, lon0) = PLANE_RECTANGULAR_ORIGINS[zone_index as usize];
        Self::Projected(TransverseMercator::plane_rectangular(lat0, lon0, GRS80))
    }
}

/// Reprojection légère vers WGS84
#[derive(Debug, Clone, Copy)]
pub struct ReprojectorLite {
    source: Source,
}

impl ReprojectorLite {
    /// Crée un nouveau reprojector
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        if !Self::is_supported_target(target_epsg) {
            bail!(
                "EPSG:{} not supported as target. Supported targets: 4326",
                target_epsg
            );
        }
        let Some(source) = Source::from_epsg(source_epsg) else {
            bail!(
                "EPSG:{} not supported. Supported sources: 2443-2461, 6669-6687 \
                 (plane rectangular), 3097-3101, 6688-6692, 326xx, 327xx (UTM), 4612, 6668",
                source_epsg
            );
        };

        Ok(Self { source })
    }

    /// Vérifie si l'EPSG source est supporté
    pub fn is_supported_source(epsg: u32) -> bool {
        Source::from_epsg(epsg).is_some()
    }

    /// Vérifie si l'EPSG cible est supporté
    pub fn is_supported_target(epsg: u32) -> bool {
        epsg == 4326
    }

    /// Vérifie si la reprojection est supportée
    pub fn is_supported(source: u32, target: u32) -> bool {
        Self::is_supported_source(source) && Self::is_supported_target(target)
    }

    /// Transforme un point (x, y) de la source vers (lon, lat) en degrés
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match self.source {
            Source::Geographic => Ok((x, y)),
            Source::Projected(tm) => Ok(tm.to_geographic(x, y)?.to_degrees()),
        }
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        geom.try_map_coords(|c| {
            let (x, y) = self.transform_point(c.x, c.y)?;
            Ok(Coord { x, y })
        })
    }
}
