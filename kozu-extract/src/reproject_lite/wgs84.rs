//! Passage en longitude / latitude WGS84 pour l'export KML

use anyhow::Result;
use geo::Geometry;
use kozu::Crs;

use super::ReprojectorLite;

/// KML n'accepte que des coordonnées EPSG:4326
pub const KML_EPSG: u32 = 4326;

/// Transformation d'un CRS source vers les coordonnées KML
pub enum ToWgs84 {
    /// Source déjà en WGS84
    Unchanged,
    /// Zones plan rectangulaire, UTM, JGD géographique
    Lite(ReprojectorLite),
    #[cfg(feature = "reproject")]
    Proj(crate::export::reproject::Reprojector),
}

impl ToWgs84 {
    /// Choisit la transformation pour `crs`.
    ///
    /// Les CRS japonais courants et l'UTM sont convertis en Rust pur ; les
    /// autres passent par PROJ quand le feature `reproject` est activé.
    pub fn from_crs(crs: Crs) -> Result<Self> {
        if crs == Crs::WGS84 {
            return Ok(Self::Unchanged);
        }

        if ReprojectorLite::is_supported_source(crs.epsg) {
            return Ok(Self::Lite(ReprojectorLite::new(crs.epsg, KML_EPSG)?));
        }

        #[cfg(feature = "reproject")]
        {
            let proj = crate::export::reproject::Reprojector::new(crs.epsg, KML_EPSG)?;
            return Ok(Self::Proj(proj));
        }

        #[cfg(not(feature = "reproject"))]
        anyhow::bail!(
            "KML needs WGS84 longitude/latitude and {} has no built-in conversion.\n\
             Built-in sources: 2443-2461 / 6669-6687 (plane rectangular), \
             3097-3101 / 6688-6692 / 326xx / 327xx (UTM), 4612 / 6668 (JGD).\n\
             Rebuild with `--features reproject` to convert it with PROJ.",
            crs
        );
    }

    /// Applique la transformation à une géométrie
    pub fn apply(&self, geometry: &Geometry) -> Result<Geometry> {
        match self {
            Self::Unchanged => Ok(geometry.clone()),
            Self::Lite(lite) => lite.transform_geometry(geometry),
            #[cfg(feature = "reproject")]
            Self::Proj(proj) => proj.transform_geometry(geometry),
        }
    }
}
