//! Reprojection de géométries avec PROJ
//!
//! Ce module est disponible uniquement avec le feature `reproject`.

use anyhow::{Context, Result};
use geo::{Coord, Geometry, MapCoords};
use proj::Proj;

/// Reprojection de géométries entre deux systèmes de coordonnées
pub struct Reprojector {
    proj: Proj,
}

impl Reprojector {
    /// Crée un nouveau reprojector entre deux EPSG
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        let source = format!("EPSG:{}", source_epsg);
        let target = format!("EPSG:{}", target_epsg);

        // new_known_crs normalise l'ordre des axes (lon, lat) pour EPSG:4326
        let proj = Proj::new_known_crs(&source, &target, None).context(format!(
            "Failed to create projection from {} to {}",
            source, target
        ))?;

        Ok(Self { proj })
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Result<Geometry> {
        geom.try_map_coords(|c| {
            let (x, y) = self
                .proj
                .convert((c.x, c.y))
                .context("Coordinate transformation failed")?;
            Ok(Coord { x, y })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;

    #[test]
    fn test_tokyo_datum_to_wgs84() {
        // Gare de Tokyo en Tokyo Datum zone IX (hors reproject_lite)
        let reprojector = Reprojector::new(30169, 4326).unwrap();

        let station = Geometry::Point(Point::new(-6290.0, -35720.0));
        let Geometry::Point(p) = reprojector.transform_geometry(&station).unwrap() else {
            panic!("Expected Point geometry");
        };

        assert!(p.x() > 139.7 && p.x() < 139.8, "lon={}", p.x());
        assert!(p.y() > 35.6 && p.y() < 35.7, "lat={}", p.y());
    }

    #[test]
    fn test_invalid_epsg() {
        assert!(Reprojector::new(99999, 4326).is_err());
    }
}
