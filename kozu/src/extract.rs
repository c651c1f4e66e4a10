//! Extraction d'une parcelle cible et de ses parcelles voisines
//!
//! 1. Filtre attributaire sur la clé de localisation et le numéro de lot
//! 2. Enveloppe carrée centrée sur le centroïde de la première cible
//! 3. Intersection de l'enveloppe avec toutes les parcelles valides

use geo::{
    BooleanOps, BoundingRect, Centroid, ConvexHull, Geometry, Intersects, MultiPoint,
    MultiPolygon, Point, Polygon, Rect,
};
use tracing::{debug, info, warn};

use crate::types::{Crs, LocationKey, ParcelDataset, ParcelRecord, Schema};
use crate::KozuError;

/// Demi-largeur par défaut de l'enveloppe, en unités du CRS
pub const DEFAULT_RADIUS: f64 = 61.0;

/// Message quand aucune parcelle ne correspond
pub const NO_MATCH_MESSAGE: &str = "no matching parcel found";

/// Zone de recherche carrée, alignée sur les axes du CRS natif
#[derive(Debug, Clone, PartialEq)]
pub struct SearchEnvelope {
    pub center: Point,
    pub radius: f64,
    pub polygon: Polygon,
    pub crs: Crs,
}

impl SearchEnvelope {
    /// Construit l'enveloppe : enveloppe convexe des quatre coins (x0 ± r, y0 ± r)
    pub fn around(center: Point, radius: f64, crs: Crs) -> Self {
        let (x0, y0) = center.x_y();

        let polygon = if radius > 0.0 {
            let corners = MultiPoint::from(vec![
                (x0 + radius, y0 + radius),
                (x0 - radius, y0 - radius),
                (x0 - radius, y0 + radius),
                (x0 + radius, y0 - radius),
            ]);
            corners.convex_hull()
        } else {
            // Rayon nul : enveloppe dégénérée, aucune intersection d'aire non nulle
            Rect::new(center.0, center.0).to_polygon()
        };

        Self {
            center,
            radius,
            polygon,
            crs,
        }
    }
}

/// Résultat d'une extraction réussie
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// Parcelles correspondant exactement à la clé et au numéro de lot
    pub targets: ParcelDataset,

    /// Parcelles découpées par l'enveloppe
    pub neighbors: ParcelDataset,

    pub envelope: SearchEnvelope,
}

impl ExtractionResult {
    pub fn message(&self) -> String {
        format!(
            "target: {}, neighbors: {}",
            self.targets.len(),
            self.neighbors.len()
        )
    }
}

/// Issue d'une demande d'extraction
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    Found(ExtractionResult),
    /// Aucune parcelle ne correspond (résultat valide, pas une erreur)
    NoMatch,
    /// Erreur de géométrie ou de paramètre, décrite
    Failed(String),
}

impl Extraction {
    /// Message d'état à afficher
    pub fn message(&self) -> String {
        match self {
            Self::Found(result) => result.message(),
            Self::NoMatch => NO_MATCH_MESSAGE.to_string(),
            Self::Failed(reason) => format!("error: {}", reason),
        }
    }

    pub fn result(&self) -> Option<&ExtractionResult> {
        match self {
            Self::Found(result) => Some(result),
            _ => None,
        }
    }

    pub fn into_result(self) -> Option<ExtractionResult> {
        match self {
            Self::Found(result) => Some(result),
            _ => None,
        }
    }
}

/// Extrait la parcelle cible et ses voisines.
///
/// Ne retourne jamais d'erreur : les cas « aucune correspondance » et
/// « erreur » sont portés par [`Extraction`].
pub fn extract(
    dataset: &ParcelDataset,
    key: &LocationKey,
    lot_number: &str,
    radius: f64,
) -> Extraction {
    match try_extract(dataset, key, lot_number, radius) {
        Ok(Some(result)) => {
            info!(
                district = %key.district,
                lot = lot_number,
                targets = result.targets.len(),
                neighbors = result.neighbors.len(),
                "Extraction complete"
            );
            Extraction::Found(result)
        }
        Ok(None) => {
            info!(district = %key.district, lot = lot_number, "No matching parcel");
            Extraction::NoMatch
        }
        Err(e) => {
            warn!(district = %key.district, lot = lot_number, "Extraction failed: {}", e);
            Extraction::Failed(e.to_string())
        }
    }
}

fn try_extract(
    dataset: &ParcelDataset,
    key: &LocationKey,
    lot_number: &str,
    radius: f64,
) -> Result<Option<ExtractionResult>, KozuError> {
    if !radius.is_finite() || radius < 0.0 {
        return Err(KozuError::InvalidParameter(format!(
            "radius must be a finite, non-negative number (got {})",
            radius
        )));
    }

    let predicate = TargetPredicate::new(&dataset.schema, key, lot_number);
    let matches: Vec<(usize, &ParcelRecord)> = dataset
        .iter()
        .enumerate()
        .filter(|(_, r)| predicate.matches(r))
        .collect();

    let Some(&(first_row, first)) = matches.first() else {
        return Ok(None);
    };

    if matches.len() > 1 {
        debug!(
            count = matches.len(),
            "Several parcels match, centring the envelope on the first one"
        );
    }

    let center = first
        .geometry
        .as_ref()
        .and_then(|g| g.centroid())
        .ok_or_else(|| KozuError::invalid_geometry(first_row, "target parcel has no centroid"))?;

    if dataset.crs.is_geographic() {
        warn!(
            crs = %dataset.crs,
            radius,
            "Dataset uses geographic coordinates, the radius is interpreted in degrees"
        );
    }

    let envelope = SearchEnvelope::around(center, radius, dataset.crs);
    debug!(x = center.x(), y = center.y(), radius, "Search envelope");

    let targets = dataset.subset(
        matches
            .iter()
            .map(|(_, r)| r.projected(r.geometry.clone()))
            .collect(),
    );
    let neighbors = dataset.subset(overlay(dataset, &envelope.polygon));

    Ok(Some(ExtractionResult {
        targets,
        neighbors,
        envelope,
    }))
}

/// Prédicat de sélection des parcelles cibles
struct TargetPredicate<'a> {
    district: &'a str,
    lot_number: &'a str,
    sub_district: Option<&'a str>,
    sub_sub_district: Option<&'a str>,
}

impl<'a> TargetPredicate<'a> {
    /// Les niveaux optionnels ne filtrent que s'ils sont sélectionnés
    /// et présents dans le schéma
    fn new(schema: &Schema, key: &'a LocationKey, lot_number: &'a str) -> Self {
        Self {
            district: &key.district,
            lot_number,
            sub_district: key
                .sub_district
                .value()
                .filter(|_| schema.sub_district.is_some()),
            sub_sub_district: key
                .sub_sub_district
                .value()
                .filter(|_| schema.sub_sub_district.is_some()),
        }
    }

    fn matches(&self, record: &ParcelRecord) -> bool {
        record.district.as_deref() == Some(self.district)
            && record.lot_number.as_deref() == Some(self.lot_number)
            && self
                .sub_district
                .map_or(true, |v| record.sub_district.as_deref() == Some(v))
            && self
                .sub_sub_district
                .map_or(true, |v| record.sub_sub_district.as_deref() == Some(v))
    }
}

/// Intersection de l'enveloppe avec l'univers valide
/// (numéro de lot et géométrie non nuls), dans l'ordre du jeu de données
fn overlay(dataset: &ParcelDataset, envelope: &Polygon) -> Vec<ParcelRecord> {
    let Some(envelope_rect) = envelope.bounding_rect() else {
        return Vec::new();
    };

    dataset
        .iter()
        .filter(|r| r.lot_number.is_some())
        .filter_map(|r| {
            let geometry = r.geometry.as_ref()?;
            let rect = geometry.bounding_rect()?;
            if !rect.intersects(&envelope_rect) {
                return None;
            }
            let clipped = clip(geometry, envelope)?;
            Some(r.projected(Some(clipped)))
        })
        .collect()
}

/// Découpe une géométrie polygonale ; None si l'intersection est vide
/// ou réduite à un contact (aire nulle)
fn clip(geometry: &Geometry, envelope: &Polygon) -> Option<Geometry> {
    use geo::Area;

    let clipped: MultiPolygon = match geometry {
        Geometry::Polygon(p) => p.intersection(envelope),
        Geometry::MultiPolygon(mp) => mp.intersection(envelope),
        _ => return None,
    };

    let mut parts: Vec<Polygon> = clipped
        .0
        .into_iter()
        .filter(|p| p.unsigned_area() > 0.0)
        .collect();

    match parts.len() {
        0 => None,
        1 => parts.pop().map(Geometry::Polygon),
        _ => Some(Geometry::MultiPolygon(MultiPolygon::new(parts))),
    }
}
