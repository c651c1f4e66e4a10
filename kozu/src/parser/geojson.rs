//! Parser GeoJSON → `ParcelDataset`

use std::collections::HashMap;

use geo::Geometry;
use geojson::{Feature, GeoJson, JsonObject, JsonValue};
use tracing::{debug, warn};

use crate::parser::decode::decode;
use crate::parser::Layout;
use crate::types::{Crs, LoadOptions, ParcelDataset};
use crate::KozuError;

/// Parse un document GeoJSON (FeatureCollection ou Feature)
///
/// # Arguments
///
/// * `content` - Octets bruts du fichier
/// * `file` - Nom du fichier, pour les messages d'erreur
/// * `options` - Correspondance des colonnes, encodage, CRS forcé
///
/// # Errors
///
/// `ParseError` si le document est invalide, `MissingColumn` si la colonne
/// district ou numéro de lot n'apparaît dans aucune feature.
pub fn parse(
    content: &[u8],
    file: &str,
    options: &LoadOptions,
) -> Result<ParcelDataset, KozuError> {
    let text = decode(content, options.fallback_encoding);

    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| KozuError::parse_error(file, e.to_string()))?;

    let (features, foreign_members) = match geojson {
        GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
        GeoJson::Feature(feature) => (vec![feature], None),
        GeoJson::Geometry(_) => {
            return Err(KozuError::parse_error(
                file,
                "expected a FeatureCollection, found a bare Geometry",
            ))
        }
    };

    let crs = options
        .crs_override
        .map(Crs::new)
        .or_else(|| declared_crs(foreign_members.as_ref()))
        .unwrap_or_default();

    let property_names = collect_property_names(&features);
    let layout = Layout::resolve(&property_names, options)?;

    let mut records = Vec::with_capacity(features.len());
    let mut skipped = 0;
    let mut null_geometries = 0;

    for (row, feature) in features.into_iter().enumerate() {
        let geometry = match convert_geometry(&feature) {
            Ok(Some(geometry)) => Some(geometry),
            Ok(None) => {
                null_geometries += 1;
                None
            }
            Err(reason) => {
                warn!(row, reason = %reason, "Skipping feature");
                skipped += 1;
                continue;
            }
        };

        let props = feature.properties.as_ref();
        let value = |idx: usize| -> Option<String> {
            let value = props?.get(property_names.get(idx)?)?;
            value_to_string(value)
        };

        records.push(layout.record(value, geometry));
    }

    debug!(
        file,
        records = records.len(),
        skipped,
        null_geometries,
        crs = %crs,
        "Parsed GeoJSON"
    );

    Ok(ParcelDataset {
        crs,
        schema: layout.schema,
        columns: layout.columns,
        extra_columns: layout.extra_columns,
        records,
        skipped_features: skipped,
    })
}

/// Lit le membre legacy `crs` : `{"type":"name","properties":{"name":"EPSG:6677"}}`
fn declared_crs(foreign_members: Option<&JsonObject>) -> Option<Crs> {
    let name = foreign_members?
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;

    let crs = Crs::from_name(name);
    if crs.is_none() {
        warn!(name, "Unrecognised CRS name, assuming EPSG:4326");
    }
    crs
}

/// Noms des propriétés dans l'ordre de première apparition
fn collect_property_names(features: &[Feature]) -> Vec<String> {
    let mut seen: HashMap<&str, ()> = HashMap::new();
    let mut names = Vec::new();

    for props in features.iter().filter_map(|f| f.properties.as_ref()) {
        for key in props.keys() {
            if seen.insert(key.as_str(), ()).is_none() {
                names.push(key.clone());
            }
        }
    }

    names
}

/// Convertit la géométrie ; seuls Polygon et MultiPolygon sont acceptés
fn convert_geometry(feature: &Feature) -> Result<Option<Geometry>, String> {
    let Some(ref geometry) = feature.geometry else {
        return Ok(None);
    };

    let geometry: Geometry = Geometry::try_from(geometry.value.clone()).map_err(|e| e.to_string())?;

    match geometry {
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => Ok(Some(geometry)),
        other => Err(format!("unsupported geometry type {}", geometry_type_name(&other))),
    }
}

/// Nom du type de géométrie (pour les messages)
pub fn geometry_type_name(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

/// Valeur de propriété en texte ; `null` → None
fn value_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::Null => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnMapping;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::6677"}},
        "features": [
            {"type": "Feature",
             "properties": {"大字名": "旭", "地番": "1174", "面積": 120.5},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
            {"type": "Feature",
             "properties": {"大字名": "旭", "小字名": "東", "地番": 1175, "面積": null},
             "geometry": {"type": "Polygon", "coordinates": [[[10,0],[20,0],[20,10],[10,10],[10,0]]]}},
            {"type": "Feature",
             "properties": {"大字名": "旭", "地番": "1176"},
             "geometry": {"type": "Point", "coordinates": [5, 5]}},
            {"type": "Feature",
             "properties": {"大字名": "旭", "地番": "1177"},
             "geometry": null}
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let dataset = parse(SAMPLE.as_bytes(), "sample.geojson", &LoadOptions::default()).unwrap();

        assert_eq!(dataset.crs, Crs::new(6677));
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.skipped_features, 1);

        // 丁目名 absent partout, 小字名 présent sur une feature
        assert_eq!(dataset.schema.sub_district, None);
        assert_eq!(dataset.schema.sub_sub_district.as_deref(), Some("小字名"));

        assert_eq!(
            dataset.column_names(),
            vec!["大字名", "地番", "面積", "小字名"]
        );

        let second = &dataset.records[1];
        assert_eq!(second.lot_number.as_deref(), Some("1175"));
        assert_eq!(second.sub_sub_district.as_deref(), Some("東"));
        assert_eq!(second.extras, vec![None]);

        assert_eq!(dataset.records[0].extras, vec![Some("120.5".to_string())]);
        assert!(dataset.records[2].geometry.is_none());
    }

    #[test]
    fn test_missing_lot_column() {
        let options = LoadOptions {
            mapping: ColumnMapping {
                lot_number: "chiban".into(),
                ..ColumnMapping::default()
            },
            ..LoadOptions::default()
        };

        let result = parse(SAMPLE.as_bytes(), "sample.geojson", &options);
        assert!(matches!(
            result,
            Err(KozuError::MissingColumn { role: "lot number", .. })
        ));
    }

    #[test]
    fn test_crs_override_and_default() {
        let options = LoadOptions {
            crs_override: Some(2451),
            ..LoadOptions::default()
        };
        let dataset = parse(SAMPLE.as_bytes(), "sample.geojson", &options).unwrap();
        assert_eq!(dataset.crs, Crs::new(2451));

        let bare = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"大字名":"旭","地番":"1"},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}]}"#;
        let dataset = parse(bare.as_bytes(), "bare.geojson", &LoadOptions::default()).unwrap();
        assert_eq!(dataset.crs, Crs::WGS84);
    }

    #[test]
    fn test_invalid_json() {
        let result = parse(b"{not json", "broken.geojson", &LoadOptions::default());
        assert!(matches!(result, Err(KozuError::ParseError { .. })));
    }
}
