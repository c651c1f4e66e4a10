//! Parser Shapefile (.shp + .dbf) → `ParcelDataset`
//!
//! Le `.prj` donne le CRS et le `.cpg` l'encodage des attributs. Sans `.cpg`,
//! la table est lue en UTF-8 si elle en est, avec l'encodage de repli sinon.

use std::io::Cursor;

use dbase::encoding::EncodingRs;
use dbase::FieldValue;
use encoding_rs::Encoding;
use geo::Geometry;
use shapefile::{Shape, ShapeReader};
use tracing::{debug, warn};

use crate::archive::ShapefileSet;
use crate::parser::decode::decode;
use crate::parser::prj::crs_from_prj;
use crate::parser::Layout;
use crate::types::{Crs, LoadOptions, ParcelDataset};
use crate::KozuError;

/// Parse une couche Shapefile
///
/// # Errors
///
/// `ParseError` si le `.shp` ou le `.dbf` est illisible ou si leurs nombres
/// d'enregistrements diffèrent, `MissingColumn` comme pour le GeoJSON.
pub fn parse(set: &ShapefileSet, options: &LoadOptions) -> Result<ParcelDataset, KozuError> {
    let file = set.name.as_str();

    let crs = options
        .crs_override
        .map(Crs::new)
        .or_else(|| {
            let prj = set.prj.as_deref()?;
            crs_from_prj(&decode(prj, encoding_rs::UTF_8))
        })
        .unwrap_or_default();

    let shapes = ShapeReader::new(Cursor::new(set.shp.as_slice()))
        .and_then(|reader| reader.read())
        .map_err(|e| KozuError::parse_error(file, e.to_string()))?;

    let encoding = dbf_encoding(set, options.fallback_encoding);
    let mut table = dbase::Reader::new_with_encoding(
        Cursor::new(set.dbf.as_slice()),
        EncodingRs::from(encoding),
    )
    .map_err(|e| KozuError::parse_error(file, e.to_string()))?;

    let field_names: Vec<String> = table
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .filter(|name| name != "DeletionFlag")
        .collect();
    let layout = Layout::resolve(&field_names, options)?;

    let rows = table
        .read()
        .map_err(|e| KozuError::parse_error(file, e.to_string()))?;

    if rows.len() != shapes.len() {
        return Err(KozuError::parse_error(
            file,
            format!("{} shapes but {} attribute rows", shapes.len(), rows.len()),
        ));
    }

    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = 0;
    let mut null_geometries = 0;

    for (row, (shape, attributes)) in shapes.into_iter().zip(rows).enumerate() {
        let geometry = match convert_shape(shape) {
            Ok(Some(geometry)) => Some(geometry),
            Ok(None) => {
                null_geometries += 1;
                None
            }
            Err(reason) => {
                warn!(row, reason = %reason, "Skipping shape");
                skipped += 1;
                continue;
            }
        };

        let value = |idx: usize| -> Option<String> {
            field_value_to_string(attributes.get(field_names.get(idx)?)?)
        };
        records.push(layout.record(value, geometry));
    }

    debug!(
        file,
        records = records.len(),
        skipped,
        null_geometries,
        encoding = encoding.name(),
        crs = %crs,
        "Parsed Shapefile"
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

/// Encodage de la table : `.cpg`, puis UTF-8 si valide, puis repli
fn dbf_encoding(set: &ShapefileSet, fallback: &'static Encoding) -> &'static Encoding {
    if let Some(cpg) = set.cpg.as_deref() {
        let label = String::from_utf8_lossy(cpg);
        match encoding_from_cpg(&label) {
            Some(encoding) => return encoding,
            None => warn!(cpg = %label.trim(), "Unknown .cpg encoding, ignoring"),
        }
    }

    // Enregistrements après l'en-tête (longueur en octets 8..10, little-endian)
    let records = match set.dbf.get(8..10) {
        Some(&[lo, hi]) => set.dbf.get(usize::from(u16::from_le_bytes([lo, hi]))..),
        _ => None,
    };

    match records {
        Some(bytes) if simdutf8::basic::from_utf8(bytes).is_ok() => encoding_rs::UTF_8,
        _ => fallback,
    }
}

/// Libellé d'un `.cpg` : nom WHATWG ou page de code Windows
fn encoding_from_cpg(label: &str) -> Option<&'static Encoding> {
    let label = label.trim();
    match label.to_ascii_uppercase().as_str() {
        "932" | "CP932" => Some(encoding_rs::SHIFT_JIS),
        "65001" => Some(encoding_rs::UTF_8),
        "20932" | "51932" => Some(encoding_rs::EUC_JP),
        _ => Encoding::for_label(label.as_bytes()),
    }
}

/// Polygones uniquement ; un polygone à une seule partie reste un `Polygon`
fn convert_shape(shape: Shape) -> Result<Option<Geometry>, String> {
    match shape {
        Shape::NullShape => return Ok(None),
        Shape::Polygon(_) | Shape::PolygonM(_) | Shape::PolygonZ(_) => {}
        other => return Err(format!("unsupported shape type {:?}", other.shapetype())),
    }

    let geometry = Geometry::<f64>::try_from(shape).map_err(|e| e.to_string())?;

    Ok(Some(match geometry {
        Geometry::MultiPolygon(mut multi) if multi.0.len() == 1 => {
            Geometry::Polygon(multi.0.remove(0))
        }
        other => other,
    }))
}

/// Valeur d'attribut en texte ; valeurs nulles et chaînes vides → None
fn field_value_to_string(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(v) => v.clone().filter(|s| !s.is_empty()),
        FieldValue::Memo(s) => Some(s.clone()).filter(|s| !s.is_empty()),
        FieldValue::Numeric(v) => v.map(|n| n.to_string()),
        FieldValue::Float(v) => v.map(|n| n.to_string()),
        FieldValue::Integer(n) => Some(n.to_string()),
        FieldValue::Double(n) | FieldValue::Currency(n) => Some(n.to_string()),
        FieldValue::Logical(v) => v.map(|b| b.to_string()),
        FieldValue::Date(v) => v.map(|d| format!("{:04}-{:02}-{:02}", d.year(), d.month(), d.day())),
        other => Some(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_with(dbf: Vec<u8>, cpg: Option<&str>) -> ShapefileSet {
        ShapefileSet {
            name: "parcels.shp".into(),
            shp: Vec::new(),
            dbf,
            prj: None,
            cpg: cpg.map(|c| c.as_bytes().to_vec()),
        }
    }

    /// En-tête minimal de 32 octets suivi des enregistrements
    fn dbf_with_records(records: &[u8]) -> Vec<u8> {
        let mut dbf = vec![0u8; 32];
        dbf[8..10].copy_from_slice(&32u16.to_le_bytes());
        dbf.extend_from_slice(records);
        dbf
    }

    #[test]
    fn test_encoding_from_cpg() {
        assert_eq!(encoding_from_cpg("UTF-8\n"), Some(encoding_rs::UTF_8));
        assert_eq!(encoding_from_cpg("SJIS"), Some(encoding_rs::SHIFT_JIS));
        assert_eq!(encoding_from_cpg("cp932"), Some(encoding_rs::SHIFT_JIS));
        assert_eq!(encoding_from_cpg("932"), Some(encoding_rs::SHIFT_JIS));
        assert_eq!(encoding_from_cpg("klingon"), None);
    }

    #[test]
    fn test_dbf_encoding_prefers_cpg() {
        let set = set_with(dbf_with_records(" 旭".as_bytes()), Some("SJIS"));
        assert_eq!(dbf_encoding(&set, encoding_rs::EUC_JP), encoding_rs::SHIFT_JIS);
    }

    #[test]
    fn test_dbf_encoding_detects_utf8() {
        let set = set_with(dbf_with_records(" 旭".as_bytes()), None);
        assert_eq!(dbf_encoding(&set, encoding_rs::SHIFT_JIS), encoding_rs::UTF_8);

        let (sjis, _, _) = encoding_rs::SHIFT_JIS.encode(" 旭");
        let set = set_with(dbf_with_records(&sjis), None);
        assert_eq!(dbf_encoding(&set, encoding_rs::SHIFT_JIS), encoding_rs::SHIFT_JIS);
    }

    #[test]
    fn test_field_values() {
        assert_eq!(
            field_value_to_string(&FieldValue::Character(Some("旭".into()))),
            Some("旭".to_string())
        );
        assert_eq!(field_value_to_string(&FieldValue::Character(None)), None);
        assert_eq!(
            field_value_to_string(&FieldValue::Numeric(Some(1174.0))),
            Some("1174".to_string())
        );
        assert_eq!(field_value_to_string(&FieldValue::Numeric(None)), None);
    }

    #[test]
    fn test_point_shape_is_rejected() {
        let point = Shape::Point(shapefile::Point::new(1.0, 2.0));
        assert!(convert_shape(point).is_err());
        assert_eq!(convert_shape(Shape::NullShape), Ok(None));
    }

    #[test]
    fn test_single_part_polygon() {
        let polygon = shapefile::Polygon::new(shapefile::PolygonRing::Outer(vec![
            shapefile::Point::new(0.0, 0.0),
            shapefile::Point::new(0.0, 10.0),
            shapefile::Point::new(10.0, 10.0),
            shapefile::Point::new(10.0, 0.0),
            shapefile::Point::new(0.0, 0.0),
        ]));

        let geometry = convert_shape(Shape::Polygon(polygon)).unwrap().unwrap();
        assert!(matches!(geometry, Geometry::Polygon(_)));
    }
}
