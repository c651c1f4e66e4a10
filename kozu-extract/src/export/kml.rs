//! Sérialisation KML (un Placemark par parcelle, WGS84)

use std::fmt::Write;

use anyhow::{bail, Context, Result};
use geo::{Geometry, Polygon};
use kozu::{geometry_type_name, Column, ParcelDataset, ParcelRecord};

use crate::reproject_lite::ToWgs84;

/// Identifiant du style partagé par toutes les parcelles
pub const STYLE_ID: &str = "PolygonStyle";

const LINE_COLOR: &str = "ff0000ff";
const LINE_WIDTH: u32 = 2;
const POLY_COLOR: &str = "3300ff00";

/// Génère un document KML pour un sous-ensemble de parcelles
///
/// Les géométries sont reprojetées en EPSG:4326. Une géométrie absente ou
/// non polygonale fait échouer tout le document.
pub fn to_kml(subset: &ParcelDataset, document_name: &str) -> Result<String> {
    let to_wgs84 = ToWgs84::from_crs(subset.crs)?;

    // Valider et reprojeter avant d'écrire quoi que ce soit
    let geometries = subset
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let geometry = match &record.geometry {
                Some(g @ (Geometry::Polygon(_) | Geometry::MultiPolygon(_))) => g,
                Some(other) => bail!(
                    "Unsupported geometry type for KML (row {}): {}",
                    idx,
                    geometry_type_name(other)
                ),
                None => bail!("Missing geometry for KML (row {})", idx),
            };
            to_wgs84
                .apply(geometry)
                .with_context(|| format!("Reprojection failed (row {})", idx))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut w = XmlWriter::default();
    w.line(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    w.open(r#"kml xmlns="http://www.opengis.net/kml/2.2""#);
    w.open("Document");
    w.leaf("name", document_name);
    write_style(&mut w);

    for (idx, (record, geometry)) in subset.iter().zip(&geometries).enumerate() {
        write_placemark(&mut w, subset, idx, record, geometry);
    }

    w.close("Document");
    w.close("kml");

    Ok(w.buf)
}

fn write_style(w: &mut XmlWriter) {
    w.open(&format!(r#"Style id="{}""#, STYLE_ID));
    w.open("LineStyle");
    w.leaf("color", LINE_COLOR);
    w.leaf("width", &LINE_WIDTH.to_string());
    w.close("LineStyle");
    w.open("PolyStyle");
    w.leaf("color", POLY_COLOR);
    w.close("PolyStyle");
    w.close("Style");
}

fn write_placemark(
    w: &mut XmlWriter,
    subset: &ParcelDataset,
    idx: usize,
    record: &ParcelRecord,
    geometry: &Geometry,
) {
    let name = match record.value(Column::LotNumber) {
        Some(lot) => lot.to_string(),
        None => format!("lot_{}", idx),
    };

    let mut description = String::new();
    for &column in &subset.columns {
        let _ = write!(
            description,
            "{}: {}<br/>",
            subset.column_name(column),
            record.value(column).unwrap_or_default()
        );
    }

    w.open("Placemark");
    w.leaf("name", &name);
    w.leaf("description", &description);
    w.leaf("styleUrl", &format!("#{}", STYLE_ID));

    match geometry {
        Geometry::Polygon(polygon) => write_polygon(w, polygon),
        Geometry::MultiPolygon(multi) => {
            w.open("MultiGeometry");
            for polygon in multi {
                write_polygon(w, polygon);
            }
            w.close("MultiGeometry");
        }
        // Filtré dans to_kml
        _ => {}
    }

    w.close("Placemark");
}

/// Anneau extérieur uniquement, sommets tels que stockés
fn write_polygon(w: &mut XmlWriter, polygon: &Polygon) {
    let coordinates = polygon
        .exterior()
        .coords()
        .map(|c| format!("{},{},0", c.x, c.y))
        .collect::<Vec<_>>()
        .join(" ");

    w.open("Polygon");
    w.open("outerBoundaryIs");
    w.open("LinearRing");
    w.leaf("coordinates", &coordinates);
    w.close("LinearRing");
    w.close("outerBoundaryIs");
    w.close("Polygon");
}

/// Écriture XML indentée (2 espaces)
#[derive(Default)]
struct XmlWriter {
    buf: String,
    depth: usize,
}

impl XmlWriter {
    fn line(&mut self, content: &str) {
        for _ in 0..self.depth {
            self.buf.push_str("  ");
        }
        self.buf.push_str(content);
        self.buf.push('\n');
    }

    /// `tag` peut contenir des attributs déjà échappés
    fn open(&mut self, tag: &str) {
        self.line(&format!("<{}>", tag));
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.line(&format!("</{}>", tag));
    }

    fn leaf(&mut self, tag: &str, text: &str) {
        self.line(&format!("<{tag}>{}</{tag}>", escape_xml(text), tag = tag));
    }
}

/// Échappe une chaîne pour un nœud texte XML
fn escape_xml(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            c => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon, Point};
    use kozu::{ColumnMapping, Crs, Schema};

    fn wgs84(records: Vec<ParcelRecord>) -> ParcelDataset {
        ParcelDataset::new(Crs::WGS84, Schema::minimal(&ColumnMapping::default()), records)
    }

    fn square(x: f64, y: f64) -> Polygon {
        polygon![
            (x: x, y: y),
            (x: x + 0.001, y: y),
            (x: x + 0.001, y: y + 0.001),
            (x: x, y: y + 0.001),
        ]
    }

    #[test]
    fn test_polygon_placemark() {
        let ds = wgs84(vec![ParcelRecord::new("旭", "1174", square(139.7, 35.6))]);
        let kml = to_kml(&ds, "旭_1174_target").unwrap();

        assert!(kml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(kml.contains("    <name>旭_1174_target</name>"));
        assert!(kml.contains("<name>1174</name>"));
        assert!(kml.contains("<description>大字名: 旭&lt;br/&gt;地番: 1174&lt;br/&gt;</description>"));
        assert!(kml.contains("<styleUrl>#PolygonStyle</styleUrl>"));
        assert!(kml.contains("<color>ff0000ff</color>"));
        assert!(kml.contains("<color>3300ff00</color>"));
        assert!(!kml.contains("MultiGeometry"));

        let coords = kml
            .lines()
            .find_map(|l| l.trim().strip_prefix("<coordinates>"))
            .and_then(|l| l.strip_suffix("</coordinates>"))
            .unwrap();
        let triples: Vec<&str> = coords.split(' ').collect();
        // Anneau fermé : 4 sommets + fermeture
        assert_eq!(triples.len(), 5);
        assert!(triples.iter().all(|t| t.ends_with(",0")));
        assert_eq!(triples[0], "139.7,35.6,0");
    }

    #[test]
    fn test_multipolygon_in_multigeometry() {
        let multi = MultiPolygon::new(vec![square(139.7, 35.6), square(139.8, 35.6)]);
        let ds = wgs84(vec![ParcelRecord::new("旭", "1174", multi)]);
        let kml = to_kml(&ds, "doc").unwrap();

        assert_eq!(kml.matches("<MultiGeometry>").count(), 1);
        assert_eq!(kml.matches("<Polygon>").count(), 2);
    }

    #[test]
    fn test_unnamed_lot_and_null_values() {
        let ds = wgs84(vec![ParcelRecord {
            district: Some("旭".into()),
            geometry: Some(square(139.7, 35.6).into()),
            ..Default::default()
        }]);
        let kml = to_kml(&ds, "doc").unwrap();

        assert!(kml.contains("<name>lot_0</name>"));
        assert!(kml.contains("地番: &lt;br/&gt;"));
    }

    #[test]
    fn test_point_is_rejected() {
        let ds = wgs84(vec![ParcelRecord::new("旭", "1", Point::new(139.7, 35.6))]);
        let err = to_kml(&ds, "doc").unwrap_err();
        assert!(err.to_string().contains("Point"), "{}", err);
    }

    #[test]
    fn test_missing_geometry_is_rejected() {
        let ds = wgs84(vec![ParcelRecord {
            district: Some("旭".into()),
            lot_number: Some("1".into()),
            ..Default::default()
        }]);
        assert!(to_kml(&ds, "doc").is_err());
    }

    #[test]
    fn test_reprojected_from_plane_rectangular() {
        let mut ds = wgs84(vec![ParcelRecord::new(
            "旭",
            "1",
            polygon![(x: 0.0, y: 0.0), (x: 30.0, y: 0.0), (x: 30.0, y: 30.0)],
        )]);
        ds.crs = Crs::new(6677);

        let kml = to_kml(&ds, "doc").unwrap();
        assert!(kml.contains("<coordinates>139.8333"), "{}", kml);
    }

    #[cfg(not(feature = "reproject"))]
    #[test]
    fn test_unconvertible_crs_is_rejected() {
        let mut ds = wgs84(vec![ParcelRecord::new("旭", "1", square(0.0, 0.0))]);
        ds.crs = Crs::new(30169);

        let err = to_kml(&ds, "doc").unwrap_err();
        assert!(err.to_string().contains("KML needs WGS84"), "{}", err);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }
}
