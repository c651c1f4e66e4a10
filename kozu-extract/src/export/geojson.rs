//! Export vers GeoJSON avec geozero (CRS natif, membre `crs` historique)

use std::io::Write;

use anyhow::{Context, Result};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;
use kozu::{ParcelDataset, ParcelRecord};

/// Sérialise un sous-ensemble en FeatureCollection
pub fn to_geojson(subset: &ParcelDataset) -> Result<String> {
    let mut writer = Vec::new();

    // Header FeatureCollection avec CRS
    write!(
        writer,
        r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"{}"}}}},"features":["#,
        subset.crs.urn()
    )?;

    for (i, record) in subset.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(&mut writer, subset, record)
            .with_context(|| format!("Failed to write feature {}", i))?;
    }

    // Footer
    write!(writer, "]}}")?;

    String::from_utf8(writer).context("GeoJSON output is not valid UTF-8")
}

/// Écrit une feature en GeoJSON
fn write_feature<W: Write>(
    writer: &mut W,
    subset: &ParcelDataset,
    record: &ParcelRecord,
) -> Result<()> {
    write!(writer, r#"{{"type":"Feature","geometry":"#)?;

    // Geometry via geozero
    match &record.geometry {
        Some(geometry) => {
            let mut geom_buf = Vec::new();
            let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
            geometry.process_geom(&mut geom_writer)?;
            writer.write_all(&geom_buf)?;
        }
        None => write!(writer, "null")?,
    }

    // Properties
    write!(writer, r#","properties":{{"#)?;
    for (i, &column) in subset.columns.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        let value = match record.value(column) {
            Some(v) => serde_json::to_string(v)?,
            None => "null".to_string(),
        };
        write!(
            writer,
            "{}:{}",
            serde_json::to_string(subset.column_name(column))?,
            value
        )?;
    }
    write!(writer, "}}}}")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;
    use kozu::{ColumnMapping, Crs, Schema};

    #[test]
    fn test_to_geojson() {
        let square = polygon![(x: 0.0, y: 0.0), (x: 30.0, y: 0.0), (x: 30.0, y: 30.0), (x: 0.0, y: 30.0)];
        let records = vec![
            ParcelRecord::new("旭", "1174", square),
            ParcelRecord {
                district: Some("旭\"北\"".into()),
                ..Default::default()
            },
        ];
        let ds = ParcelDataset::new(
            Crs::new(6677),
            Schema::minimal(&ColumnMapping::default()),
            records,
        );

        let json = to_geojson(&ds).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(
            value["crs"]["properties"]["name"],
            "urn:ogc:def:crs:EPSG::6677"
        );
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["geometry"]["type"], "Polygon");
        assert_eq!(features[0]["properties"]["地番"], "1174");
        assert!(features[1]["geometry"].is_null());
        assert_eq!(features[1]["properties"]["大字名"], "旭\"北\"");
        assert!(features[1]["properties"]["地番"].is_null());
    }

    #[test]
    fn test_empty_subset() {
        let ds = ParcelDataset::new(
            Crs::WGS84,
            Schema::minimal(&ColumnMapping::default()),
            Vec::new(),
        );
        let value: serde_json::Value = serde_json::from_str(&to_geojson(&ds).unwrap()).unwrap();
        assert_eq!(value["features"].as_array().unwrap().len(), 0);
    }
}
