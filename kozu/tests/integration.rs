//! Tests d'intégration : chargement depuis archives puis extraction

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use kozu::{
    cascade_options, extract, get_options, load, load_bytes, Column, Crs, Extraction,
    LoadOptions, LocationKey, Selection, DEFAULT_RADIUS,
};

/// Grille 4×4 de parcelles de 30 m dans la zone IX, deux 丁目
fn sample_geojson() -> String {
    let mut features = Vec::new();
    for row in 0..4 {
        for col in 0..4 {
            let x = -20000.0 + col as f64 * 30.0;
            let y = -35000.0 + row as f64 * 30.0;
            let chome = if col < 2 { "一丁目" } else { "二丁目" };
            let lot = 1170 + row * 4 + col;
            features.push(format!(
                r#"{{"type":"Feature","properties":{{"大字名":"旭","丁目名":"{chome}","地番":"{lot}","所有者区分":"私有"}},
                "geometry":{{"type":"Polygon","coordinates":[[[{x0},{y0}],[{x1},{y0}],[{x1},{y1}],[{x0},{y1}],[{x0},{y0}]]]}}}}"#,
                chome = chome,
                lot = lot,
                x0 = x,
                y0 = y,
                x1 = x + 30.0,
                y1 = y + 30.0,
            ));
        }
    }

    // Une parcelle d'un autre 大字, loin de la grille
    features.push(
        r#"{"type":"Feature","properties":{"大字名":"本町","地番":"1174"},
        "geometry":{"type":"Polygon","coordinates":[[[0,0],[10,0],[10,10],[0,10],[0,0]]]}}"#
            .to_string(),
    );

    format!(
        r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"EPSG:6677"}}}},"features":[{}]}}"#,
        features.join(",")
    )
}

fn zip_with(name: &str, content: &[u8]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(name, zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(content).unwrap();
    writer.finish().unwrap().into_inner()
}

const ZONE_IX_PRJ: &str = r#"PROJCS["JGD_2011_Japan_Zone_9",GEOGCS["GCS_JGD_2011",DATUM["D_JGD_2011",SPHEROID["GRS_1980",6378137.0,298.257222101]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",139.8333333333333],PARAMETER["Scale_Factor",0.9999],PARAMETER["Latitude_Of_Origin",36.0],UNIT["Meter",1.0]]"#;

/// Même grille 4×4 en Shapefile (.shp/.shx/.dbf/.prj/.cpg) dans `dir`
fn write_sample_shapefile(dir: &Path) -> PathBuf {
    use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
    use shapefile::{Point, Polygon, PolygonRing, Writer};

    std::fs::create_dir_all(dir).unwrap();
    let shp_path = dir.join("parcels.shp");

    let table = TableWriterBuilder::new()
        .add_character_field(FieldName::try_from("大字名").unwrap(), 50)
        .add_character_field(FieldName::try_from("丁目名").unwrap(), 50)
        .add_character_field(FieldName::try_from("地番").unwrap(), 20);
    let mut writer = Writer::from_path(&shp_path, table).unwrap();

    for row in 0..4 {
        for col in 0..4 {
            let x = -20000.0 + col as f64 * 30.0;
            let y = -35000.0 + row as f64 * 30.0;
            // Anneau extérieur dans le sens horaire
            let polygon = Polygon::new(PolygonRing::Outer(vec![
                Point::new(x, y),
                Point::new(x, y + 30.0),
                Point::new(x + 30.0, y + 30.0),
                Point::new(x + 30.0, y),
                Point::new(x, y),
            ]));

            let chome = if col < 2 { "一丁目" } else { "二丁目" };
            let mut record = Record::default();
            record.insert("大字名".to_string(), FieldValue::Character(Some("旭".to_string())));
            record.insert("丁目名".to_string(), FieldValue::Character(Some(chome.to_string())));
            record.insert(
                "地番".to_string(),
                FieldValue::Character(Some((1170 + row * 4 + col).to_string())),
            );
            writer.write_shape_and_record(&polygon, &record).unwrap();
        }
    }
    drop(writer);

    std::fs::write(dir.join("parcels.prj"), ZONE_IX_PRJ).unwrap();
    std::fs::write(dir.join("parcels.cpg"), "UTF-8").unwrap();
    shp_path
}

fn tar_bz2_with(name: &str, content: &[u8]) -> Vec<u8> {
    let encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, name, content).unwrap();
    builder.into_inner().unwrap().finish().unwrap()
}

#[test]
fn test_load_from_zip_and_extract() {
    let archive = zip_with("asahi/parcels.geojson", sample_geojson().as_bytes());
    let dataset = load_bytes(archive, "parcels.zip", &LoadOptions::default()).unwrap();

    assert_eq!(dataset.crs, Crs::new(6677));
    assert_eq!(dataset.len(), 17);
    assert_eq!(
        dataset.column_names(),
        vec!["大字名", "丁目名", "地番", "所有者区分"]
    );

    let key = LocationKey::new("旭").with_sub_district(Selection::Value("一丁目".into()));
    // Lot 1175 = ligne 1, colonne 1 ; centre (-19955, -34955)
    let extraction = extract(&dataset, &key, "1175", DEFAULT_RADIUS);
    let result = extraction.result().expect("target should be found");

    assert_eq!(result.targets.len(), 1);
    assert_eq!(
        result.targets.column_names(),
        vec!["大字名", "丁目名", "地番"]
    );
    // L'enveloppe [-20016, -19894] couvre les colonnes 0 à 3 et les lignes 0 à 3
    assert_eq!(result.neighbors.len(), 16);
    assert!(result
        .neighbors
        .iter()
        .all(|r| r.district.as_deref() == Some("旭")));
}

#[test]
fn test_load_shapefile_from_zip_and_extract() {
    let dir = std::env::temp_dir().join("kozu_test_shapefile_zip");
    write_sample_shapefile(&dir);

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for ext in ["shp", "shx", "dbf", "prj", "cpg"] {
        let content = std::fs::read(dir.join(format!("parcels.{}", ext))).unwrap();
        writer
            .start_file(format!("asahi/parcels.{}", ext), zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(&content).unwrap();
    }
    let archive = writer.finish().unwrap().into_inner();

    let dataset = load_bytes(archive, "parcels.zip", &LoadOptions::default()).unwrap();

    // CRS lu dans le .prj
    assert_eq!(dataset.crs, Crs::new(6677));
    assert_eq!(dataset.len(), 16);
    assert_eq!(dataset.column_names(), vec!["大字名", "丁目名", "地番"]);
    assert_eq!(dataset.records[5].lot_number.as_deref(), Some("1175"));
    assert_eq!(dataset.records[5].sub_district.as_deref(), Some("一丁目"));

    let key = LocationKey::new("旭").with_sub_district(Selection::Value("一丁目".into()));
    let extraction = extract(&dataset, &key, "1175", DEFAULT_RADIUS);
    let result = extraction.result().expect("target should be found");

    assert_eq!(result.targets.len(), 1);
    assert!(matches!(
        result.targets.records[0].geometry,
        Some(geo::Geometry::Polygon(_))
    ));
    assert_eq!(result.neighbors.len(), 16);

    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_load_bare_shapefile_with_epsg_override() {
    let dir = std::env::temp_dir().join("kozu_test_shapefile_bare");
    let shp = write_sample_shapefile(&dir);

    let dataset = load(&shp, &LoadOptions::default()).unwrap();
    assert_eq!(dataset.len(), 16);
    assert_eq!(dataset.crs, Crs::new(6677));

    let options = LoadOptions {
        crs_override: Some(2451),
        ..LoadOptions::default()
    };
    let dataset = load(&shp, &options).unwrap();
    assert_eq!(dataset.crs, Crs::new(2451));

    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_load_from_tar_bz2_file() {
    let archive = tar_bz2_with("parcels.geojson", sample_geojson().as_bytes());
    let path = std::env::temp_dir().join("kozu_test_parcels.tar.bz2");
    std::fs::write(&path, archive).unwrap();

    let dataset = load(&path, &LoadOptions::default()).unwrap();
    assert_eq!(dataset.len(), 17);

    std::fs::remove_file(path).ok();
}

#[test]
fn test_options_cascade() {
    let dataset = load_bytes(
        sample_geojson().into_bytes(),
        "parcels.geojson",
        &LoadOptions::default(),
    )
    .unwrap();

    assert_eq!(
        get_options(&dataset, Column::District, None).unwrap(),
        vec!["旭", "本町"]
    );
    assert_eq!(
        get_options(&dataset, Column::SubDistrict, Some((Column::District, "旭"))).unwrap(),
        vec!["一丁目", "二丁目"]
    );
    // 本町 n'a pas de 丁目
    assert_eq!(
        get_options(&dataset, Column::SubDistrict, Some((Column::District, "本町"))),
        None
    );
    // 小字名 absent du jeu de données
    assert_eq!(
        cascade_options(&dataset, &LocationKey::new("旭"), Column::SubSubDistrict),
        None
    );
}

#[test]
fn test_target_is_among_neighbors() {
    let dataset = load_bytes(
        sample_geojson().into_bytes(),
        "parcels.geojson",
        &LoadOptions::default(),
    )
    .unwrap();

    for lot in ["1170", "1175", "1185"] {
        let extraction = extract(&dataset, &LocationKey::new("旭"), lot, 1.0);
        let result = extraction.result().unwrap();
        assert!(
            result
                .neighbors
                .iter()
                .any(|r| r.lot_number.as_deref() == Some(lot)),
            "lot {} missing from its own neighbourhood",
            lot
        );
    }
}

#[test]
fn test_same_lot_in_two_districts() {
    let dataset = load_bytes(
        sample_geojson().into_bytes(),
        "parcels.geojson",
        &LoadOptions::default(),
    )
    .unwrap();

    // 1174 existe dans 旭 (ligne 1, colonne 0) et dans 本町
    let extraction = extract(&dataset, &LocationKey::new("本町"), "1174", DEFAULT_RADIUS);
    assert_eq!(extraction.message(), "target: 1, neighbors: 1");

    let extraction = extract(&dataset, &LocationKey::new("本町"), "9999", DEFAULT_RADIUS);
    assert_eq!(extraction, Extraction::NoMatch);
}
