//! Modules d'export (KML, CSV, GeoJSON)

pub mod csv;
pub mod geojson;
pub mod kml;
pub mod naming;
#[cfg(feature = "reproject")]
pub mod reproject;

pub use self::csv::neighbors_to_csv;
pub use self::geojson::to_geojson;
pub use self::kml::to_kml;
pub use naming::{OutputKind, CSV_MIME, GEOJSON_MIME, KML_MIME};
