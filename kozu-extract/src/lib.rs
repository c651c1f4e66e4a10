//! # kozu-extract
//!
//! Extraction d'une parcelle cadastrale (公図) et de ses voisines vers KML,
//! CSV et GeoJSON.
//!
//! ## Features
//!
//! - Sources locales, URL ou fichiers d'un dépôt GitHub
//! - Presets de configuration embarqués (`koji`, `generic`)
//! - Reprojection en Rust pur vers WGS84 pour le KML (système plan
//!   rectangulaire japonais, UTM), PROJ en option (feature `reproject`)
//! - Rapport d'extraction JSON
//!
//! ## Usage CLI
//!
//! ```bash
//! # Extraction (fichiers écrits dans ./out)
//! kozu-extract extract --source ./asahi.zip --district 旭 --sub-district 一丁目 --lot 1174 --output ./out
//!
//! # Valeurs disponibles pour la hiérarchie
//! kozu-extract options --source ./asahi.zip --district 旭
//!
//! # Depuis GitHub
//! kozu-extract info --github owner/repo/data/asahi.tar.bz2
//! ```

pub mod config;
pub mod export;
pub mod report;
pub mod reproject_lite;
pub mod source;

pub use config::Config;
pub use report::{ExtractionReport, ExtractionStatus};
pub use source::{load_source, DataSource, LoadedSource};
