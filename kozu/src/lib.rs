//! # kozu
//!
//! Jeux de parcelles cadastrales (公図) : chargement, valeurs de la hiérarchie
//! de localisation et extraction d'une parcelle avec ses voisines.
//!
//! ## Features
//!
//! - Chargement GeoJSON ou Shapefile, direct ou depuis une archive (.zip,
//!   .tar, .tar.bz2)
//! - CRS lu dans le membre `crs` du GeoJSON ou dans le `.prj`
//! - Repli d'encodage (Shift_JIS par défaut) via `simdutf8` et `encoding_rs`
//! - Schéma typé résolu au chargement (大字 / 丁目 / 小字 / 地番)
//! - Extraction par enveloppe carrée et intersection avec les types `geo`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use kozu::{extract, load, LoadOptions, LocationKey, DEFAULT_RADIUS};
//! use std::path::Path;
//!
//! let dataset = load(Path::new("parcels.zip"), &LoadOptions::default())?;
//! let extraction = extract(&dataset, &LocationKey::new("旭"), "1174", DEFAULT_RADIUS);
//! println!("{}", extraction.message());
//! ```

pub mod archive;
pub mod error;
pub mod extract;
pub mod options;
pub mod parser;
pub mod search;
pub mod types;

pub use error::KozuError;
pub use extract::{
    extract, Extraction, ExtractionResult, SearchEnvelope, DEFAULT_RADIUS, NO_MATCH_MESSAGE,
};
pub use options::{cascade_options, get_options};
pub use parser::geojson::geometry_type_name;
pub use search::{search_lots, LotSearch, MatchMode};
pub use types::{
    Column, ColumnMapping, Crs, DatasetSummary, LoadOptions, LocationKey, ParcelDataset,
    ParcelRecord, Schema, Selection,
};

use std::path::Path;

use tracing::info;

/// Charge un jeu de parcelles depuis un fichier local.
///
/// # Arguments
///
/// * `path` - Chemin vers un `.geojson`, un `.shp` ou une archive contenant
///   l'un des deux
/// * `options` - Correspondance des colonnes, encodage de repli, CRS forcé
///
/// # Errors
///
/// Retourne `KozuError` si le fichier est illisible, si l'archive ne contient
/// pas exactement une couche, ou si une colonne obligatoire manque.
pub fn load(path: &Path, options: &LoadOptions) -> Result<ParcelDataset, KozuError> {
    let source = archive::extract(path)?;
    parse_source(source, options)
}

/// Charge un jeu de parcelles depuis des octets (téléchargement, upload)
///
/// `name_hint` sert à détecter le format quand les octets magiques ne suffisent pas.
pub fn load_bytes(
    content: Vec<u8>,
    name_hint: &str,
    options: &LoadOptions,
) -> Result<ParcelDataset, KozuError> {
    let source = archive::extract_bytes(content, name_hint)?;
    parse_source(source, options)
}

fn parse_source(
    source: archive::SourceFile,
    options: &LoadOptions,
) -> Result<ParcelDataset, KozuError> {
    let dataset = match &source {
        archive::SourceFile::GeoJson { name, content } => {
            parser::geojson::parse(content, name, options)?
        }
        archive::SourceFile::Shapefile(set) => parser::shapefile::parse(set, options)?,
    };

    info!(
        file = %source.name(),
        records = dataset.len(),
        skipped = dataset.skipped_features,
        crs = %dataset.crs,
        "Dataset loaded"
    );

    Ok(dataset)
}
