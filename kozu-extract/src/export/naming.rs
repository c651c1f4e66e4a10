//! Noms et types MIME des fichiers produits

use kozu::LocationKey;

pub const KML_MIME: &str = "application/vnd.google-earth.kml+xml";
pub const CSV_MIME: &str = "text/csv";
pub const GEOJSON_MIME: &str = "application/geo+json";

/// Sous-ensemble exporté
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Target,
    Neighbors,
}

impl OutputKind {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Target => "target",
            Self::Neighbors => "neighbors",
        }
    }
}

/// `{district}[_{sub}][_{subsub}]_{lot}`, séparateurs de chemin remplacés par `_`
pub fn file_stem(key: &LocationKey, lot: &str) -> String {
    let mut parts: Vec<&str> = key.parts();
    parts.push(lot.trim());
    parts
        .iter()
        .map(|p| sanitize(p))
        .collect::<Vec<_>>()
        .join("_")
}

pub fn kml_file_name(stem: &str, kind: OutputKind) -> String {
    format!("{}_{}.kml", stem, kind.suffix())
}

pub fn csv_file_name(stem: &str) -> String {
    format!("{}_{}.csv", stem, OutputKind::Neighbors.suffix())
}

pub fn geojson_file_name(stem: &str, kind: OutputKind) -> String {
    format!("{}_{}.geojson", stem, kind.suffix())
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect()
}
