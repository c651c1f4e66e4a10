//! Types d'erreurs pour le crate kozu

use thiserror::Error;

/// Erreurs pouvant survenir lors du chargement ou de l'extraction
#[derive(Debug, Error)]
pub enum KozuError {
    /// Erreur d'I/O lors de la lecture du fichier ou de l'archive
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive corrompue ou contenu ambigu
    #[error("Invalid archive format: {0}")]
    InvalidArchive(String),

    /// Fichier manquant dans l'archive
    #[error("Missing required file: {0}")]
    MissingFile(String),

    /// Erreur de parsing GeoJSON
    #[error("Parse error in {file}: {reason}")]
    ParseError { file: String, reason: String },

    /// Colonne attendue absente du jeu de données
    #[error("Missing column '{column}' ({role})")]
    MissingColumn { column: String, role: &'static str },

    /// Géométrie inexploitable
    #[error("Invalid geometry at row {row}: {reason}")]
    InvalidGeometry { row: usize, reason: String },

    /// Encodage non supporté
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Paramètre de recherche invalide
    #[error("Invalid search parameter: {0}")]
    InvalidParameter(String),
}

impl KozuError {
    /// Crée une erreur de parsing avec contexte
    pub fn parse_error(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseError {
            file: file.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(row: usize, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            row,
            reason: reason.into(),
        }
    }
}
