//! Rapport d'extraction
//!
//! Collecte le résultat d'une extraction, les fichiers écrits et les exports
//! en échec (un export raté n'empêche pas les suivants).

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use kozu::{Extraction, LocationKey};
use serde::Serialize;

/// Statut de l'extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExtractionStatus {
    /// Parcelle trouvée, voisines extraites
    Found,
    /// Aucune parcelle ne correspond
    NoMatch,
    /// Erreur pendant l'extraction
    Failed,
}

/// Fichier écrit
#[derive(Debug, Clone, Serialize)]
pub struct OutputFile {
    pub path: String,
    pub mime: &'static str,
    pub bytes: usize,
}

/// Export en échec
#[derive(Debug, Clone, Serialize)]
pub struct ExportFailure {
    pub path: String,
    pub message: String,
}

/// Rapport complet d'extraction
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionReport {
    /// Source du jeu de données
    pub source: String,
    /// Checksum blake3 de la source
    pub checksum: String,

    pub district: String,
    pub sub_district: Option<String>,
    pub sub_sub_district: Option<String>,
    pub lot: String,
    pub radius: f64,

    pub status: ExtractionStatus,
    pub message: String,
    pub targets: usize,
    pub neighbors: usize,

    pub outputs: Vec<OutputFile>,
    pub failures: Vec<ExportFailure>,

    /// Durée totale
    pub duration_secs: f64,
}

impl ExtractionReport {
    pub fn new(
        source: &str,
        checksum: &str,
        key: &LocationKey,
        lot: &str,
        radius: f64,
        extraction: &Extraction,
    ) -> Self {
        let (status, targets, neighbors) = match extraction {
            Extraction::Found(result) => (
                ExtractionStatus::Found,
                result.targets.len(),
                result.neighbors.len(),
            ),
            Extraction::NoMatch => (ExtractionStatus::NoMatch, 0, 0),
            Extraction::Failed(_) => (ExtractionStatus::Failed, 0, 0),
        };

        Self {
            source: source.to_string(),
            checksum: checksum.to_string(),
            district: key.district.clone(),
            sub_district: key.sub_district.value().map(str::to_string),
            sub_sub_district: key.sub_sub_district.value().map(str::to_string),
            lot: lot.to_string(),
            radius,
            status,
            message: extraction.message(),
            targets,
            neighbors,
            outputs: Vec::new(),
            failures: Vec::new(),
            duration_secs: 0.0,
        }
    }

    /// Enregistre un fichier écrit
    pub fn record_output(&mut self, path: &Path, mime: &'static str, bytes: usize) {
        self.outputs.push(OutputFile {
            path: path.display().to_string(),
            mime,
            bytes,
        });
    }

    /// Enregistre un export en échec
    pub fn record_failure(&mut self, path: &Path, error: &anyhow::Error) {
        self.failures.push(ExportFailure {
            path: path.display().to_string(),
            message: format!("{:#}", error),
        });
    }

    /// Définit la durée de l'extraction
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} {}: {}, {} files written",
            self.district,
            self.lot,
            self.message,
            self.outputs.len()
        );
        if !self.failures.is_empty() {
            summary.push_str(&format!(", {} failed", self.failures.len()));
        }
        summary
    }
}
