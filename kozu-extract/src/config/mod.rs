//! Configuration de l'extraction
//!
//! Presets embarqués (`koji`, `generic`) ou fichier JSON, puis surcharges
//! par variables d'environnement (`KOZU_RADIUS`, `KOZU_FETCH_TIMEOUT`).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use kozu::{ColumnMapping, LoadOptions};

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Noms des propriétés source pour chaque niveau
    pub columns: ColumnNames,

    /// Libellé signifiant "pas de sélection" pour un niveau optionnel
    #[serde(default = "default_none_label")]
    pub none_label: String,

    /// Colonnes des centroïdes dans l'export CSV
    #[serde(default)]
    pub centroid_columns: CentroidColumns,

    /// Demi-côté de l'enveloppe de recherche (unités du CRS)
    #[serde(default = "default_radius")]
    pub radius: f64,

    /// Timeout des téléchargements
    #[serde(default = "default_timeout")]
    pub fetch_timeout_secs: u64,

    /// Encodage de repli quand la source n'est pas en UTF-8 (libellé WHATWG)
    #[serde(default = "default_encoding")]
    pub encoding: String,
}

/// Mapping des rôles vers les noms de propriétés
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColumnNames {
    pub district: String,
    pub sub_district: String,
    pub sub_sub_district: String,
    pub lot_number: String,
}

/// Noms des colonnes de centroïde
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CentroidColumns {
    pub x: String,
    pub y: String,
}

impl Default for CentroidColumns {
    fn default() -> Self {
        Self {
            x: "centroid_x".to_string(),
            y: "centroid_y".to_string(),
        }
    }
}

fn default_none_label() -> String {
    "選択なし".to_string()
}

fn default_radius() -> f64 {
    kozu::DEFAULT_RADIUS
}

fn default_timeout() -> u64 {
    30
}

fn default_encoding() -> String {
    "shift_jis".to_string()
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "koji" => Self::load_embedded(include_str!("presets/koji.json")),
            "generic" => Self::load_embedded(include_str!("presets/generic.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: koji, generic", preset),
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse embedded config")
    }

    /// Preset par son nom, sinon chemin vers un fichier JSON
    pub fn resolve(name_or_path: &str) -> Result<Self> {
        let path = Path::new(name_or_path);
        if path.extension().is_some_and(|ext| ext == "json") || path.exists() {
            Self::load(path)
        } else {
            Self::from_preset(name_or_path)
        }
    }

    /// Applique les surcharges d'environnement
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(radius) = std::env::var("KOZU_RADIUS") {
            self.radius = radius
                .trim()
                .parse()
                .context(format!("Invalid KOZU_RADIUS: {}", radius))?;
        }
        if let Ok(timeout) = std::env::var("KOZU_FETCH_TIMEOUT") {
            self.fetch_timeout_secs = timeout
                .trim()
                .parse()
                .context(format!("Invalid KOZU_FETCH_TIMEOUT: {}", timeout))?;
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Correspondance des colonnes pour le chargeur
    pub fn mapping(&self) -> ColumnMapping {
        ColumnMapping {
            district: self.columns.district.clone(),
            sub_district: self.columns.sub_district.clone(),
            sub_sub_district: self.columns.sub_sub_district.clone(),
            lot_number: self.columns.lot_number.clone(),
        }
    }

    /// Options de chargement, avec CRS et encodage éventuellement forcés
    pub fn load_options(&self, epsg: Option<u32>, encoding: Option<&str>) -> Result<LoadOptions> {
        let label = encoding.unwrap_or(&self.encoding);
        let options = LoadOptions {
            mapping: self.mapping(),
            crs_override: epsg,
            ..Default::default()
        }
        .with_encoding_label(label)
        .context(format!("Invalid encoding: {}", label))?;

        Ok(options)
    }
}
