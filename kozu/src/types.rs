//! Types de données pour le crate kozu

use std::fmt;

use encoding_rs::Encoding;
use geo::Geometry;

use crate::KozuError;

/// Système de coordonnées déclaré par la source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Crs {
    /// Code EPSG
    pub epsg: u32,
}

impl Crs {
    /// WGS84 géographique, CRS par défaut du GeoJSON (RFC 7946)
    pub const WGS84: Crs = Crs { epsg: 4326 };

    pub const fn new(epsg: u32) -> Self {
        Self { epsg }
    }

    /// Interprète un nom de CRS GeoJSON legacy.
    ///
    /// Formats acceptés : `EPSG:6677`, `urn:ogc:def:crs:EPSG::6677`,
    /// `urn:ogc:def:crs:OGC:1.3:CRS84`.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Some(Self::WGS84);
        }
        if !upper.contains("EPSG") {
            return None;
        }
        upper
            .rsplit(':')
            .find(|part| !part.is_empty())
            .and_then(|code| code.parse().ok())
            .map(Self::new)
    }

    /// Coordonnées en degrés (WGS84, JGD2000, JGD2011, Tokyo)
    pub fn is_geographic(&self) -> bool {
        matches!(self.epsg, 4326 | 4612 | 6668 | 4301)
    }

    /// URN OGC utilisée dans le membre `crs` des exports GeoJSON
    pub fn urn(&self) -> String {
        format!("urn:ogc:def:crs:EPSG::{}", self.epsg)
    }
}

impl Default for Crs {
    fn default() -> Self {
        Self::WGS84
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg)
    }
}

/// Une colonne du jeu de données, résolue au chargement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Niveau 1 de la hiérarchie (大字)
    District,
    /// Niveau 2, optionnel (丁目)
    SubDistrict,
    /// Niveau 3, optionnel (小字)
    SubSubDistrict,
    /// Numéro de lot (地番)
    LotNumber,
    /// Attribut supplémentaire (index dans `ParcelDataset::extra_columns`)
    Extra(usize),
}

/// Noms des propriétés source pour chaque rôle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub district: String,
    pub sub_district: String,
    pub sub_sub_district: String,
    pub lot_number: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            district: "大字名".into(),
            sub_district: "丁目名".into(),
            sub_sub_district: "小字名".into(),
            lot_number: "地番".into(),
        }
    }
}

/// Schéma résolu une fois au chargement
///
/// Les niveaux optionnels valent `None` quand aucune feature de la source
/// ne porte la propriété correspondante.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub district: String,
    pub sub_district: Option<String>,
    pub sub_sub_district: Option<String>,
    pub lot_number: String,
}

impl Schema {
    /// Schéma complet (les quatre colonnes présentes)
    pub fn full(mapping: &ColumnMapping) -> Self {
        Self {
            district: mapping.district.clone(),
            sub_district: Some(mapping.sub_district.clone()),
            sub_sub_district: Some(mapping.sub_sub_district.clone()),
            lot_number: mapping.lot_number.clone(),
        }
    }

    /// Schéma minimal (district + numéro de lot)
    pub fn minimal(mapping: &ColumnMapping) -> Self {
        Self {
            district: mapping.district.clone(),
            sub_district: None,
            sub_sub_district: None,
            lot_number: mapping.lot_number.clone(),
        }
    }

    /// Nom d'une colonne de la hiérarchie, `None` si absente
    pub fn key_column_name(&self, column: Column) -> Option<&str> {
        match column {
            Column::District => Some(&self.district),
            Column::SubDistrict => self.sub_district.as_deref(),
            Column::SubSubDistrict => self.sub_sub_district.as_deref(),
            Column::LotNumber => Some(&self.lot_number),
            Column::Extra(_) => None,
        }
    }

    /// Ordre canonique : district, sous-district?, sous-sous-district?, lot
    pub fn canonical_columns(&self) -> Vec<Column> {
        let mut columns = vec![Column::District];
        if self.sub_district.is_some() {
            columns.push(Column::SubDistrict);
        }
        if self.sub_sub_district.is_some() {
            columns.push(Column::SubSubDistrict);
        }
        columns.push(Column::LotNumber);
        columns
    }
}

/// Une parcelle avec ses attributs et sa géométrie
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParcelRecord {
    pub district: Option<String>,
    pub sub_district: Option<String>,
    pub sub_sub_district: Option<String>,
    pub lot_number: Option<String>,

    /// Valeurs alignées sur `ParcelDataset::extra_columns`
    pub extras: Vec<Option<String>>,

    /// Polygon ou MultiPolygon (None si la feature source n'en a pas)
    pub geometry: Option<Geometry>,
}

impl ParcelRecord {
    /// Crée une parcelle sans niveaux optionnels
    pub fn new(district: &str, lot_number: &str, geometry: impl Into<Geometry>) -> Self {
        Self {
            district: Some(district.to_string()),
            lot_number: Some(lot_number.to_string()),
            geometry: Some(geometry.into()),
            ..Default::default()
        }
    }

    pub fn with_sub_district(mut self, value: &str) -> Self {
        self.sub_district = Some(value.to_string());
        self
    }

    pub fn with_sub_sub_district(mut self, value: &str) -> Self {
        self.sub_sub_district = Some(value.to_string());
        self
    }

    /// Valeur d'une colonne (None si nulle ou inconnue)
    pub fn value(&self, column: Column) -> Option<&str> {
        match column {
            Column::District => self.district.as_deref(),
            Column::SubDistrict => self.sub_district.as_deref(),
            Column::SubSubDistrict => self.sub_sub_district.as_deref(),
            Column::LotNumber => self.lot_number.as_deref(),
            Column::Extra(idx) => self.extras.get(idx).and_then(|v| v.as_deref()),
        }
    }

    /// Copie réduite aux colonnes canoniques, avec une autre géométrie
    pub(crate) fn projected(&self, geometry: Option<Geometry>) -> Self {
        Self {
            district: self.district.clone(),
            sub_district: self.sub_district.clone(),
            sub_sub_district: self.sub_sub_district.clone(),
            lot_number: self.lot_number.clone(),
            extras: Vec::new(),
            geometry,
        }
    }
}

/// Jeu de parcelles chargé (ou sous-ensemble dérivé)
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelDataset {
    /// Système de coordonnées commun à toutes les parcelles
    pub crs: Crs,

    /// Schéma résolu
    pub schema: Schema,

    /// Colonnes dans l'ordre de la source (hors géométrie)
    pub columns: Vec<Column>,

    /// Noms des attributs supplémentaires
    pub extra_columns: Vec<String>,

    pub records: Vec<ParcelRecord>,

    /// Features ignorées au chargement (géométrie non polygonale)
    pub skipped_features: usize,
}

impl ParcelDataset {
    /// Crée un jeu de données aux colonnes canoniques
    pub fn new(crs: Crs, schema: Schema, records: Vec<ParcelRecord>) -> Self {
        let columns = schema.canonical_columns();
        Self {
            crs,
            schema,
            columns,
            extra_columns: Vec::new(),
            records,
            skipped_features: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ParcelRecord> {
        self.records.iter()
    }

    /// Vérifie qu'une colonne existe dans ce jeu de données
    pub fn has_column(&self, column: Column) -> bool {
        match column {
            Column::Extra(idx) => idx < self.extra_columns.len(),
            other => self.schema.key_column_name(other).is_some(),
        }
    }

    /// Nom d'affichage d'une colonne
    pub fn column_name(&self, column: Column) -> &str {
        match column {
            Column::Extra(idx) => self
                .extra_columns
                .get(idx)
                .map(String::as_str)
                .unwrap_or(""),
            other => self.schema.key_column_name(other).unwrap_or(""),
        }
    }

    /// Noms des colonnes dans l'ordre de la source
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| self.column_name(*c)).collect()
    }

    /// Recherche une colonne par son nom
    pub fn find_column(&self, name: &str) -> Option<Column> {
        self.columns
            .iter()
            .copied()
            .find(|c| self.column_name(*c) == name)
    }

    /// Sous-ensemble aux colonnes canoniques, même CRS et même schéma
    pub fn subset(&self, records: Vec<ParcelRecord>) -> ParcelDataset {
        ParcelDataset::new(self.crs, self.schema.clone(), records)
    }

    /// Résumé du jeu de données
    pub fn summary(&self) -> DatasetSummary {
        let count = |column: Column| {
            self.has_column(column)
                .then(|| self.records.iter().filter(|r| r.value(column).is_some()).count())
        };

        DatasetSummary {
            records: self.records.len(),
            crs: self.crs,
            with_sub_district: count(Column::SubDistrict),
            with_sub_sub_district: count(Column::SubSubDistrict),
            skipped_features: self.skipped_features,
        }
    }
}

/// Résumé d'un jeu de données chargé
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetSummary {
    pub records: usize,
    pub crs: Crs,
    /// Parcelles avec un sous-district (None si la colonne est absente)
    pub with_sub_district: Option<usize>,
    pub with_sub_sub_district: Option<usize>,
    pub skipped_features: usize,
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Records: {}", self.records)?;
        write!(f, "CRS: {}", self.crs)?;
        if let Some(n) = self.with_sub_district {
            write!(f, "\nWith sub-district: {}", n)?;
        }
        if let Some(n) = self.with_sub_sub_district {
            write!(f, "\nWith sub-sub-district: {}", n)?;
        }
        if self.skipped_features > 0 {
            write!(f, "\nSkipped features: {}", self.skipped_features)?;
        }
        Ok(())
    }
}

/// Valeur sélectionnée pour un niveau optionnel
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Aucune sélection : le niveau ne filtre pas
    #[default]
    Any,
    Value(String),
}

impl Selection {
    /// Interprète une saisie : vide ou égale au libellé "aucune" → `Any`
    pub fn parse(raw: Option<&str>, none_label: &str) -> Self {
        match raw.map(str::trim) {
            None => Self::Any,
            Some(v) if v.is_empty() || v == none_label => Self::Any,
            Some(v) => Self::Value(v.to_string()),
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Any => None,
            Self::Value(v) => Some(v),
        }
    }
}

/// Clé de localisation hiérarchique
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationKey {
    pub district: String,
    pub sub_district: Selection,
    pub sub_sub_district: Selection,
}

impl LocationKey {
    pub fn new(district: impl Into<String>) -> Self {
        Self {
            district: district.into(),
            sub_district: Selection::Any,
            sub_sub_district: Selection::Any,
        }
    }

    pub fn with_sub_district(mut self, selection: Selection) -> Self {
        self.sub_district = selection;
        self
    }

    pub fn with_sub_sub_district(mut self, selection: Selection) -> Self {
        self.sub_sub_district = selection;
        self
    }

    /// Valeurs sélectionnées, de la plus large à la plus fine
    pub fn parts(&self) -> Vec<&str> {
        let mut parts = vec![self.district.as_str()];
        parts.extend(self.sub_district.value());
        parts.extend(self.sub_sub_district.value());
        parts
    }
}

/// Options de chargement
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Correspondance des propriétés source
    pub mapping: ColumnMapping,

    /// Encodage utilisé quand le fichier n'est pas de l'UTF-8 valide
    pub fallback_encoding: &'static Encoding,

    /// Force le CRS au lieu de celui déclaré par la source
    pub crs_override: Option<u32>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            mapping: ColumnMapping::default(),
            fallback_encoding: encoding_rs::SHIFT_JIS,
            crs_override: None,
        }
    }
}

impl LoadOptions {
    /// Choisit l'encodage de repli par son libellé WHATWG (ex: "shift_jis")
    pub fn with_encoding_label(mut self, label: &str) -> Result<Self, KozuError> {
        self.fallback_encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| KozuError::UnsupportedEncoding(label.to_string()))?;
        Ok(self)
    }
}
