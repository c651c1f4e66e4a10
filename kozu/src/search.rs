//! Recherche de numéros de lot (correspondance exacte ou partielle)

use crate::types::{Column, ParcelDataset, ParcelRecord};

/// Mode de correspondance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    Exact,
    /// Sous-chaîne
    #[default]
    Contains,
}

/// Résultat de recherche
#[derive(Debug)]
pub struct LotSearch<'a> {
    /// Nombre total de correspondances
    pub total: usize,

    /// Premières correspondances (au plus `limit`), dans l'ordre du jeu de données
    pub records: Vec<&'a ParcelRecord>,
}

/// Recherche `term` dans les numéros de lot ; les lots nuls ne correspondent jamais
pub fn search_lots<'a>(
    dataset: &'a ParcelDataset,
    term: &str,
    mode: MatchMode,
    limit: usize,
) -> LotSearch<'a> {
    let term = term.trim();
    if term.is_empty() {
        return LotSearch {
            total: 0,
            records: Vec::new(),
        };
    }

    let mut total = 0;
    let mut records = Vec::new();

    for record in dataset.iter() {
        let Some(lot) = record.value(Column::LotNumber) else {
            continue;
        };

        let hit = match mode {
            MatchMode::Exact => lot == term,
            MatchMode::Contains => lot.contains(term),
        };

        if hit {
            total += 1;
            if records.len() < limit {
                records.push(record);
            }
        }
    }

    LotSearch { total, records }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnMapping, Crs, Schema};
    use geo::polygon;

    fn dataset() -> ParcelDataset {
        let square = polygon![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 0.0)];
        let mut records: Vec<ParcelRecord> = ["1174", "1174-2", "11", "2174"]
            .iter()
            .map(|lot| ParcelRecord::new("旭", lot, square.clone()))
            .collect();
        records.push(ParcelRecord {
            district: Some("旭".into()),
            lot_number: None,
            ..Default::default()
        });

        ParcelDataset::new(Crs::new(6677), Schema::minimal(&ColumnMapping::default()), records)
    }

    #[test]
    fn test_exact() {
        let ds = dataset();
        let found = search_lots(&ds, "1174", MatchMode::Exact, 20);
        assert_eq!(found.total, 1);
        assert_eq!(found.records[0].lot_number.as_deref(), Some("1174"));
    }

    #[test]
    fn test_contains_with_limit() {
        let ds = dataset();
        let found = search_lots(&ds, "174", MatchMode::Contains, 2);
        assert_eq!(found.total, 3);
        assert_eq!(found.records.len(), 2);
    }

    #[test]
    fn test_empty_term() {
        let ds = dataset();
        assert_eq!(search_lots(&ds, " ", MatchMode::Contains, 20).total, 0);
    }
}
