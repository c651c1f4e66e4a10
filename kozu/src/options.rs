//! Valeurs disponibles pour chaque niveau de la hiérarchie

use std::collections::BTreeSet;

use crate::types::{Column, LocationKey, ParcelDataset};

/// Valeurs distinctes et triées d'une colonne.
///
/// Avec `parent = Some((colonne, valeur))`, seules les lignes dont la colonne
/// parente est non nulle et égale à `valeur` sont retenues. Une contrainte
/// parente vide ou portant sur une colonne absente est ignorée.
///
/// Retourne `None` si la colonne n'existe pas ou si aucune ligne ne reste.
pub fn get_options(
    dataset: &ParcelDataset,
    column: Column,
    parent: Option<(Column, &str)>,
) -> Option<Vec<String>> {
    let constraints: Vec<(Column, &str)> = parent.into_iter().collect();
    distinct_values(dataset, column, &constraints)
}

/// Valeurs d'un niveau compte tenu de tous les ancêtres sélectionnés de `key`.
///
/// Le district filtre toujours les niveaux inférieurs ; le sous-district ne
/// filtre le sous-sous-district que s'il est sélectionné.
pub fn cascade_options(
    dataset: &ParcelDataset,
    key: &LocationKey,
    column: Column,
) -> Option<Vec<String>> {
    let mut constraints = Vec::new();

    match column {
        Column::District => {}
        Column::SubDistrict => constraints.push((Column::District, key.district.as_str())),
        Column::SubSubDistrict | Column::LotNumber => {
            constraints.push((Column::District, key.district.as_str()));
            if let Some(sub) = key.sub_district.value() {
                constraints.push((Column::SubDistrict, sub));
            }
            if column == Column::LotNumber {
                if let Some(sub_sub) = key.sub_sub_district.value() {
                    constraints.push((Column::SubSubDistrict, sub_sub));
                }
            }
        }
        Column::Extra(_) => constraints.push((Column::District, key.district.as_str())),
    }

    distinct_values(dataset, column, &constraints)
}

fn distinct_values(
    dataset: &ParcelDataset,
    column: Column,
    constraints: &[(Column, &str)],
) -> Option<Vec<String>> {
    if !dataset.has_column(column) {
        return None;
    }

    let active: Vec<(Column, &str)> = constraints
        .iter()
        .copied()
        .filter(|(c, v)| !v.is_empty() && dataset.has_column(*c))
        .collect();

    let values: BTreeSet<&str> = dataset
        .iter()
        .filter(|r| active.iter().all(|(c, v)| r.value(*c) == Some(*v)))
        .filter_map(|r| r.value(column))
        .collect();

    if values.is_empty() {
        return None;
    }

    Some(values.into_iter().map(str::to_owned).collect())
}
