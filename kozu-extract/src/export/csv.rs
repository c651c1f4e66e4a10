//! Export CSV des parcelles voisines avec leurs centroïdes

use anyhow::{Context, Result};
use geo::Centroid;
use kozu::ParcelDataset;

use crate::config::CentroidColumns;

/// Une ligne par parcelle, colonnes canoniques puis centroïde X / Y (CRS natif)
///
/// Pas de colonne géométrie ni d'index. Une parcelle sans centroïde laisse
/// les deux cellules vides.
pub fn neighbors_to_csv(subset: &ParcelDataset, centroid: &CentroidColumns) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = subset.column_names();
    header.push(&centroid.x);
    header.push(&centroid.y);
    writer.write_record(&header)?;

    for record in subset.iter() {
        let mut row: Vec<String> = subset
            .columns
            .iter()
            .map(|&column| record.value(column).unwrap_or_default().to_string())
            .collect();

        match record.geometry.as_ref().and_then(|g| g.centroid()) {
            Some(point) => {
                row.push(point.x().to_string());
                row.push(point.y().to_string());
            }
            None => {
                row.push(String::new());
                row.push(String::new());
            }
        }

        writer.write_record(&row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}
