//! Parsers des fichiers source (GeoJSON, Shapefile)

pub mod decode;
pub mod geojson;
pub mod prj;
pub mod shapefile;

use geo::Geometry;

use crate::types::{Column, LoadOptions, ParcelRecord, Schema};
use crate::KozuError;

/// Rôle de chaque attribut source dans le schéma résolu
#[derive(Debug)]
pub(crate) struct Layout {
    pub schema: Schema,

    /// Un rôle par attribut source, dans l'ordre de la source
    pub columns: Vec<Column>,

    pub extra_columns: Vec<String>,
}

impl Layout {
    /// Résout le schéma à partir des noms d'attributs présents dans la source
    ///
    /// `MissingColumn` si la colonne district ou numéro de lot est absente.
    pub fn resolve(attribute_names: &[String], options: &LoadOptions) -> Result<Self, KozuError> {
        let mapping = &options.mapping;
        let present = |name: &str| attribute_names.iter().any(|a| a == name);

        if !present(&mapping.district) {
            return Err(KozuError::MissingColumn {
                column: mapping.district.clone(),
                role: "district",
            });
        }
        if !present(&mapping.lot_number) {
            return Err(KozuError::MissingColumn {
                column: mapping.lot_number.clone(),
                role: "lot number",
            });
        }

        let schema = Schema {
            district: mapping.district.clone(),
            sub_district: present(&mapping.sub_district).then(|| mapping.sub_district.clone()),
            sub_sub_district: present(&mapping.sub_sub_district)
                .then(|| mapping.sub_sub_district.clone()),
            lot_number: mapping.lot_number.clone(),
        };

        let mut columns = Vec::with_capacity(attribute_names.len());
        let mut extra_columns = Vec::new();
        for name in attribute_names {
            let column = if *name == schema.district {
                Column::District
            } else if Some(name.as_str()) == schema.sub_district.as_deref() {
                Column::SubDistrict
            } else if Some(name.as_str()) == schema.sub_sub_district.as_deref() {
                Column::SubSubDistrict
            } else if *name == schema.lot_number {
                Column::LotNumber
            } else {
                extra_columns.push(name.clone());
                Column::Extra(extra_columns.len() - 1)
            };
            columns.push(column);
        }

        Ok(Self {
            schema,
            columns,
            extra_columns,
        })
    }

    /// Construit une parcelle ; `value(i)` lit l'attribut source d'index `i`
    pub fn record(
        &self,
        value: impl Fn(usize) -> Option<String>,
        geometry: Option<Geometry>,
    ) -> ParcelRecord {
        let mut record = ParcelRecord {
            extras: vec![None; self.extra_columns.len()],
            geometry,
            ..Default::default()
        };

        for (idx, column) in self.columns.iter().enumerate() {
            let v = value(idx);
            match column {
                Column::District => record.district = v,
                Column::SubDistrict => record.sub_district = v,
                Column::SubSubDistrict => record.sub_sub_district = v,
                Column::LotNumber => record.lot_number = v,
                Column::Extra(i) => {
                    if let Some(slot) = record.extras.get_mut(*i) {
                        *slot = v;
                    }
                }
            }
        }

        record
    }
}
