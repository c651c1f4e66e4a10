//! Définition et implémentation des commandes CLI
//!
//! - `extract`: parcelle + voisines → KML / CSV (GeoJSON en option)
//! - `options`: valeurs disponibles pour un niveau de la hiérarchie
//! - `search`: recherche de numéros de lot
//! - `info`: résumé du jeu de données

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use kozu::{Column, LocationKey, MatchMode, ParcelDataset, Selection};
use tracing::{info, warn};

use kozu_extract::config::Config;
use kozu_extract::export::{self, naming, OutputKind, CSV_MIME, GEOJSON_MIME, KML_MIME};
use kozu_extract::report::ExtractionReport;
use kozu_extract::source::{load_source, DataSource, LoadedSource};

/// Arguments communs : source et configuration
#[derive(Args, Debug)]
pub struct SourceArgs {
    /// Local file (.geojson, .shp, .zip, .tar, .tar.bz2) or URL
    #[arg(short, long, env = "KOZU_SOURCE")]
    pub source: Option<String>,

    /// GitHub file as owner/repo/path
    #[arg(long)]
    pub github: Option<String>,

    /// Branch used with --github
    #[arg(long, default_value = "main")]
    pub branch: String,

    /// Config preset name (koji/generic) or path to a JSON config
    #[arg(long, env = "KOZU_CONFIG", default_value = "koji")]
    pub config: String,

    /// Force the source CRS (EPSG code)
    #[arg(long)]
    pub epsg: Option<u32>,

    /// Fallback encoding when the source is not UTF-8 (e.g. shift_jis)
    #[arg(long)]
    pub encoding: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract a parcel and its neighbours to KML and CSV
    Extract {
        #[command(flatten)]
        source: SourceArgs,

        /// District (大字)
        #[arg(long)]
        district: String,

        /// Sub-district (丁目); the config's none label means no selection
        #[arg(long)]
        sub_district: Option<String>,

        /// Sub-sub-district (小字)
        #[arg(long)]
        sub_sub_district: Option<String>,

        /// Lot number (地番)
        #[arg(long)]
        lot: String,

        /// Half side of the search square in CRS units (default: config, 61)
        #[arg(long)]
        radius: Option<f64>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Also write GeoJSON files
        #[arg(long)]
        geojson: bool,

        /// Write a JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List available values for the next level of the location hierarchy
    Options {
        #[command(flatten)]
        source: SourceArgs,

        /// Selected district; without it, districts are listed, with it the
        /// sub-districts and sub-sub-districts of that district
        #[arg(long)]
        district: Option<String>,

        /// Selected sub-district; narrows the sub-sub-districts
        #[arg(long)]
        sub_district: Option<String>,
    },

    /// Search lot numbers
    Search {
        #[command(flatten)]
        source: SourceArgs,

        /// Searched lot number or fragment
        #[arg(long)]
        term: String,

        /// Exact match instead of substring
        #[arg(long)]
        exact: bool,

        /// Maximum number of results displayed
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Print a dataset summary
    Info {
        #[command(flatten)]
        source: SourceArgs,
    },
}

/// Configuration résolue et jeu de données chargé
struct Session {
    config: Config,
    loaded: LoadedSource,
}

impl Session {
    async fn open(args: &SourceArgs) -> Result<Self> {
        let mut config = Config::resolve(&args.config)
            .with_context(|| format!("Failed to load config '{}'", args.config))?;
        config.apply_env()?;

        let options = config.load_options(args.epsg, args.encoding.as_deref())?;
        let source = DataSource::from_args(args.source.as_deref(), args.github.as_deref(), &args.branch)?;
        let loaded = load_source(&source, &options, config.fetch_timeout()).await?;

        Ok(Self { config, loaded })
    }

    fn dataset(&self) -> &ParcelDataset {
        &self.loaded.dataset
    }

    fn selection(&self, raw: Option<&str>) -> Selection {
        Selection::parse(raw, &self.config.none_label)
    }
}

/// Exécute la commande extract
#[allow(clippy::too_many_arguments)]
pub async fn cmd_extract(
    args: &SourceArgs,
    district: &str,
    sub_district: Option<&str>,
    sub_sub_district: Option<&str>,
    lot: &str,
    radius: Option<f64>,
    output: &Path,
    geojson: bool,
    report_path: Option<&Path>,
) -> Result<()> {
    let start = Instant::now();
    let session = Session::open(args).await?;

    let key = LocationKey::new(district.trim())
        .with_sub_district(session.selection(sub_district))
        .with_sub_sub_district(session.selection(sub_sub_district));
    let lot = lot.trim();
    let radius = radius.unwrap_or(session.config.radius);

    info!(district = %key.district, lot = lot, radius = radius, "Starting extraction");

    let extraction = kozu::extract(session.dataset(), &key, lot, radius);
    println!("{}", extraction.message());

    let mut report = ExtractionReport::new(
        &session.loaded.label,
        &session.loaded.checksum,
        &key,
        lot,
        radius,
        &extraction,
    );

    if let Some(result) = extraction.result() {
        std::fs::create_dir_all(output)
            .with_context(|| format!("Failed to create {}", output.display()))?;

        let stem = naming::file_stem(&key, lot);

        for (kind, subset) in [
            (OutputKind::Target, &result.targets),
            (OutputKind::Neighbors, &result.neighbors),
        ] {
            let name = naming::kml_file_name(&stem, kind);
            let document = format!("{}_{}", stem, kind.suffix());
            write_output(&mut report, &output.join(name), KML_MIME, || {
                export::to_kml(subset, &document)
            });
        }

        write_output(
            &mut report,
            &output.join(naming::csv_file_name(&stem)),
            CSV_MIME,
            || export::neighbors_to_csv(&result.neighbors, &session.config.centroid_columns),
        );

        if geojson {
            for (kind, subset) in [
                (OutputKind::Target, &result.targets),
                (OutputKind::Neighbors, &result.neighbors),
            ] {
                write_output(
                    &mut report,
                    &output.join(naming::geojson_file_name(&stem, kind)),
                    GEOJSON_MIME,
                    || export::to_geojson(subset),
                );
            }
        }
    }

    report.set_duration(start.elapsed());
    println!("{}", report.summary());

    if let Some(path) = report_path {
        report.save_to_file(path)?;
        info!(path = %path.display(), "Report written");
    }

    Ok(())
}

/// Génère puis écrit un fichier ; un échec est journalisé et reporté
fn write_output(
    report: &mut ExtractionReport,
    path: &Path,
    mime: &'static str,
    render: impl FnOnce() -> Result<String>,
) {
    let written = render().and_then(|content| {
        std::fs::write(path, &content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(content.len())
    });

    match written {
        Ok(bytes) => {
            info!(path = %path.display(), bytes = bytes, "Exported");
            report.record_output(path, mime, bytes);
        }
        Err(e) => {
            warn!(path = %path.display(), error = %format!("{:#}", e), "Export failed");
            report.record_failure(path, &e);
        }
    }
}

/// Exécute la commande options
pub async fn cmd_options(
    args: &SourceArgs,
    district: Option<&str>,
    sub_district: Option<&str>,
) -> Result<()> {
    let session = Session::open(args).await?;
    let dataset = session.dataset();

    let Some(district) = district.map(str::trim).filter(|d| !d.is_empty()) else {
        let values = kozu::get_options(dataset, Column::District, None);
        print_options(dataset, Column::District, values, &session.config.none_label);
        return Ok(());
    };

    let key = LocationKey::new(district).with_sub_district(session.selection(sub_district));

    // Sans sous-district choisi, les deux niveaux sont listés pour le district
    let mut listed = false;
    if key.sub_district == Selection::Any && dataset.has_column(Column::SubDistrict) {
        let values = kozu::cascade_options(dataset, &key, Column::SubDistrict);
        print_options(dataset, Column::SubDistrict, values, &session.config.none_label);
        listed = true;
    }
    if dataset.has_column(Column::SubSubDistrict) || !listed {
        let values = kozu::cascade_options(dataset, &key, Column::SubSubDistrict);
        print_options(dataset, Column::SubSubDistrict, values, &session.config.none_label);
    }

    Ok(())
}

fn print_options(dataset: &ParcelDataset, column: Column, values: Option<Vec<String>>, none_label: &str) {
    let name = dataset.schema.key_column_name(column).unwrap_or("-");
    match values {
        Some(values) => {
            println!("{} ({})", name, values.len());
            for value in values {
                println!("  {}", value);
            }
        }
        None => println!("{}: {}", name, none_label),
    }
}

/// Exécute la commande search
pub async fn cmd_search(args: &SourceArgs, term: &str, exact: bool, limit: usize) -> Result<()> {
    let session = Session::open(args).await?;
    let dataset = session.dataset();

    let mode = if exact {
        MatchMode::Exact
    } else {
        MatchMode::Contains
    };
    let found = kozu::search_lots(dataset, term, mode, limit);

    println!("{} match(es) for '{}'", found.total, term.trim());
    for record in &found.records {
        let parts: Vec<&str> = dataset
            .schema
            .canonical_columns()
            .iter()
            .filter_map(|&c| record.value(c))
            .collect();
        println!("  {}", parts.join(" / "));
    }
    if found.total > found.records.len() {
        println!("  ... and {} more", found.total - found.records.len());
    }

    Ok(())
}

/// Exécute la commande info
pub async fn cmd_info(args: &SourceArgs) -> Result<()> {
    let session = Session::open(args).await?;

    println!("Source: {}", session.loaded.label);
    println!("Checksum: {}", session.loaded.checksum);
    println!("{}", session.dataset().summary());
    println!("Columns: {}", session.dataset().column_names().join(", "));

    if session.dataset().is_empty() {
        warn!("Dataset contains no parcels");
    }

    Ok(())
}
