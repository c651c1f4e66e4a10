//! Point d'entrée CLI pour kozu-extract

use anyhow::Result;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Extraire une parcelle cadastrale (公図) et ses voisines vers KML et CSV
#[derive(Parser)]
#[command(name = "kozu-extract")]
#[command(author, version)]
#[command(about = "Extract a cadastral parcel and its neighbours to KML and CSV")]
#[command(long_about = "Loads a parcel dataset (GeoJSON, or a .zip/.tar/.tar.bz2 archive containing one) from a local file, a URL or a GitHub repository, finds the parcel matching a district / sub-district / lot number key, and writes it with every parcel intersecting a square around its centroid.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Extract {
            source,
            district,
            sub_district,
            sub_sub_district,
            lot,
            radius,
            output,
            geojson,
            report,
        } => {
            cli::cmd_extract(
                &source,
                &district,
                sub_district.as_deref(),
                sub_sub_district.as_deref(),
                &lot,
                radius,
                &output,
                geojson,
                report.as_deref(),
            )
            .await?;
        }
        Commands::Options {
            source,
            district,
            sub_district,
        } => {
            cli::cmd_options(&source, district.as_deref(), sub_district.as_deref()).await?;
        }
        Commands::Search {
            source,
            term,
            exact,
            limit,
        } => {
            cli::cmd_search(&source, &term, exact, limit).await?;
        }
        Commands::Info { source } => {
            cli::cmd_info(&source).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_file(false)
        .with_line_number(false)
        .init();
}
