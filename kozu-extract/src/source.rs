//! Sources de données : fichier local, URL, dépôt GitHub
//!
//! Les téléchargements sont écrits dans un fichier temporaire portant
//! l'extension d'origine, supprimé quand le guard est relâché. Un `.shp`
//! distant est accompagné de ses fichiers compagnons dans un dossier
//! temporaire.

use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use kozu::{LoadOptions, ParcelDataset};
use regex::Regex;
use tracing::{debug, info};

/// Origine du jeu de parcelles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Local(PathBuf),
    Url(String),
    GitHub {
        owner: String,
        repo: String,
        branch: String,
        path: String,
    },
}

impl DataSource {
    /// Interprète `--source` (chemin ou URL) ou `--github owner/repo/path`
    pub fn from_args(source: Option<&str>, github: Option<&str>, branch: &str) -> Result<Self> {
        match (source, github) {
            (Some(_), Some(_)) => bail!("Use either --source or --github, not both"),
            (None, Some(location)) => Self::github(location, branch),
            (Some(s), None) if s.starts_with("http://") || s.starts_with("https://") => {
                Ok(Self::Url(s.to_string()))
            }
            (Some(s), None) => Ok(Self::Local(PathBuf::from(s))),
            (None, None) => bail!("No data source: use --source <path|url> or --github owner/repo/path"),
        }
    }

    /// `owner/repo/chemin/vers/fichier`
    pub fn github(location: &str, branch: &str) -> Result<Self> {
        let mut parts = location.trim_matches('/').splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(repo), Some(path))
                if !owner.is_empty() && !repo.is_empty() && !path.is_empty() =>
            {
                Ok(Self::GitHub {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                    branch: branch.to_string(),
                    path: path.to_string(),
                })
            }
            _ => bail!("Invalid GitHub source '{}'. Expected owner/repo/path", location),
        }
    }

    /// URL de téléchargement (None pour un fichier local)
    pub fn url(&self) -> Result<Option<String>> {
        match self {
            Self::Local(_) => Ok(None),
            Self::Url(url) => raw_github_url(url).map(Some),
            Self::GitHub {
                owner,
                repo,
                branch,
                path,
            } => Ok(Some(format!(
                "https://raw.githubusercontent.com/{}/{}/{}/{}",
                owner, repo, branch, path
            ))),
        }
    }

    /// Nom de fichier servant à détecter le format
    pub fn file_name(&self) -> String {
        let raw = match self {
            Self::Local(path) => path.to_string_lossy().into_owned(),
            Self::Url(url) => url.clone(),
            Self::GitHub { path, .. } => path.clone(),
        };
        let without_query = raw.split(&['?', '#'][..]).next().unwrap_or_default();
        without_query
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string()
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
            Self::GitHub {
                owner,
                repo,
                branch,
                path,
            } => write!(f, "github:{}/{}@{}/{}", owner, repo, branch, path),
        }
    }
}

/// Réécrit une URL `github.com/.../blob/...` vers `raw.githubusercontent.com`
pub fn raw_github_url(url: &str) -> Result<String> {
    let re = Regex::new(r"^https?://github\.com/([^/]+)/([^/]+)/(?:blob|raw)/([^?#]+)")
        .context("Invalid GitHub URL pattern")?;

    Ok(match re.captures(url) {
        Some(caps) => format!(
            "https://raw.githubusercontent.com/{}/{}/{}",
            &caps[1], &caps[2], &caps[3]
        ),
        None => url.to_string(),
    })
}

/// Jeu de données chargé avec son origine
#[derive(Debug)]
pub struct LoadedSource {
    pub dataset: ParcelDataset,
    /// Libellé de la source (chemin, URL)
    pub label: String,
    /// Checksum blake3 des octets source
    pub checksum: String,
}

/// Charge le jeu de parcelles depuis sa source
pub async fn load_source(
    source: &DataSource,
    options: &LoadOptions,
    timeout: Duration,
) -> Result<LoadedSource> {
    let label = source.to_string();

    let (dataset, checksum) = match source {
        DataSource::Local(path) => {
            let checksum = compute_file_checksum(path)?;
            let dataset = kozu::load(path, options)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            (dataset, checksum)
        }
        remote if is_shapefile_name(&remote.file_name()) => {
            let url = remote.url()?.context("Remote source without URL")?;
            let staged = stage_shapefile(&url, &remote.file_name(), timeout).await?;
            let dataset = kozu::load(&staged.shp, options)
                .with_context(|| format!("Failed to load {}", url))?;
            (dataset, staged.checksum)
        }
        remote => {
            let url = remote.url()?.context("Remote source without URL")?;
            let content = fetch(&url, timeout).await?;
            let checksum = blake3::hash(&content).to_hex().to_string();

            // Le fichier temporaire est supprimé à la fin de ce bloc
            let staged = stage(&content, &remote.file_name())?;
            let dataset = kozu::load(staged.path(), options)
                .with_context(|| format!("Failed to load {}", url))?;
            (dataset, checksum)
        }
    };

    info!(source = %label, records = dataset.len(), "Source ready");

    Ok(LoadedSource {
        dataset,
        label,
        checksum,
    })
}

/// Télécharge une URL (pas de retry, erreur si statut non 2xx)
async fn fetch(url: &str, timeout: Duration) -> Result<Bytes> {
    info!(url = url, timeout_secs = timeout.as_secs(), "Downloading");

    let client = reqwest::Client::builder()
        .user_agent(concat!("kozu-extract/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request failed: {}", url))?
        .error_for_status()
        .with_context(|| format!("Download failed: {}", url))?;

    let content = response
        .bytes()
        .await
        .with_context(|| format!("Failed to read response body: {}", url))?;

    debug!(url = url, bytes = content.len(), "Download complete");
    Ok(content)
}

/// Écrit les octets dans un fichier temporaire portant l'extension d'origine
fn stage(content: &[u8], file_name: &str) -> Result<tempfile::NamedTempFile> {
    let suffix = file_name
        .find('.')
        .map(|idx| &file_name[idx..])
        .unwrap_or("");

    let mut file = tempfile::Builder::new()
        .prefix("kozu-")
        .suffix(suffix)
        .tempfile()
        .context("Failed to create temporary file")?;
    file.write_all(content)?;
    file.flush()?;

    debug!(path = %file.path().display(), "Staged download");
    Ok(file)
}

fn is_shapefile_name(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".shp")
}

/// `.../parcels.shp?x=1` → `.../parcels.dbf?x=1`
fn sibling_url(url: &str, ext: &str) -> String {
    let (base, rest) = url.split_at(url.find(&['?', '#'][..]).unwrap_or(url.len()));
    let stem = base.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(base);
    format!("{}.{}{}", stem, ext, rest)
}

/// Couche Shapefile téléchargée dans un dossier temporaire
struct StagedShapefile {
    /// Supprimé avec le guard
    _dir: tempfile::TempDir,
    shp: PathBuf,
    /// Checksum blake3 du .shp puis du .dbf
    checksum: String,
}

/// Télécharge un `.shp` distant et ses compagnons (.dbf requis, .prj et .cpg
/// optionnels) sous le même nom
async fn stage_shapefile(url: &str, file_name: &str, timeout: Duration) -> Result<StagedShapefile> {
    let dir = tempfile::Builder::new()
        .prefix("kozu-")
        .tempdir()
        .context("Failed to create temporary directory")?;
    let shp = dir.path().join(file_name);

    let content = fetch(url, timeout).await?;
    std::fs::write(&shp, &content)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(&content);

    let dbf_url = sibling_url(url, "dbf");
    let dbf = fetch(&dbf_url, timeout)
        .await
        .context("A remote .shp needs its .dbf next to it")?;
    std::fs::write(shp.with_extension("dbf"), &dbf)?;
    hasher.update(&dbf);

    for ext in ["prj", "cpg"] {
        match fetch(&sibling_url(url, ext), timeout).await {
            Ok(content) => std::fs::write(shp.with_extension(ext), &content)?,
            Err(e) => debug!(ext = ext, error = %format!("{:#}", e), "Optional companion not found"),
        }
    }

    debug!(path = %shp.display(), "Staged shapefile");
    Ok(StagedShapefile {
        _dir: dir,
        shp,
        checksum: hasher.finalize().to_hex().to_string(),
    })
}

/// Calcule le checksum blake3 d'un fichier
fn compute_file_checksum(path: &Path) -> Result<String> {
    let mut file = std::fs::File::open(path)
        .with_context(|| format!("Cannot open {}", path.display()))?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0u8; 65536];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().to_hex().to_string())
}
