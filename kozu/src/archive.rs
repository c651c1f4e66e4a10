//! Extraction de la couche source (GeoJSON ou Shapefile) depuis une archive
//! (.zip, .tar, .tar.bz2) ou un fichier direct

use bzip2::read::BzDecoder;
use std::io::{Cursor, Read};
use std::path::Path;
use tar::Archive;

use crate::KozuError;

/// Format du conteneur source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Fichier direct (.geojson ou .shp)
    Plain,
    Zip,
    Tar,
    TarBz2,
}

impl ArchiveKind {
    /// Détecte le format depuis les octets magiques, puis depuis l'extension
    pub fn detect(content: &[u8], name_hint: &str) -> Self {
        if content.starts_with(b"PK\x03\x04") || content.starts_with(b"PK\x05\x06") {
            return Self::Zip;
        }
        if content.starts_with(b"BZh") {
            return Self::TarBz2;
        }
        if content.len() > 262 && &content[257..262] == b"ustar" {
            return Self::Tar;
        }

        let name = name_hint.to_ascii_lowercase();
        if name.ends_with(".zip") {
            Self::Zip
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") || name.ends_with(".bz2") {
            Self::TarBz2
        } else if name.ends_with(".tar") {
            Self::Tar
        } else {
            Self::Plain
        }
    }
}

/// Couche source extraite
#[derive(Debug)]
pub enum SourceFile {
    GeoJson {
        /// Nom du membre (ou du fichier direct)
        name: String,
        /// Contenu brut (encodage non décodé)
        content: Vec<u8>,
    },
    Shapefile(ShapefileSet),
}

impl SourceFile {
    /// Nom du membre principal (.geojson ou .shp)
    pub fn name(&self) -> &str {
        match self {
            Self::GeoJson { name, .. } => name,
            Self::Shapefile(set) => &set.name,
        }
    }
}

/// Fichiers d'une couche Shapefile
#[derive(Debug)]
pub struct ShapefileSet {
    /// Nom du `.shp`
    pub name: String,
    pub shp: Vec<u8>,
    pub dbf: Vec<u8>,
    /// Définition du CRS (WKT)
    pub prj: Option<Vec<u8>>,
    /// Encodage de la table attributaire
    pub cpg: Option<Vec<u8>>,
}

/// Rôle d'un membre d'archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberKind {
    GeoJson,
    Shp,
    Dbf,
    Prj,
    Cpg,
}

impl MemberKind {
    fn extension(self) -> &'static str {
        match self {
            Self::GeoJson => "geojson",
            Self::Shp => "shp",
            Self::Dbf => "dbf",
            Self::Prj => "prj",
            Self::Cpg => "cpg",
        }
    }
}

struct Member {
    name: String,
    kind: MemberKind,
    content: Vec<u8>,
}

/// Lit un fichier local et en extrait la couche source
///
/// # Arguments
///
/// * `path` - Chemin vers un `.geojson`, un `.shp` (fichiers compagnons à
///   côté) ou une archive contenant l'un des deux
///
/// # Returns
///
/// L'unique couche trouvée
pub fn extract(path: &Path) -> Result<SourceFile, KozuError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    if member_kind(&name) == Some(MemberKind::Shp) {
        return shapefile_from_dir(path, name);
    }

    let content = std::fs::read(path)?;
    extract_bytes(content, &name)
}

/// Extrait la couche source depuis des octets déjà en mémoire
///
/// Un `.shp` seul est refusé : ses attributs sont dans le `.dbf`.
pub fn extract_bytes(content: Vec<u8>, name_hint: &str) -> Result<SourceFile, KozuError> {
    match ArchiveKind::detect(&content, name_hint) {
        ArchiveKind::Plain if is_shp(&content, name_hint) => {
            Err(KozuError::MissingFile(sibling_name(name_hint, MemberKind::Dbf)))
        }
        ArchiveKind::Plain => Ok(SourceFile::GeoJson {
            name: name_hint.to_string(),
            content,
        }),
        ArchiveKind::Zip => from_zip(&content),
        ArchiveKind::Tar => from_tar(Cursor::new(content)),
        ArchiveKind::TarBz2 => from_tar(BzDecoder::new(Cursor::new(content))),
    }
}

/// Code de fichier 9994 en big-endian, en tête de tout `.shp`
fn is_shp(content: &[u8], name_hint: &str) -> bool {
    content.starts_with(&[0x00, 0x00, 0x27, 0x0A])
        || member_kind(name_hint) == Some(MemberKind::Shp)
}

/// Couche Shapefile lue depuis le disque (compagnons dans le même dossier)
fn shapefile_from_dir(path: &Path, name: String) -> Result<SourceFile, KozuError> {
    let shp = std::fs::read(path)?;

    let sibling = |kind: MemberKind| -> Result<Option<Vec<u8>>, KozuError> {
        let ext = kind.extension();
        for candidate in [ext.to_string(), ext.to_ascii_uppercase()] {
            match std::fs::read(path.with_extension(candidate)) {
                Ok(content) => return Ok(Some(content)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    };

    let dbf = sibling(MemberKind::Dbf)?
        .ok_or_else(|| KozuError::MissingFile(sibling_name(&name, MemberKind::Dbf)))?;

    Ok(SourceFile::Shapefile(ShapefileSet {
        prj: sibling(MemberKind::Prj)?,
        cpg: sibling(MemberKind::Cpg)?,
        name,
        shp,
        dbf,
    }))
}

fn from_tar<R: Read>(reader: R) -> Result<SourceFile, KozuError> {
    let mut archive = Archive::new(reader);
    let mut members = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let name = entry.path()?.to_string_lossy().into_owned();
        let Some(kind) = member_kind(&name) else {
            continue;
        };

        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        members.push(Member { name, kind, content });
    }

    assemble(members)
}

fn from_zip(content: &[u8]) -> Result<SourceFile, KozuError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(content))
        .map_err(|e| KozuError::InvalidArchive(e.to_string()))?;
    let mut members = Vec::new();

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| KozuError::InvalidArchive(e.to_string()))?;
        if file.is_dir() {
            continue;
        }

        let name = file.name().to_string();
        let Some(kind) = member_kind(&name) else {
            continue;
        };

        let mut content = Vec::new();
        file.read_to_end(&mut content)?;
        members.push(Member { name, kind, content });
    }

    assemble(members)
}

/// Rôle d'un membre (ignore les métadonnées macOS et les fichiers cachés)
fn member_kind(name: &str) -> Option<MemberKind> {
    let lower = name.to_ascii_lowercase();
    let base = lower.rsplit('/').next().unwrap_or(&lower);

    if lower.starts_with("__macosx/") || base.starts_with('.') {
        return None;
    }

    let (_, ext) = base.rsplit_once('.')?;
    match ext {
        "geojson" | "json" => Some(MemberKind::GeoJson),
        "shp" => Some(MemberKind::Shp),
        "dbf" => Some(MemberKind::Dbf),
        "prj" => Some(MemberKind::Prj),
        "cpg" => Some(MemberKind::Cpg),
        _ => None,
    }
}

/// `dir/parcels.shp` → `dir/parcels.dbf`
fn sibling_name(name: &str, kind: MemberKind) -> String {
    let stem = name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name);
    format!("{}.{}", stem, kind.extension())
}

/// Chemin sans extension, en minuscules, pour apparier les compagnons
fn stem_key(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    match lower.rsplit_once('.') {
        Some((stem, _)) => stem.to_string(),
        None => lower,
    }
}

/// L'archive doit contenir exactement une couche : un GeoJSON ou un `.shp`
fn assemble(members: Vec<Member>) -> Result<SourceFile, KozuError> {
    let layers: Vec<&Member> = members
        .iter()
        .filter(|m| matches!(m.kind, MemberKind::GeoJson | MemberKind::Shp))
        .collect();

    match layers.len() {
        0 => return Err(KozuError::MissingFile("vector layer (.geojson/.json/.shp)".into())),
        1 => {}
        n => {
            let names = layers
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(KozuError::InvalidArchive(format!(
                "expected exactly one vector layer, found {}: {}",
                n, names
            )));
        }
    }

    let layer_kind = layers[0].kind;
    let layer_name = layers[0].name.clone();
    let stem = stem_key(&layer_name);

    let mut members = members;
    let mut take = |kind: MemberKind| -> Option<Vec<u8>> {
        let idx = members
            .iter()
            .position(|m| m.kind == kind && stem_key(&m.name) == stem)?;
        Some(members.swap_remove(idx).content)
    };

    if layer_kind == MemberKind::GeoJson {
        let content = take(MemberKind::GeoJson).unwrap_or_default();
        return Ok(SourceFile::GeoJson {
            name: layer_name,
            content,
        });
    }

    let shp = take(MemberKind::Shp).unwrap_or_default();
    let dbf = take(MemberKind::Dbf)
        .ok_or_else(|| KozuError::MissingFile(sibling_name(&layer_name, MemberKind::Dbf)))?;

    Ok(SourceFile::Shapefile(ShapefileSet {
        prj: take(MemberKind::Prj),
        cpg: take(MemberKind::Cpg),
        name: layer_name,
        shp,
        dbf,
    }))
}
