//! CRS d'un fichier `.prj` (WKT OGC ou ESRI)

use regex::Regex;
use tracing::warn;

use crate::types::Crs;

/// Identifie le CRS décrit par un `.prj`.
///
/// L'autorité EPSG la plus externe est prise quand elle est présente
/// (`AUTHORITY["EPSG","6677"]`, `ID["EPSG",6677]`). Sinon les noms ESRI
/// des systèmes japonais et UTM sont reconnus.
pub fn crs_from_prj(wkt: &str) -> Option<Crs> {
    let crs = epsg_authority(wkt).or_else(|| esri_name(wkt));
    if crs.is_none() {
        warn!(prj = %wkt.chars().take(80).collect::<String>(), "Unrecognised .prj");
    }
    crs
}

fn epsg_authority(wkt: &str) -> Option<Crs> {
    let re = Regex::new(r#"(?:AUTHORITY|ID)\[\s*"EPSG"\s*,\s*"?(\d+)"?\s*\]"#).ok()?;

    // En WKT1 comme en WKT2, l'autorité du CRS englobant est la dernière
    re.captures_iter(wkt)
        .last()
        .and_then(|caps| caps[1].parse().ok())
        .map(Crs::new)
}

fn esri_name(wkt: &str) -> Option<Crs> {
    let plane = Regex::new(r#"PROJCS\["JGD_(2000|2011)_Japan_Zone_(\d{1,2})""#).ok()?;
    if let Some(caps) = plane.captures(wkt) {
        let zone: u32 = caps[2].parse().ok()?;
        if !(1..=19).contains(&zone) {
            return None;
        }
        let first = if &caps[1] == "2000" { 2443 } else { 6669 };
        return Some(Crs::new(first + zone - 1));
    }

    let utm = Regex::new(r#"PROJCS\["(JGD_2000|JGD_2011|WGS_1984)_UTM_Zone_(\d{1,2})([NS])""#).ok()?;
    if let Some(caps) = utm.captures(wkt) {
        let zone: u32 = caps[2].parse().ok()?;
        let epsg = match (&caps[1], &caps[3]) {
            ("JGD_2000", "N") if (51..=55).contains(&zone) => 3097 + zone - 51,
            ("JGD_2011", "N") if (51..=55).contains(&zone) => 6688 + zone - 51,
            ("WGS_1984", "N") if (1..=60).contains(&zone) => 32600 + zone,
            ("WGS_1984", "S") if (1..=60).contains(&zone) => 32700 + zone,
            _ => return None,
        };
        return Some(Crs::new(epsg));
    }

    if wkt.contains("PROJCS[") {
        return None;
    }

    if wkt.contains("GCS_JGD_2011") {
        Some(Crs::new(6668))
    } else if wkt.contains("GCS_JGD_2000") {
        Some(Crs::new(4612))
    } else if wkt.contains("GCS_WGS_1984") {
        Some(Crs::WGS84)
    } else {
        None
    }
}
