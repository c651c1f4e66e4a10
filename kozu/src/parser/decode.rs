//! Décodage du texte source (UTF-8 ou encodage de repli)

use std::borrow::Cow;

use encoding_rs::Encoding;
use tracing::{debug, warn};

/// Décode les octets en texte.
///
/// L'UTF-8 valide (avec ou sans BOM) est emprunté tel quel ; sinon le contenu
/// est décodé avec `fallback` (Shift_JIS pour les fichiers japonais anciens).
pub fn decode<'a>(data: &'a [u8], fallback: &'static Encoding) -> Cow<'a, str> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);

    match simdutf8::basic::from_utf8(data) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            debug!(encoding = fallback.name(), "Source is not UTF-8, decoding with fallback");
            let (decoded, _, had_errors) = fallback.decode(data);
            if had_errors {
                warn!(
                    encoding = fallback.name(),
                    "Malformed sequences replaced while decoding source"
                );
            }
            decoded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_is_borrowed() {
        let text = decode("大字名".as_bytes(), encoding_rs::SHIFT_JIS);
        assert!(matches!(text, Cow::Borrowed("大字名")));
    }

    #[test]
    fn test_bom_is_stripped() {
        let text = decode(b"\xEF\xBB\xBF{}", encoding_rs::SHIFT_JIS);
        assert_eq!(text, "{}");
    }

    #[test]
    fn test_shift_jis_fallback() {
        let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode("地番");
        let text = decode(&bytes, encoding_rs::SHIFT_JIS);
        assert_eq!(text, "地番");
    }
}
