use crate::error::{IniError, Result};

/// UTF-16LE byte-order mark (the layout 3ds Max writes).
const BOM_UTF16_LE: [u8; 2] = [0xFF, 0xFE];

/// UTF-8 byte-order mark.
const BOM_UTF8: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Decode raw INI file bytes into text.
///
/// Detection order:
/// 1. `FF FE` prefix -> UTF-16LE
/// 2. `EF BB BF` prefix -> UTF-8 (BOM stripped)
/// 3. strict UTF-8
/// 4. UTF-16LE as a last resort
///
/// A decode that exhausts all fallbacks is a fatal [`IniError::Decode`];
/// no partial text is ever returned. A leading U+FEFF that survives any
/// of the paths above is stripped.
pub fn decode(bytes: &[u8]) -> Result<String> {
    let text = if bytes.starts_with(&BOM_UTF16_LE) {
        let (decoded, had_errors) = encoding_rs::UTF_16LE.decode_with_bom_removal(bytes);
        if had_errors {
            return Err(IniError::Decode("invalid UTF-16LE byte sequence".to_string()));
        }
        decoded.into_owned()
    } else if bytes.starts_with(&BOM_UTF8) {
        let (decoded, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
        if had_errors {
            return Err(IniError::Decode("invalid UTF-8 byte sequence".to_string()));
        }
        decoded.into_owned()
    } else {
        match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => {
                let (decoded, had_errors) = encoding_rs::UTF_16LE.decode_without_bom_handling(bytes);
                if had_errors {
                    return Err(IniError::Decode(
                        "not valid UTF-8 or UTF-16".to_string(),
                    ));
                }
                decoded.into_owned()
            }
        }
    };

    Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
}

/// Encode text for writing back to disk.
///
/// Always emits UTF-16LE with an explicit leading BOM, regardless of the
/// input file's original encoding. This normalization matches what the
/// host application expects on Windows.
pub fn encode(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + text.len() * 2);
    bytes.extend_from_slice(&BOM_UTF16_LE);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}
