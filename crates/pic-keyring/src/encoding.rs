// encoding.rs — Public key and signature decoding.
//
// Keyring entries may carry an Ed25519 public key in three textual forms:
//
//   - PEM:    "-----BEGIN PUBLIC KEY-----" wrapping a SubjectPublicKeyInfo
//   - hex:    64 hex digits, optionally prefixed with "0x"
//   - base64: anything else (standard or URL-safe alphabet, padding optional)
//
// All three normalize to raw key bytes. Length is checked by the caller so
// the error can name the key id.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;

/// Raw Ed25519 public key length.
pub const ED25519_PUBLIC_KEY_LEN: usize = 32;

/// DER prefix of an Ed25519 SubjectPublicKeyInfo (RFC 8410): SEQUENCE,
/// AlgorithmIdentifier { id-Ed25519 }, BIT STRING header.
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

const PEM_BEGIN: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_END: &str = "-----END PUBLIC KEY-----";

/// Textual encoding of a public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEncoding {
    Pem,
    Hex,
    Base64,
}

/// Decide which encoding a key string uses.
pub fn detect_encoding(value: &str) -> KeyEncoding {
    let v = value.trim();
    if v.starts_with("-----BEGIN") {
        return KeyEncoding::Pem;
    }
    let digits = strip_hex_prefix(v);
    if digits.len() == ED25519_PUBLIC_KEY_LEN * 2 && digits.chars().all(|c| c.is_ascii_hexdigit())
    {
        return KeyEncoding::Hex;
    }
    KeyEncoding::Base64
}

/// Decode a public key string to raw bytes. The error is a reason suitable
/// for embedding in a `KeyringError`.
pub fn decode_public_key(value: &str) -> Result<Vec<u8>, String> {
    let v = value.trim();
    if v.is_empty() {
        return Err("public key must be a non-empty string".to_string());
    }
    match detect_encoding(v) {
        KeyEncoding::Pem => decode_pem(v),
        KeyEncoding::Hex => {
            hex::decode(strip_hex_prefix(v)).map_err(|e| format!("invalid hex public key: {}", e))
        }
        KeyEncoding::Base64 => {
            decode_base64_lenient(v).map_err(|e| format!("invalid base64 public key: {}", e))
        }
    }
}

/// Decode base64 accepting the URL-safe alphabet and missing padding.
pub fn decode_base64_lenient(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let normalized: String = value
        .trim()
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    STANDARD_NO_PAD.decode(normalized.trim_end_matches('='))
}

fn strip_hex_prefix(v: &str) -> &str {
    v.strip_prefix("0x")
        .or_else(|| v.strip_prefix("0X"))
        .unwrap_or(v)
}

fn decode_pem(v: &str) -> Result<Vec<u8>, String> {
    let body = v
        .strip_prefix(PEM_BEGIN)
        .and_then(|rest| rest.trim_end().strip_suffix(PEM_END))
        .ok_or_else(|| "invalid PEM public key: expected a PUBLIC KEY block".to_string())?;

    let b64: String = body.split_whitespace().collect();
    let der = STANDARD
        .decode(b64)
        .map_err(|e| format!("invalid PEM public key: {}", e))?;

    match der.strip_prefix(&ED25519_SPKI_PREFIX[..]) {
        Some(raw) if der.len() == ED25519_SPKI_PREFIX.len() + ED25519_PUBLIC_KEY_LEN => {
            Ok(raw.to_vec())
        }
        _ => Err("invalid PEM public key: not an Ed25519 SubjectPublicKeyInfo".to_string()),
    }
}

#[cfg(test)]
pub(crate) fn pem_for(raw: &[u8]) -> String {
    let mut der = ED25519_SPKI_PREFIX.to_vec();
    der.extend_from_slice(raw);
    format!("{}\n{}\n{}\n", PEM_BEGIN, STANDARD.encode(der), PEM_END)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> Vec<u8> {
        (0u8..32).collect()
    }

    #[test]
    fn decodes_base64() {
        let b64 = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";
        assert_eq!(detect_encoding(b64), KeyEncoding::Base64);
        assert_eq!(decode_public_key(b64).unwrap(), raw());
    }

    #[test]
    fn decodes_url_safe_base64_without_padding() {
        let bytes = vec![0xfb; 32];
        let url_safe = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&bytes);
        assert!(url_safe.contains('-') || url_safe.contains('_'));
        assert_eq!(decode_public_key(&url_safe).unwrap(), bytes);
    }

    #[test]
    fn decodes_hex_with_and_without_prefix() {
        let hex_key = hex::encode(raw());
        assert_eq!(detect_encoding(&hex_key), KeyEncoding::Hex);
        assert_eq!(decode_public_key(&hex_key).unwrap(), raw());
        assert_eq!(decode_public_key(&format!("0x{}", hex_key)).unwrap(), raw());
    }

    #[test]
    fn decodes_pem_spki() {
        let pem = pem_for(&raw());
        assert_eq!(detect_encoding(&pem), KeyEncoding::Pem);
        assert_eq!(decode_public_key(&pem).unwrap(), raw());
    }

    #[test]
    fn rejects_fake_pem() {
        let pem = "-----BEGIN PUBLIC KEY-----\nMIIB...fake...\n-----END PUBLIC KEY-----\n";
        let err = decode_public_key(pem).unwrap_err();
        assert!(err.to_lowercase().contains("invalid pem public key"));
    }

    #[test]
    fn rejects_invalid_base64() {
        let err = decode_public_key("NOT_BASE64!!").unwrap_err();
        assert!(err.contains("base64"));
    }

    #[test]
    fn rejects_empty() {
        assert!(decode_public_key("   ").is_err());
    }
}
