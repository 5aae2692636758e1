//! Image-service identifiers. The image server takes the original image URL as a
//! URL-safe base64 string (`-`/`_` alphabet, `=` padding kept).

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid base64 identifier: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Identifier does not decode to UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub fn encode_url(url: &str) -> String {
    URL_SAFE.encode(url.as_bytes())
}

pub fn decode_url(encoded: &str) -> Result<String, DecodeError> {
    let bytes = URL_SAFE.decode(encoded)?;
    Ok(String::from_utf8(bytes)?)
}

/// Image-service resource id for an encoded image URL: `<base><encoded>`.
pub fn service_id(base: &str, encoded: &str) -> String {
    format!("{}{}", base, encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_url_safe_alphabet_with_padding() {
        // 0xfb 0xff encodes to "+/8=" in the standard alphabet.
        let encoded = URL_SAFE.encode([0xfbu8, 0xff]);
        assert_eq!(encoded, "-_8=");
        assert_eq!(encode_url("a"), "YQ==");
    }

    #[test]
    fn encodes_known_image_url() {
        assert_eq!(
            encode_url("https://a.b/c.jpg"),
            "aHR0cHM6Ly9hLmIvYy5qcGc="
        );
    }

    #[test]
    fn decode_recovers_ascii_and_utf8_urls() -> Result<(), DecodeError> {
        for url in [
            "https://cervantes.library.tamu.edu/images/1605-mad-cue-t01-a01.jpg?x=1&y=2",
            "https://example.org/ediciones/año/señal-ñ.jpg",
            "",
        ] {
            assert_eq!(decode_url(&encode_url(url))?, url);
        }
        Ok(())
    }

    #[test]
    fn round_trips_generated_strings() -> Result<(), DecodeError> {
        // Linear congruential generator; fixed seed keeps failures reproducible.
        let mut state: u64 = 0x5eed_c0de;
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as u32
        };
        for _ in 0..2000 {
            let len = next() % 48;
            let text: String = (0..len)
                .map(|_| {
                    let pick = next();
                    let code = match pick % 4 {
                        0 => pick % 0x80,
                        1 => 0x80 + pick % 0x780,
                        2 => 0x800 + pick % 0xF800,
                        _ => 0x10000 + pick % 0x100000,
                    };
                    char::from_u32(code).unwrap_or('\u{FFFD}')
                })
                .collect();
            let encoded = encode_url(&text);
            assert!(!encoded.contains('+') && !encoded.contains('/'));
            assert_eq!(encoded.len() % 4, 0);
            assert_eq!(decode_url(&encoded)?, text);
        }
        Ok(())
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_url("not base64!").is_err());
    }

    #[test]
    fn service_id_concatenates() {
        assert_eq!(
            service_id("https://api-pre.library.tamu.edu/iiif/2/", "YQ=="),
            "https://api-pre.library.tamu.edu/iiif/2/YQ=="
        );
    }
}
