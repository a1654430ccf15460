use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::percent_decode_str;

use crate::{Result, SnapshotError};

const DATA_URL_PREFIX: &str = "data:";

pub fn is_data_url(url: &str) -> bool {
    url.starts_with(DATA_URL_PREFIX)
}

/// Wraps a base64 payload as `data:<mime>;base64,<payload>`.
pub fn data_url(payload: &str, mime: &str) -> String {
    format!("data:{mime};base64,{payload}")
}

/// Decoded body and media type of a `data:` URL (RFC 2397).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

pub fn decode_data_url(url: &str) -> Result<DataUrl> {
    let rest = url
        .strip_prefix(DATA_URL_PREFIX)
        .ok_or_else(|| SnapshotError::decode("URL does not start with 'data:'"))?;
    let (metadata, data) = rest
        .split_once(',')
        .ok_or_else(|| SnapshotError::decode("Missing comma in data URL"))?;

    let mut params = metadata.split(';');
    let media_type = params.next().unwrap_or("").trim().to_ascii_lowercase();
    let is_base64 = params.any(|p| p.trim().eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        let cleaned: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        STANDARD
            .decode(cleaned.as_bytes())
            .map_err(|e| SnapshotError::decode(format!("Invalid base64 in data URL: {e}")))?
    } else {
        percent_decode_str(data).collect()
    };

    Ok(DataUrl {
        media_type: if media_type.is_empty() {
            "text/plain".to_string()
        } else {
            media_type
        },
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_payload_with_mime() {
        assert_eq!(data_url("P", "image/png"), "data:image/png;base64,P");
        assert!(is_data_url("data:image/png;base64,P"));
        assert!(!is_data_url("http://x/data:"));
    }

    #[test]
    fn decodes_base64_body() {
        let decoded = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(decoded.media_type, "image/png");
        assert_eq!(decoded.bytes, b"hello");
    }

    #[test]
    fn decodes_percent_encoded_body() {
        let decoded = decode_data_url("data:image/svg+xml;charset=utf-8,%3Csvg%3E%23").unwrap();
        assert_eq!(decoded.media_type, "image/svg+xml");
        assert_eq!(decoded.bytes, b"<svg>#");
    }

    #[test]
    fn stray_percent_signs_are_kept() {
        let decoded = decode_data_url("data:,100%25 of 50%;%zz%4").unwrap();
        assert_eq!(decoded.media_type, "text/plain");
        assert_eq!(decoded.bytes, b"100% of 50%;%zz%4");
    }

    #[test]
    fn rejects_non_data_urls() {
        assert!(decode_data_url("http://x/a.png").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
    }
}
