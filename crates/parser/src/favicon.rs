use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const FAVICON_MAX_BYTES: usize = 100 * 1024;

/// Synthesizes a `data:` URI from favicon bytes, dropping silently if
/// the payload exceeds the cap (spec §4.10).
pub fn favicon_data_uri(bytes: &[u8], content_type: Option<&str>) -> Option<String> {
    if bytes.len() > FAVICON_MAX_BYTES {
        return None;
    }
    let mime = content_type.unwrap_or("image/x-icon");
    Some(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_small_favicon() {
        let bytes = [0u8, 1, 2, 3];
        let uri = favicon_data_uri(&bytes, Some("image/png")).unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn drops_oversized_favicon() {
        let bytes = vec![0u8; FAVICON_MAX_BYTES + 1];
        assert!(favicon_data_uri(&bytes, None).is_none());
    }

    #[test]
    fn defaults_mime_when_missing() {
        let uri = favicon_data_uri(&[1, 2, 3], None).unwrap();
        assert!(uri.starts_with("data:image/x-icon;base64,"));
    }
}
