use base64::Engine;
use serde::Deserialize;

/// Metadata document served for a token by `tokenURI`/`uri`.
/// Only the image fields matter for rendering; everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenMetadata {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl TokenMetadata {
    /// Image locator to display: `image` wins over `image_url`, empty strings
    /// count as absent.
    pub fn image_locator(&self) -> Option<&str> {
        self.image
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.image_url.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Normalize a content locator into a fetchable URL.
///
/// `ipfs://` locators are rewritten to the ipfs.io gateway. Anything else is
/// trimmed and stripped of stray wrapping quotes, which some metadata
/// endpoints emit around bare string URIs.
pub fn resolve_locator(raw: &str) -> String {
    if let Some(path) = raw.strip_prefix("ipfs://") {
        return format!("https://ipfs.io/ipfs/{path}");
    }
    raw.trim().trim_matches('"').to_string()
}

/// Token id as the 64-digit lowercase hex string used by the ERC-1155
/// metadata convention.
pub fn erc1155_hex(id: u32) -> String {
    format!("{id:064x}")
}

/// Substitute the first `{id}` marker in an ERC-1155 `uri` template.
pub fn substitute_erc1155_id(uri: &str, id: u32) -> String {
    if uri.contains("{id}") {
        uri.replacen("{id}", &erc1155_hex(id), 1)
    } else {
        uri.to_string()
    }
}

/// Decode a `data:application/json` URI with a base64 payload into metadata.
/// Returns `None` for any other scheme or a malformed payload.
pub fn inline_metadata(uri: &str) -> Option<TokenMetadata> {
    if !uri.starts_with("data:application/json") {
        return None;
    }
    let payload = uri.split_once(',').map(|(_, p)| p).unwrap_or("");
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Substrings that mark an image URL as a pre-reveal placeholder.
pub const PLACEHOLDER_HINTS: [&str; 4] = ["placeholder", "unrevealed", "pre-reveal", "prereveal"];

/// Whether a cached image URL should be treated as "not revealed yet".
/// A missing URL counts as a placeholder.
pub fn is_placeholder_url(url: Option<&str>) -> bool {
    let Some(u) = url else { return true };
    if u.is_empty() {
        return true;
    }
    let s = u.to_lowercase();
    PLACEHOLDER_HINTS.iter().any(|h| s.contains(h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_ipfs_locators_to_gateway() {
        assert_eq!(
            resolve_locator("ipfs://QmYx4/token/7.json"),
            "https://ipfs.io/ipfs/QmYx4/token/7.json"
        );
    }

    #[test]
    fn strips_whitespace_and_wrapping_quotes() {
        assert_eq!(
            resolve_locator("  \"https://example.com/a.png\"  "),
            "https://example.com/a.png"
        );
        assert_eq!(resolve_locator("https://example.com/b.png"), "https://example.com/b.png");
    }

    #[test]
    fn erc1155_hex_is_64_digits() {
        assert_eq!(
            erc1155_hex(9999),
            "000000000000000000000000000000000000000000000000000000000000270f"
        );
        assert_eq!(erc1155_hex(0).len(), 64);
    }

    #[test]
    fn substitutes_first_id_marker_only() {
        let uri = "https://api.example.com/{id}/{id}.json";
        let out = substitute_erc1155_id(uri, 1);
        assert!(out.starts_with("https://api.example.com/00000000"));
        assert!(out.ends_with("/{id}.json"));
        assert_eq!(substitute_erc1155_id("https://x/1.json", 1), "https://x/1.json");
    }

    #[test]
    fn decodes_inline_base64_metadata() {
        // {"image":"ipfs://Qm1","name":"t"}
        let uri = "data:application/json;base64,eyJpbWFnZSI6ImlwZnM6Ly9RbTEiLCJuYW1lIjoidCJ9";
        let meta = inline_metadata(uri).unwrap();
        assert_eq!(meta.image_locator(), Some("ipfs://Qm1"));
        assert!(inline_metadata("https://example.com/meta.json").is_none());
        assert!(inline_metadata("data:application/json;base64,!!!").is_none());
    }

    #[test]
    fn image_field_wins_over_image_url() {
        let meta = TokenMetadata {
            image: Some("a".into()),
            image_url: Some("b".into()),
        };
        assert_eq!(meta.image_locator(), Some("a"));
        let meta = TokenMetadata {
            image: Some(String::new()),
            image_url: Some("b".into()),
        };
        assert_eq!(meta.image_locator(), Some("b"));
        assert_eq!(TokenMetadata::default().image_locator(), None);
    }

    #[test]
    fn placeholder_detection() {
        assert!(is_placeholder_url(None));
        assert!(is_placeholder_url(Some("")));
        assert!(is_placeholder_url(Some("https://cdn.x/PreReveal.png")));
        assert!(is_placeholder_url(Some("https://cdn.x/unrevealed/7.png")));
        assert!(!is_placeholder_url(Some("https://cdn.x/tile/7.png")));
    }
}
