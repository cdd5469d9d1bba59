use std::collections::HashMap;

/// Local storage key for the persisted tile image cache.
pub const IMAGE_CACHE_KEY: &str = "baseland_image_cache_v1";

/// Persisted image cache: tile id → resolved image URL, with `None` meaning
/// "owned, no usable image yet". Stored as a JSON object keyed by
/// decimal-string tile ids.
pub type ImageCache = HashMap<u32, Option<String>>;

/// Serialize the cache for storage.
pub fn encode_image_cache(cache: &ImageCache) -> String {
    serde_json::to_string(cache).unwrap_or_else(|_| "{}".to_string())
}

/// Parse a stored cache blob. Corrupt data yields an empty cache rather
/// than an error; the cache is a best-effort warm start, not a source of
/// truth.
pub fn decode_image_cache(raw: &str) -> ImageCache {
    serde_json::from_str(raw).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_urls_and_nulls() {
        let mut cache = ImageCache::new();
        cache.insert(307, Some("https://cdn.x/tile.png".to_string()));
        cache.insert(9999, None);
        let decoded = decode_image_cache(&encode_image_cache(&cache));
        assert_eq!(decoded, cache);
    }

    #[test]
    fn keys_are_decimal_strings() {
        let mut cache = ImageCache::new();
        cache.insert(42, None);
        let raw = encode_image_cache(&cache);
        assert!(raw.contains("\"42\""));
    }

    #[test]
    fn corrupt_blob_decodes_to_empty() {
        assert!(decode_image_cache("not json").is_empty());
        assert!(decode_image_cache("{\"x\":true}").is_empty());
        assert!(decode_image_cache("{}").is_empty());
    }
}
