use baseland_shared::{
    TokenMetadata, decode_abi_string, inline_metadata, resolve_locator, substitute_erc1155_id,
    token_uri_call, uri_call,
};
use gloo_net::http::Request;

use crate::config::CONTRACT_ADDRESS;
use crate::indexer;
use crate::rpc::RpcClient;
use crate::wallet::{self, WalletSession};

/// Where a tile's artwork URL came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArtSource {
    WalletTokenUri,
    WalletUri,
    PublicTokenUri,
    Indexer,
}

impl ArtSource {
    pub fn tag(self) -> &'static str {
        match self {
            Self::WalletTokenUri => "erc721:tokenURI",
            Self::WalletUri => "erc1155:uri",
            Self::PublicTokenUri => "readonly:tokenURI",
            Self::Indexer => "wallet:list",
        }
    }
}

/// Resolution strategies in the order they are tried. Reordering this array
/// is the whole tuning surface for artwork lookup.
pub const RESOLVE_ORDER: [ArtSource; 4] = [
    ArtSource::WalletTokenUri,
    ArtSource::WalletUri,
    ArtSource::PublicTokenUri,
    ArtSource::Indexer,
];

/// Outcome of one resolution pass over [`RESOLVE_ORDER`].
#[derive(Clone, Debug, Default)]
pub struct ResolvedArt {
    pub image_url: Option<String>,
    pub source: Option<ArtSource>,
}

/// Try each strategy until one settles the token's artwork.
///
/// A strategy settles the pass as soon as it obtains a parsed metadata
/// document, even when that document names no image; later strategies only
/// run when the earlier ones could not produce metadata at all. Strategies
/// needing a wallet are skipped while disconnected.
pub async fn resolve_token_image(
    rpc: &RpcClient,
    wallet: Option<&WalletSession>,
    token_id: u32,
) -> ResolvedArt {
    for source in RESOLVE_ORDER {
        let outcome = match source {
            ArtSource::WalletTokenUri => wallet_token_uri(wallet, token_id).await,
            ArtSource::WalletUri => wallet_uri(wallet, token_id).await,
            ArtSource::PublicTokenUri => public_token_uri(rpc, token_id).await,
            ArtSource::Indexer => indexer_lookup(wallet, token_id).await,
        };
        if let Some(image_url) = outcome {
            return ResolvedArt {
                image_url,
                source: Some(source),
            };
        }
    }
    ResolvedArt::default()
}

// Each strategy returns `None` to fall through to the next one, and
// `Some(image)` once it obtained metadata; `Some(None)` still ends the pass.

async fn wallet_token_uri(wallet: Option<&WalletSession>, token_id: u32) -> Option<Option<String>> {
    wallet?;
    let result = wallet::provider_call(CONTRACT_ADDRESS, &token_uri_call(token_id))
        .await
        .ok()?;
    metadata_image(&decode_abi_string(&result)?).await
}

async fn wallet_uri(wallet: Option<&WalletSession>, token_id: u32) -> Option<Option<String>> {
    wallet?;
    let result = wallet::provider_call(CONTRACT_ADDRESS, &uri_call(token_id))
        .await
        .ok()?;
    let uri = substitute_erc1155_id(&decode_abi_string(&result)?, token_id);
    metadata_image(&uri).await
}

async fn public_token_uri(rpc: &RpcClient, token_id: u32) -> Option<Option<String>> {
    let result = rpc
        .eth_call(CONTRACT_ADDRESS, &token_uri_call(token_id))
        .await
        .ok()?;
    metadata_image(&decode_abi_string(&result)?).await
}

async fn indexer_lookup(wallet: Option<&WalletSession>, token_id: u32) -> Option<Option<String>> {
    let session = wallet?;
    let list = indexer::nfts_for_address(&session.address).await.ok()?;
    let hit = list
        .into_iter()
        .find(|n| n.token_id == u64::from(token_id))?;
    let url = hit.image_url?;
    Some(Some(resolve_locator(&url)))
}

/// Fetch a metadata document and pull its artwork locator out.
async fn metadata_image(uri: &str) -> Option<Option<String>> {
    let target = resolve_locator(uri);
    let meta = match inline_metadata(&target) {
        Some(meta) => meta,
        None => fetch_metadata(&target).await?,
    };
    Some(meta.image_locator().map(resolve_locator))
}

async fn fetch_metadata(url: &str) -> Option<TokenMetadata> {
    // No HTTP status check: a non-JSON error page fails the parse and the
    // pass falls through to the next strategy anyway.
    Request::get(url)
        .cache(web_sys::RequestCache::NoStore)
        .send()
        .await
        .ok()?
        .json()
        .await
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_strategies_precede_public_ones() {
        assert_eq!(RESOLVE_ORDER[0], ArtSource::WalletTokenUri);
        assert_eq!(RESOLVE_ORDER[1], ArtSource::WalletUri);
        assert_eq!(RESOLVE_ORDER[2], ArtSource::PublicTokenUri);
        assert_eq!(RESOLVE_ORDER[3], ArtSource::Indexer);
    }

    #[test]
    fn source_tags_are_stable() {
        let tags: Vec<_> = RESOLVE_ORDER.iter().map(|s| s.tag()).collect();
        assert_eq!(
            tags,
            [
                "erc721:tokenURI",
                "erc1155:uri",
                "readonly:tokenURI",
                "wallet:list"
            ]
        );
    }
}
