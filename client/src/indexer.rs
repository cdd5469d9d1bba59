use gloo_net::http::Request;
use serde::Deserialize;

use crate::config::INDEXER_API_BASE;

/// One NFT from the wallet inventory endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletNft {
    pub token_id: u64,
    pub contract: String,
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
struct NftPage {
    #[serde(default)]
    items: Vec<NftItem>,
}

#[derive(Deserialize)]
struct NftItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    token: Option<NftToken>,
}

#[derive(Deserialize)]
struct NftToken {
    #[serde(default)]
    address: Option<String>,
}

/// Every ERC-721/1155 token the indexer lists for `address`.
pub async fn nfts_for_address(address: &str) -> Result<Vec<WalletNft>, String> {
    let url = format!("{INDEXER_API_BASE}/addresses/{address}/nft?type=ERC-721%2CERC-1155");
    let resp = Request::get(&url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;
    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    let page: NftPage = resp.json().await.map_err(|e| format!("parse error: {e}"))?;
    Ok(page.items.into_iter().filter_map(flatten_item).collect())
}

fn flatten_item(item: NftItem) -> Option<WalletNft> {
    let token_id = item.id.as_deref()?.parse().ok()?;
    let contract = item.token?.address?.to_lowercase();
    Some(WalletNft {
        token_id,
        contract,
        image_url: item.image_url.filter(|u| !u.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inventory_page() {
        let body = r#"{
            "items": [
                {"id": "9999", "image_url": null, "token": {"address": "0xDD7b"}},
                {"id": "307", "image_url": "https://img/307.png", "token": {"address": "0xDD7b"}},
                {"id": null, "image_url": "https://img/x.png"}
            ]
        }"#;
        let page: NftPage = serde_json::from_str(body).unwrap();
        let nfts: Vec<_> = page.items.into_iter().filter_map(flatten_item).collect();
        assert_eq!(nfts.len(), 2);
        assert_eq!(nfts[0].token_id, 9999);
        assert_eq!(nfts[0].contract, "0xdd7b");
        assert_eq!(nfts[0].image_url, None);
        assert_eq!(nfts[1].image_url.as_deref(), Some("https://img/307.png"));
    }

    #[test]
    fn items_missing_token_or_numeric_id_are_dropped() {
        let no_token = NftItem {
            id: Some("1".to_string()),
            image_url: None,
            token: None,
        };
        assert_eq!(flatten_item(no_token), None);

        let bad_id = NftItem {
            id: Some("cryptokitty".to_string()),
            image_url: None,
            token: Some(NftToken {
                address: Some("0x1".to_string()),
            }),
        };
        assert_eq!(flatten_item(bad_id), None);
    }

    #[test]
    fn empty_image_url_reads_as_absent() {
        let item = NftItem {
            id: Some("42".to_string()),
            image_url: Some(String::new()),
            token: Some(NftToken {
                address: Some("0xA".to_string()),
            }),
        };
        assert_eq!(flatten_item(item).unwrap().image_url, None);
    }
}
