use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::grid::{GRID_SIZE, TILE_COUNT, tile_coords};

/// keccak-256 of `Minted(address,uint256,uint16,uint16,uint256)`.
pub const TOPIC_MINTED: &str =
    "0x767a71b9441d70aa7649cda7193401438d6a3ffad11ce0329c4874eb9ca57cbb";
/// keccak-256 of `Transfer(address,address,uint256)` (ERC-721).
pub const TOPIC_TRANSFER: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";
/// keccak-256 of `TransferSingle(address,address,address,uint256,uint256)` (ERC-1155).
pub const TOPIC_TRANSFER_SINGLE: &str =
    "0xc3d58168c5ae7397731d063d5bbf3d657854427343f4c083240f7aacaa2d0f62";

/// Selector of `tokenURI(uint256)`.
pub const SEL_TOKEN_URI: &str = "0xc87b56dd";
/// Selector of `uri(uint256)`.
pub const SEL_URI: &str = "0x0e89341c";
/// Selector of `mintPrice()`.
pub const SEL_MINT_PRICE: &str = "0x6817c76c";
/// Selector of `mint(uint16,uint16)`.
pub const SEL_MINT: &str = "0x1de77f91";

/// Retries per RPC call before the error is surfaced to the caller.
pub const RPC_RETRIES: u32 = 4;
/// Base delay for RPC retry backoff.
pub const RETRY_BASE_MS: f64 = 400.0;
/// Block span of a single `eth_getLogs` request during history replay.
pub const LOG_CHUNK_BLOCKS: u64 = 200_000;

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u32,
    pub method: &'a str,
    pub params: serde_json::Value,
}

impl<'a> RpcRequest<'a> {
    pub fn new(id: u32, method: &'a str, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// JSON-RPC 2.0 response envelope. Exactly one of `result`/`error` is set.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// One event log as returned by `eth_getLogs`.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub data: String,
    #[serde(rename = "blockNumber", default)]
    pub block_number: Option<String>,
}

/// A mint observed on the ledger, decoded from one event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedTile {
    pub x: u32,
    pub y: u32,
    pub to: String,
}

/// Decode a contract log into a mint, if it is one.
///
/// Three shapes count: the contract's own `Minted` event, an ERC-721
/// `Transfer` from the zero address, and an ERC-1155 `TransferSingle` from
/// the zero address with a non-zero value. Logs with coordinates off the
/// grid are discarded.
pub fn decode_mint(log: &LogEntry) -> Option<MintedTile> {
    let topic0 = log.topics.first()?;
    if eq_hex(topic0, TOPIC_MINTED) {
        // Minted(address indexed to, uint256 indexed tokenId, uint16 x, uint16 y, uint256 seed)
        let to = topic_address(log.topics.get(1)?)?;
        let x = word_u64(data_word(&log.data, 0)?)?;
        let y = word_u64(data_word(&log.data, 1)?)?;
        if x >= GRID_SIZE as u64 || y >= GRID_SIZE as u64 {
            return None;
        }
        Some(MintedTile {
            x: x as u32,
            y: y as u32,
            to,
        })
    } else if eq_hex(topic0, TOPIC_TRANSFER) {
        // Transfer(address indexed from, address indexed to, uint256 indexed tokenId)
        if !is_zero_word(log.topics.get(1)?) {
            return None;
        }
        let to = topic_address(log.topics.get(2)?)?;
        let id = topic_u64(log.topics.get(3)?)?;
        mint_from_token_id(id, to)
    } else if eq_hex(topic0, TOPIC_TRANSFER_SINGLE) {
        // TransferSingle(address indexed operator, address indexed from,
        //                address indexed to, uint256 id, uint256 value)
        if !is_zero_word(log.topics.get(2)?) {
            return None;
        }
        let to = topic_address(log.topics.get(3)?)?;
        if is_zero_word(data_word(&log.data, 1)?) {
            return None;
        }
        let id = word_u64(data_word(&log.data, 0)?)?;
        mint_from_token_id(id, to)
    } else {
        None
    }
}

fn mint_from_token_id(id: u64, to: String) -> Option<MintedTile> {
    if id >= TILE_COUNT as u64 {
        return None;
    }
    let (x, y) = tile_coords(id as u32);
    Some(MintedTile { x, y, to })
}

/// Call data for `tokenURI(tokenId)`.
pub fn token_uri_call(id: u32) -> String {
    format!("{SEL_TOKEN_URI}{id:064x}")
}

/// Call data for `uri(tokenId)`.
pub fn uri_call(id: u32) -> String {
    format!("{SEL_URI}{id:064x}")
}

/// Call data for `mintPrice()`.
pub fn mint_price_call() -> String {
    SEL_MINT_PRICE.to_string()
}

/// Call data for `mint(x, y)`.
pub fn mint_call(x: u32, y: u32) -> String {
    format!("{SEL_MINT}{x:064x}{y:064x}")
}

/// Decode a solo `string` return value from `eth_call` result hex.
pub fn decode_abi_string(result: &str) -> Option<String> {
    let hex = result.strip_prefix("0x").unwrap_or(result);
    let offset = word_u64(hex.get(0..64)?)? as usize * 2;
    let len = word_u64(hex.get(offset..offset + 64)?)? as usize * 2;
    let body = hex.get(offset + 64..offset + 64 + len)?;
    String::from_utf8(hex_bytes(body)?).ok()
}

/// `eth_getLogs` filter over an inclusive block range, with the first topic
/// slot matching any of `topics`.
pub fn logs_filter(address: &str, topics: &[&str], from: u64, to: u64) -> serde_json::Value {
    json!({
        "address": address,
        "fromBlock": block_hex(from),
        "toBlock": block_hex(to),
        "topics": [topics],
    })
}

/// Split an inclusive block range into inclusive chunks of at most `step`
/// blocks. Empty when `from > to`.
pub fn block_chunks(from: u64, to: u64, step: u64) -> Vec<(u64, u64)> {
    let step = step.max(1);
    let mut chunks = Vec::new();
    let mut start = from;
    while start <= to {
        let end = to.min(start.saturating_add(step - 1));
        chunks.push((start, end));
        if end == u64::MAX {
            break;
        }
        start = end + 1;
    }
    chunks
}

/// Deterministic part of the retry backoff for a 1-based attempt number.
/// Callers add jitter on top.
pub fn retry_delay_ms(attempt: u32) -> f64 {
    let exponent = attempt.saturating_sub(1).min(6);
    RETRY_BASE_MS * (1u32 << exponent) as f64
}

/// Minimal hex encoding of a block number, `0x0` for zero.
pub fn block_hex(n: u64) -> String {
    format!("0x{n:x}")
}

pub fn hex_to_u64(s: &str) -> Option<u64> {
    let hex = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(hex, 16).ok()
}

pub fn hex_to_u128(s: &str) -> Option<u128> {
    let hex = s.strip_prefix("0x").unwrap_or(s);
    u128::from_str_radix(hex, 16).ok()
}

/// Format a wei amount as a decimal ether string with trailing zeros
/// trimmed, keeping at least one fractional digit (`1.0`, `0.0001`).
pub fn format_eth(wei: u128) -> String {
    const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;
    let whole = wei / WEI_PER_ETH;
    let mut frac = format!("{:018}", wei % WEI_PER_ETH);
    while frac.len() > 1 && frac.ends_with('0') {
        frac.pop();
    }
    format!("{whole}.{frac}")
}

/// Shortened `0x1234...abcd` form of an address for display.
pub fn short_address(addr: &str) -> String {
    if addr.len() <= 10 {
        return addr.to_string();
    }
    format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
}

fn eq_hex(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// The `index`-th 32-byte word of ABI-encoded data, as 64 hex chars.
fn data_word(data: &str, index: usize) -> Option<&str> {
    let hex = data.strip_prefix("0x").unwrap_or(data);
    hex.get(index * 64..(index + 1) * 64)
}

/// Parse a 64-char hex word that must fit in a u64.
fn word_u64(word: &str) -> Option<u64> {
    if word.len() != 64 || !word[..48].bytes().all(|b| b == b'0') {
        return None;
    }
    u64::from_str_radix(&word[48..], 16).ok()
}

fn topic_u64(topic: &str) -> Option<u64> {
    word_u64(topic.strip_prefix("0x").unwrap_or(topic))
}

/// The address packed into the low 20 bytes of an indexed topic.
fn topic_address(topic: &str) -> Option<String> {
    let hex = topic.strip_prefix("0x").unwrap_or(topic);
    if hex.len() != 64 {
        return None;
    }
    Some(format!("0x{}", &hex[24..]))
}

fn is_zero_word(word: &str) -> bool {
    let hex = word.strip_prefix("0x").unwrap_or(word);
    !hex.is_empty() && hex.bytes().all(|b| b == b'0')
}

fn hex_bytes(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(v: u64) -> String {
        format!("{v:064x}")
    }

    fn topic_of(addr_byte: u8) -> String {
        format!("0x{:064x}", addr_byte as u64)
    }

    #[test]
    fn decodes_minted_event() {
        let log = LogEntry {
            topics: vec![
                TOPIC_MINTED.to_string(),
                "0x000000000000000000000000a0b1c2d3e4f5a6b7c8d9e0f1a2b3c4d5e6f7a8b9".to_string(),
                format!("0x{}", word(307)),
            ],
            data: format!("0x{}{}{}", word(3), word(7), word(12345)),
            block_number: Some("0x10".to_string()),
        };
        assert_eq!(
            decode_mint(&log),
            Some(MintedTile {
                x: 3,
                y: 7,
                to: "0xa0b1c2d3e4f5a6b7c8d9e0f1a2b3c4d5e6f7a8b9".to_string(),
            })
        );
    }

    #[test]
    fn minted_event_off_grid_is_discarded() {
        let log = LogEntry {
            topics: vec![
                TOPIC_MINTED.to_string(),
                topic_of(0xaa),
                format!("0x{}", word(1)),
            ],
            data: format!("0x{}{}{}", word(100), word(7), word(0)),
            block_number: None,
        };
        assert_eq!(decode_mint(&log), None);
    }

    #[test]
    fn transfer_from_zero_is_a_mint() {
        let log = LogEntry {
            topics: vec![
                TOPIC_TRANSFER.to_string(),
                format!("0x{}", "0".repeat(64)),
                topic_of(0xbb),
                format!("0x{}", word(307)),
            ],
            data: "0x".to_string(),
            block_number: None,
        };
        let mint = decode_mint(&log).unwrap();
        // Column-major id: 307 = x*100 + y.
        assert_eq!((mint.x, mint.y), (3, 7));
    }

    #[test]
    fn transfer_between_wallets_is_not_a_mint() {
        let log = LogEntry {
            topics: vec![
                TOPIC_TRANSFER.to_string(),
                topic_of(0x11),
                topic_of(0x22),
                format!("0x{}", word(307)),
            ],
            data: "0x".to_string(),
            block_number: None,
        };
        assert_eq!(decode_mint(&log), None);
    }

    #[test]
    fn transfer_single_requires_nonzero_value() {
        let base = |value: u64| LogEntry {
            topics: vec![
                TOPIC_TRANSFER_SINGLE.to_string(),
                topic_of(0x01),
                format!("0x{}", "0".repeat(64)),
                topic_of(0xcc),
            ],
            data: format!("0x{}{}", word(9999), word(value)),
            block_number: None,
        };
        assert_eq!(decode_mint(&base(0)), None);
        let mint = decode_mint(&base(1)).unwrap();
        assert_eq!((mint.x, mint.y), (99, 99));
    }

    #[test]
    fn replayed_logs_map_to_expected_tiles() {
        let minted = |x: u64, y: u64| LogEntry {
            topics: vec![
                TOPIC_MINTED.to_string(),
                topic_of(0xaa),
                format!("0x{}", word(x * 100 + y)),
            ],
            data: format!("0x{}{}{}", word(x), word(y), word(0)),
            block_number: None,
        };
        let logs = [minted(0, 0), minted(5, 12), minted(99, 99)];
        let ids: Vec<u32> = logs
            .iter()
            .filter_map(decode_mint)
            .map(|m| crate::grid::tile_id(m.x, m.y))
            .collect();
        assert_eq!(ids, vec![0, 512, 9999]);
    }

    #[test]
    fn unknown_topics_are_ignored() {
        let log = LogEntry {
            topics: vec![format!("0x{}", "ab".repeat(32))],
            data: "0x".to_string(),
            block_number: None,
        };
        assert_eq!(decode_mint(&log), None);
    }

    #[test]
    fn encodes_calls() {
        assert_eq!(
            mint_call(3, 7),
            format!("{SEL_MINT}{}{}", word(3), word(7))
        );
        assert_eq!(token_uri_call(307).len(), 10 + 64);
        assert_eq!(mint_price_call(), SEL_MINT_PRICE);
    }

    #[test]
    fn decodes_abi_string_return() {
        // offset 0x20, length 5, "hello"
        let result = format!(
            "0x{}{}{}",
            word(0x20),
            word(5),
            format!("{:0<64}", "68656c6c6f")
        );
        assert_eq!(decode_abi_string(&result).as_deref(), Some("hello"));
        assert_eq!(decode_abi_string("0x"), None);
    }

    #[test]
    fn chunks_inclusive_ranges() {
        assert_eq!(
            block_chunks(0, 599_999, 200_000),
            vec![(0, 199_999), (200_000, 399_999), (400_000, 599_999)]
        );
        assert_eq!(block_chunks(0, 250_000, 200_000), vec![(0, 199_999), (200_000, 250_000)]);
        assert_eq!(block_chunks(5, 5, 200_000), vec![(5, 5)]);
        assert!(block_chunks(10, 5, 200_000).is_empty());
    }

    #[test]
    fn retry_delay_doubles_from_base() {
        assert_eq!(retry_delay_ms(1), 400.0);
        assert_eq!(retry_delay_ms(2), 800.0);
        assert_eq!(retry_delay_ms(3), 1600.0);
        assert_eq!(retry_delay_ms(4), 3200.0);
    }

    #[test]
    fn formats_wei_as_ether() {
        assert_eq!(format_eth(0), "0.0");
        assert_eq!(format_eth(100_000_000_000_000), "0.0001");
        assert_eq!(format_eth(1_000_000_000_000_000_000), "1.0");
        assert_eq!(format_eth(1_500_000_000_000_000_000), "1.5");
    }

    #[test]
    fn shortens_addresses() {
        assert_eq!(
            short_address("0xa0b1c2d3e4f5a6b7c8d9e0f1a2b3c4d5e6f7a8b9"),
            "0xa0b1...a8b9"
        );
        assert_eq!(short_address("0x1"), "0x1");
    }

    #[test]
    fn filter_ors_topics_in_first_slot() {
        let f = logs_filter("0xdead", &[TOPIC_MINTED, TOPIC_TRANSFER], 0, 16);
        assert_eq!(f["fromBlock"], "0x0");
        assert_eq!(f["toBlock"], "0x10");
        assert_eq!(f["topics"][0].as_array().map(|a| a.len()), Some(2));
    }
}
