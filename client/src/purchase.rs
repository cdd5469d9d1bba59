use baseland_shared::mint_call;

use crate::config::{CONTRACT_ADDRESS, TX_EXPLORER_BASE};
use crate::wallet::{self, WalletSession};

/// Submit the mint transaction for a tile, returning the tx hash.
pub async fn submit_mint(
    session: &WalletSession,
    x: u32,
    y: u32,
    value_wei: u128,
) -> Result<String, String> {
    wallet::send_transaction(
        &session.address,
        CONTRACT_ADDRESS,
        &mint_call(x, y),
        &wei_hex(value_wei),
    )
    .await
}

/// Block explorer page for a transaction hash.
pub fn explorer_tx_url(tx_hash: &str) -> String {
    format!("{TX_EXPLORER_BASE}{tx_hash}")
}

fn wei_hex(value: u128) -> String {
    format!("0x{value:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explorer_url_points_at_the_tx() {
        assert_eq!(
            explorer_tx_url("0xabc123"),
            "https://base.blockscout.com/tx/0xabc123"
        );
    }

    #[test]
    fn wei_value_encodes_as_minimal_hex() {
        assert_eq!(wei_hex(0), "0x0");
        assert_eq!(wei_hex(1_000_000_000_000_000), "0x38d7ea4c68000");
    }
}
