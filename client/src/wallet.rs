use js_sys::{Function, Promise, Reflect};
use serde::Serialize;
use serde_wasm_bindgen::Serializer;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;

use baseland_shared::hex_to_u64;

use crate::config::{CHAIN_ID, CHAIN_NAME};

/// A connected injected-wallet session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WalletSession {
    pub address: String,
    pub chain_id: u64,
}

/// Fail unless the session is on the expected chain.
pub fn ensure_chain(session: &WalletSession) -> Result<(), String> {
    if session.chain_id != CHAIN_ID {
        return Err(format!(
            "Wrong network. Switch to {CHAIN_NAME} ({CHAIN_ID})."
        ));
    }
    Ok(())
}

/// Empty `params` array.
const NO_PARAMS: [&str; 0] = [];

/// Prompt the wallet for account access and report the active chain.
pub async fn connect() -> Result<WalletSession, String> {
    let accounts = request("eth_requestAccounts", &NO_PARAMS).await?;
    let address = js_sys::Array::from(&accounts)
        .get(0)
        .as_string()
        .ok_or_else(|| "wallet returned no accounts".to_string())?;
    let chain = request("eth_chainId", &NO_PARAMS).await?;
    let chain_id = chain
        .as_string()
        .as_deref()
        .and_then(hex_to_u64)
        .ok_or_else(|| "wallet returned no chain id".to_string())?;
    Ok(WalletSession { address, chain_id })
}

/// Read-only contract call routed through the wallet provider.
pub async fn provider_call(to: &str, data: &str) -> Result<String, String> {
    let params = (CallParams { to, data }, "latest");
    let result = request("eth_call", &params).await?;
    result
        .as_string()
        .ok_or_else(|| "unexpected eth_call result".to_string())
}

/// Submit a transaction through the wallet, returning the tx hash.
pub async fn send_transaction(
    from: &str,
    to: &str,
    data: &str,
    value: &str,
) -> Result<String, String> {
    let params = (TxParams {
        from,
        to,
        data,
        value,
    },);
    let result = request("eth_sendTransaction", &params).await?;
    result
        .as_string()
        .ok_or_else(|| "unexpected transaction result".to_string())
}

#[derive(Serialize)]
struct RequestArgs<'a, P: Serialize> {
    method: &'a str,
    params: &'a P,
}

#[derive(Serialize)]
struct CallParams<'a> {
    to: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
struct TxParams<'a> {
    from: &'a str,
    to: &'a str,
    data: &'a str,
    value: &'a str,
}

/// One EIP-1193 `request` round trip against the injected provider.
async fn request<P: Serialize>(method: &str, params: &P) -> Result<JsValue, String> {
    let provider = injected_provider()?;
    // Plain JS objects, not ES maps, or the provider rejects the args.
    let args = RequestArgs { method, params }
        .serialize(&Serializer::json_compatible())
        .map_err(|e| format!("encode error: {e}"))?;
    let request_fn: Function = Reflect::get(&provider, &JsValue::from_str("request"))
        .ok()
        .and_then(|f| f.dyn_into().ok())
        .ok_or_else(|| "wallet provider has no request method".to_string())?;
    let promise: Promise = request_fn
        .call1(&provider, &args)
        .map_err(|e| js_error_message(&e))?
        .dyn_into()
        .map_err(|_| "wallet request did not return a promise".to_string())?;
    JsFuture::from(promise)
        .await
        .map_err(|e| js_error_message(&e))
}

fn injected_provider() -> Result<JsValue, String> {
    let window = web_sys::window().ok_or("no window")?;
    let eth = Reflect::get(&window, &JsValue::from_str("ethereum")).unwrap_or(JsValue::UNDEFINED);
    if eth.is_undefined() || eth.is_null() {
        return Err("No wallet found. Install a browser wallet.".to_string());
    }
    Ok(eth)
}

fn js_error_message(err: &JsValue) -> String {
    Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .or_else(|| err.as_string())
        .unwrap_or_else(|| "wallet request failed".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_check_names_the_expected_network() {
        let good = WalletSession {
            address: "0xabc".to_string(),
            chain_id: CHAIN_ID,
        };
        assert_eq!(ensure_chain(&good), Ok(()));

        let bad = WalletSession {
            address: "0xabc".to_string(),
            chain_id: 1,
        };
        assert_eq!(
            ensure_chain(&bad),
            Err("Wrong network. Switch to Base (8453).".to_string())
        );
    }
}
