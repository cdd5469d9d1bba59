use std::cell::Cell;
use std::rc::Rc;

use baseland_shared::{LogEntry, RPC_RETRIES, RpcRequest, RpcResponse, hex_to_u64, retry_delay_ms};
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use serde_json::{Value, json};

use crate::config::RPC_ENDPOINTS;

/// JSON-RPC client over a pool of public gateways.
///
/// A failed call rotates to the next endpoint and backs off with jitter,
/// retrying up to `RPC_RETRIES` times before the error reaches the caller.
#[derive(Clone)]
pub struct RpcClient {
    cursor: Rc<Cell<usize>>,
    next_id: Rc<Cell<u32>>,
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcClient {
    pub fn new() -> Self {
        Self {
            cursor: Rc::new(Cell::new(0)),
            next_id: Rc::new(Cell::new(1)),
        }
    }

    pub async fn call(&self, method: &str, params: Value) -> Result<Value, String> {
        let mut attempt = 0u32;
        loop {
            match self.post_once(method, params.clone()).await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    attempt += 1;
                    if retries_exhausted(attempt) {
                        return Err(err);
                    }
                    self.cursor.set(self.cursor.get().wrapping_add(1));
                    let jitter = (js_sys::Math::random() * 150.0).floor();
                    TimeoutFuture::new((retry_delay_ms(attempt) + jitter) as u32).await;
                }
            }
        }
    }

    async fn post_once(&self, method: &str, params: Value) -> Result<Value, String> {
        let url = RPC_ENDPOINTS[self.cursor.get() % RPC_ENDPOINTS.len()];
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));

        let resp = Request::post(url)
            .json(&RpcRequest::new(id, method, params))
            .map_err(|e| format!("encode error: {e}"))?
            .send()
            .await
            .map_err(|e| format!("fetch error: {e}"))?;
        if !resp.ok() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let body: RpcResponse = resp.json().await.map_err(|e| format!("parse error: {e}"))?;
        if let Some(err) = body.error {
            return Err(format!("rpc {}: {}", err.code, err.message));
        }
        body.result.ok_or_else(|| "empty rpc result".to_string())
    }

    /// Latest block number.
    pub async fn block_number(&self) -> Result<u64, String> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        result
            .as_str()
            .and_then(hex_to_u64)
            .ok_or_else(|| format!("unexpected eth_blockNumber result: {result}"))
    }

    /// Logs matching `filter` (see [`baseland_shared::logs_filter`]).
    pub async fn get_logs(&self, filter: Value) -> Result<Vec<LogEntry>, String> {
        let result = self.call("eth_getLogs", json!([filter])).await?;
        serde_json::from_value(result).map_err(|e| format!("parse error: {e}"))
    }

    /// Read-only contract call, returning the raw hex result.
    pub async fn eth_call(&self, to: &str, data: &str) -> Result<String, String> {
        let result = self
            .call("eth_call", json!([{ "to": to, "data": data }, "latest"]))
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| format!("unexpected eth_call result: {result}"))
    }
}

/// The budget counts retries, not posts: `RPC_RETRIES` failures each get a
/// backoff and another post, and only the failure after that is final.
fn retries_exhausted(failures: u32) -> bool {
    failures > RPC_RETRIES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_calls_get_the_full_retry_budget() {
        for failures in 1..=RPC_RETRIES {
            assert!(!retries_exhausted(failures), "retry {failures} must run");
        }
        assert!(retries_exhausted(RPC_RETRIES + 1));
        // The last retry waits out the longest backoff step.
        assert_eq!(retry_delay_ms(RPC_RETRIES), 3200.0);
    }
}
