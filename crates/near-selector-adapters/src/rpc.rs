#[cfg(not(target_arch = "wasm32"))]
use std::sync::atomic::{AtomicU64, Ordering};

use base64::Engine;
use serde::de::DeserializeOwned;
use serde_json::Value;

use near_selector_core::{AccountView, Finality, PortError, RpcProviderPort};

#[cfg(not(target_arch = "wasm32"))]
use crate::SelectorConfig;

/// NEAR JSON-RPC provider speaking the `query` method over blocking HTTP.
#[derive(Debug)]
#[cfg(not(target_arch = "wasm32"))]
pub struct JsonRpcProvider {
    url: String,
    client: reqwest::blocking::Client,
    request_id: AtomicU64,
}

#[cfg(not(target_arch = "wasm32"))]
impl JsonRpcProvider {
    pub fn new(url: impl Into<String>, timeout_ms: u64) -> Result<Self, PortError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| PortError::Transport(format!("failed to build rpc client: {e}")))?;
        Ok(Self {
            url: url.into(),
            client,
            request_id: AtomicU64::new(0),
        })
    }

    pub fn with_config(config: &SelectorConfig) -> Result<Self, PortError> {
        let network = config.network()?;
        Self::new(network.node_url, config.rpc_timeout_ms)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn query(&self, params: Value) -> Result<Value, PortError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst) + 1;
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id.to_string(),
            "method": "query",
            "params": params,
        });
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|e| PortError::Transport(format!("rpc request failed: {e}")))?;
        let status = response.status();
        let body: Value = response
            .json()
            .map_err(|e| PortError::Transport(format!("rpc json decode failed: {e}")))?;
        if !status.is_success() {
            return Err(PortError::Transport(format!("rpc status {status}: {body}")));
        }
        if let Some(err) = body.get("error") {
            return Err(PortError::Transport(format!("rpc returned error: {err}")));
        }
        let result = body
            .get("result")
            .cloned()
            .ok_or_else(|| PortError::Transport("rpc missing result".to_owned()))?;
        // Query failures can also arrive as `result.error` with a 200 status.
        if let Some(err) = result.get("error").and_then(Value::as_str) {
            return Err(PortError::Transport(format!("rpc query error: {err}")));
        }
        Ok(result)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl RpcProviderPort for JsonRpcProvider {
    fn view_account(&self, account_id: &str, finality: Finality) -> Result<AccountView, PortError> {
        let result = self.query(serde_json::json!({
            "request_type": "view_account",
            "finality": finality.as_str(),
            "account_id": account_id,
        }))?;
        let mut view: AccountView = serde_json::from_value(result)
            .map_err(|e| PortError::Validation(format!("invalid view_account result: {e}")))?;
        view.account_id = account_id.to_owned();
        Ok(view)
    }

    fn call_function(
        &self,
        contract_id: &str,
        method_name: &str,
        args_base64: &str,
        finality: Finality,
    ) -> Result<Vec<u8>, PortError> {
        let result = self.query(serde_json::json!({
            "request_type": "call_function",
            "finality": finality.as_str(),
            "account_id": contract_id,
            "method_name": method_name,
            "args_base64": args_base64,
        }))?;
        let bytes = result
            .get("result")
            .and_then(Value::as_array)
            .ok_or_else(|| PortError::Transport("call_function: result bytes expected".to_owned()))?;
        bytes
            .iter()
            .map(|b| {
                b.as_u64()
                    .and_then(|n| u8::try_from(n).ok())
                    .ok_or_else(|| PortError::Validation("call_function: byte out of range".to_owned()))
            })
            .collect()
    }
}

/// Encodes view-call arguments; `null` becomes the empty string.
pub fn encode_args(args: &Value) -> Result<String, PortError> {
    if args.is_null() {
        return Ok(String::new());
    }
    let raw = serde_json::to_vec(args)
        .map_err(|e| PortError::Validation(format!("encode view args failed: {e}")))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(raw))
}

/// Calls a view method and decodes its JSON result.
pub fn view_function<T: DeserializeOwned>(
    provider: &(impl RpcProviderPort + ?Sized),
    contract_id: &str,
    method_name: &str,
    args: &Value,
    finality: Finality,
) -> Result<T, PortError> {
    let raw = provider.call_function(contract_id, method_name, &encode_args(args)?, finality)?;
    serde_json::from_slice(&raw).map_err(|e| {
        PortError::Validation(format!("{contract_id}.{method_name} returned invalid json: {e}"))
    })
}
