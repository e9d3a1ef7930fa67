use std::path::PathBuf;

use near_selector_core::{AppMetadata, Network, PortError, SelectorOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeProfile {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub runtime_profile: RuntimeProfile,
    pub network_id: String,
    pub node_url: Option<String>,
    pub contract_id: String,
    pub method_names: Vec<String>,
    pub wc_project_id: String,
    pub wc_relay_url: String,
    pub wc_chain_id: Option<String>,
    pub wc_icon_url: String,
    pub wc_bridge_url: Option<String>,
    pub app_metadata: AppMetadata,
    pub request_timeout_ms: u64,
    pub rpc_timeout_ms: u64,
    pub storage_path: Option<PathBuf>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            runtime_profile: RuntimeProfile::Development,
            network_id: "testnet".to_owned(),
            node_url: None,
            contract_id: "guest-book.testnet".to_owned(),
            method_names: vec!["addMessage".to_owned()],
            wc_project_id: String::new(),
            wc_relay_url: "wss://relay.walletconnect.com".to_owned(),
            wc_chain_id: None,
            wc_icon_url: "./assets/wallet-connect-icon.png".to_owned(),
            wc_bridge_url: None,
            app_metadata: AppMetadata {
                name: "NEAR Wallet Selector".to_owned(),
                description: "Guestbook dApp driven by NEAR Wallet Selector".to_owned(),
                url: "https://github.com/near/wallet-selector".to_owned(),
                icons: vec!["https://avatars.githubusercontent.com/u/37784886".to_owned()],
            },
            request_timeout_ms: 30_000,
            rpc_timeout_ms: 15_000,
            storage_path: None,
        }
    }
}

impl SelectorConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_var("RUNTIME_PROFILE") {
            cfg.runtime_profile = match v.to_ascii_lowercase().as_str() {
                "production" | "prod" => RuntimeProfile::Production,
                _ => RuntimeProfile::Development,
            };
        }
        if let Some(v) = env_var("NETWORK_ID") {
            cfg.network_id = v;
        }
        cfg.node_url = env_var("NODE_URL").or(cfg.node_url);
        if let Some(v) = env_var("CONTRACT_ID") {
            cfg.contract_id = v;
        }
        if let Some(v) = env_var("METHOD_NAMES") {
            cfg.method_names = v
                .split(',')
                .map(str::trim)
                .filter(|x| !x.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(v) = env_var("WC_PROJECT_ID") {
            cfg.wc_project_id = v;
        }
        if let Some(v) = env_var("WC_RELAY_URL") {
            cfg.wc_relay_url = v;
        }
        cfg.wc_chain_id = env_var("WC_CHAIN_ID").or(cfg.wc_chain_id);
        cfg.wc_bridge_url = env_var("WC_BRIDGE_URL").or(cfg.wc_bridge_url);
        cfg.request_timeout_ms = env_u64("REQUEST_TIMEOUT_MS", cfg.request_timeout_ms);
        cfg.rpc_timeout_ms = env_u64("RPC_TIMEOUT_MS", cfg.rpc_timeout_ms);
        cfg.storage_path = env_var("STORAGE_PATH").map(PathBuf::from).or(cfg.storage_path);
        cfg
    }

    pub fn strict_runtime_required(&self) -> bool {
        self.runtime_profile == RuntimeProfile::Production
    }

    pub fn network(&self) -> Result<Network, PortError> {
        match (Network::preset(&self.network_id), &self.node_url) {
            (Some(mut preset), Some(url)) => {
                preset.node_url = url.clone();
                Ok(preset)
            }
            (Some(preset), None) => Ok(preset),
            (None, Some(url)) => Ok(Network::custom(self.network_id.clone(), url.clone())),
            (None, None) => Err(PortError::Validation(format!(
                "network {} requires a node url",
                self.network_id
            ))),
        }
    }

    pub fn selector_options(&self) -> Result<SelectorOptions, PortError> {
        Ok(SelectorOptions {
            network: self.network()?,
            contract_id: self.contract_id.clone(),
            method_names: self.method_names.clone(),
        })
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("NEAR_SELECTOR_{name}"))
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn env_u64(name: &str, fallback: u64) -> u64 {
    match env_var(name) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            tracing::warn!("ignoring NEAR_SELECTOR_{name}={raw}: {e}");
            fallback
        }),
        None => fallback,
    }
}
