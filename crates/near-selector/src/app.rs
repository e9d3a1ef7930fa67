//! Headless application wiring: storage, selector, WalletConnect module and
//! the guestbook panel, all built from one [`SelectorConfig`].

use std::sync::Arc;

use near_selector_adapters::{
    FileStorage, JsonRpcProvider, MemoryStorage, SelectorConfig, WalletConnectClient,
    WalletConnectModule, WalletConnectParams, WalletSelector,
};
use near_selector_core::{PortError, StoragePort};

use crate::content::ContentPanel;

pub struct App {
    config: SelectorConfig,
    client: WalletConnectClient,
    panel: ContentPanel<JsonRpcProvider>,
}

impl App {
    pub fn from_config(config: SelectorConfig) -> Result<Self, PortError> {
        let storage: Arc<dyn StoragePort> = match &config.storage_path {
            Some(path) => Arc::new(FileStorage::open(path)?),
            None => {
                tracing::warn!("no storage path configured, state will not survive a restart");
                Arc::new(MemoryStorage::default())
            }
        };

        let options = config.selector_options()?;
        let selector = Arc::new(WalletSelector::new(options.clone(), Arc::clone(&storage))?);

        let client = WalletConnectClient::with_config(&config);
        let wallet = WalletConnectModule::new(WalletConnectParams::from_config(&config)).init(
            options,
            Arc::clone(&storage),
            selector.emitter(),
            client.clone(),
        )?;
        selector.register(Arc::new(wallet))?;

        let rpc = Arc::new(JsonRpcProvider::with_config(&config)?);
        tracing::info!(
            network = %selector.network().network_id,
            node = rpc.url(),
            contract = selector.contract_id(),
            "wallet selector ready"
        );

        let panel = ContentPanel::new(selector, rpc, storage)?;
        Ok(Self {
            config,
            client,
            panel,
        })
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn panel(&self) -> &ContentPanel<JsonRpcProvider> {
        &self.panel
    }

    pub fn selector(&self) -> &Arc<WalletSelector> {
        self.panel.selector()
    }

    /// Drains bridge events queued by the sidecar.
    pub fn poll_bridge_events(&self) -> Result<usize, PortError> {
        self.client.poll_events()
    }
}
