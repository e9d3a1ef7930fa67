#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use near_selector_adapters::{
    MemoryStorage, SelectorConfig, WalletConnectClient, WalletConnectModule, WalletConnectParams,
    WalletConnectWallet,
};
use near_selector_core::{AccountsChanged, EventEmitter, Network, SelectorOptions};

pub const CONTRACT_ID: &str = "guest-book.testnet";

pub fn options() -> SelectorOptions {
    SelectorOptions {
        network: Network::preset("testnet").expect("testnet preset"),
        contract_id: CONTRACT_ID.to_owned(),
        method_names: vec!["addMessage".to_owned()],
    }
}

pub fn module() -> WalletConnectModule {
    WalletConnectModule::new(WalletConnectParams::from_config(&SelectorConfig::default()))
}

pub fn wallet_client(accounts: &[&str]) -> WalletConnectClient {
    WalletConnectClient::in_memory(
        accounts
            .iter()
            .map(|a| format!("near:testnet:{a}"))
            .collect(),
    )
}

pub struct Fixture {
    pub wallet: WalletConnectWallet<WalletConnectClient>,
    pub client: WalletConnectClient,
    pub storage: Arc<MemoryStorage>,
    pub emitter: EventEmitter<AccountsChanged>,
    pub emitted: Arc<Mutex<Vec<AccountsChanged>>>,
}

pub fn fixture(accounts: &[&str]) -> Fixture {
    fixture_with(wallet_client(accounts), Arc::new(MemoryStorage::default()))
}

pub fn fixture_with(client: WalletConnectClient, storage: Arc<MemoryStorage>) -> Fixture {
    let emitter = EventEmitter::<AccountsChanged>::default();
    let emitted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&emitted);
    let _ = emitter.on(Arc::new(move |event: &AccountsChanged| {
        sink.lock().expect("emitted lock").push(event.clone());
    }));
    let wallet = module()
        .init(options(), storage.clone(), emitter.clone(), client.clone())
        .expect("init walletconnect wallet");
    Fixture {
        wallet,
        client,
        storage,
        emitter,
        emitted,
    }
}
