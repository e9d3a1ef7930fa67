pub mod config;
pub mod keystore;
pub mod rpc;
pub mod selector;
pub mod storage;
pub mod wallet_connect;
pub mod wc;

pub use config::{RuntimeProfile, SelectorConfig};
pub use keystore::{KeyPair, KeyStore};
pub use rpc::{encode_args, view_function};
#[cfg(not(target_arch = "wasm32"))]
pub use rpc::JsonRpcProvider;
pub use selector::{WalletSelector, STORAGE_SELECTED_WALLET_ID};
#[cfg(target_arch = "wasm32")]
pub use storage::BrowserStorage;
pub use storage::{FileStorage, MemoryStorage};
pub use wallet_connect::{
    WalletConnectModule, WalletConnectParams, WalletConnectWallet, STORAGE_ACCOUNTS,
    WALLET_CONNECT_ID,
};
pub use wc::WalletConnectClient;
