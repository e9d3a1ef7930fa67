use serde_json::Value;
use thiserror::Error;

use crate::bridge::{ClientEvent, ClientEventKind, ConnectParams, DisconnectParams, InitParams, RequestParams};
use crate::domain::{
    Account, AccountView, Finality, Session, SignAndSendTransactionParams,
    SignAndSendTransactionsParams, WalletMetadata, WalletType,
};
use crate::events::{EventHandler, Subscription};

#[derive(Debug, Error)]
pub enum PortError {
    #[error("port not implemented: {0}")]
    NotImplemented(&'static str),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("policy error: {0}")]
    Policy(String),
    #[error("wallet not connected")]
    NotConnected,
    #[error("storage error: {0}")]
    Storage(String),
}

/// External bridge protocol client (WalletConnect-style).
pub trait BridgeClientPort: Send + Sync {
    fn init(&self, params: &InitParams) -> Result<(), PortError>;
    /// First session already known to the client, if any.
    fn restore_session(&self) -> Result<Option<Session>, PortError>;
    fn connect(&self, params: &ConnectParams) -> Result<Session, PortError>;
    fn request(&self, params: &RequestParams) -> Result<Value, PortError>;
    fn disconnect(&self, params: &DisconnectParams) -> Result<(), PortError>;
    fn on(
        &self,
        kind: ClientEventKind,
        handler: EventHandler<ClientEvent>,
    ) -> Result<Subscription, PortError>;
}

pub trait RpcProviderPort: Send + Sync {
    fn view_account(&self, account_id: &str, finality: Finality) -> Result<AccountView, PortError>;
    /// Raw result bytes of a view call.
    fn call_function(
        &self,
        contract_id: &str,
        method_name: &str,
        args_base64: &str,
        finality: Finality,
    ) -> Result<Vec<u8>, PortError>;
}

/// String key/value store with `localStorage` semantics.
pub trait StoragePort: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, PortError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), PortError>;
    fn remove_item(&self, key: &str) -> Result<(), PortError>;
    fn keys(&self) -> Result<Vec<String>, PortError>;
}

/// Uniform wallet behaviour every wallet module exposes to the selector.
pub trait Wallet: Send + Sync {
    fn id(&self) -> &str;
    fn wallet_type(&self) -> WalletType;
    fn metadata(&self) -> &WalletMetadata;
    fn connect(&self) -> Result<Vec<Account>, PortError>;
    fn disconnect(&self) -> Result<(), PortError>;
    fn get_accounts(&self) -> Result<Vec<Account>, PortError>;
    fn sign_and_send_transaction(
        &self,
        params: SignAndSendTransactionParams,
    ) -> Result<Value, PortError>;
    fn sign_and_send_transactions(
        &self,
        params: SignAndSendTransactionsParams,
    ) -> Result<Value, PortError>;
}
