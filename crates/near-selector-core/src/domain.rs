use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ports::PortError;

pub const SIGN_AND_SEND_TRANSACTION: &str = "near_signAndSendTransaction";
pub const SIGN_AND_SEND_TRANSACTIONS: &str = "near_signAndSendTransactions";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: String,
}

impl Account {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletType {
    Injected,
    Bridge,
    Browser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletMetadata {
    pub name: String,
    pub description: Option<String>,
    pub icon_url: String,
}

/// Metadata the dApp presents to the wallet during pairing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMetadata {
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub icons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPermissions {
    pub chains: Vec<String>,
    pub methods: Vec<String>,
}

/// Settled bridge session. Accounts are `near:<network>:<account id>` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub topic: String,
    pub accounts: Vec<String>,
    #[serde(default)]
    pub permissions: SessionPermissions,
}

impl Session {
    pub fn account_ids(&self) -> Result<Vec<String>, PortError> {
        self.accounts
            .iter()
            .map(|raw| account_id_from_chain_account(raw))
            .collect()
    }
}

/// Extracts the account id from a `near:<network>:<account id>` string.
pub fn account_id_from_chain_account(raw: &str) -> Result<String, PortError> {
    match raw.split(':').nth(2) {
        Some(id) if !id.is_empty() => Ok(id.to_owned()),
        _ => Err(PortError::Validation(format!(
            "invalid session account: {raw}"
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pairing {
    pub topic: String,
    #[serde(default)]
    pub peer: Option<AppMetadata>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finality {
    Final,
    Optimistic,
}

impl Finality {
    pub fn as_str(self) -> &'static str {
        match self {
            Finality::Final => "final",
            Finality::Optimistic => "optimistic",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountView {
    pub amount: String,
    pub locked: String,
    pub code_hash: String,
    pub storage_usage: u64,
    #[serde(default)]
    pub storage_paid_at: u64,
    pub block_height: u64,
    pub block_hash: String,
    /// Not part of the RPC response; filled in with the queried id.
    #[serde(default)]
    pub account_id: String,
}

/// Guestbook entry as returned by the contract's `getMessages` view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub premium: bool,
    pub sender: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCallPermission {
    pub receiver_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowance: Option<String>,
    pub method_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PermissionRepr", into = "PermissionRepr")]
pub enum AccessKeyPermission {
    FullAccess,
    FunctionCall(FunctionCallPermission),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PermissionRepr {
    Named(String),
    Scoped(FunctionCallPermission),
}

impl TryFrom<PermissionRepr> for AccessKeyPermission {
    type Error = String;

    fn try_from(value: PermissionRepr) -> Result<Self, Self::Error> {
        match value {
            PermissionRepr::Named(name) if name == "FullAccess" => Ok(Self::FullAccess),
            PermissionRepr::Named(name) => Err(format!("unknown access key permission: {name}")),
            PermissionRepr::Scoped(p) => Ok(Self::FunctionCall(p)),
        }
    }
}

impl From<AccessKeyPermission> for PermissionRepr {
    fn from(value: AccessKeyPermission) -> Self {
        match value {
            AccessKeyPermission::FullAccess => PermissionRepr::Named("FullAccess".to_owned()),
            AccessKeyPermission::FunctionCall(p) => PermissionRepr::Scoped(p),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    pub permission: AccessKeyPermission,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddKeyParams {
    pub public_key: String,
    pub access_key: AccessKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteKeyParams {
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCallParams {
    pub method_name: String,
    pub args: Value,
    pub gas: String,
    pub deposit: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferParams {
    pub deposit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Action {
    AddKey(AddKeyParams),
    DeleteKey(DeleteKeyParams),
    FunctionCall(FunctionCallParams),
    Transfer(TransferParams),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub signer_id: String,
    pub receiver_id: String,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignAndSendTransactionParams {
    pub signer_id: String,
    /// Defaults to the selector's contract id.
    #[serde(default)]
    pub receiver_id: Option<String>,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignAndSendTransactionsParams {
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub network_id: String,
    pub node_url: String,
    pub helper_url: String,
    pub explorer_url: String,
    pub wallet_url: String,
}

impl Network {
    /// Well-known endpoints for `mainnet`, `testnet` and `betanet`.
    pub fn preset(network_id: &str) -> Option<Self> {
        let (node, helper, explorer, wallet) = match network_id {
            "mainnet" => (
                "https://rpc.mainnet.near.org",
                "https://helper.mainnet.near.org",
                "https://explorer.near.org",
                "https://wallet.near.org",
            ),
            "testnet" => (
                "https://rpc.testnet.near.org",
                "https://helper.testnet.near.org",
                "https://explorer.testnet.near.org",
                "https://wallet.testnet.near.org",
            ),
            "betanet" => (
                "https://rpc.betanet.near.org",
                "https://helper.betanet.near.org",
                "https://explorer.betanet.near.org",
                "https://wallet.betanet.near.org",
            ),
            _ => return None,
        };
        Some(Self {
            network_id: network_id.to_owned(),
            node_url: node.to_owned(),
            helper_url: helper.to_owned(),
            explorer_url: explorer.to_owned(),
            wallet_url: wallet.to_owned(),
        })
    }

    /// Custom network; only the node url is required.
    pub fn custom(network_id: impl Into<String>, node_url: impl Into<String>) -> Self {
        Self {
            network_id: network_id.into(),
            node_url: node_url.into(),
            helper_url: String::new(),
            explorer_url: String::new(),
            wallet_url: String::new(),
        }
    }

    pub fn is_preset(&self) -> bool {
        matches!(self.network_id.as_str(), "mainnet" | "testnet" | "betanet")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorOptions {
    pub network: Network,
    pub contract_id: String,
    pub method_names: Vec<String>,
}
