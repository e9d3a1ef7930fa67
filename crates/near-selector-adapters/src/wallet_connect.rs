//! Bridge wallet backed by a WalletConnect client.
//!
//! The adapter owns a small session state (session, accounts, keystore,
//! listener subscriptions). Connecting pairs with the wallet and asks it to
//! add a function-call access key; disconnecting asks it to delete that key
//! and tears the session down.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::Value;

use near_selector_core::{
    AccessKey, AccessKeyPermission, Account, AccountsChanged, Action, AddKeyParams, AppMetadata,
    BridgeClientPort, ClientEvent, ClientEventKind, ConnectParams, DeleteKeyParams,
    DisconnectParams, DisconnectReason, EventEmitter, FunctionCallPermission, InitParams,
    JsonStorage, PortError, RequestParams, RpcRequest, SelectorOptions, Session,
    SessionPermissions, SignAndSendTransactionParams, SignAndSendTransactionsParams, StoragePort,
    Subscription, Transaction, Wallet, WalletMetadata, WalletType, SIGN_AND_SEND_TRANSACTION,
    SIGN_AND_SEND_TRANSACTIONS,
};

use crate::keystore::{KeyPair, KeyStore};
use crate::SelectorConfig;

pub const WALLET_CONNECT_ID: &str = "wallet-connect";
pub const STORAGE_ACCOUNTS: &str = "accounts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletConnectParams {
    pub project_id: String,
    pub metadata: AppMetadata,
    pub relay_url: String,
    pub icon_url: String,
    pub chain_id: Option<String>,
    pub request_timeout_ms: u64,
}

impl WalletConnectParams {
    pub fn from_config(config: &SelectorConfig) -> Self {
        Self {
            project_id: config.wc_project_id.clone(),
            metadata: config.app_metadata.clone(),
            relay_url: config.wc_relay_url.clone(),
            icon_url: config.wc_icon_url.clone(),
            chain_id: config.wc_chain_id.clone(),
            request_timeout_ms: config.request_timeout_ms,
        }
    }
}

/// Factory for the WalletConnect wallet module.
#[derive(Debug, Clone)]
pub struct WalletConnectModule {
    params: WalletConnectParams,
}

impl WalletConnectModule {
    pub fn new(params: WalletConnectParams) -> Self {
        Self { params }
    }

    pub fn id(&self) -> &'static str {
        WALLET_CONNECT_ID
    }

    pub fn wallet_type(&self) -> WalletType {
        WalletType::Bridge
    }

    pub fn metadata(&self) -> WalletMetadata {
        WalletMetadata {
            name: "WalletConnect".to_owned(),
            description: None,
            icon_url: self.params.icon_url.clone(),
        }
    }

    /// Restores persisted accounts, initializes the client and picks up an
    /// existing session if the client already has one.
    pub fn init<B: BridgeClientPort + 'static>(
        &self,
        options: SelectorOptions,
        storage: Arc<dyn StoragePort>,
        emitter: EventEmitter<AccountsChanged>,
        client: B,
    ) -> Result<WalletConnectWallet<B>, PortError> {
        let id = self.id();
        let keystore = KeyStore::new(
            Arc::clone(&storage),
            format!("near-wallet-selector:{id}:keystore:"),
        );
        let storage = JsonStorage::new(storage, format!("near-wallet-selector:{id}:"));
        let accounts: Vec<Account> = storage.get_json(STORAGE_ACCOUNTS)?.unwrap_or_default();

        client.init(&InitParams {
            project_id: self.params.project_id.clone(),
            metadata: self.params.metadata.clone(),
            relay_url: self.params.relay_url.clone(),
        })?;
        let session = client.restore_session()?;
        let restored = session.is_some();

        let inner = Arc::new(Inner {
            id: id.to_owned(),
            metadata: self.metadata(),
            options,
            params: self.params.clone(),
            client,
            keystore,
            storage,
            emitter,
            state: Mutex::new(WalletConnectState {
                session,
                accounts,
                subscriptions: Vec::new(),
            }),
        });

        if restored {
            tracing::info!(wallet = id, "restored walletconnect session");
            Inner::setup_events(&inner)?;
        }

        Ok(WalletConnectWallet { inner })
    }
}

pub struct WalletConnectWallet<B: BridgeClientPort + 'static> {
    inner: Arc<Inner<B>>,
}

struct Inner<B: BridgeClientPort + 'static> {
    id: String,
    metadata: WalletMetadata,
    options: SelectorOptions,
    params: WalletConnectParams,
    client: B,
    keystore: KeyStore,
    storage: JsonStorage,
    emitter: EventEmitter<AccountsChanged>,
    state: Mutex<WalletConnectState>,
}

#[derive(Debug, Default)]
struct WalletConnectState {
    session: Option<Session>,
    accounts: Vec<Account>,
    subscriptions: Vec<Subscription>,
}

impl<B: BridgeClientPort + 'static> Inner<B> {
    fn lock(&self) -> Result<MutexGuard<'_, WalletConnectState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("walletconnect lock poisoned: {e}")))
    }

    fn chain_id(&self) -> Result<String, PortError> {
        if let Some(chain_id) = &self.params.chain_id {
            return Ok(chain_id.clone());
        }
        let network_id = &self.options.network.network_id;
        if matches!(network_id.as_str(), "mainnet" | "testnet" | "betanet") {
            return Ok(format!("near:{network_id}"));
        }
        Err(PortError::Validation("Invalid chain id".to_owned()))
    }

    fn accounts(&self) -> Result<Vec<Account>, PortError> {
        Ok(self.lock()?.accounts.clone())
    }

    fn session_topic(&self) -> Result<String, PortError> {
        self.lock()?
            .session
            .as_ref()
            .map(|s| s.topic.clone())
            .ok_or(PortError::NotConnected)
    }

    fn request(&self, topic: &str, method: &str, params: Value) -> Result<Value, PortError> {
        self.client.request(&RequestParams {
            timeout_ms: self.params.request_timeout_ms,
            topic: topic.to_owned(),
            chain_id: self.chain_id()?,
            request: RpcRequest {
                method: method.to_owned(),
                params,
            },
        })
    }

    fn send_transaction(&self, topic: &str, transaction: &Transaction) -> Result<Value, PortError> {
        let params = serde_json::to_value(transaction)
            .map_err(|e| PortError::Validation(format!("encode transaction failed: {e}")))?;
        self.request(topic, SIGN_AND_SEND_TRANSACTION, params)
    }

    fn setup_events(this: &Arc<Self>) -> Result<(), PortError> {
        if !this.lock()?.subscriptions.is_empty() {
            return Ok(());
        }

        let pairing = this.client.on(
            ClientEventKind::PairingCreated,
            Arc::new(|event: &ClientEvent| {
                tracing::info!(topic = event.topic(), "Pairing Created");
            }),
        )?;

        let weak: Weak<Self> = Arc::downgrade(this);
        let updated = this.client.on(
            ClientEventKind::SessionUpdated,
            Arc::new(move |event: &ClientEvent| {
                let (Some(inner), ClientEvent::SessionUpdated(session)) = (weak.upgrade(), event)
                else {
                    return;
                };
                tracing::info!(topic = %session.topic, "Session Updated");
                if let Err(e) = inner.on_session_updated(session) {
                    tracing::error!("failed to apply session update: {e}");
                }
            }),
        )?;

        let weak: Weak<Self> = Arc::downgrade(this);
        let deleted = this.client.on(
            ClientEventKind::SessionDeleted,
            Arc::new(move |event: &ClientEvent| {
                let (Some(inner), ClientEvent::SessionDeleted(session)) = (weak.upgrade(), event)
                else {
                    return;
                };
                tracing::info!(topic = %session.topic, "Session Deleted");
                if let Err(e) = inner.on_session_deleted(session) {
                    tracing::error!("failed to disconnect deleted session: {e}");
                }
            }),
        )?;

        this.lock()?
            .subscriptions
            .extend([pairing, updated, deleted]);
        Ok(())
    }

    fn on_session_updated(&self, updated: &Session) -> Result<(), PortError> {
        let accounts = {
            let mut g = self.lock()?;
            match &g.session {
                Some(current) if current.topic == updated.topic => {
                    g.session = Some(updated.clone());
                    g.accounts.clone()
                }
                _ => return Ok(()),
            }
        };
        self.emitter.emit(&AccountsChanged { accounts });
        Ok(())
    }

    fn on_session_deleted(&self, deleted: &Session) -> Result<(), PortError> {
        let is_current = self
            .lock()?
            .session
            .as_ref()
            .is_some_and(|s| s.topic == deleted.topic);
        if is_current {
            self.disconnect()?;
        }
        Ok(())
    }

    fn connect(this: &Arc<Self>) -> Result<Vec<Account>, PortError> {
        let existing = this.accounts()?;
        if !existing.is_empty() {
            return Ok(existing);
        }

        match Self::pair_and_add_key(this) {
            Ok(accounts) => Ok(accounts),
            Err(err) => {
                tracing::error!(wallet = %this.id, "walletconnect connect failed: {err}");
                if let Err(e) = this.disconnect() {
                    tracing::warn!(wallet = %this.id, "disconnect after failed connect: {e}");
                }
                Err(err)
            }
        }
    }

    fn pair_and_add_key(this: &Arc<Self>) -> Result<Vec<Account>, PortError> {
        let chain_id = this.chain_id()?;
        let session = this.client.connect(&ConnectParams {
            metadata: this.params.metadata.clone(),
            timeout_ms: this.params.request_timeout_ms,
            permissions: SessionPermissions {
                chains: vec![chain_id],
                methods: vec![
                    SIGN_AND_SEND_TRANSACTION.to_owned(),
                    SIGN_AND_SEND_TRANSACTIONS.to_owned(),
                ],
            },
        })?;
        this.lock()?.session = Some(session.clone());

        let network_id = &this.options.network.network_id;
        let mut transactions = Vec::new();
        for account_id in session.account_ids()? {
            let key_pair = KeyPair::from_random()?;
            this.keystore.set_key(network_id, &account_id, &key_pair)?;
            transactions.push(Transaction {
                signer_id: account_id.clone(),
                receiver_id: account_id,
                actions: vec![Action::AddKey(AddKeyParams {
                    public_key: key_pair.public_key(),
                    access_key: AccessKey {
                        nonce: None,
                        permission: AccessKeyPermission::FunctionCall(FunctionCallPermission {
                            receiver_id: this.options.contract_id.clone(),
                            allowance: None,
                            method_names: this.options.method_names.clone(),
                        }),
                    },
                })],
            });
        }

        // TODO: send every transaction through near_signAndSendTransactions once bridge wallets support it.
        let transaction = transactions
            .into_iter()
            .next()
            .ok_or_else(|| PortError::Validation("session has no accounts".to_owned()))?;
        this.send_transaction(&session.topic, &transaction)?;

        Self::setup_events(this)?;

        let accounts = vec![Account::new(transaction.signer_id)];
        this.storage.set_json(STORAGE_ACCOUNTS, &accounts)?;
        this.lock()?.accounts = accounts.clone();
        tracing::info!(wallet = %this.id, account = %accounts[0].account_id, "walletconnect connected");
        Ok(accounts)
    }

    /// Removes the access keys added at connect and ends the session. Local
    /// state is cleaned up even when the wallet rejects the key removal.
    fn disconnect(&self) -> Result<(), PortError> {
        let teardown = self.teardown_session();
        self.cleanup()?;
        teardown
    }

    /// The bridge session is always ended, even when building or sending
    /// the key removal fails. The key removal error wins.
    fn teardown_session(&self) -> Result<(), PortError> {
        let Some(session) = self.lock()?.session.clone() else {
            return Ok(());
        };

        let removal = self.remove_added_keys(&session);
        let ended = self.client.disconnect(&DisconnectParams {
            topic: session.topic.clone(),
            reason: DisconnectReason::user_disconnected(),
        });
        removal.and(ended)
    }

    fn remove_added_keys(&self, session: &Session) -> Result<(), PortError> {
        let network_id = &self.options.network.network_id;
        let mut transactions = Vec::new();
        for account_id in session.account_ids()? {
            let Some(key_pair) = self.keystore.get_key(network_id, &account_id)? else {
                tracing::warn!(account = %account_id, "no stored key, skipping key removal");
                continue;
            };
            transactions.push(Transaction {
                signer_id: account_id.clone(),
                receiver_id: account_id,
                actions: vec![Action::DeleteKey(DeleteKeyParams {
                    public_key: key_pair.public_key(),
                })],
            });
        }

        // Same single-transaction limitation as the key-add in connect.
        match transactions.first() {
            Some(tx) => self.send_transaction(&session.topic, tx).map(|_| ()),
            None => Ok(()),
        }
    }

    fn cleanup(&self) -> Result<(), PortError> {
        let subscriptions = {
            let mut g = self.lock()?;
            g.session = None;
            g.accounts.clear();
            std::mem::take(&mut g.subscriptions)
        };
        for subscription in subscriptions {
            subscription.remove();
        }
        self.keystore.clear()?;
        self.storage.remove(STORAGE_ACCOUNTS)
    }
}

impl<B: BridgeClientPort + 'static> WalletConnectWallet<B> {
    pub fn chain_id(&self) -> Result<String, PortError> {
        self.inner.chain_id()
    }

    pub fn session(&self) -> Result<Option<Session>, PortError> {
        Ok(self.inner.lock()?.session.clone())
    }

    pub fn keystore(&self) -> &KeyStore {
        &self.inner.keystore
    }

    pub fn client(&self) -> &B {
        &self.inner.client
    }
}

impl<B: BridgeClientPort + 'static> Wallet for WalletConnectWallet<B> {
    fn id(&self) -> &str {
        &self.inner.id
    }

    fn wallet_type(&self) -> WalletType {
        WalletType::Bridge
    }

    fn metadata(&self) -> &WalletMetadata {
        &self.inner.metadata
    }

    fn connect(&self) -> Result<Vec<Account>, PortError> {
        Inner::connect(&self.inner)
    }

    fn disconnect(&self) -> Result<(), PortError> {
        self.inner.disconnect()
    }

    fn get_accounts(&self) -> Result<Vec<Account>, PortError> {
        self.inner.accounts()
    }

    fn sign_and_send_transaction(
        &self,
        params: SignAndSendTransactionParams,
    ) -> Result<Value, PortError> {
        let transaction = Transaction {
            signer_id: params.signer_id,
            receiver_id: params
                .receiver_id
                .unwrap_or_else(|| self.inner.options.contract_id.clone()),
            actions: params.actions,
        };
        tracing::debug!(
            signer = %transaction.signer_id,
            receiver = %transaction.receiver_id,
            actions = transaction.actions.len(),
            "WalletConnect:signAndSendTransaction"
        );
        let topic = self.inner.session_topic()?;
        self.inner.send_transaction(&topic, &transaction)
    }

    fn sign_and_send_transactions(
        &self,
        params: SignAndSendTransactionsParams,
    ) -> Result<Value, PortError> {
        tracing::debug!(
            transactions = params.transactions.len(),
            "WalletConnect:signAndSendTransactions"
        );
        let topic = self.inner.session_topic()?;
        let payload = serde_json::to_value(&params)
            .map_err(|e| PortError::Validation(format!("encode transactions failed: {e}")))?;
        self.inner
            .request(&topic, SIGN_AND_SEND_TRANSACTIONS, payload)
    }
}
