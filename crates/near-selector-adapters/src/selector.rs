use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use near_selector_core::{
    Account, AccountsChanged, EventEmitter, EventHandler, JsonStorage, Network, PortError,
    SelectorOptions, SignAndSendTransactionParams, SignAndSendTransactionsParams, StoragePort,
    Subscription, Wallet,
};

pub const STORAGE_SELECTED_WALLET_ID: &str = "selectedWalletId";

/// Registry of wallet modules with a single selected wallet. Every wallet
/// call from the dApp goes through here.
pub struct WalletSelector {
    options: SelectorOptions,
    storage: JsonStorage,
    emitter: EventEmitter<AccountsChanged>,
    wallets: Mutex<Vec<Arc<dyn Wallet>>>,
    selected: Mutex<Option<String>>,
}

impl std::fmt::Debug for WalletSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletSelector")
            .field("options", &self.options)
            .field("selected", &self.selected)
            .finish()
    }
}

impl WalletSelector {
    pub fn new(options: SelectorOptions, storage: Arc<dyn StoragePort>) -> Result<Self, PortError> {
        let storage = JsonStorage::new(storage, "near-wallet-selector:");
        let selected: Option<String> = storage.get_json(STORAGE_SELECTED_WALLET_ID)?;
        Ok(Self {
            options,
            storage,
            emitter: EventEmitter::default(),
            wallets: Mutex::new(Vec::new()),
            selected: Mutex::new(selected),
        })
    }

    fn wallets(&self) -> Result<MutexGuard<'_, Vec<Arc<dyn Wallet>>>, PortError> {
        self.wallets
            .lock()
            .map_err(|e| PortError::Transport(format!("selector lock poisoned: {e}")))
    }

    fn selected(&self) -> Result<MutexGuard<'_, Option<String>>, PortError> {
        self.selected
            .lock()
            .map_err(|e| PortError::Transport(format!("selector lock poisoned: {e}")))
    }

    pub fn options(&self) -> &SelectorOptions {
        &self.options
    }

    pub fn network(&self) -> &Network {
        &self.options.network
    }

    pub fn contract_id(&self) -> &str {
        &self.options.contract_id
    }

    /// Emitter handed to wallet modules so they can report account changes.
    pub fn emitter(&self) -> EventEmitter<AccountsChanged> {
        self.emitter.clone()
    }

    pub fn register(&self, wallet: Arc<dyn Wallet>) -> Result<(), PortError> {
        let mut g = self.wallets()?;
        if g.iter().any(|w| w.id() == wallet.id()) {
            return Err(PortError::Validation(format!(
                "wallet already registered: {}",
                wallet.id()
            )));
        }
        tracing::debug!(wallet = wallet.id(), kind = ?wallet.wallet_type(), "registered wallet");
        g.push(wallet);
        Ok(())
    }

    pub fn wallet(&self, id: &str) -> Result<Arc<dyn Wallet>, PortError> {
        self.wallets()?
            .iter()
            .find(|w| w.id() == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("wallet not registered: {id}")))
    }

    pub fn selected_wallet_id(&self) -> Result<Option<String>, PortError> {
        Ok(self.selected()?.clone())
    }

    pub fn selected_wallet(&self) -> Result<Arc<dyn Wallet>, PortError> {
        let id = self.selected_wallet_id()?.ok_or(PortError::NotConnected)?;
        self.wallet(&id)
    }

    pub fn sign_in(&self, wallet_id: &str) -> Result<Vec<Account>, PortError> {
        let wallet = self.wallet(wallet_id)?;
        let accounts = wallet.connect()?;
        *self.selected()? = Some(wallet_id.to_owned());
        self.storage
            .set_json(STORAGE_SELECTED_WALLET_ID, wallet_id)?;
        tracing::info!(wallet = wallet_id, accounts = accounts.len(), "signed in");
        self.emitter.emit(&AccountsChanged {
            accounts: accounts.clone(),
        });
        Ok(accounts)
    }

    /// Disconnects the selected wallet. The selection is dropped even if the
    /// wallet fails to disconnect cleanly.
    pub fn sign_out(&self) -> Result<(), PortError> {
        let wallet = self.selected_wallet()?;
        let result = wallet.disconnect();
        *self.selected()? = None;
        self.storage.remove(STORAGE_SELECTED_WALLET_ID)?;
        self.emitter.emit(&AccountsChanged {
            accounts: Vec::new(),
        });
        result
    }

    pub fn get_accounts(&self) -> Result<Vec<Account>, PortError> {
        match self.selected_wallet() {
            Ok(wallet) => wallet.get_accounts(),
            Err(PortError::NotConnected) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    pub fn is_signed_in(&self) -> Result<bool, PortError> {
        Ok(!self.get_accounts()?.is_empty())
    }

    pub fn sign_and_send_transaction(
        &self,
        params: SignAndSendTransactionParams,
    ) -> Result<Value, PortError> {
        self.selected_wallet()?.sign_and_send_transaction(params)
    }

    pub fn sign_and_send_transactions(
        &self,
        params: SignAndSendTransactionsParams,
    ) -> Result<Value, PortError> {
        self.selected_wallet()?.sign_and_send_transactions(params)
    }

    pub fn on_accounts_changed(&self, handler: EventHandler<AccountsChanged>) -> Subscription {
        self.emitter.on(handler)
    }
}
