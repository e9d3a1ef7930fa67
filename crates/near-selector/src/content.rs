//! Guestbook panel state controller.
//!
//! Holds what the page shows (selected account, its view, the message list and
//! the form) and drives the wallet selector on submit. Rendering is left to
//! the host, which drains queued alerts with [`ContentPanel::take_alerts`].

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde_json::{json, Value};

use near_selector_adapters::{view_function, WalletSelector};
use near_selector_core::{
    parse_near_amount, Account, AccountView, AccountsChanged, Action, Finality,
    FunctionCallParams, Message, PortError, RpcProviderPort, SignAndSendTransactionParams,
    StoragePort, Subscription,
};

pub const SUGGESTED_DONATION: &str = "0";
/// 0.00000000003 NEAR in yocto.
pub const BOATLOAD_OF_GAS: &str = "30000000000000";
pub const ACCOUNT_ID_KEY: &str = "accountId";

pub const ADD_MESSAGE_FAILED: &str = "Failed to add message";
pub const REFRESH_MESSAGES_FAILED: &str = "Failed to refresh messages";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormState {
    pub message: String,
    pub donation: String,
    pub disabled: bool,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            message: String::new(),
            donation: SUGGESTED_DONATION.to_owned(),
            disabled: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelState {
    pub accounts: Vec<Account>,
    pub account_id: Option<String>,
    pub account: Option<AccountView>,
    pub messages: Vec<Message>,
    pub form: FormState,
}

pub struct ContentPanel<R: RpcProviderPort + 'static> {
    shared: Arc<Shared<R>>,
}

struct Shared<R: RpcProviderPort + 'static> {
    selector: Arc<WalletSelector>,
    rpc: Arc<R>,
    storage: Arc<dyn StoragePort>,
    state: Mutex<PanelState>,
    alerts: Mutex<Vec<String>>,
    subscription: Mutex<Option<Subscription>>,
}

impl<R: RpcProviderPort + 'static> Shared<R> {
    fn state(&self) -> Result<MutexGuard<'_, PanelState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("panel lock poisoned: {e}")))
    }

    fn alert(&self, message: &str) {
        tracing::warn!("{message}");
        match self.alerts.lock() {
            Ok(mut g) => g.push(message.to_owned()),
            Err(e) => tracing::error!("alert queue poisoned: {e}"),
        }
    }

    fn fetch_messages(&self) -> Result<Vec<Message>, PortError> {
        view_function(
            self.rpc.as_ref(),
            self.selector.contract_id(),
            "getMessages",
            &Value::Null,
            Finality::Optimistic,
        )
    }

    fn fetch_account(&self, account_id: Option<&str>) -> Result<Option<AccountView>, PortError> {
        let Some(account_id) = account_id else {
            return Ok(None);
        };
        self.rpc
            .view_account(account_id, Finality::Final)
            .map(Some)
    }

    fn sync_account_state(
        &self,
        current: Option<&str>,
        new_accounts: &[Account],
    ) -> Result<(), PortError> {
        if new_accounts.is_empty() {
            self.storage.remove_item(ACCOUNT_ID_KEY)?;
            let mut g = self.state()?;
            g.account_id = None;
            g.accounts.clear();
            return Ok(());
        }

        let still_valid = current
            .filter(|id| new_accounts.iter().any(|a| a.account_id == *id))
            .map(str::to_owned);
        let account_id = still_valid.unwrap_or_else(|| new_accounts[0].account_id.clone());

        self.storage.set_item(ACCOUNT_ID_KEY, &account_id)?;
        let mut g = self.state()?;
        g.account_id = Some(account_id);
        g.accounts = new_accounts.to_vec();
        Ok(())
    }

    fn on_accounts_changed(&self, event: &AccountsChanged) -> Result<(), PortError> {
        let previous = self.state()?.account_id.clone();
        self.sync_account_state(previous.as_deref(), &event.accounts)?;

        let current = self.state()?.account_id.clone();
        if previous != current {
            tracing::debug!(account = ?current, "selected account changed");
            let account = self.fetch_account(current.as_deref())?;
            self.state()?.account = account;
        }
        Ok(())
    }

    fn release_form(&self) -> Result<(), PortError> {
        self.state()?.form.disabled = false;
        Ok(())
    }
}

impl<R: RpcProviderPort + 'static> ContentPanel<R> {
    /// Builds the panel with the selector's current accounts and the account
    /// id remembered in local storage.
    pub fn new(
        selector: Arc<WalletSelector>,
        rpc: Arc<R>,
        storage: Arc<dyn StoragePort>,
    ) -> Result<Self, PortError> {
        let accounts = selector.get_accounts()?;
        let remembered = storage.get_item(ACCOUNT_ID_KEY)?;
        let shared = Arc::new(Shared {
            selector,
            rpc,
            storage,
            state: Mutex::new(PanelState::default()),
            alerts: Mutex::new(Vec::new()),
            subscription: Mutex::new(None),
        });
        shared.sync_account_state(remembered.as_deref(), &accounts)?;
        Ok(Self { shared })
    }

    /// Loads messages and the selected account concurrently, then starts
    /// following account changes.
    pub async fn mount(&self) -> Result<(), PortError> {
        let account_id = self.shared.state()?.account_id.clone();

        let messages = {
            let shared = Arc::clone(&self.shared);
            tokio::task::spawn_blocking(move || shared.fetch_messages())
        };
        let account = {
            let shared = Arc::clone(&self.shared);
            tokio::task::spawn_blocking(move || shared.fetch_account(account_id.as_deref()))
        };
        let (messages, account) = tokio::join!(messages, account);
        let messages = messages.map_err(join_error)??;
        let account = account.map_err(join_error)??;

        {
            let mut g = self.shared.state()?;
            g.messages = messages;
            g.account = account;
        }

        self.subscribe()
    }

    fn subscribe(&self) -> Result<(), PortError> {
        let weak: Weak<Shared<R>> = Arc::downgrade(&self.shared);
        let subscription = self
            .shared
            .selector
            .on_accounts_changed(Arc::new(move |event: &AccountsChanged| {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                if let Err(e) = shared.on_accounts_changed(event) {
                    tracing::error!("failed to apply account change: {e}");
                }
            }));

        let previous = self
            .shared
            .subscription
            .lock()
            .map_err(|e| PortError::Transport(format!("panel lock poisoned: {e}")))?
            .replace(subscription);
        if let Some(previous) = previous {
            previous.remove();
        }
        Ok(())
    }

    pub fn sync_account_state(
        &self,
        current: Option<&str>,
        new_accounts: &[Account],
    ) -> Result<(), PortError> {
        self.shared.sync_account_state(current, new_accounts)
    }

    /// Signs an `addMessage` call with the selected account and reloads the
    /// message list. The form stays disabled while the call is in flight.
    pub fn submit(&self, message: &str, donation: &str) -> Result<(), PortError> {
        let signer_id = {
            let mut g = self.shared.state()?;
            if g.form.disabled {
                return Err(PortError::Policy("form is disabled".to_owned()));
            }
            let signer_id = g.account_id.clone().ok_or(PortError::NotConnected)?;
            g.form = FormState {
                message: message.to_owned(),
                donation: donation.to_owned(),
                disabled: true,
            };
            signer_id
        };

        // TODO: append the message optimistically and reconcile once the refresh lands.
        let sent = self.send_message(signer_id, message, donation);
        if let Err(e) = sent {
            self.shared.alert(ADD_MESSAGE_FAILED);
            tracing::error!("failed to add message: {e}");
            self.shared.release_form()?;
            return Err(e);
        }

        match self.shared.fetch_messages() {
            Ok(messages) => {
                let mut g = self.shared.state()?;
                g.messages = messages;
                g.form = FormState::default();
                Ok(())
            }
            Err(e) => {
                self.shared.alert(REFRESH_MESSAGES_FAILED);
                tracing::error!("failed to refresh messages: {e}");
                self.shared.release_form()?;
                Err(e)
            }
        }
    }

    fn send_message(
        &self,
        signer_id: String,
        message: &str,
        donation: &str,
    ) -> Result<Value, PortError> {
        let donation = if donation.is_empty() {
            SUGGESTED_DONATION
        } else {
            donation
        };
        let deposit = parse_near_amount(donation)
            .ok_or_else(|| PortError::Validation(format!("invalid donation amount: {donation}")))?;
        self.shared
            .selector
            .sign_and_send_transaction(SignAndSendTransactionParams {
                signer_id,
                receiver_id: None,
                actions: vec![Action::FunctionCall(FunctionCallParams {
                    method_name: "addMessage".to_owned(),
                    args: json!({ "text": message }),
                    gas: BOATLOAD_OF_GAS.to_owned(),
                    deposit,
                })],
            })
    }

    pub fn sign_out(&self) {
        if let Err(e) = self.shared.selector.sign_out() {
            tracing::error!("Failed to sign out: {e}");
        }
    }

    pub fn unmount(&self) -> Result<(), PortError> {
        let subscription = self
            .shared
            .subscription
            .lock()
            .map_err(|e| PortError::Transport(format!("panel lock poisoned: {e}")))?
            .take();
        if let Some(subscription) = subscription {
            subscription.remove();
        }
        Ok(())
    }

    pub fn take_alerts(&self) -> Result<Vec<String>, PortError> {
        let mut g = self
            .shared
            .alerts
            .lock()
            .map_err(|e| PortError::Transport(format!("alert queue poisoned: {e}")))?;
        Ok(std::mem::take(&mut *g))
    }

    pub fn snapshot(&self) -> Result<PanelState, PortError> {
        Ok(self.shared.state()?.clone())
    }

    pub fn selector(&self) -> &Arc<WalletSelector> {
        &self.shared.selector
    }
}

fn join_error(e: tokio::task::JoinError) -> PortError {
    PortError::Transport(format!("panel fetch task failed: {e}"))
}
