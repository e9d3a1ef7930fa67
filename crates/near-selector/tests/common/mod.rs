#![allow(dead_code)]

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use near_selector::ContentPanel;
use near_selector_adapters::{
    MemoryStorage, SelectorConfig, WalletConnectClient, WalletConnectModule, WalletConnectParams,
    WalletSelector,
};
use near_selector_core::{
    AccountView, Finality, Message, Network, PortError, RpcProviderPort, SelectorOptions,
};

pub const CONTRACT_ID: &str = "guest-book.testnet";

#[derive(Debug, Default)]
pub struct FakeRpcState {
    pub messages: Vec<Message>,
    pub fail_messages: bool,
    pub fail_accounts: bool,
    pub viewed_accounts: Vec<String>,
    pub function_calls: Vec<(String, String, String)>,
}

#[derive(Debug)]
struct Gate {
    entered: Sender<()>,
    release: Receiver<()>,
}

/// Canned RPC provider recording every query it answers.
#[derive(Debug, Default)]
pub struct FakeRpc {
    pub state: Mutex<FakeRpcState>,
    gate: Mutex<Option<Gate>>,
}

impl FakeRpc {
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            state: Mutex::new(FakeRpcState {
                messages,
                ..FakeRpcState::default()
            }),
            gate: Mutex::new(None),
        }
    }

    /// Parks the next `call_function` until the returned sender fires. The
    /// returned receiver fires once the call has been entered.
    pub fn hold_next_call(&self) -> (Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        *self.gate.lock().expect("gate lock") = Some(Gate {
            entered: entered_tx,
            release: release_rx,
        });
        (entered_rx, release_tx)
    }

    pub fn set_messages(&self, messages: Vec<Message>) {
        self.state.lock().expect("rpc lock").messages = messages;
    }

    pub fn fail_messages(&self, fail: bool) {
        self.state.lock().expect("rpc lock").fail_messages = fail;
    }

    pub fn fail_accounts(&self, fail: bool) {
        self.state.lock().expect("rpc lock").fail_accounts = fail;
    }

    pub fn viewed_accounts(&self) -> Vec<String> {
        self.state.lock().expect("rpc lock").viewed_accounts.clone()
    }

    pub fn function_calls(&self) -> Vec<(String, String, String)> {
        self.state.lock().expect("rpc lock").function_calls.clone()
    }
}

impl RpcProviderPort for FakeRpc {
    fn view_account(&self, account_id: &str, finality: Finality) -> Result<AccountView, PortError> {
        assert_eq!(finality, Finality::Final);
        let mut g = self.state.lock().expect("rpc lock");
        g.viewed_accounts.push(account_id.to_owned());
        if g.fail_accounts {
            return Err(PortError::Transport("view_account unavailable".to_owned()));
        }
        Ok(account_view(account_id))
    }

    fn call_function(
        &self,
        contract_id: &str,
        method_name: &str,
        args_base64: &str,
        finality: Finality,
    ) -> Result<Vec<u8>, PortError> {
        assert_eq!(finality, Finality::Optimistic);
        let gate = self.gate.lock().expect("gate lock").take();
        if let Some(gate) = gate {
            gate.entered.send(()).expect("signal entered");
            gate.release.recv().expect("wait for release");
        }
        let mut g = self.state.lock().expect("rpc lock");
        g.function_calls.push((
            contract_id.to_owned(),
            method_name.to_owned(),
            args_base64.to_owned(),
        ));
        if g.fail_messages {
            return Err(PortError::Transport("call_function unavailable".to_owned()));
        }
        Ok(serde_json::to_vec(&g.messages).expect("encode messages"))
    }
}

pub fn account_view(account_id: &str) -> AccountView {
    AccountView {
        amount: "2500000000000000000000000".to_owned(),
        locked: "0".to_owned(),
        code_hash: "11111111111111111111111111111111".to_owned(),
        storage_usage: 182,
        storage_paid_at: 0,
        block_height: 120,
        block_hash: "9Zr7Ns9TgmR3Tp2p5fAvz6VJ4mBGAhSpMdDhYmhB3Wtf".to_owned(),
        account_id: account_id.to_owned(),
    }
}

pub fn message(sender: &str, text: &str, premium: bool) -> Message {
    Message {
        premium,
        sender: sender.to_owned(),
        text: text.to_owned(),
    }
}

pub fn options() -> SelectorOptions {
    SelectorOptions {
        network: Network::preset("testnet").expect("testnet preset"),
        contract_id: CONTRACT_ID.to_owned(),
        method_names: vec!["addMessage".to_owned()],
    }
}

pub struct PanelFixture {
    pub selector: Arc<WalletSelector>,
    pub client: WalletConnectClient,
    pub rpc: Arc<FakeRpc>,
    pub storage: Arc<MemoryStorage>,
}

impl PanelFixture {
    pub fn panel(&self) -> ContentPanel<FakeRpc> {
        ContentPanel::new(
            Arc::clone(&self.selector),
            Arc::clone(&self.rpc),
            self.storage.clone(),
        )
        .expect("build panel")
    }
}

/// Selector with an in-memory WalletConnect wallet approving `accounts`.
pub fn fixture(accounts: &[&str], messages: Vec<Message>) -> PanelFixture {
    let storage = Arc::new(MemoryStorage::default());
    let selector =
        Arc::new(WalletSelector::new(options(), storage.clone()).expect("build selector"));
    let client = WalletConnectClient::in_memory(
        accounts
            .iter()
            .map(|a| format!("near:testnet:{a}"))
            .collect(),
    );
    let wallet = WalletConnectModule::new(WalletConnectParams::from_config(
        &SelectorConfig::default(),
    ))
    .init(options(), storage.clone(), selector.emitter(), client.clone())
    .expect("init wallet");
    selector.register(Arc::new(wallet)).expect("register wallet");

    PanelFixture {
        selector,
        client,
        rpc: Arc::new(FakeRpc::with_messages(messages)),
        storage,
    }
}
