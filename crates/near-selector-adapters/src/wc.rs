use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use near_selector_core::{
    BridgeClientPort, ClientEvent, ClientEventKind, ConnectParams, DisconnectParams,
    EventEmitter, EventHandler, InitParams, Pairing, PortError, RequestParams, Session,
    Subscription,
};

use crate::SelectorConfig;

/// Bridge protocol client. Talks to a WalletConnect sidecar over HTTP when a
/// bridge url is configured, otherwise simulates a wallet in memory.
#[derive(Debug, Clone)]
pub struct WalletConnectClient {
    mode: ClientMode,
    state: Arc<Mutex<ClientState>>,
    listeners: Arc<Listeners>,
}

#[derive(Debug, Clone)]
enum ClientMode {
    Disabled(String),
    InMemory,
    #[cfg(not(target_arch = "wasm32"))]
    Http(HttpRuntime),
}

#[derive(Debug, Clone)]
#[cfg(not(target_arch = "wasm32"))]
struct HttpRuntime {
    base_url: String,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Default)]
struct Listeners {
    pairing_created: EventEmitter<ClientEvent>,
    session_updated: EventEmitter<ClientEvent>,
    session_deleted: EventEmitter<ClientEvent>,
}

impl Listeners {
    fn get(&self, kind: ClientEventKind) -> &EventEmitter<ClientEvent> {
        match kind {
            ClientEventKind::PairingCreated => &self.pairing_created,
            ClientEventKind::SessionUpdated => &self.session_updated,
            ClientEventKind::SessionDeleted => &self.session_deleted,
        }
    }
}

#[derive(Debug)]
struct ClientState {
    init: Option<InitParams>,
    sessions: Vec<Session>,
    wallet_accounts: Vec<String>,
    topic_seq: u64,
    requests: Vec<RequestParams>,
    disconnects: Vec<DisconnectParams>,
    fail_next_request: Option<String>,
    fail_next_disconnect: Option<String>,
}

impl Default for ClientState {
    fn default() -> Self {
        Self {
            init: None,
            sessions: Vec::new(),
            wallet_accounts: vec!["near:testnet:wallet.testnet".to_owned()],
            topic_seq: 0,
            requests: Vec::new(),
            disconnects: Vec::new(),
            fail_next_request: None,
            fail_next_disconnect: None,
        }
    }
}

impl Default for WalletConnectClient {
    fn default() -> Self {
        Self::with_config(&SelectorConfig::from_env())
    }
}

impl WalletConnectClient {
    pub fn with_config(config: &SelectorConfig) -> Self {
        #[cfg(not(target_arch = "wasm32"))]
        let mode = if let Some(ref base_url) = config.wc_bridge_url {
            let timeout = std::time::Duration::from_millis(config.request_timeout_ms);
            match reqwest::blocking::Client::builder().timeout(timeout).build() {
                Ok(client) => ClientMode::Http(HttpRuntime {
                    base_url: base_url.trim_end_matches('/').to_owned(),
                    client,
                }),
                Err(e) => ClientMode::Disabled(format!(
                    "failed to initialize walletconnect bridge client: {e}"
                )),
            }
        } else if config.strict_runtime_required() {
            ClientMode::Disabled(
                "walletconnect bridge url not configured in production runtime profile".to_owned(),
            )
        } else {
            ClientMode::InMemory
        };

        #[cfg(target_arch = "wasm32")]
        let mode = if config.strict_runtime_required() {
            ClientMode::Disabled(
                "walletconnect bridge runtime unavailable in production wasm profile".to_owned(),
            )
        } else {
            ClientMode::InMemory
        };

        Self {
            mode,
            state: Arc::new(Mutex::new(ClientState::default())),
            listeners: Arc::new(Listeners::default()),
        }
    }

    /// In-memory client whose simulated wallet approves `accounts`.
    pub fn in_memory(accounts: Vec<String>) -> Self {
        let client = Self {
            mode: ClientMode::InMemory,
            state: Arc::new(Mutex::new(ClientState::default())),
            listeners: Arc::new(Listeners::default()),
        };
        if let Ok(mut g) = client.state.lock() {
            g.wallet_accounts = accounts;
        }
        client
    }

    fn check_mode(&self) -> Result<(), PortError> {
        if let ClientMode::Disabled(reason) = &self.mode {
            return Err(PortError::Policy(reason.clone()));
        }
        Ok(())
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, ClientState>, PortError> {
        self.state
            .lock()
            .map_err(|e| PortError::Transport(format!("wc lock poisoned: {e}")))
    }

    fn dispatch(&self, event: &ClientEvent) {
        self.listeners.get(event.kind()).emit(event);
    }

    /// Fetches queued events from the bridge sidecar and dispatches them to
    /// registered listeners. In-memory clients dispatch synchronously and
    /// always return zero.
    pub fn poll_events(&self) -> Result<usize, PortError> {
        self.check_mode()?;

        #[cfg(not(target_arch = "wasm32"))]
        if matches!(self.mode, ClientMode::Http(_)) {
            let events: Vec<ClientEvent> = self.http_get("/events")?;
            for event in &events {
                tracing::debug!(kind = event.kind().as_str(), topic = event.topic(), "bridge event");
                self.dispatch(event);
            }
            return Ok(events.len());
        }

        Ok(0)
    }

    pub fn debug_set_wallet_accounts(&self, accounts: Vec<String>) -> Result<(), PortError> {
        self.lock_state()?.wallet_accounts = accounts;
        Ok(())
    }

    pub fn debug_fail_next_request(&self, message: impl Into<String>) -> Result<(), PortError> {
        self.lock_state()?.fail_next_request = Some(message.into());
        Ok(())
    }

    pub fn debug_fail_next_disconnect(&self, message: impl Into<String>) -> Result<(), PortError> {
        self.lock_state()?.fail_next_disconnect = Some(message.into());
        Ok(())
    }

    pub fn debug_requests(&self) -> Result<Vec<RequestParams>, PortError> {
        Ok(self.lock_state()?.requests.clone())
    }

    pub fn debug_disconnects(&self) -> Result<Vec<DisconnectParams>, PortError> {
        Ok(self.lock_state()?.disconnects.clone())
    }

    pub fn debug_inject_session_updated(&self, session: Session) -> Result<(), PortError> {
        {
            let mut g = self.lock_state()?;
            if let Some(existing) = g.sessions.iter_mut().find(|s| s.topic == session.topic) {
                *existing = session.clone();
            }
        }
        self.dispatch(&ClientEvent::SessionUpdated(session));
        Ok(())
    }

    pub fn debug_inject_session_deleted(&self, topic: &str) -> Result<(), PortError> {
        let session = {
            let mut g = self.lock_state()?;
            let pos = g
                .sessions
                .iter()
                .position(|s| s.topic == topic)
                .ok_or_else(|| PortError::NotFound(format!("wc session missing: {topic}")))?;
            g.sessions.remove(pos)
        };
        self.dispatch(&ClientEvent::SessionDeleted(session));
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn http_runtime(&self) -> Result<&HttpRuntime, PortError> {
        match &self.mode {
            ClientMode::Http(runtime) => Ok(runtime),
            ClientMode::Disabled(reason) => Err(PortError::Policy(reason.clone())),
            ClientMode::InMemory => Err(PortError::NotImplemented(
                "walletconnect bridge runtime not enabled",
            )),
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn http_post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, PortError> {
        let runtime = self.http_runtime()?;
        let response = runtime
            .client
            .post(format!("{}{path}", runtime.base_url))
            .json(body)
            .send()
            .map_err(|e| PortError::Transport(format!("wc bridge request {path} failed: {e}")))?;
        decode_bridge_response(path, response)
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn http_get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PortError> {
        let runtime = self.http_runtime()?;
        let response = runtime
            .client
            .get(format!("{}{path}", runtime.base_url))
            .send()
            .map_err(|e| PortError::Transport(format!("wc bridge request {path} failed: {e}")))?;
        decode_bridge_response(path, response)
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn decode_bridge_response<T: DeserializeOwned>(
    path: &str,
    response: reqwest::blocking::Response,
) -> Result<T, PortError> {
    let status = response.status();
    let body: Value = response
        .json()
        .map_err(|e| PortError::Transport(format!("wc bridge {path} json decode failed: {e}")))?;
    if !status.is_success() {
        return Err(PortError::Transport(format!(
            "wc bridge {path} status {status}: {body}"
        )));
    }
    if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
        return Err(PortError::Transport(format!(
            "wc bridge {path} returned error: {err}"
        )));
    }
    let result = body.get("result").cloned().unwrap_or(Value::Null);
    serde_json::from_value(result)
        .map_err(|e| PortError::Transport(format!("wc bridge {path} result decode failed: {e}")))
}

impl BridgeClientPort for WalletConnectClient {
    fn init(&self, params: &InitParams) -> Result<(), PortError> {
        self.check_mode()?;
        tracing::debug!(relay = %params.relay_url, "initializing walletconnect client");

        #[cfg(not(target_arch = "wasm32"))]
        if matches!(self.mode, ClientMode::Http(_)) {
            let _: Value = self.http_post("/init", params)?;
        }

        self.lock_state()?.init = Some(params.clone());
        Ok(())
    }

    fn restore_session(&self) -> Result<Option<Session>, PortError> {
        self.check_mode()?;

        #[cfg(not(target_arch = "wasm32"))]
        if matches!(self.mode, ClientMode::Http(_)) {
            return self.http_get("/session");
        }

        Ok(self.lock_state()?.sessions.first().cloned())
    }

    fn connect(&self, params: &ConnectParams) -> Result<Session, PortError> {
        self.check_mode()?;

        #[cfg(not(target_arch = "wasm32"))]
        if matches!(self.mode, ClientMode::Http(_)) {
            return self.http_post("/connect", params);
        }

        let (pairing, session) = {
            let mut g = self.lock_state()?;
            if g.init.is_none() {
                return Err(PortError::Policy("walletconnect client not initialized".to_owned()));
            }
            g.topic_seq = g.topic_seq.saturating_add(1);
            let topic = format!("wc-topic-{}", g.topic_seq);
            let session = Session {
                topic: topic.clone(),
                accounts: g.wallet_accounts.clone(),
                permissions: params.permissions.clone(),
            };
            g.sessions.push(session.clone());
            let pairing = Pairing {
                topic: format!("wc-pairing-{}", g.topic_seq),
                peer: Some(params.metadata.clone()),
            };
            (pairing, session)
        };
        self.dispatch(&ClientEvent::PairingCreated(pairing));
        Ok(session)
    }

    fn request(&self, params: &RequestParams) -> Result<Value, PortError> {
        self.check_mode()?;

        #[cfg(not(target_arch = "wasm32"))]
        if matches!(self.mode, ClientMode::Http(_)) {
            return self.http_post("/request", params);
        }

        let mut g = self.lock_state()?;
        if !g.sessions.iter().any(|s| s.topic == params.topic) {
            return Err(PortError::NotFound(format!(
                "wc session missing: {}",
                params.topic
            )));
        }
        g.requests.push(params.clone());
        if let Some(message) = g.fail_next_request.take() {
            return Err(PortError::Transport(message));
        }
        Ok(serde_json::json!({
            "status": { "SuccessValue": "" },
            "transaction": params.request.params,
            "transaction_outcome": { "id": format!("{}-{}", params.topic, g.requests.len()) },
        }))
    }

    fn disconnect(&self, params: &DisconnectParams) -> Result<(), PortError> {
        self.check_mode()?;

        #[cfg(not(target_arch = "wasm32"))]
        if matches!(self.mode, ClientMode::Http(_)) {
            let _: Value = self.http_post("/disconnect", params)?;
            return Ok(());
        }

        let mut g = self.lock_state()?;
        if let Some(message) = g.fail_next_disconnect.take() {
            return Err(PortError::Transport(message));
        }
        g.sessions.retain(|s| s.topic != params.topic);
        g.disconnects.push(params.clone());
        Ok(())
    }

    fn on(
        &self,
        kind: ClientEventKind,
        handler: EventHandler<ClientEvent>,
    ) -> Result<Subscription, PortError> {
        self.check_mode()?;
        Ok(self.listeners.get(kind).on(handler))
    }
}
