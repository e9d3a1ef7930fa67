//! Shapes exchanged with a bridge protocol client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{AppMetadata, Pairing, Session, SessionPermissions};

/// Disconnect reason code sent when the user ends the session.
pub const USER_DISCONNECTED_CODE: i64 = 5900;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitParams {
    pub project_id: String,
    pub metadata: AppMetadata,
    pub relay_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub metadata: AppMetadata,
    pub timeout_ms: u64,
    pub permissions: SessionPermissions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestParams {
    pub timeout_ms: u64,
    pub topic: String,
    pub chain_id: String,
    pub request: RpcRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectReason {
    pub code: i64,
    pub message: String,
}

impl DisconnectReason {
    pub fn user_disconnected() -> Self {
        Self {
            code: USER_DISCONNECTED_CODE,
            message: "User disconnected".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisconnectParams {
    pub topic: String,
    pub reason: DisconnectReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientEventKind {
    PairingCreated,
    SessionUpdated,
    SessionDeleted,
}

impl ClientEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientEventKind::PairingCreated => "pairing_created",
            ClientEventKind::SessionUpdated => "session_updated",
            ClientEventKind::SessionDeleted => "session_deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    PairingCreated(Pairing),
    SessionUpdated(Session),
    SessionDeleted(Session),
}

impl ClientEvent {
    pub fn kind(&self) -> ClientEventKind {
        match self {
            ClientEvent::PairingCreated(_) => ClientEventKind::PairingCreated,
            ClientEvent::SessionUpdated(_) => ClientEventKind::SessionUpdated,
            ClientEvent::SessionDeleted(_) => ClientEventKind::SessionDeleted,
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            ClientEvent::PairingCreated(p) => &p.topic,
            ClientEvent::SessionUpdated(s) | ClientEvent::SessionDeleted(s) => &s.topic,
        }
    }
}
