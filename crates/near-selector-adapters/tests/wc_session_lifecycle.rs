mod common;

use std::sync::Arc;

use near_selector_adapters::{MemoryStorage, SelectorConfig, WalletConnectModule, WalletConnectParams};
use near_selector_core::{
    Account, Action, BridgeClientPort, ConnectParams, EventEmitter, InitParams, Network,
    PortError, SelectorOptions, Session, SessionPermissions, SignAndSendTransactionParams,
    SignAndSendTransactionsParams, StoragePort, Transaction, TransferParams, Wallet,
    SIGN_AND_SEND_TRANSACTION, SIGN_AND_SEND_TRANSACTIONS, USER_DISCONNECTED_CODE,
};
use serde_json::json;

use common::{fixture, fixture_with, options, wallet_client, CONTRACT_ID};

const ACCOUNTS_KEY: &str = "near-wallet-selector:wallet-connect:accounts";

#[test]
fn connect_adds_function_call_key_and_persists_first_account() {
    let fx = fixture(&["alice.testnet", "bob.testnet"]);

    let accounts = fx.wallet.connect().expect("connect");
    assert_eq!(accounts, vec![Account::new("alice.testnet")]);

    let session = fx.wallet.session().expect("session").expect("session set");
    assert_eq!(session.permissions.chains, vec!["near:testnet".to_owned()]);
    assert_eq!(
        session.permissions.methods,
        vec![
            SIGN_AND_SEND_TRANSACTION.to_owned(),
            SIGN_AND_SEND_TRANSACTIONS.to_owned()
        ]
    );

    let requests = fx.client.debug_requests().expect("requests");
    assert_eq!(requests.len(), 1, "only the first key-add is sent");
    let request = &requests[0];
    assert_eq!(request.topic, session.topic);
    assert_eq!(request.chain_id, "near:testnet");
    assert_eq!(request.timeout_ms, 30_000);
    assert_eq!(request.request.method, SIGN_AND_SEND_TRANSACTION);

    let alice_key = fx
        .wallet
        .keystore()
        .get_key("testnet", "alice.testnet")
        .expect("get key")
        .expect("alice key stored");
    assert_eq!(
        request.request.params,
        json!({
            "signerId": "alice.testnet",
            "receiverId": "alice.testnet",
            "actions": [{
                "type": "AddKey",
                "params": {
                    "publicKey": alice_key.public_key(),
                    "accessKey": {
                        "permission": {
                            "receiverId": CONTRACT_ID,
                            "methodNames": ["addMessage"]
                        }
                    }
                }
            }]
        })
    );

    let mut stored = fx.wallet.keystore().get_accounts("testnet").expect("keystore");
    stored.sort();
    assert_eq!(stored, vec!["alice.testnet".to_owned(), "bob.testnet".to_owned()]);

    assert_eq!(
        fx.storage.get_item(ACCOUNTS_KEY).expect("storage"),
        Some(r#"[{"accountId":"alice.testnet"}]"#.to_owned())
    );
}

#[test]
fn connect_returns_existing_accounts_without_pairing_again() {
    let fx = fixture(&["alice.testnet"]);
    let first = fx.wallet.connect().expect("first connect");
    let second = fx.wallet.connect().expect("second connect");

    assert_eq!(first, second);
    assert_eq!(fx.client.debug_requests().expect("requests").len(), 1);
}

#[test]
fn failed_connect_disconnects_and_clears_state() {
    let fx = fixture(&["alice.testnet"]);
    fx.client
        .debug_fail_next_request("user rejected the request")
        .expect("arm failure");

    let err = fx.wallet.connect().expect_err("connect must fail");
    assert!(err.to_string().contains("user rejected"));

    assert!(fx.wallet.session().expect("session").is_none());
    assert!(fx.wallet.get_accounts().expect("accounts").is_empty());
    assert!(fx
        .wallet
        .keystore()
        .get_accounts("testnet")
        .expect("keystore")
        .is_empty());
    assert_eq!(fx.storage.get_item(ACCOUNTS_KEY).expect("storage"), None);

    let disconnects = fx.client.debug_disconnects().expect("disconnects");
    assert_eq!(disconnects.len(), 1);
    assert_eq!(disconnects[0].reason.code, USER_DISCONNECTED_CODE);
}

#[test]
fn disconnect_deletes_added_key_then_ends_session() {
    let fx = fixture(&["alice.testnet"]);
    fx.wallet.connect().expect("connect");
    let public_key = fx
        .wallet
        .keystore()
        .get_key("testnet", "alice.testnet")
        .expect("get key")
        .expect("key stored")
        .public_key();
    let topic = fx.wallet.session().expect("session").expect("set").topic;

    fx.wallet.disconnect().expect("disconnect");

    let requests = fx.client.debug_requests().expect("requests");
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1].request.params["actions"][0],
        json!({"type": "DeleteKey", "params": {"publicKey": public_key}})
    );

    let disconnects = fx.client.debug_disconnects().expect("disconnects");
    assert_eq!(disconnects.len(), 1);
    assert_eq!(disconnects[0].topic, topic);
    assert_eq!(disconnects[0].reason.code, 5900);
    assert_eq!(disconnects[0].reason.message, "User disconnected");

    assert!(fx.wallet.session().expect("session").is_none());
    assert!(fx.wallet.get_accounts().expect("accounts").is_empty());
    assert_eq!(fx.storage.get_item(ACCOUNTS_KEY).expect("storage"), None);
}

#[test]
fn disconnect_without_session_only_cleans_up() {
    let fx = fixture(&["alice.testnet"]);
    fx.wallet.disconnect().expect("disconnect");
    assert!(fx.client.debug_requests().expect("requests").is_empty());
    assert!(fx.client.debug_disconnects().expect("disconnects").is_empty());
}

#[test]
fn session_updated_only_applies_to_current_topic() {
    let fx = fixture(&["alice.testnet"]);
    fx.wallet.connect().expect("connect");
    let current = fx.wallet.session().expect("session").expect("set");

    fx.client
        .debug_inject_session_updated(Session {
            topic: "someone-else".to_owned(),
            accounts: vec!["near:testnet:mallory.testnet".to_owned()],
            permissions: SessionPermissions::default(),
        })
        .expect("inject foreign update");
    assert!(fx.emitted.lock().expect("emitted").is_empty());

    let updated = Session {
        accounts: vec![
            "near:testnet:alice.testnet".to_owned(),
            "near:testnet:carol.testnet".to_owned(),
        ],
        ..current
    };
    fx.client
        .debug_inject_session_updated(updated.clone())
        .expect("inject update");

    let emitted = fx.emitted.lock().expect("emitted");
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].accounts, vec![Account::new("alice.testnet")]);
    assert_eq!(fx.wallet.session().expect("session"), Some(updated));
}

#[test]
fn session_deleted_clears_state_and_unsubscribes() {
    let fx = fixture(&["alice.testnet"]);
    fx.wallet.connect().expect("connect");
    let current = fx.wallet.session().expect("session").expect("set");

    fx.client
        .debug_inject_session_deleted(&current.topic)
        .expect("inject delete");

    assert!(fx.wallet.session().expect("session").is_none());
    assert!(fx.wallet.get_accounts().expect("accounts").is_empty());
    assert!(fx
        .wallet
        .keystore()
        .get_accounts("testnet")
        .expect("keystore")
        .is_empty());
    assert_eq!(fx.storage.get_item(ACCOUNTS_KEY).expect("storage"), None);

    // Listeners were removed during cleanup.
    fx.client
        .debug_inject_session_updated(current)
        .expect("inject stale update");
    assert!(fx.emitted.lock().expect("emitted").is_empty());
}

#[test]
fn signing_requires_a_session() {
    let fx = fixture(&["alice.testnet"]);
    let err = fx
        .wallet
        .sign_and_send_transaction(SignAndSendTransactionParams {
            signer_id: "alice.testnet".to_owned(),
            receiver_id: None,
            actions: vec![],
        })
        .expect_err("no session");
    assert!(matches!(err, PortError::NotConnected));

    let err = fx
        .wallet
        .sign_and_send_transactions(SignAndSendTransactionsParams {
            transactions: vec![],
        })
        .expect_err("no session");
    assert!(matches!(err, PortError::NotConnected));
}

#[test]
fn signing_forwards_to_bridge_with_default_receiver() {
    let fx = fixture(&["alice.testnet"]);
    fx.wallet.connect().expect("connect");

    let transfer = Action::Transfer(TransferParams {
        deposit: "1".to_owned(),
    });
    fx.wallet
        .sign_and_send_transaction(SignAndSendTransactionParams {
            signer_id: "alice.testnet".to_owned(),
            receiver_id: None,
            actions: vec![transfer.clone()],
        })
        .expect("sign single");
    fx.wallet
        .sign_and_send_transactions(SignAndSendTransactionsParams {
            transactions: vec![Transaction {
                signer_id: "alice.testnet".to_owned(),
                receiver_id: "bob.testnet".to_owned(),
                actions: vec![transfer],
            }],
        })
        .expect("sign batch");

    let requests = fx.client.debug_requests().expect("requests");
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].request.method, SIGN_AND_SEND_TRANSACTION);
    assert_eq!(requests[1].request.params["receiverId"], CONTRACT_ID);
    assert_eq!(requests[2].request.method, SIGN_AND_SEND_TRANSACTIONS);
    assert_eq!(
        requests[2].request.params["transactions"][0]["receiverId"],
        "bob.testnet"
    );
}

#[test]
fn existing_client_session_is_restored_with_stored_accounts() {
    let client = wallet_client(&["alice.testnet"]);
    client
        .init(&InitParams {
            project_id: "p".to_owned(),
            metadata: Default::default(),
            relay_url: "wss://relay.walletconnect.com".to_owned(),
        })
        .expect("init");
    let session = client
        .connect(&ConnectParams {
            metadata: Default::default(),
            timeout_ms: 1_000,
            permissions: SessionPermissions::default(),
        })
        .expect("pre-existing session");

    let storage = Arc::new(MemoryStorage::default());
    storage
        .set_item(ACCOUNTS_KEY, r#"[{"accountId":"alice.testnet"}]"#)
        .expect("seed accounts");

    let fx = fixture_with(client, storage);
    assert_eq!(
        fx.wallet.get_accounts().expect("accounts"),
        vec![Account::new("alice.testnet")]
    );
    assert_eq!(fx.wallet.session().expect("session"), Some(session.clone()));

    fx.client
        .debug_inject_session_deleted(&session.topic)
        .expect("inject delete");
    assert!(fx.wallet.get_accounts().expect("accounts").is_empty());
}

#[test]
fn chain_id_prefers_explicit_param_and_rejects_unknown_networks() {
    let localnet = SelectorOptions {
        network: Network::custom("localnet", "http://127.0.0.1:3030"),
        ..options()
    };

    let wallet = WalletConnectModule::new(WalletConnectParams::from_config(
        &SelectorConfig::default(),
    ))
    .init(
        localnet.clone(),
        Arc::new(MemoryStorage::default()),
        EventEmitter::default(),
        wallet_client(&["alice.localnet"]),
    )
    .expect("init");
    let err = wallet.chain_id().expect_err("unknown network");
    assert!(matches!(err, PortError::Validation(ref m) if m == "Invalid chain id"));
    assert!(wallet.connect().is_err());
    assert!(wallet.session().expect("session").is_none());

    let params = WalletConnectParams {
        chain_id: Some("near:localnet".to_owned()),
        ..WalletConnectParams::from_config(&SelectorConfig::default())
    };
    let wallet = WalletConnectModule::new(params)
        .init(
            localnet,
            Arc::new(MemoryStorage::default()),
            EventEmitter::default(),
            wallet_client(&["alice.localnet"]),
        )
        .expect("init");
    assert_eq!(wallet.chain_id().expect("chain id"), "near:localnet");
}

fn assert_local_state_cleared(fx: &common::Fixture) {
    assert!(fx.wallet.session().expect("session").is_none());
    assert!(fx.wallet.get_accounts().expect("accounts").is_empty());
    assert!(fx
        .wallet
        .keystore()
        .get_accounts("testnet")
        .expect("keystore")
        .is_empty());
    assert_eq!(fx.storage.get_item(ACCOUNTS_KEY).expect("storage"), None);
}

#[test]
fn rejected_key_removal_still_ends_bridge_session() {
    let fx = fixture(&["alice.testnet"]);
    fx.wallet.connect().expect("connect");
    let topic = fx.wallet.session().expect("session").expect("set").topic;

    fx.client
        .debug_fail_next_request("delete key rejected")
        .expect("arm failure");
    let err = fx.wallet.disconnect().expect_err("key removal fails");
    assert!(err.to_string().contains("delete key rejected"));

    let disconnects = fx.client.debug_disconnects().expect("disconnects");
    assert_eq!(disconnects.len(), 1);
    assert_eq!(disconnects[0].topic, topic);
    assert_eq!(disconnects[0].reason.code, USER_DISCONNECTED_CODE);
    assert_local_state_cleared(&fx);
}

#[test]
fn malformed_session_account_still_ends_bridge_session() {
    let fx = fixture(&[]);
    fx.client
        .debug_set_wallet_accounts(vec!["near:testnet".to_owned()])
        .expect("malformed accounts");

    let err = fx.wallet.connect().expect_err("invalid session account");
    assert!(matches!(err, PortError::Validation(_)));

    let disconnects = fx.client.debug_disconnects().expect("disconnects");
    assert_eq!(disconnects.len(), 1);
    assert_eq!(disconnects[0].reason.code, USER_DISCONNECTED_CODE);
    assert_eq!(fx.client.restore_session().expect("restore"), None);
    assert_local_state_cleared(&fx);
}

#[test]
fn key_removal_error_wins_over_bridge_disconnect_error() {
    let fx = fixture(&["alice.testnet"]);
    fx.wallet.connect().expect("connect");

    fx.client
        .debug_fail_next_request("delete key rejected")
        .expect("arm request failure");
    fx.client
        .debug_fail_next_disconnect("bridge disconnect failed")
        .expect("arm disconnect failure");
    let err = fx.wallet.disconnect().expect_err("both fail");
    assert!(err.to_string().contains("delete key rejected"));
    assert_local_state_cleared(&fx);
}

#[test]
fn bridge_disconnect_error_is_returned_after_cleanup() {
    let fx = fixture(&["alice.testnet"]);
    fx.wallet.connect().expect("connect");

    fx.client
        .debug_fail_next_disconnect("bridge disconnect failed")
        .expect("arm disconnect failure");
    let err = fx.wallet.disconnect().expect_err("bridge fails");
    assert!(err.to_string().contains("bridge disconnect failed"));
    assert_eq!(fx.client.debug_requests().expect("requests").len(), 2);
    assert_local_state_cleared(&fx);
}
