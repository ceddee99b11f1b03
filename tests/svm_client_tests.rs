//! Unit tests for the SVM account fetch client
//!
//! These tests run the JSON-RPC client against a mock server, including the
//! resolver end to end over HTTP.

mod helpers;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use helpers::{dummy_context, dummy_programs, peer_record_bytes, DUMMY_DST_EID, DUMMY_PEER_ADDRESS};
use lz_vault_client::{
    error::{FetchError, ResolveError},
    resolver::{ChainAccountResolver, OAppAccounts},
    svm_client::SvmClient,
};
use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;
use wiremock::matchers::{body_json, body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn account_response(owner: &Pubkey, data: &[u8]) -> serde_json::Value {
    json!({
        "jsonrpc": "2.0",
        "result": {
            "context": { "slot": 1 },
            "value": {
                "data": [STANDARD.encode(data), "base64"],
                "executable": false,
                "lamports": 1_000_000,
                "owner": owner.to_string(),
                "rentEpoch": 0
            }
        },
        "id": 1
    })
}

fn client_for(server: &MockServer, timeout: Duration) -> SvmClient {
    SvmClient::new(&server.uri(), timeout, "confirmed").expect("Failed to create SvmClient")
}

/// What is tested: get_account() sends getAccountInfo and decodes base64 data and owner
/// Why: the peer record bytes come straight from this decoding
#[tokio::test]
async fn test_get_account_decodes_base64() {
    let mock_server = MockServer::start().await;
    let address = Pubkey::new_unique();
    let owner = Pubkey::new_unique();

    Mock::given(method("POST"))
        .and(body_json(json!({
            "jsonrpc": "2.0",
            "method": "getAccountInfo",
            "params": [
                address.to_string(),
                { "encoding": "base64", "commitment": "confirmed" }
            ],
            "id": 1
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(account_response(&owner, &[1, 2, 3])))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5));
    let account = client.get_account(&address).await.unwrap().unwrap();
    assert_eq!(account.owner, owner);
    assert_eq!(account.data, vec![1, 2, 3]);
}

/// What is tested: a null value is reported as a missing account
/// Why: a missing peer must become AccountNotFound, not an RPC error
#[tokio::test]
async fn test_get_account_null_value_is_none() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": { "context": { "slot": 1 }, "value": null },
            "id": 1
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5));
    assert_eq!(client.get_account(&Pubkey::new_unique()).await.unwrap(), None);
}

/// What is tested: a JSON-RPC error object is surfaced as FetchError::Rpc
/// Why: node errors must not be mistaken for a missing account
#[tokio::test]
async fn test_get_account_rpc_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "error": { "code": -32602, "message": "Invalid param: WrongSize" },
            "id": 1
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server, Duration::from_secs(5));
    let err = client.get_account(&Pubkey::new_unique()).await.unwrap_err();
    match err {
        FetchError::Rpc(message) => assert!(message.contains("WrongSize")),
        other => panic!("expected FetchError::Rpc, got {other:?}"),
    }
}

/// What is tested: a slow response maps to FetchError::Timeout
/// Why: transport timeouts must stay distinguishable so callers can retry
#[tokio::test]
async fn test_get_account_slow_response_times_out() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "jsonrpc": "2.0", "result": { "value": null }, "id": 1 }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let timeout = Duration::from_millis(100);
    let client = client_for(&mock_server, timeout);
    let err = client.get_account(&Pubkey::new_unique()).await.unwrap_err();
    assert_eq!(err, FetchError::Timeout(timeout));
}

/// What is tested: the resolver runs end to end against an HTTP peer record
/// Why: confirms the fetch seam is wired to the real client
#[tokio::test]
async fn test_resolver_over_http() {
    let mock_server = MockServer::start().await;
    let programs = dummy_programs();
    let peer = OAppAccounts::derive(&programs, DUMMY_DST_EID).unwrap().peer;
    let data = peer_record_bytes(DUMMY_PEER_ADDRESS, &[0, 0, 0, 0], peer.bump);

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "getAccountInfo",
            "params": [peer.address.to_string()]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(account_response(&programs.messaging_app, &data)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let resolver = ChainAccountResolver::new(
        programs,
        client_for(&mock_server, Duration::from_secs(5)),
        Duration::from_secs(5),
    );
    let resolved = resolver.resolve(&dummy_context()).await.unwrap();
    assert_eq!(resolved.peer.peer_address(), DUMMY_PEER_ADDRESS);
}

/// What is tested: an HTTP peer record with the wrong bump stops resolution
/// Why: the mismatch must be caught before any instruction is built
#[tokio::test]
async fn test_resolver_over_http_bump_mismatch() {
    let mock_server = MockServer::start().await;
    let programs = dummy_programs();
    let peer = OAppAccounts::derive(&programs, DUMMY_DST_EID).unwrap().peer;
    let data = peer_record_bytes(DUMMY_PEER_ADDRESS, &[], peer.bump.wrapping_add(1));

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(account_response(&programs.messaging_app, &data)),
        )
        .mount(&mock_server)
        .await;

    let resolver = ChainAccountResolver::new(
        programs,
        client_for(&mock_server, Duration::from_secs(5)),
        Duration::from_secs(5),
    );
    let err = resolver.resolve(&dummy_context()).await.unwrap_err();
    assert!(matches!(err, ResolveError::PeerBumpMismatch { .. }));
}
