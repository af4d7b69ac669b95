//! RpcClient against an in-process daemon with a scripted backend.

use async_trait::async_trait;
use rpt_common::config::RptConfig;
use rpt_common::ipc::{Method, ResponseData};
use rpt_common::{
    FakeBackend, GatePolicy, MemoryCacheStore, Pipeline, PromptSet, RunStatus, TranslationGateway,
};
use rptctl::rpc_client::RpcClient;
use rptd::clipboard::Clipboard;
use rptd::keys::NoopKeyInjector;
use rptd::{server, Daemon, DaemonState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct EmptyClipboard;

#[async_trait]
impl Clipboard for EmptyClipboard {
    async fn read_selection(&self) -> String {
        String::new()
    }

    async fn write_result(&self, _text: &str) {}
}

async fn start_daemon(reply: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("rptd.sock");

    let gateway = TranslationGateway::new(
        Arc::new(FakeBackend::always_text(reply)),
        Duration::from_secs(5),
    );
    let pipeline = Pipeline::new(
        Arc::new(MemoryCacheStore::new()),
        gateway,
        PromptSet::default(),
    );
    let state = Arc::new(DaemonState::new(RptConfig::default(), None, pipeline));
    let daemon = Arc::new(Daemon::new(
        state,
        Arc::new(EmptyClipboard),
        Arc::new(NoopKeyInjector),
        GatePolicy::Drop,
    ));

    let listener = server::bind(&socket_path).unwrap();
    tokio::spawn(server::serve(listener, daemon));
    (dir, socket_path)
}

#[tokio::test]
async fn translate_through_daemon() {
    let (_dir, socket_path) = start_daemon("runs toward the enemy").await;
    let mut client = RpcClient::connect(&socket_path).await.unwrap();

    client.ping().await.unwrap();

    let response = client
        .call(Method::Translate {
            text: "/me lari ke arah musuh".to_string(),
        })
        .await
        .unwrap();

    match response {
        ResponseData::Translation(outcome) => {
            assert_eq!(outcome.output, "/me runs toward the enemy");
            assert_eq!(outcome.status, RunStatus::Translated);
        }
        other => panic!("unexpected response: {:?}", other),
    }

    let again = client
        .call(Method::Translate {
            text: "/me lari ke arah musuh".to_string(),
        })
        .await
        .unwrap();
    assert!(matches!(
        again,
        ResponseData::Translation(outcome) if outcome.status == RunStatus::CacheHit
    ));
}

#[tokio::test]
async fn rpc_errors_surface_as_errors() {
    let (_dir, socket_path) = start_daemon("unused").await;
    let mut client = RpcClient::connect(&socket_path).await.unwrap();

    let result = client
        .call(Method::SetStyle {
            style: String::new(),
        })
        .await;
    assert!(result.unwrap_err().to_string().contains("RPC error"));
}

#[tokio::test]
async fn disabled_daemon_reports_disabled_trigger() {
    let (_dir, socket_path) = start_daemon("unused").await;
    let mut client = RpcClient::connect(&socket_path).await.unwrap();

    client
        .call(Method::SetEnabled { enabled: false })
        .await
        .unwrap();
    assert_eq!(client.call(Method::Trigger).await.unwrap(), ResponseData::Disabled);
}
