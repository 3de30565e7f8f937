/// End-to-end tests: a real session (HTTP api + push socket) against the
/// in-process fixture server.

mod support;

use std::sync::Arc;
use std::time::Duration;

use parlor_client::api::{Api, HttpApi};
use parlor_client::error::Operation;
use parlor_client::{ChannelReporter, LinkState, Session, SyncError};
use parlor_types::ChannelId;

use support::{Fixture, eventually};

async fn session(fixture: &Fixture) -> (Session, tokio::sync::mpsc::UnboundedReceiver<parlor_client::report::Report>) {
    let (reporter, reports) = ChannelReporter::new();
    let session = Session::connect(&fixture.client_config(), Arc::new(reporter)).await.unwrap();
    let mut link = session.link();
    tokio::time::timeout(Duration::from_secs(5), link.wait_for(|state| *state == LinkState::Connected))
        .await
        .expect("push link never came up")
        .unwrap();
    // The server subscribes its socket a moment after the handshake.
    eventually("push subscription", || fixture.connections() >= 1).await;
    (session, reports)
}

#[tokio::test]
async fn created_channel_lands_once_from_response_and_push() {
    let fixture = Fixture::start(true).await;
    let (session, _reports) = session(&fixture).await;

    let channel = session.reconciler().submit_new_channel("ops").await.unwrap();
    assert_eq!(session.store().read(|s| s.current_channel_id()), Some(channel.id));

    // Give the push echo time to arrive; it must be absorbed.
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.store().read(|s| {
        assert_eq!(s.channel_count(), 3);
        assert_eq!(s.channels().filter(|c| c.name == "ops").count(), 1);
    });

    session.shutdown().await;
}

#[tokio::test]
async fn message_from_another_client_arrives_by_push() {
    let fixture = Fixture::start(true).await;
    let (session, _reports) = session(&fixture).await;

    let other = HttpApi::new(&fixture.base_url);
    let sent = other
        .send_message(ChannelId(2), "bob".into(), "hello from bob".into())
        .await
        .unwrap();

    let store = session.store().clone();
    eventually("bob's message", || store.read(|s| s.message(sent.id).is_some())).await;
    assert_eq!(store.read(|s| s.messages_in(ChannelId(2)).len()), 1);

    session.shutdown().await;
}

#[tokio::test]
async fn own_message_is_not_duplicated_by_its_echo() {
    let fixture = Fixture::start(true).await;
    let (session, _reports) = session(&fixture).await;

    let author = session.author().to_string();
    let sent = session.reconciler().send_to_current(&author, "hi").await.unwrap();
    assert_eq!(sent.channel_id, ChannelId(1));
    assert_eq!(sent.author, "alice");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(session.store().read(|s| s.message_count()), 1);

    session.shutdown().await;
}

#[tokio::test]
async fn rejected_removal_restores_the_channel() {
    let fixture = Fixture::start(true).await;
    fixture.fail_removals();
    let (session, mut reports) = session(&fixture).await;

    let err = session.reconciler().submit_removal(ChannelId(2)).await.unwrap_err();
    assert!(matches!(err, SyncError::RemovalAmbiguous { .. }));
    assert_eq!(
        session.store().read(|s| s.channel(ChannelId(2)).map(|c| c.name.clone())),
        Some("random".to_string())
    );
    assert_eq!(reports.recv().await.unwrap().context.operation, Operation::RemoveChannel);

    session.shutdown().await;
}

#[tokio::test]
async fn reconnect_replays_missed_events() {
    let fixture = Fixture::start(true).await;
    let (session, _reports) = session(&fixture).await;

    // Advance the cursor so the reconnect asks for a replay.
    fixture.create_channel("first");
    let store = session.store().clone();
    eventually("first channel", || store.read(|s| s.name_taken("first", None))).await;

    fixture.kick();
    fixture.create_channel("missed");

    eventually("second connection", || fixture.connections() >= 2).await;
    eventually("missed channel", || store.read(|s| s.name_taken("missed", None))).await;
    assert_eq!(store.read(|s| s.channel_count()), 4);

    session.shutdown().await;
}

#[tokio::test]
async fn reconnect_without_cursor_resyncs() {
    let fixture = Fixture::start(false).await;
    let (session, _reports) = session(&fixture).await;

    fixture.kick();
    fixture.create_channel("missed");

    let store = session.store().clone();
    eventually("second connection", || fixture.connections() >= 2).await;
    eventually("missed channel", || store.read(|s| s.name_taken("missed", None))).await;

    session.shutdown().await;
}

#[tokio::test]
async fn malformed_push_is_reported_not_applied() {
    let fixture = Fixture::start(true).await;
    let (session, mut reports) = session(&fixture).await;

    fixture.send_raw(r#"{"event":"newChannel","payload":{"data":{"id":"x"}}}"#);

    let report = tokio::time::timeout(Duration::from_secs(5), reports.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.context.operation, Operation::Ingest);
    assert_eq!(session.store().read(|s| s.channel_count()), 2);

    session.shutdown().await;
}
