//! In-process chat server for integration tests: the REST routes plus a push
//! socket that stamps frames with a sequence number and can replay them.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde::Deserialize;
use tokio::sync::{broadcast, watch};

use parlor_client::ClientConfig;
use parlor_client::validate::NameRules;
use parlor_types::api::{ChannelName, ChannelRecord, Draft, Envelope, IdOnly, MessageRecord, NewMessage, Record};
use parlor_types::events::{PushEvent, PushFrame};
use parlor_types::{Channel, ChannelId, Message, MessageId, Snapshot};

struct Data {
    channels: Vec<Channel>,
    messages: Vec<Message>,
    next_id: u64,
    seq: u64,
    log: Vec<(u64, String)>,
}

struct FixtureState {
    data: Mutex<Data>,
    events: broadcast::Sender<String>,
    connections: watch::Sender<usize>,
    kick: watch::Sender<u64>,
    sequenced: bool,
    fail_removals: AtomicBool,
}

pub struct Fixture {
    pub base_url: String,
    pub push_url: String,
    state: Arc<FixtureState>,
}

#[derive(Deserialize)]
struct SinceQuery {
    since: Option<u64>,
}

impl Fixture {
    pub async fn start(sequenced: bool) -> Self {
        let (events, _) = broadcast::channel(64);
        let (connections, _) = watch::channel(0);
        let (kick, _) = watch::channel(0);
        let state = Arc::new(FixtureState {
            data: Mutex::new(Data {
                channels: vec![
                    Channel { id: ChannelId(1), name: "general".into(), removable: false },
                    Channel { id: ChannelId(2), name: "random".into(), removable: true },
                ],
                messages: vec![],
                next_id: 10,
                seq: 0,
                log: vec![],
            }),
            events,
            connections,
            kick,
            sequenced,
            fail_removals: AtomicBool::new(false),
        });

        let app = Router::new()
            .route("/api/v1/data", get(snapshot))
            .route("/api/v1/channels", post(create_channel))
            .route("/api/v1/channels/{id}", patch(rename_channel).delete(remove_channel))
            .route("/api/v1/channels/{id}/messages", post(send_message))
            .route("/socket", get(socket))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            push_url: format!("ws://{}/socket", addr),
            state,
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            api_url: self.base_url.clone(),
            push_url: self.push_url.clone(),
            username: Some("alice".into()),
            name_rules: NameRules::default(),
            reconnect_delay: Duration::from_millis(50),
            max_reconnect_delay: Duration::from_millis(200),
            heartbeat: Duration::from_secs(15),
        }
    }

    pub fn connections(&self) -> usize {
        *self.state.connections.borrow()
    }

    pub fn fail_removals(&self) {
        self.state.fail_removals.store(true, Ordering::SeqCst);
    }

    /// Close every open push socket.
    pub fn kick(&self) {
        self.state.kick.send_modify(|generation| *generation += 1);
    }

    /// A channel created by some other client.
    pub fn create_channel(&self, name: &str) -> Channel {
        create(&self.state, name)
    }

    /// Send a frame that bypasses the event log.
    pub fn send_raw(&self, frame: &str) {
        let _ = self.state.events.send(frame.to_string());
    }
}

fn create(state: &FixtureState, name: &str) -> Channel {
    let channel = {
        let mut data = state.data.lock().unwrap();
        data.next_id += 1;
        let channel = Channel {
            id: ChannelId(data.next_id),
            name: name.to_string(),
            removable: true,
        };
        data.channels.push(channel.clone());
        channel
    };
    publish(state, PushEvent::ChannelAdded(Envelope::new(ChannelRecord::from(&channel))));
    channel
}

fn publish(state: &FixtureState, event: PushEvent) {
    let text = {
        let mut data = state.data.lock().unwrap();
        data.seq += 1;
        let frame = PushFrame {
            seq: state.sequenced.then_some(data.seq),
            event,
        };
        let text = frame.to_json();
        let seq = data.seq;
        data.log.push((seq, text.clone()));
        text
    };
    let _ = state.events.send(text);
}

async fn snapshot(State(state): State<Arc<FixtureState>>) -> Json<Snapshot> {
    let data = state.data.lock().unwrap();
    Json(Snapshot {
        channels: data.channels.clone(),
        messages: data.messages.clone(),
        current_channel_id: Some(ChannelId(1)),
    })
}

async fn create_channel(
    State(state): State<Arc<FixtureState>>,
    Json(req): Json<Envelope<Draft<ChannelName>>>,
) -> Result<impl IntoResponse, StatusCode> {
    let name = req.data.attributes.name;
    if state.data.lock().unwrap().channels.iter().any(|c| c.name == name) {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    let channel = create(&state, &name);
    Ok((StatusCode::CREATED, Json(Envelope::new(ChannelRecord::from(&channel)))))
}

async fn rename_channel(
    State(state): State<Arc<FixtureState>>,
    Path(id): Path<u64>,
    Json(req): Json<Envelope<Draft<ChannelName>>>,
) -> Result<impl IntoResponse, StatusCode> {
    let id = ChannelId(id);
    let name = req.data.attributes.name;
    let channel = {
        let mut data = state.data.lock().unwrap();
        let channel = data.channels.iter_mut().find(|c| c.id == id).ok_or(StatusCode::NOT_FOUND)?;
        channel.name = name.clone();
        channel.clone()
    };
    publish(
        &state,
        PushEvent::ChannelRenamed(Envelope::new(Record {
            id,
            attributes: ChannelName { name },
        })),
    );
    Ok(Json(Envelope::new(ChannelRecord::from(&channel))))
}

async fn remove_channel(State(state): State<Arc<FixtureState>>, Path(id): Path<u64>) -> StatusCode {
    if state.fail_removals.load(Ordering::SeqCst) {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    let id = ChannelId(id);
    {
        let mut data = state.data.lock().unwrap();
        data.channels.retain(|c| c.id != id);
        data.messages.retain(|m| m.channel_id != id);
    }
    publish(&state, PushEvent::ChannelRemoved(Envelope::new(IdOnly { id })));
    StatusCode::NO_CONTENT
}

async fn send_message(
    State(state): State<Arc<FixtureState>>,
    Path(channel_id): Path<u64>,
    Json(req): Json<Envelope<Draft<NewMessage>>>,
) -> impl IntoResponse {
    let message = {
        let mut data = state.data.lock().unwrap();
        data.next_id += 1;
        let message = Message {
            id: MessageId(data.next_id),
            channel_id: ChannelId(channel_id),
            author: req.data.attributes.author,
            text: req.data.attributes.text,
        };
        data.messages.push(message.clone());
        message
    };
    publish(&state, PushEvent::MessageAdded(Envelope::new(MessageRecord::from(&message))));
    (StatusCode::CREATED, Json(Envelope::new(MessageRecord::from(&message))))
}

async fn socket(
    State(state): State<Arc<FixtureState>>,
    Query(query): Query<SinceQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(socket, state, query.since))
}

async fn serve_socket(mut socket: WebSocket, state: Arc<FixtureState>, since: Option<u64>) {
    // Subscribe before reading the backlog: overlap shows up as duplicates.
    let mut events = state.events.subscribe();
    let mut kick = state.kick.subscribe();
    let backlog: Vec<String> = match since {
        Some(since) => {
            let data = state.data.lock().unwrap();
            data.log.iter().filter(|(seq, _)| *seq > since).map(|(_, f)| f.clone()).collect()
        }
        None => vec![],
    };
    state.connections.send_modify(|n| *n += 1);

    for frame in backlog {
        if socket.send(WsMessage::Text(frame.into())).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            _ = kick.changed() => {
                let _ = socket.send(WsMessage::Close(None)).await;
                return;
            }
            frame = events.recv() => match frame {
                Ok(frame) => {
                    if socket.send(WsMessage::Text(frame.into())).await.is_err() {
                        return;
                    }
                }
                Err(_) => return,
            },
            msg = socket.recv() => match msg {
                Some(Ok(_)) => {}
                _ => return,
            },
        }
    }
}

/// Poll `check` until it holds, failing the test after a few seconds.
pub async fn eventually<F: FnMut() -> bool>(what: &str, mut check: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !check() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
