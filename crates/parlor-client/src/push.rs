use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use parlor_types::events::PushFrame;

use crate::api::Api;
use crate::cursor::{Check, Cursor};
use crate::ingestor::Ingestor;
use crate::reconciler::Reconciler;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub url: String,
    /// First reconnect delay; doubles up to `max_reconnect_delay`.
    pub reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    /// Ping interval. Two unanswered pings drop the connection.
    pub heartbeat: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Connected,
    Disconnected,
}

enum Ended {
    Shutdown,
    Dropped(String),
}

/// Keeps one push connection alive and feeds its frames to the ingestor.
///
/// On reconnect the server is asked to replay from the last cursor. When
/// frames are unsequenced, or a gap shows up, the store is rebuilt from a
/// fresh snapshot instead.
pub struct PushClient<A> {
    config: PushConfig,
    reconciler: Reconciler<A>,
    ingestor: Ingestor,
    cursor: Cursor,
    link: watch::Sender<LinkState>,
}

impl<A: Api> PushClient<A> {
    pub fn new(config: PushConfig, reconciler: Reconciler<A>, ingestor: Ingestor) -> Self {
        let (link, _) = watch::channel(LinkState::Connecting);
        Self {
            config,
            reconciler,
            ingestor,
            cursor: Cursor::default(),
            link,
        }
    }

    pub fn link(&self) -> watch::Receiver<LinkState> {
        self.link.subscribe()
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut delay = self.config.reconnect_delay;
        let mut connected_before = false;

        loop {
            self.link.send_replace(LinkState::Connecting);
            let url = self.cursor.resume_url(&self.config.url);
            let attempt = tokio::select! {
                _ = shutdown.cancelled() => return,
                attempt = connect_async(url.as_str()) => attempt,
            };

            match attempt {
                Ok((socket, _)) => {
                    info!("Push stream connected to {}", url);
                    self.link.send_replace(LinkState::Connected);
                    delay = self.config.reconnect_delay;

                    self.cursor.reconnected();
                    // Without a cursor there is nothing to replay from.
                    if connected_before && self.cursor.last().is_none() {
                        let _ = self.reconciler.resync().await;
                    }
                    connected_before = true;

                    match self.pump(socket, &shutdown).await {
                        Ended::Shutdown => {
                            self.link.send_replace(LinkState::Disconnected);
                            return;
                        }
                        Ended::Dropped(reason) => warn!("Push stream dropped: {}", reason),
                    }
                }
                Err(e) => warn!("Push connect to {} failed: {}", url, e),
            }

            self.link.send_replace(LinkState::Disconnected);
            debug!("Reconnecting in {:?}", delay);
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            delay = (delay * 2).min(self.config.max_reconnect_delay);
        }
    }

    async fn pump(&mut self, socket: Socket, shutdown: &CancellationToken) -> Ended {
        let (mut sender, mut receiver) = socket.split();

        let mut heartbeat = tokio::time::interval(self.config.heartbeat);
        heartbeat.tick().await;
        let mut pong_received = true;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    let _ = sender.send(Message::Close(None)).await;
                    return Ended::Shutdown;
                }
                msg = receiver.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.handle_text(text.as_str()).await,
                    Some(Ok(Message::Pong(_))) => pong_received = true,
                    Some(Ok(Message::Close(_))) | None => return Ended::Dropped("closed by server".into()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Ended::Dropped(e.to_string()),
                },
                _ = heartbeat.tick() => {
                    if std::mem::replace(&mut pong_received, false) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            return Ended::Dropped(format!("missed {} pongs", missed_heartbeats));
                        }
                    }
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        return Ended::Dropped("ping failed".into());
                    }
                }
            }
        }
    }

    async fn handle_text(&mut self, text: &str) {
        let frame = match PushFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                self.ingestor.reject(text, e);
                return;
            }
        };

        match self.cursor.observe(frame.seq) {
            Check::Duplicate => {
                trace!("Skipping replayed frame {:?}", frame.seq);
                return;
            }
            Check::Gap { expected, got } => {
                warn!("Push stream gap: expected seq {}, got {}; resyncing", expected, got);
                let _ = self.reconciler.resync().await;
            }
            Check::Restarted { last, got } => {
                warn!("Push stream restarted at seq {} (was at {}); resyncing", got, last);
                let _ = self.reconciler.resync().await;
            }
            Check::First | Check::Next | Check::Unsequenced => {}
        }

        self.ingestor.ingest(frame.event);
    }
}
