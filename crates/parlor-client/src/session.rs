use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use parlor_store::StoreHandle;
use parlor_types::Snapshot;

use crate::api::{Api, HttpApi};
use crate::config::ClientConfig;
use crate::ingestor::Ingestor;
use crate::push::{LinkState, PushClient};
use crate::reconciler::Reconciler;
use crate::report::ErrorReporter;

/// One chat session: the store, the reconciler driving it, and the push
/// connection keeping it current.
pub struct Session<A = HttpApi> {
    reconciler: Reconciler<A>,
    author: String,
    link: watch::Receiver<LinkState>,
    shutdown: CancellationToken,
    push_task: JoinHandle<()>,
}

impl Session<HttpApi> {
    /// Fetch the initial snapshot over HTTP and start listening for pushes.
    pub async fn connect(config: &ClientConfig, reporter: Arc<dyn ErrorReporter>) -> Result<Self> {
        let api = HttpApi::new(&config.api_url);
        let snapshot = api
            .fetch_snapshot()
            .await
            .with_context(|| format!("fetching initial snapshot from {}", config.api_url))?;
        Ok(Self::start(api, snapshot, config, reporter))
    }
}

impl<A: Api> Session<A> {
    pub fn start(api: A, snapshot: Snapshot, config: &ClientConfig, reporter: Arc<dyn ErrorReporter>) -> Self {
        let store = StoreHandle::seeded(snapshot);
        let reconciler = Reconciler::new(api, store.clone(), reporter.clone(), config.name_rules);
        let ingestor = Ingestor::new(store, reporter);

        let push = PushClient::new(config.push_config(), reconciler.clone(), ingestor);
        let link = push.link();
        let shutdown = CancellationToken::new();
        let push_task = tokio::spawn(push.run(shutdown.clone()));

        let author = config.author();
        info!("Session started as '{}'", author);

        Self {
            reconciler,
            author,
            link,
            shutdown,
            push_task,
        }
    }

    pub fn reconciler(&self) -> &Reconciler<A> {
        &self.reconciler
    }

    pub fn store(&self) -> &StoreHandle {
        self.reconciler.store()
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn link(&self) -> watch::Receiver<LinkState> {
        self.link.clone()
    }

    /// Close the push connection. In-flight submits still run to completion.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        let _ = self.push_task.await;
        info!("Session closed");
    }
}
