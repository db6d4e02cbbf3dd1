use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{registry::SubscriptionRegistry, webhooks::gitea::signing::verify_token};

/// Something able to post a text message in a chat room.
#[rocket::async_trait]
pub trait ChatSender: Send + Sync {
    async fn send(&self, destination: &str, text: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("couldn't look up subscriptions for {repo}: {source:#}")]
    Lookup {
        repo: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Debug)]
pub enum DeliveryOutcome {
    Delivered,
    /// The payload's token wasn't the one issued to this room, nothing was sent.
    TokenMismatch,
    Failed(anyhow::Error),
}

#[derive(Debug)]
pub struct Delivery {
    pub destination: String,
    pub outcome: DeliveryOutcome,
}

/// Sends rendered notifications to every room subscribed to their repository.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<dyn SubscriptionRegistry>,
    chat: Arc<dyn ChatSender>,
    secret: String,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<dyn SubscriptionRegistry>,
        chat: Arc<dyn ChatSender>,
        secret: String,
    ) -> Self {
        Self {
            registry,
            chat,
            secret,
        }
    }

    /// Delivers `text` to each room subscribed to `repo` whose issued token is `presented_token`.
    ///
    /// Failing to deliver to one room doesn't prevent delivering to the others, each room gets
    /// its own entry in the returned list.
    pub async fn dispatch(
        &self,
        repo: &str,
        text: &str,
        presented_token: &str,
    ) -> Result<Vec<Delivery>, DispatchError> {
        if text.is_empty() {
            trace!("nothing to dispatch for {}", repo);
            return Ok(Vec::new());
        }

        let repo = repo.to_lowercase();
        let destinations = self
            .lookup(repo.clone())
            .await
            .map_err(|source| DispatchError::Lookup {
                repo: repo.clone(),
                source,
            })?;
        debug!("{} room(s) subscribed to {}", destinations.len(), repo);

        let mut deliveries = Vec::with_capacity(destinations.len());
        for destination in destinations {
            let outcome = self.deliver(&repo, &destination, text, presented_token).await;
            deliveries.push(Delivery {
                destination,
                outcome,
            });
        }

        Ok(deliveries)
    }

    /// Registries may hit the disk, so lookups run on the blocking thread pool.
    async fn lookup(&self, repo: String) -> anyhow::Result<Vec<String>> {
        let registry = self.registry.clone();
        tokio::task::spawn_blocking(move || registry.lookup(&repo))
            .await
            .context("subscription lookup task failed")?
    }

    async fn deliver(
        &self,
        repo: &str,
        destination: &str,
        text: &str,
        presented_token: &str,
    ) -> DeliveryOutcome {
        if !verify_token(repo, destination, &self.secret, presented_token) {
            warn!(
                "payload token for {} doesn't match the one issued to {}, skipping",
                repo, destination
            );
            return DeliveryOutcome::TokenMismatch;
        }

        trace!("sending message `{}` to room `{}`", text, destination);
        match self.chat.send(destination, text).await {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(e) => {
                warn!("couldn't deliver message to {}: {:#}", destination, e);
                DeliveryOutcome::Failed(e)
            }
        }
    }
}
