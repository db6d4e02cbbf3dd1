use std::{
    fs::File,
    io::{BufReader, BufWriter},
    sync::Arc,
};

use anyhow::{anyhow, Context};
use matrix_sdk::{
    room::Room,
    ruma::{
        events::{
            room::{member::MemberEventContent, message::MessageEventContent},
            AnyMessageEventContent, StrippedStateEvent,
        },
        RoomId,
    },
    Client, ClientConfig, Session, SyncSettings,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, trace, warn};

use crate::{config::ProloteaConfig, registry::SubscriptionRegistry, webhooks::Event};

pub mod dispatch;
use dispatch::{ChatSender, DeliveryOutcome, Dispatcher};

mod gitea;
use gitea::handle_gitea_event;

mod handlers;
use handlers::autojoin::autojoin_authorized_rooms;

pub(crate) mod utils;

/// A message ready to be sent to the rooms subscribed to `repo`.
#[derive(Debug)]
pub struct Notification {
    pub message: String,
    pub repo: String,
    /// Token embedded in the webhook payload
    pub secret: String,
}

pub struct Prolotea {
    client: Client,
    config: ProloteaConfig,
    registry: Arc<dyn SubscriptionRegistry>,
}

impl Prolotea {
    /// Creates a new [`Prolotea`] bot and builds a [`matrix_sdk::Client`] using the provided
    /// [`ProloteaConfig`].
    ///
    /// The [`Client`] is only initialized, not ready to be used yet.
    pub fn new(
        config: ProloteaConfig,
        registry: Arc<dyn SubscriptionRegistry>,
    ) -> anyhow::Result<Self> {
        let client_config = ClientConfig::new().store_path(config.matrix_state_dir.join("store"));
        let client = Client::new_with_config(config.matrix_homeserver.clone(), client_config)?;

        Ok(Self {
            client,
            config,
            registry,
        })
    }

    /// Loads session information from file, or creates it if no previous session is found.
    ///
    /// The bot is ready to run once this function has been called.
    pub async fn init(&self) -> anyhow::Result<()> {
        self.load_or_init_session()
            .await
            .context("couldn't init session for matrix bot")?;

        let authorized_rooms = self.config.authorized_rooms.clone();

        self.client
            .register_event_handler({
                move |ev: StrippedStateEvent<MemberEventContent>, client: Client, room: Room| {
                    let authorized_rooms = authorized_rooms.clone();
                    async move { autojoin_authorized_rooms(ev, client, room, authorized_rooms).await }
                }
            })
            .await;

        Ok(())
    }

    /// Start listening to Matrix events, and announcing webhook events received on `events`.
    ///
    /// [`Prolotea::init`] **must** be called before this function, otherwise the [`Client`] isn't
    /// logged in.
    pub async fn run(&self, events: UnboundedReceiver<Event>) {
        debug!("running...");

        let dispatcher = Dispatcher::new(
            self.registry.clone(),
            Arc::new(MatrixSender(self.client.clone())),
            self.config.webhook_secret.clone(),
        );
        tokio::task::spawn(async move { receive_events(events, dispatcher).await });

        self.client.sync(SyncSettings::default()).await
    }

    /// This loads the session information from an existing file, and tries to login with it. If no such
    /// file is found, then login using username and password, and save the new session information on
    /// disk.
    async fn load_or_init_session(&self) -> anyhow::Result<()> {
        let session_file = self.config.matrix_state_dir.join("session.yaml");

        if session_file.is_file() {
            let reader = BufReader::new(File::open(session_file)?);
            let session: Session = serde_yaml::from_reader(reader)?;

            self.client.restore_login(session.clone()).await?;
            info!("Reused session: {}, {}", session.user_id, session.device_id);
        } else {
            let response = self
                .client
                .login(
                    &self.config.matrix_username,
                    &self.config.matrix_password,
                    None,
                    Some("prolotea bot"),
                )
                .await?;

            info!("logged in as {}", self.config.matrix_username);

            let session = Session {
                access_token: response.access_token,
                user_id: response.user_id,
                device_id: response.device_id,
            };

            let writer = BufWriter::new(File::create(session_file)?);
            serde_yaml::to_writer(writer, &session)?;
        }

        Ok(())
    }
}

async fn receive_events(mut events: UnboundedReceiver<Event>, dispatcher: Dispatcher) {
    loop {
        let event = match events.recv().await {
            Some(event) => event,
            None => {
                info!("all channel senders were dropped, exiting receive loop");
                break;
            }
        };
        trace!("received event: {:?}", event);

        handle_event(event, &dispatcher).await;
    }
}

async fn handle_event(event: Event, dispatcher: &Dispatcher) {
    let notification = match event {
        Event::Gitea(event) => handle_gitea_event(&event),
    };

    let Notification {
        message,
        repo,
        secret,
    } = match notification {
        Some(notification) => notification,
        // event doesn't need a message from the bot
        None => {
            trace!("event didn't need to be announced");
            return;
        }
    };

    let deliveries = match dispatcher.dispatch(&repo, &message, &secret).await {
        Ok(deliveries) => deliveries,
        Err(e) => {
            warn!("encountered error while handling event: {}", e);
            return;
        }
    };

    let delivered: Vec<&str> = deliveries
        .iter()
        .filter(|delivery| matches!(delivery.outcome, DeliveryOutcome::Delivered))
        .map(|delivery| delivery.destination.as_str())
        .collect();
    debug!(
        "announced event on {} in {}/{} subscribed room(s): {:?}",
        repo,
        delivered.len(),
        deliveries.len(),
        delivered
    );
}

/// Posts plain text messages in rooms the bot has joined.
struct MatrixSender(Client);

#[rocket::async_trait]
impl ChatSender for MatrixSender {
    async fn send(&self, destination: &str, text: &str) -> anyhow::Result<()> {
        let room_id = RoomId::try_from(destination)
            .with_context(|| format!("`{}` isn't a valid room id", destination))?;
        let room = self.0.get_joined_room(&room_id).ok_or_else(|| {
            anyhow!(
                "room with id {} isn't joined yet, can't send message",
                room_id
            )
        })?;

        let message = AnyMessageEventContent::RoomMessage(MessageEventContent::text_plain(text));
        room.send(message, None).await?;

        Ok(())
    }
}
