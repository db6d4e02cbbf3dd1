use tokio::sync::mpsc::UnboundedSender;

pub mod gitea;
pub use gitea::{gitea_webhook, health_check, WebhookEvent};

pub struct EventSender(pub UnboundedSender<Event>);

#[derive(Debug)]
pub enum Event {
    Gitea(WebhookEvent),
}
