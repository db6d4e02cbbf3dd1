use std::{convert::Infallible, fmt, str::FromStr};

use rocket::{
    data::{ByteUnit, Data, Limits},
    request::{FromRequest, Outcome},
    Request, State,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

pub mod events;
pub use events::*;

pub mod signing;

use crate::webhooks::{Event, EventSender};

const X_GITEA_EVENT: &str = "X-Gitea-Event";

const LIMIT: ByteUnit = ByteUnit::Mebibyte(1);

pub const WEBHOOK_PATH: &str = "/giteabot/webhook";

#[rocket::get("/giteabot")]
pub fn health_check() -> &'static str {
    "beep boop! :)"
}

/// Gitea doesn't act on error statuses, so this always answers `OK` and only logs what went
/// wrong.
#[rocket::post("/giteabot/webhook", data = "<payload>")]
pub async fn gitea_webhook(
    event_type: GiteaEventHeader<'_>,
    limits: &Limits,
    payload: Data<'_>,
    sender: &State<EventSender>,
) -> &'static str {
    let size_limit = limits.get("json").unwrap_or(LIMIT);
    let content = match payload.open(size_limit).into_bytes().await {
        Ok(bytes) if bytes.is_complete() => bytes.into_inner(),
        Ok(_) => {
            warn!("payload was too big, dropping it");
            return "OK";
        }
        Err(e) => {
            warn!("couldn't read payload: {}", e);
            return "OK";
        }
    };

    let label = event_type.0.unwrap_or_default();
    let event = match decode(label, &content) {
        Ok(event) => event,
        Err(e) => {
            warn!("could not parse webhook: {}", e);
            return "OK";
        }
    };

    info!(
        "received {} event for repo {}",
        label,
        event.repository()
    );
    trace!("event: {:?}", event);

    if sender.0.send(Event::Gitea(event)).is_err() {
        warn!("event channel was closed, dropping event");
    }

    "OK"
}

/// Raw value of the `X-Gitea-Event` header, if there is exactly one.
pub struct GiteaEventHeader<'r>(Option<&'r str>);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for GiteaEventHeader<'r> {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let event_types = request.headers().get(X_GITEA_EVENT).collect::<Vec<_>>();
        if event_types.len() != 1 {
            debug!("request header needs exactly one {}", X_GITEA_EVENT);
            return Outcome::Success(GiteaEventHeader(None));
        }

        Outcome::Success(GiteaEventHeader(Some(event_types[0])))
    }
}

/// Event types Gitea sends in the `X-Gitea-Event` header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventType {
    Create,
    Delete,
    Fork,
    Push,
    Issues,
    IssueComment,
    Repository,
    Release,
    PullRequest,
    PullRequestApproved,
    PullRequestRejected,
    PullRequestComment,
}

impl EventType {
    pub const ALL: [EventType; 12] = [
        Self::Create,
        Self::Delete,
        Self::Fork,
        Self::Push,
        Self::Issues,
        Self::IssueComment,
        Self::Repository,
        Self::Release,
        Self::PullRequest,
        Self::PullRequestApproved,
        Self::PullRequestRejected,
        Self::PullRequestComment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Delete => "delete",
            Self::Fork => "fork",
            Self::Push => "push",
            Self::Issues => "issues",
            Self::IssueComment => "issue_comment",
            Self::Repository => "repository",
            Self::Release => "release",
            Self::PullRequest => "pull_request",
            Self::PullRequestApproved => "pull_request_approved",
            Self::PullRequestRejected => "pull_request_rejected",
            Self::PullRequestComment => "pull_request_comment",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|event_type| event_type.as_str() == s)
            .ok_or_else(|| DecodeError::UnknownEventType(s.to_owned()))
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unexpected event type: `{0}`")]
    UnknownEventType(String),
    #[error("malformed `{event_type}` payload: {source}")]
    Malformed {
        event_type: EventType,
        #[source]
        source: serde_json::Error,
    },
}

/// Parses a webhook payload according to the event type Gitea announced for it.
pub fn decode(label: &str, payload: &[u8]) -> Result<WebhookEvent, DecodeError> {
    let event_type: EventType = label.parse()?;

    let event = match event_type {
        EventType::Create => WebhookEvent::Create(parse(event_type, payload)?),
        EventType::Delete => WebhookEvent::Delete(parse(event_type, payload)?),
        EventType::Fork => WebhookEvent::Fork(parse(event_type, payload)?),
        EventType::Push => WebhookEvent::Push(parse(event_type, payload)?),
        EventType::Issues => WebhookEvent::Issues(parse(event_type, payload)?),
        EventType::IssueComment => WebhookEvent::IssueComment(parse(event_type, payload)?),
        EventType::Repository => WebhookEvent::Repository(parse(event_type, payload)?),
        EventType::Release => WebhookEvent::Release(parse(event_type, payload)?),
        EventType::PullRequest
        | EventType::PullRequestApproved
        | EventType::PullRequestRejected
        | EventType::PullRequestComment => WebhookEvent::PullRequest(parse(event_type, payload)?),
    };

    Ok(event)
}

fn parse<T: DeserializeOwned>(event_type: EventType, payload: &[u8]) -> Result<T, DecodeError> {
    serde_json::from_slice(payload).map_err(|source| DecodeError::Malformed { event_type, source })
}

#[cfg(test)]
pub(crate) mod tests {
    use rocket::{http::Header, http::Status, local::blocking::Client, routes};
    use tokio::sync::mpsc::unbounded_channel;

    use super::*;

    pub(crate) const PUSH_PAYLOAD: &str = r#"{
        "secret": "deadbeef",
        "ref": "refs/heads/main",
        "before": "0000",
        "after": "1111",
        "compare_url": "https://git.example.org/org/app/compare/0000...1111",
        "commits": [
            {
                "id": "1111",
                "message": "fix bug\n\ndetails",
                "url": "https://x/c1",
                "author": { "name": "Ana", "email": "ana@example.org", "username": "ana" }
            }
        ],
        "repository": { "id": 1, "name": "app", "full_name": "org/app", "html_url": "https://git.example.org/org/app" },
        "pusher": { "id": 2, "login": "ana", "full_name": "", "username": "ana" },
        "sender": { "id": 2, "login": "ana", "full_name": "", "username": "ana" }
    }"#;

    const PULL_REQUEST_PAYLOAD: &str = r#"{
        "secret": "deadbeef",
        "action": "reviewed",
        "number": 3,
        "pull_request": {
            "number": 3,
            "title": "Add feature",
            "html_url": "https://git.example.org/org/app/pulls/3",
            "head": { "label": "feature", "ref": "refs/pull/3/head", "repo": { "full_name": "ana/app" } },
            "base": { "label": "main", "ref": "main", "repo": { "full_name": "org/app" } },
            "assignee": null
        },
        "repository": { "full_name": "org/app" },
        "sender": { "login": "bob", "full_name": "Bob" }
    }"#;

    #[test]
    fn parses_every_known_event_type() {
        for event_type in EventType::ALL {
            assert_eq!(event_type.as_str().parse::<EventType>().unwrap(), event_type);
        }
    }

    #[test]
    fn rejects_unknown_event_type() {
        match decode("wiki", PUSH_PAYLOAD.as_bytes()) {
            Err(DecodeError::UnknownEventType(label)) => assert_eq!(label, "wiki"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            decode("", PUSH_PAYLOAD.as_bytes()),
            Err(DecodeError::UnknownEventType(_))
        ));
    }

    #[test]
    fn decodes_push() {
        let event = decode("push", PUSH_PAYLOAD.as_bytes()).unwrap();

        assert_eq!(event.repository(), "org/app");
        assert_eq!(event.secret(), "deadbeef");
        match event {
            WebhookEvent::Push(push) => {
                assert_eq!(push.branch(), "main");
                assert_eq!(push.commits.len(), 1);
                assert_eq!(push.commits[0].title(), "fix bug");
                assert_eq!(push.pusher.display_name(), "ana");
            }
            other => panic!("decoded as wrong variant: {:?}", other),
        }
    }

    #[test]
    fn pull_request_labels_share_a_schema() {
        for label in [
            "pull_request",
            "pull_request_approved",
            "pull_request_rejected",
            "pull_request_comment",
        ] {
            let event = decode(label, PULL_REQUEST_PAYLOAD.as_bytes()).unwrap();
            match event {
                WebhookEvent::PullRequest(pr) => {
                    assert_eq!(pr.pull_request.source(), "ana/app/feature")
                }
                other => panic!("{} decoded as wrong variant: {:?}", label, other),
            }
        }
    }

    #[test]
    fn malformed_payloads_are_errors() {
        for event_type in EventType::ALL {
            for payload in ["", "{", "[]", r#"{"repository": 42}"#] {
                match decode(event_type.as_str(), payload.as_bytes()) {
                    Err(DecodeError::Malformed { event_type: ty, .. }) => {
                        assert_eq!(ty, event_type)
                    }
                    other => panic!("{:?} on {:?}: {:?}", payload, event_type, other),
                }
            }
        }
    }

    #[test]
    fn payload_without_secret_has_empty_token() {
        let payload = r#"{
            "ref": "v1.0",
            "ref_type": "tag",
            "repository": { "full_name": "org/app" }
        }"#;

        let event = decode("create", payload.as_bytes()).unwrap();
        assert_eq!(event.secret(), "");
    }

    #[test]
    fn null_commit_list_is_an_empty_push() {
        let payload = r#"{
            "ref": "refs/heads/main",
            "commits": null,
            "repository": { "full_name": "org/app" },
            "pusher": { "login": "ana" }
        }"#;

        match decode("push", payload.as_bytes()).unwrap() {
            WebhookEvent::Push(push) => assert!(push.commits.is_empty()),
            other => panic!("decoded as wrong variant: {:?}", other),
        }
    }

    fn client() -> (Client, tokio::sync::mpsc::UnboundedReceiver<Event>) {
        client_with(rocket::build())
    }

    fn client_with(
        rocket: rocket::Rocket<rocket::Build>,
    ) -> (Client, tokio::sync::mpsc::UnboundedReceiver<Event>) {
        let (sender, receiver) = unbounded_channel();
        let rocket = rocket
            .mount("/", routes![gitea_webhook, health_check])
            .manage(EventSender(sender));

        (Client::tracked(rocket).expect("valid rocket"), receiver)
    }

    #[test]
    fn health_check_answers() {
        let (client, _) = client();
        let response = client.get("/giteabot").dispatch();

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().unwrap(), "beep boop! :)");
    }

    #[test]
    fn webhook_forwards_decoded_event() {
        let (client, mut receiver) = client();
        let response = client
            .post(WEBHOOK_PATH)
            .header(Header::new(X_GITEA_EVENT, "push"))
            .body(PUSH_PAYLOAD)
            .dispatch();

        assert_eq!(response.status(), Status::Ok);
        match receiver.try_recv() {
            Ok(Event::Gitea(WebhookEvent::Push(push))) => {
                assert_eq!(push.repository.full_name, "org/app")
            }
            other => panic!("unexpected channel content: {:?}", other),
        }
    }

    #[test]
    fn webhook_always_answers_ok() {
        let (client, mut receiver) = client();

        let unknown = client
            .post(WEBHOOK_PATH)
            .header(Header::new(X_GITEA_EVENT, "wiki"))
            .body(PUSH_PAYLOAD)
            .dispatch();
        assert_eq!(unknown.status(), Status::Ok);

        let garbage = client
            .post(WEBHOOK_PATH)
            .header(Header::new(X_GITEA_EVENT, "push"))
            .body("definitely not json")
            .dispatch();
        assert_eq!(garbage.status(), Status::Ok);

        let missing_header = client.post(WEBHOOK_PATH).body(PUSH_PAYLOAD).dispatch();
        assert_eq!(missing_header.status(), Status::Ok);

        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn webhook_drops_oversized_payload() {
        let config = rocket::Config {
            limits: Limits::default().limit("json", ByteUnit::Byte(64)),
            ..rocket::Config::debug_default()
        };
        let (client, mut receiver) = client_with(rocket::custom(config));

        let response = client
            .post(WEBHOOK_PATH)
            .header(Header::new(X_GITEA_EVENT, "push"))
            .body(PUSH_PAYLOAD)
            .dispatch();

        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().unwrap(), "OK");
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn webhook_survives_closed_channel() {
        let (client, receiver) = client();
        drop(receiver);

        let response = client
            .post(WEBHOOK_PATH)
            .header(Header::new(X_GITEA_EVENT, "push"))
            .body(PUSH_PAYLOAD)
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
    }
}
