use std::time::Duration;

use matrix_sdk::{
    room::Room,
    ruma::{
        events::{room::member::MemberEventContent, StrippedStateEvent},
        RoomId,
    },
    Client,
};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Accepts invitations to rooms in `authorized_rooms`, or to any room if it is empty.
pub async fn autojoin_authorized_rooms(
    room_member: StrippedStateEvent<MemberEventContent>,
    client: Client,
    room: Room,
    authorized_rooms: Vec<RoomId>,
) {
    match client.user_id().await {
        Some(user_id) if room_member.state_key == user_id => {}
        _ => return,
    }

    if let Room::Invited(room) = room {
        let room_id = room.room_id();
        let room_name = match room.display_name().await {
            Ok(name) => name,
            Err(e) => {
                warn!("couldn't get name of room `{}`: {}", room_id, e);
                String::new()
            }
        };
        info!(
            "Received invitation for room `{}`: `{}`",
            room_id, room_name
        );

        if !is_authorized(room_id, &authorized_rooms) {
            warn!(
                "Bot isn't authorized to join room `{}`, declining invitation",
                room_id
            );
            if let Err(e) = room.reject_invitation().await {
                error!("Couldn't decline invitation to {}: {:?}", room_id, e);
            }
            return;
        }

        debug!("Autojoining room {}", room.room_id());
        let mut delay = 2;

        while let Err(err) = room.accept_invitation().await {
            // retry autojoin due to synapse sending invites, before the
            // invited user can join for more information see
            // https://github.com/matrix-org/synapse/issues/4345
            warn!(
                "Failed to join room {} ({:?}), retrying in {}s",
                room.room_id(),
                err,
                delay
            );

            sleep(Duration::from_secs(delay)).await;
            delay *= 2;

            if delay > 3600 {
                error!("Can't join room {} ({:?})", room.room_id(), err);
                return;
            }
        }
        info!("Successfully joined room {}", room.room_id());
    }
}

fn is_authorized(room_id: &RoomId, authorized_rooms: &[RoomId]) -> bool {
    authorized_rooms.is_empty() || authorized_rooms.iter().any(|room| room == room_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room(id: &str) -> RoomId {
        RoomId::try_from(id).unwrap()
    }

    #[test]
    fn empty_allow_list_accepts_every_room() {
        assert!(is_authorized(&room("!aaaa:prologin.org"), &[]));
    }

    #[test]
    fn allow_list_is_enforced() {
        let authorized = vec![room("!aaaa:prologin.org")];

        assert!(is_authorized(&room("!aaaa:prologin.org"), &authorized));
        assert!(!is_authorized(&room("!bbbb:prologin.org"), &authorized));
    }
}
