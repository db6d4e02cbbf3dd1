//! Per-subscription webhook tokens.
//!
//! Every (repository, room) subscription gets its own token, derived from the instance's shared
//! secret. The token is what the room's admins paste in the "Secret" field of the Gitea webhook,
//! and Gitea sends it back in the `secret` field of each payload.

use hmac::{Hmac, Mac, NewMac};
use sha2::Sha256;
use tracing::trace;

type HmacSha256 = Hmac<Sha256>;

fn token_mac(repo: &str, destination: &str, secret: &str) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("this should never fail");

    mac.update(repo.to_lowercase().as_bytes());
    // separator so that ("ab", "c") and ("a", "bc") don't collide
    mac.update(&[0]);
    mac.update(destination.as_bytes());

    mac
}

/// Computes the token a subscriber of `repo` in `destination` was issued.
pub fn expected_token(repo: &str, destination: &str, secret: &str) -> String {
    hex::encode(token_mac(repo, destination, secret).finalize().into_bytes())
}

/// Checks in constant time that `presented` is the token issued for this subscription.
pub fn verify_token(repo: &str, destination: &str, secret: &str, presented: &str) -> bool {
    let mac = token_mac(repo, destination, secret);

    match hex::decode(presented) {
        Ok(bytes) => mac.verify(&bytes).is_ok(),
        Err(_) => {
            trace!("couldn't decode hex-encoded token {}", presented);
            false
        }
    }
}
