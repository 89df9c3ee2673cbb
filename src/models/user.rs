//! Users and their credential surface.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use super::UserId;

/// Iteration count baked into freshly minted password hashes.
///
/// Stored hashes carry their own count, so this can be raised without
/// invalidating old hashes.
pub const PASSWORD_HASH_ITERATIONS: u32 = 29_000;

const HASH_SCHEME: &str = "s2id";

/// A registered user.
///
/// Users are created on registration and never destroyed; only the password
/// hash, email and bio mutate afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Store-assigned id.
    pub id: UserId,
    /// Chosen display name (up to 32 characters).
    pub username: String,
    /// Unique address (up to 40 characters).
    pub email: String,
    /// Salted iterated hash of the password, in `s2id$iter$salt$digest` form.
    pub password_hash: String,
    /// Administrators may create movements and post announcements.
    pub is_admin: bool,
    /// Short free-form biography.
    pub bio: String,
}

impl User {
    /// MD5 hex digest of the lowercased email, the avatar lookup key.
    #[must_use]
    pub fn avatar(&self) -> String {
        format!("{:x}", md5::compute(self.email.to_lowercase().as_bytes()))
    }

    /// Checks a candidate password against the stored hash.
    #[must_use]
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }

    /// JSON projection of the user. `email` is only present when
    /// explicitly requested.
    #[must_use]
    pub fn to_json(&self, include_email: bool) -> Value {
        let mut value = json!({
            "id": self.id,
            "username": self.username,
            "bio": self.bio,
            "avatar": self.avatar(),
            "is_admin": self.is_admin,
        });
        if include_email {
            value["email"] = json!(self.email);
        }
        value
    }
}

/// Hashes a password with the given salt.
///
/// The digest chains SHA-256 over the password [`PASSWORD_HASH_ITERATIONS`]
/// times, starting from `salt || password`. The scheme tag and parameters
/// are stored alongside so older hashes verify forever.
#[must_use]
pub fn hash_password(password: &str, salt: &[u8]) -> String {
    let digest = iterated_digest(password, salt, PASSWORD_HASH_ITERATIONS);
    format!(
        "{HASH_SCHEME}${PASSWORD_HASH_ITERATIONS}${}${}",
        hex::encode(salt),
        hex::encode(digest)
    )
}

/// Verifies a password against a stored hash string.
///
/// Unparseable hashes verify as false rather than erroring; a corrupted
/// column must not become a login bypass.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (scheme, iterations, salt, digest) =
        match (parts.next(), parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(scheme), Some(iter), Some(salt), Some(digest), None) => {
                (scheme, iter, salt, digest)
            }
            _ => return false,
        };

    if scheme != HASH_SCHEME {
        return false;
    }
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let Ok(salt) = hex::decode(salt) else {
        return false;
    };
    let Ok(expected) = hex::decode(digest) else {
        return false;
    };

    let actual = iterated_digest(password, &salt, iterations);
    // Hashes are fixed length, so a simple comparison does not leak length.
    actual.as_slice() == expected.as_slice()
}

fn iterated_digest(password: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let mut digest: [u8; 32] = hasher.finalize().into();

    for _ in 1..iterations {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        hasher.update(password.as_bytes());
        digest = hasher.finalize().into();
    }

    digest
}
