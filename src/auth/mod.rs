//! Credentials and bearer tokens.
//!
//! Passwords are stored as hex HMAC-SHA256 digests keyed by a per-user
//! random salt. Login issues an opaque bearer token (UUID hex); only the
//! token's SHA-256 is stored, so a leaked database cannot replay tokens.

use hmac::{Hmac, Mac};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::tasks::error::{ErrorBag, TaskError};
use crate::tasks::storage::TaskStorage;

type HmacSha256 = Hmac<Sha256>;

/// A freshly derived credential pair, both hex-encoded for TEXT columns.
pub struct PasswordDigest {
    pub salt: String,
    pub hash: String,
}

pub fn hash_password(password: &str) -> PasswordDigest {
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);
    PasswordDigest {
        salt: hex::encode(salt),
        hash: digest(&salt, password),
    }
}

pub fn verify_password(salt_hex: &str, expected_hash: &str, password: &str) -> bool {
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    digest(&salt, password) == expected_hash
}

fn digest(salt: &[u8], password: &str) -> String {
    // HMAC accepts any key length; this cannot fail for our salts.
    let mut mac = HmacSha256::new_from_slice(salt).expect("HMAC key of any length");
    mac.update(password.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Generate a new opaque bearer token (UUID v4, hex without dashes).
pub fn generate_token() -> String {
    Uuid::new_v4().to_string().replace('-', "")
}

/// The at-rest form of a bearer token.
pub fn token_hash(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Verify credentials and issue a bearer token.
///
/// Missing fields are reported per-field; a wrong email or password is a
/// single `email`-keyed failure so the response never reveals which half
/// was wrong.
pub async fn login(
    storage: &TaskStorage,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<String, TaskError> {
    let mut errors = ErrorBag::new();
    if email.map_or(true, str::is_empty) {
        errors.add("email", "The email field is required.");
    }
    if password.map_or(true, str::is_empty) {
        errors.add("password", "The password field is required.");
    }
    errors.into_result()?;

    let email = email.unwrap_or_default();
    let password = password.unwrap_or_default();

    let user = storage.get_user_by_email(email).await?;
    let valid = user
        .as_ref()
        .map(|u| verify_password(&u.password_salt, &u.password_hash, password))
        .unwrap_or(false);
    let Some(user) = user.filter(|_| valid) else {
        return Err(TaskError::validation(
            "email",
            "The provided credentials are incorrect.",
        ));
    };

    let token = generate_token();
    storage.insert_api_token(&user.id, &token_hash(&token)).await?;
    tracing::info!(user_id = %user.id, "login token issued");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let creds = hash_password("password");
        assert!(verify_password(&creds.salt, &creds.hash, "password"));
        assert!(!verify_password(&creds.salt, &creds.hash, "wrong"));
    }

    #[test]
    fn salts_are_unique_per_call() {
        let a = hash_password("password");
        let b = hash_password("password");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn bad_salt_hex_never_verifies() {
        assert!(!verify_password("not-hex", "whatever", "password"));
    }

    #[test]
    fn token_hash_is_stable_hex() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert_eq!(token_hash(&token), token_hash(&token));
        assert_eq!(token_hash(&token).len(), 64);
    }
}
