use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a fresh per-user salt
pub fn new_salt() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Hash a password with its per-user salt
pub fn hash_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn verify_password(password: &str, salt: &str, expected_hash: &str) -> bool {
    hash_password(password, salt) == expected_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic_per_salt() {
        let salt = "abc123";
        assert_eq!(hash_password("secret", salt), hash_password("secret", salt));
        assert_ne!(hash_password("secret", salt), hash_password("secret", "other"));
    }

    #[test]
    fn verify_roundtrip() {
        let salt = new_salt();
        let hash = hash_password("hunter2", &salt);
        assert!(verify_password("hunter2", &salt, &hash));
        assert!(!verify_password("hunter3", &salt, &hash));
    }
}
