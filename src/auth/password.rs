use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Length is counted in characters, not bytes.
pub fn check_password_policy(plain: &str) -> Result<(), &'static str> {
    let len = plain.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err("Password too short");
    }
    if len > MAX_PASSWORD_LEN {
        return Err("Password too long");
    }
    if plain.trim().is_empty() {
        return Err("Password must not be blank");
    }
    Ok(())
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!("hash password: {e}")
        })
}

/// `Ok(false)` for a wrong password; `Err` only when the stored hash is unreadable.
pub fn verify_password(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!(error = %e, "stored password hash is malformed");
        anyhow::anyhow!("parse password hash: {e}")
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_bounds() {
        assert_eq!(check_password_policy("short"), Err("Password too short"));
        assert!(check_password_policy("juniper!").is_ok());
        assert_eq!(check_password_policy("        "), Err("Password must not be blank"));
        assert!(check_password_policy(&"k".repeat(MAX_PASSWORD_LEN)).is_ok());
        assert_eq!(
            check_password_policy(&"k".repeat(MAX_PASSWORD_LEN + 1)),
            Err("Password too long")
        );
        // eight characters, sixteen bytes
        assert!(check_password_policy("盆栽盆栽盆栽盆栽").is_ok());
    }

    #[test]
    fn hashes_are_salted_and_verify() {
        let password = "Bons4i-Juniper!";
        let a = hash_password(password).expect("hashing should succeed");
        let b = hash_password(password).expect("hashing should succeed");
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2"));
        assert!(verify_password(password, &a).unwrap());
        assert!(!verify_password("ficus-retusa-2025", &a).unwrap());
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(err.to_string().starts_with("parse password hash"));
    }
}
