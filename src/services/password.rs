//! Argon2id hashing for passwords and stored refresh tokens.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString, rand_core::OsRng,
    },
};
use std::sync::Arc;
use tokio::task;

use crate::config::SecurityConfig;

/// Salted one-way hash + verify.
///
/// Both operations are CPU-bound, so they run on the blocking pool instead of
/// stalling the async runtime.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
    /// Hash of a throwaway secret, verified against when there is no real hash
    /// so that "unknown user" costs the same as "wrong password".
    dummy_hash: Arc<str>,
}

impl PasswordHasher {
    pub fn new(config: &SecurityConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None,
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        let dummy_hash = hash_with(&params, "coffyman-dummy-secret")?;

        Ok(Self {
            params,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub async fn hash(&self, secret: &str) -> Result<String> {
        let params = self.params.clone();
        let secret = secret.to_string();

        task::spawn_blocking(move || hash_with(&params, &secret))
            .await
            .context("Hashing task panicked")?
    }

    /// Returns `Ok(false)` on mismatch; `Err` only if the stored hash is malformed.
    pub async fn verify(&self, secret: &str, hash: &str) -> Result<bool> {
        let secret = secret.to_string();
        let hash = hash.to_string();

        task::spawn_blocking(move || {
            let parsed_hash = PasswordHash::new(&hash)
                .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

            // Parameters are read back from the PHC string.
            Ok::<bool, anyhow::Error>(
                Argon2::default()
                    .verify_password(secret.as_bytes(), &parsed_hash)
                    .is_ok(),
            )
        })
        .await
        .context("Verification task panicked")?
    }

    /// Burns one verification so a miss is indistinguishable by timing.
    pub async fn verify_dummy(&self, secret: &str) {
        let hash = self.dummy_hash.clone();
        let _ = self.verify(secret, &hash).await;
    }
}

fn hash_with(params: &Params, secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone());

    let hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash secret: {e}"))?;

    Ok(hash.to_string())
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> PasswordHasher {
    let config = SecurityConfig {
        argon2_memory_cost_kib: 64,
        argon2_time_cost: 1,
        ..SecurityConfig::default()
    };
    PasswordHasher::new(&config).expect("valid test params")
}
