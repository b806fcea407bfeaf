// This project was developed with assistance from GitHub Copilot
// Key generation, lifecycle helpers and startup seeding

use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use rand::rngs::OsRng;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::db::KeyStore;
use crate::error::{JwksError, Result};
use crate::types::{SigningKey, Validity};

/// How long seeded keys stay valid, and how long ago the expired one lapsed.
pub const SEED_KEY_OFFSET_SECS: i64 = 3600;

impl SigningKey {
    /// Key id as it appears in token headers and the JWKS document
    pub fn kid_string(&self) -> String {
        self.kid.to_string()
    }

    pub fn public_key(&self) -> RsaPublicKey {
        RsaPublicKey::from(&self.private_key)
    }

    /// Check if the key had expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check if the key was still valid at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_expired_at(now)
    }
}

/// Generate a new RSA private key
pub fn generate_rsa_key(bits: usize) -> Result<RsaPrivateKey> {
    let mut rng = OsRng;
    RsaPrivateKey::new(&mut rng, bits).map_err(|e| JwksError::KeyGeneration(e.to_string()))
}

/// Startup seeding behaviour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SeedPolicy {
    /// Insert a fresh valid and expired key on every start. Rows accumulate
    /// across restarts.
    #[default]
    Always,
    /// Only insert a key for a validity class that currently has none.
    IfMissing,
    /// Leave the store untouched.
    Never,
}

/// Keys inserted by [`provision`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub valid_kid: Option<i64>,
    pub expired_kid: Option<i64>,
}

/// Seed the store so that both the valid and the expired lookup can succeed.
pub fn provision(store: &KeyStore, policy: SeedPolicy, bits: usize) -> Result<ProvisionReport> {
    provision_at(store, policy, bits, Utc::now())
}

pub fn provision_at(
    store: &KeyStore,
    policy: SeedPolicy,
    bits: usize,
    now: DateTime<Utc>,
) -> Result<ProvisionReport> {
    let (need_valid, need_expired) = match policy {
        SeedPolicy::Always => (true, true),
        SeedPolicy::Never => (false, false),
        SeedPolicy::IfMissing => (
            store.count_at(Validity::Valid, now)? == 0,
            store.count_at(Validity::Expired, now)? == 0,
        ),
    };

    let offset = Duration::seconds(SEED_KEY_OFFSET_SECS);
    let mut report = ProvisionReport::default();

    if need_expired {
        let key = generate_rsa_key(bits)?;
        report.expired_kid = Some(store.insert(&key, now - offset)?);
    }

    if need_valid {
        let key = generate_rsa_key(bits)?;
        report.valid_kid = Some(store.insert(&key, now + offset)?);
    }

    tracing::info!(
        ?policy,
        valid_kid = ?report.valid_kid,
        expired_kid = ?report.expired_kid,
        total_keys = store.count()?,
        "key store provisioned"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, KeyStore) {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::open(dir.path().join("keys.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_validity_boundary() {
        let now = Utc::now();
        let key = SigningKey {
            kid: 1,
            private_key: generate_rsa_key(2048).unwrap(),
            expires_at: now,
        };
        assert!(key.is_expired_at(now));
        assert!(!key.is_valid_at(now));
        assert!(key.is_valid_at(now - Duration::seconds(1)));
        assert_eq!(key.kid_string(), "1");
    }

    #[test]
    fn test_always_seeds_both_classes() {
        let (_dir, store) = temp_store();
        let now = Utc::now();
        let report = provision_at(&store, SeedPolicy::Always, 2048, now).unwrap();

        assert_eq!(store.find_valid_at(now).unwrap().kid, report.valid_kid.unwrap());
        assert_eq!(
            store.find_expired_at(now).unwrap().kid,
            report.expired_kid.unwrap()
        );
    }

    #[test]
    fn test_always_accumulates_across_restarts() {
        let (_dir, store) = temp_store();
        provision(&store, SeedPolicy::Always, 2048).unwrap();
        provision(&store, SeedPolicy::Always, 2048).unwrap();
        assert_eq!(store.count().unwrap(), 4);
    }

    #[test]
    fn test_if_missing_does_not_duplicate() {
        let (_dir, store) = temp_store();
        let first = provision(&store, SeedPolicy::IfMissing, 2048).unwrap();
        assert!(first.valid_kid.is_some() && first.expired_kid.is_some());

        let second = provision(&store, SeedPolicy::IfMissing, 2048).unwrap();
        assert_eq!(second, ProvisionReport::default());
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_never_leaves_store_empty() {
        let (_dir, store) = temp_store();
        let report = provision(&store, SeedPolicy::Never, 2048).unwrap();
        assert_eq!(report, ProvisionReport::default());
        assert_eq!(store.count().unwrap(), 0);
    }
}
