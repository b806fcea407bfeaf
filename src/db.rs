// This project was developed with assistance from GitHub Copilot
// SQLite-backed key store

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use rsa::RsaPrivateKey;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey, LineEnding};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::{JwksError, Result};
use crate::types::{SigningKey, Validity};

/// Default database file name.
pub const DEFAULT_DB_FILE: &str = "totally_not_my_privateKeys.db";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the persisted key table.
///
/// Holds only the database path; every operation opens its own connection so
/// that no key material outlives a single call and writers from other
/// processes are always observed.
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

/// Raw row before the PEM is parsed.
struct StoredRow {
    kid: i64,
    key: Vec<u8>,
    exp: i64,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StoredRow {
            kid: row.get(0)?,
            key: row.get(1)?,
            exp: row.get(2)?,
        })
    }

    fn into_signing_key(self) -> Result<SigningKey> {
        let corrupt = |reason: String| JwksError::CorruptKey {
            kid: self.kid,
            reason,
        };

        let pem = std::str::from_utf8(&self.key).map_err(|e| corrupt(e.to_string()))?;
        let private_key = RsaPrivateKey::from_pkcs1_pem(pem).map_err(|e| corrupt(e.to_string()))?;
        let expires_at = Utc
            .timestamp_opt(self.exp, 0)
            .single()
            .ok_or_else(|| corrupt(format!("expiry {} out of range", self.exp)))?;

        Ok(SigningKey {
            kid: self.kid,
            private_key,
            expires_at,
        })
    }
}

impl KeyStore {
    /// Open the store at `path`, creating the database file and schema if absent.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let store = KeyStore {
            path: path.as_ref().to_path_buf(),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Create the `keys` table if it does not exist. Never touches existing rows.
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS keys(
                kid INTEGER PRIMARY KEY AUTOINCREMENT,
                key BLOB NOT NULL,
                exp INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Persist a new key and return its freshly assigned identifier.
    pub fn insert(&self, private_key: &RsaPrivateKey, expires_at: DateTime<Utc>) -> Result<i64> {
        let pem = private_key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| JwksError::KeyGeneration(e.to_string()))?;

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO keys (key, exp) VALUES (?, ?)",
            params![pem.as_bytes(), expires_at.timestamp()],
        )?;
        let kid = conn.last_insert_rowid();

        tracing::debug!(kid, expires_at = %expires_at, "stored signing key");
        Ok(kid)
    }

    pub fn find_valid(&self) -> Result<SigningKey> {
        self.find_valid_at(Utc::now())
    }

    pub fn find_expired(&self) -> Result<SigningKey> {
        self.find_expired_at(Utc::now())
    }

    pub fn find_valid_at(&self, now: DateTime<Utc>) -> Result<SigningKey> {
        self.find_one(Validity::Valid, now)
    }

    pub fn find_expired_at(&self, now: DateTime<Utc>) -> Result<SigningKey> {
        self.find_one(Validity::Expired, now)
    }

    /// Among several candidates the most recently inserted key wins.
    fn find_one(&self, validity: Validity, now: DateTime<Utc>) -> Result<SigningKey> {
        let sql = match validity {
            Validity::Valid => "SELECT kid, key, exp FROM keys WHERE exp > ? ORDER BY kid DESC LIMIT 1",
            Validity::Expired => {
                "SELECT kid, key, exp FROM keys WHERE exp <= ? ORDER BY kid DESC LIMIT 1"
            }
        };

        let conn = self.connect()?;
        let row = conn
            .query_row(sql, params![now.timestamp()], StoredRow::from_row)
            .optional()?;

        let key = row
            .ok_or(JwksError::NotFound(validity))?
            .into_signing_key()?;
        debug_assert!(match validity {
            Validity::Valid => key.is_valid_at(now),
            Validity::Expired => key.is_expired_at(now),
        });
        Ok(key)
    }

    pub fn find_all_valid(&self) -> Result<Vec<SigningKey>> {
        self.find_all_valid_at(Utc::now())
    }

    /// Every key with `exp > now`, oldest first.
    pub fn find_all_valid_at(&self, now: DateTime<Utc>) -> Result<Vec<SigningKey>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT kid, key, exp FROM keys WHERE exp > ? ORDER BY kid")?;
        let rows = stmt.query_map(params![now.timestamp()], StoredRow::from_row)?;

        let mut out = Vec::new();
        for row in rows {
            let key = row?.into_signing_key()?;
            debug_assert!(key.is_valid_at(now));
            out.push(key);
        }
        Ok(out)
    }

    /// Number of keys of the given class at `now`.
    pub fn count_at(&self, validity: Validity, now: DateTime<Utc>) -> Result<i64> {
        let sql = match validity {
            Validity::Valid => "SELECT COUNT(*) FROM keys WHERE exp > ?",
            Validity::Expired => "SELECT COUNT(*) FROM keys WHERE exp <= ?",
        };
        let conn = self.connect()?;
        let count = conn.query_row(sql, params![now.timestamp()], |row| row.get(0))?;
        Ok(count)
    }

    /// Total number of stored keys.
    pub fn count(&self) -> Result<i64> {
        let conn = self.connect()?;
        let count = conn.query_row("SELECT COUNT(*) FROM keys", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key_management::generate_rsa_key;
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, KeyStore) {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::open(dir.path().join("keys.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_open_creates_file_and_table() {
        let (_dir, store) = temp_store();
        assert!(store.path().exists(), "DB file should exist");

        let conn = Connection::open(store.path()).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='keys'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1, "keys table should exist");
    }

    #[test]
    fn test_schema_creation_is_not_destructive() {
        let (_dir, store) = temp_store();
        let key = generate_rsa_key(2048).unwrap();
        store
            .insert(&key, Utc::now() + ChronoDuration::hours(1))
            .unwrap();

        let reopened = KeyStore::open(store.path()).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }

    #[test]
    fn test_insert_assigns_unique_increasing_ids() {
        let (_dir, store) = temp_store();
        let key = generate_rsa_key(2048).unwrap();
        let exp = Utc::now() + ChronoDuration::hours(1);

        let first = store.insert(&key, exp).unwrap();
        let second = store.insert(&key, exp).unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_find_valid_and_expired() {
        let (_dir, store) = temp_store();
        let key = generate_rsa_key(2048).unwrap();
        let now = Utc::now();
        let valid_kid = store.insert(&key, now + ChronoDuration::hours(1)).unwrap();
        let expired_kid = store.insert(&key, now - ChronoDuration::hours(1)).unwrap();

        let valid = store.find_valid_at(now).unwrap();
        assert_eq!(valid.kid, valid_kid);
        assert!(valid.expires_at > now);

        let expired = store.find_expired_at(now).unwrap();
        assert_eq!(expired.kid, expired_kid);
        assert!(expired.expires_at <= now);
    }

    #[test]
    fn test_expiry_boundary_counts_as_expired() {
        let (_dir, store) = temp_store();
        let key = generate_rsa_key(2048).unwrap();
        let now = Utc.timestamp_opt(Utc::now().timestamp(), 0).unwrap();
        let kid = store.insert(&key, now).unwrap();

        assert!(matches!(
            store.find_valid_at(now),
            Err(JwksError::NotFound(Validity::Valid))
        ));
        assert_eq!(store.find_expired_at(now).unwrap().kid, kid);
    }

    #[test]
    fn test_most_recent_key_wins_ties() {
        let (_dir, store) = temp_store();
        let key = generate_rsa_key(2048).unwrap();
        let now = Utc::now();
        store.insert(&key, now + ChronoDuration::hours(1)).unwrap();
        let newest = store.insert(&key, now + ChronoDuration::hours(2)).unwrap();

        assert_eq!(store.find_valid_at(now).unwrap().kid, newest);
        assert_eq!(store.find_all_valid_at(now).unwrap().len(), 2);
    }

    #[test]
    fn test_empty_store_reports_not_found() {
        let (_dir, store) = temp_store();
        assert!(matches!(
            store.find_valid(),
            Err(JwksError::NotFound(Validity::Valid))
        ));
        assert!(matches!(
            store.find_expired(),
            Err(JwksError::NotFound(Validity::Expired))
        ));
        assert!(store.find_all_valid().unwrap().is_empty());
    }

    #[test]
    fn test_find_all_valid_excludes_expired() {
        let (_dir, store) = temp_store();
        let key = generate_rsa_key(2048).unwrap();
        let now = Utc::now();
        store.insert(&key, now - ChronoDuration::hours(1)).unwrap();
        let valid_kid = store.insert(&key, now + ChronoDuration::hours(1)).unwrap();

        let rows = store.find_all_valid_at(now).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kid, valid_kid);
        for key in rows {
            assert!(key.expires_at > now, "valid keys must have exp in the future");
        }
    }

    #[test]
    fn test_corrupt_material_is_fatal() {
        let (_dir, store) = temp_store();
        let conn = Connection::open(store.path()).unwrap();
        conn.execute(
            "INSERT INTO keys (key, exp) VALUES (?, ?)",
            params![b"not a pem".as_slice(), Utc::now().timestamp() + 3600],
        )
        .unwrap();

        assert!(matches!(
            store.find_valid(),
            Err(JwksError::CorruptKey { .. })
        ));
        assert!(matches!(
            store.find_all_valid(),
            Err(JwksError::CorruptKey { .. })
        ));
    }

    #[test]
    fn test_missing_database_directory_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let result = KeyStore::open(dir.path().join("missing").join("keys.db"));
        assert!(matches!(result, Err(JwksError::Storage(_))));
    }
}
