//! ============================================================================
//! Credential Store — Embedded Database (redb)
//! ============================================================================
//! Persistent local storage for the canonical API credential.
//! One string value under a single well-known key; absence of the key means
//! "not authenticated".
//! Default path: ~/.stylegen/stylegen.redb (override via STYLEGEN_DB_PATH)
//! ============================================================================

use anyhow::{anyhow, Result};
use redb::{Database, TableDefinition};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

// Table definition
const CREDENTIALS: TableDefinition<&str, &str> = TableDefinition::new("credentials");

/// Well-known storage key for the canonical credential
pub const CREDENTIAL_KEY: &str = "credential:api_key";

/// Storage abstraction over the persisted credential, so the session and the
/// generation client can be exercised against an in-memory substitute.
pub trait CredentialStore: Send + Sync {
    /// Read the stored canonical credential, if any
    fn get(&self) -> Result<Option<String>>;

    /// Overwrite the stored credential (last write wins)
    fn set(&self, canonical: &str) -> Result<()>;

    /// Erase the stored credential; erasing an empty store is a no-op
    fn clear(&self) -> Result<()>;
}

/// Credential store backed by an embedded redb database
pub struct RedbCredentialStore {
    db: Database,
    path: PathBuf,
}

impl RedbCredentialStore {
    /// Open (or create) the store at the given path.
    /// If `path` is None, uses STYLEGEN_DB_PATH env var or ~/.stylegen/stylegen.redb
    pub fn open(path: Option<&str>) -> Result<Self> {
        let db_path = if let Some(p) = path {
            PathBuf::from(p)
        } else if let Ok(env_path) = std::env::var("STYLEGEN_DB_PATH") {
            PathBuf::from(env_path)
        } else {
            let home =
                dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
            let stylegen_dir = home.join(".stylegen");
            std::fs::create_dir_all(&stylegen_dir)
                .map_err(|e| anyhow!("Failed to create .stylegen directory: {}", e))?;
            stylegen_dir.join("stylegen.redb")
        };

        info!("Opening credential store at: {}", db_path.display());

        let db = Database::create(&db_path)
            .map_err(|e| anyhow!("Failed to open credential store: {}", e))?;

        // Ensure the table exists by doing a write transaction
        let write_txn = db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let _ = write_txn
                .open_table(CREDENTIALS)
                .map_err(|e| anyhow!("Failed to create credentials table: {}", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| anyhow!("Failed to commit init: {}", e))?;

        Ok(Self { db, path: db_path })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for RedbCredentialStore {
    fn get(&self) -> Result<Option<String>> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn
            .open_table(CREDENTIALS)
            .map_err(|e| anyhow!("Failed to open credentials table: {}", e))?;

        match table
            .get(CREDENTIAL_KEY)
            .map_err(|e| anyhow!("Failed to read credential: {}", e))?
        {
            Some(value) => Ok(Some(value.value().to_string())),
            None => Ok(None),
        }
    }

    fn set(&self, canonical: &str) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn
                .open_table(CREDENTIALS)
                .map_err(|e| anyhow!("Failed to open credentials table: {}", e))?;
            table
                .insert(CREDENTIAL_KEY, canonical)
                .map_err(|e| anyhow!("Failed to insert credential: {}", e))?;
        }
        write_txn
            .commit()
            .map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Stored credential");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        let removed;
        {
            let mut table = write_txn
                .open_table(CREDENTIALS)
                .map_err(|e| anyhow!("Failed to open credentials table: {}", e))?;
            removed = table
                .remove(CREDENTIAL_KEY)
                .map_err(|e| anyhow!("Failed to remove credential: {}", e))?
                .is_some();
        }
        write_txn
            .commit()
            .map_err(|e| anyhow!("Failed to commit delete: {}", e))?;

        if removed {
            debug!("Erased stored credential");
        }
        Ok(())
    }
}

/// In-memory credential store for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryCredentialStore {
    value: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self
            .value
            .lock()
            .map_err(|_| anyhow!("credential store lock poisoned"))?
            .clone())
    }

    fn set(&self, canonical: &str) -> Result<()> {
        *self
            .value
            .lock()
            .map_err(|_| anyhow!("credential store lock poisoned"))? = Some(canonical.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self
            .value
            .lock()
            .map_err(|_| anyhow!("credential store lock poisoned"))? = None;
        Ok(())
    }
}
