//! Key storage implementations.
//!
//! A [`KeyStore`] holds the key pairs the client signs with. An account may
//! hold several keys (rotation); the most recently set one is active.
//!
//! - [`InMemoryKeyStore`] - Ephemeral storage in RAM (testing, scripts)
//! - [`FileKeyStore`] - near-cli compatible credential files on disk

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(feature = "file-keystore")]
pub use file::FileKeyStore;

use crate::error::KeyStoreError;
use crate::types::{AccountId, KeyPair, PublicKey};

/// A key store manages key pairs for multiple accounts.
///
/// Reads may run concurrently; writes are serialized by the implementation.
pub trait KeyStore: Send + Sync {
    /// All key pairs for an account, oldest first. The last one is active.
    fn keys(&self, account_id: &AccountId) -> Result<Vec<KeyPair>, KeyStoreError>;

    /// Add a key pair for an account and make it the active one.
    fn set_key(&self, account_id: &AccountId, key_pair: KeyPair) -> Result<(), KeyStoreError>;

    /// Remove one key. Returns whether it was present.
    fn remove_key(
        &self,
        account_id: &AccountId,
        public_key: &PublicKey,
    ) -> Result<bool, KeyStoreError>;

    /// Accounts that hold at least one key.
    fn accounts(&self) -> Result<Vec<AccountId>, KeyStoreError>;

    /// Remove every key.
    fn clear(&self) -> Result<(), KeyStoreError>;

    /// The active key pair for an account, if any.
    fn get_key(&self, account_id: &AccountId) -> Result<Option<KeyPair>, KeyStoreError> {
        Ok(self.keys(account_id)?.pop())
    }
}

/// In-memory key store.
///
/// Keys are stored in memory and lost when the process exits.
///
/// # Example
///
/// ```rust
/// use nearlib::{InMemoryKeyStore, KeyPair, KeyStore};
///
/// let keystore = InMemoryKeyStore::new();
/// let account_id = "alice.near".parse().unwrap();
/// keystore.set_key(&account_id, KeyPair::random()).unwrap();
/// assert!(keystore.get_key(&account_id).unwrap().is_some());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    keys: RwLock<HashMap<AccountId, Vec<KeyPair>>>,
}

impl InMemoryKeyStore {
    /// Create an empty in-memory keystore.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a keystore pre-populated with `(account_id, secret_key)` pairs.
    ///
    /// ```rust
    /// use nearlib::InMemoryKeyStore;
    ///
    /// let keystore = InMemoryKeyStore::from_keys(&[
    ///     ("alice.near", "ed25519:3D4YudUahN1nawWogh8pAKSj92sUNMdbZGjn7kERKzYoTy8tnFQuwoGUC51DowKqorvkr2pytJSnwuSbsNVfqygr"),
    /// ])
    /// .unwrap();
    /// assert_eq!(keystore.len(), 1);
    /// ```
    pub fn from_keys(keys: &[(&str, &str)]) -> Result<Self, crate::Error> {
        let store = Self::new();
        for (account_id, secret_key) in keys {
            let account_id: AccountId = account_id.parse()?;
            let key_pair: KeyPair = secret_key.parse()?;
            store.set_key(&account_id, key_pair)?;
        }
        Ok(store)
    }

    /// Number of accounts holding keys.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<AccountId, Vec<KeyPair>>> {
        self.keys.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<AccountId, Vec<KeyPair>>> {
        self.keys.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyStore for InMemoryKeyStore {
    fn keys(&self, account_id: &AccountId) -> Result<Vec<KeyPair>, KeyStoreError> {
        Ok(self.read().get(account_id).cloned().unwrap_or_default())
    }

    fn set_key(&self, account_id: &AccountId, key_pair: KeyPair) -> Result<(), KeyStoreError> {
        let mut keys = self.write();
        let entry = keys.entry(account_id.clone()).or_default();
        // Re-adding an existing key promotes it to active.
        entry.retain(|k| k.public_key != key_pair.public_key);
        entry.push(key_pair);
        Ok(())
    }

    fn remove_key(
        &self,
        account_id: &AccountId,
        public_key: &PublicKey,
    ) -> Result<bool, KeyStoreError> {
        let mut keys = self.write();
        let Some(entry) = keys.get_mut(account_id) else {
            return Ok(false);
        };
        let before = entry.len();
        entry.retain(|k| &k.public_key != public_key);
        let removed = entry.len() != before;
        if entry.is_empty() {
            keys.remove(account_id);
        }
        Ok(removed)
    }

    fn accounts(&self) -> Result<Vec<AccountId>, KeyStoreError> {
        let mut accounts: Vec<_> = self.read().keys().cloned().collect();
        accounts.sort();
        Ok(accounts)
    }

    fn clear(&self) -> Result<(), KeyStoreError> {
        self.write().clear();
        Ok(())
    }
}

#[cfg(feature = "file-keystore")]
mod file {
    use std::fs;
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use serde::{Deserialize, Serialize};

    use super::KeyStore;
    use crate::error::KeyStoreError;
    use crate::types::{AccountId, KeyPair, PublicKey, SecretKey};

    /// Credential file format compatible with near-cli.
    #[derive(Serialize, Deserialize)]
    struct CredentialFile {
        account_id: AccountId,
        public_key: PublicKey,
        #[serde(alias = "secret_key")]
        private_key: String,
    }

    impl CredentialFile {
        fn new(account_id: &AccountId, key_pair: &KeyPair) -> Self {
            Self {
                account_id: account_id.clone(),
                public_key: key_pair.public_key,
                private_key: key_pair.secret_key.to_string(),
            }
        }

        fn key_pair(&self) -> Result<KeyPair, KeyStoreError> {
            let secret_key: SecretKey = self.private_key.parse()?;
            let key_pair = KeyPair::from_secret_key(secret_key);
            if key_pair.public_key != self.public_key {
                return Err(KeyStoreError::InvalidFormat(format!(
                    "public key {} does not match private key",
                    self.public_key
                )));
            }
            Ok(key_pair)
        }
    }

    /// A key store backed by credential files.
    ///
    /// Layout under `<root>/<network_id>/`:
    ///
    /// - `<account_id>.json` holds the active key (what near-cli reads)
    /// - `<account_id>.keys/<public_key>.json` holds every key, active included
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use nearlib::FileKeyStore;
    ///
    /// // ~/.near-credentials/testnet
    /// let keystore = FileKeyStore::default_location("testnet").unwrap();
    /// ```
    #[derive(Debug)]
    pub struct FileKeyStore {
        dir: PathBuf,
        write_lock: Mutex<()>,
    }

    impl FileKeyStore {
        /// Store credentials under `<root>/<network_id>`.
        pub fn new(root: impl AsRef<Path>, network_id: impl AsRef<str>) -> Self {
            Self {
                dir: root.as_ref().join(network_id.as_ref()),
                write_lock: Mutex::new(()),
            }
        }

        /// Store credentials under `~/.near-credentials/<network_id>`.
        pub fn default_location(network_id: impl AsRef<str>) -> Result<Self, KeyStoreError> {
            let home = dirs::home_dir().ok_or_else(|| {
                KeyStoreError::PathError("Could not determine home directory".to_string())
            })?;
            Ok(Self::new(home.join(".near-credentials"), network_id))
        }

        /// Directory holding this network's credentials.
        pub fn path(&self) -> &Path {
            &self.dir
        }

        fn active_path(&self, account_id: &AccountId) -> PathBuf {
            self.dir.join(format!("{account_id}.json"))
        }

        /// Never equal to another account's active file, which ends in `.json`.
        fn rotation_dir(&self, account_id: &AccountId) -> PathBuf {
            self.dir.join(format!("{account_id}.keys"))
        }

        fn rotation_path(&self, account_id: &AccountId, public_key: &PublicKey) -> PathBuf {
            // ':' is not portable in file names.
            let name = public_key.to_string().replace(':', "_");
            self.rotation_dir(account_id).join(format!("{name}.json"))
        }

        fn read_credential(path: &Path) -> Result<Option<KeyPair>, KeyStoreError> {
            match fs::read_to_string(path) {
                Ok(content) => {
                    let cred: CredentialFile = serde_json::from_str(&content)?;
                    cred.key_pair().map(Some)
                }
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }

        fn write_credential(
            path: &Path,
            account_id: &AccountId,
            key_pair: &KeyPair,
        ) -> Result<(), KeyStoreError> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let content = serde_json::to_string_pretty(&CredentialFile::new(account_id, key_pair))?;
            fs::write(path, content)?;
            Ok(())
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, ()> {
            self.write_lock
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        }
    }

    impl KeyStore for FileKeyStore {
        fn keys(&self, account_id: &AccountId) -> Result<Vec<KeyPair>, KeyStoreError> {
            let active = Self::read_credential(&self.active_path(account_id))?;

            let mut rotated = Vec::new();
            match fs::read_dir(self.rotation_dir(account_id)) {
                Ok(entries) => {
                    for entry in entries {
                        let path = entry?.path();
                        if path.extension().is_some_and(|ext| ext == "json") {
                            if let Some(key_pair) = Self::read_credential(&path)? {
                                rotated.push(key_pair);
                            }
                        }
                    }
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            rotated.sort_by_key(|k| k.public_key.to_string());

            // Keep the active key last.
            if let Some(active) = active {
                rotated.retain(|k| k.public_key != active.public_key);
                rotated.push(active);
            }
            Ok(rotated)
        }

        fn get_key(&self, account_id: &AccountId) -> Result<Option<KeyPair>, KeyStoreError> {
            Self::read_credential(&self.active_path(account_id))
        }

        fn set_key(
            &self,
            account_id: &AccountId,
            key_pair: KeyPair,
        ) -> Result<(), KeyStoreError> {
            let _guard = self.lock();
            Self::write_credential(
                &self.rotation_path(account_id, &key_pair.public_key),
                account_id,
                &key_pair,
            )?;
            Self::write_credential(&self.active_path(account_id), account_id, &key_pair)
        }

        fn remove_key(
            &self,
            account_id: &AccountId,
            public_key: &PublicKey,
        ) -> Result<bool, KeyStoreError> {
            let _guard = self.lock();
            let mut removed = match fs::remove_file(self.rotation_path(account_id, public_key)) {
                Ok(()) => true,
                Err(e) if e.kind() == ErrorKind::NotFound => false,
                Err(e) => return Err(e.into()),
            };

            let active_path = self.active_path(account_id);
            let active = Self::read_credential(&active_path)?;
            if active.as_ref().is_some_and(|k| &k.public_key == public_key) {
                removed = true;
                fs::remove_file(&active_path)?;
                // Fall back to a remaining rotated key, if any.
                if let Some(next) = self.keys(account_id)?.pop() {
                    Self::write_credential(&active_path, account_id, &next)?;
                }
            }
            Ok(removed)
        }

        fn accounts(&self) -> Result<Vec<AccountId>, KeyStoreError> {
            let entries = match fs::read_dir(&self.dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(e.into()),
            };

            let mut accounts = Vec::new();
            for entry in entries {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    continue;
                }
                let path = entry.path();
                if path.extension().is_none_or(|ext| ext != "json") {
                    continue;
                }
                let account = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .and_then(|stem| stem.parse::<AccountId>().ok());
                if let Some(account) = account {
                    accounts.push(account);
                }
            }
            accounts.sort();
            Ok(accounts)
        }

        fn clear(&self) -> Result<(), KeyStoreError> {
            let _guard = self.lock();
            match fs::remove_dir_all(&self.dir) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            }
        }
    }

}
