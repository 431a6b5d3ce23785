//! Signer trait and the key-store backed implementation.
//!
//! A signer resolves the active key for an account and signs with it. The
//! transaction builder asks for a [`SigningKey`] once per transaction, so the
//! public key written into the transaction is the one that signs it even if
//! the account's active key rotates in between.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use nearlib::{AccountId, InMemoryKeyStore, KeyPair, KeyStore, KeyStoreSigner, Signer};
//!
//! # fn example() -> Result<(), nearlib::Error> {
//! let keystore = Arc::new(InMemoryKeyStore::new());
//! let alice: AccountId = "alice.near".parse()?;
//! keystore.set_key(&alice, KeyPair::random())?;
//!
//! let signer = KeyStoreSigner::new(keystore);
//! let signature = signer.sign(b"message", &alice)?;
//! assert!(signature.verify(b"message", signer.key(&alice)?.public_key()));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::debug;

use super::keystore::KeyStore;
use crate::error::Error;
use crate::types::{AccountId, KeyPair, PublicKey, SecretKey, Signature};

/// Resolves signing keys for accounts.
pub trait Signer: Send + Sync {
    /// The active key for `account_id`.
    ///
    /// Fails with [`Error::KeyNotFound`] when the account has no key.
    fn key(&self, account_id: &AccountId) -> Result<SigningKey, Error>;

    /// Sign `message` with the active key for `account_id`.
    fn sign(&self, message: &[u8], account_id: &AccountId) -> Result<Signature, Error> {
        Ok(self.key(account_id)?.sign(message))
    }
}

impl Signer for Arc<dyn Signer> {
    fn key(&self, account_id: &AccountId) -> Result<SigningKey, Error> {
        (**self).key(account_id)
    }
}

// ============================================================================
// SigningKey
// ============================================================================

/// A public key bundled with the ability to sign for it.
///
/// Ed25519 signing is deterministic: the same message always yields the same
/// signature.
#[derive(Clone)]
pub struct SigningKey {
    public_key: PublicKey,
    secret_key: SecretKey,
}

impl SigningKey {
    pub fn new(secret_key: SecretKey) -> Self {
        Self {
            public_key: secret_key.public_key(),
            secret_key,
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.secret_key.sign(message)
    }
}

impl From<KeyPair> for SigningKey {
    fn from(key_pair: KeyPair) -> Self {
        Self {
            public_key: key_pair.public_key,
            secret_key: key_pair.secret_key,
        }
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("public_key", &self.public_key)
            .finish()
    }
}

// ============================================================================
// KeyStoreSigner
// ============================================================================

/// Signs with whatever key is active in a [`KeyStore`].
#[derive(Clone)]
pub struct KeyStoreSigner {
    key_store: Arc<dyn KeyStore>,
}

impl KeyStoreSigner {
    pub fn new(key_store: Arc<dyn KeyStore>) -> Self {
        Self { key_store }
    }

    pub fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.key_store
    }
}

impl Signer for KeyStoreSigner {
    fn key(&self, account_id: &AccountId) -> Result<SigningKey, Error> {
        let key_pair = self
            .key_store
            .get_key(account_id)?
            .ok_or_else(|| Error::KeyNotFound(account_id.clone()))?;
        debug!(%account_id, public_key = %key_pair.public_key, "resolved signing key");
        Ok(key_pair.into())
    }
}

impl std::fmt::Debug for KeyStoreSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStoreSigner").finish_non_exhaustive()
    }
}
