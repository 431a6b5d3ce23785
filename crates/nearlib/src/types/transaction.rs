//! Transaction types.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use borsh::{BorshDeserialize, BorshSerialize};

use super::{AccountId, Action, CryptoHash, PublicKey, Signature};
use crate::error::Error;

/// An unsigned transaction.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    /// The account that signs and pays for the transaction.
    pub signer_id: AccountId,
    /// The public key of the signer.
    pub public_key: PublicKey,
    /// Replay protection; must exceed every nonce this account used before.
    pub nonce: u64,
    /// The single action to execute.
    pub action: Action,
}

impl Transaction {
    /// The account the action lands on.
    pub fn receiver_id(&self) -> &AccountId {
        self.action.receiver_id(&self.signer_id)
    }

    /// Canonical Borsh encoding; the bytes that get hashed and signed over.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        borsh::to_vec(self).map_err(|e| Error::Borsh(e.to_string()))
    }

    /// SHA-256 of the canonical encoding.
    pub fn get_hash(&self) -> Result<CryptoHash, Error> {
        Ok(CryptoHash::hash(&self.to_bytes()?))
    }
}

/// A signed transaction ready to be sent.
///
/// Immutable once built: there are no mutators, and resubmission takes it by
/// reference. Its hash is the [`TransactionHandle`](crate::TransactionHandle)
/// the node reports status under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedTransaction {
    transaction: Transaction,
    signature: Signature,
    hash: CryptoHash,
}

impl SignedTransaction {
    /// Pair a transaction with its signature.
    pub fn new(transaction: Transaction, signature: Signature) -> Result<Self, Error> {
        let hash = transaction.get_hash()?;
        Ok(Self::from_parts(transaction, signature, hash))
    }

    pub(crate) fn from_parts(
        transaction: Transaction,
        signature: Signature,
        hash: CryptoHash,
    ) -> Self {
        Self {
            transaction,
            signature,
            hash,
        }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Hash of the unsigned transaction.
    pub fn hash(&self) -> CryptoHash {
        self.hash
    }

    /// Whether the signature matches the embedded public key.
    pub fn verify(&self) -> bool {
        self.signature
            .verify(self.hash.as_bytes(), &self.transaction.public_key)
    }

    /// Serialize to bytes for submission.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        borsh::to_vec(self).map_err(|e| Error::Borsh(e.to_string()))
    }

    /// Serialize to base64 for submission.
    pub fn to_base64(&self) -> Result<String, Error> {
        Ok(STANDARD.encode(self.to_bytes()?))
    }

    /// Deserialize from bytes produced by [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        borsh::from_slice(bytes).map_err(|e| {
            Error::Borsh(format!("Failed to deserialize signed transaction: {}", e))
        })
    }

    /// Deserialize from base64 produced by [`to_base64`](Self::to_base64).
    pub fn from_base64(s: &str) -> Result<Self, Error> {
        let bytes = STANDARD
            .decode(s)
            .map_err(|e| Error::Borsh(format!("Invalid base64: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}

impl BorshSerialize for SignedTransaction {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.transaction.serialize(writer)?;
        self.signature.serialize(writer)
    }
}

impl BorshDeserialize for SignedTransaction {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let transaction = Transaction::deserialize_reader(reader)?;
        let signature = Signature::deserialize_reader(reader)?;
        let hash = CryptoHash::hash(&borsh::to_vec(&transaction)?);
        Ok(Self::from_parts(transaction, signature, hash))
    }
}
