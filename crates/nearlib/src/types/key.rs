//! Ed25519 key types.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use bip39::Mnemonic;
use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use slipped10::{BIP32Path, Curve};

use crate::error::{ParseKeyError, SignerError};

/// Key type identifier. Only ed25519 keys sign transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyType {
    Ed25519 = 0,
}

impl KeyType {
    /// Get the string prefix for this key type.
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ed25519",
        }
    }
}

impl TryFrom<u8> for KeyType {
    type Error = ParseKeyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(KeyType::Ed25519),
            _ => Err(ParseKeyError::UnknownKeyType(value.to_string())),
        }
    }
}

/// Splits `"ed25519:<base58>"` into its decoded payload. A bare base58 string
/// is read as ed25519.
fn decode_prefixed(s: &str) -> Result<Vec<u8>, ParseKeyError> {
    let data_str = match s.split_once(':') {
        Some(("ed25519", data)) => data,
        Some((other, _)) => return Err(ParseKeyError::UnknownKeyType(other.to_string())),
        None => s,
    };
    if data_str.is_empty() {
        return Err(ParseKeyError::InvalidFormat);
    }
    bs58::decode(data_str)
        .into_vec()
        .map_err(|e| ParseKeyError::InvalidBase58(e.to_string()))
}

fn to_array<const N: usize>(data: &[u8]) -> Result<[u8; N], ParseKeyError> {
    data.try_into().map_err(|_| ParseKeyError::InvalidLength {
        expected: N,
        actual: data.len(),
    })
}

// ============================================================================
// PublicKey
// ============================================================================

/// Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Create a public key from raw 32 bytes.
    pub fn ed25519_from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the key type.
    pub fn key_type(&self) -> KeyType {
        KeyType::Ed25519
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn validated(bytes: [u8; 32]) -> Result<Self, ParseKeyError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| ParseKeyError::InvalidCurvePoint)?;
        Ok(Self(bytes))
    }
}

impl FromStr for PublicKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = decode_prefixed(s)?;
        Self::validated(to_array(&data)?)
    }
}

impl TryFrom<&str> for PublicKey {
    type Error = ParseKeyError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            KeyType::Ed25519.as_str(),
            bs58::encode(&self.0).into_string()
        )
    }
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = serde::Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl BorshSerialize for PublicKey {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        borsh::BorshSerialize::serialize(&(KeyType::Ed25519 as u8), writer)?;
        writer.write_all(&self.0)
    }
}

impl BorshDeserialize for PublicKey {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        let invalid = |e: ParseKeyError| std::io::Error::new(std::io::ErrorKind::InvalidData, e);
        KeyType::try_from(u8::deserialize_reader(reader)?).map_err(invalid)?;
        let mut bytes = [0u8; 32];
        reader.read_exact(&mut bytes)?;
        Self::validated(bytes).map_err(invalid)
    }
}

// ============================================================================
// SecretKey
// ============================================================================

/// Default BIP-32 HD derivation path (coin type 397 per SLIP-44).
pub const DEFAULT_HD_PATH: &str = "m/44'/397'/0'";

/// Default number of words in generated seed phrases.
pub const DEFAULT_WORD_COUNT: usize = 12;

/// Ed25519 secret key (the 32-byte seed).
#[derive(Clone)]
pub struct SecretKey([u8; 32]);

impl SecretKey {
    /// Generate a new random secret key.
    pub fn generate_ed25519() -> Self {
        Self(SigningKey::generate(&mut OsRng).to_bytes())
    }

    /// Create a secret key from its raw 32-byte seed.
    pub fn ed25519_from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Derive the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(SigningKey::from_bytes(&self.0).verifying_key().to_bytes())
    }

    /// Sign a message. Ed25519 signatures are deterministic.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature(SigningKey::from_bytes(&self.0).sign(message).to_bytes())
    }

    /// Derive a secret key from a BIP-39 seed phrase at [`DEFAULT_HD_PATH`].
    ///
    /// ```rust
    /// use nearlib::SecretKey;
    ///
    /// let phrase = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";
    /// let secret_key = SecretKey::from_seed_phrase(phrase).unwrap();
    /// ```
    pub fn from_seed_phrase(phrase: impl AsRef<str>) -> Result<Self, SignerError> {
        Self::from_seed_phrase_with_path(phrase, DEFAULT_HD_PATH)
    }

    /// Derive a secret key from a BIP-39 seed phrase with a custom hardened
    /// SLIP-10 path.
    pub fn from_seed_phrase_with_path(
        phrase: impl AsRef<str>,
        hd_path: impl AsRef<str>,
    ) -> Result<Self, SignerError> {
        let normalized = phrase
            .as_ref()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(" ");

        let mnemonic: Mnemonic = normalized
            .parse()
            .map_err(|_| SignerError::InvalidSeedPhrase)?;
        let seed = mnemonic.to_seed("");

        let path: BIP32Path = hd_path
            .as_ref()
            .parse()
            .map_err(|e| SignerError::KeyDerivationFailed(format!("Invalid HD path: {}", e)))?;

        let derived =
            slipped10::derive_key_from_path(&seed, Curve::Ed25519, &path).map_err(|e| {
                SignerError::KeyDerivationFailed(format!("SLIP-10 derivation failed: {:?}", e))
            })?;

        Ok(Self(derived.key))
    }
}

impl FromStr for SecretKey {
    type Err = ParseKeyError;

    /// Accepts the 32-byte seed or the 64-byte expanded form (seed followed
    /// by the public key).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let data = decode_prefixed(s)?;
        match data.len() {
            32 | 64 => Ok(Self(to_array(&data[..32])?)),
            actual => Err(ParseKeyError::InvalidLength {
                expected: 32,
                actual,
            }),
        }
    }
}

impl Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            KeyType::Ed25519.as_str(),
            bs58::encode(&self.0).into_string()
        )
    }
}

impl Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey({}:***)", KeyType::Ed25519.as_str())
    }
}

// ============================================================================
// Signature
// ============================================================================

/// Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Create a signature from raw 64 bytes.
    pub fn ed25519_from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Verify this signature against a message and public key.
    pub fn verify(&self, message: &[u8], public_key: &PublicKey) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(public_key.as_bytes()) else {
            return false;
        };
        let signature = ed25519_dalek::Signature::from_bytes(&self.0);
        verifying_key.verify_strict(message, &signature).is_ok()
    }
}

impl FromStr for Signature {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(to_array(&decode_prefixed(s)?)?))
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            KeyType::Ed25519.as_str(),
            bs58::encode(&self.0).into_string()
        )
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

impl BorshSerialize for Signature {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        borsh::BorshSerialize::serialize(&(KeyType::Ed25519 as u8), writer)?;
        writer.write_all(&self.0)
    }
}

impl BorshDeserialize for Signature {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        KeyType::try_from(u8::deserialize_reader(reader)?)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut bytes = [0u8; 64];
        reader.read_exact(&mut bytes)?;
        Ok(Self(bytes))
    }
}

// ============================================================================
// Seed Phrase Generation
// ============================================================================

/// Generate a random BIP-39 seed phrase of 12, 15, 18, 21 or 24 words.
pub fn generate_seed_phrase(word_count: usize) -> Result<String, SignerError> {
    use rand::RngCore;

    let entropy_bytes = match word_count {
        12 => 16,
        15 => 20,
        18 => 24,
        21 => 28,
        24 => 32,
        _ => {
            return Err(SignerError::KeyDerivationFailed(format!(
                "Invalid word count: {}. Must be 12, 15, 18, 21, or 24",
                word_count
            )));
        }
    };

    let mut entropy = vec![0u8; entropy_bytes];
    OsRng.fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy(&entropy).map_err(|e| {
        SignerError::KeyDerivationFailed(format!("Failed to generate mnemonic: {}", e))
    })?;

    Ok(mnemonic.to_string())
}

// ============================================================================
// KeyPair
// ============================================================================

/// A secret key bundled with its derived public key.
///
/// This is the unit the [`KeyStore`](crate::KeyStore) holds per account.
///
/// ```rust
/// use nearlib::KeyPair;
///
/// let keypair = KeyPair::random();
/// assert!(keypair.public_key.to_string().starts_with("ed25519:"));
/// ```
#[derive(Clone)]
pub struct KeyPair {
    /// The secret (private) key.
    pub secret_key: SecretKey,
    /// The public key derived from the secret key.
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a random key pair.
    pub fn random() -> Self {
        Self::from_secret_key(SecretKey::generate_ed25519())
    }

    /// Create a key pair from an existing secret key.
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = secret_key.public_key();
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a seed phrase at the default HD path.
    pub fn from_seed_phrase(phrase: impl AsRef<str>) -> Result<Self, SignerError> {
        Ok(Self::from_secret_key(SecretKey::from_seed_phrase(phrase)?))
    }

    /// Generate a fresh seed phrase and the key pair it derives.
    pub fn random_with_seed_phrase() -> Result<(String, Self), SignerError> {
        let phrase = generate_seed_phrase(DEFAULT_WORD_COUNT)?;
        let keypair = Self::from_seed_phrase(&phrase)?;
        Ok((phrase, keypair))
    }

    /// Sign a message with the secret key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.secret_key.sign(message)
    }
}

impl FromStr for KeyPair {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_secret_key(s.parse()?))
    }
}

impl Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("secret_key", &"***")
            .finish()
    }
}
