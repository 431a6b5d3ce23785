//! Token amount and gas unit types.

use std::fmt::{self, Display};
use std::ops::{Add, Sub};
use std::str::FromStr;

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseAmountError;

/// One NEAR in yoctoNEAR (10^24).
const YOCTO_PER_NEAR: u128 = 1_000_000_000_000_000_000_000_000;
/// One milliNEAR in yoctoNEAR (10^21).
const YOCTO_PER_MILLINEAR: u128 = 1_000_000_000_000_000_000_000;

/// A token amount with yoctoNEAR precision.
///
/// ```
/// use nearlib::NearToken;
///
/// let five_near = NearToken::near(5);
/// let one_yocto = NearToken::yocto(1);
/// let parsed: NearToken = "1.5 NEAR".parse().unwrap();
/// assert_eq!(parsed, NearToken::millinear(1500));
/// ```
///
/// Bare numbers are rejected by `FromStr` to prevent unit confusion. On the
/// wire, amounts are decimal strings of yoctoNEAR; plain JSON integers are
/// accepted when reading node responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NearToken(u128);

impl NearToken {
    /// Zero.
    pub const ZERO: Self = Self(0);

    /// Whole NEAR.
    pub const fn near(near: u128) -> Self {
        Self(near * YOCTO_PER_NEAR)
    }

    /// milliNEAR.
    pub const fn millinear(millinear: u128) -> Self {
        Self(millinear * YOCTO_PER_MILLINEAR)
    }

    /// yoctoNEAR, the smallest unit.
    pub const fn yocto(yocto: u128) -> Self {
        Self(yocto)
    }

    /// Get the raw yoctoNEAR value.
    pub const fn as_yoctonear(&self) -> u128 {
        self.0
    }

    /// Get whole NEAR (truncated).
    pub const fn as_near(&self) -> u128 {
        self.0 / YOCTO_PER_NEAR
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    fn parse_near_decimal(s: &str) -> Result<Self, ParseAmountError> {
        let invalid = || ParseAmountError::InvalidNumber(s.to_string());
        let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s, ""));
        if decimal_part.len() > 24 || !decimal_part.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }

        let integer: u128 = if integer_part.is_empty() {
            0
        } else {
            integer_part.parse().map_err(|_| invalid())?
        };
        let decimal: u128 = if decimal_part.is_empty() {
            0
        } else {
            decimal_part.parse().map_err(|_| invalid())?
        };
        let decimal_yocto = decimal * 10u128.pow(24 - decimal_part.len() as u32);

        integer
            .checked_mul(YOCTO_PER_NEAR)
            .and_then(|v| v.checked_add(decimal_yocto))
            .map(Self)
            .ok_or(ParseAmountError::Overflow)
    }
}

impl FromStr for NearToken {
    type Err = ParseAmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(value) = s.strip_suffix(" NEAR").or_else(|| s.strip_suffix(" near")) {
            return Self::parse_near_decimal(value.trim());
        }

        if let Some(value) = s
            .strip_suffix(" milliNEAR")
            .or_else(|| s.strip_suffix(" mNEAR"))
        {
            let v: u128 = value
                .trim()
                .parse()
                .map_err(|_| ParseAmountError::InvalidNumber(s.to_string()))?;
            return v
                .checked_mul(YOCTO_PER_MILLINEAR)
                .map(Self)
                .ok_or(ParseAmountError::Overflow);
        }

        if let Some(value) = s
            .strip_suffix(" yoctoNEAR")
            .or_else(|| s.strip_suffix(" yocto"))
        {
            let v: u128 = value
                .trim()
                .parse()
                .map_err(|_| ParseAmountError::InvalidNumber(s.to_string()))?;
            return Ok(Self(v));
        }

        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return Err(ParseAmountError::AmbiguousAmount(s.to_string()));
        }

        Err(ParseAmountError::InvalidFormat(s.to_string()))
    }
}

impl Display for NearToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let near = self.0 / YOCTO_PER_NEAR;
        let remainder = self.0 % YOCTO_PER_NEAR;

        if remainder == 0 {
            return write!(f, "{} NEAR", near);
        }
        if near == 0 && remainder < YOCTO_PER_NEAR / 100_000 {
            return write!(f, "{} yoctoNEAR", remainder);
        }
        // Up to 5 decimal places, trailing zeros trimmed
        let decimal = format!("{:024}", remainder);
        let decimal = decimal[..5].trim_end_matches('0');
        if decimal.is_empty() {
            write!(f, "{} NEAR", near)
        } else {
            write!(f, "{}.{} NEAR", near, decimal)
        }
    }
}

impl Add for NearToken {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Sub for NearToken {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0 - other.0)
    }
}

impl Serialize for NearToken {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for NearToken {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Int(u64),
        }

        match Repr::deserialize(d)? {
            Repr::Str(s) => s.parse().map(Self).map_err(serde::de::Error::custom),
            Repr::Int(n) => Ok(Self(n.into())),
        }
    }
}

impl BorshSerialize for NearToken {
    fn serialize<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        borsh::BorshSerialize::serialize(&self.0, writer)
    }
}

impl BorshDeserialize for NearToken {
    fn deserialize_reader<R: std::io::Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self(u128::deserialize_reader(reader)?))
    }
}

// ============================================================================
// Gas
// ============================================================================

const GAS_PER_TGAS: u64 = 1_000_000_000_000;

/// Gas attached to a function call.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    BorshSerialize,
    BorshDeserialize,
)]
#[serde(transparent)]
pub struct Gas(u64);

impl Gas {
    /// Gas attached to function calls unless overridden (30 Tgas).
    pub const DEFAULT: Self = Self::from_tgas(30);

    pub const fn from_gas(gas: u64) -> Self {
        Self(gas)
    }

    pub const fn from_tgas(tgas: u64) -> Self {
        Self(tgas * GAS_PER_TGAS)
    }

    pub const fn as_gas(&self) -> u64 {
        self.0
    }

    pub const fn as_tgas(&self) -> u64 {
        self.0 / GAS_PER_TGAS
    }
}

impl Default for Gas {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Display for Gas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % GAS_PER_TGAS == 0 {
            write!(f, "{} Tgas", self.as_tgas())
        } else {
            write!(f, "{} gas", self.0)
        }
    }
}
