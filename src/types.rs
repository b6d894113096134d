use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::Error;
use crate::validation::validate_keyid;

/// An 8-byte OpenPGP key identifier.
///
/// Ordering is the unsigned byte-sequence order of the identifier, which is
/// the order keyrings keep their members in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct KeyId([u8; 8]);

impl KeyId {
    pub const LEN: usize = 8;

    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Takes the trailing eight bytes of `bytes`, the way v4 key IDs are cut
    /// from a fingerprint and v3 key IDs from an RSA modulus.
    pub fn from_tail(bytes: &[u8]) -> Option<Self> {
        let start = bytes.len().checked_sub(Self::LEN)?;
        let mut id = [0u8; 8];
        id.copy_from_slice(&bytes[start..]);
        Some(Self(id))
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|b| *b == 0)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl FromStr for KeyId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_keyid(s)
    }
}

impl From<[u8; 8]> for KeyId {
    fn from(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }
}

/// OpenPGP public-key algorithm identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PubkeyAlgo {
    Rsa,
    RsaEncryptOnly,
    RsaSignOnly,
    Elgamal,
    Dsa,
    Ecdh,
    Ecdsa,
    ElgamalSign,
    EdDsa,
    Other(u8),
}

impl PubkeyAlgo {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Rsa,
            2 => Self::RsaEncryptOnly,
            3 => Self::RsaSignOnly,
            16 => Self::Elgamal,
            17 => Self::Dsa,
            18 => Self::Ecdh,
            19 => Self::Ecdsa,
            20 => Self::ElgamalSign,
            22 => Self::EdDsa,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Rsa => 1,
            Self::RsaEncryptOnly => 2,
            Self::RsaSignOnly => 3,
            Self::Elgamal => 16,
            Self::Dsa => 17,
            Self::Ecdh => 18,
            Self::Ecdsa => 19,
            Self::ElgamalSign => 20,
            Self::EdDsa => 22,
            Self::Other(code) => code,
        }
    }

    pub fn is_rsa(self) -> bool {
        matches!(self, Self::Rsa | Self::RsaEncryptOnly | Self::RsaSignOnly)
    }
}

impl fmt::Display for PubkeyAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rsa | Self::RsaEncryptOnly | Self::RsaSignOnly => f.write_str("RSA"),
            Self::Elgamal | Self::ElgamalSign => f.write_str("Elgamal"),
            Self::Dsa => f.write_str("DSA"),
            Self::Ecdh => f.write_str("ECDH"),
            Self::Ecdsa => f.write_str("ECDSA"),
            Self::EdDsa => f.write_str("EdDSA"),
            Self::Other(code) => write!(f, "ALG{}", code),
        }
    }
}

/// OpenPGP packet tags the trust store distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketTag {
    Signature,
    PublicKey,
    PublicSubkey,
    UserId,
    Other(u8),
}

impl PacketTag {
    pub fn from_code(code: u8) -> Self {
        match code {
            2 => Self::Signature,
            6 => Self::PublicKey,
            13 => Self::UserId,
            14 => Self::PublicSubkey,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for PacketTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signature => f.write_str("signature"),
            Self::PublicKey => f.write_str("public key"),
            Self::PublicSubkey => f.write_str("public subkey"),
            Self::UserId => f.write_str("user ID"),
            Self::Other(code) => write!(f, "tag {}", code),
        }
    }
}

/// Parameters parsed from a signature or public-key packet sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigParams {
    pub tag: PacketTag,
    pub version: u8,
    pub pubkey_algo: PubkeyAlgo,
    pub hash_algo: Option<u8>,
    pub sig_type: Option<u8>,
    /// Creation time as the big-endian seconds stored in the packet.
    pub time: [u8; 4],
    /// Issuer key ID for signatures, the key's own ID for public keys.
    pub signid: KeyId,
    pub userid: Option<String>,
}

impl DigParams {
    pub fn creation_time(&self) -> u32 {
        u32::from_be_bytes(self.time)
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        match self.creation_time() {
            0 => None,
            secs => DateTime::from_timestamp(i64::from(secs), 0),
        }
    }
}

/// Parameter context holding at most one signature and one public-key record.
///
/// A signature is parsed into a fresh `Dig`; keyring lookup then merges the
/// candidate key's parameters into the same context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dig {
    signature: Option<DigParams>,
    pubkey: Option<DigParams>,
}

impl Dig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn params(&self, tag: PacketTag) -> Option<&DigParams> {
        match tag {
            PacketTag::Signature => self.signature.as_ref(),
            PacketTag::PublicKey => self.pubkey.as_ref(),
            _ => None,
        }
    }

    pub fn signature(&self) -> Option<&DigParams> {
        self.signature.as_ref()
    }

    pub fn pubkey(&self) -> Option<&DigParams> {
        self.pubkey.as_ref()
    }

    /// Installs `params` into the slot matching its tag, replacing any record
    /// already there. Records for other tags are ignored.
    pub fn set_params(&mut self, params: DigParams) {
        match params.tag {
            PacketTag::Signature => self.signature = Some(params),
            PacketTag::PublicKey => self.pubkey = Some(params),
            _ => {}
        }
    }
}

/// Outcome of adding a key to a keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// A key with the same ID is already a member; nothing changed.
    Duplicate,
}

impl fmt::Display for AddOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Added => f.write_str("added"),
            Self::Duplicate => f.write_str("duplicate"),
        }
    }
}

/// Outcome of matching a signature against a keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResult {
    /// The signer is a member and its parameters agree with the signature.
    Match,
    /// No consistent member key for the declared signer.
    NoKey,
    /// The context carries no signature parameters.
    Malformed,
}

impl LookupResult {
    pub fn is_match(self) -> bool {
        matches!(self, Self::Match)
    }
}

impl fmt::Display for LookupResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Match => f.write_str("OK"),
            Self::NoKey => f.write_str("NOKEY"),
            Self::Malformed => f.write_str("MALFORMED"),
        }
    }
}
