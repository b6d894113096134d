use std::fmt;
use std::path::Path;
use std::sync::Arc;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::armor::{ArmorKind, encode_armor, read_packets};
use crate::error::{Error, Result};
use crate::parse::{OpenPgpParser, PacketParser};
use crate::types::{Dig, DigParams, KeyId, PacketTag, PubkeyAlgo};
use crate::validation::check_key_params;

/// A trusted-candidate OpenPGP public key.
///
/// Cloning acquires another reference to the same immutable key; the packet
/// data is freed when the last reference is dropped. Two keys compare equal
/// when their key IDs are equal.
#[derive(Clone)]
pub struct PublicKey {
    inner: Arc<PubkeyInner>,
}

struct PubkeyInner {
    pkt: Box<[u8]>,
    keyid: KeyId,
    params: DigParams,
    parser: Arc<dyn PacketParser>,
}

impl PublicKey {
    /// Builds a key from raw packet bytes using the built-in parser.
    pub fn new(pkt: &[u8]) -> Result<Self> {
        Self::with_parser(pkt, Arc::new(OpenPgpParser::new()))
    }

    /// Builds a key from raw packet bytes using `parser`.
    ///
    /// Fails when the buffer is empty, has no computable key ID, or carries
    /// no public-key parameter record.
    pub fn with_parser(pkt: &[u8], parser: Arc<dyn PacketParser>) -> Result<Self> {
        if pkt.is_empty() {
            return Err(Error::EmptyPacket);
        }

        let keyid = parser.key_id(pkt)?;
        let params = parser.params(pkt, PacketTag::PublicKey)?;

        debug!(keyid = %keyid, algo = %params.pubkey_algo, "loaded public key");
        Ok(Self {
            inner: Arc::new(PubkeyInner {
                pkt: pkt.into(),
                keyid,
                params,
                parser,
            }),
        })
    }

    /// Reads a binary or armored key file using the built-in parser.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        Self::read_with_parser(path, Arc::new(OpenPgpParser::new()))
    }

    /// Reads a binary or armored key file using `parser`.
    pub fn read_with_parser(path: impl AsRef<Path>, parser: Arc<dyn PacketParser>) -> Result<Self> {
        let pkts = read_packets(path)?;
        Self::with_parser(&pkts, parser)
    }

    /// The 8-byte ID this key is indexed by in a keyring.
    pub fn key_id(&self) -> KeyId {
        self.inner.keyid
    }

    /// The packet bytes exactly as supplied at construction.
    pub fn packet(&self) -> &[u8] {
        &self.inner.pkt
    }

    /// Parameters parsed at construction. These may describe an unusable key;
    /// see [`PublicKey::dig`].
    pub fn params(&self) -> &DigParams {
        &self.inner.params
    }

    /// Public-key algorithm of the primary key.
    pub fn algorithm(&self) -> PubkeyAlgo {
        self.inner.params.pubkey_algo
    }

    /// First user ID in the packet sequence, if any.
    pub fn user_id(&self) -> Option<&str> {
        self.inner.params.userid.as_deref()
    }

    /// Creation time, or `None` when the packet carries a zero time.
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.inner.params.created()
    }

    /// Number of live references to this key, including keyring memberships.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Re-parses the key into a fresh parameter context and checks that it
    /// is usable as a trust anchor: non-zero key ID, non-zero creation time
    /// and a user ID.
    pub fn dig(&self) -> Result<Dig> {
        let mut dig = Dig::new();
        self.merge_into(&mut dig)?;

        let params = dig.pubkey().ok_or(Error::MissingParams {
            tag: PacketTag::PublicKey,
        })?;
        if let Err(e) = check_key_params(params) {
            debug!(keyid = %self.inner.keyid, error = %e, "key failed sanity check");
            return Err(e);
        }
        Ok(dig)
    }

    /// Single-line base64 of the raw packet bytes.
    pub fn base64(&self) -> String {
        BASE64.encode(&self.inner.pkt)
    }

    /// ASCII-armored public key block.
    pub fn armor(&self) -> String {
        encode_armor(ArmorKind::PublicKey, &self.inner.pkt)
    }

    pub(crate) fn merge_into(&self, dig: &mut Dig) -> Result<()> {
        self.inner.parser.merge(&self.inner.pkt, dig)
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.inner.keyid == other.inner.keyid
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("keyid", &self.inner.keyid)
            .field("algorithm", &self.inner.params.pubkey_algo)
            .field("userid", &self.inner.params.userid)
            .field("len", &self.inner.pkt.len())
            .finish()
    }
}
