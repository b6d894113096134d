use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::pubkey::PublicKey;
use crate::types::{AddOutcome, Dig, KeyId, LookupResult, PacketTag};

/// A deduplicated set of trusted public keys, sorted by key ID.
///
/// Cloning a `Keyring` acquires another handle to the same membership;
/// member keys are released when the last handle is dropped. Adds take an
/// exclusive lock, lookups share a read lock and always see sorted members.
///
/// # Example
///
/// ```no_run
/// # fn example(sig_packet: &[u8]) -> pkg_keyring::Result<()> {
/// use pkg_keyring::{Dig, Keyring, OpenPgpParser, PacketParser, PublicKey};
///
/// let keyring = Keyring::new();
/// keyring.add_key(&PublicKey::read("/etc/pki/rpm-gpg/RPM-GPG-KEY")?);
///
/// let mut dig = Dig::new();
/// OpenPgpParser::new().merge(sig_packet, &mut dig)?;
/// if keyring.lookup(&mut dig).is_match() {
///     println!("signed by a trusted key");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    keys: Arc<RwLock<Vec<PublicKey>>>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `key` unless a key with the same ID is already a member.
    ///
    /// The keyring shares ownership of `key`; it does not copy it.
    pub fn add_key(&self, key: &PublicKey) -> AddOutcome {
        let keyid = key.key_id();
        let mut keys = self.write();

        match keys.binary_search_by(|k| k.key_id().cmp(&keyid)) {
            Ok(_) => {
                debug!(keyid = %keyid, "key already in keyring");
                AddOutcome::Duplicate
            }
            Err(pos) => {
                keys.insert(pos, key.clone());
                debug!(keyid = %keyid, size = keys.len(), "added key to keyring");
                AddOutcome::Added
            }
        }
    }

    /// Adds every key, returning how many were new.
    pub fn add_keys<'a>(&self, keys: impl IntoIterator<Item = &'a PublicKey>) -> usize {
        keys.into_iter()
            .filter(|key| self.add_key(key) == AddOutcome::Added)
            .count()
    }

    /// Matches the signature held in `dig` against the keyring.
    ///
    /// The member named by the signature's issuer is merged into `dig` and
    /// accepted only if its algorithm and key ID agree with the signature.
    /// A signature without an issuer ID is `Malformed` and never searched for.
    pub fn lookup(&self, dig: &mut Dig) -> LookupResult {
        let Some(sig) = dig.params(PacketTag::Signature) else {
            debug!("no signature parameters to look up");
            return LookupResult::Malformed;
        };
        let signid = sig.signid;
        let sig_algo = sig.pubkey_algo;
        if signid.is_zero() {
            debug!("signature names no issuer");
            return LookupResult::Malformed;
        }

        let Some(key) = self.get(&signid) else {
            debug!(keyid = %signid, "signer not in keyring");
            return LookupResult::NoKey;
        };

        if let Err(e) = key.merge_into(dig) {
            debug!(keyid = %signid, error = %e, "failed to parse keyring member");
            return LookupResult::NoKey;
        }

        match dig.params(PacketTag::PublicKey) {
            Some(pubp) if pubp.pubkey_algo == sig_algo && pubp.signid == signid => {
                debug!(keyid = %signid, "signature matches trusted key");
                LookupResult::Match
            }
            Some(pubp) => {
                debug!(
                    keyid = %signid,
                    sig_algo = %sig_algo,
                    key_algo = %pubp.pubkey_algo,
                    key_signid = %pubp.signid,
                    "signature parameters disagree with keyring member"
                );
                LookupResult::NoKey
            }
            None => LookupResult::NoKey,
        }
    }

    /// Returns the member with the given key ID.
    pub fn get(&self, keyid: &KeyId) -> Option<PublicKey> {
        let keys = self.read();
        keys.binary_search_by(|k| k.key_id().cmp(keyid))
            .ok()
            .map(|pos| keys[pos].clone())
    }

    pub fn contains(&self, keyid: &KeyId) -> bool {
        self.get(keyid).is_some()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Member key IDs in keyring order.
    pub fn key_ids(&self) -> Vec<KeyId> {
        self.read().iter().map(PublicKey::key_id).collect()
    }

    /// Snapshot of the members in keyring order.
    pub fn keys(&self) -> Vec<PublicKey> {
        self.read().clone()
    }

    /// Number of live handles to this keyring.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.keys)
    }

    // A panic while holding the lock cannot leave the member list unsorted:
    // the only mutation is a single insert at its sorted position.
    fn read(&self) -> RwLockReadGuard<'_, Vec<PublicKey>> {
        self.keys.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<PublicKey>> {
        self.keys.write().unwrap_or_else(PoisonError::into_inner)
    }
}
