#![allow(dead_code)]

use pkg_keyring::{Dig, DigParams, Error, KeyId, PacketParser, PacketTag, PubkeyAlgo, Result};
use sha1::{Digest, Sha1};

pub const KEY_TIME: u32 = 1_409_337_986;
pub const USER_ID: &str = "Build System <builder@example.org>";

pub fn packet(tag: u8, body: &[u8]) -> Vec<u8> {
    assert!(body.len() < 192);
    let mut out = vec![0xC0 | tag, body.len() as u8];
    out.extend_from_slice(body);
    out
}

fn mpi(value: &[u8]) -> Vec<u8> {
    let mut out = ((value.len() * 8) as u16).to_be_bytes().to_vec();
    out.extend_from_slice(value);
    out
}

/// v4 key block with a user ID; returns the block and its key ID.
pub fn key_block(algo: u8, seed: u8) -> (Vec<u8>, KeyId) {
    let mut body = vec![4];
    body.extend_from_slice(&KEY_TIME.to_be_bytes());
    body.push(algo);
    body.extend(mpi(&[0x80 | seed; 48]));
    body.extend(mpi(&[0x81, 0x00, 0x01]));

    let mut hasher = Sha1::new();
    hasher.update([0x99]);
    hasher.update((body.len() as u16).to_be_bytes());
    hasher.update(&body);
    let id = KeyId::from_tail(&hasher.finalize()).unwrap();

    let mut block = packet(6, &body);
    block.extend(packet(13, USER_ID.as_bytes()));
    (block, id)
}

/// v4 signature packet with the issuer in the unhashed area.
pub fn signature(algo: u8, issuer: KeyId) -> Vec<u8> {
    let mut hashed = vec![5, 2];
    hashed.extend_from_slice(&(KEY_TIME + 60).to_be_bytes());
    let mut unhashed = vec![9, 16];
    unhashed.extend_from_slice(issuer.as_bytes());

    let mut body = vec![4, 0x00, algo, 8];
    body.extend_from_slice(&(hashed.len() as u16).to_be_bytes());
    body.extend(hashed);
    body.extend_from_slice(&(unhashed.len() as u16).to_be_bytes());
    body.extend(unhashed);
    body.extend_from_slice(&[0x12, 0x34]);
    body.extend(mpi(&[0x99; 16]));
    packet(2, &body)
}

/// Parser over a toy packet format so tests can pick exact key IDs.
///
/// `K id[8] algo userid..` is a key, `S id[8] algo` a signature,
/// `X id[8] algo` a key whose parsed signer ID disagrees with its key ID, and
/// `F id[8] algo` a key that constructs but fails every later `merge`.
#[derive(Debug, Default)]
pub struct StubParser;

impl StubParser {
    pub fn key(id: KeyId, algo: PubkeyAlgo, userid: Option<&str>) -> Vec<u8> {
        let mut pkt = vec![b'K'];
        pkt.extend_from_slice(id.as_bytes());
        pkt.push(algo.code());
        pkt.extend_from_slice(userid.unwrap_or_default().as_bytes());
        pkt
    }

    pub fn inconsistent_key(id: KeyId, algo: PubkeyAlgo) -> Vec<u8> {
        let mut pkt = vec![b'X'];
        pkt.extend_from_slice(id.as_bytes());
        pkt.push(algo.code());
        pkt
    }

    pub fn unparsable_key(id: KeyId, algo: PubkeyAlgo) -> Vec<u8> {
        let mut pkt = vec![b'F'];
        pkt.extend_from_slice(id.as_bytes());
        pkt.push(algo.code());
        pkt
    }

    pub fn signature(id: KeyId, algo: PubkeyAlgo) -> Dig {
        let mut pkt = vec![b'S'];
        pkt.extend_from_slice(id.as_bytes());
        pkt.push(algo.code());

        let mut dig = Dig::new();
        StubParser.merge(&pkt, &mut dig).unwrap();
        dig
    }

    fn split(pkt: &[u8]) -> Result<(u8, KeyId, PubkeyAlgo, &[u8])> {
        if pkt.len() < 10 {
            return Err(Error::MissingParams {
                tag: PacketTag::PublicKey,
            });
        }
        let id = KeyId::from_tail(&pkt[1..9]).unwrap();
        Ok((pkt[0], id, PubkeyAlgo::from_code(pkt[9]), &pkt[10..]))
    }
}

impl PacketParser for StubParser {
    fn key_id(&self, pkt: &[u8]) -> Result<KeyId> {
        match Self::split(pkt)? {
            (b'K' | b'X' | b'F', id, _, _) => Ok(id),
            _ => Err(Error::MissingParams {
                tag: PacketTag::PublicKey,
            }),
        }
    }

    fn merge(&self, pkt: &[u8], dig: &mut Dig) -> Result<()> {
        let (kind, id, algo, rest) = Self::split(pkt)?;
        let (tag, signid, userid) = match kind {
            b'K' => (
                PacketTag::PublicKey,
                id,
                (!rest.is_empty()).then(|| String::from_utf8_lossy(rest).into_owned()),
            ),
            b'X' => {
                let mut bytes = *id.as_bytes();
                bytes[7] ^= 0xFF;
                (PacketTag::PublicKey, KeyId::new(bytes), Some(USER_ID.to_string()))
            }
            b'S' => (PacketTag::Signature, id, None),
            b'F' => {
                return Err(Error::MalformedPacket {
                    reason: "key material truncated".to_string(),
                });
            }
            _ => return Err(Error::MissingParams { tag: PacketTag::PublicKey }),
        };

        dig.set_params(Self::record(tag, signid, algo, userid));
        Ok(())
    }

    fn params(&self, pkt: &[u8], tag: PacketTag) -> Result<DigParams> {
        if let (b'F', id, algo, _) = Self::split(pkt)? {
            return Ok(Self::record(
                PacketTag::PublicKey,
                id,
                algo,
                Some(USER_ID.to_string()),
            ));
        }
        let mut dig = Dig::new();
        self.merge(pkt, &mut dig)?;
        dig.params(tag).cloned().ok_or(Error::MissingParams { tag })
    }
}

impl StubParser {
    fn record(tag: PacketTag, signid: KeyId, algo: PubkeyAlgo, userid: Option<String>) -> DigParams {
        DigParams {
            tag,
            version: 4,
            pubkey_algo: algo,
            hash_algo: None,
            sig_type: None,
            time: KEY_TIME.to_be_bytes(),
            signid,
            userid,
        }
    }
}
