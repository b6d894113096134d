use std::fmt;

use sha1::{Digest, Sha1};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::types::{Dig, DigParams, KeyId, PacketTag, PubkeyAlgo};

const SUBPKT_CREATION_TIME: u8 = 2;
const SUBPKT_ISSUER: u8 = 16;
const SUBPKT_ISSUER_FINGERPRINT: u8 = 33;

/// Packet-level OpenPGP parsing used by keys and keyrings.
///
/// [`OpenPgpParser`] is the built-in implementation; anything else that can
/// turn packet bytes into key IDs and parameter records can stand in for it.
pub trait PacketParser: Send + Sync + fmt::Debug {
    /// Computes the key ID of the leading public-key packet.
    fn key_id(&self, pkt: &[u8]) -> Result<KeyId>;

    /// Parses `pkt` into `dig`, filling the slot selected by the leading
    /// packet. On error `dig` is left untouched.
    fn merge(&self, pkt: &[u8], dig: &mut Dig) -> Result<()>;

    /// Parses `pkt` on its own and returns the record for `tag`.
    fn params(&self, pkt: &[u8], tag: PacketTag) -> Result<DigParams> {
        let mut dig = Dig::new();
        self.merge(pkt, &mut dig)?;
        dig.params(tag).cloned().ok_or(Error::MissingParams { tag })
    }
}

/// RFC 4880 parser for v3/v4 public keys and signatures.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenPgpParser;

impl OpenPgpParser {
    pub fn new() -> Self {
        Self
    }
}

impl PacketParser for OpenPgpParser {
    fn key_id(&self, pkt: &[u8]) -> Result<KeyId> {
        let first = next_packet(pkt)?.0;
        if first.tag != PacketTag::PublicKey {
            return Err(Error::MissingParams {
                tag: PacketTag::PublicKey,
            });
        }
        Ok(parse_key(first.body)?.signid)
    }

    fn merge(&self, pkt: &[u8], dig: &mut Dig) -> Result<()> {
        let packets = split_packets(pkt)?;
        let lead = packets
            .first()
            .map(|p| p.tag)
            .ok_or_else(|| Error::malformed("no packets"))?;

        let mut builder = match lead {
            PacketTag::Signature | PacketTag::PublicKey => ParamsBuilder::new(lead),
            other => {
                return Err(Error::malformed(format!(
                    "unexpected leading {} packet",
                    other
                )));
            }
        };

        for packet in &packets {
            match packet.tag {
                PacketTag::PublicKey if lead == PacketTag::PublicKey => {
                    if builder.version.is_some() {
                        debug!("skipping additional primary key in packet data");
                        continue;
                    }
                    builder.merge(parse_key(packet.body)?);
                }
                PacketTag::Signature => builder.merge(parse_signature(packet.body)?),
                PacketTag::UserId => {
                    if builder.userid.is_none() {
                        builder.userid = Some(String::from_utf8_lossy(packet.body).into_owned());
                    }
                }
                PacketTag::PublicSubkey => trace!("skipping subkey packet"),
                tag => debug!(%tag, "skipping unhandled packet"),
            }
        }

        let params = builder
            .build()
            .ok_or(Error::MissingParams { tag: lead })?;
        dig.set_params(params);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Packet<'a> {
    pub tag: PacketTag,
    pub body: &'a [u8],
}

pub(crate) fn split_packets(buf: &[u8]) -> Result<Vec<Packet<'_>>> {
    let mut packets = Vec::new();
    let mut rest = buf;
    while !rest.is_empty() {
        let (packet, remaining) = next_packet(rest)?;
        packets.push(packet);
        rest = remaining;
    }
    Ok(packets)
}

fn next_packet(buf: &[u8]) -> Result<(Packet<'_>, &[u8])> {
    let mut reader = ByteReader::new(buf);
    let ctb = reader.u8()?;
    if ctb & 0x80 == 0 {
        return Err(Error::malformed(format!(
            "invalid packet header byte {:#04x}",
            ctb
        )));
    }

    let (tag, len) = if ctb & 0x40 != 0 {
        let len = match reader.u8()? {
            first @ 0..=191 => usize::from(first),
            first @ 192..=223 => ((usize::from(first) - 192) << 8) + usize::from(reader.u8()?) + 192,
            255 => reader.u32()? as usize,
            _ => return Err(Error::malformed("partial body lengths are not supported")),
        };
        (ctb & 0x3F, len)
    } else {
        let len = match ctb & 0x03 {
            0 => usize::from(reader.u8()?),
            1 => usize::from(reader.u16()?),
            2 => reader.u32()? as usize,
            _ => reader.remaining(),
        };
        ((ctb >> 2) & 0x0F, len)
    };

    let body = reader.take(len)?;
    Ok((
        Packet {
            tag: PacketTag::from_code(tag),
            body,
        },
        reader.rest(),
    ))
}

fn parse_key(body: &[u8]) -> Result<DigParams> {
    let mut reader = ByteReader::new(body);
    let version = reader.u8()?;

    let (time, algo, keyid) = match version {
        2 | 3 => {
            let time = reader.array::<4>()?;
            let _validity_days = reader.u16()?;
            let algo = PubkeyAlgo::from_code(reader.u8()?);
            if !algo.is_rsa() {
                return Err(Error::malformed(format!("v{} key with {} algorithm", version, algo)));
            }
            let modulus = reader.mpi()?;
            let keyid = KeyId::from_tail(modulus)
                .ok_or_else(|| Error::malformed("RSA modulus shorter than a key ID"))?;
            (time, algo, keyid)
        }
        4 => {
            let time = reader.array::<4>()?;
            let algo = PubkeyAlgo::from_code(reader.u8()?);
            let len = u16::try_from(body.len())
                .map_err(|_| Error::malformed("v4 key packet too long to fingerprint"))?;

            let mut hasher = Sha1::new();
            hasher.update([0x99]);
            hasher.update(len.to_be_bytes());
            hasher.update(body);
            let fingerprint = hasher.finalize();
            let keyid = KeyId::from_tail(&fingerprint)
                .ok_or_else(|| Error::malformed("fingerprint shorter than a key ID"))?;
            (time, algo, keyid)
        }
        _ => {
            return Err(Error::UnsupportedPacket {
                tag: PacketTag::PublicKey,
                version,
            });
        }
    };

    Ok(DigParams {
        tag: PacketTag::PublicKey,
        version,
        pubkey_algo: algo,
        hash_algo: None,
        sig_type: None,
        time,
        signid: keyid,
        userid: None,
    })
}

fn parse_signature(body: &[u8]) -> Result<DigParams> {
    let mut reader = ByteReader::new(body);
    let version = reader.u8()?;

    match version {
        3 => {
            if reader.u8()? != 5 {
                return Err(Error::malformed("v3 signature hashed length must be 5"));
            }
            let sig_type = reader.u8()?;
            let time = reader.array::<4>()?;
            let signid = KeyId::new(reader.array::<8>()?);
            let pubkey_algo = PubkeyAlgo::from_code(reader.u8()?);
            let hash_algo = reader.u8()?;
            Ok(DigParams {
                tag: PacketTag::Signature,
                version,
                pubkey_algo,
                hash_algo: Some(hash_algo),
                sig_type: Some(sig_type),
                time,
                signid,
                userid: None,
            })
        }
        4 => {
            let sig_type = reader.u8()?;
            let pubkey_algo = PubkeyAlgo::from_code(reader.u8()?);
            let hash_algo = reader.u8()?;

            let mut time = None;
            let mut signid = None;
            for hashed in [true, false] {
                let len = usize::from(reader.u16()?);
                let area = reader.take(len)?;
                for (kind, data) in subpackets(area)? {
                    match kind {
                        SUBPKT_CREATION_TIME if hashed && time.is_none() => {
                            time = Some(ByteReader::new(data).array::<4>()?);
                        }
                        SUBPKT_ISSUER if signid.is_none() => {
                            signid = Some(KeyId::new(ByteReader::new(data).array::<8>()?));
                        }
                        SUBPKT_ISSUER_FINGERPRINT if signid.is_none() => {
                            // version octet followed by the fingerprint
                            signid = data.get(1..).and_then(KeyId::from_tail);
                        }
                        _ => trace!(kind = kind, hashed = hashed, "ignoring signature subpacket"),
                    }
                }
            }

            Ok(DigParams {
                tag: PacketTag::Signature,
                version,
                pubkey_algo,
                hash_algo: Some(hash_algo),
                sig_type: Some(sig_type),
                time: time.unwrap_or_default(),
                // zero means no issuer; ParamsBuilder refuses to build without one
                signid: signid.unwrap_or_default(),
                userid: None,
            })
        }
        _ => Err(Error::UnsupportedPacket {
            tag: PacketTag::Signature,
            version,
        }),
    }
}

fn subpackets(area: &[u8]) -> Result<Vec<(u8, &[u8])>> {
    let mut out = Vec::new();
    let mut reader = ByteReader::new(area);
    while reader.remaining() > 0 {
        let len = match reader.u8()? {
            first @ 0..=191 => usize::from(first),
            first @ 192..=254 => ((usize::from(first) - 192) << 8) + usize::from(reader.u8()?) + 192,
            255 => reader.u32()? as usize,
        };
        if len == 0 {
            return Err(Error::malformed("zero-length signature subpacket"));
        }
        let data = reader.take(len)?;
        // high bit marks the subpacket as critical
        out.push((data[0] & 0x7F, &data[1..]));
    }
    Ok(out)
}

/// Accumulates one parameter record from a packet sequence. Values are
/// set-once: later packets in the sequence (e.g. self-signatures inside a key
/// block) cannot replace what the leading packet established.
///
/// An all-zero creation time counts as unset, so a key packet with a zero
/// time takes the creation time of its first self-signature. The signer ID
/// is only taken from packets of the record's own kind and an all-zero ID
/// never counts: a record without one is not built at all.
struct ParamsBuilder {
    tag: PacketTag,
    version: Option<u8>,
    pubkey_algo: Option<PubkeyAlgo>,
    hash_algo: Option<u8>,
    sig_type: Option<u8>,
    time: Option<[u8; 4]>,
    signid: Option<KeyId>,
    userid: Option<String>,
}

impl ParamsBuilder {
    fn new(tag: PacketTag) -> Self {
        Self {
            tag,
            version: None,
            pubkey_algo: None,
            hash_algo: None,
            sig_type: None,
            time: None,
            signid: None,
            userid: None,
        }
    }

    fn merge(&mut self, params: DigParams) {
        self.version.get_or_insert(params.version);
        self.pubkey_algo.get_or_insert(params.pubkey_algo);
        if let Some(hash_algo) = params.hash_algo {
            self.hash_algo.get_or_insert(hash_algo);
        }
        if let Some(sig_type) = params.sig_type {
            self.sig_type.get_or_insert(sig_type);
        }
        if params.time != [0; 4] {
            self.time.get_or_insert(params.time);
        }
        if params.tag == self.tag && !params.signid.is_zero() {
            self.signid.get_or_insert(params.signid);
        }
    }

    fn build(self) -> Option<DigParams> {
        Some(DigParams {
            tag: self.tag,
            version: self.version?,
            pubkey_algo: self.pubkey_algo?,
            hash_algo: self.hash_algo,
            sig_type: self.sig_type,
            time: self.time.unwrap_or_default(),
            signid: self.signid?,
            userid: self.userid,
        })
    }
}

struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::malformed(format!(
                "need {} bytes at offset {}, have {}",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn mpi(&mut self) -> Result<&'a [u8]> {
        let bits = usize::from(self.u16()?);
        self.take(bits.div_ceil(8))
    }
}
