//! Builders for synthetic OpenPGP packets used by the unit tests.

use sha1::{Digest, Sha1};

use crate::types::KeyId;

pub const KEY_TIME: u32 = 1_568_815_794;
pub const USER_ID: &str = "Test Packager <packager@example.org>";

/// New-format packet with a one or two octet length.
pub fn packet(tag: u8, body: &[u8]) -> Vec<u8> {
    let mut out = vec![0xC0 | tag];
    match body.len() {
        len @ 0..=191 => out.push(len as u8),
        len @ 192..=8383 => {
            let len = len - 192;
            out.push((len >> 8) as u8 + 192);
            out.push(len as u8);
        }
        len => {
            out.push(0xFF);
            out.extend_from_slice(&(len as u32).to_be_bytes());
        }
    }
    out.extend_from_slice(body);
    out
}

pub fn mpi(value: &[u8]) -> Vec<u8> {
    let bits = (value.len() * 8) as u16 - value[0].leading_zeros() as u16;
    let mut out = bits.to_be_bytes().to_vec();
    out.extend_from_slice(value);
    out
}

pub fn v4_key_body(time: u32, algo: u8, seed: u8) -> Vec<u8> {
    let mut body = vec![4];
    body.extend_from_slice(&time.to_be_bytes());
    body.push(algo);
    let modulus: Vec<u8> = (0..64u8).map(|i| i.wrapping_mul(31).wrapping_add(seed) | 0x80).collect();
    body.extend(mpi(&modulus));
    body.extend(mpi(&[0x01, 0x00, 0x01]));
    body
}

pub fn v4_key_id(body: &[u8]) -> KeyId {
    let mut hasher = Sha1::new();
    hasher.update([0x99]);
    hasher.update((body.len() as u16).to_be_bytes());
    hasher.update(body);
    KeyId::from_tail(&hasher.finalize()).unwrap()
}

pub fn subpacket(kind: u8, data: &[u8]) -> Vec<u8> {
    let mut out = vec![(data.len() + 1) as u8, kind];
    out.extend_from_slice(data);
    out
}

pub fn v4_sig_body(sig_type: u8, algo: u8, time: u32, issuer: Option<KeyId>) -> Vec<u8> {
    let hashed = subpacket(2, &time.to_be_bytes());
    let unhashed = issuer
        .map(|id| subpacket(16, id.as_bytes()))
        .unwrap_or_default();

    let mut body = vec![4, sig_type, algo, 8];
    body.extend_from_slice(&(hashed.len() as u16).to_be_bytes());
    body.extend(hashed);
    body.extend_from_slice(&(unhashed.len() as u16).to_be_bytes());
    body.extend(unhashed);
    body.extend_from_slice(&[0xAB, 0xCD]);
    body.extend(mpi(&[0x5A; 32]));
    body
}

/// Primary key, user ID and positive self-certification.
pub fn key_block(algo: u8, seed: u8) -> (Vec<u8>, KeyId) {
    let body = v4_key_body(KEY_TIME, algo, seed);
    let id = v4_key_id(&body);

    let mut block = packet(6, &body);
    block.extend(packet(13, USER_ID.as_bytes()));
    block.extend(packet(2, &v4_sig_body(0x13, algo, KEY_TIME + 10, Some(id))));
    (block, id)
}

pub fn signature(algo: u8, issuer: KeyId) -> Vec<u8> {
    packet(2, &v4_sig_body(0x00, algo, KEY_TIME + 3600, Some(issuer)))
}
